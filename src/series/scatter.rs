use super::{base_dataset, SeriesBuilderProps, SeriesStrategy};
use crate::ir::{AxisValue, BuiltSeries, DataPoint, DatasetKind, DatasetOption};
use crate::scale::rescale;

pub struct ScatterSeries;

impl SeriesStrategy for ScatterSeries {
    fn build(&self, props: &SeriesBuilderProps<'_>) -> BuiltSeries {
        let options = props.dataset_options;
        let datasets = options
            .datasets
            .iter()
            .enumerate()
            .map(|(index, option)| {
                let data = options
                    .x_values
                    .iter()
                    .zip(&options.labels)
                    .zip(&option.data)
                    .map(|((x, label), y)| DataPoint {
                        x: match x {
                            Some(x) => AxisValue::Number(*x),
                            None => AxisValue::Text(label.clone()),
                        },
                        y: *y,
                    })
                    .collect();
                let kind = DatasetKind::Scatter {
                    point_radius: point_radii(props, option),
                };
                base_dataset(props, index, option, data, kind)
            })
            .collect();
        BuiltSeries { datasets, total: None }
    }
}

/// Dot radius per point. With a size column the value range maps linearly
/// onto `scatter_dot_size`; a missing size gets the smallest dot.
fn point_radii(props: &SeriesBuilderProps<'_>, option: &DatasetOption) -> Vec<f64> {
    let [min_radius, max_radius] = props.scatter_dot_size;
    let count = props.dataset_options.point_count();
    match (&props.size_options, &option.size_data) {
        (Some(size), Some(values)) => values
            .iter()
            .map(|value| match value {
                Some(v) => rescale(*v, (size.min_value, size.max_value), (min_radius, max_radius)),
                None => min_radius,
            })
            .collect(),
        _ => vec![min_radius; count],
    }
}
