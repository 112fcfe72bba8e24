use super::bar::bar_kind;
use super::line::{line_kind, line_values, percent_totals};
use super::{base_dataset, category_points, normalise_to_percent, SeriesBuilderProps, SeriesStrategy};
use crate::config::{BarGroupType, ColumnVisualization};
use crate::ir::{AxisId, BuiltSeries, DatasetKind, DatasetOption};

/// Radius used for dot series when the column sets no symbol size
const DOT_RADIUS: f64 = 4.0;

/// Mixed chart: each series is drawn as its column's visualization,
/// defaulting to bars.
pub struct ComboSeries;

fn visualization(props: &SeriesBuilderProps<'_>, option: &DatasetOption) -> ColumnVisualization {
    props
        .settings(&option.data_key)
        .column_visualization
        .unwrap_or(ColumnVisualization::Bar)
}

impl SeriesStrategy for ComboSeries {
    fn build(&self, props: &SeriesBuilderProps<'_>) -> BuiltSeries {
        let options = props.dataset_options;
        let line_totals = percent_totals(props);
        let bar_totals = (props.bar_group_type == BarGroupType::PercentageStack).then(|| {
            [AxisId::Y, AxisId::Y2].map(|axis| bar_axis_totals(props, axis))
        });

        let mut next_slot = 0;
        let datasets = options
            .datasets
            .iter()
            .enumerate()
            .map(|(index, option)| {
                let (values, kind) = match visualization(props, option) {
                    ColumnVisualization::Bar => {
                        let slot = props.is_visible(&option.data_key).then(|| {
                            next_slot += 1;
                            next_slot - 1
                        });
                        let values = match &bar_totals {
                            Some([y, y2]) => {
                                normalise_to_percent(&option.data, if option.axis == AxisId::Y { y } else { y2 })
                            }
                            None => option.data.clone(),
                        };
                        (values, bar_kind(props, option, slot))
                    }
                    ColumnVisualization::Line => {
                        (line_values(option, line_totals.as_deref()), line_kind(props, option))
                    }
                    ColumnVisualization::Dot => (option.data.clone(), dot_kind(props, option)),
                };
                base_dataset(props, index, option, category_points(options, &values), kind)
            })
            .collect();

        BuiltSeries { datasets, total: None }
    }
}

/// Dots are lines with no stroke and always-visible points.
fn dot_kind(props: &SeriesBuilderProps<'_>, option: &DatasetOption) -> DatasetKind {
    let symbol = props.settings(&option.data_key).line_symbol_size;
    DatasetKind::Line {
        stack: None,
        fill: false,
        tension: 0.0,
        stepped: false,
        border_width: 0.0,
        point_radius: if symbol > 0.0 { symbol } else { DOT_RADIUS },
    }
}

/// Like the bar chart totals, restricted to series drawn as bars.
fn bar_axis_totals(props: &SeriesBuilderProps<'_>, axis: AxisId) -> Vec<f64> {
    let options = props.dataset_options;
    let mut totals = vec![0.0; options.point_count()];
    for dataset in options.datasets.iter().filter(|d| {
        d.axis == axis
            && props.is_visible(&d.data_key)
            && visualization(props, d) == ColumnVisualization::Bar
    }) {
        for (total, value) in totals.iter_mut().zip(&dataset.data) {
            *total += value.unwrap_or(0.0);
        }
    }
    totals
}
