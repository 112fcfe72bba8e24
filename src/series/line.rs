use super::{axis_totals, base_dataset, category_points, normalise_to_percent, SeriesBuilderProps, SeriesStrategy};
use crate::config::{LineGroupType, LineStyle, LineType};
use crate::ir::{AxisId, BuiltSeries, DatasetKind, DatasetOption};

const SMOOTH_TENSION: f64 = 0.375;

pub struct LineSeries;

impl SeriesStrategy for LineSeries {
    fn build(&self, props: &SeriesBuilderProps<'_>) -> BuiltSeries {
        let options = props.dataset_options;
        let totals = percent_totals(props);
        let datasets = options
            .datasets
            .iter()
            .enumerate()
            .map(|(index, option)| {
                let values = line_values(option, totals.as_deref());
                base_dataset(props, index, option, category_points(options, &values), line_kind(props, option))
            })
            .collect();
        BuiltSeries { datasets, total: None }
    }
}

/// Per-point totals of the visible y series when lines stack as percentages.
pub(super) fn percent_totals(props: &SeriesBuilderProps<'_>) -> Option<Vec<f64>> {
    (props.line_group_type == Some(LineGroupType::PercentageStack)).then(|| axis_totals(props, AxisId::Y))
}

/// Only the y axis stacks; y2 lines always plot raw values.
pub(super) fn line_values(option: &DatasetOption, totals: Option<&[f64]>) -> Vec<Option<f64>> {
    match totals {
        Some(totals) if option.axis == AxisId::Y => normalise_to_percent(&option.data, totals),
        _ => option.data.clone(),
    }
}

pub(super) fn line_kind(props: &SeriesBuilderProps<'_>, option: &DatasetOption) -> DatasetKind {
    let settings = props.settings(&option.data_key);
    let stacked = props.line_group_type.is_some() && option.axis == AxisId::Y;
    DatasetKind::Line {
        stack: stacked.then(|| format!("stack-{}", AxisId::Y.as_str())),
        fill: stacked || settings.line_style == LineStyle::Area,
        tension: if settings.line_type == LineType::Smooth { SMOOTH_TENSION } else { 0.0 },
        stepped: settings.line_type == LineType::Step,
        border_width: settings.line_width,
        point_radius: settings.line_symbol_size,
    }
}
