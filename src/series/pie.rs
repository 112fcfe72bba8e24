use super::{base_dataset, SeriesBuilderProps, SeriesStrategy};
use crate::ir::{AxisValue, BuiltSeries, DataPoint, DatasetKind, TooltipEntry};
use crate::palette::assign_color;

const FULL_RADIUS: f64 = 100.0;
pub const OTHER_SLICE: &str = "Other";

pub struct PieSeries;

struct Slice {
    label: String,
    value: f64,
    tooltip: Vec<TooltipEntry>,
}

impl SeriesStrategy for PieSeries {
    fn build(&self, props: &SeriesBuilderProps<'_>) -> BuiltSeries {
        let options = props.dataset_options;
        let rings = options.datasets.len().max(1) as f64;
        let hole = if props.pie_donut_width > 0.0 {
            (FULL_RADIUS - props.pie_donut_width).max(0.0)
        } else {
            0.0
        };
        let band = (FULL_RADIUS - hole) / rings;

        let datasets = options
            .datasets
            .iter()
            .enumerate()
            .map(|(index, option)| {
                let raw: Vec<Slice> = options
                    .labels
                    .iter()
                    .zip(&option.data)
                    .zip(&option.tooltip_data)
                    .map(|((label, value), tooltip)| Slice {
                        label: label.clone(),
                        value: value.filter(|v| *v > 0.0).unwrap_or(0.0),
                        tooltip: tooltip.clone(),
                    })
                    .collect();
                let total: f64 = raw.iter().map(|s| s.value).sum();
                let (slices, folded) = fold_small_slices(raw, total, props.pie_minimum_slice_percentage);

                let percentages = props.pie_show_inner_label.then(|| {
                    slices
                        .iter()
                        .map(|s| if total > 0.0 { s.value * 100.0 / total } else { 0.0 })
                        .collect()
                });
                let data = slices
                    .iter()
                    .map(|s| DataPoint {
                        x: AxisValue::Text(s.label.clone()),
                        y: Some(s.value),
                    })
                    .collect();
                let kind = DatasetKind::Pie {
                    radius: FULL_RADIUS - index as f64 * band,
                    inner_radius: FULL_RADIUS - (index + 1) as f64 * band,
                    percentages,
                };

                let mut dataset = base_dataset(props, index, option, data, kind);
                dataset.colors = (0..slices.len()).map(|j| assign_color(j, props.colors, None)).collect();
                dataset.tooltip_data = slices.into_iter().map(|s| s.tooltip).collect();
                if folded {
                    dataset.categories = None;
                }
                dataset
            })
            .collect();

        BuiltSeries { datasets, total: None }
    }
}

/// Fold slices under `min_percent` of the ring into one trailing slice.
/// Returns whether anything was folded.
fn fold_small_slices(slices: Vec<Slice>, total: f64, min_percent: f64) -> (Vec<Slice>, bool) {
    if min_percent <= 0.0 || total <= 0.0 {
        return (slices, false);
    }
    let (kept, small): (Vec<Slice>, Vec<Slice>) = slices
        .into_iter()
        .partition(|s| s.value * 100.0 / total >= min_percent);
    if small.is_empty() {
        return (kept, false);
    }
    let mut out = kept;
    out.push(Slice {
        label: OTHER_SLICE.to_string(),
        value: small.iter().map(|s| s.value).sum(),
        tooltip: Vec::new(),
    });
    (out, true)
}
