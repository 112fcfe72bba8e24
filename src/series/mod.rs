//! Series construction.
//!
//! Each chart family is a [`SeriesStrategy`]; [`build_series`] checks the
//! props, picks the strategy and appends trendline overlays. Strategies are
//! pure functions of [`SeriesBuilderProps`].

mod bar;
mod combo;
mod line;
mod pie;
mod scatter;

pub use bar::BarSeries;
pub use combo::ComboSeries;
pub use line::LineSeries;
pub use pie::PieSeries;
pub use scatter::ScatterSeries;

use crate::config::{
    settings_for, BarGroupType, ChartConfig, ChartType, ColumnLabelFormats, ColumnSettings,
    ColumnSettingsMap, LineGroupType, Trendline,
};
use crate::dataset::column_title;
use crate::error::{SeriesError, SeriesResult};
use crate::ir::{
    AxisId, AxisValue, BuiltSeries, ChartDataset, ColumnType, DataPoint, DatasetKind,
    DatasetOption, DatasetOptionsWithTicks, ResolvedEncodes,
};
use crate::palette::assign_color;
use crate::trendline::{compute_trendline, TrendPoint};

const MS_PER_DAY: f64 = 86_400_000.0;

/// Value range mapped onto the scatter dot sizes.
#[derive(Debug, Clone, PartialEq)]
pub struct SizeOptions {
    pub key: String,
    pub min_value: f64,
    pub max_value: f64,
}

/// Everything a strategy reads. Nothing here is mutated while building.
#[derive(Debug, Clone)]
pub struct SeriesBuilderProps<'a> {
    pub dataset_options: &'a DatasetOptionsWithTicks,
    pub column_settings: &'a ColumnSettingsMap,
    pub column_label_formats: &'a ColumnLabelFormats,
    pub x_axis_keys: &'a [String],
    pub y_axis_keys: &'a [String],
    pub y2_axis_keys: &'a [String],
    pub colors: &'a [String],
    pub size_options: Option<SizeOptions>,
    /// Min and max point radius in pixels
    pub scatter_dot_size: [f64; 2],
    pub bar_group_type: BarGroupType,
    pub bar_show_total_at_top: bool,
    pub line_group_type: Option<LineGroupType>,
    pub pie_show_inner_label: bool,
    pub pie_donut_width: f64,
    pub pie_minimum_slice_percentage: f64,
    pub trendlines: &'a [Trendline],
}

impl<'a> SeriesBuilderProps<'a> {
    /// Assemble props from a chart config and its resolved encodings. Size
    /// bounds come from the profiled range of the size column.
    pub fn from_config(
        config: &'a ChartConfig,
        resolved: &'a ResolvedEncodes,
        dataset_options: &'a DatasetOptionsWithTicks,
    ) -> Self {
        let size_options = resolved.size.as_ref().and_then(|key| {
            let meta = dataset_options.columns.get(key)?;
            Some(SizeOptions {
                key: key.clone(),
                min_value: meta.min?,
                max_value: meta.max?,
            })
        });

        Self {
            dataset_options,
            column_settings: &config.column_settings,
            column_label_formats: &config.column_label_formats,
            x_axis_keys: &resolved.x,
            y_axis_keys: &resolved.y,
            y2_axis_keys: &resolved.y2,
            colors: &config.colors,
            size_options,
            scatter_dot_size: config.scatter_dot_size,
            bar_group_type: config.bar_group_type,
            bar_show_total_at_top: config.bar_show_total_at_top,
            line_group_type: config.line_group_type,
            pie_show_inner_label: config.pie_show_inner_label,
            pie_donut_width: config.pie_donut_width,
            pie_minimum_slice_percentage: config.pie_minimum_slice_percentage,
            trendlines: &config.trendlines,
        }
    }

    pub fn settings(&self, key: &str) -> &'a ColumnSettings {
        settings_for(self.column_settings, key)
    }

    pub fn is_visible(&self, key: &str) -> bool {
        self.settings(key).show
    }

    /// Series label: custom label, then format display name, then the
    /// humanized key.
    pub fn series_label(&self, key: &str) -> String {
        self.settings(key)
            .label
            .clone()
            .unwrap_or_else(|| column_title(self.column_label_formats, key))
    }

    pub fn color(&self, index: usize, key: &str) -> String {
        assign_color(index, self.colors, self.settings(key).color.as_deref())
    }

    fn expected_keys(&self) -> impl Iterator<Item = &'a String> {
        self.y_axis_keys.iter().chain(self.y2_axis_keys.iter())
    }

    fn x_column_type(&self) -> Option<ColumnType> {
        let key = self.x_axis_keys.first()?;
        self.dataset_options.columns.get(key).map(|m| m.column_type)
    }
}

/// Builds the datasets for one chart family.
pub trait SeriesStrategy {
    fn build(&self, props: &SeriesBuilderProps<'_>) -> BuiltSeries;
}

/// The single dispatch point from chart type to strategy.
pub fn strategy_for(chart_type: ChartType) -> &'static dyn SeriesStrategy {
    match chart_type {
        ChartType::Bar => &BarSeries,
        ChartType::Line => &LineSeries,
        ChartType::Scatter => &ScatterSeries,
        ChartType::Pie => &PieSeries,
        ChartType::Combo => &ComboSeries,
    }
}

/// Build every dataset for the chart: one per y/y2 key in key order, then one
/// per active trendline. An empty tick list yields no datasets.
pub fn build_series(chart_type: ChartType, props: &SeriesBuilderProps<'_>) -> SeriesResult<BuiltSeries> {
    validate(props)?;
    if props.dataset_options.point_count() == 0 {
        return Ok(BuiltSeries::default());
    }

    let mut built = strategy_for(chart_type).build(props);
    if chart_type != ChartType::Pie {
        let overlays = trendline_datasets(props, &built.datasets, chart_type);
        built.datasets.extend(overlays);
    }
    tracing::debug!(
        chart = ?chart_type,
        datasets = built.datasets.len(),
        total = built.total.is_some(),
        "built series"
    );
    Ok(built)
}

/// Props must line up with their own key arrays and tick list.
fn validate(props: &SeriesBuilderProps<'_>) -> SeriesResult<()> {
    let options = props.dataset_options;
    let expected = props.y_axis_keys.len() + props.y2_axis_keys.len();
    if options.datasets.len() != expected {
        return Err(SeriesError::DatasetCountMismatch {
            expected,
            actual: options.datasets.len(),
        });
    }

    let points = options.point_count();
    for (dataset, key) in options.datasets.iter().zip(props.expected_keys()) {
        if &dataset.data_key != key {
            return Err(SeriesError::UnknownDatasetKey(dataset.data_key.clone()));
        }
        for actual in [dataset.data.len(), dataset.tooltip_data.len()] {
            if actual != points {
                return Err(SeriesError::PointCountMismatch {
                    dataset: dataset.data_key.clone(),
                    expected: points,
                    actual,
                });
            }
        }
        if let Some(sizes) = &dataset.size_data {
            if sizes.len() != points {
                return Err(SeriesError::SizeCountMismatch {
                    dataset: dataset.data_key.clone(),
                    expected: points,
                    actual: sizes.len(),
                });
            }
        }
    }

    for (name, actual) in [("labels", options.labels.len()), ("xValues", options.x_values.len())] {
        if actual != points {
            return Err(SeriesError::PointCountMismatch {
                dataset: name.to_string(),
                expected: points,
                actual,
            });
        }
    }
    Ok(())
}

// =============================================================================
// Shared helpers
// =============================================================================

/// Points placed on the category axis by formatted x label.
fn category_points(options: &DatasetOptionsWithTicks, values: &[Option<f64>]) -> Vec<DataPoint> {
    options
        .labels
        .iter()
        .zip(values)
        .map(|(label, y)| DataPoint {
            x: AxisValue::Text(label.clone()),
            y: *y,
        })
        .collect()
}

/// Dataset fields shared by every family.
fn base_dataset(
    props: &SeriesBuilderProps<'_>,
    index: usize,
    option: &DatasetOption,
    data: Vec<DataPoint>,
    kind: DatasetKind,
) -> ChartDataset {
    let key = &option.data_key;
    let settings = props.settings(key);
    let categories = &props.dataset_options.categories;
    ChartDataset {
        id: key.clone(),
        label: props.series_label(key),
        y_axis_key: key.clone(),
        y_axis_id: option.axis,
        data,
        color: props.color(index, key),
        colors: Vec::new(),
        tooltip_data: option.tooltip_data.clone(),
        order: index,
        hidden: !settings.show,
        show_data_labels: settings.show_data_labels,
        categories: (!categories.is_empty()).then(|| categories.clone()),
        kind,
    }
}

/// Per-point sum of the visible series on one axis. Nulls count as zero.
fn axis_totals(props: &SeriesBuilderProps<'_>, axis: AxisId) -> Vec<f64> {
    let options = props.dataset_options;
    let mut totals = vec![0.0; options.point_count()];
    for dataset in options
        .datasets
        .iter()
        .filter(|d| d.axis == axis && props.is_visible(&d.data_key))
    {
        for (total, value) in totals.iter_mut().zip(&dataset.data) {
            *total += value.unwrap_or(0.0);
        }
    }
    totals
}

/// Scale values to their share of the per-point total, in percent.
fn normalise_to_percent(values: &[Option<f64>], totals: &[f64]) -> Vec<Option<f64>> {
    values
        .iter()
        .zip(totals)
        .map(|(value, total)| {
            value.map(|v| if *total == 0.0 { 0.0 } else { v * 100.0 / total })
        })
        .collect()
}

/// Trendline overlays, in declaration order. Pie charts never reach here.
fn trendline_datasets(
    props: &SeriesBuilderProps<'_>,
    series: &[ChartDataset],
    chart_type: ChartType,
) -> Vec<ChartDataset> {
    let options = props.dataset_options;
    let positions = trend_positions(props, chart_type);
    let mut out = Vec::new();

    for trendline in props.trendlines.iter().filter(|t| t.show) {
        let Some(option) = options.dataset(&trendline.column_id) else {
            tracing::warn!(
                column = %trendline.column_id,
                "trendline references a column that is not on the y axes"
            );
            continue;
        };
        let Some(source) = series.iter().find(|d| d.y_axis_key == trendline.column_id) else {
            continue;
        };

        let points: Vec<TrendPoint> = positions
            .iter()
            .zip(&option.data)
            .map(|(x, y)| TrendPoint::new(*x, *y))
            .collect();
        let result = compute_trendline(&points, trendline.kind);
        if result.is_empty() {
            tracing::debug!(column = %trendline.column_id, kind = ?trendline.kind, "too few points for trendline");
        }

        let data = source
            .data
            .iter()
            .zip(&result.values)
            .map(|(point, value)| DataPoint {
                x: point.x.clone(),
                y: Some(*value),
            })
            .collect();

        out.push(ChartDataset {
            id: format!("trendline-{}-{}", trendline.kind.slug(), trendline.column_id),
            label: trendline
                .trendline_label
                .clone()
                .unwrap_or_else(|| trendline.kind.default_label().to_string()),
            y_axis_key: trendline.column_id.clone(),
            y_axis_id: option.axis,
            data,
            color: trendline
                .trendline_color
                .clone()
                .unwrap_or_else(|| source.color.clone()),
            colors: Vec::new(),
            tooltip_data: Vec::new(),
            order: series.len() + out.len(),
            hidden: source.hidden,
            show_data_labels: false,
            categories: None,
            kind: DatasetKind::Trendline {
                source_key: trendline.column_id.clone(),
                kind: trendline.kind,
                equation: result.equation,
            },
        });
    }
    out
}

/// x used for fitting: continuous x on line and scatter charts (dates as days
/// since the first point), otherwise the point index.
fn trend_positions(props: &SeriesBuilderProps<'_>, chart_type: ChartType) -> Vec<f64> {
    let options = props.dataset_options;
    let index_positions = || -> Vec<f64> { (0..options.point_count()).map(|i| i as f64).collect() };

    if !matches!(chart_type, ChartType::Line | ChartType::Scatter) {
        return index_positions();
    }
    let Some(xs) = options.x_values.iter().copied().collect::<Option<Vec<f64>>>() else {
        return index_positions();
    };
    if props.x_column_type() == Some(ColumnType::Date) {
        let first = xs.iter().copied().fold(f64::INFINITY, f64::min);
        return xs.iter().map(|x| (x - first) / MS_PER_DAY).collect();
    }
    xs
}
