// Library exports for chartseries

pub mod config;
pub mod data;
pub mod dataset;
pub mod error;
pub mod format;
pub mod memo;
pub mod palette;
pub mod parser;
pub mod scale;
pub mod series;
pub mod trendline;

// Pipeline stages
pub mod ir;
pub mod resolve;

use config::ChartConfig;
use data::RowSet;
use error::SeriesError;
use ir::{ChartOutput, ChartStatus};
use series::SeriesBuilderProps;

/// Build every dataset for one chart from a row set and its configuration.
///
/// Encoding problems do not fail the build: they come back as
/// `ChartStatus::InvalidEncoding` with no datasets. A row set that yields no
/// points is `ChartStatus::NoData`. An `Err` means the stages disagreed with
/// each other and is a bug, not bad input.
pub fn build_chart(rows: &RowSet, config: &ChartConfig) -> Result<ChartOutput, SeriesError> {
    let chart_type = config.selected_chart_type;
    let formats = &config.column_label_formats;

    // A bare `[]` has no column list to resolve against
    if rows.is_empty() && rows.columns.is_empty() {
        return Ok(ChartOutput::empty(ChartStatus::NoData));
    }

    // Phase 1: Profile the columns the chart references
    let referenced = config.encodes.referenced_columns();
    let columns = dataset::profile_columns(rows, &referenced, formats);

    // Phase 2: Resolve encodings
    let resolved = match resolve::resolve_encodes(&config.encodes, &rows.columns, &columns, chart_type) {
        Ok(resolved) => resolved,
        Err(err) => {
            tracing::warn!(error = %err, "chart encoding rejected");
            return Ok(ChartOutput::empty(ChartStatus::InvalidEncoding(err)));
        }
    };

    // Phase 3: Aggregate into dataset options
    let options = dataset::build_dataset_options(rows, columns, &resolved, formats, chart_type);
    let status = if options.point_count() == 0 {
        ChartStatus::NoData
    } else {
        ChartStatus::Ready
    };

    // Phase 4: Series
    let props = SeriesBuilderProps::from_config(config, &resolved, &options);
    let built = series::build_series(chart_type, &props)?;
    tracing::debug!(
        rows = rows.len(),
        points = options.point_count(),
        datasets = built.datasets.len(),
        "chart built"
    );

    Ok(ChartOutput {
        status,
        datasets: built.datasets,
        total: built.total,
        labels: options.labels,
        x_axis_keys: resolved.x,
        y_axis_keys: resolved.y,
        y2_axis_keys: resolved.y2,
        columns: options.columns,
        warnings: resolved.warnings,
    })
}
