use crate::config::TrendlineKind;
use crate::data::ColumnValue;
use crate::error::EncodingError;
use serde::Serialize;
use std::collections::BTreeMap;

// =============================================================================
// Phase 1: Profiling
// =============================================================================

/// Inferred type of a column over its non-null cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    Number,
    Date,
    Text,
    Boolean,
    /// Every cell was null
    Unknown,
}

impl ColumnType {
    pub fn name(self) -> &'static str {
        match self {
            ColumnType::Number => "number",
            ColumnType::Date => "date",
            ColumnType::Text => "text",
            ColumnType::Boolean => "boolean",
            ColumnType::Unknown => "unknown",
        }
    }

    /// Usable where a number is required. All-null columns qualify.
    pub fn is_numeric(self) -> bool {
        matches!(self, ColumnType::Number | ColumnType::Unknown)
    }

    /// Has a continuous position (numbers and dates).
    pub fn is_continuous(self) -> bool {
        matches!(self, ColumnType::Number | ColumnType::Date | ColumnType::Unknown)
    }
}

/// Per-column metadata produced by one pass over the rows.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnMeta {
    #[serde(rename = "type")]
    pub column_type: ColumnType,
    /// Numeric range; epoch milliseconds for dates
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub null_count: usize,
    pub distinct_count: usize,
    /// Distinct tracking stopped at the cap
    pub truncated: bool,
    pub tick_values: Vec<f64>,
    pub formatted_ticks: Vec<String>,
}

// =============================================================================
// Phase 2: Resolution
// =============================================================================

/// Encodings checked against the row set. Keys keep the order the user gave.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ResolvedEncodes {
    pub x: Vec<String>,
    pub y: Vec<String>,
    pub y2: Vec<String>,
    pub category: Vec<String>,
    /// Dropped when the column is not numeric
    pub size: Option<String>,
    pub tooltip: Vec<String>,
    /// Non-fatal problems found while resolving
    pub warnings: Vec<EncodingError>,
}

impl ResolvedEncodes {
    /// y keys then y2 keys, tagged with their axis.
    pub fn series_keys(&self) -> impl Iterator<Item = (&String, AxisId)> {
        self.y
            .iter()
            .map(|k| (k, AxisId::Y))
            .chain(self.y2.iter().map(|k| (k, AxisId::Y2)))
    }
}

// =============================================================================
// Phase 3: Dataset options
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AxisId {
    Y,
    Y2,
}

impl AxisId {
    pub fn as_str(self) -> &'static str {
        match self {
            AxisId::Y => "y",
            AxisId::Y2 => "y2",
        }
    }
}

/// One row of a hover tooltip.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TooltipEntry {
    pub key: String,
    pub label: String,
    pub value: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

/// Aggregated values for one y or y2 key, aligned with the tick list.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetOption {
    pub data_key: String,
    pub axis: AxisId,
    pub data: Vec<Option<f64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size_data: Option<Vec<Option<f64>>>,
    pub tooltip_data: Vec<Vec<TooltipEntry>>,
}

/// Everything the series builder needs from the data. Recomputed only when
/// the rows or the column configuration change.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetOptionsWithTicks {
    pub datasets: Vec<DatasetOption>,
    /// x tuple per point
    pub ticks: Vec<Vec<ColumnValue>>,
    pub ticks_key: Vec<String>,
    /// Formatted x label per point
    pub labels: Vec<String>,
    /// Numeric x per point (numbers, or dates as epoch ms) when x is continuous
    pub x_values: Vec<Option<f64>>,
    /// Category label per point when a category is encoded
    pub categories: Vec<Option<String>>,
    pub columns: BTreeMap<String, ColumnMeta>,
}

impl DatasetOptionsWithTicks {
    pub fn point_count(&self) -> usize {
        self.ticks.len()
    }

    pub fn dataset(&self, key: &str) -> Option<&DatasetOption> {
        self.datasets.iter().find(|d| d.data_key == key)
    }
}

// =============================================================================
// Phase 4: Series
// =============================================================================

/// Position of a point along x.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum AxisValue {
    Number(f64),
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DataPoint {
    pub x: AxisValue,
    pub y: Option<f64>,
}

/// Chart-family specific fields of a dataset.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum DatasetKind {
    Bar {
        stack: String,
        /// Slot among visible grouped bars; unset when stacked
        #[serde(skip_serializing_if = "Option::is_none")]
        offset: Option<usize>,
        border_radius: f64,
        percentage: bool,
    },
    Line {
        #[serde(skip_serializing_if = "Option::is_none")]
        stack: Option<String>,
        fill: bool,
        tension: f64,
        stepped: bool,
        border_width: f64,
        point_radius: f64,
    },
    Scatter {
        point_radius: Vec<f64>,
    },
    Pie {
        radius: f64,
        inner_radius: f64,
        #[serde(skip_serializing_if = "Option::is_none")]
        percentages: Option<Vec<f64>>,
    },
    Trendline {
        source_key: String,
        kind: TrendlineKind,
        #[serde(skip_serializing_if = "Option::is_none")]
        equation: Option<String>,
    },
    /// Label-only series drawn above a stack
    StackTotal {
        stack: String,
    },
}

/// One dataset handed to the rendering library.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartDataset {
    pub id: String,
    pub label: String,
    pub y_axis_key: String,
    pub y_axis_id: AxisId,
    pub data: Vec<DataPoint>,
    pub color: String,
    /// Per-slice colors (pie)
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub colors: Vec<String>,
    pub tooltip_data: Vec<Vec<TooltipEntry>>,
    pub order: usize,
    pub hidden: bool,
    pub show_data_labels: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub categories: Option<Vec<Option<String>>>,
    #[serde(flatten)]
    pub kind: DatasetKind,
}

/// Series for one chart: one dataset per y/y2 key then trendlines.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct BuiltSeries {
    pub datasets: Vec<ChartDataset>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<ChartDataset>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", content = "error", rename_all = "camelCase")]
pub enum ChartStatus {
    Ready,
    NoData,
    InvalidEncoding(EncodingError),
}

/// Result of [`crate::build_chart`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartOutput {
    pub status: ChartStatus,
    pub datasets: Vec<ChartDataset>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<ChartDataset>,
    pub labels: Vec<String>,
    pub x_axis_keys: Vec<String>,
    pub y_axis_keys: Vec<String>,
    pub y2_axis_keys: Vec<String>,
    pub columns: BTreeMap<String, ColumnMeta>,
    pub warnings: Vec<EncodingError>,
}

impl ChartOutput {
    /// Empty output carrying only a status.
    pub fn empty(status: ChartStatus) -> Self {
        Self {
            status,
            datasets: Vec::new(),
            total: None,
            labels: Vec::new(),
            x_axis_keys: Vec::new(),
            y_axis_keys: Vec::new(),
            y2_axis_keys: Vec::new(),
            columns: BTreeMap::new(),
            warnings: Vec::new(),
        }
    }
}
