//! Chart configuration as authored by the user.
//!
//! Everything here deserializes from the camelCase JSON the editing UI saves.
//! Unknown keys are ignored and missing keys fall back to defaults, so configs
//! saved by older clients keep loading.

use anyhow::{Context, Result};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

pub type ColumnSettingsMap = BTreeMap<String, ColumnSettings>;
pub type ColumnLabelFormats = BTreeMap<String, ColumnLabelFormat>;

static DEFAULT_FORMAT: ColumnLabelFormat = ColumnLabelFormat::DEFAULT;
static DEFAULT_SETTINGS: ColumnSettings = ColumnSettings::DEFAULT;

/// Look up a column's format, falling back to [`ColumnLabelFormat::DEFAULT`].
pub fn format_for<'a>(formats: &'a ColumnLabelFormats, key: &str) -> &'a ColumnLabelFormat {
    formats.get(key).unwrap_or(&DEFAULT_FORMAT)
}

/// Look up a column's settings, falling back to [`ColumnSettings::DEFAULT`].
pub fn settings_for<'a>(settings: &'a ColumnSettingsMap, key: &str) -> &'a ColumnSettings {
    settings.get(key).unwrap_or(&DEFAULT_SETTINGS)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ChartType {
    #[default]
    Bar,
    Line,
    Scatter,
    Pie,
    Combo,
}

/// Assignment of columns to chart roles.
#[derive(Debug, Clone, PartialEq, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct ChartEncodes {
    pub x: Vec<String>,
    pub y: Vec<String>,
    pub y2: Vec<String>,
    #[serde(alias = "group")]
    pub category: Vec<String>,
    #[serde(deserialize_with = "one_or_first")]
    pub size: Option<String>,
    pub tooltip: Option<Vec<String>>,
}

impl ChartEncodes {
    /// Every column named by any role, deduplicated, in role order.
    pub fn referenced_columns(&self) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();
        let roles = self
            .x
            .iter()
            .chain(&self.y)
            .chain(&self.y2)
            .chain(&self.category)
            .chain(self.size.iter())
            .chain(self.tooltip.iter().flatten());
        for key in roles {
            if !out.contains(key) {
                out.push(key.clone());
            }
        }
        out
    }
}

/// `size` was historically saved as a one-element array.
fn one_or_first<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }

    Ok(match Option::<OneOrMany>::deserialize(deserializer)? {
        Some(OneOrMany::One(s)) => Some(s),
        Some(OneOrMany::Many(v)) => v.into_iter().next(),
        None => None,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
pub enum BarGroupType {
    #[serde(rename = "stack", alias = "stacked")]
    Stack,
    #[default]
    #[serde(rename = "group", alias = "grouped")]
    Group,
    #[serde(rename = "percentage-stack")]
    PercentageStack,
}

impl BarGroupType {
    pub fn is_stacked(self) -> bool {
        matches!(self, BarGroupType::Stack | BarGroupType::PercentageStack)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub enum LineGroupType {
    #[serde(rename = "stack", alias = "stacked")]
    Stack,
    #[serde(rename = "percentage-stack")]
    PercentageStack,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LineType {
    #[default]
    Normal,
    Smooth,
    Step,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LineStyle {
    #[default]
    Line,
    Area,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnVisualization {
    Bar,
    Line,
    Dot,
}

/// Per-column display configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ColumnSettings {
    /// Hidden columns still emit a series so colors and legend order hold.
    pub show: bool,
    pub label: Option<String>,
    pub color: Option<String>,
    pub column_visualization: Option<ColumnVisualization>,
    pub show_data_labels: bool,
    pub show_data_labels_as_percentage: bool,
    pub bar_roundness: f64,
    pub line_type: LineType,
    pub line_width: f64,
    pub line_style: LineStyle,
    pub line_symbol_size: f64,
}

impl ColumnSettings {
    pub const DEFAULT: ColumnSettings = ColumnSettings {
        show: true,
        label: None,
        color: None,
        column_visualization: None,
        show_data_labels: false,
        show_data_labels_as_percentage: false,
        bar_roundness: 8.0,
        line_type: LineType::Normal,
        line_width: 2.0,
        line_style: LineStyle::Line,
        line_symbol_size: 0.0,
    };
}

impl Default for ColumnSettings {
    fn default() -> Self {
        Self::DEFAULT
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum FormatStyle {
    #[default]
    Number,
    Currency,
    Percent,
    Date,
    String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NumberConversion {
    DayOfWeek,
    MonthOfYear,
    Quarter,
}

/// Replacement for missing cells: a number joins aggregates, a string is
/// only a display label.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum MissingReplacement {
    Number(f64),
    Text(String),
}

/// Per-column label format.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ColumnLabelFormat {
    #[serde(alias = "kind")]
    pub style: FormatStyle,
    /// BCP-47 tag, `en-US` when unset.
    pub locale: Option<String>,
    pub minimum_fraction_digits: u32,
    pub maximum_fraction_digits: u32,
    /// Shorthand that pins both fraction digit bounds.
    pub decimals: Option<u32>,
    #[serde(alias = "currencyCode")]
    pub currency: Option<String>,
    pub date_format: Option<String>,
    pub display_name: Option<String>,
    pub prefix: Option<String>,
    pub suffix: Option<String>,
    pub multiplier: f64,
    pub use_grouping: bool,
    pub compact_numbers: bool,
    pub convert_number_to: Option<NumberConversion>,
    pub replace_missing_data_with: Option<MissingReplacement>,
}

impl ColumnLabelFormat {
    pub const DEFAULT: ColumnLabelFormat = ColumnLabelFormat {
        style: FormatStyle::Number,
        locale: None,
        minimum_fraction_digits: 0,
        maximum_fraction_digits: 2,
        decimals: None,
        currency: None,
        date_format: None,
        display_name: None,
        prefix: None,
        suffix: None,
        multiplier: 1.0,
        use_grouping: true,
        compact_numbers: false,
        convert_number_to: None,
        replace_missing_data_with: None,
    };

    pub fn with_style(style: FormatStyle) -> Self {
        Self { style, ..Self::DEFAULT }
    }

    /// Effective `(min, max)` fraction digits.
    pub fn fraction_digits(&self) -> (usize, usize) {
        match self.decimals {
            Some(d) => (d as usize, d as usize),
            None => {
                let max = self.maximum_fraction_digits as usize;
                let min = (self.minimum_fraction_digits as usize).min(max);
                (min, max)
            }
        }
    }

    /// Numeric stand-in for a missing cell, if any.
    pub fn missing_number(&self) -> Option<f64> {
        match &self.replace_missing_data_with {
            Some(MissingReplacement::Number(n)) => Some(*n),
            Some(MissingReplacement::Text(s)) => s.trim().parse::<f64>().ok(),
            None => None,
        }
    }
}

impl Default for ColumnLabelFormat {
    fn default() -> Self {
        Self::DEFAULT
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendlineKind {
    #[serde(alias = "linear_regression")]
    Linear,
    Average,
    Min,
    Max,
    Median,
    ExponentialRegression,
    LogarithmicRegression,
    PolynomialRegression,
}

impl TrendlineKind {
    pub fn slug(self) -> &'static str {
        match self {
            TrendlineKind::Linear => "linear",
            TrendlineKind::Average => "average",
            TrendlineKind::Min => "min",
            TrendlineKind::Max => "max",
            TrendlineKind::Median => "median",
            TrendlineKind::ExponentialRegression => "exponential",
            TrendlineKind::LogarithmicRegression => "logarithmic",
            TrendlineKind::PolynomialRegression => "polynomial",
        }
    }

    pub fn default_label(self) -> &'static str {
        match self {
            TrendlineKind::Linear => "Linear trend",
            TrendlineKind::Average => "Average",
            TrendlineKind::Min => "Min",
            TrendlineKind::Max => "Max",
            TrendlineKind::Median => "Median",
            TrendlineKind::ExponentialRegression => "Exponential trend",
            TrendlineKind::LogarithmicRegression => "Logarithmic trend",
            TrendlineKind::PolynomialRegression => "Polynomial trend",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trendline {
    #[serde(rename = "type")]
    pub kind: TrendlineKind,
    pub column_id: String,
    #[serde(default = "default_true")]
    pub show: bool,
    #[serde(default)]
    pub trendline_label: Option<String>,
    #[serde(default)]
    pub trendline_color: Option<String>,
}

impl Trendline {
    pub fn new(kind: TrendlineKind, column_id: impl Into<String>) -> Self {
        Self {
            kind,
            column_id: column_id.into(),
            show: true,
            trendline_label: None,
            trendline_color: None,
        }
    }
}

/// Complete chart configuration for one chart.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartConfig {
    #[serde(default)]
    pub selected_chart_type: ChartType,
    #[serde(default)]
    pub encodes: ChartEncodes,
    #[serde(default)]
    pub column_settings: ColumnSettingsMap,
    #[serde(default)]
    pub column_label_formats: ColumnLabelFormats,
    #[serde(default)]
    pub colors: Vec<String>,
    #[serde(default)]
    pub bar_group_type: BarGroupType,
    #[serde(default)]
    pub bar_show_total_at_top: bool,
    #[serde(default)]
    pub line_group_type: Option<LineGroupType>,
    #[serde(default = "default_scatter_dot_size")]
    pub scatter_dot_size: [f64; 2],
    #[serde(default = "default_true")]
    pub pie_show_inner_label: bool,
    #[serde(default)]
    pub pie_donut_width: f64,
    #[serde(default)]
    pub pie_minimum_slice_percentage: f64,
    #[serde(default)]
    pub trendlines: Vec<Trendline>,
}

fn default_true() -> bool { true }
fn default_scatter_dot_size() -> [f64; 2] { [3.0, 15.0] }

impl Default for ChartConfig {
    fn default() -> Self {
        Self {
            selected_chart_type: ChartType::Bar,
            encodes: ChartEncodes::default(),
            column_settings: ColumnSettingsMap::new(),
            column_label_formats: ColumnLabelFormats::new(),
            colors: Vec::new(),
            bar_group_type: BarGroupType::Group,
            bar_show_total_at_top: false,
            line_group_type: None,
            scatter_dot_size: default_scatter_dot_size(),
            pie_show_inner_label: true,
            pie_donut_width: 0.0,
            pie_minimum_slice_percentage: 0.0,
            trendlines: Vec::new(),
        }
    }
}

impl ChartConfig {
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).context("Invalid chart configuration")
    }
}
