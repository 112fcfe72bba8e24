//! Dataset option building.
//!
//! Two passes over the rows: [`profile_columns`] infers each referenced
//! column's type, range and tick candidates, then [`build_dataset_options`]
//! aggregates the rows into one value list per y/y2 key, aligned with a single
//! tick list.

use crate::config::{format_for, ChartType, ColumnLabelFormat, ColumnLabelFormats, FormatStyle};
use crate::data::{parse_date_text, ColumnValue, Row, RowSet};
use crate::format::{format_display, humanize_key};
use crate::ir::{
    AxisId, ColumnMeta, ColumnType, DatasetOption, DatasetOptionsWithTicks, ResolvedEncodes,
    TooltipEntry,
};
use crate::scale::{nice_ticks, DEFAULT_TICK_COUNT};
use std::borrow::Cow;
use std::collections::{BTreeMap, HashMap, HashSet};

/// Cap on distinct values tracked per column
pub const MAX_DISTINCT_VALUES: usize = 2000;

static NULL_VALUE: ColumnValue = ColumnValue::Null;

fn cell<'a>(row: &'a Row, key: &str) -> &'a ColumnValue {
    row.get(key).unwrap_or(&NULL_VALUE)
}

/// The column's format, defaulting to a date style for date columns.
pub fn column_format<'a>(
    formats: &'a ColumnLabelFormats,
    key: &str,
    column_type: ColumnType,
) -> Cow<'a, ColumnLabelFormat> {
    match formats.get(key) {
        Some(format) => Cow::Borrowed(format),
        None if column_type == ColumnType::Date => {
            Cow::Owned(ColumnLabelFormat::with_style(FormatStyle::Date))
        }
        None => Cow::Borrowed(format_for(formats, key)),
    }
}

/// Human title for a column: its format's display name or the humanized key.
pub fn column_title(formats: &ColumnLabelFormats, key: &str) -> String {
    format_for(formats, key)
        .display_name
        .clone()
        .unwrap_or_else(|| humanize_key(key))
}

// =============================================================================
// Column profiling
// =============================================================================

#[derive(Debug)]
struct ColumnProfile {
    numbers: usize,
    dates: usize,
    texts: usize,
    bools: usize,
    nulls: usize,
    number_range: (f64, f64),
    date_range: (f64, f64),
    distinct: Vec<ColumnValue>,
    seen: HashSet<String>,
    truncated: bool,
}

impl ColumnProfile {
    fn new() -> Self {
        Self {
            numbers: 0,
            dates: 0,
            texts: 0,
            bools: 0,
            nulls: 0,
            number_range: (f64::INFINITY, f64::NEG_INFINITY),
            date_range: (f64::INFINITY, f64::NEG_INFINITY),
            distinct: Vec::new(),
            seen: HashSet::new(),
            truncated: false,
        }
    }

    fn observe(&mut self, value: &ColumnValue) {
        match value {
            ColumnValue::Null => {
                self.nulls += 1;
                return;
            }
            ColumnValue::Bool(_) => self.bools += 1,
            ColumnValue::Number(n) => self.add_number(*n),
            ColumnValue::Date(d) => self.add_date(d.and_utc().timestamp_millis() as f64),
            ColumnValue::Text(s) => {
                if let Some(n) = value.as_f64() {
                    self.add_number(n);
                } else if let Some(d) = parse_date_text(s) {
                    self.add_date(d.and_utc().timestamp_millis() as f64);
                } else {
                    self.texts += 1;
                }
            }
        }

        if self.truncated {
            return;
        }
        let key = value.group_key();
        if self.seen.contains(&key) {
            return;
        }
        if self.seen.len() >= MAX_DISTINCT_VALUES {
            self.truncated = true;
            return;
        }
        self.seen.insert(key);
        self.distinct.push(value.clone());
    }

    fn add_number(&mut self, n: f64) {
        self.numbers += 1;
        self.number_range = (self.number_range.0.min(n), self.number_range.1.max(n));
    }

    fn add_date(&mut self, ms: f64) {
        self.dates += 1;
        self.date_range = (self.date_range.0.min(ms), self.date_range.1.max(ms));
    }

    fn column_type(&self) -> ColumnType {
        let non_null = self.numbers + self.dates + self.texts + self.bools;
        if non_null == 0 {
            ColumnType::Unknown
        } else if self.numbers == non_null {
            ColumnType::Number
        } else if self.dates == non_null {
            ColumnType::Date
        } else if self.bools == non_null {
            ColumnType::Boolean
        } else {
            ColumnType::Text
        }
    }

    fn finish(self, key: &str, formats: &ColumnLabelFormats) -> ColumnMeta {
        let column_type = self.column_type();
        let format = column_format(formats, key, column_type);
        let range = match column_type {
            ColumnType::Number => Some(self.number_range),
            ColumnType::Date => Some(self.date_range),
            _ => None,
        };

        let (tick_values, formatted_ticks) = match (column_type, range) {
            (ColumnType::Number, Some((min, max))) => {
                let ticks = nice_ticks(min, max, DEFAULT_TICK_COUNT);
                let labels = ticks
                    .iter()
                    .map(|t| format_display(&ColumnValue::Number(*t), &format))
                    .collect();
                (ticks, labels)
            }
            (ColumnType::Date, _) => {
                let mut dated: Vec<(f64, &ColumnValue)> = self
                    .distinct
                    .iter()
                    .filter_map(|v| v.as_date().map(|d| (d.and_utc().timestamp_millis() as f64, v)))
                    .collect();
                dated.sort_by(|a, b| a.0.total_cmp(&b.0));
                let labels = dated.iter().map(|(_, v)| format_display(v, &format)).collect();
                (Vec::new(), labels)
            }
            _ => {
                let labels = self.distinct.iter().map(|v| format_display(v, &format)).collect();
                (Vec::new(), labels)
            }
        };

        if self.truncated {
            tracing::warn!(
                column = key,
                cap = MAX_DISTINCT_VALUES,
                "high-cardinality column, distinct values truncated"
            );
        }

        ColumnMeta {
            column_type,
            min: range.map(|r| r.0),
            max: range.map(|r| r.1),
            null_count: self.nulls,
            distinct_count: self.seen.len(),
            truncated: self.truncated,
            tick_values,
            formatted_ticks,
        }
    }
}

/// Profile the given columns in a single pass over the rows. Columns missing
/// from the row set are skipped.
pub fn profile_columns(
    rows: &RowSet,
    columns: &[String],
    formats: &ColumnLabelFormats,
) -> BTreeMap<String, ColumnMeta> {
    let present: Vec<&String> = columns.iter().filter(|c| rows.has_column(c)).collect();
    let mut profiles: Vec<ColumnProfile> = present.iter().map(|_| ColumnProfile::new()).collect();

    for row in &rows.rows {
        for (key, profile) in present.iter().zip(profiles.iter_mut()) {
            profile.observe(cell(row, key));
        }
    }

    present
        .into_iter()
        .zip(profiles)
        .map(|(key, profile)| (key.clone(), profile.finish(key, formats)))
        .collect()
}

// =============================================================================
// Dataset options
// =============================================================================

/// Shared lookups for one dataset-option build.
struct Builder<'a> {
    resolved: &'a ResolvedEncodes,
    formats: &'a ColumnLabelFormats,
    columns: &'a BTreeMap<String, ColumnMeta>,
    series: Vec<(&'a String, AxisId)>,
}

impl<'a> Builder<'a> {
    fn column_type(&self, key: &str) -> ColumnType {
        self.columns
            .get(key)
            .map(|m| m.column_type)
            .unwrap_or(ColumnType::Unknown)
    }

    fn format(&self, key: &str) -> Cow<'a, ColumnLabelFormat> {
        column_format(self.formats, key, self.column_type(key))
    }

    fn display(&self, key: &str, value: &ColumnValue) -> String {
        format_display(value, &self.format(key))
    }

    /// Numeric value of a cell, with the column's missing-data replacement.
    fn numeric(&self, row: &Row, key: &str) -> Option<f64> {
        cell(row, key)
            .as_f64()
            .or_else(|| format_for(self.formats, key).missing_number())
    }

    /// Continuous x position of a value: numbers as-is, dates as epoch ms.
    fn position(&self, key: &str, value: &ColumnValue) -> Option<f64> {
        match self.column_type(key) {
            ColumnType::Number | ColumnType::Unknown => value.as_f64(),
            ColumnType::Date => value.as_date().map(|d| d.and_utc().timestamp_millis() as f64),
            _ => None,
        }
    }

    fn x_label(&self, tuple: &[ColumnValue]) -> String {
        let has_date = self
            .resolved
            .x
            .iter()
            .any(|k| self.column_type(k) == ColumnType::Date || self.format(k).style == FormatStyle::Date);
        let separator = if has_date { " " } else { " | " };
        self.resolved
            .x
            .iter()
            .zip(tuple)
            .map(|(k, v)| self.display(k, v))
            .collect::<Vec<_>>()
            .join(separator)
    }

    fn category_label(&self, row: &Row) -> Option<String> {
        if self.resolved.category.is_empty() {
            return None;
        }
        Some(
            self.resolved
                .category
                .iter()
                .map(|k| self.display(k, cell(row, k)))
                .collect::<Vec<_>>()
                .join(", "),
        )
    }

    fn entry(&self, key: &str, value: String, category: Option<String>) -> TooltipEntry {
        TooltipEntry {
            key: key.to_string(),
            label: column_title(self.formats, key),
            value,
            category,
        }
    }

    /// Tooltip rows from the explicit tooltip keys. y2 series only show their
    /// own metric; y series never show y2 metrics.
    fn explicit_tooltip(
        &self,
        row: &Row,
        metric: &str,
        axis: AxisId,
        category: Option<&String>,
    ) -> Vec<TooltipEntry> {
        if axis == AxisId::Y2 {
            return vec![self.entry(metric, self.display(metric, cell(row, metric)), None)];
        }
        self.resolved
            .tooltip
            .iter()
            .filter(|k| !self.resolved.y2.contains(k))
            .map(|k| {
                let category = if self.resolved.category.contains(k) {
                    category.cloned()
                } else {
                    None
                };
                self.entry(k, self.display(k, cell(row, k)), category)
            })
            .collect()
    }
}

struct PointGroup {
    tuple: Vec<ColumnValue>,
    first_row: usize,
    categories: Vec<String>,
    sums: Vec<Option<f64>>,
}

/// Aggregate rows into per-series values aligned with one tick list.
///
/// Bar, line, pie and combo charts group rows by the x tuple in order of first
/// appearance and sum each y/y2 key per group; a group with no numeric value
/// stays null. Scatter charts keep one point per row with a usable x.
pub fn build_dataset_options(
    rows: &RowSet,
    columns: BTreeMap<String, ColumnMeta>,
    resolved: &ResolvedEncodes,
    formats: &ColumnLabelFormats,
    chart_type: ChartType,
) -> DatasetOptionsWithTicks {
    let builder = Builder {
        resolved,
        formats,
        columns: &columns,
        series: resolved.series_keys().collect(),
    };

    let mut options = match chart_type {
        ChartType::Scatter => scatter_options(&builder, rows),
        _ => grouped_options(&builder, rows),
    };

    tracing::debug!(
        points = options.point_count(),
        datasets = options.datasets.len(),
        "built dataset options"
    );
    options.ticks_key = resolved.x.clone();
    options.columns = columns;
    options
}

fn grouped_options(builder: &Builder<'_>, rows: &RowSet) -> DatasetOptionsWithTicks {
    let resolved = builder.resolved;
    let mut groups: Vec<PointGroup> = Vec::new();
    let mut index: HashMap<Vec<String>, usize> = HashMap::new();

    for (row_idx, row) in rows.rows.iter().enumerate() {
        let tuple: Vec<ColumnValue> = resolved.x.iter().map(|k| cell(row, k).clone()).collect();
        let group_key: Vec<String> = tuple.iter().map(ColumnValue::group_key).collect();
        let slot = *index.entry(group_key).or_insert_with(|| {
            groups.push(PointGroup {
                tuple,
                first_row: row_idx,
                categories: Vec::new(),
                sums: vec![None; builder.series.len()],
            });
            groups.len() - 1
        });

        let group = &mut groups[slot];
        for (i, (key, _)) in builder.series.iter().enumerate() {
            if let Some(v) = builder.numeric(row, key) {
                group.sums[i] = Some(group.sums[i].unwrap_or(0.0) + v);
            }
        }
        if let Some(label) = builder.category_label(row) {
            if !group.categories.contains(&label) {
                group.categories.push(label);
            }
        }
    }

    let continuous_x = resolved.x.len() == 1 && builder.column_type(&resolved.x[0]).is_continuous();
    let categories: Vec<Option<String>> = if resolved.category.is_empty() {
        Vec::new()
    } else {
        groups.iter().map(|g| Some(g.categories.join(", "))).collect()
    };

    let datasets = builder
        .series
        .iter()
        .enumerate()
        .map(|(i, (key, axis))| {
            let data: Vec<Option<f64>> = groups.iter().map(|g| g.sums[i]).collect();
            let tooltip_data = groups
                .iter()
                .zip(&data)
                .enumerate()
                .map(|(point, (group, value))| {
                    let category = categories.get(point).and_then(|c| c.as_ref());
                    if resolved.tooltip.is_empty() {
                        let shown = value.map(ColumnValue::Number).unwrap_or(ColumnValue::Null);
                        vec![builder.entry(key, builder.display(key, &shown), category.cloned())]
                    } else {
                        builder.explicit_tooltip(&rows.rows[group.first_row], key, *axis, category)
                    }
                })
                .collect();
            DatasetOption {
                data_key: (*key).clone(),
                axis: *axis,
                data,
                size_data: None,
                tooltip_data,
            }
        })
        .collect();

    DatasetOptionsWithTicks {
        datasets,
        labels: groups.iter().map(|g| builder.x_label(&g.tuple)).collect(),
        x_values: groups
            .iter()
            .map(|g| if continuous_x { builder.position(&resolved.x[0], &g.tuple[0]) } else { None })
            .collect(),
        ticks: groups.into_iter().map(|g| g.tuple).collect(),
        categories,
        ..Default::default()
    }
}

fn scatter_options(builder: &Builder<'_>, rows: &RowSet) -> DatasetOptionsWithTicks {
    let resolved = builder.resolved;
    let size_key = resolved.size.as_deref();
    let mut options = DatasetOptionsWithTicks::default();
    let mut kept: Vec<&Row> = Vec::new();

    for row in &rows.rows {
        let tuple: Vec<ColumnValue> = resolved.x.iter().map(|k| cell(row, k).clone()).collect();
        if tuple.iter().any(ColumnValue::is_null) {
            continue;
        }
        let Some(position) = resolved.x.first().and_then(|k| builder.position(k, &tuple[0])) else {
            continue;
        };
        options.labels.push(builder.x_label(&tuple));
        options.x_values.push(Some(position));
        options.ticks.push(tuple);
        if let Some(label) = builder.category_label(row) {
            options.categories.push(Some(label));
        }
        kept.push(row);
    }

    options.datasets = builder
        .series
        .iter()
        .map(|(key, axis)| {
            let tooltip_data = kept
                .iter()
                .enumerate()
                .map(|(point, row)| {
                    let category = options.categories.get(point).and_then(|c| c.as_ref());
                    if !resolved.tooltip.is_empty() {
                        return builder.explicit_tooltip(row, key, *axis, category);
                    }
                    let mut entries: Vec<TooltipEntry> = resolved
                        .x
                        .iter()
                        .map(|k| builder.entry(k, builder.display(k, cell(row, k)), None))
                        .collect();
                    entries.push(builder.entry(key, builder.display(key, cell(row, key)), category.cloned()));
                    if let Some(size) = size_key {
                        entries.push(builder.entry(size, builder.display(size, cell(row, size)), None));
                    }
                    entries
                })
                .collect();
            DatasetOption {
                data_key: (*key).clone(),
                axis: *axis,
                data: kept.iter().map(|row| builder.numeric(row, key)).collect(),
                size_data: size_key.map(|s| kept.iter().map(|row| builder.numeric(row, s)).collect()),
                tooltip_data,
            }
        })
        .collect();

    options
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MissingReplacement;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn rows(value: serde_json::Value) -> RowSet {
        RowSet::from_json(&value).unwrap()
    }

    fn keys(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn resolved(x: &[&str], y: &[&str]) -> ResolvedEncodes {
        ResolvedEncodes {
            x: keys(x),
            y: keys(y),
            ..Default::default()
        }
    }

    fn build(data: &RowSet, enc: &ResolvedEncodes, chart: ChartType) -> DatasetOptionsWithTicks {
        let formats = ColumnLabelFormats::new();
        let meta = profile_columns(data, &data.columns, &formats);
        build_dataset_options(data, meta, enc, &formats, chart)
    }

    #[test]
    fn test_profile_types_and_ranges() {
        let data = rows(json!([
            {"m": 3, "d": "2024-01-02", "t": "a", "b": true, "n": null},
            {"m": -1, "d": "2024-01-01", "t": "b", "b": false, "n": null},
        ]));
        let meta = profile_columns(&data, &data.columns, &ColumnLabelFormats::new());
        assert_eq!(meta["m"].column_type, ColumnType::Number);
        assert_eq!(meta["m"].min, Some(-1.0));
        assert_eq!(meta["m"].max, Some(3.0));
        assert_eq!(meta["d"].column_type, ColumnType::Date);
        assert_eq!(meta["t"].column_type, ColumnType::Text);
        assert_eq!(meta["t"].formatted_ticks, vec!["a", "b"]);
        assert_eq!(meta["b"].column_type, ColumnType::Boolean);
        assert_eq!(meta["n"].column_type, ColumnType::Unknown);
        assert_eq!(meta["n"].null_count, 2);
        assert_eq!(meta["d"].formatted_ticks, vec!["January 1, 2024", "January 2, 2024"]);
    }

    #[test]
    fn test_profile_ticks_in_range() {
        let data = rows(json!([{"m": 3}, {"m": 97}]));
        let meta = profile_columns(&data, &data.columns, &ColumnLabelFormats::new());
        assert_eq!(meta["m"].tick_values, vec![20.0, 40.0, 60.0, 80.0]);
        assert_eq!(meta["m"].formatted_ticks, vec!["20", "40", "60", "80"]);
    }

    #[test]
    fn test_profile_distinct_cap() {
        let many: Vec<serde_json::Value> =
            (0..MAX_DISTINCT_VALUES + 10).map(|i| json!({"t": format!("v{}", i)})).collect();
        let data = rows(serde_json::Value::Array(many));
        let meta = profile_columns(&data, &data.columns, &ColumnLabelFormats::new());
        assert!(meta["t"].truncated);
        assert_eq!(meta["t"].distinct_count, MAX_DISTINCT_VALUES);
        assert_eq!(meta["t"].formatted_ticks.len(), MAX_DISTINCT_VALUES);
    }

    #[test]
    fn test_group_and_sum_in_first_appearance_order() {
        let data = rows(json!([
            {"cat": "b", "m": 1},
            {"cat": "a", "m": 2},
            {"cat": "b", "m": 4},
        ]));
        let options = build(&data, &resolved(&["cat"], &["m"]), ChartType::Bar);
        assert_eq!(options.labels, vec!["b", "a"]);
        assert_eq!(options.datasets.len(), 1);
        assert_eq!(options.datasets[0].data, vec![Some(5.0), Some(2.0)]);
        assert_eq!(options.ticks_key, vec!["cat"]);
        assert_eq!(options.x_values, vec![None, None]);
    }

    #[test]
    fn test_null_group_stays_null_unless_replaced() {
        let data = rows(json!([{"cat": "a", "m": null}, {"cat": "b", "m": 2}]));
        let enc = resolved(&["cat"], &["m"]);
        let options = build(&data, &enc, ChartType::Bar);
        assert_eq!(options.datasets[0].data, vec![None, Some(2.0)]);

        let mut formats = ColumnLabelFormats::new();
        formats.insert(
            "m".to_string(),
            ColumnLabelFormat {
                replace_missing_data_with: Some(MissingReplacement::Number(0.0)),
                ..ColumnLabelFormat::DEFAULT
            },
        );
        let meta = profile_columns(&data, &data.columns, &formats);
        let options = build_dataset_options(&data, meta, &enc, &formats, ChartType::Bar);
        assert_eq!(options.datasets[0].data, vec![Some(0.0), Some(2.0)]);
    }

    #[test]
    fn test_multi_key_labels() {
        let data = rows(json!([{"r": "N", "p": "x", "m": 1}]));
        let options = build(&data, &resolved(&["r", "p"], &["m"]), ChartType::Line);
        assert_eq!(options.labels, vec!["N | x"]);
    }

    #[test]
    fn test_categories_and_default_tooltips() {
        let data = rows(json!([
            {"cat": "a", "g": "g1", "m": 1},
            {"cat": "a", "g": "g2", "m": 2},
        ]));
        let enc = ResolvedEncodes {
            category: keys(&["g"]),
            ..resolved(&["cat"], &["m"])
        };
        let options = build(&data, &enc, ChartType::Bar);
        assert_eq!(options.categories, vec![Some("g1, g2".to_string())]);
        let tip = &options.datasets[0].tooltip_data[0][0];
        assert_eq!(tip.key, "m");
        assert_eq!(tip.label, "M");
        assert_eq!(tip.value, "3");
        assert_eq!(tip.category.as_deref(), Some("g1, g2"));
    }

    #[test]
    fn test_explicit_tooltips_respect_y2() {
        let data = rows(json!([{"cat": "a", "m": 1, "n": 7, "note": "hi"}]));
        let enc = ResolvedEncodes {
            y2: keys(&["n"]),
            tooltip: keys(&["note", "m", "n"]),
            ..resolved(&["cat"], &["m"])
        };
        let options = build(&data, &enc, ChartType::Bar);
        let y_keys: Vec<&str> = options.datasets[0].tooltip_data[0].iter().map(|t| t.key.as_str()).collect();
        assert_eq!(y_keys, vec!["note", "m"]);
        let y2_keys: Vec<&str> = options.datasets[1].tooltip_data[0].iter().map(|t| t.key.as_str()).collect();
        assert_eq!(y2_keys, vec!["n"]);
        assert_eq!(options.datasets[1].axis, AxisId::Y2);
    }

    #[test]
    fn test_scatter_points_per_row() {
        let data = rows(json!([
            {"x": 1, "y": 10, "s": 5},
            {"x": null, "y": 20, "s": 1},
            {"x": 3, "y": 30, "s": null},
        ]));
        let enc = ResolvedEncodes {
            size: Some("s".to_string()),
            ..resolved(&["x"], &["y"])
        };
        let options = build(&data, &enc, ChartType::Scatter);
        assert_eq!(options.x_values, vec![Some(1.0), Some(3.0)]);
        let ds = &options.datasets[0];
        assert_eq!(ds.data, vec![Some(10.0), Some(30.0)]);
        assert_eq!(ds.size_data, Some(vec![Some(5.0), None]));
        let tip_keys: Vec<&str> = ds.tooltip_data[0].iter().map(|t| t.key.as_str()).collect();
        assert_eq!(tip_keys, vec!["x", "y", "s"]);
    }

    #[test]
    fn test_continuous_x_positions() {
        let data = rows(json!([{"d": "2024-01-01", "m": 1}, {"d": "2024-01-02", "m": 2}]));
        let options = build(&data, &resolved(&["d"], &["m"]), ChartType::Line);
        assert_eq!(options.x_values, vec![Some(1704067200000.0), Some(1704153600000.0)]);
        assert_eq!(options.labels, vec!["January 1, 2024", "January 2, 2024"]);
    }
}
