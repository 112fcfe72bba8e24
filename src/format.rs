//! Column label formatting.
//!
//! Turns a raw cell plus its [`ColumnLabelFormat`] into the string shown on
//! axes, tooltips and legends, and a key that sorts the same way the raw values
//! would. Locale handling is a fixed table keyed by language tag so identical
//! inputs always produce identical output regardless of host settings.

use crate::config::{ColumnLabelFormat, FormatStyle, MissingReplacement, NumberConversion};
use crate::data::ColumnValue;
use crate::parser::{parse_date_pattern, DateToken};
use chrono::{DateTime, Datelike, NaiveDateTime, Timelike};
use serde::Serialize;
use std::cmp::Ordering;

pub const DEFAULT_DATE_FORMAT: &str = "LL";

const MONTHS: [&str; 12] = [
    "January", "February", "March", "April", "May", "June",
    "July", "August", "September", "October", "November", "December",
];
const WEEKDAYS: [&str; 7] = [
    "Monday", "Tuesday", "Wednesday", "Thursday", "Friday", "Saturday", "Sunday",
];

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FormattedLabel {
    pub display: String,
    pub sort_value: SortValue,
}

/// Sort key for a formatted cell. Numbers order before text; nulls carry
/// `-inf` so they sort first.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SortValue {
    Number(f64),
    Text(String),
}

impl Eq for SortValue {}

impl PartialOrd for SortValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SortValue {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (SortValue::Number(a), SortValue::Number(b)) => a.total_cmp(b),
            (SortValue::Number(_), SortValue::Text(_)) => Ordering::Less,
            (SortValue::Text(_), SortValue::Number(_)) => Ordering::Greater,
            (SortValue::Text(a), SortValue::Text(b)) => a.cmp(b),
        }
    }
}

/// Separator conventions for a language.
#[derive(Debug, Clone, Copy, PartialEq)]
struct NumberLocale {
    group: &'static str,
    decimal: char,
    symbol_first: bool,
}

const LOCALE_EN: NumberLocale = NumberLocale { group: ",", decimal: '.', symbol_first: true };
const LOCALE_DOT_GROUP: NumberLocale = NumberLocale { group: ".", decimal: ',', symbol_first: false };
const LOCALE_FR: NumberLocale = NumberLocale { group: "\u{202f}", decimal: ',', symbol_first: false };

fn locale_for(tag: Option<&str>) -> NumberLocale {
    let tag = tag.unwrap_or("en-US");
    let language = tag.split(['-', '_']).next().unwrap_or("en").to_ascii_lowercase();
    match language.as_str() {
        "de" | "es" | "it" | "nl" | "pt" | "id" | "tr" | "da" => LOCALE_DOT_GROUP,
        "fr" => LOCALE_FR,
        _ => LOCALE_EN,
    }
}

fn currency_symbol(code: &str) -> String {
    match code.to_ascii_uppercase().as_str() {
        "USD" => "$".to_string(),
        "EUR" => "€".to_string(),
        "GBP" => "£".to_string(),
        "JPY" | "CNY" => "¥".to_string(),
        "INR" => "₹".to_string(),
        "KRW" => "₩".to_string(),
        "CAD" => "CA$".to_string(),
        "AUD" => "A$".to_string(),
        other => format!("{} ", other),
    }
}

/// Format one cell for display.
pub fn format_label(value: &ColumnValue, format: &ColumnLabelFormat) -> FormattedLabel {
    match value {
        ColumnValue::Null => format_missing(format),
        ColumnValue::Date(d) if format.style != FormatStyle::String => FormattedLabel {
            display: wrap(format_date(d, format), format),
            sort_value: SortValue::Number(d.and_utc().timestamp_millis() as f64),
        },
        ColumnValue::Bool(b) => FormattedLabel {
            display: wrap(b.to_string(), format),
            sort_value: SortValue::Number(if *b { 1.0 } else { 0.0 }),
        },
        _ => match format.style {
            FormatStyle::Number | FormatStyle::Currency | FormatStyle::Percent => {
                match value.as_f64() {
                    Some(n) => FormattedLabel {
                        display: wrap(format_number(n, format), format),
                        sort_value: SortValue::Number(n),
                    },
                    None => raw_label(value),
                }
            }
            FormatStyle::Date => format_date_value(value, format),
            FormatStyle::String => FormattedLabel {
                display: wrap(value.to_string(), format),
                sort_value: match value {
                    ColumnValue::Number(n) => SortValue::Number(*n),
                    other => SortValue::Text(other.to_string()),
                },
            },
        },
    }
}

/// Display string only.
pub fn format_display(value: &ColumnValue, format: &ColumnLabelFormat) -> String {
    format_label(value, format).display
}

fn raw_label(value: &ColumnValue) -> FormattedLabel {
    let raw = value.to_string();
    FormattedLabel { sort_value: SortValue::Text(raw.clone()), display: raw }
}

fn format_missing(format: &ColumnLabelFormat) -> FormattedLabel {
    match &format.replace_missing_data_with {
        Some(MissingReplacement::Number(n)) => FormattedLabel {
            display: wrap(format_number(*n, format), format),
            sort_value: SortValue::Number(*n),
        },
        Some(MissingReplacement::Text(s)) => FormattedLabel {
            display: s.clone(),
            sort_value: SortValue::Number(f64::NEG_INFINITY),
        },
        None => FormattedLabel {
            display: String::new(),
            sort_value: SortValue::Number(f64::NEG_INFINITY),
        },
    }
}

fn wrap(body: String, format: &ColumnLabelFormat) -> String {
    match (&format.prefix, &format.suffix) {
        (None, None) => body,
        (prefix, suffix) => format!(
            "{}{}{}",
            prefix.as_deref().unwrap_or(""),
            body,
            suffix.as_deref().unwrap_or("")
        ),
    }
}

/// Format a number according to the style (number, currency or percent).
pub fn format_number(n: f64, format: &ColumnLabelFormat) -> String {
    let locale = locale_for(format.locale.as_deref());
    let value = n * format.multiplier;
    let (min, max) = format.fraction_digits();

    let (scaled, compact_suffix) = if format.compact_numbers {
        compact(value, max)
    } else {
        (value, "")
    };
    let body = format_decimal(scaled.abs(), min, max, format.use_grouping, locale);
    let negative = scaled < 0.0 && body.chars().any(|c| c.is_ascii_digit() && c != '0');
    let sign = if negative { "-" } else { "" };

    match format.style {
        FormatStyle::Currency => {
            let symbol = currency_symbol(format.currency.as_deref().unwrap_or("USD"));
            if locale.symbol_first {
                format!("{}{}{}{}", sign, symbol, body, compact_suffix)
            } else {
                format!("{}{}{} {}", sign, body, compact_suffix, symbol.trim_end())
            }
        }
        FormatStyle::Percent => format!("{}{}{}%", sign, body, compact_suffix),
        _ => format!("{}{}{}", sign, body, compact_suffix),
    }
}

/// Scale `value` into the largest unit it reaches. A value that rounds up to
/// 1000 of one unit at `max_digits` moves to the next unit (999,999 is `1M`).
fn compact(value: f64, max_digits: usize) -> (f64, &'static str) {
    const UNITS: [(f64, &str); 5] = [(1.0, ""), (1e3, "K"), (1e6, "M"), (1e9, "B"), (1e12, "T")];
    let magnitude = value.abs();
    let factor = 10f64.powi(max_digits.min(15) as i32);
    let rounded = |v: f64| (v * factor).round() / factor;

    let mut unit = UNITS.iter().rposition(|(size, _)| magnitude >= *size).unwrap_or(0);
    while unit + 1 < UNITS.len() && rounded(magnitude / UNITS[unit].0) >= 1000.0 {
        unit += 1;
    }
    let (size, suffix) = UNITS[unit];
    (value / size, suffix)
}

/// Fixed-point rendering of a non-negative number with grouping.
fn format_decimal(n: f64, min: usize, max: usize, grouping: bool, locale: NumberLocale) -> String {
    let fixed = format!("{:.*}", max, n);
    let (int_part, frac_part) = match fixed.split_once('.') {
        Some((i, f)) => (i.to_string(), f.to_string()),
        None => (fixed, String::new()),
    };

    let mut frac = frac_part;
    while frac.len() > min && frac.ends_with('0') {
        frac.pop();
    }

    let int_grouped = if grouping { group_digits(&int_part, locale.group) } else { int_part };
    if frac.is_empty() {
        int_grouped
    } else {
        format!("{}{}{}", int_grouped, locale.decimal, frac)
    }
}

fn group_digits(digits: &str, separator: &str) -> String {
    let len = digits.len();
    let mut out = String::with_capacity(len + len / 3 * separator.len());
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (len - i) % 3 == 0 {
            out.push_str(separator);
        }
        out.push(c);
    }
    out
}

fn format_date_value(value: &ColumnValue, format: &ColumnLabelFormat) -> FormattedLabel {
    if let (Some(conversion), Some(n)) = (format.convert_number_to, value.as_f64()) {
        if let Some(display) = convert_number(n, conversion) {
            return FormattedLabel {
                display: wrap(display, format),
                sort_value: SortValue::Number(n),
            };
        }
    }

    let date = match value {
        // Bare numbers under a date style are epoch milliseconds
        ColumnValue::Number(ms) => DateTime::from_timestamp_millis(*ms as i64).map(|d| d.naive_utc()),
        other => other.as_date(),
    };

    match date {
        Some(d) => FormattedLabel {
            display: wrap(format_date(&d, format), format),
            sort_value: SortValue::Number(d.and_utc().timestamp_millis() as f64),
        },
        None => raw_label(value),
    }
}

fn convert_number(n: f64, conversion: NumberConversion) -> Option<String> {
    let idx = n.round() as i64;
    match conversion {
        NumberConversion::DayOfWeek => {
            (1..=7).contains(&idx).then(|| WEEKDAYS[(idx - 1) as usize].to_string())
        }
        NumberConversion::MonthOfYear => {
            (1..=12).contains(&idx).then(|| MONTHS[(idx - 1) as usize].to_string())
        }
        NumberConversion::Quarter => (1..=4).contains(&idx).then(|| format!("Q{}", idx)),
    }
}

/// Render a date with the column's day.js pattern.
pub fn format_date(date: &NaiveDateTime, format: &ColumnLabelFormat) -> String {
    let pattern = format.date_format.as_deref().unwrap_or(DEFAULT_DATE_FORMAT);
    let tokens = match parse_date_pattern(pattern) {
        Some(tokens) => tokens,
        None => {
            tracing::warn!(pattern, "unparseable date pattern, using default");
            parse_date_pattern(DEFAULT_DATE_FORMAT).unwrap_or_default()
        }
    };
    render_date(date, &tokens)
}

pub fn render_date(date: &NaiveDateTime, tokens: &[DateToken]) -> String {
    let mut out = String::new();
    let hour12 = match date.hour() % 12 {
        0 => 12,
        h => h,
    };
    for token in tokens {
        match token {
            DateToken::Year4 => out.push_str(&format!("{:04}", date.year())),
            DateToken::Year2 => out.push_str(&format!("{:02}", date.year().rem_euclid(100))),
            DateToken::MonthFull => out.push_str(MONTHS[date.month0() as usize]),
            DateToken::MonthShort => out.push_str(&MONTHS[date.month0() as usize][..3]),
            DateToken::Month2 => out.push_str(&format!("{:02}", date.month())),
            DateToken::Month => out.push_str(&date.month().to_string()),
            DateToken::Day2 => out.push_str(&format!("{:02}", date.day())),
            DateToken::Day => out.push_str(&date.day().to_string()),
            DateToken::WeekdayFull => {
                out.push_str(WEEKDAYS[date.weekday().num_days_from_monday() as usize])
            }
            DateToken::WeekdayShort => {
                out.push_str(&WEEKDAYS[date.weekday().num_days_from_monday() as usize][..3])
            }
            DateToken::Hour24Padded => out.push_str(&format!("{:02}", date.hour())),
            DateToken::Hour24 => out.push_str(&date.hour().to_string()),
            DateToken::Hour12Padded => out.push_str(&format!("{:02}", hour12)),
            DateToken::Hour12 => out.push_str(&hour12.to_string()),
            DateToken::Minute => out.push_str(&format!("{:02}", date.minute())),
            DateToken::Second => out.push_str(&format!("{:02}", date.second())),
            DateToken::MeridiemUpper => out.push_str(if date.hour() < 12 { "AM" } else { "PM" }),
            DateToken::MeridiemLower => out.push_str(if date.hour() < 12 { "am" } else { "pm" }),
            DateToken::Quarter => out.push_str(&(date.month0() / 3 + 1).to_string()),
            DateToken::Literal(s) => out.push_str(s),
        }
    }
    out
}

/// Inverse of [`format_number`] for number, currency and percent displays.
/// Returns `None` for text that was not produced by the formatter.
pub fn parse_formatted_number(display: &str, format: &ColumnLabelFormat) -> Option<f64> {
    let locale = locale_for(format.locale.as_deref());
    let mut s = display.trim();
    if let Some(prefix) = format.prefix.as_deref() {
        s = s.strip_prefix(prefix).unwrap_or(s);
    }
    if let Some(suffix) = format.suffix.as_deref() {
        s = s.strip_suffix(suffix).unwrap_or(s);
    }

    let mut text = s.to_string();
    if format.style == FormatStyle::Currency {
        let symbol = currency_symbol(format.currency.as_deref().unwrap_or("USD"));
        text = text.replace(symbol.trim_end(), "");
    }
    text = text.replace('%', "");
    text = text.replace(locale.group, "");
    text.retain(|c| !c.is_whitespace() && c != '\u{202f}' && c != '\u{a0}');

    let mut factor = 1.0;
    if format.compact_numbers {
        for (suffix, size) in [('K', 1e3), ('M', 1e6), ('B', 1e9), ('T', 1e12)] {
            if text.ends_with(suffix) {
                text.pop();
                factor = size;
                break;
            }
        }
    }

    if locale.decimal != '.' {
        text = text.replace(locale.decimal, ".");
    }
    let parsed: f64 = text.parse().ok()?;
    if format.multiplier == 0.0 {
        return None;
    }
    Some(parsed * factor / format.multiplier)
}

/// `total_sales` -> `Total Sales`, used when a column has no display name.
pub fn humanize_key(key: &str) -> String {
    key.split(|c: char| c == '_' || c == '-' || c.is_whitespace())
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ColumnLabelFormat;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn number() -> ColumnLabelFormat {
        ColumnLabelFormat::DEFAULT
    }

    #[test]
    fn test_default_number() {
        assert_eq!(format_display(&ColumnValue::Number(1234.567), &number()), "1,234.57");
        assert_eq!(format_display(&ColumnValue::Number(-0.001), &number()), "0");
        assert_eq!(format_display(&ColumnValue::Number(-42.5), &number()), "-42.5");
    }

    #[test]
    fn test_fraction_padding() {
        let fmt = ColumnLabelFormat {
            minimum_fraction_digits: 2,
            maximum_fraction_digits: 3,
            ..number()
        };
        assert_eq!(format_display(&ColumnValue::Number(1234.0), &fmt), "1,234.00");
        let fmt = ColumnLabelFormat { decimals: Some(1), ..number() };
        assert_eq!(format_display(&ColumnValue::Number(1234.49), &fmt), "1,234.5");
    }

    #[test]
    fn test_currency() {
        let fmt = ColumnLabelFormat::with_style(FormatStyle::Currency);
        assert_eq!(format_display(&ColumnValue::Number(1234.56), &fmt), "$1,234.56");
        let eur_de = ColumnLabelFormat {
            currency: Some("EUR".into()),
            locale: Some("de-DE".into()),
            ..fmt.clone()
        };
        assert_eq!(format_display(&ColumnValue::Number(1234.56), &eur_de), "1.234,56 €");
    }

    #[test]
    fn test_percent_and_multiplier() {
        let fmt = ColumnLabelFormat::with_style(FormatStyle::Percent);
        assert_eq!(format_display(&ColumnValue::Number(0.1234), &fmt), "0.12%");
        let fmt = ColumnLabelFormat { multiplier: 2.0, ..number() };
        assert_eq!(format_display(&ColumnValue::Number(100.0), &fmt), "200");
    }

    #[test]
    fn test_locale_decimal() {
        let fmt = ColumnLabelFormat {
            locale: Some("de-DE".into()),
            decimals: Some(1),
            ..number()
        };
        assert_eq!(format_display(&ColumnValue::Number(1234.5), &fmt), "1.234,5");
    }

    #[test]
    fn test_prefix_suffix_and_compact() {
        let fmt = ColumnLabelFormat {
            prefix: Some("Pre-".into()),
            suffix: Some("-Post".into()),
            ..number()
        };
        assert_eq!(format_display(&ColumnValue::Number(1234.0), &fmt), "Pre-1,234-Post");
        let fmt = ColumnLabelFormat { compact_numbers: true, ..number() };
        assert_eq!(format_display(&ColumnValue::Number(1200.0), &fmt), "1.2K");
        assert_eq!(format_display(&ColumnValue::Number(3_450_000.0), &fmt), "3.45M");
    }

    #[test]
    fn test_compact_rounds_before_picking_unit() {
        let fmt = ColumnLabelFormat { compact_numbers: true, ..number() };
        assert_eq!(format_display(&ColumnValue::Number(999_999.0), &fmt), "1M");
        assert_eq!(format_display(&ColumnValue::Number(-999_999.0), &fmt), "-1M");
        assert_eq!(format_display(&ColumnValue::Number(999.999), &fmt), "1K");
        assert_eq!(format_display(&ColumnValue::Number(999.0), &fmt), "999");
        assert_eq!(format_display(&ColumnValue::Number(999_499.0), &fmt), "999.5K");
    }

    #[test]
    fn test_missing_values() {
        let label = format_label(&ColumnValue::Null, &number());
        assert_eq!(label.display, "");
        assert_eq!(label.sort_value, SortValue::Number(f64::NEG_INFINITY));

        let fmt = ColumnLabelFormat {
            replace_missing_data_with: Some(MissingReplacement::Text("N/A".into())),
            ..number()
        };
        assert_eq!(format_display(&ColumnValue::Null, &fmt), "N/A");

        let fmt = ColumnLabelFormat {
            replace_missing_data_with: Some(MissingReplacement::Number(0.0)),
            ..number()
        };
        assert_eq!(format_display(&ColumnValue::Null, &fmt), "0");
    }

    #[test]
    fn test_unparseable_falls_back_to_raw() {
        let label = format_label(&ColumnValue::Text("abc".into()), &number());
        assert_eq!(label.display, "abc");
        assert_eq!(label.sort_value, SortValue::Text("abc".into()));

        let date = ColumnLabelFormat::with_style(FormatStyle::Date);
        assert_eq!(format_display(&ColumnValue::Text("not a date".into()), &date), "not a date");
    }

    #[test]
    fn test_dates() {
        let value = ColumnValue::Text("2024-03-05".into());
        let iso = ColumnLabelFormat {
            date_format: Some("YYYY-MM-DD".into()),
            ..ColumnLabelFormat::with_style(FormatStyle::Date)
        };
        assert_eq!(format_display(&value, &iso), "2024-03-05");
        let short = ColumnLabelFormat {
            date_format: Some("MMM D, YYYY".into()),
            ..iso.clone()
        };
        assert_eq!(format_display(&value, &short), "Mar 5, 2024");
        let default = ColumnLabelFormat::with_style(FormatStyle::Date);
        assert_eq!(format_display(&value, &default), "March 5, 2024");
        let quarter = ColumnLabelFormat {
            date_format: Some("[Q]Q YYYY".into()),
            ..iso
        };
        assert_eq!(format_display(&value, &quarter), "Q1 2024");
    }

    #[test]
    fn test_number_conversions() {
        let fmt = ColumnLabelFormat {
            convert_number_to: Some(NumberConversion::MonthOfYear),
            ..ColumnLabelFormat::with_style(FormatStyle::Date)
        };
        assert_eq!(format_display(&ColumnValue::Number(2.0), &fmt), "February");
        let fmt = ColumnLabelFormat {
            convert_number_to: Some(NumberConversion::Quarter),
            ..fmt
        };
        assert_eq!(format_display(&ColumnValue::Number(3.0), &fmt), "Q3");
    }

    #[test]
    fn test_sort_values_order() {
        let a = format_label(&ColumnValue::Null, &number()).sort_value;
        let b = format_label(&ColumnValue::Number(-5.0), &number()).sort_value;
        let c = format_label(&ColumnValue::Text("zzz".into()), &number()).sort_value;
        assert!(a < b);
        assert!(b < c);
    }

    #[test]
    fn test_deterministic() {
        let fmt = ColumnLabelFormat {
            locale: Some("fr-FR".into()),
            ..ColumnLabelFormat::with_style(FormatStyle::Currency)
        };
        let first = format_display(&ColumnValue::Number(98765.4321), &fmt);
        let second = format_display(&ColumnValue::Number(98765.4321), &fmt);
        assert_eq!(first, second);
        assert_eq!(first, "98\u{202f}765,43 $");
    }

    #[test]
    fn test_humanize() {
        assert_eq!(humanize_key("total_sales"), "Total Sales");
        assert_eq!(humanize_key("m"), "M");
    }

    proptest! {
        #[test]
        fn prop_number_round_trip(v in -1.0e9f64..1.0e9, locale in prop::sample::select(vec!["en-US", "de-DE", "fr-FR"])) {
            let fmt = ColumnLabelFormat { locale: Some(locale.to_string()), ..ColumnLabelFormat::DEFAULT };
            let shown = format_number(v, &fmt);
            let parsed = parse_formatted_number(&shown, &fmt).unwrap();
            prop_assert!((parsed - v).abs() <= 0.005 + 1e-9 * v.abs());
        }

        #[test]
        fn prop_currency_round_trip(v in -1.0e6f64..1.0e6) {
            let fmt = ColumnLabelFormat::with_style(FormatStyle::Currency);
            let shown = format_number(v, &fmt);
            let parsed = parse_formatted_number(&shown, &fmt).unwrap();
            prop_assert!((parsed - v).abs() <= 0.005 + 1e-9 * v.abs());
        }
    }
}
