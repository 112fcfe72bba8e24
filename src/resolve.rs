use crate::config::{ChartEncodes, ChartType};
use crate::error::{EncodingError, EncodingRole};
use crate::ir::{ColumnMeta, ColumnType, ResolvedEncodes};
use std::collections::BTreeMap;

/// Resolve the chart encodings against the row set's columns.
///
/// Missing required roles, unknown columns, a column on both y axes and a
/// text x on a scatter chart are fatal. A non-numeric size column only drops
/// size scaling and is reported in `warnings`.
pub fn resolve_encodes(
    encodes: &ChartEncodes,
    columns: &[String],
    meta: &BTreeMap<String, ColumnMeta>,
    chart_type: ChartType,
) -> Result<ResolvedEncodes, EncodingError> {
    // 1. Required roles
    if encodes.x.is_empty() {
        return Err(EncodingError::MissingEncoding { role: EncodingRole::X });
    }
    if encodes.y.is_empty() {
        return Err(EncodingError::MissingEncoding { role: EncodingRole::Y });
    }

    // Size only means something on scatter charts
    let size = match (&encodes.size, chart_type) {
        (Some(key), ChartType::Scatter) => Some(key.clone()),
        (Some(key), _) => {
            tracing::debug!(column = %key, "size encoding ignored for non-scatter chart");
            None
        }
        (None, _) => None,
    };
    let tooltip = encodes.tooltip.clone().unwrap_or_default();

    // 2. Every encoded column must exist
    let roles: [(EncodingRole, &[String]); 5] = [
        (EncodingRole::X, encodes.x.as_slice()),
        (EncodingRole::Y, encodes.y.as_slice()),
        (EncodingRole::Y2, encodes.y2.as_slice()),
        (EncodingRole::Category, encodes.category.as_slice()),
        (EncodingRole::Tooltip, tooltip.as_slice()),
    ];
    for (role, keys) in roles {
        check_present(role, keys, columns)?;
    }
    if let Some(key) = &size {
        check_present(EncodingRole::Size, std::slice::from_ref(key), columns)?;
    }

    // 3. y and y2 are disjoint
    if let Some(shared) = encodes.y2.iter().find(|k| encodes.y.contains(k)) {
        return Err(EncodingError::OverlappingAxes { column: shared.clone() });
    }

    let type_of = |key: &str| meta.get(key).map(|m| m.column_type).unwrap_or(ColumnType::Unknown);

    // 4. Scatter needs a continuous x
    if chart_type == ChartType::Scatter {
        let x = &encodes.x[0];
        let actual = type_of(x);
        if !actual.is_continuous() {
            return Err(EncodingError::WrongType {
                role: EncodingRole::X,
                column: x.clone(),
                expected: "number or date",
                actual: actual.name(),
            });
        }
    }

    // 5. Size must be numeric; otherwise render without size scaling
    let mut warnings = Vec::new();
    let size = match size {
        Some(key) if !type_of(&key).is_numeric() => {
            let warning = EncodingError::WrongType {
                role: EncodingRole::Size,
                column: key.clone(),
                expected: ColumnType::Number.name(),
                actual: type_of(&key).name(),
            };
            tracing::warn!(column = %key, "{}; size scaling disabled", warning);
            warnings.push(warning);
            None
        }
        other => other,
    };

    Ok(ResolvedEncodes {
        x: encodes.x.clone(),
        y: encodes.y.clone(),
        y2: encodes.y2.clone(),
        category: encodes.category.clone(),
        size,
        tooltip,
        warnings,
    })
}

fn check_present(role: EncodingRole, keys: &[String], columns: &[String]) -> Result<(), EncodingError> {
    match keys.iter().find(|k| !columns.contains(k)) {
        Some(missing) => Err(EncodingError::MissingColumn {
            role,
            column: missing.clone(),
        }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ColumnLabelFormats;
    use crate::data::RowSet;
    use crate::dataset::profile_columns;
    use serde_json::json;

    fn data() -> RowSet {
        RowSet::from_json(&json!([
            {"x": 1, "y": 2, "n": 3, "cat": "a", "label": "hello"},
            {"x": 2, "y": 4, "n": 5, "cat": "b", "label": "world"},
        ]))
        .unwrap()
    }

    fn encodes(x: &[&str], y: &[&str]) -> ChartEncodes {
        ChartEncodes {
            x: x.iter().map(|s| s.to_string()).collect(),
            y: y.iter().map(|s| s.to_string()).collect(),
            ..Default::default()
        }
    }

    fn resolve(enc: &ChartEncodes, chart: ChartType) -> Result<ResolvedEncodes, EncodingError> {
        let rows = data();
        let meta = profile_columns(&rows, &rows.columns, &ColumnLabelFormats::new());
        resolve_encodes(enc, &rows.columns, &meta, chart)
    }

    #[test]
    fn test_resolve_simple() {
        let resolved = resolve(&encodes(&["cat"], &["y", "n"]), ChartType::Bar).unwrap();
        assert_eq!(resolved.x, vec!["cat"]);
        assert_eq!(resolved.y, vec!["y", "n"]);
        assert!(resolved.warnings.is_empty());
    }

    #[test]
    fn test_resolve_missing_roles() {
        let err = resolve(&encodes(&[], &["y"]), ChartType::Bar).unwrap_err();
        assert_eq!(err, EncodingError::MissingEncoding { role: EncodingRole::X });
        let err = resolve(&encodes(&["x"], &[]), ChartType::Bar).unwrap_err();
        assert_eq!(err, EncodingError::MissingEncoding { role: EncodingRole::Y });
    }

    #[test]
    fn test_resolve_missing_column() {
        let err = resolve(&encodes(&["cat"], &["sales"]), ChartType::Bar).unwrap_err();
        assert_eq!(
            err,
            EncodingError::MissingColumn {
                role: EncodingRole::Y,
                column: "sales".to_string()
            }
        );
    }

    #[test]
    fn test_resolve_overlap() {
        let enc = ChartEncodes {
            y2: vec!["y".to_string()],
            ..encodes(&["cat"], &["y"])
        };
        let err = resolve(&enc, ChartType::Line).unwrap_err();
        assert_eq!(err, EncodingError::OverlappingAxes { column: "y".to_string() });
    }

    #[test]
    fn test_scatter_text_x_rejected() {
        let err = resolve(&encodes(&["cat"], &["y"]), ChartType::Scatter).unwrap_err();
        assert!(matches!(err, EncodingError::WrongType { role: EncodingRole::X, .. }));
    }

    #[test]
    fn test_non_numeric_size_is_warning() {
        let enc = ChartEncodes {
            size: Some("label".to_string()),
            ..encodes(&["x"], &["y"])
        };
        let resolved = resolve(&enc, ChartType::Scatter).unwrap();
        assert_eq!(resolved.size, None);
        assert_eq!(resolved.warnings.len(), 1);

        let enc = ChartEncodes {
            size: Some("n".to_string()),
            ..encodes(&["x"], &["y"])
        };
        assert_eq!(resolve(&enc, ChartType::Scatter).unwrap().size.as_deref(), Some("n"));
    }

    #[test]
    fn test_size_ignored_off_scatter() {
        let enc = ChartEncodes {
            size: Some("missing".to_string()),
            ..encodes(&["cat"], &["y"])
        };
        let resolved = resolve(&enc, ChartType::Bar).unwrap();
        assert_eq!(resolved.size, None);
    }
}
