//! Error types for chartseries

use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Chart role an encoding error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EncodingRole {
    X,
    Y,
    Y2,
    Category,
    Size,
    Tooltip,
}

impl fmt::Display for EncodingRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EncodingRole::X => "x",
            EncodingRole::Y => "y",
            EncodingRole::Y2 => "y2",
            EncodingRole::Category => "category",
            EncodingRole::Size => "size",
            EncodingRole::Tooltip => "tooltip",
        };
        f.write_str(name)
    }
}

/// A configuration problem. These are returned as values so the caller can
/// draw an empty state instead of crashing.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum EncodingError {
    /// A required role has no column assigned
    #[error("No column assigned to the {role} axis")]
    MissingEncoding { role: EncodingRole },

    /// The encoded column is not in the result set
    #[error("Column '{column}' ({role}) not found in the data")]
    MissingColumn { role: EncodingRole, column: String },

    /// The encoded column has the wrong type for its role
    #[error("Column '{column}' ({role}) must be {expected}, found {actual}")]
    WrongType {
        role: EncodingRole,
        column: String,
        expected: &'static str,
        actual: &'static str,
    },

    /// The same column is on both y axes
    #[error("Column '{column}' is assigned to both y and y2")]
    OverlappingAxes { column: String },
}

/// Caller contract violations on the series builder input. Never produced by
/// data contents, only by malformed props.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SeriesError {
    #[error("Dataset '{dataset}' has {actual} points, expected {expected}")]
    PointCountMismatch {
        dataset: String,
        expected: usize,
        actual: usize,
    },

    #[error("Dataset '{0}' does not match any y or y2 key")]
    UnknownDatasetKey(String),

    #[error("Expected {expected} datasets for the encoded keys, got {actual}")]
    DatasetCountMismatch { expected: usize, actual: usize },

    #[error("Size data for '{dataset}' has {actual} entries, expected {expected}")]
    SizeCountMismatch {
        dataset: String,
        expected: usize,
        actual: usize,
    },
}

pub type SeriesResult<T> = std::result::Result<T, SeriesError>;
