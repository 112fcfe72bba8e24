// Format pattern parsers

pub mod date_pattern;

// Public API re-exports
pub use date_pattern::{parse_date_pattern, DateToken};
