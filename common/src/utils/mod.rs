//! Utility functions and helpers.

pub mod sql_format;
pub mod sql_validator;

// Re-export commonly used types
pub use sql_format::{normalize_sql, render_sql_log, SqlLogFormat};
pub use sql_validator::SqlValidator;
