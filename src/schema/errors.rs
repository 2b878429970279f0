//! Shape ingestion errors
//!
//! Error codes:
//! - SHAPE_INVALID_JSON
//! - SHAPE_NOT_AN_OBJECT
//! - SHAPE_MISSING_TABLE_NAME
//!
//! Only ingestion can fail, and only when a table as a whole is unusable.
//! Validation, rendering and synthesis always return a value; malformed
//! shape nodes degrade to `v.any()` and malformed indexes are skipped.

use thiserror::Error;

/// Result type for shape ingestion
pub type ShapeResult<T> = Result<T, ShapeError>;

/// Shape ingestion errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ShapeError {
    #[error("Invalid JSON in {context}: {reason}")]
    InvalidJson { context: String, reason: String },

    #[error("Expected a JSON object for {0}")]
    NotAnObject(String),

    #[error("Table schema is missing 'tableName'")]
    MissingTableName,
}

impl ShapeError {
    pub(crate) fn invalid_json(context: impl Into<String>, err: impl std::fmt::Display) -> Self {
        ShapeError::InvalidJson {
            context: context.into(),
            reason: err.to_string(),
        }
    }

    /// Returns the stable error code
    pub fn code(&self) -> &'static str {
        match self {
            ShapeError::InvalidJson { .. } => "SHAPE_INVALID_JSON",
            ShapeError::NotAnObject(_) => "SHAPE_NOT_AN_OBJECT",
            ShapeError::MissingTableName => "SHAPE_MISSING_TABLE_NAME",
        }
    }
}
