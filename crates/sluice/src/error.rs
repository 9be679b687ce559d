//! Error types for the Sluice library.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for Sluice operations.
#[derive(Debug, Error)]
pub enum EtlError {
    /// A pipeline method was called before any table was extracted.
    #[error("no table loaded: call extract() before '{0}'")]
    NoData(String),

    /// Unknown strategy/method/format name or an invalid argument combination.
    #[error("configuration error: {0}")]
    Config(String),

    /// An operation referenced a column the table does not have.
    #[error("{operation}: column '{column}' not found")]
    ColumnNotFound { operation: String, column: String },

    /// An operation was given a table it cannot work on.
    #[error("{operation}: {message}")]
    Transform { operation: String, message: String },

    /// Error reading or accessing a file.
    #[error("IO error for '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Error from the CSV library.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// File format not supported.
    #[error("unsupported format '{0}': supported formats are csv, json")]
    UnsupportedFormat(String),

    /// Empty file or a source with no usable structure.
    #[error("empty data: {0}")]
    EmptyData(String),

    /// Failure writing a stats snapshot or other derived document.
    #[error("persistence error: {0}")]
    Persistence(String),
}

impl EtlError {
    /// Shorthand for an IO error tied to a path.
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        EtlError::Io {
            path: path.into(),
            source,
        }
    }

    /// Shorthand for a missing-column error.
    pub(crate) fn column(operation: &str, column: &str) -> Self {
        EtlError::ColumnNotFound {
            operation: operation.to_string(),
            column: column.to_string(),
        }
    }
}

/// Result type alias for Sluice operations.
pub type Result<T> = std::result::Result<T, EtlError>;
