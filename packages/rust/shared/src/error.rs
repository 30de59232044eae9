//! Error types for statgrab.
//!
//! Library crates use [`StatgrabError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for every stage of the extraction pipeline.
#[derive(Debug, thiserror::Error)]
pub enum StatgrabError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Browser driver or automation session unavailable.
    #[error("environment error: {0}")]
    Environment(String),

    /// Navigation failed or the page never finished rendering.
    #[error("fetch error: {0}")]
    Fetch(String),

    /// An element the page contract requires is absent from the markup.
    #[error("not found: {what}")]
    NotFound { what: String },

    /// A marker element expected inside a cell is absent.
    #[error("missing field: row {row}, column {column:?} has no {marker:?} marker")]
    MissingField {
        row: usize,
        column: String,
        marker: String,
    },

    /// A data row does not have as many fields as the header has columns.
    #[error("schema mismatch: row {row} has {found} fields, expected {expected}")]
    SchemaMismatch {
        row: usize,
        expected: usize,
        found: usize,
    },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, StatgrabError>;

impl StatgrabError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a not-found error naming the missing element.
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound { what: what.into() }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
