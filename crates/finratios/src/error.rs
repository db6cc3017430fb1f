//! Error types for the statement pipeline.
//!
//! [`PipelineError`] is fatal: it aborts a run. Failures inside a single
//! ratio cell are reported through [`crate::ratios::CellError`] instead and
//! never escape the ratio engine.

use crate::types::{Section, Ticker};
use chrono::NaiveDate;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for pipeline operations.
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Errors that abort a pipeline run.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Reading or writing a file or directory failed
    #[error("I/O error at {}: {source}", .path.display())]
    Io {
        /// Path being accessed
        path: PathBuf,
        /// Underlying I/O error
        source: std::io::Error,
    },

    /// A JSON document could not be parsed or serialized
    #[error("Malformed JSON in {}: {source}", .path.display())]
    Json {
        /// Path of the offending document
        path: PathBuf,
        /// Underlying serde error
        source: serde_json::Error,
    },

    /// Two statement sections define the same field under the `error` policy
    #[error("Field collision for {ticker} on {date}: '{field}' is defined by both {first} and {second}")]
    FieldCollision {
        /// Ticker being normalized
        ticker: Ticker,
        /// Fiscal date of the colliding reports
        date: NaiveDate,
        /// Field name present in both sections
        field: String,
        /// Section that defined the field first
        first: Section,
        /// Section that tried to define it again
        second: Section,
    },

    /// An option value was not recognised
    #[error("Invalid option: {0}")]
    InvalidOption(String),

    /// An input path that must be a directory is not one
    #[error("Not a directory: {}", .0.display())]
    NotADirectory(PathBuf),
}

impl PipelineError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn json(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        Self::Json {
            path: path.into(),
            source,
        }
    }
}
