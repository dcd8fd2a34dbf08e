//! Error taxonomy for the belief-update engine and its file formats.
//!
//! Data-format and dimension errors abort a run. Measurement failures are
//! reported separately through [`MeasurementError`] so the filter can
//! substitute a placeholder report instead of aborting.

use thiserror::Error;

/// Fatal errors raised by the core and by the dump/command parsers.
#[derive(Debug, Error)]
pub enum LocalizationError {
    /// A frame has no record in the command log.
    #[error("no command recorded for frame '{key}'")]
    MissingCommand { key: String },

    /// A line of a dump or command log does not have the expected shape.
    #[error("malformed record in {source_name} at line {line}: {reason} (line: {content:?})")]
    MalformedRecord {
        source_name: String,
        line: usize,
        reason: String,
        content: String,
    },

    /// A belief or report does not match the run's location count or bin count.
    #[error("dimension mismatch in {context}: expected {expected}, got {actual}")]
    DimensionMismatch {
        context: &'static str,
        expected: usize,
        actual: usize,
    },

    /// A value that must be finite and non-negative is not.
    #[error("invalid value in {context}: {value}")]
    InvalidValue { context: &'static str, value: f64 },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("invalid frame sequence: {0}")]
    InvalidFrameSequence(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl LocalizationError {
    /// Build a [`LocalizationError::MalformedRecord`] for a 1-based line number.
    pub fn malformed(
        source_name: impl Into<String>,
        line: usize,
        reason: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self::MalformedRecord {
            source_name: source_name.into(),
            line,
            reason: reason.into(),
            content: content.into(),
        }
    }
}

/// Failure of a measurement source for one (frame, location) query.
#[derive(Debug, Error)]
pub enum MeasurementError {
    #[error("location {0} is not indexed")]
    UnknownLocation(usize),

    #[error("no recorded evidence for frame {frame}, location {location}")]
    MissingRecord { frame: usize, location: usize },

    #[error("query was prepared for the {prepared} matcher but sent to the {matcher} matcher")]
    QueryKind {
        prepared: &'static str,
        matcher: &'static str,
    },

    #[error("evidence value {0} is negative or not finite")]
    InvalidEvidence(f64),

    #[error("OpenCV error: {0}")]
    OpenCv(#[from] opencv::Error),

    #[error("measurement worker failed: {0}")]
    Worker(String),
}

pub type Result<T, E = LocalizationError> = std::result::Result<T, E>;
