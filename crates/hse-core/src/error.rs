use std::path::PathBuf;
use thiserror::Error;

/// All errors produced by the HSE analytics crates.
///
/// Malformed rows, bad dates and empty datasets never surface here; those
/// degrade to defaults or empty results. Only file I/O and boundary-parsing
/// failures become errors.
#[derive(Error, Debug)]
pub enum HseError {
    /// An observation file could not be opened or read from disk.
    #[error("Failed to read file {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A JSON document could not be parsed.
    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// A report date did not match `DD-MM-YYYY`.
    #[error("Invalid report date: {0}")]
    InvalidDate(String),

    /// A query referenced an observation field that does not exist.
    #[error("Unknown observation field: {0}")]
    UnknownField(String),

    /// A query used an operator outside `equals|contains|gt|lt|gte|lte`.
    #[error("Unknown filter operator: {0}")]
    UnknownOperator(String),

    /// A risk tier string is not one of the recognised tiers.
    #[error("Invalid risk level: {0}")]
    InvalidRiskLevel(String),

    /// The remote incident predictor failed or returned an unusable body.
    #[error("Predictor error: {0}")]
    Predictor(String),
}

/// Convenience alias used throughout the HSE crates.
pub type Result<T> = std::result::Result<T, HseError>;
