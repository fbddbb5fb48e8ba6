//! Error types for the pilevar library

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PilevarError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Malformed record line ({reason}): {line}")]
    Format { reason: String, line: String },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Position {position} on {contig} exceeds the configured maximum genome length {bound}")]
    Bounds {
        contig: String,
        position: u64,
        bound: usize,
    },

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Threshold validation error: {field} must be between {min} and {max}, got {value}")]
    ThresholdValidation {
        field: String,
        min: f64,
        max: f64,
        value: f64,
    },

    #[error("Empty data: {0}")]
    EmptyData(String),
}

pub type Result<T> = std::result::Result<T, PilevarError>;

impl PilevarError {
    /// Shorthand for a malformed-line error.
    pub fn format(reason: impl Into<String>, line: impl Into<String>) -> Self {
        PilevarError::Format {
            reason: reason.into(),
            line: line.into(),
        }
    }
}
