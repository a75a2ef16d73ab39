use thiserror::Error;

/// Violations of the canonical price record invariants.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RecordError {
    #[error("invalid calendar date '{0}'")]
    InvalidDate(String),

    #[error("{field} must be a positive finite price, got {value}")]
    InvalidPrice { field: &'static str, value: f64 },

    #[error("high {high} is below low {low}")]
    InvertedRange { high: f64, low: f64 },

    #[error("volume must not be negative, got {0}")]
    NegativeVolume(i64),
}
