//! Signal validation errors

use thiserror::Error;

/// A malformed or incomplete signal; dropped and logged, never retried
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Missing field: {0}")]
    MissingField(&'static str),

    #[error("Invalid field {field}: {value:?}")]
    InvalidField { field: &'static str, value: String },

    #[error("Timeframe {0} is not tracked")]
    UntrackedTimeframe(String),

    #[error("Inconsistent prices: {0}")]
    InconsistentPrices(String),
}

/// Outcome of handing a signal to the core
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestResult {
    Accepted,
    /// Same `(symbol, direction)` seen within the dedup window
    Duplicate,
    Rejected(ValidationError),
}

impl IngestResult {
    pub fn is_accepted(&self) -> bool {
        matches!(self, IngestResult::Accepted)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            IngestResult::Accepted => "accepted",
            IngestResult::Duplicate => "duplicate",
            IngestResult::Rejected(_) => "rejected",
        }
    }
}
