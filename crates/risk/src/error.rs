use rust_decimal::Decimal;
use thiserror::Error;

/// Sizing failures; all of them abort before any exchange call
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SizingError {
    #[error("Invalid {field}: {value}")]
    InvalidPrice { field: &'static str, value: Decimal },

    #[error("Risk budget must be positive, got {0}")]
    InvalidBudget(Decimal),

    #[error("Invalid instrument constraints: {0}")]
    InvalidConstraints(String),

    #[error("Computed quantity is zero for {symbol}")]
    ZeroQuantity { symbol: String },
}

pub type Result<T> = std::result::Result<T, SizingError>;
