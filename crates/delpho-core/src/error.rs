//! Error types for delpho-core.

use thiserror::Error;

/// Core error types.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Invalid price: {0}")]
    InvalidPrice(String),

    #[error("Invalid size: {0}")]
    InvalidSize(String),

    #[error("Invalid slippage: {0}")]
    InvalidSlippage(String),

    #[error("Order size too small: {size} < minimum {minimum}")]
    BelowMinimumOrder { size: String, minimum: String },

    #[error("Numeric overflow: {0}")]
    Overflow(String),

    #[error("Decimal parse error: {0}")]
    DecimalParse(#[from] rust_decimal::Error),
}

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
