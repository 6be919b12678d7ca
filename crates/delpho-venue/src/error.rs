//! Venue client error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum VenueError {
    #[error("HTTP client error: {0}")]
    Http(String),

    #[error("Response parse error: {0}")]
    Parse(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Decimal parse error: {0}")]
    Decimal(#[from] rust_decimal::Error),
}

pub type VenueResult<T> = Result<T, VenueError>;
