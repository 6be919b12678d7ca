//! Application error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Venue error: {0}")]
    Venue(#[from] delpho_venue::VenueError),

    #[error("Chain error: {0}")]
    Chain(#[from] delpho_chain::ChainError),

    #[error("Sequencer error: {0}")]
    Sequencer(#[from] delpho_sequencer::SequencerError),

    #[error("Telemetry error: {0}")]
    Telemetry(#[from] delpho_telemetry::TelemetryError),

    #[error("Invalid value: {0}")]
    Core(#[from] delpho_core::CoreError),

    #[error("Output error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type AppResult<T> = Result<T, AppError>;
