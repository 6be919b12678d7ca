//! Sequencer error types.

use std::time::Duration;

use delpho_chain::ChainError;
use delpho_core::CoreError;
use delpho_venue::VenueError;
use rust_decimal::Decimal;
use thiserror::Error;

use crate::step::LoopStep;

#[derive(Debug, Error)]
pub enum SequencerError {
    #[error("Venue read failed: {0}")]
    Venue(#[from] VenueError),

    #[error("Write failed: {0}")]
    Chain(#[from] ChainError),

    #[error("Invalid parameters: {0}")]
    Core(#[from] CoreError),

    /// Sizing was attempted with a snapshot taken before the latest confirmation.
    #[error("Stale snapshot: taken at epoch {snapshot_epoch}, current epoch {current_epoch}")]
    StaleSnapshot {
        snapshot_epoch: u64,
        current_epoch: u64,
    },

    #[error("Sequencer already started (state: {state})")]
    AlreadyStarted { state: String },

    #[error("Step {step} timed out after {timeout:?}")]
    StepTimeout { step: LoopStep, timeout: Duration },

    #[error("Cancelled during step {step}")]
    Cancelled { step: LoopStep },

    #[error("Insufficient {coin} balance: {available}")]
    InsufficientBalance { coin: String, available: Decimal },

    #[error("No open {coin} position")]
    NoPosition { coin: String },

    #[error("Invalid plan: {0}")]
    InvalidPlan(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl SequencerError {
    /// Short label for metrics.
    pub fn reason(&self) -> &'static str {
        match self {
            Self::Venue(_) => "venue",
            Self::Chain(ChainError::Reverted { .. }) => "reverted",
            Self::Chain(_) => "chain",
            Self::Core(CoreError::BelowMinimumOrder { .. }) => "below_minimum",
            Self::Core(_) => "invalid_params",
            Self::StaleSnapshot { .. } => "stale_snapshot",
            Self::AlreadyStarted { .. } => "already_started",
            Self::StepTimeout { .. } => "timeout",
            Self::Cancelled { .. } => "cancelled",
            Self::InsufficientBalance { .. } => "insufficient_balance",
            Self::NoPosition { .. } => "no_position",
            Self::InvalidPlan(_) => "invalid_plan",
            Self::InvalidInput(_) => "invalid_input",
        }
    }
}

pub type SequencerResult<T> = Result<T, SequencerError>;
