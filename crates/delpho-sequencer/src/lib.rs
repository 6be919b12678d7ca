//! Loop-cycle execution and the single-step trade wizard.
//!
//! # Key Components
//!
//! - [`LoopSequencer`]: runs an [`ExecutionPlan`] write by write, sizing later
//!   steps from snapshots taken after each confirmation
//! - [`ExecutionPlan`]: ordered [`PlannedStep`]s with fixed or
//!   snapshot-derived [`StepSizing`]
//! - [`StepParams`]: per-write parameters, immutable once submitted
//! - [`TradeWizard`]: validates a [`StepForm`] and submits it
//!
//! # State machine
//!
//! `Idle -> Running(step 1..8) -> Done`, or `Aborted` / `Cancelled` at the
//! failing step. There is no resumption: a sequencer that left `Idle`
//! refuses to run again.

pub mod error;
pub mod plan;
pub mod sequencer;
pub mod state;
pub mod step;
pub mod wizard;

pub use error::{SequencerError, SequencerResult};
pub use plan::{ExecutionPlan, LoopConfig, PlannedStep, StepSizing};
pub use sequencer::{LoopSequencer, RunReport, StepConfirmation, DEFAULT_STEP_TIMEOUT};
pub use state::{
    progress_channel, FreshSnapshot, Progress, ProgressReceiver, ProgressSender, SequencerState,
};
pub use step::{LoopStep, StepParams};
pub use wizard::{
    CloseForm, FormContext, PositionForm, SizeInput, StepForm, SwapForm, TradeWizard,
    TransferForm,
};
