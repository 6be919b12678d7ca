//! Sequencer state, progress events and epoch-stamped snapshots.

use std::fmt;

use delpho_chain::B256;
use delpho_core::AccountSnapshot;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::step::{LoopStep, StepParams};

/// Lifecycle of one sequencer. Terminal states are never left.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SequencerState {
    Idle,
    Running { step: LoopStep },
    Done,
    Aborted { at: LoopStep, reason: String },
    Cancelled { at: LoopStep },
}

impl SequencerState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Done | Self::Aborted { .. } | Self::Cancelled { .. }
        )
    }

    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }
}

impl fmt::Display for SequencerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Running { step } => write!(f, "running({step})"),
            Self::Done => write!(f, "done"),
            Self::Aborted { at, .. } => write!(f, "aborted({at})"),
            Self::Cancelled { at } => write!(f, "cancelled({at})"),
        }
    }
}

/// Account snapshot stamped with the confirmation epoch it was taken in.
///
/// The epoch is the number of writes the sequencer had confirmed when the
/// snapshot was fetched. Only the sequencer creates these for its own runs.
#[derive(Debug, Clone)]
pub struct FreshSnapshot {
    epoch: u64,
    snapshot: AccountSnapshot,
}

impl FreshSnapshot {
    pub(crate) fn new(epoch: u64, snapshot: AccountSnapshot) -> Self {
        Self { epoch, snapshot }
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn snapshot(&self) -> &AccountSnapshot {
        &self.snapshot
    }
}

/// Events emitted while a sequence runs.
#[derive(Debug, Clone, PartialEq)]
pub enum Progress {
    StepStarted {
        step: LoopStep,
        description: &'static str,
    },
    StepSubmitted {
        step: LoopStep,
        params: StepParams,
    },
    /// One receipt confirms every step in `steps`.
    StepConfirmed {
        steps: Vec<LoopStep>,
        tx_hash: B256,
    },
    SequenceFinished {
        run_id: Uuid,
    },
    SequenceAborted {
        at: LoopStep,
        reason: String,
        cancelled: bool,
    },
}

/// Buffered progress events per channel.
pub const PROGRESS_BUFFER: usize = 64;

pub type ProgressSender = mpsc::Sender<Progress>;
pub type ProgressReceiver = mpsc::Receiver<Progress>;

/// Channel for [`Progress`] events.
pub fn progress_channel() -> (ProgressSender, ProgressReceiver) {
    mpsc::channel(PROGRESS_BUFFER)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_states() {
        assert!(!SequencerState::Idle.is_terminal());
        assert!(!SequencerState::Running {
            step: LoopStep::Borrow
        }
        .is_terminal());
        assert!(SequencerState::Done.is_terminal());
        assert!(SequencerState::Cancelled {
            at: LoopStep::Borrow
        }
        .is_terminal());

        let aborted = SequencerState::Aborted {
            at: LoopStep::Borrow,
            reason: "reverted".to_string(),
        };
        assert!(aborted.is_terminal());
        assert_eq!(aborted.to_string(), "aborted(3:borrow)");
    }
}
