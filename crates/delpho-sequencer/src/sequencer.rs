//! Loop-cycle sequencer.
//!
//! Runs an [`ExecutionPlan`] one write at a time:
//! - each write waits for its receipt before the next step is sized
//! - snapshot-sized steps fetch a new snapshot after the previous confirmation
//! - every await races the cancellation token and a per-step timeout
//! - the first failure aborts the run; nothing is rolled back
//!
//! A sequencer runs once. After leaving `Idle` it never starts again.

use std::future::Future;
use std::time::{Duration, Instant};

use delpho_chain::{DynContractWriter, B256};
use delpho_core::constants::DEFAULT_PRECISION;
use delpho_core::AssetPrecision;
use delpho_telemetry::Metrics;
use delpho_venue::DynVenueReader;
use tokio::sync::mpsc::error::TrySendError;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::error::{SequencerError, SequencerResult};
use crate::plan::{ExecutionPlan, PlannedStep, StepSizing};
use crate::state::{FreshSnapshot, Progress, ProgressSender, SequencerState};
use crate::step::{LoopStep, StepParams};

/// Default bound on a single step, receipt wait included.
pub const DEFAULT_STEP_TIMEOUT: Duration = Duration::from_secs(120);

/// One confirmed write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepConfirmation {
    pub steps: Vec<LoopStep>,
    pub tx_hash: B256,
    pub block_number: Option<u64>,
}

/// Outcome of a completed run.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub run_id: Uuid,
    pub confirmations: Vec<StepConfirmation>,
}

/// Race `fut` against cancellation and a timeout.
async fn guarded<T, E, F>(
    cancel: &CancellationToken,
    timeout: Duration,
    step: LoopStep,
    fut: F,
) -> SequencerResult<T>
where
    F: Future<Output = Result<T, E>>,
    E: Into<SequencerError>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(SequencerError::Cancelled { step }),
        outcome = tokio::time::timeout(timeout, fut) => match outcome {
            Ok(result) => result.map_err(Into::into),
            Err(_) => Err(SequencerError::StepTimeout { step, timeout }),
        },
    }
}

pub struct LoopSequencer {
    plan: ExecutionPlan,
    user: String,
    reader: DynVenueReader,
    writer: DynContractWriter,
    state: SequencerState,
    /// Confirmed writes so far; snapshots are stamped with it.
    epoch: u64,
    completed: Vec<LoopStep>,
    step_timeout: Duration,
    cancel: CancellationToken,
    progress: Option<ProgressSender>,
    run_id: Uuid,
}

impl LoopSequencer {
    pub fn new(
        plan: ExecutionPlan,
        user: impl Into<String>,
        reader: DynVenueReader,
        writer: DynContractWriter,
    ) -> Self {
        Self {
            plan,
            user: user.into(),
            reader,
            writer,
            state: SequencerState::Idle,
            epoch: 0,
            completed: Vec::new(),
            step_timeout: DEFAULT_STEP_TIMEOUT,
            cancel: CancellationToken::new(),
            progress: None,
            run_id: Uuid::new_v4(),
        }
    }

    pub fn with_step_timeout(mut self, timeout: Duration) -> Self {
        self.step_timeout = timeout;
        self
    }

    /// Use an externally owned token, e.g. one cancelled on Ctrl-C.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn with_progress(mut self, progress: ProgressSender) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn state(&self) -> &SequencerState {
        &self.state
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Loop steps confirmed so far, in order.
    pub fn completed(&self) -> &[LoopStep] {
        &self.completed
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Run the plan to completion or to the first failure.
    pub async fn run(&mut self) -> SequencerResult<RunReport> {
        if !self.state.is_idle() {
            return Err(SequencerError::AlreadyStarted {
                state: self.state.to_string(),
            });
        }

        info!(
            run_id = %self.run_id,
            user = %self.user,
            steps = self.plan.len(),
            "Loop cycle started"
        );
        Metrics::sequence_started();

        let steps = self.plan.steps().to_vec();
        let mut confirmations = Vec::with_capacity(steps.len());
        for planned in &steps {
            let Some(step) = planned.first_step() else {
                continue;
            };
            match self.execute_step(planned, step).await {
                Ok(confirmation) => confirmations.push(confirmation),
                Err(e) => return Err(self.abort(step, e)),
            }
        }

        self.state = SequencerState::Done;
        Metrics::sequence_finished("done");
        info!(run_id = %self.run_id, writes = confirmations.len(), "Loop cycle finished");
        self.emit(Progress::SequenceFinished {
            run_id: self.run_id,
        });

        Ok(RunReport {
            run_id: self.run_id,
            confirmations,
        })
    }

    async fn execute_step(
        &mut self,
        planned: &PlannedStep,
        step: LoopStep,
    ) -> SequencerResult<StepConfirmation> {
        self.state = SequencerState::Running { step };
        for covered in &planned.covers {
            self.emit(Progress::StepStarted {
                step: *covered,
                description: covered.description(),
            });
        }
        let started = Instant::now();

        let params = match &planned.sizing {
            StepSizing::Fixed(params) => params.clone(),
            sizing => self.size_step(step, sizing).await?,
        };
        if let Err(e) = params.validate() {
            Metrics::validation_rejected(e.reason());
            return Err(e);
        }
        let call = params.to_write_call()?;
        if self.cancel.is_cancelled() {
            return Err(SequencerError::Cancelled { step });
        }

        info!(
            run_id = %self.run_id,
            step = %step,
            call = call.name(),
            params = ?params,
            "Submitting step"
        );
        Metrics::step_submitted(step.as_str());
        self.emit(Progress::StepSubmitted { step, params });

        let confirmation = match guarded(
            &self.cancel,
            self.step_timeout,
            step,
            self.writer.submit(call),
        )
        .await
        {
            Ok(confirmation) => confirmation,
            Err(e) => {
                Metrics::step_failed(step.as_str());
                return Err(e);
            }
        };

        self.epoch += 1;
        self.completed.extend_from_slice(&planned.covers);
        Metrics::step_confirmed(step.as_str(), started.elapsed().as_secs_f64() * 1000.0);
        info!(
            run_id = %self.run_id,
            step = %step,
            tx_hash = %confirmation.tx_hash,
            epoch = self.epoch,
            "Step confirmed"
        );
        self.emit(Progress::StepConfirmed {
            steps: planned.covers.clone(),
            tx_hash: confirmation.tx_hash,
        });

        Ok(StepConfirmation {
            steps: planned.covers.clone(),
            tx_hash: confirmation.tx_hash,
            block_number: confirmation.block_number,
        })
    }

    /// Fetch a snapshot taken after the last confirmation and size from it.
    async fn size_step(&self, step: LoopStep, sizing: &StepSizing) -> SequencerResult<StepParams> {
        let epoch = self.epoch;
        let snapshot = guarded(
            &self.cancel,
            self.step_timeout,
            step,
            self.reader.account_snapshot(&self.user),
        )
        .await?;
        let age_ms = snapshot.age_ms();
        let fresh = FreshSnapshot::new(epoch, snapshot);
        debug!(run_id = %self.run_id, step = %step, epoch, age_ms, "Snapshot fetched");

        let (mid, precision) = match sizing.market() {
            Some((asset, kind)) => {
                let mid = guarded(
                    &self.cancel,
                    self.step_timeout,
                    step,
                    self.reader.mid_price(asset, kind),
                )
                .await?;
                let precision = self.precision_or_default(step, asset, kind).await?;
                (Some(mid), precision)
            }
            None => (None, DEFAULT_PRECISION),
        };

        sizing.resolve(&fresh, self.epoch, mid, precision)
    }

    async fn precision_or_default(
        &self,
        step: LoopStep,
        asset: &str,
        kind: delpho_venue::AssetKind,
    ) -> SequencerResult<AssetPrecision> {
        match guarded(
            &self.cancel,
            self.step_timeout,
            step,
            self.reader.asset_precision(asset, kind),
        )
        .await
        {
            Ok(precision) => Ok(precision),
            Err(SequencerError::Venue(e)) => {
                warn!(asset, error = %e, "Precision lookup failed, using defaults");
                Ok(DEFAULT_PRECISION)
            }
            Err(e) => Err(e),
        }
    }

    fn abort(&mut self, at: LoopStep, err: SequencerError) -> SequencerError {
        let cancelled = matches!(err, SequencerError::Cancelled { .. });
        self.state = if cancelled {
            SequencerState::Cancelled { at }
        } else {
            SequencerState::Aborted {
                at,
                reason: err.to_string(),
            }
        };

        error!(
            run_id = %self.run_id,
            step = %at,
            reason = err.reason(),
            error = %err,
            completed = self.completed.len(),
            "Loop cycle aborted"
        );
        Metrics::sequence_finished(if cancelled { "cancelled" } else { "aborted" });
        self.emit(Progress::SequenceAborted {
            at,
            reason: err.to_string(),
            cancelled,
        });
        err
    }

    fn emit(&self, event: Progress) {
        let Some(tx) = &self.progress else {
            return;
        };
        match tx.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                warn!(run_id = %self.run_id, "Progress channel full, event dropped");
            }
            Err(TrySendError::Closed(_)) => {
                debug!(run_id = %self.run_id, "Progress receiver dropped");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::progress_channel;
    use delpho_chain::MockWriter;
    use delpho_venue::MockVenueReader;
    use std::sync::Arc;

    fn fixed_plan() -> ExecutionPlan {
        ExecutionPlan::new(vec![PlannedStep::new(
            LoopStep::EVM_FLOW.to_vec(),
            StepSizing::Fixed(StepParams::EvmFlow {
                min_amount_out: 1,
                min_initial_amount_out: 1,
                target_loop_value: 150_000_000,
            }),
        )])
        .unwrap()
    }

    #[tokio::test]
    async fn test_single_write_confirms_five_steps() {
        let writer = Arc::new(MockWriter::new());
        let (tx, mut rx) = progress_channel();
        let mut sequencer = LoopSequencer::new(
            fixed_plan(),
            "0xabc",
            Arc::new(MockVenueReader::new()),
            writer.clone(),
        )
        .with_progress(tx);

        let report = sequencer.run().await.unwrap();

        assert_eq!(writer.call_count(), 1);
        assert_eq!(report.confirmations.len(), 1);
        assert_eq!(sequencer.completed(), &LoopStep::EVM_FLOW[..]);
        assert_eq!(sequencer.state(), &SequencerState::Done);
        assert_eq!(sequencer.epoch(), 1);

        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        let started = events
            .iter()
            .filter(|e| matches!(e, Progress::StepStarted { .. }))
            .count();
        assert_eq!(started, 5);
        assert!(matches!(
            events.last(),
            Some(Progress::SequenceFinished { run_id }) if *run_id == report.run_id
        ));
    }

    #[tokio::test]
    async fn test_finished_sequencer_does_not_rerun() {
        let writer = Arc::new(MockWriter::new());
        let mut sequencer = LoopSequencer::new(
            fixed_plan(),
            "0xabc",
            Arc::new(MockVenueReader::new()),
            writer.clone(),
        );

        sequencer.run().await.unwrap();
        let again = sequencer.run().await;

        assert!(matches!(again, Err(SequencerError::AlreadyStarted { .. })));
        assert_eq!(writer.call_count(), 1);
    }

    #[tokio::test]
    async fn test_cancelled_before_start_sends_nothing() {
        let writer = Arc::new(MockWriter::new());
        let cancel = CancellationToken::new();
        cancel.cancel();
        let mut sequencer = LoopSequencer::new(
            fixed_plan(),
            "0xabc",
            Arc::new(MockVenueReader::new()),
            writer.clone(),
        )
        .with_cancellation(cancel);

        let result = sequencer.run().await;

        assert!(matches!(result, Err(SequencerError::Cancelled { .. })));
        assert_eq!(
            sequencer.state(),
            &SequencerState::Cancelled {
                at: LoopStep::WithdrawCollateral
            }
        );
        assert_eq!(writer.call_count(), 0);
        assert!(sequencer.completed().is_empty());
    }
}
