//! Loop-cycle sequencer integration tests.
//!
//! Covers:
//! - Sizing from snapshots fetched after each confirmation
//! - Abort semantics and single use
//! - Timeouts and cancellation

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{mocks, price_markets, snapshot, HangingWriter, USER};
use delpho_chain::{ChainError, WriteCall};
use delpho_core::CoreError;
use delpho_sequencer::{
    progress_channel, ExecutionPlan, LoopConfig, LoopSequencer, LoopStep, PlannedStep, Progress,
    SequencerError, SequencerState, StepParams, StepSizing,
};
use rust_decimal_macros::dec;
use tokio_util::sync::CancellationToken;

fn config() -> LoopConfig {
    LoopConfig {
        slippage: dec!(0.01),
        ..LoopConfig::default()
    }
}

fn evm_flow() -> StepSizing {
    StepSizing::Fixed(StepParams::EvmFlow {
        min_amount_out: 1,
        min_initial_amount_out: 1,
        target_loop_value: 150_000_000,
    })
}

/// Each loop step as its own write.
fn eight_write_plan() -> ExecutionPlan {
    let mut steps: Vec<PlannedStep> = LoopStep::EVM_FLOW
        .iter()
        .map(|step| PlannedStep::single(*step, evm_flow()))
        .collect();
    steps.push(PlannedStep::single(
        LoopStep::SwapOnVenue,
        StepSizing::SwapAll {
            fraction: dec!(1),
            slippage: dec!(0.01),
        },
    ));
    steps.push(PlannedStep::single(
        LoopStep::TransferToMarginAccount,
        StepSizing::TransferSpotToPerp { fraction: dec!(1) },
    ));
    steps.push(PlannedStep::single(
        LoopStep::OpenShortPosition,
        StepSizing::ShortFromMargin {
            fraction: dec!(1),
            leverage: dec!(1),
            slippage: dec!(0.01),
        },
    ));
    ExecutionPlan::new(steps).unwrap()
}

#[tokio::test]
async fn test_each_step_sized_after_previous_confirmation() {
    let (journal, reader, writer) = mocks();
    price_markets(&reader, dec!(0.995), dec!(40));
    // after the EVM flow: USDT bridged, no USDC yet
    reader.push_snapshot(snapshot(dec!(150), dec!(0), dec!(0)));
    // after the swap
    reader.push_snapshot(snapshot(dec!(0), dec!(147.3), dec!(0)));
    // after the transfer
    reader.push_snapshot(snapshot(dec!(0), dec!(0), dec!(147.3)));

    let plan = ExecutionPlan::loop_cycle(&config()).unwrap();
    let mut sequencer = LoopSequencer::new(plan, USER, reader.clone(), writer.clone());
    let report = sequencer.run().await.unwrap();

    assert_eq!(
        journal.lock().clone(),
        vec![
            "write:executeFullEvmFlow",
            "snapshot",
            "mid:USDT0",
            "precision:USDT0",
            "write:swapUSDT2USDC",
            "snapshot",
            "write:transferUSDCFromSpotToPerp",
            "snapshot",
            "mid:HYPE",
            "precision:HYPE",
            "write:openHypeShort",
        ]
    );

    let calls = writer.calls();
    assert_eq!(
        calls[1],
        WriteCall::SwapUsdtToUsdc {
            is_buy: false,
            limit_px: 98_505_000,
            sz: 15_000_000_000,
        }
    );
    // sized from the post-swap snapshot, not the one before it
    assert_eq!(
        calls[2],
        WriteCall::TransferUsdc {
            ntl: 147_300_000,
            to_perp: true,
        }
    );
    assert_eq!(
        calls[3],
        WriteCall::OpenHypePosition {
            is_long: false,
            limit_px: 3_960_000_000,
            sz: 368_000_000,
        }
    );

    assert_eq!(report.confirmations.len(), 4);
    assert_eq!(report.confirmations[0].steps, LoopStep::EVM_FLOW.to_vec());
    assert_eq!(sequencer.completed(), &LoopStep::ALL[..]);
    assert_eq!(sequencer.state(), &SequencerState::Done);
    assert_eq!(sequencer.epoch(), 4);
}

#[tokio::test]
async fn test_forced_step_three_rejection_aborts() {
    let (_journal, reader, writer) = mocks();
    price_markets(&reader, dec!(0.995), dec!(40));
    writer.fail_on_call(3);
    let (tx, mut rx) = progress_channel();

    let mut sequencer =
        LoopSequencer::new(eight_write_plan(), USER, reader.clone(), writer.clone())
            .with_progress(tx);
    let result = sequencer.run().await;

    assert!(matches!(
        result,
        Err(SequencerError::Chain(ChainError::Reverted { .. }))
    ));
    assert!(matches!(
        sequencer.state(),
        SequencerState::Aborted {
            at: LoopStep::Borrow,
            ..
        }
    ));
    assert_eq!(
        sequencer.completed(),
        &[LoopStep::WithdrawCollateral, LoopStep::SupplyCollateral]
    );
    assert_eq!(writer.call_count(), 3);
    assert_eq!(reader.snapshot_calls(), 0);

    // a retry does not resume at step 4
    let retry = sequencer.run().await;
    assert!(matches!(retry, Err(SequencerError::AlreadyStarted { .. })));
    assert_eq!(writer.call_count(), 3);

    let mut last = None;
    while let Ok(event) = rx.try_recv() {
        last = Some(event);
    }
    assert!(matches!(
        last,
        Some(Progress::SequenceAborted {
            at: LoopStep::Borrow,
            cancelled: false,
            ..
        })
    ));
}

#[tokio::test]
async fn test_snapshot_read_failure_aborts_before_sizing() {
    let (_journal, reader, writer) = mocks();
    price_markets(&reader, dec!(0.995), dec!(40));
    reader.fail_snapshot_on_call(1);

    let plan = ExecutionPlan::loop_cycle(&config()).unwrap();
    let mut sequencer = LoopSequencer::new(plan, USER, reader.clone(), writer.clone());
    let result = sequencer.run().await;

    assert!(matches!(result, Err(SequencerError::Venue(_))));
    assert!(matches!(
        sequencer.state(),
        SequencerState::Aborted {
            at: LoopStep::SwapOnVenue,
            ..
        }
    ));
    assert_eq!(writer.call_count(), 1);
}

#[tokio::test]
async fn test_dust_swap_blocks_submission() {
    let (_journal, reader, writer) = mocks();
    price_markets(&reader, dec!(0.995), dec!(40));
    reader.push_snapshot(snapshot(dec!(5), dec!(0), dec!(0)));

    let plan = ExecutionPlan::loop_cycle(&config()).unwrap();
    let mut sequencer = LoopSequencer::new(plan, USER, reader.clone(), writer.clone());
    let result = sequencer.run().await;

    assert!(matches!(
        result,
        Err(SequencerError::Core(CoreError::BelowMinimumOrder { .. }))
    ));
    // only the EVM flow went out
    assert_eq!(writer.call_count(), 1);
}

#[tokio::test]
async fn test_missing_precision_falls_back_to_defaults() {
    let (_journal, reader, writer) = mocks();
    reader.set_mid("USDT0", delpho_core::Price::new(dec!(0.995)));
    reader.push_snapshot(snapshot(dec!(150), dec!(0), dec!(0)));

    let plan = ExecutionPlan::new(vec![
        PlannedStep::new(LoopStep::EVM_FLOW.to_vec(), evm_flow()),
        PlannedStep::single(
            LoopStep::SwapOnVenue,
            StepSizing::SwapAll {
                fraction: dec!(1),
                slippage: dec!(0.01),
            },
        ),
    ])
    .unwrap();
    let mut sequencer = LoopSequencer::new(plan, USER, reader.clone(), writer.clone());
    sequencer.run().await.unwrap();

    assert_eq!(
        writer.calls()[1],
        WriteCall::SwapUsdtToUsdc {
            is_buy: false,
            limit_px: 98_500_000,
            sz: 15_000_000_000,
        }
    );
}

#[tokio::test]
async fn test_hung_receipt_times_out() {
    let (_journal, reader, _writer) = mocks();
    let writer = Arc::new(HangingWriter::new());

    let plan = ExecutionPlan::loop_cycle(&config()).unwrap();
    let mut sequencer = LoopSequencer::new(plan, USER, reader, writer.clone())
        .with_step_timeout(Duration::from_millis(50));
    let result = sequencer.run().await;

    assert!(matches!(
        result,
        Err(SequencerError::StepTimeout {
            step: LoopStep::WithdrawCollateral,
            ..
        })
    ));
    assert!(matches!(
        sequencer.state(),
        SequencerState::Aborted {
            at: LoopStep::WithdrawCollateral,
            ..
        }
    ));
    assert_eq!(writer.calls.lock().len(), 1);
}

#[tokio::test]
async fn test_cancel_while_waiting_for_receipt() {
    let (_journal, reader, _writer) = mocks();
    let writer = Arc::new(HangingWriter::new());
    let cancel = CancellationToken::new();

    let plan = ExecutionPlan::loop_cycle(&config()).unwrap();
    let mut sequencer = LoopSequencer::new(plan, USER, reader, writer)
        .with_cancellation(cancel.clone())
        .with_step_timeout(Duration::from_secs(30));

    let canceller = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        cancel.cancel();
    });
    let result = sequencer.run().await;
    canceller.await.unwrap();

    assert!(matches!(result, Err(SequencerError::Cancelled { .. })));
    assert_eq!(
        sequencer.state(),
        &SequencerState::Cancelled {
            at: LoopStep::WithdrawCollateral
        }
    );
    assert!(sequencer.completed().is_empty());
}
