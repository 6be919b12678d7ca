//! Execution plans and snapshot-driven sizing.
//!
//! A plan is a fixed list of [`PlannedStep`]s. Each planned step either
//! carries its parameters up front or a [`StepSizing`] rule that turns a
//! fresh [`AccountSnapshot`] into parameters once the previous step has
//! been confirmed.

use delpho_core::constants::{
    COIN_HYPE, COIN_USDC, COIN_USDT, DEFAULT_WIZARD_SLIPPAGE, USDC_TRANSFER_DECIMALS,
};
use delpho_core::{
    price_with_slippage, truncate_dp, AccountSnapshot, AssetPrecision, OrderSide,
    PositionDirection, Price, Size, TransferDirection,
};
use delpho_venue::AssetKind;
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::error::{SequencerError, SequencerResult};
use crate::state::FreshSnapshot;
use crate::step::{LoopStep, StepParams};

/// How the parameters of a planned step are obtained.
#[derive(Debug, Clone, PartialEq)]
pub enum StepSizing {
    /// Parameters known before the sequence starts.
    Fixed(StepParams),
    /// Sell `fraction` of the available USDT0 for USDC.
    SwapAll { fraction: Decimal, slippage: Decimal },
    /// Move `fraction` of the available spot USDC to perp margin.
    TransferSpotToPerp { fraction: Decimal },
    /// Short HYPE with a notional of `withdrawable * fraction * leverage`.
    ShortFromMargin {
        fraction: Decimal,
        leverage: Decimal,
        slippage: Decimal,
    },
}

impl StepSizing {
    /// Whether sizing needs a snapshot taken after the previous confirmation.
    pub fn needs_snapshot(&self) -> bool {
        !matches!(self, Self::Fixed(_))
    }

    /// Market whose mid and precision the rule prices against.
    pub fn market(&self) -> Option<(&'static str, AssetKind)> {
        match self {
            Self::SwapAll { .. } => Some((COIN_USDT, AssetKind::Spot)),
            Self::ShortFromMargin { .. } => Some((COIN_HYPE, AssetKind::Perp)),
            Self::Fixed(_) | Self::TransferSpotToPerp { .. } => None,
        }
    }

    /// Turn a fresh snapshot into parameters.
    ///
    /// `current_epoch` is the sequencer's confirmation count; a snapshot
    /// stamped with any other epoch is rejected. `mid` and `precision` are
    /// required for rules with a [`market`](Self::market).
    pub fn resolve(
        &self,
        fresh: &FreshSnapshot,
        current_epoch: u64,
        mid: Option<Price>,
        precision: AssetPrecision,
    ) -> SequencerResult<StepParams> {
        if fresh.epoch() != current_epoch {
            return Err(SequencerError::StaleSnapshot {
                snapshot_epoch: fresh.epoch(),
                current_epoch,
            });
        }
        let snapshot = fresh.snapshot();

        match self {
            Self::Fixed(params) => Ok(params.clone()),
            Self::SwapAll { fraction, slippage } => {
                let mid = require_mid(mid, COIN_USDT)?;
                let available = snapshot.spot_available(COIN_USDT);
                let size = positive_size(
                    available * *fraction,
                    precision.size_decimals,
                    COIN_USDT,
                    available,
                )?;
                let price = price_with_slippage(
                    mid,
                    *slippage,
                    OrderSide::Sell.is_aggressive(),
                    precision.price_decimals,
                )?;
                Ok(StepParams::Swap {
                    side: OrderSide::Sell,
                    price,
                    size,
                    precision,
                })
            }
            Self::TransferSpotToPerp { fraction } => {
                let available = snapshot.spot_available(COIN_USDC);
                let amount = truncate_dp(available * *fraction, USDC_TRANSFER_DECIMALS);
                if amount <= Decimal::ZERO {
                    return Err(insufficient(COIN_USDC, available));
                }
                Ok(StepParams::Transfer {
                    amount,
                    direction: TransferDirection::ToPerp,
                })
            }
            Self::ShortFromMargin {
                fraction,
                leverage,
                slippage,
            } => {
                let mid = require_mid(mid, COIN_HYPE)?;
                let withdrawable = snapshot.perp_withdrawable();
                let notional = withdrawable * *fraction * *leverage;
                let size = positive_size(
                    notional / mid.inner(),
                    precision.size_decimals,
                    COIN_USDC,
                    withdrawable,
                )?;
                let price = price_with_slippage(
                    mid,
                    *slippage,
                    PositionDirection::Short.is_aggressive(),
                    precision.price_decimals,
                )?;
                Ok(StepParams::OpenPosition {
                    direction: PositionDirection::Short,
                    price,
                    size,
                    precision,
                })
            }
        }
    }
}

fn require_mid(mid: Option<Price>, asset: &str) -> SequencerResult<Price> {
    mid.ok_or_else(|| SequencerError::InvalidInput(format!("no mid price for {asset}")))
}

fn insufficient(coin: &str, available: Decimal) -> SequencerError {
    SequencerError::InsufficientBalance {
        coin: coin.to_string(),
        available,
    }
}

fn positive_size(
    raw: Decimal,
    size_decimals: u32,
    coin: &str,
    available: Decimal,
) -> SequencerResult<Size> {
    let size = Size::new(raw).truncate_to_decimals(size_decimals);
    if !size.is_positive() {
        return Err(insufficient(coin, available));
    }
    Ok(size)
}

/// One entry of an [`ExecutionPlan`].
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedStep {
    /// Loop steps confirmed by this step's single write.
    pub covers: Vec<LoopStep>,
    pub sizing: StepSizing,
}

impl PlannedStep {
    pub fn new(covers: Vec<LoopStep>, sizing: StepSizing) -> Self {
        Self { covers, sizing }
    }

    pub fn single(step: LoopStep, sizing: StepSizing) -> Self {
        Self::new(vec![step], sizing)
    }

    /// First loop step covered, reported while the write is in flight.
    pub fn first_step(&self) -> Option<LoopStep> {
        self.covers.first().copied()
    }
}

/// Sizing knobs for the standard loop cycle.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoopConfig {
    /// Minimum swap output accepted by the executor (raw units).
    #[serde(default = "default_min_amount_out")]
    pub min_amount_out: u128,
    #[serde(default = "default_min_amount_out")]
    pub min_initial_amount_out: u128,
    /// Loop value in 6-decimal USDT units.
    #[serde(default = "default_target_loop_value")]
    pub target_loop_value: u128,
    #[serde(default = "default_fraction")]
    pub swap_fraction: Decimal,
    #[serde(default = "default_fraction")]
    pub transfer_fraction: Decimal,
    #[serde(default = "default_fraction")]
    pub short_fraction: Decimal,
    #[serde(default = "default_leverage")]
    pub short_leverage: Decimal,
    #[serde(default = "default_slippage")]
    pub slippage: Decimal,
}

fn default_min_amount_out() -> u128 {
    1
}

fn default_target_loop_value() -> u128 {
    150_000_000
}

fn default_fraction() -> Decimal {
    Decimal::ONE
}

fn default_leverage() -> Decimal {
    Decimal::ONE
}

fn default_slippage() -> Decimal {
    DEFAULT_WIZARD_SLIPPAGE
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            min_amount_out: default_min_amount_out(),
            min_initial_amount_out: default_min_amount_out(),
            target_loop_value: default_target_loop_value(),
            swap_fraction: default_fraction(),
            transfer_fraction: default_fraction(),
            short_fraction: default_fraction(),
            short_leverage: default_leverage(),
            slippage: default_slippage(),
        }
    }
}

impl LoopConfig {
    pub fn validate(&self) -> SequencerResult<()> {
        for (name, fraction) in [
            ("swap_fraction", self.swap_fraction),
            ("transfer_fraction", self.transfer_fraction),
            ("short_fraction", self.short_fraction),
        ] {
            if fraction <= Decimal::ZERO || fraction > Decimal::ONE {
                return Err(SequencerError::InvalidPlan(format!(
                    "{name} must be in (0, 1], got {fraction}"
                )));
            }
        }
        if self.short_leverage <= Decimal::ZERO {
            return Err(SequencerError::InvalidPlan(format!(
                "short_leverage must be positive, got {}",
                self.short_leverage
            )));
        }
        if self.slippage < Decimal::ZERO || self.slippage >= Decimal::ONE {
            return Err(SequencerError::InvalidPlan(format!(
                "slippage must be in [0, 1), got {}",
                self.slippage
            )));
        }
        Ok(())
    }
}

/// Ordered steps for one sequencer run.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionPlan {
    steps: Vec<PlannedStep>,
}

impl ExecutionPlan {
    /// Build a plan. Steps must be non-empty, and the loop steps they cover
    /// must be strictly increasing across the whole plan.
    pub fn new(steps: Vec<PlannedStep>) -> SequencerResult<Self> {
        if steps.is_empty() {
            return Err(SequencerError::InvalidPlan("plan has no steps".to_string()));
        }

        let mut last: Option<LoopStep> = None;
        for planned in &steps {
            if planned.covers.is_empty() {
                return Err(SequencerError::InvalidPlan(
                    "planned step covers no loop step".to_string(),
                ));
            }
            for step in &planned.covers {
                if let Some(prev) = last {
                    if *step <= prev {
                        return Err(SequencerError::InvalidPlan(format!(
                            "step {step} does not follow {prev}"
                        )));
                    }
                }
                last = Some(*step);
            }
        }

        Ok(Self { steps })
    }

    /// The standard eight-step loop cycle.
    ///
    /// Steps 1-5 are one executor transaction; steps 6-8 are sized from
    /// snapshots taken after the preceding confirmation.
    pub fn loop_cycle(config: &LoopConfig) -> SequencerResult<Self> {
        config.validate()?;
        Self::new(vec![
            PlannedStep::new(
                LoopStep::EVM_FLOW.to_vec(),
                StepSizing::Fixed(StepParams::EvmFlow {
                    min_amount_out: config.min_amount_out,
                    min_initial_amount_out: config.min_initial_amount_out,
                    target_loop_value: config.target_loop_value,
                }),
            ),
            PlannedStep::single(
                LoopStep::SwapOnVenue,
                StepSizing::SwapAll {
                    fraction: config.swap_fraction,
                    slippage: config.slippage,
                },
            ),
            PlannedStep::single(
                LoopStep::TransferToMarginAccount,
                StepSizing::TransferSpotToPerp {
                    fraction: config.transfer_fraction,
                },
            ),
            PlannedStep::single(
                LoopStep::OpenShortPosition,
                StepSizing::ShortFromMargin {
                    fraction: config.short_fraction,
                    leverage: config.short_leverage,
                    slippage: config.slippage,
                },
            ),
        ])
    }

    pub fn steps(&self) -> &[PlannedStep] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}
