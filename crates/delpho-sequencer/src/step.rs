//! Loop steps and the parameters each write carries.

use std::fmt;

use delpho_chain::{WriteCall, U256};
use delpho_core::constants::USDC_TRANSFER_DECIMALS;
use delpho_core::{
    check_minimum_order, to_units, truncate_dp, AssetPrecision, OrderSide, PositionDirection,
    Price, Size, TransferDirection,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{SequencerError, SequencerResult};

/// The eight steps of a loop cycle, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoopStep {
    WithdrawCollateral,
    SupplyCollateral,
    Borrow,
    BridgeToVenue,
    OpenLeveragedPosition,
    SwapOnVenue,
    TransferToMarginAccount,
    OpenShortPosition,
}

impl LoopStep {
    pub const ALL: [LoopStep; 8] = [
        Self::WithdrawCollateral,
        Self::SupplyCollateral,
        Self::Borrow,
        Self::BridgeToVenue,
        Self::OpenLeveragedPosition,
        Self::SwapOnVenue,
        Self::TransferToMarginAccount,
        Self::OpenShortPosition,
    ];

    /// Steps performed on HyperEVM by the executor's full-flow call.
    pub const EVM_FLOW: [LoopStep; 5] = [
        Self::WithdrawCollateral,
        Self::SupplyCollateral,
        Self::Borrow,
        Self::BridgeToVenue,
        Self::OpenLeveragedPosition,
    ];

    /// 1-based position in the cycle.
    pub fn number(&self) -> u8 {
        match self {
            Self::WithdrawCollateral => 1,
            Self::SupplyCollateral => 2,
            Self::Borrow => 3,
            Self::BridgeToVenue => 4,
            Self::OpenLeveragedPosition => 5,
            Self::SwapOnVenue => 6,
            Self::TransferToMarginAccount => 7,
            Self::OpenShortPosition => 8,
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::WithdrawCollateral => "Pulls HYPE from the vault",
            Self::SupplyCollateral => "Supplies 20% of HYPE to HyperLend",
            Self::Borrow => "Borrows 50% of supplied value in USDT",
            Self::BridgeToVenue => "Transfers borrowed USDT to core",
            Self::OpenLeveragedPosition => {
                "Remaining HYPE + flashloan to open a leveraged loop position"
            }
            Self::SwapOnVenue => "Swaps USDT0 to USDC on the spot book",
            Self::TransferToMarginAccount => "Moves USDC from spot to the perp margin account",
            Self::OpenShortPosition => "Opens a HYPE short sized from perp margin",
        }
    }

    /// Label used in logs and metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::WithdrawCollateral => "withdraw_collateral",
            Self::SupplyCollateral => "supply_collateral",
            Self::Borrow => "borrow",
            Self::BridgeToVenue => "bridge_to_venue",
            Self::OpenLeveragedPosition => "open_leveraged_position",
            Self::SwapOnVenue => "swap_on_venue",
            Self::TransferToMarginAccount => "transfer_to_margin_account",
            Self::OpenShortPosition => "open_short_position",
        }
    }
}

impl fmt::Display for LoopStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.number(), self.as_str())
    }
}

/// Parameters of one write. Built before submission and never changed after.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StepParams {
    /// Executor full-flow call covering the HyperEVM half of the cycle.
    EvmFlow {
        min_amount_out: u128,
        min_initial_amount_out: u128,
        /// Loop value in 6-decimal USDT units.
        target_loop_value: u128,
    },
    /// Order on the USDT0/USDC spot pair.
    Swap {
        side: OrderSide,
        price: Price,
        size: Size,
        precision: AssetPrecision,
    },
    /// USDC class transfer between spot and perp.
    Transfer {
        amount: Decimal,
        direction: TransferDirection,
    },
    /// HYPE perp position.
    OpenPosition {
        direction: PositionDirection,
        price: Price,
        size: Size,
        precision: AssetPrecision,
    },
    /// Buy back a HYPE short.
    ClosePosition {
        price: Price,
        size: Size,
        precision: AssetPrecision,
    },
}

impl StepParams {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::EvmFlow { .. } => "evm_flow",
            Self::Swap { .. } => "swap",
            Self::Transfer { .. } => "transfer",
            Self::OpenPosition { .. } => "open_position",
            Self::ClosePosition { .. } => "close_position",
        }
    }

    /// Local checks run before anything is submitted.
    pub fn validate(&self) -> SequencerResult<()> {
        match self {
            Self::EvmFlow {
                target_loop_value, ..
            } => {
                if *target_loop_value == 0 {
                    return Err(SequencerError::InvalidInput(
                        "target loop value must be positive".to_string(),
                    ));
                }
                Ok(())
            }
            Self::Swap { price, size, .. }
            | Self::OpenPosition { price, size, .. }
            | Self::ClosePosition { price, size, .. } => {
                check_minimum_order(*size, *price)?;
                Ok(())
            }
            Self::Transfer { amount, .. } => {
                if truncate_dp(*amount, USDC_TRANSFER_DECIMALS) <= Decimal::ZERO {
                    return Err(SequencerError::InvalidInput(format!(
                        "transfer amount {amount} rounds to zero at {USDC_TRANSFER_DECIMALS} decimals"
                    )));
                }
                Ok(())
            }
        }
    }

    /// Contract call for these parameters, with decimals scaled to integers.
    ///
    /// Prices are truncated to the asset's price precision and sizes to its
    /// size precision before scaling.
    pub fn to_write_call(&self) -> SequencerResult<WriteCall> {
        let call = match self {
            Self::EvmFlow {
                min_amount_out,
                min_initial_amount_out,
                target_loop_value,
            } => WriteCall::ExecuteFullEvmFlow {
                min_amount_out: U256::from(*min_amount_out),
                min_initial_amount_out: U256::from(*min_initial_amount_out),
                target_loop_value: U256::from(*target_loop_value),
            },
            Self::Swap {
                side,
                price,
                size,
                precision,
            } => {
                let (limit_px, sz) = scale_order(*price, *size, precision)?;
                WriteCall::SwapUsdtToUsdc {
                    is_buy: side.is_buy(),
                    limit_px,
                    sz,
                }
            }
            Self::Transfer { amount, direction } => WriteCall::TransferUsdc {
                ntl: to_units(
                    truncate_dp(*amount, USDC_TRANSFER_DECIMALS),
                    USDC_TRANSFER_DECIMALS,
                )?,
                to_perp: direction.is_to_perp(),
            },
            Self::OpenPosition {
                direction,
                price,
                size,
                precision,
            } => {
                let (limit_px, sz) = scale_order(*price, *size, precision)?;
                WriteCall::OpenHypePosition {
                    is_long: direction.is_long(),
                    limit_px,
                    sz,
                }
            }
            Self::ClosePosition {
                price,
                size,
                precision,
            } => {
                let (limit_px, sz) = scale_order(*price, *size, precision)?;
                WriteCall::CloseHypeShort { limit_px, sz }
            }
        };
        Ok(call)
    }
}

fn scale_order(price: Price, size: Size, precision: &AssetPrecision) -> SequencerResult<(u64, u64)> {
    let limit_px = price
        .truncate_to_decimals(precision.price_decimals)
        .to_units(precision.wire_decimals)?;
    let sz = size
        .truncate_to_decimals(precision.size_decimals)
        .to_units(precision.wire_decimals)?;
    Ok((limit_px, sz))
}

#[cfg(test)]
mod tests {
    use super::*;
    use delpho_core::CoreError;
    use rust_decimal_macros::dec;

    #[test]
    fn test_steps_are_ordered() {
        for pair in LoopStep::ALL.windows(2) {
            assert!(pair[0] < pair[1]);
            assert_eq!(pair[0].number() + 1, pair[1].number());
        }
        assert_eq!(LoopStep::EVM_FLOW[..], LoopStep::ALL[..5]);
    }

    #[test]
    fn test_swap_scaling_truncates() {
        let params = StepParams::Swap {
            side: OrderSide::Sell,
            price: Price::new(dec!(0.985059)),
            size: Size::new(dec!(12.349)),
            precision: AssetPrecision::new(5, 2, 8),
        };
        params.validate().unwrap();

        match params.to_write_call().unwrap() {
            WriteCall::SwapUsdtToUsdc {
                is_buy,
                limit_px,
                sz,
            } => {
                assert!(!is_buy);
                assert_eq!(limit_px, 98_505_000);
                assert_eq!(sz, 1_234_000_000);
            }
            other => panic!("unexpected call {other:?}"),
        }
    }

    #[test]
    fn test_transfer_uses_six_decimals() {
        let params = StepParams::Transfer {
            amount: dec!(25.1234567),
            direction: TransferDirection::ToPerp,
        };
        assert_eq!(
            params.to_write_call().unwrap(),
            WriteCall::TransferUsdc {
                ntl: 25_123_456,
                to_perp: true
            }
        );

        let to_spot = StepParams::Transfer {
            amount: dec!(1),
            direction: TransferDirection::ToSpot,
        };
        assert!(matches!(
            to_spot.to_write_call().unwrap(),
            WriteCall::TransferUsdc { to_perp: false, .. }
        ));
    }

    #[test]
    fn test_below_minimum_rejected() {
        let params = StepParams::OpenPosition {
            direction: PositionDirection::Short,
            price: Price::new(dec!(40)),
            size: Size::new(dec!(0.2)),
            precision: AssetPrecision::perp(2),
        };
        assert!(matches!(
            params.validate(),
            Err(SequencerError::Core(CoreError::BelowMinimumOrder { .. }))
        ));
    }

    #[test]
    fn test_non_positive_transfer_rejected() {
        let params = StepParams::Transfer {
            amount: dec!(0),
            direction: TransferDirection::ToPerp,
        };
        assert!(matches!(
            params.validate(),
            Err(SequencerError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_sub_unit_transfer_rejected() {
        let params = StepParams::Transfer {
            amount: dec!(0.0000001),
            direction: TransferDirection::ToPerp,
        };
        assert!(matches!(
            params.validate(),
            Err(SequencerError::InvalidInput(_))
        ));

        let one_unit = StepParams::Transfer {
            amount: dec!(0.000001),
            direction: TransferDirection::ToPerp,
        };
        assert!(one_unit.validate().is_ok());
    }

    #[test]
    fn test_evm_flow_call() {
        let params = StepParams::EvmFlow {
            min_amount_out: 1,
            min_initial_amount_out: 1,
            target_loop_value: 150_000_000,
        };
        assert_eq!(
            params.to_write_call().unwrap(),
            WriteCall::ExecuteFullEvmFlow {
                min_amount_out: U256::from(1u64),
                min_initial_amount_out: U256::from(1u64),
                target_loop_value: U256::from(150_000_000u64),
            }
        );
    }
}
