//! Command-line surface.

use clap::{Args, Parser, Subcommand, ValueEnum};
use delpho_chain::TimeInForce;
use delpho_core::{OrderSide, PositionDirection, Price, Size, TransferDirection};
use delpho_sequencer::{CloseForm, PositionForm, SizeInput, StepForm, SwapForm, TransferForm};
use delpho_venue::AssetKind;
use rust_decimal::Decimal;

use crate::app::CoreOrder;
use crate::error::{AppError, AppResult};

/// Delpho loop operator admin tool
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Configuration file path (can also be set via DELPHO_CONFIG env var)
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print balances, positions, orders and history for the user
    State,
    /// Print the mid price and precision of an asset
    Price {
        asset: String,
        #[arg(long, value_enum, default_value_t = MarketKind::Perp)]
        kind: MarketKind,
    },
    /// Trade USDT0 against USDC on the spot book
    Swap {
        #[arg(long, value_enum)]
        side: Side,
        #[command(flatten)]
        amount: AmountArgs,
        #[command(flatten)]
        pricing: PricingArgs,
    },
    /// Move USDC between the spot and perp accounts
    Transfer {
        #[arg(long, value_enum)]
        direction: Direction,
        #[command(flatten)]
        amount: AmountArgs,
    },
    /// Open a HYPE perp position
    OpenPosition {
        #[arg(long, value_enum)]
        direction: PositionSide,
        #[command(flatten)]
        amount: AmountArgs,
        #[command(flatten)]
        pricing: PricingArgs,
    },
    /// Buy back the HYPE short (whole position unless --size is given)
    CloseShort {
        #[arg(long)]
        size: Option<Decimal>,
        #[command(flatten)]
        pricing: PricingArgs,
    },
    /// Bridge HyperEVM USDT to HyperCore
    BridgeUsdt {
        #[arg(long)]
        amount: Decimal,
    },
    /// Send a HyperCore spot token to HyperEVM
    SendToEvm {
        #[arg(long)]
        token: u64,
        /// Raw token units
        #[arg(long)]
        amount: u64,
        /// Defaults to the signer
        #[arg(long)]
        recipient: Option<String>,
    },
    /// Run the full eight-step loop cycle
    LoopCycle,
    /// Send a limit order straight to CoreWriter
    CoreOrder {
        #[arg(long, value_enum, default_value_t = MarketKind::Perp)]
        kind: MarketKind,
        #[arg(long, value_enum)]
        side: Side,
        #[arg(long)]
        price: Decimal,
        #[arg(long)]
        size: Decimal,
        #[arg(long, value_enum, default_value_t = Tif::Gtc)]
        tif: Tif,
        #[arg(long)]
        reduce_only: bool,
    },
    /// Move USDC between spot and perp with a CoreWriter class transfer
    ClassTransfer {
        #[arg(long, value_enum)]
        direction: Direction,
        #[arg(long)]
        amount: Decimal,
    },
}

#[derive(Args, Debug, Clone, Copy)]
pub struct AmountArgs {
    /// Explicit size or amount
    #[arg(long, conflicts_with = "percent")]
    pub size: Option<Decimal>,
    /// Percentage of the available balance
    #[arg(long)]
    pub percent: Option<Decimal>,
}

impl AmountArgs {
    pub fn to_input(self) -> AppResult<SizeInput> {
        match (self.size, self.percent) {
            (Some(size), None) => Ok(SizeInput::Explicit(Size::new(size))),
            (None, Some(pct)) => Ok(SizeInput::PercentOfAvailable(pct)),
            _ => Err(AppError::Config(
                "exactly one of --size or --percent is required".to_string(),
            )),
        }
    }
}

#[derive(Args, Debug, Clone, Copy)]
pub struct PricingArgs {
    /// Limit price; defaults to mid adjusted by slippage
    #[arg(long)]
    pub price: Option<Decimal>,
    /// Slippage fraction; defaults to the configured slippage
    #[arg(long)]
    pub slippage: Option<Decimal>,
}

impl PricingArgs {
    fn resolve(self, default_slippage: Decimal) -> (Option<Price>, Decimal) {
        (
            self.price.map(Price::new),
            self.slippage.unwrap_or(default_slippage),
        )
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarketKind {
    Spot,
    Perp,
}

impl From<MarketKind> for AssetKind {
    fn from(kind: MarketKind) -> Self {
        match kind {
            MarketKind::Spot => AssetKind::Spot,
            MarketKind::Perp => AssetKind::Perp,
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Buy,
    Sell,
}

impl From<Side> for OrderSide {
    fn from(side: Side) -> Self {
        match side {
            Side::Buy => OrderSide::Buy,
            Side::Sell => OrderSide::Sell,
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tif {
    /// Post-only
    Alo,
    Gtc,
    Ioc,
}

impl From<Tif> for TimeInForce {
    fn from(tif: Tif) -> Self {
        match tif {
            Tif::Alo => TimeInForce::Alo,
            Tif::Gtc => TimeInForce::Gtc,
            Tif::Ioc => TimeInForce::Ioc,
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PositionSide {
    Long,
    Short,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    ToPerp,
    ToSpot,
}

impl From<Direction> for TransferDirection {
    fn from(direction: Direction) -> Self {
        match direction {
            Direction::ToPerp => TransferDirection::ToPerp,
            Direction::ToSpot => TransferDirection::ToSpot,
        }
    }
}

impl Command {
    /// CoreWriter limit order for `core-order`; `None` for the rest.
    pub fn to_core_order(&self) -> Option<CoreOrder> {
        match *self {
            Self::CoreOrder {
                kind,
                side,
                price,
                size,
                tif,
                reduce_only,
            } => Some(CoreOrder {
                kind: kind.into(),
                side: side.into(),
                price: Price::new(price),
                size: Size::new(size),
                tif: tif.into(),
                reduce_only,
            }),
            _ => None,
        }
    }

    /// Wizard form for trade commands; `None` for the rest.
    pub fn to_form(&self, default_slippage: Decimal) -> AppResult<Option<StepForm>> {
        let form = match self {
            Self::Swap {
                side,
                amount,
                pricing,
            } => {
                let (price, slippage) = pricing.resolve(default_slippage);
                StepForm::Swap(SwapForm {
                    side: (*side).into(),
                    size: amount.to_input()?,
                    slippage,
                    price,
                })
            }
            Self::Transfer { direction, amount } => StepForm::Transfer(TransferForm {
                direction: (*direction).into(),
                amount: amount.to_input()?,
            }),
            Self::OpenPosition {
                direction,
                amount,
                pricing,
            } => {
                let (price, slippage) = pricing.resolve(default_slippage);
                StepForm::OpenPosition(PositionForm {
                    direction: match direction {
                        PositionSide::Long => PositionDirection::Long,
                        PositionSide::Short => PositionDirection::Short,
                    },
                    size: amount.to_input()?,
                    slippage,
                    price,
                })
            }
            Self::CloseShort { size, pricing } => {
                let (price, slippage) = pricing.resolve(default_slippage);
                StepForm::ClosePosition(CloseForm {
                    size: size.map(Size::new),
                    slippage,
                    price,
                })
            }
            _ => return Ok(None),
        };
        Ok(Some(form))
    }
}
