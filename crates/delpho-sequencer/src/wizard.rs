//! Single-step trade wizard.
//!
//! Each form derives a default limit price from the venue mid and a
//! slippage, sizes from explicit input or a share of an available balance,
//! and validates into [`StepParams`] before anything is written.

use delpho_chain::{DynContractWriter, TxConfirmation};
use delpho_core::constants::{COIN_HYPE, COIN_USDC, COIN_USDT, DEFAULT_PRECISION, DEFAULT_WIZARD_SLIPPAGE};
use delpho_core::{
    check_minimum_order, AccountSnapshot, AssetPrecision, OrderSide, PositionDirection, Price,
    Size, SlippageAdjustedPrice, TransferDirection,
};
use delpho_telemetry::Metrics;
use delpho_venue::{AssetKind, DynVenueReader};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{SequencerError, SequencerResult};
use crate::step::StepParams;

const HUNDRED: Decimal = Decimal::ONE_HUNDRED;

/// How the user sized a form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SizeInput {
    Explicit(Size),
    /// Percentage (0, 100] of the relevant available balance.
    PercentOfAvailable(Decimal),
}

impl SizeInput {
    fn check_percent(&self) -> SequencerResult<()> {
        if let Self::PercentOfAvailable(pct) = self {
            if *pct <= Decimal::ZERO || *pct > HUNDRED {
                return Err(SequencerError::InvalidInput(format!(
                    "percentage must be in (0, 100], got {pct}"
                )));
            }
        }
        Ok(())
    }

    fn is_percent(&self) -> bool {
        matches!(self, Self::PercentOfAvailable(_))
    }
}

/// USDT0/USDC spot order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapForm {
    pub side: OrderSide,
    /// Size in USDT0.
    pub size: SizeInput,
    pub slippage: Decimal,
    /// Overrides the mid-derived price.
    pub price: Option<Price>,
}

/// USDC move between spot and perp.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferForm {
    pub direction: TransferDirection,
    pub amount: SizeInput,
}

/// HYPE perp position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PositionForm {
    pub direction: PositionDirection,
    /// Size in HYPE; a percentage applies to perp withdrawable margin.
    pub size: SizeInput,
    pub slippage: Decimal,
    pub price: Option<Price>,
}

/// Buy back the HYPE short.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloseForm {
    /// Defaults to the whole open short.
    pub size: Option<Size>,
    pub slippage: Decimal,
    pub price: Option<Price>,
}

impl Default for CloseForm {
    fn default() -> Self {
        Self {
            size: None,
            slippage: DEFAULT_WIZARD_SLIPPAGE,
            price: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepForm {
    Swap(SwapForm),
    Transfer(TransferForm),
    OpenPosition(PositionForm),
    ClosePosition(CloseForm),
}

/// Venue data a form is validated against.
#[derive(Debug, Clone, Default)]
pub struct FormContext {
    pub mid: Option<Price>,
    pub precision: AssetPrecision,
    pub snapshot: Option<AccountSnapshot>,
}

impl StepForm {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Swap(_) => "swap",
            Self::Transfer(_) => "transfer",
            Self::OpenPosition(_) => "open_position",
            Self::ClosePosition(_) => "close_position",
        }
    }

    /// Market the form prices against.
    pub fn market(&self) -> Option<(&'static str, AssetKind)> {
        match self {
            Self::Swap(_) => Some((COIN_USDT, AssetKind::Spot)),
            Self::OpenPosition(_) | Self::ClosePosition(_) => Some((COIN_HYPE, AssetKind::Perp)),
            Self::Transfer(_) => None,
        }
    }

    fn explicit_price(&self) -> Option<Price> {
        match self {
            Self::Swap(f) => f.price,
            Self::OpenPosition(f) => f.price,
            Self::ClosePosition(f) => f.price,
            Self::Transfer(_) => None,
        }
    }

    /// Whether a mid price must be fetched.
    pub fn needs_mid(&self) -> bool {
        self.market().is_some() && self.explicit_price().is_none()
    }

    /// Whether an account snapshot must be fetched.
    pub fn needs_snapshot(&self) -> bool {
        match self {
            Self::Swap(f) => f.size.is_percent(),
            Self::Transfer(f) => f.amount.is_percent(),
            Self::OpenPosition(f) => f.size.is_percent(),
            Self::ClosePosition(f) => f.size.is_none(),
        }
    }

    /// Checks that need no venue data.
    ///
    /// With an explicit price and size the minimum order is enforced here,
    /// before any request is made.
    pub fn precheck(&self) -> SequencerResult<()> {
        if let Some(price) = self.explicit_price() {
            if !price.is_positive() {
                return Err(SequencerError::InvalidInput(format!(
                    "limit price must be positive, got {price}"
                )));
            }
        }
        match self {
            Self::Swap(f) => {
                f.size.check_percent()?;
                check_slippage(f.slippage)?;
                if let (Some(price), SizeInput::Explicit(size)) = (f.price, f.size) {
                    check_minimum_order(size, price)?;
                }
            }
            Self::OpenPosition(f) => {
                f.size.check_percent()?;
                check_slippage(f.slippage)?;
                if let (Some(price), SizeInput::Explicit(size)) = (f.price, f.size) {
                    check_minimum_order(size, price)?;
                }
            }
            Self::ClosePosition(f) => {
                check_slippage(f.slippage)?;
                if let (Some(price), Some(size)) = (f.price, f.size) {
                    check_minimum_order(size, price)?;
                }
            }
            Self::Transfer(f) => {
                f.amount.check_percent()?;
                if let SizeInput::Explicit(amount) = f.amount {
                    if !amount.is_positive() {
                        return Err(SequencerError::InvalidInput(format!(
                            "transfer amount must be positive, got {amount}"
                        )));
                    }
                }
            }
        }
        Ok(())
    }

    /// Build parameters from the form and `ctx`.
    pub fn validate(&self, ctx: &FormContext) -> SequencerResult<StepParams> {
        self.precheck()?;
        let precision = ctx.precision;

        let params = match self {
            Self::Swap(f) => {
                let price = limit_price(
                    f.price,
                    ctx.mid,
                    f.slippage,
                    f.side.is_aggressive(),
                    precision,
                )?;
                let size = match f.size {
                    SizeInput::Explicit(size) => size,
                    SizeInput::PercentOfAvailable(pct) => {
                        let snapshot = require_snapshot(ctx)?;
                        let base = match f.side {
                            OrderSide::Sell => snapshot.spot_available(COIN_USDT),
                            OrderSide::Buy => snapshot.spot_available(COIN_USDC) / price.inner(),
                        };
                        Size::new(base * pct / HUNDRED)
                    }
                }
                .truncate_to_decimals(precision.size_decimals);
                StepParams::Swap {
                    side: f.side,
                    price,
                    size,
                    precision,
                }
            }
            Self::Transfer(f) => {
                let amount = match f.amount {
                    SizeInput::Explicit(amount) => amount.inner(),
                    SizeInput::PercentOfAvailable(pct) => {
                        let snapshot = require_snapshot(ctx)?;
                        let base = match f.direction {
                            TransferDirection::ToPerp => snapshot.spot_available(COIN_USDC),
                            TransferDirection::ToSpot => snapshot.perp_withdrawable(),
                        };
                        base * pct / HUNDRED
                    }
                };
                StepParams::Transfer {
                    amount,
                    direction: f.direction,
                }
            }
            Self::OpenPosition(f) => {
                let price = limit_price(
                    f.price,
                    ctx.mid,
                    f.slippage,
                    f.direction.is_aggressive(),
                    precision,
                )?;
                let size = match f.size {
                    SizeInput::Explicit(size) => size,
                    SizeInput::PercentOfAvailable(pct) => {
                        let snapshot = require_snapshot(ctx)?;
                        Size::new(snapshot.perp_withdrawable() * pct / HUNDRED / price.inner())
                    }
                }
                .truncate_to_decimals(precision.size_decimals);
                StepParams::OpenPosition {
                    direction: f.direction,
                    price,
                    size,
                    precision,
                }
            }
            Self::ClosePosition(f) => {
                // buying back is the aggressive side
                let price = limit_price(f.price, ctx.mid, f.slippage, true, precision)?;
                let size = match f.size {
                    Some(size) => size,
                    None => open_short(require_snapshot(ctx)?)?,
                }
                .truncate_to_decimals(precision.size_decimals);
                StepParams::ClosePosition {
                    price,
                    size,
                    precision,
                }
            }
        };

        params.validate()?;
        Ok(params)
    }
}

fn check_slippage(slippage: Decimal) -> SequencerResult<()> {
    if slippage < Decimal::ZERO || slippage >= Decimal::ONE {
        return Err(SequencerError::InvalidInput(format!(
            "slippage must be in [0, 1), got {slippage}"
        )));
    }
    Ok(())
}

fn limit_price(
    explicit: Option<Price>,
    mid: Option<Price>,
    slippage: Decimal,
    aggressive: bool,
    precision: AssetPrecision,
) -> SequencerResult<Price> {
    if let Some(price) = explicit {
        let price = price.truncate_to_decimals(precision.price_decimals);
        if !price.is_positive() {
            return Err(SequencerError::InvalidInput(format!(
                "limit price must be positive at {} decimals, got {price}",
                precision.price_decimals
            )));
        }
        return Ok(price);
    }
    let mid = mid.ok_or_else(|| SequencerError::InvalidInput("no mid price".to_string()))?;
    let adjusted =
        SlippageAdjustedPrice::compute(mid, slippage, aggressive, precision.price_decimals)?;
    debug!(
        mid = %adjusted.mid,
        price = %adjusted.price,
        offset_bps = ?adjusted.offset_bps(),
        "Limit price from mid"
    );
    Ok(adjusted.price)
}

fn require_snapshot(ctx: &FormContext) -> SequencerResult<&AccountSnapshot> {
    ctx.snapshot
        .as_ref()
        .ok_or_else(|| SequencerError::InvalidInput("account snapshot required".to_string()))
}

fn open_short(snapshot: &AccountSnapshot) -> SequencerResult<Size> {
    snapshot
        .position(COIN_HYPE)
        .filter(|p| p.direction() == Some(PositionDirection::Short))
        .map(|p| p.abs_size())
        .ok_or_else(|| SequencerError::NoPosition {
            coin: COIN_HYPE.to_string(),
        })
}

/// Prepares and submits single steps for one user.
pub struct TradeWizard {
    user: String,
    reader: DynVenueReader,
    writer: DynContractWriter,
    completed: Vec<&'static str>,
}

impl TradeWizard {
    pub fn new(user: impl Into<String>, reader: DynVenueReader, writer: DynContractWriter) -> Self {
        Self {
            user: user.into(),
            reader,
            writer,
            completed: Vec::new(),
        }
    }

    /// Kinds of the steps submitted successfully, in order.
    pub fn completed(&self) -> &[&'static str] {
        &self.completed
    }

    /// Fetch what the form needs and validate it.
    ///
    /// Local checks run first; a form rejected by them causes no request.
    pub async fn prepare(&self, form: &StepForm) -> SequencerResult<StepParams> {
        if let Err(e) = form.precheck() {
            Metrics::validation_rejected(e.reason());
            return Err(e);
        }

        let mut ctx = FormContext::default();
        if let Some((asset, kind)) = form.market() {
            if form.needs_mid() {
                ctx.mid = Some(self.reader.mid_price(asset, kind).await?);
            }
            ctx.precision = match self.reader.asset_precision(asset, kind).await {
                Ok(precision) => precision,
                Err(e) => {
                    warn!(asset, error = %e, "Precision lookup failed, using defaults");
                    DEFAULT_PRECISION
                }
            };
        }
        if form.needs_snapshot() {
            ctx.snapshot = Some(self.reader.account_snapshot(&self.user).await?);
        }

        form.validate(&ctx).inspect_err(|e| Metrics::validation_rejected(e.reason()))
    }

    /// Submit validated parameters and wait for the receipt.
    pub async fn submit(&mut self, params: StepParams) -> SequencerResult<TxConfirmation> {
        params.validate()?;
        let call = params.to_write_call()?;
        let kind = params.kind();

        match self.writer.submit(call).await {
            Ok(confirmation) => {
                Metrics::wizard_submitted(kind, true);
                info!(
                    user = %self.user,
                    kind,
                    tx_hash = %confirmation.tx_hash,
                    "Wizard step confirmed"
                );
                self.completed.push(kind);
                Ok(confirmation)
            }
            Err(e) => {
                Metrics::wizard_submitted(kind, false);
                warn!(user = %self.user, kind, error = %e, "Wizard step failed");
                Err(e.into())
            }
        }
    }

    /// Prepare then submit.
    pub async fn execute(&mut self, form: &StepForm) -> SequencerResult<TxConfirmation> {
        let params = self.prepare(form).await?;
        self.submit(params).await
    }
}
