//! Command orchestration.
//!
//! Builds the info client and, for write commands, the signing writer, then
//! runs a single wizard step or a full loop cycle.

use std::sync::Arc;

use delpho_chain::{
    connect_http, load_signer, transfer_to_evm, Address, ChainError, ContractWriter,
    DynContractWriter, KeySource, RawAction, TimeInForce, TxConfirmation,
};
use delpho_core::constants::{
    COIN_HYPE, COIN_USDT, MARKET_HYPE_PERP, MARKET_USDT_USDC_SPOT, USDC_TRANSFER_DECIMALS,
};
use delpho_core::{
    check_minimum_order, to_units, truncate_dp, AssetPrecision, MarketId, OrderSide, Price, Size,
    TokenId,
};
use delpho_sequencer::{
    progress_channel, ExecutionPlan, LoopSequencer, Progress, RunReport, StepForm, TradeWizard,
};
use delpho_telemetry::Metrics;
use delpho_venue::{AssetKind, CompleteState, DynVenueReader, InfoClient};
use rust_decimal::Decimal;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::AppConfig;
use crate::error::{AppError, AppResult};

/// Limit order for the CoreWriter `limitOrder` action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoreOrder {
    pub kind: AssetKind,
    pub side: OrderSide,
    pub price: Price,
    pub size: Size,
    pub tif: TimeInForce,
    pub reduce_only: bool,
}

pub struct Application {
    config: AppConfig,
    info: Arc<InfoClient>,
}

impl Application {
    pub fn new(config: AppConfig) -> AppResult<Self> {
        let info = Arc::new(InfoClient::http(config.info_url())?);
        Ok(Self { config, info })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    fn reader(&self) -> DynVenueReader {
        self.info.clone()
    }

    /// Load the key and connect the executor writer.
    ///
    /// A missing key is reported as "wallet not connected".
    pub async fn connect_writer(&self) -> AppResult<DynContractWriter> {
        let source = KeySource::from(&self.config.key);
        let signer = match load_signer(&source, self.config.signer_address()?) {
            Ok(signer) => signer,
            Err(e) if e.is_missing() => {
                warn!(key_source = %source.describe(), error = %e, "Signing key not available");
                return Err(ChainError::WalletNotConnected.into());
            }
            Err(e) => return Err(ChainError::Key(e).into()),
        };
        info!(key_source = %source.describe(), signer = %signer.address(), "Signing key loaded");

        let writer = connect_http(
            self.config.rpc_url(),
            self.config.network.chain_id(),
            signer,
            self.config.executor_address()?,
        )
        .await?;
        Ok(writer)
    }

    /// Account to read: configured user, else the signer.
    fn user(&self, writer: Option<&DynContractWriter>) -> AppResult<String> {
        if let Some(user) = &self.config.user_address {
            return Ok(user.clone());
        }
        writer
            .map(|w| w.sender().to_string())
            .ok_or_else(|| AppError::Config("user_address is not set".to_string()))
    }

    /// Best-effort complete state; failed slices are reported, not fatal.
    pub async fn complete_state(&self) -> AppResult<CompleteState> {
        let user = self.user(None)?;
        let state = self.info.complete_state(&user).await;
        for slice in &state.degraded {
            Metrics::venue_slice_degraded(slice.as_str());
        }
        if state.is_degraded() {
            warn!(
                user = %user,
                degraded = ?state.degraded,
                "Complete state returned defaults for failed slices"
            );
        }
        Ok(state)
    }

    pub async fn price(&self, asset: &str, kind: AssetKind) -> AppResult<(Price, AssetPrecision)> {
        let price = self.info.asset_price(asset, kind).await?;
        let precision = self.info.asset_precision(asset, kind).await?;
        Ok((price, precision))
    }

    /// Validate and submit one wizard form.
    pub async fn run_form(&self, form: &StepForm) -> AppResult<TxConfirmation> {
        // fail on local checks before touching the key
        form.precheck()?;
        let writer = self.connect_writer().await?;
        let user = self.user(Some(&writer))?;
        let mut wizard = TradeWizard::new(user, self.reader(), writer);
        Ok(wizard.execute(form).await?)
    }

    /// Bridge HyperEVM USDT to HyperCore through the executor.
    pub async fn bridge_usdt(&self, amount: Decimal) -> AppResult<TxConfirmation> {
        let units = to_units(truncate_dp(amount, USDC_TRANSFER_DECIMALS), USDC_TRANSFER_DECIMALS)?;
        if units == 0 {
            return Err(AppError::Config(format!("amount {amount} rounds to zero")));
        }
        let writer = self.connect_writer().await?;
        Ok(writer.transfer_usdt_to_core(units).await?)
    }

    /// Send a HyperCore spot token to an address on HyperEVM.
    pub async fn send_to_evm(
        &self,
        token: TokenId,
        recipient: Option<Address>,
        wei_amount: u64,
    ) -> AppResult<TxConfirmation> {
        let writer = self.connect_writer().await?;
        let recipient = recipient.unwrap_or_else(|| writer.sender());
        Ok(transfer_to_evm(writer.as_ref(), recipient, token, wei_amount).await?)
    }

    /// Limit order sent straight to CoreWriter, bypassing the executor.
    pub async fn core_order(&self, order: &CoreOrder) -> AppResult<TxConfirmation> {
        let (asset, market) = order_market(order.kind);
        let precision = self.info.asset_precision(asset, order.kind).await?;
        let action = limit_order_action(order, market, precision)?;
        let writer = self.connect_writer().await?;
        info!(action = action.name(), market = %market, side = ?order.side, "Sending raw action");
        Ok(writer.send_raw_action(action).await?)
    }

    /// Move USDC between spot and perp with a CoreWriter class transfer.
    pub async fn class_transfer(&self, amount: Decimal, to_perp: bool) -> AppResult<TxConfirmation> {
        let action = class_transfer_action(amount, to_perp)?;
        let writer = self.connect_writer().await?;
        info!(action = action.name(), amount = %amount, to_perp, "Sending raw action");
        Ok(writer.send_raw_action(action).await?)
    }

    /// Run the full loop cycle until done, aborted or `cancel` fires.
    pub async fn loop_cycle(&self, cancel: CancellationToken) -> AppResult<RunReport> {
        let plan = ExecutionPlan::loop_cycle(&self.config.loop_cycle)?;
        let writer = self.connect_writer().await?;
        let user = self.user(Some(&writer))?;

        let (tx, mut rx) = progress_channel();
        let mut sequencer = LoopSequencer::new(plan, user, self.reader(), writer)
            .with_step_timeout(self.config.step_timeout())
            .with_cancellation(cancel)
            .with_progress(tx);

        let reporter = tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                log_progress(&event);
            }
        });

        let result = sequencer.run().await;
        drop(sequencer);
        if let Err(e) = reporter.await {
            debug!(error = %e, "Progress reporter ended abnormally");
        }
        Ok(result?)
    }
}

fn log_progress(event: &Progress) {
    match event {
        Progress::StepStarted { step, description } => {
            info!(step = %step, "Step {}: {}", step.number(), description);
        }
        Progress::StepSubmitted { step, params } => {
            debug!(step = %step, kind = params.kind(), "Step submitted");
        }
        Progress::StepConfirmed { steps, tx_hash } => {
            info!(steps = ?steps, tx_hash = %tx_hash, "Confirmed");
        }
        Progress::SequenceFinished { run_id } => {
            info!(run_id = %run_id, "Loop cycle complete");
        }
        Progress::SequenceAborted {
            at,
            reason,
            cancelled,
        } => {
            warn!(step = %at, cancelled, reason = %reason, "Loop cycle stopped");
        }
    }
}

fn order_market(kind: AssetKind) -> (&'static str, MarketId) {
    match kind {
        AssetKind::Perp => (COIN_HYPE, MARKET_HYPE_PERP),
        AssetKind::Spot => (COIN_USDT, MARKET_USDT_USDC_SPOT),
    }
}

fn limit_order_action(
    order: &CoreOrder,
    market: MarketId,
    precision: AssetPrecision,
) -> AppResult<RawAction> {
    let price = order.price.truncate_to_decimals(precision.price_decimals);
    let size = order.size.truncate_to_decimals(precision.size_decimals);
    check_minimum_order(size, price)?;
    Ok(RawAction::LimitOrder {
        asset: market,
        is_buy: order.side.is_buy(),
        limit_px: price.to_units(precision.wire_decimals)?,
        sz: size.to_units(precision.wire_decimals)?,
        reduce_only: order.reduce_only,
        tif: order.tif,
        cloid: 0,
    })
}

fn class_transfer_action(amount: Decimal, to_perp: bool) -> AppResult<RawAction> {
    let ntl = to_units(truncate_dp(amount, USDC_TRANSFER_DECIMALS), USDC_TRANSFER_DECIMALS)?;
    if ntl == 0 {
        return Err(AppError::Config(format!("amount {amount} rounds to zero")));
    }
    Ok(RawAction::UsdClassTransfer { ntl, to_perp })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::KeyConfig;
    use delpho_core::CoreError;
    use rust_decimal_macros::dec;

    fn perp_order(price: Decimal, size: Decimal) -> CoreOrder {
        CoreOrder {
            kind: AssetKind::Perp,
            side: OrderSide::Buy,
            price: Price::new(price),
            size: Size::new(size),
            tif: TimeInForce::Ioc,
            reduce_only: true,
        }
    }

    #[test]
    fn test_limit_order_truncates_and_scales() {
        let order = perp_order(dec!(40.123456), dec!(0.559));
        let (asset, market) = order_market(order.kind);
        assert_eq!(asset, COIN_HYPE);

        let action = limit_order_action(&order, market, AssetPrecision::perp(2)).unwrap();
        assert_eq!(
            action,
            RawAction::LimitOrder {
                asset: MARKET_HYPE_PERP,
                is_buy: true,
                limit_px: 4_012_340_000,
                sz: 55_000_000,
                reduce_only: true,
                tif: TimeInForce::Ioc,
                cloid: 0,
            }
        );
    }

    #[test]
    fn test_limit_order_rejects_bad_values() {
        let precision = AssetPrecision::perp(2);
        assert!(matches!(
            limit_order_action(&perp_order(dec!(40), dec!(0.1)), MARKET_HYPE_PERP, precision),
            Err(AppError::Core(CoreError::BelowMinimumOrder { .. }))
        ));
        // truncates to zero at four price decimals
        assert!(matches!(
            limit_order_action(&perp_order(dec!(0.00001), dec!(1)), MARKET_HYPE_PERP, precision),
            Err(AppError::Core(CoreError::InvalidPrice(_)))
        ));
    }

    #[test]
    fn test_class_transfer_action() {
        assert_eq!(
            class_transfer_action(dec!(12.3456789), false).unwrap(),
            RawAction::UsdClassTransfer {
                ntl: 12_345_678,
                to_perp: false,
            }
        );
        assert!(class_transfer_action(dec!(0.0000009), true).is_err());
    }

    #[tokio::test]
    async fn test_missing_key_file_is_wallet_not_connected() {
        let config = AppConfig {
            key: KeyConfig::File {
                path: std::env::temp_dir().join("delpho-admin-key-that-does-not-exist"),
            },
            ..AppConfig::default()
        };
        let app = Application::new(config).unwrap();
        assert!(matches!(
            app.connect_writer().await,
            Err(AppError::Chain(ChainError::WalletNotConnected))
        ));
    }
}
