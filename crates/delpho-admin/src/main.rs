//! Delpho admin - entry point.

use anyhow::{Context, Result};
use clap::Parser;
use delpho_admin::{AppConfig, Application, Cli, Command};
use delpho_chain::{Address, TxConfirmation};
use delpho_core::{Network, TokenId, TransferDirection};
use delpho_telemetry::Metrics;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    delpho_telemetry::init_logging()?;
    info!("Starting Delpho admin v{}", env!("CARGO_PKG_VERSION"));

    let config_path = AppConfig::resolve_path(cli.config.clone());
    info!(config_path = %config_path, "Loading configuration");
    let config = AppConfig::load(&config_path)?;
    info!(network = ?config.network, info_url = %config.info_url(), "Configuration loaded");

    let default_slippage = config.slippage;
    let network = config.network;
    let app = Application::new(config)?;

    if let Some(form) = cli.command.to_form(default_slippage)? {
        let confirmation = app.run_form(&form).await?;
        print_confirmation(network, &confirmation);
        return Ok(());
    }
    if let Some(order) = cli.command.to_core_order() {
        let confirmation = app.core_order(&order).await?;
        print_confirmation(network, &confirmation);
        return Ok(());
    }

    match cli.command {
        Command::State => {
            let state = app.complete_state().await?;
            println!("{}", serde_json::to_string_pretty(&state)?);
        }
        Command::Price { asset, kind } => {
            let (price, precision) = app.price(&asset, kind.into()).await?;
            println!(
                "{asset} mid={price} price_decimals={} size_decimals={}",
                precision.price_decimals, precision.size_decimals
            );
        }
        Command::BridgeUsdt { amount } => {
            let confirmation = app.bridge_usdt(amount).await?;
            print_confirmation(network, &confirmation);
        }
        Command::SendToEvm {
            token,
            amount,
            recipient,
        } => {
            let recipient = recipient
                .map(|r| r.parse::<Address>())
                .transpose()
                .context("invalid --recipient")?;
            let confirmation = app.send_to_evm(TokenId(token), recipient, amount).await?;
            print_confirmation(network, &confirmation);
        }
        Command::ClassTransfer { direction, amount } => {
            let confirmation = app
                .class_transfer(amount, TransferDirection::from(direction).is_to_perp())
                .await?;
            print_confirmation(network, &confirmation);
        }
        Command::LoopCycle => {
            let cancel = CancellationToken::new();
            let on_signal = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    warn!("Ctrl-C received, cancelling loop cycle");
                    on_signal.cancel();
                }
            });

            let result = app.loop_cycle(cancel).await;
            match Metrics::render() {
                Ok(text) => debug!(metrics = %text, "Loop cycle metrics"),
                Err(e) => warn!(error = %e, "Failed to render metrics"),
            }
            let report = result?;
            for confirmation in &report.confirmations {
                println!(
                    "{:?} {}tx/{}",
                    confirmation.steps,
                    network.explorer_url(),
                    confirmation.tx_hash
                );
            }
        }
        Command::Swap { .. }
        | Command::Transfer { .. }
        | Command::OpenPosition { .. }
        | Command::CloseShort { .. }
        | Command::CoreOrder { .. } => {}
    }

    Ok(())
}

fn print_confirmation(network: Network, confirmation: &TxConfirmation) {
    println!(
        "{} {}tx/{}",
        confirmation.tx_hash,
        network.explorer_url(),
        confirmation.tx_hash
    );
}
