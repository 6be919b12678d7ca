//! Receipt-confirmed writes to the executor contract and CoreWriter.
//!
//! Every [`ContractWriter`] method returns only after the transaction's
//! receipt is available. A reverted receipt is an error, so a returned
//! [`TxConfirmation`] always means the call succeeded on chain.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use alloy::network::{EthereumWallet, ReceiptResponse};
use alloy::primitives::{Address, B256, U256};
use alloy::providers::{PendingTransactionBuilder, Provider, ProviderBuilder};
use alloy::signers::local::PrivateKeySigner;
use delpho_core::constants::{CORE_WRITER_ADDRESS, TOKEN_USDT};
use delpho_core::TokenId;
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::contracts::{ICoreWriter, IDelphoExecutor};
use crate::error::{ChainError, ChainResult};
use crate::raw_action::RawAction;

/// Boxed future for dyn-compatible async trait methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Proof that a write was mined and succeeded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TxConfirmation {
    pub tx_hash: B256,
    pub block_number: Option<u64>,
}

/// One write, as submitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteCall {
    ExecuteFullEvmFlow {
        min_amount_out: U256,
        min_initial_amount_out: U256,
        target_loop_value: U256,
    },
    SwapUsdtToUsdc {
        is_buy: bool,
        limit_px: u64,
        sz: u64,
    },
    TransferUsdc {
        ntl: u64,
        to_perp: bool,
    },
    OpenHypePosition {
        is_long: bool,
        limit_px: u64,
        sz: u64,
    },
    CloseHypeShort {
        limit_px: u64,
        sz: u64,
    },
    TransferUsdtToCore {
        amount: u64,
    },
    SendRawAction(RawAction),
}

impl WriteCall {
    /// Contract function name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::ExecuteFullEvmFlow { .. } => "executeFullEvmFlow",
            Self::SwapUsdtToUsdc { .. } => "swapUSDT2USDC",
            Self::TransferUsdc { .. } => "transferUSDCFromSpotToPerp",
            Self::OpenHypePosition { .. } => "openHypeShort",
            Self::CloseHypeShort { .. } => "closeHypeShort",
            Self::TransferUsdtToCore { .. } => "transferUSDT2Core",
            Self::SendRawAction(_) => "sendRawAction",
        }
    }
}

/// Write surface of the loop executor.
pub trait ContractWriter: Send + Sync {
    /// Submit `call` and wait for its receipt.
    fn submit(&self, call: WriteCall) -> BoxFuture<'_, ChainResult<TxConfirmation>>;

    /// Address transactions are sent from.
    fn sender(&self) -> Address;

    fn execute_full_evm_flow(
        &self,
        min_amount_out: U256,
        min_initial_amount_out: U256,
        target_loop_value: U256,
    ) -> BoxFuture<'_, ChainResult<TxConfirmation>> {
        self.submit(WriteCall::ExecuteFullEvmFlow {
            min_amount_out,
            min_initial_amount_out,
            target_loop_value,
        })
    }

    fn swap_usdt_to_usdc(
        &self,
        is_buy: bool,
        limit_px: u64,
        sz: u64,
    ) -> BoxFuture<'_, ChainResult<TxConfirmation>> {
        self.submit(WriteCall::SwapUsdtToUsdc {
            is_buy,
            limit_px,
            sz,
        })
    }

    fn transfer_usdc(&self, ntl: u64, to_perp: bool) -> BoxFuture<'_, ChainResult<TxConfirmation>> {
        self.submit(WriteCall::TransferUsdc { ntl, to_perp })
    }

    fn open_hype_position(
        &self,
        is_long: bool,
        limit_px: u64,
        sz: u64,
    ) -> BoxFuture<'_, ChainResult<TxConfirmation>> {
        self.submit(WriteCall::OpenHypePosition {
            is_long,
            limit_px,
            sz,
        })
    }

    fn close_hype_short(&self, limit_px: u64, sz: u64) -> BoxFuture<'_, ChainResult<TxConfirmation>> {
        self.submit(WriteCall::CloseHypeShort { limit_px, sz })
    }

    fn transfer_usdt_to_core(&self, amount: u64) -> BoxFuture<'_, ChainResult<TxConfirmation>> {
        self.submit(WriteCall::TransferUsdtToCore { amount })
    }

    fn send_raw_action(&self, action: RawAction) -> BoxFuture<'_, ChainResult<TxConfirmation>> {
        self.submit(WriteCall::SendRawAction(action))
    }
}

/// Shared writer handle.
pub type DynContractWriter = Arc<dyn ContractWriter>;

/// Move `amount` of `token` from HyperCore to `recipient` on HyperEVM.
///
/// USDT goes through the executor; other tokens are sent with a raw
/// `SpotSend` action.
pub async fn transfer_to_evm(
    writer: &dyn ContractWriter,
    recipient: Address,
    token: TokenId,
    amount: u64,
) -> ChainResult<TxConfirmation> {
    if token == TOKEN_USDT {
        return writer.transfer_usdt_to_core(amount).await;
    }
    writer
        .send_raw_action(RawAction::SpotSend {
            destination: recipient,
            token,
            wei_amount: amount,
        })
        .await
}

/// Writer backed by an alloy provider with a local wallet.
pub struct EvmWriter<P> {
    provider: P,
    executor: Address,
    core_writer: Address,
    sender: Address,
}

impl<P: Provider> EvmWriter<P> {
    pub fn new(provider: P, executor: Address, sender: Address) -> ChainResult<Self> {
        let core_writer = CORE_WRITER_ADDRESS
            .parse()
            .map_err(|_| ChainError::InvalidAddress(CORE_WRITER_ADDRESS.to_string()))?;
        Ok(Self {
            provider,
            executor,
            core_writer,
            sender,
        })
    }

    pub fn executor(&self) -> Address {
        self.executor
    }

    async fn confirm(
        &self,
        call: &'static str,
        pending: PendingTransactionBuilder<alloy::network::Ethereum>,
    ) -> ChainResult<TxConfirmation> {
        let tx_hash = *pending.tx_hash();
        info!(call, %tx_hash, "Transaction submitted, awaiting receipt");

        let receipt = pending.get_receipt().await.map_err(ChainError::rpc)?;
        if !receipt.status() {
            warn!(call, %tx_hash, "Transaction reverted");
            return Err(ChainError::Reverted { call, tx_hash });
        }

        let confirmation = TxConfirmation {
            tx_hash: receipt.transaction_hash(),
            block_number: receipt.block_number(),
        };
        info!(call, %tx_hash, block = ?confirmation.block_number, "Transaction confirmed");
        Ok(confirmation)
    }

    async fn send(&self, call: WriteCall) -> ChainResult<TxConfirmation> {
        let name = call.name();
        debug!(call = name, ?call, "Sending write");

        let executor = IDelphoExecutor::new(self.executor, &self.provider);
        let pending = match call {
            WriteCall::ExecuteFullEvmFlow {
                min_amount_out,
                min_initial_amount_out,
                target_loop_value,
            } => executor
                .executeFullEvmFlow(min_amount_out, min_initial_amount_out, target_loop_value)
                .send()
                .await,
            WriteCall::SwapUsdtToUsdc {
                is_buy,
                limit_px,
                sz,
            } => executor.swapUSDT2USDC(is_buy, limit_px, sz).send().await,
            WriteCall::TransferUsdc { ntl, to_perp } => {
                executor.transferUSDCFromSpotToPerp(ntl, to_perp).send().await
            }
            WriteCall::OpenHypePosition {
                is_long,
                limit_px,
                sz,
            } => executor.openHypeShort(is_long, limit_px, sz).send().await,
            WriteCall::CloseHypeShort { limit_px, sz } => {
                executor.closeHypeShort(limit_px, sz).send().await
            }
            WriteCall::TransferUsdtToCore { amount } => {
                executor.transferUSDT2Core(amount).send().await
            }
            WriteCall::SendRawAction(action) => {
                debug!(action = action.name(), "Relaying raw action");
                ICoreWriter::new(self.core_writer, &self.provider)
                    .sendRawAction(action.encode())
                    .send()
                    .await
            }
        }
        .map_err(ChainError::rpc)?;

        self.confirm(name, pending).await
    }
}

impl<P: Provider + 'static> ContractWriter for EvmWriter<P> {
    fn submit(&self, call: WriteCall) -> BoxFuture<'_, ChainResult<TxConfirmation>> {
        Box::pin(self.send(call))
    }

    fn sender(&self) -> Address {
        self.sender
    }
}

/// Connect an [`EvmWriter`] over HTTP and check the chain ID.
///
/// Nonces and gas are filled by the provider.
pub async fn connect_http(
    rpc_url: &str,
    expected_chain_id: u64,
    signer: PrivateKeySigner,
    executor: Address,
) -> ChainResult<DynContractWriter> {
    let sender = signer.address();
    let url: alloy::transports::http::reqwest::Url = rpc_url
        .parse()
        .map_err(|e| ChainError::Rpc(format!("invalid RPC URL {rpc_url}: {e}")))?;

    let provider = ProviderBuilder::default()
        .with_recommended_fillers()
        .wallet(EthereumWallet::from(signer))
        .connect_http(url);

    let chain_id = provider.get_chain_id().await.map_err(ChainError::rpc)?;
    if chain_id != expected_chain_id {
        return Err(ChainError::ChainMismatch {
            expected: expected_chain_id,
            actual: chain_id,
        });
    }
    info!(chain_id, %sender, %executor, "Connected to HyperEVM RPC");

    Ok(Arc::new(EvmWriter::new(provider, executor, sender)?))
}

/// Recording writer for testing.
///
/// Calls are appended to the journal as `"write:<function>"`. Pass a shared
/// journal to interleave with other mocks.
pub struct MockWriter {
    calls: Mutex<Vec<WriteCall>>,
    fail_on_call: Mutex<Option<usize>>,
    journal: Arc<Mutex<Vec<String>>>,
    sender: Address,
}

impl Default for MockWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl MockWriter {
    pub fn new() -> Self {
        Self::with_journal(Arc::new(Mutex::new(Vec::new())))
    }

    pub fn with_journal(journal: Arc<Mutex<Vec<String>>>) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            fail_on_call: Mutex::new(None),
            journal,
            sender: Address::repeat_byte(0x42),
        }
    }

    /// Make the `n`-th write (1-based) revert.
    pub fn fail_on_call(&self, n: usize) -> &Self {
        *self.fail_on_call.lock() = Some(n);
        self
    }

    pub fn calls(&self) -> Vec<WriteCall> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    pub fn journal(&self) -> Vec<String> {
        self.journal.lock().clone()
    }
}

impl ContractWriter for MockWriter {
    fn submit(&self, call: WriteCall) -> BoxFuture<'_, ChainResult<TxConfirmation>> {
        let name = call.name();
        self.journal.lock().push(format!("write:{name}"));
        let n = {
            let mut calls = self.calls.lock();
            calls.push(call);
            calls.len()
        };

        let tx_hash = B256::with_last_byte(n as u8);
        let outcome = if *self.fail_on_call.lock() == Some(n) {
            Err(ChainError::Reverted {
                call: name,
                tx_hash,
            })
        } else {
            Ok(TxConfirmation {
                tx_hash,
                block_number: Some(n as u64),
            })
        };
        Box::pin(async move { outcome })
    }

    fn sender(&self) -> Address {
        self.sender
    }
}
