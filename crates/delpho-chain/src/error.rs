//! Error types for the write surface.

use alloy::primitives::B256;
use delpho_core::CoreError;
use thiserror::Error;

use crate::keys::KeyError;

#[derive(Debug, Error)]
pub enum ChainError {
    /// No signing key is available.
    #[error("Wallet not connected")]
    WalletNotConnected,

    #[error("Key error: {0}")]
    Key(#[from] KeyError),

    #[error("RPC error: {0}")]
    Rpc(String),

    #[error("Transaction {tx_hash} reverted ({call})")]
    Reverted { call: &'static str, tx_hash: B256 },

    #[error("Connected to chain {actual}, expected {expected}")]
    ChainMismatch { expected: u64, actual: u64 },

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error(transparent)]
    Core(#[from] CoreError),
}

impl ChainError {
    pub(crate) fn rpc(err: impl std::fmt::Display) -> Self {
        Self::Rpc(err.to_string())
    }
}

pub type ChainResult<T> = Result<T, ChainError>;
