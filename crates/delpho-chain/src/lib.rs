//! HyperEVM write surface for the Delpho loop operator.
//!
//! - `contracts`: `sol!` bindings for the loop executor and CoreWriter
//! - `raw_action`: versioned CoreWriter action encoding
//! - `keys`: signing key loading
//! - `writer`: receipt-confirmed writes behind the `ContractWriter` trait

pub mod contracts;
pub mod error;
pub mod keys;
pub mod raw_action;
pub mod writer;

pub use error::{ChainError, ChainResult};
pub use keys::{load_signer, signer_from_bytes, KeyError, KeySource};
pub use raw_action::{RawAction, TimeInForce};
pub use writer::{
    connect_http, transfer_to_evm, BoxFuture, ContractWriter, DynContractWriter,
    EvmWriter, MockWriter, TxConfirmation, WriteCall,
};

// Re-exported so callers need no direct alloy dependency for argument types.
pub use alloy::primitives::{Address, B256, U256};
