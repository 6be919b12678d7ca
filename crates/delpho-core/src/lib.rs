//! Core domain types for the Delpho loop operator.
//!
//! This crate provides fundamental types used throughout the workspace:
//! - `Price`, `Size`: precision-safe numeric types with truncating unit conversion
//! - `OrderSide`, `PositionDirection`, `TransferDirection`: trade directions
//! - `MarketId`, `TokenId`, `ActionId`, `AssetPrecision`: venue identifiers
//! - `AccountSnapshot`: immutable balances/positions for one address
//! - Slippage and minimum-order helpers

pub mod constants;
pub mod decimal;
pub mod error;
pub mod market;
pub mod order;
pub mod pricing;
pub mod snapshot;

pub use constants::Network;
pub use decimal::{to_units, truncate_dp, Price, Size};
pub use error::{CoreError, Result};
pub use market::{ActionId, AssetPrecision, MarketId, TokenId, WIRE_DECIMALS};
pub use order::{OrderSide, PositionDirection, TransferDirection};
pub use pricing::{
    check_minimum_order, minimum_order_size, price_with_slippage, SlippageAdjustedPrice,
};
pub use snapshot::{AccountSnapshot, PerpPosition, SpotBalance};
