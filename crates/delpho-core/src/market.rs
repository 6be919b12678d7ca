//! Market, token and action identifiers and per-asset precision.
//!
//! HyperCore addresses spot markets by `10000 + spot index` and perps by
//! their universe index; tokens by their spot token index. Raw actions sent
//! through CoreWriter carry a 3-byte action ID.

use serde::{Deserialize, Serialize};
use std::fmt;

/// HyperCore market (asset) identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MarketId(pub u32);

impl MarketId {
    /// Offset applied to spot universe indices.
    pub const SPOT_OFFSET: u32 = 10_000;

    pub fn new(id: u32) -> Self {
        Self(id)
    }

    /// Asset ID of the `index`-th spot pair.
    pub fn spot(index: u32) -> Self {
        Self(Self::SPOT_OFFSET + index)
    }

    pub fn is_spot(&self) -> bool {
        self.0 >= Self::SPOT_OFFSET
    }

    pub fn index(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for MarketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// HyperCore spot token identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TokenId(pub u64);

impl fmt::Display for TokenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// CoreWriter action identifier. Encoded on the wire as 3 big-endian bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActionId(pub u32);

impl ActionId {
    /// Largest ID representable in the 3-byte header.
    pub const MAX: u32 = 0x00FF_FFFF;

    /// Big-endian 3-byte header form. IDs above [`Self::MAX`] are masked.
    pub fn to_be_bytes3(&self) -> [u8; 3] {
        let b = (self.0 & Self::MAX).to_be_bytes();
        [b[1], b[2], b[3]]
    }
}

/// Scale of limit prices and sizes passed to the executor and CoreWriter.
pub const WIRE_DECIMALS: u32 = 8;

const MAX_PERP_DECIMALS: u32 = 6;
const MAX_SPOT_DECIMALS: u32 = 8;

/// Decimal precision used when pricing and encoding one asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetPrecision {
    /// Decimal places a limit price is truncated to before submission.
    pub price_decimals: u32,
    /// Decimal places of the order size.
    pub size_decimals: u32,
    /// Scale of the integer arguments the executor contract expects.
    pub wire_decimals: u32,
}

impl AssetPrecision {
    pub const fn new(price_decimals: u32, size_decimals: u32, wire_decimals: u32) -> Self {
        Self {
            price_decimals,
            size_decimals,
            wire_decimals,
        }
    }

    /// Precision where prices, sizes and wire scale all use `decimals`.
    pub const fn uniform(decimals: u32) -> Self {
        Self::new(decimals, decimals, decimals)
    }

    /// Perp market: prices carry at most `6 - szDecimals` decimals.
    pub fn perp(sz_decimals: u32) -> Self {
        Self::new(
            MAX_PERP_DECIMALS.saturating_sub(sz_decimals),
            sz_decimals,
            WIRE_DECIMALS,
        )
    }

    /// Spot market: prices carry at most `8 - szDecimals` decimals.
    pub fn spot(sz_decimals: u32) -> Self {
        Self::new(
            MAX_SPOT_DECIMALS.saturating_sub(sz_decimals),
            sz_decimals,
            WIRE_DECIMALS,
        )
    }
}

impl Default for AssetPrecision {
    fn default() -> Self {
        crate::constants::DEFAULT_PRECISION
    }
}
