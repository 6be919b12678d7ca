//! Order direction types.
//!
//! Spot swaps are expressed with [`OrderSide`], perp positions with
//! [`PositionDirection`], and spot/perp ledger moves with
//! [`TransferDirection`].

use serde::{Deserialize, Serialize};
use std::fmt;

/// Order side: buy or sell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    /// Returns the opposite side.
    pub fn opposite(&self) -> Self {
        match self {
            Self::Buy => Self::Sell,
            Self::Sell => Self::Buy,
        }
    }

    /// Buying lifts the offer, so slippage pushes the limit price up.
    pub fn is_aggressive(&self) -> bool {
        matches!(self, Self::Buy)
    }

    pub fn is_buy(&self) -> bool {
        matches!(self, Self::Buy)
    }
}

impl fmt::Display for OrderSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Buy => write!(f, "buy"),
            Self::Sell => write!(f, "sell"),
        }
    }
}

/// Perpetual position direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PositionDirection {
    Long,
    Short,
}

impl PositionDirection {
    /// Opening a long buys, so it is priced aggressively like a buy.
    pub fn is_aggressive(&self) -> bool {
        matches!(self, Self::Long)
    }

    pub fn is_long(&self) -> bool {
        matches!(self, Self::Long)
    }

    /// Order side used to open a position in this direction.
    pub fn opening_side(&self) -> OrderSide {
        match self {
            Self::Long => OrderSide::Buy,
            Self::Short => OrderSide::Sell,
        }
    }
}

impl fmt::Display for PositionDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Long => write!(f, "long"),
            Self::Short => write!(f, "short"),
        }
    }
}

/// Direction of a USDC class transfer between the spot and perp ledgers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TransferDirection {
    #[default]
    ToPerp,
    ToSpot,
}

impl TransferDirection {
    pub fn is_to_perp(&self) -> bool {
        matches!(self, Self::ToPerp)
    }
}

impl fmt::Display for TransferDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ToPerp => write!(f, "spot->perp"),
            Self::ToSpot => write!(f, "perp->spot"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_side_opposite() {
        assert_eq!(OrderSide::Buy.opposite(), OrderSide::Sell);
        assert_eq!(OrderSide::Sell.opposite(), OrderSide::Buy);
    }

    #[test]
    fn test_aggressive_flags() {
        assert!(OrderSide::Buy.is_aggressive());
        assert!(!OrderSide::Sell.is_aggressive());
        assert!(PositionDirection::Long.is_aggressive());
        assert!(!PositionDirection::Short.is_aggressive());
        assert_eq!(PositionDirection::Short.opening_side(), OrderSide::Sell);
    }

    #[test]
    fn test_transfer_direction_serde() {
        let json = serde_json::to_string(&TransferDirection::ToPerp).unwrap();
        assert_eq!(json, r#""toPerp""#);
        let parsed: TransferDirection = serde_json::from_str(r#""toSpot""#).unwrap();
        assert_eq!(parsed, TransferDirection::ToSpot);
    }
}
