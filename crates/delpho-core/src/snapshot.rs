//! Point-in-time account state on the order-book venue.
//!
//! An [`AccountSnapshot`] is immutable and returned by value from each fetch.
//! There is no shared cache: whoever needs fresher balances fetches again.

use crate::decimal::{Price, Size};
use crate::order::PositionDirection;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Spot balance for one coin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpotBalance {
    pub coin: String,
    pub total: Decimal,
    /// Amount reserved by resting orders.
    pub hold: Decimal,
}

impl SpotBalance {
    /// Balance not locked by open orders.
    pub fn available(&self) -> Decimal {
        (self.total - self.hold).max(Decimal::ZERO)
    }
}

/// Open perpetual position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PerpPosition {
    pub coin: String,
    /// Signed size: positive = long, negative = short.
    pub size: Decimal,
    pub entry_price: Option<Price>,
}

impl PerpPosition {
    pub fn direction(&self) -> Option<PositionDirection> {
        if self.size > Decimal::ZERO {
            Some(PositionDirection::Long)
        } else if self.size < Decimal::ZERO {
            Some(PositionDirection::Short)
        } else {
            None
        }
    }

    /// Unsigned position size.
    pub fn abs_size(&self) -> Size {
        Size::new(self.size.abs())
    }
}

/// Balances and positions of one address at one instant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountSnapshot {
    pub address: String,
    pub spot_balances: Vec<SpotBalance>,
    /// Margin that can leave the perp account.
    pub perp_withdrawable: Decimal,
    pub perp_account_value: Decimal,
    pub positions: Vec<PerpPosition>,
    pub fetched_at: DateTime<Utc>,
}

impl AccountSnapshot {
    pub fn empty(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            spot_balances: Vec::new(),
            perp_withdrawable: Decimal::ZERO,
            perp_account_value: Decimal::ZERO,
            positions: Vec::new(),
            fetched_at: Utc::now(),
        }
    }

    /// Total spot balance of `coin`, zero when the coin is absent.
    pub fn spot_balance(&self, coin: &str) -> Decimal {
        self.spot_entry(coin).map(|b| b.total).unwrap_or(Decimal::ZERO)
    }

    /// Spot balance of `coin` not held by open orders.
    pub fn spot_available(&self, coin: &str) -> Decimal {
        self.spot_entry(coin)
            .map(SpotBalance::available)
            .unwrap_or(Decimal::ZERO)
    }

    pub fn perp_withdrawable(&self) -> Decimal {
        self.perp_withdrawable
    }

    /// Position in `coin` (case-insensitive), if any non-zero position exists.
    pub fn position(&self, coin: &str) -> Option<&PerpPosition> {
        self.positions
            .iter()
            .find(|p| p.coin.eq_ignore_ascii_case(coin) && !p.size.is_zero())
    }

    /// Age of this snapshot in milliseconds.
    pub fn age_ms(&self) -> i64 {
        (Utc::now() - self.fetched_at).num_milliseconds()
    }

    fn spot_entry(&self, coin: &str) -> Option<&SpotBalance> {
        self.spot_balances
            .iter()
            .find(|b| b.coin.eq_ignore_ascii_case(coin))
    }
}
