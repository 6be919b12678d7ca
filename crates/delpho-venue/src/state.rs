//! Aggregate account view built from several info reads.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::types::{
    ClearinghouseState, FrontendOpenOrder, FundingEntry, HistoricalOrder, SpotClearinghouseState,
    TwapSliceFill, UserFill,
};

/// One independently fetched part of [`CompleteState`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum StateSlice {
    Balances,
    Positions,
    OpenOrders,
    TradeHistory,
    FundingHistory,
    OrderHistory,
    ActiveTwaps,
}

impl StateSlice {
    pub const ALL: [StateSlice; 7] = [
        Self::Balances,
        Self::Positions,
        Self::OpenOrders,
        Self::TradeHistory,
        Self::FundingHistory,
        Self::OrderHistory,
        Self::ActiveTwaps,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Balances => "balances",
            Self::Positions => "positions",
            Self::OpenOrders => "open_orders",
            Self::TradeHistory => "trade_history",
            Self::FundingHistory => "funding_history",
            Self::OrderHistory => "order_history",
            Self::ActiveTwaps => "active_twaps",
        }
    }
}

impl fmt::Display for StateSlice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Best-effort view of one account.
///
/// Slices whose read failed hold their default value and are listed in
/// `degraded`. Never used for sizing writes; see `account_snapshot` for that.
#[derive(Debug, Clone, Serialize)]
pub struct CompleteState {
    pub balances: SpotClearinghouseState,
    pub positions: ClearinghouseState,
    pub open_orders: Vec<FrontendOpenOrder>,
    pub trade_history: Vec<UserFill>,
    pub funding_history: Vec<FundingEntry>,
    pub order_history: Vec<HistoricalOrder>,
    pub active_twaps: Vec<TwapSliceFill>,
    pub degraded: Vec<StateSlice>,
    pub fetched_at: DateTime<Utc>,
}

impl Default for CompleteState {
    fn default() -> Self {
        Self {
            balances: SpotClearinghouseState::default(),
            positions: ClearinghouseState::default(),
            open_orders: Vec::new(),
            trade_history: Vec::new(),
            funding_history: Vec::new(),
            order_history: Vec::new(),
            active_twaps: Vec::new(),
            degraded: Vec::new(),
            fetched_at: Utc::now(),
        }
    }
}

impl CompleteState {
    pub fn is_degraded(&self) -> bool {
        !self.degraded.is_empty()
    }

    pub fn is_slice_degraded(&self, slice: StateSlice) -> bool {
        self.degraded.contains(&slice)
    }
}
