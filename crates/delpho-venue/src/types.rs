//! Response types of the info endpoint.
//!
//! The venue encodes numbers as decimal strings. Types keep the raw strings
//! and expose parse helpers returning `Decimal`, so a malformed field only
//! fails the caller that actually reads it.

use std::collections::HashMap;

use delpho_core::{AccountSnapshot, PerpPosition, Price, SpotBalance};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{VenueError, VenueResult};

fn parse_decimal(field: &str, raw: &str) -> VenueResult<Decimal> {
    raw.parse()
        .map_err(|e| VenueError::Parse(format!("{field}={raw:?}: {e}")))
}

/// Resting order as returned by `openOrders`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OpenOrder {
    pub coin: String,
    #[serde(rename = "limitPx")]
    pub limit_px: String,
    pub oid: u64,
    /// "A" (ask) or "B" (bid).
    pub side: String,
    pub sz: String,
    pub timestamp: u64,
}

/// Resting order with the extra fields `frontendOpenOrders` adds.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FrontendOpenOrder {
    pub coin: String,
    #[serde(rename = "limitPx")]
    pub limit_px: String,
    pub oid: u64,
    pub side: String,
    pub sz: String,
    pub timestamp: u64,
    #[serde(rename = "origSz", default)]
    pub orig_sz: Option<String>,
    #[serde(rename = "orderType", default)]
    pub order_type: Option<String>,
    #[serde(rename = "reduceOnly", default)]
    pub reduce_only: bool,
    #[serde(rename = "isTrigger", default)]
    pub is_trigger: bool,
    #[serde(rename = "triggerPx", default)]
    pub trigger_px: Option<String>,
    #[serde(default)]
    pub tif: Option<String>,
}

/// One spot token balance from `spotClearinghouseState`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RawSpotBalance {
    pub coin: String,
    #[serde(default)]
    pub token: u64,
    pub total: String,
    #[serde(default = "zero_string")]
    pub hold: String,
    #[serde(rename = "entryNtl", default)]
    pub entry_ntl: Option<String>,
}

fn zero_string() -> String {
    "0".to_string()
}

impl RawSpotBalance {
    pub fn to_balance(&self) -> VenueResult<SpotBalance> {
        Ok(SpotBalance {
            coin: self.coin.clone(),
            total: parse_decimal("total", &self.total)?,
            hold: parse_decimal("hold", &self.hold)?,
        })
    }
}

/// `spotClearinghouseState` response.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct SpotClearinghouseState {
    #[serde(default)]
    pub balances: Vec<RawSpotBalance>,
}

impl SpotClearinghouseState {
    pub fn to_balances(&self) -> VenueResult<Vec<SpotBalance>> {
        self.balances.iter().map(RawSpotBalance::to_balance).collect()
    }
}

/// Margin summary from clearinghouse state.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MarginSummary {
    /// Account value in USD.
    #[serde(rename = "accountValue")]
    pub account_value: String,
    /// Total notional position value.
    #[serde(rename = "totalNtlPos")]
    pub total_notional_position: String,
    #[serde(rename = "totalRawUsd")]
    pub total_raw_usd: String,
    #[serde(rename = "totalMarginUsed")]
    pub total_margin_used: String,
}

impl MarginSummary {
    pub fn account_value_decimal(&self) -> VenueResult<Decimal> {
        parse_decimal("accountValue", &self.account_value)
    }
}

impl Default for MarginSummary {
    fn default() -> Self {
        Self {
            account_value: zero_string(),
            total_notional_position: zero_string(),
            total_raw_usd: zero_string(),
            total_margin_used: zero_string(),
        }
    }
}

/// `clearinghouseState` response (perp account).
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ClearinghouseState {
    #[serde(rename = "marginSummary", default)]
    pub margin_summary: Option<MarginSummary>,
    #[serde(rename = "crossMarginSummary", default)]
    pub cross_margin_summary: Option<MarginSummary>,
    #[serde(rename = "crossMaintenanceMarginUsed", default)]
    pub cross_maintenance_margin_used: Option<String>,
    /// Margin that can leave the perp account.
    #[serde(default)]
    pub withdrawable: Option<String>,
    #[serde(rename = "assetPositions", default)]
    pub asset_positions: Vec<AssetPositionEntry>,
    /// Timestamp in milliseconds.
    #[serde(default)]
    pub time: Option<u64>,
}

impl ClearinghouseState {
    /// Withdrawable margin; absent means zero.
    pub fn withdrawable_decimal(&self) -> VenueResult<Decimal> {
        match &self.withdrawable {
            Some(raw) => parse_decimal("withdrawable", raw),
            None => Ok(Decimal::ZERO),
        }
    }

    pub fn account_value_decimal(&self) -> VenueResult<Decimal> {
        match &self.margin_summary {
            Some(summary) => summary.account_value_decimal(),
            None => Ok(Decimal::ZERO),
        }
    }

    /// Non-empty positions converted to domain form.
    pub fn positions(&self) -> VenueResult<Vec<PerpPosition>> {
        let mut positions = Vec::with_capacity(self.asset_positions.len());
        for entry in &self.asset_positions {
            let data = &entry.position;
            let size = data.size_decimal()?;
            if size.is_zero() {
                continue;
            }
            let entry_price = match &data.entry_px {
                Some(raw) => Some(Price::new(parse_decimal("entryPx", raw)?)),
                None => None,
            };
            positions.push(PerpPosition {
                coin: data.coin.clone(),
                size,
                entry_price,
            });
        }
        Ok(positions)
    }
}

/// Asset position entry from clearinghouseState.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AssetPositionEntry {
    pub position: AssetPositionData,
    /// "oneWay" or "twoWay".
    #[serde(rename = "type")]
    pub position_type: Option<String>,
}

/// Position data within [`AssetPositionEntry`].
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AssetPositionData {
    pub coin: String,
    /// Signed size: positive = long, negative = short.
    pub szi: String,
    #[serde(rename = "entryPx")]
    pub entry_px: Option<String>,
    #[serde(rename = "liquidationPx")]
    pub liquidation_px: Option<String>,
    #[serde(rename = "positionValue")]
    pub position_value: Option<String>,
    #[serde(rename = "unrealizedPnl")]
    pub unrealized_pnl: Option<String>,
    pub leverage: Option<LeverageInfo>,
    #[serde(rename = "marginUsed")]
    pub margin_used: Option<String>,
}

impl AssetPositionData {
    pub fn size_decimal(&self) -> VenueResult<Decimal> {
        parse_decimal("szi", &self.szi)
    }
}

/// Leverage information.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LeverageInfo {
    /// "cross" or "isolated".
    #[serde(rename = "type")]
    pub leverage_type: Option<String>,
    pub value: Option<u32>,
    #[serde(rename = "rawUsd")]
    pub raw_usd: Option<String>,
}

/// `allMids` response: coin name to mid price.
pub type AllMids = HashMap<String, String>;

/// Token entry of `spotMeta`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SpotToken {
    pub name: String,
    #[serde(rename = "szDecimals")]
    pub sz_decimals: u32,
    #[serde(rename = "weiDecimals")]
    pub wei_decimals: u32,
    pub index: u32,
    /// Hex token identifier used by `tokenDetails`.
    #[serde(rename = "tokenId")]
    pub token_id: String,
    #[serde(rename = "isCanonical", default)]
    pub is_canonical: bool,
}

/// Spot pair entry of `spotMeta`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SpotMarket {
    pub name: String,
    /// Base and quote token indices.
    pub tokens: [u32; 2],
    pub index: u32,
    #[serde(rename = "isCanonical", default)]
    pub is_canonical: bool,
}

/// `spotMeta` response.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct SpotMeta {
    #[serde(default)]
    pub tokens: Vec<SpotToken>,
    #[serde(default)]
    pub universe: Vec<SpotMarket>,
}

impl SpotMeta {
    /// Token named `name`, compared case-insensitively.
    pub fn token_by_name(&self, name: &str) -> Option<&SpotToken> {
        self.tokens.iter().find(|t| t.name.eq_ignore_ascii_case(name))
    }
}

/// Perp universe entry of `meta`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PerpAsset {
    pub name: String,
    #[serde(rename = "szDecimals")]
    pub sz_decimals: u32,
    #[serde(rename = "maxLeverage", default)]
    pub max_leverage: Option<u32>,
    #[serde(rename = "isDelisted", default)]
    pub is_delisted: bool,
}

/// `meta` response (perp universe).
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct PerpMeta {
    #[serde(default)]
    pub universe: Vec<PerpAsset>,
}

impl PerpMeta {
    pub fn asset_by_name(&self, name: &str) -> Option<&PerpAsset> {
        self.universe.iter().find(|a| a.name.eq_ignore_ascii_case(name))
    }
}

/// `tokenDetails` response.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenDetails {
    pub name: String,
    #[serde(default)]
    pub max_supply: Option<String>,
    #[serde(default)]
    pub total_supply: Option<String>,
    #[serde(default)]
    pub circulating_supply: Option<String>,
    pub sz_decimals: u32,
    pub wei_decimals: u32,
    #[serde(default)]
    pub mid_px: Option<String>,
    #[serde(default)]
    pub mark_px: Option<String>,
    #[serde(default)]
    pub prev_day_px: Option<String>,
    #[serde(default)]
    pub deployer: Option<String>,
}

impl TokenDetails {
    /// Mid price, `None` when the venue omits it.
    pub fn mid_price(&self) -> VenueResult<Option<Price>> {
        match &self.mid_px {
            Some(raw) => Ok(Some(Price::new(parse_decimal("midPx", raw)?))),
            None => Ok(None),
        }
    }
}

/// Trade fill from `userFills`.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserFill {
    pub coin: String,
    pub px: String,
    pub sz: String,
    pub side: String,
    pub time: u64,
    #[serde(default)]
    pub start_position: Option<String>,
    #[serde(default)]
    pub dir: Option<String>,
    #[serde(default)]
    pub closed_pnl: Option<String>,
    #[serde(default)]
    pub hash: Option<String>,
    pub oid: u64,
    #[serde(default)]
    pub crossed: bool,
    #[serde(default)]
    pub fee: Option<String>,
    #[serde(default)]
    pub fee_token: Option<String>,
}

/// Funding payment detail.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FundingDelta {
    #[serde(rename = "type", default)]
    pub delta_type: Option<String>,
    pub coin: String,
    pub usdc: String,
    pub szi: String,
    pub funding_rate: String,
}

/// Entry of `userFunding`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FundingEntry {
    pub time: u64,
    #[serde(default)]
    pub hash: Option<String>,
    pub delta: FundingDelta,
}

/// Entry of `historicalOrders`.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoricalOrder {
    pub order: FrontendOpenOrder,
    /// "filled", "open", "canceled", "triggered", "rejected" or "marginCanceled".
    pub status: String,
    pub status_timestamp: u64,
}

/// Entry of `userTwapSliceFills`.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TwapSliceFill {
    pub fill: UserFill,
    pub twap_id: u64,
}

/// Join spot and perp state into one account snapshot.
pub fn build_snapshot(
    user: &str,
    spot: &SpotClearinghouseState,
    perp: &ClearinghouseState,
) -> VenueResult<AccountSnapshot> {
    Ok(AccountSnapshot {
        address: user.to_string(),
        spot_balances: spot.to_balances()?,
        perp_withdrawable: perp.withdrawable_decimal()?,
        perp_account_value: perp.account_value_decimal()?,
        positions: perp.positions()?,
        fetched_at: chrono::Utc::now(),
    })
}
