//! Client for the order-book/perp info API.
//!
//! Plain reads map one-to-one onto `POST /info` request types. Two derived
//! reads exist with different failure contracts:
//! - [`InfoClient::complete_state`] never fails; failed slices are defaulted
//!   and reported in `CompleteState::degraded`.
//! - [`InfoClient::account_snapshot`] fails if either half fails, because its
//!   output sizes writes.

use std::sync::Arc;

use chrono::Utc;
use delpho_core::{AccountSnapshot, AssetPrecision, Price};
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

use crate::error::{VenueError, VenueResult};
use crate::state::{CompleteState, StateSlice};
use crate::transport::{HttpTransport, InfoRequest, InfoTransport};
use crate::types::{
    build_snapshot, AllMids, ClearinghouseState, FrontendOpenOrder, FundingEntry,
    HistoricalOrder, OpenOrder, PerpMeta, SpotClearinghouseState, SpotMeta, TokenDetails,
    TwapSliceFill, UserFill,
};

/// Funding history window used by `complete_state` (30 days).
pub const DEFAULT_FUNDING_LOOKBACK_MS: u64 = 30 * 24 * 60 * 60 * 1000;

/// Shared transport handle.
pub type DynInfoTransport = Arc<dyn InfoTransport>;

/// Which market a price or precision lookup refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetKind {
    /// Spot token; priced from token details `midPx`.
    Spot,
    /// Perp market; priced from `allMids`.
    Perp,
}

/// Info API client.
#[derive(Clone)]
pub struct InfoClient {
    transport: DynInfoTransport,
    funding_lookback_ms: u64,
}

impl InfoClient {
    pub fn new(transport: DynInfoTransport) -> Self {
        Self {
            transport,
            funding_lookback_ms: DEFAULT_FUNDING_LOOKBACK_MS,
        }
    }

    /// Client over HTTP for `info_url`.
    pub fn http(info_url: impl Into<String>) -> VenueResult<Self> {
        Ok(Self::new(Arc::new(HttpTransport::new(info_url)?)))
    }

    pub fn with_funding_lookback_ms(mut self, lookback_ms: u64) -> Self {
        self.funding_lookback_ms = lookback_ms;
        self
    }

    async fn request<R: DeserializeOwned>(&self, request: InfoRequest) -> VenueResult<R> {
        let body = self.transport.post(&request).await?;
        // The venue answers `null` for unknown users/tokens.
        if body.is_null() {
            return Err(VenueError::NotFound(request.request_type().to_string()));
        }
        serde_json::from_value(body)
            .map_err(|e| VenueError::Parse(format!("{}: {e}", request.request_type())))
    }

    pub async fn user_open_orders(&self, user: &str) -> VenueResult<Vec<OpenOrder>> {
        self.request(InfoRequest::OpenOrders {
            user: user.to_string(),
        })
        .await
    }

    pub async fn frontend_open_orders(&self, user: &str) -> VenueResult<Vec<FrontendOpenOrder>> {
        self.request(InfoRequest::FrontendOpenOrders {
            user: user.to_string(),
        })
        .await
    }

    pub async fn spot_clearinghouse_state(&self, user: &str) -> VenueResult<SpotClearinghouseState> {
        self.request(InfoRequest::SpotClearinghouseState {
            user: user.to_string(),
        })
        .await
    }

    pub async fn clearinghouse_state(&self, user: &str) -> VenueResult<ClearinghouseState> {
        self.request(InfoRequest::ClearinghouseState {
            user: user.to_string(),
        })
        .await
    }

    pub async fn all_mids(&self) -> VenueResult<AllMids> {
        self.request(InfoRequest::AllMids).await
    }

    pub async fn perp_meta(&self) -> VenueResult<PerpMeta> {
        self.request(InfoRequest::Meta).await
    }

    pub async fn spot_meta(&self) -> VenueResult<SpotMeta> {
        self.request(InfoRequest::SpotMeta).await
    }

    pub async fn token_details(&self, token_id: &str) -> VenueResult<TokenDetails> {
        self.request(InfoRequest::TokenDetails {
            token_id: token_id.to_string(),
        })
        .await
    }

    pub async fn user_fills(&self, user: &str) -> VenueResult<Vec<UserFill>> {
        self.request(InfoRequest::UserFills {
            user: user.to_string(),
        })
        .await
    }

    /// Funding payments since `start_time` (ms since epoch).
    pub async fn user_funding(&self, user: &str, start_time: u64) -> VenueResult<Vec<FundingEntry>> {
        self.request(InfoRequest::UserFunding {
            user: user.to_string(),
            start_time,
        })
        .await
    }

    pub async fn historical_orders(&self, user: &str) -> VenueResult<Vec<HistoricalOrder>> {
        self.request(InfoRequest::HistoricalOrders {
            user: user.to_string(),
        })
        .await
    }

    pub async fn user_twap_slice_fills(&self, user: &str) -> VenueResult<Vec<TwapSliceFill>> {
        self.request(InfoRequest::UserTwapSliceFills {
            user: user.to_string(),
        })
        .await
    }

    /// Token details for the spot token named `name` (case-insensitive).
    pub async fn token_details_by_name(&self, name: &str) -> VenueResult<TokenDetails> {
        let meta = self.spot_meta().await?;
        let token = meta
            .token_by_name(name)
            .ok_or_else(|| VenueError::NotFound(format!("spot token {name}")))?;
        self.token_details(&token.token_id).await
    }

    /// Current mid price of `asset`.
    pub async fn asset_price(&self, asset: &str, kind: AssetKind) -> VenueResult<Price> {
        let price = match kind {
            AssetKind::Perp => {
                let mids = self.all_mids().await?;
                let raw = mids
                    .iter()
                    .find(|(coin, _)| coin.eq_ignore_ascii_case(asset))
                    .map(|(_, px)| px.clone())
                    .ok_or_else(|| VenueError::NotFound(format!("mid for {asset}")))?;
                let mid = raw
                    .parse()
                    .map_err(|e| VenueError::Parse(format!("mid {asset}={raw:?}: {e}")))?;
                Price::new(mid)
            }
            AssetKind::Spot => self
                .token_details_by_name(asset)
                .await?
                .mid_price()?
                .ok_or_else(|| VenueError::NotFound(format!("midPx for {asset}")))?,
        };

        if !price.is_positive() {
            return Err(VenueError::Parse(format!("non-positive mid for {asset}: {price}")));
        }
        debug!(asset, ?kind, %price, "Fetched mid price");
        Ok(price)
    }

    /// Pricing precision derived from the venue's `szDecimals` for `asset`.
    pub async fn asset_precision(&self, asset: &str, kind: AssetKind) -> VenueResult<AssetPrecision> {
        match kind {
            AssetKind::Spot => {
                let meta = self.spot_meta().await?;
                let token = meta
                    .token_by_name(asset)
                    .ok_or_else(|| VenueError::NotFound(format!("spot token {asset}")))?;
                Ok(AssetPrecision::spot(token.sz_decimals))
            }
            AssetKind::Perp => {
                let meta = self.perp_meta().await?;
                let perp = meta
                    .asset_by_name(asset)
                    .ok_or_else(|| VenueError::NotFound(format!("perp {asset}")))?;
                Ok(AssetPrecision::perp(perp.sz_decimals))
            }
        }
    }

    /// Spot balances plus perp margin and positions, fetched concurrently.
    ///
    /// Both halves must succeed.
    pub async fn account_snapshot(&self, user: &str) -> VenueResult<AccountSnapshot> {
        let (spot, perp) = tokio::join!(
            self.spot_clearinghouse_state(user),
            self.clearinghouse_state(user)
        );
        let snapshot = build_snapshot(user, &spot?, &perp?)?;
        debug!(
            user,
            withdrawable = %snapshot.perp_withdrawable,
            balances = snapshot.spot_balances.len(),
            positions = snapshot.positions.len(),
            "Fetched account snapshot"
        );
        Ok(snapshot)
    }

    /// Best-effort read of every slice of account state.
    ///
    /// Slices are fetched concurrently. A failed slice is logged, left at its
    /// default and listed in `degraded`; the call itself never fails.
    pub async fn complete_state(&self, user: &str) -> CompleteState {
        let start_time = (Utc::now().timestamp_millis().max(0) as u64)
            .saturating_sub(self.funding_lookback_ms);

        let (balances, positions, open_orders, fills, funding, orders, twaps) = tokio::join!(
            self.spot_clearinghouse_state(user),
            self.clearinghouse_state(user),
            self.frontend_open_orders(user),
            self.user_fills(user),
            self.user_funding(user, start_time),
            self.historical_orders(user),
            self.user_twap_slice_fills(user),
        );

        let mut degraded = Vec::new();
        let state = CompleteState {
            balances: or_default(balances, StateSlice::Balances, user, &mut degraded),
            positions: or_default(positions, StateSlice::Positions, user, &mut degraded),
            open_orders: or_default(open_orders, StateSlice::OpenOrders, user, &mut degraded),
            trade_history: or_default(fills, StateSlice::TradeHistory, user, &mut degraded),
            funding_history: or_default(funding, StateSlice::FundingHistory, user, &mut degraded),
            order_history: or_default(orders, StateSlice::OrderHistory, user, &mut degraded),
            active_twaps: or_default(twaps, StateSlice::ActiveTwaps, user, &mut degraded),
            degraded,
            fetched_at: Utc::now(),
        };

        if state.is_degraded() {
            warn!(user, degraded = ?state.degraded, "Complete state partially degraded");
        } else {
            info!(user, "Fetched complete state");
        }
        state
    }
}

fn or_default<T: Default>(
    result: VenueResult<T>,
    slice: StateSlice,
    user: &str,
    degraded: &mut Vec<StateSlice>,
) -> T {
    match result {
        Ok(value) => value,
        Err(e) => {
            warn!(user, %slice, error = %e, "State slice read failed, using default");
            degraded.push(slice);
            T::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::MockTransport;
    use rust_decimal_macros::dec;
    use serde_json::json;

    fn client(mock: &Arc<MockTransport>) -> InfoClient {
        InfoClient::new(mock.clone())
    }

    fn spot_meta_json() -> serde_json::Value {
        json!({
            "tokens": [
                {"name": "USDC", "szDecimals": 8, "weiDecimals": 8, "index": 0,
                 "tokenId": "0xusdc", "isCanonical": true},
                {"name": "USDT0", "szDecimals": 2, "weiDecimals": 8, "index": 268,
                 "tokenId": "0xusdt", "isCanonical": false}
            ],
            "universe": []
        })
    }

    fn mock_with_all_slices() -> Arc<MockTransport> {
        let mock = Arc::new(MockTransport::new());
        mock.respond(
            "spotClearinghouseState",
            json!({"balances": [{"coin": "USDC", "token": 0, "total": "12.5", "hold": "0"}]}),
        )
        .respond(
            "clearinghouseState",
            json!({"withdrawable": "100.0", "assetPositions": []}),
        )
        .respond("frontendOpenOrders", json!([]))
        .respond(
            "userFills",
            json!([{"coin": "HYPE", "px": "40.0", "sz": "1.0", "side": "A",
                    "time": 1, "oid": 7, "crossed": true}]),
        )
        .respond("userFunding", json!([]))
        .respond("historicalOrders", json!([]))
        .respond("userTwapSliceFills", json!([]));
        mock
    }

    #[tokio::test]
    async fn test_complete_state_all_slices_succeed() {
        let mock = mock_with_all_slices();
        let state = client(&mock).complete_state("0xabc").await;

        assert!(!state.is_degraded());
        assert_eq!(state.trade_history.len(), 1);
        assert_eq!(state.positions.withdrawable_decimal().unwrap(), dec!(100));
        assert_eq!(mock.request_count(), 7);
    }

    #[tokio::test]
    async fn test_complete_state_one_slice_fails() {
        let mock = mock_with_all_slices();
        mock.fail("userFills", "HTTP 500");

        let state = client(&mock).complete_state("0xabc").await;

        assert_eq!(state.degraded, vec![StateSlice::TradeHistory]);
        assert!(state.trade_history.is_empty());
        // other slices still populated
        assert_eq!(state.balances.balances.len(), 1);
        assert_eq!(state.positions.withdrawable_decimal().unwrap(), dec!(100));
    }

    #[tokio::test]
    async fn test_complete_state_funding_request_carries_start_time() {
        let mock = mock_with_all_slices();
        client(&mock)
            .with_funding_lookback_ms(1_000)
            .complete_state("0xabc")
            .await;

        let funding = mock
            .requests()
            .into_iter()
            .find(|r| r.request_type() == "userFunding")
            .unwrap();
        match funding {
            InfoRequest::UserFunding { start_time, .. } => assert!(start_time > 0),
            other => panic!("unexpected request {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_account_snapshot_requires_both_halves() {
        let mock = mock_with_all_slices();
        let snapshot = tokio_test::assert_ok!(client(&mock).account_snapshot("0xabc").await);
        assert_eq!(snapshot.spot_balance("USDC"), dec!(12.5));
        assert_eq!(snapshot.perp_withdrawable(), dec!(100));

        mock.fail("clearinghouseState", "timeout");
        let err = client(&mock).account_snapshot("0xabc").await.unwrap_err();
        assert!(matches!(err, VenueError::Http(_)));
    }

    #[tokio::test]
    async fn test_perp_price_from_all_mids() {
        let mock = Arc::new(MockTransport::new());
        mock.respond("allMids", json!({"HYPE": "40.125", "BTC": "95000"}));

        let price = client(&mock).asset_price("hype", AssetKind::Perp).await.unwrap();
        assert_eq!(price, Price::new(dec!(40.125)));

        let missing = client(&mock).asset_price("ETH", AssetKind::Perp).await;
        assert!(matches!(missing, Err(VenueError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_spot_price_from_token_details() {
        let mock = Arc::new(MockTransport::new());
        mock.respond("spotMeta", spot_meta_json()).respond(
            "tokenDetails",
            json!({"name": "USDT0", "szDecimals": 2, "weiDecimals": 8, "midPx": "0.9995"}),
        );

        let price = client(&mock).asset_price("USDT0", AssetKind::Spot).await.unwrap();
        assert_eq!(price, Price::new(dec!(0.9995)));

        let requests = mock.requests();
        assert_eq!(
            requests[1],
            InfoRequest::TokenDetails {
                token_id: "0xusdt".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_null_token_details_is_not_found() {
        let mock = Arc::new(MockTransport::new());
        mock.respond("spotMeta", spot_meta_json())
            .respond("tokenDetails", serde_json::Value::Null);

        let result = client(&mock).token_details_by_name("USDC").await;
        assert!(matches!(result, Err(VenueError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_asset_precision() {
        let mock = Arc::new(MockTransport::new());
        mock.respond("spotMeta", spot_meta_json()).respond(
            "meta",
            json!({"universe": [{"name": "HYPE", "szDecimals": 2, "maxLeverage": 10}]}),
        );

        let c = client(&mock);
        let spot = c.asset_precision("USDT0", AssetKind::Spot).await.unwrap();
        assert_eq!(spot, AssetPrecision::spot(2));
        let perp = c.asset_precision("HYPE", AssetKind::Perp).await.unwrap();
        assert_eq!(perp.price_decimals, 4);
        assert!(c.asset_precision("PURR", AssetKind::Perp).await.is_err());
    }
}
