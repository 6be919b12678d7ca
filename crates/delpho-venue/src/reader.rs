//! Read interface used by write-side callers.
//!
//! The sequencer and the trade wizard only need snapshots, mids and
//! precision. [`VenueReader`] narrows [`InfoClient`] to that surface so the
//! callers can run against [`MockVenueReader`] in tests.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use delpho_core::{AccountSnapshot, AssetPrecision, Price};
use parking_lot::Mutex;

use crate::client::{AssetKind, InfoClient};
use crate::error::{VenueError, VenueResult};
use crate::transport::BoxFuture;

/// Venue reads needed to size and price writes.
pub trait VenueReader: Send + Sync {
    /// Fresh snapshot of `user`; fails rather than returning partial data.
    fn account_snapshot<'a>(&'a self, user: &'a str) -> BoxFuture<'a, VenueResult<AccountSnapshot>>;

    fn mid_price<'a>(&'a self, asset: &'a str, kind: AssetKind) -> BoxFuture<'a, VenueResult<Price>>;

    fn asset_precision<'a>(
        &'a self,
        asset: &'a str,
        kind: AssetKind,
    ) -> BoxFuture<'a, VenueResult<AssetPrecision>>;
}

/// Shared reader handle.
pub type DynVenueReader = Arc<dyn VenueReader>;

impl VenueReader for InfoClient {
    fn account_snapshot<'a>(&'a self, user: &'a str) -> BoxFuture<'a, VenueResult<AccountSnapshot>> {
        Box::pin(InfoClient::account_snapshot(self, user))
    }

    fn mid_price<'a>(&'a self, asset: &'a str, kind: AssetKind) -> BoxFuture<'a, VenueResult<Price>> {
        Box::pin(self.asset_price(asset, kind))
    }

    fn asset_precision<'a>(
        &'a self,
        asset: &'a str,
        kind: AssetKind,
    ) -> BoxFuture<'a, VenueResult<AssetPrecision>> {
        Box::pin(InfoClient::asset_precision(self, asset, kind))
    }
}

/// Scripted reader for testing.
///
/// Snapshots are served in the order they were queued; the last one repeats.
/// Every call is appended to the journal as `"snapshot"`, `"mid:<asset>"` or
/// `"precision:<asset>"`. Pass a shared journal to interleave with other
/// mocks.
pub struct MockVenueReader {
    snapshots: Mutex<VecDeque<AccountSnapshot>>,
    mids: Mutex<HashMap<String, Price>>,
    precisions: Mutex<HashMap<String, AssetPrecision>>,
    fail_snapshot_on_call: Mutex<Option<usize>>,
    snapshot_calls: Mutex<usize>,
    journal: Arc<Mutex<Vec<String>>>,
}

impl Default for MockVenueReader {
    fn default() -> Self {
        Self::new()
    }
}

impl MockVenueReader {
    pub fn new() -> Self {
        Self::with_journal(Arc::new(Mutex::new(Vec::new())))
    }

    pub fn with_journal(journal: Arc<Mutex<Vec<String>>>) -> Self {
        Self {
            snapshots: Mutex::new(VecDeque::new()),
            mids: Mutex::new(HashMap::new()),
            precisions: Mutex::new(HashMap::new()),
            fail_snapshot_on_call: Mutex::new(None),
            snapshot_calls: Mutex::new(0),
            journal,
        }
    }

    pub fn push_snapshot(&self, snapshot: AccountSnapshot) -> &Self {
        self.snapshots.lock().push_back(snapshot);
        self
    }

    pub fn set_mid(&self, asset: &str, price: Price) -> &Self {
        self.mids.lock().insert(asset.to_ascii_uppercase(), price);
        self
    }

    pub fn set_precision(&self, asset: &str, precision: AssetPrecision) -> &Self {
        self.precisions
            .lock()
            .insert(asset.to_ascii_uppercase(), precision);
        self
    }

    /// Make the `n`-th snapshot call (1-based) fail.
    pub fn fail_snapshot_on_call(&self, n: usize) -> &Self {
        *self.fail_snapshot_on_call.lock() = Some(n);
        self
    }

    pub fn journal(&self) -> Vec<String> {
        self.journal.lock().clone()
    }

    pub fn snapshot_calls(&self) -> usize {
        *self.snapshot_calls.lock()
    }
}

impl VenueReader for MockVenueReader {
    fn account_snapshot<'a>(&'a self, user: &'a str) -> BoxFuture<'a, VenueResult<AccountSnapshot>> {
        self.journal.lock().push("snapshot".to_string());
        let call = {
            let mut calls = self.snapshot_calls.lock();
            *calls += 1;
            *calls
        };

        let outcome = if *self.fail_snapshot_on_call.lock() == Some(call) {
            Err(VenueError::Http(format!("snapshot call {call} failed")))
        } else {
            let mut queue = self.snapshots.lock();
            let snapshot = if queue.len() > 1 {
                queue.pop_front()
            } else {
                queue.front().cloned()
            };
            Ok(snapshot.unwrap_or_else(|| AccountSnapshot::empty(user)))
        };
        Box::pin(async move { outcome })
    }

    fn mid_price<'a>(&'a self, asset: &'a str, _kind: AssetKind) -> BoxFuture<'a, VenueResult<Price>> {
        self.journal.lock().push(format!("mid:{asset}"));
        let outcome = self
            .mids
            .lock()
            .get(&asset.to_ascii_uppercase())
            .copied()
            .ok_or_else(|| VenueError::NotFound(format!("mid for {asset}")));
        Box::pin(async move { outcome })
    }

    fn asset_precision<'a>(
        &'a self,
        asset: &'a str,
        _kind: AssetKind,
    ) -> BoxFuture<'a, VenueResult<AssetPrecision>> {
        self.journal.lock().push(format!("precision:{asset}"));
        let outcome = self
            .precisions
            .lock()
            .get(&asset.to_ascii_uppercase())
            .copied()
            .ok_or_else(|| VenueError::NotFound(format!("precision for {asset}")));
        Box::pin(async move { outcome })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn snapshot_with_withdrawable(amount: rust_decimal::Decimal) -> AccountSnapshot {
        let mut snapshot = AccountSnapshot::empty("0xabc");
        snapshot.perp_withdrawable = amount;
        snapshot
    }

    #[tokio::test]
    async fn test_mock_serves_snapshots_in_order() {
        let mock = MockVenueReader::new();
        mock.push_snapshot(snapshot_with_withdrawable(dec!(1)))
            .push_snapshot(snapshot_with_withdrawable(dec!(2)));

        let first = mock.account_snapshot("0xabc").await.unwrap();
        let second = mock.account_snapshot("0xabc").await.unwrap();
        let third = mock.account_snapshot("0xabc").await.unwrap();

        assert_eq!(first.perp_withdrawable(), dec!(1));
        assert_eq!(second.perp_withdrawable(), dec!(2));
        // last snapshot repeats
        assert_eq!(third.perp_withdrawable(), dec!(2));
        assert_eq!(mock.snapshot_calls(), 3);
    }

    #[tokio::test]
    async fn test_mock_failure_and_journal() {
        let mock = MockVenueReader::new();
        mock.set_mid("hype", Price::new(dec!(40)))
            .fail_snapshot_on_call(1);

        assert!(mock.account_snapshot("0xabc").await.is_err());
        assert!(mock.account_snapshot("0xabc").await.is_ok());
        assert_eq!(
            mock.mid_price("HYPE", AssetKind::Perp).await.unwrap(),
            Price::new(dec!(40))
        );
        assert!(mock.asset_precision("HYPE", AssetKind::Perp).await.is_err());

        assert_eq!(
            mock.journal(),
            vec!["snapshot", "snapshot", "mid:HYPE", "precision:HYPE"]
        );
    }
}
