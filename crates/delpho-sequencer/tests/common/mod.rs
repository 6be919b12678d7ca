//! Shared fixtures for sequencer integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use delpho_chain::{
    Address, BoxFuture, ChainResult, ContractWriter, MockWriter, TxConfirmation, WriteCall,
};
use delpho_core::{AccountSnapshot, AssetPrecision, Price, SpotBalance};
use delpho_venue::MockVenueReader;
use parking_lot::Mutex;
use rust_decimal::Decimal;

pub const USER: &str = "0x00000000000000000000000000000000000000aa";

pub type Journal = Arc<Mutex<Vec<String>>>;

/// Reader and writer recording into one journal.
pub fn mocks() -> (Journal, Arc<MockVenueReader>, Arc<MockWriter>) {
    let journal: Journal = Arc::new(Mutex::new(Vec::new()));
    let reader = Arc::new(MockVenueReader::with_journal(journal.clone()));
    let writer = Arc::new(MockWriter::with_journal(journal.clone()));
    (journal, reader, writer)
}

pub fn snapshot(usdt: Decimal, usdc: Decimal, withdrawable: Decimal) -> AccountSnapshot {
    let mut snapshot = AccountSnapshot::empty(USER);
    snapshot.spot_balances = vec![
        SpotBalance {
            coin: "USDT0".to_string(),
            total: usdt,
            hold: Decimal::ZERO,
        },
        SpotBalance {
            coin: "USDC".to_string(),
            total: usdc,
            hold: Decimal::ZERO,
        },
    ];
    snapshot.perp_withdrawable = withdrawable;
    snapshot
}

/// Mids and precisions for the two markets the loop trades.
pub fn price_markets(reader: &MockVenueReader, usdt_mid: Decimal, hype_mid: Decimal) {
    reader
        .set_mid("USDT0", Price::new(usdt_mid))
        .set_mid("HYPE", Price::new(hype_mid))
        .set_precision("USDT0", AssetPrecision::spot(3))
        .set_precision("HYPE", AssetPrecision::perp(2));
}

/// Writer whose receipts never arrive.
pub struct HangingWriter {
    pub calls: Mutex<Vec<WriteCall>>,
}

impl HangingWriter {
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
        }
    }
}

impl ContractWriter for HangingWriter {
    fn submit(&self, call: WriteCall) -> BoxFuture<'_, ChainResult<TxConfirmation>> {
        self.calls.lock().push(call);
        Box::pin(std::future::pending())
    }

    fn sender(&self) -> Address {
        Address::ZERO
    }
}
