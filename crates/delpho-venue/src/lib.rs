//! Order-book/perp info API client.
//!
//! All reads are `POST /info` requests discriminated by a `type` field:
//! - `transport`: request shapes and the HTTP/mock transports
//! - `types`: response types with decimal parse helpers
//! - `client`: typed reads, `account_snapshot` and best-effort `complete_state`
//! - `reader`: the narrow read interface used by write-side callers

pub mod client;
pub mod error;
pub mod reader;
pub mod state;
pub mod transport;
pub mod types;

pub use client::{AssetKind, DynInfoTransport, InfoClient, DEFAULT_FUNDING_LOOKBACK_MS};
pub use error::{VenueError, VenueResult};
pub use reader::{DynVenueReader, MockVenueReader, VenueReader};
pub use state::{CompleteState, StateSlice};
pub use transport::{BoxFuture, HttpTransport, InfoRequest, InfoTransport, MockTransport};
pub use types::{
    AllMids, ClearinghouseState, FrontendOpenOrder, FundingEntry, HistoricalOrder, OpenOrder,
    PerpMeta, SpotClearinghouseState, SpotMeta, TokenDetails, TwapSliceFill, UserFill,
};
