//! Transport for the info endpoint.
//!
//! Every read is a `POST /info` whose body carries a `type` discriminator.
//! The [`InfoTransport`] trait separates request shaping from HTTP so the
//! client can be exercised against canned responses.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use parking_lot::Mutex;
use reqwest::Client;
use serde::Serialize;
use tracing::debug;

use crate::error::{VenueError, VenueResult};

/// Boxed future for dyn-compatible async trait methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Default timeout for API requests.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Body of a `POST /info` request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum InfoRequest {
    OpenOrders {
        user: String,
    },
    FrontendOpenOrders {
        user: String,
    },
    SpotClearinghouseState {
        user: String,
    },
    ClearinghouseState {
        user: String,
    },
    AllMids,
    Meta,
    SpotMeta,
    TokenDetails {
        #[serde(rename = "tokenId")]
        token_id: String,
    },
    UserFills {
        user: String,
    },
    UserFunding {
        user: String,
        #[serde(rename = "startTime")]
        start_time: u64,
    },
    HistoricalOrders {
        user: String,
    },
    UserTwapSliceFills {
        user: String,
    },
}

impl InfoRequest {
    /// Value of the `type` discriminator.
    pub fn request_type(&self) -> &'static str {
        match self {
            Self::OpenOrders { .. } => "openOrders",
            Self::FrontendOpenOrders { .. } => "frontendOpenOrders",
            Self::SpotClearinghouseState { .. } => "spotClearinghouseState",
            Self::ClearinghouseState { .. } => "clearinghouseState",
            Self::AllMids => "allMids",
            Self::Meta => "meta",
            Self::SpotMeta => "spotMeta",
            Self::TokenDetails { .. } => "tokenDetails",
            Self::UserFills { .. } => "userFills",
            Self::UserFunding { .. } => "userFunding",
            Self::HistoricalOrders { .. } => "historicalOrders",
            Self::UserTwapSliceFills { .. } => "userTwapSliceFills",
        }
    }
}

/// Sends info requests and returns the raw JSON body.
pub trait InfoTransport: Send + Sync {
    fn post<'a>(&'a self, request: &'a InfoRequest) -> BoxFuture<'a, VenueResult<serde_json::Value>>;
}

/// `reqwest`-backed transport.
pub struct HttpTransport {
    client: Client,
    info_url: String,
}

impl HttpTransport {
    /// Create a transport for `info_url` (e.g. "https://api.hyperliquid.xyz/info").
    pub fn new(info_url: impl Into<String>) -> VenueResult<Self> {
        let client = Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .map_err(|e| VenueError::Http(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            info_url: info_url.into(),
        })
    }

    pub fn info_url(&self) -> &str {
        &self.info_url
    }
}

impl InfoTransport for HttpTransport {
    fn post<'a>(&'a self, request: &'a InfoRequest) -> BoxFuture<'a, VenueResult<serde_json::Value>> {
        Box::pin(async move {
            debug!(url = %self.info_url, request_type = request.request_type(), "POST /info");

            let response = self
                .client
                .post(&self.info_url)
                .json(request)
                .send()
                .await
                .map_err(|e| VenueError::Http(format!("HTTP request failed: {e}")))?;

            let status = response.status();
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(VenueError::Http(format!(
                    "{} failed: HTTP {status}: {body}",
                    request.request_type()
                )));
            }

            response
                .json()
                .await
                .map_err(|e| VenueError::Parse(format!("{}: {e}", request.request_type())))
        })
    }
}

/// Canned-response transport for testing.
///
/// Responses are keyed by request type; a missing key answers with an HTTP
/// error so individual slices can be made to fail.
#[derive(Debug, Default)]
pub struct MockTransport {
    responses: Mutex<HashMap<&'static str, Result<serde_json::Value, String>>>,
    requests: Mutex<Vec<InfoRequest>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer requests of `request_type` with `body`.
    pub fn respond(&self, request_type: &'static str, body: serde_json::Value) -> &Self {
        self.responses.lock().insert(request_type, Ok(body));
        self
    }

    /// Fail requests of `request_type` with `message`.
    pub fn fail(&self, request_type: &'static str, message: impl Into<String>) -> &Self {
        self.responses
            .lock()
            .insert(request_type, Err(message.into()));
        self
    }

    /// Requests received so far, in order.
    pub fn requests(&self) -> Vec<InfoRequest> {
        self.requests.lock().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().len()
    }
}

impl InfoTransport for MockTransport {
    fn post<'a>(&'a self, request: &'a InfoRequest) -> BoxFuture<'a, VenueResult<serde_json::Value>> {
        self.requests.lock().push(request.clone());
        let outcome = match self.responses.lock().get(request.request_type()) {
            Some(Ok(body)) => Ok(body.clone()),
            Some(Err(message)) => Err(VenueError::Http(message.clone())),
            None => Err(VenueError::Http(format!(
                "no canned response for {}",
                request.request_type()
            ))),
        };
        Box::pin(async move { outcome })
    }
}
