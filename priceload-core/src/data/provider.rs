//! Price provider trait and the opaque payload it returns.
//!
//! The pipeline never looks inside a payload beyond counting top-level
//! records for logging. Upstream schema changes pass straight through to
//! storage.

use crate::partition::TimeWindow;
use crate::retry::RemoteError;
use crate::secrets::ApiToken;
use serde_json::Value;

/// Raw response body for one ticker over one window, stored as received.
#[derive(Debug, Clone, PartialEq)]
pub struct RawPayload {
    body: Value,
}

impl RawPayload {
    /// Decode a response body. Anything that is valid JSON is accepted.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, RemoteError> {
        serde_json::from_slice(bytes)
            .map(|body| Self { body })
            .map_err(|e| RemoteError::Decode(e.to_string()))
    }

    pub fn from_value(body: Value) -> Self {
        Self { body }
    }

    pub fn as_value(&self) -> &Value {
        &self.body
    }

    /// Number of records when the body is an array.
    pub fn record_count(&self) -> Option<usize> {
        self.body.as_array().map(Vec::len)
    }

    /// Compact JSON encoding, keys in received order.
    pub fn to_compact_bytes(&self) -> Vec<u8> {
        self.body.to_string().into_bytes()
    }
}

/// A source of daily price data.
///
/// One call is one remote attempt. Retrying is the caller's job.
pub trait PriceProvider: Send + Sync {
    /// Human-readable name of this provider.
    fn name(&self) -> &str;

    /// Fetch daily prices for `ticker` covering `window`.
    fn fetch_prices(
        &self,
        ticker: &str,
        window: &TimeWindow,
        token: &ApiToken,
    ) -> Result<RawPayload, RemoteError>;
}
