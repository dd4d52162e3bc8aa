//! Fetch task: one ticker, one window, one retried provider call.

use priceload_core::{ApiToken, PriceProvider, RawPayload, RemoteCallFailed, RetryPolicy, TimeWindow};
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
#[error("fetch failed for {ticker} ({window}): {source}")]
pub struct FetchFailed {
    pub ticker: String,
    pub window: TimeWindow,
    #[source]
    pub source: RemoteCallFailed,
}

pub struct FetchTask<'a> {
    provider: &'a dyn PriceProvider,
    policy: RetryPolicy,
}

impl<'a> FetchTask<'a> {
    pub fn new(provider: &'a dyn PriceProvider, policy: RetryPolicy) -> Self {
        Self { provider, policy }
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Fetch the raw payload. The token is borrowed for the call only.
    pub fn fetch(
        &self,
        ticker: &str,
        window: &TimeWindow,
        token: &ApiToken,
    ) -> Result<RawPayload, FetchFailed> {
        info!("Fetching {window} data for {ticker} from {}...", self.provider.name());

        let call = format!("fetch {ticker} {window}");
        let payload = self
            .policy
            .execute(&call, || self.provider.fetch_prices(ticker, window, token))
            .map_err(|source| FetchFailed {
                ticker: ticker.to_string(),
                window: *window,
                source,
            })?;

        match payload.record_count() {
            Some(n) => info!("Fetched {n} records for {ticker} ({window})"),
            None => info!("Fetched non-array payload for {ticker} ({window})"),
        }
        Ok(payload)
    }
}
