//! Ticker list: a newline-delimited text object in the store.

use crate::retry::{RemoteCallFailed, RetryPolicy};
use crate::store::ObjectStore;
use std::collections::HashSet;
use thiserror::Error;
use tracing::info;

/// Default location of the ticker list within the bucket.
pub const DEFAULT_TICKERS_KEY: &str = "adhoc/tickers.txt";

#[derive(Debug, Error)]
pub enum TickerListError {
    #[error("failed to read ticker list: {0}")]
    Read(#[from] RemoteCallFailed),

    #[error("ticker list '{key}' is not valid UTF-8")]
    Encoding { key: String },
}

/// One ticker per line. Whitespace is trimmed, blank lines dropped, and
/// duplicates removed keeping the first occurrence.
pub fn parse_tickers(content: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter(|line| seen.insert(*line))
        .map(String::from)
        .collect()
}

/// Read and parse the ticker list at `key`.
pub fn load_tickers(
    store: &dyn ObjectStore,
    key: &str,
    policy: &RetryPolicy,
) -> Result<Vec<String>, TickerListError> {
    info!("Fetching tickers from {}/{key}", store.location());

    let body = policy.execute(&format!("get {key}"), || store.get(key))?;
    let content = String::from_utf8(body).map_err(|_| TickerListError::Encoding {
        key: key.to_string(),
    })?;

    let tickers = parse_tickers(&content);
    info!("Loaded {} tickers: {}", tickers.len(), tickers.join(", "));
    Ok(tickers)
}
