//! Load task: write one payload, as received, to its partition key.

use priceload_core::store::JSON_CONTENT_TYPE;
use priceload_core::{
    KeyBuilder, KeyError, LoadType, ObjectStore, RawPayload, RemoteCallFailed, RetryPolicy,
    StorageKey, TimeWindow,
};
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error(transparent)]
    InvalidKey(#[from] KeyError),

    #[error("load failed for {key}: {source}")]
    LoadFailed {
        key: StorageKey,
        #[source]
        source: RemoteCallFailed,
    },
}

pub struct LoadTask<'a> {
    store: &'a dyn ObjectStore,
    keys: KeyBuilder,
    policy: RetryPolicy,
}

impl<'a> LoadTask<'a> {
    pub fn new(store: &'a dyn ObjectStore, keys: KeyBuilder, policy: RetryPolicy) -> Self {
        Self {
            store,
            keys,
            policy,
        }
    }

    pub fn keys(&self) -> &KeyBuilder {
        &self.keys
    }

    /// Key a (ticker, window) pair will be written to.
    pub fn key_for(
        &self,
        load_type: LoadType,
        ticker: &str,
        window: &TimeWindow,
    ) -> Result<StorageKey, KeyError> {
        self.keys.build_key(load_type, ticker, window.label())
    }

    /// Write `payload` as compact JSON. Re-running with the same inputs
    /// overwrites the same key.
    pub fn load(
        &self,
        ticker: &str,
        window: &TimeWindow,
        payload: RawPayload,
        load_type: LoadType,
    ) -> Result<StorageKey, LoadError> {
        let key = self.key_for(load_type, ticker, window)?;
        let records = payload.record_count();
        let body = payload.to_compact_bytes();

        match records {
            Some(n) => info!("Loading {ticker} {window} data ({n} records) to {key}..."),
            None => info!("Loading {ticker} {window} data to {key}..."),
        }

        let call = format!("put {key}");
        self.policy
            .execute(&call, || self.store.put(key.as_str(), &body, JSON_CONTENT_TYPE))
            .map_err(|source| LoadError::LoadFailed {
                key: key.clone(),
                source,
            })?;

        info!("Uploaded to {}/{key}", self.store.location());
        Ok(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use priceload_core::store::MemoryStore;

    fn task(store: &MemoryStore) -> LoadTask<'_> {
        LoadTask::new(store, KeyBuilder::default(), RetryPolicy::STORE.without_backoff())
    }

    #[test]
    fn writes_compact_json_at_partition_key() {
        let store = MemoryStore::new();
        let payload = RawPayload::from_slice(br#"[ {"close": 1.5} ]"#).unwrap();
        let window = TimeWindow::year(2024).unwrap();

        let key = task(&store)
            .load("AAPL", &window, payload, LoadType::Retro)
            .unwrap();

        assert_eq!(key.as_str(), "tiingo/json/load_type=retro/year=2024/AAPL.json");
        assert_eq!(store.get(key.as_str()).unwrap(), br#"[{"close":1.5}]"#);
        assert_eq!(
            store.head(key.as_str()).unwrap().unwrap().content_type,
            "application/json"
        );
    }

    #[test]
    fn invalid_ticker_never_touches_store() {
        let store = MemoryStore::new();
        let payload = RawPayload::from_slice(b"[]").unwrap();
        let window = TimeWindow::year(2024).unwrap();

        let err = task(&store)
            .load("../etc", &window, payload, LoadType::Retro)
            .unwrap_err();
        assert!(matches!(err, LoadError::InvalidKey(KeyError::InvalidTicker { .. })));
        assert!(store.is_empty());
    }
}
