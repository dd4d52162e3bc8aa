//! priceload core: the data layer of the price ingestion pipeline.
//!
//! - Partition keys and time windows (deterministic storage layout)
//! - Bounded fixed-backoff retry for every remote call
//! - Price provider trait and the Tiingo HTTP provider
//! - Object store trait with filesystem and in-memory backends
//! - Ticker list loading and credential acquisition

pub mod data;
pub mod partition;
pub mod retry;
pub mod secrets;
pub mod store;

pub use data::{PriceProvider, RawPayload, TiingoProvider};
pub use partition::{KeyBuilder, KeyError, LoadType, PartitionLabel, StorageKey, TimeWindow};
pub use retry::{RemoteCallFailed, RemoteError, RetryPolicy};
pub use secrets::{ApiToken, SecretError, SecretProvider};
pub use store::{ObjectMeta, ObjectStore};
