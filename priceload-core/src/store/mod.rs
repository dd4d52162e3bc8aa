//! Object store abstraction.
//!
//! The pipeline reads the ticker list and writes one object per work item.
//! Implementations are single-attempt; retry is applied by the callers.

pub mod fs;
pub mod memory;

pub use fs::FsObjectStore;
pub use memory::MemoryStore;

use crate::retry::RemoteError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const JSON_CONTENT_TYPE: &str = "application/json";

/// Metadata recorded alongside every stored object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectMeta {
    pub key: String,
    pub content_type: String,
    pub size: u64,
    /// BLAKE3 hex digest of the body.
    pub content_hash: String,
    pub written_at: DateTime<Utc>,
}

impl ObjectMeta {
    pub fn describe(key: &str, body: &[u8], content_type: &str) -> Self {
        Self {
            key: key.to_string(),
            content_type: content_type.to_string(),
            size: body.len() as u64,
            content_hash: blake3::hash(body).to_hex().to_string(),
            written_at: Utc::now(),
        }
    }
}

pub trait ObjectStore: Send + Sync {
    /// Human-readable location, for logs (e.g. `file:///data/mh-guess-data`).
    fn location(&self) -> String;

    /// Read an object's body. A missing object is [`RemoteError::NotFound`].
    fn get(&self, key: &str) -> Result<Vec<u8>, RemoteError>;

    /// Create or replace an object.
    fn put(&self, key: &str, body: &[u8], content_type: &str) -> Result<(), RemoteError>;

    /// Metadata of an existing object.
    fn head(&self, key: &str) -> Result<Option<ObjectMeta>, RemoteError>;
}
