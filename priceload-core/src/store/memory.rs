//! In-memory object store for dry runs and tests.

use super::{ObjectMeta, ObjectStore};
use crate::retry::RemoteError;
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

#[derive(Debug, Clone)]
struct StoredObject {
    body: Vec<u8>,
    meta: ObjectMeta,
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    objects: Mutex<BTreeMap<String, StoredObject>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an object (e.g. the ticker list) before a run.
    pub fn with_object(self, key: &str, body: impl Into<Vec<u8>>, content_type: &str) -> Self {
        let body = body.into();
        if let Ok(mut objects) = self.objects.lock() {
            let meta = ObjectMeta::describe(key, &body, content_type);
            objects.insert(key.to_string(), StoredObject { body, meta });
        }
        self
    }

    /// All keys, sorted.
    pub fn keys(&self) -> Vec<String> {
        self.lock()
            .map(|objects| objects.keys().cloned().collect())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.lock().map(|objects| objects.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> Result<MutexGuard<'_, BTreeMap<String, StoredObject>>, RemoteError> {
        self.objects
            .lock()
            .map_err(|_| RemoteError::Store("memory store lock poisoned".into()))
    }
}

impl ObjectStore for MemoryStore {
    fn location(&self) -> String {
        "memory://".to_string()
    }

    fn get(&self, key: &str) -> Result<Vec<u8>, RemoteError> {
        self.lock()?
            .get(key)
            .map(|o| o.body.clone())
            .ok_or_else(|| RemoteError::NotFound {
                key: key.to_string(),
            })
    }

    fn put(&self, key: &str, body: &[u8], content_type: &str) -> Result<(), RemoteError> {
        let meta = ObjectMeta::describe(key, body, content_type);
        self.lock()?.insert(
            key.to_string(),
            StoredObject {
                body: body.to_vec(),
                meta,
            },
        );
        Ok(())
    }

    fn head(&self, key: &str) -> Result<Option<ObjectMeta>, RemoteError> {
        Ok(self.lock()?.get(key).map(|o| o.meta.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::JSON_CONTENT_TYPE;

    #[test]
    fn put_overwrites_in_place() {
        let store = MemoryStore::new();
        store.put("k.json", b"[1]", JSON_CONTENT_TYPE).unwrap();
        store.put("k.json", b"[1,2]", JSON_CONTENT_TYPE).unwrap();

        assert_eq!(store.len(), 1);
        assert_eq!(store.get("k.json").unwrap(), b"[1,2]");
        assert_eq!(store.head("k.json").unwrap().unwrap().size, 5);
    }

    #[test]
    fn seeded_objects_are_readable() {
        let store = MemoryStore::new().with_object("adhoc/tickers.txt", "AAPL\nTSLA\n", "text/plain");
        assert_eq!(store.keys(), vec!["adhoc/tickers.txt".to_string()]);
        assert_eq!(store.get("adhoc/tickers.txt").unwrap(), b"AAPL\nTSLA\n");
        assert!(matches!(store.get("nope"), Err(RemoteError::NotFound { .. })));
    }
}
