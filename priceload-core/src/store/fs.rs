//! Local filesystem object store.
//!
//! Layout: `{root}/{bucket}/{key}`, with a metadata sidecar per object at
//! `{root}/{bucket}/.meta/{key}.meta.json`.
//!
//! Writes are atomic: body goes to a uniquely named `{file}.{pid}-{n}.tmp`,
//! then is renamed into place, so readers never observe a half-written object
//! and a re-put replaces the previous body in one step. Concurrent puts to the
//! same key never share a temp file; the last rename wins.

use super::{ObjectMeta, ObjectStore};
use crate::retry::RemoteError;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

const META_DIR: &str = ".meta";

static TMP_COUNTER: AtomicU64 = AtomicU64::new(0);

pub struct FsObjectStore {
    root: PathBuf,
    bucket: String,
}

impl FsObjectStore {
    pub fn new(root: impl Into<PathBuf>, bucket: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            bucket: bucket.into(),
        }
    }

    /// Directory holding this bucket's objects.
    pub fn bucket_dir(&self) -> PathBuf {
        self.root.join(&self.bucket)
    }

    /// Path for an object key, rejecting keys that would escape the bucket.
    fn object_path(&self, key: &str) -> Result<PathBuf, RemoteError> {
        let invalid = |reason: &str| RemoteError::Store(format!("invalid key '{key}': {reason}"));

        if key.is_empty() {
            return Err(invalid("empty"));
        }
        if key.starts_with('/') || key.contains('\\') {
            return Err(invalid("must be a relative '/'-separated path"));
        }

        let mut path = self.bucket_dir();
        for (i, segment) in key.split('/').enumerate() {
            match segment {
                "" | "." | ".." => return Err(invalid("empty or relative path segment")),
                META_DIR if i == 0 => return Err(invalid("reserved prefix")),
                s => path.push(s),
            }
        }
        Ok(path)
    }

    fn meta_path(&self, key: &str) -> PathBuf {
        self.bucket_dir()
            .join(META_DIR)
            .join(format!("{key}.meta.json"))
    }
}

impl ObjectStore for FsObjectStore {
    fn location(&self) -> String {
        format!("file://{}", self.bucket_dir().display())
    }

    fn get(&self, key: &str) -> Result<Vec<u8>, RemoteError> {
        let path = self.object_path(key)?;
        fs::read(&path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => RemoteError::NotFound {
                key: key.to_string(),
            },
            _ => RemoteError::Store(format!("read {}: {e}", path.display())),
        })
    }

    fn put(&self, key: &str, body: &[u8], content_type: &str) -> Result<(), RemoteError> {
        let path = self.object_path(key)?;
        write_atomic(&path, body)?;

        let meta = ObjectMeta::describe(key, body, content_type);
        let meta_json = serde_json::to_vec_pretty(&meta)
            .map_err(|e| RemoteError::Store(format!("meta serialization: {e}")))?;
        write_atomic(&self.meta_path(key), &meta_json)
    }

    fn head(&self, key: &str) -> Result<Option<ObjectMeta>, RemoteError> {
        self.object_path(key)?;
        let meta_path = self.meta_path(key);
        let content = match fs::read(&meta_path) {
            Ok(c) => c,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(RemoteError::Store(format!(
                    "read {}: {e}",
                    meta_path.display()
                )))
            }
        };
        serde_json::from_slice(&content)
            .map(Some)
            .map_err(|e| RemoteError::Store(format!("corrupt metadata for '{key}': {e}")))
    }
}

/// Write to a fresh temp file next to `path`, then rename over `path`.
fn write_atomic(path: &Path, body: &[u8]) -> Result<(), RemoteError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| {
            RemoteError::Store(format!("failed to create {}: {e}", parent.display()))
        })?;
    }

    let mut tmp_name = path.file_name().unwrap_or_default().to_os_string();
    let n = TMP_COUNTER.fetch_add(1, Ordering::Relaxed);
    tmp_name.push(format!(".{}-{n}.tmp", std::process::id()));
    let tmp_path = path.with_file_name(tmp_name);

    fs::write(&tmp_path, body)
        .map_err(|e| RemoteError::Store(format!("write {}: {e}", tmp_path.display())))?;

    fs::rename(&tmp_path, path).map_err(|e| {
        let _ = fs::remove_file(&tmp_path);
        RemoteError::Store(format!("atomic rename to {} failed: {e}", path.display()))
    })
}
