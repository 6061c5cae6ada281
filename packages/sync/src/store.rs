//! Conditional key-value storage the server keeps its state in

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::error::SyncResult;

/// A stored value and the tag identifying this revision of it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Blob {
    pub data: Vec<u8>,
    pub etag: String,
}

/// Precondition guarding a write
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteCondition {
    /// Write unconditionally
    Always,
    /// Only replace the revision carrying this tag
    IfMatch(String),
    /// Only create a key that does not exist yet
    IfNoneMatch,
}

#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn read(&self, key: &str) -> SyncResult<Option<Blob>>;

    /// Write `data` under `key`.
    ///
    /// Returns the new tag, or `None` when the precondition failed.
    async fn write(
        &self,
        key: &str,
        data: Vec<u8>,
        condition: WriteCondition,
    ) -> SyncResult<Option<String>>;
}

/// Process-local store, used by tests and the CLI
#[derive(Debug, Default)]
pub struct MemoryBlobStore {
    inner: Mutex<MemoryState>,
}

#[derive(Debug, Default)]
struct MemoryState {
    blobs: HashMap<String, Blob>,
    revision: u64,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn keys(&self) -> Vec<String> {
        let state = self.inner.lock().await;
        let mut keys: Vec<String> = state.blobs.keys().cloned().collect();
        keys.sort();
        keys
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn read(&self, key: &str) -> SyncResult<Option<Blob>> {
        Ok(self.inner.lock().await.blobs.get(key).cloned())
    }

    async fn write(
        &self,
        key: &str,
        data: Vec<u8>,
        condition: WriteCondition,
    ) -> SyncResult<Option<String>> {
        let mut state = self.inner.lock().await;
        let current = state.blobs.get(key).map(|blob| blob.etag.as_str());
        let allowed = match &condition {
            WriteCondition::Always => true,
            WriteCondition::IfMatch(etag) => current == Some(etag.as_str()),
            WriteCondition::IfNoneMatch => current.is_none(),
        };
        if !allowed {
            return Ok(None);
        }

        state.revision += 1;
        let etag = format!("\"{}\"", state.revision);
        state.blobs.insert(
            key.to_string(),
            Blob {
                data,
                etag: etag.clone(),
            },
        );
        Ok(Some(etag))
    }
}
