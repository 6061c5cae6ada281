//! Document server over a conditional blob store.
//!
//! Every mutation is a read-modify-write of the `head` blob guarded by its
//! etag. Any number of servers may share one store; a lost race re-reads
//! the head and tries again after a jittered backoff.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::Utc;
use flowdoc_editor::FlowContent;
use tracing::{debug, info, instrument, warn};

use crate::config::SyncConfig;
use crate::error::SyncResult;
use crate::head::{
    apply_trim, chunk_key, chunk_of, digest, fill_chunk, plan_trim, sync_head, SyncStep, CHUNK_SIZE,
};
use crate::model::{Change, HeadData, Session, Snapshot, SyncInput, SyncOutput};
use crate::retry::Backoff;
use crate::store::{BlobStore, WriteCondition};

pub const HEAD_KEY: &str = "head";

pub struct DocumentServer<S> {
    store: Arc<S>,
    config: SyncConfig,
    backoff: Backoff,
    trim_scheduled: Arc<AtomicBool>,
}

impl<S> Clone for DocumentServer<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            config: self.config.clone(),
            backoff: self.backoff,
            trim_scheduled: self.trim_scheduled.clone(),
        }
    }
}

impl<S: BlobStore + 'static> DocumentServer<S> {
    pub fn new(store: Arc<S>, config: SyncConfig) -> Self {
        Self {
            backoff: Backoff::from_config(&config),
            store,
            config,
            trim_scheduled: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Create the document. `None` when it already exists.
    #[instrument(skip_all)]
    pub async fn init(
        &self,
        content: Option<FlowContent>,
        language: Option<String>,
    ) -> SyncResult<Option<Snapshot>> {
        let head = HeadData::new(content.unwrap_or_default(), language);
        let data = serde_json::to_vec(&head)?;
        match self
            .store
            .write(HEAD_KEY, data, WriteCondition::IfNoneMatch)
            .await?
        {
            Some(_) => {
                info!("Document created");
                Ok(Some(snapshot(&head)?))
            }
            None => {
                debug!("Document already exists");
                Ok(None)
            }
        }
    }

    /// Current state. `None` when the document does not exist.
    #[instrument(skip_all)]
    pub async fn read(&self) -> SyncResult<Option<Snapshot>> {
        match self.read_head().await? {
            Some((head, _)) => Ok(Some(snapshot(&head)?)),
            None => Ok(None),
        }
    }

    /// Reconcile a client request with the head.
    ///
    /// `None` means the client must `read` afresh: the document is missing,
    /// the token is outside retained history, or every attempt lost its race.
    #[instrument(skip_all, fields(session = %session.key, token = input.token))]
    pub async fn sync(&self, input: SyncInput, session: Session) -> SyncResult<Option<SyncOutput>> {
        let mut attempt = 0;
        loop {
            let Some((head, etag)) = self.read_head().await? else {
                debug!("Document does not exist");
                return Ok(None);
            };

            let now = Utc::now();
            let (next, output) =
                match sync_head(&head, &input, &session, now, self.config.presence_ttl())? {
                    SyncStep::Applied { head, output } => (head, output),
                    SyncStep::Conflict(conflict) => {
                        info!(
                            oldest = conflict.oldest,
                            version = conflict.version,
                            "Token outside retained history"
                        );
                        return Ok(None);
                    }
                };

            let data = serde_json::to_vec(&next)?;
            if self
                .store
                .write(HEAD_KEY, data, WriteCondition::IfMatch(etag))
                .await?
                .is_some()
            {
                debug!(version = output.version, "Synced");
                if self.trim_due(&next) {
                    self.schedule_trim();
                }
                return Ok(Some(output));
            }

            if !self.backoff.retry(attempt, "sync").await {
                return Ok(None);
            }
            attempt += 1;
        }
    }

    /// Move old changes from the head into archival chunks.
    ///
    /// Returns whether the head shrank.
    #[instrument(skip_all)]
    pub async fn trim(&self) -> SyncResult<bool> {
        let mut attempt = 0;
        loop {
            let Some((head, etag)) = self.read_head().await? else {
                return Ok(false);
            };

            let now = Utc::now();
            let Some(plan) = plan_trim(
                &head,
                now,
                self.config.trim_retention(),
                self.config.trim_max_recent,
                self.config.trim_min_batch,
            ) else {
                return Ok(false);
            };

            for (chunk, first_index, changes) in plan.chunks() {
                if !self.append_chunk(chunk, first_index, changes).await? {
                    return Ok(false);
                }
            }

            let Some(next) = apply_trim(&head, &plan) else {
                return Ok(false);
            };
            let data = serde_json::to_vec(&next)?;
            if self
                .store
                .write(HEAD_KEY, data, WriteCondition::IfMatch(etag))
                .await?
                .is_some()
            {
                info!(
                    archived = plan.changes.len(),
                    first_index = plan.first_index,
                    "Trimmed history"
                );
                return Ok(true);
            }

            if !self.backoff.retry(attempt, "trim").await {
                return Ok(false);
            }
            attempt += 1;
        }
    }

    /// Run [`trim`](Self::trim) after the debounce delay unless one is
    /// already pending in this process.
    pub fn schedule_trim(&self) {
        if self.trim_scheduled.swap(true, Ordering::AcqRel) {
            return;
        }

        let server = self.clone();
        let scheduled = TrimScheduled(self.trim_scheduled.clone());
        tokio::spawn(async move {
            let _scheduled = scheduled;
            tokio::time::sleep(server.config.trim_debounce()).await;
            if let Err(e) = server.trim().await {
                warn!("Scheduled trim failed: {}", e);
            }
        });
    }

    /// Archived changes of one chunk, oldest first
    pub async fn read_chunk(&self, chunk: u64) -> SyncResult<Vec<Change>> {
        Ok(self
            .read_chunk_blob(chunk)
            .await?
            .map(|(changes, _)| changes)
            .unwrap_or_default())
    }

    /// Every change ever applied, oldest first
    #[instrument(skip_all)]
    pub async fn history(&self) -> SyncResult<Vec<Change>> {
        let Some((head, _)) = self.read_head().await? else {
            return Ok(Vec::new());
        };

        let archived = head.first_recent_index();
        let mut changes = Vec::with_capacity(head.version as usize);
        if archived > 0 {
            for chunk in 0..=chunk_of(archived - 1) {
                let mut stored = self.read_chunk(chunk).await?;
                stored.truncate(CHUNK_SIZE.min(archived - chunk * CHUNK_SIZE) as usize);
                changes.extend(stored);
            }
        }
        changes.extend(head.recent);
        Ok(changes)
    }

    fn trim_due(&self, head: &HeadData) -> bool {
        plan_trim(
            head,
            Utc::now(),
            self.config.trim_retention(),
            self.config.trim_max_recent,
            self.config.trim_min_batch,
        )
        .is_some()
    }

    async fn read_head(&self) -> SyncResult<Option<(HeadData, String)>> {
        match self.store.read(HEAD_KEY).await? {
            Some(blob) => Ok(Some((serde_json::from_slice(&blob.data)?, blob.etag))),
            None => Ok(None),
        }
    }

    async fn read_chunk_blob(&self, chunk: u64) -> SyncResult<Option<(Vec<Change>, String)>> {
        match self.store.read(&chunk_key(chunk)).await? {
            Some(blob) => Ok(Some((serde_json::from_slice(&blob.data)?, blob.etag))),
            None => Ok(None),
        }
    }

    /// Write `changes` into their chunk. `false` when retries ran out.
    async fn append_chunk(&self, chunk: u64, first_index: u64, changes: &[Change]) -> SyncResult<bool> {
        let mut attempt = 0;
        loop {
            let (existing, condition) = match self.read_chunk_blob(chunk).await? {
                Some((existing, etag)) => (existing, WriteCondition::IfMatch(etag)),
                None => (Vec::new(), WriteCondition::IfNoneMatch),
            };

            let Some((filled, placeholders)) =
                fill_chunk(&existing, chunk, first_index, changes, Utc::now())
            else {
                return Ok(true);
            };
            if placeholders > 0 {
                warn!(chunk, placeholders, "Patched missing history slots with no-op changes");
            }

            let data = serde_json::to_vec(&filled)?;
            if self.store.write(&chunk_key(chunk), data, condition).await?.is_some() {
                debug!(chunk, size = filled.len(), "Wrote history chunk");
                return Ok(true);
            }

            if !self.backoff.retry(attempt, "chunk").await {
                return Ok(false);
            }
            attempt += 1;
        }
    }
}

/// Clears the pending-trim flag when the scheduled task ends, even by panic
struct TrimScheduled(Arc<AtomicBool>);

impl Drop for TrimScheduled {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

fn snapshot(head: &HeadData) -> SyncResult<Snapshot> {
    Ok(Snapshot {
        version: head.version,
        digest: digest(&head.content)?,
        content: head.content.clone(),
        theme: head.theme.clone(),
        presence: head.presence.clone(),
    })
}
