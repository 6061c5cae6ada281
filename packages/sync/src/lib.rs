//! # Flowdoc Sync
//!
//! Multi-writer document synchronisation over a conditional blob store.
//!
//! A document lives in one `head` blob holding its content, version, recent
//! history and the presence of connected sessions. Clients submit an
//! operation conceived against some version; the server rebases it past
//! everything the client missed and hands that `merge` back so the client
//! can catch up the same way. Old history is moved out of the head into
//! fixed-size chunk blobs.
//!
//! ```text
//! SyncClient ──SyncInput──▶ DocumentServer ──read/write(If-Match)──▶ BlobStore
//!            ◀─SyncOutput──
//! ```

mod client;
mod config;
mod error;
mod head;
mod model;
mod retry;
mod server;
mod store;

pub use client::SyncClient;
pub use config::{SyncConfig, DEFAULT_CONFIG_NAME};
pub use error::{SyncError, SyncResult};
pub use head::{
    apply_trim, chunk_key, chunk_of, compute_merge, digest, fill_chunk, placeholder_change,
    plan_trim, sync_head, Conflict, SyncStep, TrimPlan, CHUNK_SIZE,
};
pub use model::{Change, HeadData, Presence, Session, Snapshot, SyncInput, SyncOutput};
pub use retry::Backoff;
pub use server::{DocumentServer, HEAD_KEY};
pub use store::{Blob, BlobStore, MemoryBlobStore, WriteCondition};
