//! Data exchanged with and stored by the document server

use chrono::{DateTime, Utc};
use flowdoc_editor::{FlowContent, FlowSelection, FlowTheme, Operation};
use serde::{Deserialize, Serialize};

/// The client session submitting a request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    /// Unique per connection
    pub key: String,
    /// User id, shared by every session of one user
    pub uid: String,
    pub name: String,
}

impl Session {
    pub fn new(key: impl Into<String>, uid: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            uid: uid.into(),
            name: name.into(),
        }
    }
}

/// One applied operation in the document history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Change {
    pub at: DateTime<Utc>,
    pub op: Operation,
    pub by: Session,
}

/// Liveness and selection of one session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Presence {
    pub key: String,
    pub uid: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selection: Option<FlowSelection>,
    pub seen: DateTime<Utc>,
}

impl Presence {
    pub fn new(session: &Session, selection: Option<FlowSelection>, seen: DateTime<Utc>) -> Self {
        Self {
            key: session.key.clone(),
            uid: session.uid.clone(),
            name: session.name.clone(),
            selection,
            seen,
        }
    }
}

/// Canonical server state of a document.
///
/// `version` counts every change ever applied. `recent` holds the newest of
/// them; the change that produced version `v` sits at index
/// `v - 1 - first_recent_index()`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeadData {
    pub version: u64,
    pub content: FlowContent,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub theme: Option<FlowTheme>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(default)]
    pub recent: Vec<Change>,
    #[serde(default)]
    pub presence: Vec<Presence>,
}

impl HeadData {
    pub fn new(content: FlowContent, language: Option<String>) -> Self {
        Self {
            version: 0,
            content,
            theme: None,
            language,
            recent: Vec::new(),
            presence: Vec::new(),
        }
    }

    /// History index of the first change still in `recent`
    pub fn first_recent_index(&self) -> u64 {
        self.version - self.recent.len() as u64
    }
}

/// Full document state handed to a client joining or recovering
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub version: u64,
    pub content: FlowContent,
    /// CRC32 of the canonical content encoding, lowercase hex
    pub digest: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub theme: Option<FlowTheme>,
    pub presence: Vec<Presence>,
}

/// A client's sync request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncInput {
    /// Version the client's operation and selection were conceived against
    pub token: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation: Option<Operation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selection: Option<FlowSelection>,
}

/// The server's answer to a sync request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncOutput {
    pub version: u64,
    /// Everything the client missed, oldest first
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub merge: Option<Operation>,
    pub presence: Vec<Presence>,
    /// Key of the requesting session
    pub you: String,
}
