//! # Head Reconciliation
//!
//! Pure functions over [`HeadData`]. The server wraps them in a
//! read-modify-write loop against the blob store; nothing here suspends or
//! touches storage, so every rule can be tested on plain values.
//!
//! ## Sync
//!
//! 1. Collect every change the client has not seen into one `merge` batch
//! 2. Rebase the client's operation past `merge`
//! 3. Apply it and append it to `recent`
//! 4. Carry the client's selection past `merge` and its own operation
//! 5. Refresh presence, moving everyone else's selection past the operation

use std::time::Duration;

use chrono::{DateTime, Utc};
use flowdoc_editor::{BatchOperation, FlowContent, FlowResult, Operation};

use crate::model::{Change, HeadData, Presence, Session, SyncInput, SyncOutput};

/// Versions per archival chunk
pub const CHUNK_SIZE: u64 = 1000;

/// Blob key of the archival chunk holding history index `chunk * CHUNK_SIZE`
pub fn chunk_key(chunk: u64) -> String {
    format!("changes_{:013}", chunk)
}

/// Chunk number holding history index `index`
pub fn chunk_of(index: u64) -> u64 {
    index / CHUNK_SIZE
}

/// CRC32 of the canonical JSON encoding of `content`
pub fn digest(content: &FlowContent) -> Result<String, serde_json::Error> {
    let bytes = serde_json::to_vec(content)?;
    Ok(format!("{:08x}", crc32fast::hash(&bytes)))
}

/// The client's base version cannot be aligned with retained history
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Conflict {
    pub token: u64,
    pub oldest: u64,
    pub version: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SyncStep {
    Applied { head: HeadData, output: SyncOutput },
    Conflict(Conflict),
}

/// Batch of every change after `token`, oldest first.
///
/// `Ok(None)` when the client is up to date.
pub fn compute_merge(head: &HeadData, token: u64) -> Result<Option<Operation>, Conflict> {
    let oldest = head.first_recent_index();
    if token > head.version || token < oldest {
        return Err(Conflict {
            token,
            oldest,
            version: head.version,
        });
    }
    let skip = (token - oldest) as usize;
    let ops: Vec<Operation> = head.recent[skip..].iter().map(|c| c.op.clone()).collect();
    if ops.is_empty() {
        return Ok(None);
    }
    Ok(Some(Operation::Batch(BatchOperation { ops })))
}

/// Reconcile one client request against the head
pub fn sync_head(
    head: &HeadData,
    input: &SyncInput,
    session: &Session,
    now: DateTime<Utc>,
    presence_ttl: Duration,
) -> FlowResult<SyncStep> {
    let merge = match compute_merge(head, input.token) {
        Ok(merge) => merge,
        Err(conflict) => return Ok(SyncStep::Conflict(conflict)),
    };

    let operation = match (&merge, &input.operation) {
        (Some(merge), Some(op)) => merge.transform(op),
        (None, op) => op.clone(),
        (Some(_), None) => None,
    };

    let mut next = head.clone();
    if let Some(op) = &operation {
        next.content = op.apply_to_content(&head.content, head.theme.as_ref())?;
        next.version += 1;
        next.recent.push(Change {
            at: now,
            op: op.clone(),
            by: session.clone(),
        });
    }

    let selection = input.selection.as_ref().and_then(|selection| {
        let selection = match &merge {
            Some(merge) => merge.apply_to_selection(selection, false)?,
            None => selection.clone(),
        };
        match &operation {
            Some(op) => op.apply_to_selection(&selection, true),
            None => Some(selection),
        }
    });

    let fresh = |p: &Presence| {
        (now - p.seen)
            .to_std()
            .map(|age| age <= presence_ttl)
            .unwrap_or(true)
    };
    let mut presence: Vec<Presence> = head
        .presence
        .iter()
        .filter(|p| p.key != session.key && fresh(*p))
        .map(|p| {
            let selection = match (&operation, &p.selection) {
                (Some(op), Some(selection)) => op.apply_to_selection(selection, false),
                (_, selection) => selection.clone(),
            };
            Presence {
                selection,
                ..p.clone()
            }
        })
        .collect();

    let output = SyncOutput {
        version: next.version,
        merge,
        presence: presence.clone(),
        you: session.key.clone(),
    };

    presence.push(Presence::new(session, selection, now));
    next.presence = presence;

    Ok(SyncStep::Applied { head: next, output })
}

/// A run of the oldest recent changes selected for archiving
#[derive(Debug, Clone, PartialEq)]
pub struct TrimPlan {
    /// History index of the first change in `changes`
    pub first_index: u64,
    pub changes: Vec<Change>,
}

impl TrimPlan {
    /// Split the run at chunk boundaries, yielding `(chunk, first_index, changes)`
    pub fn chunks(&self) -> Vec<(u64, u64, &[Change])> {
        let mut out = Vec::new();
        let mut index = self.first_index;
        let mut rest = self.changes.as_slice();
        while !rest.is_empty() {
            let chunk = chunk_of(index);
            let room = ((chunk + 1) * CHUNK_SIZE - index) as usize;
            let (head, tail) = rest.split_at(room.min(rest.len()));
            out.push((chunk, index, head));
            index += head.len() as u64;
            rest = tail;
        }
        out
    }
}

/// Decide which changes to move out of the head.
///
/// Changes older than `retention` go, and so does everything past the
/// newest `max_recent`. Runs shorter than `min_batch` are left for later.
pub fn plan_trim(
    head: &HeadData,
    now: DateTime<Utc>,
    retention: Duration,
    max_recent: usize,
    min_batch: usize,
) -> Option<TrimPlan> {
    let expired = head
        .recent
        .iter()
        .take_while(|change| {
            (now - change.at)
                .to_std()
                .map(|age| age > retention)
                .unwrap_or(false)
        })
        .count();
    let overflow = head.recent.len().saturating_sub(max_recent);
    let count = expired.max(overflow);

    if count == 0 || count < min_batch {
        return None;
    }
    Some(TrimPlan {
        first_index: head.first_recent_index(),
        changes: head.recent[..count].to_vec(),
    })
}

/// Drop the planned run from the head.
///
/// `None` when the head no longer starts where the plan does, meaning
/// another process trimmed it first.
pub fn apply_trim(head: &HeadData, plan: &TrimPlan) -> Option<HeadData> {
    if head.first_recent_index() != plan.first_index || head.recent.len() < plan.changes.len() {
        return None;
    }
    let mut next = head.clone();
    next.recent.drain(..plan.changes.len());
    Some(next)
}

/// Change standing in for a chunk slot that was lost
pub fn placeholder_change(now: DateTime<Utc>) -> Change {
    Change {
        at: now,
        op: Operation::noop(),
        by: Session::new("trim", "system", "trim"),
    }
}

/// Append `changes`, starting at history index `first_index`, to the
/// existing contents of `chunk`.
///
/// Slots already written keep their first value. A gap between the stored
/// entries and `first_index` is filled with placeholders. Returns the new
/// chunk contents and the number of placeholders used, or `None` when the
/// chunk already holds everything.
pub fn fill_chunk(
    existing: &[Change],
    chunk: u64,
    first_index: u64,
    changes: &[Change],
    now: DateTime<Utc>,
) -> Option<(Vec<Change>, usize)> {
    let start = (first_index - chunk * CHUNK_SIZE) as usize;
    let end = start + changes.len();
    if existing.len() >= end {
        return None;
    }

    let mut filled = existing.to_vec();
    let mut placeholders = 0;
    while filled.len() < start {
        filled.push(placeholder_change(now));
        placeholders += 1;
    }
    let already = filled.len() - start;
    filled.extend_from_slice(&changes[already..]);
    Some((filled, placeholders))
}
