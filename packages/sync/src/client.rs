//! Client half of the sync protocol.
//!
//! The client keeps the last content the server confirmed, at most one
//! operation in flight and any edits made since. Local content is always
//! `confirmed + sent + pending`.

use flowdoc_editor::{BatchOperation, FlowContent, FlowResult, FlowSelection, FlowTheme, Operation};
use tracing::debug;

use crate::model::{Presence, Snapshot, SyncInput, SyncOutput};

#[derive(Debug, Clone)]
pub struct SyncClient {
    confirmed: FlowContent,
    content: FlowContent,
    theme: Option<FlowTheme>,
    version: u64,
    selection: Option<FlowSelection>,
    sent: Option<Operation>,
    pending: Option<Operation>,
    others: Vec<Presence>,
}

impl SyncClient {
    pub fn from_snapshot(snapshot: Snapshot) -> Self {
        Self {
            confirmed: snapshot.content.clone(),
            content: snapshot.content,
            theme: snapshot.theme,
            version: snapshot.version,
            selection: None,
            sent: None,
            pending: None,
            others: snapshot.presence,
        }
    }

    /// Content including unconfirmed local edits
    pub fn content(&self) -> &FlowContent {
        &self.content
    }

    /// Last content the server acknowledged
    pub fn confirmed(&self) -> &FlowContent {
        &self.confirmed
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn selection(&self) -> Option<&FlowSelection> {
        self.selection.as_ref()
    }

    pub fn set_selection(&mut self, selection: Option<FlowSelection>) {
        self.selection = selection;
    }

    /// Presence of the other sessions as of the last sync
    pub fn others(&self) -> &[Presence] {
        &self.others
    }

    pub fn has_unconfirmed(&self) -> bool {
        self.sent.is_some() || self.pending.is_some()
    }

    /// Apply a local edit and queue it for the server
    pub fn edit(&mut self, op: Operation) -> FlowResult<()> {
        self.content = op.apply_to_content(&self.content, self.theme.as_ref())?;
        if let Some(selection) = &self.selection {
            self.selection = op.apply_to_selection(selection, true);
        }
        self.pending = match self.pending.take() {
            Some(pending) => BatchOperation::from_vec(vec![pending, op]),
            None => Some(op),
        };
        Ok(())
    }

    /// Build the next request, moving queued edits in flight.
    ///
    /// An unacknowledged operation is sent again as it was.
    pub fn input(&mut self) -> SyncInput {
        if self.sent.is_none() {
            self.sent = self.pending.take();
        }
        SyncInput {
            token: self.version,
            operation: self.sent.clone(),
            selection: self.selection.clone(),
        }
    }

    /// Fold the server's answer to the last [`input`](Self::input) in.
    pub fn apply_output(&mut self, output: SyncOutput) -> FlowResult<()> {
        let sent = self.sent.take();
        let mut confirmed = self.confirmed.clone();

        // The server ran merge, then our operation rebased past it
        if let Some(merge) = &output.merge {
            confirmed = merge.apply_to_content(&confirmed, self.theme.as_ref())?;
        }
        let applied = match (&output.merge, &sent) {
            (Some(merge), Some(sent)) => merge.transform(sent),
            (None, sent) => sent.clone(),
            (Some(_), None) => None,
        };
        if let Some(applied) = &applied {
            confirmed = applied.apply_to_content(&confirmed, self.theme.as_ref())?;
        }

        // Carry merge past what we sent, then rebase queued edits over it.
        // Merge ran first on the server, so it keeps winning ties here.
        let merge = match (output.merge, &sent) {
            (Some(merge), Some(sent)) => sent.transform_with_priority(&merge, true),
            (merge, _) => merge,
        };
        let queued = self.pending.take();
        let pending = match (&merge, &queued) {
            (Some(merge), Some(queued)) => {
                let rebased = merge.transform(queued);
                if rebased.is_none() {
                    debug!("Queued edits cancelled by remote changes");
                }
                rebased
            }
            (_, queued) => queued.clone(),
        };

        if let (Some(merge), Some(selection)) = (&merge, &self.selection) {
            let local_merge = match &queued {
                Some(queued) => queued.transform_with_priority(merge, true),
                None => Some(merge.clone()),
            };
            self.selection = local_merge.and_then(|merge| merge.apply_to_selection(selection, false));
        }

        self.content = match &pending {
            Some(pending) => pending.apply_to_content(&confirmed, self.theme.as_ref())?,
            None => confirmed.clone(),
        };
        self.confirmed = confirmed;
        self.pending = pending;
        self.version = output.version;
        self.others = output.presence;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flowdoc_editor::FlowRange;

    fn client(text: &str) -> SyncClient {
        SyncClient::from_snapshot(Snapshot {
            version: 4,
            content: FlowContent::from_text(text),
            digest: String::new(),
            theme: None,
            presence: Vec::new(),
        })
    }

    #[test]
    fn test_edits_queue_until_input() {
        let mut client = client("abc");
        client.set_selection(Some(FlowSelection::caret(3)));
        client.edit(Operation::insert_text(3, "d")).unwrap();
        client.edit(Operation::insert_text(4, "e")).unwrap();
        assert_eq!(client.content().plain_text(), "abcde");
        assert_eq!(client.confirmed().plain_text(), "abc");
        assert_eq!(client.selection(), Some(&FlowSelection::caret(5)));

        let input = client.input();
        assert_eq!(input.token, 4);
        assert_eq!(input.operation, Some(Operation::insert_text(3, "de")));

        client.edit(Operation::insert_text(0, ">")).unwrap();
        assert_eq!(client.input().operation, Some(Operation::insert_text(3, "de")));
    }

    #[test]
    fn test_output_rebases_local_state() {
        let mut client = client("hello");
        client.set_selection(Some(FlowSelection::caret(5)));
        client.edit(Operation::insert_text(5, "!")).unwrap();
        client.input();
        client.edit(Operation::insert_text(6, "?")).unwrap();

        // Someone else removed "he" before our "!" arrived
        client
            .apply_output(SyncOutput {
                version: 6,
                merge: Some(Operation::remove(FlowRange::new(0, 2))),
                presence: Vec::new(),
                you: "s-alice".into(),
            })
            .unwrap();

        assert_eq!(client.version(), 6);
        assert_eq!(client.confirmed().plain_text(), "llo!");
        assert_eq!(client.content().plain_text(), "llo!?");
        assert_eq!(client.selection(), Some(&FlowSelection::caret(5)));
        assert!(client.has_unconfirmed());

        let input = client.input();
        assert_eq!(input.token, 6);
        assert_eq!(input.operation, Some(Operation::insert_text(4, "?")));
    }

    #[test]
    fn test_output_keeps_server_order_for_tied_insertions() {
        let mut client = client("");
        client.edit(Operation::insert_text(0, "a")).unwrap();
        client.input();
        client.edit(Operation::remove(FlowRange::new(0, 1))).unwrap();

        // Someone typed at the same spot and reached the server first
        client
            .apply_output(SyncOutput {
                version: 6,
                merge: Some(Operation::insert_text(0, "b")),
                presence: Vec::new(),
                you: "s-alice".into(),
            })
            .unwrap();

        assert_eq!(client.confirmed().plain_text(), "ba");
        assert_eq!(client.content().plain_text(), "b");
        assert_eq!(
            client.input().operation,
            Some(Operation::remove(FlowRange::new(1, 2)))
        );
    }
}
