//! # Undo/Redo Stack
//!
//! Tracks operation history for a single editing client.
//!
//! ## Design
//!
//! - Each operation records its inverse, computed against the content it
//!   was applied to
//! - Undo applies the inverse and moves the entry to the redo stack
//! - Redo reapplies the original operation
//! - New operations clear the redo stack
//! - While a merge window is open, consecutive operations fold into the
//!   previous entry through `merge_next` (typing a word is one undo step)
//! - Operations without an inverse make earlier history unreachable, so the
//!   whole history is dropped
//! - Remote operations rebase the stored history
//!
//! ## Example
//!
//! ```rust,ignore
//! let mut stack = UndoStack::new();
//! let content = FlowContent::from_text("hello");
//!
//! let content = stack.apply(&Operation::insert_text(5, "!"), &content, None)?;
//! let (_, content) = stack.undo(&content)?.unwrap();
//! let (_, content) = stack.redo(&content)?.unwrap();
//! ```

use tracing::{debug, trace};

use crate::content::FlowContent;
use crate::errors::FlowResult;
use crate::operation::{BatchOperation, Operation};
use crate::style::FlowTheme;

/// One undo step: an operation and the operation that reverts it
#[derive(Debug, Clone, PartialEq)]
pub struct UndoEntry {
    pub operation: Operation,
    pub inverse: Operation,
    pub description: Option<String>,
}

impl UndoEntry {
    pub fn new(operation: Operation, inverse: Operation) -> Self {
        Self {
            operation,
            inverse,
            description: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Operations collected between `begin_batch` and `end_batch`
#[derive(Debug, Default)]
struct PendingBatch {
    operations: Vec<Operation>,
    inverses: Vec<Operation>,
    description: Option<String>,
}

#[derive(Debug)]
pub struct UndoStack {
    undo_stack: Vec<UndoEntry>,
    redo_stack: Vec<UndoEntry>,

    /// Maximum number of undo levels (0 = unlimited)
    max_levels: usize,

    current_batch: Option<PendingBatch>,
    merging: bool,
}

impl UndoStack {
    /// Create a new undo stack with default max levels (100)
    pub fn new() -> Self {
        Self::with_max_levels(100)
    }

    pub fn with_max_levels(max_levels: usize) -> Self {
        Self {
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            max_levels,
            current_batch: None,
            merging: false,
        }
    }

    /// Apply `operation` to `content` and record it for undo
    pub fn apply(
        &mut self,
        operation: &Operation,
        content: &FlowContent,
        theme: Option<&FlowTheme>,
    ) -> FlowResult<FlowContent> {
        let inverse = operation.invert(content)?;
        let after = operation.apply_to_content(content, theme)?;

        let Some(inverse) = inverse else {
            debug!(op = operation.name(), "Operation has no inverse, dropping history");
            self.clear();
            return Ok(after);
        };

        if let Some(batch) = &mut self.current_batch {
            batch.operations.push(operation.clone());
            batch.inverses.insert(0, inverse);
        } else if !self.merge_into_last(operation, &inverse) {
            self.push_entry(UndoEntry::new(operation.clone(), inverse));
        }

        Ok(after)
    }

    fn merge_into_last(&mut self, operation: &Operation, inverse: &Operation) -> bool {
        if !self.merging {
            return false;
        }
        let Some(last) = self.undo_stack.last_mut() else {
            return false;
        };
        let Some(merged) = last.operation.merge_next(operation) else {
            return false;
        };
        let Some(merged_inverse) = inverse.merge_next(&last.inverse) else {
            return false;
        };

        trace!(op = operation.name(), "Merged into previous undo entry");
        if merged.is_noop() {
            self.undo_stack.pop();
        } else {
            last.operation = merged;
            last.inverse = merged_inverse;
        }
        self.redo_stack.clear();
        true
    }

    /// Fold following operations into the latest entry where they merge
    pub fn open_merge_window(&mut self) {
        self.merging = true;
    }

    pub fn close_merge_window(&mut self) {
        self.merging = false;
    }

    /// Start a batch of operations (will be undone/redone together)
    pub fn begin_batch(&mut self) {
        self.current_batch = Some(PendingBatch::default());
    }

    /// End the current batch and push it as one entry
    pub fn end_batch(&mut self) {
        let Some(batch) = self.current_batch.take() else {
            return;
        };
        let operation = BatchOperation::from_vec(batch.operations);
        let inverse = BatchOperation::from_vec(batch.inverses);
        if let (Some(operation), Some(inverse)) = (operation, inverse) {
            let mut entry = UndoEntry::new(operation, inverse);
            entry.description = batch.description;
            self.push_entry(entry);
        }
    }

    pub fn set_batch_description(&mut self, description: impl Into<String>) {
        if let Some(batch) = &mut self.current_batch {
            batch.description = Some(description.into());
        }
    }

    fn push_entry(&mut self, entry: UndoEntry) {
        self.undo_stack.push(entry);

        if self.max_levels > 0 && self.undo_stack.len() > self.max_levels {
            self.undo_stack.remove(0);
        }

        self.redo_stack.clear();
    }

    /// Undo the most recent entry.
    ///
    /// Returns the operation that was applied together with the new content,
    /// or `None` when there is nothing to undo.
    pub fn undo(&mut self, content: &FlowContent) -> FlowResult<Option<(Operation, FlowContent)>> {
        let Some(entry) = self.undo_stack.pop() else {
            return Ok(None);
        };
        let after = match entry.inverse.apply_to_content(content, None) {
            Ok(after) => after,
            Err(err) => {
                self.undo_stack.push(entry);
                return Err(err);
            }
        };
        let applied = entry.inverse.clone();
        self.redo_stack.push(entry);
        Ok(Some((applied, after)))
    }

    /// Redo the most recently undone entry
    pub fn redo(&mut self, content: &FlowContent) -> FlowResult<Option<(Operation, FlowContent)>> {
        let Some(entry) = self.redo_stack.pop() else {
            return Ok(None);
        };
        let after = match entry.operation.apply_to_content(content, None) {
            Ok(after) => after,
            Err(err) => {
                self.redo_stack.push(entry);
                return Err(err);
            }
        };
        let applied = entry.operation.clone();
        self.undo_stack.push(entry);
        Ok(Some((applied, after)))
    }

    /// Rebase history past an operation received from another client.
    ///
    /// Entries the remote operation cancels are dropped.
    pub fn rebase(&mut self, remote: &Operation) {
        let rebase = |entries: &mut Vec<UndoEntry>| {
            entries.retain_mut(|entry| {
                match (remote.transform(&entry.operation), remote.transform(&entry.inverse)) {
                    (Some(operation), Some(inverse)) => {
                        entry.operation = operation;
                        entry.inverse = inverse;
                        true
                    }
                    _ => false,
                }
            });
        };
        rebase(&mut self.undo_stack);
        rebase(&mut self.redo_stack);
        self.merging = false;
        debug!(
            op = remote.name(),
            undo = self.undo_stack.len(),
            redo = self.redo_stack.len(),
            "Rebased undo history"
        );
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo_levels(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_levels(&self) -> usize {
        self.redo_stack.len()
    }

    /// Clear all undo/redo history
    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
        self.current_batch = None;
    }

    pub fn undo_description(&self) -> Option<&str> {
        self.undo_stack
            .last()
            .and_then(|entry| entry.description.as_deref())
    }

    pub fn redo_description(&self) -> Option<&str> {
        self.redo_stack
            .last()
            .and_then(|entry| entry.description.as_deref())
    }
}

impl Default for UndoStack {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::{FlowNode, ImageSource};
    use crate::operation::CompleteUpload;
    use crate::range::FlowRange;

    fn text(content: &FlowContent) -> String {
        content.plain_text()
    }

    #[test]
    fn test_undo_stack_creation() {
        let stack = UndoStack::new();
        assert_eq!(stack.undo_levels(), 0);
        assert_eq!(stack.redo_levels(), 0);
        assert!(!stack.can_undo());
        assert!(!stack.can_redo());
    }

    #[test]
    fn test_apply_undo_redo() {
        let mut stack = UndoStack::new();
        let content = FlowContent::from_text("hello");

        let edited = stack
            .apply(&Operation::remove(FlowRange::new(1, 4)), &content, None)
            .unwrap();
        assert_eq!(text(&edited), "ho");

        let (applied, undone) = stack.undo(&edited).unwrap().unwrap();
        assert_eq!(applied.name(), "insert");
        assert_eq!(undone, content);
        assert!(stack.can_redo());

        let (_, redone) = stack.redo(&undone).unwrap().unwrap();
        assert_eq!(redone, edited);
        assert_eq!(stack.undo_levels(), 1);
        assert_eq!(stack.redo_levels(), 0);
    }

    #[test]
    fn test_merge_window_folds_typing() {
        let mut stack = UndoStack::new();
        let mut content = FlowContent::from_text("ab");

        stack.open_merge_window();
        for (at, c) in ["x", "y", "z"].iter().enumerate() {
            content = stack
                .apply(&Operation::insert_text(2 + at, c), &content, None)
                .unwrap();
        }
        stack.close_merge_window();
        content = stack
            .apply(&Operation::insert_text(0, "!"), &content, None)
            .unwrap();

        assert_eq!(text(&content), "!abxyz");
        assert_eq!(stack.undo_levels(), 2);

        let (_, content) = stack.undo(&content).unwrap().unwrap();
        let (_, content) = stack.undo(&content).unwrap().unwrap();
        assert_eq!(text(&content), "ab");
    }

    #[test]
    fn test_typing_then_erasing_leaves_nothing_to_undo() {
        let mut stack = UndoStack::new();
        let content = FlowContent::from_text("ab");

        stack.open_merge_window();
        let typed = stack
            .apply(&Operation::insert_text(2, "c"), &content, None)
            .unwrap();
        let erased = stack
            .apply(&Operation::remove(FlowRange::new(3, 2)), &typed, None)
            .unwrap();

        assert_eq!(erased, content);
        assert!(!stack.can_undo());
    }

    #[test]
    fn test_batched_operations() {
        let mut stack = UndoStack::new();
        let content = FlowContent::from_text("hello there!");

        stack.begin_batch();
        stack.set_batch_description("Replace word");
        let mut edited = stack
            .apply(&Operation::remove(FlowRange::new(6, 11)), &content, None)
            .unwrap();
        edited = stack
            .apply(&Operation::insert_text(6, "world"), &edited, None)
            .unwrap();
        stack.end_batch();

        assert_eq!(text(&edited), "hello world!");
        assert_eq!(stack.undo_levels(), 1);
        assert_eq!(stack.undo_description(), Some("Replace word"));

        let (_, undone) = stack.undo(&edited).unwrap().unwrap();
        assert_eq!(undone, content);
    }

    #[test]
    fn test_new_operation_clears_redo() {
        let mut stack = UndoStack::new();
        let content = FlowContent::from_text("abc");

        let edited = stack
            .apply(&Operation::insert_text(0, "x"), &content, None)
            .unwrap();
        let (_, undone) = stack.undo(&edited).unwrap().unwrap();
        assert_eq!(stack.redo_levels(), 1);

        stack
            .apply(&Operation::insert_text(0, "y"), &undone, None)
            .unwrap();
        assert_eq!(stack.redo_levels(), 0);
    }

    #[test]
    fn test_max_levels_enforced() {
        let mut stack = UndoStack::with_max_levels(2);
        let mut content = FlowContent::new();
        for i in 0..3 {
            content = stack
                .apply(&Operation::insert_text(i, "a"), &content, None)
                .unwrap();
        }
        assert_eq!(stack.undo_levels(), 2);
    }

    #[test]
    fn test_irreversible_operation_drops_history() {
        let mut stack = UndoStack::new();
        let content = FlowContent::from_nodes(vec![FlowNode::Image {
            source: ImageSource {
                url: "blob:1".into(),
                width: 10,
                height: 10,
                upload: Some("u1".into()),
            },
            style: Default::default(),
        }]);

        let content = stack
            .apply(&Operation::insert_text(1, "caption"), &content, None)
            .unwrap();
        assert!(stack.can_undo());

        let upload = CompleteUpload {
            position: 0,
            upload: "u1".into(),
            url: "https://cdn/1.png".into(),
        };
        stack.apply(&upload.into(), &content, None).unwrap();
        assert!(!stack.can_undo());
    }

    #[test]
    fn test_rebase_moves_history() {
        let mut stack = UndoStack::new();
        let content = FlowContent::from_text("abc");
        let edited = stack
            .apply(&Operation::insert_text(3, "!"), &content, None)
            .unwrap();

        let remote = Operation::insert_text(0, ">> ");
        let merged = remote.apply_to_content(&edited, None).unwrap();
        stack.rebase(&remote);

        let (_, undone) = stack.undo(&merged).unwrap().unwrap();
        assert_eq!(text(&undone), ">> abc");
    }
}
