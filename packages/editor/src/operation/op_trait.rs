use crate::content::FlowContent;
use crate::errors::FlowResult;
use crate::operation::Operation;
use crate::range::FlowRange;
use crate::selection::FlowSelection;
use crate::style::FlowTheme;
use crate::transform::TableEdit;

/// Contract every concrete operation implements
///
/// Each operation type provides:
/// - Apply logic against flow content
/// - The inverse operation, computed from the content before applying
/// - Its own transform under a concurrent insertion, removal or table edit
/// - Merging with the operation that directly follows it
pub trait FlowOp: Clone + Into<Operation> {
    /// Get a debug name for this operation
    fn name(&self) -> &'static str;

    fn apply_to_content(
        &self,
        content: &FlowContent,
        theme: Option<&FlowTheme>,
    ) -> FlowResult<FlowContent>;

    /// Build the undo of this operation given the content it applies to.
    ///
    /// `Ok(None)` means the operation cannot be undone.
    fn invert(&self, before: &FlowContent) -> FlowResult<Option<Operation>>;

    /// Fold `next` into this operation when a single operation can express both
    fn merge_next(&self, _next: &Operation) -> Option<Operation> {
        None
    }

    /// This operation, rewritten to apply after `inserted` was inserted
    fn after_insertion(&self, inserted: FlowRange) -> Option<Operation>;

    /// Like [`FlowOp::after_insertion`], except that insertions made at the
    /// same point stay in front of `inserted`
    fn after_insertion_behind(&self, inserted: FlowRange) -> Option<Operation> {
        self.after_insertion(inserted)
    }

    /// This operation, rewritten to apply after `removed` was removed
    fn after_removal(&self, removed: FlowRange) -> Option<Operation>;

    /// This operation, rewritten to apply after rows or columns changed
    fn after_table_edit(&self, _edit: &TableEdit) -> Option<Operation> {
        Some(self.clone().into())
    }

    /// Carry a selection across this operation.
    ///
    /// `mine` is set when the selection belongs to the author of the
    /// operation.
    fn apply_to_selection(&self, selection: &FlowSelection, _mine: bool) -> Option<FlowSelection> {
        Some(selection.clone())
    }
}
