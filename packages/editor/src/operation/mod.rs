//! # Operations
//!
//! Every change to flow content is an [`Operation`]: an immutable value that
//! can be applied, inverted relative to the content it applies to,
//! transformed against a concurrent operation and merged with the one that
//! follows it.
//!
//! The set of operations is closed. Each variant wraps a struct implementing
//! [`FlowOp`]; the enum dispatches to it and owns the one place where
//! transform rules are chosen.
//!
//! ## Transform
//!
//! `a.transform(b)` rewrites `b`, conceived against the same content as `a`,
//! so that it can run after `a`:
//!
//! ```text
//! insert / remove        → b.after_insertion / b.after_removal
//! row / column edits     → b.after_table_edit
//! edit box / table cell  → recurse into b only when it edits the same container
//! reset                  → cancels b
//! batch                  → fold each element over b
//! formatting, metadata   → b unchanged
//! ```
//!
//! `None` is a first-class outcome meaning "b no longer applies".
//!
//! Insertions at the same point go in `a`'s favour;
//! [`Operation::transform_with_priority`] hands the tie to `b` instead.

mod batch;
mod flow;
mod format;
mod nested;
mod op_trait;
mod table;

pub use batch::BatchOperation;
pub use flow::{CompleteUpload, InsertContent, RemoveRange, ResetContent};
pub use format::{FormatBox, FormatParagraph, FormatText, UnformatBox, UnformatParagraph, UnformatText};
pub use nested::{EditBox, EditTableCell};
pub use op_trait::FlowOp;
pub use table::{
    FormatTable, FormatTableColumn, InsertTableColumn, InsertTableRow, MergeTableCell,
    RemoveTableColumn, RemoveTableRow, SplitTableCell, UnformatTable, UnformatTableColumn,
};

pub(crate) use batch::transform_each;

use serde::{Deserialize, Serialize};

use crate::cell::{CellPosition, CellRange};
use crate::content::FlowContent;
use crate::errors::FlowResult;
use crate::range::FlowRange;
use crate::selection::FlowSelection;
use crate::style::{FlowTheme, ParagraphStyle, TextStyle};
use crate::transform::{EditKind, FlowEdit, TableEdit};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Operation {
    Insert(InsertContent),
    Remove(RemoveRange),
    Reset(ResetContent),
    CompleteUpload(CompleteUpload),

    FormatText(FormatText),
    UnformatText(UnformatText),
    FormatParagraph(FormatParagraph),
    UnformatParagraph(UnformatParagraph),
    FormatBox(FormatBox),
    UnformatBox(UnformatBox),

    EditBox(EditBox),
    EditTableCell(EditTableCell),

    InsertTableRow(InsertTableRow),
    RemoveTableRow(RemoveTableRow),
    InsertTableColumn(InsertTableColumn),
    RemoveTableColumn(RemoveTableColumn),
    FormatTable(FormatTable),
    UnformatTable(UnformatTable),
    FormatTableColumn(FormatTableColumn),
    UnformatTableColumn(UnformatTableColumn),
    MergeTableCell(MergeTableCell),
    SplitTableCell(SplitTableCell),

    Batch(BatchOperation),
}

macro_rules! dispatch {
    ($self:expr, $op:ident => $body:expr) => {
        match $self {
            Operation::Insert($op) => $body,
            Operation::Remove($op) => $body,
            Operation::Reset($op) => $body,
            Operation::CompleteUpload($op) => $body,
            Operation::FormatText($op) => $body,
            Operation::UnformatText($op) => $body,
            Operation::FormatParagraph($op) => $body,
            Operation::UnformatParagraph($op) => $body,
            Operation::FormatBox($op) => $body,
            Operation::UnformatBox($op) => $body,
            Operation::EditBox($op) => $body,
            Operation::EditTableCell($op) => $body,
            Operation::InsertTableRow($op) => $body,
            Operation::RemoveTableRow($op) => $body,
            Operation::InsertTableColumn($op) => $body,
            Operation::RemoveTableColumn($op) => $body,
            Operation::FormatTable($op) => $body,
            Operation::UnformatTable($op) => $body,
            Operation::FormatTableColumn($op) => $body,
            Operation::UnformatTableColumn($op) => $body,
            Operation::MergeTableCell($op) => $body,
            Operation::SplitTableCell($op) => $body,
            Operation::Batch($op) => $body,
        }
    };
}

macro_rules! impl_from_op {
    ($($variant:ident => $op:ident),* $(,)?) => {
        $(
            impl From<$op> for Operation {
                fn from(op: $op) -> Self {
                    Operation::$variant(op)
                }
            }
        )*
    };
}

impl_from_op!(
    Insert => InsertContent,
    Remove => RemoveRange,
    Reset => ResetContent,
    CompleteUpload => CompleteUpload,
    FormatText => FormatText,
    UnformatText => UnformatText,
    FormatParagraph => FormatParagraph,
    UnformatParagraph => UnformatParagraph,
    FormatBox => FormatBox,
    UnformatBox => UnformatBox,
    EditBox => EditBox,
    EditTableCell => EditTableCell,
    InsertTableRow => InsertTableRow,
    RemoveTableRow => RemoveTableRow,
    InsertTableColumn => InsertTableColumn,
    RemoveTableColumn => RemoveTableColumn,
    FormatTable => FormatTable,
    UnformatTable => UnformatTable,
    FormatTableColumn => FormatTableColumn,
    UnformatTableColumn => UnformatTableColumn,
    MergeTableCell => MergeTableCell,
    SplitTableCell => SplitTableCell,
    Batch => BatchOperation,
);

impl Operation {
    pub fn insert(position: usize, content: FlowContent) -> Self {
        InsertContent::new(position, content).into()
    }

    pub fn insert_text(position: usize, text: &str) -> Self {
        Self::insert(position, FlowContent::from_text(text))
    }

    pub fn remove(range: FlowRange) -> Self {
        RemoveRange::new(range).into()
    }

    pub fn reset(content: FlowContent) -> Self {
        ResetContent::new(content).into()
    }

    pub fn format_text(range: FlowRange, style: TextStyle) -> Self {
        FormatText::new(range, style).into()
    }

    pub fn format_paragraph(range: FlowRange, style: ParagraphStyle) -> Self {
        FormatParagraph::new(range, style).into()
    }

    pub fn edit_box(position: usize, inner: Operation) -> Self {
        EditBox::new(position, inner).into()
    }

    pub fn edit_table_cell(position: usize, cell: CellPosition, inner: Operation) -> Self {
        EditTableCell::new(position, cell, inner).into()
    }

    pub fn merge_table_cells(position: usize, range: CellRange) -> Self {
        MergeTableCell::new(position, range).into()
    }

    /// The operation that changes nothing
    pub fn noop() -> Self {
        Operation::Batch(BatchOperation::default())
    }

    pub fn is_noop(&self) -> bool {
        matches!(self, Operation::Batch(batch) if batch.is_empty())
    }

    /// Get a debug name for this operation
    pub fn name(&self) -> &'static str {
        dispatch!(self, op => op.name())
    }

    pub fn apply_to_content(
        &self,
        content: &FlowContent,
        theme: Option<&FlowTheme>,
    ) -> FlowResult<FlowContent> {
        dispatch!(self, op => op.apply_to_content(content, theme))
    }

    pub fn invert(&self, before: &FlowContent) -> FlowResult<Option<Operation>> {
        dispatch!(self, op => op.invert(before))
    }

    pub fn merge_next(&self, next: &Operation) -> Option<Operation> {
        if next.is_noop() {
            return Some(self.clone());
        }
        if self.is_noop() {
            return Some(next.clone());
        }
        dispatch!(self, op => op.merge_next(next))
    }

    pub fn after_insertion(&self, inserted: FlowRange) -> Option<Operation> {
        if inserted.is_collapsed() {
            return Some(self.clone());
        }
        dispatch!(self, op => op.after_insertion(inserted))
    }

    pub fn after_insertion_behind(&self, inserted: FlowRange) -> Option<Operation> {
        if inserted.is_collapsed() {
            return Some(self.clone());
        }
        dispatch!(self, op => op.after_insertion_behind(inserted))
    }

    pub fn after_removal(&self, removed: FlowRange) -> Option<Operation> {
        if removed.is_collapsed() {
            return Some(self.clone());
        }
        dispatch!(self, op => op.after_removal(removed))
    }

    pub fn after_table_edit(&self, edit: &TableEdit) -> Option<Operation> {
        if edit.edit.range.is_collapsed() {
            return Some(self.clone());
        }
        dispatch!(self, op => op.after_table_edit(edit))
    }

    pub(crate) fn after_flow_edit(&self, edit: &FlowEdit) -> Option<Operation> {
        match edit.kind {
            EditKind::Insert if edit.wins_ties => self.after_insertion(edit.range),
            EditKind::Insert => self.after_insertion_behind(edit.range),
            EditKind::Remove => self.after_removal(edit.range),
        }
    }

    pub fn apply_to_selection(&self, selection: &FlowSelection, mine: bool) -> Option<FlowSelection> {
        dispatch!(self, op => op.apply_to_selection(selection, mine))
    }

    /// The row or column edit this operation performs, if any
    pub fn table_edit(&self) -> Option<TableEdit> {
        match self {
            Operation::InsertTableRow(op) => Some(op.table_edit()),
            Operation::RemoveTableRow(op) => Some(op.table_edit()),
            Operation::InsertTableColumn(op) => Some(op.table_edit()),
            Operation::RemoveTableColumn(op) => Some(op.table_edit()),
            _ => None,
        }
    }

    /// Rewrite `other`, conceived concurrently with `self`, to apply after
    /// `self`.
    ///
    /// Concurrent insertions at the same point are ordered with `self`
    /// first.
    pub fn transform(&self, other: &Operation) -> Option<Operation> {
        self.transform_with_priority(other, false)
    }

    /// Like [`Operation::transform`], with `other_first` deciding which of
    /// two insertions at the same point ends up in front.
    ///
    /// Both sides of a concurrent pair converge when they agree on the
    /// winner: `a.transform_with_priority(&b, p)` and
    /// `b.transform_with_priority(&a, !p)` lead to the same content.
    pub fn transform_with_priority(
        &self,
        other: &Operation,
        other_first: bool,
    ) -> Option<Operation> {
        match self {
            Operation::Insert(op) => {
                let edit = FlowEdit::insertion(op.inserted_range()).with_wins_ties(!other_first);
                other.after_flow_edit(&edit)
            }
            Operation::Remove(op) => other.after_removal(op.range),
            Operation::Reset(_) => None,
            Operation::EditBox(op) => op.transform(other, other_first),
            Operation::EditTableCell(op) => op.transform(other, other_first),
            Operation::Batch(batch) => batch.ops.iter().try_fold(other.clone(), |other, op| {
                op.transform_with_priority(&other, other_first)
            }),
            op => match op.table_edit() {
                Some(mut edit) => {
                    edit.edit.wins_ties = !other_first;
                    other.after_table_edit(&edit)
                }
                None => Some(other.clone()),
            },
        }
    }
}
