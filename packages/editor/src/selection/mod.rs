//! # Selections
//!
//! A [`FlowSelection`] describes what a user has selected. Its shape mirrors
//! the nesting of operations: a range of flow, a block of table cells, or a
//! selection inside a box or table cell.
//!
//! Selections never mutate content. Every edit command produces an
//! [`Operation`], which is the single channel by which edits reach content,
//! other selections and the sync log. Commands that make no sense for a
//! selection return `None`.

mod nested;
mod range;
mod table;

pub use nested::{BoxSelection, TableCellSelection};
pub use range::RangeSelection;
pub use table::TableSelection;

use serde::{Deserialize, Serialize};

use crate::content::FlowContent;
use crate::errors::FlowResult;
use crate::operation::Operation;
use crate::range::FlowRange;
use crate::style::{BoxStyle, ParagraphStyle, TableColumnStyle, TableStyle, TextStyle};
use crate::transform::TableEdit;

/// Edit commands and transforms shared by every selection kind
pub trait SelectionOps: Clone + Into<FlowSelection> {
    /// Carry the selection past an insertion.
    ///
    /// A collapsed caret sitting exactly at the insertion point moves past
    /// the inserted content only when `mine` is set.
    fn after_insertion(&self, inserted: FlowRange, mine: bool) -> Option<FlowSelection>;

    /// Carry the selection past a removal; `None` once its anchor is gone
    fn after_removal(&self, removed: FlowRange, mine: bool) -> Option<FlowSelection>;

    fn after_table_edit(&self, _edit: &TableEdit) -> Option<FlowSelection> {
        Some(self.clone().into())
    }

    fn insert(&self, _content: &FlowContent) -> Option<Operation> {
        None
    }

    fn remove(&self) -> Option<Operation> {
        None
    }

    fn format_text(&self, _style: &TextStyle) -> Option<Operation> {
        None
    }

    fn unformat_text(&self, _style: &TextStyle) -> Option<Operation> {
        None
    }

    fn format_paragraph(&self, _style: &ParagraphStyle) -> Option<Operation> {
        None
    }

    fn unformat_paragraph(&self, _style: &ParagraphStyle) -> Option<Operation> {
        None
    }

    /// Indent (positive `delta`) or outdent every touched paragraph
    fn increment_list_level(&self, _content: &FlowContent, _delta: i64) -> FlowResult<Option<Operation>> {
        Ok(None)
    }

    fn format_box(&self, _style: &BoxStyle) -> Option<Operation> {
        None
    }

    /// Insert as many rows as are selected, above or below the selection
    fn insert_rows(&self, _below: bool) -> Option<Operation> {
        None
    }

    /// Insert as many columns as are selected, before or after the selection
    fn insert_columns(&self, _after: bool) -> Option<Operation> {
        None
    }

    fn remove_rows(&self) -> Option<Operation> {
        None
    }

    fn remove_columns(&self) -> Option<Operation> {
        None
    }

    fn merge_cells(&self) -> Option<Operation> {
        None
    }

    fn split_cell(&self) -> Option<Operation> {
        None
    }

    fn format_table(&self, _style: &TableStyle) -> Option<Operation> {
        None
    }

    fn format_column(&self, _style: &TableColumnStyle) -> Option<Operation> {
        None
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "selection", rename_all = "snake_case")]
pub enum FlowSelection {
    Range(RangeSelection),
    Table(TableSelection),
    Box(BoxSelection),
    TableCell(TableCellSelection),
}

impl From<RangeSelection> for FlowSelection {
    fn from(selection: RangeSelection) -> Self {
        FlowSelection::Range(selection)
    }
}

impl From<TableSelection> for FlowSelection {
    fn from(selection: TableSelection) -> Self {
        FlowSelection::Table(selection)
    }
}

impl From<BoxSelection> for FlowSelection {
    fn from(selection: BoxSelection) -> Self {
        FlowSelection::Box(selection)
    }
}

impl From<TableCellSelection> for FlowSelection {
    fn from(selection: TableCellSelection) -> Self {
        FlowSelection::TableCell(selection)
    }
}

macro_rules! select {
    ($self:expr, $sel:ident => $body:expr) => {
        match $self {
            FlowSelection::Range($sel) => $body,
            FlowSelection::Table($sel) => $body,
            FlowSelection::Box($sel) => $body,
            FlowSelection::TableCell($sel) => $body,
        }
    };
}

impl FlowSelection {
    /// Selection of `range` in the top-level flow
    pub fn range(range: FlowRange) -> Self {
        RangeSelection::new(range).into()
    }

    /// Collapsed caret at `position`
    pub fn caret(position: usize) -> Self {
        Self::range(FlowRange::collapsed(position))
    }

    pub fn after_insertion(&self, inserted: FlowRange, mine: bool) -> Option<FlowSelection> {
        if inserted.is_collapsed() {
            return Some(self.clone());
        }
        select!(self, sel => sel.after_insertion(inserted, mine))
    }

    pub fn after_removal(&self, removed: FlowRange, mine: bool) -> Option<FlowSelection> {
        if removed.is_collapsed() {
            return Some(self.clone());
        }
        select!(self, sel => sel.after_removal(removed, mine))
    }

    pub fn after_table_edit(&self, edit: &TableEdit) -> Option<FlowSelection> {
        if edit.edit.range.is_collapsed() {
            return Some(self.clone());
        }
        select!(self, sel => sel.after_table_edit(edit))
    }

    pub fn insert(&self, content: &FlowContent) -> Option<Operation> {
        select!(self, sel => sel.insert(content))
    }

    pub fn remove(&self) -> Option<Operation> {
        select!(self, sel => sel.remove())
    }

    pub fn format_text(&self, style: &TextStyle) -> Option<Operation> {
        select!(self, sel => sel.format_text(style))
    }

    pub fn unformat_text(&self, style: &TextStyle) -> Option<Operation> {
        select!(self, sel => sel.unformat_text(style))
    }

    pub fn format_paragraph(&self, style: &ParagraphStyle) -> Option<Operation> {
        select!(self, sel => sel.format_paragraph(style))
    }

    pub fn unformat_paragraph(&self, style: &ParagraphStyle) -> Option<Operation> {
        select!(self, sel => sel.unformat_paragraph(style))
    }

    pub fn increment_list_level(&self, content: &FlowContent, delta: i64) -> FlowResult<Option<Operation>> {
        select!(self, sel => sel.increment_list_level(content, delta))
    }

    pub fn format_box(&self, style: &BoxStyle) -> Option<Operation> {
        select!(self, sel => sel.format_box(style))
    }

    pub fn insert_rows(&self, below: bool) -> Option<Operation> {
        select!(self, sel => sel.insert_rows(below))
    }

    pub fn insert_columns(&self, after: bool) -> Option<Operation> {
        select!(self, sel => sel.insert_columns(after))
    }

    pub fn remove_rows(&self) -> Option<Operation> {
        select!(self, sel => sel.remove_rows())
    }

    pub fn remove_columns(&self) -> Option<Operation> {
        select!(self, sel => sel.remove_columns())
    }

    pub fn merge_cells(&self) -> Option<Operation> {
        select!(self, sel => sel.merge_cells())
    }

    pub fn split_cell(&self) -> Option<Operation> {
        select!(self, sel => sel.split_cell())
    }

    pub fn format_table(&self, style: &TableStyle) -> Option<Operation> {
        select!(self, sel => sel.format_table(style))
    }

    pub fn format_column(&self, style: &TableColumnStyle) -> Option<Operation> {
        select!(self, sel => sel.format_column(style))
    }
}
