//! Selections inside a box or a table cell.
//!
//! Commands run against the inner selection and come back wrapped in the
//! matching nested operation. Outer edits only ever move the anchor.

use serde::{Deserialize, Serialize};

use crate::cell::{CellPosition, CellRange};
use crate::content::FlowContent;
use crate::errors::FlowResult;
use crate::operation::Operation;
use crate::range::FlowRange;
use crate::selection::{FlowSelection, SelectionOps, TableSelection};
use crate::style::{BoxStyle, ParagraphStyle, TableColumnStyle, TableStyle, TextStyle};
use crate::transform::{node_after_insertion, node_after_removal, TableEdit};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoxSelection {
    pub position: usize,
    pub inner: Box<FlowSelection>,
}

impl BoxSelection {
    pub fn new(position: usize, inner: FlowSelection) -> Self {
        Self {
            position,
            inner: Box::new(inner),
        }
    }

    fn at(&self, position: usize) -> FlowSelection {
        BoxSelection {
            position,
            inner: self.inner.clone(),
        }
        .into()
    }

    fn wrap(&self, inner: Option<Operation>) -> Option<Operation> {
        inner.map(|op| Operation::edit_box(self.position, op))
    }
}

impl SelectionOps for BoxSelection {
    fn after_insertion(&self, inserted: FlowRange, _mine: bool) -> Option<FlowSelection> {
        node_after_insertion(self.position, inserted).map(|p| self.at(p))
    }

    fn after_removal(&self, removed: FlowRange, _mine: bool) -> Option<FlowSelection> {
        node_after_removal(self.position, removed).map(|p| self.at(p))
    }

    fn insert(&self, content: &FlowContent) -> Option<Operation> {
        self.wrap(self.inner.insert(content))
    }

    fn remove(&self) -> Option<Operation> {
        self.wrap(self.inner.remove())
    }

    fn format_text(&self, style: &TextStyle) -> Option<Operation> {
        self.wrap(self.inner.format_text(style))
    }

    fn unformat_text(&self, style: &TextStyle) -> Option<Operation> {
        self.wrap(self.inner.unformat_text(style))
    }

    fn format_paragraph(&self, style: &ParagraphStyle) -> Option<Operation> {
        self.wrap(self.inner.format_paragraph(style))
    }

    fn unformat_paragraph(&self, style: &ParagraphStyle) -> Option<Operation> {
        self.wrap(self.inner.unformat_paragraph(style))
    }

    fn increment_list_level(&self, content: &FlowContent, delta: i64) -> FlowResult<Option<Operation>> {
        let (inner, _) = content.box_at(self.position)?;
        Ok(self.wrap(self.inner.increment_list_level(inner, delta)?))
    }

    fn format_box(&self, style: &BoxStyle) -> Option<Operation> {
        self.wrap(self.inner.format_box(style))
    }

    fn insert_rows(&self, below: bool) -> Option<Operation> {
        self.wrap(self.inner.insert_rows(below))
    }

    fn insert_columns(&self, after: bool) -> Option<Operation> {
        self.wrap(self.inner.insert_columns(after))
    }

    fn remove_rows(&self) -> Option<Operation> {
        self.wrap(self.inner.remove_rows())
    }

    fn remove_columns(&self) -> Option<Operation> {
        self.wrap(self.inner.remove_columns())
    }

    fn merge_cells(&self) -> Option<Operation> {
        self.wrap(self.inner.merge_cells())
    }

    fn split_cell(&self) -> Option<Operation> {
        self.wrap(self.inner.split_cell())
    }

    fn format_table(&self, style: &TableStyle) -> Option<Operation> {
        self.wrap(self.inner.format_table(style))
    }

    fn format_column(&self, style: &TableColumnStyle) -> Option<Operation> {
        self.wrap(self.inner.format_column(style))
    }
}

/// Selection inside one cell of the table at `position`.
///
/// Table commands prefer a table selected within the cell. Failing that,
/// they act on the enclosing table as if just this cell were selected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableCellSelection {
    pub position: usize,
    pub cell: CellPosition,
    pub inner: Box<FlowSelection>,
}

impl TableCellSelection {
    pub fn new(position: usize, cell: CellPosition, inner: FlowSelection) -> Self {
        Self {
            position,
            cell,
            inner: Box::new(inner),
        }
    }

    fn moved(&self, position: usize, cell: CellPosition) -> FlowSelection {
        TableCellSelection {
            position,
            cell,
            inner: self.inner.clone(),
        }
        .into()
    }

    fn wrap(&self, inner: Option<Operation>) -> Option<Operation> {
        inner.map(|op| Operation::edit_table_cell(self.position, self.cell, op))
    }

    fn enclosing(&self) -> TableSelection {
        TableSelection::new(self.position, CellRange::single(self.cell))
    }

    fn table_command(
        &self,
        inner: impl Fn(&FlowSelection) -> Option<Operation>,
        outer: impl Fn(&TableSelection) -> Option<Operation>,
    ) -> Option<Operation> {
        self.wrap(inner(self.inner.as_ref()))
            .or_else(|| outer(&self.enclosing()))
    }
}

impl SelectionOps for TableCellSelection {
    fn after_insertion(&self, inserted: FlowRange, _mine: bool) -> Option<FlowSelection> {
        node_after_insertion(self.position, inserted).map(|p| self.moved(p, self.cell))
    }

    fn after_removal(&self, removed: FlowRange, _mine: bool) -> Option<FlowSelection> {
        node_after_removal(self.position, removed).map(|p| self.moved(p, self.cell))
    }

    fn after_table_edit(&self, edit: &TableEdit) -> Option<FlowSelection> {
        if edit.position != self.position {
            return Some(self.clone().into());
        }
        edit.cell(self.cell).map(|cell| self.moved(self.position, cell))
    }

    fn insert(&self, content: &FlowContent) -> Option<Operation> {
        self.wrap(self.inner.insert(content))
    }

    fn remove(&self) -> Option<Operation> {
        self.wrap(self.inner.remove())
    }

    fn format_text(&self, style: &TextStyle) -> Option<Operation> {
        self.wrap(self.inner.format_text(style))
    }

    fn unformat_text(&self, style: &TextStyle) -> Option<Operation> {
        self.wrap(self.inner.unformat_text(style))
    }

    fn format_paragraph(&self, style: &ParagraphStyle) -> Option<Operation> {
        self.wrap(self.inner.format_paragraph(style))
    }

    fn unformat_paragraph(&self, style: &ParagraphStyle) -> Option<Operation> {
        self.wrap(self.inner.unformat_paragraph(style))
    }

    fn increment_list_level(&self, content: &FlowContent, delta: i64) -> FlowResult<Option<Operation>> {
        let (table, _) = content.table_at(self.position)?;
        let cell = table.cell(self.cell)?;
        Ok(self.wrap(self.inner.increment_list_level(&cell.content, delta)?))
    }

    fn format_box(&self, style: &BoxStyle) -> Option<Operation> {
        self.wrap(self.inner.format_box(style))
    }

    fn insert_rows(&self, below: bool) -> Option<Operation> {
        self.table_command(|s| s.insert_rows(below), |t| t.insert_rows(below))
    }

    fn insert_columns(&self, after: bool) -> Option<Operation> {
        self.table_command(|s| s.insert_columns(after), |t| t.insert_columns(after))
    }

    fn remove_rows(&self) -> Option<Operation> {
        self.table_command(FlowSelection::remove_rows, TableSelection::remove_rows)
    }

    fn remove_columns(&self) -> Option<Operation> {
        self.table_command(FlowSelection::remove_columns, TableSelection::remove_columns)
    }

    fn merge_cells(&self) -> Option<Operation> {
        self.wrap(self.inner.merge_cells())
    }

    fn split_cell(&self) -> Option<Operation> {
        self.table_command(FlowSelection::split_cell, TableSelection::split_cell)
    }

    fn format_table(&self, style: &TableStyle) -> Option<Operation> {
        self.table_command(|s| s.format_table(style), |t| t.format_table(style))
    }

    fn format_column(&self, style: &TableColumnStyle) -> Option<Operation> {
        self.table_command(|s| s.format_column(style), |t| t.format_column(style))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::{FlowNode, TableContent};
    use crate::operation::{EditTableCell, InsertTableRow, RemoveTableRow, SplitTableCell};
    use crate::transform::{EditKind, TableAxis};

    fn document() -> FlowContent {
        let table = TableContent::new(2, 2)
            .with_cell_content(CellPosition::new(1, 0), FlowContent::from_text("one\ntwo\n"))
            .unwrap();
        FlowContent::from_nodes(vec![
            FlowNode::Box {
                content: FlowContent::from_text("boxed"),
                style: BoxStyle::new(),
            },
            FlowNode::Table {
                content: table,
                style: TableStyle::new(),
            },
        ])
    }

    #[test]
    fn test_box_commands_are_wrapped() {
        let selection = BoxSelection::new(0, FlowSelection::range(FlowRange::new(0, 3)));
        let op = selection.remove().unwrap();
        let after = op.apply_to_content(&document(), None).unwrap();
        assert_eq!(after.box_at(0).unwrap().0.plain_text(), "ed");

        assert_eq!(
            BoxSelection::new(0, FlowSelection::caret(1)).remove(),
            None
        );
    }

    #[test]
    fn test_cell_list_levels_read_the_cell() {
        let cell = CellPosition::new(1, 0);
        let selection = TableCellSelection::new(1, cell, FlowSelection::caret(0));
        let op = selection
            .increment_list_level(&document(), 1)
            .unwrap()
            .unwrap();
        let after = op.apply_to_content(&document(), None).unwrap();
        let (table, _) = after.table_at(1).unwrap();
        let styles = table.cell(cell).unwrap().content.paragraph_styles(FlowRange::collapsed(0)).unwrap();
        assert_eq!(styles[0].1.list_level(), 1);
    }

    #[test]
    fn test_cell_falls_back_to_enclosing_table() {
        let cell = CellPosition::new(1, 0);
        let selection = TableCellSelection::new(1, cell, FlowSelection::caret(0));
        assert_eq!(
            selection.insert_rows(true),
            Some(InsertTableRow::new(1, 2, 1).into())
        );
        assert_eq!(
            selection.split_cell(),
            Some(SplitTableCell::new(1, cell).into())
        );
        assert_eq!(selection.merge_cells(), None);
    }

    #[test]
    fn test_nested_table_commands_stay_nested() {
        let cell = CellPosition::new(0, 0);
        let nested = TableSelection::new(4, CellRange::parse("A1:A2").unwrap());
        let selection = TableCellSelection::new(1, cell, nested.into());
        assert_eq!(
            selection.remove_rows(),
            Some(EditTableCell::new(1, cell, RemoveTableRow::new(4, 0, 2).into()).into())
        );
    }

    #[test]
    fn test_cell_follows_table_edits() {
        let selection = TableCellSelection::new(1, CellPosition::new(1, 1), FlowSelection::caret(0));
        let edit = TableEdit::new(1, TableAxis::Columns, EditKind::Insert, 0, 1);
        assert_eq!(
            selection.after_table_edit(&edit),
            Some(TableCellSelection::new(1, CellPosition::new(1, 2), FlowSelection::caret(0)).into())
        );
        let removed = TableEdit::new(1, TableAxis::Rows, EditKind::Remove, 1, 1);
        assert_eq!(selection.after_table_edit(&removed), None);
    }
}
