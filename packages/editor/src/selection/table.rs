use serde::{Deserialize, Serialize};

use crate::cell::CellRange;
use crate::operation::{
    BatchOperation, FormatTable, FormatTableColumn, InsertTableColumn, InsertTableRow,
    MergeTableCell, Operation, RemoveTableColumn, RemoveTableRow, SplitTableCell,
};
use crate::range::FlowRange;
use crate::selection::{FlowSelection, SelectionOps};
use crate::style::{TableColumnStyle, TableStyle};
use crate::transform::{node_after_insertion, node_after_removal, TableEdit};

/// Block of cells in the table node at `position`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableSelection {
    pub position: usize,
    pub range: CellRange,
}

impl TableSelection {
    pub fn new(position: usize, range: CellRange) -> Self {
        Self { position, range }
    }

    fn at(&self, position: usize) -> FlowSelection {
        TableSelection::new(position, self.range).into()
    }
}

impl SelectionOps for TableSelection {
    fn after_insertion(&self, inserted: FlowRange, _mine: bool) -> Option<FlowSelection> {
        node_after_insertion(self.position, inserted).map(|p| self.at(p))
    }

    fn after_removal(&self, removed: FlowRange, _mine: bool) -> Option<FlowSelection> {
        node_after_removal(self.position, removed).map(|p| self.at(p))
    }

    fn after_table_edit(&self, edit: &TableEdit) -> Option<FlowSelection> {
        if edit.position != self.position {
            return Some(self.clone().into());
        }
        edit.cell_range(self.range)
            .map(|range| TableSelection::new(self.position, range).into())
    }

    fn insert_rows(&self, below: bool) -> Option<Operation> {
        let index = if below {
            self.range.last().row + 1
        } else {
            self.range.first().row
        };
        Some(InsertTableRow::new(self.position, index, self.range.row_count()).into())
    }

    fn insert_columns(&self, after: bool) -> Option<Operation> {
        let index = if after {
            self.range.last().column + 1
        } else {
            self.range.first().column
        };
        Some(InsertTableColumn::new(self.position, index, self.range.column_count()).into())
    }

    fn remove_rows(&self) -> Option<Operation> {
        let first = self.range.first().row;
        Some(RemoveTableRow::new(self.position, first, self.range.row_count()).into())
    }

    fn remove_columns(&self) -> Option<Operation> {
        let first = self.range.first().column;
        Some(RemoveTableColumn::new(self.position, first, self.range.column_count()).into())
    }

    fn merge_cells(&self) -> Option<Operation> {
        if self.range.is_single_cell() {
            return None;
        }
        Some(MergeTableCell::new(self.position, self.range).into())
    }

    fn split_cell(&self) -> Option<Operation> {
        Some(SplitTableCell::new(self.position, self.range.first()).into())
    }

    fn format_table(&self, style: &TableStyle) -> Option<Operation> {
        Some(FormatTable::new(self.position, style.clone()).into())
    }

    fn format_column(&self, style: &TableColumnStyle) -> Option<Operation> {
        let columns = self.range.column_range();
        let ops = (columns.first()..columns.last())
            .map(|column| FormatTableColumn::new(self.position, column, style.clone()).into())
            .collect();
        BatchOperation::from_vec(ops)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::{FlowContent, FlowNode, TableContent};
    use crate::transform::{EditKind, TableAxis};

    fn selection(range: &str) -> TableSelection {
        TableSelection::new(1, CellRange::parse(range).unwrap())
    }

    fn table(rows: usize, columns: usize) -> FlowContent {
        FlowContent::from_nodes(vec![
            FlowNode::text("x"),
            FlowNode::Table {
                content: TableContent::new(rows, columns),
                style: TableStyle::new(),
            },
        ])
    }

    #[test]
    fn test_row_commands_follow_the_selection() {
        let selected = selection("B2:C3");
        assert_eq!(
            selected.insert_rows(true),
            Some(InsertTableRow::new(1, 3, 2).into())
        );
        assert_eq!(
            selected.insert_rows(false),
            Some(InsertTableRow::new(1, 1, 2).into())
        );
        assert_eq!(
            selected.insert_columns(true),
            Some(InsertTableColumn::new(1, 3, 2).into())
        );
        assert_eq!(
            selected.remove_columns(),
            Some(RemoveTableColumn::new(1, 1, 2).into())
        );

        let content = table(4, 4);
        let after = selected.remove_rows().unwrap().apply_to_content(&content, None).unwrap();
        assert_eq!(after.table_at(1).unwrap().0.row_count(), 2);
    }

    #[test]
    fn test_single_cell_does_not_merge() {
        assert_eq!(selection("B2").merge_cells(), None);
        assert_eq!(
            selection("C3:A1").merge_cells(),
            Some(MergeTableCell::new(1, CellRange::parse("C3:A1").unwrap()).into())
        );
    }

    #[test]
    fn test_format_column_covers_every_selected_column() {
        let style = TableColumnStyle::new().with("width", 120);
        let op = selection("A1:C1").format_column(&style).unwrap();
        let after = op.apply_to_content(&table(1, 4), None).unwrap();
        let (content, _) = after.table_at(1).unwrap();
        for column in 0..3 {
            assert_eq!(content.column_style(column).unwrap(), &style);
        }
        assert!(content.column_style(3).unwrap().is_empty());
    }

    #[test]
    fn test_selection_follows_row_edits() {
        let selected = selection("A2:B3");
        let inserted = TableEdit::new(1, TableAxis::Rows, EditKind::Insert, 0, 2);
        assert_eq!(
            selected.after_table_edit(&inserted),
            Some(selection("A4:B5").into())
        );

        let removed = TableEdit::new(1, TableAxis::Rows, EditKind::Remove, 1, 2);
        assert_eq!(selected.after_table_edit(&removed), None);

        let elsewhere = TableEdit::new(7, TableAxis::Rows, EditKind::Remove, 1, 2);
        assert_eq!(selected.after_table_edit(&elsewhere), Some(selected.clone().into()));
    }

    #[test]
    fn test_table_moves_with_outer_edits() {
        let selected = selection("A1");
        assert_eq!(
            selected.after_insertion(FlowRange::new(0, 2), false),
            Some(TableSelection::new(3, CellRange::parse("A1").unwrap()).into())
        );
        assert_eq!(selected.after_removal(FlowRange::new(1, 2), true), None);
    }
}
