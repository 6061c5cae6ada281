//! Structural and formatting operations on the table at a flow position.
//!
//! Row and column edits project onto the same interval arithmetic as flow
//! edits: inserting rows behaves like inserting content at a point, removing
//! rows like removing a range.

use serde::{Deserialize, Serialize};

use crate::cell::{CellPosition, CellRange};
use crate::content::{FlowContent, FlowNode, TableContent};
use crate::errors::FlowResult;
use crate::operation::{BatchOperation, EditTableCell, FlowOp, Operation, ResetContent};
use crate::range::FlowRange;
use crate::selection::FlowSelection;
use crate::style::{FlowTheme, TableColumnStyle, TableStyle};
use crate::transform::{node_after_insertion, node_after_removal, EditKind, TableAxis, TableEdit};

/// Replace the table at `position` with `f` applied to it
fn edit_table(
    content: &FlowContent,
    position: usize,
    f: impl FnOnce(&TableContent, &TableStyle) -> FlowResult<(TableContent, TableStyle)>,
) -> FlowResult<FlowContent> {
    let (table, style) = content.table_at(position)?;
    let (table, style) = f(table, style)?;
    content.replace_node(
        position,
        FlowNode::Table {
            content: table,
            style,
        },
    )
}

macro_rules! table_lines_op {
    ($name:ident, $op_name:literal, $axis:expr, $kind:expr) => {
        #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
        pub struct $name {
            pub position: usize,
            pub index: usize,
            pub count: usize,
        }

        impl $name {
            pub fn new(position: usize, index: usize, count: usize) -> Self {
                Self {
                    position,
                    index,
                    count,
                }
            }

            pub fn table_edit(&self) -> TableEdit {
                TableEdit::new(self.position, $axis, $kind, self.index, self.count)
            }

            fn at(&self, position: usize) -> Operation {
                Self { position, ..*self }.into()
            }
        }

        impl $name {
            fn after_same_table_edit(&self, edit: &TableEdit) -> Option<Operation> {
                if edit.position != self.position || edit.axis != $axis {
                    return Some(self.clone().into());
                }
                match $kind {
                    EditKind::Insert => {
                        let index = edit.edit.point(self.index)?;
                        Some(Self::new(self.position, index, self.count).into())
                    }
                    EditKind::Remove => {
                        let span = edit.edit.span(FlowRange::at(self.index, self.count))?;
                        Some(Self::new(self.position, span.first(), span.size()).into())
                    }
                }
            }
        }
    };
}

table_lines_op!(InsertTableRow, "insert_table_row", TableAxis::Rows, EditKind::Insert);
table_lines_op!(RemoveTableRow, "remove_table_row", TableAxis::Rows, EditKind::Remove);
table_lines_op!(InsertTableColumn, "insert_table_column", TableAxis::Columns, EditKind::Insert);
table_lines_op!(RemoveTableColumn, "remove_table_column", TableAxis::Columns, EditKind::Remove);

macro_rules! impl_table_lines_op {
    ($name:ident, $op_name:literal, apply: $apply:ident, invert: |$op:ident, $table:ident| $invert:expr) => {
        impl FlowOp for $name {
            fn name(&self) -> &'static str {
                $op_name
            }

            fn apply_to_content(
                &self,
                content: &FlowContent,
                _theme: Option<&FlowTheme>,
            ) -> FlowResult<FlowContent> {
                edit_table(content, self.position, |table, style| {
                    Ok((table.$apply(self.index, self.count)?, style.clone()))
                })
            }

            fn invert(&self, before: &FlowContent) -> FlowResult<Option<Operation>> {
                let ($table, _) = before.table_at(self.position)?;
                let $op = self;
                Ok(Some($invert))
            }

            fn after_insertion(&self, inserted: FlowRange) -> Option<Operation> {
                node_after_insertion(self.position, inserted).map(|p| self.at(p))
            }

            fn after_removal(&self, removed: FlowRange) -> Option<Operation> {
                node_after_removal(self.position, removed).map(|p| self.at(p))
            }

            fn after_table_edit(&self, edit: &TableEdit) -> Option<Operation> {
                self.after_same_table_edit(edit)
            }

            fn apply_to_selection(
                &self,
                selection: &FlowSelection,
                _mine: bool,
            ) -> Option<FlowSelection> {
                selection.after_table_edit(&self.table_edit())
            }
        }
    };
}

impl_table_lines_op!(InsertTableRow, "insert_table_row", apply: insert_rows,
    invert: |op, _table| RemoveTableRow::new(op.position, op.index, op.count).into());
impl_table_lines_op!(InsertTableColumn, "insert_table_column", apply: insert_columns,
    invert: |op, _table| RemoveTableColumn::new(op.position, op.index, op.count).into());
impl_table_lines_op!(RemoveTableRow, "remove_table_row", apply: remove_rows,
    invert: |op, table| restore_lines(
        InsertTableRow::new(op.position, op.index, op.count).into(),
        op.position,
        table,
        TableAxis::Rows,
        FlowRange::at(op.index, op.count),
    ));
impl_table_lines_op!(RemoveTableColumn, "remove_table_column", apply: remove_columns,
    invert: |op, table| restore_lines(
        InsertTableColumn::new(op.position, op.index, op.count).into(),
        op.position,
        table,
        TableAxis::Columns,
        FlowRange::at(op.index, op.count),
    ));

/// Undo of a row or column removal: reinsert blank lines, then restore the
/// cell content, merges and column styles they held
fn restore_lines(
    reinsert: Operation,
    position: usize,
    table: &TableContent,
    axis: TableAxis,
    removed: FlowRange,
) -> Operation {
    let on_axis = |cell: CellPosition| match axis {
        TableAxis::Rows => cell.row,
        TableAxis::Columns => cell.column,
    };

    let mut ops = vec![reinsert];
    for (r, row) in table.rows().iter().enumerate() {
        for (c, cell) in row.iter().enumerate() {
            let at = CellPosition::new(r, c);
            if removed.contains(on_axis(at)) && !cell.content.is_empty() {
                ops.push(
                    EditTableCell::new(position, at, ResetContent::new(cell.content.clone()).into())
                        .into(),
                );
            }
        }
    }
    for region in table.merged_regions() {
        let span = match axis {
            TableAxis::Rows => region.row_range(),
            TableAxis::Columns => region.column_range(),
        };
        if !span.intersect(&removed).is_collapsed() {
            ops.push(MergeTableCell::new(position, region).into());
        }
    }
    if axis == TableAxis::Columns {
        for column in removed.first()..removed.last() {
            if let Ok(style) = table.column_style(column) {
                if !style.is_empty() {
                    ops.push(FormatTableColumn::new(position, column, style.clone()).into());
                }
            }
        }
    }
    BatchOperation::from_vec(ops).unwrap_or_else(Operation::noop)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormatTable {
    pub position: usize,
    pub style: TableStyle,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnformatTable {
    pub position: usize,
    pub style: TableStyle,
}

impl FormatTable {
    pub fn new(position: usize, style: TableStyle) -> Self {
        Self { position, style }
    }
}

impl UnformatTable {
    pub fn new(position: usize, style: TableStyle) -> Self {
        Self { position, style }
    }
}

impl FlowOp for FormatTable {
    fn name(&self) -> &'static str {
        "format_table"
    }

    fn apply_to_content(
        &self,
        content: &FlowContent,
        _theme: Option<&FlowTheme>,
    ) -> FlowResult<FlowContent> {
        edit_table(content, self.position, |table, style| {
            Ok((table.clone(), style.merge(&self.style)))
        })
    }

    fn invert(&self, before: &FlowContent) -> FlowResult<Option<Operation>> {
        let (_, prior) = before.table_at(self.position)?;
        let (remove, restore) = TableStyle::restore_parts(prior, &self.style);
        let mut ops = Vec::new();
        if !remove.is_empty() {
            ops.push(UnformatTable::new(self.position, remove).into());
        }
        if !restore.is_empty() {
            ops.push(FormatTable::new(self.position, restore).into());
        }
        Ok(Some(BatchOperation::from_vec(ops).unwrap_or_else(Operation::noop)))
    }

    fn merge_next(&self, next: &Operation) -> Option<Operation> {
        match next {
            Operation::FormatTable(next) if next.position == self.position => {
                Some(FormatTable::new(self.position, self.style.merge(&next.style)).into())
            }
            _ => None,
        }
    }

    fn after_insertion(&self, inserted: FlowRange) -> Option<Operation> {
        let position = node_after_insertion(self.position, inserted)?;
        Some(FormatTable::new(position, self.style.clone()).into())
    }

    fn after_removal(&self, removed: FlowRange) -> Option<Operation> {
        let position = node_after_removal(self.position, removed)?;
        Some(FormatTable::new(position, self.style.clone()).into())
    }
}

impl FlowOp for UnformatTable {
    fn name(&self) -> &'static str {
        "unformat_table"
    }

    fn apply_to_content(
        &self,
        content: &FlowContent,
        _theme: Option<&FlowTheme>,
    ) -> FlowResult<FlowContent> {
        edit_table(content, self.position, |table, style| {
            Ok((table.clone(), style.unmerge(&self.style)))
        })
    }

    fn invert(&self, before: &FlowContent) -> FlowResult<Option<Operation>> {
        let (_, prior) = before.table_at(self.position)?;
        let restore = prior.pick(&self.style);
        if restore.is_empty() {
            return Ok(Some(Operation::noop()));
        }
        Ok(Some(FormatTable::new(self.position, restore).into()))
    }

    fn after_insertion(&self, inserted: FlowRange) -> Option<Operation> {
        let position = node_after_insertion(self.position, inserted)?;
        Some(UnformatTable::new(position, self.style.clone()).into())
    }

    fn after_removal(&self, removed: FlowRange) -> Option<Operation> {
        let position = node_after_removal(self.position, removed)?;
        Some(UnformatTable::new(position, self.style.clone()).into())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormatTableColumn {
    pub position: usize,
    pub column: usize,
    pub style: TableColumnStyle,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnformatTableColumn {
    pub position: usize,
    pub column: usize,
    pub style: TableColumnStyle,
}

impl FormatTableColumn {
    pub fn new(position: usize, column: usize, style: TableColumnStyle) -> Self {
        Self {
            position,
            column,
            style,
        }
    }
}

impl UnformatTableColumn {
    pub fn new(position: usize, column: usize, style: TableColumnStyle) -> Self {
        Self {
            position,
            column,
            style,
        }
    }
}

/// Column index after a concurrent edit of the same table's columns
fn column_after_table_edit(position: usize, column: usize, edit: &TableEdit) -> Option<usize> {
    if edit.position != position || edit.axis != TableAxis::Columns {
        return Some(column);
    }
    edit.edit.node(column)
}

impl FlowOp for FormatTableColumn {
    fn name(&self) -> &'static str {
        "format_table_column"
    }

    fn apply_to_content(
        &self,
        content: &FlowContent,
        _theme: Option<&FlowTheme>,
    ) -> FlowResult<FlowContent> {
        edit_table(content, self.position, |table, style| {
            let merged = table.column_style(self.column)?.merge(&self.style);
            Ok((table.with_column_style(self.column, merged)?, style.clone()))
        })
    }

    fn invert(&self, before: &FlowContent) -> FlowResult<Option<Operation>> {
        let (table, _) = before.table_at(self.position)?;
        let prior = table.column_style(self.column)?;
        let (remove, restore) = TableColumnStyle::restore_parts(prior, &self.style);
        let mut ops = Vec::new();
        if !remove.is_empty() {
            ops.push(UnformatTableColumn::new(self.position, self.column, remove).into());
        }
        if !restore.is_empty() {
            ops.push(FormatTableColumn::new(self.position, self.column, restore).into());
        }
        Ok(Some(BatchOperation::from_vec(ops).unwrap_or_else(Operation::noop)))
    }

    fn merge_next(&self, next: &Operation) -> Option<Operation> {
        match next {
            Operation::FormatTableColumn(next)
                if next.position == self.position && next.column == self.column =>
            {
                let style = self.style.merge(&next.style);
                Some(FormatTableColumn::new(self.position, self.column, style).into())
            }
            _ => None,
        }
    }

    fn after_insertion(&self, inserted: FlowRange) -> Option<Operation> {
        let position = node_after_insertion(self.position, inserted)?;
        Some(FormatTableColumn::new(position, self.column, self.style.clone()).into())
    }

    fn after_removal(&self, removed: FlowRange) -> Option<Operation> {
        let position = node_after_removal(self.position, removed)?;
        Some(FormatTableColumn::new(position, self.column, self.style.clone()).into())
    }

    fn after_table_edit(&self, edit: &TableEdit) -> Option<Operation> {
        let column = column_after_table_edit(self.position, self.column, edit)?;
        Some(FormatTableColumn::new(self.position, column, self.style.clone()).into())
    }
}

impl FlowOp for UnformatTableColumn {
    fn name(&self) -> &'static str {
        "unformat_table_column"
    }

    fn apply_to_content(
        &self,
        content: &FlowContent,
        _theme: Option<&FlowTheme>,
    ) -> FlowResult<FlowContent> {
        edit_table(content, self.position, |table, style| {
            let unmerged = table.column_style(self.column)?.unmerge(&self.style);
            Ok((table.with_column_style(self.column, unmerged)?, style.clone()))
        })
    }

    fn invert(&self, before: &FlowContent) -> FlowResult<Option<Operation>> {
        let (table, _) = before.table_at(self.position)?;
        let restore = table.column_style(self.column)?.pick(&self.style);
        if restore.is_empty() {
            return Ok(Some(Operation::noop()));
        }
        Ok(Some(FormatTableColumn::new(self.position, self.column, restore).into()))
    }

    fn after_insertion(&self, inserted: FlowRange) -> Option<Operation> {
        let position = node_after_insertion(self.position, inserted)?;
        Some(UnformatTableColumn::new(position, self.column, self.style.clone()).into())
    }

    fn after_removal(&self, removed: FlowRange) -> Option<Operation> {
        let position = node_after_removal(self.position, removed)?;
        Some(UnformatTableColumn::new(position, self.column, self.style.clone()).into())
    }

    fn after_table_edit(&self, edit: &TableEdit) -> Option<Operation> {
        let column = column_after_table_edit(self.position, self.column, edit)?;
        Some(UnformatTableColumn::new(self.position, column, self.style.clone()).into())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergeTableCell {
    pub position: usize,
    pub range: CellRange,
}

impl MergeTableCell {
    pub fn new(position: usize, range: CellRange) -> Self {
        Self { position, range }
    }
}

impl FlowOp for MergeTableCell {
    fn name(&self) -> &'static str {
        "merge_table_cell"
    }

    fn apply_to_content(
        &self,
        content: &FlowContent,
        _theme: Option<&FlowTheme>,
    ) -> FlowResult<FlowContent> {
        edit_table(content, self.position, |table, style| {
            Ok((table.merge(self.range)?, style.clone()))
        })
    }

    fn invert(&self, before: &FlowContent) -> FlowResult<Option<Operation>> {
        let (table, _) = before.table_at(self.position)?;
        let mut ops: Vec<Operation> =
            vec![SplitTableCell::new(self.position, self.range.first()).into()];
        ops.extend(
            table
                .merged_regions()
                .into_iter()
                .filter(|region| self.range.contains(region.first()))
                .map(|region| MergeTableCell::new(self.position, region).into()),
        );
        Ok(BatchOperation::from_vec(ops))
    }

    fn after_insertion(&self, inserted: FlowRange) -> Option<Operation> {
        let position = node_after_insertion(self.position, inserted)?;
        Some(MergeTableCell::new(position, self.range).into())
    }

    fn after_removal(&self, removed: FlowRange) -> Option<Operation> {
        let position = node_after_removal(self.position, removed)?;
        Some(MergeTableCell::new(position, self.range).into())
    }

    fn after_table_edit(&self, edit: &TableEdit) -> Option<Operation> {
        if edit.position != self.position {
            return Some(self.clone().into());
        }
        let range = edit.cell_range(self.range)?;
        Some(MergeTableCell::new(self.position, range).into())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SplitTableCell {
    pub position: usize,
    pub cell: CellPosition,
}

impl SplitTableCell {
    pub fn new(position: usize, cell: CellPosition) -> Self {
        Self { position, cell }
    }
}

impl FlowOp for SplitTableCell {
    fn name(&self) -> &'static str {
        "split_table_cell"
    }

    fn apply_to_content(
        &self,
        content: &FlowContent,
        _theme: Option<&FlowTheme>,
    ) -> FlowResult<FlowContent> {
        edit_table(content, self.position, |table, style| {
            Ok((table.split(self.cell)?, style.clone()))
        })
    }

    fn invert(&self, before: &FlowContent) -> FlowResult<Option<Operation>> {
        let (table, _) = before.table_at(self.position)?;
        let cell = table.cell(self.cell)?;
        if !cell.is_merged() {
            return Ok(Some(Operation::noop()));
        }
        let focus = CellPosition::new(
            self.cell.row + cell.rowspan - 1,
            self.cell.column + cell.colspan - 1,
        );
        Ok(Some(
            MergeTableCell::new(self.position, CellRange::new(self.cell, focus)).into(),
        ))
    }

    fn after_insertion(&self, inserted: FlowRange) -> Option<Operation> {
        let position = node_after_insertion(self.position, inserted)?;
        Some(SplitTableCell::new(position, self.cell).into())
    }

    fn after_removal(&self, removed: FlowRange) -> Option<Operation> {
        let position = node_after_removal(self.position, removed)?;
        Some(SplitTableCell::new(position, self.cell).into())
    }

    fn after_table_edit(&self, edit: &TableEdit) -> Option<Operation> {
        if edit.position != self.position {
            return Some(self.clone().into());
        }
        let cell = edit.cell(self.cell)?;
        Some(SplitTableCell::new(self.position, cell).into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_table(table: TableContent) -> FlowContent {
        FlowContent::from_nodes(vec![
            FlowNode::text("x"),
            FlowNode::Table {
                content: table,
                style: TableStyle::new(),
            },
        ])
    }

    fn filled(rows: usize, columns: usize) -> TableContent {
        let mut table = TableContent::new(rows, columns);
        for r in 0..rows {
            for c in 0..columns {
                let cell = CellPosition::new(r, c);
                table = table
                    .with_cell_content(cell, FlowContent::from_text(&cell.to_string()))
                    .unwrap();
            }
        }
        table
    }

    #[test]
    fn test_remove_rows_round_trip() {
        let table = filled(4, 2).merge("A2:B4".parse().unwrap()).unwrap();
        let content = with_table(table);
        let op = RemoveTableRow::new(1, 2, 2);

        let after = op.apply_to_content(&content, None).unwrap();
        assert_eq!(after.table_at(1).unwrap().0.row_count(), 2);

        let inverse = op.invert(&content).unwrap().unwrap();
        assert_eq!(inverse.apply_to_content(&after, None).unwrap(), content);
    }

    #[test]
    fn test_remove_columns_restores_styles() {
        let table = filled(2, 3)
            .with_column_style(1, TableColumnStyle::new().with("width", 200))
            .unwrap();
        let content = with_table(table);
        let op = RemoveTableColumn::new(1, 1, 1);

        let after = op.apply_to_content(&content, None).unwrap();
        let inverse = op.invert(&content).unwrap().unwrap();
        assert_eq!(inverse.apply_to_content(&after, None).unwrap(), content);
    }

    #[test]
    fn test_merge_round_trip() {
        let table = filled(3, 3).merge("B2:C3".parse().unwrap()).unwrap();
        let content = with_table(table);
        let op = MergeTableCell::new(1, "A1:C3".parse().unwrap());

        let after = op.apply_to_content(&content, None).unwrap();
        assert_eq!(after.table_at(1).unwrap().0.merged_regions().len(), 1);

        let inverse = op.invert(&content).unwrap().unwrap();
        assert_eq!(inverse.apply_to_content(&after, None).unwrap(), content);
    }

    #[test]
    fn test_split_round_trip() {
        let table = TableContent::new(2, 2).merge("A1:B2".parse().unwrap()).unwrap();
        let content = with_table(table);
        let op = SplitTableCell::new(1, "A1".parse().unwrap());

        let after = op.apply_to_content(&content, None).unwrap();
        assert!(after.table_at(1).unwrap().0.merged_regions().is_empty());
        let inverse = op.invert(&content).unwrap().unwrap();
        assert_eq!(inverse.apply_to_content(&after, None).unwrap(), content);
    }

    #[test]
    fn test_concurrent_row_edits() {
        let removal = TableEdit::new(1, TableAxis::Rows, EditKind::Remove, 1, 3);

        let inside = InsertTableRow::new(1, 2, 1);
        assert_eq!(inside.after_table_edit(&removal), None);

        let after = InsertTableRow::new(1, 5, 1);
        assert_eq!(
            after.after_table_edit(&removal),
            Some(InsertTableRow::new(1, 2, 1).into())
        );

        let overlapping = RemoveTableRow::new(1, 0, 2);
        assert_eq!(
            overlapping.after_table_edit(&removal),
            Some(RemoveTableRow::new(1, 0, 1).into())
        );

        let other_table = TableEdit::new(7, TableAxis::Rows, EditKind::Remove, 0, 9);
        assert_eq!(
            inside.after_table_edit(&other_table),
            Some(inside.clone().into())
        );
    }

    #[test]
    fn test_column_format_follows_column_removal() {
        let op = FormatTableColumn::new(1, 3, TableColumnStyle::new().with("width", 10));
        let removal = TableEdit::new(1, TableAxis::Columns, EditKind::Remove, 0, 2);
        let Some(Operation::FormatTableColumn(moved)) = op.after_table_edit(&removal) else {
            panic!("column format should survive");
        };
        assert_eq!(moved.column, 1);

        let gone = TableEdit::new(1, TableAxis::Columns, EditKind::Remove, 3, 1);
        assert_eq!(op.after_table_edit(&gone), None);
    }
}
