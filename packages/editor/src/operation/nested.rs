//! Operations that edit the content nested inside a box or a table cell.
//!
//! The inner operation is opaque to outer-level transforms: only the outer
//! anchor moves. Two nested operations recurse into each other only when
//! they address the same container.

use serde::{Deserialize, Serialize};

use crate::cell::CellPosition;
use crate::content::{FlowContent, FlowNode};
use crate::errors::FlowResult;
use crate::operation::{transform_each, FlowOp, Operation};
use crate::range::FlowRange;
use crate::selection::{BoxSelection, FlowSelection, TableCellSelection};
use crate::style::FlowTheme;
use crate::transform::{node_after_insertion, node_after_removal, TableEdit};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EditBox {
    pub position: usize,
    pub inner: Box<Operation>,
}

impl EditBox {
    pub fn new(position: usize, inner: Operation) -> Self {
        Self {
            position,
            inner: Box::new(inner),
        }
    }

    fn at(&self, position: usize) -> Operation {
        EditBox {
            position,
            inner: self.inner.clone(),
        }
        .into()
    }

    pub(crate) fn transform(&self, other: &Operation, other_first: bool) -> Option<Operation> {
        match other {
            Operation::EditBox(other) if other.position == self.position => {
                let inner = self.inner.transform_with_priority(&other.inner, other_first)?;
                Some(EditBox::new(self.position, inner).into())
            }
            Operation::Batch(batch) => transform_each(&self.clone().into(), &batch.ops, other_first),
            _ => Some(other.clone()),
        }
    }
}

impl FlowOp for EditBox {
    fn name(&self) -> &'static str {
        "edit_box"
    }

    fn apply_to_content(
        &self,
        content: &FlowContent,
        theme: Option<&FlowTheme>,
    ) -> FlowResult<FlowContent> {
        let (inner, style) = content.box_at(self.position)?;
        let node = FlowNode::Box {
            content: self.inner.apply_to_content(inner, theme)?,
            style: style.clone(),
        };
        content.replace_node(self.position, node)
    }

    fn invert(&self, before: &FlowContent) -> FlowResult<Option<Operation>> {
        let (inner, _) = before.box_at(self.position)?;
        Ok(self
            .inner
            .invert(inner)?
            .map(|inverse| EditBox::new(self.position, inverse).into()))
    }

    fn merge_next(&self, next: &Operation) -> Option<Operation> {
        match next {
            Operation::EditBox(next) if next.position == self.position => {
                let inner = self.inner.merge_next(&next.inner)?;
                Some(EditBox::new(self.position, inner).into())
            }
            _ => None,
        }
    }

    fn after_insertion(&self, inserted: FlowRange) -> Option<Operation> {
        node_after_insertion(self.position, inserted).map(|p| self.at(p))
    }

    fn after_removal(&self, removed: FlowRange) -> Option<Operation> {
        node_after_removal(self.position, removed).map(|p| self.at(p))
    }

    fn apply_to_selection(&self, selection: &FlowSelection, mine: bool) -> Option<FlowSelection> {
        match selection {
            FlowSelection::Box(selected) if selected.position == self.position => {
                let inner = self.inner.apply_to_selection(&selected.inner, mine)?;
                Some(BoxSelection::new(self.position, inner).into())
            }
            _ => Some(selection.clone()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EditTableCell {
    pub position: usize,
    pub cell: CellPosition,
    pub inner: Box<Operation>,
}

impl EditTableCell {
    pub fn new(position: usize, cell: CellPosition, inner: Operation) -> Self {
        Self {
            position,
            cell,
            inner: Box::new(inner),
        }
    }

    fn moved(&self, position: usize, cell: CellPosition) -> Operation {
        EditTableCell {
            position,
            cell,
            inner: self.inner.clone(),
        }
        .into()
    }

    pub(crate) fn transform(&self, other: &Operation, other_first: bool) -> Option<Operation> {
        match other {
            Operation::EditTableCell(other)
                if other.position == self.position && other.cell == self.cell =>
            {
                let inner = self.inner.transform_with_priority(&other.inner, other_first)?;
                Some(EditTableCell::new(self.position, self.cell, inner).into())
            }
            Operation::Batch(batch) => transform_each(&self.clone().into(), &batch.ops, other_first),
            _ => Some(other.clone()),
        }
    }
}

impl FlowOp for EditTableCell {
    fn name(&self) -> &'static str {
        "edit_table_cell"
    }

    fn apply_to_content(
        &self,
        content: &FlowContent,
        theme: Option<&FlowTheme>,
    ) -> FlowResult<FlowContent> {
        let (table, style) = content.table_at(self.position)?;
        let cell = table.cell(self.cell)?;
        let edited = self.inner.apply_to_content(&cell.content, theme)?;
        let node = FlowNode::Table {
            content: table.with_cell_content(self.cell, edited)?,
            style: style.clone(),
        };
        content.replace_node(self.position, node)
    }

    fn invert(&self, before: &FlowContent) -> FlowResult<Option<Operation>> {
        let (table, _) = before.table_at(self.position)?;
        let cell = table.cell(self.cell)?;
        Ok(self
            .inner
            .invert(&cell.content)?
            .map(|inverse| EditTableCell::new(self.position, self.cell, inverse).into()))
    }

    fn merge_next(&self, next: &Operation) -> Option<Operation> {
        match next {
            Operation::EditTableCell(next)
                if next.position == self.position && next.cell == self.cell =>
            {
                let inner = self.inner.merge_next(&next.inner)?;
                Some(EditTableCell::new(self.position, self.cell, inner).into())
            }
            _ => None,
        }
    }

    fn after_insertion(&self, inserted: FlowRange) -> Option<Operation> {
        node_after_insertion(self.position, inserted).map(|p| self.moved(p, self.cell))
    }

    fn after_removal(&self, removed: FlowRange) -> Option<Operation> {
        node_after_removal(self.position, removed).map(|p| self.moved(p, self.cell))
    }

    fn after_table_edit(&self, edit: &TableEdit) -> Option<Operation> {
        if edit.position != self.position {
            return Some(self.clone().into());
        }
        edit.cell(self.cell).map(|cell| self.moved(self.position, cell))
    }

    fn apply_to_selection(&self, selection: &FlowSelection, mine: bool) -> Option<FlowSelection> {
        match selection {
            FlowSelection::TableCell(selected)
                if selected.position == self.position && selected.cell == self.cell =>
            {
                let inner = self.inner.apply_to_selection(&selected.inner, mine)?;
                Some(TableCellSelection::new(self.position, self.cell, inner).into())
            }
            _ => Some(selection.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::TableContent;
    use crate::operation::{InsertContent, RemoveRange};
    use crate::style::{BoxStyle, TableStyle};

    fn boxed(text: &str) -> FlowContent {
        FlowContent::from_nodes(vec![
            FlowNode::text("ab"),
            FlowNode::Box {
                content: FlowContent::from_text(text),
                style: BoxStyle::new(),
            },
            FlowNode::text("cd"),
        ])
    }

    #[test]
    fn test_edit_box_applies_and_inverts() {
        let content = boxed("inner");
        let op = EditBox::new(2, InsertContent::new(5, FlowContent::from_text("!")).into());

        let after = op.apply_to_content(&content, None).unwrap();
        assert_eq!(after.box_at(2).unwrap().0.plain_text(), "inner!");

        let inverse = op.invert(&content).unwrap().unwrap();
        assert_eq!(inverse.apply_to_content(&after, None).unwrap(), content);
    }

    #[test]
    fn test_edit_box_rejects_other_nodes() {
        let op = EditBox::new(0, RemoveRange::new(FlowRange::new(0, 1)).into());
        assert!(op.apply_to_content(&boxed("x"), None).is_err());
    }

    #[test]
    fn test_outer_edits_move_the_anchor() {
        let op = EditBox::new(2, RemoveRange::new(FlowRange::new(0, 1)).into());
        assert_eq!(
            op.after_insertion(FlowRange::new(0, 3)),
            Some(EditBox::new(5, RemoveRange::new(FlowRange::new(0, 1)).into()).into())
        );
        assert_eq!(op.after_removal(FlowRange::new(1, 3)), None);
    }

    #[test]
    fn test_edit_cell_follows_row_insertion() {
        let table = FlowContent::from_nodes(vec![FlowNode::Table {
            content: TableContent::new(2, 2),
            style: TableStyle::new(),
        }]);
        let cell = "B2".parse().unwrap();
        let op = EditTableCell::new(
            0,
            cell,
            InsertContent::new(0, FlowContent::from_text("x")).into(),
        );
        let after = op.apply_to_content(&table, None).unwrap();
        let (grid, _) = after.table_at(0).unwrap();
        assert_eq!(grid.cell(cell).unwrap().content.plain_text(), "x");

        let moved = op
            .after_table_edit(&TableEdit::new(
                0,
                crate::transform::TableAxis::Rows,
                crate::transform::EditKind::Insert,
                0,
                1,
            ))
            .unwrap();
        let Operation::EditTableCell(moved) = moved else {
            panic!("expected a cell edit");
        };
        assert_eq!(moved.cell, "B3".parse().unwrap());
    }
}
