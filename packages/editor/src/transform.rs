//! # Transform Helpers
//!
//! Pure functions answering "how does interval X change when interval Y was
//! inserted or removed elsewhere". Every operation and selection delegates
//! here, so each rule has exactly one authority.
//!
//! Table structure reuses the same arithmetic by treating a run of rows or
//! columns `(index, count)` as the flow range `[index, index + count)`.

use crate::cell::{CellPosition, CellRange};
use crate::range::FlowRange;

/// Transform `target` after `inserted` was inserted.
///
/// Insertions before the target translate it. Insertions strictly inside it
/// inflate it. When `edge_inflating` is set, insertions touching either
/// edge inflate the target as well; otherwise an insertion at the leading
/// edge pushes the target forward and one at the trailing edge leaves it
/// alone.
pub fn range_after_insertion(
    target: FlowRange,
    inserted: FlowRange,
    edge_inflating: bool,
) -> FlowRange {
    let at = inserted.first();
    let size = inserted.size() as isize;
    let (first, last) = (target.first(), target.last());

    let translates = if edge_inflating { at < first } else { at <= first };
    let inflates = if edge_inflating {
        at >= first && at <= last
    } else {
        at > first && at < last
    };

    if translates {
        target.translate(size)
    } else if inflates {
        target.inflate(size)
    } else {
        target
    }
}

/// Transform `target` after `removed` was removed.
///
/// The target deflates by the overlap and, when the removal started before
/// it, moves back by the removed length that preceded it. A non-empty target
/// that is removed entirely yields `None` unless `keep_collapsed` is set.
pub fn range_after_removal(
    target: FlowRange,
    removed: FlowRange,
    keep_collapsed: bool,
) -> Option<FlowRange> {
    let (first, last) = (target.first(), target.last());

    if removed.is_collapsed() || removed.first() >= last {
        return Some(target);
    }

    let overlap = target.forward().intersect(&removed).size();
    let mut result = target.deflate(overlap as isize);

    if !target.is_collapsed() && result.is_collapsed() && !keep_collapsed {
        return None;
    }

    if removed.first() < first {
        let before = removed.last().min(first) - removed.first();
        result = result.translate(-(before as isize));
    }

    Some(result)
}

/// Transform the position of a single-position node after an insertion
pub fn node_after_insertion(position: usize, inserted: FlowRange) -> Option<usize> {
    unit(range_after_insertion(FlowRange::at(position, 1), inserted, false))
}

/// Transform the position of a single-position node after a removal.
///
/// Yields `None` when the node itself was removed.
pub fn node_after_removal(position: usize, removed: FlowRange) -> Option<usize> {
    range_after_removal(FlowRange::at(position, 1), removed, false).and_then(unit)
}

fn unit(range: FlowRange) -> Option<usize> {
    (range.size() == 1).then(|| range.first())
}

/// Transform an insertion point after a concurrent insertion.
///
/// `wins_ties` decides who goes first when both insert at the same spot:
/// a point that wins ties stays in front of the other insertion.
pub fn point_after_insertion(position: usize, inserted: FlowRange, wins_ties: bool) -> usize {
    let at = inserted.first();
    if at < position || (at == position && !wins_ties) {
        position + inserted.size()
    } else {
        position
    }
}

/// Transform an insertion point after a concurrent removal.
///
/// Points strictly inside the removed range are swallowed by it.
pub fn point_after_removal(position: usize, removed: FlowRange) -> Option<usize> {
    if position > removed.first() && position < removed.last() {
        return None;
    }
    range_after_removal(FlowRange::collapsed(position), removed, true).map(|r| r.first())
}

/// Kind of a concurrent flow edit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditKind {
    Insert,
    Remove,
}

/// A concurrent insertion or removal, described by the range it affected.
///
/// `wins_ties` orders an insertion against insertions made at the same
/// point: the winner ends up in front. It is set by default, so the edit
/// that was applied first goes first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlowEdit {
    pub kind: EditKind,
    pub range: FlowRange,
    pub wins_ties: bool,
}

impl FlowEdit {
    pub fn insertion(range: FlowRange) -> Self {
        Self {
            kind: EditKind::Insert,
            range,
            wins_ties: true,
        }
    }

    pub fn removal(range: FlowRange) -> Self {
        Self {
            kind: EditKind::Remove,
            range,
            wins_ties: true,
        }
    }

    pub fn with_wins_ties(self, wins_ties: bool) -> Self {
        Self { wins_ties, ..self }
    }

    pub(crate) fn moved(self, range: FlowRange) -> Self {
        Self { range, ..self }
    }

    /// Transform a single-position node anchored at `position`
    pub fn node(&self, position: usize) -> Option<usize> {
        match self.kind {
            EditKind::Insert => node_after_insertion(position, self.range),
            EditKind::Remove => node_after_removal(position, self.range),
        }
    }

    /// Transform a span that disappears once it is fully consumed
    pub fn span(&self, span: FlowRange) -> Option<FlowRange> {
        match self.kind {
            EditKind::Insert => Some(range_after_insertion(span, self.range, false)),
            EditKind::Remove => range_after_removal(span, self.range, false),
        }
    }

    /// Transform an insertion point, placing it behind this edit at a tie
    /// unless the edit gave up its priority
    pub fn point(&self, position: usize) -> Option<usize> {
        match self.kind {
            EditKind::Insert => Some(point_after_insertion(position, self.range, !self.wins_ties)),
            EditKind::Remove => point_after_removal(position, self.range),
        }
    }
}

/// Table axis affected by a structural edit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableAxis {
    Rows,
    Columns,
}

/// Rows or columns inserted into or removed from the table at `position`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableEdit {
    pub position: usize,
    pub axis: TableAxis,
    pub edit: FlowEdit,
}

impl TableEdit {
    pub fn new(position: usize, axis: TableAxis, kind: EditKind, index: usize, count: usize) -> Self {
        Self {
            position,
            axis,
            edit: FlowEdit {
                kind,
                range: FlowRange::at(index, count),
                wins_ties: true,
            },
        }
    }

    /// Transform a single cell address
    pub fn cell(&self, cell: CellPosition) -> Option<CellPosition> {
        match self.axis {
            TableAxis::Rows => self
                .edit
                .node(cell.row)
                .map(|row| CellPosition::new(row, cell.column)),
            TableAxis::Columns => self
                .edit
                .node(cell.column)
                .map(|column| CellPosition::new(cell.row, column)),
        }
    }

    /// Transform a rectangular cell range; `None` once one of its
    /// projections is removed entirely
    pub fn cell_range(&self, range: CellRange) -> Option<CellRange> {
        match self.axis {
            TableAxis::Rows => {
                CellRange::from_axes(self.edit.span(range.row_range())?, range.column_range())
            }
            TableAxis::Columns => {
                CellRange::from_axes(range.row_range(), self.edit.span(range.column_range())?)
            }
        }
    }
}
