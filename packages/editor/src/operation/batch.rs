use serde::{Deserialize, Serialize};

use crate::content::FlowContent;
use crate::errors::FlowResult;
use crate::operation::{FlowOp, Operation};
use crate::range::FlowRange;
use crate::selection::FlowSelection;
use crate::style::FlowTheme;
use crate::transform::{
    node_after_insertion, node_after_removal, point_after_insertion, point_after_removal,
    range_after_insertion, range_after_removal, EditKind, FlowEdit, TableEdit,
};

/// Ordered operations applied as one
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchOperation {
    pub ops: Vec<Operation>,
}

impl BatchOperation {
    /// Build the smallest operation equivalent to running `ops` in order.
    ///
    /// Nested batches are flattened and neighbours merged where possible.
    /// Returns `None` when nothing is left and the bare operation when one
    /// is.
    pub fn from_vec(ops: Vec<Operation>) -> Option<Operation> {
        let mut flat: Vec<Operation> = Vec::with_capacity(ops.len());
        for op in flatten(ops) {
            let merged = flat.last().and_then(|last| last.merge_next(&op));
            match merged {
                Some(merged) => {
                    flat.pop();
                    if !merged.is_noop() {
                        flat.push(merged);
                    }
                }
                None => flat.push(op),
            }
        }

        match flat.len() {
            0 => None,
            1 => flat.pop(),
            _ => Some(Operation::Batch(BatchOperation { ops: flat })),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Thread a concurrent edit through the batch.
    ///
    /// Each element is transformed by the edit as it stands at that point,
    /// then the edit is carried past the element. Elements the edit cancels
    /// are dropped; once the edit itself is cancelled the remaining elements
    /// are kept as they are.
    fn thread<E: Copy>(
        &self,
        edit: E,
        step: impl Fn(&Operation, &E) -> Option<Operation>,
        carry: impl Fn(E, &Operation) -> Option<E>,
    ) -> Option<Operation> {
        let mut edit = Some(edit);
        let mut out = Vec::with_capacity(self.ops.len());
        for op in &self.ops {
            match edit {
                Some(current) => {
                    out.extend(step(op, &current));
                    edit = carry(current, op);
                }
                None => out.push(op.clone()),
            }
        }
        BatchOperation::from_vec(out)
    }
}

fn flatten(ops: Vec<Operation>) -> Vec<Operation> {
    let mut out = Vec::with_capacity(ops.len());
    for op in ops {
        match op {
            Operation::Batch(batch) => out.extend(flatten(batch.ops)),
            op => out.push(op),
        }
    }
    out
}

/// Carry a concurrent flow edit past `op`.
///
/// Ties are settled the way `op` itself was transformed: an edit that wins
/// ties stays in front of an insertion at the same point, one that yields
/// moves behind it.
pub(crate) fn flow_edit_through(edit: FlowEdit, op: &Operation) -> Option<FlowEdit> {
    match op {
        Operation::Insert(insert) => Some(edit_after_insertion(edit, insert.inserted_range())),
        Operation::Remove(remove) => edit_after_removal(edit, remove.range),
        Operation::Reset(_) => None,
        Operation::Batch(batch) => batch.ops.iter().try_fold(edit, |e, op| flow_edit_through(e, op)),
        _ => Some(edit),
    }
}

fn edit_after_insertion(edit: FlowEdit, inserted: FlowRange) -> FlowEdit {
    match edit.kind {
        EditKind::Insert => {
            let at = point_after_insertion(edit.range.first(), inserted, edit.wins_ties);
            edit.moved(FlowRange::at(at, edit.range.size()))
        }
        EditKind::Remove => edit.moved(range_after_insertion(edit.range, inserted, false)),
    }
}

fn edit_after_removal(edit: FlowEdit, removed: FlowRange) -> Option<FlowEdit> {
    match edit.kind {
        EditKind::Insert => {
            let at = point_after_removal(edit.range.first(), removed)?;
            Some(edit.moved(FlowRange::at(at, edit.range.size())))
        }
        EditKind::Remove => range_after_removal(edit.range, removed, true).map(|r| edit.moved(r)),
    }
}

/// Carry a concurrent table edit past `op`
pub(crate) fn table_edit_through(edit: TableEdit, op: &Operation) -> Option<TableEdit> {
    let moved = |position: Option<usize>| position.map(|position| TableEdit { position, ..edit });
    match op {
        Operation::Insert(insert) => moved(node_after_insertion(edit.position, insert.inserted_range())),
        Operation::Remove(remove) => moved(node_after_removal(edit.position, remove.range)),
        Operation::Reset(_) => None,
        Operation::Batch(batch) => batch.ops.iter().try_fold(edit, |e, op| table_edit_through(e, op)),
        op => match op.table_edit() {
            Some(other) if other.position == edit.position && other.axis == edit.axis => {
                let carried = match other.edit.kind {
                    EditKind::Insert => edit_after_insertion(edit.edit, other.edit.range),
                    EditKind::Remove => edit_after_removal(edit.edit, other.edit.range)?,
                };
                Some(TableEdit {
                    edit: carried,
                    ..edit
                })
            }
            _ => Some(edit),
        },
    }
}

/// Transform every element of `ops` against `this`, rebasing `this` past
/// each element in turn. `ops_first` orders tied insertions as in
/// [`Operation::transform_with_priority`].
pub(crate) fn transform_each(
    this: &Operation,
    ops: &[Operation],
    ops_first: bool,
) -> Option<Operation> {
    let mut this = Some(this.clone());
    let mut out = Vec::with_capacity(ops.len());
    for op in ops {
        match &this {
            Some(current) => {
                out.extend(current.transform_with_priority(op, ops_first));
                this = op.transform_with_priority(current, !ops_first);
            }
            None => out.push(op.clone()),
        }
    }
    BatchOperation::from_vec(out)
}

impl FlowOp for BatchOperation {
    fn name(&self) -> &'static str {
        "batch"
    }

    fn apply_to_content(
        &self,
        content: &FlowContent,
        theme: Option<&FlowTheme>,
    ) -> FlowResult<FlowContent> {
        let mut content = content.clone();
        for op in &self.ops {
            content = op.apply_to_content(&content, theme)?;
        }
        Ok(content)
    }

    fn invert(&self, before: &FlowContent) -> FlowResult<Option<Operation>> {
        let mut content = before.clone();
        let mut inverses = Vec::with_capacity(self.ops.len());
        for op in &self.ops {
            let Some(inverse) = op.invert(&content)? else {
                return Ok(None);
            };
            inverses.push(inverse);
            content = op.apply_to_content(&content, None)?;
        }
        inverses.reverse();
        Ok(Some(
            BatchOperation::from_vec(inverses).unwrap_or_else(Operation::noop),
        ))
    }

    fn merge_next(&self, next: &Operation) -> Option<Operation> {
        let (last, rest) = self.ops.split_last()?;
        let merged = last.merge_next(next)?;
        let mut ops = rest.to_vec();
        ops.push(merged);
        Some(BatchOperation::from_vec(ops).unwrap_or_else(Operation::noop))
    }

    fn after_insertion(&self, inserted: FlowRange) -> Option<Operation> {
        self.thread(
            FlowEdit::insertion(inserted),
            |op, edit| op.after_flow_edit(edit),
            flow_edit_through,
        )
    }

    fn after_insertion_behind(&self, inserted: FlowRange) -> Option<Operation> {
        self.thread(
            FlowEdit::insertion(inserted).with_wins_ties(false),
            |op, edit| op.after_flow_edit(edit),
            flow_edit_through,
        )
    }

    fn after_removal(&self, removed: FlowRange) -> Option<Operation> {
        self.thread(
            FlowEdit::removal(removed),
            |op, edit| op.after_flow_edit(edit),
            flow_edit_through,
        )
    }

    fn after_table_edit(&self, edit: &TableEdit) -> Option<Operation> {
        self.thread(*edit, |op, edit| op.after_table_edit(edit), table_edit_through)
    }

    fn apply_to_selection(&self, selection: &FlowSelection, mine: bool) -> Option<FlowSelection> {
        self.ops.iter().try_fold(selection.clone(), |selection, op| {
            op.apply_to_selection(&selection, mine)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operation::{InsertContent, RemoveRange};

    fn insert(at: usize, text: &str) -> Operation {
        InsertContent::new(at, FlowContent::from_text(text)).into()
    }

    fn remove(anchor: usize, focus: usize) -> Operation {
        RemoveRange::new(FlowRange::new(anchor, focus)).into()
    }

    #[test]
    fn test_from_vec_edge_cases() {
        assert_eq!(BatchOperation::from_vec(vec![]), None);
        assert_eq!(BatchOperation::from_vec(vec![remove(0, 1)]), Some(remove(0, 1)));
        assert_eq!(
            BatchOperation::from_vec(vec![Operation::noop(), Operation::noop()]),
            None
        );
    }

    #[test]
    fn test_from_vec_flattens_and_merges() {
        let nested = Operation::Batch(BatchOperation {
            ops: vec![insert(0, "ab"), remove(5, 6)],
        });
        let flat = BatchOperation::from_vec(vec![nested, insert(2, "c")]).unwrap();
        assert_eq!(
            flat,
            Operation::Batch(BatchOperation {
                ops: vec![insert(0, "ab"), remove(5, 6), insert(2, "c")],
            })
        );

        let typed = BatchOperation::from_vec(vec![insert(0, "a"), insert(1, "b"), insert(2, "c")]);
        assert_eq!(typed, Some(insert(0, "abc")));
    }

    #[test]
    fn test_insert_then_delete_cancels() {
        assert_eq!(
            BatchOperation::from_vec(vec![insert(3, "a"), remove(3, 4), remove(0, 1)]),
            Some(remove(0, 1))
        );
    }

    #[test]
    fn test_merge_next_only_touches_last() {
        let batch = BatchOperation {
            ops: vec![remove(0, 1), insert(4, "a")],
        };
        assert_eq!(
            batch.merge_next(&insert(5, "b")),
            Some(Operation::Batch(BatchOperation {
                ops: vec![remove(0, 1), insert(4, "ab")],
            }))
        );
        assert_eq!(batch.merge_next(&insert(0, "b")), None);
    }

    #[test]
    fn test_invert_fails_as_a_whole() {
        let upload = crate::operation::CompleteUpload {
            position: 0,
            upload: "u".into(),
            url: "x".into(),
        };
        let batch = BatchOperation {
            ops: vec![insert(0, "a"), upload.into()],
        };
        let content = FlowContent::from_nodes(vec![crate::content::FlowNode::Image {
            source: crate::content::ImageSource {
                url: "blob".into(),
                width: 1,
                height: 1,
                upload: Some("u".into()),
            },
            style: Default::default(),
        }]);
        assert_eq!(batch.invert(&content), Ok(None));
    }

    #[test]
    fn test_threading_a_tied_insertion_respects_priority() {
        let batch = BatchOperation {
            ops: vec![insert(2, "ab"), insert(7, "c")],
        };
        // the elements give way to an insertion that wins ties
        assert_eq!(
            batch.after_insertion(FlowRange::at(2, 1)),
            Some(Operation::Batch(BatchOperation {
                ops: vec![insert(3, "ab"), insert(8, "c")],
            }))
        );
        // and keep their place in front of one that yields
        assert_eq!(
            batch.after_insertion_behind(FlowRange::at(2, 1)),
            Some(Operation::Batch(BatchOperation {
                ops: vec![insert(2, "ab"), insert(8, "c")],
            }))
        );
    }

    #[test]
    fn test_threading_a_removal_through_a_batch() {
        let batch = BatchOperation {
            ops: vec![insert(3, "xy"), insert(9, "z")],
        };
        // the first insertion lands inside the removal and is swallowed by it,
        // which widens the removal for the second element
        let result = batch.after_removal(FlowRange::new(1, 6)).unwrap();
        assert_eq!(result, insert(2, "z"));
    }
}
