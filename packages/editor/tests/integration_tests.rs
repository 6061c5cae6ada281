//! Integration tests for the editor crate

use flowdoc_editor::{
    BatchOperation, BoxSelection, CellPosition, CellRange, FlowContent, FlowNode, FlowRange,
    FlowSelection, Operation, TableCellSelection, TableContent, TableSelection, TableStyle,
    TextStyle,
};
use proptest::prelude::*;

fn text(s: &str) -> FlowContent {
    FlowContent::from_text(s)
}

fn apply_all(content: &FlowContent, ops: &[Operation]) -> FlowContent {
    ops.iter().fold(content.clone(), |content, op| {
        op.apply_to_content(&content, None).unwrap()
    })
}

fn batch(ops: Vec<Operation>) -> Operation {
    Operation::Batch(BatchOperation { ops })
}

fn local_edit() -> Vec<Operation> {
    vec![
        Operation::remove(FlowRange::new(2, 9)),
        Operation::insert_text(2, "j dä"),
        Operation::remove(FlowRange::new(7, 8)),
    ]
}

#[test]
fn test_do_then_undo() {
    let base = text("hello there!");

    let mut content = base.clone();
    let mut inverses = Vec::new();
    for op in local_edit() {
        inverses.push(op.invert(&content).unwrap().unwrap());
        content = op.apply_to_content(&content, None).unwrap();
    }
    assert_eq!(content.plain_text(), "hej där!");

    for inverse in inverses.iter().rev() {
        content = inverse.apply_to_content(&content, None).unwrap();
    }
    assert_eq!(content, base);
}

#[test]
fn test_concurrent_batches_converge() {
    let base = text("hello there!");
    let theirs = batch(vec![
        Operation::remove(FlowRange::new(0, 1)),
        Operation::insert_text(0, "H"),
        Operation::insert_text(11, "?"),
    ]);
    let ours = batch(local_edit());

    let theirs_rebased = ours.transform(&theirs).unwrap();
    let after_ours = apply_all(&base, &[ours.clone(), theirs_rebased]);
    assert_eq!(after_ours.plain_text(), "Hej där?!");

    let ours_rebased = theirs.transform(&ours).unwrap();
    let after_theirs = apply_all(&base, &[theirs, ours_rebased]);
    assert_eq!(after_theirs.plain_text(), "Hej där?!");
}

#[test]
fn test_batch_invert_round_trip() {
    let base = text("hello there!");
    let op = batch(local_edit());
    let inverse = op.invert(&base).unwrap().unwrap();
    let after = op.apply_to_content(&base, None).unwrap();
    assert_eq!(inverse.apply_to_content(&after, None).unwrap(), base);
}

#[test]
fn test_formatting_round_trip() {
    let base = FlowContent::from_nodes(vec![
        FlowNode::styled_text("bold", TextStyle::new().with("bold", true)),
        FlowNode::text(" plain"),
        FlowNode::paragraph_break(),
    ]);
    let op = Operation::format_text(
        FlowRange::new(2, 8),
        TextStyle::new().with("bold", false).with("color", "red"),
    );
    let after = op.apply_to_content(&base, None).unwrap();
    let inverse = op.invert(&base).unwrap().unwrap();
    assert_eq!(inverse.apply_to_content(&after, None).unwrap(), base);
}

#[test]
fn test_batch_flattening() {
    assert_eq!(BatchOperation::from_vec(vec![]), None);

    let single = Operation::insert_text(0, "a");
    assert_eq!(BatchOperation::from_vec(vec![single.clone()]), Some(single));

    let nested = batch(vec![
        batch(vec![Operation::remove(FlowRange::new(0, 1))]),
        batch(vec![]),
        Operation::insert_text(4, "x"),
    ]);
    let flat = BatchOperation::from_vec(vec![nested.clone()]).unwrap();
    let Operation::Batch(flat_batch) = &flat else {
        panic!("expected a batch, got {flat:?}");
    };
    assert!(flat_batch.ops.iter().all(|op| !matches!(op, Operation::Batch(_))));

    let base = text("abcdefg");
    assert_eq!(
        flat.apply_to_content(&base, None).unwrap(),
        nested.apply_to_content(&base, None).unwrap()
    );
}

#[test]
fn test_edits_inside_tables_survive_structural_edits() {
    let base = FlowContent::from_nodes(vec![
        FlowNode::text("T"),
        FlowNode::Table {
            content: TableContent::new(2, 2),
            style: TableStyle::new(),
        },
    ]);
    let cell = CellPosition::new(1, 1);
    let typing = Operation::edit_table_cell(1, cell, Operation::insert_text(0, "hi"));
    let selected: FlowSelection =
        TableSelection::new(1, CellRange::single(CellPosition::new(0, 0))).into();
    let new_row = selected.insert_rows(false).unwrap();

    let typing_rebased = new_row.transform(&typing).unwrap();
    let after = apply_all(&base, &[new_row.clone(), typing_rebased]);
    let (table, _) = after.table_at(1).unwrap();
    assert_eq!(table.row_count(), 3);
    assert_eq!(
        table.cell(CellPosition::new(2, 1)).unwrap().content.plain_text(),
        "hi"
    );

    let row_rebased = typing.transform(&new_row).unwrap();
    let other_order = apply_all(&base, &[typing, row_rebased]);
    assert_eq!(other_order, after);
}

#[test]
fn test_zero_size_edits_leave_every_selection_alone() {
    let selections: Vec<FlowSelection> = vec![
        FlowSelection::caret(0),
        FlowSelection::range(FlowRange::new(5, 2)),
        TableSelection::new(2, CellRange::parse("A1:C2").unwrap()).into(),
        BoxSelection::new(1, FlowSelection::caret(3)).into(),
        TableCellSelection::new(2, CellPosition::new(0, 0), FlowSelection::caret(0)).into(),
    ];
    let noops = [
        Operation::insert(3, FlowContent::new()),
        Operation::remove(FlowRange::collapsed(3)),
    ];
    for selection in &selections {
        for op in &noops {
            assert_eq!(op.apply_to_selection(selection, true), Some(selection.clone()));
            assert_eq!(op.apply_to_selection(selection, false), Some(selection.clone()));
        }
    }
}

#[test]
fn test_selection_follows_remote_typing() {
    let selection = FlowSelection::range(FlowRange::new(4, 7));
    let remote = Operation::insert_text(1, "abc");
    assert_eq!(
        remote.apply_to_selection(&selection, false),
        Some(FlowSelection::range(FlowRange::new(7, 10)))
    );
}

#[test]
fn test_carets_at_the_same_spot_stay_behind_their_own_typing() {
    let base = text("abcdef");
    let caret = FlowSelection::caret(3);
    let alice = Operation::insert_text(3, "X");
    let bob = Operation::insert_text(3, "Y");

    // each author's caret follows their own insertion
    let alice_caret = alice.apply_to_selection(&caret, true).unwrap();
    let bob_caret = bob.apply_to_selection(&caret, true).unwrap();
    assert_eq!(alice_caret, FlowSelection::caret(4));
    assert_eq!(bob_caret, FlowSelection::caret(4));

    // alice's insertion goes first on both sides
    let bob_rebased = alice.transform(&bob).unwrap();
    let alice_rebased = bob.transform_with_priority(&alice, true).unwrap();
    assert_eq!(bob_rebased, Operation::insert_text(4, "Y"));
    assert_eq!(alice_rebased, Operation::insert_text(3, "X"));

    let at_alice = apply_all(&base, &[alice.clone(), bob_rebased.clone()]);
    let at_bob = apply_all(&base, &[bob, alice_rebased.clone()]);
    assert_eq!(at_alice.plain_text(), "abcXYdef");
    assert_eq!(at_bob, at_alice);

    // a remote insertion at the caret leaves it in front of the new text
    assert_eq!(
        bob_rebased.apply_to_selection(&alice_caret, false),
        Some(FlowSelection::caret(4))
    );
    assert_eq!(
        alice_rebased.apply_to_selection(&bob_caret, false),
        Some(FlowSelection::caret(5))
    );
}

const BASE: &str = "abcdefghij";

fn flow_op() -> impl Strategy<Value = Operation> {
    let len = BASE.chars().count();
    prop_oneof![
        (0..=len, "[xyz]{1,3}").prop_map(|(at, s)| Operation::insert_text(at, &s)),
        (0..=len, 0..=len)
            .prop_filter("non-empty", |(a, b)| a != b)
            .prop_map(|(a, b)| Operation::remove(FlowRange::new(a, b))),
    ]
}

proptest! {
    #[test]
    fn prop_invert_round_trip(op in flow_op()) {
        let base = text(BASE);
        let after = op.apply_to_content(&base, None).unwrap();
        let inverse = op.invert(&base).unwrap().unwrap();
        prop_assert_eq!(inverse.apply_to_content(&after, None).unwrap(), base);
    }

    #[test]
    fn prop_merge_matches_sequence(a in flow_op(), b in flow_op()) {
        let base = text(BASE);
        let after_a = a.apply_to_content(&base, None).unwrap();
        prop_assume!(b.apply_to_content(&after_a, None).is_ok());
        if let Some(merged) = a.merge_next(&b) {
            prop_assert_eq!(
                merged.apply_to_content(&base, None).unwrap(),
                apply_all(&base, &[a, b])
            );
        }
    }

    #[test]
    fn prop_concurrent_edits_converge(a in flow_op(), b in flow_op()) {
        let base = text(BASE);
        // both sides agree that `a` goes first at a tie
        let (Some(b_after_a), Some(a_after_b)) =
            (a.transform(&b), b.transform_with_priority(&a, true))
        else {
            return Ok(());
        };
        prop_assert_eq!(
            apply_all(&base, &[a, b_after_a]),
            apply_all(&base, &[b, a_after_b])
        );
    }
}
