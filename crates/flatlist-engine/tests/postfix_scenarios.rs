//! End-to-end pipeline tests: edit an initially consistent document and
//! assert the settled state, mostly through the markup rendering.

use flatlist_engine::{
    markup, Block, BlockId, BlockKind, Cmd, Document, ListAttrs, ListType,
};
use pretty_assertions::assert_eq;

fn sequential_ids() -> impl FnMut() -> String {
    let mut n = 0u32;
    move || {
        let id = format!("fix-{n}");
        n += 1;
        id
    }
}

/// Loads a fixture verbatim and hands back the document with stable ids.
fn doc(markup_text: &str) -> Document {
    let mut doc = Document::from_markup(markup_text).expect("valid fixture");
    doc.set_id_source(sequential_ids());
    doc
}

fn block_at(doc: &Document, pos: usize) -> BlockId {
    doc.at(pos).expect("position in range").0
}

fn indents(doc: &Document) -> Vec<Option<u32>> {
    doc.blocks()
        .map(|(_, b)| b.attrs().map(|a| a.indent))
        .collect()
}

fn item_ids(doc: &Document) -> Vec<Option<String>> {
    doc.blocks()
        .map(|(_, b)| b.attrs().map(|a| a.item_id.clone()))
        .collect()
}

#[test]
fn removing_a_nested_item_keeps_the_shallower_tail_valid() {
    let mut doc = doc("* a\n  * b\n    * c\n  * d\n* e\n");
    let c = block_at(&doc, 2);
    doc.apply(Cmd::RemoveBlock { id: c });
    assert_eq!(indents(&doc), [Some(0), Some(1), Some(1), Some(0)]);
}

#[test]
fn removing_an_intermediate_level_cascades_the_clamp() {
    let mut doc = doc("* a\n  * b\n    * c\n      * d\n");
    let b = block_at(&doc, 1);
    doc.apply(Cmd::RemoveBlock { id: b });
    // c snaps under a, d follows one level behind.
    assert_eq!(indents(&doc), [Some(0), Some(1), Some(2)]);
}

#[test]
fn pasted_deep_indents_clamp_but_keep_relative_nesting() {
    let mut doc = doc("* a\n");
    doc.apply(Cmd::InsertBlocks {
        at: 1,
        blocks: vec![
            Block::item("x", ListAttrs::new("x", ListType::bulleted(), 5)),
            Block::item("y", ListAttrs::new("y", ListType::bulleted(), 6)),
        ],
    });
    assert_eq!(indents(&doc), [Some(0), Some(1), Some(2)]);
}

#[test]
fn list_opening_the_document_clamps_to_level_zero() {
    let mut doc = Document::new();
    doc.apply(Cmd::InsertBlocks {
        at: 0,
        blocks: vec![Block::item("a", ListAttrs::new("a", ListType::bulleted(), 2))],
    });
    assert_eq!(indents(&doc), [Some(0)]);
}

#[test]
fn paragraph_inserted_mid_list_does_not_reindent_what_follows() {
    let mut doc = doc("* a\n  * b\n  * c\n");
    doc.apply(Cmd::InsertBlocks {
        at: 2,
        blocks: vec![Block::paragraph("aside")],
    });
    // c still sits under a's indent chain; only the id run is split.
    assert_eq!(indents(&doc), [Some(0), Some(1), None, Some(1)]);
}

#[test]
fn pasted_block_reusing_a_distant_id_is_regenerated() {
    let mut doc = doc("* a {id:x}\n* b {id:y}\n");
    doc.apply(Cmd::InsertBlocks {
        at: 2,
        blocks: vec![Block::item("a2", ListAttrs::new("x", ListType::bulleted(), 0))],
    });
    // Earlier position keeps the id; the newcomer regenerates.
    assert_eq!(
        item_ids(&doc),
        [Some("x".into()), Some("y".into()), Some("fix-0".into())]
    );
}

#[test]
fn pasted_block_adjacent_to_its_id_twin_merges_into_the_item() {
    let mut doc = doc("* a {id:x}\n* b {id:y}\n");
    doc.apply(Cmd::InsertBlocks {
        at: 1,
        blocks: vec![Block::item("a2", ListAttrs::new("x", ListType::bulleted(), 0))],
    });
    assert_eq!(
        item_ids(&doc),
        [Some("x".into()), Some("x".into()), Some("y".into())]
    );
    assert_eq!(markup::stringify(&doc), "* a {id:x}\n  a2\n* b {id:y}\n");
}

#[test]
fn id_may_recur_across_lists_separated_by_plain_content() {
    let mut doc = doc("* a {id:x}\n* b {id:x}\n* c {id:x}\n");
    let b = block_at(&doc, 1);
    doc.apply(Cmd::Rename {
        id: b,
        kind: BlockKind::ThematicBreak,
    });
    // b loses its attributes, splitting the run; both survivors may
    // keep x because they no longer share a run.
    assert_eq!(item_ids(&doc), [Some("x".into()), None, Some("x".into())]);
}

#[test]
fn type_change_on_one_block_of_an_item_splits_off_a_new_item() {
    let mut doc = doc("* a {id:x}\n  second\n");
    let second = block_at(&doc, 1);
    let patch = doc.change(|w| {
        w.set_list_type(second, ListType::numbered());
    });
    assert_eq!(item_ids(&doc), [Some("x".into()), Some("fix-0".into())]);
    assert!(!patch.reconvert.is_empty());
}

#[test]
fn settled_documents_settle_to_empty_patches() {
    let mut doc = doc("* a\n  * b\n    * c\n* d\n");
    let before = markup::stringify(&doc);
    let d = block_at(&doc, 3);
    let patch = doc.change(|w| {
        w.set_indent(d, 0);
    });
    assert!(patch.is_empty());
    assert_eq!(markup::stringify(&doc), before);
    assert_eq!(doc.version(), 0);
}

#[test]
fn version_bumps_once_per_effective_transaction() {
    let mut doc = doc("* a\n");
    assert_eq!(doc.version(), 0);
    let a = block_at(&doc, 0);
    doc.apply(Cmd::SetListStyle {
        id: a,
        style: Some("square".into()),
    });
    assert_eq!(doc.version(), 1);
    doc.apply(Cmd::SetListStyle {
        id: a,
        style: Some("square".into()),
    });
    assert_eq!(doc.version(), 1);
}

#[test]
fn moved_nested_item_to_document_start_clamps_to_zero() {
    let mut doc = doc("* a\n  * b\n");
    let b = block_at(&doc, 1);
    doc.apply(Cmd::MoveBlock { id: b, to: 0 });
    assert_eq!(indents(&doc), [Some(0), Some(0)]);
}
