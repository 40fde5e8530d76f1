//! Attribute propagation across list/item scopes and the resulting
//! patch-versus-reconvert classification.

use flatlist_engine::{
    AttrName, AttrStrategy, Block, BlockId, Cmd, Document, ListAttrs, ListType, StrategyError,
    StrategyScope,
};
use pretty_assertions::assert_eq;

fn doc(markup_text: &str) -> Document {
    Document::from_markup(markup_text).expect("valid fixture")
}

fn block_at(doc: &Document, pos: usize) -> BlockId {
    doc.at(pos).expect("position in range").0
}

fn styles(doc: &Document) -> Vec<Option<String>> {
    doc.blocks()
        .map(|(_, b)| b.attrs().and_then(|a| a.style.clone()))
        .collect()
}

#[test]
fn style_set_on_one_item_covers_the_whole_logical_list() {
    let mut doc = doc("* a\n* b\n* c\n");
    let b = block_at(&doc, 1);
    let patch = doc.apply(Cmd::SetListStyle {
        id: b,
        style: Some("square".into()),
    });
    assert_eq!(
        styles(&doc),
        vec![Some("square".into()); 3]
    );
    assert!(patch.reconvert.is_empty());
    assert_eq!(patch.patched.len(), 3);
    for (_, names) in &patch.patched {
        assert_eq!(names, &[AttrName::Style]);
    }
}

#[test]
fn clearing_a_style_propagates_the_absence() {
    let mut doc = doc("* a {style:square}\n* b {style:square}\n");
    let a = block_at(&doc, 0);
    doc.apply(Cmd::SetListStyle { id: a, style: None });
    assert_eq!(styles(&doc), [None, None]);
}

#[test]
fn propagation_stops_at_plain_content() {
    let mut doc = doc("* a\nplain\n* b\n");
    let a = block_at(&doc, 0);
    doc.apply(Cmd::SetListStyle {
        id: a,
        style: Some("circle".into()),
    });
    assert_eq!(styles(&doc), [Some("circle".into()), None, None]);
}

#[test]
fn propagation_stops_at_a_type_boundary() {
    let mut doc = doc("* a\n# b\n");
    let a = block_at(&doc, 0);
    doc.apply(Cmd::SetListStyle {
        id: a,
        style: Some("circle".into()),
    });
    assert_eq!(styles(&doc), [Some("circle".into()), None]);
}

#[test]
fn nested_lists_are_separate_propagation_scopes() {
    let mut doc = doc("* a\n  * b\n* c\n");
    let a = block_at(&doc, 0);
    doc.apply(Cmd::SetListStyle {
        id: a,
        style: Some("disc".into()),
    });
    assert_eq!(styles(&doc), [Some("disc".into()), None, Some("disc".into())]);
}

#[test]
fn item_scope_strategy_covers_every_block_of_the_item() {
    let mut doc = doc("* a {id:x}\n  second\n* b\n");
    doc.register_strategy(Box::new(AttrStrategy::new(
        StrategyScope::Item,
        AttrName::Custom("listItemChecked".into()),
    )))
    .unwrap();
    let a = block_at(&doc, 0);
    doc.apply(Cmd::SetCustomAttr {
        id: a,
        name: "listItemChecked".into(),
        value: Some("true".into()),
    });
    let checked: Vec<_> = doc
        .blocks()
        .map(|(_, b)| {
            b.attrs()
                .and_then(|a| a.extra.get("listItemChecked").cloned())
        })
        .collect();
    assert_eq!(checked, [Some("true".into()), Some("true".into()), None]);
}

#[test]
fn block_pasted_into_a_styled_list_adopts_the_style() {
    let mut doc = doc("* a {id:x}\n  tail\n* b\n");
    let a = block_at(&doc, 0);
    doc.apply(Cmd::SetListStyle {
        id: a,
        style: Some("square".into()),
    });
    assert_eq!(styles(&doc), vec![Some("square".into()); 3]);

    // Pasting a bare block into the middle of item x must not leave a
    // style hole.
    doc.apply(Cmd::InsertBlocks {
        at: 1,
        blocks: vec![Block::item(
            "mid",
            ListAttrs::new("x", ListType::bulleted(), 0),
        )],
    });
    assert_eq!(styles(&doc), vec![Some("square".into()); 4]);
}

#[test]
fn block_pasted_at_the_item_head_adopts_the_settled_value() {
    let mut doc = doc("* a {id:x}\n");
    let a = block_at(&doc, 0);
    doc.apply(Cmd::SetListStyle {
        id: a,
        style: Some("circle".into()),
    });
    doc.apply(Cmd::InsertBlocks {
        at: 0,
        blocks: vec![Block::item(
            "first",
            ListAttrs::new("x", ListType::bulleted(), 0),
        )],
    });
    assert_eq!(styles(&doc), vec![Some("circle".into()); 2]);
}

#[test]
fn merging_a_block_into_an_item_adopts_item_scoped_values() {
    let mut doc = doc("* a {id:x}\n* b {id:y}\n");
    doc.register_strategy(Box::new(AttrStrategy::new(
        StrategyScope::Item,
        AttrName::Custom("listItemChecked".into()),
    )))
    .unwrap();
    let a = block_at(&doc, 0);
    let b = block_at(&doc, 1);
    doc.apply(Cmd::SetCustomAttr {
        id: a,
        name: "listItemChecked".into(),
        value: Some("true".into()),
    });
    assert_eq!(
        doc.get(b).unwrap().attrs().unwrap().extra.get("listItemChecked"),
        None
    );

    // Writing a's id onto b merges the items; b picks up what the item
    // already carries.
    doc.change(|w| {
        w.set_item_id(b, "x");
    });
    assert_eq!(
        doc.get(b)
            .unwrap()
            .attrs()
            .unwrap()
            .extra
            .get("listItemChecked"),
        Some(&"true".to_string())
    );
}

#[test]
fn unregistered_custom_attributes_do_not_propagate() {
    let mut doc = doc("* a\n* b\n");
    let a = block_at(&doc, 0);
    doc.apply(Cmd::SetCustomAttr {
        id: a,
        name: "private".into(),
        value: Some("1".into()),
    });
    let values: Vec<_> = doc
        .blocks()
        .map(|(_, b)| b.attrs().and_then(|a| a.extra.get("private").cloned()))
        .collect();
    assert_eq!(values, [Some("1".into()), None]);
}

#[test]
fn duplicate_scope_attribute_registration_fails() {
    let mut doc = Document::new();
    let err = doc
        .register_strategy(Box::new(AttrStrategy::new(
            StrategyScope::List,
            AttrName::Start,
        )))
        .unwrap_err();
    assert!(matches!(err, StrategyError::Duplicate { .. }));
    // The same attribute under a different scope is a distinct strategy.
    doc.register_strategy(Box::new(AttrStrategy::new(
        StrategyScope::Item,
        AttrName::Start,
    )))
    .unwrap();
}

#[test]
fn ordinal_attributes_require_an_ordinal_list_type() {
    let mut doc = doc("# a\n* b\n");
    let a = block_at(&doc, 0);
    let b = block_at(&doc, 1);
    doc.apply(Cmd::SetListStart { id: a, start: Some(3) });
    doc.apply(Cmd::SetListReversed {
        id: b,
        reversed: Some(true),
    });
    assert_eq!(doc.get(a).unwrap().attrs().unwrap().start, Some(3));
    assert_eq!(doc.get(b).unwrap().attrs().unwrap().reversed, None);
}

#[test]
fn indent_change_reconverts_rather_than_patches() {
    let mut doc = doc("* a\n* b\n");
    let b = block_at(&doc, 1);
    let patch = doc.apply(Cmd::Indent { ids: vec![b] });
    assert_eq!(patch.reconvert, [b]);
    assert!(patch.patched.is_empty());
}

#[test]
fn split_reconverts_both_sides_of_the_boundary() {
    let mut doc = doc("* a {id:x}\n  second\n");
    let second = block_at(&doc, 1);
    let patch = doc.apply(Cmd::SplitItemBefore { id: second });
    let a = block_at(&doc, 0);
    assert!(patch.reconvert.contains(&a));
    assert!(patch.reconvert.contains(&second));
}

#[test]
fn wrapping_marker_strategy_forces_reconversion() {
    let mut doc = doc("* a\n");
    doc.register_strategy(Box::new(AttrStrategy::wrapping(
        StrategyScope::ItemMarker,
        AttrName::Custom("listItemHighlight".into()),
    )))
    .unwrap();
    let a = block_at(&doc, 0);
    let patch = doc.apply(Cmd::SetCustomAttr {
        id: a,
        name: "listItemHighlight".into(),
        value: Some("mark".into()),
    });
    assert_eq!(patch.reconvert, [a]);
    assert!(patch.patched.is_empty());
}
