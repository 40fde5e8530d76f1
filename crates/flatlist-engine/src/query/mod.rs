//! Pure query functions over the flat sequence, all built on
//! [`ListWalker`]. Positions are document-order indexes; callers holding
//! a [`BlockId`](crate::model::BlockId) go through
//! [`Document::position_of`](crate::model::Document::position_of).

use std::collections::BTreeSet;

use crate::model::{AttrName, Document};
use crate::walker::{ListWalker, WalkerOptions};

/// True iff no earlier adjacent block belongs to the same logical item.
///
/// Plain blocks are not part of any item and report false.
pub fn is_first_block_of_item(doc: &Document, pos: usize) -> bool {
    let Some((_, block)) = doc.at(pos) else {
        return false;
    };
    if !block.is_list_block() {
        return false;
    }
    ListWalker::first(
        doc,
        pos,
        WalkerOptions::backward()
            .same_indent()
            .same_attributes([AttrName::ItemId, AttrName::Type]),
    )
    .is_none()
}

/// Forward counterpart of [`is_first_block_of_item`].
pub fn is_last_block_of_item(doc: &Document, pos: usize) -> bool {
    let Some((_, block)) = doc.at(pos) else {
        return false;
    };
    if !block.is_list_block() {
        return false;
    }
    ListWalker::first(
        doc,
        pos,
        WalkerOptions::forward()
            .same_indent()
            .same_attributes([AttrName::ItemId, AttrName::Type]),
    )
    .is_none()
}

/// All blocks of the logical item containing `pos`, in document order,
/// inclusive of `pos`. Empty for plain blocks.
pub fn item_blocks(doc: &Document, pos: usize) -> Vec<usize> {
    let Some((_, block)) = doc.at(pos) else {
        return Vec::new();
    };
    if !block.is_list_block() {
        return Vec::new();
    }
    let same_item = [AttrName::ItemId];
    let mut out: Vec<usize> = ListWalker::new(
        doc,
        pos,
        WalkerOptions::backward()
            .same_indent()
            .same_attributes(same_item.clone()),
    )
    .map(|(p, _)| p)
    .collect();
    out.reverse();
    out.push(pos);
    out.extend(
        ListWalker::new(
            doc,
            pos,
            WalkerOptions::forward()
                .same_indent()
                .same_attributes(same_item),
        )
        .map(|(p, _)| p),
    );
    out
}

/// Expands an arbitrary set of positions (e.g. selection-derived) to the
/// complete logical items they touch, de-duplicated, in document order.
pub fn expand_to_whole_items(doc: &Document, positions: &[usize]) -> Vec<usize> {
    let mut out = BTreeSet::new();
    for &pos in positions {
        let item = item_blocks(doc, pos);
        if item.is_empty() {
            // Plain blocks stay as themselves.
            if doc.at(pos).is_some() {
                out.insert(pos);
            }
        } else {
            out.extend(item);
        }
    }
    out.into_iter().collect()
}

/// Deeper-indent blocks that logically hang under the item block at
/// `pos` and must travel with it on indent/outdent or move.
pub fn nested_blocks(doc: &Document, pos: usize) -> Vec<usize> {
    ListWalker::new(doc, pos, WalkerOptions::forward().higher_indent())
        .map(|(p, _)| p)
        .collect()
}

/// All blocks of the logical list containing `pos`: the maximal
/// same-indent run continuing the same `listType`, in document order.
pub fn logical_list_blocks(doc: &Document, pos: usize) -> Vec<usize> {
    let Some((_, block)) = doc.at(pos) else {
        return Vec::new();
    };
    if !block.is_list_block() {
        return Vec::new();
    }
    let same_type = [AttrName::Type];
    let mut out: Vec<usize> = ListWalker::new(
        doc,
        pos,
        WalkerOptions::backward()
            .same_indent()
            .same_attributes(same_type.clone()),
    )
    .map(|(p, _)| p)
    .collect();
    out.reverse();
    out.push(pos);
    out.extend(
        ListWalker::new(
            doc,
            pos,
            WalkerOptions::forward()
                .same_indent()
                .same_attributes(same_type),
        )
        .map(|(p, _)| p),
    );
    out
}
