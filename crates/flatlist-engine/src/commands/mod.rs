//! Structural list commands.
//!
//! Each command expands its target ids to whole logical items, plans the
//! writer operations against the pre-edit document, and applies them in
//! one batch. Commands never repair invariants themselves; anything they
//! leave inconsistent is the post-fixer's to settle within the same
//! transaction.

use std::collections::BTreeSet;

use crate::model::{Block, BlockId, BlockKind, ListAttrs, ListType, Writer};
use crate::query;
use crate::walker::{ListWalker, WalkerOptions};

/// One structural edit, applied via [`crate::model::Document::apply`].
#[derive(Debug, Clone)]
pub enum Cmd {
    InsertBlocks { at: usize, blocks: Vec<Block> },
    RemoveBlock { id: BlockId },
    MoveBlock { id: BlockId, to: usize },
    /// Change a block's kind; list attributes on a kind the schema
    /// rejects are stripped by the post-fixer.
    Rename { id: BlockId, kind: BlockKind },
    /// Turn the targeted blocks into list items of `kind`, or retype
    /// them when they already are items.
    ApplyListType { ids: Vec<BlockId>, kind: ListType },
    /// Remove list attributes from the targeted items.
    RemoveList { ids: Vec<BlockId> },
    /// Nest the targeted items one level deeper. No-op when the first
    /// targeted item has no preceding sibling to nest under.
    Indent { ids: Vec<BlockId> },
    /// Lift the targeted items one level; top-level items leave the
    /// list.
    Outdent { ids: Vec<BlockId> },
    SetListStyle { id: BlockId, style: Option<String> },
    /// No-op on list types without ordinal semantics.
    SetListStart { id: BlockId, start: Option<u64> },
    /// No-op on list types without ordinal semantics.
    SetListReversed { id: BlockId, reversed: Option<bool> },
    SetCustomAttr {
        id: BlockId,
        name: String,
        value: Option<String>,
    },
    /// Make `id` the first block of a new item; the rest of its item
    /// follows it under the new id.
    SplitItemBefore { id: BlockId },
    /// Split the item so that blocks after `id` form a new item.
    SplitItemAfter { id: BlockId },
}

pub(crate) fn run(writer: &mut Writer<'_>, cmd: Cmd) {
    match cmd {
        Cmd::InsertBlocks { at, blocks } => {
            writer.insert_many(at, blocks);
        }
        Cmd::RemoveBlock { id } => {
            writer.remove(id);
        }
        Cmd::MoveBlock { id, to } => {
            writer.move_to(id, to);
        }
        Cmd::Rename { id, kind } => {
            writer.rename(id, kind);
        }
        Cmd::ApplyListType { ids, kind } => apply_list_type(writer, &ids, kind),
        Cmd::RemoveList { ids } => remove_list(writer, &ids),
        Cmd::Indent { ids } => indent(writer, &ids),
        Cmd::Outdent { ids } => outdent(writer, &ids),
        Cmd::SetListStyle { id, style } => {
            writer.set_style(id, style);
        }
        Cmd::SetListStart { id, start } => {
            if supports_ordinal(writer, id) {
                writer.set_start(id, start);
            }
        }
        Cmd::SetListReversed { id, reversed } => {
            if supports_ordinal(writer, id) {
                writer.set_reversed(id, reversed);
            }
        }
        Cmd::SetCustomAttr { id, name, value } => {
            writer.set_custom(id, &name, value);
        }
        Cmd::SplitItemBefore { id } => split_item(writer, id, true),
        Cmd::SplitItemAfter { id } => split_item(writer, id, false),
    }
}

fn supports_ordinal(writer: &Writer<'_>, id: BlockId) -> bool {
    writer
        .document()
        .get(id)
        .and_then(|block| block.attrs())
        .is_some_and(|attrs| attrs.kind.supports_ordinal())
}

/// Target ids resolved to positions, expanded to whole logical items.
fn expanded_positions(writer: &Writer<'_>, ids: &[BlockId]) -> Vec<usize> {
    let doc = writer.document();
    let positions: Vec<usize> = ids.iter().filter_map(|&id| doc.position_of(id)).collect();
    query::expand_to_whole_items(doc, &positions)
}

fn apply_list_type(writer: &mut Writer<'_>, ids: &[BlockId], kind: ListType) {
    enum Target {
        Retype(BlockId),
        Convert(BlockId),
    }
    let plan: Vec<Target> = {
        let doc = writer.document();
        expanded_positions(writer, ids)
            .into_iter()
            .filter_map(|pos| doc.at(pos))
            .filter_map(|(id, block)| {
                if block.is_list_block() {
                    Some(Target::Retype(id))
                } else if doc.schema().can_host_list(&block.kind) {
                    Some(Target::Convert(id))
                } else {
                    None
                }
            })
            .collect()
    };
    for target in plan {
        match target {
            Target::Retype(id) => {
                writer.set_list_type(id, kind.clone());
            }
            Target::Convert(id) => {
                // Each converted block becomes its own single-block item.
                let item_id = writer.fresh_item_id();
                writer.set_list_attrs(id, ListAttrs::new(item_id, kind.clone(), 0));
            }
        }
    }
}

fn remove_list(writer: &mut Writer<'_>, ids: &[BlockId]) {
    let plan: Vec<BlockId> = {
        let doc = writer.document();
        expanded_positions(writer, ids)
            .into_iter()
            .filter_map(|pos| doc.at(pos))
            .filter(|(_, block)| block.is_list_block())
            .map(|(id, _)| id)
            .collect()
    };
    for id in plan {
        writer.clear_list(id);
    }
}

/// Selected item positions plus every block nested under them, with the
/// current indent of each list block.
fn with_nested(writer: &Writer<'_>, ids: &[BlockId]) -> Vec<(BlockId, u32)> {
    let doc = writer.document();
    let selected = expanded_positions(writer, ids);
    let mut all: BTreeSet<usize> = selected.iter().copied().collect();
    for &pos in &selected {
        all.extend(query::nested_blocks(doc, pos).iter().copied());
    }
    all.into_iter()
        .filter_map(|pos| doc.at(pos))
        .filter_map(|(id, block)| block.attrs().map(|attrs| (id, attrs.indent)))
        .collect()
}

fn indent(writer: &mut Writer<'_>, ids: &[BlockId]) {
    let plan: Vec<(BlockId, u32)> = {
        let doc = writer.document();
        let selected = expanded_positions(writer, ids);
        let Some(&first) = selected.first() else {
            return;
        };
        // Nothing to nest under without a preceding same-indent sibling.
        if ListWalker::first(doc, first, WalkerOptions::backward().same_indent()).is_none() {
            return;
        }
        with_nested(writer, ids)
    };
    for (id, indent) in plan {
        writer.set_indent(id, indent + 1);
    }
}

fn outdent(writer: &mut Writer<'_>, ids: &[BlockId]) {
    let plan = with_nested(writer, ids);
    for (id, indent) in plan {
        match indent.checked_sub(1) {
            Some(indent) => {
                writer.set_indent(id, indent);
            }
            None => {
                writer.clear_list(id);
            }
        }
    }
}

fn split_item(writer: &mut Writer<'_>, id: BlockId, before: bool) {
    let targets: Vec<BlockId> = {
        let doc = writer.document();
        let Some(pos) = doc.position_of(id) else {
            return;
        };
        if before && query::is_first_block_of_item(doc, pos) {
            return;
        }
        if !before && query::is_last_block_of_item(doc, pos) {
            return;
        }
        let cut = if before { pos } else { pos + 1 };
        query::item_blocks(doc, pos)
            .into_iter()
            .filter(|&p| p >= cut)
            .filter_map(|p| doc.at(p).map(|(block_id, _)| block_id))
            .collect()
    };
    if targets.is_empty() {
        return;
    }
    let fresh = writer.fresh_item_id();
    for target in targets {
        writer.set_item_id(target, fresh.clone());
    }
}
