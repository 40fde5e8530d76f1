//! The consistency engine.
//!
//! After every transaction the document is re-settled: list attributes
//! are stripped from kinds the schema rejects, indent jumps are clamped
//! to `preceding list block + 1`, and `listItemId` continuity is
//! repaired so an id never reappears within one contiguous list run
//! after being interrupted.
//!
//! Instead of re-entrant change events this is an explicit work-list:
//! the caller loops `fix` until it reports no changes, seeding each pass
//! with the previous pass's output. Fixes are planned against a
//! simulated view of the run first and applied through the writer in
//! one go, so planning never iterates over a sequence it is mutating.
//!
//! Two chain scopes matter and differ deliberately:
//! - the indent clamp chain follows the *nearest preceding list block*,
//!   skipping plain blocks, so inserting a paragraph into a list does
//!   not by itself reindent what follows;
//! - id continuity is scoped to one contiguous run of list blocks, so
//!   ids may legitimately repeat across lists separated by plain
//!   content.

use std::collections::{BTreeSet, HashSet};

use crate::model::{BlockId, Change, Document, ListType};

/// Hard cap on fix passes. Fixes are local and monotonic, so two passes
/// settle any input; the cap turns a logic error into a bounded loop
/// instead of a hang.
pub(crate) const MAX_FIX_PASSES: usize = 4;

enum FixOp {
    /// Downgrade to plain: the kind cannot host list attributes.
    Strip(BlockId),
    SetIndent(BlockId, u32),
    /// All listed blocks get one shared fresh item id.
    Reassign(Vec<BlockId>),
}

/// Surviving list block in the planning view, with its post-clamp indent.
struct Entry {
    id: BlockId,
    item_id: String,
    kind: ListType,
    eff_indent: u32,
}

/// One fix pass: plans and applies fixes for the region touched by
/// `seeds`, appending resulting change records to `out`.
pub(crate) fn fix(doc: &mut Document, seeds: &[Change], out: &mut Vec<Change>) {
    let Some((region_start, region_end)) = candidate_bounds(doc, seeds) else {
        return;
    };

    // Start at the head of the contiguous list run containing the first
    // touched position, so the id seen-set covers the whole run.
    let mut start = region_start;
    if is_list_block(doc, start) {
        while start > 0 && is_list_block(doc, start - 1) {
            start -= 1;
        }
    }
    let mut prev_indent = nearest_list_indent_before(doc, start);

    let mut ops = Vec::new();
    let mut segment: Vec<Entry> = Vec::new();
    let mut segment_dirty = false;
    let mut pos = start;
    loop {
        let Some((id, block)) = doc.at(pos) else {
            break;
        };
        let Some(attrs) = block.attrs() else {
            plan_ids(&segment, &mut ops);
            segment.clear();
            // Beyond the touched region a clean segment cannot affect
            // anything that follows.
            if pos > region_end && !segment_dirty {
                break;
            }
            segment_dirty = false;
            pos += 1;
            continue;
        };

        if !doc.schema().can_host_list(&block.kind) {
            ops.push(FixOp::Strip(id));
            // The block becomes plain: it splits the id run but leaves
            // the indent chain untouched.
            plan_ids(&segment, &mut ops);
            segment.clear();
            pos += 1;
            continue;
        }

        let max_allowed = prev_indent.map_or(0, |indent| indent + 1);
        let eff_indent = attrs.indent.min(max_allowed);
        if eff_indent != attrs.indent {
            ops.push(FixOp::SetIndent(id, eff_indent));
            segment_dirty = true;
        }
        prev_indent = Some(eff_indent);
        segment.push(Entry {
            id,
            item_id: attrs.item_id.clone(),
            kind: attrs.kind.clone(),
            eff_indent,
        });
        pos += 1;
    }
    plan_ids(&segment, &mut ops);

    apply(doc, ops, out);
}

/// Positions a pass must examine, derived from the change records. Each
/// touched block implicates its follower; removals and moves implicate
/// the surviving neighbors of the gap.
fn candidate_bounds(doc: &Document, seeds: &[Change]) -> Option<(usize, usize)> {
    let mut candidates = BTreeSet::new();
    let mut add = |id: BlockId, candidates: &mut BTreeSet<usize>| {
        if let Some(pos) = doc.position_of(id) {
            candidates.insert(pos);
            if pos + 1 < doc.len() {
                candidates.insert(pos + 1);
            }
        }
    };
    for change in seeds {
        match change {
            Change::Inserted { id }
            | Change::Renamed { id }
            | Change::Attribute { id, .. } => add(*id, &mut candidates),
            Change::Removed { prev, next } => {
                if let Some(prev) = prev {
                    add(*prev, &mut candidates);
                }
                if let Some(next) = next {
                    add(*next, &mut candidates);
                }
            }
            Change::Moved {
                id,
                old_prev,
                old_next,
            } => {
                add(*id, &mut candidates);
                if let Some(prev) = old_prev {
                    add(*prev, &mut candidates);
                }
                if let Some(next) = old_next {
                    add(*next, &mut candidates);
                }
            }
        }
    }
    let first = *candidates.first()?;
    let last = *candidates.last()?;
    Some((first, last))
}

fn is_list_block(doc: &Document, pos: usize) -> bool {
    doc.at(pos).is_some_and(|(_, block)| block.is_list_block())
}

/// Indent of the nearest list block strictly before `pos`, skipping any
/// plain blocks in between.
fn nearest_list_indent_before(doc: &Document, pos: usize) -> Option<u32> {
    (0..pos)
        .rev()
        .find_map(|p| doc.at(p).and_then(|(_, block)| block.attrs()))
        .map(|attrs| attrs.indent)
}

/// Id continuity repair over one contiguous run of list blocks.
///
/// Walks each unvisited item forward (skipping deeper nested content),
/// regenerates the id when it was already claimed earlier in the run,
/// and splits off a fresh id whenever `listType` changes mid-item.
/// Earlier document position keeps identity; later positions regenerate.
fn plan_ids(segment: &[Entry], ops: &mut Vec<FixOp>) {
    let mut visited = vec![false; segment.len()];
    let mut seen: HashSet<&str> = HashSet::new();

    for i in 0..segment.len() {
        if visited[i] {
            continue;
        }
        let anchor_indent = segment[i].eff_indent;
        let original_id = segment[i].item_id.as_str();
        let mut cur_type = &segment[i].kind;
        let mut groups: Vec<Vec<BlockId>> = vec![Vec::new()];

        let mut j = i;
        while j < segment.len() {
            let entry = &segment[j];
            if entry.eff_indent > anchor_indent {
                // Nested content belongs to other items.
                j += 1;
                continue;
            }
            if entry.eff_indent < anchor_indent || entry.item_id != original_id {
                break;
            }
            visited[j] = true;
            if entry.kind != *cur_type {
                cur_type = &entry.kind;
                groups.push(Vec::new());
            }
            groups
                .last_mut()
                .expect("groups starts non-empty")
                .push(entry.id);
            j += 1;
        }

        let reappeared = !seen.insert(original_id);
        let mut groups = groups.into_iter();
        let head_group = groups.next().expect("groups starts non-empty");
        if reappeared {
            ops.push(FixOp::Reassign(head_group));
        }
        for group in groups {
            ops.push(FixOp::Reassign(group));
        }
    }
}

fn apply(doc: &mut Document, ops: Vec<FixOp>, out: &mut Vec<Change>) {
    if ops.is_empty() {
        return;
    }
    let mut changes = Vec::new();
    {
        let mut writer = doc.internal_writer(&mut changes);
        for op in ops {
            match op {
                FixOp::Strip(id) => {
                    writer.clear_list(id);
                }
                FixOp::SetIndent(id, indent) => {
                    writer.set_indent(id, indent);
                }
                FixOp::Reassign(ids) => {
                    let fresh = writer.fresh_item_id();
                    for id in ids {
                        writer.set_item_id(id, fresh.clone());
                    }
                }
            }
        }
    }
    out.extend(changes);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Block, BlockKind, ListAttrs};

    fn item(text: &str, id: &str, indent: u32) -> Block {
        Block::item(text, ListAttrs::new(id, ListType::bulleted(), indent))
    }

    fn indents(doc: &Document) -> Vec<Option<u32>> {
        doc.blocks()
            .map(|(_, b)| b.attrs().map(|a| a.indent))
            .collect()
    }

    #[test]
    fn first_list_block_clamps_to_zero() {
        let mut doc = Document::new();
        doc.change(|w| {
            w.insert(0, item("a", "x", 3));
        });
        assert_eq!(indents(&doc), [Some(0)]);
    }

    #[test]
    fn clamp_cascades_forward() {
        let mut doc = Document::new();
        doc.change(|w| {
            w.insert_many(
                0,
                vec![item("a", "a", 0), item("b", "b", 4), item("c", "c", 5)],
            );
        });
        // b clamps to 1, which still admits c at 2.
        assert_eq!(indents(&doc), [Some(0), Some(1), Some(2)]);
    }

    #[test]
    fn indent_chain_skips_plain_blocks() {
        let mut doc = Document::new();
        doc.change(|w| {
            w.insert_many(
                0,
                vec![
                    item("a", "a", 0),
                    item("b", "b", 1),
                    Block::paragraph("gap"),
                    item("c", "c", 2),
                ],
            );
        });
        // The nearest preceding list block (b, indent 1) admits c at 2.
        assert_eq!(indents(&doc), [Some(0), Some(1), None, Some(2)]);
    }

    #[test]
    fn id_runs_are_broken_by_plain_blocks() {
        let mut doc = Document::new();
        doc.change(|w| {
            w.insert_many(
                0,
                vec![item("a", "x", 0), Block::paragraph("gap"), item("b", "x", 0)],
            );
        });
        // Separate lists may reuse an id.
        let ids: Vec<_> = doc
            .blocks()
            .filter_map(|(_, b)| b.attrs().map(|a| a.item_id.clone()))
            .collect();
        assert_eq!(ids, ["x", "x"]);
    }

    #[test]
    fn reappearing_id_within_run_regenerates_later_item() {
        let mut doc = Document::new();
        doc.set_id_source(sequential_ids());
        doc.change(|w| {
            w.insert_many(
                0,
                vec![item("a", "x", 0), item("b", "y", 0), item("c", "x", 0)],
            );
        });
        let ids: Vec<_> = doc
            .blocks()
            .filter_map(|(_, b)| b.attrs().map(|a| a.item_id.clone()))
            .collect();
        assert_eq!(ids, ["x", "y", "fix-0"]);
    }

    #[test]
    fn settled_document_re_settles_to_nothing() {
        let mut doc = Document::new();
        let mut id = None;
        doc.change(|w| {
            w.insert_many(0, vec![item("a", "a", 0), item("b", "b", 1)]);
            id = Some(w.insert(2, item("c", "c", 2)));
        });
        // Re-touch a block with a no-op batch worth of real writes.
        let patch = doc.change(|w| {
            w.set_indent(id.unwrap(), 2);
        });
        assert!(patch.is_empty());
    }

    #[test]
    fn rename_to_non_capable_kind_strips_attributes() {
        let mut doc = Document::new();
        let mut id = None;
        doc.change(|w| {
            id = Some(w.insert(0, item("a", "x", 0)));
        });
        let id = id.unwrap();
        doc.change(|w| {
            w.rename(id, BlockKind::ThematicBreak);
        });
        let block = doc.get(id).unwrap();
        assert!(!block.is_list_block());
        assert_eq!(block.text, "a");
        assert_eq!(block.kind, BlockKind::ThematicBreak);
    }

    pub(super) fn sequential_ids() -> impl FnMut() -> String {
        let mut n = 0u32;
        move || {
            let id = format!("fix-{n}");
            n += 1;
            id
        }
    }
}
