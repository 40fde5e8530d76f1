//! Attribute propagation and re-rendering classification.
//!
//! Hosts describe how list attributes render by registering
//! [`DowncastStrategy`] values keyed by `(scope, attribute)`. The scope
//! names the set of blocks an attribute value must stay consistent
//! across: the whole logical list, one logical item, or the item's
//! marker. After every transaction [`mirror`] copies a changed strategy
//! attribute onto the rest of its scope, and [`classify`] sorts the
//! surviving blocks into "patch in place" versus "reconvert from
//! scratch" using per-block fingerprints captured before the edit.

use std::collections::{HashMap, HashSet};

use thiserror::Error;

use crate::model::{AttrName, BlockId, BlockKind, Change, Document, ListAttrs};
use crate::query;

/// Block set an attribute value spans.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StrategyScope {
    /// Every block of the logical list (same indent, same type,
    /// uninterrupted).
    List,
    /// Every block of one logical item.
    Item,
    /// The item's marker; rendered on the item's first block only.
    ItemMarker,
}

/// Host hook describing one downcast-relevant list attribute.
pub trait DowncastStrategy {
    fn scope(&self) -> StrategyScope;
    fn attribute(&self) -> AttrName;

    /// True when the attribute changes the marker's wrapping element,
    /// forcing reconversion instead of an in-place patch.
    fn can_wrap(&self) -> bool {
        false
    }
}

/// Plain data strategy; covers every built-in attribute and most host
/// extensions.
#[derive(Debug, Clone)]
pub struct AttrStrategy {
    scope: StrategyScope,
    attribute: AttrName,
    wraps: bool,
}

impl AttrStrategy {
    pub fn new(scope: StrategyScope, attribute: AttrName) -> Self {
        Self {
            scope,
            attribute,
            wraps: false,
        }
    }

    /// Marker strategy whose value wraps the marker in an extra element.
    pub fn wrapping(scope: StrategyScope, attribute: AttrName) -> Self {
        Self {
            scope,
            attribute,
            wraps: true,
        }
    }
}

impl DowncastStrategy for AttrStrategy {
    fn scope(&self) -> StrategyScope {
        self.scope
    }

    fn attribute(&self) -> AttrName {
        self.attribute.clone()
    }

    fn can_wrap(&self) -> bool {
        self.wraps
    }
}

#[derive(Debug, Error)]
pub enum StrategyError {
    #[error("duplicate downcast strategy for {scope:?}/{attribute}")]
    Duplicate {
        scope: StrategyScope,
        attribute: AttrName,
    },
}

/// Registered strategies, one per `(scope, attribute)` pair.
pub struct DowncastRegistry {
    strategies: Vec<Box<dyn DowncastStrategy>>,
}

impl DowncastRegistry {
    pub fn new() -> Self {
        Self {
            strategies: Vec::new(),
        }
    }

    /// Registry pre-loaded with the list-properties attributes.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        for attribute in [AttrName::Style, AttrName::Start, AttrName::Reversed] {
            registry
                .register(Box::new(AttrStrategy::new(StrategyScope::List, attribute)))
                .expect("builtins are distinct");
        }
        registry
    }

    pub fn register(&mut self, strategy: Box<dyn DowncastStrategy>) -> Result<(), StrategyError> {
        let scope = strategy.scope();
        let attribute = strategy.attribute();
        if self
            .strategies
            .iter()
            .any(|s| s.scope() == scope && s.attribute() == attribute)
        {
            return Err(StrategyError::Duplicate { scope, attribute });
        }
        self.strategies.push(strategy);
        Ok(())
    }

    pub(crate) fn all(&self) -> impl Iterator<Item = &dyn DowncastStrategy> {
        self.strategies.iter().map(|s| s.as_ref())
    }

    pub(crate) fn strategies_for<'a>(
        &'a self,
        name: &'a AttrName,
    ) -> impl Iterator<Item = &'a dyn DowncastStrategy> {
        self.strategies
            .iter()
            .filter(move |s| s.attribute() == *name)
            .map(|s| s.as_ref())
    }
}

impl Default for DowncastRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

/// Per-block rendering identity captured before an edit. Any difference
/// afterwards means the block's converted structure is stale and must be
/// rebuilt rather than patched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Fingerprint {
    kind: BlockKind,
    listing: Option<ListKey>,
    first_of_item: bool,
    last_of_item: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct ListKey {
    item_id: String,
    kind: String,
    indent: u32,
}

pub(crate) fn fingerprint_all(doc: &Document) -> HashMap<BlockId, Fingerprint> {
    let mut out = HashMap::with_capacity(doc.len());
    for pos in 0..doc.len() {
        let Some((id, block)) = doc.at(pos) else {
            continue;
        };
        let listing = block.attrs().map(|attrs| ListKey {
            item_id: attrs.item_id.clone(),
            kind: attrs.kind.as_str().to_string(),
            indent: attrs.indent,
        });
        let (first_of_item, last_of_item) = if listing.is_some() {
            (
                query::is_first_block_of_item(doc, pos),
                query::is_last_block_of_item(doc, pos),
            )
        } else {
            (false, false)
        };
        out.insert(
            id,
            Fingerprint {
                kind: block.kind.clone(),
                listing,
                first_of_item,
                last_of_item,
            },
        );
    }
    out
}

#[derive(Clone)]
enum MirrorVal {
    Style(Option<String>),
    Start(Option<u64>),
    Reversed(Option<bool>),
    Custom(String, Option<String>),
}

fn read_value(name: &AttrName, attrs: &ListAttrs) -> Option<MirrorVal> {
    match name {
        AttrName::Style => Some(MirrorVal::Style(attrs.style.clone())),
        AttrName::Start => Some(MirrorVal::Start(attrs.start)),
        AttrName::Reversed => Some(MirrorVal::Reversed(attrs.reversed)),
        AttrName::Custom(key) => {
            Some(MirrorVal::Custom(key.clone(), attrs.extra.get(key).cloned()))
        }
        AttrName::ItemId | AttrName::Type | AttrName::Indent => None,
    }
}

/// Copies each changed strategy attribute onto the rest of its scope,
/// and settles blocks that joined an item or list structurally onto the
/// values already established there.
///
/// Structural joins adopt from the earliest block of the scope that was
/// not itself part of the join, falling back to the scope head when the
/// whole scope is new. Values are planned against the settled document
/// and written in one batch afterwards; siblings already holding a value
/// record nothing, so mirroring reaches a fixed point in a single sweep.
/// Explicit attribute changes are planned last and override adoption.
pub(crate) fn mirror(doc: &mut Document, changes: &[Change], out: &mut Vec<Change>) {
    let mut seen: HashSet<(BlockId, AttrName)> = HashSet::new();
    let mut writes: Vec<(BlockId, MirrorVal)> = Vec::new();

    // Blocks that landed in an item or list without an explicit
    // strategy-attribute write: pasted, moved, or merged via an item id
    // write.
    let mut joined: Vec<BlockId> = Vec::new();
    let mut joined_set: HashSet<BlockId> = HashSet::new();
    for change in changes {
        let id = match change {
            Change::Inserted { id } | Change::Moved { id, .. } => *id,
            Change::Attribute { id, name } if *name == AttrName::ItemId => *id,
            _ => continue,
        };
        if joined_set.insert(id) {
            joined.push(id);
        }
    }
    let mut planned: HashSet<(BlockId, AttrName)> = HashSet::new();
    for &id in &joined {
        let Some(pos) = doc.position_of(id) else {
            continue;
        };
        if doc.at(pos).is_none_or(|(_, block)| !block.is_list_block()) {
            continue;
        }
        for strategy in doc.strategies().all() {
            let attribute = strategy.attribute();
            let targets = match strategy.scope() {
                StrategyScope::List => query::logical_list_blocks(doc, pos),
                StrategyScope::Item | StrategyScope::ItemMarker => query::item_blocks(doc, pos),
            };
            let source = targets
                .iter()
                .copied()
                .find(|&p| doc.at(p).is_some_and(|(tid, _)| !joined_set.contains(&tid)))
                .or_else(|| targets.first().copied());
            let Some(source) = source else {
                continue;
            };
            let Some(attrs) = doc.at(source).and_then(|(_, block)| block.attrs()) else {
                continue;
            };
            let Some(value) = read_value(&attribute, attrs) else {
                continue;
            };
            for &target in &targets {
                if target == source {
                    continue;
                }
                if let Some((target_id, _)) = doc.at(target) {
                    if planned.insert((target_id, attribute.clone())) {
                        writes.push((target_id, value.clone()));
                    }
                }
            }
        }
    }

    for change in changes {
        let Change::Attribute { id, name } = change else {
            continue;
        };
        if matches!(name, AttrName::ItemId | AttrName::Type | AttrName::Indent) {
            continue;
        }
        if !seen.insert((*id, name.clone())) {
            continue;
        }
        let Some(pos) = doc.position_of(*id) else {
            continue;
        };
        let Some(attrs) = doc.at(pos).and_then(|(_, block)| block.attrs()) else {
            continue;
        };
        let Some(value) = read_value(name, attrs) else {
            continue;
        };
        for strategy in doc.strategies().strategies_for(name) {
            let targets = match strategy.scope() {
                StrategyScope::List => query::logical_list_blocks(doc, pos),
                StrategyScope::Item | StrategyScope::ItemMarker => query::item_blocks(doc, pos),
            };
            for target in targets {
                if target == pos {
                    continue;
                }
                if let Some((target_id, _)) = doc.at(target) {
                    writes.push((target_id, value.clone()));
                }
            }
        }
    }

    if writes.is_empty() {
        return;
    }
    let mut mirrored = Vec::new();
    {
        let mut writer = doc.internal_writer(&mut mirrored);
        for (id, value) in writes {
            match value {
                MirrorVal::Style(style) => {
                    writer.set_style(id, style);
                }
                MirrorVal::Start(start) => {
                    writer.set_start(id, start);
                }
                MirrorVal::Reversed(reversed) => {
                    writer.set_reversed(id, reversed);
                }
                MirrorVal::Custom(key, value) => {
                    writer.set_custom(id, &key, value);
                }
            }
        }
    }
    out.extend(mirrored);
}

/// Splits the transaction's effect into blocks the host must reconvert
/// and blocks it may patch attribute-by-attribute. Both lists come back
/// in document order; removed blocks appear in neither.
pub(crate) fn classify(
    doc: &Document,
    before: &HashMap<BlockId, Fingerprint>,
    changes: &[Change],
) -> (Vec<BlockId>, Vec<(BlockId, Vec<AttrName>)>) {
    let after = fingerprint_all(doc);

    let mut reconvert: HashSet<BlockId> = HashSet::new();
    for (&id, fingerprint) in &after {
        if before.get(&id) != Some(fingerprint) {
            reconvert.insert(id);
        }
    }
    for change in changes {
        match change {
            Change::Moved { id, .. } if doc.contains(*id) => {
                reconvert.insert(*id);
            }
            Change::Attribute { id, name } if doc.contains(*id) => {
                let wraps = doc
                    .strategies()
                    .strategies_for(name)
                    .any(|s| s.scope() == StrategyScope::ItemMarker && s.can_wrap());
                if wraps {
                    reconvert.insert(*id);
                }
            }
            _ => {}
        }
    }

    let mut patched: HashMap<BlockId, Vec<AttrName>> = HashMap::new();
    for change in changes {
        let Change::Attribute { id, name } = change else {
            continue;
        };
        if reconvert.contains(id) || !doc.contains(*id) {
            continue;
        }
        if matches!(name, AttrName::ItemId | AttrName::Type | AttrName::Indent) {
            continue;
        }
        let names = patched.entry(*id).or_default();
        if !names.contains(name) {
            names.push(name.clone());
        }
    }

    let position = |id: BlockId| doc.position_of(id).unwrap_or(usize::MAX);
    let mut reconvert: Vec<BlockId> = reconvert.into_iter().collect();
    reconvert.sort_by_key(|&id| position(id));
    let mut patched: Vec<(BlockId, Vec<AttrName>)> = patched.into_iter().collect();
    patched.sort_by_key(|&(id, _)| position(id));
    (reconvert, patched)
}
