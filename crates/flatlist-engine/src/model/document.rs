use std::collections::HashMap;
use std::fmt;

use crate::downcast::{DowncastRegistry, DowncastStrategy, Fingerprint, StrategyError};
use crate::model::arena::Arena;
use crate::model::{AttrName, Block, BlockId, BlockKind, Change, ListAttrs, ListType, Patch, Schema};

type IdSource = Box<dyn FnMut() -> String>;

/// The flat, attributed block sequence and its edit pipeline.
///
/// All edits flow through one pipeline, mirroring the command/patch loop
/// of an editor core:
///
/// 1. a transaction callback performs writer operations, each recorded as
///    a [`Change`];
/// 2. the post-fixer re-establishes the list invariants over the touched
///    runs (bounded fixed-point, see [`crate::postfix`]);
/// 3. the propagation engine mirrors list/item-scoped attribute values
///    onto sibling blocks;
/// 4. the version is bumped and a [`Patch`] describes which blocks the
///    host must reconvert or patch.
///
/// Steps 2-4 run inside the same transaction: undo on the host side is
/// expected to treat the user edit plus its fix-up as one atomic unit.
pub struct Document {
    pub(crate) arena: Arena,
    pub(crate) order: Vec<BlockId>,
    version: u64,
    schema: Schema,
    strategies: DowncastRegistry,
    id_source: IdSource,
}

impl Document {
    pub fn new() -> Self {
        Self {
            arena: Arena::default(),
            order: Vec::new(),
            version: 0,
            schema: Schema::default(),
            strategies: DowncastRegistry::with_builtins(),
            id_source: Box::new(|| uuid::Uuid::new_v4().simple().to_string()),
        }
    }

    /// Replaces the fresh-`listItemId` generator. Defaults to uuid v4;
    /// tests install a sequential source for stable assertions.
    pub fn set_id_source(&mut self, source: impl FnMut() -> String + 'static) {
        self.id_source = Box::new(source);
    }

    /// Registers a host downcast strategy. Fails on a duplicate
    /// `(scope, attribute)` pair.
    pub fn register_strategy(
        &mut self,
        strategy: Box<dyn DowncastStrategy>,
    ) -> Result<(), StrategyError> {
        self.strategies.register(strategy)
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn schema_mut(&mut self) -> &mut Schema {
        &mut self.schema
    }

    pub(crate) fn strategies(&self) -> &DowncastRegistry {
        &self.strategies
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Block ids in document order.
    pub fn order(&self) -> &[BlockId] {
        &self.order
    }

    pub fn get(&self, id: BlockId) -> Option<&Block> {
        self.arena.get(id)
    }

    pub fn contains(&self, id: BlockId) -> bool {
        self.arena.contains(id)
    }

    pub fn position_of(&self, id: BlockId) -> Option<usize> {
        self.order.iter().position(|&other| other == id)
    }

    /// Block at a document-order position.
    pub fn at(&self, pos: usize) -> Option<(BlockId, &Block)> {
        let id = *self.order.get(pos)?;
        Some((id, self.arena.get(id)?))
    }

    /// Flat iteration over all blocks in document order.
    pub fn blocks(&self) -> impl Iterator<Item = (BlockId, &Block)> {
        self.order
            .iter()
            .filter_map(|&id| self.arena.get(id).map(|block| (id, block)))
    }

    /// Runs a transactional batch of writer operations, then settles the
    /// document and returns the re-rendering signal.
    pub fn change<F>(&mut self, f: F) -> Patch
    where
        F: FnOnce(&mut Writer<'_>),
    {
        let before = crate::downcast::fingerprint_all(self);
        let mut changes = Vec::new();
        {
            let mut writer = Writer {
                doc: self,
                changes: &mut changes,
            };
            f(&mut writer);
        }
        self.commit(before, changes)
    }

    /// Applies one structural command; equivalent to a [`Self::change`]
    /// batch containing the command's writer operations.
    pub fn apply(&mut self, cmd: crate::commands::Cmd) -> Patch {
        self.change(|writer| crate::commands::run(writer, cmd))
    }

    fn commit(&mut self, before: HashMap<BlockId, Fingerprint>, mut changes: Vec<Change>) -> Patch {
        if changes.is_empty() {
            return Patch {
                version: self.version,
                reconvert: Vec::new(),
                patched: Vec::new(),
            };
        }

        // Fixed-point loop: each pass seeds the next with its own fixes.
        let mut seeds = changes.clone();
        let mut passes = 0usize;
        loop {
            let mut fixes = Vec::new();
            crate::postfix::fix(self, &seeds, &mut fixes);
            if fixes.is_empty() {
                break;
            }
            passes += 1;
            debug_assert!(passes <= 2, "post-fixer did not settle within two passes");
            seeds = fixes.clone();
            changes.extend(fixes);
            if passes >= crate::postfix::MAX_FIX_PASSES {
                break;
            }
        }

        let mut mirrored = Vec::new();
        crate::downcast::mirror(self, &changes, &mut mirrored);
        changes.extend(mirrored);

        self.version += 1;
        let (reconvert, patched) = crate::downcast::classify(self, &before, &changes);
        Patch {
            version: self.version,
            reconvert,
            patched,
        }
    }

    /// Loads a pre-built sequence without running the pipeline. Used by
    /// the markup parser so test fixtures land verbatim.
    pub(crate) fn load(&mut self, blocks: Vec<Block>) {
        for block in blocks {
            let id = self.arena.insert(block);
            self.order.push(id);
        }
    }

    pub(crate) fn fresh_item_id(&mut self) -> String {
        (self.id_source)()
    }

    pub(crate) fn internal_writer<'a>(&'a mut self, changes: &'a mut Vec<Change>) -> Writer<'a> {
        Writer { doc: self, changes }
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Document")
            .field("len", &self.order.len())
            .field("version", &self.version)
            .finish()
    }
}

/// Transactional writer handed to [`Document::change`] callbacks.
///
/// Every mutation records a [`Change`]; mutations that would not alter
/// state are dropped silently, so an already-settled document re-settles
/// to an empty change set.
pub struct Writer<'a> {
    doc: &'a mut Document,
    changes: &'a mut Vec<Change>,
}

impl Writer<'_> {
    /// Read access to the document mid-transaction.
    pub fn document(&self) -> &Document {
        self.doc
    }

    /// Fresh unique `listItemId` from the document's id source.
    pub fn fresh_item_id(&mut self) -> String {
        self.doc.fresh_item_id()
    }

    /// Inserts a block at a document-order position (clamped to the end).
    pub fn insert(&mut self, at: usize, block: Block) -> BlockId {
        let at = at.min(self.doc.order.len());
        let id = self.doc.arena.insert(block);
        self.doc.order.insert(at, id);
        self.changes.push(Change::Inserted { id });
        id
    }

    /// Inserts a run of blocks, preserving their relative order.
    pub fn insert_many(&mut self, at: usize, blocks: Vec<Block>) -> Vec<BlockId> {
        let mut at = at.min(self.doc.order.len());
        let mut ids = Vec::with_capacity(blocks.len());
        for block in blocks {
            ids.push(self.insert(at, block));
            at += 1;
        }
        ids
    }

    pub fn remove(&mut self, id: BlockId) -> Option<Block> {
        let pos = self.doc.position_of(id)?;
        let prev = pos.checked_sub(1).map(|p| self.doc.order[p]);
        let next = self.doc.order.get(pos + 1).copied();
        self.doc.order.remove(pos);
        let block = self.doc.arena.remove(id)?;
        self.changes.push(Change::Removed { prev, next });
        Some(block)
    }

    /// Moves a block to `to`, interpreted against the order with the
    /// block already detached. Returns false for unknown ids.
    pub fn move_to(&mut self, id: BlockId, to: usize) -> bool {
        let Some(pos) = self.doc.position_of(id) else {
            return false;
        };
        let old_prev = pos.checked_sub(1).map(|p| self.doc.order[p]);
        let old_next = self.doc.order.get(pos + 1).copied();
        self.doc.order.remove(pos);
        let to = to.min(self.doc.order.len());
        if to == pos {
            self.doc.order.insert(pos, id);
            return true;
        }
        self.doc.order.insert(to, id);
        self.changes.push(Change::Moved {
            id,
            old_prev,
            old_next,
        });
        true
    }

    /// Changes a block's type tag. List attribute stripping for
    /// non-capable kinds is the post-fixer's job, not the writer's.
    pub fn rename(&mut self, id: BlockId, kind: BlockKind) -> bool {
        let Some(block) = self.doc.arena.get_mut(id) else {
            return false;
        };
        if block.kind == kind {
            return false;
        }
        block.kind = kind;
        self.changes.push(Change::Renamed { id });
        true
    }

    /// Installs or replaces the full list attribute set of a block.
    pub fn set_list_attrs(&mut self, id: BlockId, attrs: ListAttrs) -> bool {
        let Some(block) = self.doc.arena.get_mut(id) else {
            return false;
        };
        let old = block.listing.attrs();
        let mut touched = Vec::new();
        for name in [
            AttrName::ItemId,
            AttrName::Type,
            AttrName::Indent,
            AttrName::Style,
            AttrName::Start,
            AttrName::Reversed,
        ] {
            if old.is_none_or(|old| !old.attr_matches(&attrs, &name)) {
                touched.push(name);
            }
        }
        let old_extra = old.map(|old| old.extra.clone()).unwrap_or_default();
        for key in old_extra.keys().chain(attrs.extra.keys()) {
            if old_extra.get(key) != attrs.extra.get(key) {
                let name = AttrName::Custom(key.clone());
                if !touched.contains(&name) {
                    touched.push(name);
                }
            }
        }
        if touched.is_empty() {
            return false;
        }
        block.listing = crate::model::Listing::Item(attrs);
        for name in touched {
            self.changes.push(Change::Attribute { id, name });
        }
        true
    }

    /// Downgrades a block to plain, removing all list attributes.
    pub fn clear_list(&mut self, id: BlockId) -> bool {
        let Some(block) = self.doc.arena.get_mut(id) else {
            return false;
        };
        let Some(attrs) = block.listing.attrs() else {
            return false;
        };
        let mut touched = vec![AttrName::ItemId, AttrName::Type, AttrName::Indent];
        if attrs.style.is_some() {
            touched.push(AttrName::Style);
        }
        if attrs.start.is_some() {
            touched.push(AttrName::Start);
        }
        if attrs.reversed.is_some() {
            touched.push(AttrName::Reversed);
        }
        for key in attrs.extra.keys() {
            touched.push(AttrName::Custom(key.clone()));
        }
        block.listing = crate::model::Listing::Plain;
        for name in touched {
            self.changes.push(Change::Attribute { id, name });
        }
        true
    }

    pub fn set_indent(&mut self, id: BlockId, indent: u32) -> bool {
        self.set_attr(id, AttrName::Indent, |attrs| {
            if attrs.indent == indent {
                return false;
            }
            attrs.indent = indent;
            true
        })
    }

    pub fn set_item_id(&mut self, id: BlockId, item_id: impl Into<String>) -> bool {
        let item_id = item_id.into();
        self.set_attr(id, AttrName::ItemId, |attrs| {
            if attrs.item_id == item_id {
                return false;
            }
            attrs.item_id = item_id;
            true
        })
    }

    pub fn set_list_type(&mut self, id: BlockId, kind: ListType) -> bool {
        self.set_attr(id, AttrName::Type, |attrs| {
            if attrs.kind == kind {
                return false;
            }
            attrs.kind = kind;
            true
        })
    }

    pub fn set_style(&mut self, id: BlockId, style: Option<String>) -> bool {
        self.set_attr(id, AttrName::Style, |attrs| {
            if attrs.style == style {
                return false;
            }
            attrs.style = style;
            true
        })
    }

    pub fn set_start(&mut self, id: BlockId, start: Option<u64>) -> bool {
        self.set_attr(id, AttrName::Start, |attrs| {
            if attrs.start == start {
                return false;
            }
            attrs.start = start;
            true
        })
    }

    pub fn set_reversed(&mut self, id: BlockId, reversed: Option<bool>) -> bool {
        self.set_attr(id, AttrName::Reversed, |attrs| {
            if attrs.reversed == reversed {
                return false;
            }
            attrs.reversed = reversed;
            true
        })
    }

    /// Sets or removes a host-registered custom attribute.
    pub fn set_custom(&mut self, id: BlockId, name: &str, value: Option<String>) -> bool {
        let attr = AttrName::Custom(name.to_string());
        let name = name.to_string();
        self.set_attr(id, attr, move |attrs| match value {
            Some(value) => attrs.extra.insert(name.clone(), value.clone()) != Some(value),
            None => attrs.extra.remove(&name).is_some(),
        })
    }

    fn set_attr<F>(&mut self, id: BlockId, name: AttrName, apply: F) -> bool
    where
        F: FnOnce(&mut ListAttrs) -> bool,
    {
        let Some(block) = self.doc.arena.get_mut(id) else {
            return false;
        };
        let Some(attrs) = block.listing.attrs_mut() else {
            return false;
        };
        if !apply(attrs) {
            return false;
        }
        self.changes.push(Change::Attribute { id, name });
        true
    }
}
