use serde::{Deserialize, Serialize};

use crate::model::Block;

/// Stable handle to a block that survives document edits.
///
/// Handles are generation-checked: removing a block and reusing its slot
/// invalidates outstanding ids instead of silently aliasing a new block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BlockId {
    pub(crate) index: u32,
    pub(crate) generation: u32,
}

#[derive(Debug, Clone)]
struct Slot {
    generation: u32,
    block: Option<Block>,
}

/// Slot arena backing the document's flat block sequence.
///
/// Document order lives outside the arena (`Document::order`); the arena
/// only owns storage, so walker cursors are plain index math over the
/// order vector.
#[derive(Debug, Clone, Default)]
pub(crate) struct Arena {
    slots: Vec<Slot>,
    free: Vec<u32>,
}

impl Arena {
    pub(crate) fn insert(&mut self, block: Block) -> BlockId {
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.block = Some(block);
            BlockId {
                index,
                generation: slot.generation,
            }
        } else {
            let index = self.slots.len() as u32;
            self.slots.push(Slot {
                generation: 0,
                block: Some(block),
            });
            BlockId {
                index,
                generation: 0,
            }
        }
    }

    pub(crate) fn remove(&mut self, id: BlockId) -> Option<Block> {
        let slot = self.slots.get_mut(id.index as usize)?;
        if slot.generation != id.generation || slot.block.is_none() {
            return None;
        }
        let block = slot.block.take();
        slot.generation += 1;
        self.free.push(id.index);
        block
    }

    pub(crate) fn get(&self, id: BlockId) -> Option<&Block> {
        let slot = self.slots.get(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        slot.block.as_ref()
    }

    pub(crate) fn get_mut(&mut self, id: BlockId) -> Option<&mut Block> {
        let slot = self.slots.get_mut(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        slot.block.as_mut()
    }

    pub(crate) fn contains(&self, id: BlockId) -> bool {
        self.get(id).is_some()
    }
}
