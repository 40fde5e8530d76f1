use serde::Serialize;

use crate::model::{AttrName, BlockId};

/// Result of one committed transaction: the re-rendering signal for the
/// host's converter layer.
///
/// `reconvert` lists blocks whose external representation must be rebuilt
/// from scratch (structural adjacency, kind, indent, item id, type, or
/// first/last-of-item status changed). `patched` lists blocks where a
/// local attribute patch suffices, with the attributes that changed.
/// The two sets are disjoint; both are in document order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Patch {
    /// Document version after the transaction.
    pub version: u64,
    pub reconvert: Vec<BlockId>,
    pub patched: Vec<(BlockId, Vec<AttrName>)>,
}

impl Patch {
    pub fn is_empty(&self) -> bool {
        self.reconvert.is_empty() && self.patched.is_empty()
    }
}
