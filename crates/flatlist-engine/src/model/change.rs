use crate::model::{AttrName, BlockId};

/// One structural delta recorded by the writer during a transaction.
///
/// Changes seed the post-fixer (which blocks to re-examine) and the
/// refresh classification (what the host must re-render). Removed and
/// moved entries carry the surviving neighbors so a gap left behind can
/// be re-fixed even though the block itself is gone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Change {
    Inserted {
        id: BlockId,
    },
    Removed {
        prev: Option<BlockId>,
        next: Option<BlockId>,
    },
    Moved {
        id: BlockId,
        old_prev: Option<BlockId>,
        old_next: Option<BlockId>,
    },
    Renamed {
        id: BlockId,
    },
    Attribute {
        id: BlockId,
        name: AttrName,
    },
}
