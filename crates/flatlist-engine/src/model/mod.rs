//! The flat block model: value types, the slot arena, and the
//! [`Document`] edit pipeline that keeps list attributes consistent.

mod arena;
mod block;
mod change;
mod document;
mod patch;
mod schema;

pub use arena::BlockId;
pub use block::{AttrName, Block, BlockKind, ListAttrs, ListType, Listing};
pub use change::Change;
pub use document::{Document, Writer};
pub use patch::Patch;
pub use schema::Schema;
