pub mod commands;
pub mod downcast;
pub mod markup;
pub mod model;
pub mod query;
pub mod walker;

mod postfix;

// Re-export key types for easier usage
pub use commands::Cmd;
pub use downcast::{AttrStrategy, DowncastRegistry, DowncastStrategy, StrategyError, StrategyScope};
pub use markup::MarkupError;
pub use model::{
    AttrName, Block, BlockId, BlockKind, Change, Document, ListAttrs, ListType, Listing, Patch,
    Schema, Writer,
};
pub use query::{
    expand_to_whole_items, is_first_block_of_item, is_last_block_of_item, item_blocks,
    logical_list_blocks, nested_blocks,
};
pub use walker::{Direction, ListWalker, WalkerOptions};
