use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Type tag of a top-level block.
///
/// The tag decides rendering strategy on the host side and, via [`Schema`],
/// whether the block may carry list attributes at all.
///
/// [`Schema`]: crate::model::Schema
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BlockKind {
    /// Regular paragraph text.
    Paragraph,
    /// Heading with level 1..=6.
    Heading { level: u8 },
    /// Block quote.
    BlockQuote,
    /// Code block.
    CodeBlock,
    /// Table.
    Table,
    /// Horizontal rule. Not list-capable under the default schema.
    ThematicBreak,
}

impl BlockKind {
    /// Stable name used by [`Schema`] capability lookups.
    ///
    /// [`Schema`]: crate::model::Schema
    pub fn name(&self) -> &'static str {
        match self {
            BlockKind::Paragraph => "paragraph",
            BlockKind::Heading { .. } => "heading",
            BlockKind::BlockQuote => "blockQuote",
            BlockKind::CodeBlock => "codeBlock",
            BlockKind::Table => "table",
            BlockKind::ThematicBreak => "thematicBreak",
        }
    }
}

/// Open, string-keyed list type tag.
///
/// `bulleted` and `numbered` are built in; hosts register further types
/// (`todo`, `customNumbered`, ...) without this crate knowing about them,
/// so the tag is a string wrapper rather than a closed enum.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ListType(String);

impl ListType {
    pub fn bulleted() -> Self {
        Self("bulleted".to_string())
    }

    pub fn numbered() -> Self {
        Self("numbered".to_string())
    }

    /// A host-defined list type, e.g. `todo` or `customNumbered`.
    pub fn custom(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Numbered-family types may carry `listStart`/`listReversed` ordinals.
    pub fn supports_ordinal(&self) -> bool {
        self.0 == "numbered" || self.0.ends_with("Numbered")
    }
}

impl fmt::Display for ListType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Name of a list attribute, used for walker stop filters, change records
/// and downcast strategy registration.
///
/// Typed rather than string-keyed so that a filter cannot reference an
/// attribute that does not exist.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AttrName {
    ItemId,
    Type,
    Indent,
    Style,
    Start,
    Reversed,
    /// Host-registered attribute stored in [`ListAttrs::extra`].
    Custom(String),
}

impl fmt::Display for AttrName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttrName::ItemId => f.write_str("listItemId"),
            AttrName::Type => f.write_str("listType"),
            AttrName::Indent => f.write_str("listIndent"),
            AttrName::Style => f.write_str("listStyle"),
            AttrName::Start => f.write_str("listStart"),
            AttrName::Reversed => f.write_str("listReversed"),
            AttrName::Custom(name) => f.write_str(name),
        }
    }
}

/// List attributes of a block that is part of some list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListAttrs {
    /// Identifies the logical item this block belongs to. Unique only
    /// within one contiguous list run; may repeat across unrelated lists.
    pub item_id: String,
    /// List type tag.
    pub kind: ListType,
    /// Nesting level, 0-based.
    pub indent: u32,
    /// Marker glyph/style identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<String>,
    /// Starting ordinal, numbered-family types only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<u64>,
    /// Counting direction, numbered-family types only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reversed: Option<bool>,
    /// Host-registered custom attributes.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, String>,
}

impl ListAttrs {
    pub fn new(item_id: impl Into<String>, kind: ListType, indent: u32) -> Self {
        Self {
            item_id: item_id.into(),
            kind,
            indent,
            style: None,
            start: None,
            reversed: None,
            extra: BTreeMap::new(),
        }
    }

    /// Returns true if `self` and `other` agree on the named attribute.
    pub fn attr_matches(&self, other: &ListAttrs, name: &AttrName) -> bool {
        match name {
            AttrName::ItemId => self.item_id == other.item_id,
            AttrName::Type => self.kind == other.kind,
            AttrName::Indent => self.indent == other.indent,
            AttrName::Style => self.style == other.style,
            AttrName::Start => self.start == other.start,
            AttrName::Reversed => self.reversed == other.reversed,
            AttrName::Custom(key) => self.extra.get(key) == other.extra.get(key),
        }
    }
}

/// Whether a block participates in a list.
///
/// A tagged variant instead of "has a `listItemId` attribute" duck-typing:
/// stripping list attributes is a downgrade to `Plain`, and every consumer
/// matches exhaustively.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Listing {
    /// Not part of any list.
    Plain,
    /// Part of the logical item described by the attributes.
    Item(ListAttrs),
}

impl Listing {
    pub fn attrs(&self) -> Option<&ListAttrs> {
        match self {
            Listing::Plain => None,
            Listing::Item(attrs) => Some(attrs),
        }
    }

    pub fn attrs_mut(&mut self) -> Option<&mut ListAttrs> {
        match self {
            Listing::Plain => None,
            Listing::Item(attrs) => Some(attrs),
        }
    }

    pub fn is_item(&self) -> bool {
        matches!(self, Listing::Item(_))
    }
}

/// An addressable node in the flat top-level sequence.
///
/// Child content is opaque to this engine and carried as `text`; every
/// operation preserves it verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub kind: BlockKind,
    pub text: String,
    pub listing: Listing,
}

impl Block {
    /// A plain paragraph outside any list.
    pub fn paragraph(text: impl Into<String>) -> Self {
        Self {
            kind: BlockKind::Paragraph,
            text: text.into(),
            listing: Listing::Plain,
        }
    }

    /// A paragraph that is part of a list item.
    pub fn item(text: impl Into<String>, attrs: ListAttrs) -> Self {
        Self {
            kind: BlockKind::Paragraph,
            text: text.into(),
            listing: Listing::Item(attrs),
        }
    }

    pub fn with_kind(mut self, kind: BlockKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn attrs(&self) -> Option<&ListAttrs> {
        self.listing.attrs()
    }

    pub fn is_list_block(&self) -> bool {
        self.listing.is_item()
    }
}
