//! Lazy directional traversal over the flat block sequence.
//!
//! [`ListWalker`] is the single query primitive everything else builds
//! on: sibling lookup, item closure, nested closure and logical-list
//! discovery are all walker configurations.

use crate::model::{AttrName, BlockId, Document, ListAttrs};

/// Walk direction through the flat sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    Forward,
    #[default]
    Backward,
}

/// Walker configuration.
///
/// Indent filters are evaluated against `start_indent` (the reference
/// block's indent unless overridden):
///
/// - `same_indent` yields blocks at exactly `start_indent`; a mismatch in
///   any `same_attributes` entry terminates the walk there,
/// - `lower_indent` yields strictly shallower blocks,
/// - `higher_indent` yields strictly deeper blocks.
///
/// Deeper blocks that are not asked for are skipped, not a stop: nested
/// sub-lists live "inside" an item. Shallower blocks that are not asked
/// for always stop the walk, as does the first plain block or the
/// document boundary.
///
/// With no indent flag set the walk yields everything at `start_indent`
/// or deeper, until a shallower or plain block ends it.
#[derive(Debug, Clone, Default)]
pub struct WalkerOptions {
    pub direction: Direction,
    pub include_self: bool,
    pub same_indent: bool,
    pub lower_indent: bool,
    pub higher_indent: bool,
    pub same_attributes: Vec<AttrName>,
    /// Indent to anchor comparisons to; defaults to the reference
    /// block's own indent.
    pub start_indent: Option<u32>,
}

impl WalkerOptions {
    pub fn forward() -> Self {
        Self {
            direction: Direction::Forward,
            ..Self::default()
        }
    }

    pub fn backward() -> Self {
        Self::default()
    }

    pub fn include_self(mut self) -> Self {
        self.include_self = true;
        self
    }

    pub fn same_indent(mut self) -> Self {
        self.same_indent = true;
        self
    }

    pub fn lower_indent(mut self) -> Self {
        self.lower_indent = true;
        self
    }

    pub fn higher_indent(mut self) -> Self {
        self.higher_indent = true;
        self
    }

    pub fn same_attributes(mut self, attrs: impl IntoIterator<Item = AttrName>) -> Self {
        self.same_attributes = attrs.into_iter().collect();
        self
    }

    pub fn start_indent(mut self, indent: u32) -> Self {
        self.start_indent = Some(indent);
        self
    }
}

/// Lazy iterator yielding `(position, BlockId)` pairs matching the
/// configuration. Restartable by constructing a new walker; absence of
/// matches is an empty iteration, never an error.
pub struct ListWalker<'a> {
    doc: &'a Document,
    opts: WalkerOptions,
    /// Attributes of the reference block; `None` when the reference is
    /// plain, which makes the walk empty.
    reference: Option<ListAttrs>,
    start_indent: u32,
    cursor: Cursor,
}

enum Cursor {
    /// Next call visits this position.
    At(usize),
    /// Next call steps from this position first.
    After(usize),
    Done,
}

impl<'a> ListWalker<'a> {
    pub fn new(doc: &'a Document, start: usize, opts: WalkerOptions) -> Self {
        let reference = doc.at(start).and_then(|(_, block)| block.attrs().cloned());
        let start_indent = opts
            .start_indent
            .or_else(|| reference.as_ref().map(|attrs| attrs.indent))
            .unwrap_or(0);
        let cursor = if reference.is_none() {
            Cursor::Done
        } else if opts.include_self {
            Cursor::At(start)
        } else {
            Cursor::After(start)
        };
        Self {
            doc,
            opts,
            reference,
            start_indent,
            cursor,
        }
    }

    /// Lookup entry point: the first match, or `None`.
    pub fn first(doc: &'a Document, start: usize, opts: WalkerOptions) -> Option<(usize, BlockId)> {
        Self::new(doc, start, opts).next()
    }

    fn step(&self, pos: usize) -> Option<usize> {
        match self.opts.direction {
            Direction::Forward => {
                let next = pos + 1;
                (next < self.doc.len()).then_some(next)
            }
            Direction::Backward => pos.checked_sub(1),
        }
    }
}

impl Iterator for ListWalker<'_> {
    type Item = (usize, BlockId);

    fn next(&mut self) -> Option<Self::Item> {
        let mut pos = match self.cursor {
            Cursor::At(pos) => pos,
            Cursor::After(pos) => match self.step(pos) {
                Some(next) => next,
                None => {
                    self.cursor = Cursor::Done;
                    return None;
                }
            },
            Cursor::Done => return None,
        };

        loop {
            let Some((id, block)) = self.doc.at(pos) else {
                break;
            };
            // A plain block always ends the walk.
            let Some(attrs) = block.attrs() else {
                break;
            };

            let indent_filtered =
                self.opts.same_indent || self.opts.lower_indent || self.opts.higher_indent;
            let skip = if attrs.indent > self.start_indent {
                indent_filtered && !self.opts.higher_indent
            } else if attrs.indent < self.start_indent {
                if self.opts.lower_indent {
                    false
                } else {
                    break;
                }
            } else if self.opts.same_indent || !indent_filtered {
                let reference = self
                    .reference
                    .as_ref()
                    .expect("walker with a live cursor has reference attrs");
                if self
                    .opts
                    .same_attributes
                    .iter()
                    .any(|name| !reference.attr_matches(attrs, name))
                {
                    break;
                }
                false
            } else if self.opts.higher_indent {
                // Dropped back out of the nested region.
                break;
            } else {
                true
            };

            if !skip {
                self.cursor = Cursor::After(pos);
                return Some((pos, id));
            }
            match self.step(pos) {
                Some(next) => pos = next,
                None => break,
            }
        }

        self.cursor = Cursor::Done;
        None
    }
}
