//! Pseudo-markup for list fixtures.
//!
//! One line per block. `* ` opens a bulleted item, `# ` a numbered one;
//! each two leading spaces are one indent level. An indented line
//! without a marker is a further block of the item one level up. A
//! non-indented line without a marker is a plain paragraph and ends any
//! open list. Trailing `{key:value}` directives set attributes:
//! `{id:x}` pins the item id (defaults to the zero-padded line number),
//! `{style:…}`, `{start:…}` and `{reversed:…}` set the list properties,
//! and any other key lands in the custom attribute map.
//!
//! Parsing loads blocks verbatim, bypassing the edit pipeline, so
//! fixtures can express invalid states for the post-fixer tests to chew
//! on. [`stringify`] is the inverse for assertions on settled documents.

use std::collections::{BTreeMap, HashSet};
use std::sync::OnceLock;

use regex::Regex;
use thiserror::Error;

use crate::model::{Block, Document, ListAttrs, ListType};
use crate::query;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MarkupError {
    /// Odd indentation, or a level with nothing open above it.
    #[error("Invalid indent: {0}")]
    InvalidIndent(String),
    /// An explicit id reused by a line that does not continue that item.
    #[error("ID conflict: {0}")]
    IdConflict(String),
    #[error("Invalid directive: {0}")]
    InvalidDirective(String),
}

impl Document {
    /// Builds a document from markup without running the pipeline.
    pub fn from_markup(input: &str) -> Result<Self, MarkupError> {
        let blocks = parse(input)?;
        let mut doc = Self::new();
        doc.load(blocks);
        Ok(doc)
    }
}

fn directive_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\{(\w+):([^}]*)\}$").expect("valid regex"))
}

fn line_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(?P<sp> *)(?:(?P<marker>[*#]) )?(?P<text>.*)$").expect("valid regex"))
}

#[derive(Default)]
struct Directives {
    id: Option<String>,
    style: Option<String>,
    start: Option<u64>,
    reversed: Option<bool>,
    extra: BTreeMap<String, String>,
}

impl Directives {
    fn is_empty(&self) -> bool {
        self.id.is_none()
            && self.style.is_none()
            && self.start.is_none()
            && self.reversed.is_none()
            && self.extra.is_empty()
    }

    fn apply(self, attrs: &mut ListAttrs) {
        attrs.style = self.style;
        attrs.start = self.start;
        attrs.reversed = self.reversed;
        attrs.extra = self.extra;
    }
}

/// Strips trailing directives off a line, right to left.
fn split_directives(line: &str) -> Result<(String, Directives), MarkupError> {
    let mut body = line.trim_end().to_string();
    let mut directives = Directives::default();
    while let Some(caps) = directive_re().captures(&body) {
        let start = caps.get(0).map_or(0, |m| m.start());
        let key = caps[1].to_string();
        let value = caps[2].to_string();
        match key.as_str() {
            "id" => directives.id = Some(value),
            "style" => directives.style = Some(value),
            "start" => {
                let start = value
                    .parse()
                    .map_err(|_| MarkupError::InvalidDirective(line.to_string()))?;
                directives.start = Some(start);
            }
            "reversed" => {
                directives.reversed = Some(match value.as_str() {
                    "true" => true,
                    "false" => false,
                    _ => return Err(MarkupError::InvalidDirective(line.to_string())),
                });
            }
            _ => {
                directives.extra.insert(key, value);
            }
        }
        body.truncate(start);
        body.truncate(body.trim_end().len());
    }
    Ok((body, directives))
}

pub fn parse(input: &str) -> Result<Vec<Block>, MarkupError> {
    let mut blocks = Vec::new();
    // Open item per level: (item id, list type).
    let mut opens: Vec<(String, ListType)> = Vec::new();
    let mut used: HashSet<String> = HashSet::new();

    for (lineno, raw) in input.lines().enumerate() {
        if raw.trim().is_empty() {
            continue;
        }
        let (body, directives) = split_directives(raw)?;
        let caps = line_re()
            .captures(&body)
            .ok_or_else(|| MarkupError::InvalidIndent(raw.to_string()))?;
        let spaces = caps.name("sp").map_or(0, |m| m.len());
        if spaces % 2 != 0 {
            return Err(MarkupError::InvalidIndent(raw.to_string()));
        }
        let level = spaces / 2;
        let text = caps.name("text").map_or("", |m| m.as_str());

        match caps.name("marker") {
            Some(marker) => {
                // A marker may open at most one level deeper than the
                // current stack.
                if level > opens.len() {
                    return Err(MarkupError::InvalidIndent(raw.to_string()));
                }
                let kind = if marker.as_str() == "#" {
                    ListType::numbered()
                } else {
                    ListType::bulleted()
                };
                let id = directives
                    .id
                    .clone()
                    .unwrap_or_else(|| format!("{lineno:03}"));
                let continuing = opens
                    .get(level)
                    .is_some_and(|(open_id, open_kind)| *open_id == id && *open_kind == kind);
                if !continuing && used.contains(&id) {
                    return Err(MarkupError::IdConflict(id));
                }
                opens.truncate(level);
                opens.push((id.clone(), kind.clone()));
                used.insert(id.clone());

                let mut attrs = ListAttrs::new(id, kind, level as u32);
                directives.apply(&mut attrs);
                blocks.push(Block::item(text, attrs));
            }
            None if level == 0 => {
                if !directives.is_empty() {
                    return Err(MarkupError::InvalidDirective(raw.to_string()));
                }
                opens.clear();
                blocks.push(Block::paragraph(text));
            }
            None => {
                // Continuation: a further block of the item one level up.
                let Some((id, kind)) = opens.get(level - 1).cloned() else {
                    return Err(MarkupError::InvalidIndent(raw.to_string()));
                };
                if directives.id.as_ref().is_some_and(|d| *d != id) {
                    return Err(MarkupError::IdConflict(
                        directives.id.clone().unwrap_or_default(),
                    ));
                }
                opens.truncate(level);

                let mut attrs = ListAttrs::new(id, kind, (level - 1) as u32);
                directives.apply(&mut attrs);
                blocks.push(Block::item(text, attrs));
            }
        }
    }
    Ok(blocks)
}

/// Renders a document back to markup; the inverse of [`parse`] for
/// settled documents. Custom list types fold to `*` or `#` by their
/// ordinal capability.
pub fn stringify(doc: &Document) -> String {
    let mut out = String::new();
    for pos in 0..doc.len() {
        let Some((_, block)) = doc.at(pos) else {
            continue;
        };
        let Some(attrs) = block.attrs() else {
            out.push_str(&block.text);
            out.push('\n');
            continue;
        };

        if query::is_first_block_of_item(doc, pos) {
            for _ in 0..attrs.indent {
                out.push_str("  ");
            }
            out.push(if attrs.kind.supports_ordinal() { '#' } else { '*' });
            out.push(' ');
            out.push_str(&block.text);
            let default_id = format!("{pos:03}");
            if attrs.item_id != default_id {
                out.push_str(&format!(" {{id:{}}}", attrs.item_id));
            }
        } else {
            for _ in 0..=attrs.indent {
                out.push_str("  ");
            }
            out.push_str(&block.text);
        }

        if let Some(style) = &attrs.style {
            out.push_str(&format!(" {{style:{style}}}"));
        }
        if let Some(start) = attrs.start {
            out.push_str(&format!(" {{start:{start}}}"));
        }
        if let Some(reversed) = attrs.reversed {
            out.push_str(&format!(" {{reversed:{reversed}}}"));
        }
        for (key, value) in &attrs.extra {
            out.push_str(&format!(" {{{key}:{value}}}"));
        }
        out.push('\n');
    }
    out
}
