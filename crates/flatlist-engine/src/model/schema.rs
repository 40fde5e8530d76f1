use std::collections::HashSet;

use crate::model::BlockKind;

/// Capability registry: which block kinds may host list attributes.
///
/// The post-fixer strips list attributes from any block whose kind is not
/// capable, e.g. after a rename. Capability is keyed by
/// [`BlockKind::name`] so all heading levels share one entry.
#[derive(Debug, Clone)]
pub struct Schema {
    list_capable: HashSet<&'static str>,
}

impl Default for Schema {
    /// Everything except thematic breaks can be part of a list.
    fn default() -> Self {
        let list_capable = ["paragraph", "heading", "blockQuote", "codeBlock", "table"]
            .into_iter()
            .collect();
        Self { list_capable }
    }
}

impl Schema {
    pub fn can_host_list(&self, kind: &BlockKind) -> bool {
        self.list_capable.contains(kind.name())
    }

    /// Overrides capability for one kind name, e.g. to forbid code blocks
    /// in lists for a stricter host.
    pub fn set_list_capable(&mut self, kind: &BlockKind, capable: bool) {
        if capable {
            self.list_capable.insert(kind.name());
        } else {
            self.list_capable.remove(kind.name());
        }
    }
}
