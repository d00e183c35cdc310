//! Text search and replace

use std::collections::HashSet;

use tracing::debug;

use super::StructuredTree;
use crate::error::Result;
use crate::node::TextPattern;

impl StructuredTree {
    /// Identifiers of every text node whose value matches, in document order
    pub fn search_text(&self, pattern: &TextPattern) -> Vec<String> {
        self.nodes()
            .into_iter()
            .filter(|n| n.text().is_some_and(|t| pattern.is_match(t)))
            .map(|n| n.identifier().to_string())
            .collect()
    }

    /// Replace matches in free-text nodes.
    ///
    /// Checkbox, radio, dropdown and multiselect nodes are never touched.
    /// `include` restricts the replacement to the given instance identifiers
    /// or field paths. Every new value is validated before any is stored;
    /// on error the tree is unchanged. Returns the identifiers changed.
    pub fn replace_text(
        &mut self,
        pattern: &TextPattern,
        replacement: &str,
        include: Option<&HashSet<String>>,
    ) -> Result<Vec<String>> {
        let included = |id: &str, field_path: &str| {
            include.map_or(true, |set| set.contains(id) || set.contains(field_path))
        };

        let edits: Vec<(String, String)> = self
            .nodes()
            .into_iter()
            .filter(|n| n.text_kind().is_some_and(|k| !k.is_enumerated()))
            .filter(|n| included(n.identifier(), &n.field_path()))
            .filter_map(|n| {
                let old = n.text()?;
                let new = pattern.replace(old, replacement);
                (new != old).then(|| (n.identifier().to_string(), new.into_owned()))
            })
            .collect();

        let mut staged = self.clone();
        for (id, value) in &edits {
            staged.set_text(id, value)?;
        }
        *self = staged;

        debug!(changed = edits.len(), "replaced text");
        Ok(edits.into_iter().map(|(id, _)| id).collect())
    }
}
