//! Structural operations: growing, shrinking and reordering multiple fields

use std::cmp::Ordering;

use tracing::debug;

use super::StructuredTree;
use crate::error::{Result, StructuredDataError};
use crate::identifier;
use crate::node::NodeId;

/// A contiguous run of instances of one multiple field
struct SiblingRun {
    /// Enclosing group; `None` for top-level fields
    parent: Option<NodeId>,
    start: usize,
    len: usize,
    first: String,
}

impl StructuredTree {
    fn siblings_of(&self, parent: Option<NodeId>) -> &[NodeId] {
        match parent {
            None => &self.roots,
            Some(p) => self.arena.get(p).children(),
        }
    }

    fn siblings_mut(&mut self, parent: Option<NodeId>) -> Result<&mut Vec<NodeId>> {
        match parent {
            None => Ok(&mut self.roots),
            Some(p) => {
                let node = self.arena.get_mut(p);
                let identifier = node.identifier.clone();
                match &mut node.value {
                    crate::node::NodeValue::Group { children } => Ok(children),
                    other => Err(StructuredDataError::NodeKindMismatch {
                        identifier,
                        expected: "group",
                        actual: other.type_name(),
                    }),
                }
            }
        }
    }

    fn sibling_run(&self, instance: &str) -> Result<SiblingRun> {
        let field_path = identifier::field_path_of(instance)?;
        if !self.schema.is_multiple(&field_path)? {
            return Err(StructuredDataError::NotMultiple(field_path));
        }
        let first = identifier::with_index(instance, 0)?;
        let first_node = self.resolve(&first)?;

        let parent = if self.schema.has_repeated_ancestor(&field_path)? {
            // the field path alone names several runs; go through the
            // parent the first instance was built under
            let parent_id = self.arena.get(first_node).parent_identifier().to_string();
            Some(self.resolve(&parent_id)?)
        } else {
            identifier::parent_instance_of(&first)?
                .map(|parent_id| self.resolve(&parent_id))
                .transpose()?
        };

        let siblings = self.siblings_of(parent);
        let start = siblings
            .iter()
            .position(|&s| s == first_node)
            .ok_or_else(|| StructuredDataError::NodeNotFound(first.clone()))?;
        let name = self.arena.get(first_node).name();
        let len = siblings[start..]
            .iter()
            .take_while(|&&s| self.arena.get(s).name() == name)
            .count();

        Ok(SiblingRun {
            parent,
            start,
            len,
            first,
        })
    }

    /// Number of instances in the run that starts at `first_id`
    pub fn sibling_count(&self, first_id: &str) -> Result<usize> {
        Ok(self.sibling_run(first_id)?.len)
    }

    /// Identifiers of every instance in the run that starts at `first_id`
    pub fn sibling_identifiers(&self, first_id: &str) -> Result<Vec<String>> {
        let run = self.sibling_run(first_id)?;
        Ok(self.siblings_of(run.parent)[run.start..run.start + run.len]
            .iter()
            .map(|&s| self.arena.get(s).identifier().to_string())
            .collect())
    }

    /// Append one instance after the last instance of a multiple field.
    ///
    /// The new instance is a deep copy of the last one. Returns its
    /// identifier.
    pub fn append_sibling(&mut self, first_id: &str) -> Result<String> {
        let run = self.sibling_run(first_id)?;
        let last = self.siblings_of(run.parent)[run.start + run.len - 1];
        let copy = self.arena.deep_clone(last);
        self.siblings_mut(run.parent)?
            .insert(run.start + run.len, copy);
        self.rebuild_index()?;

        let added = identifier::with_index(&run.first, run.len as u32)?;
        debug!(field = %run.first, added = %added, "appended sibling");
        Ok(added)
    }

    /// Remove the last instance of a multiple field. The only remaining
    /// instance cannot be removed.
    pub fn remove_last_sibling(&mut self, first_id: &str) -> Result<()> {
        let run = self.sibling_run(first_id)?;
        if run.len <= 1 {
            return Err(StructuredDataError::CannotRemoveOnlyInstance(run.first));
        }
        self.siblings_mut(run.parent)?
            .remove(run.start + run.len - 1);
        self.rebuild_index()?;
        debug!(field = %run.first, remaining = run.len - 1, "removed last sibling");
        Ok(())
    }

    /// First instance addressed by a field path or an instance identifier
    fn first_instance_for(&self, target: &str) -> Result<String> {
        identifier::validate(target)?;
        if identifier::has_index(target) {
            identifier::with_index(target, 0)
        } else {
            self.schema.first_instance_of(target)
        }
    }

    /// Grow or shrink a multiple field to exactly `count` instances.
    ///
    /// `target` is either an instance identifier of the field or, when no
    /// ancestor repeats, its bare field path. The tree is rebuilt from its
    /// wire form afterwards.
    pub fn resize_multiple(&mut self, target: &str, count: usize) -> Result<()> {
        let first = self.first_instance_for(target)?;
        self.resize_run(&first, count)?;
        self.normalize()
    }

    pub(crate) fn resize_run(&mut self, first: &str, count: usize) -> Result<()> {
        if count == 0 {
            return Err(StructuredDataError::CannotRemoveOnlyInstance(
                first.to_string(),
            ));
        }
        loop {
            match self.sibling_count(first)?.cmp(&count) {
                Ordering::Less => {
                    self.append_sibling(first)?;
                }
                Ordering::Greater => self.remove_last_sibling(first)?,
                Ordering::Equal => return Ok(()),
            }
        }
    }

    /// Exchange the contents of two instances of the same field.
    ///
    /// Identifiers stay where they are; values (and for groups, whole
    /// subtrees) move.
    pub fn swap_siblings(&mut self, a: &str, b: &str) -> Result<()> {
        let ia = self.resolve(a)?;
        let ib = self.resolve(b)?;
        let (na, nb) = (self.arena.get(ia), self.arena.get(ib));
        if na.field_path() != nb.field_path() || na.parent_identifier != nb.parent_identifier {
            return Err(StructuredDataError::NotSiblings(a.to_string(), b.to_string()));
        }
        if ia == ib {
            return Ok(());
        }

        let payload_a = (na.value.clone(), na.recycled, na.shape.clone());
        let payload_b = (nb.value.clone(), nb.recycled, nb.shape.clone());
        {
            let node = self.arena.get_mut(ia);
            (node.value, node.recycled, node.shape) = payload_b;
        }
        {
            let node = self.arena.get_mut(ib);
            (node.value, node.recycled, node.shape) = payload_a;
        }
        self.rebuild_index()?;
        debug!(a, b, "swapped siblings");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::DataDefinition;
    use crate::schema::SchemaIndex;
    use crate::wire::StructuredData;
    use serde_json::json;

    fn schema() -> SchemaIndex {
        DataDefinition::from_value(json!({
            "fields": [
                { "type": "group", "identifier": "items", "fields": [
                    { "type": "text", "identifier": "entry", "multiple": true }
                ]},
                { "type": "group", "identifier": "rows", "multiple": true, "fields": [
                    { "type": "text", "identifier": "cell", "multiple": true },
                    { "type": "text", "identifier": "note" }
                ]}
            ]
        }))
        .unwrap()
        .into_index()
    }

    fn tree() -> StructuredTree {
        let data: StructuredData = serde_json::from_value(json!({
            "structuredDataNodes": [
                { "type": "group", "identifier": "items", "structuredDataNodes": [
                    { "type": "text", "identifier": "entry", "text": "a" },
                    { "type": "text", "identifier": "entry", "text": "b" }
                ]},
                { "type": "group", "identifier": "rows", "structuredDataNodes": [
                    { "type": "text", "identifier": "cell", "text": "r0c0" },
                    { "type": "text", "identifier": "note", "text": "n0" }
                ]},
                { "type": "group", "identifier": "rows", "structuredDataNodes": [
                    { "type": "text", "identifier": "cell", "text": "r1c0" },
                    { "type": "text", "identifier": "cell", "text": "r1c1" },
                    { "type": "text", "identifier": "note", "text": "n1" }
                ]}
            ]
        }))
        .unwrap();
        StructuredTree::from_wire(&data, schema()).unwrap()
    }

    #[test]
    fn test_append_clones_last_instance() {
        let mut tree = tree();
        let added = tree.append_sibling("items;entry;0").unwrap();
        assert_eq!(added, "items;entry;2");
        assert_eq!(tree.text("items;entry;2").unwrap(), "b");
        assert_eq!(
            tree.sibling_identifiers("items;entry;0").unwrap(),
            vec!["items;entry;0", "items;entry;1", "items;entry;2"]
        );
    }

    #[test]
    fn test_append_under_repeated_parent() {
        let mut tree = tree();
        tree.append_sibling("rows;1;cell;0").unwrap();
        assert_eq!(tree.sibling_count("rows;1;cell;0").unwrap(), 3);
        assert_eq!(tree.sibling_count("rows;0;cell;0").unwrap(), 1);
        assert_eq!(tree.text("rows;1;cell;2").unwrap(), "r1c1");
        assert_eq!(tree.text("rows;1;note").unwrap(), "n1");
    }

    #[test]
    fn test_append_group_relabels_subtree() {
        let mut tree = tree();
        tree.append_sibling("rows;0").unwrap();
        assert_eq!(tree.text("rows;2;cell;1").unwrap(), "r1c1");
        assert_eq!(tree.node("rows;2;note").unwrap().parent_identifier(), "rows;2");
    }

    #[test]
    fn test_remove_last_and_guard() {
        let mut tree = tree();
        tree.remove_last_sibling("items;entry;0").unwrap();
        assert!(!tree.contains("items;entry;1"));
        assert!(matches!(
            tree.remove_last_sibling("items;entry;0"),
            Err(StructuredDataError::CannotRemoveOnlyInstance(_))
        ));
        assert_eq!(tree.text("items;entry;0").unwrap(), "a");
    }

    #[test]
    fn test_not_multiple() {
        let mut tree = tree();
        assert!(matches!(
            tree.append_sibling("rows;0;note"),
            Err(StructuredDataError::NotMultiple(_))
        ));
        assert!(matches!(
            tree.append_sibling("missing;0"),
            Err(StructuredDataError::UnknownField(_))
        ));
    }

    #[test]
    fn test_resize_by_field_path() {
        let mut tree = tree();
        tree.resize_multiple("items;entry", 4).unwrap();
        assert_eq!(tree.sibling_count("items;entry;0").unwrap(), 4);
        tree.resize_multiple("items;entry", 1).unwrap();
        assert_eq!(tree.identifiers().iter().filter(|i| i.starts_with("items;entry")).count(), 1);
        assert!(matches!(
            tree.resize_multiple("rows;cell", 2),
            Err(StructuredDataError::AmbiguousFieldPath(_))
        ));
        tree.resize_multiple("rows;0;cell", 2).unwrap();
        assert_eq!(tree.sibling_count("rows;0;cell;0").unwrap(), 2);
        assert!(tree.resize_multiple("items;entry", 0).is_err());
    }

    #[test]
    fn test_swap_values_not_slots() {
        let mut tree = tree();
        tree.swap_siblings("items;entry;0", "items;entry;1").unwrap();
        assert_eq!(tree.text("items;entry;0").unwrap(), "b");
        assert_eq!(tree.text("items;entry;1").unwrap(), "a");
    }

    #[test]
    fn test_swap_groups_moves_subtrees() {
        let mut tree = tree();
        tree.swap_siblings("rows;0", "rows;1").unwrap();
        assert_eq!(tree.text("rows;0;note").unwrap(), "n1");
        assert_eq!(tree.text("rows;0;cell;1").unwrap(), "r1c1");
        assert!(!tree.contains("rows;1;cell;1"));
        assert_eq!(tree.node("rows;0;cell;1").unwrap().parent_identifier(), "rows;0");
    }

    #[test]
    fn test_swap_rejects_non_siblings() {
        let mut tree = tree();
        assert!(matches!(
            tree.swap_siblings("rows;0;cell;0", "rows;1;cell;0"),
            Err(StructuredDataError::NotSiblings(_, _))
        ));
        assert!(matches!(
            tree.swap_siblings("items;entry;0", "rows;0;note"),
            Err(StructuredDataError::NotSiblings(_, _))
        ));
    }
}
