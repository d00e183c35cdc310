//! Structured-data trees
//!
//! A [`StructuredTree`] owns every node of one asset's structured data. Nodes
//! are addressed by instance identifier through a flat lookup table that is
//! rebuilt after each structural mutation.
//!
//! ```text
//! roots ──► [title] [items;0] [items;1]
//!                      │          │
//!                      ▼          ▼
//!            items;0;entry;0   items;1;entry;0
//!            items;0;entry;1
//! ```

mod search;
mod structure;

use std::collections::{HashMap, HashSet};

use tracing::debug;

use crate::checksum::Checksum;
use crate::error::{Result, StructuredDataError};
use crate::identifier;
use crate::lookup::{AssetLookup, DefinitionLookup};
use crate::node::{
    run_indices, to_wire, Arena, AssetRef, FieldNode, NodeBuilder, NodeId, NodeValue, TextRules,
};
use crate::reconcile::PhantomReconciler;
use crate::schema::{AssetKind, SchemaIndex};
use crate::wire::StructuredData;

/// A schema-typed tree of structured-data nodes
#[derive(Debug, Clone)]
pub struct StructuredTree {
    arena: Arena,
    roots: Vec<NodeId>,
    index: HashMap<String, NodeId>,
    schema: SchemaIndex,
    rules: TextRules,
    definition_id: Option<String>,
    definition_path: Option<String>,
}

impl StructuredTree {
    fn empty(schema: SchemaIndex, data: Option<&StructuredData>) -> Self {
        let definition_id = data
            .and_then(|d| d.definition_id.clone())
            .or_else(|| schema.definition_id().map(str::to_string));
        let definition_path = data
            .and_then(|d| d.definition_path.clone())
            .or_else(|| schema.definition_path().map(str::to_string));
        Self {
            arena: Arena::default(),
            roots: Vec::new(),
            index: HashMap::new(),
            schema,
            rules: TextRules::default(),
            definition_id,
            definition_path,
        }
    }

    /// Build a tree from a wire payload.
    ///
    /// Fails with `UnknownField` if the payload holds a field the schema does
    /// not declare.
    pub fn from_wire(data: &StructuredData, schema: SchemaIndex) -> Result<Self> {
        let mut tree = Self::empty(schema, Some(data));
        let mut builder = NodeBuilder::new(&mut tree.arena, &tree.schema);
        tree.roots = builder.build_children(&data.structured_data_nodes, "", "")?;
        tree.rebuild_index()?;
        Ok(tree)
    }

    /// Build a tree from a wire payload, dropping nodes whose field the
    /// schema no longer declares. Returns the identifiers dropped.
    pub fn from_wire_lenient(
        data: &StructuredData,
        schema: SchemaIndex,
    ) -> Result<(Self, Vec<String>)> {
        let mut tree = Self::empty(schema, Some(data));
        let mut builder = NodeBuilder::new(&mut tree.arena, &tree.schema).lenient();
        tree.roots = builder.build_children(&data.structured_data_nodes, "", "")?;
        let dropped = builder.into_dropped();
        tree.rebuild_index()?;
        Ok((tree, dropped))
    }

    /// Build a tree, resolving its schema through `definitionId`
    pub fn from_wire_with(data: &StructuredData, lookup: &dyn DefinitionLookup) -> Result<Self> {
        let id = data.definition_id.as_deref().ok_or_else(|| {
            StructuredDataError::InvalidDefinition("payload has no definitionId".to_string())
        })?;
        let schema = lookup.fetch_definition(id)?;
        Self::from_wire(data, schema)
    }

    pub fn from_json(json: &str, schema: SchemaIndex) -> Result<Self> {
        let data: StructuredData = serde_json::from_str(json)?;
        Self::from_wire(&data, schema)
    }

    /// The schema's default shape: one instance per declared field with
    /// blank values.
    pub fn from_schema(schema: SchemaIndex) -> Result<Self> {
        let mut tree = Self::empty(schema, None);
        let mut builder = NodeBuilder::new(&mut tree.arena, &tree.schema);
        tree.roots = tree
            .schema
            .child_fields("")
            .iter()
            .map(|path| builder.build_default(path, ""))
            .collect::<Result<Vec<_>>>()?;
        tree.rebuild_index()?;
        Ok(tree)
    }

    /// Use `rules` for all later text validation
    pub fn with_rules(mut self, rules: TextRules) -> Self {
        self.rules = rules;
        self
    }

    pub fn rules(&self) -> &TextRules {
        &self.rules
    }

    pub fn schema(&self) -> &SchemaIndex {
        &self.schema
    }

    pub fn definition_id(&self) -> Option<&str> {
        self.definition_id.as_deref()
    }

    pub fn definition_path(&self) -> Option<&str> {
        self.definition_path.as_deref()
    }

    // --- serialization ---

    pub fn to_wire(&self) -> StructuredData {
        StructuredData {
            definition_id: self.definition_id.clone(),
            definition_path: self.definition_path.clone(),
            structured_data_nodes: self.roots.iter().map(|&r| to_wire(&self.arena, r)).collect(),
        }
    }

    pub fn to_value(&self) -> Result<serde_json::Value> {
        Ok(serde_json::to_value(self.to_wire())?)
    }

    pub fn to_json(&self, pretty: bool) -> Result<String> {
        let data = self.to_wire();
        Ok(if pretty {
            serde_json::to_string_pretty(&data)?
        } else {
            serde_json::to_string(&data)?
        })
    }

    /// Checksum over the canonical wire form
    pub fn checksum(&self) -> Result<Checksum> {
        Ok(Checksum::from_json(&self.to_value()?))
    }

    // --- lookup ---

    /// Resolve an instance identifier.
    ///
    /// `UnknownField` means the schema never declared the field;
    /// `NodeNotFound` means the field exists but this instance does not.
    pub(crate) fn resolve(&self, id: &str) -> Result<NodeId> {
        let field_path = identifier::field_path_of(id)?;
        if !self.schema.has_field(&field_path) {
            return Err(StructuredDataError::UnknownField(field_path));
        }
        self.index
            .get(id)
            .copied()
            .ok_or_else(|| StructuredDataError::NodeNotFound(id.to_string()))
    }

    pub fn node(&self, id: &str) -> Result<&FieldNode> {
        Ok(self.arena.get(self.resolve(id)?))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Text value of a text node
    pub fn text(&self, id: &str) -> Result<&str> {
        let node = self.node(id)?;
        node.text().ok_or_else(|| StructuredDataError::NodeKindMismatch {
            identifier: id.to_string(),
            expected: "text",
            actual: node.value().type_name(),
        })
    }

    /// Asset reference of an asset node
    pub fn asset(&self, id: &str) -> Result<&AssetRef> {
        let node = self.node(id)?;
        node.asset().ok_or_else(|| StructuredDataError::NodeKindMismatch {
            identifier: id.to_string(),
            expected: "asset",
            actual: node.value().type_name(),
        })
    }

    pub fn is_multiple(&self, field_path: &str) -> Result<bool> {
        self.schema.is_multiple(field_path)
    }

    /// All nodes, depth-first in document order
    pub fn nodes(&self) -> Vec<&FieldNode> {
        let mut out = Vec::with_capacity(self.index.len());
        let mut stack: Vec<NodeId> = self.roots.iter().rev().copied().collect();
        while let Some(id) = stack.pop() {
            let node = self.arena.get(id);
            stack.extend(node.children().iter().rev().copied());
            out.push(node);
        }
        out
    }

    /// All instance identifiers in document order
    pub fn identifiers(&self) -> Vec<String> {
        self.nodes()
            .into_iter()
            .map(|n| n.identifier().to_string())
            .collect()
    }

    /// First instances (`;0`) of every multiple field, in document order.
    /// Outer fields come before the fields nested in them.
    pub fn multiple_first_instances(&self) -> Vec<String> {
        self.nodes()
            .into_iter()
            .filter(|n| n.is_multiple())
            .map(|n| n.identifier().to_string())
            .filter(|id| matches!(identifier::last_index_of(id), Ok(Some(0))))
            .collect()
    }

    // --- leaf setters ---

    /// Validate and store a text value
    pub fn set_text(&mut self, id: &str, value: &str) -> Result<()> {
        let node_id = self.resolve(id)?;
        let rules = self.rules;
        self.arena.get_mut(node_id).set_text(value, &rules)
    }

    /// Point an asset node at an asset, or clear it
    pub fn set_asset_ref(
        &mut self,
        id: &str,
        kind: AssetKind,
        asset_id: Option<&str>,
        path: Option<&str>,
    ) -> Result<()> {
        let node_id = self.resolve(id)?;
        self.arena.get_mut(node_id).set_asset_ref(kind, asset_id, path)
    }

    /// Resolve an asset through the service layer and reference it
    pub fn link_asset(
        &mut self,
        id: &str,
        kind: AssetKind,
        asset_id: &str,
        lookup: &dyn AssetLookup,
    ) -> Result<()> {
        self.resolve(id)?;
        let target = lookup.fetch_asset(asset_id, kind)?;
        self.set_asset_ref(id, target.kind, target.id.as_deref(), target.path.as_deref())
    }

    // --- phantoms ---

    /// Declared field paths with no node in this tree
    pub fn phantom_fields(&self) -> Vec<String> {
        let present: HashSet<String> = self.nodes().iter().map(|n| n.field_path()).collect();
        self.schema
            .field_paths()
            .into_iter()
            .filter(|path| !present.contains(path))
            .collect()
    }

    /// Whether the schema declares fields this tree's data lacks
    pub fn has_phantom_fields(&self) -> bool {
        !self.phantom_fields().is_empty()
    }

    /// Copy this tree's data into the default shape of `target_schema`
    pub fn map_data(&self, target_schema: SchemaIndex) -> Result<StructuredTree> {
        PhantomReconciler::map_data(self, target_schema)
    }

    /// Copy data from a stale `phantom` tree into a copy of this tree,
    /// skipping fields this tree's schema does not know
    pub fn reconcile_phantoms(&self, phantom: &StructuredTree) -> Result<StructuredTree> {
        PhantomReconciler::reconcile(self, phantom)
    }

    // --- index maintenance ---

    /// Relabel every node from its position and rebuild the lookup table.
    ///
    /// Identifiers are re-derived top-down with the run-length rule, so
    /// cloned, moved or swapped subtrees pick up their new indices. Nodes no
    /// longer reachable from the roots are dropped from the arena.
    pub(crate) fn rebuild_index(&mut self) -> Result<()> {
        let mut arena = Arena::default();
        let mut index = HashMap::with_capacity(self.index.len());
        let roots = self.relocate(&self.roots, "", &mut arena, &mut index)?;
        self.arena = arena;
        self.roots = roots;
        self.index = index;
        debug!(nodes = self.index.len(), "rebuilt structured-data index");
        Ok(())
    }

    fn relocate(
        &self,
        siblings: &[NodeId],
        parent_identifier: &str,
        arena: &mut Arena,
        index: &mut HashMap<String, NodeId>,
    ) -> Result<Vec<NodeId>> {
        let names: Vec<&str> = siblings.iter().map(|&s| self.arena.get(s).name()).collect();
        let indices = run_indices(names.iter().copied());

        let mut out = Vec::with_capacity(siblings.len());
        for ((&old, name), run) in siblings.iter().zip(&names).zip(indices) {
            let mut node = self.arena.get(old).clone();
            node.identifier =
                identifier::instance_id(parent_identifier, name, node.multiple.then_some(run));
            node.parent_identifier = parent_identifier.to_string();
            if let NodeValue::Group { children } = &node.value {
                let relocated = self.relocate(children, &node.identifier, arena, index)?;
                node.value = NodeValue::Group {
                    children: relocated,
                };
            }

            let key = node.identifier.clone();
            let new_id = arena.push(node);
            if index.insert(key.clone(), new_id).is_some() {
                return Err(StructuredDataError::DuplicateIdentifier(key));
            }
            out.push(new_id);
        }
        Ok(out)
    }

    /// Round-trip through the wire form. The full rebuild keeps deeply
    /// nested multiplicities consistent after repeated resizing.
    pub(crate) fn normalize(&mut self) -> Result<()> {
        let data = self.to_wire();
        let rebuilt = Self::from_wire(&data, self.schema.clone())?;
        self.arena = rebuilt.arena;
        self.roots = rebuilt.roots;
        self.index = rebuilt.index;
        Ok(())
    }
}
