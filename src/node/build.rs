//! Node construction from wire payloads and from the schema's default shape

use tracing::warn;

use super::{Arena, AssetRef, AssetTarget, FieldNode, NodeId, NodeValue, TextValue, WireShape};
use crate::error::{Result, StructuredDataError};
use crate::identifier;
use crate::schema::{AssetKind, FieldMeta, FieldType, SchemaIndex};
use crate::wire::{WireNode, WireNodeType};

/// Repetition indices for a sibling list.
///
/// A name that repeats the previous sibling's name continues its run;
/// any other name starts over at 0. Two separate runs of the same name
/// therefore both start at 0.
pub(crate) fn run_indices<'a>(names: impl IntoIterator<Item = &'a str>) -> Vec<u32> {
    let mut previous: Option<&str> = None;
    let mut run = 0;
    names
        .into_iter()
        .map(|name| {
            run = if previous == Some(name) { run + 1 } else { 0 };
            previous = Some(name);
            run
        })
        .collect()
}

/// Builds nodes into an arena, consulting the schema at every level
pub(crate) struct NodeBuilder<'a> {
    arena: &'a mut Arena,
    schema: &'a SchemaIndex,
    /// When set, payload nodes unknown to the schema are dropped and
    /// recorded here instead of failing the build
    dropped: Option<Vec<String>>,
}

impl<'a> NodeBuilder<'a> {
    pub fn new(arena: &'a mut Arena, schema: &'a SchemaIndex) -> Self {
        Self {
            arena,
            schema,
            dropped: None,
        }
    }

    pub fn lenient(mut self) -> Self {
        self.dropped = Some(Vec::new());
        self
    }

    pub fn into_dropped(self) -> Vec<String> {
        self.dropped.unwrap_or_default()
    }

    /// Build one sibling list from the wire.
    pub fn build_children(
        &mut self,
        nodes: &[WireNode],
        parent_identifier: &str,
        parent_field_path: &str,
    ) -> Result<Vec<NodeId>> {
        let mut kept = Vec::with_capacity(nodes.len());
        for wire in nodes {
            let field_path = identifier::join(parent_field_path, &wire.identifier);
            if let Some(dropped) = self.dropped.as_mut() {
                if !self.schema.has_field(&field_path) {
                    let id = identifier::join(parent_identifier, &wire.identifier);
                    warn!(identifier = %id, "dropping payload node unknown to the data definition");
                    dropped.push(id);
                    continue;
                }
            }
            kept.push(wire);
        }

        let indices = run_indices(kept.iter().map(|w| w.identifier.as_str()));
        kept.into_iter()
            .zip(indices)
            .map(|(wire, index)| self.build(wire, parent_identifier, parent_field_path, index))
            .collect()
    }

    /// Build a node and its subtree from a wire node.
    ///
    /// `index` is the node's position within its run of siblings and only
    /// shows up in the identifier when the field is multiple.
    pub fn build(
        &mut self,
        wire: &WireNode,
        parent_identifier: &str,
        parent_field_path: &str,
        index: u32,
    ) -> Result<NodeId> {
        if wire.identifier.contains(identifier::DELIMITER) {
            return Err(StructuredDataError::MalformedIdentifier(
                wire.identifier.clone(),
            ));
        }
        let field_path = identifier::join(parent_field_path, &wire.identifier);
        let meta = self.schema.field_meta(&field_path)?.clone();
        let instance = identifier::instance_id(
            parent_identifier,
            &wire.identifier,
            meta.multiple.then_some(index),
        );

        let value = match (meta.field_type, wire.node_type) {
            (FieldType::Group, WireNodeType::Group) => NodeValue::Group {
                children: self.build_children(wire.children(), &instance, &field_path)?,
            },
            (FieldType::Text(kind), WireNodeType::Text) => NodeValue::Text(TextValue {
                value: wire.text.clone().unwrap_or_default(),
                kind,
                items: meta.items.clone(),
            }),
            (FieldType::Asset(kind), WireNodeType::Asset) => NodeValue::Asset(AssetRef {
                kind,
                target: read_target(kind, wire),
            }),
            (declared, _) => {
                return Err(StructuredDataError::NodeKindMismatch {
                    identifier: instance,
                    expected: declared.node_type(),
                    actual: wire.node_type.as_str(),
                })
            }
        };

        Ok(self.arena.push(FieldNode {
            identifier: instance,
            parent_identifier: parent_identifier.to_string(),
            multiple: meta.multiple,
            required: meta.required,
            recycled: wire.recycled,
            value,
            shape: WireShape {
                text_absent: wire.text.is_none(),
                children_absent: wire.structured_data_nodes.is_none(),
                asset_type: wire.asset_type.clone(),
            },
        }))
    }

    /// Build the default shape of a field: one instance, blank values.
    pub fn build_default(&mut self, field_path: &str, parent_identifier: &str) -> Result<NodeId> {
        let meta: FieldMeta = self.schema.field_meta(field_path)?.clone();
        let instance = identifier::instance_id(
            parent_identifier,
            identifier::leaf_name(field_path),
            meta.multiple.then_some(0),
        );

        let value = match meta.field_type {
            FieldType::Group => {
                let children = self
                    .schema
                    .child_fields(field_path)
                    .iter()
                    .map(|child| self.build_default(child, &instance))
                    .collect::<Result<Vec<_>>>()?;
                NodeValue::Group { children }
            }
            FieldType::Text(kind) => NodeValue::Text(TextValue {
                value: meta.default.clone().unwrap_or_else(|| kind.blank_value()),
                kind,
                items: meta.items.clone(),
            }),
            FieldType::Asset(kind) => NodeValue::Asset(AssetRef { kind, target: None }),
        };
        // a linkable field names its category only once it points somewhere
        let asset_type = match meta.field_type {
            FieldType::Asset(kind) if kind != AssetKind::Linkable => {
                Some(kind.wire_name().to_string())
            }
            _ => None,
        };

        Ok(self.arena.push(FieldNode {
            identifier: instance,
            parent_identifier: parent_identifier.to_string(),
            multiple: meta.multiple,
            required: meta.required,
            recycled: false,
            value,
            shape: WireShape {
                asset_type,
                ..WireShape::default()
            },
        }))
    }
}

fn slot(kind: AssetKind, wire: &WireNode) -> (Option<&String>, Option<&String>) {
    match kind {
        AssetKind::Page => (wire.page_id.as_ref(), wire.page_path.as_ref()),
        AssetKind::File => (wire.file_id.as_ref(), wire.file_path.as_ref()),
        AssetKind::Block => (wire.block_id.as_ref(), wire.block_path.as_ref()),
        AssetKind::Symlink => (wire.symlink_id.as_ref(), wire.symlink_path.as_ref()),
        AssetKind::Linkable => (None, None),
    }
}

fn slot_mut(kind: AssetKind, wire: &mut WireNode) -> (&mut Option<String>, &mut Option<String>) {
    match kind {
        AssetKind::Page | AssetKind::Linkable => (&mut wire.page_id, &mut wire.page_path),
        AssetKind::File => (&mut wire.file_id, &mut wire.file_path),
        AssetKind::Block => (&mut wire.block_id, &mut wire.block_path),
        AssetKind::Symlink => (&mut wire.symlink_id, &mut wire.symlink_path),
    }
}

/// First populated slot among the kinds the declaration accepts
fn read_target(declared: AssetKind, wire: &WireNode) -> Option<AssetTarget> {
    declared.concrete_kinds().iter().find_map(|&kind| {
        let (id, path) = slot(kind, wire);
        (id.is_some() || path.is_some()).then(|| AssetTarget {
            kind,
            id: id.cloned(),
            path: path.cloned(),
        })
    })
}

/// Serialize a subtree back to its wire form
pub(crate) fn to_wire(arena: &Arena, id: NodeId) -> WireNode {
    let node = arena.get(id);
    let name = node.name().to_string();
    let mut wire = match &node.value {
        NodeValue::Group { children } => {
            let mut wire = WireNode::empty(WireNodeType::Group, name);
            if !(node.shape.children_absent && children.is_empty()) {
                wire.structured_data_nodes =
                    Some(children.iter().map(|&c| to_wire(arena, c)).collect());
            }
            wire
        }
        NodeValue::Text(text) => {
            let mut wire = WireNode::empty(WireNodeType::Text, name);
            if !(node.shape.text_absent && text.value.is_empty()) {
                wire.text = Some(text.value.clone());
            }
            wire
        }
        NodeValue::Asset(asset) => {
            let mut wire = WireNode::empty(WireNodeType::Asset, name);
            wire.asset_type = node.shape.asset_type.clone();
            if let Some(target) = &asset.target {
                let (id, path) = slot_mut(target.kind, &mut wire);
                *id = target.id.clone();
                *path = target.path.clone();
            }
            wire
        }
    };
    wire.recycled = node.recycled;
    wire
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_indices_restart_per_run() {
        assert_eq!(run_indices(["a", "a", "b", "a", "a", "a"]), vec![0, 1, 0, 0, 1, 2]);
        assert_eq!(run_indices(Vec::<&str>::new()), Vec::<u32>::new());
    }

    #[test]
    fn test_linkable_reads_first_populated_slot() {
        let mut wire = WireNode::empty(WireNodeType::Asset, "link");
        wire.asset_type = Some("page,file,symlink".into());
        wire.file_id = Some("f1".into());
        wire.file_path = Some("/docs/a.pdf".into());
        let target = read_target(AssetKind::Linkable, &wire).unwrap();
        assert_eq!(target.kind, AssetKind::File);
        assert_eq!(target.path.as_deref(), Some("/docs/a.pdf"));
        assert!(read_target(AssetKind::Block, &wire).is_none());
    }
}
