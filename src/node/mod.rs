//! Field nodes
//!
//! A [`FieldNode`] is one node of a structured-data tree. Nodes live in an
//! [`Arena`] owned by the tree; groups refer to their children by [`NodeId`],
//! and parents are recorded by instance identifier only.

mod build;
pub mod text;

pub(crate) use build::{run_indices, to_wire, NodeBuilder};
pub use text::{TextPattern, TextRules};

use serde::{Deserialize, Serialize};

use crate::error::{Result, StructuredDataError};
use crate::identifier;
use crate::schema::{AssetKind, TextKind};

/// Position of a node in its tree's arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub(crate) usize);

/// Text payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextValue {
    pub value: String,
    pub kind: TextKind,
    /// Allowed values, in declaration order
    pub items: Vec<String>,
}

/// The asset a reference points at
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetTarget {
    /// Concrete kind; never [`AssetKind::Linkable`]
    pub kind: AssetKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

/// Asset payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetRef {
    /// Declared kind of the field
    pub kind: AssetKind,
    pub target: Option<AssetTarget>,
}

/// Node payload: a closed variant over the three node types
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeValue {
    Group { children: Vec<NodeId> },
    Text(TextValue),
    Asset(AssetRef),
}

impl NodeValue {
    pub fn type_name(&self) -> &'static str {
        match self {
            NodeValue::Group { .. } => "group",
            NodeValue::Text(_) => "text",
            NodeValue::Asset(_) => "asset",
        }
    }
}

/// Optional wire members as they arrived, so serialization gives back
/// what was parsed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct WireShape {
    /// `text` was absent or null
    pub text_absent: bool,
    /// the group had no `structuredDataNodes` member
    pub children_absent: bool,
    /// `assetType` as received, or the kind of the last target set
    pub asset_type: Option<String>,
}

/// One node of a structured-data tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldNode {
    pub(crate) identifier: String,
    pub(crate) parent_identifier: String,
    pub(crate) multiple: bool,
    pub(crate) required: bool,
    pub(crate) recycled: bool,
    pub(crate) value: NodeValue,
    pub(crate) shape: WireShape,
}

impl FieldNode {
    /// Instance identifier, unique within the tree
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// Instance identifier of the enclosing group; empty for top-level nodes
    pub fn parent_identifier(&self) -> &str {
        &self.parent_identifier
    }

    pub fn field_path(&self) -> String {
        identifier::field_segments(&self.identifier)
            .collect::<Vec<_>>()
            .join(";")
    }

    /// The single segment this node carries on the wire
    pub fn name(&self) -> &str {
        identifier::leaf_name(&self.identifier)
    }

    pub fn is_multiple(&self) -> bool {
        self.multiple
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    pub fn is_recycled(&self) -> bool {
        self.recycled
    }

    pub fn value(&self) -> &NodeValue {
        &self.value
    }

    pub fn is_group(&self) -> bool {
        matches!(self.value, NodeValue::Group { .. })
    }

    pub fn text(&self) -> Option<&str> {
        match &self.value {
            NodeValue::Text(t) => Some(&t.value),
            _ => None,
        }
    }

    pub fn text_kind(&self) -> Option<TextKind> {
        match &self.value {
            NodeValue::Text(t) => Some(t.kind),
            _ => None,
        }
    }

    pub fn asset(&self) -> Option<&AssetRef> {
        match &self.value {
            NodeValue::Asset(a) => Some(a),
            _ => None,
        }
    }

    pub(crate) fn children(&self) -> &[NodeId] {
        match &self.value {
            NodeValue::Group { children } => children,
            _ => &[],
        }
    }

    fn mismatch(&self, expected: &'static str) -> StructuredDataError {
        StructuredDataError::NodeKindMismatch {
            identifier: self.identifier.clone(),
            expected,
            actual: self.value.type_name(),
        }
    }

    /// Validate, encode and store a text value.
    ///
    /// The node is left untouched when validation fails.
    pub fn set_text(&mut self, input: &str, rules: &TextRules) -> Result<()> {
        let encoded = match &self.value {
            NodeValue::Text(t) => text::encode(&self.identifier, t, self.required, input, rules)?,
            _ => return Err(self.mismatch("text")),
        };
        if let NodeValue::Text(t) = &mut self.value {
            t.value = encoded;
            self.shape.text_absent = false;
        }
        Ok(())
    }

    /// Point the node at an asset of `kind`, or clear it when both `id`
    /// and `path` are `None`.
    ///
    /// A linkable field holds at most one of page, file or symlink; setting
    /// one replaces the others.
    pub fn set_asset_ref(
        &mut self,
        kind: AssetKind,
        id: Option<&str>,
        path: Option<&str>,
    ) -> Result<()> {
        let declared = match &self.value {
            NodeValue::Asset(a) => a.kind,
            _ => return Err(self.mismatch("asset")),
        };

        // a linkable field may also be cleared by naming its own kind
        if kind != declared && !declared.accepts(kind) {
            return Err(StructuredDataError::WrongAssetKind {
                identifier: self.identifier.clone(),
                expected: declared.to_string(),
                actual: kind.to_string(),
            });
        }

        let present = |s: Option<&str>| s.filter(|s| !s.trim().is_empty()).map(str::to_string);
        let (id, path) = (present(id), present(path));
        let target = if id.is_none() && path.is_none() {
            if self.required {
                return Err(StructuredDataError::EmptyRequiredValue(
                    self.identifier.clone(),
                ));
            }
            None
        } else if kind == AssetKind::Linkable {
            return Err(StructuredDataError::WrongAssetKind {
                identifier: self.identifier.clone(),
                expected: "page, file or symlink".to_string(),
                actual: kind.to_string(),
            });
        } else {
            Some(AssetTarget { kind, id, path })
        };

        if let Some(t) = &target {
            self.shape.asset_type = Some(t.kind.wire_name().to_string());
        }
        if let NodeValue::Asset(a) = &mut self.value {
            a.target = target;
        }
        Ok(())
    }
}

/// Node storage for one tree
#[derive(Debug, Clone, Default)]
pub(crate) struct Arena {
    nodes: Vec<FieldNode>,
}

impl Arena {
    pub fn push(&mut self, node: FieldNode) -> NodeId {
        self.nodes.push(node);
        NodeId(self.nodes.len() - 1)
    }

    pub fn get(&self, id: NodeId) -> &FieldNode {
        &self.nodes[id.0]
    }

    pub fn get_mut(&mut self, id: NodeId) -> &mut FieldNode {
        &mut self.nodes[id.0]
    }

    /// Deep-copy a subtree. The copy keeps the source identifiers until the
    /// owning tree relabels it.
    pub fn deep_clone(&mut self, id: NodeId) -> NodeId {
        let mut copy = self.get(id).clone();
        if let NodeValue::Group { children } = &mut copy.value {
            let originals = std::mem::take(children);
            *children = originals.into_iter().map(|c| self.deep_clone(c)).collect();
        }
        self.push(copy)
    }
}
