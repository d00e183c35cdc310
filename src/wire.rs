//! Wire representation of structured data
//!
//! Mirrors the CMS asset payload. Identifiers on the wire are single,
//! index-free segments; compound identifiers exist only in memory.

use serde::{Deserialize, Deserializer, Serialize};

/// Top-level `structuredData` payload
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StructuredData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub definition_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub definition_path: Option<String>,
    #[serde(default, deserialize_with = "node_list")]
    pub structured_data_nodes: Vec<WireNode>,
}

impl StructuredData {
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

/// Node `type` on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WireNodeType {
    Group,
    Text,
    Asset,
}

impl WireNodeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            WireNodeType::Group => "group",
            WireNodeType::Text => "text",
            WireNodeType::Asset => "asset",
        }
    }
}

/// One `structuredDataNode`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireNode {
    #[serde(rename = "type")]
    pub node_type: WireNodeType,
    pub identifier: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asset_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub symlink_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub symlink_path: Option<String>,
    #[serde(default)]
    pub recycled: bool,
    #[serde(
        default,
        deserialize_with = "optional_node_list",
        skip_serializing_if = "Option::is_none"
    )]
    pub structured_data_nodes: Option<Vec<WireNode>>,
}

impl WireNode {
    /// A node of the given type with every optional slot empty
    pub fn empty(node_type: WireNodeType, identifier: impl Into<String>) -> Self {
        Self {
            node_type,
            identifier: identifier.into(),
            text: None,
            asset_type: None,
            block_id: None,
            block_path: None,
            file_id: None,
            file_path: None,
            page_id: None,
            page_path: None,
            symlink_id: None,
            symlink_path: None,
            recycled: false,
            structured_data_nodes: None,
        }
    }

    pub fn children(&self) -> &[WireNode] {
        self.structured_data_nodes.as_deref().unwrap_or_default()
    }
}

/// SOAP responses wrap the array in a `structuredDataNode` member, and
/// collapse single-element arrays to a bare object.
#[derive(Deserialize)]
#[serde(untagged)]
enum NodeListRepr {
    List(Vec<WireNode>),
    Wrapped {
        #[serde(rename = "structuredDataNode")]
        inner: OneOrMany,
    },
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    Many(Vec<WireNode>),
    One(Box<WireNode>),
}

impl From<NodeListRepr> for Vec<WireNode> {
    fn from(repr: NodeListRepr) -> Self {
        match repr {
            NodeListRepr::List(nodes) => nodes,
            NodeListRepr::Wrapped {
                inner: OneOrMany::Many(nodes),
            } => nodes,
            NodeListRepr::Wrapped {
                inner: OneOrMany::One(node),
            } => vec![*node],
        }
    }
}

fn node_list<'de, D>(deserializer: D) -> Result<Vec<WireNode>, D::Error>
where
    D: Deserializer<'de>,
{
    let repr = Option::<NodeListRepr>::deserialize(deserializer)?;
    Ok(repr.map(Vec::from).unwrap_or_default())
}

fn optional_node_list<'de, D>(deserializer: D) -> Result<Option<Vec<WireNode>>, D::Error>
where
    D: Deserializer<'de>,
{
    let repr = Option::<NodeListRepr>::deserialize(deserializer)?;
    Ok(repr.map(Vec::from))
}
