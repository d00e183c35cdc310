//! Schema types and the read-only schema index
//!
//! The data definition governing a tree is consumed through the
//! [`SchemaOracle`] trait. [`SchemaIndex`] is the cheap, cloneable handle the
//! tree carries for its whole lifetime.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{Result, StructuredDataError};
use crate::identifier;

/// Sentinel prefix for checkbox values
pub const CHECKBOX_PREFIX: &str = "::CONTENT-XML-CHECKBOX::";

/// Sentinel prefix for multiselect values
pub const SELECTOR_PREFIX: &str = "::CONTENT-XML-SELECTOR::";

/// UI subtype of a text field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextKind {
    /// Single-line free text
    #[default]
    #[serde(alias = "text")]
    Plain,
    /// Textarea
    #[serde(alias = "multi-line")]
    Multiline,
    /// Rich-text editor
    Wysiwyg,
    Checkbox,
    #[serde(alias = "radiobutton")]
    Radio,
    Dropdown,
    #[serde(alias = "multi-selector", alias = "multiselector")]
    Multiselect,
    #[serde(alias = "calendar")]
    Date,
    Datetime,
}

impl TextKind {
    /// Name used in definitions and diagnostics
    pub fn as_str(&self) -> &'static str {
        match self {
            TextKind::Plain => "plain",
            TextKind::Multiline => "multiline",
            TextKind::Wysiwyg => "wysiwyg",
            TextKind::Checkbox => "checkbox",
            TextKind::Radio => "radio",
            TextKind::Dropdown => "dropdown",
            TextKind::Multiselect => "multiselect",
            TextKind::Date => "date",
            TextKind::Datetime => "datetime",
        }
    }

    /// The wire sentinel for subtypes that encode selections with one
    pub fn sentinel(&self) -> Option<&'static str> {
        match self {
            TextKind::Checkbox => Some(CHECKBOX_PREFIX),
            TextKind::Multiselect => Some(SELECTOR_PREFIX),
            _ => None,
        }
    }

    /// Subtypes whose values come from a fixed item list.
    ///
    /// These are excluded from free-text replacement.
    pub fn is_enumerated(&self) -> bool {
        matches!(
            self,
            TextKind::Checkbox | TextKind::Radio | TextKind::Dropdown | TextKind::Multiselect
        )
    }

    /// Value a freshly created node carries
    pub fn blank_value(&self) -> String {
        self.sentinel().unwrap_or_default().to_string()
    }
}

impl fmt::Display for TextKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Asset category an asset field points at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetKind {
    Page,
    File,
    Block,
    Symlink,
    /// Any one of page, file or symlink
    #[serde(rename = "page,file,symlink", alias = "linkable")]
    Linkable,
}

impl AssetKind {
    /// The `assetType` string used on the wire
    pub fn wire_name(&self) -> &'static str {
        match self {
            AssetKind::Page => "page",
            AssetKind::File => "file",
            AssetKind::Block => "block",
            AssetKind::Symlink => "symlink",
            AssetKind::Linkable => "page,file,symlink",
        }
    }

    /// Parse a wire `assetType`; unrecognized categories yield `None`
    pub fn from_wire(s: &str) -> Option<Self> {
        match s {
            "page" => Some(AssetKind::Page),
            "file" => Some(AssetKind::File),
            "block" => Some(AssetKind::Block),
            "symlink" => Some(AssetKind::Symlink),
            "page,file,symlink" | "linkable" => Some(AssetKind::Linkable),
            _ => None,
        }
    }

    /// Whether a field declared with this kind may hold an asset of `concrete` kind
    pub fn accepts(&self, concrete: AssetKind) -> bool {
        match self {
            AssetKind::Linkable => matches!(
                concrete,
                AssetKind::Page | AssetKind::File | AssetKind::Symlink
            ),
            declared => *declared == concrete,
        }
    }

    /// Concrete kinds in the order their slots appear on the wire
    pub fn concrete_kinds(&self) -> &'static [AssetKind] {
        match self {
            AssetKind::Page => &[AssetKind::Page],
            AssetKind::File => &[AssetKind::File],
            AssetKind::Block => &[AssetKind::Block],
            AssetKind::Symlink => &[AssetKind::Symlink],
            AssetKind::Linkable => &[AssetKind::Page, AssetKind::File, AssetKind::Symlink],
        }
    }
}

impl fmt::Display for AssetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_name())
    }
}

/// Declared type of a field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    Group,
    Text(TextKind),
    Asset(AssetKind),
}

impl FieldType {
    /// Wire `type` of nodes of this field
    pub fn node_type(&self) -> &'static str {
        match self {
            FieldType::Group => "group",
            FieldType::Text(_) => "text",
            FieldType::Asset(_) => "asset",
        }
    }
}

/// Everything the schema declares about one field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldMeta {
    pub field_type: FieldType,
    pub required: bool,
    pub multiple: bool,
    /// Allowed values for enumerated text subtypes
    #[serde(default)]
    pub items: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl FieldMeta {
    pub fn text_kind(&self) -> Option<TextKind> {
        match self.field_type {
            FieldType::Text(kind) => Some(kind),
            _ => None,
        }
    }

    pub fn asset_kind(&self) -> Option<AssetKind> {
        match self.field_type {
            FieldType::Asset(kind) => Some(kind),
            _ => None,
        }
    }

    pub fn multiline(&self) -> bool {
        self.text_kind() == Some(TextKind::Multiline)
    }

    pub fn wysiwyg(&self) -> bool {
        self.text_kind() == Some(TextKind::Wysiwyg)
    }
}

/// Read-only source of field declarations, keyed by field path.
pub trait SchemaOracle: Send + Sync {
    /// Declaration of a field, `None` if the field path is not declared
    fn field_meta(&self, field_path: &str) -> Option<&FieldMeta>;

    /// Field paths of the children of `parent`, in declaration order.
    /// The empty parent lists top-level fields.
    fn child_fields(&self, parent: &str) -> Vec<String>;

    fn definition_id(&self) -> Option<&str> {
        None
    }

    fn definition_path(&self) -> Option<&str> {
        None
    }
}

/// Shared handle over a schema oracle
#[derive(Clone)]
pub struct SchemaIndex {
    oracle: Arc<dyn SchemaOracle>,
}

impl fmt::Debug for SchemaIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchemaIndex")
            .field("definition_id", &self.definition_id())
            .field("definition_path", &self.definition_path())
            .finish()
    }
}

impl SchemaIndex {
    pub fn new(oracle: impl SchemaOracle + 'static) -> Self {
        Self {
            oracle: Arc::new(oracle),
        }
    }

    pub fn from_arc(oracle: Arc<dyn SchemaOracle>) -> Self {
        Self { oracle }
    }

    /// Declaration of a field path
    pub fn field_meta(&self, field_path: &str) -> Result<&FieldMeta> {
        self.oracle
            .field_meta(field_path)
            .ok_or_else(|| StructuredDataError::UnknownField(field_path.to_string()))
    }

    pub fn is_multiple(&self, field_path: &str) -> Result<bool> {
        self.field_meta(field_path).map(|m| m.multiple)
    }

    pub fn has_field(&self, field_path: &str) -> bool {
        self.oracle.field_meta(field_path).is_some()
    }

    pub fn child_fields(&self, parent: &str) -> Vec<String> {
        self.oracle.child_fields(parent)
    }

    /// Every declared field path, depth-first in declaration order
    pub fn field_paths(&self) -> Vec<String> {
        let mut out = Vec::new();
        let mut stack: Vec<String> = self.child_fields("").into_iter().rev().collect();
        while let Some(path) = stack.pop() {
            stack.extend(self.child_fields(&path).into_iter().rev());
            out.push(path);
        }
        out
    }

    /// Whether any proper ancestor of the field is multiple
    pub fn has_repeated_ancestor(&self, field_path: &str) -> Result<bool> {
        self.field_meta(field_path)?;
        let mut parent = identifier::parent_field_path(field_path);
        while !parent.is_empty() {
            if self.is_multiple(parent)? {
                return Ok(true);
            }
            parent = identifier::parent_field_path(parent);
        }
        Ok(false)
    }

    /// Instance identifier of the first instance of a field.
    ///
    /// Only defined when no ancestor is repeated; otherwise the field path
    /// names several sibling runs.
    pub fn first_instance_of(&self, field_path: &str) -> Result<String> {
        if self.has_repeated_ancestor(field_path)? {
            return Err(StructuredDataError::AmbiguousFieldPath(
                field_path.to_string(),
            ));
        }
        let index = self.is_multiple(field_path)?.then_some(0);
        Ok(identifier::instance_id(
            identifier::parent_field_path(field_path),
            identifier::leaf_name(field_path),
            index,
        ))
    }

    pub fn definition_id(&self) -> Option<&str> {
        self.oracle.definition_id()
    }

    pub fn definition_path(&self) -> Option<&str> {
        self.oracle.definition_path()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_asset_kind_accepts() {
        assert!(AssetKind::Linkable.accepts(AssetKind::File));
        assert!(!AssetKind::Linkable.accepts(AssetKind::Block));
        assert!(AssetKind::Page.accepts(AssetKind::Page));
        assert!(!AssetKind::Page.accepts(AssetKind::Symlink));
    }

    #[test]
    fn test_asset_kind_wire_names() {
        assert_eq!(AssetKind::from_wire("page,file,symlink"), Some(AssetKind::Linkable));
        assert_eq!(AssetKind::from_wire("twitter"), None);
        let json = serde_json::to_string(&AssetKind::Linkable).unwrap();
        assert_eq!(json, "\"page,file,symlink\"");
    }

    #[test]
    fn test_text_kind_aliases() {
        let kind: TextKind = serde_json::from_str("\"radiobutton\"").unwrap();
        assert_eq!(kind, TextKind::Radio);
        let kind: TextKind = serde_json::from_str("\"multi-selector\"").unwrap();
        assert_eq!(kind, TextKind::Multiselect);
        assert_eq!(TextKind::Checkbox.blank_value(), CHECKBOX_PREFIX);
        assert_eq!(TextKind::Plain.blank_value(), "");
    }
}
