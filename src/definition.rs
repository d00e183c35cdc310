//! Data definitions
//!
//! A data definition declares the fields of a structured-data tree. It is
//! loaded from JSON and indexed by field path so it can serve as a
//! [`SchemaOracle`].
//!
//! ```json
//! {
//!   "id": "1f2a...",
//!   "path": "/_cms/definitions/news",
//!   "fields": [
//!     { "type": "group", "identifier": "items", "fields": [
//!       { "type": "text", "identifier": "entry", "multiple": true }
//!     ]},
//!     { "type": "text", "identifier": "flags", "textType": "checkbox", "items": ["a", "b"] },
//!     { "type": "asset", "identifier": "link", "assetType": "page,file,symlink" }
//!   ]
//! }
//! ```

use std::collections::{HashMap, HashSet};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, StructuredDataError};
use crate::identifier;
use crate::schema::{AssetKind, FieldMeta, FieldType, SchemaIndex, SchemaOracle, TextKind};

/// One declared field
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum FieldDecl {
    Group {
        identifier: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        label: Option<String>,
        #[serde(default)]
        multiple: bool,
        #[serde(default)]
        required: bool,
        #[serde(default)]
        fields: Vec<FieldDecl>,
    },
    Text {
        identifier: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        label: Option<String>,
        #[serde(default)]
        multiple: bool,
        #[serde(default)]
        required: bool,
        #[serde(default, rename = "textType")]
        text_type: TextKind,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        items: Vec<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        default: Option<String>,
    },
    Asset {
        identifier: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        label: Option<String>,
        #[serde(default)]
        multiple: bool,
        #[serde(default)]
        required: bool,
        #[serde(rename = "assetType")]
        asset_type: AssetKind,
    },
}

impl FieldDecl {
    pub fn identifier(&self) -> &str {
        match self {
            FieldDecl::Group { identifier, .. }
            | FieldDecl::Text { identifier, .. }
            | FieldDecl::Asset { identifier, .. } => identifier,
        }
    }

    fn meta(&self) -> FieldMeta {
        match self {
            FieldDecl::Group {
                label,
                multiple,
                required,
                ..
            } => FieldMeta {
                field_type: FieldType::Group,
                required: *required,
                multiple: *multiple,
                items: Vec::new(),
                default: None,
                label: label.clone(),
            },
            FieldDecl::Text {
                label,
                multiple,
                required,
                text_type,
                items,
                default,
                ..
            } => FieldMeta {
                field_type: FieldType::Text(*text_type),
                required: *required,
                multiple: *multiple,
                items: items.clone(),
                default: default.clone(),
                label: label.clone(),
            },
            FieldDecl::Asset {
                label,
                multiple,
                required,
                asset_type,
                ..
            } => FieldMeta {
                field_type: FieldType::Asset(*asset_type),
                required: *required,
                multiple: *multiple,
                items: Vec::new(),
                default: None,
                label: label.clone(),
            },
        }
    }
}

/// Serialized form of a data definition
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DefinitionDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    pub fields: Vec<FieldDecl>,
}

/// A data definition indexed by field path
#[derive(Debug, Clone)]
pub struct DataDefinition {
    document: DefinitionDocument,
    metas: HashMap<String, FieldMeta>,
    children: HashMap<String, Vec<String>>,
}

impl DataDefinition {
    /// Index a definition document, rejecting unusable declarations
    pub fn from_document(document: DefinitionDocument) -> Result<Self> {
        let mut definition = Self {
            document: DefinitionDocument::default(),
            metas: HashMap::new(),
            children: HashMap::new(),
        };
        definition.index_fields("", &document.fields)?;
        definition.document = document;
        Ok(definition)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Self::from_document(serde_json::from_str(json)?)
    }

    pub fn from_value(value: serde_json::Value) -> Result<Self> {
        Self::from_document(serde_json::from_value(value)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn document(&self) -> &DefinitionDocument {
        &self.document
    }

    /// Wrap into a shareable [`SchemaIndex`]
    pub fn into_index(self) -> SchemaIndex {
        SchemaIndex::new(self)
    }

    fn index_fields(&mut self, parent: &str, fields: &[FieldDecl]) -> Result<()> {
        let mut seen = HashSet::new();
        let mut child_paths = Vec::with_capacity(fields.len());

        for decl in fields {
            let name = decl.identifier();
            check_segment(parent, name)?;
            if !seen.insert(name) {
                return Err(StructuredDataError::InvalidDefinition(format!(
                    "duplicate field '{}'",
                    identifier::join(parent, name)
                )));
            }

            let path = identifier::join(parent, name);
            if let FieldDecl::Group { fields, .. } = decl {
                self.index_fields(&path, fields)?;
            }
            self.metas.insert(path.clone(), decl.meta());
            child_paths.push(path);
        }

        self.children.insert(parent.to_string(), child_paths);
        Ok(())
    }
}

fn check_segment(parent: &str, name: &str) -> Result<()> {
    let valid = !name.is_empty()
        && !name.contains(identifier::DELIMITER)
        && !name.contains(':')
        && !name.bytes().all(|b| b.is_ascii_digit());
    if valid {
        Ok(())
    } else {
        Err(StructuredDataError::InvalidDefinition(format!(
            "field identifier '{}' under '{}' cannot be used as a path segment",
            name, parent
        )))
    }
}

impl SchemaOracle for DataDefinition {
    fn field_meta(&self, field_path: &str) -> Option<&FieldMeta> {
        self.metas.get(field_path)
    }

    fn child_fields(&self, parent: &str) -> Vec<String> {
        self.children.get(parent).cloned().unwrap_or_default()
    }

    fn definition_id(&self) -> Option<&str> {
        self.document.id.as_deref()
    }

    fn definition_path(&self) -> Option<&str> {
        self.document.path.as_deref()
    }
}
