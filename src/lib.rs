//! Cascade Structured Data
//!
//! A schema-driven tree model for the structured data of CMS assets: typed
//! group, text and asset nodes addressed by `;`-delimited instance
//! identifiers, validated against a data definition.
//!
//! ## Features
//!
//! - **Instance identifiers**: `group;1;field;0`, indexed only where a field is multiple
//! - **Typed text**: checkbox, radio, dropdown, multiselect, date and datetime validation
//! - **Structural edits**: grow, shrink and swap instances of multiple fields
//! - **Migration**: carry data onto another data definition, reconcile phantom trees
//! - **Checksums**: SHA256 over the canonical wire form
//!
//! ## Architecture
//!
//! ```text
//! DataDefinition ──► SchemaIndex ─┐
//!                                 ▼
//! StructuredData (wire) ──► StructuredTree ──► StructuredData (wire)
//!                            │
//!                            ├── Arena<FieldNode>
//!                            └── identifier ──► NodeId
//! ```

pub mod checksum;
pub mod config;
pub mod definition;
pub mod error;
pub mod identifier;
pub mod lookup;
pub mod node;
pub mod reconcile;
pub mod schema;
pub mod tree;
pub mod wire;

pub use checksum::Checksum;
pub use config::SdConfig;
pub use definition::DataDefinition;
pub use error::{Result, StructuredDataError};
pub use lookup::{AssetLookup, DefinitionLookup};
pub use node::{AssetRef, AssetTarget, FieldNode, NodeValue, TextPattern, TextRules, TextValue};
pub use reconcile::{CopyReport, PhantomReconciler};
pub use schema::{AssetKind, FieldMeta, FieldType, SchemaIndex, SchemaOracle, TextKind};
pub use tree::StructuredTree;
pub use wire::{StructuredData, WireNode, WireNodeType};
