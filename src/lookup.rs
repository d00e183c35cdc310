//! Lookups into the CMS service layer
//!
//! The tree never talks to the network. Whoever owns the client connection
//! passes these in; closures work directly.

use crate::error::Result;
use crate::node::AssetTarget;
use crate::schema::{AssetKind, SchemaIndex};

/// Resolves a data definition by id
pub trait DefinitionLookup {
    fn fetch_definition(&self, id: &str) -> Result<SchemaIndex>;
}

impl<F> DefinitionLookup for F
where
    F: Fn(&str) -> Result<SchemaIndex>,
{
    fn fetch_definition(&self, id: &str) -> Result<SchemaIndex> {
        self(id)
    }
}

/// Resolves an asset reference by id and kind
pub trait AssetLookup {
    fn fetch_asset(&self, id: &str, kind: AssetKind) -> Result<AssetTarget>;
}

impl<F> AssetLookup for F
where
    F: Fn(&str, AssetKind) -> Result<AssetTarget>,
{
    fn fetch_asset(&self, id: &str, kind: AssetKind) -> Result<AssetTarget> {
        self(id, kind)
    }
}
