//! Cross-tree data migration and phantom reconciliation
//!
//! Both operations copy leaf values from a source tree into a destination
//! tree by instance identifier, after first growing every multiple field of
//! the destination to at least the source's instance count. Instances the
//! destination already has beyond that count are kept:
//!
//! - `map_data`: source is the asset's tree, destination is the default
//!   shape of another data definition.
//! - `reconcile`: source is a stale phantom tree, destination is a copy of a
//!   tree built from the current definition.
//!
//! Fields the destination does not know, instances it does not have, and
//! values of an incompatible node or asset type are skipped. Validation
//! errors on compatible fields are not.

use serde::Serialize;
use tracing::{debug, trace, warn};

use crate::error::{Result, StructuredDataError};
use crate::node::{FieldNode, NodeValue};
use crate::schema::SchemaIndex;
use crate::tree::StructuredTree;

/// What a copy did
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CopyReport {
    /// Identifiers whose value was written
    pub copied: Vec<String>,
    /// Identifiers skipped, with the reason
    pub skipped: Vec<(String, String)>,
}

impl CopyReport {
    fn skip(&mut self, id: &str, err: &StructuredDataError) {
        warn!(identifier = id, reason = %err, "skipping field");
        self.skipped.push((id.to_string(), err.to_string()));
    }
}

/// Stateless copier between two trees
pub struct PhantomReconciler;

impl PhantomReconciler {
    /// Build `target_schema`'s default tree and fill it with `source`'s data
    pub fn map_data(source: &StructuredTree, target_schema: SchemaIndex) -> Result<StructuredTree> {
        let mut dest = StructuredTree::from_schema(target_schema)?.with_rules(*source.rules());
        let report = Self::copy_data(source, &mut dest)?;
        debug!(
            copied = report.copied.len(),
            skipped = report.skipped.len(),
            "mapped data onto new definition"
        );
        Ok(dest)
    }

    /// Copy a phantom tree's data into a copy of `target`
    pub fn reconcile(target: &StructuredTree, phantom: &StructuredTree) -> Result<StructuredTree> {
        let mut dest = target.clone();
        let report = Self::copy_data(phantom, &mut dest)?;
        debug!(
            copied = report.copied.len(),
            skipped = report.skipped.len(),
            "reconciled phantom tree"
        );
        Ok(dest)
    }

    /// Grow `dest` to `source`'s multiplicities, then copy leaf values.
    /// Nothing is removed from `dest`.
    pub fn copy_data(source: &StructuredTree, dest: &mut StructuredTree) -> Result<CopyReport> {
        let mut report = CopyReport::default();

        // outer fields come first, so nested runs exist by the time they
        // are grown
        for first in source.multiple_first_instances() {
            let count = source.sibling_count(&first)?;
            match Self::grow_run(dest, &first, count) {
                Ok(()) => {}
                Err(e) if e.is_skippable() => report.skip(&first, &e),
                Err(e) => return Err(e),
            }
        }
        dest.normalize()?;

        for node in source.nodes() {
            let id = node.identifier();
            match Self::copy_leaf(node, dest) {
                Ok(true) => {
                    trace!(identifier = id, "copied");
                    report.copied.push(id.to_string());
                }
                Ok(false) => {}
                Err(e) if e.is_skippable() || is_incompatible(&e) => report.skip(id, &e),
                Err(e) => return Err(e),
            }
        }
        Ok(report)
    }

    fn grow_run(dest: &mut StructuredTree, first: &str, count: usize) -> Result<()> {
        if dest.sibling_count(first)? < count {
            dest.resize_run(first, count)?;
        }
        Ok(())
    }

    /// Copy one leaf. `Ok(false)` when there was nothing to copy.
    fn copy_leaf(node: &FieldNode, dest: &mut StructuredTree) -> Result<bool> {
        let id = node.identifier();
        match node.value() {
            NodeValue::Group { .. } => Ok(false),
            NodeValue::Text(text) => {
                if text.value.trim().is_empty() || text.value == text.kind.blank_value() {
                    return Ok(false);
                }
                if dest.text(id)? == text.value {
                    return Ok(false);
                }
                dest.set_text(id, &text.value)?;
                Ok(true)
            }
            NodeValue::Asset(asset) => {
                let Some(target) = &asset.target else {
                    return Ok(false);
                };
                dest.asset(id)?;
                dest.set_asset_ref(id, target.kind, target.id.as_deref(), target.path.as_deref())?;
                Ok(true)
            }
        }
    }
}

/// Values whose destination field changed shape: a different node type or
/// an asset category the destination no longer accepts
fn is_incompatible(err: &StructuredDataError) -> bool {
    matches!(
        err,
        StructuredDataError::NodeKindMismatch { .. } | StructuredDataError::WrongAssetKind { .. }
    )
}
