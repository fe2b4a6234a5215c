//! Best-effort reconstruction of damaged number trees.
//!
//! Repair rebuilds in place: the root object keeps its identity, because the
//! host document references the tree through that handle. Whatever malformed
//! nodes the old structure pointed at are simply abandoned; reclaiming them
//! is the document's concern.

use crate::node::{self, KIDS, LIMITS, NUMS};
use crate::walker;
use tracing::info;
use vellum_common::{Result, TreeConfig, VellumError};
use vellum_object::{Document, ObjId};

/// Rebuilds the tree at `root` from whatever entries could be salvaged.
/// Returns the number of entries retained.
///
/// Salvaged pairs are sorted ascending; duplicate keys keep their first
/// occurrence in traversal order (the salvage walk already drops later
/// ones). The result is a single root leaf when the pairs fit one node,
/// otherwise a minimal two-level tree of fresh leaves with exact `Limits`.
pub(crate) fn repair(doc: &Document, root: ObjId, config: &TreeConfig) -> Result<usize> {
    if !doc.is_dictionary(root) {
        return Err(VellumError::Structural(format!(
            "tree root {root} is not a dictionary"
        )));
    }

    let mut entries = walker::salvage(doc, root, config.max_depth);
    entries.sort_by_key(|(key, _)| *key);
    info!(salvaged = entries.len(), root = %root, "rebuilding number tree");

    if entries.len() <= config.leaf_capacity {
        // Root becomes the single leaf.
        node::write_pairs(doc, root, &entries);
        doc.dict_remove(root, KIDS);
    } else {
        let kids: Vec<ObjId> = entries
            .chunks(config.leaf_capacity)
            .map(|chunk| node::leaf_from_pairs(doc, chunk))
            .collect();
        let kids_array = doc.make_array_from(kids);
        doc.dict_set(root, KIDS, kids_array.id());
        doc.dict_remove(root, NUMS);
    }
    // The root never carries limits.
    doc.dict_remove(root, LIMITS);

    Ok(entries.len())
}
