//! Insert and remove against the persisted tree structure.
//!
//! Mutations operate through the object adapter, guided by the cached
//! [`FlatView`]: the view locates the leaf to touch and supplies its
//! ancestor path, and the engine rewrites `Nums`, `Kids`, and `Limits`
//! in place. The root object always keeps its identity; growth pushes its
//! payload down into a fresh child, and shrinkage pulls a lone child's
//! payload back up.
//!
//! Either a mutation completes or it fails before touching the structure;
//! the visible mapping never ends up half-changed.

use crate::node::{self, KIDS, LIMITS, NUMS};
use crate::walker::FlatView;
use vellum_common::{Result, VellumError};
use vellum_object::{Document, ObjId};

fn invariant(msg: &str) -> VellumError {
    VellumError::InvariantViolation(msg.to_string())
}

/// Inserts or replaces `key`. An existing key has its value replaced in
/// place with no restructuring; a new key is spliced into the correct leaf,
/// splitting overfull nodes toward the root.
pub(crate) fn insert(
    doc: &Document,
    root: ObjId,
    view: &FlatView,
    capacity: usize,
    key: i64,
    value: ObjId,
) -> Result<()> {
    match view.lookup(key) {
        Ok(i) => replace_in_leaf(doc, view.entries[i].leaf, key, value),
        Err(i) => {
            // Target: the leaf holding the greatest key below ours, else the
            // first leaf, else the root itself.
            let leaf = if i > 0 {
                view.entries[i - 1].leaf
            } else if let Some(first) = view.leaves.first() {
                *first
            } else {
                root
            };

            // A root that is intermediate yet owns no leaves covers nothing;
            // demote it to a leaf before inserting.
            if leaf == root && doc.dict_contains(root, KIDS) {
                doc.dict_remove(root, KIDS);
            }

            let mut pairs = node::leaf_pairs(doc, leaf).unwrap_or_default();
            let pos = match pairs.binary_search_by_key(&key, |(k, _)| *k) {
                Ok(_) => return Err(invariant("key present in leaf but absent from view")),
                Err(pos) => pos,
            };
            pairs.insert(pos, (key, value));
            node::write_pairs(doc, leaf, &pairs);

            let path = view.paths.get(&leaf).cloned().unwrap_or_default();
            if leaf != root {
                node::recompute_limits(doc, leaf);
            }
            refresh_ancestors(doc, root, &path);

            if pairs.len() > capacity {
                split_upward(doc, root, leaf, path, capacity)?;
            }
            Ok(())
        }
    }
}

/// Removes `key`, returning its value. Empty nodes are unlinked upward and
/// a thinned-out root collapses back toward a single leaf.
pub(crate) fn remove(doc: &Document, root: ObjId, view: &FlatView, key: i64) -> Result<ObjId> {
    let Ok(i) = view.lookup(key) else {
        return Err(VellumError::KeyNotFound(key));
    };
    let leaf = view.entries[i].leaf;

    let mut pairs = node::leaf_pairs(doc, leaf).ok_or_else(|| invariant("view leaf is not a leaf"))?;
    let pos = pairs
        .iter()
        .position(|(k, _)| *k == key)
        .ok_or_else(|| invariant("view key missing from leaf"))?;
    let (_, value) = pairs.remove(pos);
    node::write_pairs(doc, leaf, &pairs);

    let path = view.paths.get(&leaf).cloned().unwrap_or_default();
    if pairs.is_empty() && leaf != root {
        prune_upward(doc, root, leaf, &path)?;
    } else {
        if leaf != root {
            node::recompute_limits(doc, leaf);
        }
        refresh_ancestors(doc, root, &path);
    }
    collapse_root(doc, root);

    Ok(value)
}

/// Rewrites the value slot of an existing key.
fn replace_in_leaf(doc: &Document, leaf: ObjId, key: i64, value: ObjId) -> Result<()> {
    let nums = doc
        .dict_get(leaf, NUMS)
        .ok_or_else(|| invariant("view leaf has no Nums"))?;
    let len = doc.array_len(nums).unwrap_or(0);
    for i in (0..len.saturating_sub(1)).step_by(2) {
        if doc.array_get(nums, i).and_then(|slot| doc.as_integer(slot)) == Some(key) {
            doc.array_set(nums, i + 1, value);
            return Ok(());
        }
    }
    Err(invariant("view key missing from leaf"))
}

/// Recomputes `Limits` for every non-root node on the path, bottom-up.
fn refresh_ancestors(doc: &Document, root: ObjId, path: &[ObjId]) {
    for id in path.iter().rev() {
        if *id != root {
            node::recompute_limits(doc, *id);
        }
    }
}

/// Splits overfull nodes from `node_id` toward the root.
fn split_upward(
    doc: &Document,
    root: ObjId,
    mut node_id: ObjId,
    mut path: Vec<ObjId>,
    capacity: usize,
) -> Result<()> {
    loop {
        let count = payload_len(doc, node_id);
        if count <= capacity {
            return Ok(());
        }

        if node_id == root {
            // Push the root's payload into a fresh child so the overfull
            // node gains a parent; the root keeps its identity.
            let child = doc.make_dictionary().id();
            if let Some(nums) = doc.dict_get(root, NUMS) {
                doc.dict_set(child, NUMS, nums);
                doc.dict_remove(root, NUMS);
            } else if let Some(kids) = doc.dict_get(root, KIDS) {
                doc.dict_set(child, KIDS, kids);
            }
            node::recompute_limits(doc, child);
            let kids_array = doc.make_array_from(vec![child]);
            doc.dict_set(root, KIDS, kids_array.id());
            path = vec![root];
            node_id = child;
            continue;
        }

        let Some(&parent) = path.last() else {
            return Err(invariant("overfull node has no parent"));
        };
        split_node(doc, node_id, parent)?;
        node_id = parent;
        path.pop();
    }
}

/// Number of pairs in a leaf, or kids in an intermediate.
fn payload_len(doc: &Document, id: ObjId) -> usize {
    if let Some(nums) = doc.dict_get(id, NUMS) {
        doc.array_len(nums).unwrap_or(0) / 2
    } else if let Some(kids) = doc.dict_get(id, KIDS) {
        doc.array_len(kids).unwrap_or(0)
    } else {
        0
    }
}

/// Splits one node at its midpoint, inserting the new right sibling into
/// the parent's `Kids` just after the left.
fn split_node(doc: &Document, node_id: ObjId, parent: ObjId) -> Result<()> {
    let kids = node::kid_ids(doc, parent).ok_or_else(|| invariant("split parent has no Kids"))?;
    let pos = kids
        .iter()
        .position(|k| *k == node_id)
        .ok_or_else(|| invariant("split node missing from parent Kids"))?;

    let right = if let Some(pairs) = node::leaf_pairs(doc, node_id) {
        let mid = pairs.len() / 2;
        let right = node::leaf_from_pairs(doc, &pairs[mid..]);
        node::write_pairs(doc, node_id, &pairs[..mid]);
        node::recompute_limits(doc, node_id);
        right
    } else {
        let child_ids =
            node::kid_ids(doc, node_id).ok_or_else(|| invariant("split node has no payload"))?;
        let mid = child_ids.len() / 2;
        let right = doc.make_dictionary().id();
        let right_kids = doc.make_array_from(child_ids[mid..].to_vec());
        doc.dict_set(right, KIDS, right_kids.id());
        node::recompute_limits(doc, right);
        let left_kids = doc
            .dict_get(node_id, KIDS)
            .ok_or_else(|| invariant("split node lost its Kids"))?;
        doc.array_replace(left_kids, child_ids[..mid].to_vec());
        node::recompute_limits(doc, node_id);
        right
    };

    let parent_kids = doc
        .dict_get(parent, KIDS)
        .ok_or_else(|| invariant("split parent lost its Kids"))?;
    doc.array_insert(parent_kids, pos + 1, right);
    Ok(())
}

/// Unlinks an emptied leaf from its parent, propagating upward while
/// parents empty out, then refreshes `Limits` on the surviving chain.
fn prune_upward(doc: &Document, root: ObjId, leaf: ObjId, path: &[ObjId]) -> Result<()> {
    let mut child = leaf;
    let mut idx = path.len();
    while idx > 0 {
        let parent = path[idx - 1];
        let kids_id = doc
            .dict_get(parent, KIDS)
            .ok_or_else(|| invariant("prune parent has no Kids"))?;
        let len = doc.array_len(kids_id).unwrap_or(0);
        if let Some(pos) = (0..len).position(|i| doc.array_get(kids_id, i) == Some(child)) {
            doc.array_remove(kids_id, pos);
        }
        if parent == root || doc.array_len(kids_id).unwrap_or(0) > 0 {
            refresh_ancestors(doc, root, &path[..idx]);
            return Ok(());
        }
        child = parent;
        idx -= 1;
    }
    Ok(())
}

/// Collapses a root intermediate left with zero kids (back to an empty
/// leaf) or one kid (the kid's payload moves into the root), iterating
/// through single-kid chains.
fn collapse_root(doc: &Document, root: ObjId) {
    loop {
        let Some(kids_id) = doc.dict_get(root, KIDS) else {
            return;
        };
        match doc.array_len(kids_id).unwrap_or(0) {
            0 => {
                doc.dict_remove(root, KIDS);
                node::write_pairs(doc, root, &[]);
                doc.dict_remove(root, LIMITS);
                return;
            }
            1 => {
                let Some(kid) = doc.array_get(kids_id, 0) else {
                    return;
                };
                if let Some(nums) = doc.dict_get(kid, NUMS) {
                    doc.dict_set(root, NUMS, nums);
                    doc.dict_remove(root, KIDS);
                } else if let Some(kid_kids) = doc.dict_get(kid, KIDS) {
                    doc.dict_set(root, KIDS, kid_kids);
                } else {
                    doc.dict_remove(root, KIDS);
                    node::write_pairs(doc, root, &[]);
                }
                doc.dict_remove(root, LIMITS);
            }
            _ => return,
        }
    }
}
