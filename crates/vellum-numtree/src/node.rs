//! Node classification and structural field access for number tree nodes.
//!
//! A number tree node is a dictionary carrying exactly one of two payload
//! fields:
//!
//! ```text
//! leaf:          << /Nums [ k0 v0 k1 v1 ... ]  /Limits [ lo hi ] >>
//! intermediate:  << /Kids [ c0 c1 ... ]        /Limits [ lo hi ] >>
//! ```
//!
//! The root carries no `Limits`. Classification happens once per node and
//! produces a tagged [`NodeKind`], so downstream code matches exhaustively
//! instead of re-probing fields.

use vellum_object::{Document, ObjId};

/// Dictionary field holding a leaf's flattened (key, value) pairs.
pub const NUMS: &str = "Nums";
/// Dictionary field holding an intermediate node's children.
pub const KIDS: &str = "Kids";
/// Dictionary field declaring the inclusive key range of a subtree.
pub const LIMITS: &str = "Limits";

/// One (key, value) pair held directly by a leaf.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LeafEntry {
    /// The integer key.
    pub key: i64,
    /// The associated value object.
    pub value: ObjId,
}

/// An intermediate node's children and declared key range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntermediateNode {
    /// Child node ids in stored order.
    pub kids: Vec<ObjId>,
    /// Declared `Limits`, when present and well-formed. A hint only; never
    /// trusted for traversal correctness.
    pub limits: Option<(i64, i64)>,
}

/// Classification of a number tree node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    /// A leaf holding (key, value) pairs in stored order.
    Leaf(Vec<LeafEntry>),
    /// An intermediate node holding child references.
    Intermediate(IntermediateNode),
    /// Not a usable node: wrong shape, or ambiguous (`Nums` and `Kids`
    /// both present). Ambiguity is never silently resolved.
    Malformed,
}

/// Classifies the object at `id`.
pub fn classify(doc: &Document, id: ObjId) -> NodeKind {
    if !doc.is_dictionary(id) {
        return NodeKind::Malformed;
    }
    match (doc.dict_get(id, NUMS), doc.dict_get(id, KIDS)) {
        (Some(_), Some(_)) | (None, None) => NodeKind::Malformed,
        (Some(nums), None) => classify_leaf(doc, nums),
        (None, Some(kids)) => classify_intermediate(doc, id, kids),
    }
}

fn classify_leaf(doc: &Document, nums: ObjId) -> NodeKind {
    let Some(len) = doc.array_len(nums) else {
        return NodeKind::Malformed;
    };
    if len % 2 != 0 {
        return NodeKind::Malformed;
    }
    let mut entries = Vec::with_capacity(len / 2);
    for i in (0..len).step_by(2) {
        let key = doc.array_get(nums, i).and_then(|slot| doc.as_integer(slot));
        let value = doc.array_get(nums, i + 1);
        match (key, value) {
            (Some(key), Some(value)) => entries.push(LeafEntry { key, value }),
            _ => return NodeKind::Malformed,
        }
    }
    NodeKind::Leaf(entries)
}

fn classify_intermediate(doc: &Document, id: ObjId, kids: ObjId) -> NodeKind {
    let Some(len) = doc.array_len(kids) else {
        return NodeKind::Malformed;
    };
    let mut ids = Vec::with_capacity(len);
    for i in 0..len {
        match doc.array_get(kids, i) {
            Some(kid) => ids.push(kid),
            None => return NodeKind::Malformed,
        }
    }
    NodeKind::Intermediate(IntermediateNode {
        kids: ids,
        limits: read_limits(doc, id),
    })
}

/// Reads a node's declared `Limits` pair, if present and well-formed.
pub fn read_limits(doc: &Document, id: ObjId) -> Option<(i64, i64)> {
    let limits = doc.dict_get(id, LIMITS)?;
    if doc.array_len(limits)? != 2 {
        return None;
    }
    let lo = doc.as_integer(doc.array_get(limits, 0)?)?;
    let hi = doc.as_integer(doc.array_get(limits, 1)?)?;
    Some((lo, hi))
}

/// Reads a leaf's pairs in stored order. `None` when the node is not a
/// well-formed leaf.
pub(crate) fn leaf_pairs(doc: &Document, id: ObjId) -> Option<Vec<(i64, ObjId)>> {
    match classify(doc, id) {
        NodeKind::Leaf(entries) => Some(entries.into_iter().map(|e| (e.key, e.value)).collect()),
        _ => None,
    }
}

/// Builds the flattened `Nums` id list for a pair slice.
fn flatten_pairs(doc: &Document, pairs: &[(i64, ObjId)]) -> Vec<ObjId> {
    let mut flat = Vec::with_capacity(pairs.len() * 2);
    for (key, value) in pairs {
        flat.push(doc.make_integer(*key).id());
        flat.push(*value);
    }
    flat
}

/// Writes a leaf's pairs, reusing the existing `Nums` array object when one
/// is present so external references to it stay valid.
pub(crate) fn write_pairs(doc: &Document, id: ObjId, pairs: &[(i64, ObjId)]) {
    let flat = flatten_pairs(doc, pairs);
    match doc.dict_get(id, NUMS) {
        Some(nums) if doc.is_array(nums) => {
            doc.array_replace(nums, flat);
        }
        _ => {
            let nums = doc.make_array_from(flat);
            doc.dict_set(id, NUMS, nums.id());
        }
    }
}

/// Writes a node's `Limits` pair.
pub(crate) fn write_limits(doc: &Document, id: ObjId, lo: i64, hi: i64) {
    let limits = doc.make_array_from(vec![doc.make_integer(lo).id(), doc.make_integer(hi).id()]);
    doc.dict_set(id, LIMITS, limits.id());
}

/// Creates a fresh leaf dictionary holding `pairs`, with exact `Limits`.
/// Callers must pass a non-empty, ascending slice.
pub(crate) fn leaf_from_pairs(doc: &Document, pairs: &[(i64, ObjId)]) -> ObjId {
    let leaf = doc.make_dictionary().id();
    write_pairs(doc, leaf, pairs);
    if let (Some(first), Some(last)) = (pairs.first(), pairs.last()) {
        write_limits(doc, leaf, first.0, last.0);
    }
    leaf
}

/// Reads an intermediate node's kid ids. `None` when the node has no
/// well-formed `Kids` array.
pub(crate) fn kid_ids(doc: &Document, id: ObjId) -> Option<Vec<ObjId>> {
    let kids = doc.dict_get(id, KIDS)?;
    let len = doc.array_len(kids)?;
    (0..len).map(|i| doc.array_get(kids, i)).collect()
}

/// The inclusive key span of a node's subtree, from its own contents:
/// declared `Limits` when present, otherwise a leaf's first and last keys.
///
/// Valid for nodes whose descendants' `Limits` are already maintained, which
/// mutation guarantees by recomputing bottom-up.
pub(crate) fn subtree_span(doc: &Document, id: ObjId) -> Option<(i64, i64)> {
    if let Some(limits) = read_limits(doc, id) {
        return Some(limits);
    }
    let pairs = leaf_pairs(doc, id)?;
    match (pairs.first(), pairs.last()) {
        (Some(first), Some(last)) => Some((first.0, last.0)),
        _ => None,
    }
}

/// Recomputes and rewrites a node's `Limits` from its current contents.
/// Removes the field when the node covers nothing. Never called on the root.
pub(crate) fn recompute_limits(doc: &Document, id: ObjId) {
    let span = match kid_ids(doc, id) {
        Some(kids) => {
            let lo = kids.first().and_then(|k| subtree_span(doc, *k));
            let hi = kids.last().and_then(|k| subtree_span(doc, *k));
            match (lo, hi) {
                (Some((lo, _)), Some((_, hi))) => Some((lo, hi)),
                _ => None,
            }
        }
        None => leaf_pairs(doc, id).and_then(|pairs| match (pairs.first(), pairs.last()) {
            (Some(first), Some(last)) => Some((first.0, last.0)),
            _ => None,
        }),
    };
    match span {
        Some((lo, hi)) => write_limits(doc, id, lo, hi),
        None => {
            doc.dict_remove(id, LIMITS);
        }
    }
}
