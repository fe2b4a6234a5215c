//! Depth-first traversal over number tree structures.
//!
//! Two traversals live here. The strict walk validates as it flattens and
//! reports the first structural fault it finds; the salvage walk tolerates
//! damage and collects whatever pairs can be recovered, in document order,
//! for the repair engine.
//!
//! Both guard against hostile input: a per-walk visited set catches cycles,
//! and a depth ceiling catches pathological nesting, so work is bounded by
//! the number of reachable nodes.

use crate::node::{self, NodeKind, KIDS, NUMS};
use std::collections::{HashMap, HashSet};
use std::fmt;
use tracing::{debug, warn};
use vellum_object::{Document, ObjId};

/// Structural fault found by a strict walk.
///
/// An internal signal: the facade feeds it to the repair engine when
/// auto-repair is enabled, and renders it into a `Structural` error when
/// not. Never surfaced directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum WalkFault {
    /// A node was reached twice within one walk.
    Cycle(ObjId),
    /// The depth ceiling was exceeded at this node.
    DepthExceeded(ObjId),
    /// A node failed classification.
    Malformed(ObjId),
    /// A key broke ascending order.
    OutOfOrder { node: ObjId, key: i64 },
    /// A non-root node's declared limits are absent or fail to bound its
    /// subtree's actual keys.
    BadLimits(ObjId),
}

impl fmt::Display for WalkFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WalkFault::Cycle(id) => write!(f, "cycle through node {id}"),
            WalkFault::DepthExceeded(id) => write!(f, "depth ceiling exceeded at node {id}"),
            WalkFault::Malformed(id) => write!(f, "malformed node {id}"),
            WalkFault::OutOfOrder { node, key } => {
                write!(f, "key {key} out of order in node {node}")
            }
            WalkFault::BadLimits(id) => write!(f, "limits of node {id} do not cover its keys"),
        }
    }
}

/// One flattened entry, remembering the leaf it lives in.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct FlatEntry {
    pub key: i64,
    pub value: ObjId,
    pub leaf: ObjId,
}

/// Flattened, validated view of a tree.
///
/// `entries` is strictly ascending by key, so point lookups are a binary
/// search. `leaves` and `paths` are the structural breadcrumbs the mutation
/// engine needs to find and restructure the persisted nodes. The facade
/// caches one view per tree and drops it on any mutation.
#[derive(Debug, Default, PartialEq)]
pub(crate) struct FlatView {
    /// All entries, ascending by key.
    pub entries: Vec<FlatEntry>,
    /// Leaf node ids in traversal order.
    pub leaves: Vec<ObjId>,
    /// Ancestor path (root first, leaf excluded) for every leaf.
    pub paths: HashMap<ObjId, Vec<ObjId>>,
}

impl FlatView {
    /// Binary search by key: `Ok(index)` when present, `Err(insertion)` when
    /// absent.
    pub fn lookup(&self, key: i64) -> std::result::Result<usize, usize> {
        self.entries.binary_search_by_key(&key, |e| e.key)
    }
}

/// Strict walk: flattens `root` into a [`FlatView`] or reports the first
/// structural fault.
///
/// Duplicate keys are the one tolerated irregularity: the first occurrence
/// in document order wins and later ones are dropped with a warning, since
/// document order approximates intended precedence in damaged trees.
pub(crate) fn walk(doc: &Document, root: ObjId, max_depth: usize) -> Result<FlatView, WalkFault> {
    let mut walker = Walker {
        doc,
        max_depth,
        visited: HashSet::new(),
        view: FlatView::default(),
        last_key: None,
    };
    let mut path = Vec::new();
    walker.visit(root, &mut path, true)?;
    Ok(walker.view)
}

struct Walker<'a> {
    doc: &'a Document,
    max_depth: usize,
    visited: HashSet<ObjId>,
    view: FlatView,
    last_key: Option<i64>,
}

impl Walker<'_> {
    /// Visits one node, returning the actual key span of its subtree.
    fn visit(
        &mut self,
        id: ObjId,
        path: &mut Vec<ObjId>,
        is_root: bool,
    ) -> Result<Option<(i64, i64)>, WalkFault> {
        if !self.visited.insert(id) {
            return Err(WalkFault::Cycle(id));
        }
        if path.len() >= self.max_depth {
            return Err(WalkFault::DepthExceeded(id));
        }

        let span = match node::classify(self.doc, id) {
            NodeKind::Malformed => return Err(WalkFault::Malformed(id)),
            NodeKind::Leaf(entries) => {
                self.view.leaves.push(id);
                self.view.paths.insert(id, path.clone());
                let mut span: Option<(i64, i64)> = None;
                for entry in entries {
                    span = merge_span(span, (entry.key, entry.key));
                    match self.last_key {
                        Some(last) if entry.key < last => {
                            return Err(WalkFault::OutOfOrder {
                                node: id,
                                key: entry.key,
                            });
                        }
                        Some(last) if entry.key == last => {
                            warn!(key = entry.key, node = %id, "duplicate key, keeping first occurrence");
                            continue;
                        }
                        _ => {}
                    }
                    self.last_key = Some(entry.key);
                    self.view.entries.push(FlatEntry {
                        key: entry.key,
                        value: entry.value,
                        leaf: id,
                    });
                }
                span
            }
            NodeKind::Intermediate(n) => {
                path.push(id);
                let mut span: Option<(i64, i64)> = None;
                for kid in n.kids {
                    if let Some(kid_span) = self.visit(kid, path, false)? {
                        span = merge_span(span, kid_span);
                    }
                }
                path.pop();
                span
            }
        };

        // Declared limits are a hint, but a non-root node that contradicts
        // its own contents is structurally inconsistent. Empty subtrees
        // cannot contradict anything.
        if !is_root {
            if let Some((lo, hi)) = span {
                match node::read_limits(self.doc, id) {
                    Some((dlo, dhi)) if dlo <= lo && dhi >= hi => {}
                    _ => return Err(WalkFault::BadLimits(id)),
                }
            }
        }

        Ok(span)
    }
}

fn merge_span(acc: Option<(i64, i64)>, next: (i64, i64)) -> Option<(i64, i64)> {
    match acc {
        None => Some(next),
        Some((lo, hi)) => Some((lo.min(next.0), hi.max(next.1))),
    }
}

/// Salvage walk: collects every recoverable (key, value) pair in traversal
/// order, skipping whatever cannot be used.
///
/// Skipped without failing: cyclic references, over-deep subtrees,
/// non-dictionary nodes, ambiguous nodes carrying both `Nums` and `Kids`,
/// non-integer key slots, the unpaired tail of an odd `Nums`, and keys
/// already collected (first occurrence wins).
pub(crate) fn salvage(doc: &Document, root: ObjId, max_depth: usize) -> Vec<(i64, ObjId)> {
    let mut out = Vec::new();
    let mut visited = HashSet::new();
    let mut seen = HashSet::new();
    salvage_node(doc, root, 0, max_depth, &mut visited, &mut seen, &mut out);
    out
}

fn salvage_node(
    doc: &Document,
    id: ObjId,
    depth: usize,
    max_depth: usize,
    visited: &mut HashSet<ObjId>,
    seen: &mut HashSet<i64>,
    out: &mut Vec<(i64, ObjId)>,
) {
    if depth >= max_depth || !visited.insert(id) || !doc.is_dictionary(id) {
        return;
    }
    match (doc.dict_get(id, NUMS), doc.dict_get(id, KIDS)) {
        // Ambiguous or payload-free nodes contribute nothing.
        (Some(_), Some(_)) | (None, None) => {}
        (Some(nums), None) => {
            let Some(len) = doc.array_len(nums) else {
                return;
            };
            for i in 0..len / 2 {
                let key = doc
                    .array_get(nums, 2 * i)
                    .and_then(|slot| doc.as_integer(slot));
                let value = doc.array_get(nums, 2 * i + 1);
                if let (Some(key), Some(value)) = (key, value) {
                    if seen.insert(key) {
                        out.push((key, value));
                    } else {
                        debug!(key, node = %id, "dropping duplicate key during salvage");
                    }
                }
            }
        }
        (None, Some(kids)) => {
            let len = doc.array_len(kids).unwrap_or(0);
            for i in 0..len {
                if let Some(kid) = doc.array_get(kids, i) {
                    salvage_node(doc, kid, depth + 1, max_depth, visited, seen, out);
                }
            }
        }
    }
}
