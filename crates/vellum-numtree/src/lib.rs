//! Number tree manipulation engine for Vellum documents.
//!
//! A number tree is a sorted, integer-keyed index embedded in a structured
//! document (page-label maps, parent-tree entries). Its nodes are ordinary
//! document dictionaries referencing each other through handles, which makes
//! the persisted structure self-describing and potentially hostile: node
//! references may be cyclic, duplicated, or structurally inconsistent.
//!
//! This crate provides:
//! - Node classification into leaf / intermediate / malformed
//! - Cycle- and depth-guarded traversal into a flattened sorted view
//! - Best-effort repair of damaged structures
//! - Insert and remove with node splitting and root collapse
//! - The [`NumberTree`] facade tying it all together
//!
//! ```text
//! NumberTree ──▶ walk ──▶ FlatView (cached) ──▶ lookups / iteration
//!      │            │
//!      │         fault ──▶ repair ──▶ re-walk
//!      └──▶ set / remove ──▶ mutation engine ──▶ cache invalidated
//! ```

mod mutation;
mod node;
mod repair;
mod tree;
mod walker;

pub use node::{classify, IntermediateNode, LeafEntry, NodeKind, KIDS, LIMITS, NUMS};
pub use tree::{Iter, NumberTree};
