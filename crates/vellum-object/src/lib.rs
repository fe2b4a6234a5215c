//! In-memory document object graph for Vellum.
//!
//! This crate provides:
//! - An id-indexed object table owned by a [`Document`]
//! - Opaque [`ObjHandle`] references into that table
//! - Typed accessors over dictionary, array, and integer objects
//!
//! Containers store [`ObjId`]s rather than nested values, so the graph can
//! express shared structure and cycles. Consumers that traverse the graph
//! are responsible for guarding against both.

mod document;
mod handle;
mod object;

pub use document::Document;
pub use handle::ObjHandle;
pub use object::{ObjId, Object};
