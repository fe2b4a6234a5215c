//! Object values stored in a document graph.

use std::collections::BTreeMap;
use std::fmt;

/// Stable identity of an object within its document.
///
/// Ids index directly into the document's object table and double as the
/// identity used for cycle detection during traversal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjId(u64);

impl ObjId {
    /// Creates an ObjId from a raw table index.
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw table index.
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ObjId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A value in the document object graph.
///
/// Arrays and dictionaries hold [`ObjId`]s, never nested values.
#[derive(Debug, Clone, PartialEq)]
pub enum Object {
    /// The null object.
    Null,
    /// A boolean.
    Boolean(bool),
    /// A signed 64-bit integer.
    Integer(i64),
    /// A text string.
    String(String),
    /// An ordered sequence of object references.
    Array(Vec<ObjId>),
    /// A name-keyed mapping of object references.
    Dictionary(BTreeMap<String, ObjId>),
}

impl Object {
    /// Returns a short name for the object's type, for diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            Object::Null => "null",
            Object::Boolean(_) => "boolean",
            Object::Integer(_) => "integer",
            Object::String(_) => "string",
            Object::Array(_) => "array",
            Object::Dictionary(_) => "dictionary",
        }
    }
}
