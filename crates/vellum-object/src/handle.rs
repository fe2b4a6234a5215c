//! Opaque handles into a document's object graph.

use crate::document::{Document, DocumentInner};
use crate::object::ObjId;
use std::fmt;
use std::sync::Weak;

/// Opaque reference to an object owned by a [`Document`].
///
/// A handle does not keep its document alive; `owner` returns `None` once
/// the document is gone, and such a handle is rejected wherever ownership
/// is required.
#[derive(Clone)]
pub struct ObjHandle {
    doc: Weak<DocumentInner>,
    id: ObjId,
}

impl ObjHandle {
    pub(crate) fn new(doc: Weak<DocumentInner>, id: ObjId) -> Self {
        Self { doc, id }
    }

    /// The object's stable identity within its document.
    pub fn id(&self) -> ObjId {
        self.id
    }

    /// The owning document, or `None` when the document no longer exists.
    pub fn owner(&self) -> Option<Document> {
        self.doc.upgrade().map(|inner| Document { inner })
    }
}

impl PartialEq for ObjHandle {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && Weak::ptr_eq(&self.doc, &other.doc)
    }
}

impl Eq for ObjHandle {}

impl fmt::Debug for ObjHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = if self.doc.strong_count() > 0 {
            "owned"
        } else {
            "unowned"
        };
        write!(f, "ObjHandle({}, {})", self.id, state)
    }
}
