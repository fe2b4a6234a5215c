//! The document: owner of every object in the graph.

use crate::handle::ObjHandle;
use crate::object::{ObjId, Object};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Internal document state shared between the document and its handles.
#[derive(Debug)]
pub(crate) struct DocumentInner {
    /// Objects stored by id (index = id).
    objects: RwLock<Vec<Object>>,
}

/// The host document: owns the object table and hands out [`ObjHandle`]s.
///
/// All object access goes through typed accessors on this type. Accessors
/// take the object's id; a shape mismatch (asking a dictionary question of
/// an array, say) reads as `None`/`false` rather than an error, leaving
/// malformedness decisions to the caller.
///
/// Cloning a `Document` clones the ownership of the same underlying table.
#[derive(Clone, Debug)]
pub struct Document {
    pub(crate) inner: Arc<DocumentInner>,
}

impl Document {
    /// Creates a new empty document.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(DocumentInner {
                objects: RwLock::new(Vec::new()),
            }),
        }
    }

    /// Returns true when both documents own the same object table.
    pub fn same_document(&self, other: &Document) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Mints a handle for an id in this document.
    pub fn handle(&self, id: ObjId) -> ObjHandle {
        ObjHandle::new(Arc::downgrade(&self.inner), id)
    }

    fn alloc(&self, obj: Object) -> ObjHandle {
        let mut objects = self.inner.objects.write();
        let id = ObjId::new(objects.len() as u64);
        objects.push(obj);
        drop(objects);
        self.handle(id)
    }

    fn with_object<R>(&self, id: ObjId, f: impl FnOnce(&Object) -> R) -> Option<R> {
        let objects = self.inner.objects.read();
        objects.get(id.as_u64() as usize).map(f)
    }

    fn with_object_mut<R>(&self, id: ObjId, f: impl FnOnce(&mut Object) -> R) -> Option<R> {
        let mut objects = self.inner.objects.write();
        objects.get_mut(id.as_u64() as usize).map(f)
    }

    // =========================================================================
    // Constructors
    // =========================================================================

    /// Creates a null object.
    pub fn make_null(&self) -> ObjHandle {
        self.alloc(Object::Null)
    }

    /// Creates a boolean object.
    pub fn make_boolean(&self, value: bool) -> ObjHandle {
        self.alloc(Object::Boolean(value))
    }

    /// Creates an integer object.
    pub fn make_integer(&self, value: i64) -> ObjHandle {
        self.alloc(Object::Integer(value))
    }

    /// Creates a string object.
    pub fn make_string(&self, value: impl Into<String>) -> ObjHandle {
        self.alloc(Object::String(value.into()))
    }

    /// Creates an empty array object.
    pub fn make_array(&self) -> ObjHandle {
        self.alloc(Object::Array(Vec::new()))
    }

    /// Creates an array object holding the given ids.
    pub fn make_array_from(&self, items: Vec<ObjId>) -> ObjHandle {
        self.alloc(Object::Array(items))
    }

    /// Creates an empty dictionary object.
    pub fn make_dictionary(&self) -> ObjHandle {
        self.alloc(Object::Dictionary(BTreeMap::new()))
    }

    // =========================================================================
    // Typed accessors
    // =========================================================================

    /// Returns true when the object is a dictionary.
    pub fn is_dictionary(&self, id: ObjId) -> bool {
        self.with_object(id, |o| matches!(o, Object::Dictionary(_)))
            .unwrap_or(false)
    }

    /// Reads a dictionary field.
    pub fn dict_get(&self, id: ObjId, key: &str) -> Option<ObjId> {
        self.with_object(id, |o| match o {
            Object::Dictionary(map) => map.get(key).copied(),
            _ => None,
        })
        .flatten()
    }

    /// Returns true when the dictionary has the given field.
    pub fn dict_contains(&self, id: ObjId, key: &str) -> bool {
        self.dict_get(id, key).is_some()
    }

    /// Writes a dictionary field. Returns false when the object is not a
    /// dictionary.
    pub fn dict_set(&self, id: ObjId, key: &str, value: ObjId) -> bool {
        self.with_object_mut(id, |o| match o {
            Object::Dictionary(map) => {
                map.insert(key.to_string(), value);
                true
            }
            _ => false,
        })
        .unwrap_or(false)
    }

    /// Removes a dictionary field. Returns true when the field was present.
    pub fn dict_remove(&self, id: ObjId, key: &str) -> bool {
        self.with_object_mut(id, |o| match o {
            Object::Dictionary(map) => map.remove(key).is_some(),
            _ => false,
        })
        .unwrap_or(false)
    }

    /// Returns true when the object is an array.
    pub fn is_array(&self, id: ObjId) -> bool {
        self.with_object(id, |o| matches!(o, Object::Array(_)))
            .unwrap_or(false)
    }

    /// Returns the array length, or `None` when the object is not an array.
    pub fn array_len(&self, id: ObjId) -> Option<usize> {
        self.with_object(id, |o| match o {
            Object::Array(items) => Some(items.len()),
            _ => None,
        })
        .flatten()
    }

    /// Reads an array slot.
    pub fn array_get(&self, id: ObjId, index: usize) -> Option<ObjId> {
        self.with_object(id, |o| match o {
            Object::Array(items) => items.get(index).copied(),
            _ => None,
        })
        .flatten()
    }

    /// Overwrites an array slot. Returns false when the object is not an
    /// array or the index is out of range.
    pub fn array_set(&self, id: ObjId, index: usize, value: ObjId) -> bool {
        self.with_object_mut(id, |o| match o {
            Object::Array(items) => match items.get_mut(index) {
                Some(slot) => {
                    *slot = value;
                    true
                }
                None => false,
            },
            _ => false,
        })
        .unwrap_or(false)
    }

    /// Appends to an array. Returns false when the object is not an array.
    pub fn array_push(&self, id: ObjId, value: ObjId) -> bool {
        self.with_object_mut(id, |o| match o {
            Object::Array(items) => {
                items.push(value);
                true
            }
            _ => false,
        })
        .unwrap_or(false)
    }

    /// Inserts into an array at `index`, shifting later slots. Returns false
    /// when the object is not an array or the index is past the end.
    pub fn array_insert(&self, id: ObjId, index: usize, value: ObjId) -> bool {
        self.with_object_mut(id, |o| match o {
            Object::Array(items) => {
                if index > items.len() {
                    return false;
                }
                items.insert(index, value);
                true
            }
            _ => false,
        })
        .unwrap_or(false)
    }

    /// Removes an array slot, shifting later slots. Returns the removed id.
    pub fn array_remove(&self, id: ObjId, index: usize) -> Option<ObjId> {
        self.with_object_mut(id, |o| match o {
            Object::Array(items) => {
                if index < items.len() {
                    Some(items.remove(index))
                } else {
                    None
                }
            }
            _ => None,
        })
        .flatten()
    }

    /// Replaces an array's entire contents. Returns false when the object is
    /// not an array.
    pub fn array_replace(&self, id: ObjId, items: Vec<ObjId>) -> bool {
        self.with_object_mut(id, |o| match o {
            Object::Array(slots) => {
                *slots = items;
                true
            }
            _ => false,
        })
        .unwrap_or(false)
    }

    /// Returns true when the object is an integer.
    pub fn is_integer(&self, id: ObjId) -> bool {
        self.with_object(id, |o| matches!(o, Object::Integer(_)))
            .unwrap_or(false)
    }

    /// Reads an integer value.
    pub fn as_integer(&self, id: ObjId) -> Option<i64> {
        self.with_object(id, |o| match o {
            Object::Integer(v) => Some(*v),
            _ => None,
        })
        .flatten()
    }

    /// Reads a string value.
    pub fn as_string(&self, id: ObjId) -> Option<String> {
        self.with_object(id, |o| match o {
            Object::String(s) => Some(s.clone()),
            _ => None,
        })
        .flatten()
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_make_and_read_scalars() {
        let doc = Document::new();
        let i = doc.make_integer(12);
        let s = doc.make_string("hello");
        let b = doc.make_boolean(true);
        let n = doc.make_null();

        assert!(doc.is_integer(i.id()));
        assert_eq!(doc.as_integer(i.id()), Some(12));
        assert_eq!(doc.as_string(s.id()), Some("hello".to_string()));
        assert!(!doc.is_integer(s.id()));
        assert!(!doc.is_integer(b.id()));
        assert!(!doc.is_dictionary(n.id()));
    }

    #[test]
    fn test_dictionary_accessors() {
        let doc = Document::new();
        let dict = doc.make_dictionary();
        let value = doc.make_integer(5);

        assert!(doc.is_dictionary(dict.id()));
        assert!(!doc.dict_contains(dict.id(), "Nums"));
        assert!(doc.dict_set(dict.id(), "Nums", value.id()));
        assert_eq!(doc.dict_get(dict.id(), "Nums"), Some(value.id()));
        assert!(doc.dict_remove(dict.id(), "Nums"));
        assert!(!doc.dict_contains(dict.id(), "Nums"));
        assert!(!doc.dict_remove(dict.id(), "Nums"));

        // Not a dictionary
        assert!(!doc.dict_set(value.id(), "Nums", dict.id()));
        assert_eq!(doc.dict_get(value.id(), "Nums"), None);
    }

    #[test]
    fn test_array_accessors() {
        let doc = Document::new();
        let arr = doc.make_array();
        let a = doc.make_integer(1);
        let b = doc.make_integer(2);
        let c = doc.make_integer(3);

        assert!(doc.is_array(arr.id()));
        assert_eq!(doc.array_len(arr.id()), Some(0));
        assert!(doc.array_push(arr.id(), a.id()));
        assert!(doc.array_push(arr.id(), c.id()));
        assert!(doc.array_insert(arr.id(), 1, b.id()));
        assert_eq!(doc.array_len(arr.id()), Some(3));
        assert_eq!(doc.array_get(arr.id(), 0), Some(a.id()));
        assert_eq!(doc.array_get(arr.id(), 1), Some(b.id()));
        assert_eq!(doc.array_get(arr.id(), 2), Some(c.id()));
        assert_eq!(doc.array_get(arr.id(), 3), None);

        assert!(doc.array_set(arr.id(), 0, c.id()));
        assert_eq!(doc.array_get(arr.id(), 0), Some(c.id()));

        assert_eq!(doc.array_remove(arr.id(), 1), Some(b.id()));
        assert_eq!(doc.array_len(arr.id()), Some(2));

        assert!(doc.array_replace(arr.id(), vec![a.id()]));
        assert_eq!(doc.array_len(arr.id()), Some(1));

        // Not an array
        assert_eq!(doc.array_len(a.id()), None);
        assert!(!doc.array_push(a.id(), b.id()));
    }

    #[test]
    fn test_make_array_from() {
        let doc = Document::new();
        let a = doc.make_integer(1);
        let b = doc.make_integer(2);
        let arr = doc.make_array_from(vec![a.id(), b.id()]);
        assert_eq!(doc.array_len(arr.id()), Some(2));
        assert_eq!(doc.array_get(arr.id(), 1), Some(b.id()));
    }

    #[test]
    fn test_out_of_range_id_reads_as_nothing() {
        let doc = Document::new();
        let stray = ObjId::new(999);
        assert!(!doc.is_dictionary(stray));
        assert!(!doc.is_array(stray));
        assert!(!doc.is_integer(stray));
        assert_eq!(doc.array_len(stray), None);
        assert_eq!(doc.dict_get(stray, "Kids"), None);
    }

    #[test]
    fn test_same_document() {
        let doc1 = Document::new();
        let doc2 = Document::new();
        let doc1_clone = doc1.clone();

        assert!(doc1.same_document(&doc1_clone));
        assert!(!doc1.same_document(&doc2));
    }
}
