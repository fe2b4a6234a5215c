//! The public number tree facade.

use crate::mutation;
use crate::node::NUMS;
use crate::repair;
use crate::walker::{self, FlatEntry, FlatView};
use std::collections::BTreeMap;
use tracing::debug;
use vellum_common::{Result, TreeConfig, VellumError};
use vellum_object::{Document, ObjHandle, ObjId};

/// A sorted, integer-keyed index embedded in a document.
///
/// The tree wraps a root object owned by a [`Document`] and serves point
/// lookups, ordered iteration, insertion, and deletion against it. The
/// persisted node structure is validated when the tree is opened; damaged
/// structures are rebuilt from their recoverable entries when
/// [`TreeConfig::auto_repair`] allows, and rejected with a `Structural`
/// error otherwise.
///
/// Reads are served from a flattened view cached per tree instance and
/// rebuilt lazily after each mutation. The engine assumes exclusive access
/// to the subtree for the duration of each operation; concurrent mutation
/// through overlapping trees must be serialized by the caller.
///
/// ```
/// use vellum_common::TreeConfig;
/// use vellum_numtree::NumberTree;
/// use vellum_object::Document;
///
/// let doc = Document::new();
/// let mut tree = NumberTree::new_empty(&doc, TreeConfig::default()).unwrap();
/// let page = doc.make_string("ii");
/// tree.set(4, &page).unwrap();
/// assert_eq!(tree.get(4).unwrap(), page);
/// ```
#[derive(Debug)]
pub struct NumberTree {
    doc: Document,
    root: ObjId,
    config: TreeConfig,
    view: Option<FlatView>,
}

impl NumberTree {
    /// Opens a number tree rooted at an existing object.
    ///
    /// Fails with `UnownedHandle` when the handle has no owning document,
    /// and with `Structural` when the structure is damaged and
    /// `auto_repair` is off.
    pub fn new(root: ObjHandle, config: TreeConfig) -> Result<Self> {
        config.validate()?;
        let doc = root.owner().ok_or(VellumError::UnownedHandle)?;
        let mut tree = Self {
            doc,
            root: root.id(),
            config,
            view: None,
        };
        tree.ensure_view()?;
        Ok(tree)
    }

    /// Creates a new empty tree in `doc`: a root leaf with no entries.
    pub fn new_empty(doc: &Document, config: TreeConfig) -> Result<Self> {
        config.validate()?;
        let root = doc.make_dictionary();
        let nums = doc.make_array();
        doc.dict_set(root.id(), NUMS, nums.id());
        Ok(Self {
            doc: doc.clone(),
            root: root.id(),
            config,
            view: Some(FlatView::default()),
        })
    }

    /// The underlying root object.
    ///
    /// Callers wire this into the host document wherever the tree should
    /// live (a page-label map, a parent-tree slot).
    pub fn root(&self) -> ObjHandle {
        self.doc.handle(self.root)
    }

    /// The tree's configuration.
    pub fn config(&self) -> &TreeConfig {
        &self.config
    }

    fn ensure_view(&mut self) -> Result<()> {
        if self.view.is_some() {
            return Ok(());
        }
        match walker::walk(&self.doc, self.root, self.config.max_depth) {
            Ok(view) => {
                self.view = Some(view);
                Ok(())
            }
            Err(fault) => {
                if !self.config.auto_repair {
                    return Err(VellumError::Structural(fault.to_string()));
                }
                debug!(%fault, "structural fault, repairing");
                repair::repair(&self.doc, self.root, &self.config)?;
                let view = walker::walk(&self.doc, self.root, self.config.max_depth)
                    .map_err(|f| {
                        VellumError::InvariantViolation(format!("repair left a damaged tree: {f}"))
                    })?;
                self.view = Some(view);
                Ok(())
            }
        }
    }

    fn view(&mut self) -> Result<&FlatView> {
        self.ensure_view()?;
        match self.view.as_ref() {
            Some(view) => Ok(view),
            None => Err(VellumError::InvariantViolation(
                "view missing after rebuild".to_string(),
            )),
        }
    }

    fn take_view(&mut self) -> Result<FlatView> {
        self.ensure_view()?;
        match self.view.take() {
            Some(view) => Ok(view),
            None => Err(VellumError::InvariantViolation(
                "view missing after rebuild".to_string(),
            )),
        }
    }

    /// Returns true when `key` is present.
    pub fn contains(&mut self, key: i64) -> Result<bool> {
        Ok(self.view()?.lookup(key).is_ok())
    }

    /// Looks up the value for `key`.
    pub fn get(&mut self, key: i64) -> Result<ObjHandle> {
        let view = self.view()?;
        match view.lookup(key) {
            Ok(i) => {
                let id = view.entries[i].value;
                Ok(self.doc.handle(id))
            }
            Err(_) => Err(VellumError::KeyNotFound(key)),
        }
    }

    /// Inserts or replaces the value for `key`.
    ///
    /// The value must belong to the same document as the tree.
    pub fn set(&mut self, key: i64, value: &ObjHandle) -> Result<()> {
        let owner = value.owner().ok_or(VellumError::UnownedHandle)?;
        if !self.doc.same_document(&owner) {
            return Err(VellumError::ForeignHandle);
        }
        let view = self.take_view()?;
        // The view stays dropped: any outcome other than success leaves the
        // structure suspect, and success made it stale.
        mutation::insert(
            &self.doc,
            self.root,
            &view,
            self.config.leaf_capacity,
            key,
            value.id(),
        )
    }

    /// Removes `key`, returning its value. Fails with `KeyNotFound` when
    /// absent, in which case nothing changed and the cache is kept.
    pub fn remove(&mut self, key: i64) -> Result<ObjHandle> {
        let view = self.take_view()?;
        match mutation::remove(&self.doc, self.root, &view, key) {
            Ok(value) => Ok(self.doc.handle(value)),
            Err(err @ VellumError::KeyNotFound(_)) => {
                self.view = Some(view);
                Err(err)
            }
            Err(err) => Err(err),
        }
    }

    /// Number of entries.
    pub fn len(&mut self) -> Result<usize> {
        Ok(self.view()?.entries.len())
    }

    /// Returns true when the tree has no entries.
    pub fn is_empty(&mut self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Iterates entries in ascending key order.
    ///
    /// Finite and restartable: each call walks the current state (or reuses
    /// the cached view).
    pub fn iter(&mut self) -> Result<Iter<'_>> {
        self.ensure_view()?;
        let Some(view) = self.view.as_ref() else {
            return Err(VellumError::InvariantViolation(
                "view missing after rebuild".to_string(),
            ));
        };
        Ok(Iter {
            doc: &self.doc,
            entries: view.entries.iter(),
        })
    }

    /// Iterates keys in ascending order.
    pub fn keys(&mut self) -> Result<impl Iterator<Item = i64> + '_> {
        Ok(self.iter()?.map(|(key, _)| key))
    }

    /// Iterates values in ascending key order.
    pub fn values(&mut self) -> Result<impl Iterator<Item = ObjHandle> + '_> {
        Ok(self.iter()?.map(|(_, value)| value))
    }

    /// Snapshot of the full key → value association.
    pub fn as_map(&mut self) -> Result<BTreeMap<i64, ObjHandle>> {
        Ok(self.iter()?.collect())
    }

    /// Rebuilds the tree from its recoverable entries, regardless of the
    /// `auto_repair` setting. Returns the number of entries retained.
    pub fn repair(&mut self) -> Result<usize> {
        let retained = repair::repair(&self.doc, self.root, &self.config)?;
        self.view = None;
        Ok(retained)
    }
}

/// Ascending iterator over a tree's entries.
pub struct Iter<'a> {
    doc: &'a Document,
    entries: std::slice::Iter<'a, FlatEntry>,
}

impl Iterator for Iter<'_> {
    type Item = (i64, ObjHandle);

    fn next(&mut self) -> Option<Self::Item> {
        self.entries
            .next()
            .map(|entry| (entry.key, self.doc.handle(entry.value)))
    }
}
