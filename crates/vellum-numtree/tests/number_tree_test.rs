//! End-to-end tests for the number tree engine:
//! - Round-trip of inserted entries through lookups and export
//! - Sorted iteration regardless of insertion order
//! - Repair of damaged, cyclic, and duplicated structures
//! - Node splitting and limit maintenance under growth
//! - Root collapse under deletion

use rand::seq::SliceRandom;
use std::collections::BTreeMap;
use vellum_common::{TreeConfig, VellumError};
use vellum_numtree::{classify, NodeKind, NumberTree, KIDS, LIMITS, NUMS};
use vellum_object::{Document, ObjHandle, ObjId};

fn small_config() -> TreeConfig {
    TreeConfig {
        leaf_capacity: 4,
        ..Default::default()
    }
}

/// Builds a leaf dictionary with exact limits, like a well-formed document
/// would carry.
fn make_leaf(doc: &Document, pairs: &[(i64, &ObjHandle)]) -> ObjId {
    let leaf = doc.make_dictionary().id();
    let mut flat = Vec::new();
    for (key, value) in pairs {
        flat.push(doc.make_integer(*key).id());
        flat.push(value.id());
    }
    let nums = doc.make_array_from(flat);
    doc.dict_set(leaf, NUMS, nums.id());
    if let (Some(first), Some(last)) = (pairs.first(), pairs.last()) {
        let limits =
            doc.make_array_from(vec![doc.make_integer(first.0).id(), doc.make_integer(last.0).id()]);
        doc.dict_set(leaf, LIMITS, limits.id());
    }
    leaf
}

fn make_parent(doc: &Document, kids: Vec<ObjId>) -> ObjHandle {
    let node = doc.make_dictionary();
    let arr = doc.make_array_from(kids);
    doc.dict_set(node.id(), KIDS, arr.id());
    node
}

#[test]
fn test_round_trip() {
    let doc = Document::new();
    let mut tree = NumberTree::new_empty(&doc, small_config()).unwrap();

    let keys = [12, -4, 0, 99, 7, 3, 8, 41, -100, 55];
    let mut expected = BTreeMap::new();
    for key in keys {
        let value = doc.make_string(format!("value-{key}"));
        tree.set(key, &value).unwrap();
        expected.insert(key, value);
    }

    assert_eq!(tree.len().unwrap(), expected.len());
    for (key, value) in &expected {
        assert!(tree.contains(*key).unwrap());
        assert_eq!(tree.get(*key).unwrap(), *value);
    }
    assert_eq!(tree.as_map().unwrap(), expected);
}

#[test]
fn test_set_replaces_existing_value() {
    let doc = Document::new();
    let mut tree = NumberTree::new_empty(&doc, small_config()).unwrap();

    let old = doc.make_string("old");
    let new = doc.make_string("new");
    tree.set(7, &old).unwrap();
    tree.set(7, &new).unwrap();

    assert_eq!(tree.len().unwrap(), 1);
    assert_eq!(tree.get(7).unwrap(), new);
}

#[test]
fn test_sorted_iteration_after_shuffled_inserts() {
    let doc = Document::new();
    let mut tree = NumberTree::new_empty(&doc, small_config()).unwrap();

    let mut keys: Vec<i64> = (0..200).collect();
    keys.shuffle(&mut rand::thread_rng());
    for key in &keys {
        let value = doc.make_integer(*key * 2);
        tree.set(*key, &value).unwrap();
    }

    let seen: Vec<i64> = tree.keys().unwrap().collect();
    assert_eq!(seen, (0..200).collect::<Vec<_>>());
    // Restartable: a second pass yields the same sequence.
    let again: Vec<i64> = tree.keys().unwrap().collect();
    assert_eq!(seen, again);
}

#[test]
fn test_iteration_yields_strictly_ascending_unique_keys() {
    let doc = Document::new();
    let mut tree = NumberTree::new_empty(&doc, small_config()).unwrap();
    for key in [5, 1, 9, 3, 7, 2, 8] {
        let value = doc.make_null();
        tree.set(key, &value).unwrap();
    }

    let keys: Vec<i64> = tree.keys().unwrap().collect();
    for pair in keys.windows(2) {
        assert!(pair[0] < pair[1], "keys not strictly ascending: {keys:?}");
    }
}

#[test]
fn test_idempotent_repair_of_valid_tree() {
    let doc = Document::new();
    let mut tree = NumberTree::new_empty(&doc, small_config()).unwrap();
    for key in 0..20 {
        let value = doc.make_integer(key);
        tree.set(key, &value).unwrap();
    }
    let before = tree.as_map().unwrap();

    let retained = tree.repair().unwrap();
    assert_eq!(retained, 20);
    assert_eq!(tree.as_map().unwrap(), before);
}

#[test]
fn test_deterministic_dedup_keeps_first_occurrence() {
    let doc = Document::new();
    let a = doc.make_string("a");
    let b = doc.make_string("b");

    // Key 5 appears twice in traversal order: (5, "a") then (5, "b"). The
    // second leaf's missing limits force a repair.
    let first = make_leaf(&doc, &[(5, &a)]);
    let second = make_leaf(&doc, &[(5, &b)]);
    doc.dict_remove(second, LIMITS);
    let root = make_parent(&doc, vec![first, second]);

    let mut tree = NumberTree::new(root, TreeConfig::default()).unwrap();
    assert_eq!(tree.len().unwrap(), 1);
    assert_eq!(tree.get(5).unwrap(), a);
}

#[test]
fn test_duplicate_keys_without_structural_fault_resolve_first_wins() {
    let doc = Document::new();
    let a = doc.make_string("a");
    let b = doc.make_string("b");

    // Structurally consistent except for the duplicate: no repair runs,
    // the walker dedups.
    let first = make_leaf(&doc, &[(5, &a)]);
    let second = make_leaf(&doc, &[(5, &b), (6, &b)]);
    let root = make_parent(&doc, vec![first, second]);

    let mut tree = NumberTree::new(root, TreeConfig::strict()).unwrap();
    assert_eq!(tree.get(5).unwrap(), a);
    assert_eq!(tree.len().unwrap(), 2);
}

#[test]
fn test_cycle_safety_with_auto_repair() {
    let doc = Document::new();
    let a = doc.make_string("a");
    let b = doc.make_string("b");
    let leaf_before = make_leaf(&doc, &[(1, &a), (2, &a)]);
    let leaf_after = make_leaf(&doc, &[(5, &b)]);
    let root = make_parent(&doc, vec![leaf_before, leaf_after]);

    // Kids gains a reference back to the root.
    let kids = doc.dict_get(root.id(), KIDS).unwrap();
    doc.array_insert(kids, 1, root.id());

    let mut tree = NumberTree::new(root, TreeConfig::default()).unwrap();
    let keys: Vec<i64> = tree.keys().unwrap().collect();
    assert_eq!(keys, vec![1, 2, 5]);

    // The rebuilt structure is valid: reopening strictly succeeds.
    let mut reopened = NumberTree::new(tree.root(), TreeConfig::strict()).unwrap();
    assert_eq!(reopened.get(1).unwrap(), a);
}

#[test]
fn test_cycle_fails_structurally_without_auto_repair() {
    let doc = Document::new();
    let a = doc.make_string("a");
    let leaf = make_leaf(&doc, &[(1, &a)]);
    let root = make_parent(&doc, vec![leaf]);
    let kids = doc.dict_get(root.id(), KIDS).unwrap();
    doc.array_push(kids, root.id());

    let err = NumberTree::new(root, TreeConfig::strict()).unwrap_err();
    assert!(matches!(err, VellumError::Structural(_)));
}

#[test]
fn test_malformed_root_fails_strictly_but_repairs_leniently() {
    let doc = Document::new();
    let root = doc.make_dictionary(); // neither Nums nor Kids

    let err = NumberTree::new(root.clone(), TreeConfig::strict()).unwrap_err();
    assert!(matches!(err, VellumError::Structural(_)));

    let mut tree = NumberTree::new(root, TreeConfig::default()).unwrap();
    assert!(tree.is_empty().unwrap());
}

#[test]
fn test_non_dictionary_root_is_fatal_even_with_auto_repair() {
    let doc = Document::new();
    let root = doc.make_integer(3);
    let err = NumberTree::new(root, TreeConfig::default()).unwrap_err();
    assert!(matches!(err, VellumError::Structural(_)));
}

/// Collects (lo, hi) limit pairs of every leaf, left to right.
fn leaf_limits(doc: &Document, id: ObjId, out: &mut Vec<(i64, i64)>) {
    match classify(doc, id) {
        NodeKind::Intermediate(n) => {
            for kid in n.kids {
                leaf_limits(doc, kid, out);
            }
        }
        NodeKind::Leaf(_) => {
            let limits = doc.dict_get(id, LIMITS).expect("leaf without limits");
            let lo = doc.as_integer(doc.array_get(limits, 0).unwrap()).unwrap();
            let hi = doc.as_integer(doc.array_get(limits, 1).unwrap()).unwrap();
            out.push((lo, hi));
        }
        NodeKind::Malformed => panic!("malformed node {id} in mutated tree"),
    }
}

#[test]
fn test_split_produces_ascending_disjoint_limits() {
    let doc = Document::new();
    let mut tree = NumberTree::new_empty(&doc, small_config()).unwrap();

    let total = 50;
    let mut expected = BTreeMap::new();
    for key in 0..total {
        let value = doc.make_integer(key);
        tree.set(key, &value).unwrap();
        expected.insert(key, value);
    }

    let root = tree.root();
    assert!(matches!(
        classify(&doc, root.id()),
        NodeKind::Intermediate(_)
    ));

    let mut limits = Vec::new();
    leaf_limits(&doc, root.id(), &mut limits);
    assert!(limits.len() > 1);
    for (lo, hi) in &limits {
        assert!(lo <= hi);
    }
    for pair in limits.windows(2) {
        assert!(pair[0].1 < pair[1].0, "overlapping limits: {limits:?}");
    }

    assert_eq!(tree.as_map().unwrap(), expected);

    // The persisted structure is strictly valid.
    assert!(NumberTree::new(root, TreeConfig::strict()).is_ok());
}

#[test]
fn test_empty_tree_lifecycle() {
    let doc = Document::new();
    let mut tree = NumberTree::new_empty(&doc, TreeConfig::default()).unwrap();

    assert_eq!(tree.len().unwrap(), 0);
    for key in [-10, 0, 3, i64::MAX] {
        assert!(!tree.contains(key).unwrap());
    }
    assert!(matches!(
        tree.remove(1).unwrap_err(),
        VellumError::KeyNotFound(1)
    ));
    assert!(tree.as_map().unwrap().is_empty());
}

#[test]
fn test_collapse_on_delete() {
    let doc = Document::new();
    let mut tree = NumberTree::new_empty(&doc, small_config()).unwrap();

    let keys: Vec<i64> = (0..30).collect();
    for key in &keys {
        let value = doc.make_integer(*key);
        tree.set(*key, &value).unwrap();
    }
    let root = tree.root();
    assert!(matches!(
        classify(&doc, root.id()),
        NodeKind::Intermediate(_)
    ));

    let mut shuffled = keys.clone();
    shuffled.shuffle(&mut rand::thread_rng());
    for key in &shuffled {
        let removed = tree.remove(*key).unwrap();
        assert_eq!(doc.as_integer(removed.id()), Some(*key));
    }

    assert!(tree.is_empty().unwrap());
    // Root collapsed back to a single empty leaf, not a dangling
    // intermediate.
    match classify(&doc, root.id()) {
        NodeKind::Leaf(entries) => assert!(entries.is_empty()),
        other => panic!("expected empty leaf root, got {other:?}"),
    }
    assert!(!doc.dict_contains(root.id(), KIDS));
}

#[test]
fn test_remove_then_reinsert() {
    let doc = Document::new();
    let mut tree = NumberTree::new_empty(&doc, small_config()).unwrap();

    for key in 0..12 {
        let value = doc.make_integer(key);
        tree.set(key, &value).unwrap();
    }
    for key in (0..12).step_by(2) {
        tree.remove(key).unwrap();
    }
    assert_eq!(tree.len().unwrap(), 6);

    let replacement = doc.make_string("back");
    tree.set(4, &replacement).unwrap();
    assert_eq!(tree.get(4).unwrap(), replacement);
    assert_eq!(
        tree.keys().unwrap().collect::<Vec<_>>(),
        vec![1, 3, 4, 5, 7, 9, 11]
    );
}

#[test]
fn test_mutated_tree_survives_reopen() {
    let doc = Document::new();
    let mut tree = NumberTree::new_empty(&doc, small_config()).unwrap();
    for key in 0..25 {
        let value = doc.make_integer(key);
        tree.set(key, &value).unwrap();
    }
    for key in 5..10 {
        tree.remove(key).unwrap();
    }
    let expected = tree.as_map().unwrap();
    let root = tree.root();
    drop(tree);

    let mut reopened = NumberTree::new(root, TreeConfig::strict()).unwrap();
    assert_eq!(reopened.as_map().unwrap(), expected);
}

#[test]
fn test_negative_and_extreme_keys() {
    let doc = Document::new();
    let mut tree = NumberTree::new_empty(&doc, small_config()).unwrap();

    for key in [i64::MIN, -1, 0, 1, i64::MAX] {
        let value = doc.make_integer(key.signum());
        tree.set(key, &value).unwrap();
    }
    assert_eq!(
        tree.keys().unwrap().collect::<Vec<_>>(),
        vec![i64::MIN, -1, 0, 1, i64::MAX]
    );
    assert_eq!(
        doc.as_integer(tree.get(i64::MIN).unwrap().id()),
        Some(-1)
    );
}
