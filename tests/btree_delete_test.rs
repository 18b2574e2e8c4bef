//! Delete/merge behavior (spec.md §8 scenario 1, round-trip law
//! "insert(k); delete(k) returns the tree to exactly its pre-insert key
//! set"), grounded on the teacher's `tests/integretions/
//! btree_delete_test.rs`.

mod test_utils;

use idxtree::btree::{BtreeScan, RangeKind};
use idxtree::config::MergePolicy;
use idxtree::error::SmallError;
use idxtree::wal::naive::NaiveWal;
use test_utils::{int_key, int_key_any_oid, new_index};

#[test]
fn delete_then_lookup_returns_not_found() {
    let idx = new_index(10, true);
    let wal = NaiveWal::new();

    idx.insert(&wal, &int_key(1, 0)).unwrap();
    idx.insert(&wal, &int_key(2, 0)).unwrap();
    idx.insert(&wal, &int_key(3, 0)).unwrap();

    assert!(idx.find_unique(&int_key_any_oid(2)).unwrap().is_some());
    idx.delete(&wal, &int_key(2, 0)).unwrap();
    assert!(idx.find_unique(&int_key_any_oid(2)).unwrap().is_none());
}

#[test]
fn delete_of_absent_key_errors() {
    let idx = new_index(11, true);
    let wal = NaiveWal::new();
    let err = idx.delete(&wal, &int_key(1, 0)).unwrap_err();
    assert!(matches!(err, SmallError::BtreeUnknownKey { .. }));
}

#[test]
fn insert_then_delete_returns_to_pre_insert_key_set() {
    let idx = new_index(12, true);
    let wal = NaiveWal::new();

    for i in 0..50 {
        idx.insert(&wal, &int_key(i, 0)).unwrap();
    }
    let before = idx.get_stats().unwrap().key_count;

    idx.insert(&wal, &int_key(999, 0)).unwrap();
    idx.delete(&wal, &int_key(999, 0)).unwrap();

    let after = idx.get_stats().unwrap().key_count;
    assert_eq!(before, after);
    assert!(idx.find_unique(&int_key_any_oid(999)).unwrap().is_none());
    for i in 0..50 {
        assert!(idx.find_unique(&int_key_any_oid(i)).unwrap().is_some());
    }
}

/// Deleting every key in a leaf leaves it empty and eligible for
/// reclamation under the default `Always` merge policy.
#[test]
fn deleting_all_keys_in_a_leaf_reclaims_it_under_default_policy() {
    let idx = new_index(13, true);
    let wal = NaiveWal::new();

    idx.insert(&wal, &int_key(5, 0)).unwrap();
    idx.delete(&wal, &int_key(5, 0)).unwrap();

    let stats = idx.get_stats().unwrap();
    assert_eq!(stats.key_count, 0);
    assert_eq!(stats.leaf_count, 1, "a lone root leaf has nowhere to merge into, so it stays");
}

/// spec.md §8 scenario 6: 10,000 sequential keys, delete every other one,
/// then range-scan and confirm exactly the survivors come back in order.
/// The scan's own descent re-exercises the `left_fence`/`right_fence`
/// invariant every debug build already asserts on each level (§4.2), so a
/// clean scan across the whole tree is itself evidence the `key_cnt`
/// bookkeeping survived 5,000 leaf deletions and their merges intact.
#[test]
fn ten_thousand_keys_delete_every_other_then_scan_matches_survivors() {
    const N: i32 = 10_000;

    let idx = new_index(15, true);
    let wal = NaiveWal::new();

    for i in 0..N {
        idx.insert(&wal, &int_key(i, 0)).unwrap();
    }

    for i in (0..N).step_by(2) {
        idx.delete(&wal, &int_key(i, 0)).unwrap();
    }

    let stats = idx.get_stats().unwrap();
    assert_eq!(stats.key_count, (N / 2) as u64);

    for i in 0..N {
        let found = idx.find_unique(&int_key_any_oid(i)).unwrap();
        if i % 2 == 0 {
            assert!(found.is_none(), "key {i} should have been deleted");
        } else {
            assert!(found.is_some(), "key {i} should still be present");
        }
    }

    let mut scan = BtreeScan::new(None, None, RangeKind::GeLe, true, None);
    let mut all = Vec::new();
    loop {
        let n = idx.range_search(&mut scan, &mut all, 256).unwrap();
        if n == 0 && scan.is_done() {
            break;
        }
    }

    assert_eq!(all.len(), (N / 2) as usize);
    assert!(all.iter().all(|oid| *oid == idxtree::types::Oid::new(0, 1, 0)));
}

/// `MergePolicy::Disabled` (spec.md §9 open question #3) leaves an empty
/// leaf with more siblings in place rather than reclaiming it.
#[test]
fn disabled_merge_policy_keeps_empty_leaf_linked() {
    use std::sync::Arc;

    let btid = Arc::new(idxtree::btree::BtidInt::new(
        14,
        idxtree::types::Oid::new(0, 1, 0),
        0,
        test_utils::int_schema(true),
    ));
    let idx = idxtree::btree::BTreeIndex::with_merge_policy(btid, MergePolicy::Disabled);
    let wal = NaiveWal::new();

    for i in 0..500 {
        idx.insert(&wal, &int_key(i, 0)).unwrap();
    }
    let leaves_before = idx.get_stats().unwrap().leaf_count;
    assert!(leaves_before > 1, "500 inserts should have split into multiple leaves");

    for i in 0..500 {
        idx.delete(&wal, &int_key(i, 0)).unwrap();
    }
    let stats = idx.get_stats().unwrap();
    assert_eq!(stats.key_count, 0);
    assert_eq!(stats.leaf_count, leaves_before, "Disabled policy must not reclaim emptied leaves");
}
