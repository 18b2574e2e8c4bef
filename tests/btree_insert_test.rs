//! Insert/split behavior (spec.md §8 scenarios 1 and 6), grounded on the
//! teacher's `tests/integretions/btree_insert_test.rs`
//! (`test_insert_tuple`/`test_split_leaf_page`/`test_split_root_page`).

mod test_utils;

use idxtree::error::SmallError;
use idxtree::wal::naive::NaiveWal;
use test_utils::{int_key, int_key_any_oid, new_index, shrink_page_size};

#[test]
fn insert_then_find_unique_by_oid_wildcard() {
    let idx = new_index(1, true);
    let wal = NaiveWal::new();

    idx.insert(&wal, &int_key(1, 0)).unwrap();
    idx.insert(&wal, &int_key(2, 0)).unwrap();
    idx.insert(&wal, &int_key(3, 0)).unwrap();

    let found = idx.find_unique(&int_key_any_oid(2)).unwrap();
    assert_eq!(found, Some(idxtree::types::Oid::new(0, 1, 0)));
}

#[test]
fn duplicate_insert_on_unique_index_errors() {
    let idx = new_index(2, true);
    let wal = NaiveWal::new();

    idx.insert(&wal, &int_key(7, 0)).unwrap();
    let err = idx.insert(&wal, &int_key(7, 1)).unwrap_err();
    assert!(matches!(err, SmallError::BtreeDuplicateOid { .. }));
}

#[test]
fn insert_past_900_byte_keylen_fails() {
    use idxtree::key::{Cell, IdxKey};
    use idxtree::types::Oid;

    let idx = new_index(3, false);
    let wal = NaiveWal::new();

    // a VarChar cell long enough to push the composed record past
    // BTREE_MAX_KEYLEN (spec.md §8 "901 bytes fails with BtreeMaxKeyLen").
    let huge = "x".repeat(1000);
    let key = IdxKey::new_leaf(vec![Cell::VarChar(huge)], Oid::new(0, 1, 0));
    let err = idx.insert(&wal, &key);
    assert!(err.is_err());
}

#[test]
fn many_sequential_inserts_force_splits_and_stay_sorted() {
    shrink_page_size();
    let idx = new_index(4, true);
    let wal = NaiveWal::new();

    for i in 0..500 {
        idx.insert(&wal, &int_key(i, 0)).unwrap();
    }

    for i in 0..500 {
        assert!(idx.find_unique(&int_key_any_oid(i)).unwrap().is_some(), "missing key {i}");
    }

    let stats = idx.get_stats().unwrap();
    assert_eq!(stats.key_count, 500);
    assert!(stats.leaf_count > 1, "500 inserts at a shrunk page size should have split at least once");
}
