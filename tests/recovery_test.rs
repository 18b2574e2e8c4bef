//! Recovery dispatch redo-idempotence and undo-inversion laws
//! (spec.md §8 round-trip/idempotence laws; §9 Open Question #2 disabled
//! indices), grounded on `original_source/transaction/recovery.c`'s
//! `RV_fun[]` table and this crate's `recovery::dispatch_redo`/
//! `dispatch_undo`/`dispatch_undo_logical`.

mod test_utils;

use idxtree::btree::buffer_pool::Page;
use idxtree::btree::page::{BTreeLeafPage, BTreePageId, PageCategory};
use idxtree::config::MergePolicy;
use idxtree::recovery::{descriptor, dispatch_redo, dispatch_undo, dispatch_undo_logical, LogPayload, RcvIndex, RCV_TABLE};
use idxtree::types::Vpid;
use idxtree::wal::naive::NaiveWal;
use test_utils::{int_key, int_key_any_oid, new_index};

fn blank_leaf_page() -> Page {
    let pid = BTreePageId::new(PageCategory::Leaf, 1, Vpid { volume_id: 0, page_id: 1 });
    Page::Leaf(BTreeLeafPage::empty(pid))
}

#[test]
fn disabled_indices_are_rejected_by_both_redo_and_undo() {
    let payload = LogPayload::Noop;
    let mut page = blank_leaf_page();
    for idx in [
        RcvIndex::RvhfDeleteNewhome,
        RcvIndex::RvhfUpdateType,
        RcvIndex::RvflMarkedDeleted,
        RcvIndex::RvdkMagic,
        RcvIndex::RvdkChangeCreation,
    ] {
        assert!(dispatch_redo(idx, &payload, &mut page).is_err());
        assert!(dispatch_undo(idx, &payload, &mut page).is_err());
    }
}

/// `RCV_TABLE` (SPEC_FULL.md §4.14) names every index the original's
/// `RV_fun[]` does, with `has_handler` matching `RcvIndex::is_disabled()`.
#[test]
fn rcv_table_covers_every_index_with_a_real_name() {
    assert_eq!(RCV_TABLE.len(), 19);
    assert_eq!(descriptor(RcvIndex::RvbtKeyvalInsert).name, "RVBT_KEYVAL_INSERT");
    assert!(descriptor(RcvIndex::RvbtKeyvalInsert).has_handler);
    assert!(!descriptor(RcvIndex::RvflMarkedDeleted).has_handler);
}

#[test]
fn noop_payload_redo_and_undo_never_error() {
    let mut page = blank_leaf_page();
    assert!(dispatch_redo(RcvIndex::RvbtNoop, &LogPayload::Noop, &mut page).is_ok());
    assert!(dispatch_undo(RcvIndex::RvbtNoop, &LogPayload::Noop, &mut page).is_ok());
}

/// Redo must be idempotent: applying the same payload to the same page
/// twice in a row is indistinguishable from applying it once, and the
/// bytes actually change relative to the untouched page (the dispatcher
/// is a real physical patch, not a stub).
#[test]
fn node_record_redo_is_idempotent_and_actually_mutates_the_page() {
    let mut page = blank_leaf_page();
    let untouched = page.as_leaf().to_page_bytes();

    let payload = LogPayload::NodeRecord {
        page: Vpid { volume_id: 0, page_id: 1 },
        slot: 0,
        before: None,
        after: Some(vec![1, 2, 3]),
    };

    dispatch_redo(RcvIndex::RvbtNdrecordIns, &payload, &mut page).unwrap();
    let once = page.as_leaf().to_page_bytes();
    assert_ne!(untouched, once, "redo must actually install the logged bytes");

    dispatch_redo(RcvIndex::RvbtNdrecordIns, &payload, &mut page).unwrap();
    let twice = page.as_leaf().to_page_bytes();
    assert_eq!(once, twice, "redo applied twice must match redo applied once");
}

/// Undo is the exact inverse of its paired redo: redo-then-undo returns
/// the page to an indistinguishable state from never having applied
/// either.
#[test]
fn node_record_undo_inverts_its_paired_redo() {
    let before_page = blank_leaf_page();
    let before_snapshot = before_page.as_leaf().to_page_bytes();

    let mut page = blank_leaf_page();
    let payload = LogPayload::NodeRecord {
        page: Vpid { volume_id: 0, page_id: 1 },
        slot: 0,
        before: None,
        after: Some(vec![9, 9, 9]),
    };

    dispatch_redo(RcvIndex::RvbtNdrecordUpd, &payload, &mut page).unwrap();
    assert_eq!(page.as_leaf().tuple_count(), 1);
    dispatch_undo(RcvIndex::RvbtNdrecordUpd, &payload, &mut page).unwrap();
    let after_round_trip = page.as_leaf().to_page_bytes();

    assert_eq!(before_snapshot, after_round_trip);
    assert_eq!(page.as_leaf().tuple_count(), 0);
}

/// `dispatch_undo_logical` re-runs the live `btree::index` operation a
/// `KeyVal` record is the inverse of: undoing an insert's `KeyVal`
/// deletes the key; undoing a delete's `KeyVal` re-inserts it.
#[test]
fn key_val_undo_logical_inverts_insert_against_the_live_index() {
    let idx = new_index(30, true);
    let wal = NaiveWal::new();
    idx.insert(&wal, &int_key(5, 0)).unwrap();
    assert!(idx.find_unique(&int_key_any_oid(5)).unwrap().is_some());

    let payload = LogPayload::KeyVal { index_id: idx.btid.index_id, key: int_key(5, 0) };
    dispatch_undo_logical(RcvIndex::RvbtKeyvalInsert, &payload, &idx.btid, &wal, MergePolicy::Always).unwrap();

    assert!(idx.find_unique(&int_key_any_oid(5)).unwrap().is_none());
}

#[test]
fn key_val_undo_logical_inverts_delete_against_the_live_index() {
    let idx = new_index(31, true);
    let wal = NaiveWal::new();
    idx.insert(&wal, &int_key(7, 0)).unwrap();
    idx.delete(&wal, &int_key(7, 0)).unwrap();
    assert!(idx.find_unique(&int_key_any_oid(7)).unwrap().is_none());

    let payload = LogPayload::KeyVal { index_id: idx.btid.index_id, key: int_key(7, 0) };
    dispatch_undo_logical(RcvIndex::RvbtKeyvalDelete, &payload, &idx.btid, &wal, MergePolicy::Always).unwrap();

    assert!(idx.find_unique(&int_key_any_oid(7)).unwrap().is_some());
}

/// Undoing an insert whose key a later operation already removed is
/// tolerated, not an error (spec.md §4.4 step 2's race tolerance).
#[test]
fn key_val_undo_logical_tolerates_an_already_removed_key() {
    let idx = new_index(32, true);
    let wal = NaiveWal::new();
    idx.insert(&wal, &int_key(9, 0)).unwrap();
    idx.delete(&wal, &int_key(9, 0)).unwrap();

    let payload = LogPayload::KeyVal { index_id: idx.btid.index_id, key: int_key(9, 0) };
    assert!(dispatch_undo_logical(RcvIndex::RvbtKeyvalInsert, &payload, &idx.btid, &wal, MergePolicy::Always).is_ok());
}

#[test]
fn key_val_undo_logical_rejects_disabled_indices() {
    let idx = new_index(33, true);
    let wal = NaiveWal::new();
    let payload = LogPayload::KeyVal { index_id: idx.btid.index_id, key: int_key(1, 0) };
    assert!(dispatch_undo_logical(RcvIndex::RvdkMagic, &payload, &idx.btid, &wal, MergePolicy::Always).is_err());
}

#[test]
fn page_alloc_payload_routes_through_both_directions_as_a_no_op() {
    let mut page = blank_leaf_page();
    let alloc = LogPayload::PageAlloc { page: Vpid { volume_id: 0, page_id: 2 } };
    assert!(dispatch_redo(RcvIndex::RvbtNewPgalloc, &alloc, &mut page).is_ok());
    assert!(dispatch_undo(RcvIndex::RvbtNewPgalloc, &alloc, &mut page).is_ok());
}
