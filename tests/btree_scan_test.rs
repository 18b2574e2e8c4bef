//! Range scan behavior (spec.md §8 scenario 2), grounded on the teacher's
//! `tests/integretions/btree_scan_test.rs` (`BTreeTableSearchIterator`
//! over `Op::{Equals, GreaterThanOrEq, LessThan}` predicates).

mod test_utils;

use idxtree::btree::{BtreeScan, RangeKind};
use idxtree::types::Oid;
use idxtree::wal::naive::NaiveWal;
use test_utils::{int_key, new_index};

#[test]
fn ascending_ge_le_scan_yields_oids_in_order() {
    let idx = new_index(20, true);
    let wal = NaiveWal::new();
    for i in 1..=5 {
        idx.insert(&wal, &int_key(i, 0)).unwrap();
    }

    let mut scan = BtreeScan::new(
        Some(int_key(1, i16::MIN)),
        Some(int_key(3, i16::MAX)),
        RangeKind::GeLe,
        true,
        None,
    );
    let mut out = Vec::new();
    idx.range_search(&mut scan, &mut out, 10).unwrap();

    assert_eq!(out, vec![Oid::new(0, 1, 0), Oid::new(0, 1, 0), Oid::new(0, 1, 0)]);
    assert_eq!(scan.returned, 3);
}

#[test]
fn descending_scan_reverses_ascending_order() {
    let idx = new_index(21, true);
    let wal = NaiveWal::new();
    for i in 1..=5 {
        idx.insert(&wal, &int_key(i, 0)).unwrap();
    }

    let mut ascending = BtreeScan::new(Some(int_key(1, i16::MIN)), Some(int_key(5, i16::MAX)), RangeKind::GeLe, true, None);
    let mut asc_out = Vec::new();
    idx.range_search(&mut ascending, &mut asc_out, 10).unwrap();

    let mut descending = BtreeScan::new(Some(int_key(1, i16::MIN)), Some(int_key(5, i16::MAX)), RangeKind::GeLe, false, None);
    let mut desc_out = Vec::new();
    idx.range_search(&mut descending, &mut desc_out, 10).unwrap();

    let mut reversed = asc_out.clone();
    reversed.reverse();
    assert_eq!(desc_out, reversed);
}

#[test]
fn scan_resumes_across_batches() {
    let idx = new_index(22, true);
    let wal = NaiveWal::new();
    for i in 0..20 {
        idx.insert(&wal, &int_key(i, 0)).unwrap();
    }

    let mut scan = BtreeScan::new(None, None, RangeKind::GeLe, true, None);
    let mut all = Vec::new();
    loop {
        let n = idx.range_search(&mut scan, &mut all, 4).unwrap();
        if n == 0 && scan.is_done() {
            break;
        }
    }
    assert_eq!(all.len(), 20);
}

#[test]
fn filter_predicate_excludes_non_matching_keys() {
    use idxtree::btree::KeyFilterResult;
    use idxtree::key::{Cell, CellType};

    let idx = new_index(23, true);
    let wal = NaiveWal::new();
    for i in 0..10 {
        idx.insert(&wal, &int_key(i, 0)).unwrap();
    }

    let even_only = |k: &idxtree::key::IdxKey| match &k.cells()[0] {
        Cell::Int(v) if *v % 2 == 0 => KeyFilterResult::True,
        Cell::Int(_) => KeyFilterResult::False,
        _ => KeyFilterResult::Error,
    };
    let _ = CellType::Int;

    let mut scan = BtreeScan::new(None, None, RangeKind::GeLe, true, Some(&even_only));
    let mut out = Vec::new();
    idx.range_search(&mut scan, &mut out, 100).unwrap();
    assert_eq!(out.len(), 5);
}

/// Covering-index scan: the projected tuple for each key carries the
/// indexed column itself, with no need to revisit the heap (spec.md
/// §4.5 "a tuple assembled from attribute descriptors").
#[test]
fn covering_index_scan_projects_indexed_columns_into_tuples() {
    use idxtree::key::Cell;

    let idx = new_index(24, true);
    let wal = NaiveWal::new();
    for i in 0..5 {
        idx.insert(&wal, &int_key(i, 0)).unwrap();
    }

    let mut scan = BtreeScan::new(None, None, RangeKind::GeLe, true, None).with_covering_projection(vec![0]);
    let mut out = Vec::new();
    idx.range_search(&mut scan, &mut out, 100).unwrap();

    assert_eq!(out.len(), 5);
    let tuples = scan.take_covering_tuples();
    assert_eq!(tuples.len(), 5);
    for (i, tuple) in tuples.iter().enumerate() {
        assert_eq!(tuple, &vec![Cell::Int(i as i32)]);
    }
    // Draining again yields nothing left to take.
    assert!(scan.take_covering_tuples().is_empty());
}

/// Multi-range-optimization scan: only the best `capacity` keys (by sort
/// column) survive, and the scan ends as soon as the heap is full and
/// rejects a worse candidate (spec.md "the first item rejected ends the
/// scan").
#[test]
fn mro_scan_keeps_only_the_best_n_and_stops_early() {
    use idxtree::btree::MroHeap;

    let idx = new_index(25, true);
    let wal = NaiveWal::new();
    for i in 0..20 {
        idx.insert(&wal, &int_key(i, 0)).unwrap();
    }

    let heap = MroHeap::new(vec![0], vec![false], 3);
    let mut scan = BtreeScan::new(None, None, RangeKind::GeLe, true, None).with_mro(heap);
    let mut out = Vec::new();
    idx.range_search(&mut scan, &mut out, usize::MAX).unwrap();

    assert!(out.is_empty(), "MRO mode doesn't push OIDs into the batch buffer");
    assert_eq!(scan.returned, 3);
    assert!(scan.is_done());

    let items = scan.into_mro_items();
    let values: Vec<i32> = items
        .iter()
        .map(|k| match &k.cells()[0] {
            idxtree::key::Cell::Int(v) => *v,
            _ => panic!("expected int cell"),
        })
        .collect();
    assert_eq!(values, vec![0, 1, 2]);
}

/// Shard-key group ownership is enforced on the trailing OID of every
/// matching key (spec.md §4.5 / §4.10): an unowned group id aborts the
/// scan with `ShardInvalidGroupId`.
#[test]
fn shard_scope_rejects_an_unowned_group_id() {
    use idxtree::btree::ShardScope;
    use idxtree::error::SmallError;

    let idx = new_index(26, true);
    let wal = NaiveWal::new();
    idx.insert(&wal, &int_key(1, 0)).unwrap();

    let owned = |group_id: i32| group_id == 5;
    let scope = ShardScope { is_shard_table: true, is_owned: &owned };
    let mut scan = BtreeScan::new(None, None, RangeKind::GeLe, true, None).with_shard_scope(scope);
    let mut out = Vec::new();
    let err = idx.range_search(&mut scan, &mut out, 100).unwrap_err();
    assert!(matches!(err, SmallError::ShardInvalidGroupId { group_id: 0 }));
}

/// A scope whose ownership predicate covers the row's group id lets the
/// scan through untouched.
#[test]
fn shard_scope_admits_an_owned_group_id() {
    use idxtree::btree::ShardScope;
    use idxtree::config;

    let idx = new_index(27, true);
    let wal = NaiveWal::new();
    for i in 0..3 {
        idx.insert(&wal, &int_key(i, 0)).unwrap();
    }

    let owned = |group_id: i32| group_id == config::GLOBAL_GROUPID;
    let scope = ShardScope { is_shard_table: false, is_owned: &owned };
    let mut scan = BtreeScan::new(None, None, RangeKind::GeLe, true, None).with_shard_scope(scope);
    let mut out = Vec::new();
    idx.range_search(&mut scan, &mut out, 100).unwrap();
    assert_eq!(out.len(), 3);
}
