//! Shared test setup, grounded on the teacher's `tests/test_utils/setup.rs`
//! (`setup()` calls `init_log()` once per process) and `tests/test_utils/
//! other.rs` (small table/tuple builders). This crate's analog builds a
//! fresh `BTreeIndex`/`LockManager` instead of a shared table, since each
//! test here owns its own index rather than sharing one global table.

#![allow(dead_code)]

use std::sync::Arc;

use idxtree::btree::{BTreeIndex, BtidInt};
use idxtree::key::{Cell, CellType, ColumnSpec, IdxKey, IndexSchema};
use idxtree::types::Oid;
use idxtree::util::init_log;

pub fn setup() {
    init_log();
}

/// Single-column `int` schema, the shape scenario 1/2/6 in spec.md §8 use.
pub fn int_schema(unique: bool) -> IndexSchema {
    IndexSchema::new(vec![ColumnSpec { ty: CellType::Int, descending: false }], unique)
}

pub fn int_key(n: i32, slot: i16) -> IdxKey {
    IdxKey::new_leaf(vec![Cell::Int(n)], Oid::new(0, 1, slot))
}

/// A key with the OID wildcarded to `Oid::MAX`, for point lookups where
/// the caller only knows the user-attribute value (spec.md §8 scenario 1
/// `find_unique(key=(2, oid_max))`).
pub fn int_key_any_oid(n: i32) -> IdxKey {
    IdxKey::new_leaf(vec![Cell::Int(n)], Oid::MAX)
}

pub fn new_index(index_id: i32, unique: bool) -> BTreeIndex {
    setup();
    let btid = BtidInt::new(index_id, Oid::new(0, 1, 0), 0, int_schema(unique));
    BTreeIndex::new(Arc::new(btid))
}

/// Shrink the page size so a handful of inserts force a split, mirroring
/// the teacher's `BufferPool::set_page_size(1024)` pattern in
/// `btree_insert_test.rs`.
pub fn shrink_page_size() {
    idxtree::config::set_page_size(256);
}
