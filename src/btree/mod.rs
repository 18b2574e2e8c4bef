//! B+tree index engine (spec.md §3-§4).
//!
//! Mirrors the teacher's `btree` module layout (`page`, `page_cache`,
//! `file`, `table`, `catalog`), renaming `page_cache` to `buffer_pool`
//! and `table` to `index` to match this crate's vocabulary, and adding
//! `scan` for the resumable range search spec.md §4.5 introduces.

pub mod buffer_pool;
pub mod catalog;
pub mod file;
pub mod index;
pub mod page;
pub mod scan;

pub use buffer_pool::{BufferPool, FixMode, Page};
pub use catalog::{BtidInt, Catalog};
pub use file::IndexFile;
pub use index::{
    delete, find_min_or_max_key, find_unique, get_stats, insert, locate_key, range_search, search_leaf, update, BTreeIndex,
    IndexStats,
};
pub use page::{BTreeInternalPage, BTreeLeafPage, BTreePageId, BTreeRootPointerPage, PageCategory};
pub use scan::{BtreeScan, KeyFilterResult, MroHeap, RangeKind, ScanMode, ShardScope};
