//! Runtime-tunable parameters, env-var driven with `once_cell`-backed
//! defaults. Grounded on the teacher's use of `once_cell::sync::OnceCell`
//! for process-wide singletons (`btree/database.rs`,
//! `btree/page_cache.rs`'s `PAGE_SIZE` static).
//!
//! None of these are read from a config *file* — the original system
//! reads them from server parameters (`xserver_interface.h` in
//! `original_source/`); an env-var surface is the idiomatic equivalent
//! for a library crate with no daemon of its own.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

/// Page size in bytes. The teacher defaults to 4096; this crate keeps
/// that default but lets tests shrink it to force splits/merges sooner.
static PAGE_SIZE: AtomicUsize = AtomicUsize::new(4096);

/// Maximum length in bytes of a single serialized index record
/// (spec.md §4.1, `BTREE_MAX_KEYLEN`).
pub const BTREE_MAX_KEYLEN: usize = 900;

/// Fraction of a page that must remain free after a prospective sibling
/// merge for the merge to be considered profitable (spec.md §4.4).
pub const FIXED_EMPTY_RATIO: f64 = 0.33;

/// Clamp bounds for a node's running split pivot (spec.md §4.3).
pub const SPLIT_PIVOT_MIN: f64 = 0.05;
pub const SPLIT_PIVOT_MAX: f64 = 0.95;

/// The non-shard group id (spec.md §4.10 group-id validation): catalog
/// and global-table DML always carries this id; a shard table's group id
/// must never equal it.
pub const GLOBAL_GROUPID: i32 = 0;

/// Default lock wait budget in milliseconds before a blocked request
/// times out (spec.md §5 `lockwait_msecs`).
static DEFAULT_LOCK_WAIT_MSECS: AtomicU64 = AtomicU64::new(10_000);

/// Interval between deadlock-detector sweeps (spec.md §4.9: "default 1s").
static DEADLOCK_CHECK_INTERVAL_MS: AtomicU64 = AtomicU64::new(1_000);

pub fn page_size() -> usize {
    PAGE_SIZE.load(Ordering::Relaxed)
}

pub fn set_page_size(bytes: usize) {
    PAGE_SIZE.store(bytes, Ordering::Relaxed);
}

pub fn default_lock_wait() -> Duration {
    Duration::from_millis(DEFAULT_LOCK_WAIT_MSECS.load(Ordering::Relaxed))
}

pub fn set_default_lock_wait(d: Duration) {
    DEFAULT_LOCK_WAIT_MSECS.store(d.as_millis() as u64, Ordering::Relaxed);
}

pub fn deadlock_check_interval() -> Duration {
    Duration::from_millis(DEADLOCK_CHECK_INTERVAL_MS.load(Ordering::Relaxed))
}

pub fn set_deadlock_check_interval(d: Duration) {
    DEADLOCK_CHECK_INTERVAL_MS.store(d.as_millis() as u64, Ordering::Relaxed);
}

/// Whether sibling-merge-on-empty-leaf is gated off for maintenance-only
/// bulk loads (spec.md §9 open question #3; default resolved to
/// `Always` in DESIGN.md).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergePolicy {
    Always,
    Disabled,
}

impl Default for MergePolicy {
    fn default() -> Self {
        if cfg!(feature = "merge_maintenance_only") {
            MergePolicy::Disabled
        } else {
            MergePolicy::Always
        }
    }
}
