//! Error types surfaced across the crate.
//!
//! Grounded on the teacher's hand-rolled `error::SimpleError`: no
//! `thiserror`/`anyhow`, just `std::error::Error` + `Display` on a plain
//! enum, matching the crate's existing aversion to macro-generated error
//! boilerplate.

use std::fmt;

use crate::key::IdxKey;

/// Error kinds surfaced to callers (spec.md §7).
#[derive(Debug, Clone)]
pub enum SmallError {
    /// A composed index record would exceed `BTREE_MAX_KEYLEN` (900 bytes).
    BtreeMaxKeyLen { len: usize },

    /// Unique-constraint violation on insert.
    BtreeDuplicateOid { key: String },

    /// Delete of a key that is not present (and the index is not
    /// `InProgress`).
    BtreeUnknownKey { key: String },

    /// Fence violation, impossible slot counts, or descending-order break.
    /// Fatal: the index on the named class is corrupted.
    BtreePageCorrupted { index_name: String, detail: String },

    /// A lock request timed out before being granted.
    LockTimeout {
        blocker_tran_indexes: Vec<u32>,
        resource: String,
    },

    /// The deadlock detector found a cycle; paired with a `LockTimeout`
    /// (style `ResumedDeadlockTimeout`) delivered to the chosen victim.
    LockDeadlockCycleDetected { participants: Vec<u32> },

    /// A shard group id was invalid for the requested table kind.
    ShardInvalidGroupId { group_id: i32 },

    /// A transaction attempted to bind a second, different shard key.
    ShardCantLockTwoShardKeyATran,

    /// Allocator failure while growing a resource/entry free-list block.
    OutOfVirtualMemory,

    /// Internal invariant violation in the suspend/resume protocol.
    /// Diagnostic, non-fatal.
    LkStrangeLockWait { detail: String },

    /// A recovery index is retained for on-disk compatibility but has no
    /// handler (spec.md §9 open question #2): policy is to reject.
    RecoveryUnsupported(crate::recovery::RcvIndex),

    /// Generic I/O failure from the file/WAL layer.
    Io(String),
}

impl SmallError {
    pub fn duplicate_oid(key: &IdxKey) -> Self {
        SmallError::BtreeDuplicateOid {
            key: format!("{:?}", key),
        }
    }

    pub fn unknown_key(key: &IdxKey) -> Self {
        SmallError::BtreeUnknownKey {
            key: format!("{:?}", key),
        }
    }

    pub fn page_corrupted(index_name: &str, detail: impl Into<String>) -> Self {
        SmallError::BtreePageCorrupted {
            index_name: index_name.to_string(),
            detail: detail.into(),
        }
    }

    /// Whether this error kind is fatal (spec.md §7: `BtreePageCorrupted`
    /// is the only fatal kind).
    pub fn is_fatal(&self) -> bool {
        matches!(self, SmallError::BtreePageCorrupted { .. })
    }

    /// Print a backtrace to stderr for diagnosable, non-fatal errors.
    /// Grounded on `transaction/concurrent_status.rs`'s
    /// `err.show_backtrace()` call sites.
    pub fn show_backtrace(&self) {
        let bt = backtrace::Backtrace::new();
        log::error!("{}\n{:?}", self, bt);
    }
}

impl fmt::Display for SmallError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            SmallError::BtreeMaxKeyLen { len } => write!(
                f,
                "index record of {} bytes exceeds BTREE_MAX_KEYLEN (900)",
                len
            ),
            SmallError::BtreeDuplicateOid { key } => {
                write!(f, "duplicate key on unique index: {}", key)
            }
            SmallError::BtreeUnknownKey { key } => {
                write!(f, "delete of unknown key: {}", key)
            }
            SmallError::BtreePageCorrupted { index_name, detail } => {
                write!(f, "index '{}' is corrupted: {}", index_name, detail)
            }
            SmallError::LockTimeout {
                blocker_tran_indexes,
                resource,
            } => write!(
                f,
                "lock timeout on {}, blocked by tran(s) {:?}",
                resource, blocker_tran_indexes
            ),
            SmallError::LockDeadlockCycleDetected { participants } => {
                write!(f, "deadlock cycle detected among tran(s) {:?}", participants)
            }
            SmallError::ShardInvalidGroupId { group_id } => {
                write!(f, "invalid shard group id: {}", group_id)
            }
            SmallError::ShardCantLockTwoShardKeyATran => write!(
                f,
                "a transaction cannot lock two different shard keys"
            ),
            SmallError::OutOfVirtualMemory => write!(f, "out of virtual memory"),
            SmallError::LkStrangeLockWait { detail } => {
                write!(f, "internal lock-wait invariant violated: {}", detail)
            }
            SmallError::RecoveryUnsupported(idx) => {
                write!(f, "recovery index {:?} has no handler, rejecting record", idx)
            }
            SmallError::Io(detail) => write!(f, "io error: {}", detail),
        }
    }
}

impl std::error::Error for SmallError {}

impl From<std::io::Error> for SmallError {
    fn from(e: std::io::Error) -> Self {
        SmallError::Io(e.to_string())
    }
}
