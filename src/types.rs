//! Small shared type aliases, grounded on the teacher's `types.rs`
//! (`Pod<T>`, `SimpleResult`) generalized to the new error type.

use std::sync::{Arc, RwLock};

use crate::error::SmallError;

/// A handle shared across threads: cheap to clone, interior mutability
/// behind a `RwLock`. Type alias, not a newtype, so the underlying
/// `Arc`/`RwLock` methods stay usable.
pub type Pod<T> = Arc<RwLock<T>>;

pub type SmallResult = Result<(), SmallError>;
pub type ResultPod<T> = Result<Pod<T>, SmallError>;

/// Volume-page identifier: `(volume_id, page_id)` (spec.md GLOSSARY).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Vpid {
    pub volume_id: i16,
    pub page_id: i32,
}

impl Vpid {
    pub const NULL: Vpid = Vpid {
        volume_id: -1,
        page_id: -1,
    };

    pub fn new(volume_id: i16, page_id: i32) -> Self {
        Self { volume_id, page_id }
    }

    pub fn is_null(&self) -> bool {
        *self == Self::NULL
    }
}

impl Default for Vpid {
    fn default() -> Self {
        Self::NULL
    }
}

impl std::fmt::Display for Vpid {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}:{}", self.volume_id, self.page_id)
    }
}

/// Object identifier: row/class OID. Kept distinct from `Vpid` even
/// though both are small tuples of ints, since they mean different
/// things (a `Vpid` addresses a page, an `Oid` addresses a row).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Oid {
    pub volid: i16,
    pub pageid: i32,
    pub slotid: i16,
    /// Shard group id this row belongs to (spec.md §4.10/§4.5 "enforces
    /// shard-key group ownership on the trailing OID"). `Oid::new`
    /// defaults this to `config::GLOBAL_GROUPID`; `Oid::with_group_id`
    /// sets it explicitly for rows that belong to a sharded table.
    pub group_id: i32,
}

impl Oid {
    /// Sentinel used as the trailing-cell "infinity" value on non-leaf
    /// separator records (spec.md §3).
    pub const MAX: Oid = Oid {
        volid: i16::MAX,
        pageid: i32::MAX,
        slotid: i16::MAX,
        group_id: i32::MAX,
    };
    pub const MIN: Oid = Oid {
        volid: i16::MIN,
        pageid: i32::MIN,
        slotid: i16::MIN,
        group_id: i32::MIN,
    };

    pub fn new(volid: i16, pageid: i32, slotid: i16) -> Self {
        Self {
            volid,
            pageid,
            slotid,
            group_id: crate::config::GLOBAL_GROUPID,
        }
    }

    pub fn with_group_id(volid: i16, pageid: i32, slotid: i16, group_id: i32) -> Self {
        Self {
            volid,
            pageid,
            slotid,
            group_id,
        }
    }
}

impl std::fmt::Display for Oid {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "@{}|{}|{}", self.volid, self.pageid, self.slotid)
    }
}

/// Class object identifier — just an `Oid` at a different semantic slot.
pub type ClassOid = Oid;
