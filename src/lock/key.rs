//! `LockKey`: the tagged-union lock name (spec.md §3 "Lock resource",
//! §9 Design Notes). Grounded on `key::Cell`'s shape but kept separate
//! since lock names are never NULL and never carry a trailing OID cell
//! the way an `IdxKey` does.

use crate::types::Oid;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LockKey {
    Oid(Oid),
    VarChar(String),
    Int(i32),
    BigInt(i64),
}

impl LockKey {
    /// `__SYSTEM_DDL_KEY__` (spec.md §4.10).
    pub fn system_ddl_key() -> LockKey {
        LockKey::VarChar("__SYSTEM_DDL_KEY__".to_string())
    }

    /// `__SHARD_CATALOG_KEY__`.
    pub fn shard_catalog_key() -> LockKey {
        LockKey::VarChar("__SHARD_CATALOG_KEY__".to_string())
    }

    /// `__SHARD_GLOBAL_KEY__`.
    pub fn shard_global_key() -> LockKey {
        LockKey::VarChar("__SHARD_GLOBAL_KEY__".to_string())
    }
}

impl std::fmt::Display for LockKey {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            LockKey::Oid(o) => write!(f, "{}", o),
            LockKey::VarChar(s) => write!(f, "'{}'", s),
            LockKey::Int(i) => write!(f, "{}", i),
            LockKey::BigInt(i) => write!(f, "{}", i),
        }
    }
}
