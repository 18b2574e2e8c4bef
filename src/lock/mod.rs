//! Transactional lock manager (spec.md §3-§4, §9).
//!
//! Submodules mirror the teacher's split between `transaction::
//! concurrent_status` (the manager/request flow) and `transaction::
//! wait_for_graph` (cycle detection), plus two modules this crate adds
//! because the spec's lock set is richer than the teacher's page
//! S/X-only latches: `mode` (the 5-mode compatibility/conversion
//! matrices) and `key` (the tagged-union lock name).

pub mod key;
pub mod manager;
pub mod mode;
pub mod resource;
pub mod wait_for_graph;

pub use key::LockKey;
pub use manager::{DeadlockResolution, LockManager, LockResult, WaitKind};
pub use mode::LockMode;
pub use resource::{EntryId, LkEntry, LkRes, ResourceId};
pub use wait_for_graph::TranIndex;
