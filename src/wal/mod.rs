//! Write-ahead log collaborator (spec.md §2, §4.3 step 4, §6).
//!
//! The byte layout of a log record is explicitly implementation-defined
//! (spec.md §1 non-goal: "the exact binary log record format on disk");
//! what's specified is the *contract* — `append_undo`/`append_redo`/
//! `append_undoredo`/`start_system_op`/`end_system_op` returning a
//! monotonic LSN — grounded on the teacher's `tx_log::log_manager::
//! LogManager` (`log_start`/`log_update`/`log_commit`, a monotonically
//! advancing `current_offset` standing in for an LSN).
//!
//! `naive` is this crate's one implementation, named after the
//! teacher's own `tx_log::naive` module.

pub mod naive;

use crate::error::SmallError;
use crate::recovery::{LogPayload, RcvIndex};

/// Log sequence number: monotonically increasing, one per appended
/// record (spec.md §2 "return a monotonic LSN").
pub type Lsn = u64;

/// A nested system operation bracket (spec.md GLOSSARY "Topop"): either
/// fully committed to the WAL or fully aborted. Holding one commits the
/// caller to calling `end_system_op` exactly once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TopopHandle(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TopopOutcome {
    Commit,
    Abort,
}

/// The WAL contract the B+tree engine consumes (spec.md §6 "Consumed:
/// Write-ahead log").
pub trait WalWriter: Send + Sync {
    fn append_undo(&self, idx: RcvIndex, payload: LogPayload) -> Result<Lsn, SmallError>;
    fn append_redo(&self, idx: RcvIndex, payload: LogPayload) -> Result<Lsn, SmallError>;
    fn append_undoredo(&self, idx: RcvIndex, undo: LogPayload, redo: LogPayload) -> Result<Lsn, SmallError>;
    fn start_system_op(&self) -> TopopHandle;
    fn end_system_op(&self, handle: TopopHandle, outcome: TopopOutcome) -> Result<(), SmallError>;
    fn current_lsn(&self) -> Lsn;
}
