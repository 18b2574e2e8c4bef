//! An on-disk, page-based, ordered multi-column B+tree index engine with
//! a transactional object lock manager (see SPEC_FULL.md).
//!
//! Module layout mirrors the teacher's top-level split between `btree`
//! (the index engine) and the transaction subsystem, with `lock`,
//! `wal`, `observation`, `recovery`, `transaction` and `database`
//! generalizing the teacher's single-table, single-process-singleton
//! design into the wider collaborator set this crate's surface needs.

pub mod btree;
pub mod config;
pub mod database;
pub mod error;
pub mod key;
pub mod lock;
pub mod observation;
pub mod recovery;
pub mod transaction;
pub mod types;
pub mod util;
pub mod wal;

pub use database::Database;
pub use error::SmallError;
pub use transaction::{Transaction, TransactionId, TransactionStatus};
