//! Append-only ledger anchoring for tags, audit outcomes and access
//! decisions.
//!
//! The ledger itself (consensus, state database) is an external
//! collaborator. This crate only needs the key/value contract below:
//! `get`, `put` and ordered `range_scan`, all inside a transaction that
//! commits every write or none and observes its own writes. The store is the
//! single serialisation point; nothing in this crate holds a lock across a
//! call into it.

mod binding;
pub mod keys;
mod memory;
mod records;

pub use binding::{AuditLedger, AuditOutcome, FileAuditState};
pub use memory::{MemoryLedger, MemoryTxn};
pub use records::{AuditRecord, AuditStatus, DownloadRecord, TagRecord};

use crate::error::LedgerError;

/// Operations available inside one ledger transaction.
pub trait LedgerTxn {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, LedgerError>;

    fn put(&mut self, key: &str, value: Vec<u8>) -> Result<(), LedgerError>;

    /// Entries with `start <= key < end`, in key order, including this
    /// transaction's uncommitted writes.
    fn range_scan(&self, start: &str, end: &str) -> Result<Vec<(String, Vec<u8>)>, LedgerError>;
}

/// A transactional key/value ledger.
pub trait LedgerStore: Send + Sync {
    type Txn<'a>: LedgerTxn
    where
        Self: 'a;

    /// Run `body` in a transaction. Writes are committed only if `body`
    /// returns `Ok` and the commit itself succeeds; otherwise nothing is
    /// written.
    fn transact<T, E, F>(&self, body: F) -> Result<T, E>
    where
        F: FnOnce(&mut Self::Txn<'_>) -> Result<T, E>,
        E: From<LedgerError>;
}
