use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use tracing::trace;

use super::{LedgerStore, LedgerTxn};
use crate::error::LedgerError;

/// In-process ledger backed by a `BTreeMap`.
///
/// Transactions are fully serialised. Writes are buffered and applied on
/// commit, so a failed transaction leaves no trace.
#[derive(Debug)]
pub struct MemoryLedger {
    state: Mutex<BTreeMap<String, Vec<u8>>>,
    available: AtomicBool,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(BTreeMap::new()),
            available: AtomicBool::new(true),
        }
    }

    /// Simulate the ledger going offline (or coming back). While offline,
    /// transactions fail with `Unavailable`, including at commit time.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Number of committed keys.
    pub fn len(&self) -> usize {
        self.state.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().is_empty()
    }

    fn check_available(&self) -> Result<(), LedgerError> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(LedgerError::Unavailable("memory ledger offline".to_string()))
        }
    }
}

impl Default for MemoryLedger {
    fn default() -> Self {
        Self::new()
    }
}

pub struct MemoryTxn<'a> {
    base: &'a BTreeMap<String, Vec<u8>>,
    writes: BTreeMap<String, Vec<u8>>,
}

impl LedgerTxn for MemoryTxn<'_> {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, LedgerError> {
        Ok(self
            .writes
            .get(key)
            .or_else(|| self.base.get(key))
            .cloned())
    }

    fn put(&mut self, key: &str, value: Vec<u8>) -> Result<(), LedgerError> {
        self.writes.insert(key.to_string(), value);
        Ok(())
    }

    fn range_scan(&self, start: &str, end: &str) -> Result<Vec<(String, Vec<u8>)>, LedgerError> {
        if start >= end {
            return Ok(Vec::new());
        }
        let range = start.to_string()..end.to_string();
        let mut merged: BTreeMap<&String, &Vec<u8>> = self.base.range(range.clone()).collect();
        merged.extend(self.writes.range(range));
        Ok(merged
            .into_iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }
}

impl LedgerStore for MemoryLedger {
    type Txn<'a> = MemoryTxn<'a>;

    fn transact<T, E, F>(&self, body: F) -> Result<T, E>
    where
        F: FnOnce(&mut Self::Txn<'_>) -> Result<T, E>,
        E: From<LedgerError>,
    {
        self.check_available()?;
        let mut state = self.state.lock();
        let mut txn = MemoryTxn {
            base: &state,
            writes: BTreeMap::new(),
        };
        let out = body(&mut txn)?;
        let writes = txn.writes;

        self.check_available()?;
        trace!(writes = writes.len(), "committing ledger transaction");
        state.extend(writes);
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_own_writes() {
        let ledger = MemoryLedger::new();
        let seen = ledger
            .transact(|txn| {
                txn.put("A_1", b"one".to_vec())?;
                txn.get("A_1")
            })
            .unwrap();
        assert_eq!(seen, Some(b"one".to_vec()));
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn range_scan_merges_committed_and_pending() {
        let ledger = MemoryLedger::new();
        ledger
            .transact(|txn| {
                txn.put("A_1", b"old".to_vec())?;
                txn.put("A_3", b"three".to_vec())?;
                txn.put("B_1", b"other".to_vec())
            })
            .unwrap();

        let rows = ledger
            .transact(|txn| {
                txn.put("A_1", b"new".to_vec())?;
                txn.put("A_2", b"two".to_vec())?;
                txn.range_scan("A_", "A`")
            })
            .unwrap();
        let keys: Vec<&str> = rows.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, ["A_1", "A_2", "A_3"]);
        assert_eq!(rows[0].1, b"new".to_vec());
    }

    #[test]
    fn failed_body_writes_nothing() {
        let ledger = MemoryLedger::new();
        let result: Result<(), LedgerError> = ledger.transact(|txn| {
            txn.put("A_1", b"x".to_vec())?;
            Err(LedgerError::Unavailable("abort".into()))
        });
        assert!(result.is_err());
        assert!(ledger.is_empty());
    }

    #[test]
    fn offline_ledger_refuses_transactions() {
        let ledger = MemoryLedger::new();
        ledger.set_available(false);
        let result = ledger.transact(|txn| txn.put("A_1", b"x".to_vec()));
        assert!(matches!(result, Err(LedgerError::Unavailable(_))));
        ledger.set_available(true);
        assert!(ledger.is_empty());
    }

    #[test]
    fn commit_failure_discards_writes() {
        let ledger = MemoryLedger::new();
        let result = ledger.transact(|txn| {
            txn.put("A_1", b"x".to_vec())?;
            ledger.set_available(false);
            Ok::<_, LedgerError>(())
        });
        assert!(result.is_err());
        ledger.set_available(true);
        assert!(ledger.is_empty());
    }
}
