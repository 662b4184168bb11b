//! Append-only ledger of observed (pid, tgid) pairs
//!
//! Populated lazily by the `Info` control command, one entry per distinct
//! pair, and drained once at teardown. The ledger has its own mutex,
//! independent from the ring lock: registering a process never contends
//! with data-path cursor updates.
//!
//! The scan in `insert_if_absent` is a deliberate O(n) linear pass.
//! Expected cardinality is small, and the simple scan is easy to show
//! correct under the lock.

use parking_lot::Mutex;
use tracing::info;

/// One observed (process-id, thread-group-id) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedgerEntry {
    /// Process (task) id.
    pub pid: i32,
    /// Thread-group id.
    pub tgid: i32,
}

/// Mutex-guarded append-only set of [`LedgerEntry`] values.
///
/// Entries are owned exclusively by the ledger and never removed before
/// teardown. An entry is fully constructed before it is pushed, so no
/// observer under the lock ever sees a partial node.
#[derive(Debug, Default)]
pub struct ProcessLedger {
    entries: Mutex<Vec<LedgerEntry>>,
}

impl ProcessLedger {
    /// Create an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the pair if it is not already present.
    ///
    /// Idempotent: a pair that already exists is returned as-is and no
    /// duplicate is appended; a new pair is appended at the tail.
    pub fn insert_if_absent(&self, pid: i32, tgid: i32) -> LedgerEntry {
        let mut entries = self.entries.lock();
        if let Some(existing) = entries.iter().find(|e| e.pid == pid && e.tgid == tgid) {
            return *existing;
        }
        let entry = LedgerEntry { pid, tgid };
        entries.push(entry);
        entry
    }

    /// Number of distinct pairs recorded so far.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Whether the ledger has recorded any pair.
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Copy of the current entries, in insertion order.
    pub fn snapshot(&self) -> Vec<LedgerEntry> {
        self.entries.lock().clone()
    }

    /// Emit one diagnostic record per entry, then release them all.
    ///
    /// Safe on an empty or never-populated ledger, and idempotent: a
    /// second call finds nothing to drain.
    pub fn teardown(&self) {
        let drained = std::mem::take(&mut *self.entries.lock());
        for (idx, entry) in drained.iter().enumerate() {
            info!(
                "Task {}: PID {}, TGID {}",
                idx + 1,
                entry.pid,
                entry.tgid
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn insert_if_absent_is_idempotent() {
        let ledger = ProcessLedger::new();
        ledger.insert_if_absent(7, 7);
        ledger.insert_if_absent(7, 7);
        assert_eq!(ledger.len(), 1);
        assert_eq!(ledger.snapshot(), vec![LedgerEntry { pid: 7, tgid: 7 }]);
    }

    #[test]
    fn distinct_pairs_append_in_order() {
        let ledger = ProcessLedger::new();
        ledger.insert_if_absent(1, 1);
        ledger.insert_if_absent(2, 1);
        ledger.insert_if_absent(1, 1);
        ledger.insert_if_absent(3, 3);

        let entries = ledger.snapshot();
        assert_eq!(
            entries,
            vec![
                LedgerEntry { pid: 1, tgid: 1 },
                LedgerEntry { pid: 2, tgid: 1 },
                LedgerEntry { pid: 3, tgid: 3 },
            ]
        );
    }

    #[test]
    fn pid_and_tgid_match_as_a_pair() {
        let ledger = ProcessLedger::new();
        ledger.insert_if_absent(5, 5);
        // Same pid, different tgid is a distinct pair.
        ledger.insert_if_absent(5, 6);
        assert_eq!(ledger.len(), 2);
    }

    #[test]
    fn teardown_on_empty_ledger_is_safe() {
        let ledger = ProcessLedger::new();
        ledger.teardown();
        ledger.teardown();
        assert!(ledger.is_empty());
    }

    #[test]
    fn teardown_drains_once() {
        let ledger = ProcessLedger::new();
        ledger.insert_if_absent(1, 1);
        ledger.insert_if_absent(2, 2);

        ledger.teardown();
        assert!(ledger.is_empty());
        // Second teardown has nothing left to release.
        ledger.teardown();
        assert!(ledger.is_empty());
    }

    #[test]
    fn concurrent_inserts_never_duplicate() {
        let ledger = Arc::new(ProcessLedger::new());

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let ledger = Arc::clone(&ledger);
                thread::spawn(move || {
                    for _ in 0..100 {
                        // Four distinct pairs contended by eight threads.
                        ledger.insert_if_absent(i % 4, 1);
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(ledger.len(), 4);
    }
}
