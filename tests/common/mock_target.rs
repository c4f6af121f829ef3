//! Mock TargetStore and MutationAdapter for testing.
//!
//! The store records every batch write for assertions and can be told to
//! fail all writes for chosen tables. The adapter counts calls and forwards
//! cells unchanged.

use replication_sink::batch::Batch;
use replication_sink::target::{BoxFuture, TargetError, TargetStore};
use replication_sink::{CellMutation, ChangeRecord, MutationAdapter};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

/// A recorded batch write.
#[derive(Debug, Clone)]
pub struct RecordedWrite {
    pub table: String,
    pub rows: HashMap<Vec<u8>, Vec<CellMutation>>,
    pub cell_count: usize,
    pub size_bytes: usize,
}

/// Mock implementation of [`TargetStore`] that records all writes.
///
/// # Example
/// ```rust,ignore
/// let store = Arc::new(MockTargetStore::new());
/// store.fail_table("orders");
///
/// // Use in tests...
///
/// let writes = store.writes();
/// assert_eq!(writes.len(), 2);
/// ```
#[derive(Default)]
pub struct MockTargetStore {
    writes: Mutex<Vec<RecordedWrite>>,
    fail_tables: Mutex<HashSet<String>>,
    closed: AtomicBool,
}

impl MockTargetStore {
    /// Create a mock that acknowledges every write.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail every write for the given table from now on.
    pub fn fail_table(&self, table: &str) {
        self.fail_tables.lock().unwrap().insert(table.to_string());
    }

    /// All recorded writes, in completion order.
    pub fn writes(&self) -> Vec<RecordedWrite> {
        self.writes.lock().unwrap().clone()
    }

    /// Recorded writes for one table.
    pub fn writes_for(&self, table: &str) -> Vec<RecordedWrite> {
        self.writes()
            .into_iter()
            .filter(|w| w.table == table)
            .collect()
    }

    /// Whether `close()` has been called.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

impl TargetStore for MockTargetStore {
    fn write<'a>(&'a self, batch: &'a Batch) -> BoxFuture<'a, ()> {
        self.writes.lock().unwrap().push(RecordedWrite {
            table: batch.table().to_string(),
            rows: batch.rows().clone(),
            cell_count: batch.cell_count(),
            size_bytes: batch.size_bytes(),
        });
        let fail = self.fail_tables.lock().unwrap().contains(batch.table());
        let table = batch.table().to_string();
        Box::pin(async move {
            if fail {
                Err(TargetError(format!("injected failure for table {table}")))
            } else {
                Ok(())
            }
        })
    }

    fn close(&self) -> replication_sink::target::TargetResult<()> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

/// Adapter that counts calls and forwards cells unchanged.
#[derive(Default)]
pub struct CountingAdapter {
    calls: AtomicUsize,
}

impl CountingAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `adapt()` invocations so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl MutationAdapter for CountingAdapter {
    fn adapt(&self, record: &ChangeRecord) -> Vec<CellMutation> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        record.cells.clone()
    }
}
