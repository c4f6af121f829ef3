//! Execution of one sealed batch against the target store.
//!
//! A [`BatchTask`] is the unit of work submitted to the shared pool: it takes
//! a worker slot, issues the batch write, and reports a plain boolean. Every
//! failure mode is absorbed here - a batch task never raises past its own
//! boundary, it logs with enough context to diagnose and returns `false`.

use crate::batch::Batch;
use crate::metrics;
use crate::target::TargetStore;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{error, trace, warn};

/// Writes one sealed batch to the target store.
pub struct BatchTask<S> {
    batch: Batch,
    store: Arc<S>,
    workers: Arc<Semaphore>,
}

impl<S: TargetStore> BatchTask<S> {
    /// Create a task for a sealed batch.
    pub fn new(batch: Batch, store: Arc<S>, workers: Arc<Semaphore>) -> Self {
        Self {
            batch,
            store,
            workers,
        }
    }

    /// Run the batch write, returning `true` iff the target acknowledged
    /// every contained mutation.
    pub async fn run(self) -> bool {
        // One permit per running write keeps parallelism at the configured
        // pool size; queued tasks wait here. A closed semaphore means the
        // pool is tearing down under us.
        let _permit = match Arc::clone(&self.workers).acquire_owned().await {
            Ok(permit) => permit,
            Err(_) => {
                warn!(
                    table = %self.batch.table(),
                    rows = self.batch.row_count(),
                    "worker pool closed before batch ran"
                );
                return false;
            }
        };

        let table = self.batch.table().to_string();
        let rows = self.batch.row_count();
        let cells = self.batch.cell_count();
        let bytes = self.batch.size_bytes();

        match self.store.write(&self.batch).await {
            Ok(()) => {
                trace!(table = %table, rows, cells, bytes, "batch applied");
                metrics::record_batch_outcome(&table, true);
                true
            }
            Err(e) => {
                error!(
                    table = %table,
                    rows,
                    cells,
                    bytes,
                    error = %e,
                    "failed to apply batch to target store"
                );
                metrics::record_batch_outcome(&table, false);
                false
            }
        }
    }
}
