//! Completion handles and result aggregation.
//!
//! Every submitted batch yields a [`BatchHandle`]; one `replicate()` call
//! collects them all and folds the resolved booleans into a single AND via
//! [`ResultAggregator`]. Waiting is order-independent and always drains every
//! handle, even after a failure has been observed - abandoning handles would
//! leak in-flight writes past the call boundary.

use futures::future::join_all;
use tokio::task::JoinHandle;
use tracing::error;

/// Completion handle for one submitted batch (or one dry-run table).
pub struct BatchHandle {
    table: String,
    state: HandleState,
}

enum HandleState {
    /// Outcome known without dispatch: dry-run success, or a submission
    /// already converted to failure.
    Resolved(bool),
    /// Batch running on the shared pool.
    Pending(JoinHandle<bool>),
}

impl BatchHandle {
    /// Handle with a known outcome.
    pub fn resolved(table: impl Into<String>, success: bool) -> Self {
        Self {
            table: table.into(),
            state: HandleState::Resolved(success),
        }
    }

    /// Handle for a task running on the shared pool.
    pub fn pending(table: impl Into<String>, handle: JoinHandle<bool>) -> Self {
        Self {
            table: table.into(),
            state: HandleState::Pending(handle),
        }
    }

    /// Block until the outcome is known.
    ///
    /// A join error means the task panicked or the pool rejected it
    /// (cancelled before running); both count as failure and are logged with
    /// the table for context.
    pub async fn wait(self) -> bool {
        match self.state {
            HandleState::Resolved(success) => success,
            HandleState::Pending(handle) => match handle.await {
                Ok(success) => success,
                Err(e) => {
                    error!(table = %self.table, error = %e, "batch task did not complete");
                    false
                }
            },
        }
    }
}

/// Collects batch handles and joins them into one boolean.
#[derive(Default)]
pub struct ResultAggregator {
    handles: Vec<BatchHandle>,
}

impl ResultAggregator {
    /// Create an empty aggregator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one handle.
    pub fn push(&mut self, handle: BatchHandle) {
        self.handles.push(handle);
    }

    /// Add a table's worth of handles.
    pub fn extend(&mut self, handles: impl IntoIterator<Item = BatchHandle>) {
        self.handles.extend(handles);
    }

    /// Number of collected handles.
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    /// Check whether no handles were collected.
    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Wait for every handle and AND the results.
    ///
    /// An empty set is vacuous success.
    pub async fn join_all(self) -> bool {
        let results = join_all(self.handles.into_iter().map(BatchHandle::wait)).await;
        results.into_iter().all(|success| success)
    }
}
