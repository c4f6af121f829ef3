// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Target store integration trait.
//!
//! Defines the interface the sink needs from the downstream store client:
//! apply a batch of row mutations and report success or failure. The wire
//! protocol, timeouts and authentication all live behind this trait; the
//! deployer must enforce write deadlines in the client, because the sink
//! waits on every dispatched batch without its own timeout.
//!
//! # Example
//!
//! ```rust,no_run
//! use replication_sink::target::{BoxFuture, TargetStore, TargetResult};
//! use replication_sink::batch::Batch;
//!
//! struct MyStore { /* ... */ }
//!
//! impl TargetStore for MyStore {
//!     fn write<'a>(&'a self, batch: &'a Batch) -> BoxFuture<'a, ()> {
//!         Box::pin(async move {
//!             let _rows = batch.row_count();
//!             Ok(())
//!         })
//!     }
//! }
//! ```

use crate::batch::Batch;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// Result type for target store operations.
pub type TargetResult<T> = std::result::Result<T, TargetError>;

/// Type alias for boxed async futures (reduces trait signature complexity).
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = TargetResult<T>> + Send + 'a>>;

/// Simplified error for target store operations.
#[derive(Debug, Clone)]
pub struct TargetError(pub String);

impl std::fmt::Display for TargetError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for TargetError {}

/// Trait defining what the sink needs from the downstream store.
///
/// Implementations write replicated mutations; the sink owns batching,
/// dispatch and result aggregation. This trait allows testing with mocks and
/// decouples the engine from any concrete store client.
pub trait TargetStore: Send + Sync + 'static {
    /// Apply every cell mutation in the batch.
    ///
    /// The batch holds complete rows of a single table; an implementation may
    /// issue one request per row or a single bulk request. Returning `Ok`
    /// acknowledges every contained mutation.
    fn write<'a>(&'a self, batch: &'a Batch) -> BoxFuture<'a, ()>;

    /// Close the underlying connection.
    ///
    /// Called once, when the last reference to the shared resources is
    /// released. Best effort: errors are logged by the caller, never acted
    /// on.
    fn close(&self) -> TargetResult<()> {
        Ok(())
    }
}

/// Delegation so shared clients can be handed to the registry directly.
impl<T: TargetStore> TargetStore for Arc<T> {
    fn write<'a>(&'a self, batch: &'a Batch) -> BoxFuture<'a, ()> {
        (**self).write(batch)
    }

    fn close(&self) -> TargetResult<()> {
        (**self).close()
    }
}

/// A no-op implementation for testing/standalone mode.
///
/// Logs batches but doesn't write anything.
#[derive(Clone)]
pub struct NoOpTargetStore;

impl TargetStore for NoOpTargetStore {
    fn write<'a>(&'a self, batch: &'a Batch) -> BoxFuture<'a, ()> {
        tracing::debug!(
            table = %batch.table(),
            rows = batch.row_count(),
            cells = batch.cell_count(),
            bytes = batch.size_bytes(),
            "NoOp: would apply batch"
        );
        Box::pin(async { Ok(()) })
    }
}
