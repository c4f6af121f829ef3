//! # Replication Sink
//!
//! An ordering-safe batching and dispatch engine for replicating write-ahead
//! log change records into a downstream store.
//!
//! ## Architecture
//!
//! The sink sits between a host log-replication framework and a target store
//! client, turning per-table record deliveries into concurrently written,
//! row-atomic batches:
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────────────┐
//! │                            replication-sink                              │
//! │                                                                          │
//! │  replicate(records by table)                                             │
//! │        │                                                                 │
//! │        ▼                                                                 │
//! │  ┌───────────────┐   ┌──────────────┐   ┌─────────────────────────────┐  │
//! │  │ MutationAdapter│──▶│ group_by_row │──▶│ Batcher (bytes/cell bounds) │  │
//! │  │ (1x per record)│   │ (row atomic) │   └──────────────┬──────────────┘  │
//! │  └───────────────┘   └──────────────┘                  │ sealed batches  │
//! │                                                        ▼                 │
//! │  ┌──────────────────┐                     ┌─────────────────────────┐    │
//! │  │ ResourceRegistry │◀── shared pool ─────│ BatchTask × N (parallel)│    │
//! │  │ (refcounted conn │                     └────────────┬────────────┘    │
//! │  │  + worker pool)  │                                  │ booleans        │
//! │  └──────────────────┘                                  ▼                 │
//! │                                          ┌─────────────────────────┐     │
//! │                                          │ ResultAggregator (AND)  │──▶ bool
//! │                                          └─────────────────────────┘     │
//! └──────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Guarantees
//!
//! - All mutations for one row, within one `replicate()` call, are written by
//!   a single batch task: concurrent dispatch can never reorder a row.
//! - `replicate()` returns `true` iff every mutation was acknowledged, and
//!   never lets an internal failure escape as a panic or error - the host
//!   redelivers the whole batch on `false`.
//! - The target connection and worker pool are shared across sink instances
//!   via reference counting and torn down only when the last instance stops.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use replication_sink::{
//!     NoOpTargetStore, RecorderSink, ReplicationSink, ResourceRegistry, SinkConfig,
//! };
//! use std::collections::HashMap;
//! use std::sync::Arc;
//!
//! let registry = Arc::new(ResourceRegistry::new(|_config| Ok(NoOpTargetStore)));
//! let mut sink = ReplicationSink::new(registry);
//! sink.start(&SinkConfig::default(), Arc::new(RecorderSink))
//!     .expect("failed to start");
//!
//! // In the host's delivery path:
//! // let succeeded = sink.replicate(records_by_table).await;
//!
//! sink.stop();
//! ```

pub mod adapter;
pub mod aggregate;
pub mod batch;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod metrics;
pub mod pool;
pub mod record;
pub mod target;
pub mod task;

// Re-exports for convenience
pub use adapter::{MutationAdapter, PassthroughAdapter};
pub use aggregate::{BatchHandle, ResultAggregator};
pub use batch::{group_by_row, Batch, Batcher};
pub use config::SinkConfig;
pub use coordinator::ReplicationSink;
pub use error::{Result, SinkError};
pub use metrics::{MetricsSink, RecorderSink};
pub use pool::{ResourceRegistry, SharedHandle};
pub use record::{CellMutation, ChangeRecord, MutationKind};
pub use target::{NoOpTargetStore, TargetError, TargetStore};
pub use task::BatchTask;
