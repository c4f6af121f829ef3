// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Replication sink coordinator.
//!
//! [`ReplicationSink`] is what the host framework's endpoint shim drives:
//! `start()` wires the shared resources and the mutation adapter, after which
//! every delivery lands on [`replicate()`](ReplicationSink::replicate) as a
//! map of per-table change records and is answered with one boolean. A false
//! answer tells the host to redeliver the identical batch later, so nothing
//! in here retries and nothing needs to be idempotent below the call
//! granularity.
//!
//! The coordinator itself runs on the caller's task: adaptation and row
//! grouping happen inline, only sealed batches go to the shared pool. One
//! `replicate()` call per sink instance is assumed in flight at a time; no
//! internal mutual exclusion is imposed beyond that assumption.

use crate::adapter::{MutationAdapter, PassthroughAdapter};
use crate::aggregate::{BatchHandle, ResultAggregator};
use crate::batch::{group_by_row, Batch, Batcher};
use crate::config::SinkConfig;
use crate::error::{Result, SinkError};
use crate::metrics::{self, MetricsSink};
use crate::pool::{ResourceRegistry, SharedHandle};
use crate::record::ChangeRecord;
use crate::target::{NoOpTargetStore, TargetStore};
use crate::task::BatchTask;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, trace};
use uuid::Uuid;

/// The replication sink endpoint.
///
/// Holds a reference to the process-wide [`ResourceRegistry`] and, once
/// started, a shared-resource handle plus the adapter collaborator. Several
/// sink instances (one per source peer, typically) share the same registry
/// and therefore the same connection and worker pool.
pub struct ReplicationSink<S: TargetStore = NoOpTargetStore> {
    registry: Arc<ResourceRegistry<S>>,
    started: Option<Started<S>>,
}

/// Everything `replicate()` needs, wired by `start()`.
struct Started<S> {
    shared: SharedHandle<S>,
    adapter: Arc<dyn MutationAdapter>,
    batch_size_bytes: usize,
    max_cells_per_batch: usize,
    dry_run: bool,
}

impl<S: TargetStore> ReplicationSink<S> {
    /// Create a sink bound to a registry. Not started yet.
    pub fn new(registry: Arc<ResourceRegistry<S>>) -> Self {
        Self {
            registry,
            started: None,
        }
    }

    /// Acquire shared resources and wire the default counting adapter over
    /// the given metrics sink.
    ///
    /// Resource construction failures propagate: there is no degraded mode
    /// that could replicate without a connection.
    pub fn start(&mut self, config: &SinkConfig, metrics_sink: Arc<dyn MetricsSink>) -> Result<()> {
        let adapter = Arc::new(PassthroughAdapter::new(metrics_sink));
        self.start_with_adapter(config, adapter)
    }

    /// Acquire shared resources with an injected adapter.
    pub fn start_with_adapter(
        &mut self,
        config: &SinkConfig,
        adapter: Arc<dyn MutationAdapter>,
    ) -> Result<()> {
        if self.started.is_some() {
            return Err(SinkError::InvalidState {
                expected: "stopped".to_string(),
                actual: "started".to_string(),
            });
        }
        config.validate()?;

        info!(
            endpoint = %config.endpoint,
            cluster_id = %config.cluster_id,
            "starting replication sink"
        );
        let shared = self.registry.acquire(config)?;
        if config.dry_run {
            info!("dry-run mode: no mutations will be applied to the target store");
        }

        self.started = Some(Started {
            shared,
            adapter,
            batch_size_bytes: config.batch_size_bytes,
            max_cells_per_batch: config.max_cells_per_batch,
            dry_run: config.dry_run,
        });
        Ok(())
    }

    /// Release this sink's reference to the shared resources. Idempotent.
    ///
    /// Blocks while the last reference drains the pool; call from the host's
    /// lifecycle thread, after the final `replicate()` has returned.
    pub fn stop(&mut self) {
        if self.started.take().is_some() {
            info!("stopping replication sink");
            self.registry.release();
        }
    }

    /// Whether `start()` has been called without a matching `stop()`.
    pub fn is_started(&self) -> bool {
        self.started.is_some()
    }

    /// Stable identity this sink presents to source clusters.
    ///
    /// Source clusters de-duplicate on this ID to break replication cycles,
    /// so in a fully connected topology every peer must see the same value:
    /// it is derived from a fixed name, never from host or process state.
    pub fn sink_identity(&self) -> Uuid {
        Uuid::new_v5(&Uuid::NAMESPACE_OID, b"replication-sink-target")
    }

    /// Replicate change records, keyed by table, to the target store.
    ///
    /// Returns `true` iff every mutation was acknowledged. Never panics and
    /// never returns an error: any internal failure is logged and folded
    /// into a `false` result, on which the host redelivers the whole batch.
    pub async fn replicate(&self, records_by_table: HashMap<String, Vec<ChangeRecord>>) -> bool {
        let started_at = Instant::now();
        let Some(started) = &self.started else {
            error!("replicate called before start; rejecting batch for redelivery");
            return false;
        };

        let mut aggregator = ResultAggregator::new();
        for (table, records) in records_by_table {
            started.replicate_table(&table, &records, &mut aggregator);
        }

        let handles = aggregator.len();
        let succeeded = aggregator.join_all().await;

        metrics::record_replicate_latency(started_at.elapsed(), succeeded);
        trace!(
            elapsed_ms = started_at.elapsed().as_millis() as u64,
            handles,
            succeeded,
            "replicate finished"
        );
        succeeded
    }
}

impl<S: TargetStore> Started<S> {
    /// Adapt, group, batch and submit one table's records, pushing every
    /// produced handle onto the aggregator.
    fn replicate_table(
        &self,
        table: &str,
        records: &[ChangeRecord],
        aggregator: &mut ResultAggregator,
    ) {
        // The adapter runs once per record no matter what: its counters are
        // how operators see incompatibility rates, dry-run included.
        let mut cells = Vec::new();
        for record in records {
            cells.extend(self.adapter.adapt(record));
        }
        metrics::record_records_adapted(table, records.len());

        if self.dry_run {
            debug!(
                table = %table,
                records = records.len(),
                cells = cells.len(),
                "dry-run: adapted without dispatch"
            );
            metrics::record_dry_run_table(table);
            aggregator.push(BatchHandle::resolved(table, true));
            return;
        }

        let mut batcher = Batcher::new(table, self.batch_size_bytes, self.max_cells_per_batch);
        for (row_key, bucket) in group_by_row(cells) {
            if let Some(sealed) = batcher.push_row(row_key, bucket) {
                aggregator.push(self.submit(sealed));
            }
        }
        if let Some(remainder) = batcher.finish() {
            aggregator.push(self.submit(remainder));
        }
    }

    /// Hand a sealed batch to the shared pool.
    fn submit(&self, batch: Batch) -> BatchHandle {
        let table = batch.table().to_string();
        metrics::record_batch_dispatched(
            &table,
            batch.row_count(),
            batch.cell_count(),
            batch.size_bytes(),
        );
        trace!(
            table = %table,
            rows = batch.row_count(),
            cells = batch.cell_count(),
            bytes = batch.size_bytes(),
            "dispatching batch"
        );

        let task = BatchTask::new(batch, Arc::clone(self.shared.store()), self.shared.workers());
        BatchHandle::pending(table, self.shared.spawn(task.run()))
    }
}
