//! Mutation-compatibility adapter seam.
//!
//! The source log can contain operations the target store does not accept
//! verbatim; a [`MutationAdapter`] rewrites each change record into the
//! compatible [`CellMutation`] list before batching. How a given operation is
//! rewritten belongs to the host deployment, not this engine - the engine
//! only guarantees the call contract:
//!
//! - `adapt()` is invoked exactly once per record, in record order.
//! - It runs even in dry-run mode, because its metrics side effect is how
//!   operators measure incompatibility rates before enabling live writes.
//! - The returned cells keep the record's internal ordering when concatenated.

use crate::metrics::MetricsSink;
use crate::record::{CellMutation, ChangeRecord};
use std::sync::Arc;

/// Adapter counter: change records seen.
pub const RECORDS_SEEN_COUNTER: &str = "replication_sink_adapter_records_total";
/// Adapter counter: cell mutations produced.
pub const CELLS_PRODUCED_COUNTER: &str = "replication_sink_adapter_cells_total";

/// Rewrites one change record into target-compatible cell mutations.
///
/// Implementations may drop, rewrite or expand mutations, and must update
/// their [`MetricsSink`] counters on every call.
pub trait MutationAdapter: Send + Sync + 'static {
    /// Adapt a record. May return an empty list when nothing survives
    /// rewriting.
    fn adapt(&self, record: &ChangeRecord) -> Vec<CellMutation>;
}

/// Adapter that forwards mutations unchanged.
///
/// Suitable when the source only ever logs operations the target accepts
/// natively; deployments with incompatible operations plug in their own
/// [`MutationAdapter`]. Counts records and produced cells through the sink on
/// every call.
pub struct PassthroughAdapter {
    metrics: Arc<dyn MetricsSink>,
}

impl PassthroughAdapter {
    /// Create a passthrough adapter reporting to the given sink.
    pub fn new(metrics: Arc<dyn MetricsSink>) -> Self {
        Self { metrics }
    }
}

impl MutationAdapter for PassthroughAdapter {
    fn adapt(&self, record: &ChangeRecord) -> Vec<CellMutation> {
        self.metrics.inc_counter(RECORDS_SEEN_COUNTER, 1);
        self.metrics
            .inc_counter(CELLS_PRODUCED_COUNTER, record.cells.len() as u64);
        record.cells.clone()
    }
}
