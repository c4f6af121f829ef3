//! Shared test utilities for integration tests.
//!
//! This module provides:
//! - A recording mock target store with configurable per-table failures
//! - A call-counting mutation adapter
//! - Cell/record construction helpers

pub mod mock_target;

pub use mock_target::*;

use replication_sink::{CellMutation, ChangeRecord};

/// Run a future on a fresh current-thread runtime.
///
/// Integration tests drive `replicate()` from plain `#[test]` functions so
/// that `stop()` (which tears the shared pool down) runs outside any async
/// context, like the host framework's lifecycle thread does.
pub fn block_on<F: std::future::Future>(fut: F) -> F::Output {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("failed to build test runtime")
        .block_on(fut)
}

/// A put cell whose estimated size is exactly `size` bytes.
pub fn cell_of_size(row: &[u8], timestamp_ms: i64, size: usize) -> CellMutation {
    let base = CellMutation::put(row.to_vec(), "cf", b"q".to_vec(), timestamp_ms, Vec::new());
    let padding = size
        .checked_sub(base.estimated_size())
        .expect("requested size below fixed cell overhead");
    CellMutation::put(
        row.to_vec(),
        "cf",
        b"q".to_vec(),
        timestamp_ms,
        vec![0u8; padding],
    )
}

/// A single-row record carrying the given cells.
pub fn record(table: &str, row: &[u8], cells: Vec<CellMutation>) -> ChangeRecord {
    let mut record = ChangeRecord::new(table, row.to_vec());
    for cell in cells {
        record = record.with_cell(cell);
    }
    record
}
