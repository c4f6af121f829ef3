//! Row-atomic batch construction.
//!
//! Adapted cell mutations for one table are grouped by exact row key, then
//! packed into size- and count-bounded batches at row boundaries:
//!
//! ```text
//! CellMutations ──▶ group_by_row ──▶ Batcher ──┬──▶ sealed Batch ──▶ dispatch
//!                  HashMap<row, cells>         │    (bounds reached)
//!                                              └──▶ remainder Batch
//! ```
//!
//! Grouping by row before dispatch is what keeps the two stores convergent:
//! if mutations for the same row were spread over concurrently written
//! batches they could be applied out of order, and the target would diverge
//! from the source. A row's cells therefore always travel in one batch, even
//! when that single row is larger than the batch bounds.

use crate::record::CellMutation;
use std::collections::HashMap;

/// A sealed unit of downstream work: complete rows of a single table.
#[derive(Debug)]
pub struct Batch {
    table: String,
    rows: HashMap<Vec<u8>, Vec<CellMutation>>,
    cell_count: usize,
    size_bytes: usize,
}

impl Batch {
    /// Create an empty batch for a table.
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            rows: HashMap::new(),
            cell_count: 0,
            size_bytes: 0,
        }
    }

    /// Append a complete row bucket, updating the running totals.
    pub fn push_row(&mut self, row_key: Vec<u8>, cells: Vec<CellMutation>) {
        self.cell_count += cells.len();
        self.size_bytes += cells.iter().map(CellMutation::estimated_size).sum::<usize>();
        self.rows.entry(row_key).or_default().extend(cells);
    }

    /// Table this batch belongs to.
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Rows in this batch, keyed by row key. Cell order per row is the order
    /// the cells were adapted in.
    pub fn rows(&self) -> &HashMap<Vec<u8>, Vec<CellMutation>> {
        &self.rows
    }

    /// Number of rows.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Number of cells across all rows.
    pub fn cell_count(&self) -> usize {
        self.cell_count
    }

    /// Estimated size of all cells, in bytes.
    pub fn size_bytes(&self) -> usize {
        self.size_bytes
    }

    /// Check if the batch holds no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Group a table's adapted cells into row buckets by exact row-key equality.
///
/// Cell order within each bucket is input order, which the caller guarantees
/// to be per-record adaptation order.
pub fn group_by_row(cells: Vec<CellMutation>) -> HashMap<Vec<u8>, Vec<CellMutation>> {
    let mut rows: HashMap<Vec<u8>, Vec<CellMutation>> = HashMap::new();
    for cell in cells {
        rows.entry(cell.row_key.clone()).or_default().push(cell);
    }
    rows
}

/// Packs row buckets into bounded batches for one table.
///
/// A bucket is appended whole, never split. When appending a bucket would
/// bring the pending batch to either bound, the pending batch is sealed first
/// and the bucket starts a fresh one; a bucket that alone reaches a bound
/// still lands intact, as the sole (oversized) content of its own batch. So
/// every sealed batch stays under both bounds unless a single row exceeds
/// them by itself.
#[derive(Debug)]
pub struct Batcher {
    pending: Batch,
    max_bytes: usize,
    max_cells: usize,
}

impl Batcher {
    /// Create a batcher for a table with the configured bounds.
    pub fn new(table: &str, max_bytes: usize, max_cells: usize) -> Self {
        Self {
            pending: Batch::new(table),
            max_bytes,
            max_cells,
        }
    }

    /// Append a complete row bucket.
    ///
    /// Returns the previously pending batch when this bucket sealed it.
    pub fn push_row(&mut self, row_key: Vec<u8>, cells: Vec<CellMutation>) -> Option<Batch> {
        let bucket_bytes: usize = cells.iter().map(CellMutation::estimated_size).sum();
        let bucket_cells = cells.len();

        let sealed = if !self.pending.is_empty()
            && (self.pending.size_bytes() + bucket_bytes >= self.max_bytes
                || self.pending.cell_count() + bucket_cells >= self.max_cells)
        {
            let table = self.pending.table().to_string();
            Some(std::mem::replace(&mut self.pending, Batch::new(table)))
        } else {
            None
        };

        self.pending.push_row(row_key, cells);
        sealed
    }

    /// Consume the batcher, returning the non-empty remainder batch.
    pub fn finish(self) -> Option<Batch> {
        if self.pending.is_empty() {
            None
        } else {
            Some(self.pending)
        }
    }
}
