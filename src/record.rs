//! Change records captured from the source write-ahead log.
//!
//! A [`ChangeRecord`] is one logical write event: a table, a row key, and the
//! ordered cell mutations that event produced. Records are handed to the
//! engine by the host framework and are not modified after that point.
//!
//! Cells carry their own row key so that the flattened cell stream of a whole
//! table can be regrouped by row regardless of which record a cell came from.

use std::fmt;

/// Fixed per-cell overhead added to the payload bytes when estimating batch
/// size. Covers the key/timestamp/type framing the target store charges per
/// mutation on top of the payload itself.
const CELL_OVERHEAD_BYTES: usize = 32;

/// The mutation vocabulary the target store accepts after adaptation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MutationKind {
    /// Write a cell value.
    Put,
    /// Delete the cells of one column (family + qualifier).
    DeleteColumn,
    /// Delete a whole column family on the row.
    DeleteFamily,
}

impl fmt::Display for MutationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MutationKind::Put => write!(f, "put"),
            MutationKind::DeleteColumn => write!(f, "delete_column"),
            MutationKind::DeleteFamily => write!(f, "delete_family"),
        }
    }
}

/// A single column-level mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellMutation {
    /// Row this mutation applies to, as raw bytes. Grouping compares keys by
    /// exact byte equality.
    pub row_key: Vec<u8>,
    /// Column family name.
    pub family: String,
    /// Column qualifier, as raw bytes.
    pub qualifier: Vec<u8>,
    /// Mutation timestamp in milliseconds, as captured from the source log.
    pub timestamp_ms: i64,
    /// What this mutation does.
    pub kind: MutationKind,
    /// Cell payload. Empty for deletes.
    pub value: Vec<u8>,
}

impl CellMutation {
    /// Build a put mutation.
    pub fn put(
        row_key: impl Into<Vec<u8>>,
        family: impl Into<String>,
        qualifier: impl Into<Vec<u8>>,
        timestamp_ms: i64,
        value: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            row_key: row_key.into(),
            family: family.into(),
            qualifier: qualifier.into(),
            timestamp_ms,
            kind: MutationKind::Put,
            value: value.into(),
        }
    }

    /// Build a column-delete mutation.
    pub fn delete_column(
        row_key: impl Into<Vec<u8>>,
        family: impl Into<String>,
        qualifier: impl Into<Vec<u8>>,
        timestamp_ms: i64,
    ) -> Self {
        Self {
            row_key: row_key.into(),
            family: family.into(),
            qualifier: qualifier.into(),
            timestamp_ms,
            kind: MutationKind::DeleteColumn,
            value: Vec::new(),
        }
    }

    /// Build a family-delete mutation.
    pub fn delete_family(
        row_key: impl Into<Vec<u8>>,
        family: impl Into<String>,
        timestamp_ms: i64,
    ) -> Self {
        Self {
            row_key: row_key.into(),
            family: family.into(),
            qualifier: Vec::new(),
            timestamp_ms,
            kind: MutationKind::DeleteFamily,
            value: Vec::new(),
        }
    }

    /// Estimated contribution of this cell to a batch, in bytes.
    ///
    /// Used only for batch-size accounting, not for wire encoding.
    pub fn estimated_size(&self) -> usize {
        self.row_key.len()
            + self.family.len()
            + self.qualifier.len()
            + self.value.len()
            + CELL_OVERHEAD_BYTES
    }
}

/// One logical write event from the source log.
///
/// The cell order within a record is the order the source applied the
/// mutations and must be preserved through adaptation and batching.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeRecord {
    /// Source table the event belongs to.
    pub table: String,
    /// Row the event was logged against.
    pub row_key: Vec<u8>,
    /// Ordered cell mutations of this event.
    pub cells: Vec<CellMutation>,
}

impl ChangeRecord {
    /// Create a record with no cells yet.
    pub fn new(table: impl Into<String>, row_key: impl Into<Vec<u8>>) -> Self {
        Self {
            table: table.into(),
            row_key: row_key.into(),
            cells: Vec::new(),
        }
    }

    /// Append a cell mutation, preserving order.
    pub fn with_cell(mut self, cell: CellMutation) -> Self {
        self.cells.push(cell);
        self
    }
}
