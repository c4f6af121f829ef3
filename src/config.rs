//! Configuration for the replication sink.
//!
//! A single [`SinkConfig`] is passed to
//! [`ReplicationSink::start()`](crate::coordinator::ReplicationSink::start)
//! and can be constructed programmatically or deserialized from YAML/JSON.
//!
//! # Quick Start
//!
//! ```rust
//! use replication_sink::config::SinkConfig;
//!
//! let config = SinkConfig {
//!     endpoint: "target.example.com:443".into(),
//!     cluster_id: "secondary-cluster".into(),
//!     ..Default::default()
//! };
//! assert!(config.validate().is_ok());
//! ```
//!
//! # YAML Example
//!
//! ```yaml
//! endpoint: "target.example.com:443"
//! cluster_id: "secondary-cluster"
//! batch_size_bytes: 1048576
//! max_cells_per_batch: 99999
//! sink_threads: 8
//! dry_run: false
//! ```

use crate::error::{Result, SinkError};
use serde::{Deserialize, Serialize};

/// Options recognized by the replication sink.
///
/// # Fields
///
/// - `endpoint` / `cluster_id`: opaque identity of the target store, used only
///   for client setup and logging.
/// - `batch_size_bytes`: byte threshold at which a pending batch is sealed.
/// - `max_cells_per_batch`: cell-count safety ceiling per batch. Kept as a
///   plain configurable constant; the default avoids a known downstream
///   request limit.
/// - `sink_threads`: worker-pool size, which bounds how many batches are
///   written to the target concurrently.
/// - `dry_run`: adapt records and update metrics without issuing any
///   downstream write.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SinkConfig {
    /// Target store endpoint. Opaque to this crate.
    #[serde(default)]
    pub endpoint: String,

    /// Target cluster identity. Opaque to this crate.
    #[serde(default)]
    pub cluster_id: String,

    /// Seal a pending batch once its estimated size reaches this many bytes.
    #[serde(default = "default_batch_size_bytes")]
    pub batch_size_bytes: usize,

    /// Seal a pending batch once it holds this many cells.
    #[serde(default = "default_max_cells_per_batch")]
    pub max_cells_per_batch: usize,

    /// Number of worker threads writing batches to the target store.
    #[serde(default = "default_sink_threads")]
    pub sink_threads: usize,

    /// When set, no mutation is applied to the target store.
    #[serde(default)]
    pub dry_run: bool,
}

fn default_batch_size_bytes() -> usize {
    1_048_576 // 1 MiB
}

fn default_max_cells_per_batch() -> usize {
    99_999
}

fn default_sink_threads() -> usize {
    8
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            cluster_id: String::new(),
            batch_size_bytes: default_batch_size_bytes(),
            max_cells_per_batch: default_max_cells_per_batch(),
            sink_threads: default_sink_threads(),
            dry_run: false,
        }
    }
}

impl SinkConfig {
    /// Create a config for testing: small pool, explicit thresholds.
    pub fn for_testing(batch_size_bytes: usize, max_cells_per_batch: usize) -> Self {
        Self {
            endpoint: "test-endpoint".to_string(),
            cluster_id: "test-cluster".to_string(),
            batch_size_bytes,
            max_cells_per_batch,
            sink_threads: 2,
            dry_run: false,
        }
    }

    /// Reject configurations the engine cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.batch_size_bytes == 0 {
            return Err(SinkError::Config(
                "batch_size_bytes must be at least 1".to_string(),
            ));
        }
        if self.max_cells_per_batch == 0 {
            return Err(SinkError::Config(
                "max_cells_per_batch must be at least 1".to_string(),
            ));
        }
        if self.sink_threads == 0 {
            return Err(SinkError::Config(
                "sink_threads must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SinkConfig::default();
        assert_eq!(config.batch_size_bytes, 1_048_576);
        assert_eq!(config.max_cells_per_batch, 99_999);
        assert_eq!(config.sink_threads, 8);
        assert!(!config.dry_run);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_for_testing() {
        let config = SinkConfig::for_testing(100, 10);
        assert_eq!(config.batch_size_bytes, 100);
        assert_eq!(config.max_cells_per_batch, 10);
        assert_eq!(config.sink_threads, 2);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_batch_size() {
        let config = SinkConfig {
            batch_size_bytes: 0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(SinkError::Config(_))));
    }

    #[test]
    fn test_validate_rejects_zero_cell_ceiling() {
        let config = SinkConfig {
            max_cells_per_batch: 0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(SinkError::Config(_))));
    }

    #[test]
    fn test_validate_rejects_zero_threads() {
        let config = SinkConfig {
            sink_threads: 0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(SinkError::Config(_))));
    }

    #[test]
    fn test_deserialize_with_defaults() {
        let config: SinkConfig =
            serde_json::from_str(r#"{"endpoint": "host:443", "dry_run": true}"#).unwrap();
        assert_eq!(config.endpoint, "host:443");
        assert!(config.dry_run);
        assert_eq!(config.batch_size_bytes, 1_048_576);
        assert_eq!(config.sink_threads, 8);
    }

    #[test]
    fn test_serialize_roundtrip() {
        let config = SinkConfig::for_testing(512, 64);
        let json = serde_json::to_string(&config).unwrap();
        let back: SinkConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.batch_size_bytes, 512);
        assert_eq!(back.max_cells_per_batch, 64);
        assert_eq!(back.cluster_id, "test-cluster");
    }
}
