// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Error types for the replication sink.
//!
//! # Error Categories
//!
//! | Error Type | Retryable | Description |
//! |------------|-----------|-------------|
//! | `Target` | Yes | Downstream store rejected or failed a write |
//! | `Connect` | Yes | Target client construction failed |
//! | `Config` | No | Configuration invalid |
//! | `Pool` | No | Worker pool construction failed |
//! | `InvalidState` | No | Lifecycle misuse (e.g. double start) |
//! | `Internal` | No | Unexpected internal error |
//!
//! Only the lifecycle entry points surface these: `replicate()` folds every
//! internal failure into its boolean result and never returns an error.
//! Retryable here means the host may usefully re-run `start()` or redeliver
//! the batch; it does not imply any retry inside this crate.

use crate::target::TargetError;
use thiserror::Error;

/// Result type alias for sink operations.
pub type Result<T> = std::result::Result<T, SinkError>;

/// Errors surfaced by the sink's lifecycle entry points.
#[derive(Error, Debug)]
pub enum SinkError {
    /// Invalid or missing configuration.
    ///
    /// Not retryable - fix the configuration and restart.
    #[error("configuration error: {0}")]
    Config(String),

    /// Target store client construction failed.
    ///
    /// Fatal to starting replication: there is no degraded mode without a
    /// connection. Retryable once the target is reachable again.
    #[error("target connection error: {0}")]
    Connect(String),

    /// Worker pool construction failed.
    ///
    /// Not retryable - indicates a resource problem on this host.
    #[error("worker pool error: {0}")]
    Pool(String),

    /// Downstream store failure.
    ///
    /// Retryable - the host redelivers the whole batch on a false
    /// `replicate()` result.
    #[error("target store error: {0}")]
    Target(#[from] TargetError),

    /// Lifecycle misuse.
    ///
    /// Not retryable - indicates a bug in the caller.
    #[error("invalid state: expected {expected}, got {actual}")]
    InvalidState { expected: String, actual: String },

    /// Unexpected internal error.
    ///
    /// Not retryable - indicates a bug that needs investigation.
    #[error("internal error: {0}")]
    Internal(String),
}

impl SinkError {
    /// Check if the failed operation is worth retrying from the host side.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Target(_) => true,
            Self::Connect(_) => true,
            Self::Config(_) => false,
            Self::Pool(_) => false,
            Self::InvalidState { .. } => false,
            Self::Internal(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_target() {
        let err = SinkError::from(TargetError("mutation rejected".to_string()));
        assert!(err.is_retryable());
        assert!(err.to_string().contains("mutation rejected"));
    }

    #[test]
    fn test_retryable_connect() {
        let err = SinkError::Connect("endpoint unreachable".to_string());
        assert!(err.is_retryable());
    }

    #[test]
    fn test_not_retryable_config() {
        let err = SinkError::Config("sink_threads must be at least 1".to_string());
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_not_retryable_pool() {
        let err = SinkError::Pool("failed to spawn worker threads".to_string());
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_not_retryable_invalid_state() {
        let err = SinkError::InvalidState {
            expected: "stopped".to_string(),
            actual: "started".to_string(),
        };
        assert!(!err.is_retryable());
        assert!(err.to_string().contains("stopped"));
        assert!(err.to_string().contains("started"));
    }

    #[test]
    fn test_not_retryable_internal() {
        let err = SinkError::Internal("unexpected state".to_string());
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_from_target_error() {
        let err: SinkError = TargetError("boom".to_string()).into();
        assert!(matches!(err, SinkError::Target(_)));
    }
}
