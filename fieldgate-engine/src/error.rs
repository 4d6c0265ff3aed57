//! Error types for the engine.

use std::time::Duration;

use fieldgate_types::DeviceKey;
use thiserror::Error;

/// Errors from the local database.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("migration failed: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Errors surfaced by the engine's control loops.
///
/// Only [`EngineError::WorkerStuck`] ends the scheduler; the rest are
/// logged and retried on the next tick.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Store(#[from] StoreError),

    /// A cancelled worker did not terminate within the join bound.
    #[error("worker {device} did not stop within {timeout:?}")]
    WorkerStuck { device: DeviceKey, timeout: Duration },

    /// A control task ended abnormally.
    #[error("task failed: {0}")]
    TaskFailed(String),

    #[error("invalid configuration: {0}")]
    Config(String),
}
