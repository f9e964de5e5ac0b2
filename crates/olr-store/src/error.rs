//! Error types for the store module.

use thiserror::Error;

/// Errors that can occur during store operations.
///
/// Filesystem failures propagate as-is; the store never retries. Retry
/// policy, if any, belongs to the caller.
#[derive(Debug, Error)]
pub enum StoreError {
    /// I/O error (permissions, disk full, missing directory).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Receipt serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A different receipt already exists under this rid.
    ///
    /// Per-rid files are append-only: the write fails rather than silently
    /// overwriting.
    #[error("rid collision: {rid} already persisted with different content")]
    RidCollision { rid: String },

    /// Stored data does not rehydrate into a receipt.
    #[error("invalid data: {0}")]
    InvalidData(String),
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
