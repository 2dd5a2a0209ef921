//! Error types for the storage seam.

use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur in store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Entity not found.
    #[error("entity not found: {0}")]
    NotFound(String),

    /// The entity does not satisfy the store's expectations.
    #[error("invalid data: {0}")]
    InvalidData(String),

    /// The storage engine rejected the write.
    #[error("storage engine error: {0}")]
    Engine(String),
}
