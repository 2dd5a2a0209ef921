//! Error types for the import core.
//!
//! Only hard faults surface as errors. Unrecognized records and validation
//! failures are outcomes, not errors — `import_record` reports them by
//! returning `Ok(None)`.

use thiserror::Error;

/// Result type for import operations.
pub type ImportResult<T> = Result<T, ImportError>;

/// Errors that can occur during an import.
#[derive(Debug, Error)]
pub enum ImportError {
    /// The storage engine rejected an operation.
    #[error("store error: {0}")]
    Store(#[from] stele_store::StoreError),

    /// A record named an entity kind that was never registered.
    #[error("unknown entity kind: {0}")]
    UnknownKind(String),

    /// The deserializer could not build an entity from the record.
    #[error("deserialization error: {0}")]
    Deserialize(String),

    /// Serialization error while encoding derived fields.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The incoming entity carries no external stable id to match on.
    #[error("missing external id on {0} entity")]
    MissingExternalId(String),
}
