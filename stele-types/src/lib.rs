//! Core type definitions for Stele.
//!
//! This crate defines the fundamental, schema-agnostic types used throughout
//! the content synchronization core:
//! - Entity identifiers: storage-assigned primary ids and environment-stable
//!   external ids (UUID v4)
//! - Decoded records: the untyped nested mapping produced by decoding a
//!   serialized content export
//! - Translation sets: per-language record bundles carried inside a record
//!
//! All schema-specific types (entity kinds, field definitions, key fields)
//! belong in `stele-model`, not here.

mod ids;
mod record;

pub use ids::{EntityId, ExternalId};
pub use record::{DecodedRecord, TranslationSet, METADATA_KEY, TRANSLATIONS_KEY};

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in type operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("invalid UUID: {0}")]
    InvalidUuid(#[from] uuid::Error),

    #[error("not a mapping: {0}")]
    NotAMapping(String),
}
