//! Entity-level content synchronization for Stele.
//!
//! Given a decoded record (the nested mapping of one exported entity), the
//! [`ContentImporter`] reconstructs or updates the persisted entity it
//! describes:
//!
//! 1. **Dispatch** — resolve the entity kind from the call context or the
//!    record's embedded metadata, normalize kind-specific quirks, and hand
//!    the record to the deserializer
//! 2. **Match & merge** — look the entity up by its external stable id and
//!    either merge the submitted fields into the stored entity under
//!    identity-safety rules, or stamp the external id onto a fresh duplicate
//! 3. **Encode derived fields** — flatten structured values of
//!    serialized-storage properties before the write
//! 4. **Validate & persist** — constraint-check account kinds, save, and
//!    merge any bundled per-language translations
//!
//! Deserialization and persistence are collaborator seams
//! ([`RecordDeserializer`], [`stele_store::EntityStore`]); this crate owns
//! only the reconciliation policy between them.

mod context;
mod deserializer;
mod error;
mod importer;

pub use context::ImportContext;
pub use deserializer::{FieldMapDeserializer, RecordDeserializer};
pub use error::{ImportError, ImportResult};
pub use importer::{ContentImporter, IMPORT_FORMAT};
