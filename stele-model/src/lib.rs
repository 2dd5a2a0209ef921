//! Entity model for Stele.
//!
//! Defines the types the synchronization core operates on:
//! - [`Entity`] — a typed, mutable record instance with multi-item fields
//!   and per-language translation views
//! - [`EntityKind`] — the schema descriptor for one kind of entity: key
//!   fields, revisionability, validation capability, field metadata
//! - [`KindRegistry`] — resolves kind names to their descriptors
//! - [`EntityValidator`] — seam for constraint checking; the core only
//!   consumes violations, it never executes rules itself
//!
//! Kind metadata is plain data looked up once per import, never discovered
//! by runtime inspection of entity values.

mod entity;
mod kind;
mod validator;

pub use entity::{Entity, FieldItem, FieldMap, FieldValue};
pub use kind::{EntityKeys, EntityKind, FieldDefinition, KindRegistry, ANONYMOUS_ID};
pub use validator::{ConstraintViolation, EntityValidator, NoValidation};
