//! Entity persistence seam for Stele.
//!
//! The synchronization core mutates entities through the [`EntityStore`]
//! trait and never talks to a storage engine directly. [`MemoryStore`] is
//! the in-process reference implementation used by tests and lightweight
//! embeddings; production engines implement the same trait.

mod error;
mod memory;

pub use error::{StoreError, StoreResult};
pub use memory::MemoryStore;

use stele_model::{Entity, EntityKind};
use stele_types::{EntityId, ExternalId};

/// Persistence operations the synchronization core depends on.
///
/// Every method takes the kind descriptor so key-field names stay schema
/// data instead of store configuration.
pub trait EntityStore: Send + Sync {
    /// Loads one entity by primary id.
    fn load(&self, kind: &EntityKind, id: EntityId) -> StoreResult<Option<Entity>>;

    /// Loads all entities of the kind carrying the given external id,
    /// ordered by ascending primary id.
    ///
    /// A well-formed store holds at most one match; the ordering makes the
    /// pick deterministic when that invariant has been violated upstream.
    fn load_by_external_id(
        &self,
        kind: &EntityKind,
        external_id: &ExternalId,
    ) -> StoreResult<Vec<Entity>>;

    /// Persists the entity. New entities receive a primary id (and, for
    /// revisionable kinds, a first revision id); existing revisionable
    /// entities receive a fresh revision id only when their new-revision
    /// flag is set.
    fn save(&self, entity: &mut Entity, kind: &EntityKind) -> StoreResult<()>;
}
