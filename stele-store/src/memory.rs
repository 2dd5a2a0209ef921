//! In-memory entity store.

use crate::{EntityStore, StoreError, StoreResult};
use std::collections::BTreeMap;
use std::sync::Mutex;
use stele_model::{Entity, EntityKind};
use stele_types::{EntityId, ExternalId};

#[derive(Debug, Default)]
struct Inner {
    /// Entities keyed by (kind name, primary id). The key order gives
    /// ascending-id iteration per kind for free.
    entities: BTreeMap<(String, u64), Entity>,
    next_id: u64,
    next_revision_id: u64,
}

/// In-memory reference implementation of [`EntityStore`].
///
/// Assigns serial primary ids starting at 1 and serial revision ids for
/// revisionable kinds.
#[derive(Debug)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                entities: BTreeMap::new(),
                next_id: 1,
                next_revision_id: 1,
            }),
        }
    }

    /// Number of stored entities of a kind.
    #[must_use]
    pub fn count(&self, kind_name: &str) -> usize {
        self.lock()
            .entities
            .keys()
            .filter(|(kind, _)| kind == kind_name)
            .count()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().expect("store lock poisoned")
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl EntityStore for MemoryStore {
    fn load(&self, kind: &EntityKind, id: EntityId) -> StoreResult<Option<Entity>> {
        Ok(self
            .lock()
            .entities
            .get(&(kind.name.clone(), id.as_u64()))
            .cloned())
    }

    fn load_by_external_id(
        &self,
        kind: &EntityKind,
        external_id: &ExternalId,
    ) -> StoreResult<Vec<Entity>> {
        let inner = self.lock();
        let matches = inner
            .entities
            .range((kind.name.clone(), 0)..=(kind.name.clone(), u64::MAX))
            .filter(|(_, entity)| entity.external_id(kind).as_ref() == Some(external_id))
            .map(|(_, entity)| entity.clone())
            .collect();
        Ok(matches)
    }

    fn save(&self, entity: &mut Entity, kind: &EntityKind) -> StoreResult<()> {
        if entity.kind_name() != kind.name {
            return Err(StoreError::InvalidData(format!(
                "entity kind {} does not match descriptor {}",
                entity.kind_name(),
                kind.name
            )));
        }

        let mut inner = self.lock();
        if entity.is_new(kind) {
            let id = inner.next_id;
            inner.next_id += 1;
            entity.set_id(kind, EntityId::from_raw(id));
            if kind.revisionable {
                let revision = inner.next_revision_id;
                inner.next_revision_id += 1;
                entity.set_revision_id(kind, revision);
            }
        } else if kind.revisionable && entity.is_new_revision() {
            let revision = inner.next_revision_id;
            inner.next_revision_id += 1;
            entity.set_revision_id(kind, revision);
        }

        let id = entity
            .id(kind)
            .ok_or_else(|| StoreError::InvalidData("entity has no primary id".to_string()))?
            .as_u64();
        if id >= inner.next_id {
            inner.next_id = id + 1;
        }
        inner
            .entities
            .insert((kind.name.clone(), id), entity.clone());
        Ok(())
    }
}
