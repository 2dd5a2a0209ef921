//! The content importer.
//!
//! Reconciles decoded records against the entity store: kind dispatch,
//! external-id matching, identity-safe field merge, derived-field encoding,
//! validation gating, persistence, and translation merge.

use crate::{ImportContext, ImportError, ImportResult, RecordDeserializer};
use serde_json::{json, Value};
use stele_model::{Entity, EntityKind, EntityValidator, KindRegistry, NoValidation, ANONYMOUS_ID};
use stele_store::EntityStore;
use stele_types::{DecodedRecord, EntityId, TranslationSet};
use tracing::{debug, error, warn};

/// The canonical structured-text format records are decoded from, passed to
/// the deserializer as its format discriminator.
pub const IMPORT_FORMAT: &str = "yaml";

/// Entity-level content synchronization core.
///
/// One importer serves many records; every call is independent and
/// synchronous. See the crate docs for the control flow.
pub struct ContentImporter<S, D> {
    store: S,
    deserializer: D,
    registry: KindRegistry,
    validator: Box<dyn EntityValidator>,
    context: ImportContext,
    update_existing: bool,
}

impl<S, D> ContentImporter<S, D>
where
    S: EntityStore,
    D: RecordDeserializer,
{
    /// Creates an importer over the given collaborators. Validation
    /// accepts everything until a validator is supplied with
    /// [`with_validator`](Self::with_validator).
    pub fn new(store: S, deserializer: D, registry: KindRegistry) -> Self {
        Self {
            store,
            deserializer,
            registry,
            validator: Box::new(NoValidation),
            context: ImportContext::default(),
            update_existing: true,
        }
    }

    /// Supplies the constraint validator consulted for kinds that require
    /// identity validation.
    #[must_use]
    pub fn with_validator(mut self, validator: Box<dyn EntityValidator>) -> Self {
        self.validator = validator;
        self
    }

    /// The canonical decode format this importer requests.
    #[must_use]
    pub fn format(&self) -> &'static str {
        IMPORT_FORMAT
    }

    /// The process-scoped default context.
    #[must_use]
    pub fn context(&self) -> &ImportContext {
        &self.context
    }

    /// Replaces the process-scoped default context. Per-call contexts are
    /// layered on top of it.
    pub fn set_context(&mut self, context: ImportContext) {
        self.context = context;
    }

    /// Controls whether records matching an existing entity update it.
    /// With updates disabled a matched record is a read-only no-op.
    pub fn set_update_existing(&mut self, update_existing: bool) {
        self.update_existing = update_existing;
    }

    /// Access to the underlying store.
    #[must_use]
    pub fn store(&self) -> &S {
        &self.store
    }

    // ── Dispatch ─────────────────────────────────────────────────

    /// Imports one decoded record.
    ///
    /// Returns the persisted (or intentionally untouched) entity, or
    /// `Ok(None)` when the record names no entity kind or a new entity
    /// failed validation. Hard store faults propagate as errors.
    pub fn import_record(
        &self,
        record: &DecodedRecord,
        context: &ImportContext,
    ) -> ImportResult<Option<Entity>> {
        let context = self.context.merged_with(context);

        let Some(kind_name) = context
            .entity_type
            .clone()
            .or_else(|| record.entity_kind_hint().map(str::to_string))
        else {
            debug!("record names no entity kind, skipping");
            return Ok(None);
        };
        let kind = self
            .registry
            .get(&kind_name)
            .ok_or_else(|| ImportError::UnknownKind(kind_name.clone()))?;

        let mut record = record.clone();
        self.normalize_record(&mut record, kind);

        // The deserializer may consume the translation block, so pull it
        // out first.
        let translations = record.take_translations();

        let entity = self
            .deserializer
            .deserialize(&record, kind, IMPORT_FORMAT, &context)?;

        // Reserved principals are never mutated by synchronization.
        if kind.requires_identity_validation
            && !entity.is_new(kind)
            && entity.id(kind) == Some(EntityId::from_raw(ANONYMOUS_ID))
        {
            debug!("skipping reserved {} principal {}", kind.name, ANONYMOUS_ID);
            return Ok(Some(entity));
        }

        let Some(mut entity) = self.sync_entity(entity, kind, &context)? else {
            return Ok(None);
        };

        if let Some(translations) = translations {
            self.merge_translations(&mut entity, kind, &translations, &context);
        }
        Ok(Some(entity))
    }

    /// Kind-specific input normalization. Hierarchical kinds get a
    /// synthetic root parent when none is present, so imported entities
    /// stay visible in tree listings instead of being orphaned.
    fn normalize_record(&self, record: &mut DecodedRecord, kind: &EntityKind) {
        if let Some(parent_field) = &kind.hierarchy_field {
            if record.is_empty_value(parent_field) {
                record.insert(parent_field.clone(), json!({"target_id": 0}));
            }
        }
    }

    // ── Match & merge ────────────────────────────────────────────

    /// Runs the match/merge step standalone: resolves the incoming entity
    /// against the store by external id and returns the entity that would
    /// be persisted. Useful for dry-run diffing.
    pub fn prepare_entity(&self, entity: Entity, kind: &EntityKind) -> ImportResult<Entity> {
        self.reconcile(entity, kind).map(|(entity, _)| entity)
    }

    /// Matches the incoming entity by external id and merges or duplicates
    /// accordingly. The second return value reports whether an existing
    /// entity was matched.
    fn reconcile(&self, entity: Entity, kind: &EntityKind) -> ImportResult<(Entity, bool)> {
        let external_id = entity
            .external_id(kind)
            .ok_or_else(|| ImportError::MissingExternalId(kind.name.clone()))?;

        let mut matches = self.store.load_by_external_id(kind, &external_id)?;
        if matches.is_empty() {
            // First import: duplicating resets identity, so the external
            // id must be stamped back on.
            let mut duplicate = entity.create_duplicate(kind);
            duplicate.set_external_id(kind, &external_id);
            self.encode_derived_fields(&mut duplicate, kind)?;
            return Ok((duplicate, false));
        }

        if matches.len() > 1 {
            warn!(
                "{} {} entities share external id {}, taking the lowest primary id",
                matches.len(),
                kind.name,
                external_id
            );
        }
        let mut original = matches.remove(0);

        if !self.update_existing {
            return Ok((original, true));
        }

        if let Some(submitted) = entity.submitted_fields() {
            for field_name in submitted {
                if !self.is_valid_entity_field(&original, &entity, field_name, kind) {
                    continue;
                }
                if let Some(value) = entity.get(field_name) {
                    original.set(field_name.clone(), value.clone());
                }
            }
        }

        self.encode_derived_fields(&mut original, kind)?;
        Ok((original, true))
    }

    /// Decides whether a submitted field may be written onto the existing
    /// entity. Identity key fields are special: writing them could change
    /// what entity/revision/language the record is, so they are skipped
    /// when the value is unchanged, when the language key would be forced
    /// empty, and always for the primary id and revision keys.
    fn is_valid_entity_field(
        &self,
        original: &Entity,
        incoming: &Entity,
        field_name: &str,
        kind: &EntityKind,
    ) -> bool {
        if !incoming.has_field(field_name) {
            return false;
        }
        if kind.is_key(field_name) {
            let unchanged = original.get(field_name) == incoming.get(field_name);
            let forced_empty_langcode = kind.keys.langcode.as_deref() == Some(field_name)
                && incoming
                    .get(field_name)
                    .is_none_or(|value| value.is_empty());
            let id_key = kind.keys.id == field_name;
            let revision_key =
                kind.revisionable && kind.keys.revision.as_deref() == Some(field_name);
            if unchanged || forced_empty_langcode || id_key || revision_key {
                return false;
            }
        }
        true
    }

    // ── Derived-field encoding ───────────────────────────────────

    /// Flattens structured values of serialized-storage properties into
    /// their encoded string form. Runs after merge and before validation
    /// so the stored representation is right regardless of where the value
    /// came from.
    fn encode_derived_fields(&self, entity: &mut Entity, kind: &EntityKind) -> ImportResult<()> {
        for (field_name, definition) in &kind.fields {
            if definition.serialized_properties.is_empty() {
                continue;
            }
            let Some(value) = entity.get(field_name) else {
                continue;
            };
            let mut value = value.clone();
            let mut changed = false;
            for item in value.items_mut() {
                for property in &definition.serialized_properties {
                    let Some(current) = item.get(property) else {
                        continue;
                    };
                    if current.is_array() || current.is_object() {
                        let encoded = serde_json::to_string(current)?;
                        item.insert(property.clone(), Value::String(encoded));
                        changed = true;
                    }
                }
            }
            if changed {
                entity.set(field_name.clone(), value);
            }
        }
        Ok(())
    }

    // ── Validate & persist ───────────────────────────────────────

    /// Runs the validation gate standalone, against the process-scoped
    /// context's skip-list.
    #[must_use]
    pub fn validate_entity(&self, entity: &Entity, kind: &EntityKind) -> bool {
        self.validate(entity, kind, &self.context)
    }

    fn validate(&self, entity: &Entity, kind: &EntityKind, context: &ImportContext) -> bool {
        if !kind.requires_identity_validation {
            return true;
        }
        let mut valid = true;
        for violation in self.validator.validate(entity, kind) {
            if context.skips_constraint(&violation.constraint) {
                continue;
            }
            error!("{} validation failed: {}", kind.name, violation.message);
            valid = false;
        }
        valid
    }

    /// Reconciles and persists one entity. Returns `None` when a new
    /// entity failed validation; an existing entity that fails validation
    /// is returned without touching its stored state.
    fn sync_entity(
        &self,
        entity: Entity,
        kind: &EntityKind,
        context: &ImportContext,
    ) -> ImportResult<Option<Entity>> {
        let (mut prepared, matched) = self.reconcile(entity, kind)?;

        if matched && !self.update_existing {
            debug!("updates disabled, leaving {} untouched", kind.name);
            return Ok(Some(prepared));
        }

        if self.validate(&prepared, kind, context) {
            self.store.save(&mut prepared, kind)?;
            debug!(
                "saved {} entity {}",
                kind.name,
                prepared
                    .id(kind)
                    .map(|id| id.to_string())
                    .unwrap_or_default()
            );
            return Ok(Some(prepared));
        }
        if !prepared.is_new(kind) {
            return Ok(Some(prepared));
        }
        Ok(None)
    }

    // ── Translations ─────────────────────────────────────────────

    /// Merges bundled per-language records into the entity's translation
    /// views and persists each one. A failing language is logged and
    /// skipped; the remaining languages still merge, and the primary
    /// entity — already persisted — is never rolled back.
    fn merge_translations(
        &self,
        entity: &mut Entity,
        kind: &EntityKind,
        translations: &TranslationSet,
        context: &ImportContext,
    ) {
        for (langcode, record) in translations.iter() {
            let translated =
                match self
                    .deserializer
                    .deserialize(record, kind, IMPORT_FORMAT, context)
                {
                    Ok(translated) => translated,
                    Err(err) => {
                        warn!("skipping {langcode} translation of {}: {err}", kind.name);
                        continue;
                    }
                };

            let updates: Vec<(String, _)> = translated
                .fields()
                .iter()
                .filter(|(field_name, _)| {
                    entity.has_field(field_name)
                        && kind
                            .field(field_name)
                            .is_some_and(|definition| definition.translatable)
                })
                .map(|(field_name, value)| (field_name.clone(), value.clone()))
                .collect();

            let view = entity.translation_entry(langcode);
            for (field_name, value) in updates {
                view.insert(field_name, value);
            }

            // A translation update amends the current revision rather than
            // forking a new one.
            if kind.revisionable {
                entity.update_loaded_revision_id(kind);
                entity.set_new_revision(false);
            }

            if let Err(err) = self.store.save(entity, kind) {
                warn!("failed to save {langcode} translation of {}: {err}", kind.name);
            }
        }
    }
}
