//! Mutable entity instances.
//!
//! An [`Entity`] holds named fields, each a list of property-map items
//! ([`FieldValue`]), plus per-language translation views of the translatable
//! fields. Lifecycle state is derived from the primary id key: an entity
//! with no primary id is *new* (never persisted), one with a primary id is
//! *existing*.
//!
//! Key-field access goes through the [`EntityKind`] descriptor so the field
//! names stay schema data, not hard-coded strings.

use crate::kind::EntityKind;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use stele_types::{EntityId, ExternalId};

/// One field item: a property-name → value mapping.
pub type FieldItem = serde_json::Map<String, Value>;

/// Named field values of an entity or of one translation view.
pub type FieldMap = BTreeMap<String, FieldValue>;

/// The value of one field: zero or more items.
///
/// Scalar fields hold a single item whose `value` property carries the
/// scalar; reference and composite fields hold items with richer property
/// sets (e.g. `target_id`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldValue(Vec<FieldItem>);

impl FieldValue {
    /// A field with no items.
    #[must_use]
    pub fn empty() -> Self {
        Self(Vec::new())
    }

    /// A single-item field holding a scalar under the `value` property.
    pub fn scalar(value: impl Into<Value>) -> Self {
        let mut item = FieldItem::new();
        item.insert("value".to_string(), value.into());
        Self(vec![item])
    }

    /// A single-item field from an explicit property map.
    #[must_use]
    pub fn item(item: FieldItem) -> Self {
        Self(vec![item])
    }

    /// Appends an item.
    pub fn push_item(&mut self, item: FieldItem) {
        self.0.push(item);
    }

    /// The items of this field.
    #[must_use]
    pub fn items(&self) -> &[FieldItem] {
        &self.0
    }

    /// Mutable access to the items.
    pub fn items_mut(&mut self) -> &mut Vec<FieldItem> {
        &mut self.0
    }

    /// True if the field has no items, or only items whose properties are
    /// all null.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0
            .iter()
            .all(|item| item.values().all(Value::is_null))
    }

    /// The named property of the first item, if present.
    #[must_use]
    pub fn first_property(&self, property: &str) -> Option<&Value> {
        self.0.first()?.get(property)
    }

    /// The `value` property of the first item — the main property of
    /// scalar fields.
    #[must_use]
    pub fn main_value(&self) -> Option<&Value> {
        self.first_property("value")
    }
}

impl From<Vec<FieldItem>> for FieldValue {
    fn from(items: Vec<FieldItem>) -> Self {
        Self(items)
    }
}

/// A typed, mutable record instance of one entity kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    kind: String,
    fields: FieldMap,
    #[serde(default)]
    translations: BTreeMap<String, FieldMap>,
    /// Field names the caller explicitly intends to write. Absent for
    /// whole-record imports.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    submitted_fields: Option<BTreeSet<String>>,
    /// Whether the next save of a revisionable entity introduces a new
    /// revision.
    #[serde(default)]
    new_revision: bool,
    /// The revision that was current when this instance was loaded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    loaded_revision_id: Option<u64>,
}

impl Entity {
    /// Creates a new entity of the given kind with every declared field
    /// empty and a freshly assigned external id. The primary id stays
    /// unset, so the entity starts in the *new* state.
    #[must_use]
    pub fn of_kind(kind: &EntityKind) -> Self {
        let mut fields = FieldMap::new();
        for name in kind.field_names() {
            fields.insert(name.to_string(), FieldValue::empty());
        }
        fields.insert(
            kind.keys.uuid.clone(),
            FieldValue::scalar(ExternalId::new().to_string()),
        );
        Self {
            kind: kind.name.clone(),
            fields,
            translations: BTreeMap::new(),
            submitted_fields: None,
            new_revision: false,
            loaded_revision_id: None,
        }
    }

    /// The name of this entity's kind.
    #[must_use]
    pub fn kind_name(&self) -> &str {
        &self.kind
    }

    // ── Fields ───────────────────────────────────────────────────

    /// Returns true if the entity has a field with this name.
    #[must_use]
    pub fn has_field(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    /// The value of a field, if the field exists.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    /// Sets a field value, creating the field if absent.
    pub fn set(&mut self, name: impl Into<String>, value: FieldValue) {
        self.fields.insert(name.into(), value);
    }

    /// All fields of the default-language view.
    #[must_use]
    pub fn fields(&self) -> &FieldMap {
        &self.fields
    }

    // ── Identity keys ────────────────────────────────────────────

    /// The storage-assigned primary id, if the entity has been persisted.
    #[must_use]
    pub fn id(&self, kind: &EntityKind) -> Option<EntityId> {
        self.fields
            .get(&kind.keys.id)?
            .main_value()?
            .as_u64()
            .map(EntityId::from_raw)
    }

    /// Stamps the primary id. Reserved for the storage layer.
    pub fn set_id(&mut self, kind: &EntityKind, id: EntityId) {
        self.fields
            .insert(kind.keys.id.clone(), FieldValue::scalar(id.as_u64()));
    }

    /// True if the entity has never been persisted (no primary id).
    #[must_use]
    pub fn is_new(&self, kind: &EntityKind) -> bool {
        self.id(kind).is_none()
    }

    /// The external stable id, if set and well-formed.
    #[must_use]
    pub fn external_id(&self, kind: &EntityKind) -> Option<ExternalId> {
        let raw = self.fields.get(&kind.keys.uuid)?.main_value()?.as_str()?;
        ExternalId::parse(raw).ok()
    }

    /// Stamps the external stable id.
    pub fn set_external_id(&mut self, kind: &EntityKind, external_id: &ExternalId) {
        self.fields.insert(
            kind.keys.uuid.clone(),
            FieldValue::scalar(external_id.to_string()),
        );
    }

    /// The current revision id of a revisionable entity.
    #[must_use]
    pub fn revision_id(&self, kind: &EntityKind) -> Option<u64> {
        let key = kind.keys.revision.as_ref()?;
        self.fields.get(key)?.main_value()?.as_u64()
    }

    /// Stamps the revision id. Reserved for the storage layer.
    pub fn set_revision_id(&mut self, kind: &EntityKind, revision_id: u64) {
        if let Some(key) = &kind.keys.revision {
            self.fields
                .insert(key.clone(), FieldValue::scalar(revision_id));
        }
    }

    /// The language code of the default view, if set.
    #[must_use]
    pub fn langcode(&self, kind: &EntityKind) -> Option<&str> {
        let key = kind.keys.langcode.as_ref()?;
        self.fields.get(key)?.main_value()?.as_str()
    }

    /// Clones the entity into a fresh, unsaved duplicate: the primary id
    /// and revision id are cleared and a new external id is generated.
    #[must_use]
    pub fn create_duplicate(&self, kind: &EntityKind) -> Entity {
        let mut duplicate = self.clone();
        duplicate.set(kind.keys.id.clone(), FieldValue::empty());
        if let Some(revision_key) = &kind.keys.revision {
            duplicate.set(revision_key.clone(), FieldValue::empty());
        }
        duplicate.set_external_id(kind, &ExternalId::new());
        duplicate.loaded_revision_id = None;
        duplicate
    }

    // ── Submitted field set ──────────────────────────────────────

    /// The fields the caller explicitly submitted for writing, if the
    /// record was a partial update.
    #[must_use]
    pub fn submitted_fields(&self) -> Option<&BTreeSet<String>> {
        self.submitted_fields.as_ref()
    }

    /// Records the submitted field set.
    pub fn set_submitted_fields<I, S>(&mut self, names: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.submitted_fields = Some(names.into_iter().map(Into::into).collect());
    }

    /// Clears the submitted field set, turning the entity back into a
    /// whole-record instance.
    pub fn clear_submitted_fields(&mut self) {
        self.submitted_fields = None;
    }

    // ── Translations ─────────────────────────────────────────────

    /// True if a translation view exists for the language.
    #[must_use]
    pub fn has_translation(&self, langcode: &str) -> bool {
        self.translations.contains_key(langcode)
    }

    /// The translation view for a language, if present.
    #[must_use]
    pub fn translation(&self, langcode: &str) -> Option<&FieldMap> {
        self.translations.get(langcode)
    }

    /// The translation view for a language, created empty if absent.
    pub fn translation_entry(&mut self, langcode: impl Into<String>) -> &mut FieldMap {
        self.translations.entry(langcode.into()).or_default()
    }

    /// Language codes with a translation view, in order.
    pub fn languages(&self) -> impl Iterator<Item = &str> {
        self.translations.keys().map(String::as_str)
    }

    // ── Revision bookkeeping ─────────────────────────────────────

    /// Whether the next save introduces a new revision.
    #[must_use]
    pub fn is_new_revision(&self) -> bool {
        self.new_revision
    }

    /// Controls whether the next save introduces a new revision.
    pub fn set_new_revision(&mut self, new_revision: bool) {
        self.new_revision = new_revision;
    }

    /// The revision that was current when this instance was loaded.
    #[must_use]
    pub fn loaded_revision_id(&self) -> Option<u64> {
        self.loaded_revision_id
    }

    /// Realigns the loaded-revision pointer to the current revision id.
    pub fn update_loaded_revision_id(&mut self, kind: &EntityKind) {
        self.loaded_revision_id = self.revision_id(kind);
    }
}
