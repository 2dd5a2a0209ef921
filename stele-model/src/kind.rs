//! Entity kind descriptors.
//!
//! An [`EntityKind`] is the schema of one kind of entity, resolved by name
//! from the [`KindRegistry`]. It carries everything the synchronization core
//! needs as plain data: the names of the identity key fields, whether the
//! kind keeps revisions, whether writes must pass identity validation, and
//! per-field metadata (translatability, serialized storage properties).

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Primary id reserved for the anonymous principal of account kinds.
/// Entities with this id are never mutated by synchronization.
pub const ANONYMOUS_ID: u64 = 0;

/// The named identity key fields of a kind.
///
/// Together these fields identify what entity/revision/language a record
/// is; the merge logic treats them specially so synchronization can never
/// corrupt entity identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityKeys {
    /// Primary id field (storage-assigned serial).
    pub id: String,
    /// External stable id field (UUID).
    pub uuid: String,
    /// Revision id field, for revisionable kinds.
    #[serde(default)]
    pub revision: Option<String>,
    /// Language code field, for translatable kinds.
    #[serde(default)]
    pub langcode: Option<String>,
    /// Bundle (subtype) field.
    #[serde(default)]
    pub bundle: Option<String>,
}

impl EntityKeys {
    /// Keys with only the mandatory id and uuid fields.
    pub fn basic(id: impl Into<String>, uuid: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            uuid: uuid.into(),
            revision: None,
            langcode: None,
            bundle: None,
        }
    }

    /// Returns true if `field_name` is one of the declared key fields.
    #[must_use]
    pub fn contains(&self, field_name: &str) -> bool {
        self.id == field_name
            || self.uuid == field_name
            || self.revision.as_deref() == Some(field_name)
            || self.langcode.as_deref() == Some(field_name)
            || self.bundle.as_deref() == Some(field_name)
    }

    fn names(&self) -> impl Iterator<Item = &str> {
        [
            Some(self.id.as_str()),
            Some(self.uuid.as_str()),
            self.revision.as_deref(),
            self.langcode.as_deref(),
            self.bundle.as_deref(),
        ]
        .into_iter()
        .flatten()
    }
}

/// Per-field schema metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDefinition {
    /// Whether the field may differ per language.
    #[serde(default)]
    pub translatable: bool,
    /// Item properties stored as an opaque serialized blob rather than
    /// structured columns. Structured values in these properties are
    /// flattened to a serialized string before persistence.
    #[serde(default)]
    pub serialized_properties: Vec<String>,
}

impl FieldDefinition {
    /// A translatable field with structured storage.
    #[must_use]
    pub fn translatable() -> Self {
        Self {
            translatable: true,
            serialized_properties: Vec::new(),
        }
    }

    /// A field whose listed item properties use serialized blob storage.
    pub fn serialized<I, S>(properties: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            translatable: false,
            serialized_properties: properties.into_iter().map(Into::into).collect(),
        }
    }
}

/// Schema descriptor for one entity kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityKind {
    /// Kind name, the lookup key in the registry.
    pub name: String,
    /// Identity key field names.
    pub keys: EntityKeys,
    /// Whether the kind keeps a revision history.
    pub revisionable: bool,
    /// Whether entities of this kind are security principals whose writes
    /// must pass constraint validation before persisting.
    pub requires_identity_validation: bool,
    /// Field holding the parent reference in a hierarchy. Records of such
    /// kinds that arrive without a parent get a synthetic root parent so
    /// they stay visible in hierarchical listings.
    pub hierarchy_field: Option<String>,
    /// Non-key field metadata, by field name.
    pub fields: BTreeMap<String, FieldDefinition>,
}

impl EntityKind {
    /// Creates a kind with the given name and key fields and no other
    /// fields or capabilities. Key fields are registered as fields with
    /// default metadata.
    pub fn new(name: impl Into<String>, keys: EntityKeys) -> Self {
        let mut fields = BTreeMap::new();
        for key in keys.names() {
            fields.insert(key.to_string(), FieldDefinition::default());
        }
        Self {
            name: name.into(),
            keys,
            revisionable: false,
            requires_identity_validation: false,
            hierarchy_field: None,
            fields,
        }
    }

    /// Marks the kind as revisionable. The revision key must be declared.
    #[must_use]
    pub fn revisionable(mut self) -> Self {
        self.revisionable = true;
        self
    }

    /// Marks the kind as an account/principal kind requiring validation.
    #[must_use]
    pub fn with_identity_validation(mut self) -> Self {
        self.requires_identity_validation = true;
        self
    }

    /// Declares the hierarchy parent field.
    #[must_use]
    pub fn with_hierarchy_field(mut self, field_name: impl Into<String>) -> Self {
        let name = field_name.into();
        self.fields.entry(name.clone()).or_default();
        self.hierarchy_field = Some(name);
        self
    }

    /// Declares a field with the given metadata.
    #[must_use]
    pub fn with_field(mut self, name: impl Into<String>, definition: FieldDefinition) -> Self {
        self.fields.insert(name.into(), definition);
        self
    }

    /// Returns true if the kind declares a field with this name
    /// (key fields included).
    #[must_use]
    pub fn has_field(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    /// Returns the field metadata, if the field is declared.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&FieldDefinition> {
        self.fields.get(name)
    }

    /// Returns true if `name` is one of the identity key fields.
    #[must_use]
    pub fn is_key(&self, name: &str) -> bool {
        self.keys.contains(name)
    }

    /// Iterates over declared field names.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }
}

/// Resolves kind names to their schema descriptors.
///
/// A closed table populated at setup time; imports fail fast on kinds that
/// were never registered.
#[derive(Debug, Clone, Default)]
pub struct KindRegistry {
    kinds: BTreeMap<String, EntityKind>,
}

impl KindRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a kind, replacing any previous kind with the same name.
    pub fn register(&mut self, kind: EntityKind) {
        self.kinds.insert(kind.name.clone(), kind);
    }

    /// Resolves a kind by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&EntityKind> {
        self.kinds.get(name)
    }

    /// Iterates over registered kind names.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.kinds.keys().map(String::as_str)
    }
}

impl FromIterator<EntityKind> for KindRegistry {
    fn from_iter<I: IntoIterator<Item = EntityKind>>(iter: I) -> Self {
        let mut registry = Self::new();
        for kind in iter {
            registry.register(kind);
        }
        registry
    }
}
