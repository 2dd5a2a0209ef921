use pretty_assertions::assert_eq;
use serde_json::json;
use stele_import::{ContentImporter, FieldMapDeserializer, ImportContext, ImportError};
use stele_model::{
    ConstraintViolation, Entity, EntityKeys, EntityKind, EntityValidator, FieldDefinition,
    FieldValue, KindRegistry,
};
use stele_store::{EntityStore, MemoryStore};
use stele_types::{DecodedRecord, EntityId, ExternalId, METADATA_KEY};

fn article_kind() -> EntityKind {
    let keys = EntityKeys {
        id: "nid".into(),
        uuid: "uuid".into(),
        revision: Some("vid".into()),
        langcode: Some("langcode".into()),
        bundle: Some("type".into()),
    };
    EntityKind::new("article", keys)
        .revisionable()
        .with_field("title", FieldDefinition::translatable())
        .with_field("body", FieldDefinition::translatable())
        .with_field("meta", FieldDefinition::serialized(["value"]))
}

fn term_kind() -> EntityKind {
    let keys = EntityKeys {
        id: "tid".into(),
        uuid: "uuid".into(),
        revision: None,
        langcode: Some("langcode".into()),
        bundle: Some("vid".into()),
    };
    EntityKind::new("taxonomy_term", keys)
        .with_hierarchy_field("parent")
        .with_field("name", FieldDefinition::translatable())
}

fn user_kind() -> EntityKind {
    let keys = EntityKeys {
        id: "uid".into(),
        uuid: "uuid".into(),
        revision: None,
        langcode: Some("langcode".into()),
        bundle: None,
    };
    EntityKind::new("user", keys)
        .with_identity_validation()
        .with_field("name", FieldDefinition::default())
        .with_field("mail", FieldDefinition::default())
}

fn registry() -> KindRegistry {
    [article_kind(), term_kind(), user_kind()].into_iter().collect()
}

fn make_importer() -> ContentImporter<MemoryStore, FieldMapDeserializer> {
    ContentImporter::new(MemoryStore::new(), FieldMapDeserializer, registry())
}

fn make_record(kind_name: &str, value: serde_json::Value) -> DecodedRecord {
    let mut record = DecodedRecord::from_value(value).unwrap();
    record.insert(METADATA_KEY, json!({"entity_type": kind_name}));
    record
}

fn article_record(uuid: &ExternalId, title: &str) -> DecodedRecord {
    make_record("article", json!({"uuid": uuid.to_string(), "title": title}))
}

/// Validator returning a fixed list of violations for every entity.
struct FixedViolations(Vec<ConstraintViolation>);

impl EntityValidator for FixedViolations {
    fn validate(&self, _entity: &Entity, _kind: &EntityKind) -> Vec<ConstraintViolation> {
        self.0.clone()
    }
}

fn rejecting_validator(constraint: &str) -> Box<dyn EntityValidator> {
    Box::new(FixedViolations(vec![ConstraintViolation::new(
        constraint,
        format!("violated {constraint}"),
    )]))
}

// ── Dispatch ─────────────────────────────────────────────────────

#[test]
fn record_without_kind_is_skipped() {
    let importer = make_importer();
    let record = DecodedRecord::from_value(json!({"title": "x"})).unwrap();
    let outcome = importer
        .import_record(&record, &ImportContext::new())
        .unwrap();
    assert!(outcome.is_none());
}

#[test]
fn kind_resolves_from_embedded_metadata() {
    let importer = make_importer();
    let record = article_record(&ExternalId::new(), "Hello");
    let entity = importer
        .import_record(&record, &ImportContext::new())
        .unwrap()
        .unwrap();
    assert_eq!(entity.kind_name(), "article");
    assert_eq!(importer.store().count("article"), 1);
}

#[test]
fn context_entity_type_overrides_metadata() {
    let importer = make_importer();
    // Metadata claims taxonomy_term; the call context wins.
    let record = make_record(
        "taxonomy_term",
        json!({"uuid": ExternalId::new().to_string(), "title": "Hello"}),
    );
    let context = ImportContext::new().with_entity_type("article");
    let entity = importer.import_record(&record, &context).unwrap().unwrap();
    assert_eq!(entity.kind_name(), "article");
    assert_eq!(importer.store().count("article"), 1);
    assert_eq!(importer.store().count("taxonomy_term"), 0);
}

#[test]
fn process_context_supplies_default_kind() {
    let mut importer = make_importer();
    importer.set_context(ImportContext::new().with_entity_type("article"));
    let record =
        DecodedRecord::from_value(json!({"uuid": ExternalId::new().to_string(), "title": "x"}))
            .unwrap();
    let entity = importer
        .import_record(&record, &ImportContext::new())
        .unwrap()
        .unwrap();
    assert_eq!(entity.kind_name(), "article");
}

#[test]
fn unknown_kind_is_an_error() {
    let importer = make_importer();
    let record = make_record("widget", json!({"title": "x"}));
    let err = importer
        .import_record(&record, &ImportContext::new())
        .unwrap_err();
    assert!(matches!(err, ImportError::UnknownKind(name) if name == "widget"));
}

#[test]
fn format_is_constant() {
    let importer = make_importer();
    assert_eq!(importer.format(), "yaml");
}

// ── Hierarchy normalization ──────────────────────────────────────

#[test]
fn term_without_parent_gets_synthetic_root() {
    let importer = make_importer();
    let record = make_record(
        "taxonomy_term",
        json!({"uuid": ExternalId::new().to_string(), "name": "Root"}),
    );
    let entity = importer
        .import_record(&record, &ImportContext::new())
        .unwrap()
        .unwrap();
    assert_eq!(
        entity.get("parent").unwrap().first_property("target_id"),
        Some(&json!(0))
    );
}

#[test]
fn term_with_parent_keeps_it() {
    let importer = make_importer();
    let record = make_record(
        "taxonomy_term",
        json!({
            "uuid": ExternalId::new().to_string(),
            "name": "Leaf",
            "parent": {"target_id": 4}
        }),
    );
    let entity = importer
        .import_record(&record, &ImportContext::new())
        .unwrap()
        .unwrap();
    assert_eq!(
        entity.get("parent").unwrap().first_property("target_id"),
        Some(&json!(4))
    );
}

// ── First import ─────────────────────────────────────────────────

#[test]
fn first_import_stamps_external_id_and_assigns_fresh_primary_id() {
    let importer = make_importer();
    let external = ExternalId::new();
    // The payload claims primary id 99; the store assigns its own.
    let record = make_record(
        "article",
        json!({"uuid": external.to_string(), "nid": 99, "title": "New"}),
    );
    let entity = importer
        .import_record(&record, &ImportContext::new())
        .unwrap()
        .unwrap();

    let kind = article_kind();
    assert_eq!(entity.external_id(&kind), Some(external));
    assert_eq!(entity.id(&kind), Some(EntityId::from_raw(1)));
    assert_eq!(importer.store().count("article"), 1);
}

#[test]
fn import_is_idempotent() {
    let importer = make_importer();
    let record = article_record(&ExternalId::new(), "Stable");

    let first = importer
        .import_record(&record, &ImportContext::new())
        .unwrap()
        .unwrap();
    let second = importer
        .import_record(&record, &ImportContext::new())
        .unwrap()
        .unwrap();

    assert_eq!(first.fields(), second.fields());
    assert_eq!(importer.store().count("article"), 1);
}

// ── Merging into existing entities ───────────────────────────────

#[test]
fn reimport_updates_submitted_fields() {
    let importer = make_importer();
    let external = ExternalId::new();
    let kind = article_kind();

    let seeded = make_record(
        "article",
        json!({"uuid": external.to_string(), "title": "Old", "body": "Body"}),
    );
    importer
        .import_record(&seeded, &ImportContext::new())
        .unwrap();

    let update = article_record(&external, "New");
    let entity = importer
        .import_record(&update, &ImportContext::new())
        .unwrap()
        .unwrap();

    assert_eq!(entity.get("title"), Some(&FieldValue::scalar("New")));
    // body was not submitted this time and stays untouched
    assert_eq!(entity.get("body"), Some(&FieldValue::scalar("Body")));
    assert_eq!(entity.id(&kind), Some(EntityId::from_raw(1)));
}

#[test]
fn primary_id_in_payload_never_overwrites_stored_id() {
    let importer = make_importer();
    let external = ExternalId::new();
    let kind = article_kind();

    importer
        .import_record(&article_record(&external, "x"), &ImportContext::new())
        .unwrap();

    let update = make_record(
        "article",
        json!({"uuid": external.to_string(), "nid": 42, "title": "x"}),
    );
    let entity = importer
        .import_record(&update, &ImportContext::new())
        .unwrap()
        .unwrap();
    assert_eq!(entity.id(&kind), Some(EntityId::from_raw(1)));
}

#[test]
fn revision_key_is_never_merged() {
    let importer = make_importer();
    let external = ExternalId::new();
    let kind = article_kind();

    let first = importer
        .import_record(&article_record(&external, "x"), &ImportContext::new())
        .unwrap()
        .unwrap();
    let revision = first.revision_id(&kind).unwrap();

    let update = make_record(
        "article",
        json!({"uuid": external.to_string(), "vid": 99, "title": "x"}),
    );
    let entity = importer
        .import_record(&update, &ImportContext::new())
        .unwrap()
        .unwrap();
    assert_eq!(entity.revision_id(&kind), Some(revision));
}

#[test]
fn langcode_cannot_be_forced_empty() {
    let importer = make_importer();
    let external = ExternalId::new();
    let kind = article_kind();

    let seeded = make_record(
        "article",
        json!({"uuid": external.to_string(), "langcode": "en", "title": "x"}),
    );
    importer
        .import_record(&seeded, &ImportContext::new())
        .unwrap();

    let update = make_record(
        "article",
        json!({"uuid": external.to_string(), "langcode": null, "title": "x"}),
    );
    let entity = importer
        .import_record(&update, &ImportContext::new())
        .unwrap()
        .unwrap();
    assert_eq!(entity.langcode(&kind), Some("en"));
}

#[test]
fn ambiguous_match_takes_lowest_primary_id() {
    let store = MemoryStore::new();
    let kind = article_kind();
    let external = ExternalId::new();

    // Seed two entities sharing one external id.
    for title in ["first", "second"] {
        let mut entity = Entity::of_kind(&kind);
        entity.set_external_id(&kind, &external);
        entity.set("title", FieldValue::scalar(title));
        store.save(&mut entity, &kind).unwrap();
    }

    let importer = ContentImporter::new(store, FieldMapDeserializer, registry());
    let entity = importer
        .import_record(&article_record(&external, "updated"), &ImportContext::new())
        .unwrap()
        .unwrap();
    assert_eq!(entity.id(&kind), Some(EntityId::from_raw(1)));

    // The higher-id duplicate is untouched.
    let second = importer
        .store()
        .load(&kind, EntityId::from_raw(2))
        .unwrap()
        .unwrap();
    assert_eq!(second.get("title"), Some(&FieldValue::scalar("second")));
}

#[test]
fn update_mode_disabled_is_a_read_only_pass() {
    let mut importer = make_importer();
    let external = ExternalId::new();

    importer
        .import_record(&article_record(&external, "stored"), &ImportContext::new())
        .unwrap();

    importer.set_update_existing(false);
    let entity = importer
        .import_record(&article_record(&external, "changed"), &ImportContext::new())
        .unwrap()
        .unwrap();

    // Returned and stored state both keep the original value.
    assert_eq!(entity.get("title"), Some(&FieldValue::scalar("stored")));
    let kind = article_kind();
    let stored = importer
        .store()
        .load(&kind, EntityId::from_raw(1))
        .unwrap()
        .unwrap();
    assert_eq!(stored.get("title"), Some(&FieldValue::scalar("stored")));
}

// ── prepare_entity ───────────────────────────────────────────────

#[test]
fn prepare_entity_without_submitted_set_returns_stored_as_is() {
    let importer = make_importer();
    let external = ExternalId::new();
    let kind = article_kind();

    importer
        .import_record(&article_record(&external, "stored"), &ImportContext::new())
        .unwrap();

    // A whole-record entity (no submitted set) must not merge anything.
    let mut incoming = Entity::of_kind(&kind);
    incoming.set_external_id(&kind, &external);
    incoming.set("title", FieldValue::scalar("incoming"));
    incoming.clear_submitted_fields();

    let prepared = importer.prepare_entity(incoming, &kind).unwrap();
    assert_eq!(prepared.get("title"), Some(&FieldValue::scalar("stored")));
}

#[test]
fn prepare_entity_duplicates_unmatched_entities() {
    let importer = make_importer();
    let kind = article_kind();

    let mut incoming = Entity::of_kind(&kind);
    let external = incoming.external_id(&kind).unwrap();
    incoming.set_id(&kind, EntityId::from_raw(77));

    let prepared = importer.prepare_entity(incoming, &kind).unwrap();
    assert!(prepared.is_new(&kind));
    assert_eq!(prepared.external_id(&kind), Some(external));
}

#[test]
fn prepare_entity_requires_an_external_id() {
    let importer = make_importer();
    let kind = article_kind();

    let mut incoming = Entity::of_kind(&kind);
    incoming.set("uuid", FieldValue::scalar("not-a-uuid"));

    let err = importer.prepare_entity(incoming, &kind).unwrap_err();
    assert!(matches!(err, ImportError::MissingExternalId(_)));
}

// ── Derived-field encoding ───────────────────────────────────────

#[test]
fn structured_serialized_property_is_flattened() {
    let importer = make_importer();
    let record = make_record(
        "article",
        json!({
            "uuid": ExternalId::new().to_string(),
            "meta": {"value": {"weight": 3, "sticky": false}}
        }),
    );
    let entity = importer
        .import_record(&record, &ImportContext::new())
        .unwrap()
        .unwrap();

    let encoded = entity.get("meta").unwrap().main_value().unwrap();
    let raw = encoded.as_str().expect("serialized property must be a string");
    assert_eq!(
        serde_json::from_str::<serde_json::Value>(raw).unwrap(),
        json!({"weight": 3, "sticky": false})
    );
}

#[test]
fn scalar_serialized_property_passes_through() {
    let importer = make_importer();
    let record = make_record(
        "article",
        json!({"uuid": ExternalId::new().to_string(), "meta": {"value": "plain"}}),
    );
    let entity = importer
        .import_record(&record, &ImportContext::new())
        .unwrap()
        .unwrap();
    assert_eq!(
        entity.get("meta").unwrap().main_value(),
        Some(&json!("plain"))
    );
}

// ── Validation gate ──────────────────────────────────────────────

#[test]
fn invalid_new_account_is_not_persisted() {
    let importer = ContentImporter::new(MemoryStore::new(), FieldMapDeserializer, registry())
        .with_validator(rejecting_validator("ProtectedUserField"));

    let record = make_record(
        "user",
        json!({"uuid": ExternalId::new().to_string(), "name": "eve"}),
    );
    let outcome = importer
        .import_record(&record, &ImportContext::new())
        .unwrap();
    assert!(outcome.is_none());
    assert_eq!(importer.store().count("user"), 0);
}

#[test]
fn invalid_existing_account_keeps_stored_state() {
    let store = MemoryStore::new();
    let kind = user_kind();
    let external = ExternalId::new();

    let mut seeded = Entity::of_kind(&kind);
    seeded.set_external_id(&kind, &external);
    seeded.set("name", FieldValue::scalar("original"));
    store.save(&mut seeded, &kind).unwrap();

    let importer = ContentImporter::new(store, FieldMapDeserializer, registry())
        .with_validator(rejecting_validator("ProtectedUserField"));

    let record = make_record(
        "user",
        json!({"uuid": external.to_string(), "name": "tampered"}),
    );
    let entity = importer
        .import_record(&record, &ImportContext::new())
        .unwrap()
        .unwrap();
    assert!(!entity.is_new(&kind));

    let stored = importer
        .store()
        .load(&kind, EntityId::from_raw(1))
        .unwrap()
        .unwrap();
    assert_eq!(stored.get("name"), Some(&FieldValue::scalar("original")));
}

#[test]
fn skipped_constraints_are_ignored() {
    let importer = ContentImporter::new(MemoryStore::new(), FieldMapDeserializer, registry())
        .with_validator(rejecting_validator("ProtectedUserField"));

    let record = make_record(
        "user",
        json!({"uuid": ExternalId::new().to_string(), "name": "eve"}),
    );
    let context = ImportContext::new().with_skipped_constraint("ProtectedUserField");
    let entity = importer.import_record(&record, &context).unwrap();
    assert!(entity.is_some());
    assert_eq!(importer.store().count("user"), 1);
}

#[test]
fn non_account_kinds_bypass_validation() {
    let importer = ContentImporter::new(MemoryStore::new(), FieldMapDeserializer, registry())
        .with_validator(rejecting_validator("Whatever"));

    let record = article_record(&ExternalId::new(), "fine");
    let entity = importer
        .import_record(&record, &ImportContext::new())
        .unwrap();
    assert!(entity.is_some());
    assert_eq!(importer.store().count("article"), 1);
}

#[test]
fn validate_entity_uses_process_skip_list() {
    let mut importer = ContentImporter::new(MemoryStore::new(), FieldMapDeserializer, registry())
        .with_validator(rejecting_validator("ProtectedUserField"));
    let kind = user_kind();
    let entity = Entity::of_kind(&kind);

    assert!(!importer.validate_entity(&entity, &kind));

    importer.set_context(ImportContext::new().with_skipped_constraint("ProtectedUserField"));
    assert!(importer.validate_entity(&entity, &kind));
}

// ── Anonymous-account guard ──────────────────────────────────────

#[test]
fn anonymous_account_is_never_written() {
    let store = MemoryStore::new();
    let kind = user_kind();
    let external = ExternalId::new();

    // Seed the reserved principal at primary id 0.
    let mut anonymous = Entity::of_kind(&kind);
    anonymous.set_id(&kind, EntityId::from_raw(0));
    anonymous.set_external_id(&kind, &external);
    anonymous.set("name", FieldValue::scalar(""));
    store.save(&mut anonymous, &kind).unwrap();

    let importer = ContentImporter::new(store, FieldMapDeserializer, registry());
    let record = make_record(
        "user",
        json!({"uuid": external.to_string(), "uid": 0, "name": "hijacked"}),
    );
    let entity = importer
        .import_record(&record, &ImportContext::new())
        .unwrap()
        .unwrap();
    assert_eq!(entity.id(&kind), Some(EntityId::from_raw(0)));

    let stored = importer
        .store()
        .load(&kind, EntityId::from_raw(0))
        .unwrap()
        .unwrap();
    assert_eq!(stored.get("name"), Some(&FieldValue::scalar("")));
}

// ── Context layering ─────────────────────────────────────────────

#[test]
fn merged_context_prefers_call_site_entity_type() {
    let defaults = ImportContext::new().with_entity_type("article");
    let call = ImportContext::new().with_entity_type("user");
    assert_eq!(defaults.merged_with(&call).entity_type.as_deref(), Some("user"));
    assert_eq!(
        defaults.merged_with(&ImportContext::new()).entity_type.as_deref(),
        Some("article")
    );
}

#[test]
fn merged_context_unions_skip_lists() {
    let defaults = ImportContext::new().with_skipped_constraint("A");
    let call = ImportContext::new()
        .with_skipped_constraint("B")
        .with_skipped_constraint("A");
    let merged = defaults.merged_with(&call);
    assert!(merged.skips_constraint("A"));
    assert!(merged.skips_constraint("B"));
    assert_eq!(merged.skipped_constraints.len(), 2);
}
