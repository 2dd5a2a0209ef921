//! Record deserialization seam.
//!
//! Turning a [`DecodedRecord`] into a typed [`Entity`] is CMS machinery the
//! import core only consumes. [`FieldMapDeserializer`] is the canonical
//! implementation: it maps top-level record keys onto declared fields and
//! captures the submitted field set from the keys that were present.

use crate::{ImportContext, ImportError, ImportResult};
use serde_json::Value;
use std::collections::BTreeSet;
use stele_model::{Entity, EntityKind, FieldItem, FieldValue};
use stele_types::{DecodedRecord, METADATA_KEY, TRANSLATIONS_KEY};

/// Builds a typed entity from a decoded record.
pub trait RecordDeserializer: Send + Sync {
    /// Deserializes `record` into an entity of `kind`.
    ///
    /// `format` names the encoding the record was decoded from; `context`
    /// carries the caller's hints. Both may be ignored by implementations
    /// that don't need them.
    fn deserialize(
        &self,
        record: &DecodedRecord,
        kind: &EntityKind,
        format: &str,
        context: &ImportContext,
    ) -> ImportResult<Entity>;
}

/// Canonical record → entity field mapper.
///
/// Every payload key naming a declared field becomes that field's value:
/// an array maps to a multi-item field, a mapping to a single rich item,
/// and a scalar to a single `value`-property item. Keys that name no
/// declared field are dropped. The set of mapped keys becomes the entity's
/// submitted field set.
#[derive(Debug, Clone, Copy, Default)]
pub struct FieldMapDeserializer;

impl RecordDeserializer for FieldMapDeserializer {
    fn deserialize(
        &self,
        record: &DecodedRecord,
        kind: &EntityKind,
        _format: &str,
        _context: &ImportContext,
    ) -> ImportResult<Entity> {
        let mut entity = Entity::of_kind(kind);
        let mut submitted = BTreeSet::new();

        for (key, value) in record.iter() {
            if key == METADATA_KEY || key == TRANSLATIONS_KEY {
                continue;
            }
            if !kind.has_field(key) {
                continue;
            }
            entity.set(key.clone(), field_value_from(key, value)?);
            submitted.insert(key.clone());
        }

        entity.set_submitted_fields(submitted);
        Ok(entity)
    }
}

fn field_value_from(field_name: &str, value: &Value) -> ImportResult<FieldValue> {
    match value {
        Value::Null => Ok(FieldValue::empty()),
        Value::Array(items) => {
            let mut field_value = FieldValue::empty();
            for item in items {
                field_value.push_item(item_from(field_name, item)?);
            }
            Ok(field_value)
        }
        Value::Object(map) => Ok(FieldValue::item(map.clone())),
        scalar => Ok(FieldValue::scalar(scalar.clone())),
    }
}

fn item_from(field_name: &str, value: &Value) -> ImportResult<FieldItem> {
    match value {
        Value::Object(map) => Ok(map.clone()),
        Value::Array(_) => Err(ImportError::Deserialize(format!(
            "field {field_name}: nested arrays are not a valid field item"
        ))),
        scalar => {
            let mut item = FieldItem::new();
            item.insert("value".to_string(), scalar.clone());
            Ok(item)
        }
    }
}
