//! Decoded content records.
//!
//! A [`DecodedRecord`] is the untyped nested mapping produced by decoding a
//! serialized content export (one document per entity). Two reserved blocks
//! may appear alongside the payload fields:
//! - `_content_sync` — export metadata, including the entity kind name
//! - `_translations` — a language-code → record mapping of translations of
//!   the same logical entity

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Reserved key holding export metadata (`entity_type` among others).
pub const METADATA_KEY: &str = "_content_sync";

/// Reserved key holding per-language translation records.
pub const TRANSLATIONS_KEY: &str = "_translations";

/// One decoded entity record: string keys, heterogeneous values.
///
/// Transient — consumed within a single import call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DecodedRecord(Map<String, Value>);

impl DecodedRecord {
    /// Creates an empty record.
    #[must_use]
    pub fn new() -> Self {
        Self(Map::new())
    }

    /// Wraps a decoded JSON value; the value must be an object.
    pub fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            other => Err(Error::NotAMapping(other.to_string())),
        }
    }

    /// Returns the value stored under `key`, if any.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Inserts a value, replacing any previous value for the key.
    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        self.0.insert(key.into(), value);
    }

    /// Returns true if the record has a value for `key`.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Returns true if `key` is absent or holds a value with no content
    /// (null, empty string, empty array, empty object).
    #[must_use]
    pub fn is_empty_value(&self, key: &str) -> bool {
        match self.0.get(key) {
            None | Some(Value::Null) => true,
            Some(Value::String(s)) => s.is_empty(),
            Some(Value::Array(items)) => items.is_empty(),
            Some(Value::Object(map)) => map.is_empty(),
            Some(_) => false,
        }
    }

    /// The entity kind named by the reserved metadata block, if present.
    #[must_use]
    pub fn entity_kind_hint(&self) -> Option<&str> {
        self.0
            .get(METADATA_KEY)?
            .get("entity_type")?
            .as_str()
            .filter(|s| !s.is_empty())
    }

    /// Removes the reserved translation block and returns it as a
    /// [`TranslationSet`], or `None` if the record carries no translations.
    ///
    /// Entries whose value is not a mapping are dropped.
    pub fn take_translations(&mut self) -> Option<TranslationSet> {
        let block = self.0.remove(TRANSLATIONS_KEY)?;
        let Value::Object(map) = block else {
            return None;
        };
        let translations: BTreeMap<String, DecodedRecord> = map
            .into_iter()
            .filter_map(|(langcode, value)| match value {
                Value::Object(fields) => Some((langcode, DecodedRecord(fields))),
                _ => None,
            })
            .collect();
        if translations.is_empty() {
            None
        } else {
            Some(TranslationSet(translations))
        }
    }

    /// Iterates over all key/value pairs, reserved blocks included.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    /// Iterates over payload keys, skipping the reserved blocks.
    pub fn payload_keys(&self) -> impl Iterator<Item = &str> {
        self.0
            .keys()
            .map(String::as_str)
            .filter(|k| *k != METADATA_KEY && *k != TRANSLATIONS_KEY)
    }
}

impl From<Map<String, Value>> for DecodedRecord {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

/// Translations bundled with a record: language code → decoded record.
///
/// Each translation logically amends the same entity in another language.
/// Ordered by language code so imports are deterministic.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TranslationSet(BTreeMap<String, DecodedRecord>);

impl TranslationSet {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Adds or replaces the record for a language.
    pub fn insert(&mut self, langcode: impl Into<String>, record: DecodedRecord) {
        self.0.insert(langcode.into(), record);
    }

    /// Returns the record for a language, if any.
    #[must_use]
    pub fn get(&self, langcode: &str) -> Option<&DecodedRecord> {
        self.0.get(langcode)
    }

    /// Number of languages in the set.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if the set holds no translations.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates over (language code, record) pairs in language order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &DecodedRecord)> {
        self.0.iter().map(|(lang, record)| (lang.as_str(), record))
    }
}

impl FromIterator<(String, DecodedRecord)> for TranslationSet {
    fn from_iter<I: IntoIterator<Item = (String, DecodedRecord)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}
