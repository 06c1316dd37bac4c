//! Schema-free documents held by the document store.
//!
//! Documents are bags of JSON fields. The only structure imposed here is
//! per collection: which field links a document to its relational owner and
//! which single field must be present on creation.

use crate::error::{Result, YouthGroupError};
use chrono::{DateTime, Utc};
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};
use std::fmt;

/// Arbitrary document fields.
pub type Fields = Map<String, Value>;

/// Keys managed by the store that callers may not set.
pub const RESERVED_KEYS: [&str; 4] = ["_id", "id", "created", "updated"];

/// The named collections of the document store.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Collection {
    /// Free-text notes about a person.
    PersonNotes,
    /// Log of contacts with a person's parents.
    ParentContacts,
    /// Notes, concerns and wins recorded for an event.
    EventNotes,
    /// Flexible attribute sets describing an event type.
    EventTypes,
}

impl Collection {
    /// Collection name in the store.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::PersonNotes => "personNotes",
            Self::ParentContacts => "parentContacts",
            Self::EventNotes => "eventNotes",
            Self::EventTypes => "eventTypes",
        }
    }

    /// Field holding the relational id of the owning record.
    #[must_use]
    pub const fn owner_field(self) -> Option<&'static str> {
        match self {
            Self::PersonNotes | Self::ParentContacts => Some("personId"),
            Self::EventNotes => Some("eventId"),
            Self::EventTypes => None,
        }
    }

    /// Field that must be a non-blank string on creation.
    #[must_use]
    pub const fn required_field(self) -> Option<&'static str> {
        match self {
            Self::PersonNotes => Some("text"),
            Self::ParentContacts => Some("summary"),
            Self::EventNotes => None,
            Self::EventTypes => Some("event_type"),
        }
    }

    /// Resource name used in not-found errors.
    #[must_use]
    pub const fn resource(self) -> &'static str {
        match self {
            Self::PersonNotes => "Person note",
            Self::ParentContacts => "Parent contact",
            Self::EventNotes => "Event note",
            Self::EventTypes => "Event type",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Selection for [`crate::stores::DocumentStore::find`].
#[derive(Clone, Debug, PartialEq)]
pub enum DocumentFilter {
    /// Every document in the collection.
    All,
    /// Documents whose `name` field equals `value`.
    Field {
        /// Field name.
        name: String,
        /// Expected value.
        value: Value,
    },
}

impl DocumentFilter {
    /// Documents owned by the relational record `owner_id`.
    ///
    /// Collections without an owner field select everything.
    #[must_use]
    pub fn owned_by(collection: Collection, owner_id: i64) -> Self {
        collection
            .owner_field()
            .map_or(Self::All, |field| Self::Field {
                name: field.to_string(),
                value: Value::from(owner_id),
            })
    }

    /// Documents whose string field equals `value`.
    pub fn field_eq(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Field {
            name: name.into(),
            value: value.into(),
        }
    }

    /// Whether `fields` satisfies the filter.
    #[must_use]
    pub fn matches(&self, fields: &Fields) -> bool {
        match self {
            Self::All => true,
            Self::Field { name, value } => fields.get(name) == Some(value),
        }
    }
}

/// A stored document with its opaque id and timestamps.
#[derive(Clone, Debug, PartialEq)]
pub struct Document {
    /// Store-assigned identifier.
    pub id: String,
    /// User fields.
    pub fields: Fields,
    /// Stamped on insert.
    pub created: Option<DateTime<Utc>>,
    /// Stamped on every update.
    pub updated: Option<DateTime<Utc>>,
}

impl Document {
    /// String value of a field, if present and a string.
    #[must_use]
    pub fn str_field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).and_then(Value::as_str)
    }

    /// Integer value of a field, if present and integral.
    #[must_use]
    pub fn i64_field(&self, name: &str) -> Option<i64> {
        self.fields.get(name).and_then(Value::as_i64)
    }
}

// Flat shape: `{ "id": .., <fields>, "created": .., "updated": .. }`.
impl Serialize for Document {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len() + 3))?;
        map.serialize_entry("id", &self.id)?;
        for (key, value) in &self.fields {
            if !RESERVED_KEYS.contains(&key.as_str()) {
                map.serialize_entry(key, value)?;
            }
        }
        map.serialize_entry("created", &self.created)?;
        map.serialize_entry("updated", &self.updated)?;
        map.end()
    }
}

/// Removes store-managed keys from caller input.
#[must_use]
pub fn strip_reserved(mut fields: Fields) -> Fields {
    for key in RESERVED_KEYS {
        fields.remove(key);
    }
    fields
}

/// Prepares caller fields for insertion into `collection`.
///
/// Strips reserved keys, checks the collection's required field and, for
/// owned collections, sets the owner field to `owner_id`.
///
/// # Errors
///
/// Returns [`YouthGroupError::Validation`] when the required field is
/// missing, not a string, or blank, or when an owned collection is given no
/// owner.
pub fn prepare_insert(collection: Collection, owner_id: Option<i64>, fields: Fields) -> Result<Fields> {
    let mut fields = strip_reserved(fields);

    if let Some(required) = collection.required_field() {
        let present = fields
            .get(required)
            .and_then(Value::as_str)
            .is_some_and(|s| !s.trim().is_empty());
        if !present {
            return Err(YouthGroupError::validation(format!(
                "{required} is required"
            )));
        }
    }

    match (collection.owner_field(), owner_id) {
        (Some(field), Some(owner)) => {
            fields.insert(field.to_string(), Value::from(owner));
        }
        (Some(field), None) => {
            return Err(YouthGroupError::validation(format!("{field} is required")));
        }
        (None, _) => {}
    }

    Ok(fields)
}

/// Prepares a partial update: reserved keys and the owner field are dropped.
///
/// # Errors
///
/// Returns [`YouthGroupError::Validation`] when nothing updatable remains.
pub fn prepare_update(collection: Collection, fields: Fields) -> Result<Fields> {
    let mut fields = strip_reserved(fields);
    if let Some(owner) = collection.owner_field() {
        fields.remove(owner);
    }
    if fields.is_empty() {
        return Err(YouthGroupError::validation("no fields to update"));
    }
    Ok(fields)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fields(value: Value) -> Fields {
        match value {
            Value::Object(map) => map,
            _ => Fields::new(),
        }
    }

    #[test]
    fn person_note_requires_text() {
        let err = prepare_insert(Collection::PersonNotes, Some(1), fields(json!({"category": "x"})));
        assert!(matches!(err, Err(YouthGroupError::Validation(_))));

        let blank = prepare_insert(Collection::PersonNotes, Some(1), fields(json!({"text": "  "})));
        assert!(blank.is_err());
    }

    #[test]
    fn insert_sets_owner_and_strips_reserved() {
        let prepared = prepare_insert(
            Collection::ParentContacts,
            Some(9),
            fields(json!({"summary": "Called mom", "personId": 4, "_id": "x", "created": "y"})),
        );
        let prepared = prepared.unwrap_or_default();
        assert_eq!(prepared.get("personId"), Some(&json!(9)));
        assert!(!prepared.contains_key("_id"));
        assert!(!prepared.contains_key("created"));
    }

    #[test]
    fn event_notes_have_no_required_field() {
        let prepared = prepare_insert(Collection::EventNotes, Some(2), Fields::new());
        assert_eq!(prepared.ok().and_then(|f| f.get("eventId").cloned()), Some(json!(2)));
    }

    #[test]
    fn update_cannot_move_owner() {
        let prepared = prepare_update(Collection::PersonNotes, fields(json!({"personId": 2, "text": "new"})));
        let prepared = prepared.unwrap_or_default();
        assert!(!prepared.contains_key("personId"));
        assert_eq!(prepared.get("text"), Some(&json!("new")));

        assert!(prepare_update(Collection::PersonNotes, fields(json!({"personId": 2}))).is_err());
    }

    #[test]
    fn filter_matches_owner() {
        let filter = DocumentFilter::owned_by(Collection::EventNotes, 3);
        assert!(filter.matches(&fields(json!({"eventId": 3}))));
        assert!(!filter.matches(&fields(json!({"eventId": 4}))));
        assert_eq!(DocumentFilter::owned_by(Collection::EventTypes, 3), DocumentFilter::All);
    }

    #[test]
    fn document_serializes_flat() {
        let doc = Document {
            id: "abc".to_string(),
            fields: fields(json!({"text": "hello", "_id": "ignored"})),
            created: None,
            updated: None,
        };
        let value = serde_json::to_value(&doc).unwrap_or_default();
        assert_eq!(value, json!({"id": "abc", "text": "hello", "created": null, "updated": null}));
    }
}
