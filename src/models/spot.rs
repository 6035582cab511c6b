use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sqlx::FromRow;
use std::collections::HashMap;
use uuid::Uuid;

/// Fields assigned by the server; ignored when they appear in client payloads
const SYSTEM_FIELDS: &[&str] = &["_id", "id", "owner", "createdAt", "updatedAt"];

/// Errors raised while validating client-supplied spot fields
#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    #[error("Expected a JSON object")]
    NotAnObject,
    #[error("Spot validation failed: {}", describe(.0))]
    Invalid(HashMap<String, String>),
}

fn describe(field_errors: &HashMap<String, String>) -> String {
    let mut fields: Vec<&str> = field_errors.keys().map(String::as_str).collect();
    fields.sort_unstable();
    fields.join(", ")
}

/// A stored spot, as returned to its owner
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Spot {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub name: String,
    pub seen: bool,
    pub location: String,
    pub notes: String,
    pub owner: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Validated fields for a new spot. The owner is never part of the draft.
#[derive(Debug, Clone, PartialEq)]
pub struct SpotDraft {
    pub name: String,
    pub seen: bool,
    pub location: String,
    pub notes: String,
}

/// Validated partial update. `None` leaves the stored value untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SpotPatch {
    pub name: Option<String>,
    pub seen: Option<bool>,
    pub location: Option<String>,
    pub notes: Option<String>,
}

impl Spot {
    /// Build a new spot owned by `owner`, stamping identity and timestamps
    pub fn new(draft: SpotDraft, owner: Uuid) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: draft.name,
            seen: draft.seen,
            location: draft.location,
            notes: draft.notes,
            owner,
            created_at: now,
            updated_at: now,
        }
    }

    /// Apply a partial update. Owner and identity never change.
    pub fn apply(&mut self, patch: SpotPatch) {
        if let Some(name) = patch.name {
            self.name = name;
        }
        if let Some(seen) = patch.seen {
            self.seen = seen;
        }
        if let Some(location) = patch.location {
            self.location = location;
        }
        if let Some(notes) = patch.notes {
            self.notes = notes;
        }
        self.updated_at = Utc::now();
    }

    pub fn is_owned_by(&self, user_id: Uuid) -> bool {
        self.owner == user_id
    }
}

impl SpotDraft {
    /// Validate a create payload. `seen` defaults to false when absent.
    pub fn from_value(value: &Value) -> Result<Self, SchemaError> {
        let map = value.as_object().ok_or(SchemaError::NotAnObject)?;
        let mut errors = FieldErrors::default();

        let name = errors.required_text(map, "name");
        let location = errors.required_text(map, "location");
        let notes = errors.required_text(map, "notes");
        let seen = errors.optional_bool(map, "seen").unwrap_or(false);

        errors.finish()?;

        // Required fields are all present once finish() passes
        Ok(Self {
            name: name.unwrap_or_default(),
            seen,
            location: location.unwrap_or_default(),
            notes: notes.unwrap_or_default(),
        })
    }
}

impl SpotPatch {
    /// Validate an update payload. System fields, including `owner`, are dropped.
    pub fn from_value(value: &Value) -> Result<Self, SchemaError> {
        let map = value.as_object().ok_or(SchemaError::NotAnObject)?;
        let mut errors = FieldErrors::default();

        let ignored: Vec<&str> = map
            .keys()
            .map(String::as_str)
            .filter(|key| SYSTEM_FIELDS.contains(key))
            .collect();
        if !ignored.is_empty() {
            tracing::debug!("Discarding system fields from spot update: {:?}", ignored);
        }

        let patch = Self {
            name: errors.optional_text(map, "name"),
            seen: errors.optional_bool(map, "seen"),
            location: errors.optional_text(map, "location"),
            notes: errors.optional_text(map, "notes"),
        };

        errors.finish()?;
        Ok(patch)
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.seen.is_none() && self.location.is_none() && self.notes.is_none()
    }
}

/// Collects per-field failures so a single response reports all of them
#[derive(Default)]
struct FieldErrors(HashMap<String, String>);

impl FieldErrors {
    fn required_text(&mut self, map: &Map<String, Value>, field: &str) -> Option<String> {
        match map.get(field) {
            None | Some(Value::Null) => {
                self.0.insert(field.to_string(), "This field is required".to_string());
                None
            }
            Some(_) => self.optional_text(map, field),
        }
    }

    fn optional_text(&mut self, map: &Map<String, Value>, field: &str) -> Option<String> {
        match map.get(field) {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) if s.is_empty() => {
                self.0.insert(field.to_string(), "This field must not be empty".to_string());
                None
            }
            Some(Value::String(s)) => Some(s.clone()),
            Some(_) => {
                self.0.insert(field.to_string(), "Expected a string".to_string());
                None
            }
        }
    }

    fn optional_bool(&mut self, map: &Map<String, Value>, field: &str) -> Option<bool> {
        match map.get(field) {
            None | Some(Value::Null) => None,
            Some(Value::Bool(b)) => Some(*b),
            Some(_) => {
                self.0.insert(field.to_string(), "Expected a boolean".to_string());
                None
            }
        }
    }

    fn finish(self) -> Result<(), SchemaError> {
        if self.0.is_empty() {
            Ok(())
        } else {
            Err(SchemaError::Invalid(self.0))
        }
    }
}
