//! Core data types for sqltoelastic
//!
//! This module provides the typed value model used throughout the pipeline
//! for representing column values extracted from a source database, and the
//! insertion-ordered document that carries them to the bulk indexer.

use chrono::{DateTime, FixedOffset, NaiveDateTime};
use serde::ser::{Serialize, SerializeMap, Serializer};

/// Format for date/time values without a zone offset. `%.f` keeps
/// sub-second precision only when the value actually carries it.
const NAIVE_DATETIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

/// A single column value after extraction.
///
/// The set is closed on purpose: every supported SQL column type maps onto
/// exactly one of these kinds, and anything else is dropped with a warning
/// at conversion time. Integer widths are preserved distinctly rather than
/// widened to a single numeric type.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    String(String),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    /// Date/time without a zone offset (DATE columns land here at midnight).
    DateTime(NaiveDateTime),
    /// Date/time carrying an explicit zone offset.
    DateTimeOffset(DateTime<FixedOffset>),
    /// A nested JSON value produced by expanding a string field.
    Json(serde_json::Value),
}

impl FieldValue {
    /// Whether this value can drive timestamp-based index routing.
    pub fn is_temporal(&self) -> bool {
        matches!(
            self,
            FieldValue::DateTime(_) | FieldValue::DateTimeOffset(_)
        )
    }

    /// The value's natural string form, used when building document ids.
    pub fn to_natural_string(&self) -> String {
        match self {
            FieldValue::String(s) => s.clone(),
            FieldValue::Int16(v) => v.to_string(),
            FieldValue::Int32(v) => v.to_string(),
            FieldValue::Int64(v) => v.to_string(),
            FieldValue::DateTime(dt) => dt.format(NAIVE_DATETIME_FORMAT).to_string(),
            FieldValue::DateTimeOffset(dt) => dt.to_rfc3339(),
            FieldValue::Json(v) => v.to_string(),
        }
    }
}

impl Serialize for FieldValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            FieldValue::String(s) => serializer.serialize_str(s),
            FieldValue::Int16(v) => serializer.serialize_i16(*v),
            FieldValue::Int32(v) => serializer.serialize_i32(*v),
            FieldValue::Int64(v) => serializer.serialize_i64(*v),
            FieldValue::DateTime(dt) => {
                serializer.serialize_str(&dt.format(NAIVE_DATETIME_FORMAT).to_string())
            }
            FieldValue::DateTimeOffset(dt) => serializer.serialize_str(&dt.to_rfc3339()),
            FieldValue::Json(v) => v.serialize(serializer),
        }
    }
}

/// One transformed row, ready for indexing.
///
/// Field names are unique; insertion order is preserved through
/// serialization so the document on the wire reads like the row it came
/// from. Re-inserting an existing field replaces its value in place.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Document {
    fields: Vec<(String, FieldValue)>,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a field. Replacement keeps the field's position.
    pub fn insert(&mut self, name: impl Into<String>, value: FieldValue) {
        let name = name.into();
        if let Some(slot) = self.fields.iter_mut().find(|(n, _)| *n == name) {
            slot.1 = value;
        } else {
            self.fields.push((name, value));
        }
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.fields.iter().map(|(n, v)| (n.as_str(), v))
    }
}

impl Serialize for Document {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (name, value) in &self.fields {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}
