//! Field transformation rules applied while reading rows.
//!
//! Four name-membership rule sets (JSON expansion, upper/lower case folding,
//! escape suppression) plus constant fields injected into every document.

use crate::config::Config;
use crate::types::{Document, FieldValue};
use chrono::{DateTime, NaiveDate, NaiveDateTime};

/// The per-field rule sets for one extraction run.
///
/// Constant fields are parsed once, at construction, and cloned into every
/// document so later per-document mutation cannot alias across rows.
#[derive(Debug, Default)]
pub struct FieldRules {
    toupper: Vec<String>,
    tolower: Vec<String>,
    expand_json: Vec<String>,
    de_escape: Vec<String>,
    constants: Vec<(String, FieldValue)>,
}

impl FieldRules {
    pub fn from_config(config: &Config) -> Self {
        let constants = config
            .addconstantfields
            .iter()
            .filter_map(|entry| {
                let mut parts = entry.split('=');
                let name = parts.next()?;
                let value = parts.next()?;
                Some((name.to_string(), parse_constant_value(value)))
            })
            .collect();

        FieldRules {
            toupper: config.toupperfields.clone(),
            tolower: config.tolowerfields.clone(),
            expand_json: config.expandjsonfields.clone(),
            de_escape: config.deescapefields.clone(),
            constants,
        }
    }

    /// Run a string column value through the rule set.
    ///
    /// Fields in the expand-json set bypass case folding and escaping
    /// entirely; a failed parse keeps the raw string. Everything else gets
    /// uppercase, then lowercase (so a field in both sets ends lowercase),
    /// then backslash/quote doubling unless the field opts out.
    pub fn apply_string(&self, field: &str, raw: String) -> FieldValue {
        if self.expand_json.iter().any(|f| f == field) {
            return match serde_json::from_str::<serde_json::Value>(&raw) {
                Ok(value) => FieldValue::Json(value),
                Err(_) => FieldValue::String(raw),
            };
        }

        let mut data = raw;
        if self.toupper.iter().any(|f| f == field) {
            data = data.to_uppercase();
        }
        if self.tolower.iter().any(|f| f == field) {
            data = data.to_lowercase();
        }
        if !self.de_escape.iter().any(|f| f == field) {
            data = data.replace('\\', "\\\\").replace('"', "\\\"");
        }
        FieldValue::String(data)
    }

    /// Inject the constant fields, overwriting same-named fields.
    pub fn inject_constants(&self, doc: &mut Document) {
        for (name, value) in &self.constants {
            doc.insert(name.clone(), value.clone());
        }
    }
}

/// Speculatively parse a constant-field value.
///
/// Fixed precedence: date with offset, date without offset, i16, i32, i64,
/// and finally the raw string.
pub fn parse_constant_value(raw: &str) -> FieldValue {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return FieldValue::DateTimeOffset(dt);
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, format) {
            return FieldValue::DateTime(dt);
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        if let Some(dt) = date.and_hms_opt(0, 0, 0) {
            return FieldValue::DateTime(dt);
        }
    }
    if let Ok(v) = raw.parse::<i16>() {
        return FieldValue::Int16(v);
    }
    if let Ok(v) = raw.parse::<i32>() {
        return FieldValue::Int32(v);
    }
    if let Ok(v) = raw.parse::<i64>() {
        return FieldValue::Int64(v);
    }
    FieldValue::String(raw.to_string())
}
