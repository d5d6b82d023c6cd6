//! Schema-versioned decoding of the stored document
//!
//! The stored JSON is never assumed to match the current types. Each
//! top-level field is decoded on its own and defaults when missing, and a
//! malformed kid, slot or template is dropped without losing its siblings.
//!
//! Versions:
//! - 1: original layout (`language` instead of `locale`, inline image data)
//! - 2: current layout

use super::models::{AppDocument, ClassTemplate, Kid, ScheduleSlot};
use crate::config::{DEFAULT_LOCALE, DOCUMENT_SCHEMA_VERSION, SUPPORTED_LOCALES};
use crate::error::{AppError, Result};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Result of decoding a stored body
#[derive(Debug, Clone)]
pub struct DecodedDocument {
    pub document: AppDocument,
    /// Number of entries (kids, slots, templates, image references) that could not be read
    pub dropped: usize,
    /// Top-level fields that were absent and took their default
    pub defaulted: Vec<&'static str>,
    pub stored_version: i64,
}

impl DecodedDocument {
    /// The raw body holds data the decoded document does not, so it must be
    /// preserved before the next save overwrites it.
    pub fn needs_quarantine(&self) -> bool {
        self.dropped > 0 || self.stored_version > DOCUMENT_SCHEMA_VERSION
    }
}

/// Decode a stored document body written with `stored_version`.
///
/// # Errors
/// Returns an error only when the body is not a JSON object at all.
pub fn decode_document(body: &str, stored_version: i64) -> Result<DecodedDocument> {
    let value: Value = serde_json::from_str(body)?;
    let Value::Object(mut root) = value else {
        return Err(AppError::Validation(
            "Stored document is not a JSON object".to_string(),
        ));
    };

    if stored_version < DOCUMENT_SCHEMA_VERSION {
        tracing::info!(
            "Upgrading stored document from schema v{} to v{}",
            stored_version,
            DOCUMENT_SCHEMA_VERSION
        );
    } else if stored_version > DOCUMENT_SCHEMA_VERSION {
        tracing::warn!(
            "Stored document has newer schema v{} (current v{}); unknown fields will be kept in quarantine",
            stored_version,
            DOCUMENT_SCHEMA_VERSION
        );
    }

    let mut dropped = 0;
    let mut defaulted = Vec::new();

    let kids = match take_field(&mut root, "kids", &mut defaulted) {
        Some(value) => decode_list(value, "kid", &mut dropped, decode_kid),
        None => Vec::new(),
    };

    let templates = match take_field(&mut root, "templates", &mut defaulted) {
        Some(value) => decode_list(value, "template", &mut dropped, |v, _| {
            decode_entry::<ClassTemplate>(v)
        }),
        None => Vec::new(),
    };

    let image_map = match take_field(&mut root, "imageMap", &mut defaulted) {
        Some(value) => decode_image_map(value, &mut dropped),
        None => BTreeMap::new(),
    };

    // v1 documents called this field `language`
    let locale_value = match root.remove("locale").filter(|v| !v.is_null()) {
        Some(value) => Some(value),
        None => root.remove("language").filter(|v| !v.is_null()),
    };
    let locale = match locale_value {
        Some(value) => decode_locale(value),
        None => {
            defaulted.push("locale");
            DEFAULT_LOCALE.to_string()
        }
    };

    if !defaulted.is_empty() {
        tracing::info!("Defaulted missing document fields: {:?}", defaulted);
    }

    Ok(DecodedDocument {
        document: AppDocument {
            kids,
            templates,
            image_map,
            locale,
        },
        dropped,
        defaulted,
        stored_version,
    })
}

fn take_field(
    root: &mut Map<String, Value>,
    name: &'static str,
    defaulted: &mut Vec<&'static str>,
) -> Option<Value> {
    match root.remove(name) {
        Some(Value::Null) | None => {
            defaulted.push(name);
            None
        }
        Some(value) => Some(value),
    }
}

fn decode_entry<T: DeserializeOwned>(value: Value) -> std::result::Result<T, String> {
    serde_json::from_value(value).map_err(|e| e.to_string())
}

fn decode_list<T>(
    value: Value,
    what: &str,
    dropped: &mut usize,
    decode: impl Fn(Value, &mut usize) -> std::result::Result<T, String>,
) -> Vec<T> {
    let Value::Array(entries) = value else {
        tracing::warn!("Stored {} list is not an array; ignoring it", what);
        *dropped += 1;
        return Vec::new();
    };

    let mut decoded = Vec::with_capacity(entries.len());
    for (index, entry) in entries.into_iter().enumerate() {
        match decode(entry, dropped) {
            Ok(item) => decoded.push(item),
            Err(e) => {
                tracing::warn!("Dropping unreadable {} at index {}: {}", what, index, e);
                *dropped += 1;
            }
        }
    }
    decoded
}

/// Kids are decoded without their schedule first, so one bad slot only costs that slot.
fn decode_kid(value: Value, dropped: &mut usize) -> std::result::Result<Kid, String> {
    let Value::Object(mut fields) = value else {
        return Err("kid is not an object".to_string());
    };

    let schedule = fields.remove("schedule");
    let mut kid: Kid = decode_entry(Value::Object(fields))?;

    kid.schedule = match schedule {
        Some(Value::Null) | None => Vec::new(),
        Some(value) => decode_list(value, "slot", dropped, |v, _| {
            decode_entry::<ScheduleSlot>(v)
        }),
    };

    Ok(kid)
}

fn decode_image_map(value: Value, dropped: &mut usize) -> BTreeMap<String, String> {
    let Value::Object(entries) = value else {
        tracing::warn!("Stored image map is not an object; ignoring it");
        *dropped += 1;
        return BTreeMap::new();
    };

    let mut map = BTreeMap::new();
    for (name, reference) in entries {
        match reference {
            Value::String(reference) => {
                map.insert(name, reference);
            }
            _ => {
                tracing::warn!("Dropping non-string image reference for {:?}", name);
                *dropped += 1;
            }
        }
    }
    map
}

fn decode_locale(value: Value) -> String {
    match value {
        Value::String(code) if SUPPORTED_LOCALES.contains(&code.as_str()) => code,
        other => {
            tracing::warn!("Unsupported stored locale {}; using {}", other, DEFAULT_LOCALE);
            DEFAULT_LOCALE.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_object_defaults_everything() {
        let decoded = decode_document("{}", 2).unwrap();
        assert_eq!(decoded.document, AppDocument::default());
        assert_eq!(decoded.defaulted, vec!["kids", "templates", "imageMap", "locale"]);
        assert!(!decoded.needs_quarantine());
    }

    #[test]
    fn test_missing_locale_keeps_kids_and_templates() {
        let body = r#"{
            "kids": [{"id":"k1","name":"Leo","age":8,"grade":"3rd","schedule":[]}],
            "templates": [{"id":"t1","name":"Math","teacher":"Ms. Cohen","itemsToBring":["Calculator"]}],
            "imageMap": {}
        }"#;

        let decoded = decode_document(body, 2).unwrap();
        assert_eq!(decoded.document.locale, "en");
        assert_eq!(decoded.document.kids.len(), 1);
        assert_eq!(decoded.document.templates[0].items_to_bring, vec!["Calculator"]);
        assert_eq!(decoded.defaulted, vec!["locale"]);
    }

    #[test]
    fn test_v1_language_field_and_unpadded_times() {
        let body = r#"{
            "kids": [{"id":"k1","name":"Leo","age":8,"grade":"3rd","schedule":[
                {"id":"s1","templateId":"t1","dayOfWeek":"Sunday","startTime":"8:00","endTime":"9:30"}
            ]}],
            "templates": [],
            "imageMap": {"Ruler":"data:image/png;base64,AAAA"},
            "language": "he"
        }"#;

        let decoded = decode_document(body, 1).unwrap();
        let doc = decoded.document;
        assert_eq!(doc.locale, "he");
        assert_eq!(doc.kids[0].schedule[0].start_time.to_string(), "08:00");
        assert_eq!(doc.image_map["Ruler"], "data:image/png;base64,AAAA");
        assert_eq!(decoded.dropped, 0);
    }

    #[test]
    fn test_malformed_entries_are_dropped_individually() {
        let body = r#"{
            "kids": [
                {"id":"k1","name":"Leo","age":8,"schedule":[
                    {"id":"s1","templateId":"t1","dayOfWeek":"Monday","startTime":"08:00","endTime":"09:00"},
                    {"id":"s2","templateId":"t1","dayOfWeek":"Saturday","startTime":"08:00","endTime":"09:00"}
                ]},
                {"name":"No id"}
            ],
            "templates": "oops",
            "imageMap": {"Ruler": 42, "Pen": "/images/assets/pen.jpg"},
            "locale": "fr"
        }"#;

        let decoded = decode_document(body, 2).unwrap();
        let doc = &decoded.document;
        assert_eq!(doc.kids.len(), 1);
        assert_eq!(doc.kids[0].schedule.len(), 1);
        assert!(doc.templates.is_empty());
        assert_eq!(doc.image_map.len(), 1);
        assert_eq!(doc.locale, "fr");
        // bad slot, id-less kid, non-array templates, numeric reference
        assert_eq!(decoded.dropped, 4);
        assert!(decoded.needs_quarantine());
    }

    #[test]
    fn test_unsupported_locale_falls_back() {
        let decoded = decode_document(r#"{"locale":"xx"}"#, 2).unwrap();
        assert_eq!(decoded.document.locale, "en");
    }

    #[test]
    fn test_newer_schema_needs_quarantine() {
        let decoded = decode_document(r#"{"kids":[],"pets":[]}"#, 3).unwrap();
        assert!(decoded.needs_quarantine());
    }

    #[test]
    fn test_non_object_body_is_an_error() {
        assert!(decode_document("[1,2,3]", 2).is_err());
        assert!(decode_document("not json", 2).is_err());
    }
}
