//! Database models
//!
//! Rust structs representing the persisted household document.
//! All models use serde with camelCase field names, matching the stored JSON.

use crate::config::DEFAULT_LOCALE;
use crate::schedule::{DayOfWeek, TimeOfDay};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::collections::BTreeMap;

/// A reusable class definition referenced by schedule slots
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassTemplate {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub teacher: String,
    /// Item names; a `book:` prefix marks a book
    #[serde(default)]
    pub items_to_bring: Vec<String>,
}

/// One weekly occurrence of a class for a kid
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleSlot {
    pub id: String,
    /// Non-owning reference; the template may have been deleted
    pub template_id: String,
    pub day_of_week: DayOfWeek,
    pub start_time: TimeOfDay,
    pub end_time: TimeOfDay,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Kid {
    pub id: String,
    pub name: String,
    pub age: u32,
    #[serde(default)]
    pub grade: String,
    #[serde(default)]
    pub schedule: Vec<ScheduleSlot>,
}

/// The single root aggregate persisted per installation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppDocument {
    #[serde(default)]
    pub kids: Vec<Kid>,
    #[serde(default)]
    pub templates: Vec<ClassTemplate>,
    /// Item name -> media cache path
    #[serde(default)]
    pub image_map: BTreeMap<String, String>,
    #[serde(default = "default_locale", alias = "language")]
    pub locale: String,
}

fn default_locale() -> String {
    DEFAULT_LOCALE.to_string()
}

impl Default for AppDocument {
    fn default() -> Self {
        Self {
            kids: Vec::new(),
            templates: Vec::new(),
            image_map: BTreeMap::new(),
            locale: default_locale(),
        }
    }
}

impl AppDocument {
    pub fn kid(&self, id: &str) -> Option<&Kid> {
        self.kids.iter().find(|k| k.id == id)
    }

    pub fn kid_mut(&mut self, id: &str) -> Option<&mut Kid> {
        self.kids.iter_mut().find(|k| k.id == id)
    }

    pub fn template(&self, id: &str) -> Option<&ClassTemplate> {
        self.templates.iter().find(|t| t.id == id)
    }
}

/// Raw persisted record as stored in the `documents` table
#[derive(Debug, Clone, FromRow)]
pub struct StoredRecord {
    pub key: String,
    pub body: String,
    pub schema_version: i64,
    pub updated_at: DateTime<Utc>,
}

/// Create kid request
#[derive(Debug, Clone, Deserialize)]
pub struct CreateKidRequest {
    pub name: String,
    pub age: u32,
    #[serde(default)]
    pub grade: String,
}

/// Update kid request
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateKidRequest {
    pub id: String,
    pub name: Option<String>,
    pub age: Option<u32>,
    pub grade: Option<String>,
}

/// Create or edit a class template (`id: None` creates)
#[derive(Debug, Clone, Deserialize)]
pub struct SaveTemplateRequest {
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub teacher: String,
    #[serde(default)]
    pub items: Vec<String>,
}

/// Create or edit a schedule slot (`id: None` creates)
#[derive(Debug, Clone, Deserialize)]
pub struct SaveSlotRequest {
    pub id: Option<String>,
    pub template_id: String,
    pub day_of_week: DayOfWeek,
    pub start_time: TimeOfDay,
    pub end_time: TimeOfDay,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_json_field_names() {
        let mut doc = AppDocument::default();
        doc.image_map
            .insert("Ruler".to_string(), "/images/assets/ruler.jpg".to_string());
        doc.kids.push(Kid {
            id: "k1".to_string(),
            name: "Leo".to_string(),
            age: 8,
            grade: "3rd".to_string(),
            schedule: vec![ScheduleSlot {
                id: "s1".to_string(),
                template_id: "t1".to_string(),
                day_of_week: DayOfWeek::Monday,
                start_time: "08:00".parse().unwrap(),
                end_time: "09:00".parse().unwrap(),
            }],
        });

        let json = serde_json::to_value(&doc).unwrap();
        assert_eq!(json["locale"], "en");
        assert_eq!(json["imageMap"]["Ruler"], "/images/assets/ruler.jpg");
        let slot = &json["kids"][0]["schedule"][0];
        assert_eq!(slot["templateId"], "t1");
        assert_eq!(slot["dayOfWeek"], "Monday");
        assert_eq!(slot["startTime"], "08:00");
    }

    #[test]
    fn test_language_alias_and_defaults() {
        let doc: AppDocument = serde_json::from_str(r#"{"language":"he"}"#).unwrap();
        assert_eq!(doc.locale, "he");
        assert!(doc.kids.is_empty());
        assert!(doc.image_map.is_empty());
    }
}
