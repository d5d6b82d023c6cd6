//! Error types for KidSchedule
//!
//! All errors use thiserror for structured error handling.
//! These errors can be serialized to a frontend as their display string.

use crate::schedule::TimeOfDay;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// End time is not after start time
    #[error("End time must be after start time ({start} >= {end})")]
    InvalidRange { start: TimeOfDay, end: TimeOfDay },

    /// Candidate slot overlaps an existing slot on the same day
    #[error("Time conflict with {class_name} ({start}-{end})")]
    Conflict {
        slot_id: String,
        class_name: String,
        start: TimeOfDay,
        end: TimeOfDay,
    },

    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    #[error("Invalid time value: {0}")]
    InvalidTime(String),

    #[error("Invalid asset path: {0}")]
    InvalidPath(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Kid not found: {0}")]
    KidNotFound(String),

    #[error("Class template not found: {0}")]
    TemplateNotFound(String),

    #[error("Schedule slot not found: {0}")]
    SlotNotFound(String),

    #[error("Image generation failed: {0}")]
    Generation(String),

    #[error("{0}")]
    Generic(String),
}

impl serde::Serialize for AppError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
