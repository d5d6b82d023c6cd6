//! Application configuration constants
//!
//! Central location for storage keys, asset conventions, locale defaults
//! and validation boundaries used throughout the application.

// ===== Document Store =====

/// Key of the single persisted AppDocument record
pub const DOCUMENT_KEY: &str = "main_data";

/// Schema version written with every saved document.
/// Version 1 is the original layout (`language`, inline image data).
pub const DOCUMENT_SCHEMA_VERSION: i64 = 2;

/// Prefix for copies of unreadable or partially decoded records
pub const QUARANTINE_KEY_PREFIX: &str = "main_data.quarantine.";

/// SQLite database file name inside the data directory
pub const DATABASE_FILE_NAME: &str = "kidschedule.db";

// ===== Media Cache =====

/// Directory (inside the data directory) that holds cached images
pub const MEDIA_DIR_NAME: &str = "media";

/// Asset path prefix for every cached item image
pub const IMAGE_ASSET_PREFIX: &str = "/images/assets/";

/// Fixed extension of cached item images
pub const IMAGE_EXTENSION: &str = "jpg";

/// Separator that replaces whitespace runs in derived asset names
pub const IMAGE_NAME_SEPARATOR: char = '-';

/// Content type used when a generator does not report one
pub const DEFAULT_IMAGE_CONTENT_TYPE: &str = "image/png";

// ===== Locale =====

/// Locale used for new documents and for documents that predate the field
pub const DEFAULT_LOCALE: &str = "en";

/// Display languages offered by the app
pub const SUPPORTED_LOCALES: &[&str] = &["en", "he", "ar", "es", "fr", "de", "zh", "ja"];

// ===== Items =====

/// Marker that turns an item into a book; compared case-insensitively
pub const BOOK_PREFIX: &str = "book:";

/// Class name shown when a conflicting slot's template no longer exists
pub const UNKNOWN_CLASS_NAME: &str = "another class";

// ===== Validation Limits =====

/// Maximum length for kid, template and teacher names
pub const MAX_NAME_LENGTH: usize = 100;

/// Maximum accepted age (guards against typos like 77 for 7)
pub const MAX_KID_AGE: u32 = 25;

/// Maximum number of items a single template may require
pub const MAX_ITEMS_PER_TEMPLATE: usize = 50;

// ===== Settings =====

/// Settings file name inside the data directory
pub const SETTINGS_FILE_NAME: &str = "settings.json";

/// Default image model requested from the generator
pub const DEFAULT_IMAGE_MODEL: &str = "gemini-2.5-flash-image";

/// Default generator endpoint base URL
pub const DEFAULT_IMAGE_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Timeout for a single generation request in seconds
pub const GENERATION_TIMEOUT_SECS: u64 = 60;
