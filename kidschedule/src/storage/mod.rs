//! Storage module
//!
//! Provides the media cache for item images, kept separate from the
//! document database.

pub mod media_cache;

pub use media_cache::{derive_path, CachedImage, MediaCache};
