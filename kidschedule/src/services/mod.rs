//! Services module
//!
//! Business logic services that coordinate the document, the media cache
//! and the image generator.

pub mod documents;
pub mod generator;
pub mod household;
pub mod images;
pub mod settings;

pub use documents::{DocumentHandle, DocumentStore};
pub use generator::{GeminiImageGenerator, GeneratedImage, ImageGenerator};
pub use household::{HouseholdService, KidPackingList};
pub use images::ImagesService;
pub use settings::{AppSettings, ImageGenerationSettings, SettingsService};
