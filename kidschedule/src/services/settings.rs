//! Runtime settings
//!
//! Stored as `settings.json` in the data directory.
//! Every field has a serde default so older settings files keep loading.

use crate::config::{DEFAULT_IMAGE_ENDPOINT, DEFAULT_IMAGE_MODEL, SETTINGS_FILE_NAME};
use crate::error::{AppError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tokio::fs;

/// Item image generation configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageGenerationSettings {
    /// Whether missing item images are generated at all
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_image_model")]
    pub model: String,
    #[serde(default = "default_image_endpoint")]
    pub endpoint: String,
    /// Without a key no generator is configured and items keep their placeholder
    #[serde(default)]
    pub api_key: Option<String>,
}

fn default_true() -> bool {
    true
}

fn default_image_model() -> String {
    DEFAULT_IMAGE_MODEL.to_string()
}

fn default_image_endpoint() -> String {
    DEFAULT_IMAGE_ENDPOINT.to_string()
}

impl Default for ImageGenerationSettings {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            model: default_image_model(),
            endpoint: default_image_endpoint(),
            api_key: None,
        }
    }
}

impl ImageGenerationSettings {
    /// API key if generation is enabled and a non-blank key is set
    pub fn active_api_key(&self) -> Option<&str> {
        if !self.enabled {
            return None;
        }
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
    }
}

/// Application settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct AppSettings {
    #[serde(default)]
    pub image_generation: ImageGenerationSettings,
}

/// Service for managing application settings
#[derive(Clone)]
pub struct SettingsService {
    settings_path: PathBuf,
}

impl SettingsService {
    pub fn new(app_data_dir: PathBuf) -> Self {
        Self {
            settings_path: app_data_dir.join(SETTINGS_FILE_NAME),
        }
    }

    /// Read `settings.json`, writing the defaults first if it does not exist yet
    pub async fn load(&self) -> Result<AppSettings> {
        match fs::read_to_string(&self.settings_path).await {
            Ok(content) => serde_json::from_str(&content).map_err(|e| {
                AppError::Validation(format!("{:?} is not valid settings JSON: {}", self.settings_path, e))
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!("No settings at {:?}; writing defaults", self.settings_path);
                let defaults = AppSettings::default();
                self.save(&defaults).await?;
                Ok(defaults)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Replace the settings file. The new content is written next to it and
    /// renamed over it, so readers never see a half-written file.
    pub async fn save(&self, settings: &AppSettings) -> Result<()> {
        let content = serde_json::to_vec_pretty(settings)?;

        let staging = self.settings_path.with_extension("json.tmp");
        fs::write(&staging, &content).await?;
        fs::rename(&staging, &self.settings_path).await?;

        tracing::debug!("Wrote {} bytes of settings", content.len());
        Ok(())
    }

    pub async fn get_image_generation(&self) -> Result<ImageGenerationSettings> {
        Ok(self.load().await?.image_generation)
    }

    /// Swap in new image generation settings. Takes effect on next startup.
    pub async fn update_image_generation(&self, image_generation: ImageGenerationSettings) -> Result<()> {
        // An unreadable file is replaced rather than blocking the change
        let mut settings = self.load().await.unwrap_or_default();
        settings.image_generation = image_generation;
        self.save(&settings).await?;
        tracing::info!("Image generation settings updated");
        Ok(())
    }
}
