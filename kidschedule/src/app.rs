//! Application state and initialization
//!
//! This module manages the central application state and lifecycle.
//! All services are initialized here and made available through AppState.

use crate::config::{DATABASE_FILE_NAME, MEDIA_DIR_NAME};
use crate::database::{create_memory_pool, create_pool, Repository};
use crate::error::Result;
use crate::services::{
    DocumentHandle, DocumentStore, GeminiImageGenerator, HouseholdService, ImageGenerator,
    ImagesService, SettingsService,
};
use crate::storage::MediaCache;
use std::path::PathBuf;
use std::sync::Arc;

/// Central application state holding all services
#[derive(Clone)]
pub struct AppState {
    pub app_data_dir: PathBuf,
    pub settings: SettingsService,
    pub documents: DocumentHandle,
    pub media: MediaCache,
    pub images: ImagesService,
    pub household: HouseholdService,
}

/// Application setup - called once on startup.
///
/// The image generator is built from `settings.json`; an unreadable settings
/// file falls back to defaults, which leaves generation off.
pub async fn setup(app_data_dir: PathBuf) -> Result<AppState> {
    tokio::fs::create_dir_all(&app_data_dir).await?;

    let settings = SettingsService::new(app_data_dir.clone());
    let image_settings = match settings.get_image_generation().await {
        Ok(s) => s,
        Err(e) => {
            tracing::warn!("Using default settings: {}", e);
            Default::default()
        }
    };

    let generator: Option<Arc<dyn ImageGenerator>> =
        match GeminiImageGenerator::from_settings(&image_settings)? {
            Some(g) => {
                tracing::info!("Image generation enabled with model {}", image_settings.model);
                Some(Arc::new(g))
            }
            None => {
                tracing::info!("Image generation not configured; items use placeholders");
                None
            }
        };

    setup_with(app_data_dir, generator).await
}

/// Build the application state with an explicit generator (or none)
pub async fn setup_with(
    app_data_dir: PathBuf,
    generator: Option<Arc<dyn ImageGenerator>>,
) -> Result<AppState> {
    tracing::info!("Initializing application");
    tracing::info!("App data directory: {:?}", app_data_dir);

    tokio::fs::create_dir_all(&app_data_dir).await?;

    let pool = match create_pool(&app_data_dir.join(DATABASE_FILE_NAME)).await {
        Ok(pool) => pool,
        Err(e) => {
            tracing::error!("Failed to open database: {}", e);
            create_memory_pool().await?
        }
    };

    let media = MediaCache::new(app_data_dir.join(MEDIA_DIR_NAME));
    media.initialize().await?;

    let store = DocumentStore::new(Repository::new(pool));
    let documents = DocumentHandle::open(store).await;

    let images = ImagesService::new(documents.clone(), media.clone(), generator);
    if let Err(e) = images.migrate_inline_images().await {
        tracing::warn!("Inline image migration incomplete: {}", e);
    }

    let household = HouseholdService::new(documents.clone(), images.clone());

    tracing::info!("Application initialized successfully");

    Ok(AppState {
        settings: SettingsService::new(app_data_dir.clone()),
        app_data_dir,
        documents,
        media,
        images,
        household,
    })
}
