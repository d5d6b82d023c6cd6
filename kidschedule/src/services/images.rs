//! Item images service
//!
//! Keeps the document's image reference map and the media cache in step.
//! Writes go to the cache first and the document second, so a crash in
//! between leaves an unreferenced cache entry rather than a reference to
//! nothing. Readers treat any gap as "no image yet".

use crate::config::DEFAULT_IMAGE_CONTENT_TYPE;
use crate::error::{AppError, Result};
use crate::schedule::display_name;
use crate::services::documents::DocumentHandle;
use crate::services::generator::{prompt_for, ImageGenerator};
use crate::storage::{derive_path, CachedImage, MediaCache};
use base64::Engine;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Service for resolving, storing and generating item images
#[derive(Clone)]
pub struct ImagesService {
    documents: DocumentHandle,
    cache: MediaCache,
    generator: Option<Arc<dyn ImageGenerator>>,
    in_flight: Arc<Mutex<HashSet<String>>>,
}

impl ImagesService {
    pub fn new(
        documents: DocumentHandle,
        cache: MediaCache,
        generator: Option<Arc<dyn ImageGenerator>>,
    ) -> Self {
        Self {
            documents,
            cache,
            generator,
            in_flight: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    /// Image for an item, or `None` if there is no reference or no cached bytes
    pub async fn resolve(&self, item_name: &str) -> Option<CachedImage> {
        let path = self
            .documents
            .read(|doc| doc.image_map.get(item_name).cloned())
            .await?;

        let image = self.cache.get(&path).await;
        if image.is_none() {
            tracing::debug!("Image reference for {:?} has no cached bytes", item_name);
        }
        image
    }

    /// Fallback glyph shown while an item has no image
    pub fn placeholder(item_name: &str) -> String {
        display_name(item_name)
            .trim()
            .chars()
            .next()
            .map(|c| c.to_uppercase().collect())
            .unwrap_or_else(|| "?".to_string())
    }

    /// Cache image bytes for an item and record the reference in the document
    pub async fn store(&self, item_name: &str, data: &[u8], content_type: &str) -> Result<String> {
        tracing::info!("Storing image for {:?} ({} bytes)", item_name, data.len());

        let path = derive_path(item_name);
        self.cache.put(&path, data, content_type).await?;
        self.link(item_name, &path).await?;

        Ok(path)
    }

    /// Generate and store an image for an item that has none.
    ///
    /// Safe to call repeatedly: an item that already resolves is returned as
    /// is, and a request already running for the same item is not repeated.
    /// Failures are logged and yield `None`.
    pub async fn request_generation(&self, item_name: &str) -> Option<String> {
        if let Some(path) = self.resolvable_path(item_name).await {
            return Some(path);
        }

        // Bytes may already be cached under the derived path (a crash after
        // the cache write, or another name sharing the path). Entries that
        // fail their checksum do not count and get regenerated.
        let derived = derive_path(item_name);
        if self.cache.get(&derived).await.is_some() {
            return match self.link(item_name, &derived).await {
                Ok(()) => {
                    tracing::info!("Relinked cached image for {:?}", item_name);
                    Some(derived)
                }
                Err(e) => {
                    tracing::warn!("Failed to relink image for {:?}: {}", item_name, e);
                    None
                }
            };
        }

        let Some(generator) = self.generator.clone() else {
            tracing::debug!("No image generator configured; {:?} keeps its placeholder", item_name);
            return None;
        };

        if !self.in_flight.lock().await.insert(item_name.to_string()) {
            tracing::debug!("Generation already in flight for {:?}", item_name);
            return None;
        }

        let result = self.generate_and_store(generator.as_ref(), item_name).await;
        self.in_flight.lock().await.remove(item_name);

        match result {
            Ok(path) => Some(path),
            Err(e) => {
                tracing::warn!("Image generation for {:?} failed: {}", item_name, e);
                None
            }
        }
    }

    /// Request images for every item that does not resolve yet, one at a time.
    /// Returns how many items ended up with an image.
    pub async fn ensure_images(&self, items: &[String]) -> usize {
        let mut resolved = 0;
        for item in items {
            if item.trim().is_empty() {
                continue;
            }
            if self.request_generation(item).await.is_some() {
                resolved += 1;
            }
        }
        resolved
    }

    /// Move inline `data:` URLs left by older versions into the cache.
    /// Returns the number of references rewritten.
    pub async fn migrate_inline_images(&self) -> Result<usize> {
        let inline: Vec<(String, String)> = self
            .documents
            .read(|doc| {
                doc.image_map
                    .iter()
                    .filter(|(_, reference)| reference.starts_with("data:"))
                    .map(|(name, reference)| (name.clone(), reference.clone()))
                    .collect()
            })
            .await;

        if inline.is_empty() {
            return Ok(0);
        }

        tracing::info!("Migrating {} inline images into the media cache", inline.len());

        let mut rewritten = Vec::new();
        for (name, reference) in inline {
            let (content_type, data) = match parse_data_url(&reference) {
                Ok(parsed) => parsed,
                Err(e) => {
                    tracing::warn!("Leaving unreadable inline image for {:?}: {}", name, e);
                    continue;
                }
            };

            let path = derive_path(&name);
            self.cache.put(&path, &data, &content_type).await?;
            rewritten.push((name, path));
        }

        let count = rewritten.len();
        self.documents
            .update(|doc| {
                for (name, path) in rewritten {
                    doc.image_map.insert(name, path);
                }
                Ok(())
            })
            .await?;

        tracing::info!("Migrated {} inline images", count);
        Ok(count)
    }

    /// Delete cache entries that no reference points to.
    /// Returns the number of entries removed.
    pub async fn prune_orphans(&self) -> Result<usize> {
        let referenced: HashSet<String> = self
            .documents
            .read(|doc| doc.image_map.values().cloned().collect())
            .await;

        let mut removed = 0;
        for path in self.cache.list_all().await? {
            if !referenced.contains(&path) {
                self.cache.delete(&path).await?;
                removed += 1;
            }
        }

        if removed > 0 {
            tracing::info!("Pruned {} orphaned cached images", removed);
        }
        Ok(removed)
    }

    pub fn cache(&self) -> &MediaCache {
        &self.cache
    }

    async fn resolvable_path(&self, item_name: &str) -> Option<String> {
        let path = self
            .documents
            .read(|doc| doc.image_map.get(item_name).cloned())
            .await?;

        self.cache.get(&path).await.map(|image| image.path)
    }

    async fn link(&self, item_name: &str, path: &str) -> Result<()> {
        self.documents
            .update(|doc| {
                doc.image_map.insert(item_name.to_string(), path.to_string());
                Ok(())
            })
            .await
    }

    async fn generate_and_store(&self, generator: &dyn ImageGenerator, item_name: &str) -> Result<String> {
        let prompt = prompt_for(item_name);
        tracing::info!("Generating image for {:?}", item_name);

        let image = generator.generate(&prompt).await?;
        if image.bytes.is_empty() {
            return Err(AppError::Generation("generator returned no bytes".to_string()));
        }

        self.store(item_name, &image.bytes, &image.content_type).await
    }
}

/// Split a `data:<mime>;base64,<payload>` URL into content type and bytes
fn parse_data_url(url: &str) -> Result<(String, Vec<u8>)> {
    let rest = url
        .strip_prefix("data:")
        .ok_or_else(|| AppError::Validation("not a data URL".to_string()))?;
    let (header, payload) = rest
        .split_once(',')
        .ok_or_else(|| AppError::Validation("data URL has no payload".to_string()))?;
    let mime = header
        .strip_suffix(";base64")
        .ok_or_else(|| AppError::Validation("data URL is not base64".to_string()))?;

    let data = base64::engine::general_purpose::STANDARD
        .decode(payload.trim())
        .map_err(|e| AppError::Validation(format!("invalid base64: {}", e)))?;

    let content_type = if mime.is_empty() {
        DEFAULT_IMAGE_CONTENT_TYPE.to_string()
    } else {
        mime.to_string()
    };

    Ok((content_type, data))
}
