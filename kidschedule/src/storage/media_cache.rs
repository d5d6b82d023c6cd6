//! Path-addressed media cache
//!
//! Stores item images under asset paths derived from the item name.
//! Example: "Book: The Hobbit" is stored at
//! "/images/assets/book%3A-the-hobbit.jpg", which maps to
//! "<root>/images/assets/book%3A-the-hobbit.jpg" on disk.
//!
//! Each image has a JSON sidecar with its content type and SHA-256 checksum.
//! The cache is best-effort: a missing, unreadable or corrupted entry reads
//! as absent rather than as an error.

use crate::config::{
    DEFAULT_IMAGE_CONTENT_TYPE, IMAGE_ASSET_PREFIX, IMAGE_EXTENSION, IMAGE_NAME_SEPARATOR,
};
use crate::error::{AppError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use uuid::Uuid;

const META_SUFFIX: &str = ".meta.json";
const TEMP_SUFFIX: &str = ".tmp";

/// Map an item name to its asset path.
///
/// Lowercases, collapses whitespace runs to `-`, percent-encodes and adds the
/// fixed extension. Names that differ only in case or spacing share a path.
pub fn derive_path(item_name: &str) -> String {
    let separator = IMAGE_NAME_SEPARATOR.to_string();
    let normalized = item_name
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(&separator);

    format!(
        "{}{}.{}",
        IMAGE_ASSET_PREFIX,
        urlencoding::encode(&normalized),
        IMAGE_EXTENSION
    )
}

/// Image bytes read back from the cache
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedImage {
    pub path: String,
    pub bytes: Vec<u8>,
    pub content_type: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct BlobMeta {
    content_type: String,
    size: u64,
    sha256: String,
    stored_at: DateTime<Utc>,
}

/// Media cache rooted at a directory
#[derive(Clone)]
pub struct MediaCache {
    root: PathBuf,
    /// Keeps each entry's data and sidecar renames paired
    write_lock: Arc<Mutex<()>>,
}

impl MediaCache {
    /// Create a new media cache at the given root directory
    pub fn new(root: PathBuf) -> Self {
        Self {
            root,
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Initialize the cache (create directories if needed)
    pub async fn initialize(&self) -> Result<()> {
        fs::create_dir_all(self.assets_dir()).await?;
        tracing::info!("Media cache initialized at: {:?}", self.root);
        Ok(())
    }

    /// Store bytes under `path`, replacing anything already there
    pub async fn put(&self, path: &str, data: &[u8], content_type: &str) -> Result<()> {
        let file_path = self.file_path(path)?;
        let meta_path = meta_path_for(&file_path);

        if let Some(parent) = file_path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let meta = BlobMeta {
            content_type: content_type.to_string(),
            size: data.len() as u64,
            sha256: calculate_hash(data),
            stored_at: Utc::now(),
        };
        let meta_json = serde_json::to_vec_pretty(&meta)?;

        // Stage under names unique to this write, then rename into place
        let staging = format!(".{}{}", Uuid::new_v4().simple(), TEMP_SUFFIX);
        let temp_data = with_suffix(&file_path, &staging);
        let temp_meta = with_suffix(&meta_path, &staging);

        let staged = async {
            write_synced(&temp_data, data).await?;
            write_synced(&temp_meta, &meta_json).await
        }
        .await;
        if let Err(e) = staged {
            discard(&temp_data).await;
            discard(&temp_meta).await;
            return Err(e);
        }

        let _guard = self.write_lock.lock().await;
        fs::rename(&temp_data, &file_path).await?;
        fs::rename(&temp_meta, &meta_path).await?;

        tracing::debug!("Cached image: {} ({} bytes)", path, data.len());

        Ok(())
    }

    /// Read an image back, or `None` if it is not (or no longer) available
    pub async fn get(&self, path: &str) -> Option<CachedImage> {
        let file_path = match self.file_path(path) {
            Ok(p) => p,
            Err(e) => {
                tracing::debug!("Not a cache path: {}", e);
                return None;
            }
        };

        let bytes = match fs::read(&file_path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                tracing::warn!("Failed to read cached image {}: {}", path, e);
                return None;
            }
        };

        let content_type = match self.read_meta(&file_path).await {
            Some(meta) => {
                if meta.sha256 != calculate_hash(&bytes) {
                    tracing::warn!("Checksum mismatch for cached image {}; treating as absent", path);
                    return None;
                }
                meta.content_type
            }
            None => {
                tracing::debug!("No metadata for cached image {}", path);
                DEFAULT_IMAGE_CONTENT_TYPE.to_string()
            }
        };

        tracing::debug!("Read cached image: {} ({} bytes)", path, bytes.len());

        Some(CachedImage {
            path: path.to_string(),
            bytes,
            content_type,
        })
    }

    /// Delete an entry and its metadata
    pub async fn delete(&self, path: &str) -> Result<()> {
        let file_path = self.file_path(path)?;
        let _guard = self.write_lock.lock().await;

        for target in [meta_path_for(&file_path), file_path] {
            match fs::remove_file(&target).await {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }

        tracing::debug!("Deleted cached image: {}", path);

        Ok(())
    }

    /// List the asset paths of every cached image
    pub async fn list_all(&self) -> Result<Vec<String>> {
        let dir = self.assets_dir();
        if !fs::try_exists(&dir).await? {
            return Ok(Vec::new());
        }

        let mut paths = Vec::new();
        let mut entries = fs::read_dir(&dir).await?;

        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_file() {
                continue;
            }
            let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                continue;
            };
            if name.ends_with(META_SUFFIX) || name.ends_with(TEMP_SUFFIX) {
                continue;
            }
            paths.push(format!("{}{}", IMAGE_ASSET_PREFIX, name));
        }

        paths.sort();
        Ok(paths)
    }

    /// Remove every cached image
    pub async fn clear(&self) -> Result<usize> {
        let paths = self.list_all().await?;
        for path in &paths {
            self.delete(path).await?;
        }

        tracing::info!("Cleared {} cached images", paths.len());
        Ok(paths.len())
    }

    /// Get media cache root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn assets_dir(&self) -> PathBuf {
        let relative = IMAGE_ASSET_PREFIX.trim_matches('/');
        relative
            .split('/')
            .fold(self.root.clone(), |dir, segment| dir.join(segment))
    }

    /// Resolve an asset path to a file inside the cache root.
    /// Only single-segment names directly under the asset prefix are accepted.
    fn file_path(&self, path: &str) -> Result<PathBuf> {
        let name = path
            .strip_prefix(IMAGE_ASSET_PREFIX)
            .ok_or_else(|| AppError::InvalidPath(path.to_string()))?;

        let valid = !name.is_empty()
            && name != "."
            && name != ".."
            && !name.contains(['/', '\\', '\0'])
            && !name.ends_with(META_SUFFIX)
            && !name.ends_with(TEMP_SUFFIX);
        if !valid {
            return Err(AppError::InvalidPath(path.to_string()));
        }

        Ok(self.assets_dir().join(name))
    }

    async fn read_meta(&self, file_path: &Path) -> Option<BlobMeta> {
        let raw = fs::read(meta_path_for(file_path)).await.ok()?;
        match serde_json::from_slice(&raw) {
            Ok(meta) => Some(meta),
            Err(e) => {
                tracing::warn!("Unreadable metadata for {:?}: {}", file_path, e);
                None
            }
        }
    }
}

fn meta_path_for(file_path: &Path) -> PathBuf {
    with_suffix(file_path, META_SUFFIX)
}

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut os = path.as_os_str().to_os_string();
    os.push(suffix);
    PathBuf::from(os)
}

async fn discard(path: &Path) {
    if let Err(e) = fs::remove_file(path).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            tracing::warn!("Failed to remove staging file {:?}: {}", path, e);
        }
    }
}

async fn write_synced(path: &Path, data: &[u8]) -> Result<()> {
    let mut file = fs::File::create(path).await?;
    file.write_all(data).await?;
    file.sync_all().await?;
    Ok(())
}

/// Calculate SHA-256 hash of data
fn calculate_hash(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    format!("{:x}", hasher.finalize())
}
