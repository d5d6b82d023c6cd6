//! Document store
//!
//! Durable persistence of the single `AppDocument`, plus the handle through
//! which the rest of the app reads and mutates it.
//!
//! Every save writes the whole document; there is no partial update path.
//! Storage failures never take the app down: `load` treats them as "no
//! document" and a failed save leaves the in-memory copy marked dirty.
//! A stored record is never overwritten by defaults unless its raw body has
//! been copied aside first.

use crate::config::{DOCUMENT_KEY, DOCUMENT_SCHEMA_VERSION, QUARANTINE_KEY_PREFIX};
use crate::database::{decode_document, AppDocument, Repository};
use crate::error::{AppError, Result};
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Outcome of reading the stored record
enum Loaded {
    Absent,
    Document(AppDocument),
    /// The record exists but could not be used; `preserved` tells whether
    /// its raw body is safely quarantined
    Unusable { preserved: bool },
}

/// Whole-document persistence keyed by `DOCUMENT_KEY`
#[derive(Clone)]
pub struct DocumentStore {
    repo: Repository,
}

impl DocumentStore {
    pub fn new(repo: Repository) -> Self {
        Self { repo }
    }

    /// Load the persisted document.
    ///
    /// Returns `None` on first run, when storage is unavailable, or when the
    /// stored body is unreadable (after quarantining it).
    pub async fn load(&self) -> Option<AppDocument> {
        match self.load_record().await {
            Loaded::Document(document) => Some(document),
            Loaded::Absent | Loaded::Unusable { .. } => None,
        }
    }

    /// Load the document, or persist and return `default` if there is none.
    ///
    /// A record that exists but cannot be read is only replaced once its raw
    /// body is quarantined; otherwise `default` is returned without saving.
    /// A failed write still returns `default` so the session can continue.
    pub async fn initialize_if_absent(&self, default: AppDocument) -> AppDocument {
        match self.load_record().await {
            Loaded::Document(document) => return document,
            Loaded::Unusable { preserved: false } => {
                tracing::error!("Stored document could not be preserved; leaving it in place");
                return default;
            }
            Loaded::Absent | Loaded::Unusable { preserved: true } => {}
        }

        tracing::info!("Initializing new document");
        if let Err(e) = self.save(&default).await {
            tracing::error!("Failed to persist initial document: {}", e);
        }
        default
    }

    async fn load_record(&self) -> Loaded {
        let record = match self.repo.get_record(DOCUMENT_KEY).await {
            Ok(Some(record)) => record,
            Ok(None) => {
                tracing::info!("No stored document found");
                return Loaded::Absent;
            }
            Err(e) => {
                tracing::warn!("Stored document could not be read: {}", e);
                return Loaded::Unusable {
                    preserved: self.quarantine().await,
                };
            }
        };

        match decode_document(&record.body, record.schema_version) {
            Ok(decoded) => {
                if decoded.needs_quarantine() {
                    self.quarantine().await;
                }
                tracing::info!(
                    "Loaded document: {} kids, {} templates, {} image references",
                    decoded.document.kids.len(),
                    decoded.document.templates.len(),
                    decoded.document.image_map.len()
                );
                Loaded::Document(decoded.document)
            }
            Err(e) => {
                tracing::error!("Stored document is unreadable: {}", e);
                Loaded::Unusable {
                    preserved: self.quarantine().await,
                }
            }
        }
    }

    /// Fully overwrite the persisted document
    pub async fn save(&self, document: &AppDocument) -> Result<()> {
        let body = serde_json::to_string(document)?;

        self.repo
            .put_record(DOCUMENT_KEY, &body, DOCUMENT_SCHEMA_VERSION)
            .await
            .map_err(|e| AppError::StorageUnavailable(e.to_string()))?;

        tracing::debug!("Saved document ({} bytes)", body.len());
        Ok(())
    }

    /// Keys of quarantined copies, oldest first
    pub async fn quarantined(&self) -> Result<Vec<String>> {
        self.repo.list_keys(QUARANTINE_KEY_PREFIX).await
    }

    /// Copy the raw stored record aside before it gets overwritten.
    /// A body that is already quarantined is not copied again.
    /// Returns false only when the copy could not be made.
    async fn quarantine(&self) -> bool {
        let key = format!(
            "{}{}",
            QUARANTINE_KEY_PREFIX,
            Utc::now().format("%Y%m%dT%H%M%S%.6fZ")
        );

        match self
            .repo
            .copy_record(DOCUMENT_KEY, &key, QUARANTINE_KEY_PREFIX)
            .await
        {
            Ok(true) => {
                tracing::warn!("Preserved stored document as {}", key);
                true
            }
            Ok(false) => {
                tracing::debug!("Stored document already preserved");
                true
            }
            Err(e) => {
                tracing::error!("Failed to quarantine stored document: {}", e);
                false
            }
        }
    }
}

struct HandleState {
    document: AppDocument,
    dirty: bool,
}

/// Shared handle to the in-memory document.
///
/// All mutation goes through `update`, which serializes writers and persists
/// the whole document after each change.
#[derive(Clone)]
pub struct DocumentHandle {
    store: DocumentStore,
    state: Arc<Mutex<HandleState>>,
}

impl DocumentHandle {
    /// Load the stored document (or initialize an empty one) and wrap it
    pub async fn open(store: DocumentStore) -> Self {
        let document = store.initialize_if_absent(AppDocument::default()).await;
        Self::with_document(store, document)
    }

    pub fn with_document(store: DocumentStore, document: AppDocument) -> Self {
        Self {
            store,
            state: Arc::new(Mutex::new(HandleState {
                document,
                dirty: false,
            })),
        }
    }

    /// Copy of the current document
    pub async fn snapshot(&self) -> AppDocument {
        self.state.lock().await.document.clone()
    }

    /// Read from the current document without cloning it
    pub async fn read<T>(&self, f: impl FnOnce(&AppDocument) -> T) -> T {
        let state = self.state.lock().await;
        f(&state.document)
    }

    /// Apply a change to a copy of the document, persist it, then publish it.
    ///
    /// If `f` fails nothing changes. If persisting fails the change is still
    /// kept in memory, the handle is marked dirty and `StorageUnavailable`
    /// is returned; the next successful save writes it out.
    pub async fn update<T>(&self, f: impl FnOnce(&mut AppDocument) -> Result<T>) -> Result<T> {
        let mut state = self.state.lock().await;

        let mut next = state.document.clone();
        let value = f(&mut next)?;

        let saved = self.store.save(&next).await;
        state.document = next;

        match saved {
            Ok(()) => {
                state.dirty = false;
                Ok(value)
            }
            Err(e) => {
                tracing::error!("Document change kept in memory but not persisted: {}", e);
                state.dirty = true;
                Err(e)
            }
        }
    }

    /// Whether the in-memory document has changes that failed to persist
    pub async fn is_dirty(&self) -> bool {
        self.state.lock().await.dirty
    }

    /// Retry persisting a dirty document
    pub async fn flush(&self) -> Result<()> {
        let mut state = self.state.lock().await;
        if !state.dirty {
            return Ok(());
        }

        self.store.save(&state.document).await?;
        state.dirty = false;
        tracing::info!("Flushed pending document changes");
        Ok(())
    }

    /// Pretty JSON of the current document, as shown in the debug view
    pub async fn export_json(&self) -> Result<String> {
        let state = self.state.lock().await;
        Ok(serde_json::to_string_pretty(&state.document)?)
    }

    /// Discard all data and start over with an empty document.
    ///
    /// The save overwrites the stored record in one step. If it fails the
    /// empty document is still in effect and the handle is marked dirty.
    pub async fn reset(&self) -> Result<()> {
        let mut state = self.state.lock().await;

        state.document = AppDocument::default();
        let saved = self.store.save(&state.document).await;
        state.dirty = saved.is_err();
        saved?;

        tracing::warn!("Document reset to empty defaults");
        Ok(())
    }

    pub fn store(&self) -> &DocumentStore {
        &self.store
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::{initialize_database, ClassTemplate, Kid};
    use sqlx::sqlite::SqlitePoolOptions;
    use sqlx::SqlitePool;

    async fn create_test_pool() -> SqlitePool {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();

        initialize_database(&pool).await.unwrap();
        pool
    }

    async fn create_test_store() -> (DocumentStore, Repository) {
        let repo = Repository::new(create_test_pool().await);
        (DocumentStore::new(repo.clone()), repo)
    }

    fn sample_document() -> AppDocument {
        let mut doc = AppDocument::default();
        doc.locale = "es".to_string();
        doc.templates.push(ClassTemplate {
            id: "t1".to_string(),
            name: "Math".to_string(),
            teacher: "Mr. Levi".to_string(),
            items_to_bring: vec!["Calculator".to_string(), "book: Algebra".to_string()],
        });
        doc.kids.push(Kid {
            id: "k1".to_string(),
            name: "Leo".to_string(),
            age: 8,
            grade: "3rd".to_string(),
            schedule: Vec::new(),
        });
        doc.image_map.insert(
            "Calculator".to_string(),
            "/images/assets/calculator.jpg".to_string(),
        );
        doc
    }

    #[tokio::test]
    async fn test_load_absent_on_first_run() {
        let (store, _repo) = create_test_store().await;
        assert!(store.load().await.is_none());
    }

    #[tokio::test]
    async fn test_save_then_load_round_trip() {
        let (store, _repo) = create_test_store().await;
        let doc = sample_document();

        store.save(&doc).await.unwrap();

        assert_eq!(store.load().await.unwrap(), doc);
    }

    #[tokio::test]
    async fn test_initialize_if_absent_writes_default_once() {
        let (store, repo) = create_test_store().await;

        let first = store.initialize_if_absent(sample_document()).await;
        assert_eq!(first, sample_document());
        assert!(repo.get_record(DOCUMENT_KEY).await.unwrap().is_some());

        let second = store.initialize_if_absent(AppDocument::default()).await;
        assert_eq!(second, sample_document());
    }

    #[tokio::test]
    async fn test_missing_locale_is_defaulted_on_load() {
        let (store, repo) = create_test_store().await;
        repo.put_record(
            DOCUMENT_KEY,
            r#"{"kids":[{"id":"k1","name":"Leo","age":8,"grade":"3rd","schedule":[]}],"templates":[],"imageMap":{}}"#,
            1,
        )
        .await
        .unwrap();

        let doc = store.load().await.unwrap();
        assert_eq!(doc.locale, "en");
        assert_eq!(doc.kids[0].name, "Leo");
    }

    #[tokio::test]
    async fn test_unreadable_record_is_quarantined() {
        let (store, repo) = create_test_store().await;
        repo.put_record(DOCUMENT_KEY, "{not json", 2).await.unwrap();

        assert!(store.load().await.is_none());

        let quarantined = store.quarantined().await.unwrap();
        assert_eq!(quarantined.len(), 1);
        let copy = repo.get_record(&quarantined[0]).await.unwrap().unwrap();
        assert_eq!(copy.body, "{not json");

        let doc = store.initialize_if_absent(AppDocument::default()).await;
        assert_eq!(doc, AppDocument::default());
        assert_eq!(store.quarantined().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_unreadable_row_is_preserved_before_default() {
        let pool = create_test_pool().await;
        let repo = Repository::new(pool.clone());
        let store = DocumentStore::new(repo.clone());
        store.save(&sample_document()).await.unwrap();

        sqlx::query("UPDATE documents SET updated_at = 'garbage' WHERE key = ?")
            .bind(DOCUMENT_KEY)
            .execute(&pool)
            .await
            .unwrap();

        let doc = store.initialize_if_absent(AppDocument::default()).await;
        assert_eq!(doc, AppDocument::default());

        let quarantined = store.quarantined().await.unwrap();
        assert_eq!(quarantined.len(), 1);
        let copy = repo.get_record(&quarantined[0]).await.unwrap().unwrap();
        assert!(copy.body.contains("\"Leo\""));
    }

    #[tokio::test]
    async fn test_partial_record_is_quarantined_once() {
        let (store, repo) = create_test_store().await;
        repo.put_record(
            DOCUMENT_KEY,
            r#"{"kids":[{"name":"Leo","age":8}],"templates":[],"imageMap":{},"locale":"en"}"#,
            2,
        )
        .await
        .unwrap();

        for _ in 0..3 {
            let handle = DocumentHandle::open(store.clone()).await;
            assert!(handle.snapshot().await.kids.is_empty());
        }

        assert_eq!(store.quarantined().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_load_survives_closed_storage() {
        let pool = create_test_pool().await;
        let store = DocumentStore::new(Repository::new(pool.clone()));
        pool.close().await;

        assert!(store.load().await.is_none());
        let doc = store.initialize_if_absent(AppDocument::default()).await;
        assert_eq!(doc, AppDocument::default());
    }

    #[tokio::test]
    async fn test_handle_update_persists_whole_document() {
        let (store, _repo) = create_test_store().await;
        let handle = DocumentHandle::open(store.clone()).await;

        handle
            .update(|doc| {
                doc.locale = "de".to_string();
                Ok(())
            })
            .await
            .unwrap();

        assert_eq!(handle.read(|d| d.locale.clone()).await, "de");
        assert_eq!(store.load().await.unwrap().locale, "de");
        assert!(!handle.is_dirty().await);
    }

    #[tokio::test]
    async fn test_handle_failed_change_leaves_document_untouched() {
        let (store, _repo) = create_test_store().await;
        let handle = DocumentHandle::open(store).await;

        let result: Result<()> = handle
            .update(|doc| {
                doc.locale = "fr".to_string();
                Err(AppError::Validation("nope".to_string()))
            })
            .await;

        assert!(result.is_err());
        assert_eq!(handle.snapshot().await.locale, "en");
    }

    #[tokio::test]
    async fn test_handle_keeps_change_when_save_fails() {
        let pool = create_test_pool().await;
        let store = DocumentStore::new(Repository::new(pool.clone()));
        let handle = DocumentHandle::open(store).await;
        pool.close().await;

        let result = handle
            .update(|doc| {
                doc.locale = "ja".to_string();
                Ok(())
            })
            .await;

        assert!(matches!(result, Err(AppError::StorageUnavailable(_))));
        assert_eq!(handle.snapshot().await.locale, "ja");
        assert!(handle.is_dirty().await);
        assert!(handle.flush().await.is_err());
    }

    #[tokio::test]
    async fn test_reset_failure_keeps_empty_document_dirty() {
        let pool = create_test_pool().await;
        let store = DocumentStore::new(Repository::new(pool.clone()));
        store.save(&sample_document()).await.unwrap();
        let handle = DocumentHandle::open(store).await;
        pool.close().await;

        assert!(matches!(
            handle.reset().await,
            Err(AppError::StorageUnavailable(_))
        ));
        assert_eq!(handle.snapshot().await, AppDocument::default());
        assert!(handle.is_dirty().await);
    }

    #[tokio::test]
    async fn test_export_and_reset() {
        let (store, _repo) = create_test_store().await;
        store.save(&sample_document()).await.unwrap();
        let handle = DocumentHandle::open(store.clone()).await;

        let json = handle.export_json().await.unwrap();
        assert!(json.contains("\"imageMap\""));
        assert!(json.contains("Calculator"));

        handle.reset().await.unwrap();
        assert_eq!(handle.snapshot().await, AppDocument::default());
        assert_eq!(store.load().await.unwrap(), AppDocument::default());
    }
}
