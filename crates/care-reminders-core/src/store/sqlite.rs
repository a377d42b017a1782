//! SQLite-backed collection store.

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use serde_json::{Map, Value};

use super::listeners::{Delivery, ListenerRegistry};
use super::{
    sort_documents, CollectionPath, CollectionStore, SnapshotEvent, SnapshotListener, StoreError,
    StoreResult, StoreSubscription,
};
use crate::db::Database;
use crate::models::Document;

/// Collection store persisted in a local SQLite database.
pub struct SqliteStore {
    db: Mutex<Database>,
    listeners: Arc<ListenerRegistry>,
}

impl SqliteStore {
    /// Open a store at path, creating it if needed.
    pub fn open<P: AsRef<Path>>(path: P) -> StoreResult<Self> {
        Ok(Self::with_database(Database::open(path)?))
    }

    /// Create an in-memory store (for testing).
    pub fn open_in_memory() -> StoreResult<Self> {
        Ok(Self::with_database(Database::open_in_memory()?))
    }

    pub fn with_database(db: Database) -> Self {
        Self {
            db: Mutex::new(db),
            listeners: Arc::new(ListenerRegistry::default()),
        }
    }

    /// Insert or replace a document under a caller-chosen ID.
    pub fn set_document(
        &self,
        path: &CollectionPath,
        id: &str,
        data: Map<String, Value>,
    ) -> StoreResult<()> {
        self.db()?.upsert_document(path.as_str(), id, &data)?;
        self.notify(path);
        Ok(())
    }

    /// Shallow-merge `patch` into an existing document.
    pub fn update(
        &self,
        path: &CollectionPath,
        id: &str,
        patch: Map<String, Value>,
    ) -> StoreResult<()> {
        self.db()?.merge_document(path.as_str(), id, &patch)?;
        self.notify(path);
        Ok(())
    }

    /// Remove a document. Returns whether it existed.
    pub fn delete(&self, path: &CollectionPath, id: &str) -> StoreResult<bool> {
        let removed = self.db()?.delete_document(path.as_str(), id)?;
        if removed {
            self.notify(path);
        }
        Ok(removed)
    }

    /// Current contents of a collection, ordered by `order_by`.
    pub fn documents(&self, path: &CollectionPath, order_by: &str) -> StoreResult<Vec<Document>> {
        let mut docs = self.db()?.list_documents(path.as_str())?;
        sort_documents(&mut docs, order_by);
        Ok(docs)
    }

    fn notify(&self, path: &CollectionPath) {
        self.listeners.dispatch(
            Delivery::Snapshot(path.clone()),
            &|path: &CollectionPath, order_by: &str| self.snapshot(path, order_by),
        );
    }

    fn snapshot(&self, path: &CollectionPath, order_by: &str) -> SnapshotEvent {
        let event = self.documents(path, order_by);
        if let Err(e) = &event {
            tracing::warn!(path = %path, error = %e, "failed to read snapshot");
        }
        event
    }

    fn db(&self) -> StoreResult<MutexGuard<'_, Database>> {
        self.db
            .lock()
            .map_err(|e| StoreError::Unavailable(format!("Lock poisoned: {}", e)))
    }
}

impl CollectionStore for SqliteStore {
    fn subscribe(
        &self,
        path: &CollectionPath,
        order_by: &str,
        listener: SnapshotListener,
    ) -> StoreResult<StoreSubscription> {
        // Fail fast while the database is unusable
        drop(self.db()?);
        Ok(self.listeners.subscribe(
            path,
            order_by,
            listener,
            &|path: &CollectionPath, order_by: &str| self.snapshot(path, order_by),
        ))
    }

    fn add(&self, path: &CollectionPath, data: Map<String, Value>) -> StoreResult<String> {
        let id = uuid::Uuid::new_v4().to_string();
        self.db()?.insert_document(path.as_str(), &id, &data)?;
        tracing::debug!(path = %path, id = %id, "document added");
        self.notify(path);
        Ok(id)
    }
}
