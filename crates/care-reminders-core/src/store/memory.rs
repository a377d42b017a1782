//! In-process collection store.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use serde_json::{Map, Value};

use super::listeners::{Delivery, ListenerRegistry};
use super::{
    sort_documents, CollectionPath, CollectionStore, SnapshotEvent, SnapshotListener, StoreError,
    StoreResult, StoreSubscription,
};
use crate::models::Document;

/// Collection store kept in memory, with push-on-change subscriptions.
pub struct MemoryStore {
    collections: Mutex<HashMap<CollectionPath, Vec<Document>>>,
    listeners: Arc<ListenerRegistry>,
    available: AtomicBool,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            collections: Mutex::new(HashMap::new()),
            listeners: Arc::new(ListenerRegistry::default()),
            available: AtomicBool::new(true),
        }
    }

    /// Simulate losing (or regaining) the connection. While unavailable,
    /// writes and new subscriptions fail.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Insert or replace a document under a caller-chosen ID.
    pub fn set_document(
        &self,
        path: &CollectionPath,
        id: &str,
        data: Map<String, Value>,
    ) -> StoreResult<()> {
        self.check_available()?;
        {
            let mut collections = self.lock();
            let docs = collections.entry(path.clone()).or_default();
            match docs.iter_mut().find(|doc| doc.id == id) {
                Some(doc) => doc.data = data,
                None => docs.push(Document::new(id, data)),
            }
        }
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
        self.check_available()?;
        {
            let mut collections = self.lock();
            let doc = collections
                .get_mut(path)
                .and_then(|docs| docs.iter_mut().find(|doc| doc.id == id))
                .ok_or_else(|| StoreError::NotFound(format!("{}/{}", path, id)))?;
            doc.data.extend(patch);
        }
        self.notify(path);
        Ok(())
    }

    /// Remove a document. Returns whether it existed.
    pub fn delete(&self, path: &CollectionPath, id: &str) -> StoreResult<bool> {
        self.check_available()?;
        let removed = {
            let mut collections = self.lock();
            match collections.get_mut(path) {
                Some(docs) => {
                    let before = docs.len();
                    docs.retain(|doc| doc.id != id);
                    docs.len() != before
                }
                None => false,
            }
        };
        if removed {
            self.notify(path);
        }
        Ok(removed)
    }

    /// Current contents of a collection, ordered by `order_by`.
    pub fn documents(&self, path: &CollectionPath, order_by: &str) -> Vec<Document> {
        let mut docs = self.lock().get(path).cloned().unwrap_or_default();
        sort_documents(&mut docs, order_by);
        docs
    }

    /// Push a read failure to every subscriber of `path`.
    pub fn inject_failure(&self, path: &CollectionPath, error: StoreError) {
        self.listeners.dispatch(
            Delivery::Failure(path.clone(), error),
            &|path: &CollectionPath, order_by: &str| self.snapshot(path, order_by),
        );
    }

    /// Number of live subscriptions across all collections.
    pub fn subscriber_count(&self) -> usize {
        self.listeners.len()
    }

    fn check_available(&self) -> StoreResult<()> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(StoreError::Unavailable("memory store is offline".into()))
        }
    }

    fn notify(&self, path: &CollectionPath) {
        tracing::trace!(path = %path, "pushing snapshot");
        self.listeners.dispatch(
            Delivery::Snapshot(path.clone()),
            &|path: &CollectionPath, order_by: &str| self.snapshot(path, order_by),
        );
    }

    fn snapshot(&self, path: &CollectionPath, order_by: &str) -> SnapshotEvent {
        Ok(self.documents(path, order_by))
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<CollectionPath, Vec<Document>>> {
        self.collections.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl CollectionStore for MemoryStore {
    fn subscribe(
        &self,
        path: &CollectionPath,
        order_by: &str,
        listener: SnapshotListener,
    ) -> StoreResult<StoreSubscription> {
        self.check_available()?;
        Ok(self.listeners.subscribe(
            path,
            order_by,
            listener,
            &|path: &CollectionPath, order_by: &str| self.snapshot(path, order_by),
        ))
    }

    fn add(&self, path: &CollectionPath, data: Map<String, Value>) -> StoreResult<String> {
        self.check_available()?;
        let id = uuid::Uuid::new_v4().to_string();
        self.lock()
            .entry(path.clone())
            .or_default()
            .push(Document::new(id.clone(), data));
        self.notify(path);
        Ok(id)
    }
}
