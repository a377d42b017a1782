//! Collection store abstraction.
//!
//! A collection store holds schema-free documents under slash-separated
//! collection paths and pushes the full ordered contents of a collection to
//! every subscriber whenever it changes. Subscribers always receive whole
//! snapshots, never deltas.

mod listeners;
mod memory;
mod session;
mod sqlite;

pub use memory::*;
pub use session::*;
pub use sqlite::*;

use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use serde_json::{Map, Value};
use thiserror::Error;

use crate::models::Document;

/// Store errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Document not found: {0}")]
    NotFound(String),
}

impl From<crate::db::DbError> for StoreError {
    fn from(e: crate::db::DbError) -> Self {
        match e {
            crate::db::DbError::NotFound(what) => StoreError::NotFound(what),
            other => StoreError::Database(other.to_string()),
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// What a subscriber receives: the full ordered collection, or a read failure.
pub type SnapshotEvent = Result<Vec<Document>, StoreError>;

/// Callback invoked with every snapshot event.
pub type SnapshotListener = Arc<dyn Fn(&SnapshotEvent) + Send + Sync>;

/// A slash-separated collection path, e.g. `users/{uid}/patients`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CollectionPath(String);

impl CollectionPath {
    pub fn new(segments: &[&str]) -> Self {
        Self(segments.join("/"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CollectionPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Live subscription handle. Cancels on `unsubscribe` or drop.
#[must_use = "dropping a subscription cancels it"]
pub struct StoreSubscription {
    cancel: Option<Box<dyn FnOnce() + Send>>,
}

impl StoreSubscription {
    pub fn new(cancel: impl FnOnce() + Send + 'static) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    /// Stop receiving snapshots. Safe to call more than once.
    pub fn unsubscribe(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }

    pub fn is_active(&self) -> bool {
        self.cancel.is_some()
    }
}

impl Drop for StoreSubscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

impl fmt::Debug for StoreSubscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreSubscription")
            .field("active", &self.is_active())
            .finish()
    }
}

/// External persistence and live-sync service.
pub trait CollectionStore: Send + Sync {
    /// Subscribe to a collection ordered by `order_by`.
    ///
    /// The current contents are delivered before this returns, unless a
    /// delivery is already running on another thread, which then delivers
    /// them. Afterwards every change pushes a fresh snapshot. Snapshots reach
    /// a listener one at a time and never go back to an older state.
    fn subscribe(
        &self,
        path: &CollectionPath,
        order_by: &str,
        listener: SnapshotListener,
    ) -> StoreResult<StoreSubscription>;

    /// Append a document and return its assigned ID.
    fn add(&self, path: &CollectionPath, data: Map<String, Value>) -> StoreResult<String>;
}

/// Order documents by a field, stably.
///
/// Missing fields sort first, then null, booleans, numbers, strings, and
/// compound values; values of the same kind compare naturally.
pub fn sort_documents(documents: &mut [Document], order_by: &str) {
    documents.sort_by(|a, b| compare_field(a.field(order_by), b.field(order_by)));
}

fn compare_field(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        (Some(Value::Number(x)), Some(Value::Number(y))) => {
            let (x, y) = (x.as_f64().unwrap_or(0.0), y.as_f64().unwrap_or(0.0));
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        _ => kind_rank(a).cmp(&kind_rank(b)),
    }
}

fn kind_rank(value: Option<&Value>) -> u8 {
    match value {
        None => 0,
        Some(Value::Null) => 1,
        Some(Value::Bool(_)) => 2,
        Some(Value::Number(_)) => 3,
        Some(Value::String(_)) => 4,
        Some(Value::Array(_)) | Some(Value::Object(_)) => 5,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};

    fn doc(id: &str, value: Value) -> Document {
        Document::new(id, value.as_object().cloned().unwrap_or_default())
    }

    #[test]
    fn test_collection_path() {
        let path = CollectionPath::new(&["users", "u1", "patients"]);
        assert_eq!(path.as_str(), "users/u1/patients");
        assert_eq!(path.to_string(), "users/u1/patients");
    }

    #[test]
    fn test_sort_documents_by_name() {
        let mut docs = vec![
            doc("1", json!({ "name": "John Doe" })),
            doc("2", json!({ "name": "Bob Lee" })),
            doc("3", json!({})),
            doc("4", json!({ "name": "Jane Smith" })),
            doc("5", json!({ "name": "Bob Lee" })),
        ];

        sort_documents(&mut docs, "name");
        let ids: Vec<_> = docs.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["3", "2", "5", "4", "1"]);
    }

    #[test]
    fn test_sort_mixed_kinds() {
        let mut docs = vec![
            doc("s", json!({ "k": "a" })),
            doc("n2", json!({ "k": 2 })),
            doc("b", json!({ "k": true })),
            doc("z", json!({ "k": null })),
            doc("n1", json!({ "k": 1.5 })),
        ];

        sort_documents(&mut docs, "k");
        let ids: Vec<_> = docs.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["z", "b", "n1", "n2", "s"]);
    }

    #[test]
    fn test_subscription_cancels_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let mut sub = StoreSubscription::new(move || {
            counter.fetch_add(1, AtomicOrdering::SeqCst);
        });

        assert!(sub.is_active());
        sub.unsubscribe();
        sub.unsubscribe();
        drop(sub);

        assert_eq!(calls.load(AtomicOrdering::SeqCst), 1);
    }

    #[test]
    fn test_subscription_cancels_on_drop() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let sub = StoreSubscription::new(move || {
            counter.fetch_add(1, AtomicOrdering::SeqCst);
        });

        drop(sub);
        assert_eq!(calls.load(AtomicOrdering::SeqCst), 1);
    }
}
