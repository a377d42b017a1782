//! Subscriber bookkeeping and snapshot delivery shared by the store
//! implementations.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};

use super::{CollectionPath, SnapshotEvent, SnapshotListener, StoreError, StoreSubscription};

struct Entry {
    id: u64,
    path: CollectionPath,
    order_by: String,
    listener: SnapshotListener,
}

/// A pending push to subscribers.
pub(crate) enum Delivery {
    /// Current contents of a collection, to every listener on it
    Snapshot(CollectionPath),
    /// Current contents, to one newly registered listener
    Initial(u64),
    /// A read failure, to every listener on the collection
    Failure(CollectionPath, StoreError),
}

/// Reads a collection ordered by a field when a delivery runs.
pub(crate) type SnapshotReader<'a> = &'a dyn Fn(&CollectionPath, &str) -> SnapshotEvent;

#[derive(Default)]
struct DispatchQueue {
    busy: bool,
    pending: VecDeque<Delivery>,
}

/// Registered listeners, in registration order.
///
/// Deliveries run one at a time. Each reads the collection when it runs, so
/// listeners never see an older snapshot after a newer one.
#[derive(Default)]
pub(crate) struct ListenerRegistry {
    next_id: AtomicU64,
    entries: Mutex<Vec<Entry>>,
    queue: Mutex<DispatchQueue>,
}

impl ListenerRegistry {
    /// Register a listener; the returned subscription removes it again.
    pub(crate) fn register(
        self: &Arc<Self>,
        path: &CollectionPath,
        order_by: &str,
        listener: SnapshotListener,
    ) -> (u64, StoreSubscription) {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.lock().push(Entry {
            id,
            path: path.clone(),
            order_by: order_by.to_string(),
            listener,
        });

        let registry: Weak<Self> = Arc::downgrade(self);
        let subscription = StoreSubscription::new(move || {
            if let Some(registry) = registry.upgrade() {
                registry.remove(id);
            }
        });
        (id, subscription)
    }

    /// Register a listener and deliver it the current contents.
    pub(crate) fn subscribe(
        self: &Arc<Self>,
        path: &CollectionPath,
        order_by: &str,
        listener: SnapshotListener,
        read: SnapshotReader<'_>,
    ) -> StoreSubscription {
        let (id, subscription) = self.register(path, order_by, listener);
        self.dispatch(Delivery::Initial(id), read);
        subscription
    }

    /// Queue a delivery and run the queue unless another call already is.
    ///
    /// The caller returns once its delivery has run, or once it is queued
    /// behind a delivery in progress on another thread (or further up this
    /// thread's stack), which runs it before returning. No lock is held
    /// while listeners run, so they may write back into the store.
    pub(crate) fn dispatch(&self, delivery: Delivery, read: SnapshotReader<'_>) {
        {
            let mut queue = self.queue();
            queue.pending.push_back(delivery);
            if queue.busy {
                return;
            }
            queue.busy = true;
        }

        let _running = Running(self);
        loop {
            let delivery = {
                let mut queue = self.queue();
                match queue.pending.pop_front() {
                    Some(delivery) => delivery,
                    None => {
                        queue.busy = false;
                        return;
                    }
                }
            };
            self.run(delivery, read);
        }
    }

    fn run(&self, delivery: Delivery, read: SnapshotReader<'_>) {
        match delivery {
            Delivery::Snapshot(path) => {
                for (order_by, listener) in self.listeners_for(&path) {
                    listener(&read(&path, &order_by));
                }
            }
            Delivery::Initial(id) => {
                let entry = self
                    .lock()
                    .iter()
                    .find(|entry| entry.id == id)
                    .map(|entry| (entry.path.clone(), entry.order_by.clone(), entry.listener.clone()));
                if let Some((path, order_by, listener)) = entry {
                    listener(&read(&path, &order_by));
                }
            }
            Delivery::Failure(path, error) => {
                let event = Err(error);
                for (_, listener) in self.listeners_for(&path) {
                    listener(&event);
                }
            }
        }
    }

    fn remove(&self, id: u64) {
        self.lock().retain(|entry| entry.id != id);
    }

    /// Listeners for `path` with their order-by field.
    ///
    /// Returned by value so callbacks run without the registry locked.
    pub(crate) fn listeners_for(&self, path: &CollectionPath) -> Vec<(String, SnapshotListener)> {
        self.lock()
            .iter()
            .filter(|entry| &entry.path == path)
            .map(|entry| (entry.order_by.clone(), entry.listener.clone()))
            .collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Entry>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn queue(&self) -> MutexGuard<'_, DispatchQueue> {
        self.queue.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Releases the queue if a listener panics mid-delivery.
struct Running<'a>(&'a ListenerRegistry);

impl Drop for Running<'_> {
    fn drop(&mut self) {
        if std::thread::panicking() {
            self.0.queue().busy = false;
        }
    }
}
