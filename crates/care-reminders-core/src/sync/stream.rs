//! Reminder views as an iterator.

use std::sync::mpsc::{Receiver, RecvTimeoutError};
use std::time::Duration;

use crate::models::ReminderListView;

/// Views published by a running sync, in delivery order.
///
/// Blocking: `next()` waits for the next snapshot and returns `None` once
/// the sync has been stopped and every buffered view has been consumed.
pub struct ReminderStream {
    rx: Receiver<ReminderListView>,
}

impl ReminderStream {
    pub(crate) fn new(rx: Receiver<ReminderListView>) -> Self {
        Self { rx }
    }

    /// Next buffered view, without waiting.
    pub fn try_next(&self) -> Option<ReminderListView> {
        self.rx.try_recv().ok()
    }

    /// Wait up to `timeout` for the next view.
    pub fn next_timeout(&self, timeout: Duration) -> Option<ReminderListView> {
        match self.rx.recv_timeout(timeout) {
            Ok(view) => Some(view),
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => None,
        }
    }
}

impl Iterator for ReminderStream {
    type Item = ReminderListView;

    fn next(&mut self) -> Option<Self::Item> {
        self.rx.recv().ok()
    }
}
