//! Live synchronization of the reminder view.
//!
//! Flow: store snapshot → records → projection → classification → ordering → published view

mod controller;
mod stream;

pub use controller::*;
pub use stream::*;

use thiserror::Error;

use crate::store::StoreError;

/// Subscription lifecycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SyncPhase {
    /// Not yet started
    #[default]
    Idle,
    /// Receiving snapshots
    Subscribed,
    /// Stopped; no further updates
    Unsubscribed,
}

/// Sync errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SyncError {
    #[error("Authentication required")]
    AuthenticationRequired,

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Invalid sync state: expected {expected:?}, found {found:?}")]
    InvalidState {
        expected: SyncPhase,
        found: SyncPhase,
    },
}

pub type SyncResult<T> = Result<T, SyncError>;
