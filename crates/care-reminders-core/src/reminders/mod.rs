//! Reminder derivation.
//!
//! Pipeline: Snapshot → Time-of-day parsing → Classification → Projection → Ordering/Aggregation

mod classifier;
mod ordering;
mod projector;
mod time_of_day;

pub use classifier::*;
pub use ordering::*;
pub use projector::*;
pub use time_of_day::*;

use chrono::{DateTime, Local};

use crate::models::{PatientRecord, ReminderListView};

/// Derive the full reminder view for one snapshot, evaluated at `now`.
pub fn derive_view(records: &[PatientRecord], now: DateTime<Local>) -> ReminderListView {
    let view = order_and_aggregate(project(records, now), now);
    tracing::debug!(
        total = view.counts.total,
        upcoming = view.counts.upcoming,
        done = view.counts.done,
        missed = view.counts.missed,
        "derived reminder view"
    );
    view
}
