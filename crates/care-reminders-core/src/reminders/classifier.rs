//! Effective status classification.

use chrono::{DateTime, Local};

use crate::models::ReminderStatus;

/// Compute the effective status of a reminder at `now`.
///
/// `Done` is absorbing. Anything else becomes `Missed` once `now` is strictly
/// after the scheduled instant, and is `Upcoming` until then.
pub fn classify(
    persisted: Option<ReminderStatus>,
    scheduled: DateTime<Local>,
    now: DateTime<Local>,
) -> ReminderStatus {
    match persisted.unwrap_or(ReminderStatus::Upcoming) {
        ReminderStatus::Done => ReminderStatus::Done,
        _ if now > scheduled => ReminderStatus::Missed,
        _ => ReminderStatus::Upcoming,
    }
}
