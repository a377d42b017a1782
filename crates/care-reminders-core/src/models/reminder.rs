//! Reminder models derived from patient records.

use std::fmt;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

/// Effective status of a reminder.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ReminderStatus {
    /// Scheduled time has not passed yet
    Upcoming,
    /// Marked as taken by a caregiver
    Done,
    /// Scheduled time passed without being marked done
    Missed,
}

impl ReminderStatus {
    /// Parse a persisted status flag. Unknown values are treated as absent.
    pub fn from_persisted(value: &str) -> Option<Self> {
        match value {
            "upcoming" => Some(Self::Upcoming),
            "done" => Some(Self::Done),
            "missed" => Some(Self::Missed),
            _ => None,
        }
    }

    /// Wire name of the status, as stored in patient documents.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Upcoming => "upcoming",
            Self::Done => "done",
            Self::Missed => "missed",
        }
    }

    pub fn is_done(&self) -> bool {
        matches!(self, Self::Done)
    }
}

impl fmt::Display for ReminderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A medication reminder projected from one patient record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Reminder {
    /// Store-assigned record ID
    pub id: String,
    /// Patient name
    pub patient: String,
    /// Medicine name
    pub medicine: Option<String>,
    /// Dosage text (e.g., "10mg")
    pub dosage: Option<String>,
    /// Raw time-of-day string (e.g., "8:00 AM")
    pub time: Option<String>,
    /// Effective status at evaluation time
    pub status: ReminderStatus,
    /// Urgent / low stock
    pub urgent: bool,
}

/// Summary counts per effective status.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReminderCounts {
    pub total: usize,
    pub upcoming: usize,
    pub done: usize,
    pub missed: usize,
}

impl ReminderCounts {
    /// Count one reminder with the given status.
    pub fn record(&mut self, status: ReminderStatus) {
        self.total += 1;
        match status {
            ReminderStatus::Upcoming => self.upcoming += 1,
            ReminderStatus::Done => self.done += 1,
            ReminderStatus::Missed => self.missed += 1,
        }
    }

    /// Count for a single status.
    pub fn get(&self, status: ReminderStatus) -> usize {
        match status {
            ReminderStatus::Upcoming => self.upcoming,
            ReminderStatus::Done => self.done,
            ReminderStatus::Missed => self.missed,
        }
    }
}

/// Immutable snapshot of the ordered reminder list and its summary.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReminderListView {
    /// Reminders, done entries last
    pub reminders: Vec<Reminder>,
    /// Summary counts
    pub counts: ReminderCounts,
    /// The instant the statuses were evaluated against
    pub evaluated_at: DateTime<Local>,
}

impl ReminderListView {
    pub fn len(&self) -> usize {
        self.reminders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reminders.is_empty()
    }

    /// Reminders with the given effective status, in list order.
    pub fn with_status(&self, status: ReminderStatus) -> impl Iterator<Item = &Reminder> {
        self.reminders.iter().filter(move |r| r.status == status)
    }

    /// Reminders flagged urgent (low stock), in list order.
    pub fn urgent(&self) -> impl Iterator<Item = &Reminder> {
        self.reminders.iter().filter(|r| r.urgent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_persisted() {
        assert_eq!(ReminderStatus::from_persisted("done"), Some(ReminderStatus::Done));
        assert_eq!(ReminderStatus::from_persisted("missed"), Some(ReminderStatus::Missed));
        assert_eq!(ReminderStatus::from_persisted("upcoming"), Some(ReminderStatus::Upcoming));
        // Patient form writes "stable", which is not a reminder status
        assert_eq!(ReminderStatus::from_persisted("stable"), None);
        assert_eq!(ReminderStatus::from_persisted("Done"), None);
    }

    #[test]
    fn test_status_serde_lowercase() {
        let json = serde_json::to_string(&ReminderStatus::Missed).unwrap();
        assert_eq!(json, "\"missed\"");
    }

    #[test]
    fn test_counts_record() {
        let mut counts = ReminderCounts::default();
        counts.record(ReminderStatus::Done);
        counts.record(ReminderStatus::Missed);
        counts.record(ReminderStatus::Missed);

        assert_eq!(counts.total, 3);
        assert_eq!(counts.get(ReminderStatus::Missed), 2);
        assert_eq!(counts.get(ReminderStatus::Done), 1);
        assert_eq!(counts.get(ReminderStatus::Upcoming), 0);
    }
}
