//! Ordering and aggregation of projected reminders.

use chrono::{DateTime, Local};

use crate::models::{Reminder, ReminderCounts, ReminderListView};

/// Order reminders with done entries last and tally counts per status.
///
/// The sort is stable, so entries keep their store order (by patient name)
/// within the not-done and done partitions.
pub fn order_and_aggregate(
    mut reminders: Vec<Reminder>,
    evaluated_at: DateTime<Local>,
) -> ReminderListView {
    reminders.sort_by_key(|r| r.status.is_done());

    let mut counts = ReminderCounts::default();
    for reminder in &reminders {
        counts.record(reminder.status);
    }

    ReminderListView {
        reminders,
        counts,
        evaluated_at,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ReminderStatus;
    use chrono::TimeZone;

    fn reminder(id: &str, status: ReminderStatus) -> Reminder {
        Reminder {
            id: id.into(),
            patient: id.to_uppercase(),
            medicine: None,
            dosage: None,
            time: None,
            status,
            urgent: false,
        }
    }

    #[test]
    fn test_done_last_and_stable() {
        use ReminderStatus::*;
        let now = Local.with_ymd_and_hms(2024, 1, 15, 10, 0, 0).unwrap();
        let input = vec![
            reminder("a", Done),
            reminder("b", Missed),
            reminder("c", Done),
            reminder("d", Upcoming),
            reminder("e", Missed),
        ];

        let view = order_and_aggregate(input, now);
        let ids: Vec<_> = view.reminders.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "d", "e", "a", "c"]);

        assert_eq!(
            view.counts,
            ReminderCounts {
                total: 5,
                upcoming: 1,
                done: 2,
                missed: 2,
            }
        );
        assert_eq!(view.evaluated_at, now);
    }

    #[test]
    fn test_empty() {
        let now = Local.with_ymd_and_hms(2024, 1, 15, 10, 0, 0).unwrap();
        let view = order_and_aggregate(Vec::new(), now);
        assert!(view.is_empty());
        assert_eq!(view.counts, ReminderCounts::default());
    }
}
