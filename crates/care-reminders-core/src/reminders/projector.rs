//! Projection of patient records into reminders.

use chrono::{DateTime, Local};

use super::{classify, parse_time_to_today};
use crate::models::{PatientRecord, Reminder};

/// Project one reminder per record, preserving input order and cardinality.
pub fn project(records: &[PatientRecord], now: DateTime<Local>) -> Vec<Reminder> {
    records.iter().map(|record| project_one(record, now)).collect()
}

/// Project a single record.
pub fn project_one(record: &PatientRecord, now: DateTime<Local>) -> Reminder {
    let scheduled = parse_time_to_today(record.time.as_deref(), now);
    let status = classify(record.persisted_status(), scheduled, now);

    Reminder {
        id: record.id.clone(),
        patient: record.name.clone(),
        medicine: record.medicine.clone(),
        dosage: record.dosage.clone(),
        time: record.time.clone(),
        status,
        urgent: record.urgent,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ReminderStatus;
    use chrono::TimeZone;

    fn record(id: &str, name: &str, time: Option<&str>, status: Option<&str>) -> PatientRecord {
        PatientRecord {
            id: id.into(),
            name: name.into(),
            medicine: Some("Metformin".into()),
            dosage: Some("500mg".into()),
            time: time.map(Into::into),
            status: status.map(Into::into),
            ..Default::default()
        }
    }

    #[test]
    fn test_project_copies_fields() {
        let now = Local.with_ymd_and_hms(2024, 1, 15, 10, 0, 0).unwrap();
        let mut input = record("r1", "Jane Smith", Some("9:30 AM"), Some("done"));
        input.urgent = true;

        let reminders = project(&[input], now);
        assert_eq!(reminders.len(), 1);

        let r = &reminders[0];
        assert_eq!(r.id, "r1");
        assert_eq!(r.patient, "Jane Smith");
        assert_eq!(r.medicine.as_deref(), Some("Metformin"));
        assert_eq!(r.dosage.as_deref(), Some("500mg"));
        assert_eq!(r.time.as_deref(), Some("9:30 AM"));
        assert_eq!(r.status, ReminderStatus::Done);
        assert!(r.urgent);
    }

    #[test]
    fn test_project_preserves_cardinality() {
        let now = Local.with_ymd_and_hms(2024, 1, 15, 10, 0, 0).unwrap();
        let input = vec![
            record("a", "Same", Some("8:00 AM"), None),
            record("a", "Same", Some("8:00 AM"), None),
            record("", "", None, Some("garbage")),
        ];

        let reminders = project(&input, now);
        assert_eq!(reminders.len(), 3);
        assert_eq!(reminders[0], reminders[1]);
        // No schedule means "due now", which is not yet missed
        assert_eq!(reminders[2].status, ReminderStatus::Upcoming);
        assert_eq!(reminders[2].patient, "");
    }
}
