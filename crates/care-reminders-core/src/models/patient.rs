//! Patient models.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{Document, ReminderStatus};

/// A patient record as read from a store snapshot.
///
/// Records are read-only snapshots; the store is the only writer.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PatientRecord {
    /// Store-assigned document ID
    pub id: String,
    /// Patient name
    pub name: String,
    /// Medicine to remind about
    pub medicine: Option<String>,
    /// Dosage text
    pub dosage: Option<String>,
    /// Scheduled time of day, expected as "H:MM AM|PM"
    pub time: Option<String>,
    /// Persisted status flag, verbatim
    pub status: Option<String>,
    /// Urgent / low stock
    pub urgent: bool,
    /// Remaining document fields (dob, phone, medicines, createdAt, ...)
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl PatientRecord {
    /// Build a record from a store document.
    ///
    /// Never fails: absent or wrongly-typed fields fall back to defaults.
    pub fn from_document(doc: &Document) -> Self {
        let data = &doc.data;
        let urgent = bool_field(data, "urgent") || bool_field(data, "pillsAlert");

        let extra = data
            .iter()
            .filter(|(key, _)| !KNOWN_FIELDS.contains(&key.as_str()))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();

        Self {
            id: doc.id.clone(),
            name: str_field(data, "name").unwrap_or_default(),
            medicine: str_field(data, "medicine"),
            dosage: str_field(data, "dosage"),
            time: str_field(data, "time"),
            status: str_field(data, "status"),
            urgent,
            extra,
        }
    }

    /// The persisted status, if it is a reminder status.
    pub fn persisted_status(&self) -> Option<ReminderStatus> {
        self.status.as_deref().and_then(ReminderStatus::from_persisted)
    }
}

const KNOWN_FIELDS: &[&str] = &[
    "name", "medicine", "dosage", "time", "status", "urgent", "pillsAlert",
];

fn str_field(data: &Map<String, Value>, key: &str) -> Option<String> {
    data.get(key).and_then(Value::as_str).map(str::to_string)
}

fn bool_field(data: &Map<String, Value>, key: &str) -> bool {
    data.get(key).and_then(Value::as_bool).unwrap_or(false)
}

/// One prescribed medicine entered on the patient form.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MedicineEntry {
    pub name: String,
    pub total_pills_prescribed: String,
    pub pills_per_day_to_be_taken: String,
    pub days_per_week_to_take_the_prescription: String,
    pub pill_schedule: String,
    pub refill_or_not: bool,
}

/// A patient to be added to the store.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NewPatient {
    /// Patient name (required)
    pub name: String,
    /// Clinic-assigned ID number (required)
    pub patient_id: String,
    pub dob: String,
    pub gender: String,
    pub phone: String,
    pub email: String,
    pub emergency_contact: String,
    pub height: String,
    pub weight: String,
    pub notes: String,
    pub medicines: Vec<MedicineEntry>,
    /// Medicine shown on the reminder
    #[serde(skip_serializing_if = "Option::is_none")]
    pub medicine: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dosage: Option<String>,
    /// Scheduled time of day, "H:MM AM|PM"
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
    pub urgent: bool,
}

impl NewPatient {
    /// Create a new patient with required fields.
    pub fn new(name: impl Into<String>, patient_id: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            patient_id: patient_id.into(),
            ..Self::default()
        }
    }

    /// Attach a reminder schedule.
    pub fn with_schedule(
        mut self,
        medicine: impl Into<String>,
        dosage: impl Into<String>,
        time: impl Into<String>,
    ) -> Self {
        self.medicine = Some(medicine.into());
        self.dosage = Some(dosage.into());
        self.time = Some(time.into());
        self
    }

    /// Name of the first blank required field, if any.
    pub fn missing_required_field(&self) -> Option<&'static str> {
        if self.name.trim().is_empty() {
            Some("name")
        } else if self.patient_id.trim().is_empty() {
            Some("patientId")
        } else {
            None
        }
    }

    /// Serialize to document data, stamping the form defaults and `createdAt`.
    pub fn to_document(&self, created_at: &str) -> Result<Map<String, Value>, serde_json::Error> {
        let mut data = match serde_json::to_value(self)? {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        data.insert("status".into(), Value::from("stable"));
        data.insert("pillsAlert".into(), Value::from(false));
        data.insert("createdAt".into(), Value::from(created_at));
        Ok(data)
    }
}
