//! Patient write path and search.

use std::sync::Arc;

use chrono::{SecondsFormat, Utc};
use thiserror::Error;

use crate::clock::Clock;
use crate::config::SyncConfig;
use crate::models::{NewPatient, PatientRecord};
use crate::store::{CollectionStore, Session, StoreError};

/// Patient write errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PatientError {
    #[error("Authentication required")]
    AuthenticationRequired,

    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl From<serde_json::Error> for PatientError {
    fn from(e: serde_json::Error) -> Self {
        PatientError::Serialization(e.to_string())
    }
}

pub type PatientResult<T> = Result<T, PatientError>;

/// Writes patients into the signed-in caregiver's collection.
pub struct PatientService {
    store: Arc<dyn CollectionStore>,
    session: Session,
    clock: Arc<dyn Clock>,
    config: SyncConfig,
}

impl PatientService {
    pub fn new(
        store: Arc<dyn CollectionStore>,
        session: Session,
        clock: Arc<dyn Clock>,
        config: SyncConfig,
    ) -> Self {
        Self {
            store,
            session,
            clock,
            config,
        }
    }

    /// Validate, stamp `createdAt`, and add the patient. Returns the new ID.
    ///
    /// Store failures are returned as-is; nothing is retried.
    pub fn add_patient(&self, patient: &NewPatient) -> PatientResult<String> {
        let uid = self
            .session
            .current_identity()
            .ok_or(PatientError::AuthenticationRequired)?;

        if let Some(field) = patient.missing_required_field() {
            return Err(PatientError::MissingField(field));
        }

        let created_at = self
            .clock
            .now()
            .with_timezone(&Utc)
            .to_rfc3339_opts(SecondsFormat::Millis, true);
        let data = patient.to_document(&created_at)?;
        let path = self.config.patients_path(uid);

        match self.store.add(&path, data) {
            Ok(id) => {
                tracing::info!(path = %path, id = %id, "patient added");
                Ok(id)
            }
            Err(e) => {
                tracing::error!(path = %path, error = %e, "failed to add patient");
                Err(e.into())
            }
        }
    }
}

/// Records whose name contains `query`, ignoring case. An empty query matches all.
pub fn filter_by_name<'a>(records: &'a [PatientRecord], query: &str) -> Vec<&'a PatientRecord> {
    let query = query.to_lowercase();
    records
        .iter()
        .filter(|record| record.name.to_lowercase().contains(&query))
        .collect()
}
