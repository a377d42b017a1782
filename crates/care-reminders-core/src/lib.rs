//! Care-Reminders Core Library
//!
//! Live medication reminders for a caregiver's patients, derived from a
//! continuously synchronized patient collection.
//!
//! # Architecture
//!
//! ```text
//!   Collection Store (SQLite / in-memory)
//!            │  full ordered snapshot on every change
//!            ▼
//!   ┌────────────────────────────┐
//!   │    Live Sync Controller    │◄──── refresh() as time advances
//!   └──────────────┬─────────────┘
//!                  │  records + "now" (captured once)
//!                  ▼
//!   Time-of-day parse → Classify → Project → Order (done last) + Counts
//!                  │
//!                  ▼
//!          ReminderListView ──► host UI (callback / stream)
//! ```
//!
//! # Core Principle
//!
//! **Status is derived, never stored.** A reminder's effective status is a
//! pure function of its persisted flag, its scheduled time, and now. Only an
//! explicit `done` written to the store survives the passing of time.
//!
//! # Modules
//!
//! - [`reminders`]: Parsing, classification, projection, ordering
//! - [`sync`]: Subscription lifecycle and publication of views
//! - [`store`]: Collection store trait, session, memory and SQLite stores
//! - [`db`]: SQLite document table
//! - [`models`]: Domain types (PatientRecord, Reminder, ReminderListView, etc.)
//! - [`patients`]: Adding and searching patients
//! - [`medicines`]: Medicine name suggestions
//! - [`config`], [`logging`], [`clock`]: Ambient setup

pub mod clock;
pub mod config;
pub mod db;
pub mod logging;
pub mod medicines;
pub mod models;
pub mod patients;
pub mod reminders;
pub mod store;
pub mod sync;

// Re-export commonly used types
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::SyncConfig;
pub use models::{
    Document, MedicineEntry, NewPatient, PatientRecord, Reminder, ReminderCounts,
    ReminderListView, ReminderStatus,
};
pub use patients::PatientService;
pub use store::{CollectionPath, CollectionStore, MemoryStore, Session, SqliteStore};
pub use sync::{LiveSyncController, ReminderStream, SyncHandle, SyncPhase};

// UniFFI setup - using proc macros
uniffi::setup_scaffolding!();

use std::sync::Arc;

// =========================================================================
// FFI Error Type
// =========================================================================

#[derive(Debug, thiserror::Error, uniffi::Error)]
pub enum CareRemindersError {
    #[error("Authentication required")]
    AuthenticationRequired,

    #[error("Store error: {0}")]
    StoreError(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Sync error: {0}")]
    SyncError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl From<store::StoreError> for CareRemindersError {
    fn from(e: store::StoreError) -> Self {
        CareRemindersError::StoreError(e.to_string())
    }
}

impl From<sync::SyncError> for CareRemindersError {
    fn from(e: sync::SyncError) -> Self {
        match e {
            sync::SyncError::AuthenticationRequired => CareRemindersError::AuthenticationRequired,
            sync::SyncError::Store(e) => e.into(),
            other => CareRemindersError::SyncError(other.to_string()),
        }
    }
}

impl From<patients::PatientError> for CareRemindersError {
    fn from(e: patients::PatientError) -> Self {
        match e {
            patients::PatientError::AuthenticationRequired => {
                CareRemindersError::AuthenticationRequired
            }
            patients::PatientError::Store(e) => e.into(),
            other => CareRemindersError::InvalidInput(other.to_string()),
        }
    }
}

impl From<config::ConfigError> for CareRemindersError {
    fn from(e: config::ConfigError) -> Self {
        CareRemindersError::ConfigError(e.to_string())
    }
}

impl From<logging::LoggingError> for CareRemindersError {
    fn from(e: logging::LoggingError) -> Self {
        CareRemindersError::ConfigError(e.to_string())
    }
}

// =========================================================================
// Factory Functions (exported to FFI)
// =========================================================================

/// Open or create a patient store at the given path.
#[uniffi::export]
pub fn open_store(path: String) -> Result<Arc<CareRemindersCore>, CareRemindersError> {
    let store = SqliteStore::open(&path)?;
    Ok(Arc::new(CareRemindersCore::new(store, SyncConfig::default())))
}

/// Open a store with settings from a TOML file.
#[uniffi::export]
pub fn open_store_with_config(
    path: String,
    config_path: String,
) -> Result<Arc<CareRemindersCore>, CareRemindersError> {
    let config = SyncConfig::load(&config_path)?;
    let store = SqliteStore::open(&path)?;
    Ok(Arc::new(CareRemindersCore::new(store, config)))
}

/// Create an in-memory store (for testing).
#[uniffi::export]
pub fn open_store_in_memory() -> Result<Arc<CareRemindersCore>, CareRemindersError> {
    let store = SqliteStore::open_in_memory()?;
    Ok(Arc::new(CareRemindersCore::new(store, SyncConfig::default())))
}

/// Print library logs, filtered like `RUST_LOG` (e.g. "info").
#[uniffi::export]
pub fn init_logging(filter: String) -> Result<(), CareRemindersError> {
    logging::init_logging(&filter)?;
    Ok(())
}

// =========================================================================
// Main API Object
// =========================================================================

/// Store plus settings shared by every caregiver session on this device.
#[derive(uniffi::Object)]
pub struct CareRemindersCore {
    store: Arc<SqliteStore>,
    clock: Arc<dyn Clock>,
    config: SyncConfig,
}

impl CareRemindersCore {
    fn new(store: SqliteStore, config: SyncConfig) -> Self {
        Self {
            store: Arc::new(store),
            clock: Arc::new(SystemClock),
            config,
        }
    }
}

#[uniffi::export]
impl CareRemindersCore {
    // =========================================================================
    // Reminder Sync
    // =========================================================================

    /// Start live reminders for a caregiver. The listener receives the first
    /// view before this returns.
    pub fn start_reminder_sync(
        &self,
        uid: String,
        listener: Box<dyn ReminderListener>,
    ) -> Result<Arc<ReminderSyncHandle>, CareRemindersError> {
        let listener: Arc<dyn ReminderListener> = Arc::from(listener);
        let controller = LiveSyncController::new(
            self.store.clone(),
            Session::authenticated(uid),
            self.clock.clone(),
            self.config.clone(),
        );
        let handle = controller.start_sync(move |view| listener.on_update(view.into()))?;
        Ok(Arc::new(ReminderSyncHandle { controller, handle }))
    }

    // =========================================================================
    // Patient Operations
    // =========================================================================

    /// Add a patient; returns the new document ID.
    pub fn add_patient(
        &self,
        uid: String,
        patient: FfiNewPatient,
    ) -> Result<String, CareRemindersError> {
        let service = PatientService::new(
            self.store.clone(),
            Session::authenticated(uid),
            self.clock.clone(),
            self.config.clone(),
        );
        Ok(service.add_patient(&patient.into())?)
    }

    /// Persist a reminder status, e.g. marking a dose as taken.
    pub fn set_reminder_status(
        &self,
        uid: String,
        patient_id: String,
        status: FfiReminderStatus,
    ) -> Result<(), CareRemindersError> {
        let session = Session::authenticated(uid);
        let uid = session
            .current_identity()
            .ok_or(CareRemindersError::AuthenticationRequired)?;

        let status: ReminderStatus = status.into();
        let mut patch = serde_json::Map::new();
        patch.insert("status".into(), status.as_str().into());

        self.store
            .update(&self.config.patients_path(uid), &patient_id, patch)?;
        Ok(())
    }

    // =========================================================================
    // Data Entry
    // =========================================================================

    /// Medicine names matching what has been typed so far.
    pub fn suggest_medicines(&self, query: String) -> Vec<String> {
        medicines::suggest_medicines(
            medicines::COMMON_MEDICINES,
            &query,
            self.config.suggestion_limit,
        )
        .into_iter()
        .map(str::to_string)
        .collect()
    }
}

/// Receives reminder views on the thread that delivered the snapshot.
#[uniffi::export(callback_interface)]
pub trait ReminderListener: Send + Sync {
    fn on_update(&self, view: FfiReminderListView);
}

/// A running reminder sync.
#[derive(uniffi::Object)]
pub struct ReminderSyncHandle {
    controller: LiveSyncController,
    handle: SyncHandle,
}

#[uniffi::export]
impl ReminderSyncHandle {
    /// Stop updates. Safe to call more than once.
    pub fn unsubscribe(&self) {
        self.handle.unsubscribe();
    }

    pub fn is_active(&self) -> bool {
        self.handle.is_active()
    }

    /// Re-evaluate against the current time (e.g. from a UI timer) and publish.
    pub fn refresh(&self) -> Result<Option<FfiReminderListView>, CareRemindersError> {
        Ok(self.controller.refresh()?.map(Into::into))
    }

    pub fn latest_view(&self) -> Option<FfiReminderListView> {
        self.controller.latest_view().map(Into::into)
    }
}

// =========================================================================
// FFI Types
// =========================================================================

/// FFI-safe reminder status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, uniffi::Enum)]
pub enum FfiReminderStatus {
    Upcoming,
    Done,
    Missed,
}

impl From<ReminderStatus> for FfiReminderStatus {
    fn from(status: ReminderStatus) -> Self {
        match status {
            ReminderStatus::Upcoming => FfiReminderStatus::Upcoming,
            ReminderStatus::Done => FfiReminderStatus::Done,
            ReminderStatus::Missed => FfiReminderStatus::Missed,
        }
    }
}

impl From<FfiReminderStatus> for ReminderStatus {
    fn from(status: FfiReminderStatus) -> Self {
        match status {
            FfiReminderStatus::Upcoming => ReminderStatus::Upcoming,
            FfiReminderStatus::Done => ReminderStatus::Done,
            FfiReminderStatus::Missed => ReminderStatus::Missed,
        }
    }
}

/// FFI-safe reminder.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiReminder {
    pub id: String,
    pub patient: String,
    pub medicine: Option<String>,
    pub dosage: Option<String>,
    pub time: Option<String>,
    pub status: FfiReminderStatus,
    pub urgent: bool,
}

impl From<Reminder> for FfiReminder {
    fn from(reminder: Reminder) -> Self {
        Self {
            id: reminder.id,
            patient: reminder.patient,
            medicine: reminder.medicine,
            dosage: reminder.dosage,
            time: reminder.time,
            status: reminder.status.into(),
            urgent: reminder.urgent,
        }
    }
}

/// FFI-safe summary counts.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiReminderCounts {
    pub total: u32,
    pub upcoming: u32,
    pub done: u32,
    pub missed: u32,
}

impl From<ReminderCounts> for FfiReminderCounts {
    fn from(counts: ReminderCounts) -> Self {
        Self {
            total: saturating_u32(counts.total),
            upcoming: saturating_u32(counts.upcoming),
            done: saturating_u32(counts.done),
            missed: saturating_u32(counts.missed),
        }
    }
}

fn saturating_u32(count: usize) -> u32 {
    u32::try_from(count).unwrap_or(u32::MAX)
}

/// FFI-safe reminder list.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiReminderListView {
    pub reminders: Vec<FfiReminder>,
    pub counts: FfiReminderCounts,
    /// RFC 3339 instant the statuses were evaluated at
    pub evaluated_at: String,
}

impl From<ReminderListView> for FfiReminderListView {
    fn from(view: ReminderListView) -> Self {
        Self {
            reminders: view.reminders.into_iter().map(Into::into).collect(),
            counts: view.counts.into(),
            evaluated_at: view.evaluated_at.to_rfc3339(),
        }
    }
}

/// FFI-safe prescribed medicine.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiMedicineEntry {
    pub name: String,
    pub total_pills_prescribed: String,
    pub pills_per_day_to_be_taken: String,
    pub days_per_week_to_take_the_prescription: String,
    pub pill_schedule: String,
    pub refill_or_not: bool,
}

impl From<FfiMedicineEntry> for MedicineEntry {
    fn from(entry: FfiMedicineEntry) -> Self {
        MedicineEntry {
            name: entry.name,
            total_pills_prescribed: entry.total_pills_prescribed,
            pills_per_day_to_be_taken: entry.pills_per_day_to_be_taken,
            days_per_week_to_take_the_prescription: entry.days_per_week_to_take_the_prescription,
            pill_schedule: entry.pill_schedule,
            refill_or_not: entry.refill_or_not,
        }
    }
}

/// FFI-safe new patient form.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiNewPatient {
    pub name: String,
    pub patient_id: String,
    pub dob: String,
    pub gender: String,
    pub phone: String,
    pub email: String,
    pub emergency_contact: String,
    pub height: String,
    pub weight: String,
    pub notes: String,
    pub medicines: Vec<FfiMedicineEntry>,
    pub medicine: Option<String>,
    pub dosage: Option<String>,
    pub time: Option<String>,
    pub urgent: bool,
}

impl From<FfiNewPatient> for NewPatient {
    fn from(patient: FfiNewPatient) -> Self {
        NewPatient {
            name: patient.name,
            patient_id: patient.patient_id,
            dob: patient.dob,
            gender: patient.gender,
            phone: patient.phone,
            email: patient.email,
            emergency_contact: patient.emergency_contact,
            height: patient.height,
            weight: patient.weight,
            notes: patient.notes,
            medicines: patient.medicines.into_iter().map(Into::into).collect(),
            medicine: patient.medicine,
            dosage: patient.dosage,
            time: patient.time,
            urgent: patient.urgent,
        }
    }
}
