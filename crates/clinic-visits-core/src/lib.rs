//! Clinic Visits Core Library
//!
//! Front-desk check-in tracking for a small clinic: register patients, move
//! them from waiting to seen, and summarise today's load per department.
//!
//! # Architecture
//!
//! ```text
//!      Presentation (native UI via FFI)
//!           │                    ▲
//!      check-in / edit /         │ visits, today's stats,
//!      mark seen / delete        │ last error
//!           ▼                    │
//!   ┌─────────────────────────────────────┐
//!   │        Visit Lifecycle Controller   │──► Aggregation (DailyStats)
//!   │  visit list · form · last error     │
//!   └──────────────┬──────────────▲───────┘
//!        writes    │              │ change feed
//!                  ▼              │
//!   ┌─────────────────────────────────────┐
//!   │     Visit Store (patient_visits)    │
//!   └─────────────────────────────────────┘
//! ```
//!
//! # Failure Policy
//!
//! A failed store write is reported once and never retried. Check-in,
//! mark-seen and delete still change the local list; edits do not. Local
//! and stored state can therefore diverge until the next full load.
//!
//! # Modules
//!
//! - [`db`]: SQLite database layer
//! - [`models`]: Domain types (Visit, Department, CheckInForm, etc.)
//! - [`store`]: Visit store contract and SQLite implementation
//! - [`feed`]: Live change feed
//! - [`identity`]: Identity session used to stamp `created_by`
//! - [`controller`]: Visit lifecycle controller
//! - [`stats`]: Daily statistics
//! - [`select`]: Dropdown control state
//! - [`config`]: Startup configuration

pub mod config;
pub mod controller;
pub mod db;
pub mod feed;
pub mod identity;
pub mod models;
pub mod select;
pub mod stats;
pub mod store;

// Re-export commonly used types
pub use config::{ClinicConfig, IdentityConfig, StoreConfig};
pub use controller::{CheckInOutcome, ControllerError, VisitController, VisitList};
pub use db::Database;
pub use feed::{ChangeEvent, ChangeFeed, Subscription};
pub use identity::{IdentityProvider, IdentitySession, ANONYMOUS_SUBJECT};
pub use models::{
    CheckInForm, Department, NewVisit, Visit, VisitFields, VisitRecord, VisitStatus, VisitUpdate,
};
pub use stats::{DailyStats, ServiceLoad};
pub use store::{SqliteVisitStore, StoreError, VisitStore};

// UniFFI setup - using proc macros
uniffi::setup_scaffolding!();

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// =========================================================================
// FFI Error Type
// =========================================================================

#[derive(Debug, thiserror::Error, uniffi::Error)]
pub enum ClinicError {
    #[error("{0}")]
    StoreError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Busy: {0}")]
    Busy(String),
}

impl From<ControllerError> for ClinicError {
    fn from(e: ControllerError) -> Self {
        match e {
            ControllerError::InvalidInput(form) => ClinicError::InvalidInput(form.to_string()),
            other => ClinicError::StoreError(other.to_string()),
        }
    }
}

impl From<StoreError> for ClinicError {
    fn from(e: StoreError) -> Self {
        ClinicError::StoreError(e.to_string())
    }
}

impl From<config::ConfigError> for ClinicError {
    fn from(e: config::ConfigError) -> Self {
        ClinicError::ConfigError(e.to_string())
    }
}

impl From<feed::FeedError> for ClinicError {
    fn from(e: feed::FeedError) -> Self {
        ClinicError::InvalidInput(e.to_string())
    }
}

impl<T> From<std::sync::PoisonError<T>> for ClinicError {
    fn from(e: std::sync::PoisonError<T>) -> Self {
        ClinicError::StoreError(format!("Lock poisoned: {}", e))
    }
}

// =========================================================================
// Factory Functions (exported to FFI)
// =========================================================================

/// Install a `tracing` subscriber for the host process. Safe to call twice.
#[uniffi::export]
pub fn init_logging(filter: String) {
    let filter = tracing_subscriber::EnvFilter::try_new(&filter)
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}

/// Open the clinic with explicit configuration.
#[uniffi::export]
pub fn open_clinic(config: FfiClinicConfig) -> Result<Arc<ClinicCore>, ClinicError> {
    Ok(Arc::new(ClinicCore::from_config(config.into())?))
}

/// Open the clinic with configuration from the environment and `.env`.
#[uniffi::export]
pub fn open_clinic_from_env() -> Result<Arc<ClinicCore>, ClinicError> {
    let config = ClinicConfig::from_env()?;
    Ok(Arc::new(ClinicCore::from_config(config)?))
}

/// Open the clinic over an in-memory store (for testing).
#[uniffi::export]
pub fn open_clinic_in_memory() -> Result<Arc<ClinicCore>, ClinicError> {
    Ok(Arc::new(ClinicCore::from_config(ClinicConfig::in_memory())?))
}

/// Department labels in display order.
#[uniffi::export]
pub fn department_options() -> Vec<String> {
    Department::labels().into_iter().map(String::from).collect()
}

/// Gender options offered by the check-in form.
#[uniffi::export]
pub fn gender_options() -> Vec<String> {
    models::GENDER_OPTIONS.iter().map(|g| g.to_string()).collect()
}

// =========================================================================
// Main API Object
// =========================================================================

type Controller = VisitController<SqliteVisitStore, IdentitySession>;

/// Thread-safe controller wrapper for FFI.
#[derive(uniffi::Object)]
pub struct ClinicCore {
    controller: Mutex<Controller>,
    submitting: AtomicBool,
    config_warning: Option<String>,
}

impl ClinicCore {
    /// Connect the store and sign in.
    ///
    /// A placeholder store URL is not fatal: the clinic runs on an in-memory
    /// store and reports a configuration warning.
    pub fn from_config(config: ClinicConfig) -> Result<Self, ClinicError> {
        let config_warning = config.warning();
        let store = if config.store.is_placeholder() {
            tracing::warn!(url = %config.store.url, "placeholder store url; visits will not be saved");
            SqliteVisitStore::open_in_memory()?
        } else {
            SqliteVisitStore::connect(&config.store)?
        };
        let identity = IdentitySession::sign_in(&config.identity);
        tracing::info!(app_id = %config.app_id, "clinic core opened");

        Ok(Self {
            controller: Mutex::new(VisitController::new(store, identity)),
            submitting: AtomicBool::new(false),
            config_warning,
        })
    }
}

#[uniffi::export]
impl ClinicCore {
    // =========================================================================
    // Sync Operations
    // =========================================================================

    /// Fetch all visits from the store.
    pub fn load(&self) -> Result<u32, ClinicError> {
        let mut controller = self.controller.lock()?;
        Ok(controller.load()? as u32)
    }

    /// Start listening for store changes.
    pub fn subscribe(&self) -> Result<(), ClinicError> {
        let mut controller = self.controller.lock()?;
        Ok(controller.subscribe()?)
    }

    /// Apply pending store changes. Returns how many changed the list.
    pub fn sync_changes(&self) -> Result<u32, ClinicError> {
        let mut controller = self.controller.lock()?;
        Ok(controller.sync_changes() as u32)
    }

    /// Apply a realtime payload received by the host.
    pub fn apply_change_payload(&self, json: String) -> Result<bool, ClinicError> {
        let event = ChangeEvent::from_payload_json(&json)?;
        let mut controller = self.controller.lock()?;
        Ok(controller.apply_change(event))
    }

    /// Stop listening for store changes.
    pub fn dispose(&self) -> Result<(), ClinicError> {
        let mut controller = self.controller.lock()?;
        controller.dispose();
        Ok(())
    }

    // =========================================================================
    // Form Operations
    // =========================================================================

    /// Current form contents.
    pub fn form(&self) -> Result<FfiCheckInForm, ClinicError> {
        let controller = self.controller.lock()?;
        Ok(controller.form().into())
    }

    /// Replace the form's input fields. The edit target is unchanged.
    pub fn set_form(&self, input: FfiCheckInInput) -> Result<(), ClinicError> {
        let service: Department = input
            .service
            .parse()
            .map_err(|e: models::UnknownDepartment| ClinicError::InvalidInput(e.to_string()))?;

        let mut controller = self.controller.lock()?;
        let form = controller.form_mut();
        form.name = input.name;
        form.age = input.age;
        form.gender = input.gender;
        form.service = service;
        Ok(())
    }

    /// Submit the form: register a new visit or save the edit.
    pub fn submit(&self) -> Result<FfiVisit, ClinicError> {
        if self.submitting.swap(true, Ordering::SeqCst) {
            return Err(ClinicError::Busy("a submission is already in progress".into()));
        }

        let result = self
            .controller
            .lock()
            .map_err(ClinicError::from)
            .and_then(|mut controller| {
                controller
                    .submit()
                    .map(|outcome| outcome.visit().into())
                    .map_err(ClinicError::from)
            });

        self.submitting.store(false, Ordering::SeqCst);
        result
    }

    /// Load a visit into the form for editing.
    pub fn start_edit(&self, id: String) -> Result<FfiCheckInForm, ClinicError> {
        let mut controller = self.controller.lock()?;
        if !controller.start_edit(&id) {
            return Err(ClinicError::NotFound(id));
        }
        Ok(controller.form().into())
    }

    pub fn cancel_edit(&self) -> Result<(), ClinicError> {
        let mut controller = self.controller.lock()?;
        controller.cancel_edit();
        Ok(())
    }

    // =========================================================================
    // Visit Operations
    // =========================================================================

    /// Check a patient out.
    pub fn mark_seen(&self, id: String) -> Result<(), ClinicError> {
        let mut controller = self.controller.lock()?;
        Ok(controller.mark_seen(&id)?)
    }

    /// Delete a visit. Confirmation is the caller's job.
    pub fn delete_visit(&self, id: String) -> Result<(), ClinicError> {
        let mut controller = self.controller.lock()?;
        Ok(controller.delete(&id)?)
    }

    /// All visits, newest first (the historical log).
    pub fn visits(&self) -> Result<Vec<FfiVisit>, ClinicError> {
        let controller = self.controller.lock()?;
        Ok(controller.visits().iter().map(FfiVisit::from).collect())
    }

    /// Today's dashboard statistics.
    pub fn today_stats(&self) -> Result<FfiDailyStats, ClinicError> {
        let controller = self.controller.lock()?;
        Ok(controller.stats().into())
    }

    // =========================================================================
    // Status
    // =========================================================================

    pub fn is_loading(&self) -> Result<bool, ClinicError> {
        let controller = self.controller.lock()?;
        Ok(controller.is_loading())
    }

    /// Most recent store error, shown verbatim.
    pub fn last_error(&self) -> Result<Option<String>, ClinicError> {
        let controller = self.controller.lock()?;
        Ok(controller.last_error().map(String::from))
    }

    pub fn clear_last_error(&self) -> Result<(), ClinicError> {
        let mut controller = self.controller.lock()?;
        controller.clear_last_error();
        Ok(())
    }

    pub fn config_warning(&self) -> Option<String> {
        self.config_warning.clone()
    }
}

// =========================================================================
// FFI Types
// =========================================================================

/// FFI-safe configuration.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiClinicConfig {
    pub store_url: String,
    pub store_anon_key: Option<String>,
    pub identity_subject: Option<String>,
    pub allow_anonymous: bool,
    pub app_id: Option<String>,
}

impl From<FfiClinicConfig> for ClinicConfig {
    fn from(config: FfiClinicConfig) -> Self {
        let mut clinic = ClinicConfig::new(
            StoreConfig::new(config.store_url, config.store_anon_key),
            IdentityConfig {
                subject: config.identity_subject,
                allow_anonymous: config.allow_anonymous,
            },
        );
        if let Some(app_id) = config.app_id {
            clinic.app_id = app_id;
        }
        clinic
    }
}

/// FFI-safe visit.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiVisit {
    pub id: String,
    pub name: String,
    pub age: u32,
    pub gender: String,
    pub service: String,
    pub status: String,
    pub created_at: String,
    pub seen_at: Option<String>,
    pub created_by: String,
    pub is_local_placeholder: bool,
}

impl From<&Visit> for FfiVisit {
    fn from(visit: &Visit) -> Self {
        let record = visit.to_record();
        Self {
            id: record.id,
            name: record.name,
            age: record.age,
            gender: record.gender,
            service: record.service,
            status: record.status,
            created_at: record.created_at,
            seen_at: record.seen_at,
            created_by: record.created_by,
            is_local_placeholder: visit.is_local_placeholder(),
        }
    }
}

/// FFI-safe form input.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiCheckInInput {
    pub name: String,
    pub age: String,
    pub gender: String,
    pub service: String,
}

/// FFI-safe form state.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiCheckInForm {
    pub name: String,
    pub age: String,
    pub gender: String,
    pub service: String,
    pub editing_id: Option<String>,
    pub submitting: bool,
}

impl From<&CheckInForm> for FfiCheckInForm {
    fn from(form: &CheckInForm) -> Self {
        Self {
            name: form.name.clone(),
            age: form.age.clone(),
            gender: form.gender.clone(),
            service: form.service.label().to_string(),
            editing_id: form.editing_id.clone(),
            submitting: form.submitting,
        }
    }
}

/// FFI-safe department load.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiServiceLoad {
    pub service: String,
    pub count: u32,
    pub percent: f64,
}

/// FFI-safe daily statistics.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiDailyStats {
    pub total_today: u32,
    pub waiting_today: u32,
    pub seen_today: u32,
    pub seen_percent: f64,
    pub by_service: Vec<FfiServiceLoad>,
    pub today_visits: Vec<FfiVisit>,
}

impl From<DailyStats> for FfiDailyStats {
    fn from(stats: DailyStats) -> Self {
        let by_service = stats
            .by_service
            .iter()
            .map(|load| FfiServiceLoad {
                service: load.service.label().to_string(),
                count: load.count as u32,
                percent: stats.share(load.count),
            })
            .collect();

        Self {
            total_today: stats.total_today as u32,
            waiting_today: stats.waiting_today as u32,
            seen_today: stats.seen_today as u32,
            seen_percent: stats.seen_percent(),
            by_service,
            today_visits: stats.today_visits.iter().map(FfiVisit::from).collect(),
        }
    }
}
