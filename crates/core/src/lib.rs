//! # Registry Core
//!
//! Business logic for the patient registry.
//!
//! This crate owns the database (SQLite via `sqlx`), the validation of incoming patient data and
//! the coordination between the database, the document storage and the notifier:
//! - [`PatientService`] implements create / list / get / document / replace / patch / delete
//! - [`UnitOfWork`] wraps a transaction and defers side effects until it commits
//! - [`CoreConfig`] carries everything resolved from the environment at startup
//!
//! **No API concerns**: HTTP routing, multipart parsing and response shapes belong in `api-rest`
//! and `api-shared`.

pub mod config;
pub mod constants;
pub mod db;
mod error;
pub mod models;
pub mod patient;
pub mod repositories;
pub mod unit_of_work;
pub mod validation;

pub use config::CoreConfig;
pub use error::{FieldError, PatientError, PatientResult};
pub use models::{DocumentContent, FileRecord, PatientPage, PatientRecord, PatientView};
pub use patient::PatientService;
pub use unit_of_work::UnitOfWork;
pub use validation::{DocumentUpload, PageRequest, PatientDraft, PatientForm, PatientPatch};

pub use registry_files::{FileStorage, LocalFileStorage};
pub use registry_notify::{notifier_from_config, NotificationDispatcher, Notifier};
