use registry_files::FilesError;
use serde::Serialize;

/// A single field-level validation failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PatientError {
    #[error("validation failed: {}", summarise(.0))]
    Validation(Vec<FieldError>),
    #[error("invalid payload: {0}")]
    InvalidPayload(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("duplicate resource: {0}")]
    Duplicate(String),

    #[error("storage error: {0}")]
    Storage(#[from] FilesError),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("failed to run migrations: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type PatientResult<T> = std::result::Result<T, PatientError>;

pub(crate) const PATIENT_NOT_FOUND: &str = "Patient was not found.";
pub(crate) const DOCUMENT_NOT_FOUND: &str = "Document photo was not found.";
pub(crate) const DUPLICATE_EMAIL: &str = "A patient with this email already exists.";

impl PatientError {
    pub(crate) fn patient_not_found() -> Self {
        Self::NotFound(PATIENT_NOT_FOUND.into())
    }

    pub(crate) fn duplicate_email() -> Self {
        Self::Duplicate(DUPLICATE_EMAIL.into())
    }

    /// Maps a write failure, turning a unique violation on `patients.email` into `Duplicate`.
    ///
    /// The service checks for an existing email before writing; this catches the race where two
    /// requests pass that check concurrently.
    pub(crate) fn from_write(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db) = &err {
            if db.is_unique_violation() && db.message().contains("patients.email") {
                return Self::duplicate_email();
            }
        }
        Self::Database(err)
    }
}

fn summarise(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(|e| format!("{}: {}", e.field, e.message))
        .collect::<Vec<_>>()
        .join("; ")
}
