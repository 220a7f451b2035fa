//! Core runtime configuration.
//!
//! Everything here is resolved once at process startup and then passed into the services. Request
//! handling never reads environment variables; the `*_from_env_value` helpers take the raw
//! values so that `main` owns the environment and tests can exercise parsing directly.

use crate::constants::{DEFAULT_DATABASE_URL, DEFAULT_DB_MAX_CONNECTIONS, DEFAULT_UPLOADS_DIR};
use crate::{PatientError, PatientResult};
use registry_files::MAX_DOCUMENT_SIZE_BYTES;
use registry_notify::SmtpConfig;
use std::path::{Path, PathBuf};

/// Core configuration resolved at startup.
#[derive(Clone, Debug)]
pub struct CoreConfig {
    database_url: String,
    uploads_dir: PathBuf,
    max_document_bytes: u64,
    db_max_connections: u32,
    smtp: Option<SmtpConfig>,
}

impl CoreConfig {
    /// Create a new `CoreConfig`.
    pub fn new(
        database_url: String,
        uploads_dir: PathBuf,
        max_document_bytes: u64,
        db_max_connections: u32,
        smtp: Option<SmtpConfig>,
    ) -> PatientResult<Self> {
        if database_url.trim().is_empty() {
            return Err(PatientError::InvalidConfig(
                "database_url cannot be empty".into(),
            ));
        }
        if uploads_dir.as_os_str().is_empty() {
            return Err(PatientError::InvalidConfig(
                "uploads_dir cannot be empty".into(),
            ));
        }
        if max_document_bytes == 0 {
            return Err(PatientError::InvalidConfig(
                "max_document_bytes must be greater than zero".into(),
            ));
        }
        if db_max_connections == 0 {
            return Err(PatientError::InvalidConfig(
                "db_max_connections must be greater than zero".into(),
            ));
        }

        Ok(Self {
            database_url,
            uploads_dir,
            max_document_bytes,
            db_max_connections,
            smtp,
        })
    }

    pub fn database_url(&self) -> &str {
        &self.database_url
    }

    pub fn uploads_dir(&self) -> &Path {
        &self.uploads_dir
    }

    pub fn max_document_bytes(&self) -> u64 {
        self.max_document_bytes
    }

    pub fn db_max_connections(&self) -> u32 {
        self.db_max_connections
    }

    pub fn smtp(&self) -> Option<&SmtpConfig> {
        self.smtp.as_ref()
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

pub fn database_url_from_env_value(value: Option<String>) -> String {
    non_empty(value).unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string())
}

pub fn uploads_dir_from_env_value(value: Option<String>) -> PathBuf {
    PathBuf::from(non_empty(value).unwrap_or_else(|| DEFAULT_UPLOADS_DIR.to_string()))
}

pub fn max_document_bytes_from_env_value(value: Option<String>) -> PatientResult<u64> {
    match non_empty(value) {
        None => Ok(MAX_DOCUMENT_SIZE_BYTES),
        Some(v) => v.parse::<u64>().map_err(|_| {
            PatientError::InvalidConfig(format!("MAX_DOCUMENT_BYTES is not a number: {v}"))
        }),
    }
}

pub fn db_max_connections_from_env_value(value: Option<String>) -> PatientResult<u32> {
    match non_empty(value) {
        None => Ok(DEFAULT_DB_MAX_CONNECTIONS),
        Some(v) => v.parse::<u32>().map_err(|_| {
            PatientError::InvalidConfig(format!("DB_MAX_CONNECTIONS is not a number: {v}"))
        }),
    }
}

/// Raw `MAIL_*` environment values.
#[derive(Debug, Default, Clone)]
pub struct SmtpEnvValues {
    pub host: Option<String>,
    pub port: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub from_email: Option<String>,
    pub from_name: Option<String>,
}

/// Builds the SMTP configuration when every value is present.
///
/// Returns `Ok(None)` if any value is missing or blank; the caller then falls back to the no-op
/// notifier. A present but non-numeric port is a configuration error.
pub fn smtp_config_from_env_values(values: SmtpEnvValues) -> PatientResult<Option<SmtpConfig>> {
    let (
        Some(host),
        Some(port),
        Some(username),
        Some(password),
        Some(from_email),
        Some(from_name),
    ) = (
        non_empty(values.host),
        non_empty(values.port),
        non_empty(values.username),
        non_empty(values.password),
        non_empty(values.from_email),
        non_empty(values.from_name),
    )
    else {
        return Ok(None);
    };

    let port = port
        .parse::<u16>()
        .map_err(|_| PatientError::InvalidConfig(format!("MAIL_PORT is not a valid port: {port}")))?;

    Ok(Some(SmtpConfig {
        host,
        port,
        username,
        password,
        from_email,
        from_name,
    }))
}
