//! Connection pool and schema migrations.

use crate::constants::DB_BUSY_TIMEOUT_SECS;
use crate::{PatientError, PatientResult};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;
use std::time::Duration;

/// Opens a pool on `database_url`, creating the database file (and its directory) if missing.
///
/// Foreign keys are enforced on every connection and the journal runs in WAL mode so readers are
/// not blocked by the single writer.
pub async fn connect(database_url: &str, max_connections: u32) -> PatientResult<SqlitePool> {
    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .foreign_keys(true)
        .busy_timeout(Duration::from_secs(DB_BUSY_TIMEOUT_SECS));

    if let Some(parent) = options.get_filename().parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(|e| {
                PatientError::InvalidConfig(format!(
                    "failed to create database directory {}: {e}",
                    parent.display()
                ))
            })?;
        }
    }

    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections)
        .connect_with(options)
        .await?;

    Ok(pool)
}

/// Applies the embedded migrations.
pub async fn migrate(pool: &SqlitePool) -> PatientResult<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}
