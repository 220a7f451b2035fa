use crate::models::{PatientDocumentRow, PatientRecord, PatientView};
use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;
use uuid::Uuid;

const SELECT_WITH_DOCUMENT: &str = "
    SELECT p.id, p.full_name, p.email, p.phone_number, p.document_file_id, p.created_at, p.updated_at,
           f.id AS file_id,
           f.server_filename AS file_server_filename,
           f.original_filename AS file_original_filename,
           f.storage_path AS file_storage_path,
           f.content_type AS file_content_type,
           f.size_bytes AS file_size_bytes,
           f.sha256 AS file_sha256,
           f.created_at AS file_created_at,
           f.updated_at AS file_updated_at
    FROM patients p
    JOIN files f ON f.id = p.document_file_id";

pub async fn find_by_id(conn: &mut SqliteConnection, id: Uuid) -> sqlx::Result<Option<PatientView>> {
    let row = sqlx::query_as::<_, PatientDocumentRow>(&format!(
        "{SELECT_WITH_DOCUMENT} WHERE p.id = ?"
    ))
    .bind(id)
    .fetch_optional(conn)
    .await?;
    Ok(row.map(PatientView::from))
}

/// Newest registrations first. Insertion order is tracked by the `seq` column.
pub async fn list(
    conn: &mut SqliteConnection,
    offset: i64,
    limit: i64,
) -> sqlx::Result<Vec<PatientView>> {
    let rows = sqlx::query_as::<_, PatientDocumentRow>(&format!(
        "{SELECT_WITH_DOCUMENT} ORDER BY p.seq DESC LIMIT ? OFFSET ?"
    ))
    .bind(limit)
    .bind(offset)
    .fetch_all(conn)
    .await?;
    Ok(rows.into_iter().map(PatientView::from).collect())
}

pub async fn count(conn: &mut SqliteConnection) -> sqlx::Result<i64> {
    sqlx::query_scalar("SELECT COUNT(*) FROM patients")
        .fetch_one(conn)
        .await
}

/// Whether `email` belongs to a patient other than `excluding`.
pub async fn email_taken(
    conn: &mut SqliteConnection,
    email: &str,
    excluding: Option<Uuid>,
) -> sqlx::Result<bool> {
    let existing: Option<Uuid> = sqlx::query_scalar("SELECT id FROM patients WHERE email = ?")
        .bind(email)
        .fetch_optional(conn)
        .await?;
    Ok(match (existing, excluding) {
        (Some(found), Some(own)) => found != own,
        (Some(_), None) => true,
        (None, _) => false,
    })
}

pub async fn insert(conn: &mut SqliteConnection, patient: &PatientRecord) -> sqlx::Result<()> {
    sqlx::query(
        "INSERT INTO patients (id, full_name, email, phone_number, document_file_id, created_at, updated_at)
         VALUES (?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(patient.id)
    .bind(&patient.full_name)
    .bind(&patient.email)
    .bind(&patient.phone_number)
    .bind(patient.document_file_id)
    .bind(patient.created_at)
    .bind(patient.updated_at)
    .execute(conn)
    .await?;
    Ok(())
}

/// Overwrites the mutable columns of an existing row; `created_at` is left untouched.
pub async fn update(conn: &mut SqliteConnection, patient: &PatientRecord) -> sqlx::Result<bool> {
    let result = sqlx::query(
        "UPDATE patients
         SET full_name = ?, email = ?, phone_number = ?, document_file_id = ?, updated_at = ?
         WHERE id = ?",
    )
    .bind(&patient.full_name)
    .bind(&patient.email)
    .bind(&patient.phone_number)
    .bind(patient.document_file_id)
    .bind(patient.updated_at)
    .bind(patient.id)
    .execute(conn)
    .await?;
    Ok(result.rows_affected() > 0)
}

/// Bumps `updated_at`; returns whether the row exists. Run first in a transaction, it takes the
/// write lock before anything is read.
pub async fn touch(
    conn: &mut SqliteConnection,
    id: Uuid,
    updated_at: DateTime<Utc>,
) -> sqlx::Result<bool> {
    let result = sqlx::query("UPDATE patients SET updated_at = ? WHERE id = ?")
        .bind(updated_at)
        .bind(id)
        .execute(conn)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn delete(conn: &mut SqliteConnection, id: Uuid) -> sqlx::Result<bool> {
    let result = sqlx::query("DELETE FROM patients WHERE id = ?")
        .bind(id)
        .execute(conn)
        .await?;
    Ok(result.rows_affected() > 0)
}
