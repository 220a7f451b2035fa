//! Persisted records and the read models built from them.

use api_shared::{DocumentFileRes, PatientPageRes, PatientRes};
use chrono::{DateTime, Utc};
use registry_files::StoredFile;
use uuid::Uuid;

/// A row of the `files` table.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct FileRecord {
    pub id: Uuid,
    pub server_filename: String,
    pub original_filename: String,
    pub storage_path: String,
    pub content_type: String,
    pub size_bytes: i64,
    pub sha256: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl FileRecord {
    /// Row describing bytes that were just written to storage.
    pub fn from_stored(stored: &StoredFile, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            server_filename: stored.server_filename.clone(),
            original_filename: stored.original_filename.as_str().to_string(),
            storage_path: stored.storage_path.clone(),
            content_type: stored.content_type.mime().to_string(),
            // Bounded by the upload limit, far below i64::MAX.
            size_bytes: i64::try_from(stored.size_bytes).unwrap_or(i64::MAX),
            sha256: stored.sha256.clone(),
            created_at: now,
            updated_at: now,
        }
    }
}

/// A row of the `patients` table.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct PatientRecord {
    pub id: Uuid,
    pub full_name: String,
    pub email: String,
    pub phone_number: String,
    pub document_file_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A patient together with its document file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatientView {
    pub patient: PatientRecord,
    pub document: FileRecord,
}

/// Flat result of the patients/files join; column names carry a `file_` prefix to avoid clashes.
#[derive(Debug, sqlx::FromRow)]
pub(crate) struct PatientDocumentRow {
    id: Uuid,
    full_name: String,
    email: String,
    phone_number: String,
    document_file_id: Uuid,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    file_id: Uuid,
    file_server_filename: String,
    file_original_filename: String,
    file_storage_path: String,
    file_content_type: String,
    file_size_bytes: i64,
    file_sha256: String,
    file_created_at: DateTime<Utc>,
    file_updated_at: DateTime<Utc>,
}

impl From<PatientDocumentRow> for PatientView {
    fn from(row: PatientDocumentRow) -> Self {
        Self {
            patient: PatientRecord {
                id: row.id,
                full_name: row.full_name,
                email: row.email,
                phone_number: row.phone_number,
                document_file_id: row.document_file_id,
                created_at: row.created_at,
                updated_at: row.updated_at,
            },
            document: FileRecord {
                id: row.file_id,
                server_filename: row.file_server_filename,
                original_filename: row.file_original_filename,
                storage_path: row.file_storage_path,
                content_type: row.file_content_type,
                size_bytes: row.file_size_bytes,
                sha256: row.file_sha256,
                created_at: row.file_created_at,
                updated_at: row.file_updated_at,
            },
        }
    }
}

/// One page of patients, newest first.
#[derive(Debug, Clone)]
pub struct PatientPage {
    pub items: Vec<PatientView>,
    pub page: u32,
    pub size: u32,
    pub total: i64,
}

/// Raw bytes of a patient's document with the metadata needed to serve them.
#[derive(Debug, Clone)]
pub struct DocumentContent {
    pub bytes: Vec<u8>,
    pub content_type: String,
    pub original_filename: String,
}

impl From<FileRecord> for DocumentFileRes {
    fn from(file: FileRecord) -> Self {
        Self {
            id: file.id,
            server_filename: file.server_filename,
            original_filename: file.original_filename,
            storage_path: file.storage_path,
            content_type: file.content_type,
            size_bytes: file.size_bytes,
            sha256: file.sha256,
            created_at: file.created_at,
            updated_at: file.updated_at,
        }
    }
}

impl From<PatientView> for PatientRes {
    fn from(view: PatientView) -> Self {
        let PatientView { patient, document } = view;
        Self {
            id: patient.id,
            full_name: patient.full_name,
            email: patient.email,
            phone_number: patient.phone_number,
            document_file: document.into(),
            created_at: patient.created_at,
            updated_at: patient.updated_at,
        }
    }
}

impl From<PatientPage> for PatientPageRes {
    fn from(page: PatientPage) -> Self {
        Self {
            items: page.items.into_iter().map(PatientRes::from).collect(),
            page: page.page,
            size: page.size,
            total: page.total,
        }
    }
}
