use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct HealthRes {
    pub ok: bool,
    pub message: String,
}

/// Metadata of a stored document photo.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct DocumentFileRes {
    pub id: Uuid,
    pub server_filename: String,
    pub original_filename: String,
    pub storage_path: String,
    #[schema(example = "image/jpeg")]
    pub content_type: String,
    pub size_bytes: i64,
    /// Hexadecimal SHA-256 of the stored bytes
    pub sha256: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct PatientRes {
    pub id: Uuid,
    #[schema(example = "Ana Lopez")]
    pub full_name: String,
    #[schema(example = "ana@example.com")]
    pub email: String,
    #[schema(example = "+59899111222")]
    pub phone_number: String,
    pub document_file: DocumentFileRes,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct PatientPageRes {
    pub items: Vec<PatientRes>,
    pub page: u32,
    pub size: u32,
    pub total: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct FieldErrorRes {
    pub field: String,
    pub message: String,
}

/// Body of every error response.
///
/// `details` is an empty object except for validation failures, where it carries
/// `{"errors": [FieldErrorRes, ...]}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ErrorRes {
    #[schema(example = "error")]
    pub status: String,
    #[schema(example = "NOT_FOUND")]
    pub code: String,
    #[schema(example = "Patient was not found.")]
    pub message: String,
    #[schema(value_type = Object)]
    pub details: serde_json::Value,
}

impl ErrorRes {
    pub fn new(code: &str, message: impl Into<String>, details: serde_json::Value) -> Self {
        Self {
            status: "error".into(),
            code: code.into(),
            message: message.into(),
            details,
        }
    }
}
