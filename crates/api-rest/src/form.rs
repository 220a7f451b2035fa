//! Multipart form parsing for patient create / replace / patch.

use crate::error::ApiError;
use axum::extract::multipart::{Field, Multipart, MultipartError, MultipartRejection};
use axum::http::StatusCode;
use registry_core::validation::{
    FIELD_DOCUMENT_PHOTO, FIELD_EMAIL, FIELD_FULL_NAME, FIELD_PHONE_NUMBER,
};
use registry_core::{DocumentUpload, PatientForm};
use utoipa::ToSchema;

/// Parsed patient form: text fields plus the optional document photo.
#[derive(Debug, Default)]
pub struct PatientMultipart {
    pub form: PatientForm,
    pub document: Option<DocumentUpload>,
}

/// OpenAPI description of the multipart body.
#[allow(dead_code)]
#[derive(ToSchema)]
pub struct PatientFormDoc {
    #[schema(example = "Ana Lopez")]
    full_name: String,
    #[schema(example = "ana@example.com")]
    email: String,
    #[schema(example = "+59899111222")]
    phone_number: String,
    /// JPEG or PNG image
    #[schema(value_type = String, format = Binary)]
    document_photo: Vec<u8>,
}

/// Reads the multipart body.
///
/// A request that is not multipart at all parses as an empty form, so that validation rather than
/// the extractor decides the response. At most `max_document_bytes + 1` bytes of the photo are
/// kept; anything beyond that is discarded and the surplus byte lets validation report the
/// upload as oversized.
pub async fn read_patient_multipart(
    multipart: Result<Multipart, MultipartRejection>,
    max_document_bytes: u64,
) -> Result<PatientMultipart, ApiError> {
    let mut parsed = PatientMultipart::default();
    let mut multipart = match multipart {
        Ok(multipart) => multipart,
        Err(rejection) => {
            tracing::debug!("request is not multipart, treating as empty form: {}", rejection);
            return Ok(parsed);
        }
    };

    let keep = usize::try_from(max_document_bytes.saturating_add(1)).unwrap_or(usize::MAX);

    while let Some(field) = multipart.next_field().await.map_err(body_error)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            FIELD_FULL_NAME => parsed.form.full_name = Some(field.text().await.map_err(body_error)?),
            FIELD_EMAIL => parsed.form.email = Some(field.text().await.map_err(body_error)?),
            FIELD_PHONE_NUMBER => {
                parsed.form.phone_number = Some(field.text().await.map_err(body_error)?)
            }
            FIELD_DOCUMENT_PHOTO => {
                let filename = field.file_name().map(str::to_string);
                let content_type = field.content_type().map(str::to_string);
                let bytes = read_capped(field, keep).await?;
                // An empty file input without a filename means no file was chosen.
                if filename.as_deref().map_or(true, str::is_empty) && bytes.is_empty() {
                    continue;
                }
                parsed.document = Some(DocumentUpload {
                    filename,
                    content_type,
                    bytes,
                });
            }
            other => tracing::debug!(field = other, "ignoring unknown form field"),
        }
    }

    Ok(parsed)
}

async fn read_capped(mut field: Field<'_>, keep: usize) -> Result<Vec<u8>, ApiError> {
    let mut bytes = Vec::new();
    while let Some(chunk) = field.chunk().await.map_err(body_error)? {
        let room = keep.saturating_sub(bytes.len());
        if room == 0 {
            continue;
        }
        bytes.extend_from_slice(&chunk[..chunk.len().min(room)]);
    }
    Ok(bytes)
}

fn body_error(err: MultipartError) -> ApiError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        return ApiError::BodyTooLarge;
    }
    ApiError::MalformedBody(format!("Malformed multipart body: {}", err.body_text()))
}
