use crate::error::ApiError;
use crate::form::{read_patient_multipart, PatientFormDoc};
use crate::AppState;
use api_shared::{ErrorRes, HealthRes, HealthService, PatientPageRes, PatientRes};
use axum::extract::multipart::MultipartRejection;
use axum::extract::{Multipart, Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use registry_core::PageRequest;
use serde::Deserialize;
use utoipa::IntoParams;
use uuid::Uuid;

#[derive(Debug, Deserialize, IntoParams)]
pub struct ListParams {
    /// 1-based page number (default 1)
    #[param(value_type = Option<u32>, minimum = 1)]
    page: Option<String>,
    /// Page size, 1 to 100 (default 10)
    #[param(value_type = Option<u32>, minimum = 1, maximum = 100)]
    size: Option<String>,
}

fn parse_id(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|_| ApiError::invalid_id())
}

/// Builds an inline `Content-Disposition` value. Characters that cannot appear in a quoted
/// header parameter are replaced.
fn inline_disposition(filename: &str) -> String {
    let safe: String = filename
        .chars()
        .map(|c| {
            if (c.is_ascii_graphic() && c != '"' && c != '\\') || c == ' ' {
                c
            } else {
                '_'
            }
        })
        .collect();
    format!("inline; filename=\"{safe}\"")
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Health check response", body = HealthRes)
    )
)]
pub async fn health() -> Json<HealthRes> {
    Json(HealthService::check_health())
}

#[utoipa::path(
    post,
    path = "/patients",
    request_body(content = PatientFormDoc, content_type = "multipart/form-data"),
    responses(
        (status = 201, description = "Patient created", body = PatientRes),
        (status = 400, description = "Document photo rejected", body = ErrorRes),
        (status = 409, description = "Email already registered", body = ErrorRes),
        (status = 422, description = "Validation error", body = ErrorRes),
        (status = 500, description = "Internal server error", body = ErrorRes)
    )
)]
/// Registers a patient with their document photo.
///
/// A confirmation email is sent once the patient is committed; its outcome does not affect the
/// response.
pub async fn create_patient(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<(StatusCode, Json<PatientRes>), ApiError> {
    let body = read_patient_multipart(multipart, state.patients.max_document_bytes()).await?;
    let (draft, document) = body.form.into_draft_with_document(body.document)?;
    let view = state.patients.create(draft, document).await?;
    Ok((StatusCode::CREATED, Json(view.into())))
}

#[utoipa::path(
    get,
    path = "/patients",
    params(ListParams),
    responses(
        (status = 200, description = "Page of patients, newest first", body = PatientPageRes),
        (status = 422, description = "Invalid pagination parameters", body = ErrorRes),
        (status = 500, description = "Internal server error", body = ErrorRes)
    )
)]
pub async fn list_patients(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<PatientPageRes>, ApiError> {
    let request = PageRequest::from_query(params.page.as_deref(), params.size.as_deref())?;
    let page = state.patients.list(request).await?;
    Ok(Json(page.into()))
}

#[utoipa::path(
    get,
    path = "/patients/{id}",
    params(("id" = Uuid, Path, description = "Patient id")),
    responses(
        (status = 200, description = "Patient", body = PatientRes),
        (status = 404, description = "Patient not found", body = ErrorRes),
        (status = 422, description = "Malformed id", body = ErrorRes)
    )
)]
pub async fn get_patient(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<PatientRes>, ApiError> {
    let id = parse_id(&id)?;
    let view = state.patients.get(id).await?;
    Ok(Json(view.into()))
}

#[utoipa::path(
    get,
    path = "/patients/{id}/document-photo",
    params(("id" = Uuid, Path, description = "Patient id")),
    responses(
        (status = 200, description = "Document photo bytes with their stored content type"),
        (status = 404, description = "Patient or document not found", body = ErrorRes),
        (status = 422, description = "Malformed id", body = ErrorRes)
    )
)]
pub async fn get_document_photo(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let id = parse_id(&id)?;
    let document = state.patients.document(id).await?;
    Ok((
        [
            (header::CONTENT_TYPE, document.content_type),
            (
                header::CONTENT_DISPOSITION,
                inline_disposition(&document.original_filename),
            ),
        ],
        document.bytes,
    )
        .into_response())
}

#[utoipa::path(
    put,
    path = "/patients/{id}",
    params(("id" = Uuid, Path, description = "Patient id")),
    request_body(content = PatientFormDoc, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Patient replaced", body = PatientRes),
        (status = 400, description = "Document photo rejected", body = ErrorRes),
        (status = 404, description = "Patient not found", body = ErrorRes),
        (status = 409, description = "Email already registered", body = ErrorRes),
        (status = 422, description = "Validation error", body = ErrorRes)
    )
)]
/// Replaces every field; the document photo is optional and kept when omitted.
pub async fn replace_patient(
    State(state): State<AppState>,
    Path(id): Path<String>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<PatientRes>, ApiError> {
    let id = parse_id(&id)?;
    let body = read_patient_multipart(multipart, state.patients.max_document_bytes()).await?;
    let draft = body.form.into_draft()?;
    let view = state.patients.replace(id, draft, body.document).await?;
    Ok(Json(view.into()))
}

#[utoipa::path(
    patch,
    path = "/patients/{id}",
    params(("id" = Uuid, Path, description = "Patient id")),
    request_body(content = PatientFormDoc, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Patient updated", body = PatientRes),
        (status = 400, description = "Empty update or document photo rejected", body = ErrorRes),
        (status = 404, description = "Patient not found", body = ErrorRes),
        (status = 409, description = "Email already registered", body = ErrorRes),
        (status = 422, description = "Validation error", body = ErrorRes)
    )
)]
/// Updates only the supplied fields.
pub async fn patch_patient(
    State(state): State<AppState>,
    Path(id): Path<String>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<PatientRes>, ApiError> {
    let id = parse_id(&id)?;
    let body = read_patient_multipart(multipart, state.patients.max_document_bytes()).await?;
    let patch = body.form.into_patch()?;
    let view = state.patients.patch(id, patch, body.document).await?;
    Ok(Json(view.into()))
}

#[utoipa::path(
    delete,
    path = "/patients/{id}",
    params(("id" = Uuid, Path, description = "Patient id")),
    responses(
        (status = 204, description = "Patient deleted"),
        (status = 404, description = "Patient not found", body = ErrorRes),
        (status = 422, description = "Malformed id", body = ErrorRes)
    )
)]
pub async fn delete_patient(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let id = parse_id(&id)?;
    state.patients.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
