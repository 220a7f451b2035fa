//! # API REST
//!
//! REST API for the patient registry.
//!
//! Handles:
//! - HTTP endpoints with axum (multipart uploads, paging, raw document download)
//! - OpenAPI/Swagger documentation
//! - REST-specific concerns (JSON error bodies, CORS, request ids, request tracing)
//!
//! Business rules live in `registry-core`; this crate only translates between HTTP and
//! [`PatientService`].

#![warn(rust_2018_idioms)]

mod error;
mod form;
mod handlers;

pub use error::ApiError;

use axum::body::Body;
use axum::extract::DefaultBodyLimit;
use axum::http::Request;
use axum::routing::get;
use axum::Router;
use registry_core::PatientService;
use tower_http::cors::CorsLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// Headroom above the document bound for the text fields and multipart framing.
const BODY_LIMIT_HEADROOM: usize = 1024 * 1024;

/// Application state shared by all handlers.
#[derive(Clone, Debug)]
pub struct AppState {
    pub patients: PatientService,
}

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::health,
        handlers::create_patient,
        handlers::list_patients,
        handlers::get_patient,
        handlers::get_document_photo,
        handlers::replace_patient,
        handlers::patch_patient,
        handlers::delete_patient,
    ),
    components(schemas(
        api_shared::HealthRes,
        api_shared::PatientRes,
        api_shared::DocumentFileRes,
        api_shared::PatientPageRes,
        api_shared::ErrorRes,
        api_shared::FieldErrorRes,
        form::PatientFormDoc,
    ))
)]
pub struct ApiDoc;

/// Request body limit for a given document bound.
///
/// Large enough that an oversized photo still reaches validation and gets the documented 400.
pub fn body_limit(max_document_bytes: u64) -> usize {
    usize::try_from(max_document_bytes)
        .unwrap_or(usize::MAX)
        .saturating_add(BODY_LIMIT_HEADROOM)
}

/// Builds the full application router.
pub fn router(state: AppState) -> Router {
    let limit = body_limit(state.patients.max_document_bytes());

    Router::new()
        .route("/health", get(handlers::health))
        .route(
            "/patients",
            get(handlers::list_patients).post(handlers::create_patient),
        )
        .route(
            "/patients/:id",
            get(handlers::get_patient)
                .put(handlers::replace_patient)
                .patch(handlers::patch_patient)
                .delete(handlers::delete_patient),
        )
        .route(
            "/patients/:id/document-photo",
            get(handlers::get_document_photo),
        )
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(DefaultBodyLimit::max(limit))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                let request_id = request
                    .headers()
                    .get("x-request-id")
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("-");
                tracing::info_span!(
                    "http_request",
                    method = %request.method(),
                    uri = %request.uri(),
                    request_id = %request_id,
                )
            }),
        )
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
