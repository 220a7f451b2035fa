//! Mapping from service errors to HTTP responses.
//!
//! Every non-2xx response carries an [`ErrorRes`] body. Internal failures are logged with their
//! cause and answered with a fixed message.

use api_shared::ErrorRes;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use registry_core::{FieldError, PatientError};
use serde_json::json;

const INTERNAL_MESSAGE: &str = "Internal server error";
const VALIDATION_MESSAGE: &str = "Request validation failed.";

#[derive(Debug)]
pub enum ApiError {
    Patient(PatientError),
    /// The request body could not be read as a form.
    MalformedBody(String),
    /// The request body exceeded the transport limit before reaching validation.
    BodyTooLarge,
}

impl ApiError {
    pub fn invalid_id() -> Self {
        Self::Patient(PatientError::Validation(vec![FieldError::new(
            "id",
            "Input should be a valid UUID",
        )]))
    }

    fn parts(&self) -> (StatusCode, &'static str, String, serde_json::Value) {
        match self {
            Self::Patient(PatientError::Validation(errors)) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "VALIDATION_ERROR",
                VALIDATION_MESSAGE.into(),
                json!({ "errors": errors }),
            ),
            Self::Patient(PatientError::InvalidPayload(message)) | Self::MalformedBody(message) => (
                StatusCode::BAD_REQUEST,
                "INVALID_PAYLOAD",
                message.clone(),
                json!({}),
            ),
            Self::BodyTooLarge => (
                StatusCode::PAYLOAD_TOO_LARGE,
                "INVALID_PAYLOAD",
                "Request body is too large.".into(),
                json!({}),
            ),
            Self::Patient(PatientError::NotFound(message)) => (
                StatusCode::NOT_FOUND,
                "NOT_FOUND",
                message.clone(),
                json!({}),
            ),
            Self::Patient(PatientError::Duplicate(message)) => (
                StatusCode::CONFLICT,
                "DUPLICATE_RESOURCE",
                message.clone(),
                json!({}),
            ),
            Self::Patient(
                PatientError::Storage(_)
                | PatientError::Database(_)
                | PatientError::Migration(_)
                | PatientError::InvalidConfig(_),
            ) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                INTERNAL_MESSAGE.into(),
                json!({}),
            ),
        }
    }
}

impl From<PatientError> for ApiError {
    fn from(err: PatientError) -> Self {
        Self::Patient(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message, details) = self.parts();

        if status.is_server_error() {
            match &self {
                Self::Patient(e) => tracing::error!(code, "request failed: {}", e),
                other => tracing::error!(code, "request failed: {:?}", other),
            }
        } else {
            tracing::warn!(status = status.as_u16(), code, "{}", message);
        }

        (status, Json(ErrorRes::new(code, message, details))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        let cases = [
            (
                ApiError::from(PatientError::Validation(vec![])),
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (
                ApiError::from(PatientError::InvalidPayload("x".into())),
                StatusCode::BAD_REQUEST,
            ),
            (
                ApiError::from(PatientError::NotFound("x".into())),
                StatusCode::NOT_FOUND,
            ),
            (
                ApiError::from(PatientError::Duplicate("x".into())),
                StatusCode::CONFLICT,
            ),
            (
                ApiError::from(PatientError::InvalidConfig("x".into())),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (ApiError::MalformedBody("x".into()), StatusCode::BAD_REQUEST),
            (ApiError::BodyTooLarge, StatusCode::PAYLOAD_TOO_LARGE),
        ];

        for (err, expected) in cases {
            assert_eq!(err.parts().0, expected, "{err:?}");
        }
    }

    #[test]
    fn test_internal_errors_hide_cause() {
        let err = ApiError::from(PatientError::InvalidConfig("secret detail".into()));
        let (_, code, message, _) = err.parts();
        assert_eq!(code, "INTERNAL_ERROR");
        assert_eq!(message, INTERNAL_MESSAGE);
    }

    #[test]
    fn test_validation_details_list_fields() {
        let (_, _, _, details) = ApiError::invalid_id().parts();
        assert_eq!(
            details,
            json!({ "errors": [{ "field": "id", "message": "Input should be a valid UUID" }] })
        );
    }
}
