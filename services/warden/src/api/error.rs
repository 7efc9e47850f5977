//! API error types and helpers.
//!
//! # Purpose
//! Centralizes HTTP error response construction so the authorization
//! pipeline and the management handlers return the same error shape.
//!
//! # Key invariants
//! - `code` is stable and maps one-to-one onto an HTTP status:
//!   `access_token_missing` 401, `access_token_denied` and
//!   `access_token_invalid` 403, `request_data_invalid` 400,
//!   `resource_not_found` 404, `resource_already_exists` 409, `internal` 500.
//! - Internal errors are logged server-side and returned with a generic
//!   message.
use crate::api::types::ErrorResponse;
use crate::auth::AuthError;
use crate::store::{FieldErrors, StoreError};
use axum::Json;
use axum::http::StatusCode;
use axum::response::IntoResponse;

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub body: ErrorResponse,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        (self.status, Json(self.body)).into_response()
    }
}

fn api_error(status: StatusCode, code: &str, message: &str) -> ApiError {
    ApiError {
        status,
        body: ErrorResponse {
            code: code.to_string(),
            message: message.to_string(),
            request_id: None,
            validation: None,
        },
    }
}

pub fn api_access_missing(message: &str) -> ApiError {
    api_error(StatusCode::UNAUTHORIZED, "access_token_missing", message)
}

pub fn api_access_denied(message: &str) -> ApiError {
    api_error(StatusCode::FORBIDDEN, "access_token_denied", message)
}

pub fn api_access_invalid(message: &str) -> ApiError {
    api_error(StatusCode::FORBIDDEN, "access_token_invalid", message)
}

pub fn api_not_found(message: &str) -> ApiError {
    api_error(StatusCode::NOT_FOUND, "resource_not_found", message)
}

pub fn api_conflict(message: &str) -> ApiError {
    api_error(StatusCode::CONFLICT, "resource_already_exists", message)
}

/// Build a 400 with per-field messages.
pub fn api_validation_error(fields: FieldErrors) -> ApiError {
    let mut err = api_error(
        StatusCode::BAD_REQUEST,
        "request_data_invalid",
        "request data has invalid fields",
    );
    err.body.validation = Some(fields);
    err
}

/// Build a 500 from a store error, logging the details.
pub fn api_internal(message: &str, err: &StoreError) -> ApiError {
    tracing::error!(error = ?err, "warden storage error");
    api_internal_message(message)
}

pub fn api_internal_message(message: &str) -> ApiError {
    api_error(StatusCode::INTERNAL_SERVER_ERROR, "internal", message)
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match &err {
            AuthError::AccessMissing(message) => api_access_missing(message),
            AuthError::AccessDenied(message) => api_access_denied(message),
            AuthError::AccessInvalid(message) => api_access_invalid(message),
            AuthError::Internal(message) => {
                tracing::error!(reason = %message, "authorization pipeline failure");
                api_internal_message("internal server error")
            }
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(_) => api_not_found("requested resource is not found"),
            StoreError::Duplicate(_) => api_conflict("resource already exists"),
            StoreError::InvalidArgument(fields) => api_validation_error(fields),
            other => api_internal("internal server error", &other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_errors_map_to_codes() {
        let missing = ApiError::from(AuthError::AccessMissing("missing api key".into()));
        assert_eq!(missing.status, StatusCode::UNAUTHORIZED);
        assert_eq!(missing.body.code, "access_token_missing");
        assert_eq!(missing.body.message, "missing api key");

        let denied = ApiError::from(AuthError::denied("not enough permissions"));
        assert_eq!(denied.status, StatusCode::FORBIDDEN);
        assert_eq!(denied.body.code, "access_token_denied");

        let invalid = ApiError::from(AuthError::AccessInvalid("api token invalid format".into()));
        assert_eq!(invalid.status, StatusCode::FORBIDDEN);
        assert_eq!(invalid.body.code, "access_token_invalid");

        let internal = ApiError::from(AuthError::internal("store call timed out"));
        assert_eq!(internal.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(internal.body.message, "internal server error");
    }

    #[test]
    fn store_errors_map_to_codes() {
        let not_found = ApiError::from(StoreError::NotFound("role".into()));
        assert_eq!(not_found.status, StatusCode::NOT_FOUND);
        assert_eq!(not_found.body.code, "resource_not_found");

        let duplicate = ApiError::from(StoreError::Duplicate("role exists".into()));
        assert_eq!(duplicate.status, StatusCode::CONFLICT);
        assert_eq!(duplicate.body.code, "resource_already_exists");

        let mut fields = FieldErrors::new();
        fields.insert("name".into(), "is required".into());
        let invalid = ApiError::from(StoreError::InvalidArgument(fields));
        assert_eq!(invalid.status, StatusCode::BAD_REQUEST);
        assert_eq!(invalid.body.code, "request_data_invalid");
        assert_eq!(
            invalid.body.validation.as_ref().and_then(|v| v.get("name")).map(String::as_str),
            Some("is required")
        );

        let unexpected = ApiError::from(StoreError::Unexpected(anyhow::anyhow!("boom")));
        assert_eq!(unexpected.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(unexpected.body.code, "internal");
    }

    #[test]
    fn validation_is_omitted_from_plain_errors() {
        let body = serde_json::to_value(api_not_found("gone").body).expect("json");
        assert!(body.get("validation").is_none());
        assert_eq!(body["code"], "resource_not_found");
    }
}
