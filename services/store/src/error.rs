//! Error types for the book store service

use std::collections::BTreeMap;

use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::json;
use thiserror::Error;

/// Message returned with every authorization denial.
pub const PERMISSION_DENIED: &str = "You do not have permission to perform this action.";

/// Field-level validation messages, keyed by payload field name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors(BTreeMap<&'static str, Vec<String>>);

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a message against a field
    pub fn add(&mut self, field: &'static str, message: impl Into<String>) {
        self.0.entry(field).or_default().push(message.into());
    }

    /// Messages recorded for a field
    #[cfg(test)]
    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// `Ok(())` when nothing was recorded
    pub fn into_result(self) -> Result<(), Self> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }
}

/// Custom error type for the book store service
#[derive(Error, Debug)]
pub enum ApiError {
    /// Missing, malformed or expired credentials
    #[error("Unauthorized")]
    Unauthorized,

    /// Authenticated (or anonymous) caller may not touch this object
    #[error("{}", PERMISSION_DENIED)]
    Forbidden,

    /// Target object does not exist
    #[error("Not found")]
    NotFound,

    /// Request body or query string could not be parsed
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Well-formed request carrying invalid field values
    #[error("Validation failed")]
    Validation(ValidationErrors),

    /// Anything the store or the runtime failed at
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl From<ValidationErrors> for ApiError {
    fn from(errors: ValidationErrors) -> Self {
        ApiError::Validation(errors)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                json!({ "error": "Authentication credentials were not provided or are invalid." }),
            ),
            ApiError::Forbidden => (StatusCode::FORBIDDEN, json!({ "error": PERMISSION_DENIED })),
            ApiError::NotFound => (StatusCode::NOT_FOUND, json!({ "error": "Not found." })),
            ApiError::BadRequest(message) => (StatusCode::BAD_REQUEST, json!({ "error": message })),
            ApiError::Validation(fields) => (
                StatusCode::BAD_REQUEST,
                json!({ "error": "Validation failed.", "fields": fields }),
            ),
            ApiError::Internal(e) => {
                tracing::error!(error = ?e, "Request failed with an internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "error": "Internal server error" }),
                )
            }
        };

        (status, Json(body)).into_response()
    }
}

/// Type alias for API results
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn validation_errors_collect_per_field() {
        let mut errors = ValidationErrors::new();
        assert!(errors.clone().into_result().is_ok());

        errors.add("name", "This field is required.");
        errors.add("name", "second");
        errors.add("price", "A valid number is required.");

        assert_eq!(errors.get("name").unwrap().len(), 2);
        assert_eq!(errors.get("rate"), None);
        assert!(errors.into_result().is_err());
    }

    #[tokio::test]
    async fn forbidden_uses_fixed_message() {
        let response = ApiError::Forbidden.into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let body = body_json(response).await;
        assert_eq!(body["error"], PERMISSION_DENIED);
    }

    #[tokio::test]
    async fn validation_error_carries_field_detail() {
        let mut errors = ValidationErrors::new();
        errors.add("rate", "\"6\" is not a valid choice.");

        let response = ApiError::from(errors).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = body_json(response).await;
        assert_eq!(body["fields"]["rate"][0], "\"6\" is not a valid choice.");
    }

    #[tokio::test]
    async fn internal_error_hides_details() {
        let response =
            ApiError::Internal(anyhow::anyhow!("connection reset by peer")).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = body_json(response).await;
        assert_eq!(body["error"], "Internal server error");
    }

    #[test]
    fn status_mapping() {
        assert_eq!(
            ApiError::Unauthorized.into_response().status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ApiError::NotFound.into_response().status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::BadRequest("nope".into()).into_response().status(),
            StatusCode::BAD_REQUEST
        );
    }
}
