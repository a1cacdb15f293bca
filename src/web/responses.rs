//! HTTP response types and utilities
//!
//! Every endpoint answers with the same `{success, data, error, timestamp}`
//! envelope. Errors from the service layer are mapped onto status codes in
//! [`handle_error`].

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::error;

use crate::errors::{AppError, AppResult, StorageError, TranslationError};

/// Standard API response wrapper
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    /// Whether the operation was successful
    pub success: bool,
    /// Response data (present on success)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    /// Error message (present on failure)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Additional error details
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<HashMap<String, String>>,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

impl<T> ApiResponse<T>
where
    T: Serialize,
{
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            details: None,
            timestamp: chrono::Utc::now(),
        }
    }

    pub fn error(message: String) -> ApiResponse<()> {
        ApiResponse {
            success: false,
            data: None,
            error: Some(message),
            details: None,
            timestamp: chrono::Utc::now(),
        }
    }

    pub fn error_with_details(message: String, details: HashMap<String, String>) -> ApiResponse<()> {
        ApiResponse {
            success: false,
            data: None,
            error: Some(message),
            details: Some(details),
            timestamp: chrono::Utc::now(),
        }
    }
}

impl<T> IntoResponse for ApiResponse<T>
where
    T: Serialize,
{
    fn into_response(self) -> Response {
        let status = if self.success {
            StatusCode::OK
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };

        (status, Json(self)).into_response()
    }
}

/// Convert an `AppResult` into a 200 response or a mapped error
pub fn handle_result<T>(result: AppResult<T>) -> Response
where
    T: Serialize,
{
    match result {
        Ok(data) => ok(data).into_response(),
        Err(error) => handle_error(error).into_response(),
    }
}

/// Like [`handle_result`] but answers 201 on success
pub fn handle_created<T>(result: AppResult<T>) -> Response
where
    T: Serialize,
{
    match result {
        Ok(data) => created(data).into_response(),
        Err(error) => handle_error(error).into_response(),
    }
}

/// Convert AppError to appropriate HTTP response
pub fn handle_error(error: AppError) -> impl IntoResponse {
    let (status, message, details) = match &error {
        AppError::Validation { message } => (StatusCode::BAD_REQUEST, message.clone(), None),
        AppError::NotFound { resource, id } => (
            StatusCode::NOT_FOUND,
            format!("{} with id '{}' not found", resource, id),
            None,
        ),
        AppError::MediaLocked { id, reason } => (
            StatusCode::LOCKED,
            format!("Media '{}' is locked", id),
            Some(HashMap::from([("reason".to_string(), reason.clone())])),
        ),
        AppError::Conflict { message } => (StatusCode::CONFLICT, message.clone(), None),
        AppError::OperationInProgress {
            operation_type,
            resource,
        } => (
            StatusCode::CONFLICT,
            format!("A {} operation is already running on {}", operation_type, resource),
            None,
        ),
        AppError::Translation(e) => translation_status(e),
        AppError::Storage(e) => storage_status(e),
        AppError::Configuration { message } => (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Configuration error: {}", message),
            None,
        ),
        AppError::Database(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Database operation failed".to_string(),
            None,
        ),
        AppError::Repository(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Data access failed".to_string(),
            None,
        ),
        AppError::Internal { message } => (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Internal error: {}", message),
            None,
        ),
    };

    if status.is_server_error() {
        error!(status = status.as_u16(), "Request failed: {}", error);
    }

    let response = if let Some(details) = details {
        ApiResponse::<()>::error_with_details(message, details)
    } else {
        ApiResponse::<()>::error(message)
    };

    (status, Json(response))
}

fn translation_status(error: &TranslationError) -> (StatusCode, String, Option<HashMap<String, String>>) {
    let status = match error {
        TranslationError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
        TranslationError::NotConfigured => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::BAD_GATEWAY,
    };
    (status, error.to_string(), None)
}

fn storage_status(error: &StorageError) -> (StatusCode, String, Option<HashMap<String, String>>) {
    match error {
        StorageError::UnsupportedContentType { .. } | StorageError::PathValidation { .. } => {
            (StatusCode::BAD_REQUEST, error.to_string(), None)
        }
        StorageError::TooLarge { .. } => (StatusCode::PAYLOAD_TOO_LARGE, error.to_string(), None),
        StorageError::Io(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Media storage failed".to_string(),
            None,
        ),
    }
}

/// Success response helpers
pub fn ok<T: Serialize>(data: T) -> impl IntoResponse {
    (StatusCode::OK, Json(ApiResponse::success(data)))
}

pub fn created<T: Serialize>(data: T) -> impl IntoResponse {
    (StatusCode::CREATED, Json(ApiResponse::success(data)))
}

/// 202 for background operations that were started but not finished
pub fn accepted<T: Serialize>(data: T) -> impl IntoResponse {
    (StatusCode::ACCEPTED, Json(ApiResponse::success(data)))
}

pub fn bad_request(message: &str) -> impl IntoResponse {
    (
        StatusCode::BAD_REQUEST,
        Json(ApiResponse::<()>::error(message.to_string())),
    )
}

/// Body of `/health`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub database: String,
    pub translation_configured: bool,
    pub cache_backend: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    async fn status_and_body(error: AppError) -> (StatusCode, serde_json::Value) {
        let response = handle_error(error).into_response();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_locked_media_maps_to_423_with_reason() {
        let (status, body) = status_and_body(AppError::MediaLocked {
            id: "m1".to_string(),
            reason: "cover photo".to_string(),
        })
        .await;
        assert_eq!(status, StatusCode::LOCKED);
        assert_eq!(body["success"], false);
        assert_eq!(body["details"]["reason"], "cover photo");
        assert!(body.get("data").is_none());
    }

    #[tokio::test]
    async fn test_error_status_mapping() {
        let cases = vec![
            (AppError::validation("bad"), StatusCode::BAD_REQUEST),
            (AppError::not_found("Cat", "x"), StatusCode::NOT_FOUND),
            (AppError::conflict("busy"), StatusCode::CONFLICT),
            (
                AppError::operation_in_progress("archive_logs", "logs"),
                StatusCode::CONFLICT,
            ),
            (
                AppError::Translation(TranslationError::RateLimited),
                StatusCode::TOO_MANY_REQUESTS,
            ),
            (
                AppError::Translation(TranslationError::AuthenticationFailed {
                    message: "bad key".to_string(),
                }),
                StatusCode::BAD_GATEWAY,
            ),
            (
                AppError::Storage(StorageError::TooLarge {
                    size: 10,
                    max_size: 5,
                }),
                StatusCode::PAYLOAD_TOO_LARGE,
            ),
            (AppError::internal("boom"), StatusCode::INTERNAL_SERVER_ERROR),
        ];

        for (error, expected) in cases {
            let (status, _) = status_and_body(error).await;
            assert_eq!(status, expected);
        }
    }

    #[test]
    fn test_success_envelope_omits_error() {
        let json = serde_json::to_value(ApiResponse::success(vec![1, 2])).unwrap();
        assert_eq!(json["success"], true);
        assert_eq!(json["data"], serde_json::json!([1, 2]));
        assert!(json.get("error").is_none());
    }
}
