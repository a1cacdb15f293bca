//! Error type definitions for the cattery admin service
//!
//! This module defines all error types used throughout the application,
//! providing a hierarchical error system that makes debugging and error
//! handling more straightforward.

use std::path::PathBuf;

use thiserror::Error;

/// Top-level application error type
///
/// This enum represents all possible errors that can occur in the application.
/// It uses `thiserror` to provide automatic error trait implementations and
/// proper error chaining.
#[derive(Error, Debug)]
pub enum AppError {
    /// Database-related errors (SeaORM)
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    /// Repository layer errors
    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),

    /// Media storage errors
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Translation errors
    #[error("Translation error: {0}")]
    Translation(#[from] TranslationError),

    /// Validation errors
    #[error("Validation error: {message}")]
    Validation { message: String },

    /// Resource not found errors
    #[error("Not found: {resource} with id {id}")]
    NotFound { resource: String, id: String },

    /// Media item is locked against deletion
    #[error("Media {id} is locked: {reason}")]
    MediaLocked { id: String, reason: String },

    /// State conflict (e.g. restoring an item that is not trashed)
    #[error("Conflict: {message}")]
    Conflict { message: String },

    /// Configuration errors
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// Operation already in progress errors
    #[error("Operation already in progress: {operation_type} on {resource}")]
    OperationInProgress {
        operation_type: String,
        resource: String,
    },

    /// Generic internal errors
    #[error("Internal error: {message}")]
    Internal { message: String },
}

/// Repository layer specific errors
#[derive(Error, Debug)]
pub enum RepositoryError {
    /// Database errors from SeaORM
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    /// Data serialization/deserialization failures
    #[error("Serialization failed: {0}")]
    SerializationFailed(#[from] serde_json::Error),

    /// A stored value could not be mapped onto the domain model
    #[error("Invalid stored value: {field} = {value}")]
    InvalidValue { field: String, value: String },

    /// Record not found
    #[error("Record not found: {table} with {field} = {value}")]
    RecordNotFound {
        table: String,
        field: String,
        value: String,
    },
}

/// Media storage specific errors
#[derive(Error, Debug)]
pub enum StorageError {
    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Path validation failed - potential security issue
    #[error("Path validation failed: {path:?} - {reason}")]
    PathValidation { path: PathBuf, reason: String },

    /// Uploaded content is not an accepted media type
    #[error("Unsupported content type: {content_type}")]
    UnsupportedContentType { content_type: String },

    /// Uploaded content exceeds the configured limit
    #[error("File too large: {size} bytes (max: {max_size})")]
    TooLarge { size: usize, max_size: usize },
}

/// Translation provider and cache errors
#[derive(Error, Debug, Clone)]
pub enum TranslationError {
    /// Provider rejected the credentials (HTTP 401/403)
    #[error("Authentication failed: {message}")]
    AuthenticationFailed { message: String },

    /// Provider rate limited the request (HTTP 429)
    #[error("Rate limited by translation provider")]
    RateLimited,

    /// Character quota exhausted (HTTP 456)
    #[error("Translation quota exceeded")]
    QuotaExceeded,

    /// Any other non-success upstream response
    #[error("Upstream error: {status} - {message}")]
    Upstream { status: u16, message: String },

    /// Transport level failure talking to the provider
    #[error("Request failed: {0}")]
    Request(String),

    /// Upstream response had an unexpected shape
    #[error("Invalid provider response: {0}")]
    InvalidResponse(String),

    /// Cache backend failure
    #[error("Cache error: {0}")]
    Cache(String),

    /// Translation is not configured (no API key)
    #[error("Translation provider is not configured")]
    NotConfigured,
}

/// Admin API client errors
#[derive(Error, Debug, Clone)]
pub enum ClientError {
    /// Transport level failure
    #[error("Request failed: {0}")]
    Request(String),

    /// Non-success HTTP status
    #[error("HTTP error: {status} - {message}")]
    Http { status: u16, message: String },

    /// Response body did not have the expected shape
    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),

    /// Request did not complete in time
    #[error("Request timed out: {url}")]
    Timeout { url: String },
}

/// Convenience methods for creating common error types
impl AppError {
    /// Create a validation error with a custom message
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Create a not found error for a resource
    pub fn not_found<R: Into<String>, I: ToString>(resource: R, id: I) -> Self {
        Self::NotFound {
            resource: resource.into(),
            id: id.to_string(),
        }
    }

    /// Create a conflict error
    pub fn conflict<S: Into<String>>(message: S) -> Self {
        Self::Conflict {
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn configuration<S: Into<String>>(message: S) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create an operation in progress error
    pub fn operation_in_progress<O: Into<String>, R: Into<String>>(
        operation_type: O,
        resource: R,
    ) -> Self {
        Self::OperationInProgress {
            operation_type: operation_type.into(),
            resource: resource.into(),
        }
    }

    /// Create an internal error
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}

impl TranslationError {
    /// Classify a non-success provider response by status code
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        match status {
            401 | 403 => Self::AuthenticationFailed {
                message: message.into(),
            },
            429 => Self::RateLimited,
            456 => Self::QuotaExceeded,
            _ => Self::Upstream {
                status,
                message: message.into(),
            },
        }
    }
}

impl From<reqwest::Error> for TranslationError {
    fn from(err: reqwest::Error) -> Self {
        Self::Request(err.to_string())
    }
}

impl From<redis::RedisError> for TranslationError {
    fn from(err: redis::RedisError) -> Self {
        Self::Cache(err.to_string())
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout {
                url: err.url().map(|u| u.to_string()).unwrap_or_default(),
            }
        } else {
            Self::Request(err.to_string())
        }
    }
}
