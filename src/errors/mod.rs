//! Centralized error handling for the cattery admin service
//!
//! Every layer has its own error enum; they all convert into [`AppError`],
//! which the web layer maps onto HTTP status codes.
//!
//! # Error Categories
//!
//! - **Database Errors**: SeaORM operations, migrations, connection issues
//! - **Repository Errors**: Data access layer failures
//! - **Storage Errors**: Media file storage and sandbox violations
//! - **Translation Errors**: Upstream translation provider and cache failures
//! - **Client Errors**: Failures of the typed admin API client
//!
//! # Usage
//!
//! ```rust
//! use cattery_admin::errors::{AppError, AppResult};
//!
//! fn check_name(name: &str) -> AppResult<()> {
//!     if name.trim().is_empty() {
//!         return Err(AppError::validation("name must not be empty"));
//!     }
//!     Ok(())
//! }
//! ```

pub mod types;

pub use types::*;

/// Convenience type alias for Results using AppError
pub type AppResult<T> = Result<T, AppError>;

/// Convenience type alias for Repository Results
pub type RepositoryResult<T> = Result<T, RepositoryError>;

/// Convenience type alias for Storage Results
pub type StorageResult<T> = Result<T, StorageError>;

/// Convenience type alias for Translation Results
pub type TranslationResult<T> = Result<T, TranslationError>;

/// Convenience type alias for Client Results
pub type ClientResult<T> = Result<T, ClientError>;
