//! Shared helpers for the SeaORM repository implementations

use std::str::FromStr;

use crate::errors::{RepositoryError, RepositoryResult};

/// Default page size when a list request does not specify one
pub const DEFAULT_PAGE_SIZE: u32 = 50;
/// Upper bound on page size
pub const MAX_PAGE_SIZE: u32 = 500;

/// Common conversion utilities for stored columns
pub struct ConversionUtils;

impl ConversionUtils {
    /// Parse a string column into a strum-backed enum
    pub fn parse_enum<T: FromStr>(field: &str, value: &str) -> RepositoryResult<T> {
        T::from_str(value).map_err(|_| RepositoryError::InvalidValue {
            field: field.to_string(),
            value: value.to_string(),
        })
    }

    /// Decode a JSON array of strings stored in a text column
    pub fn parse_string_list(value: &str) -> RepositoryResult<Vec<String>> {
        if value.trim().is_empty() {
            return Ok(Vec::new());
        }
        Ok(serde_json::from_str(value)?)
    }

    pub fn encode_string_list(values: &[String]) -> RepositoryResult<String> {
        Ok(serde_json::to_string(values)?)
    }

    /// Normalise optional page/limit into a 1-based page and bounded page size
    pub fn page_params(page: Option<u32>, limit: Option<u32>) -> (u32, u32) {
        let page = page.unwrap_or(1).max(1);
        let limit = limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
        (page, limit)
    }
}
