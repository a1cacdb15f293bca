//! Activity logging
//!
//! Mutating operations record what happened in the `logs` table. Recording
//! is best effort: a failed insert is reported through tracing and never
//! fails the operation that triggered it.

use chrono::Utc;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::database::repositories::{LogEntrySeaOrmRepository, traits::ConversionUtils};
use crate::errors::AppResult;
use crate::models::{LogEntry, LogQuery, NewLogEntry, PaginatedResponse};

#[derive(Clone)]
pub struct ActivityLogger {
    repo: LogEntrySeaOrmRepository,
}

impl ActivityLogger {
    pub fn new(repo: LogEntrySeaOrmRepository) -> Self {
        Self { repo }
    }

    /// Record an entry, swallowing storage failures
    pub async fn record(&self, entry: NewLogEntry) {
        let action_type = entry.action_type.clone();
        if let Err(e) = self.insert(entry).await {
            warn!(action_type = %action_type, "Failed to record activity log entry: {}", e);
        }
    }

    /// Record an entry submitted by a client, surfacing failures
    pub async fn insert(&self, entry: NewLogEntry) -> AppResult<LogEntry> {
        let log_entry = LogEntry {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            level: entry.level,
            message: entry.message,
            action_type: entry.action_type,
            cat_id: entry.cat_id,
            user_id: entry.user_id,
            user_email: entry.user_email,
            archived: false,
            archived_at: None,
            details: entry.details,
        };

        let stored = self.repo.insert(&log_entry).await?;
        debug!(action_type = %stored.action_type, "Recorded activity");
        Ok(stored)
    }

    pub async fn list(&self, query: &LogQuery) -> AppResult<PaginatedResponse<LogEntry>> {
        let (page, per_page) = ConversionUtils::page_params(query.page, query.limit);
        let (items, total) = self.repo.list(query).await?;
        Ok(PaginatedResponse::new(items, total, page, per_page))
    }
}
