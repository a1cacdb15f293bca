//! Log archive and delete operations
//!
//! Both operations run as spawned tasks that work through the matching log
//! entries in batches, reporting progress through the [`OperationManager`].

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde_json::json;
use tracing::{error, info};
use uuid::Uuid;

use crate::config::LogsConfig;
use crate::database::repositories::LogEntrySeaOrmRepository;
use crate::errors::{AppError, AppResult};
use crate::models::{ActionType, LogLevel, NewLogEntry};
use crate::services::ActivityLogger;
use crate::services::operations::{
    OperationHandle, OperationManager, OperationProgress, OperationResult, OperationType,
};

#[derive(Clone)]
pub struct LogArchiveService {
    repo: LogEntrySeaOrmRepository,
    operations: OperationManager,
    activity: ActivityLogger,
    config: LogsConfig,
}

impl LogArchiveService {
    pub fn new(
        repo: LogEntrySeaOrmRepository,
        operations: OperationManager,
        activity: ActivityLogger,
        config: LogsConfig,
    ) -> Self {
        Self {
            repo,
            operations,
            activity,
            config,
        }
    }

    /// Start archiving entries older than `older_than_days` (config default when absent)
    pub async fn start_archive(
        &self,
        older_than_days: Option<u32>,
        actor: Option<String>,
    ) -> AppResult<Uuid> {
        let days = older_than_days.unwrap_or(self.config.archive_after_days);
        let cutoff = Self::cutoff(days)?;
        let handle = self
            .operations
            .begin(
                OperationType::ArchiveLogs,
                format!("Archiving logs older than {} days", days),
            )
            .await?;
        let operation_id = handle.id();

        let service = self.clone();
        tokio::spawn(async move {
            service.run_archive(handle, cutoff, days, actor).await;
        });

        info!(operation_id = %operation_id, older_than_days = days, "Started log archive");
        Ok(operation_id)
    }

    /// Start deleting entries older than `older_than_days`
    pub async fn start_delete(
        &self,
        older_than_days: u32,
        archived_only: bool,
        actor: Option<String>,
    ) -> AppResult<Uuid> {
        let cutoff = Self::cutoff(older_than_days)?;
        let handle = self
            .operations
            .begin(
                OperationType::DeleteLogs,
                format!("Deleting logs older than {} days", older_than_days),
            )
            .await?;
        let operation_id = handle.id();

        let service = self.clone();
        tokio::spawn(async move {
            service
                .run_delete(handle, cutoff, older_than_days, archived_only, actor)
                .await;
        });

        info!(
            operation_id = %operation_id,
            older_than_days,
            archived_only,
            "Started log deletion"
        );
        Ok(operation_id)
    }

    pub async fn progress(&self, operation_id: &Uuid) -> AppResult<OperationProgress> {
        self.operations
            .get_progress(operation_id)
            .await
            .ok_or_else(|| AppError::not_found("Operation", operation_id))
    }

    pub async fn result(&self, operation_id: &Uuid) -> AppResult<OperationResult> {
        self.operations.get_result(operation_id).await
    }

    async fn run_archive(
        &self,
        handle: OperationHandle,
        cutoff: DateTime<Utc>,
        days: u32,
        actor: Option<String>,
    ) {
        let total = match self.repo.count_archivable(cutoff).await {
            Ok(total) => total,
            Err(e) => {
                error!("Failed to count archivable logs: {}", e);
                handle.fail(0, e.to_string()).await;
                return;
            }
        };
        handle
            .update_progress(0, total, format!("Archiving {} entries", total))
            .await;

        let archived_at = Utc::now();
        let mut processed = 0u64;
        loop {
            match self
                .repo
                .archive_batch(cutoff, self.config.batch_size, archived_at)
                .await
            {
                Ok(0) => break,
                Ok(count) => {
                    processed += count;
                    handle
                        .update_progress(
                            processed,
                            total.max(processed),
                            format!("Archived {} of {} entries", processed, total),
                        )
                        .await;
                }
                Err(e) => {
                    error!("Log archive failed after {} entries: {}", processed, e);
                    handle.fail(processed, e.to_string()).await;
                    return;
                }
            }
        }

        handle
            .complete(processed, format!("Archived {} entries", processed))
            .await;

        self.activity
            .record(
                NewLogEntry::new(
                    LogLevel::Info,
                    ActionType::LogsArchived,
                    format!("Archived {} log entries older than {} days", processed, days),
                )
                .with_user(actor)
                .with_details(json!({ "archived": processed, "older_than_days": days })),
            )
            .await;
    }

    async fn run_delete(
        &self,
        handle: OperationHandle,
        cutoff: DateTime<Utc>,
        days: u32,
        archived_only: bool,
        actor: Option<String>,
    ) {
        let total = match self.repo.count_deletable(cutoff, archived_only).await {
            Ok(total) => total,
            Err(e) => {
                error!("Failed to count deletable logs: {}", e);
                handle.fail(0, e.to_string()).await;
                return;
            }
        };
        handle
            .update_progress(0, total, format!("Deleting {} entries", total))
            .await;

        let mut processed = 0u64;
        loop {
            match self
                .repo
                .delete_batch(cutoff, archived_only, self.config.batch_size)
                .await
            {
                Ok(0) => break,
                Ok(count) => {
                    processed += count;
                    handle
                        .update_progress(
                            processed,
                            total.max(processed),
                            format!("Deleted {} of {} entries", processed, total),
                        )
                        .await;
                }
                Err(e) => {
                    error!("Log deletion failed after {} entries: {}", processed, e);
                    handle.fail(processed, e.to_string()).await;
                    return;
                }
            }
        }

        handle
            .complete(processed, format!("Deleted {} entries", processed))
            .await;

        // Recorded after the run so the entry is not caught by it
        self.activity
            .record(
                NewLogEntry::new(
                    LogLevel::Warn,
                    ActionType::LogsDeleted,
                    format!("Deleted {} log entries older than {} days", processed, days),
                )
                .with_user(actor)
                .with_details(json!({
                    "deleted": processed,
                    "older_than_days": days,
                    "archived_only": archived_only,
                })),
            )
            .await;
    }

    fn cutoff(days: u32) -> AppResult<DateTime<Utc>> {
        Utc::now()
            .checked_sub_signed(ChronoDuration::days(i64::from(days)))
            .ok_or_else(|| AppError::validation(format!("Invalid age: {} days", days)))
    }
}
