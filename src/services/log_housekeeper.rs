use chrono::Utc;
use serde_json::json;
use std::time::Duration;
use tokio::time::{MissedTickBehavior, interval};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, trace};

use crate::config::LogsConfig;
use crate::database::repositories::LogEntrySeaOrmRepository;
use crate::errors::{AppError, AppResult};
use crate::models::{ActionType, LogLevel, NewLogEntry};
use crate::services::ActivityLogger;
use crate::services::operations::OperationManager;

/// Outcome of one housekeeping cycle
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HousekeepingReport {
    pub purged_logs: u64,
    pub expired_operations: usize,
}

/// Background retention for archived logs and finished operation records
pub struct LogHousekeeper {
    repo: LogEntrySeaOrmRepository,
    operations: OperationManager,
    activity: ActivityLogger,
    archive_retention: Duration,
    housekeeper_interval: Duration,
}

impl LogHousekeeper {
    pub fn from_config(
        repo: LogEntrySeaOrmRepository,
        operations: OperationManager,
        activity: ActivityLogger,
        config: &LogsConfig,
    ) -> Self {
        Self {
            repo,
            operations,
            activity,
            archive_retention: config.archive_retention,
            housekeeper_interval: config.housekeeper_interval,
        }
    }

    /// Run cleanup cycles until `shutdown` is cancelled
    pub async fn start(self, shutdown: CancellationToken) {
        let mut interval = interval(self.housekeeper_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!(
            "Starting log housekeeper with interval {:?}, retention {:?}",
            self.housekeeper_interval, self.archive_retention
        );

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("Log housekeeper stopped");
                    break;
                }
                _ = interval.tick() => {
                    if let Err(e) = self.run_cleanup().await {
                        error!("Log housekeeper error: {}", e);
                    }
                }
            }
        }
    }

    pub async fn run_cleanup(&self) -> AppResult<HousekeepingReport> {
        let start_time = Utc::now();
        let retention = chrono::Duration::from_std(self.archive_retention).map_err(|e| {
            AppError::configuration(format!("Invalid archive retention: {}", e))
        })?;
        let cutoff = start_time - retention;

        let report = HousekeepingReport {
            purged_logs: self.repo.purge_archived_before(cutoff).await?,
            expired_operations: self.operations.cleanup_finished().await,
        };

        let duration_ms = Utc::now()
            .signed_duration_since(start_time)
            .num_milliseconds();
        if report.purged_logs > 0 || report.expired_operations > 0 {
            info!(
                "Log housekeeper completed in {}ms: {} archived logs purged, {} operation records expired",
                duration_ms, report.purged_logs, report.expired_operations
            );
        } else {
            trace!("Log housekeeper completed in {}ms: no work performed", duration_ms);
        }

        if report.purged_logs > 0 {
            self.activity
                .record(
                    NewLogEntry::new(
                        LogLevel::Info,
                        ActionType::LogsPurged,
                        format!(
                            "Purged {} archived log entries past retention",
                            report.purged_logs
                        ),
                    )
                    .with_details(json!({ "purged": report.purged_logs })),
                )
                .await;
        }

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DatabaseConfig;
    use crate::database::Database;
    use crate::models::{LogEntry, LogQuery};
    use tracing_test::traced_test;
    use uuid::Uuid;

    async fn create_housekeeper() -> (LogHousekeeper, LogEntrySeaOrmRepository) {
        let database = Database::new(&DatabaseConfig {
            url: "sqlite::memory:".to_string(),
            max_connections: Some(1),
        })
        .await
        .unwrap();
        database.migrate().await.unwrap();

        let repo = LogEntrySeaOrmRepository::new(database.connection());
        let housekeeper = LogHousekeeper::from_config(
            repo.clone(),
            OperationManager::new(Duration::ZERO),
            ActivityLogger::new(repo.clone()),
            &LogsConfig {
                archive_retention: Duration::from_secs(30 * 86400),
                ..LogsConfig::default()
            },
        );
        (housekeeper, repo)
    }

    fn archived_entry(archived_days_ago: i64) -> LogEntry {
        let archived_at = Utc::now() - chrono::Duration::days(archived_days_ago);
        LogEntry {
            id: Uuid::new_v4(),
            timestamp: archived_at - chrono::Duration::days(60),
            level: LogLevel::Info,
            message: "old".to_string(),
            action_type: "cat_updated".to_string(),
            cat_id: None,
            user_id: None,
            user_email: None,
            archived: true,
            archived_at: Some(archived_at),
            details: None,
        }
    }

    #[tokio::test]
    #[traced_test]
    async fn test_cleanup_purges_archived_logs_past_retention() {
        let (housekeeper, repo) = create_housekeeper().await;
        repo.insert(&archived_entry(45)).await.unwrap();
        repo.insert(&archived_entry(5)).await.unwrap();

        let report = housekeeper.run_cleanup().await.unwrap();
        assert_eq!(report.purged_logs, 1);
        assert!(logs_contain("1 archived logs purged"));

        let (remaining, _) = repo
            .list(&LogQuery {
                action_type: Some("cat_updated".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(remaining.len(), 1);
    }

    #[tokio::test]
    async fn test_housekeeper_stops_on_cancellation() {
        let (housekeeper, _) = create_housekeeper().await;
        let shutdown = CancellationToken::new();
        let handle = tokio::spawn(housekeeper.start(shutdown.clone()));

        shutdown.cancel();
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap();
    }
}
