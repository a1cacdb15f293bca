//! Tracking for long-running background operations
//!
//! Log archive and delete runs are spawned as tokio tasks and report their
//! progress here. Clients poll progress by operation id and fetch the final
//! result once the operation has finished. Only one operation may run at a
//! time; finished records are dropped after a configurable TTL.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use strum::Display;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::errors::{AppError, AppResult};

/// Lifecycle of a tracked operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationState {
    Pending,
    Running,
    Completed,
    Failed,
}

impl OperationState {
    pub fn is_finished(&self) -> bool {
        matches!(self, OperationState::Completed | OperationState::Failed)
    }
}

/// Kinds of operation that can be tracked
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum OperationType {
    ArchiveLogs,
    DeleteLogs,
}

/// Snapshot returned by the progress endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationProgress {
    pub id: Uuid,
    pub operation_type: OperationType,
    pub state: OperationState,
    pub processed: u64,
    pub total: u64,
    pub percentage: f64,
    pub message: String,
    pub affected: u64,
    pub error: Option<String>,
    pub started_at: DateTime<Utc>,
    pub last_update: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl OperationProgress {
    fn new(id: Uuid, operation_type: OperationType, message: String) -> Self {
        let now = Utc::now();
        Self {
            id,
            operation_type,
            state: OperationState::Pending,
            processed: 0,
            total: 0,
            percentage: 0.0,
            message,
            affected: 0,
            error: None,
            started_at: now,
            last_update: now,
            completed_at: None,
        }
    }

    fn set_processed(&mut self, processed: u64, total: u64) {
        self.processed = processed;
        self.total = total;
        self.percentage = if total > 0 {
            ((processed as f64 / total as f64) * 100.0).min(100.0)
        } else {
            0.0
        };
    }
}

/// Final outcome of a finished operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationResult {
    pub id: Uuid,
    pub operation_type: OperationType,
    pub state: OperationState,
    pub affected: u64,
    pub error: Option<String>,
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Clone)]
pub struct OperationManager {
    storage: Arc<RwLock<HashMap<Uuid, OperationProgress>>>,
    active_operations: Arc<RwLock<HashSet<Uuid>>>,
    operation_ttl: Duration,
}

impl OperationManager {
    pub fn new(operation_ttl: Duration) -> Self {
        Self {
            storage: Arc::new(RwLock::new(HashMap::new())),
            active_operations: Arc::new(RwLock::new(HashSet::new())),
            operation_ttl,
        }
    }

    /// Register a new operation, failing if another one is still running
    pub async fn begin(
        &self,
        operation_type: OperationType,
        message: impl Into<String>,
    ) -> AppResult<OperationHandle> {
        let id = Uuid::new_v4();
        {
            let mut active = self.active_operations.write().await;
            if let Some(running) = active.iter().next() {
                warn!(
                    "Refusing to start {} while operation {} is still running",
                    operation_type, running
                );
                return Err(AppError::operation_in_progress(
                    operation_type.to_string(),
                    "logs",
                ));
            }
            active.insert(id);
        }

        let progress = OperationProgress::new(id, operation_type, message.into());
        self.storage.write().await.insert(id, progress);
        debug!(operation_id = %id, "Registered {} operation", operation_type);

        Ok(OperationHandle {
            id,
            manager: self.clone(),
            finished: false,
        })
    }

    pub async fn is_operation_in_progress(&self) -> bool {
        !self.active_operations.read().await.is_empty()
    }

    pub async fn get_progress(&self, id: &Uuid) -> Option<OperationProgress> {
        self.storage.read().await.get(id).cloned()
    }

    /// Final result; a conflict while the operation is still running
    pub async fn get_result(&self, id: &Uuid) -> AppResult<OperationResult> {
        let progress = self
            .get_progress(id)
            .await
            .ok_or_else(|| AppError::not_found("Operation", id))?;

        if !progress.state.is_finished() {
            return Err(AppError::conflict(format!(
                "Operation {} is still {}",
                id,
                match progress.state {
                    OperationState::Pending => "pending",
                    _ => "running",
                }
            )));
        }

        Ok(OperationResult {
            id: progress.id,
            operation_type: progress.operation_type,
            state: progress.state,
            affected: progress.affected,
            error: progress.error,
            completed_at: progress.completed_at,
        })
    }

    /// Drop finished operations older than the TTL; returns how many were removed
    pub async fn cleanup_finished(&self) -> usize {
        let ttl = chrono::Duration::from_std(self.operation_ttl)
            .unwrap_or_else(|_| chrono::Duration::days(1));
        let cutoff = Utc::now() - ttl;

        let mut storage = self.storage.write().await;
        let before = storage.len();
        storage.retain(|_, progress| match progress.completed_at {
            Some(completed_at) => !(progress.state.is_finished() && completed_at <= cutoff),
            None => true,
        });
        let removed = before - storage.len();
        if removed > 0 {
            debug!("Removed {} finished operation record(s)", removed);
        }
        removed
    }

    async fn update<F>(&self, id: &Uuid, f: F)
    where
        F: FnOnce(&mut OperationProgress),
    {
        let mut storage = self.storage.write().await;
        if let Some(progress) = storage.get_mut(id) {
            f(progress);
            progress.last_update = Utc::now();
        }
    }

    async fn finish(&self, id: &Uuid) {
        self.active_operations.write().await.remove(id);
    }

    /// Mark an operation whose task went away as failed and release it
    async fn interrupt(&self, id: &Uuid) {
        self.update(id, |progress| {
            if !progress.state.is_finished() {
                progress.state = OperationState::Failed;
                progress.message = format!("Failed: {}", INTERRUPTED);
                progress.error = Some(INTERRUPTED.to_string());
                progress.completed_at = Some(Utc::now());
            }
        })
        .await;
        self.finish(id).await;
    }
}

const INTERRUPTED: &str = "Operation was interrupted";

/// Reporting handle held by the task running an operation.
///
/// Dropping it without calling [`complete`](Self::complete) or
/// [`fail`](Self::fail), e.g. when the task panics or is aborted, marks the
/// operation failed so the next operation can start.
pub struct OperationHandle {
    id: Uuid,
    manager: OperationManager,
    finished: bool,
}

impl OperationHandle {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub async fn update_progress(&self, processed: u64, total: u64, message: impl Into<String>) {
        let message = message.into();
        self.manager
            .update(&self.id, |progress| {
                progress.state = OperationState::Running;
                progress.set_processed(processed, total);
                progress.message = message;
            })
            .await;
    }

    pub async fn complete(mut self, affected: u64, message: impl Into<String>) {
        let message = message.into();
        self.manager
            .update(&self.id, |progress| {
                progress.state = OperationState::Completed;
                progress.affected = affected;
                if progress.total == 0 {
                    progress.total = affected;
                }
                progress.set_processed(progress.total, progress.total);
                if progress.total == 0 {
                    progress.percentage = 100.0;
                }
                progress.message = message;
                progress.completed_at = Some(Utc::now());
            })
            .await;
        self.manager.finish(&self.id).await;
        self.finished = true;
        info!(operation_id = %self.id, affected, "Operation completed");
    }

    pub async fn fail(mut self, affected: u64, error: impl Into<String>) {
        let error = error.into();
        self.manager
            .update(&self.id, |progress| {
                progress.state = OperationState::Failed;
                progress.affected = affected;
                progress.message = format!("Failed: {}", error);
                progress.error = Some(error);
                progress.completed_at = Some(Utc::now());
            })
            .await;
        self.manager.finish(&self.id).await;
        self.finished = true;
        warn!(operation_id = %self.id, "Operation failed");
    }
}

impl Drop for OperationHandle {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        warn!(operation_id = %self.id, "Operation ended without reporting a result");

        let manager = self.manager.clone();
        let id = self.id;
        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                runtime.spawn(async move { manager.interrupt(&id).await });
            }
            Err(_) => {
                if let Ok(mut active) = manager.active_operations.try_write() {
                    active.remove(&id);
                }
            }
        }
    }
}
