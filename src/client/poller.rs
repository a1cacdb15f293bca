//! Polling of background log operations
//!
//! Progress is polled at a fixed interval. After a few consecutive failed
//! polls the final-result endpoint is tried as well, since the operation may
//! have finished while progress was unavailable. Past the failure limit the
//! poller gives up and reports the operation as abandoned.

use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::config::ClientConfig;
use crate::errors::ClientResult;
use crate::services::{OperationProgress, OperationResult};

/// Where operation status comes from
#[async_trait]
pub trait ArchiveStatusSource: Send + Sync {
    async fn progress(&self, operation_id: &Uuid) -> ClientResult<OperationProgress>;

    async fn result(&self, operation_id: &Uuid) -> ClientResult<OperationResult>;
}

#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome {
    /// The operation finished, successfully or not
    Finished(OperationResult),
    /// Too many consecutive polls failed; the operation is no longer tracked
    Abandoned {
        failures: u32,
        last_error: Option<String>,
    },
}

pub struct ArchivePoller<S> {
    source: S,
    poll_interval: Duration,
    max_failures: u32,
    result_after_failures: u32,
}

impl<S: ArchiveStatusSource> ArchivePoller<S> {
    pub fn new(source: S, config: &ClientConfig) -> Self {
        Self {
            source,
            poll_interval: config.poll_interval,
            max_failures: config.max_poll_failures.max(1),
            result_after_failures: config.final_result_after_failures,
        }
    }

    /// Poll until the operation finishes or polling is abandoned.
    /// `on_progress` sees every successfully polled snapshot.
    pub async fn run<F>(&self, operation_id: Uuid, mut on_progress: F) -> PollOutcome
    where
        F: FnMut(&OperationProgress),
    {
        let mut failures = 0u32;
        let mut last_error = None;

        loop {
            match self.source.progress(&operation_id).await {
                Ok(progress) => {
                    failures = 0;
                    on_progress(&progress);
                    if progress.state.is_finished() {
                        return PollOutcome::Finished(self.final_result(progress).await);
                    }
                }
                Err(e) => {
                    failures += 1;
                    debug!(
                        operation_id = %operation_id,
                        failures, "Progress poll failed: {}", e
                    );
                    last_error = Some(e.to_string());

                    if failures >= self.result_after_failures {
                        if let Ok(result) = self.source.result(&operation_id).await {
                            if result.state.is_finished() {
                                return PollOutcome::Finished(result);
                            }
                        }
                    }

                    if failures >= self.max_failures {
                        warn!(
                            operation_id = %operation_id,
                            "Giving up on operation after {} failed polls", failures
                        );
                        return PollOutcome::Abandoned {
                            failures,
                            last_error,
                        };
                    }
                }
            }

            tokio::time::sleep(self.poll_interval).await;
        }
    }

    /// Prefer the result endpoint; fall back to the last progress snapshot
    async fn final_result(&self, progress: OperationProgress) -> OperationResult {
        match self.source.result(&progress.id).await {
            Ok(result) => result,
            Err(e) => {
                debug!("Result fetch failed, using last progress: {}", e);
                OperationResult {
                    id: progress.id,
                    operation_type: progress.operation_type,
                    state: progress.state,
                    affected: progress.affected,
                    error: progress.error,
                    completed_at: progress.completed_at,
                }
            }
        }
    }
}
