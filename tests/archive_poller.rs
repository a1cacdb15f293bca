use async_trait::async_trait;
use chrono::Utc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use uuid::Uuid;

use cattery_admin::client::{ArchivePoller, ArchiveStatusSource, PollOutcome};
use cattery_admin::config::ClientConfig;
use cattery_admin::errors::{ClientError, ClientResult};
use cattery_admin::services::{OperationProgress, OperationResult, OperationState, OperationType};

fn progress(id: Uuid, state: OperationState, processed: u64) -> OperationProgress {
    OperationProgress {
        id,
        operation_type: OperationType::ArchiveLogs,
        state,
        processed,
        total: 10,
        percentage: processed as f64 * 10.0,
        message: format!("Archived {processed} of 10"),
        affected: processed,
        error: None,
        started_at: Utc::now(),
        last_update: Utc::now(),
        completed_at: state.is_finished().then(Utc::now),
    }
}

fn finished(id: Uuid, affected: u64) -> OperationResult {
    OperationResult {
        id,
        operation_type: OperationType::ArchiveLogs,
        state: OperationState::Completed,
        affected,
        error: None,
        completed_at: Some(Utc::now()),
    }
}

fn assert_finished(outcome: PollOutcome, id: Uuid, affected: u64) {
    match outcome {
        PollOutcome::Finished(result) => {
            assert_eq!(result.id, id);
            assert_eq!(result.state, OperationState::Completed);
            assert_eq!(result.affected, affected);
        }
        other => panic!("expected Finished, got {other:?}"),
    }
}

fn config() -> ClientConfig {
    ClientConfig {
        poll_interval: Duration::from_secs(2),
        max_poll_failures: 10,
        final_result_after_failures: 3,
        ..ClientConfig::default()
    }
}

/// Scripted progress responses; `None` entries fail. Past the script every
/// poll fails.
struct ScriptedSource {
    progress: Mutex<Vec<Option<OperationProgress>>>,
    result: Option<OperationResult>,
    progress_calls: Arc<AtomicU32>,
    result_calls: Arc<AtomicU32>,
}

impl ScriptedSource {
    fn new(mut script: Vec<Option<OperationProgress>>, result: Option<OperationResult>) -> Self {
        script.reverse();
        Self {
            progress: Mutex::new(script),
            result,
            progress_calls: Arc::default(),
            result_calls: Arc::default(),
        }
    }

    fn unavailable() -> ClientError {
        ClientError::Http {
            status: 503,
            message: "unavailable".to_string(),
        }
    }
}

#[async_trait]
impl ArchiveStatusSource for ScriptedSource {
    async fn progress(&self, _operation_id: &Uuid) -> ClientResult<OperationProgress> {
        self.progress_calls.fetch_add(1, Ordering::SeqCst);
        let next = self.progress.lock().unwrap().pop().flatten();
        next.ok_or_else(Self::unavailable)
    }

    async fn result(&self, _operation_id: &Uuid) -> ClientResult<OperationResult> {
        self.result_calls.fetch_add(1, Ordering::SeqCst);
        self.result.clone().ok_or_else(Self::unavailable)
    }
}

#[tokio::test(start_paused = true)]
async fn test_gives_up_after_ten_failed_polls() {
    let source = ScriptedSource::new(Vec::new(), None);
    let poller = ArchivePoller::new(source, &config());
    let started = tokio::time::Instant::now();

    let outcome = poller.run(Uuid::new_v4(), |_| {}).await;

    match outcome {
        PollOutcome::Abandoned { failures, last_error } => {
            assert_eq!(failures, 10);
            assert!(last_error.unwrap().contains("unavailable"));
        }
        other => panic!("expected Abandoned, got {other:?}"),
    }
    assert_eq!(started.elapsed(), Duration::from_secs(18));
}

#[tokio::test(start_paused = true)]
async fn test_result_endpoint_is_tried_from_the_third_failure() {
    let id = Uuid::new_v4();
    let source = ScriptedSource::new(
        vec![Some(progress(id, OperationState::Running, 2))],
        Some(finished(id, 10)),
    );
    let progress_calls = source.progress_calls.clone();
    let result_calls = source.result_calls.clone();
    let poller = ArchivePoller::new(source, &config());

    let outcome = poller.run(id, |_| {}).await;

    assert_finished(outcome, id, 10);
    // one good poll, then failures 1..=3 with the result tried on the third
    assert_eq!(progress_calls.load(Ordering::SeqCst), 4);
    assert_eq!(result_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn test_result_tried_on_every_failure_past_threshold() {
    let source = ScriptedSource::new(Vec::new(), None);
    let progress_calls = source.progress_calls.clone();
    let result_calls = source.result_calls.clone();
    let poller = ArchivePoller::new(source, &config());

    poller.run(Uuid::new_v4(), |_| {}).await;

    assert_eq!(progress_calls.load(Ordering::SeqCst), 10);
    assert_eq!(result_calls.load(Ordering::SeqCst), 8);
}

#[tokio::test(start_paused = true)]
async fn test_reports_progress_until_completion() {
    let id = Uuid::new_v4();
    let source = ScriptedSource::new(
        vec![
            Some(progress(id, OperationState::Running, 3)),
            None,
            Some(progress(id, OperationState::Running, 7)),
            Some(progress(id, OperationState::Completed, 10)),
        ],
        Some(finished(id, 10)),
    );
    let poller = ArchivePoller::new(source, &config());
    let mut seen = Vec::new();

    let outcome = poller.run(id, |p| seen.push(p.processed)).await;

    assert_eq!(seen, vec![3, 7, 10]);
    assert_finished(outcome, id, 10);
}

#[tokio::test(start_paused = true)]
async fn test_final_progress_used_when_result_unavailable() {
    let id = Uuid::new_v4();
    let source = ScriptedSource::new(vec![Some(progress(id, OperationState::Completed, 10))], None);
    let poller = ArchivePoller::new(source, &config());

    match poller.run(id, |_| {}).await {
        PollOutcome::Finished(result) => {
            assert_eq!(result.state, OperationState::Completed);
            assert_eq!(result.affected, 10);
        }
        other => panic!("expected Finished, got {other:?}"),
    }
}
