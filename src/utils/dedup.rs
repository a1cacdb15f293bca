//! In-flight request deduplication
//!
//! Concurrent calls with the same key share a single execution. The entry is
//! removed as soon as that execution completes, so a later call with the
//! same key starts a fresh one.

use futures::future::{BoxFuture, FutureExt, Shared};
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::trace;

type InFlight<V> = HashMap<String, (u64, Shared<BoxFuture<'static, V>>)>;

pub struct RequestDeduplicator<V: Clone> {
    inflight: Arc<Mutex<InFlight<V>>>,
    generation: Arc<AtomicU64>,
}

impl<V: Clone> Clone for RequestDeduplicator<V> {
    fn clone(&self) -> Self {
        Self {
            inflight: self.inflight.clone(),
            generation: self.generation.clone(),
        }
    }
}

impl<V> Default for RequestDeduplicator<V>
where
    V: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<V> RequestDeduplicator<V>
where
    V: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self {
            inflight: Arc::new(Mutex::new(HashMap::new())),
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Run `make` unless a call with the same key is already in flight, in
    /// which case wait for that call's result instead.
    pub async fn execute<F, Fut>(&self, key: &str, make: F) -> V
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = V> + Send + 'static,
    {
        let shared = {
            let mut inflight = lock(&self.inflight);
            if let Some((_, existing)) = inflight.get(key) {
                trace!(key, "Joining in-flight request");
                existing.clone()
            } else {
                let generation = self.generation.fetch_add(1, Ordering::Relaxed);
                let map = self.inflight.clone();
                let owned_key = key.to_string();
                let call = make();

                let shared = async move {
                    let output = call.await;
                    let mut inflight = lock(&map);
                    if matches!(inflight.get(&owned_key), Some((g, _)) if *g == generation) {
                        inflight.remove(&owned_key);
                    }
                    output
                }
                .boxed()
                .shared();

                inflight.insert(key.to_string(), (generation, shared.clone()));
                shared
            }
        };

        shared.await
    }

    /// Number of distinct requests currently in flight
    pub fn in_flight(&self) -> usize {
        lock(&self.inflight).len()
    }

    /// Forget every in-flight request. Callers already waiting still get
    /// their result; new callers start fresh executions.
    pub fn clear(&self) {
        lock(&self.inflight).clear();
    }

    /// Forget in-flight requests whose key starts with `prefix`
    pub fn forget_prefix(&self, prefix: &str) -> usize {
        let mut inflight = lock(&self.inflight);
        let before = inflight.len();
        inflight.retain(|key, _| !key.starts_with(prefix));
        before - inflight.len()
    }
}

fn lock<V>(map: &Mutex<InFlight<V>>) -> MutexGuard<'_, InFlight<V>> {
    map.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    fn counting_call(
        counter: Arc<AtomicUsize>,
        value: u32,
    ) -> impl Future<Output = u32> + Send + 'static {
        async move {
            counter.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(50)).await;
            value
        }
    }

    #[tokio::test]
    async fn test_concurrent_identical_calls_share_one_execution() {
        let dedup = RequestDeduplicator::<u32>::new();
        let counter = Arc::new(AtomicUsize::new(0));

        let (a, b, c) = tokio::join!(
            dedup.execute("cats", || counting_call(counter.clone(), 7)),
            dedup.execute("cats", || counting_call(counter.clone(), 8)),
            dedup.execute("cats", || counting_call(counter.clone(), 9)),
        );

        assert_eq!((a, b, c), (7, 7, 7));
        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert_eq!(dedup.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_distinct_keys_run_independently() {
        let dedup = RequestDeduplicator::<u32>::new();
        let counter = Arc::new(AtomicUsize::new(0));

        let (a, b) = tokio::join!(
            dedup.execute("cats", || counting_call(counter.clone(), 1)),
            dedup.execute("media", || counting_call(counter.clone(), 2)),
        );

        assert_eq!((a, b), (1, 2));
        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_completed_call_is_not_reused() {
        let dedup = RequestDeduplicator::<u32>::new();
        let counter = Arc::new(AtomicUsize::new(0));

        assert_eq!(dedup.execute("k", || counting_call(counter.clone(), 1)).await, 1);
        assert_eq!(dedup.execute("k", || counting_call(counter.clone(), 2)).await, 2);
        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_clear_starts_fresh_executions() {
        let dedup = RequestDeduplicator::<u32>::new();
        let counter = Arc::new(AtomicUsize::new(0));

        let first = dedup.execute("k", || counting_call(counter.clone(), 1));
        let second = async {
            tokio::task::yield_now().await;
            dedup.clear();
            dedup.execute("k", || counting_call(counter.clone(), 2)).await
        };
        let (a, b) = tokio::join!(first, second);

        assert_eq!((a, b), (1, 2));
        assert_eq!(counter.load(Ordering::SeqCst), 2);
        assert_eq!(dedup.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_forget_prefix_only_drops_matching_keys() {
        let dedup = RequestDeduplicator::<u32>::new();
        let counter = Arc::new(AtomicUsize::new(0));

        let cats = dedup.execute("/api/cats/1", || counting_call(counter.clone(), 1));
        let media = dedup.execute("/api/media", || counting_call(counter.clone(), 2));
        let check = async {
            tokio::task::yield_now().await;
            assert_eq!(dedup.in_flight(), 2);
            assert_eq!(dedup.forget_prefix("/api/cats"), 1);
            assert_eq!(dedup.in_flight(), 1);
        };
        let (a, b, ()) = tokio::join!(cats, media, check);

        assert_eq!((a, b), (1, 2));
    }
}
