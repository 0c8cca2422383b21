//! Async driver for a [`RowCache`].
//!
//! [`RowLoader`] owns the cache behind a mutex, runs the fetches it asks
//! for on tokio, and feeds responses back. Every applied or discarded
//! response bumps a change counter published on a `watch` channel, which a
//! view can await before re-reading [`RowLoader::visible_rows`].

use std::sync::Arc;

use lcadash_core::{QueryKey, SortSpec};
use parking_lot::Mutex;
use tokio::sync::{mpsc, watch};
use tokio::time::Instant;
use tracing::debug;

use crate::cache::{FetchOutcome, FetchRequest, RowCache, RowSlot};
use crate::debounce::DebouncedInput;
use crate::source::PageSource;

/// Shared handle to a cache and the source that fills it. Clones share state.
#[derive(Clone)]
pub struct RowLoader {
    cache: Arc<Mutex<RowCache>>,
    source: Arc<dyn PageSource>,
    changes: Arc<watch::Sender<u64>>,
}

impl RowLoader {
    #[must_use]
    pub fn new(cache: RowCache, source: Arc<dyn PageSource>) -> Self {
        let (changes, _) = watch::channel(0);
        Self {
            cache: Arc::new(Mutex::new(cache)),
            source,
            changes: Arc::new(changes),
        }
    }

    /// Receiver of the change counter.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.changes.subscribe()
    }

    /// Runs `f` against the cache under its lock.
    pub fn with_cache<R>(&self, f: impl FnOnce(&RowCache) -> R) -> R {
        f(&self.cache.lock())
    }

    #[must_use]
    pub fn visible_rows(&self) -> Vec<RowSlot> {
        self.cache.lock().visible_rows()
    }

    #[must_use]
    pub fn total_count(&self) -> Option<u64> {
        self.cache.lock().total_count()
    }

    #[must_use]
    pub fn query_key(&self) -> QueryKey {
        self.cache.lock().query_key()
    }

    /// Must be called from within a tokio runtime, like every mutator here.
    pub fn request_window(&self, skip: u64, take: u64) {
        self.mutate(|cache| {
            cache.request_window(skip, take);
        });
    }

    /// Applies a search term immediately. See [`search_input`](Self::search_input)
    /// for the debounced path.
    pub fn set_search(&self, term: impl Into<String>) {
        let term = term.into();
        self.mutate(|cache| cache.on_search_change(term));
    }

    pub fn set_sort(&self, sort: Option<SortSpec>) {
        self.mutate(|cache| cache.on_sort_change(sort));
    }

    pub fn switch_resource(&self, resource: impl Into<String>) {
        let resource = resource.into();
        self.mutate(|cache| cache.switch_resource(resource));
    }

    /// Spawns a debouncer and returns its input.
    ///
    /// Terms sent on the channel are applied with [`set_search`](Self::set_search)
    /// once no newer term has arrived for the configured debounce delay.
    /// Dropping the sender applies any pending term and stops the task.
    #[must_use]
    pub fn search_input(&self) -> mpsc::UnboundedSender<String> {
        let (tx, mut rx) = mpsc::unbounded_channel::<String>();
        let delay = self.cache.lock().config().debounce;
        let loader = self.clone();

        tokio::spawn(async move {
            let mut input = DebouncedInput::new(delay);
            loop {
                let deadline = input.deadline();
                tokio::select! {
                    received = rx.recv() => match received {
                        Some(term) => input.push(term, Instant::now()),
                        None => break,
                    },
                    () = sleep_until(deadline) => {
                        if let Some(term) = input.poll(Instant::now()) {
                            loader.set_search(term);
                        }
                    }
                }
            }
            if let Some(term) = input.take() {
                loader.set_search(term);
            }
        });

        tx
    }

    fn mutate(&self, f: impl FnOnce(&mut RowCache)) {
        let request = {
            let mut cache = self.cache.lock();
            f(&mut cache);
            cache.next_fetch()
        };
        self.changes.send_modify(|n| *n = n.wrapping_add(1));
        if let Some(request) = request {
            self.spawn_fetch(request);
        }
    }

    fn spawn_fetch(&self, request: FetchRequest) {
        let cache = Arc::clone(&self.cache);
        let source = Arc::clone(&self.source);
        let changes = Arc::clone(&self.changes);
        tokio::spawn(drive(cache, source, changes, request));
    }
}

/// Runs `request` and any follow-up fetch the cache asks for afterwards.
async fn drive(
    cache: Arc<Mutex<RowCache>>,
    source: Arc<dyn PageSource>,
    changes: Arc<watch::Sender<u64>>,
    mut request: FetchRequest,
) {
    loop {
        let result = source.fetch(&request.descriptor).await;
        let next = {
            let mut cache = cache.lock();
            let outcome = cache.complete(&request.ticket, result);
            debug!(resource = %request.descriptor.resource, ?outcome, "fetch completed");
            match outcome {
                // A failed span is not retried, but windows requested
                // meanwhile still get their fetch.
                FetchOutcome::Applied { .. } | FetchOutcome::Failed(_) => cache.next_fetch(),
                FetchOutcome::StaleResponseDiscarded => None,
            }
        };
        changes.send_modify(|n| *n = n.wrapping_add(1));

        match next {
            Some(follow_up) => request = follow_up,
            None => break,
        }
    }
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use async_trait::async_trait;
    use lcadash_core::{Page, QueryDescriptor, Row, Value};
    use tokio::sync::Notify;

    use super::*;
    use crate::{CacheState, FetchError, RowCacheConfig};

    /// Serves `total` numbered rows and records every descriptor. While
    /// `gate` is set, each fetch waits for one notification before answering.
    /// The first `failures` fetches fail.
    struct FakeSource {
        total: u64,
        calls: Mutex<Vec<QueryDescriptor>>,
        gate: Option<Arc<Notify>>,
        failures: Mutex<usize>,
    }

    impl FakeSource {
        fn new(total: u64) -> Self {
            Self {
                total,
                calls: Mutex::new(Vec::new()),
                gate: None,
                failures: Mutex::new(0),
            }
        }

        fn calls(&self) -> Vec<QueryDescriptor> {
            self.calls.lock().clone()
        }
    }

    #[async_trait]
    impl PageSource for FakeSource {
        async fn fetch(&self, descriptor: &QueryDescriptor) -> Result<Page, FetchError> {
            self.calls.lock().push(descriptor.clone());
            if let Some(gate) = &self.gate {
                gate.notified().await;
            }
            {
                let mut failures = self.failures.lock();
                if *failures > 0 {
                    *failures -= 1;
                    return Err(FetchError::Backend("unreachable".to_string()));
                }
            }
            let end = (descriptor.skip + descriptor.take).min(self.total);
            let data = (descriptor.skip..end)
                .map(|i| {
                    Row::from([
                        ("id".to_string(), Value::Int(i64::try_from(i).unwrap())),
                        (
                            "term".to_string(),
                            Value::from(
                                descriptor
                                    .search
                                    .as_ref()
                                    .map_or("", |s| s.search_term.as_str()),
                            ),
                        ),
                    ])
                })
                .collect();
            Ok(Page {
                data,
                total_count: descriptor.require_total_count.then_some(self.total),
            })
        }
    }

    /// Waits until `n` fetches have started, then lets them answer.
    async fn release(source: &FakeSource, gate: &Notify, n: usize) {
        while source.calls().len() < n {
            tokio::task::yield_now().await;
        }
        gate.notify_waiters();
    }

    async fn wait_for(rx: &mut watch::Receiver<u64>, pred: impl Fn() -> bool) {
        while !pred() {
            rx.changed().await.unwrap();
        }
    }

    fn loader(source: Arc<FakeSource>) -> RowLoader {
        RowLoader::new(
            RowCache::new("buildings", RowCacheConfig::default()),
            source,
        )
    }

    #[tokio::test]
    async fn cached_window_issues_no_further_calls() {
        let source = Arc::new(FakeSource::new(250));
        let loader = loader(Arc::clone(&source));
        let mut rx = loader.subscribe();

        loader.request_window(0, 100);
        wait_for(&mut rx, || loader.total_count().is_some()).await;

        loader.request_window(20, 60);
        let rows = loader.visible_rows();

        assert_eq!(source.calls().len(), 1);
        assert_eq!(rows.len(), 60);
        assert!(rows.iter().all(RowSlot::is_loaded));
        assert_eq!(loader.total_count(), Some(250));
    }

    #[tokio::test]
    async fn late_response_for_an_old_search_is_ignored() {
        let gate = Arc::new(Notify::new());
        let source = Arc::new(FakeSource {
            gate: Some(Arc::clone(&gate)),
            ..FakeSource::new(250)
        });
        let loader = loader(Arc::clone(&source));
        let mut rx = loader.subscribe();

        loader.request_window(0, 100);
        loader.set_search("oslo");
        assert!(loader.visible_rows().iter().all(|slot| !slot.is_loaded()));

        // Release both fetches: the first answers for the old key.
        while source.calls().len() < 2 {
            tokio::task::yield_now().await;
        }
        gate.notify_waiters();
        wait_for(&mut rx, || loader.total_count().is_some()).await;

        let rows = loader.visible_rows();
        assert!(rows.iter().all(|slot| {
            slot.row().and_then(|r| r.get("term")) == Some(&Value::from("oslo"))
        }));
    }

    #[tokio::test]
    async fn failure_leaves_the_cache_idle() {
        let source = Arc::new(FakeSource {
            failures: Mutex::new(1),
            ..FakeSource::new(250)
        });
        let loader = loader(Arc::clone(&source));
        let mut rx = loader.subscribe();
        let seen = *rx.borrow_and_update();

        loader.request_window(0, 100);
        wait_for(&mut rx, || {
            source.calls().len() == 1 && loader.with_cache(|c| c.state() == CacheState::Idle)
        })
        .await;

        assert!(*rx.borrow() > seen);
        assert!(loader.visible_rows().iter().all(|slot| !slot.is_loaded()));
    }

    #[tokio::test]
    async fn window_requested_during_a_failed_fetch_is_still_loaded() {
        let gate = Arc::new(Notify::new());
        let source = Arc::new(FakeSource {
            gate: Some(Arc::clone(&gate)),
            failures: Mutex::new(1),
            ..FakeSource::new(1000)
        });
        let loader = loader(Arc::clone(&source));
        let mut rx = loader.subscribe();

        loader.request_window(0, 100);
        loader.request_window(500, 50);
        release(&source, &gate, 1).await;
        release(&source, &gate, 2).await;
        wait_for(&mut rx, || loader.total_count().is_some()).await;

        let calls = source.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[1].skip, 500);
        assert_eq!(loader.visible_rows().len(), 50);
        assert!(loader.visible_rows().iter().all(RowSlot::is_loaded));
    }

    #[tokio::test(start_paused = true)]
    async fn typing_is_debounced_into_one_search() {
        let source = Arc::new(FakeSource::new(250));
        let loader = loader(Arc::clone(&source));
        let mut rx = loader.subscribe();
        loader.request_window(0, 100);
        wait_for(&mut rx, || loader.total_count().is_some()).await;

        let input = loader.search_input();
        for term in ["O", "Os", "Osl", "Oslo"] {
            input.send(term.to_string()).unwrap();
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        assert_eq!(loader.with_cache(|c| c.search_term().to_string()), "");

        tokio::time::sleep(Duration::from_millis(300)).await;
        wait_for(&mut rx, || loader.total_count().is_some()).await;

        let searches: Vec<_> = source
            .calls()
            .into_iter()
            .filter_map(|d| d.search.map(|s| s.search_term))
            .collect();
        assert_eq!(searches, vec!["Oslo".to_string()]);
    }
}
