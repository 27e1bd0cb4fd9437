//! Drives "load the timeline for the current parameters".
//!
//! State machine: `Idle -> Loading -> {Success, Error}`, with an orthogonal
//! `cold_start_visible` flag that is only ever true while `Loading`.
//!
//! Ordering:
//! - the cache read happens before any network request of the same load
//! - a successful response is written to the cache before the `Success`
//!   transition becomes observable
//! - the cold-start timer is dropped (its effect suppressed) as soon as the
//!   request settles; the request itself is never cancelled
//!
//! Every load takes a generation number. A response that settles after a
//! newer load has started still lands in the cache under its own key, but
//! leaves the observable state alone.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::RwLock;

use crate::errors::AppError;
use crate::helpers::format_age;
use crate::models::{Profile, TimelineDataset};
use crate::services::api::TimelineSource;
use crate::services::timeline::TimelineSelector;
use crate::storage::cache::{cache_key, CacheStore};

/// How long a request may run before the UI is told to expect a cold start.
pub const COLD_START_DELAY: Duration = Duration::from_secs(3);

/// Parameters that determine a timeline request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadParams {
    pub spot_id: String,
    pub profile: Option<Profile>,
}

impl LoadParams {
    pub fn new(spot_id: impl Into<String>, profile: Option<Profile>) -> Self {
        Self {
            spot_id: spot_id.into(),
            profile,
        }
    }

    pub fn cache_key(&self) -> String {
        cache_key(&self.spot_id, self.profile.as_ref())
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub enum LoadPhase {
    #[default]
    Idle,
    Loading,
    Success(Arc<TimelineDataset>),
    /// User-facing message; retry by calling `refresh` with the same params.
    Error(String),
}

/// Observable state of the orchestrator.
#[derive(Debug, Clone, Default)]
pub struct FetchState {
    pub phase: LoadPhase,
    pub cold_start_visible: bool,
    pub selector: TimelineSelector,
}

/// Where a load gets its data from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadMode {
    /// Serve a fresh cache entry if there is one, else fetch.
    CacheFirst,
    /// Always fetch (pull-to-refresh, manual retry).
    Network,
}

pub struct FetchOrchestrator<S> {
    source: S,
    cache: CacheStore,
    state: RwLock<FetchState>,
    generation: AtomicU64,
    cold_start_delay: Duration,
}

impl<S: TimelineSource> FetchOrchestrator<S> {
    pub fn new(source: S, cache: CacheStore) -> Self {
        Self {
            source,
            cache,
            state: RwLock::new(FetchState::default()),
            generation: AtomicU64::new(0),
            cold_start_delay: COLD_START_DELAY,
        }
    }

    pub fn with_cold_start_delay(mut self, delay: Duration) -> Self {
        self.cold_start_delay = delay;
        self
    }

    /// Load the timeline, serving a fresh cache entry without a network call.
    pub async fn load(&self, params: &LoadParams) -> LoadPhase {
        self.load_with(params, LoadMode::CacheFirst).await
    }

    /// Load the timeline from the network regardless of the cache.
    pub async fn refresh(&self, params: &LoadParams) -> LoadPhase {
        self.load_with(params, LoadMode::Network).await
    }

    pub async fn load_with(&self, params: &LoadParams, mode: LoadMode) -> LoadPhase {
        let key = params.cache_key();

        if mode == LoadMode::CacheFirst {
            if let Some(entry) = self.cache.get(&key) {
                if self.cache.is_fresh(&entry) {
                    tracing::debug!(
                        "Serving '{}' from cache ({} old)",
                        key,
                        format_age(entry.age(chrono::Utc::now()))
                    );
                    let generation = self.next_generation();
                    return self
                        .settle_success(generation, Arc::new(entry.payload))
                        .await;
                }
                tracing::debug!("Cache entry '{}' expired, refetching", key);
            }
        }

        self.fetch(params, &key).await
    }

    async fn fetch(&self, params: &LoadParams, key: &str) -> LoadPhase {
        let generation = self.next_generation();
        {
            let mut state = self.state.write().await;
            state.phase = LoadPhase::Loading;
            state.cold_start_visible = false;
        }
        tracing::debug!("Load #{} for '{}' started", generation, key);

        let started = Instant::now();
        let request = self
            .source
            .fetch_timeline(&params.spot_id, params.profile.as_ref());
        tokio::pin!(request);

        // Race the request against the cold-start timer. Whichever way it
        // goes, the timer is gone once this match finishes.
        let result = match tokio::time::timeout(self.cold_start_delay, &mut request).await {
            Ok(result) => result,
            Err(_) => {
                self.show_cold_start(generation).await;
                request.await
            }
        };

        match result {
            Ok(dataset) => {
                tracing::info!(
                    "Load #{} for '{}' succeeded in {} ms",
                    generation,
                    key,
                    started.elapsed().as_millis()
                );
                if let Err(e) = self.cache.put(key, &dataset) {
                    tracing::warn!("Failed to cache timeline under '{}': {}", key, e);
                }
                self.settle_success(generation, Arc::new(dataset)).await
            }
            Err(e) => self.settle_error(generation, key, e).await,
        }
    }

    fn next_generation(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn is_current(&self, generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == generation
    }

    async fn show_cold_start(&self, generation: u64) {
        let mut state = self.state.write().await;
        if self.is_current(generation) && state.phase == LoadPhase::Loading {
            tracing::info!(
                "Load #{} still pending after {:?}, backend may be cold-starting",
                generation,
                self.cold_start_delay
            );
            state.cold_start_visible = true;
        }
    }

    async fn settle_success(&self, generation: u64, dataset: Arc<TimelineDataset>) -> LoadPhase {
        let mut state = self.state.write().await;
        if !self.is_current(generation) {
            tracing::debug!("Load #{} superseded, keeping newer state", generation);
            return state.phase.clone();
        }
        state.cold_start_visible = false;
        state.selector.replace(dataset.clone());
        state.phase = LoadPhase::Success(dataset);
        state.phase.clone()
    }

    async fn settle_error(&self, generation: u64, key: &str, err: AppError) -> LoadPhase {
        tracing::error!("Load #{} for '{}' failed: {}", generation, key, err);
        let mut state = self.state.write().await;
        if !self.is_current(generation) {
            return state.phase.clone();
        }
        state.cold_start_visible = false;
        state.phase = LoadPhase::Error(err.user_message());
        state.phase.clone()
    }

    /// Copy of the current observable state.
    pub async fn snapshot(&self) -> FetchState {
        self.state.read().await.clone()
    }

    pub async fn phase(&self) -> LoadPhase {
        self.state.read().await.phase.clone()
    }

    pub async fn cold_start_visible(&self) -> bool {
        self.state.read().await.cold_start_visible
    }

    /// Select a timeline point (clamped).
    pub async fn select(&self, index: usize) {
        self.state.write().await.selector.select(index);
    }

    pub async fn selected_index(&self) -> usize {
        self.state.read().await.selector.selected_index()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::models::SessionGoal;
    use crate::storage::kv::{KeyValueStore, MemoryStore};
    use crate::test_support;
    use chrono::Utc;
    use std::sync::atomic::AtomicUsize;

    /// Timeline source with a fixed delay that counts its calls.
    #[derive(Clone)]
    pub(crate) struct FakeSource {
        pub(crate) calls: Arc<AtomicUsize>,
        pub(crate) delay: Duration,
        /// Calls numbered `1..=fail_first` fail.
        pub(crate) fail_first: usize,
        pub(crate) points: usize,
    }

    impl FakeSource {
        pub(crate) fn new(delay: Duration) -> Self {
            Self {
                calls: Arc::new(AtomicUsize::new(0)),
                delay,
                fail_first: 0,
                points: 4,
            }
        }

        pub(crate) fn failing(delay: Duration) -> Self {
            Self {
                fail_first: usize::MAX,
                ..Self::new(delay)
            }
        }

        pub(crate) fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl TimelineSource for FakeSource {
        async fn fetch_timeline(
            &self,
            _spot_id: &str,
            _profile: Option<&Profile>,
        ) -> Result<TimelineDataset, AppError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            tokio::time::sleep(self.delay).await;
            if call <= self.fail_first {
                Err(AppError::Network("connection reset".into()))
            } else {
                Ok(test_support::dataset(self.points))
            }
        }
    }

    fn orchestrator(source: FakeSource) -> (Arc<MemoryStore>, FetchOrchestrator<FakeSource>) {
        let backend = Arc::new(MemoryStore::new());
        let cache = CacheStore::new(backend.clone());
        (backend, FetchOrchestrator::new(source, cache))
    }

    fn params() -> LoadParams {
        LoadParams::new("varese", Some(test_support::profile(SessionGoal::Calm)))
    }

    #[tokio::test(start_paused = true)]
    async fn test_cache_hit_skips_network() {
        let source = FakeSource::new(Duration::from_millis(200));
        let (_, orch) = orchestrator(source.clone());

        assert!(matches!(orch.load(&params()).await, LoadPhase::Success(_)));
        assert!(matches!(orch.load(&params()).await, LoadPhase::Success(_)));
        assert_eq!(source.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_different_goal_misses_cache() {
        let source = FakeSource::new(Duration::from_millis(200));
        let (_, orch) = orchestrator(source.clone());

        orch.load(&params()).await;
        orch.load(&LoadParams::new(
            "varese",
            Some(test_support::profile(SessionGoal::Challenge)),
        ))
        .await;
        orch.load(&LoadParams::new("varese", None)).await;
        assert_eq!(source.calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_entry_refetched_and_overwritten() {
        let source = FakeSource::new(Duration::from_millis(200));
        let (backend, orch) = orchestrator(source.clone());
        let cache = CacheStore::new(backend);
        let key = params().cache_key();
        let old = Utc::now() - chrono::Duration::minutes(31);
        cache.put_at(&key, &test_support::dataset(1), old).unwrap();

        let phase = orch.load(&params()).await;
        assert_eq!(source.calls(), 1);
        match phase {
            LoadPhase::Success(ds) => assert_eq!(ds.timeline.len(), 4),
            other => panic!("unexpected phase {:?}", other),
        }

        let entry = cache.get(&key).unwrap();
        assert!(entry.timestamp > old);
        assert_eq!(entry.payload.timeline.len(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fresh_entry_served_from_cache() {
        let source = FakeSource::new(Duration::from_millis(200));
        let (backend, orch) = orchestrator(source.clone());
        let cache = CacheStore::new(backend);
        let recent = Utc::now() - chrono::Duration::minutes(10);
        cache
            .put_at(&params().cache_key(), &test_support::dataset(2), recent)
            .unwrap();

        match orch.load(&params()).await {
            LoadPhase::Success(ds) => assert_eq!(ds.timeline.len(), 2),
            other => panic!("unexpected phase {:?}", other),
        }
        assert_eq!(source.calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_corrupt_cache_entry_falls_through_to_network() {
        let source = FakeSource::new(Duration::from_millis(200));
        let (backend, orch) = orchestrator(source.clone());
        backend.set(&params().cache_key(), "{broken").unwrap();

        assert!(matches!(orch.load(&params()).await, LoadPhase::Success(_)));
        assert_eq!(source.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_refresh_bypasses_cache() {
        let source = FakeSource::new(Duration::from_millis(200));
        let (_, orch) = orchestrator(source.clone());

        orch.load(&params()).await;
        orch.refresh(&params()).await;
        assert_eq!(source.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cold_start_visible_while_slow_request_pending() {
        let source = FakeSource::new(Duration::from_secs(10));
        let (_, orch) = orchestrator(source);

        let observer = async {
            tokio::time::sleep(Duration::from_millis(2_900)).await;
            let early = orch.snapshot().await;
            assert_eq!(early.phase, LoadPhase::Loading);
            assert!(!early.cold_start_visible);

            tokio::time::sleep(Duration::from_millis(200)).await;
            let late = orch.snapshot().await;
            assert_eq!(late.phase, LoadPhase::Loading);
            assert!(late.cold_start_visible);
        };

        let load_params = params();
        let (phase, ()) = tokio::join!(orch.load(&load_params), observer);
        assert!(matches!(phase, LoadPhase::Success(_)));
        assert!(!orch.cold_start_visible().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cold_start_cleared_on_failure() {
        let source = FakeSource::failing(Duration::from_secs(5));
        let (backend, orch) = orchestrator(source);

        let observer = async {
            tokio::time::sleep(Duration::from_secs(4)).await;
            assert!(orch.cold_start_visible().await);
        };

        let load_params = params();
        let (phase, ()) = tokio::join!(orch.load(&load_params), observer);
        match phase {
            LoadPhase::Error(msg) => assert_eq!(msg, crate::errors::FETCH_FAILED_MESSAGE),
            other => panic!("unexpected phase {:?}", other),
        }
        assert!(!orch.cold_start_visible().await);

        // Nothing cached on failure
        assert_eq!(backend.get(&load_params.cache_key()).unwrap(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_observed_only_after_cache_write() {
        let source = FakeSource::new(Duration::from_secs(4));
        let (backend, orch) = orchestrator(source);
        let cache = CacheStore::new(backend);
        let load_params = params();
        let key = load_params.cache_key();

        let observer = async {
            let mut saw_cold_start = false;
            for _ in 0..120 {
                tokio::time::sleep(Duration::from_millis(50)).await;
                let state = orch.snapshot().await;
                if state.cold_start_visible {
                    assert_eq!(state.phase, LoadPhase::Loading);
                    saw_cold_start = true;
                }
                match state.phase {
                    LoadPhase::Loading => assert!(cache.get(&key).is_none()),
                    LoadPhase::Success(_) => {
                        assert!(cache.get(&key).is_some());
                        assert!(!state.cold_start_visible);
                        return saw_cold_start;
                    }
                    other => panic!("unexpected phase {:?}", other),
                }
            }
            panic!("load never settled");
        };

        let (phase, saw_cold_start) = tokio::join!(orch.load(&load_params), observer);
        assert!(matches!(phase, LoadPhase::Success(_)));
        assert!(saw_cold_start);
    }

    #[tokio::test(start_paused = true)]
    async fn test_custom_cold_start_delay() {
        let source = FakeSource::new(Duration::from_secs(2));
        let (_, orch) = orchestrator(source);
        let orch = orch.with_cold_start_delay(Duration::from_secs(1));

        let observer = async {
            tokio::time::sleep(Duration::from_millis(1_500)).await;
            assert!(orch.cold_start_visible().await);
        };

        let load_params = params();
        tokio::join!(orch.load(&load_params), observer);
        assert!(!orch.cold_start_visible().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fast_request_never_shows_cold_start() {
        let source = FakeSource::new(Duration::from_millis(500));
        let (_, orch) = orchestrator(source);

        orch.load(&params()).await;
        // Past the point where a leaked timer would have fired
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(!orch.cold_start_visible().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_resets_selected_index() {
        let source = FakeSource::new(Duration::from_millis(200));
        let (_, orch) = orchestrator(source);

        orch.load(&params()).await;
        orch.select(3).await;
        assert_eq!(orch.selected_index().await, 3);

        orch.refresh(&params()).await;
        assert_eq!(orch.selected_index().await, 0);

        orch.select(2).await;
        // Cache hit also counts as a successful load
        orch.load(&params()).await;
        assert_eq!(orch.selected_index().await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_after_error() {
        let source = FakeSource {
            fail_first: 1,
            ..FakeSource::new(Duration::from_millis(100))
        };
        let (_, orch) = orchestrator(source.clone());

        assert!(matches!(orch.load(&params()).await, LoadPhase::Error(_)));
        assert!(matches!(orch.refresh(&params()).await, LoadPhase::Success(_)));
        assert_eq!(source.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_superseded_response_does_not_overwrite_newer_state() {
        let slow = FakeSource::new(Duration::from_secs(5));
        let (backend, orch) = orchestrator(slow.clone());
        let calm = params();
        let challenge = LoadParams::new(
            "varese",
            Some(test_support::profile(SessionGoal::Challenge)),
        );

        let newer = async {
            tokio::time::sleep(Duration::from_secs(1)).await;
            // Pre-seed the newer key so this load settles from cache immediately
            CacheStore::new(backend.clone())
                .put(&challenge.cache_key(), &test_support::dataset(2))
                .unwrap();
            orch.load(&challenge).await
        };

        let (stale_phase, newer_phase) = tokio::join!(orch.load(&calm), newer);

        match (&stale_phase, &newer_phase) {
            (LoadPhase::Success(a), LoadPhase::Success(b)) => {
                assert_eq!(b.timeline.len(), 2);
                // The late response reports the newer state, not its own
                assert_eq!(a.timeline.len(), 2);
            }
            other => panic!("unexpected phases {:?}", other),
        }

        // The late response is still cached under its own key
        let cached = CacheStore::new(backend).get(&calm.cache_key()).unwrap();
        assert_eq!(cached.payload.timeline.len(), 4);
        assert!(!orch.cold_start_visible().await);
    }
}
