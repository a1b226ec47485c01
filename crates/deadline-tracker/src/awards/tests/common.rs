use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use tokio::sync::Notify;

use crate::awards::domain::{AwardCollection, AwardRecord};
use crate::awards::fetch::{FetchError, PageFetcher};
use crate::awards::query::{shared_awards, SharedAwards};
use crate::awards::refresher::{Clock, DeadlineRefresher};
use crate::awards::store::{AwardStore, SnapshotStore, StoreError};

pub(super) fn epoch() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0)
        .single()
        .expect("valid timestamp")
}

#[derive(Debug, Clone)]
pub(super) enum Scripted {
    Page(String),
    Status(u16),
    Down,
    Panic,
}

/// Fetcher answering from a per-URL script; unknown URLs are unreachable.
///
/// Every call signals `entered` once recorded. After [`ScriptedFetcher::hold`]
/// calls also park until the returned gate is notified, which pins a cycle
/// mid-fetch.
#[derive(Default)]
pub(super) struct ScriptedFetcher {
    responses: Mutex<HashMap<String, Vec<Scripted>>>,
    calls: Mutex<Vec<String>>,
    entered: Notify,
    gate: Mutex<Option<Arc<Notify>>>,
}

impl ScriptedFetcher {
    /// Queue responses for `url`; the last one repeats once the queue drains.
    pub(super) fn respond(&self, url: &str, responses: Vec<Scripted>) {
        self.responses
            .lock()
            .expect("responses mutex poisoned")
            .insert(url.to_string(), responses);
    }

    pub(super) fn page(&self, url: &str, body: &str) {
        self.respond(url, vec![Scripted::Page(body.to_string())]);
    }

    pub(super) fn calls(&self) -> Vec<String> {
        self.calls.lock().expect("calls mutex poisoned").clone()
    }

    pub(super) fn hold(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.gate.lock().expect("gate mutex poisoned") = Some(gate.clone());
        gate
    }

    /// Resolves once a fetch has been recorded (a permit is kept if the
    /// fetch already happened).
    pub(super) async fn entered(&self) {
        self.entered.notified().await;
    }
}

#[async_trait]
impl PageFetcher for ScriptedFetcher {
    async fn fetch_text(&self, url: &str) -> Result<String, FetchError> {
        self.calls
            .lock()
            .expect("calls mutex poisoned")
            .push(url.to_string());
        let gate = self.gate.lock().expect("gate mutex poisoned").clone();
        self.entered.notify_one();
        if let Some(gate) = gate {
            gate.notified().await;
        }

        let next = {
            let mut responses = self.responses.lock().expect("responses mutex poisoned");
            match responses.get_mut(url) {
                Some(queue) if queue.len() > 1 => queue.remove(0),
                Some(queue) => queue.first().cloned().unwrap_or(Scripted::Down),
                None => Scripted::Down,
            }
        };

        match next {
            Scripted::Page(body) => Ok(body),
            Scripted::Status(code) => Err(FetchError::Status(code)),
            Scripted::Down => Err(FetchError::Transport("connection refused".to_string())),
            Scripted::Panic => panic!("scripted fetcher panic for {url}"),
        }
    }
}

/// In-memory snapshot backend recording every write.
#[derive(Default)]
pub(super) struct RecordingStore {
    current: Mutex<Option<Vec<u8>>>,
    writes: AtomicUsize,
    fail_writes: AtomicBool,
}

impl RecordingStore {
    pub(super) fn seeded(bytes: &[u8]) -> Self {
        let store = Self::default();
        *store.current.lock().expect("store mutex poisoned") = Some(bytes.to_vec());
        store
    }

    pub(super) fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub(super) fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub(super) fn contents(&self) -> Option<AwardCollection> {
        self.current
            .lock()
            .expect("store mutex poisoned")
            .as_ref()
            .map(|bytes| serde_json::from_slice(bytes).expect("stored snapshot parses"))
    }
}

impl SnapshotStore for RecordingStore {
    fn load(&self) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.current.lock().expect("store mutex poisoned").clone())
    }

    fn write(&self, bytes: &[u8]) -> Result<(), StoreError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("disk full".to_string()));
        }
        *self.current.lock().expect("store mutex poisoned") = Some(bytes.to_vec());
        Ok(())
    }
}

/// Clock that only moves when told to.
pub(super) struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub(super) fn at(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    pub(super) fn advance(&self, by: Duration) {
        let mut now = self.now.lock().expect("clock mutex poisoned");
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().expect("clock mutex poisoned")
    }
}

/// Clock driven by tokio's (possibly paused) timer so scheduler tests can
/// jump hours ahead.
pub(super) struct TokioClock {
    origin: tokio::time::Instant,
    base: DateTime<Utc>,
}

impl TokioClock {
    pub(super) fn new() -> Self {
        Self {
            origin: tokio::time::Instant::now(),
            base: epoch(),
        }
    }
}

impl Clock for TokioClock {
    fn now(&self) -> DateTime<Utc> {
        let elapsed = tokio::time::Instant::now().duration_since(self.origin);
        self.base + Duration::from_std(elapsed).expect("elapsed fits")
    }
}

pub(super) struct Harness {
    pub(super) fetcher: Arc<ScriptedFetcher>,
    pub(super) store: Arc<AwardStore<RecordingStore>>,
    pub(super) clock: Arc<ManualClock>,
    pub(super) state: SharedAwards,
    pub(super) refresher: DeadlineRefresher<ScriptedFetcher, RecordingStore>,
}

impl Harness {
    pub(super) fn new(records: Vec<AwardRecord>) -> Self {
        let fetcher = Arc::new(ScriptedFetcher::default());
        let store = Arc::new(AwardStore::new(RecordingStore::default()));
        let clock = Arc::new(ManualClock::at(epoch()));
        let state = shared_awards(AwardCollection::new(records));
        let refresher = DeadlineRefresher::new(fetcher.clone(), store.clone(), state.clone())
            .with_clock(clock.clone());
        Self {
            fetcher,
            store,
            clock,
            state,
            refresher,
        }
    }

    pub(super) async fn awards(&self) -> AwardCollection {
        self.state.read().await.awards.clone()
    }

    pub(super) async fn record(&self, index: usize) -> AwardRecord {
        self.awards()
            .await
            .get(index)
            .cloned()
            .expect("record present")
    }
}
