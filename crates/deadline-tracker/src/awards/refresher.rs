use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use super::domain::fetch_due;
use super::extract::extract_deadline;
use super::fetch::PageFetcher;
use super::query::SharedAwards;
use super::store::{AwardStore, SnapshotStore};

const DEFAULT_STALENESS_HOURS: i64 = 24;

/// Source of "now" for staleness decisions and fetch timestamps.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A deadline that moved during a cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeadlineChange {
    pub index: usize,
    pub name: String,
    pub previous: Option<String>,
    pub current: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PersistStatus {
    /// No deadline changed, so the snapshot was left alone.
    NotNeeded,
    Persisted,
    Failed { error: String },
}

/// Per-cycle tallies.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RefreshCounts {
    pub examined: usize,
    pub skipped_untracked: usize,
    pub skipped_fresh: usize,
    pub fetched: usize,
    pub fetch_failures: usize,
    pub without_date: usize,
}

/// Summary of one refresh cycle.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RefreshReport {
    pub counts: RefreshCounts,
    pub changes: Vec<DeadlineChange>,
    pub persistence: PersistStatus,
    pub completed_at: DateTime<Utc>,
}

impl RefreshReport {
    pub fn changed(&self) -> bool {
        !self.changes.is_empty()
    }
}

struct Candidate {
    index: usize,
    name: String,
    url: String,
    last_fetched_at: Option<DateTime<Utc>>,
}

/// Walks the award collection once per cycle: polls stale entries, extracts a
/// deadline from each page and writes the snapshot only if something moved.
pub struct DeadlineRefresher<F, S> {
    fetcher: Arc<F>,
    store: Arc<AwardStore<S>>,
    state: SharedAwards,
    clock: Arc<dyn Clock>,
    staleness: chrono::Duration,
    running: Mutex<()>,
}

impl<F, S> DeadlineRefresher<F, S>
where
    F: PageFetcher + 'static,
    S: SnapshotStore + 'static,
{
    pub fn new(fetcher: Arc<F>, store: Arc<AwardStore<S>>, state: SharedAwards) -> Self {
        Self {
            fetcher,
            store,
            state,
            clock: Arc::new(SystemClock),
            staleness: chrono::Duration::hours(DEFAULT_STALENESS_HOURS),
            running: Mutex::new(()),
        }
    }

    pub fn with_staleness(mut self, window: std::time::Duration) -> Self {
        self.staleness = chrono::Duration::from_std(window).unwrap_or(chrono::Duration::MAX);
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn state(&self) -> &SharedAwards {
        &self.state
    }

    /// Run one cycle to completion. Cycles are serialized; a second caller
    /// waits for the running cycle to finish before starting its own.
    pub async fn refresh(&self) -> RefreshReport {
        let _running = self.running.lock().await;
        info!("running deadline refresh cycle");

        let mut counts = RefreshCounts::default();
        let mut changes = Vec::new();

        for candidate in self.plan(&mut counts).await {
            let now = self.clock.now();
            if !fetch_due(candidate.last_fetched_at, now, self.staleness) {
                counts.skipped_fresh += 1;
                continue;
            }

            counts.fetched += 1;
            let found = match self.fetcher.fetch_text(&candidate.url).await {
                Ok(page) => {
                    let found = extract_deadline(&page);
                    if found.is_none() {
                        counts.without_date += 1;
                        debug!(award = %candidate.name, url = %candidate.url, "no date found on page");
                    }
                    found
                }
                Err(err) => {
                    counts.fetch_failures += 1;
                    warn!(award = %candidate.name, url = %candidate.url, error = %err, "award page unavailable");
                    None
                }
            };

            if let Some(change) = self.apply(&candidate, self.clock.now(), found).await {
                info!(
                    award = %change.name,
                    previous = change.previous.as_deref().unwrap_or("none"),
                    current = %change.current,
                    "deadline updated"
                );
                changes.push(change);
            }
        }

        let persistence = if changes.is_empty() {
            PersistStatus::NotNeeded
        } else {
            self.persist().await
        };

        let completed_at = self.clock.now();
        self.state.write().await.last_updated = Some(completed_at);

        info!(
            examined = counts.examined,
            fetched = counts.fetched,
            failures = counts.fetch_failures,
            changed = changes.len(),
            "deadline refresh cycle finished"
        );

        RefreshReport {
            counts,
            changes,
            persistence,
            completed_at,
        }
    }

    /// Tracked awards in collection order. The refresher is the only writer,
    /// so the indices stay valid for the rest of the cycle.
    async fn plan(&self, counts: &mut RefreshCounts) -> Vec<Candidate> {
        let state = self.state.read().await;
        let mut candidates = Vec::new();
        for (index, record) in state.awards.iter().enumerate() {
            counts.examined += 1;
            match record.poll_url() {
                Some(url) => candidates.push(Candidate {
                    index,
                    name: record.name.clone(),
                    url: url.to_string(),
                    last_fetched_at: record.last_fetched_at,
                }),
                None => counts.skipped_untracked += 1,
            }
        }
        candidates
    }

    /// Stamp the attempt and swap in a new deadline under one write lock, so
    /// readers see the record either before or after this update.
    async fn apply(
        &self,
        candidate: &Candidate,
        attempted_at: DateTime<Utc>,
        found: Option<String>,
    ) -> Option<DeadlineChange> {
        let mut state = self.state.write().await;
        let record = state.awards.get_mut(candidate.index)?;
        record.last_fetched_at = Some(attempted_at);

        let found = found?;
        if record.deadline.as_deref() == Some(found.as_str()) {
            return None;
        }
        let previous = record.deadline.replace(found.clone());
        Some(DeadlineChange {
            index: candidate.index,
            name: record.name.clone(),
            previous,
            current: found,
        })
    }

    /// Writes the current collection from the blocking pool.
    async fn persist(&self) -> PersistStatus {
        let collection = self.state.read().await.awards.clone();
        let store = Arc::clone(&self.store);
        let written = tokio::task::spawn_blocking(move || store.persist(&collection)).await;

        let failure = match written {
            Ok(Ok(())) => return PersistStatus::Persisted,
            Ok(Err(err)) => err.to_string(),
            Err(join) => format!("snapshot write task failed: {join}"),
        };
        error!(error = %failure, "failed to persist award snapshot");
        PersistStatus::Failed { error: failure }
    }
}
