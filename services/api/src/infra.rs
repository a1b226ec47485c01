use deadline_tracker::awards::{AwardCollection, AwardStore, FileSnapshotStore, LoadOutcome};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

pub(crate) fn open_store(path: &std::path::Path) -> Arc<AwardStore<FileSnapshotStore>> {
    Arc::new(AwardStore::new(FileSnapshotStore::new(path)))
}

/// Read the startup snapshot. Missing or unreadable snapshots are not fatal;
/// the tracker starts with no awards.
pub(crate) fn load_awards(store: &AwardStore<FileSnapshotStore>) -> AwardCollection {
    match store.load() {
        LoadOutcome::Loaded(collection) => {
            info!(awards = collection.len(), "loaded award snapshot");
            collection
        }
        LoadOutcome::Missing => {
            warn!("award snapshot not found, starting with an empty list");
            AwardCollection::default()
        }
        LoadOutcome::Unreadable(err) => {
            warn!(error = %err, "could not read award snapshot, starting with an empty list");
            AwardCollection::default()
        }
    }
}
