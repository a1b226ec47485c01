//! Award deadline tracking: snapshot storage, page polling, deadline
//! extraction and the background schedule that ties them together.

pub mod domain;
pub mod extract;
pub mod fetch;
pub mod query;
pub mod refresher;
pub mod scheduler;
pub mod store;

#[cfg(test)]
mod tests;

pub use domain::{AwardCollection, AwardRecord, AwardState, NOT_APPLICABLE};
pub use extract::extract_deadline;
pub use fetch::{FetchError, HttpPageFetcher, PageFetcher};
pub use query::{shared_awards, AwardQuery, AwardsSnapshot, SharedAwards};
pub use refresher::{
    Clock, DeadlineChange, DeadlineRefresher, PersistStatus, RefreshCounts, RefreshReport,
    SystemClock,
};
pub use scheduler::{RefreshScheduler, SchedulerHandle};
pub use store::{AwardStore, FileSnapshotStore, LoadOutcome, SnapshotStore, StoreError};
