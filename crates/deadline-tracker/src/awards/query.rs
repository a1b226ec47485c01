use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::RwLock;

use super::domain::{AwardCollection, AwardState};

/// Handle to the in-memory tracker state. The refresher is the only writer.
pub type SharedAwards = Arc<RwLock<AwardState>>;

pub fn shared_awards(awards: AwardCollection) -> SharedAwards {
    Arc::new(RwLock::new(AwardState::new(awards)))
}

/// Point-in-time copy of the tracker state returned to API clients.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AwardsSnapshot {
    pub awards: AwardCollection,
    #[serde(rename = "lastUpdated")]
    pub last_updated: Option<DateTime<Utc>>,
}

/// Read-only access to the award collection for the presentation layer.
#[derive(Debug, Clone)]
pub struct AwardQuery {
    state: SharedAwards,
}

impl AwardQuery {
    pub fn new(state: SharedAwards) -> Self {
        Self { state }
    }

    /// Copies the current state. Refresh cycles only hold the write lock while
    /// applying a single record, so this never waits on network I/O.
    pub async fn snapshot(&self) -> AwardsSnapshot {
        let state = self.state.read().await;
        AwardsSnapshot {
            awards: state.awards.clone(),
            last_updated: state.last_updated,
        }
    }
}
