use std::time::Duration;

use async_trait::async_trait;
use reqwest::redirect::Policy;

use crate::config::TrackerConfig;

const MAX_REDIRECTS: usize = 10;
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Why a page could not be retrieved. The refresher treats every variant the
/// same way: the award keeps its deadline and is retried after the staleness
/// window.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("upstream returned HTTP {0}")]
    Status(u16),
    #[error("transport failure: {0}")]
    Transport(String),
}

/// Network seam used by the refresher so cycles can run against scripted pages.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch_text(&self, url: &str) -> Result<String, FetchError>;
}

/// `reqwest` backed fetcher. Follows redirects, bounds every request by a
/// timeout and never retries.
#[derive(Debug, Clone)]
pub struct HttpPageFetcher {
    client: reqwest::Client,
}

impl HttpPageFetcher {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    pub fn from_config(config: &TrackerConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(config.fetch_timeout)
            .connect_timeout(CONNECT_TIMEOUT.min(config.fetch_timeout))
            .redirect(Policy::limited(MAX_REDIRECTS))
            .user_agent(config.user_agent.clone())
            .build()?;
        Ok(Self::new(client))
    }
}

#[async_trait]
impl PageFetcher for HttpPageFetcher {
    async fn fetch_text(&self, url: &str) -> Result<String, FetchError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|err| FetchError::Transport(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        response
            .text()
            .await
            .map_err(|err| FetchError::Transport(err.to_string()))
    }
}
