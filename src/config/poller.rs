//! Remote configuration polling.
//!
//! # Responsibilities
//! - Periodically fetch the remote payload from the control plane
//! - Hand each payload to the store (which validates before swapping)
//! - Stop when the shutdown gate closes
//!
//! # Design Decisions
//! - Fixed interval, no backoff: a failed poll simply waits for the next tick
//! - Every fetch is bounded by a timeout, and an in-flight fetch is abandoned on shutdown
//! - Failures never replace the current configuration

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::time;

use crate::config::remote::DecodeError;
use crate::config::store::ConfigStore;
use crate::lifecycle::Shutdown;

#[derive(Debug, Error)]
pub enum PollError {
    #[error("fetch failed: {0}")]
    Fetch(#[from] reqwest::Error),

    #[error("control plane did not answer within {0:?}")]
    Timeout(Duration),

    #[error("control plane answered with status {0}")]
    Status(u16),

    #[error(transparent)]
    Decode(#[from] DecodeError),
}

/// Upper bound on one fetch, headers and body included.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Fetches remote configuration and applies it to a store.
pub struct RemoteConfigPoller {
    client: reqwest::Client,
    url: String,
    interval: Duration,
    timeout: Duration,
    store: Arc<ConfigStore>,
}

impl RemoteConfigPoller {
    pub fn new(url: impl Into<String>, interval: Duration, store: Arc<ConfigStore>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
            interval,
            timeout: DEFAULT_FETCH_TIMEOUT,
            store,
        }
    }

    /// Override the per-fetch timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Fetch and apply one payload. Returns the new store generation.
    pub async fn poll_once(&self) -> Result<u64, PollError> {
        let body = match time::timeout(self.timeout, self.fetch()).await {
            Ok(result) => result?,
            Err(_) => return Err(PollError::Timeout(self.timeout)),
        };
        Ok(self.store.apply_payload(&body)?)
    }

    async fn fetch(&self) -> Result<Vec<u8>, PollError> {
        let response = self.client.get(&self.url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(PollError::Status(status.as_u16()));
        }

        Ok(response.bytes().await?.to_vec())
    }

    /// Poll until `shutdown` closes.
    pub async fn run(self, shutdown: Shutdown) {
        tracing::info!(
            url = %self.url,
            interval_secs = self.interval.as_secs(),
            "Remote config poller starting"
        );

        let mut ticker = time::interval(self.interval);
        ticker.set_missed_tick_behavior(time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                _ = shutdown.wait() => break,
            }

            tokio::select! {
                result = self.poll_once() => {
                    if let Err(e) = result {
                        tracing::warn!(url = %self.url, error = %e, "Remote config poll failed");
                    }
                }
                _ = shutdown.wait() => break,
            }
        }

        tracing::info!("Remote config poller received shutdown signal, exiting loop");
    }
}
