//! Wait - Poll a remote object until it reaches a terminal status
//!
//! Remote operations that complete asynchronously are followed by a wait:
//! the object is refreshed at a fixed interval until its status is one of the
//! target statuses, leaves the pending set, or the timeout elapses.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;

/// Error returned by [`StateChangeConf::wait_for_state`]
#[derive(Debug, thiserror::Error)]
pub enum WaitError {
    #[error("timeout while waiting for state to become '{}' (last state: '{last_state}', timeout: {timeout:?})", target.join(", "))]
    Timeout {
        last_state: String,
        target: Vec<String>,
        timeout: Duration,
    },

    #[error("unexpected state '{state}', wanted target '{}'", target.join(", "))]
    UnexpectedState { state: String, target: Vec<String> },

    #[error("{0}")]
    Refresh(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Polling configuration
#[derive(Debug, Clone)]
pub struct StateChangeConf {
    pub pending: Vec<String>,
    pub target: Vec<String>,
    /// Wait before the first refresh
    pub delay: Duration,
    pub poll_interval: Duration,
    pub timeout: Duration,
}

impl StateChangeConf {
    pub fn new(pending: &[&str], target: &[&str], timeout: Duration) -> Self {
        Self {
            pending: pending.iter().map(|s| s.to_string()).collect(),
            target: target.iter().map(|s| s.to_string()).collect(),
            delay: Duration::from_secs(10),
            poll_interval: Duration::from_secs(10),
            timeout,
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Refresh until the reported status is a target status
    ///
    /// `refresh` returns the refreshed object together with its status.
    /// A refresh error aborts the wait immediately.
    pub async fn wait_for_state<T, E, F, Fut>(&self, mut refresh: F) -> Result<T, WaitError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<(T, String), E>>,
        E: std::error::Error + Send + Sync + 'static,
    {
        let start = Instant::now();

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        loop {
            let (object, status) = refresh()
                .await
                .map_err(|e| WaitError::Refresh(Box::new(e)))?;

            if self.target.contains(&status) {
                return Ok(object);
            }

            if !self.pending.contains(&status) {
                return Err(WaitError::UnexpectedState {
                    state: status,
                    target: self.target.clone(),
                });
            }

            if start.elapsed() >= self.timeout {
                return Err(WaitError::Timeout {
                    last_state: status,
                    target: self.target.clone(),
                    timeout: self.timeout,
                });
            }

            log::debug!(
                "Waiting for state to become '{}' (current: '{}')",
                self.target.join(", "),
                status
            );
            tokio::time::sleep(self.poll_interval).await;
        }
    }
}
