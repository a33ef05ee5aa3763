use crate::window::DEFAULT_WINDOW_CAPACITY;
use anyhow::{Result, bail};
use std::time::Duration;

const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Runtime settings for the relay core.
#[derive(Debug, Clone)]
pub struct CoreConfig {
    /// Maximum number of messages held in the recency window
    pub window_capacity: usize,
    /// Upper bound on a single storage call
    pub request_timeout: Duration,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            window_capacity: DEFAULT_WINDOW_CAPACITY,
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        }
    }
}

impl CoreConfig {
    pub fn with_window_capacity(mut self, capacity: usize) -> Self {
        self.window_capacity = capacity;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.window_capacity == 0 {
            bail!("window_capacity must be at least 1");
        }
        if self.request_timeout.is_zero() {
            bail!("request_timeout must be greater than zero");
        }
        Ok(())
    }
}
