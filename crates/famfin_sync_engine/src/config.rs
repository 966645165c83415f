//! Configuration for the sync engine.

use std::time::Duration;

/// Configuration for sync operations.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Period of automatic passes while online.
    pub sync_interval: Duration,
    /// Retry policy for failing queue entries.
    pub retry: RetryPolicy,
    /// Whether a manual sync refreshes the family cache afterwards.
    pub refresh_after_sync: bool,
}

impl SyncConfig {
    /// Creates a configuration with default values.
    pub fn new() -> Self {
        Self {
            sync_interval: Duration::from_secs(30),
            retry: RetryPolicy::default(),
            refresh_after_sync: true,
        }
    }

    /// Sets the interval of automatic passes.
    pub fn with_sync_interval(mut self, interval: Duration) -> Self {
        self.sync_interval = interval;
        self
    }

    /// Sets the retry policy.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Sets whether a manual sync refreshes the cache afterwards.
    pub fn with_refresh_after_sync(mut self, refresh: bool) -> Self {
        self.refresh_after_sync = refresh;
        self
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// How often a failing entry is retried before it is parked.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Attempts before parking; `None` retries forever.
    pub max_attempts: Option<u32>,
}

impl RetryPolicy {
    /// Retries every pass, forever.
    pub fn unlimited() -> Self {
        Self { max_attempts: None }
    }

    /// Parks an entry after `max_attempts` failed attempts.
    pub fn with_max_attempts(max_attempts: u32) -> Self {
        Self {
            max_attempts: Some(max_attempts.max(1)),
        }
    }

    /// Returns true if an entry with `attempts` failures should be parked.
    pub fn should_park(&self, attempts: u32) -> bool {
        self.max_attempts.is_some_and(|max| attempts >= max)
    }
}
