//! Retry policy for asset downloads: server-directed waits on 503,
//! linear backoff on everything else.

use std::sync::Mutex;
use std::time::Duration;

/// Wait used when a 503 carries no usable `Retry-After`
pub const DEFAULT_RETRY_AFTER: Duration = Duration::from_secs(30);

/// Base unit of the linear backoff between failed attempts
pub const DEFAULT_BACKOFF_BASE: Duration = Duration::from_secs(5);

pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Upper bound accepted for `max_retries` in a run configuration
pub const MAX_RETRIES_LIMIT: u32 = 100;

/// Upper bound accepted for the backoff base in a run configuration
pub const MAX_BACKOFF_BASE: Duration = Duration::from_secs(3600);

/// Blocking sleep capability, injected so tests can observe delays.
pub trait Sleeper: Send + Sync {
    fn sleep(&self, duration: Duration);
}

/// Real sleeper: blocks the current thread
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Sleeper that records requested delays and returns immediately
#[derive(Debug, Default)]
pub struct RecordingSleeper {
    slept: Mutex<Vec<Duration>>,
}

impl RecordingSleeper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delays requested so far, in order
    pub fn slept(&self) -> Vec<Duration> {
        self.slept
            .lock()
            .map(|v| v.clone())
            .unwrap_or_default()
    }
}

impl Sleeper for RecordingSleeper {
    fn sleep(&self, duration: Duration) {
        if let Ok(mut slept) = self.slept.lock() {
            slept.push(duration);
        }
    }
}

/// Attempt budget and delays for one download.
///
/// `max_retries = N` allows `N + 1` attempts in total: the first one plus N
/// retries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub backoff_base: Duration,
    pub default_retry_after: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            backoff_base: DEFAULT_BACKOFF_BASE,
            default_retry_after: DEFAULT_RETRY_AFTER,
        }
    }
}

impl RetryPolicy {
    pub fn with_max_retries(max_retries: u32) -> Self {
        Self {
            max_retries,
            ..Self::default()
        }
    }

    /// Total attempts allowed, including the first
    pub const fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Linear backoff after failed attempt `attempt` (1-indexed): `attempt * base`
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.backoff_base.checked_mul(attempt).unwrap_or(Duration::MAX)
    }

    /// Wait requested by a 503 response.
    ///
    /// Only the delta-seconds form is understood; a missing or unparseable
    /// header falls back to [`RetryPolicy::default_retry_after`].
    pub fn retry_after(&self, header: Option<&str>) -> Duration {
        header
            .and_then(|v| v.trim().parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or(self.default_retry_after)
    }
}
