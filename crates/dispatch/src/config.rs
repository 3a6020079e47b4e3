//! Dispatcher configuration.

use std::time::Duration;

/// Default polling interval for the dispatcher loop.
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Default number of messages processed concurrently.
const DEFAULT_CONCURRENCY: usize = 4;

/// Default claim budget before a transiently failing message is
/// dead-lettered.
const DEFAULT_MAX_ATTEMPTS: i32 = 5;

/// Default base delay for linear retry backoff.
const DEFAULT_RETRY_BASE_DELAY: Duration = Duration::from_secs(30);

/// Default claim lease. A processing message whose dispatcher has not
/// recorded a disposition within this window is redelivered.
const DEFAULT_LEASE: Duration = Duration::from_secs(300);

/// Tunables for the [`MessageDispatcher`](crate::dispatcher::MessageDispatcher).
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    /// How often the loop polls the queue for claimable messages.
    pub poll_interval: Duration,
    /// Maximum messages handled concurrently.
    pub concurrency: usize,
    /// Total claims allowed before dead-lettering.
    pub max_attempts: i32,
    /// Linear backoff base: the n-th retry waits `n * retry_base_delay`.
    pub retry_base_delay: Duration,
    /// Claim lease: how long a processing message may go without a
    /// disposition before another dispatcher may reclaim it. Must exceed
    /// the slowest handler's worst case, or messages run concurrently.
    pub lease: Duration,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            concurrency: DEFAULT_CONCURRENCY,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            retry_base_delay: DEFAULT_RETRY_BASE_DELAY,
            lease: DEFAULT_LEASE,
        }
    }
}

impl DispatcherConfig {
    /// Load configuration from environment variables, falling back to the
    /// defaults for anything unset or unparsable.
    ///
    /// | Variable                  | Default |
    /// |---------------------------|---------|
    /// | `DISPATCH_POLL_MS`        | `1000`  |
    /// | `DISPATCH_CONCURRENCY`    | `4`     |
    /// | `DISPATCH_MAX_ATTEMPTS`   | `5`     |
    /// | `DISPATCH_RETRY_BASE_SECS`| `30`    |
    /// | `DISPATCH_LEASE_SECS`     | `300`   |
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            poll_interval: std::env::var("DISPATCH_POLL_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .map(Duration::from_millis)
                .unwrap_or(defaults.poll_interval),
            concurrency: std::env::var("DISPATCH_CONCURRENCY")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.concurrency),
            max_attempts: std::env::var("DISPATCH_MAX_ATTEMPTS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.max_attempts),
            retry_base_delay: std::env::var("DISPATCH_RETRY_BASE_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.retry_base_delay),
            lease: std::env::var("DISPATCH_LEASE_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.lease),
        }
    }
}
