use std::time::Duration;

/// Default bound on a single delivery attempt.
pub const DEFAULT_DELIVERY_TIMEOUT: Duration = Duration::from_secs(10);
/// Default interval between reachability probes and pending-count refreshes.
pub const DEFAULT_MONITOR_INTERVAL: Duration = Duration::from_secs(5);

/// Runtime policy for an [`crate::application::queue::OfflineQueue`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueConfig {
    /// Upper bound for one gateway call; an attempt exceeding it counts as failed.
    pub delivery_timeout: Duration,
    pub monitor_interval: Duration,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            delivery_timeout: DEFAULT_DELIVERY_TIMEOUT,
            monitor_interval: DEFAULT_MONITOR_INTERVAL,
        }
    }
}

impl QueueConfig {
    pub fn with_delivery_timeout(mut self, timeout: Duration) -> Self {
        self.delivery_timeout = timeout;
        self
    }

    pub fn with_monitor_interval(mut self, interval: Duration) -> Self {
        self.monitor_interval = interval;
        self
    }
}
