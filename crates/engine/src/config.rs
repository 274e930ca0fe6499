//! Engine configuration.

use std::time::Duration;

/// Tuning knobs for the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// How many events a job may run ahead of its slowest attached reader
    /// before the executor waits. Zero is treated as one.
    pub event_buffer: usize,
    /// How long a finished job stays available for lookups and replay.
    pub retention: Duration,
    /// Interval between eviction sweeps of the background reaper.
    pub reap_interval: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            event_buffer: 64,
            retention: Duration::from_secs(300),
            reap_interval: Duration::from_secs(30),
        }
    }
}

impl EngineConfig {
    pub fn with_event_buffer(mut self, event_buffer: usize) -> Self {
        self.event_buffer = event_buffer;
        self
    }

    pub fn with_retention(mut self, retention: Duration) -> Self {
        self.retention = retention;
        self
    }

    pub fn with_reap_interval(mut self, reap_interval: Duration) -> Self {
        self.reap_interval = reap_interval;
        self
    }
}
