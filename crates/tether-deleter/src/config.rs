use std::time::Duration;
use typed_builder::TypedBuilder;

pub const DEFAULT_FLUSH_THRESHOLD: usize = 10;
pub const DEFAULT_FLUSH_INTERVAL: Duration = Duration::from_secs(5);
pub const DEFAULT_FAN_IN_CAPACITY: usize = 20;

/// Tuning for the deletion pipeline.
#[derive(Debug, Clone, TypedBuilder)]
pub struct PipelineConfig {
    /// Buffered requests that force an immediate commit.
    #[builder(default = DEFAULT_FLUSH_THRESHOLD)]
    pub flush_threshold: usize,
    /// Period of the timer that commits a non-empty buffer.
    #[builder(default = DEFAULT_FLUSH_INTERVAL)]
    pub flush_interval: Duration,
    /// Capacity of the merged channel all intake channels feed.
    #[builder(default = DEFAULT_FAN_IN_CAPACITY)]
    pub fan_in_capacity: usize,
}

impl PipelineConfig {
    pub(crate) fn threshold(&self) -> usize {
        self.flush_threshold.max(1)
    }

    /// `tokio::time::interval` rejects a zero period.
    pub(crate) fn interval(&self) -> Duration {
        self.flush_interval.max(Duration::from_millis(1))
    }

    pub(crate) fn capacity(&self) -> usize {
        self.fan_in_capacity.max(1)
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}
