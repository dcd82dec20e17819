use std::time::Duration;

/// Queue and scheduling parameters of the event pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    /// Max events drained per processing cycle.
    pub batch_size: usize,
    /// Time between batch-drain attempts.
    pub processing_interval: Duration,
    /// Queue capacity. `enqueue` fails once the queue holds this many events.
    pub buffer_size: usize,
    /// Time between metrics snapshots.
    pub metrics_interval: Duration,
    /// Pause between batches while draining on shutdown.
    pub drain_pause: Duration,
    /// Number of processed-count samples kept for the throughput figure.
    pub throughput_window: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            batch_size: 100,
            processing_interval: Duration::from_millis(1000),
            buffer_size: 10_000,
            metrics_interval: Duration::from_secs(30),
            drain_pause: Duration::from_millis(100),
            throughput_window: 10,
        }
    }
}

/// Shape of the retry backoff curve.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    /// Retry attempts before an event is dropped.
    pub max_retries: u32,
    pub base_delay: Duration,
    pub backoff_multiplier: f64,
    pub max_delay: Duration,
    /// Add up to 10% random jitter to each delay.
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(1000),
            backoff_multiplier: 2.0,
            max_delay: Duration::from_secs(30),
            jitter: true,
        }
    }
}
