//! Rolling pipeline metrics.

use serde::Serialize;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use sysinfo::System;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// Point-in-time view of the pipeline, published every metrics interval.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MetricsSnapshot {
    pub processed: u64,
    pub failed: u64,
    pub retried: u64,
    pub dropped: u64,
    pub average_processing_time_ms: f64,
    pub uptime_secs: u64,
    pub memory_bytes: u64,
    pub queue_size: usize,
    /// Queue fill level in percent.
    pub buffer_utilization: f64,
    /// `failed / processed` in percent.
    pub error_rate: f64,
    /// Events per second over the sample window.
    pub throughput: f64,
    /// Unix milliseconds.
    pub timestamp: i64,
}

struct Rolling {
    average_ms: f64,
    /// `(sampled at, processed count)`, oldest first.
    samples: VecDeque<(Instant, u64)>,
}

/// Counters shared by every in-flight event.
pub struct PipelineMetrics {
    processed: AtomicU64,
    failed: AtomicU64,
    retried: AtomicU64,
    dropped: AtomicU64,
    rolling: Mutex<Rolling>,
    window: usize,
    started: Instant,
    system: Mutex<System>,
}

impl PipelineMetrics {
    pub fn new(throughput_window: usize) -> Self {
        Self {
            processed: AtomicU64::new(0),
            failed: AtomicU64::new(0),
            retried: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
            rolling: Mutex::new(Rolling {
                average_ms: 0.0,
                samples: VecDeque::with_capacity(throughput_window),
            }),
            window: throughput_window.max(2),
            started: Instant::now(),
            system: Mutex::new(System::new()),
        }
    }

    /// Count a success and fold its duration into the running average.
    pub async fn record_success(&self, elapsed: Duration) {
        let mut rolling = self.rolling.lock().await;
        let n = self.processed.fetch_add(1, Ordering::Relaxed) + 1;
        let ms = elapsed.as_secs_f64() * 1_000.0;
        rolling.average_ms = (rolling.average_ms * (n - 1) as f64 + ms) / n as f64;
    }

    pub fn record_failure(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_retry(&self) {
        self.retried.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_drop(&self) {
        self.dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn processed(&self) -> u64 {
        self.processed.load(Ordering::Relaxed)
    }

    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }

    /// Take a throughput sample and build a snapshot.
    pub async fn sample(&self, queue_size: usize, capacity: usize) -> MetricsSnapshot {
        let processed = self.processed();
        let failed = self.failed();
        let now = Instant::now();

        let (average_ms, throughput) = {
            let mut rolling = self.rolling.lock().await;
            rolling.samples.push_back((now, processed));
            while rolling.samples.len() > self.window {
                rolling.samples.pop_front();
            }
            (rolling.average_ms, throughput(&rolling.samples))
        };

        MetricsSnapshot {
            processed,
            failed,
            retried: self.retried.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            average_processing_time_ms: average_ms,
            uptime_secs: now.duration_since(self.started).as_secs(),
            memory_bytes: self.process_memory().await,
            queue_size,
            buffer_utilization: percent(queue_size as f64, capacity as f64),
            error_rate: error_rate(processed, failed),
            throughput,
            timestamp: (time::OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000) as i64,
        }
    }

    async fn process_memory(&self) -> u64 {
        let Ok(pid) = sysinfo::get_current_pid() else {
            return 0;
        };
        let mut system = self.system.lock().await;
        system.refresh_process(pid);
        system.process(pid).map(|p| p.memory()).unwrap_or(0)
    }
}

fn percent(part: f64, whole: f64) -> f64 {
    if whole <= 0.0 { 0.0 } else { part / whole * 100.0 }
}

/// Failures per success in percent. With no successes yet, any failure
/// counts as a 100% error rate.
fn error_rate(processed: u64, failed: u64) -> f64 {
    match (processed, failed) {
        (_, 0) => 0.0,
        (0, _) => 100.0,
        (p, f) => percent(f as f64, p as f64),
    }
}

/// Events per second between the oldest and newest sample.
fn throughput(samples: &VecDeque<(Instant, u64)>) -> f64 {
    let (Some((first_at, first)), Some((last_at, last))) = (samples.front(), samples.back()) else {
        return 0.0;
    };
    let span = last_at.duration_since(*first_at).as_secs_f64();
    if span <= 0.0 {
        return 0.0;
    }
    last.saturating_sub(*first) as f64 / span
}
