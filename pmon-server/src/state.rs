//! Application state shared across all request handlers.

use pmon_core::processors::{EventPipeline, MetricsSnapshot};
use tokio::sync::watch;

/// Application state that is shared across all request handlers.
///
/// This is cloneable and cheap to pass around (everything is behind Arc).
#[derive(Clone)]
pub struct AppState {
    /// Handle to the running pipeline.
    pub pipeline: EventPipeline,
    /// Latest published metrics snapshot.
    pub metrics: watch::Receiver<MetricsSnapshot>,
}

impl AppState {
    pub fn new(pipeline: EventPipeline) -> Self {
        let metrics = pipeline.metrics_receiver();
        Self { pipeline, metrics }
    }
}
