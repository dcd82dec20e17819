//! Event processors for the event-driven architecture.
//!
//! This module contains all the processors that handle events in the system:
//!
//! - `RealTimeIngestionAdapter`: Owns the feed session, emits `AdapterEvent`s
//! - `AdapterEventRouter`: Receives `AdapterEvent::Message`, enqueues into the pipeline
//! - `EventPipeline`: Drains the queue in priority batches, persists records,
//!   emits `NotificationTrigger`s and `PipelineEvent`s
//!
//! The remaining modules are the pipeline's building blocks: the bounded
//! queue, record transformers, type handlers, threshold rules, the retry
//! policy and rolling metrics.

pub mod error;
pub mod handlers;
pub mod ingestion;
pub mod metrics;
pub mod pipeline;
pub mod queue;
pub mod retry;
pub mod router;
pub mod thresholds;
pub mod transformers;

pub use error::{PipelineError, TransformValidationError};
pub use handlers::{EventHandler, HandlerContext, default_handlers};
pub use ingestion::{
    FeedConnection, FeedConnector, IngestionError, RealTimeIngestionAdapter, WebSocketConnector,
};
pub use metrics::MetricsSnapshot;
pub use pipeline::{BatchOutcome, BatchReport, EventPipeline};
pub use queue::EventQueue;
pub use retry::RetryPolicy;
pub use router::AdapterEventRouter;
pub use transformers::RecordTransformer;
