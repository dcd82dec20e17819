//! Runtime configuration for the event core.
//!
//! These types are the validated, in-memory form. Loading them from a file
//! is the job of the server crate.

mod config_store;
mod ingestion;
mod pipeline;
mod thresholds;

pub use config_store::ConfigStore;
pub use ingestion::{DEFAULT_FEED_URL, IngestionConfig};
pub use pipeline::{PipelineConfig, RetryConfig};
pub use thresholds::ThresholdConfig;
