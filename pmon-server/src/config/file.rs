//! TOML file configuration structures.
//!
//! These structs directly map to the `pmon-config.toml` file format.
//! Every section is optional; durations are in milliseconds.

use pmon_core::config::DEFAULT_FEED_URL;
use pmon_sdk::objects::{ClobAuth, FeedTopic};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::net::SocketAddr;
use url::Url;

/// Root configuration structure as read from the TOML file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub thresholds: ThresholdConfig,
    #[serde(default)]
    pub feed: FeedConfig,
    #[serde(default)]
    pub notifications: NotificationConfig,
}

/// Server configuration section.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// The address and port to listen on (e.g., "0.0.0.0:8080").
    #[serde(default = "default_listen_addr")]
    pub listen: SocketAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen_addr(),
        }
    }
}

fn default_listen_addr() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 8080))
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub batch_size: usize,
    pub processing_interval_ms: u64,
    pub buffer_size: usize,
    pub metrics_interval_ms: u64,
    pub drain_pause_ms: u64,
    pub throughput_window: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            batch_size: 100,
            processing_interval_ms: 1_000,
            buffer_size: 10_000,
            metrics_interval_ms: 30_000,
            drain_pause_ms: 100,
            throughput_window: 10,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub backoff_multiplier: f64,
    pub max_delay_ms: u64,
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay_ms: 1_000,
            backoff_multiplier: 2.0,
            max_delay_ms: 30_000,
            jitter: true,
        }
    }
}

/// Trigger thresholds. Reloaded on SIGHUP.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ThresholdConfig {
    /// Relative price move as a fraction, e.g. `0.05`.
    pub price_change: Decimal,
    pub high_value_transaction: Decimal,
    pub pnl: Decimal,
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        let defaults = pmon_core::config::ThresholdConfig::default();
        Self {
            price_change: defaults.price_change_fraction,
            high_value_transaction: defaults.high_value_transaction,
            pnl: defaults.pnl_threshold,
        }
    }
}

/// Real-time feed section.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    /// Set to `false` to run the pipeline without a live feed.
    pub enabled: bool,
    pub url: String,
    pub topics: Vec<FeedTopic>,
    /// Provider filter expression per topic name.
    pub filters: BTreeMap<String, String>,
    pub credentials: Option<ClobAuth>,
    pub auto_reconnect: bool,
    pub max_reconnect_attempts: u32,
    pub connect_timeout_ms: u64,
    pub ping_interval_ms: u64,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            url: DEFAULT_FEED_URL.to_string(),
            topics: vec![FeedTopic::Activity, FeedTopic::ClobMarket],
            filters: BTreeMap::new(),
            credentials: None,
            auto_reconnect: true,
            max_reconnect_attempts: 10,
            connect_timeout_ms: 10_000,
            ping_interval_ms: 5_000,
        }
    }
}

/// Notification sink section.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NotificationConfig {
    /// Triggers are POSTed here as JSON when set.
    pub webhook_url: Option<Url>,
    pub timeout_ms: u64,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            webhook_url: None,
            timeout_ms: 5_000,
        }
    }
}
