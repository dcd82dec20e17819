//! Configuration module for pmon-server.
//!
//! Handles loading configuration from TOML files, CLI arguments,
//! and environment variables, and turning it into the core's runtime types.

pub mod file;
pub mod runtime;

use crate::config::file::FileConfig;
use crate::config::runtime::{NotificationConfig, ServerConfig};
use pmon_core::config::{IngestionConfig, PipelineConfig, RetryConfig, ThresholdConfig};
use pmon_sdk::objects::FeedTopic;
use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Errors that can occur during configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("validation error: {0}")]
    ValidationError(String),

    #[error("DATABASE_URL environment variable not set")]
    MissingDatabaseUrl,
}

/// Loaded configuration result containing all parts.
#[derive(Debug)]
pub struct LoadedConfig {
    pub server: ServerConfig,
    pub pipeline: PipelineConfig,
    pub retry: RetryConfig,
    pub thresholds: ThresholdConfig,
    pub ingestion: IngestionConfig,
    pub feed_enabled: bool,
    pub notifications: NotificationConfig,
}

/// Configuration loader that handles the complete loading process.
pub struct ConfigLoader {
    config_path: PathBuf,
    listen_override: Option<SocketAddr>,
}

impl ConfigLoader {
    /// Create a new config loader.
    pub fn new(config_path: impl AsRef<Path>, listen_override: Option<SocketAddr>) -> Self {
        Self {
            config_path: config_path.as_ref().to_path_buf(),
            listen_override,
        }
    }

    /// Load and process the configuration.
    ///
    /// This will:
    /// 1. Read the TOML file
    /// 2. Apply CLI overrides
    /// 3. Validate the configuration
    /// 4. Build the runtime configuration
    pub fn load(&self) -> Result<LoadedConfig, ConfigError> {
        let config_content = std::fs::read_to_string(&self.config_path)?;
        self.load_from_str(&config_content)
    }

    /// Re-read only the trigger thresholds (used during SIGHUP).
    pub fn reload_thresholds(&self) -> Result<ThresholdConfig, ConfigError> {
        Ok(self.load()?.thresholds)
    }

    fn load_from_str(&self, content: &str) -> Result<LoadedConfig, ConfigError> {
        let mut file_config: FileConfig = toml::from_str(content)?;

        // Apply CLI overrides
        if let Some(listen) = self.listen_override {
            file_config.server.listen = listen;
        }

        validate(&file_config)?;
        build_loaded_config(file_config)
    }
}

fn validate(config: &FileConfig) -> Result<(), ConfigError> {
    if config.pipeline.batch_size == 0 {
        return Err(ConfigError::ValidationError(
            "pipeline.batch_size must be at least 1".to_string(),
        ));
    }
    if config.pipeline.buffer_size == 0 {
        return Err(ConfigError::ValidationError(
            "pipeline.buffer_size must be at least 1".to_string(),
        ));
    }
    if config.retry.backoff_multiplier < 1.0 {
        return Err(ConfigError::ValidationError(format!(
            "retry.backoff_multiplier must be >= 1, got {}",
            config.retry.backoff_multiplier
        )));
    }

    let thresholds = &config.thresholds;
    for (name, value) in [
        ("price_change", thresholds.price_change),
        ("high_value_transaction", thresholds.high_value_transaction),
        ("pnl", thresholds.pnl),
    ] {
        if value.is_sign_negative() {
            return Err(ConfigError::ValidationError(format!(
                "thresholds.{name} must not be negative"
            )));
        }
    }

    if config.feed.enabled && config.feed.topics.is_empty() {
        return Err(ConfigError::ValidationError(
            "feed.topics must name at least one topic".to_string(),
        ));
    }
    if config.feed.enabled
        && config.feed.credentials.is_none()
        && config.feed.topics.iter().any(FeedTopic::requires_auth)
    {
        return Err(ConfigError::ValidationError(
            "feed.credentials are required for authenticated topics".to_string(),
        ));
    }
    Ok(())
}

fn build_loaded_config(file_config: FileConfig) -> Result<LoadedConfig, ConfigError> {
    let FileConfig {
        server,
        pipeline,
        retry,
        thresholds,
        feed,
        notifications,
    } = file_config;

    let url = Url::parse(&feed.url)
        .map_err(|e| ConfigError::ValidationError(format!("feed.url {:?}: {e}", feed.url)))?;
    let topic_filters = feed
        .filters
        .into_iter()
        .map(|(topic, filter)| {
            topic
                .parse::<FeedTopic>()
                .map(|topic| (topic, filter))
                .map_err(|e| ConfigError::ValidationError(format!("feed.filters: {e}")))
        })
        .collect::<Result<BTreeMap<_, _>, _>>()?;

    Ok(LoadedConfig {
        server: ServerConfig {
            listen: server.listen,
        },
        pipeline: PipelineConfig {
            batch_size: pipeline.batch_size,
            processing_interval: Duration::from_millis(pipeline.processing_interval_ms),
            buffer_size: pipeline.buffer_size,
            metrics_interval: Duration::from_millis(pipeline.metrics_interval_ms),
            drain_pause: Duration::from_millis(pipeline.drain_pause_ms),
            throughput_window: pipeline.throughput_window,
        },
        retry: RetryConfig {
            max_retries: retry.max_retries,
            base_delay: Duration::from_millis(retry.base_delay_ms),
            backoff_multiplier: retry.backoff_multiplier,
            max_delay: Duration::from_millis(retry.max_delay_ms),
            jitter: retry.jitter,
        },
        thresholds: ThresholdConfig {
            price_change_fraction: thresholds.price_change,
            high_value_transaction: thresholds.high_value_transaction,
            pnl_threshold: thresholds.pnl,
        },
        ingestion: IngestionConfig {
            url,
            enabled_topics: feed.topics,
            topic_filters,
            credentials: feed.credentials,
            auto_reconnect: feed.auto_reconnect,
            max_reconnect_attempts: feed.max_reconnect_attempts,
            connect_timeout: Duration::from_millis(feed.connect_timeout_ms),
            ping_interval: Duration::from_millis(feed.ping_interval_ms),
        },
        feed_enabled: feed.enabled,
        notifications: NotificationConfig {
            webhook_url: notifications.webhook_url,
            timeout: Duration::from_millis(notifications.timeout_ms),
        },
    })
}

/// Get the database URL from the environment.
pub fn get_database_url() -> Result<String, ConfigError> {
    std::env::var("DATABASE_URL").map_err(|_| ConfigError::MissingDatabaseUrl)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn loader() -> ConfigLoader {
        ConfigLoader::new("unused.toml", None)
    }

    fn validation_error(content: &str) -> String {
        match loader().load_from_str(content) {
            Err(ConfigError::ValidationError(message)) => message,
            other => panic!("expected a validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_builds_runtime_config() {
        let loaded = loader()
            .load_from_str(
                r#"
[pipeline]
processing_interval_ms = 500

[thresholds]
high_value_transaction = 10000

[feed]
topics = ["activity"]
filters = { activity = "0xcond" }
"#,
            )
            .unwrap();
        assert_eq!(loaded.pipeline.processing_interval, Duration::from_millis(500));
        assert_eq!(loaded.thresholds.high_value_transaction, Decimal::from(10_000));
        assert_eq!(loaded.ingestion.enabled_topics, vec![FeedTopic::Activity]);
        assert_eq!(
            loaded.ingestion.topic_filters.get(&FeedTopic::Activity).map(String::as_str),
            Some("0xcond")
        );
        assert_eq!(loaded.retry.max_delay, Duration::from_secs(30));
        assert!(loaded.feed_enabled);
    }

    #[test]
    fn test_listen_override_wins() {
        let addr: SocketAddr = "127.0.0.1:9999".parse().unwrap();
        let loaded = ConfigLoader::new("unused.toml", Some(addr))
            .load_from_str("[server]\nlisten = \"0.0.0.0:1\"")
            .unwrap();
        assert_eq!(loaded.server.listen, addr);
    }

    #[test]
    fn test_rejects_invalid_values() {
        assert!(validation_error("[pipeline]\nbatch_size = 0").contains("batch_size"));
        assert!(validation_error("[pipeline]\nbuffer_size = 0").contains("buffer_size"));
        assert!(validation_error("[retry]\nbackoff_multiplier = 0.5").contains("backoff_multiplier"));
        assert!(validation_error("[thresholds]\npnl = -1").contains("pnl"));
        assert!(validation_error("[feed]\ntopics = []").contains("topics"));
        assert!(validation_error("[feed]\ntopics = [\"clob_user\"]").contains("credentials"));
        assert!(validation_error("[feed]\nfilters = { comments = \"x\" }").contains("filters"));
        assert!(validation_error("[feed]\nurl = \"not a url\"").contains("feed.url"));
    }

    #[test]
    fn test_disabled_feed_skips_topic_checks() {
        let loaded = loader()
            .load_from_str("[feed]\nenabled = false\ntopics = []")
            .unwrap();
        assert!(!loaded.feed_enabled);
    }
}
