use pmon_sdk::objects::{ClobAuth, FeedTopic};
use std::collections::BTreeMap;
use std::time::Duration;
use url::Url;

/// Default live-data endpoint.
pub const DEFAULT_FEED_URL: &str = "wss://ws-live-data.polymarket.com";

/// Connection and subscription settings of the ingestion adapter.
#[derive(Debug, Clone, PartialEq)]
pub struct IngestionConfig {
    pub url: Url,
    /// Topics subscribed to on every (re)connect.
    pub enabled_topics: Vec<FeedTopic>,
    /// Optional provider filter per topic.
    pub topic_filters: BTreeMap<FeedTopic, String>,
    /// Credentials for topics that require authentication.
    pub credentials: Option<ClobAuth>,
    pub auto_reconnect: bool,
    pub max_reconnect_attempts: u32,
    pub connect_timeout: Duration,
    pub ping_interval: Duration,
}

impl IngestionConfig {
    pub fn new(url: Url) -> Self {
        Self {
            url,
            enabled_topics: vec![FeedTopic::Activity, FeedTopic::ClobMarket],
            topic_filters: BTreeMap::new(),
            credentials: None,
            auto_reconnect: true,
            max_reconnect_attempts: 10,
            connect_timeout: Duration::from_secs(10),
            ping_interval: Duration::from_secs(5),
        }
    }
}
