//! Real-time feed envelope and subscription messages.
//!
//! # Protocol
//!
//! 1. The client opens a WebSocket to the live-data endpoint.
//! 2. It sends one [`SubscriptionRequest`] per topic of interest. Topics
//!    that carry private data (see [`FeedTopic::requires_auth`]) include
//!    [`ClobAuth`] credentials.
//! 3. The server pushes [`FeedMessage`] frames. The `topic` field selects
//!    the payload shape.
//! 4. A plain `ping` text frame keeps the session alive; the server
//!    answers with `pong`.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// A raw message pushed by the real-time feed.
///
/// ```json
/// {"topic":"activity","type":"trades","timestamp":1718000000000,"payload":{ ... }}
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedMessage {
    /// Topic name, e.g. `activity` or `clob_market`.
    pub topic: String,
    /// Message type within the topic, e.g. `trades` or `price_change`.
    #[serde(rename = "type", default)]
    pub kind: String,
    /// Provider-specific payload.
    #[serde(default)]
    pub payload: serde_json::Value,
    /// Server timestamp in unix milliseconds, when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
}

impl FeedMessage {
    pub fn new(topic: impl Into<String>, kind: impl Into<String>, payload: serde_json::Value) -> Self {
        Self {
            topic: topic.into(),
            kind: kind.into(),
            payload,
            timestamp: None,
        }
    }
}

/// Topics understood by the ingestion adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedTopic {
    /// Public trade activity.
    Activity,
    /// Market-level price and status changes.
    ClobMarket,
    /// Authenticated per-user order and position updates.
    ClobUser,
    /// Exchange-sourced crypto prices.
    CryptoPrices,
    /// Chainlink oracle crypto prices.
    CryptoPricesChainlink,
    /// Equity reference prices.
    EquityPrices,
}

impl FeedTopic {
    pub const ALL: [FeedTopic; 6] = [
        FeedTopic::Activity,
        FeedTopic::ClobMarket,
        FeedTopic::ClobUser,
        FeedTopic::CryptoPrices,
        FeedTopic::CryptoPricesChainlink,
        FeedTopic::EquityPrices,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FeedTopic::Activity => "activity",
            FeedTopic::ClobMarket => "clob_market",
            FeedTopic::ClobUser => "clob_user",
            FeedTopic::CryptoPrices => "crypto_prices",
            FeedTopic::CryptoPricesChainlink => "crypto_prices_chainlink",
            FeedTopic::EquityPrices => "equity_prices",
        }
    }

    /// Whether subscribing to this topic needs CLOB API credentials.
    pub fn requires_auth(&self) -> bool {
        matches!(self, FeedTopic::ClobUser)
    }

    /// Whether this topic is a plain reference-price feed.
    pub fn is_price_feed(&self) -> bool {
        matches!(
            self,
            FeedTopic::CryptoPrices | FeedTopic::CryptoPricesChainlink | FeedTopic::EquityPrices
        )
    }
}

impl std::fmt::Display for FeedTopic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown feed topic: {0}")]
pub struct UnknownTopic(pub String);

impl FromStr for FeedTopic {
    type Err = UnknownTopic;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FeedTopic::ALL
            .into_iter()
            .find(|topic| topic.as_str() == s)
            .ok_or_else(|| UnknownTopic(s.to_string()))
    }
}

/// CLOB API credentials injected into authenticated subscriptions.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClobAuth {
    pub key: String,
    pub secret: String,
    pub passphrase: String,
}

impl std::fmt::Debug for ClobAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClobAuth")
            .field("key", &self.key)
            .field("secret", &"<redacted>")
            .field("passphrase", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionAction {
    Subscribe,
    Unsubscribe,
}

/// One topic entry inside a [`SubscriptionRequest`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
    pub topic: FeedTopic,
    /// Message type filter; `*` selects every type in the topic.
    #[serde(rename = "type")]
    pub kind: String,
    /// Provider-defined filter expression, passed through verbatim.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filters: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clob_auth: Option<ClobAuth>,
}

impl Subscription {
    pub fn all_types(topic: FeedTopic) -> Self {
        Self {
            topic,
            kind: "*".to_string(),
            filters: None,
            clob_auth: None,
        }
    }
}

/// Client-to-server subscription message.
///
/// ```json
/// {"action":"subscribe","subscriptions":[{"topic":"activity","type":"*"}]}
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionRequest {
    pub action: SubscriptionAction,
    pub subscriptions: Vec<Subscription>,
}

impl SubscriptionRequest {
    pub fn subscribe(subscriptions: Vec<Subscription>) -> Self {
        Self {
            action: SubscriptionAction::Subscribe,
            subscriptions,
        }
    }

    pub fn unsubscribe(subscriptions: Vec<Subscription>) -> Self {
        Self {
            action: SubscriptionAction::Unsubscribe,
            subscriptions,
        }
    }
}
