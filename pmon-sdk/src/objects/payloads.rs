//! Raw provider payloads carried inside [`FeedMessage`](super::FeedMessage).
//!
//! Every field is optional. The feed is not trusted, and the
//! core's transformers decide which fields are required for a record.
//! Timestamps are unix seconds or milliseconds as sent by the provider.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A public trade from the `activity` topic.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityTrade {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub proxy_wallet: Option<String>,
    /// `BUY` or `SELL`.
    #[serde(default)]
    pub side: Option<String>,
    #[serde(default)]
    pub condition_id: Option<String>,
    #[serde(default)]
    pub asset: Option<String>,
    #[serde(default)]
    pub outcome: Option<String>,
    #[serde(default)]
    pub size: Option<Decimal>,
    #[serde(default)]
    pub price: Option<Decimal>,
    #[serde(default)]
    pub fee: Option<Decimal>,
    #[serde(default)]
    pub transaction_hash: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub event_slug: Option<String>,
    #[serde(default)]
    pub timestamp: Option<i64>,
}

/// A market price reading from the `clob_market` topic.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketPriceChange {
    #[serde(default, alias = "market")]
    pub condition_id: Option<String>,
    #[serde(default)]
    pub price: Option<Decimal>,
    #[serde(default)]
    pub probability: Option<Decimal>,
    #[serde(default, alias = "volume24hr")]
    pub volume_24h: Option<Decimal>,
    #[serde(default, alias = "oneDayPriceChange")]
    pub price_change_24h: Option<Decimal>,
    #[serde(default)]
    pub liquidity: Option<Decimal>,
    #[serde(default)]
    pub timestamp: Option<i64>,
}

/// A reference price from one of the price-feed topics.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CryptoPrice {
    #[serde(default)]
    pub symbol: Option<String>,
    #[serde(default)]
    pub value: Option<Decimal>,
    #[serde(default)]
    pub timestamp: Option<i64>,
}

impl From<CryptoPrice> for MarketPriceChange {
    /// Reference prices are stored as market readings keyed by symbol.
    fn from(price: CryptoPrice) -> Self {
        Self {
            condition_id: price.symbol,
            price: price.value,
            probability: None,
            volume_24h: None,
            price_change_24h: None,
            liquidity: None,
            timestamp: price.timestamp,
        }
    }
}

/// A position update from the authenticated `clob_user` topic.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPosition {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default, alias = "owner", alias = "proxyWallet")]
    pub user: Option<String>,
    #[serde(default, alias = "market")]
    pub condition_id: Option<String>,
    #[serde(default)]
    pub outcome: Option<String>,
    /// `BUY` (long) or `SELL` (short).
    #[serde(default)]
    pub side: Option<String>,
    #[serde(default)]
    pub size: Option<Decimal>,
    #[serde(default)]
    pub avg_price: Option<Decimal>,
    #[serde(default, alias = "curPrice")]
    pub current_price: Option<Decimal>,
    #[serde(default, alias = "cashPnl")]
    pub unrealized_pnl: Option<Decimal>,
    #[serde(default, alias = "realizedPnl")]
    pub realized_pnl: Option<Decimal>,
    /// `open`, `closed`, `settled` or `cancelled`.
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub payouts: BTreeMap<String, Decimal>,
    #[serde(default)]
    pub created_at: Option<i64>,
    #[serde(default)]
    pub timestamp: Option<i64>,
}

/// A market resolution, carried by `clob_market` messages of type
/// `market_resolved`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConditionResolution {
    #[serde(default, alias = "market")]
    pub condition_id: Option<String>,
    /// `active`, `resolved` or `cancelled`.
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub resolved_at: Option<i64>,
    #[serde(default, alias = "winningOutcome")]
    pub outcome: Option<String>,
    #[serde(default)]
    pub probability: Option<Decimal>,
}
