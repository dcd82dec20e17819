//! Normalized, storage-ready records and their Postgres queries.
//!
//! Each record has a natural key. Writes are upserts: a replayed record
//! never creates a duplicate, and a later write for the same key only
//! touches the record's volatile fields (see each `apply_update`).
//! Queries are structs run by [`DatabaseProcessor`](crate::framework::DatabaseProcessor).

pub mod condition;
pub mod market_data;
pub mod position;
pub mod transaction;

pub use condition::{ConditionRecord, UpsertCondition};
pub use market_data::{GetPreviousMarketData, MarketDataRecord, UpsertMarketData};
pub use position::{GetPositionById, PositionRecord, UpsertPosition};
pub use transaction::{TransactionRecord, UpsertTransaction};

/// The four kinds of normalized record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordKind {
    MarketData,
    Transaction,
    Position,
    Condition,
}

impl std::fmt::Display for RecordKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecordKind::MarketData => write!(f, "market_data"),
            RecordKind::Transaction => write!(f, "transaction"),
            RecordKind::Position => write!(f, "position"),
            RecordKind::Condition => write!(f, "condition"),
        }
    }
}

/// Trade direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, sqlx::Type)]
#[sqlx(rename_all = "lowercase", type_name = "trade_side")]
pub enum TradeSide {
    Buy,
    Sell,
}

impl TradeSide {
    /// Parse the provider's `BUY`/`SELL` spelling, case-insensitively.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "buy" => Some(TradeSide::Buy),
            "sell" => Some(TradeSide::Sell),
            _ => None,
        }
    }
}

/// Lifecycle of a position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, sqlx::Type)]
#[sqlx(rename_all = "lowercase", type_name = "position_status")]
pub enum PositionStatus {
    Open,
    Closed,
    Settled,
    Cancelled,
}

impl PositionStatus {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "open" | "active" => Some(PositionStatus::Open),
            "closed" => Some(PositionStatus::Closed),
            "settled" | "redeemed" => Some(PositionStatus::Settled),
            "cancelled" | "canceled" => Some(PositionStatus::Cancelled),
            _ => None,
        }
    }

    /// Settled and cancelled positions are final.
    pub fn is_terminal(&self) -> bool {
        matches!(self, PositionStatus::Settled | PositionStatus::Cancelled)
    }
}

impl std::fmt::Display for PositionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PositionStatus::Open => write!(f, "open"),
            PositionStatus::Closed => write!(f, "closed"),
            PositionStatus::Settled => write!(f, "settled"),
            PositionStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Lifecycle of a market condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, sqlx::Type)]
#[sqlx(rename_all = "lowercase", type_name = "condition_status")]
pub enum ConditionStatus {
    Active,
    Resolved,
    Cancelled,
}

impl ConditionStatus {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "active" | "open" => Some(ConditionStatus::Active),
            "resolved" => Some(ConditionStatus::Resolved),
            "cancelled" | "canceled" => Some(ConditionStatus::Cancelled),
            _ => None,
        }
    }
}

impl std::fmt::Display for ConditionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConditionStatus::Active => write!(f, "active"),
            ConditionStatus::Resolved => write!(f, "resolved"),
            ConditionStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_parsing_accepts_provider_spellings() {
        assert_eq!(TradeSide::parse("BUY"), Some(TradeSide::Buy));
        assert_eq!(TradeSide::parse("sell "), Some(TradeSide::Sell));
        assert_eq!(TradeSide::parse("hold"), None);
        assert_eq!(PositionStatus::parse("CANCELED"), Some(PositionStatus::Cancelled));
        assert_eq!(ConditionStatus::parse("Resolved"), Some(ConditionStatus::Resolved));
    }

    #[test]
    fn test_terminal_position_states() {
        assert!(PositionStatus::Settled.is_terminal());
        assert!(PositionStatus::Cancelled.is_terminal());
        assert!(!PositionStatus::Open.is_terminal());
        assert!(!PositionStatus::Closed.is_terminal());
    }
}
