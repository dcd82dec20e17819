//! Notification triggers handed to the delivery subsystem.

use serde::{Deserialize, Serialize};

/// Urgency of a trigger or an event.
///
/// Ordered so that `Critical > High > Medium > Low`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
    Critical,
}

impl Priority {
    /// Numeric rank used for scheduling: low = 1 ... critical = 4.
    pub fn rank(&self) -> u8 {
        match self {
            Priority::Low => 1,
            Priority::Medium => 2,
            Priority::High => 3,
            Priority::Critical => 4,
        }
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Priority::Low => write!(f, "low"),
            Priority::Medium => write!(f, "medium"),
            Priority::High => write!(f, "high"),
            Priority::Critical => write!(f, "critical"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerKind {
    PriceChange,
    Transaction,
    PositionUpdate,
    MarketResolution,
}

impl std::fmt::Display for TriggerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TriggerKind::PriceChange => write!(f, "price_change"),
            TriggerKind::Transaction => write!(f, "transaction"),
            TriggerKind::PositionUpdate => write!(f, "position_update"),
            TriggerKind::MarketResolution => write!(f, "market_resolution"),
        }
    }
}

/// A threshold crossing worth telling a user about.
///
/// Ephemeral: the core never persists triggers, it only hands them over.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationTrigger {
    #[serde(rename = "type")]
    pub kind: TriggerKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    /// Magnitude details, shape depends on `kind`.
    pub data: serde_json::Value,
    /// Unix milliseconds.
    pub timestamp: i64,
    pub priority: Priority,
}

impl NotificationTrigger {
    pub fn new(kind: TriggerKind, priority: Priority, data: serde_json::Value) -> Self {
        let now = time::OffsetDateTime::now_utc();
        Self {
            kind,
            condition_id: None,
            user_id: None,
            data,
            timestamp: (now.unix_timestamp_nanos() / 1_000_000) as i64,
            priority,
        }
    }

    pub fn with_condition(mut self, condition_id: impl Into<String>) -> Self {
        self.condition_id = Some(condition_id.into());
        self
    }

    pub fn with_user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }
}
