//! Threshold rules deriving notification triggers from normalized records.

use crate::config::ThresholdConfig;
use crate::entities::{ConditionRecord, MarketDataRecord, PositionRecord, PositionStatus, TransactionRecord};
use pmon_sdk::objects::{NotificationTrigger, Priority, TriggerKind};
use rust_decimal::Decimal;
use serde_json::json;

/// Relative price move from which a price trigger is `high`.
const HIGH_PRICE_CHANGE: Decimal = Decimal::from_parts(20, 0, 0, false, 2);
/// Transaction value from which a transaction trigger is `critical`.
const CRITICAL_TRANSACTION_VALUE: Decimal = Decimal::from_parts(10_000, 0, 0, false, 0);
/// Combined P&L from which a position trigger is `high`.
const HIGH_PNL: Decimal = Decimal::from_parts(1_000, 0, 0, false, 0);

/// Compare a reading with the one stored before it.
///
/// Without a previous reading (or with a zero previous price) no relative
/// change exists and nothing triggers. Neither does a change too large to
/// represent.
pub fn price_change_trigger(
    current: &MarketDataRecord,
    previous: Option<&MarketDataRecord>,
    thresholds: &ThresholdConfig,
) -> Option<NotificationTrigger> {
    let previous = previous?;
    if previous.price.is_zero() {
        return None;
    }
    let change = current
        .price
        .checked_sub(previous.price)?
        .abs()
        .checked_div(previous.price.abs())?;
    if change < thresholds.price_change_fraction {
        return None;
    }
    let priority = if change >= HIGH_PRICE_CHANGE {
        Priority::High
    } else {
        Priority::Medium
    };
    let direction = if current.price > previous.price { "up" } else { "down" };
    Some(
        NotificationTrigger::new(
            TriggerKind::PriceChange,
            priority,
            json!({
                "previous_price": previous.price,
                "current_price": current.price,
                "change_fraction": change.round_dp(6),
                "direction": direction,
            }),
        )
        .with_condition(&current.condition_id),
    )
}

pub fn transaction_trigger(
    record: &TransactionRecord,
    thresholds: &ThresholdConfig,
) -> Option<NotificationTrigger> {
    if record.value < thresholds.high_value_transaction {
        return None;
    }
    let priority = if record.value >= CRITICAL_TRANSACTION_VALUE {
        Priority::Critical
    } else {
        Priority::High
    };
    Some(
        NotificationTrigger::new(
            TriggerKind::Transaction,
            priority,
            json!({
                "transaction_id": record.id,
                "side": format!("{:?}", record.side).to_lowercase(),
                "outcome": record.outcome,
                "amount": record.amount,
                "price": record.price,
                "value": record.value,
            }),
        )
        .with_condition(&record.condition_id)
        .with_user(&record.user_address),
    )
}

/// P&L magnitude trigger, plus a status trigger whenever the position
/// enters a terminal state it was not already in.
pub fn position_triggers(
    record: &PositionRecord,
    previous_status: Option<PositionStatus>,
    thresholds: &ThresholdConfig,
) -> Vec<NotificationTrigger> {
    let mut triggers = Vec::new();

    let total_pnl = record.total_pnl();
    if let Some(total) = total_pnl
        .map(|pnl| pnl.abs())
        .filter(|total| *total >= thresholds.pnl_threshold)
    {
        let priority = if total >= HIGH_PNL {
            Priority::High
        } else {
            Priority::Medium
        };
        triggers.push(
            NotificationTrigger::new(
                TriggerKind::PositionUpdate,
                priority,
                json!({
                    "reason": "pnl",
                    "position_id": record.id,
                    "outcome": record.outcome,
                    "unrealized_pnl": record.unrealized_pnl,
                    "realized_pnl": record.realized_pnl,
                    "total_pnl": total_pnl,
                }),
            )
            .with_condition(&record.condition_id)
            .with_user(&record.user_address),
        );
    }

    if record.status.is_terminal() && previous_status != Some(record.status) {
        triggers.push(
            NotificationTrigger::new(
                TriggerKind::PositionUpdate,
                Priority::High,
                json!({
                    "reason": "status_change",
                    "position_id": record.id,
                    "outcome": record.outcome,
                    "from": previous_status.map(|s| s.to_string()),
                    "to": record.status.to_string(),
                    "payouts": record.payouts.0,
                }),
            )
            .with_condition(&record.condition_id)
            .with_user(&record.user_address),
        );
    }

    triggers
}

/// Every resolution is critical.
pub fn resolution_trigger(record: &ConditionRecord) -> NotificationTrigger {
    NotificationTrigger::new(
        TriggerKind::MarketResolution,
        Priority::Critical,
        json!({
            "status": record.status.to_string(),
            "outcome": record.resolution_outcome,
            "probability": record.resolution_probability,
            "resolved_at": record.resolved_at.map(|t| t.unix_timestamp()),
        }),
    )
    .with_condition(&record.condition_id)
}
