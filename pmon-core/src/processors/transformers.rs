//! Raw provider payloads to normalized records.
//!
//! Each transform validates the fields a record cannot exist without
//! before building it. Missing optional numbers default to zero; a missing
//! timestamp falls back to the event's arrival time.

use crate::entities::{
    ConditionRecord, ConditionStatus, MarketDataRecord, PositionRecord, PositionStatus, RecordKind,
    TradeSide, TransactionRecord,
};
use crate::processors::error::TransformValidationError;
use pmon_sdk::objects::{ActivityTrade, ConditionResolution, MarketPriceChange, UserPosition};
use rust_decimal::Decimal;
use sqlx::types::Json;
use time::OffsetDateTime;

/// Provider timestamps below this are unix seconds, the rest milliseconds.
const MILLISECOND_TIMESTAMP_FLOOR: i64 = 1_000_000_000_000;

/// A raw payload that normalizes into one record kind.
pub trait RecordTransformer {
    type Record;

    const KIND: RecordKind;

    /// Check required fields and value ranges.
    fn validate(&self) -> Result<(), TransformValidationError>;

    /// Build the record. Only meaningful after [`validate`](Self::validate)
    /// passed, so [`transform`](Self::transform) is the usual entry point.
    fn normalize(&self, received_at: OffsetDateTime) -> Result<Self::Record, TransformValidationError>;

    fn transform(&self, received_at: OffsetDateTime) -> Result<Self::Record, TransformValidationError> {
        self.validate()?;
        self.normalize(received_at)
    }
}

fn required<'a, T>(
    kind: RecordKind,
    field: &'static str,
    value: &'a Option<T>,
) -> Result<&'a T, TransformValidationError> {
    value
        .as_ref()
        .ok_or(TransformValidationError::MissingField { kind, field })
}

fn required_str<'a>(
    kind: RecordKind,
    field: &'static str,
    value: &'a Option<String>,
) -> Result<&'a str, TransformValidationError> {
    match value.as_deref().map(str::trim) {
        Some(s) if !s.is_empty() => Ok(s),
        _ => Err(TransformValidationError::MissingField { kind, field }),
    }
}

fn non_negative(
    kind: RecordKind,
    field: &'static str,
    value: Option<Decimal>,
) -> Result<(), TransformValidationError> {
    match value {
        Some(v) if v.is_sign_negative() && !v.is_zero() => Err(TransformValidationError::InvalidField {
            kind,
            field,
            reason: format!("{v} is negative"),
        }),
        _ => Ok(()),
    }
}

/// Accept unix seconds or milliseconds, the provider sends both.
pub fn provider_timestamp(
    kind: RecordKind,
    field: &'static str,
    value: i64,
) -> Result<OffsetDateTime, TransformValidationError> {
    let nanos = if value.abs() < MILLISECOND_TIMESTAMP_FLOOR {
        i128::from(value) * 1_000_000_000
    } else {
        i128::from(value) * 1_000_000
    };
    OffsetDateTime::from_unix_timestamp_nanos(nanos).map_err(|e| TransformValidationError::InvalidField {
        kind,
        field,
        reason: e.to_string(),
    })
}

fn timestamp_or(
    kind: RecordKind,
    field: &'static str,
    value: Option<i64>,
    fallback: OffsetDateTime,
) -> Result<OffsetDateTime, TransformValidationError> {
    value.map_or(Ok(fallback), |v| provider_timestamp(kind, field, v))
}

impl RecordTransformer for MarketPriceChange {
    type Record = MarketDataRecord;
    const KIND: RecordKind = RecordKind::MarketData;

    fn validate(&self) -> Result<(), TransformValidationError> {
        required_str(Self::KIND, "conditionId", &self.condition_id)?;
        required(Self::KIND, "price", &self.price)?;
        non_negative(Self::KIND, "price", self.price)?;
        non_negative(Self::KIND, "probability", self.probability)?;
        Ok(())
    }

    fn normalize(&self, received_at: OffsetDateTime) -> Result<MarketDataRecord, TransformValidationError> {
        let price = *required(Self::KIND, "price", &self.price)?;
        Ok(MarketDataRecord {
            condition_id: required_str(Self::KIND, "conditionId", &self.condition_id)?.to_string(),
            observed_at: timestamp_or(Self::KIND, "timestamp", self.timestamp, received_at)?,
            price,
            probability: self.probability.unwrap_or(price),
            volume_24h: self.volume_24h.unwrap_or_default(),
            price_change_24h: self.price_change_24h.unwrap_or_default(),
            liquidity: self.liquidity.unwrap_or_default(),
        })
    }
}

impl RecordTransformer for ActivityTrade {
    type Record = TransactionRecord;
    const KIND: RecordKind = RecordKind::Transaction;

    fn validate(&self) -> Result<(), TransformValidationError> {
        if required_str(Self::KIND, "id", &self.id).is_err() {
            required_str(Self::KIND, "transactionHash", &self.transaction_hash)?;
        }
        required_str(Self::KIND, "proxyWallet", &self.proxy_wallet)?;
        required_str(Self::KIND, "conditionId", &self.condition_id)?;
        let side = required_str(Self::KIND, "side", &self.side)?;
        if TradeSide::parse(side).is_none() {
            return Err(TransformValidationError::InvalidField {
                kind: Self::KIND,
                field: "side",
                reason: format!("unknown side {side:?}"),
            });
        }
        required(Self::KIND, "size", &self.size)?;
        required(Self::KIND, "price", &self.price)?;
        non_negative(Self::KIND, "size", self.size)?;
        non_negative(Self::KIND, "price", self.price)?;
        non_negative(Self::KIND, "fee", self.fee)?;
        Ok(())
    }

    fn normalize(&self, received_at: OffsetDateTime) -> Result<TransactionRecord, TransformValidationError> {
        let id = required_str(Self::KIND, "id", &self.id)
            .or_else(|_| required_str(Self::KIND, "transactionHash", &self.transaction_hash))?;
        let side = required_str(Self::KIND, "side", &self.side)?;
        let side = TradeSide::parse(side).ok_or_else(|| TransformValidationError::InvalidField {
            kind: Self::KIND,
            field: "side",
            reason: format!("unknown side {side:?}"),
        })?;
        let amount = *required(Self::KIND, "size", &self.size)?;
        let price = *required(Self::KIND, "price", &self.price)?;
        let value = amount
            .checked_mul(price)
            .ok_or_else(|| TransformValidationError::InvalidField {
                kind: Self::KIND,
                field: "size",
                reason: format!("{amount} x {price} is out of range"),
            })?;

        Ok(TransactionRecord {
            id: id.to_string(),
            user_address: required_str(Self::KIND, "proxyWallet", &self.proxy_wallet)?.to_string(),
            side,
            condition_id: required_str(Self::KIND, "conditionId", &self.condition_id)?.to_string(),
            outcome: self.outcome.clone().unwrap_or_default(),
            amount,
            price,
            value,
            fee: self.fee.unwrap_or_default(),
            chain: serde_json::json!({
                "transaction_hash": self.transaction_hash,
                "asset": self.asset,
                "title": self.title,
                "slug": self.slug,
                "event_slug": self.event_slug,
            }),
            executed_at: timestamp_or(Self::KIND, "timestamp", self.timestamp, received_at)?,
        })
    }
}

impl RecordTransformer for UserPosition {
    type Record = PositionRecord;
    const KIND: RecordKind = RecordKind::Position;

    fn validate(&self) -> Result<(), TransformValidationError> {
        required_str(Self::KIND, "user", &self.user)?;
        required_str(Self::KIND, "conditionId", &self.condition_id)?;
        if let Some(side) = self.side.as_deref() {
            if TradeSide::parse(side).is_none() {
                return Err(TransformValidationError::InvalidField {
                    kind: Self::KIND,
                    field: "side",
                    reason: format!("unknown side {side:?}"),
                });
            }
        }
        if let Some(status) = self.status.as_deref() {
            if PositionStatus::parse(status).is_none() {
                return Err(TransformValidationError::InvalidField {
                    kind: Self::KIND,
                    field: "status",
                    reason: format!("unknown status {status:?}"),
                });
            }
        }
        non_negative(Self::KIND, "size", self.size)?;
        non_negative(Self::KIND, "avgPrice", self.avg_price)?;
        Ok(())
    }

    fn normalize(&self, received_at: OffsetDateTime) -> Result<PositionRecord, TransformValidationError> {
        let user = required_str(Self::KIND, "user", &self.user)?;
        let condition_id = required_str(Self::KIND, "conditionId", &self.condition_id)?;
        let outcome = self.outcome.clone().unwrap_or_default();
        // Positions without a provider id are keyed by owner and outcome.
        let id = match self.id.as_deref().map(str::trim) {
            Some(id) if !id.is_empty() => id.to_string(),
            _ => format!("{user}:{condition_id}:{outcome}"),
        };
        let avg_price = self.avg_price.unwrap_or_default();

        Ok(PositionRecord {
            id,
            user_address: user.to_string(),
            condition_id: condition_id.to_string(),
            outcome,
            side: self
                .side
                .as_deref()
                .and_then(TradeSide::parse)
                .unwrap_or(TradeSide::Buy),
            size: self.size.unwrap_or_default(),
            avg_price,
            current_price: self.current_price.unwrap_or(avg_price),
            unrealized_pnl: self.unrealized_pnl.unwrap_or_default(),
            realized_pnl: self.realized_pnl.unwrap_or_default(),
            status: self
                .status
                .as_deref()
                .and_then(PositionStatus::parse)
                .unwrap_or(PositionStatus::Open),
            payouts: Json(self.payouts.clone()),
            opened_at: timestamp_or(Self::KIND, "createdAt", self.created_at, received_at)?,
            updated_at: timestamp_or(Self::KIND, "timestamp", self.timestamp, received_at)?,
        })
    }
}

impl RecordTransformer for ConditionResolution {
    type Record = ConditionRecord;
    const KIND: RecordKind = RecordKind::Condition;

    fn validate(&self) -> Result<(), TransformValidationError> {
        required_str(Self::KIND, "conditionId", &self.condition_id)?;
        if let Some(status) = self.status.as_deref() {
            if ConditionStatus::parse(status).is_none() {
                return Err(TransformValidationError::InvalidField {
                    kind: Self::KIND,
                    field: "status",
                    reason: format!("unknown status {status:?}"),
                });
            }
        }
        non_negative(Self::KIND, "probability", self.probability)?;
        Ok(())
    }

    fn normalize(&self, received_at: OffsetDateTime) -> Result<ConditionRecord, TransformValidationError> {
        // A resolution message without an explicit status means resolved.
        let status = self
            .status
            .as_deref()
            .and_then(ConditionStatus::parse)
            .unwrap_or(ConditionStatus::Resolved);
        let resolved_at = match status {
            ConditionStatus::Active => None,
            ConditionStatus::Resolved | ConditionStatus::Cancelled => Some(timestamp_or(
                Self::KIND,
                "resolvedAt",
                self.resolved_at,
                received_at,
            )?),
        };

        Ok(ConditionRecord {
            condition_id: required_str(Self::KIND, "conditionId", &self.condition_id)?.to_string(),
            status,
            resolved_at,
            resolution_outcome: self.outcome.clone(),
            resolution_probability: self.probability,
        })
    }
}
