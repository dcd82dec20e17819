use crate::entities::{PositionStatus, TradeSide};
use crate::framework::DatabaseProcessor;
use kanau::processor::Processor;
use rust_decimal::Decimal;
use sqlx::types::Json;
use std::collections::BTreeMap;
use time::OffsetDateTime;

/// A user's position in one outcome. Natural key: `id`.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct PositionRecord {
    pub id: String,
    pub user_address: String,
    pub condition_id: String,
    pub outcome: String,
    pub side: TradeSide,
    pub size: Decimal,
    pub avg_price: Decimal,
    pub current_price: Decimal,
    pub unrealized_pnl: Decimal,
    pub realized_pnl: Decimal,
    pub status: PositionStatus,
    /// Payout per outcome once the market settles.
    pub payouts: Json<BTreeMap<String, Decimal>>,
    pub opened_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl PositionRecord {
    /// `None` when the sum is out of range.
    pub fn total_pnl(&self) -> Option<Decimal> {
        self.unrealized_pnl.checked_add(self.realized_pnl)
    }

    /// Owner, market, outcome, side and opening time never change.
    pub fn apply_update(&mut self, newer: &PositionRecord) {
        self.size = newer.size;
        self.avg_price = newer.avg_price;
        self.current_price = newer.current_price;
        self.unrealized_pnl = newer.unrealized_pnl;
        self.realized_pnl = newer.realized_pnl;
        self.status = newer.status;
        self.payouts = newer.payouts.clone();
        self.updated_at = newer.updated_at;
    }
}

#[derive(Debug, Clone)]
/// Insert a position, or overwrite its volatile fields.
pub struct UpsertPosition {
    pub record: PositionRecord,
}

impl Processor<UpsertPosition> for DatabaseProcessor {
    type Output = ();
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:UpsertPosition")]
    async fn process(&self, upsert: UpsertPosition) -> Result<(), sqlx::Error> {
        let record = upsert.record;
        sqlx::query(
            r#"
            INSERT INTO positions
                (id, user_address, condition_id, outcome, side, size, avg_price, current_price,
                 unrealized_pnl, realized_pnl, status, payouts, opened_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            ON CONFLICT (id) DO UPDATE SET
                size = EXCLUDED.size,
                avg_price = EXCLUDED.avg_price,
                current_price = EXCLUDED.current_price,
                unrealized_pnl = EXCLUDED.unrealized_pnl,
                realized_pnl = EXCLUDED.realized_pnl,
                status = EXCLUDED.status,
                payouts = EXCLUDED.payouts,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(record.id)
        .bind(record.user_address)
        .bind(record.condition_id)
        .bind(record.outcome)
        .bind(record.side)
        .bind(record.size)
        .bind(record.avg_price)
        .bind(record.current_price)
        .bind(record.unrealized_pnl)
        .bind(record.realized_pnl)
        .bind(record.status)
        .bind(record.payouts)
        .bind(record.opened_at)
        .bind(record.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct GetPositionById {
    pub id: String,
}

impl Processor<GetPositionById> for DatabaseProcessor {
    type Output = Option<PositionRecord>;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:GetPositionById")]
    async fn process(&self, query: GetPositionById) -> Result<Option<PositionRecord>, sqlx::Error> {
        let position = sqlx::query_as::<_, PositionRecord>(
            r#"
            SELECT id, user_address, condition_id, outcome, side, size, avg_price, current_price,
                   unrealized_pnl, realized_pnl, status, payouts, opened_at, updated_at
            FROM positions
            WHERE id = $1
            "#,
        )
        .bind(query.id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(position)
    }
}
