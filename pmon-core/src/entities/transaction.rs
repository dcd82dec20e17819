use crate::entities::TradeSide;
use crate::framework::DatabaseProcessor;
use kanau::processor::Processor;
use rust_decimal::Decimal;
use time::OffsetDateTime;

/// A trade. Natural key: `id`.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct TransactionRecord {
    pub id: String,
    pub user_address: String,
    pub side: TradeSide,
    pub condition_id: String,
    pub outcome: String,
    pub amount: Decimal,
    pub price: Decimal,
    /// `amount × price`.
    pub value: Decimal,
    pub fee: Decimal,
    /// Chain metadata (transaction hash, asset id, market slug, ...).
    pub chain: serde_json::Value,
    pub executed_at: OffsetDateTime,
}

impl TransactionRecord {
    /// Identity (user, side, market, outcome, amount, time) is fixed at
    /// first write; price-derived fields and chain metadata may be revised.
    pub fn apply_update(&mut self, newer: &TransactionRecord) {
        self.price = newer.price;
        self.value = newer.value;
        self.fee = newer.fee;
        self.chain = newer.chain.clone();
    }
}

#[derive(Debug, Clone)]
/// Insert a trade, or revise the price-derived fields of a known one.
pub struct UpsertTransaction {
    pub record: TransactionRecord,
}

impl Processor<UpsertTransaction> for DatabaseProcessor {
    type Output = ();
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:UpsertTransaction")]
    async fn process(&self, upsert: UpsertTransaction) -> Result<(), sqlx::Error> {
        let record = upsert.record;
        sqlx::query(
            r#"
            INSERT INTO transactions
                (id, user_address, side, condition_id, outcome, amount, price, value, fee, chain, executed_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            ON CONFLICT (id) DO UPDATE SET
                price = EXCLUDED.price,
                value = EXCLUDED.value,
                fee = EXCLUDED.fee,
                chain = EXCLUDED.chain
            "#,
        )
        .bind(record.id)
        .bind(record.user_address)
        .bind(record.side)
        .bind(record.condition_id)
        .bind(record.outcome)
        .bind(record.amount)
        .bind(record.price)
        .bind(record.value)
        .bind(record.fee)
        .bind(record.chain)
        .bind(record.executed_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
