use crate::framework::DatabaseProcessor;
use kanau::processor::Processor;
use rust_decimal::Decimal;
use time::OffsetDateTime;

/// A market price reading. Natural key: `(condition_id, observed_at)`.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct MarketDataRecord {
    pub condition_id: String,
    pub observed_at: OffsetDateTime,
    pub price: Decimal,
    pub probability: Decimal,
    pub volume_24h: Decimal,
    pub price_change_24h: Decimal,
    pub liquidity: Decimal,
}

impl MarketDataRecord {
    /// Every non-key field of a reading is volatile.
    pub fn apply_update(&mut self, newer: &MarketDataRecord) {
        self.price = newer.price;
        self.probability = newer.probability;
        self.volume_24h = newer.volume_24h;
        self.price_change_24h = newer.price_change_24h;
        self.liquidity = newer.liquidity;
    }
}

#[derive(Debug, Clone)]
/// Insert a reading, or overwrite the volatile fields of the reading with
/// the same `(condition_id, observed_at)`.
pub struct UpsertMarketData {
    pub record: MarketDataRecord,
}

impl Processor<UpsertMarketData> for DatabaseProcessor {
    type Output = ();
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:UpsertMarketData")]
    async fn process(&self, upsert: UpsertMarketData) -> Result<(), sqlx::Error> {
        let record = upsert.record;
        sqlx::query(
            r#"
            INSERT INTO market_data
                (condition_id, observed_at, price, probability, volume_24h, price_change_24h, liquidity)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (condition_id, observed_at) DO UPDATE SET
                price = EXCLUDED.price,
                probability = EXCLUDED.probability,
                volume_24h = EXCLUDED.volume_24h,
                price_change_24h = EXCLUDED.price_change_24h,
                liquidity = EXCLUDED.liquidity
            "#,
        )
        .bind(record.condition_id)
        .bind(record.observed_at)
        .bind(record.price)
        .bind(record.probability)
        .bind(record.volume_24h)
        .bind(record.price_change_24h)
        .bind(record.liquidity)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[derive(Debug, Clone)]
/// The latest reading for `condition_id` strictly older than `before`.
pub struct GetPreviousMarketData {
    pub condition_id: String,
    pub before: OffsetDateTime,
}

impl Processor<GetPreviousMarketData> for DatabaseProcessor {
    type Output = Option<MarketDataRecord>;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:GetPreviousMarketData")]
    async fn process(
        &self,
        query: GetPreviousMarketData,
    ) -> Result<Option<MarketDataRecord>, sqlx::Error> {
        let previous = sqlx::query_as::<_, MarketDataRecord>(
            r#"
            SELECT condition_id, observed_at, price, probability, volume_24h, price_change_24h, liquidity
            FROM market_data
            WHERE condition_id = $1 AND observed_at < $2
            ORDER BY observed_at DESC
            LIMIT 1
            "#,
        )
        .bind(query.condition_id)
        .bind(query.before)
        .fetch_optional(&self.pool)
        .await?;
        Ok(previous)
    }
}
