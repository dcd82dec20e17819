use crate::entities::ConditionStatus;
use crate::framework::DatabaseProcessor;
use kanau::processor::Processor;
use rust_decimal::Decimal;
use time::OffsetDateTime;

/// Resolution state of a market condition. Natural key: `condition_id`.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct ConditionRecord {
    pub condition_id: String,
    pub status: ConditionStatus,
    pub resolved_at: Option<OffsetDateTime>,
    pub resolution_outcome: Option<String>,
    pub resolution_probability: Option<Decimal>,
}

impl ConditionRecord {
    pub fn apply_update(&mut self, newer: &ConditionRecord) {
        self.status = newer.status;
        self.resolved_at = newer.resolved_at;
        self.resolution_outcome = newer.resolution_outcome.clone();
        self.resolution_probability = newer.resolution_probability;
    }
}

#[derive(Debug, Clone)]
pub struct UpsertCondition {
    pub record: ConditionRecord,
}

impl Processor<UpsertCondition> for DatabaseProcessor {
    type Output = ();
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:UpsertCondition")]
    async fn process(&self, upsert: UpsertCondition) -> Result<(), sqlx::Error> {
        let record = upsert.record;
        sqlx::query(
            r#"
            INSERT INTO conditions
                (condition_id, status, resolved_at, resolution_outcome, resolution_probability)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (condition_id) DO UPDATE SET
                status = EXCLUDED.status,
                resolved_at = EXCLUDED.resolved_at,
                resolution_outcome = EXCLUDED.resolution_outcome,
                resolution_probability = EXCLUDED.resolution_probability
            "#,
        )
        .bind(record.condition_id)
        .bind(record.status)
        .bind(record.resolved_at)
        .bind(record.resolution_outcome)
        .bind(record.resolution_probability)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
