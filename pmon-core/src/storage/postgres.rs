use crate::entities::{
    ConditionRecord, GetPositionById, GetPreviousMarketData, MarketDataRecord, PositionRecord,
    TransactionRecord, UpsertCondition, UpsertMarketData, UpsertPosition, UpsertTransaction,
};
use crate::framework::DatabaseProcessor;
use crate::storage::{EventStore, StorageError};
use async_trait::async_trait;
use kanau::processor::Processor;
use sqlx::PgPool;
use time::OffsetDateTime;

/// [`EventStore`] backed by the Postgres tables in `migrations/`.
#[derive(Clone)]
pub struct PgEventStore {
    db: DatabaseProcessor,
}

impl PgEventStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            db: DatabaseProcessor { pool },
        }
    }
}

#[async_trait]
impl EventStore for PgEventStore {
    async fn previous_market_data(
        &self,
        condition_id: &str,
        before: OffsetDateTime,
    ) -> Result<Option<MarketDataRecord>, StorageError> {
        let query = GetPreviousMarketData {
            condition_id: condition_id.to_string(),
            before,
        };
        Ok(self.db.process(query).await?)
    }

    async fn upsert_market_data(&self, record: &MarketDataRecord) -> Result<(), StorageError> {
        let upsert = UpsertMarketData {
            record: record.clone(),
        };
        Ok(self.db.process(upsert).await?)
    }

    async fn upsert_transaction(&self, record: &TransactionRecord) -> Result<(), StorageError> {
        let upsert = UpsertTransaction {
            record: record.clone(),
        };
        Ok(self.db.process(upsert).await?)
    }

    async fn find_position(&self, id: &str) -> Result<Option<PositionRecord>, StorageError> {
        let query = GetPositionById { id: id.to_string() };
        Ok(self.db.process(query).await?)
    }

    async fn upsert_position(&self, record: &PositionRecord) -> Result<(), StorageError> {
        let upsert = UpsertPosition {
            record: record.clone(),
        };
        Ok(self.db.process(upsert).await?)
    }

    async fn upsert_condition(&self, record: &ConditionRecord) -> Result<(), StorageError> {
        let upsert = UpsertCondition {
            record: record.clone(),
        };
        Ok(self.db.process(upsert).await?)
    }
}
