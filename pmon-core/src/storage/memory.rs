use crate::entities::{ConditionRecord, MarketDataRecord, PositionRecord, TransactionRecord};
use crate::storage::{EventStore, StorageError};
use async_trait::async_trait;
use std::collections::hash_map::Entry;
use std::collections::{BTreeMap, HashMap};
use time::OffsetDateTime;
use tokio::sync::RwLock;

/// In-process [`EventStore`] with the same merge rules as the SQL upserts.
#[derive(Default)]
pub struct MemoryEventStore {
    market_data: RwLock<HashMap<String, BTreeMap<OffsetDateTime, MarketDataRecord>>>,
    transactions: RwLock<HashMap<String, TransactionRecord>>,
    positions: RwLock<HashMap<String, PositionRecord>>,
    conditions: RwLock<HashMap<String, ConditionRecord>>,
}

impl MemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// All readings for a condition, oldest first.
    pub async fn market_data_for(&self, condition_id: &str) -> Vec<MarketDataRecord> {
        self.market_data
            .read()
            .await
            .get(condition_id)
            .map(|readings| readings.values().cloned().collect())
            .unwrap_or_default()
    }

    pub async fn transaction(&self, id: &str) -> Option<TransactionRecord> {
        self.transactions.read().await.get(id).cloned()
    }

    pub async fn transaction_count(&self) -> usize {
        self.transactions.read().await.len()
    }

    pub async fn position(&self, id: &str) -> Option<PositionRecord> {
        self.positions.read().await.get(id).cloned()
    }

    pub async fn condition(&self, condition_id: &str) -> Option<ConditionRecord> {
        self.conditions.read().await.get(condition_id).cloned()
    }
}

fn upsert_keyed<T: Clone>(map: &mut HashMap<String, T>, key: &str, record: &T, merge: fn(&mut T, &T)) {
    match map.entry(key.to_string()) {
        Entry::Occupied(mut existing) => merge(existing.get_mut(), record),
        Entry::Vacant(slot) => {
            slot.insert(record.clone());
        }
    }
}

#[async_trait]
impl EventStore for MemoryEventStore {
    async fn previous_market_data(
        &self,
        condition_id: &str,
        before: OffsetDateTime,
    ) -> Result<Option<MarketDataRecord>, StorageError> {
        let guard = self.market_data.read().await;
        Ok(guard
            .get(condition_id)
            .and_then(|readings| readings.range(..before).next_back())
            .map(|(_, record)| record.clone()))
    }

    async fn upsert_market_data(&self, record: &MarketDataRecord) -> Result<(), StorageError> {
        let mut guard = self.market_data.write().await;
        let readings = guard.entry(record.condition_id.clone()).or_default();
        match readings.get_mut(&record.observed_at) {
            Some(existing) => existing.apply_update(record),
            None => {
                readings.insert(record.observed_at, record.clone());
            }
        }
        Ok(())
    }

    async fn upsert_transaction(&self, record: &TransactionRecord) -> Result<(), StorageError> {
        let mut guard = self.transactions.write().await;
        upsert_keyed(&mut guard, &record.id, record, TransactionRecord::apply_update);
        Ok(())
    }

    async fn find_position(&self, id: &str) -> Result<Option<PositionRecord>, StorageError> {
        Ok(self.position(id).await)
    }

    async fn upsert_position(&self, record: &PositionRecord) -> Result<(), StorageError> {
        let mut guard = self.positions.write().await;
        upsert_keyed(&mut guard, &record.id, record, PositionRecord::apply_update);
        Ok(())
    }

    async fn upsert_condition(&self, record: &ConditionRecord) -> Result<(), StorageError> {
        let mut guard = self.conditions.write().await;
        upsert_keyed(&mut guard, &record.condition_id, record, ConditionRecord::apply_update);
        Ok(())
    }
}
