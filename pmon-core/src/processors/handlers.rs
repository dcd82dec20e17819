//! Type handlers: transform, persist, then check thresholds.

use crate::config::ThresholdConfig;
use crate::events::{EventPayload, EventType, ProcessingEvent};
use crate::processors::error::PipelineError;
use crate::processors::thresholds;
use crate::processors::transformers::RecordTransformer;
use crate::storage::EventStore;
use async_trait::async_trait;
use pmon_sdk::objects::NotificationTrigger;
use std::sync::Arc;
use tracing::debug;

/// What a handler gets to work with for one event.
#[derive(Clone)]
pub struct HandlerContext {
    pub store: Arc<dyn EventStore>,
    /// Snapshot taken when the event was dispatched.
    pub thresholds: Arc<ThresholdConfig>,
}

/// Processes one [`EventType`].
#[async_trait]
pub trait EventHandler: Send + Sync {
    fn event_type(&self) -> EventType;

    /// The type matches and the payload for it is present.
    fn can_process(&self, event: &ProcessingEvent) -> bool {
        event.event_type() == self.event_type()
    }

    /// Persist the event's record and return the triggers it caused.
    async fn handle(
        &self,
        event: &ProcessingEvent,
        ctx: &HandlerContext,
    ) -> Result<Vec<NotificationTrigger>, PipelineError>;
}

/// The built-in handler for every event type.
pub fn default_handlers() -> Vec<Arc<dyn EventHandler>> {
    vec![
        Arc::new(PriceUpdateHandler),
        Arc::new(TransactionHandler),
        Arc::new(PositionUpdateHandler),
        Arc::new(ResolutionHandler),
    ]
}

pub struct PriceUpdateHandler;

#[async_trait]
impl EventHandler for PriceUpdateHandler {
    fn event_type(&self) -> EventType {
        EventType::PriceUpdate
    }

    async fn handle(
        &self,
        event: &ProcessingEvent,
        ctx: &HandlerContext,
    ) -> Result<Vec<NotificationTrigger>, PipelineError> {
        let EventPayload::PriceUpdate(raw) = &event.payload else {
            return Ok(Vec::new());
        };
        let record = raw.transform(event.timestamp)?;
        let previous = ctx
            .store
            .previous_market_data(&record.condition_id, record.observed_at)
            .await?;
        ctx.store.upsert_market_data(&record).await?;
        debug!(
            event_id = %event.id,
            condition_id = %record.condition_id,
            price = %record.price,
            cold_start = previous.is_none(),
            "Stored market data"
        );
        Ok(thresholds::price_change_trigger(&record, previous.as_ref(), &ctx.thresholds)
            .into_iter()
            .collect())
    }
}

pub struct TransactionHandler;

#[async_trait]
impl EventHandler for TransactionHandler {
    fn event_type(&self) -> EventType {
        EventType::Transaction
    }

    async fn handle(
        &self,
        event: &ProcessingEvent,
        ctx: &HandlerContext,
    ) -> Result<Vec<NotificationTrigger>, PipelineError> {
        let EventPayload::Transaction(raw) = &event.payload else {
            return Ok(Vec::new());
        };
        let record = raw.transform(event.timestamp)?;
        ctx.store.upsert_transaction(&record).await?;
        debug!(
            event_id = %event.id,
            transaction_id = %record.id,
            value = %record.value,
            "Stored transaction"
        );
        Ok(thresholds::transaction_trigger(&record, &ctx.thresholds)
            .into_iter()
            .collect())
    }
}

pub struct PositionUpdateHandler;

#[async_trait]
impl EventHandler for PositionUpdateHandler {
    fn event_type(&self) -> EventType {
        EventType::PositionUpdate
    }

    async fn handle(
        &self,
        event: &ProcessingEvent,
        ctx: &HandlerContext,
    ) -> Result<Vec<NotificationTrigger>, PipelineError> {
        let EventPayload::PositionUpdate(raw) = &event.payload else {
            return Ok(Vec::new());
        };
        let record = raw.transform(event.timestamp)?;
        let previous_status = ctx
            .store
            .find_position(&record.id)
            .await?
            .map(|existing| existing.status);
        ctx.store.upsert_position(&record).await?;
        debug!(
            event_id = %event.id,
            position_id = %record.id,
            status = %record.status,
            "Stored position"
        );
        Ok(thresholds::position_triggers(
            &record,
            previous_status,
            &ctx.thresholds,
        ))
    }
}

pub struct ResolutionHandler;

#[async_trait]
impl EventHandler for ResolutionHandler {
    fn event_type(&self) -> EventType {
        EventType::Resolution
    }

    async fn handle(
        &self,
        event: &ProcessingEvent,
        ctx: &HandlerContext,
    ) -> Result<Vec<NotificationTrigger>, PipelineError> {
        let EventPayload::Resolution(raw) = &event.payload else {
            return Ok(Vec::new());
        };
        let record = raw.transform(event.timestamp)?;
        ctx.store.upsert_condition(&record).await?;
        debug!(
            event_id = %event.id,
            condition_id = %record.condition_id,
            status = %record.status,
            "Stored condition"
        );
        Ok(vec![thresholds::resolution_trigger(&record)])
    }
}
