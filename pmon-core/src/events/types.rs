//! Event type definitions.
//!
//! A [`ProcessingEvent`] is the unit of work of the pipeline. Its payload
//! is a sum type keyed by [`EventType`], so a handler never has to check
//! which payload field is populated.

use pmon_sdk::objects::{
    ActivityTrade, ConditionResolution, MarketPriceChange, NotificationTrigger, Priority,
    UserPosition,
};
use serde::Serialize;
use std::time::Duration;
use time::OffsetDateTime;
use uuid::Uuid;

/// Kind of work carried by an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventType {
    PriceUpdate,
    Transaction,
    PositionUpdate,
    Resolution,
}

impl EventType {
    /// Scheduling rank used when an event has no explicit priority.
    pub fn default_priority(&self) -> u8 {
        match self {
            EventType::PriceUpdate => 1,
            EventType::Transaction => 2,
            EventType::PositionUpdate => 3,
            EventType::Resolution => 4,
        }
    }
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventType::PriceUpdate => write!(f, "PRICE_UPDATE"),
            EventType::Transaction => write!(f, "TRANSACTION"),
            EventType::PositionUpdate => write!(f, "POSITION_UPDATE"),
            EventType::Resolution => write!(f, "RESOLUTION"),
        }
    }
}

/// Raw provider payload of an event.
#[derive(Debug, Clone, PartialEq)]
pub enum EventPayload {
    PriceUpdate(MarketPriceChange),
    Transaction(ActivityTrade),
    PositionUpdate(UserPosition),
    Resolution(ConditionResolution),
}

impl EventPayload {
    pub fn event_type(&self) -> EventType {
        match self {
            EventPayload::PriceUpdate(_) => EventType::PriceUpdate,
            EventPayload::Transaction(_) => EventType::Transaction,
            EventPayload::PositionUpdate(_) => EventType::PositionUpdate,
            EventPayload::Resolution(_) => EventType::Resolution,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EventStatus {
    Pending,
    Completed,
    Failed,
}

/// Where an event entered the system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EventSource {
    Websocket,
    Manual,
    Scheduled,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EventMetadata {
    pub source: EventSource,
    /// Overrides the type-based scheduling priority when set.
    pub priority: Option<Priority>,
}

/// The unit of work flowing through the pipeline.
///
/// Lifecycle: `Pending` on creation, then `Completed` or `Failed` after
/// one processing attempt. A failed, retryable event is re-enqueued as a
/// copy with `retry_count + 1`; the failed instance itself is never
/// processed again.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessingEvent {
    pub id: Uuid,
    pub payload: EventPayload,
    /// Arrival time.
    pub timestamp: OffsetDateTime,
    /// Completion time of the last attempt.
    pub processed_at: Option<OffsetDateTime>,
    /// Duration of the last attempt.
    pub processing_time: Option<Duration>,
    pub status: EventStatus,
    pub retry_count: u32,
    /// Last failure message.
    pub error: Option<String>,
    pub metadata: EventMetadata,
}

impl ProcessingEvent {
    pub fn new(payload: EventPayload, source: EventSource) -> Self {
        Self {
            id: Uuid::now_v7(),
            payload,
            timestamp: OffsetDateTime::now_utc(),
            processed_at: None,
            processing_time: None,
            status: EventStatus::Pending,
            retry_count: 0,
            error: None,
            metadata: EventMetadata {
                source,
                priority: None,
            },
        }
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.metadata.priority = Some(priority);
        self
    }

    pub fn event_type(&self) -> EventType {
        self.payload.event_type()
    }

    /// Explicit priority if any, otherwise the type default.
    pub fn priority_rank(&self) -> u8 {
        self.metadata
            .priority
            .map(|p| p.rank())
            .unwrap_or_else(|| self.event_type().default_priority())
    }

    /// Fill in whatever a caller left unset before the event is queued.
    pub(crate) fn prepare_for_queue(&mut self) {
        if self.id.is_nil() {
            self.id = Uuid::now_v7();
        }
        self.status = EventStatus::Pending;
        self.processed_at = None;
        self.processing_time = None;
    }

    /// The copy scheduled after a retryable failure.
    ///
    /// Keeps id, payload, arrival time and the last error so a retry chain
    /// can be followed in the logs.
    pub fn retry_copy(&self) -> Self {
        Self {
            id: self.id,
            payload: self.payload.clone(),
            timestamp: self.timestamp,
            processed_at: None,
            processing_time: None,
            status: EventStatus::Pending,
            retry_count: self.retry_count + 1,
            error: self.error.clone(),
            metadata: self.metadata.clone(),
        }
    }
}

/// Lifecycle notifications emitted by the ingestion adapter.
#[derive(Debug, Clone)]
pub enum AdapterEvent {
    Connected,
    Disconnected,
    /// A feed message normalized into a pipeline event.
    Message(ProcessingEvent),
    Error(String),
    /// Reconnection gave up; operator intervention is required.
    MaxReconnectAttemptsReached,
}

/// Observable pipeline activity, fanned out on a broadcast channel.
#[derive(Debug, Clone)]
pub enum PipelineEvent {
    Enqueued {
        event_id: Uuid,
        queue_size: usize,
    },
    Dequeued {
        count: usize,
        queue_size: usize,
    },
    BatchProcessed {
        size: usize,
        completed: usize,
        failed: usize,
        duration: Duration,
    },
    RetryScheduled {
        event_id: Uuid,
        retry_count: u32,
        delay: Duration,
    },
    EventDropped {
        event_id: Uuid,
        event_type: EventType,
        retry_count: u32,
        error: String,
    },
    TriggerEmitted(NotificationTrigger),
}
