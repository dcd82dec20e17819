//! Event system of the ingestion pipeline.
//!
//! # Event Flow
//!
//! 1. The ingestion adapter turns feed messages into `ProcessingEvent`s and
//!    emits them as `AdapterEvent::Message`
//! 2. The adapter event router enqueues them into the `EventPipeline`
//! 3. The pipeline persists the normalized records and emits
//!    `NotificationTrigger`s for the delivery subsystem
//! 4. Pipeline activity is observable as `PipelineEvent`s

pub mod channels;
pub mod types;

pub use channels::{
    AdapterEventReceiver, AdapterEventSender, DEFAULT_CHANNEL_BUFFER, NotificationTriggerReceiver,
    NotificationTriggerSender, adapter_event_channel, notification_trigger_channel,
    pipeline_event_broadcast,
};

pub use types::{
    AdapterEvent, EventMetadata, EventPayload, EventSource, EventStatus, EventType, PipelineEvent,
    ProcessingEvent,
};
