//! Event channel factories and handles.

use super::types::{AdapterEvent, PipelineEvent};
use pmon_sdk::objects::NotificationTrigger;
use tokio::sync::{broadcast, mpsc};

/// Default buffer size for event channels.
///
/// Enough to absorb bursts while keeping memory bounded.
pub const DEFAULT_CHANNEL_BUFFER: usize = 256;

/// Sender handle for adapter lifecycle and message events.
pub type AdapterEventSender = mpsc::Sender<AdapterEvent>;
/// Receiver handle for adapter lifecycle and message events.
pub type AdapterEventReceiver = mpsc::Receiver<AdapterEvent>;

/// Sender handle for notification triggers.
pub type NotificationTriggerSender = mpsc::Sender<NotificationTrigger>;
/// Receiver handle for notification triggers.
pub type NotificationTriggerReceiver = mpsc::Receiver<NotificationTrigger>;

/// Create a new adapter event channel.
pub fn adapter_event_channel() -> (AdapterEventSender, AdapterEventReceiver) {
    mpsc::channel(DEFAULT_CHANNEL_BUFFER)
}

/// Create a new notification trigger channel.
///
/// The receiver belongs to the delivery subsystem.
pub fn notification_trigger_channel() -> (NotificationTriggerSender, NotificationTriggerReceiver) {
    mpsc::channel(DEFAULT_CHANNEL_BUFFER)
}

/// Create the broadcast sender for pipeline activity.
///
/// Slow observers lag and lose old entries rather than stalling the
/// pipeline.
pub fn pipeline_event_broadcast() -> broadcast::Sender<PipelineEvent> {
    let (tx, _) = broadcast::channel(DEFAULT_CHANNEL_BUFFER);
    tx
}
