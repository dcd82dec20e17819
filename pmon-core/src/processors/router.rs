//! AdapterEventRouter processor.
//!
//! Moves `AdapterEvent::Message` events from the ingestion adapter into the
//! pipeline queue and logs the adapter's lifecycle events.

use crate::events::{AdapterEvent, AdapterEventReceiver};
use crate::processors::error::PipelineError;
use crate::processors::pipeline::EventPipeline;
use tokio::sync::watch;
use tracing::{error, info, warn};

pub struct AdapterEventRouter {
    pipeline: EventPipeline,
    event_rx: AdapterEventReceiver,
}

impl AdapterEventRouter {
    pub fn new(pipeline: EventPipeline, event_rx: AdapterEventReceiver) -> Self {
        Self { pipeline, event_rx }
    }

    /// Route adapter events until shutdown or until the adapter is gone.
    ///
    /// On shutdown, events already buffered in the channel are still
    /// enqueued so the pipeline's drain sees them.
    pub async fn run(mut self, mut shutdown_rx: watch::Receiver<bool>) {
        info!("AdapterEventRouter started");

        loop {
            tokio::select! {
                biased;

                changed = shutdown_rx.changed() => {
                    if changed.is_err() || *shutdown_rx.borrow() {
                        info!("AdapterEventRouter received shutdown signal");
                        break;
                    }
                }

                event = self.event_rx.recv() => {
                    match event {
                        Some(event) => self.route(event).await,
                        None => {
                            info!("Adapter event channel closed");
                            break;
                        }
                    }
                }
            }
        }

        while let Ok(event) = self.event_rx.try_recv() {
            self.route(event).await;
        }
        info!("AdapterEventRouter shutdown complete");
    }

    async fn route(&self, event: AdapterEvent) {
        match event {
            AdapterEvent::Message(event) => {
                let event_id = event.id;
                let event_type = event.event_type();
                match self.pipeline.enqueue(event).await {
                    Ok(_) => {}
                    Err(PipelineError::QueueFull { capacity }) => {
                        warn!(
                            event_id = %event_id,
                            event_type = %event_type,
                            capacity,
                            "Event queue full, dropping feed event"
                        );
                    }
                    Err(e) => {
                        warn!(event_id = %event_id, error = %e, "Failed to enqueue feed event");
                    }
                }
            }
            AdapterEvent::Connected => info!("Feed connected"),
            AdapterEvent::Disconnected => warn!("Feed disconnected"),
            AdapterEvent::Error(message) => warn!(error = %message, "Feed error"),
            AdapterEvent::MaxReconnectAttemptsReached => {
                error!("Feed reconnection abandoned, no further events will arrive");
            }
        }
    }
}
