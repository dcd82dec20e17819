//! Background tasks of the event core and the order they stop in.
//!
//! Feed producers (adapter, router) watch the server-wide shutdown signal.
//! The pipeline has its own stop signal, sent only once every producer has
//! finished, so events the router flushes on its way out are still drained.

use pmon_core::events::AdapterEventReceiver;
use pmon_core::processors::{AdapterEventRouter, EventPipeline};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, warn};

pub struct EventWorkers {
    feed_tasks: Vec<JoinHandle<()>>,
    router_task: JoinHandle<()>,
    pipeline_task: JoinHandle<()>,
    pipeline_stop_tx: watch::Sender<bool>,
}

impl EventWorkers {
    /// Spawn the pipeline and the router feeding it from `adapter_rx`.
    pub fn spawn(
        pipeline: EventPipeline,
        adapter_rx: AdapterEventReceiver,
        shutdown_rx: watch::Receiver<bool>,
    ) -> Self {
        let (pipeline_stop_tx, pipeline_stop_rx) = watch::channel(false);
        let pipeline_task = tokio::spawn(pipeline.clone().run(pipeline_stop_rx));
        let router_task = tokio::spawn(AdapterEventRouter::new(pipeline, adapter_rx).run(shutdown_rx));
        Self {
            feed_tasks: Vec::new(),
            router_task,
            pipeline_task,
            pipeline_stop_tx,
        }
    }

    /// Track a task that sends into the router's channel.
    pub fn add_feed_task(&mut self, task: JoinHandle<()>) {
        self.feed_tasks.push(task);
    }

    /// Wait for the producers to stop, then stop the pipeline and wait for
    /// its drain. Call after the shutdown signal was sent.
    pub async fn join(self) {
        for task in self.feed_tasks {
            if let Err(e) = task.await {
                warn!(error = %e, "Feed task ended abnormally");
            }
        }
        if let Err(e) = self.router_task.await {
            warn!(error = %e, "AdapterEventRouter ended abnormally");
        }

        info!("Producers stopped, draining the pipeline");
        let _ = self.pipeline_stop_tx.send(true);
        if let Err(e) = self.pipeline_task.await {
            warn!(error = %e, "EventPipeline ended abnormally");
        }
    }
}
