//! EventPipeline processor.
//!
//! The EventPipeline is responsible for:
//! - Buffering events in a bounded queue (`enqueue` fails once it is full)
//! - Draining batches on a timer, one batch at a time
//! - Dispatching every event of a batch concurrently, highest priority first
//! - Persisting records and emitting `NotificationTrigger`s through the type handlers
//! - Retrying transient failures with exponential backoff
//! - Publishing `MetricsSnapshot`s and `PipelineEvent`s
//!
//! The pipeline is a cheap handle; clones share the same queue.

use crate::config::{ConfigStore, PipelineConfig, RetryConfig, ThresholdConfig};
use crate::events::{
    EventStatus, EventType, NotificationTriggerSender, PipelineEvent, ProcessingEvent,
    pipeline_event_broadcast,
};
use crate::processors::error::PipelineError;
use crate::processors::handlers::{EventHandler, HandlerContext, default_handlers};
use crate::processors::metrics::{MetricsSnapshot, PipelineMetrics};
use crate::processors::queue::EventQueue;
use crate::processors::retry::RetryPolicy;
use crate::storage::EventStore;
use pmon_sdk::objects::NotificationTrigger;
use std::cmp::Reverse;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::{Mutex, RwLock, broadcast, watch};
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

/// Result of one `process_batch` call.
#[derive(Debug, Clone, PartialEq)]
pub enum BatchOutcome {
    /// Another batch is still settling.
    Busy,
    /// Nothing was queued.
    Empty,
    Processed(BatchReport),
}

#[derive(Debug, Clone, PartialEq)]
pub struct BatchReport {
    pub size: usize,
    pub completed: usize,
    pub failed: usize,
    pub duration: Duration,
}

/// Clears the batch flag when the batch ends, even if it is cancelled.
struct BatchGuard<'a>(&'a AtomicBool);

impl Drop for BatchGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

struct Inner {
    config: PipelineConfig,
    retry: RetryPolicy,
    thresholds: ConfigStore<ThresholdConfig>,
    store: Arc<dyn EventStore>,
    queue: Mutex<EventQueue>,
    handlers: RwLock<HashMap<EventType, Arc<dyn EventHandler>>>,
    processing: AtomicBool,
    pending_retries: AtomicUsize,
    metrics: PipelineMetrics,
    metrics_tx: watch::Sender<MetricsSnapshot>,
    events_tx: broadcast::Sender<PipelineEvent>,
    trigger_tx: NotificationTriggerSender,
}

/// Bounded, batch-draining event processor.
#[derive(Clone)]
pub struct EventPipeline {
    inner: Arc<Inner>,
}

impl EventPipeline {
    /// Create a new EventPipeline with the built-in handlers.
    ///
    /// # Arguments
    ///
    /// * `config` - Queue and scheduling parameters
    /// * `retry` - Backoff shape for transient failures
    /// * `thresholds` - Trigger thresholds, read per batch so reloads apply
    /// * `store` - Persistence for normalized records
    /// * `trigger_tx` - Sender for derived notification triggers
    pub fn new(
        config: PipelineConfig,
        retry: RetryConfig,
        thresholds: ConfigStore<ThresholdConfig>,
        store: Arc<dyn EventStore>,
        trigger_tx: NotificationTriggerSender,
    ) -> Self {
        let handlers = default_handlers()
            .into_iter()
            .map(|handler| (handler.event_type(), handler))
            .collect();
        let (metrics_tx, _) = watch::channel(MetricsSnapshot::default());

        Self {
            inner: Arc::new(Inner {
                queue: Mutex::new(EventQueue::new(config.buffer_size)),
                metrics: PipelineMetrics::new(config.throughput_window),
                config,
                retry: RetryPolicy::new(retry),
                thresholds,
                store,
                handlers: RwLock::new(handlers),
                processing: AtomicBool::new(false),
                pending_retries: AtomicUsize::new(0),
                metrics_tx,
                events_tx: pipeline_event_broadcast(),
                trigger_tx,
            }),
        }
    }

    /// Replace the handler for its event type.
    pub async fn register_handler(&self, handler: Arc<dyn EventHandler>) {
        let event_type = handler.event_type();
        self.inner.handlers.write().await.insert(event_type, handler);
        debug!(event_type = %event_type, "Registered event handler");
    }

    /// Queue an event, returning the new queue size.
    ///
    /// Fails with [`PipelineError::QueueFull`] instead of waiting when the
    /// queue is at capacity.
    pub async fn enqueue(&self, mut event: ProcessingEvent) -> Result<usize, PipelineError> {
        event.prepare_for_queue();
        let event_id = event.id;
        let event_type = event.event_type();
        let queue_size = self.inner.queue.lock().await.push(event)?;
        debug!(event_id = %event_id, event_type = %event_type, queue_size, "Enqueued event");
        self.publish(PipelineEvent::Enqueued {
            event_id,
            queue_size,
        });
        Ok(queue_size)
    }

    /// Pop the oldest event.
    pub async fn dequeue(&self) -> Option<ProcessingEvent> {
        let (event, queue_size) = {
            let mut queue = self.inner.queue.lock().await;
            (queue.pop(), queue.len())
        };
        if event.is_some() {
            self.publish(PipelineEvent::Dequeued {
                count: 1,
                queue_size,
            });
        }
        event
    }

    pub async fn size(&self) -> usize {
        self.inner.queue.lock().await.len()
    }

    pub async fn peek(&self) -> Option<ProcessingEvent> {
        self.inner.queue.lock().await.peek().cloned()
    }

    /// Drop everything queued, returning how many events were discarded.
    pub async fn clear(&self) -> usize {
        let dropped = self.inner.queue.lock().await.clear();
        if dropped > 0 {
            warn!(dropped, "Cleared event queue");
        }
        dropped
    }

    pub fn is_processing(&self) -> bool {
        self.inner.processing.load(Ordering::Acquire)
    }

    /// Retries waiting for their backoff to elapse.
    pub fn pending_retries(&self) -> usize {
        self.inner.pending_retries.load(Ordering::Acquire)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PipelineEvent> {
        self.inner.events_tx.subscribe()
    }

    pub fn metrics_receiver(&self) -> watch::Receiver<MetricsSnapshot> {
        self.inner.metrics_tx.subscribe()
    }

    /// Sample the metrics and publish the snapshot.
    pub async fn publish_metrics(&self) -> MetricsSnapshot {
        let queue_size = self.size().await;
        let snapshot = self
            .inner
            .metrics
            .sample(queue_size, self.inner.config.buffer_size)
            .await;
        debug!(
            processed = snapshot.processed,
            failed = snapshot.failed,
            queue_size = snapshot.queue_size,
            throughput = snapshot.throughput,
            "Pipeline metrics"
        );
        self.inner.metrics_tx.send_replace(snapshot.clone());
        snapshot
    }

    fn publish(&self, event: PipelineEvent) {
        // No subscribers is fine.
        let _ = self.inner.events_tx.send(event);
    }

    /// Drain and process one batch.
    ///
    /// Returns [`BatchOutcome::Busy`] without touching the queue while a
    /// previous batch is still settling.
    pub async fn process_batch(&self) -> BatchOutcome {
        if self
            .inner
            .processing
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return BatchOutcome::Busy;
        }
        let _guard = BatchGuard(&self.inner.processing);

        let (mut batch, queue_size) = {
            let mut queue = self.inner.queue.lock().await;
            (queue.drain_batch(self.inner.config.batch_size), queue.len())
        };
        if batch.is_empty() {
            return BatchOutcome::Empty;
        }
        self.publish(PipelineEvent::Dequeued {
            count: batch.len(),
            queue_size,
        });

        // Stable: equal priorities keep queue order.
        batch.sort_by_key(|event| Reverse(event.priority_rank()));

        let started = Instant::now();
        let ctx = self.context();
        let results = futures_util::future::join_all(
            batch.into_iter().map(|event| self.process_with(event, &ctx)),
        )
        .await;

        let report = BatchReport {
            size: results.len(),
            completed: results
                .iter()
                .filter(|e| e.status == EventStatus::Completed)
                .count(),
            failed: results
                .iter()
                .filter(|e| e.status == EventStatus::Failed)
                .count(),
            duration: started.elapsed(),
        };
        debug!(
            size = report.size,
            completed = report.completed,
            failed = report.failed,
            duration_ms = report.duration.as_millis() as u64,
            "Processed batch"
        );
        self.publish(PipelineEvent::BatchProcessed {
            size: report.size,
            completed: report.completed,
            failed: report.failed,
            duration: report.duration,
        });
        BatchOutcome::Processed(report)
    }

    /// Process one event outside the queue, returning it with its final status.
    pub async fn process(&self, event: ProcessingEvent) -> ProcessingEvent {
        let ctx = self.context();
        self.process_with(event, &ctx).await
    }

    fn context(&self) -> HandlerContext {
        HandlerContext {
            store: Arc::clone(&self.inner.store),
            thresholds: self.inner.thresholds.load(),
        }
    }

    async fn process_with(&self, mut event: ProcessingEvent, ctx: &HandlerContext) -> ProcessingEvent {
        let event_type = event.event_type();
        let handler = self
            .inner
            .handlers
            .read()
            .await
            .get(&event_type)
            .cloned()
            .filter(|handler| handler.can_process(&event));
        let Some(handler) = handler else {
            warn!(event_id = %event.id, event_type = %event_type, "No handler for event");
            return event;
        };

        let started = Instant::now();
        let result = handler.handle(&event, ctx).await;
        let elapsed = started.elapsed();
        event.processed_at = Some(time::OffsetDateTime::now_utc());
        event.processing_time = Some(elapsed);

        match result {
            Ok(triggers) => {
                event.status = EventStatus::Completed;
                self.inner.metrics.record_success(elapsed).await;
                debug!(
                    event_id = %event.id,
                    event_type = %event_type,
                    triggers = triggers.len(),
                    "Event completed"
                );
                for trigger in triggers {
                    self.emit_trigger(trigger).await;
                }
            }
            Err(e) => {
                event.status = EventStatus::Failed;
                event.error = Some(e.to_string());
                self.inner.metrics.record_failure();
                self.handle_failure(&event, &e);
            }
        }
        event
    }

    async fn emit_trigger(&self, trigger: NotificationTrigger) {
        info!(
            kind = %trigger.kind,
            priority = %trigger.priority,
            condition_id = trigger.condition_id.as_deref().unwrap_or(""),
            "Notification trigger"
        );
        self.publish(PipelineEvent::TriggerEmitted(trigger.clone()));
        if let Err(e) = self.inner.trigger_tx.send(trigger).await {
            warn!(error = %e, "Notification trigger receiver dropped");
        }
    }

    fn handle_failure(&self, event: &ProcessingEvent, err: &PipelineError) {
        if !self.inner.retry.should_retry(err, event.retry_count) {
            self.drop_event(event, &err.to_string());
            return;
        }

        let delay = self.inner.retry.delay_for(event.retry_count);
        let retry = event.retry_copy();
        self.inner.metrics.record_retry();
        self.inner.pending_retries.fetch_add(1, Ordering::AcqRel);
        warn!(
            event_id = %event.id,
            event_type = %event.event_type(),
            retry_count = retry.retry_count,
            delay_ms = delay.as_millis() as u64,
            error = %err,
            "Scheduling retry"
        );
        self.publish(PipelineEvent::RetryScheduled {
            event_id: event.id,
            retry_count: retry.retry_count,
            delay,
        });

        let pipeline = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let snapshot = retry.clone();
            if let Err(e) = pipeline.enqueue(retry).await {
                pipeline.drop_event(&snapshot, &e.to_string());
            }
            pipeline.inner.pending_retries.fetch_sub(1, Ordering::AcqRel);
        });
    }

    fn drop_event(&self, event: &ProcessingEvent, reason: &str) {
        self.inner.metrics.record_drop();
        error!(
            event_id = %event.id,
            event_type = %event.event_type(),
            retry_count = event.retry_count,
            error = reason,
            "Dropping event"
        );
        self.publish(PipelineEvent::EventDropped {
            event_id: event.id,
            event_type: event.event_type(),
            retry_count: event.retry_count,
            error: reason.to_string(),
        });
    }

    /// Run the batch and metrics timers until shutdown, then drain.
    pub async fn run(self, mut shutdown_rx: watch::Receiver<bool>) {
        info!(
            batch_size = self.inner.config.batch_size,
            buffer_size = self.inner.config.buffer_size,
            "EventPipeline started"
        );

        let mut batch_tick = tokio::time::interval(self.inner.config.processing_interval);
        batch_tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut metrics_tick = tokio::time::interval(self.inner.config.metrics_interval);
        metrics_tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;

                // Check for shutdown
                changed = shutdown_rx.changed() => {
                    if changed.is_err() || *shutdown_rx.borrow() {
                        info!("EventPipeline received shutdown signal");
                        break;
                    }
                }

                _ = batch_tick.tick() => {
                    if !self.is_processing() && self.size().await > 0 {
                        let pipeline = self.clone();
                        tokio::spawn(async move {
                            pipeline.process_batch().await;
                        });
                    }
                }

                _ = metrics_tick.tick() => {
                    self.publish_metrics().await;
                }
            }
        }

        self.drain().await;
        info!("EventPipeline shutdown complete");
    }

    /// Process batches until the queue is empty.
    pub async fn drain(&self) {
        let mut batches = 0usize;
        loop {
            match self.process_batch().await {
                BatchOutcome::Empty => break,
                BatchOutcome::Processed(_) => batches += 1,
                BatchOutcome::Busy => {}
            }
            tokio::time::sleep(self.inner.config.drain_pause).await;
        }
        let abandoned = self.pending_retries();
        if abandoned > 0 {
            warn!(abandoned, "Shutting down with retries still waiting for backoff");
        }
        let snapshot = self.publish_metrics().await;
        info!(
            batches,
            processed = snapshot.processed,
            failed = snapshot.failed,
            "Drained event queue"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{ConditionRecord, MarketDataRecord, PositionRecord, TransactionRecord};
    use crate::events::{EventPayload, EventSource, notification_trigger_channel};
    use crate::storage::{MemoryEventStore, StorageError};
    use async_trait::async_trait;
    use pmon_sdk::objects::{
        ActivityTrade, ConditionResolution, MarketPriceChange, Priority, UserPosition,
    };
    use rust_decimal::Decimal;
    use std::sync::atomic::AtomicU32;
    use time::OffsetDateTime;
    use tokio::sync::Notify;
    use uuid::Uuid;

    fn trade(id: &str, size: i64) -> ProcessingEvent {
        ProcessingEvent::new(
            EventPayload::Transaction(ActivityTrade {
                id: Some(id.to_string()),
                proxy_wallet: Some("0xwallet".to_string()),
                side: Some("BUY".to_string()),
                condition_id: Some("0xcond".to_string()),
                outcome: Some("Yes".to_string()),
                size: Some(Decimal::from(size)),
                price: Some(Decimal::ONE),
                ..Default::default()
            }),
            EventSource::Manual,
        )
    }

    fn price() -> ProcessingEvent {
        ProcessingEvent::new(
            EventPayload::PriceUpdate(MarketPriceChange::default()),
            EventSource::Manual,
        )
    }

    fn pipeline_with(
        config: PipelineConfig,
        store: Arc<dyn EventStore>,
    ) -> (EventPipeline, crate::events::NotificationTriggerReceiver) {
        let (trigger_tx, trigger_rx) = notification_trigger_channel();
        let retry = RetryConfig {
            jitter: false,
            ..RetryConfig::default()
        };
        let pipeline = EventPipeline::new(
            config,
            retry,
            ConfigStore::new(ThresholdConfig::default()),
            store,
            trigger_tx,
        );
        (pipeline, trigger_rx)
    }

    /// Records the order in which events reach it.
    struct RecordingHandler {
        event_type: EventType,
        seen: Arc<std::sync::Mutex<Vec<Uuid>>>,
    }

    #[async_trait]
    impl EventHandler for RecordingHandler {
        fn event_type(&self) -> EventType {
            self.event_type
        }

        async fn handle(
            &self,
            event: &ProcessingEvent,
            _ctx: &HandlerContext,
        ) -> Result<Vec<NotificationTrigger>, PipelineError> {
            self.seen.lock().unwrap().push(event.id);
            Ok(Vec::new())
        }
    }

    /// Blocks until released.
    struct GateHandler {
        started: Arc<Notify>,
        release: Arc<Notify>,
    }

    #[async_trait]
    impl EventHandler for GateHandler {
        fn event_type(&self) -> EventType {
            EventType::PriceUpdate
        }

        async fn handle(
            &self,
            _event: &ProcessingEvent,
            _ctx: &HandlerContext,
        ) -> Result<Vec<NotificationTrigger>, PipelineError> {
            self.started.notify_one();
            self.release.notified().await;
            Ok(Vec::new())
        }
    }

    /// Fails the first `failures` transaction writes with a transient error.
    struct FlakyStore {
        inner: MemoryEventStore,
        failures: AtomicU32,
    }

    #[async_trait]
    impl EventStore for FlakyStore {
        async fn previous_market_data(
            &self,
            condition_id: &str,
            before: OffsetDateTime,
        ) -> Result<Option<MarketDataRecord>, StorageError> {
            self.inner.previous_market_data(condition_id, before).await
        }

        async fn upsert_market_data(&self, record: &MarketDataRecord) -> Result<(), StorageError> {
            self.inner.upsert_market_data(record).await
        }

        async fn upsert_transaction(&self, record: &TransactionRecord) -> Result<(), StorageError> {
            let remaining = self.failures.load(Ordering::SeqCst);
            if remaining > 0 {
                self.failures.store(remaining - 1, Ordering::SeqCst);
                return Err(StorageError::Transient("connection reset".to_string()));
            }
            self.inner.upsert_transaction(record).await
        }

        async fn find_position(&self, id: &str) -> Result<Option<PositionRecord>, StorageError> {
            self.inner.find_position(id).await
        }

        async fn upsert_position(&self, record: &PositionRecord) -> Result<(), StorageError> {
            self.inner.upsert_position(record).await
        }

        async fn upsert_condition(&self, record: &ConditionRecord) -> Result<(), StorageError> {
            self.inner.upsert_condition(record).await
        }
    }

    #[tokio::test]
    async fn test_enqueue_beyond_capacity_fails() {
        let config = PipelineConfig {
            buffer_size: 2,
            ..PipelineConfig::default()
        };
        let (pipeline, _rx) = pipeline_with(config, Arc::new(MemoryEventStore::new()));
        let mut events = pipeline.subscribe();

        assert_eq!(pipeline.enqueue(price()).await, Ok(1));
        assert_eq!(pipeline.enqueue(price()).await, Ok(2));
        assert_eq!(
            pipeline.enqueue(price()).await,
            Err(PipelineError::QueueFull { capacity: 2 })
        );
        assert_eq!(pipeline.size().await, 2);
        assert!(matches!(
            events.recv().await.unwrap(),
            PipelineEvent::Enqueued { queue_size: 1, .. }
        ));

        assert!(pipeline.dequeue().await.is_some());
        assert_eq!(pipeline.clear().await, 1);
        assert!(pipeline.peek().await.is_none());
    }

    #[tokio::test]
    async fn test_batch_dispatches_in_priority_order() {
        let (pipeline, _rx) =
            pipeline_with(PipelineConfig::default(), Arc::new(MemoryEventStore::new()));
        let seen = Arc::new(std::sync::Mutex::new(Vec::new()));
        for event_type in [
            EventType::PriceUpdate,
            EventType::Transaction,
            EventType::PositionUpdate,
            EventType::Resolution,
        ] {
            pipeline
                .register_handler(Arc::new(RecordingHandler {
                    event_type,
                    seen: seen.clone(),
                }))
                .await;
        }

        let low = price();
        let resolution = ProcessingEvent::new(
            EventPayload::Resolution(ConditionResolution::default()),
            EventSource::Manual,
        );
        let transaction = trade("t1", 1);
        let urgent_price = price().with_priority(Priority::Critical);
        let position = ProcessingEvent::new(
            EventPayload::PositionUpdate(UserPosition::default()),
            EventSource::Manual,
        );
        let expected = vec![
            resolution.id,
            urgent_price.id,
            position.id,
            transaction.id,
            low.id,
        ];
        for event in [low, resolution, transaction, urgent_price, position] {
            pipeline.enqueue(event).await.unwrap();
        }

        let outcome = pipeline.process_batch().await;
        assert!(matches!(outcome, BatchOutcome::Processed(BatchReport { size: 5, completed: 5, .. })));
        assert_eq!(*seen.lock().unwrap(), expected);
    }

    #[tokio::test]
    async fn test_no_second_batch_while_one_is_settling() {
        let (pipeline, _rx) =
            pipeline_with(PipelineConfig::default(), Arc::new(MemoryEventStore::new()));
        let started = Arc::new(Notify::new());
        let release = Arc::new(Notify::new());
        pipeline
            .register_handler(Arc::new(GateHandler {
                started: started.clone(),
                release: release.clone(),
            }))
            .await;

        pipeline.enqueue(price()).await.unwrap();
        let running = {
            let pipeline = pipeline.clone();
            tokio::spawn(async move { pipeline.process_batch().await })
        };
        started.notified().await;
        assert!(pipeline.is_processing());

        pipeline.enqueue(price()).await.unwrap();
        assert_eq!(pipeline.process_batch().await, BatchOutcome::Busy);
        assert_eq!(pipeline.size().await, 1);

        release.notify_one();
        let first = running.await.unwrap();
        assert!(matches!(first, BatchOutcome::Processed(BatchReport { size: 1, .. })));
        assert!(!pipeline.is_processing());

        release.notify_one();
        assert!(matches!(
            pipeline.process_batch().await,
            BatchOutcome::Processed(BatchReport { size: 1, .. })
        ));
        assert_eq!(pipeline.process_batch().await, BatchOutcome::Empty);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_failure_is_retried_after_backoff() {
        let store = Arc::new(FlakyStore {
            inner: MemoryEventStore::new(),
            failures: AtomicU32::new(1),
        });
        let (pipeline, mut triggers) = pipeline_with(PipelineConfig::default(), store.clone());
        let mut events = pipeline.subscribe();

        let event = trade("t1", 5_000);
        let id = event.id;
        pipeline.enqueue(event).await.unwrap();
        assert!(matches!(
            pipeline.process_batch().await,
            BatchOutcome::Processed(BatchReport { failed: 1, .. })
        ));
        assert_eq!(pipeline.size().await, 0);
        assert_eq!(pipeline.pending_retries(), 1);

        tokio::time::sleep(Duration::from_millis(1_100)).await;
        let retry = pipeline.peek().await.unwrap();
        assert_eq!(retry.id, id);
        assert_eq!(retry.retry_count, 1);
        assert_eq!(pipeline.pending_retries(), 0);

        assert!(matches!(
            pipeline.process_batch().await,
            BatchOutcome::Processed(BatchReport { completed: 1, .. })
        ));
        assert!(store.inner.transaction("t1").await.is_some());
        assert_eq!(triggers.recv().await.map(|t| t.priority), Some(Priority::High));

        let mut saw_retry = false;
        while let Ok(event) = events.try_recv() {
            if let PipelineEvent::RetryScheduled { retry_count, delay, .. } = event {
                assert_eq!(retry_count, 1);
                assert_eq!(delay, Duration::from_secs(1));
                saw_retry = true;
            }
        }
        assert!(saw_retry);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausted_retries_drop_the_event() {
        let store = Arc::new(FlakyStore {
            inner: MemoryEventStore::new(),
            failures: AtomicU32::new(u32::MAX),
        });
        let (pipeline, _rx) = pipeline_with(PipelineConfig::default(), store);
        let mut events = pipeline.subscribe();

        let mut event = trade("t1", 1);
        event.retry_count = 3;
        let processed = pipeline.process(event).await;
        assert_eq!(processed.status, EventStatus::Failed);
        assert!(processed.error.as_deref().unwrap().contains("connection reset"));
        assert_eq!(pipeline.pending_retries(), 0);

        let dropped = events.recv().await.unwrap();
        assert!(matches!(dropped, PipelineEvent::EventDropped { retry_count: 3, .. }));
    }

    #[tokio::test]
    async fn test_invalid_payload_is_dropped_not_retried() {
        let (pipeline, _rx) =
            pipeline_with(PipelineConfig::default(), Arc::new(MemoryEventStore::new()));
        pipeline.enqueue(price()).await.unwrap();
        assert!(matches!(
            pipeline.process_batch().await,
            BatchOutcome::Processed(BatchReport { failed: 1, .. })
        ));
        assert_eq!(pipeline.pending_retries(), 0);
        let snapshot = pipeline.publish_metrics().await;
        assert_eq!(snapshot.failed, 1);
        assert_eq!(snapshot.dropped, 1);
        assert_eq!(pipeline.metrics_receiver().borrow().failed, 1);
    }

    #[tokio::test]
    async fn test_out_of_range_trade_is_dropped_with_the_rest_stored() {
        let store = Arc::new(MemoryEventStore::new());
        let (pipeline, _rx) = pipeline_with(PipelineConfig::default(), store.clone());
        let mut events = pipeline.subscribe();

        let mut huge = trade("huge", 1);
        if let EventPayload::Transaction(raw) = &mut huge.payload {
            raw.size = Some(Decimal::from_str_exact("79000000000000000000000000000").unwrap());
            raw.price = Some(Decimal::from(2));
        }
        let huge_id = huge.id;
        pipeline.enqueue(trade("ok", 1)).await.unwrap();
        pipeline.enqueue(huge).await.unwrap();

        assert!(matches!(
            pipeline.process_batch().await,
            BatchOutcome::Processed(BatchReport { size: 2, completed: 1, failed: 1, .. })
        ));
        assert!(store.transaction("ok").await.is_some());
        assert!(store.transaction("huge").await.is_none());

        let mut dropped = Vec::new();
        while let Ok(event) = events.try_recv() {
            if let PipelineEvent::EventDropped { event_id, .. } = event {
                dropped.push(event_id);
            }
        }
        assert_eq!(dropped, vec![huge_id]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timer_drives_batches() {
        let store = Arc::new(MemoryEventStore::new());
        let (pipeline, _rx) = pipeline_with(PipelineConfig::default(), store.clone());
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = tokio::spawn(pipeline.clone().run(shutdown_rx));

        pipeline.enqueue(trade("t1", 1)).await.unwrap();
        tokio::time::sleep(Duration::from_millis(2_500)).await;
        assert!(store.transaction("t1").await.is_some());

        shutdown_tx.send(true).unwrap();
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_drains_the_queue() {
        let store = Arc::new(MemoryEventStore::new());
        let config = PipelineConfig {
            batch_size: 2,
            processing_interval: Duration::from_secs(3_600),
            ..PipelineConfig::default()
        };
        let (pipeline, _rx) = pipeline_with(config, store.clone());
        for i in 0..5 {
            pipeline.enqueue(trade(&format!("t{i}"), 1)).await.unwrap();
        }

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        shutdown_tx.send(true).unwrap();
        pipeline.clone().run(shutdown_rx).await;

        assert_eq!(pipeline.size().await, 0);
        assert_eq!(store.transaction_count().await, 5);
    }
}
