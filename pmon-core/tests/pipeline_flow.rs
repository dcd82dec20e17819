use pmon_core::config::{ConfigStore, PipelineConfig, RetryConfig, ThresholdConfig};
use pmon_core::entities::{ConditionStatus, PositionStatus};
use pmon_core::events::{
    AdapterEvent, NotificationTriggerReceiver, PipelineEvent, adapter_event_channel,
    notification_trigger_channel,
};
use pmon_core::processors::ingestion::transform;
use pmon_core::processors::{AdapterEventRouter, EventPipeline};
use pmon_core::storage::MemoryEventStore;
use pmon_sdk::objects::{FeedMessage, NotificationTrigger, Priority, TriggerKind};
use rust_decimal::Decimal;
use serde_json::json;
use std::sync::Arc;
use tokio::sync::watch;

fn setup() -> (EventPipeline, Arc<MemoryEventStore>, NotificationTriggerReceiver) {
    let store = Arc::new(MemoryEventStore::new());
    let (trigger_tx, trigger_rx) = notification_trigger_channel();
    let thresholds = ThresholdConfig {
        high_value_transaction: Decimal::from(10_000),
        ..ThresholdConfig::default()
    };
    let pipeline = EventPipeline::new(
        PipelineConfig::default(),
        RetryConfig::default(),
        ConfigStore::new(thresholds),
        store.clone(),
        trigger_tx,
    );
    (pipeline, store, trigger_rx)
}

async fn ingest(pipeline: &EventPipeline, message: FeedMessage) {
    let event = transform(&message).expect("message should map to an event");
    pipeline.enqueue(event).await.unwrap();
}

fn collect(rx: &mut NotificationTriggerReceiver) -> Vec<NotificationTrigger> {
    let mut triggers = Vec::new();
    while let Ok(trigger) = rx.try_recv() {
        triggers.push(trigger);
    }
    triggers
}

fn price(at_ms: i64, price: &str) -> FeedMessage {
    FeedMessage {
        timestamp: Some(at_ms),
        ..FeedMessage::new(
            "clob_market",
            "price_change",
            json!({"market": "0xcond", "price": price}),
        )
    }
}

#[tokio::test(start_paused = true)]
async fn test_high_value_trade_becomes_critical_trigger() {
    let (pipeline, store, mut triggers) = setup();

    ingest(
        &pipeline,
        FeedMessage::new(
            "activity",
            "trades",
            json!({
                "transactionHash": "0xhash",
                "proxyWallet": "0xwhale",
                "side": "BUY",
                "conditionId": "0xcond",
                "outcome": "Yes",
                "size": 15000,
                "price": 1,
                "timestamp": 1718000000
            }),
        ),
    )
    .await;
    pipeline.drain().await;

    let stored = store.transaction("0xhash").await.unwrap();
    assert_eq!(stored.value, Decimal::from(15_000));

    let triggers = collect(&mut triggers);
    assert_eq!(triggers.len(), 1);
    assert_eq!(triggers[0].kind, TriggerKind::Transaction);
    assert_eq!(triggers[0].priority, Priority::Critical);
    assert_eq!(triggers[0].user_id.as_deref(), Some("0xwhale"));
    assert_eq!(triggers[0].condition_id.as_deref(), Some("0xcond"));
}

#[tokio::test(start_paused = true)]
async fn test_price_move_compares_against_stored_reading() {
    let (pipeline, store, mut triggers) = setup();

    ingest(&pipeline, price(1_718_000_000_000, "0.40")).await;
    pipeline.drain().await;
    assert!(collect(&mut triggers).is_empty());

    ingest(&pipeline, price(1_718_000_060_000, "0.50")).await;
    pipeline.drain().await;

    let triggers = collect(&mut triggers);
    assert_eq!(triggers.len(), 1);
    assert_eq!(triggers[0].kind, TriggerKind::PriceChange);
    assert_eq!(triggers[0].priority, Priority::High);
    assert_eq!(store.market_data_for("0xcond").await.len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_settlement_and_resolution_reach_the_store() {
    let (pipeline, store, mut triggers) = setup();

    ingest(
        &pipeline,
        FeedMessage::new(
            "clob_user",
            "position",
            json!({"id": "p1", "user": "0xme", "market": "0xcond", "outcome": "Yes", "status": "open"}),
        ),
    )
    .await;
    pipeline.drain().await;
    assert!(collect(&mut triggers).is_empty());

    ingest(
        &pipeline,
        FeedMessage::new(
            "clob_user",
            "position",
            json!({
                "id": "p1",
                "user": "0xme",
                "market": "0xcond",
                "outcome": "Yes",
                "status": "settled",
                "payouts": {"Yes": "1", "No": "0"}
            }),
        ),
    )
    .await;
    ingest(
        &pipeline,
        FeedMessage::new(
            "clob_market",
            "market_resolved",
            json!({"market": "0xcond", "winningOutcome": "Yes"}),
        ),
    )
    .await;
    pipeline.drain().await;

    let triggers = collect(&mut triggers);
    assert_eq!(triggers.len(), 2);
    assert!(
        triggers
            .iter()
            .any(|t| t.kind == TriggerKind::MarketResolution && t.priority == Priority::Critical)
    );
    assert!(
        triggers
            .iter()
            .any(|t| t.kind == TriggerKind::PositionUpdate && t.data["reason"] == "status_change")
    );

    assert_eq!(
        store.position("p1").await.map(|p| p.status),
        Some(PositionStatus::Settled)
    );
    let condition = store.condition("0xcond").await.unwrap();
    assert_eq!(condition.status, ConditionStatus::Resolved);
    assert_eq!(condition.resolution_outcome.as_deref(), Some("Yes"));
}

#[tokio::test(start_paused = true)]
async fn test_router_feeds_pipeline_and_invalid_events_are_dropped() {
    let (pipeline, store, mut triggers) = setup();
    let mut activity = pipeline.subscribe();
    let (adapter_tx, adapter_rx) = adapter_event_channel();
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let router = tokio::spawn(AdapterEventRouter::new(pipeline.clone(), adapter_rx).run(shutdown_rx));

    // Missing proxyWallet: transforms into an event but fails validation.
    let invalid = transform(&FeedMessage::new(
        "activity",
        "trades",
        json!({"id": "bad", "side": "BUY", "conditionId": "0xcond", "size": 1, "price": 1}),
    ))
    .unwrap();
    adapter_tx.send(AdapterEvent::Connected).await.unwrap();
    adapter_tx.send(AdapterEvent::Message(invalid)).await.unwrap();
    shutdown_tx.send(true).unwrap();
    router.await.unwrap();

    assert_eq!(pipeline.size().await, 1);
    pipeline.drain().await;

    assert_eq!(store.transaction_count().await, 0);
    assert!(collect(&mut triggers).is_empty());

    let mut dropped = false;
    while let Ok(event) = activity.try_recv() {
        if let PipelineEvent::EventDropped { retry_count, .. } = event {
            assert_eq!(retry_count, 0);
            dropped = true;
        }
    }
    assert!(dropped);
}
