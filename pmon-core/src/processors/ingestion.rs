//! RealTimeIngestionAdapter processor.
//!
//! The adapter is responsible for:
//! - Owning the single live session with the real-time feed
//! - Subscribing to the configured topics on every (re)connect
//! - Translating feed messages into `ProcessingEvent`s (`AdapterEvent::Message`)
//! - Keeping the session alive with pings
//! - Reconnecting with exponential backoff until the attempt budget runs out
//!
//! The transport sits behind [`FeedConnector`] so the reconnect state
//! machine can be driven without a network.

use crate::config::IngestionConfig;
use crate::events::{AdapterEvent, AdapterEventSender, EventPayload, EventSource, ProcessingEvent};
use crate::utils::backoff::reconnect_delay;
use async_trait::async_trait;
use pmon_sdk::client::{ClientError, FeedStream};
use pmon_sdk::objects::{
    ActivityTrade, ConditionResolution, CryptoPrice, FeedMessage, FeedTopic, MarketPriceChange,
    Priority, Subscription, SubscriptionRequest, UserPosition,
};
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::watch;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};
use url::Url;

/// `clob_market` message type announcing a resolution.
const MARKET_RESOLVED: &str = "market_resolved";

/// Errors of the ingestion adapter.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum IngestionError {
    /// The transport could not be established or was lost.
    #[error("connection error: {0}")]
    Connection(String),

    /// A subscription could not be registered.
    #[error("subscription error: {0}")]
    Subscription(String),

    /// A frame was not a valid feed message. The session stays up.
    #[error("decode error: {0}")]
    Decode(String),
}

impl From<ClientError> for IngestionError {
    fn from(err: ClientError) -> Self {
        match err {
            ClientError::Json(e) => IngestionError::Decode(e.to_string()),
            other => IngestionError::Connection(other.to_string()),
        }
    }
}

/// A live session with the feed.
#[async_trait]
pub trait FeedConnection: Send {
    async fn send(&mut self, request: &SubscriptionRequest) -> Result<(), IngestionError>;

    /// Next message, `None` once the peer closed the session.
    async fn recv(&mut self) -> Option<Result<FeedMessage, IngestionError>>;

    async fn ping(&mut self) -> Result<(), IngestionError>;

    async fn close(&mut self);
}

/// Opens sessions with the feed.
#[async_trait]
pub trait FeedConnector: Send + Sync {
    type Connection: FeedConnection;

    async fn connect(&self) -> Result<Self::Connection, IngestionError>;
}

/// Connects to the feed over WebSocket.
#[derive(Debug, Clone)]
pub struct WebSocketConnector {
    url: Url,
    timeout: Duration,
}

impl WebSocketConnector {
    pub fn new(url: Url, timeout: Duration) -> Self {
        Self { url, timeout }
    }

    pub fn from_config(config: &IngestionConfig) -> Self {
        Self::new(config.url.clone(), config.connect_timeout)
    }
}

#[async_trait]
impl FeedConnector for WebSocketConnector {
    type Connection = FeedStream;

    async fn connect(&self) -> Result<FeedStream, IngestionError> {
        Ok(FeedStream::connect(&self.url, self.timeout).await?)
    }
}

#[async_trait]
impl FeedConnection for FeedStream {
    async fn send(&mut self, request: &SubscriptionRequest) -> Result<(), IngestionError> {
        Ok(self.send_request(request).await?)
    }

    async fn recv(&mut self) -> Option<Result<FeedMessage, IngestionError>> {
        self.next_message()
            .await
            .map(|message| message.map_err(IngestionError::from))
    }

    async fn ping(&mut self) -> Result<(), IngestionError> {
        Ok(FeedStream::ping(self).await?)
    }

    async fn close(&mut self) {
        FeedStream::close(self).await
    }
}

/// What ended one pass of the session loop.
enum Step {
    Shutdown,
    Ping,
    Message(Option<Result<FeedMessage, IngestionError>>),
}

/// Owns the feed session and turns its messages into pipeline events.
pub struct RealTimeIngestionAdapter<C: FeedConnector> {
    connector: C,
    config: IngestionConfig,
    connection: Option<C::Connection>,
    subscriptions: BTreeMap<FeedTopic, Subscription>,
    reconnect_attempts: u32,
    event_tx: AdapterEventSender,
}

impl<C: FeedConnector> RealTimeIngestionAdapter<C> {
    /// Create a new adapter.
    ///
    /// # Arguments
    ///
    /// * `connector` - Opens feed sessions
    /// * `config` - Topics, credentials and reconnect behaviour
    /// * `event_tx` - Sender for lifecycle and message events
    pub fn new(connector: C, config: IngestionConfig, event_tx: AdapterEventSender) -> Self {
        Self {
            connector,
            config,
            connection: None,
            subscriptions: BTreeMap::new(),
            reconnect_attempts: 0,
            event_tx,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.connection.is_some()
    }

    pub fn reconnect_attempts(&self) -> u32 {
        self.reconnect_attempts
    }

    /// Topics currently subscribed to, in topic order.
    pub fn subscribed_topics(&self) -> Vec<FeedTopic> {
        self.subscriptions.keys().copied().collect()
    }

    /// Open the session and subscribe to every configured and previously
    /// subscribed topic. A no-op while connected.
    pub async fn connect(&mut self) -> Result<(), IngestionError> {
        if self.is_connected() {
            return Ok(());
        }

        let mut connection = match self.connector.connect().await {
            Ok(connection) => connection,
            Err(e) => {
                self.emit(AdapterEvent::Error(e.to_string())).await;
                return Err(e);
            }
        };

        for topic in self.config.enabled_topics.clone() {
            if !self.subscriptions.contains_key(&topic) {
                let filter = self.config.topic_filters.get(&topic).cloned();
                match self.build_subscription(topic, filter) {
                    Ok(subscription) => {
                        self.subscriptions.insert(topic, subscription);
                    }
                    Err(e) => warn!(topic = %topic, error = %e, "Skipping configured topic"),
                }
            }
        }

        if !self.subscriptions.is_empty() {
            let request = SubscriptionRequest::subscribe(self.subscriptions.values().cloned().collect());
            if let Err(e) = connection.send(&request).await {
                connection.close().await;
                let err = IngestionError::Connection(format!("subscribe on connect failed: {e}"));
                self.emit(AdapterEvent::Error(err.to_string())).await;
                return Err(err);
            }
        }

        self.connection = Some(connection);
        self.reconnect_attempts = 0;
        info!(
            url = %self.config.url,
            topics = ?self.subscribed_topics(),
            "Connected to real-time feed"
        );
        self.emit(AdapterEvent::Connected).await;
        Ok(())
    }

    /// Close the session and forget every subscription. Idempotent.
    pub async fn disconnect(&mut self) {
        self.subscriptions.clear();
        if let Some(mut connection) = self.connection.take() {
            connection.close().await;
            info!("Disconnected from real-time feed");
            self.emit(AdapterEvent::Disconnected).await;
        }
    }

    /// Subscribe to a topic on the live session.
    ///
    /// Credentials are attached for topics that require them.
    pub async fn subscribe(&mut self, topic: FeedTopic, filter: Option<String>) -> Result<(), IngestionError> {
        let subscription = self.build_subscription(topic, filter)?;
        let Some(connection) = self.connection.as_mut() else {
            return Err(IngestionError::Subscription(format!(
                "cannot subscribe to {topic}: not connected"
            )));
        };
        connection
            .send(&SubscriptionRequest::subscribe(vec![subscription.clone()]))
            .await
            .map_err(|e| IngestionError::Subscription(format!("{topic}: {e}")))?;
        debug!(topic = %topic, "Subscribed");
        self.subscriptions.insert(topic, subscription);
        Ok(())
    }

    /// Forget a topic. The server-side unsubscribe is best-effort.
    pub async fn unsubscribe(&mut self, topic: FeedTopic) -> bool {
        let Some(subscription) = self.subscriptions.remove(&topic) else {
            return false;
        };
        if let Some(connection) = self.connection.as_mut() {
            if let Err(e) = connection
                .send(&SubscriptionRequest::unsubscribe(vec![subscription]))
                .await
            {
                debug!(topic = %topic, error = %e, "Server-side unsubscribe failed");
            }
        }
        true
    }

    fn build_subscription(
        &self,
        topic: FeedTopic,
        filter: Option<String>,
    ) -> Result<Subscription, IngestionError> {
        let mut subscription = Subscription::all_types(topic);
        subscription.filters = filter;
        if topic.requires_auth() {
            let Some(credentials) = self.config.credentials.clone() else {
                return Err(IngestionError::Subscription(format!(
                    "{topic} requires credentials"
                )));
            };
            subscription.clob_auth = Some(credentials);
        }
        Ok(subscription)
    }

    async fn emit(&self, event: AdapterEvent) {
        if self.event_tx.send(event).await.is_err() {
            debug!("Adapter event receiver dropped");
        }
    }

    /// Drop the session after the peer or the transport gave up.
    async fn connection_lost(&mut self, reason: &str) {
        if let Some(mut connection) = self.connection.take() {
            connection.close().await;
        }
        warn!(reason, "Real-time feed connection lost");
        self.emit(AdapterEvent::Disconnected).await;
    }

    /// Sleep out the backoff before the next attempt.
    ///
    /// Returns `false` when the attempt budget is spent or shutdown was
    /// requested.
    async fn wait_before_reconnect(&mut self, shutdown_rx: &mut watch::Receiver<bool>) -> bool {
        if !self.config.auto_reconnect {
            info!("Auto-reconnect disabled, adapter stopping");
            return false;
        }
        if self.reconnect_attempts >= self.config.max_reconnect_attempts {
            error!(
                attempts = self.reconnect_attempts,
                "Max reconnect attempts reached, giving up on the real-time feed"
            );
            self.emit(AdapterEvent::MaxReconnectAttemptsReached).await;
            return false;
        }

        let delay = reconnect_delay(self.reconnect_attempts);
        self.reconnect_attempts += 1;
        warn!(
            attempt = self.reconnect_attempts,
            delay_ms = delay.as_millis() as u64,
            "Reconnecting to real-time feed"
        );

        let sleep = tokio::time::sleep(delay);
        tokio::pin!(sleep);
        loop {
            tokio::select! {
                biased;

                changed = shutdown_rx.changed() => {
                    if changed.is_err() || *shutdown_rx.borrow() {
                        return false;
                    }
                }

                _ = &mut sleep => return true,
            }
        }
    }

    /// Run the adapter until shutdown or until reconnection gives up.
    pub async fn run(mut self, mut shutdown_rx: watch::Receiver<bool>) {
        info!(url = %self.config.url, "RealTimeIngestionAdapter started");

        'session: loop {
            if *shutdown_rx.borrow() {
                break;
            }
            if let Err(e) = self.connect().await {
                warn!(error = %e, "Failed to connect to real-time feed");
                if self.wait_before_reconnect(&mut shutdown_rx).await {
                    continue;
                }
                break;
            }

            let period = self.config.ping_interval;
            let mut ping = tokio::time::interval_at(Instant::now() + period, period);
            ping.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                let step = {
                    let Some(connection) = self.connection.as_mut() else {
                        break;
                    };
                    tokio::select! {
                        biased;

                        // Check for shutdown
                        changed = shutdown_rx.changed() => {
                            if changed.is_err() || *shutdown_rx.borrow() {
                                Step::Shutdown
                            } else {
                                continue;
                            }
                        }

                        _ = ping.tick() => Step::Ping,

                        message = connection.recv() => Step::Message(message),
                    }
                };

                match step {
                    Step::Shutdown => {
                        info!("RealTimeIngestionAdapter received shutdown signal");
                        self.disconnect().await;
                        break 'session;
                    }
                    Step::Ping => {
                        let result = match self.connection.as_mut() {
                            Some(connection) => connection.ping().await,
                            None => Ok(()),
                        };
                        if let Err(e) = result {
                            self.emit(AdapterEvent::Error(e.to_string())).await;
                            self.connection_lost("ping failed").await;
                        }
                    }
                    Step::Message(Some(Ok(message))) => {
                        if let Some(event) = transform(&message) {
                            debug!(
                                event_id = %event.id,
                                event_type = %event.event_type(),
                                topic = %message.topic,
                                "Feed message"
                            );
                            self.emit(AdapterEvent::Message(event)).await;
                        }
                    }
                    Step::Message(Some(Err(IngestionError::Decode(e)))) => {
                        warn!(error = %e, "Undecodable feed frame");
                        self.emit(AdapterEvent::Error(format!("decode error: {e}"))).await;
                    }
                    Step::Message(Some(Err(e))) => {
                        self.emit(AdapterEvent::Error(e.to_string())).await;
                        self.connection_lost("transport error").await;
                    }
                    Step::Message(None) => {
                        self.connection_lost("closed by server").await;
                    }
                }
            }

            if !self.wait_before_reconnect(&mut shutdown_rx).await {
                break;
            }
        }

        if self.is_connected() {
            self.disconnect().await;
        }
        info!("RealTimeIngestionAdapter shutdown complete");
    }
}

fn decode<T: DeserializeOwned>(message: &FeedMessage) -> Option<T> {
    match serde_json::from_value(message.payload.clone()) {
        Ok(payload) => Some(payload),
        Err(e) => {
            warn!(topic = %message.topic, kind = %message.kind, error = %e, "Dropping malformed payload");
            None
        }
    }
}

/// Translate one feed message into a pipeline event.
///
/// Selects the payload shape by topic. Unknown topics and malformed
/// payloads are logged and dropped.
pub fn transform(message: &FeedMessage) -> Option<ProcessingEvent> {
    let Ok(topic) = FeedTopic::from_str(&message.topic) else {
        warn!(topic = %message.topic, "Dropping message from unknown topic");
        return None;
    };

    let payload = match topic {
        FeedTopic::Activity => EventPayload::Transaction(decode::<ActivityTrade>(message)?),
        FeedTopic::ClobMarket if message.kind == MARKET_RESOLVED => {
            EventPayload::Resolution(decode::<ConditionResolution>(message)?)
        }
        FeedTopic::ClobMarket => {
            let mut reading = decode::<MarketPriceChange>(message)?;
            reading.timestamp = reading.timestamp.or(message.timestamp);
            EventPayload::PriceUpdate(reading)
        }
        FeedTopic::ClobUser => EventPayload::PositionUpdate(decode::<UserPosition>(message)?),
        FeedTopic::CryptoPrices | FeedTopic::CryptoPricesChainlink | FeedTopic::EquityPrices => {
            let mut reading: MarketPriceChange = decode::<CryptoPrice>(message)?.into();
            reading.timestamp = reading.timestamp.or(message.timestamp);
            EventPayload::PriceUpdate(reading)
        }
    };

    Some(ProcessingEvent::new(payload, EventSource::Websocket).with_priority(Priority::Medium))
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::events::{EventStatus, EventType, adapter_event_channel};
    use pmon_sdk::objects::ClobAuth;
    use serde_json::json;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};
    use tokio::sync::mpsc;

    type Sent = Arc<Mutex<Vec<SubscriptionRequest>>>;

    struct MockConnection {
        incoming: mpsc::UnboundedReceiver<FeedMessage>,
        sent: Sent,
    }

    #[async_trait]
    impl FeedConnection for MockConnection {
        async fn send(&mut self, request: &SubscriptionRequest) -> Result<(), IngestionError> {
            self.sent.lock().unwrap().push(request.clone());
            Ok(())
        }

        async fn recv(&mut self) -> Option<Result<FeedMessage, IngestionError>> {
            self.incoming.recv().await.map(Ok)
        }

        async fn ping(&mut self) -> Result<(), IngestionError> {
            Ok(())
        }

        async fn close(&mut self) {}
    }

    /// Hands out queued sessions, refusing once they run out.
    #[derive(Default)]
    struct MockConnector {
        sessions: Mutex<VecDeque<MockConnection>>,
        sent: Sent,
    }

    impl MockConnector {
        fn with_session(self) -> (Self, mpsc::UnboundedSender<FeedMessage>) {
            let (tx, rx) = mpsc::unbounded_channel();
            self.sessions.lock().unwrap().push_back(MockConnection {
                incoming: rx,
                sent: self.sent.clone(),
            });
            (self, tx)
        }
    }

    #[async_trait]
    impl FeedConnector for MockConnector {
        type Connection = MockConnection;

        async fn connect(&self) -> Result<MockConnection, IngestionError> {
            self.sessions
                .lock()
                .unwrap()
                .pop_front()
                .ok_or_else(|| IngestionError::Connection("connection refused".to_string()))
        }
    }

    fn config() -> IngestionConfig {
        IngestionConfig::new(Url::parse("wss://feed.test").unwrap())
    }

    fn activity() -> FeedMessage {
        FeedMessage::new(
            "activity",
            "trades",
            json!({
                "id": "t1",
                "proxyWallet": "0xwallet",
                "side": "BUY",
                "conditionId": "0xcond",
                "size": 10,
                "price": "0.5"
            }),
        )
    }

    #[test]
    fn test_transform_selects_payload_by_topic() {
        let event = transform(&activity()).unwrap();
        assert_eq!(event.event_type(), EventType::Transaction);
        assert_eq!(event.status, EventStatus::Pending);
        assert_eq!(event.retry_count, 0);
        assert_eq!(event.metadata.source, EventSource::Websocket);
        assert_eq!(event.metadata.priority, Some(Priority::Medium));

        let price = FeedMessage {
            timestamp: Some(1_718_000_000_000),
            ..FeedMessage::new("clob_market", "price_change", json!({"market": "0xcond", "price": "0.4"}))
        };
        let event = transform(&price).unwrap();
        let EventPayload::PriceUpdate(reading) = &event.payload else {
            panic!("expected a price update");
        };
        assert_eq!(reading.condition_id.as_deref(), Some("0xcond"));
        assert_eq!(reading.timestamp, Some(1_718_000_000_000));

        let resolved = FeedMessage::new("clob_market", "market_resolved", json!({"market": "0xcond"}));
        assert_eq!(transform(&resolved).unwrap().event_type(), EventType::Resolution);

        let position = FeedMessage::new("clob_user", "position", json!({"id": "p1"}));
        assert_eq!(transform(&position).unwrap().event_type(), EventType::PositionUpdate);

        let btc = FeedMessage::new("crypto_prices", "update", json!({"symbol": "btcusdt", "value": 67000}));
        let EventPayload::PriceUpdate(reading) = transform(&btc).unwrap().payload else {
            panic!("expected a price update");
        };
        assert_eq!(reading.condition_id.as_deref(), Some("btcusdt"));
    }

    #[test]
    fn test_transform_drops_unknown_topics_and_bad_payloads() {
        assert!(transform(&FeedMessage::new("comments", "created", json!({}))).is_none());
        assert!(transform(&FeedMessage::new("activity", "trades", json!("not an object"))).is_none());
    }

    #[tokio::test]
    async fn test_connect_subscribes_configured_topics() {
        let (connector, _feed) = MockConnector::default().with_session();
        let sent = connector.sent.clone();
        let (tx, mut rx) = adapter_event_channel();
        let mut adapter = RealTimeIngestionAdapter::new(connector, config(), tx);

        adapter.connect().await.unwrap();
        assert!(adapter.is_connected());
        assert!(matches!(rx.recv().await, Some(AdapterEvent::Connected)));

        let requests = sent.lock().unwrap().clone();
        assert_eq!(requests.len(), 1);
        let topics: Vec<_> = requests[0].subscriptions.iter().map(|s| s.topic).collect();
        assert_eq!(topics, vec![FeedTopic::Activity, FeedTopic::ClobMarket]);

        // Already connected: nothing new is sent.
        adapter.connect().await.unwrap();
        assert_eq!(sent.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_subscribe_requires_connection_and_credentials() {
        let (connector, _feed) = MockConnector::default().with_session();
        let sent = connector.sent.clone();
        let (tx, _rx) = adapter_event_channel();
        let mut adapter = RealTimeIngestionAdapter::new(connector, config(), tx);

        assert!(matches!(
            adapter.subscribe(FeedTopic::CryptoPrices, None).await,
            Err(IngestionError::Subscription(_))
        ));

        adapter.connect().await.unwrap();
        assert!(matches!(
            adapter.subscribe(FeedTopic::ClobUser, None).await,
            Err(IngestionError::Subscription(_))
        ));

        adapter.config.credentials = Some(ClobAuth {
            key: "k".to_string(),
            secret: "s".to_string(),
            passphrase: "p".to_string(),
        });
        adapter
            .subscribe(FeedTopic::ClobUser, Some("0xcond".to_string()))
            .await
            .unwrap();
        let last = sent.lock().unwrap().last().cloned().unwrap();
        assert!(last.subscriptions[0].clob_auth.is_some());
        assert_eq!(last.subscriptions[0].filters.as_deref(), Some("0xcond"));

        assert!(adapter.unsubscribe(FeedTopic::ClobUser).await);
        assert!(!adapter.unsubscribe(FeedTopic::ClobUser).await);
    }

    #[tokio::test]
    async fn test_disconnect_is_idempotent() {
        let (connector, _feed) = MockConnector::default().with_session();
        let (tx, mut rx) = adapter_event_channel();
        let mut adapter = RealTimeIngestionAdapter::new(connector, config(), tx);

        adapter.connect().await.unwrap();
        adapter.disconnect().await;
        adapter.disconnect().await;
        assert!(!adapter.is_connected());
        assert!(adapter.subscribed_topics().is_empty());

        assert!(matches!(rx.recv().await, Some(AdapterEvent::Connected)));
        assert!(matches!(rx.recv().await, Some(AdapterEvent::Disconnected)));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_gives_up_after_max_reconnect_attempts() {
        let mut config = config();
        config.max_reconnect_attempts = 2;
        let (tx, mut rx) = adapter_event_channel();
        let adapter = RealTimeIngestionAdapter::new(MockConnector::default(), config, tx);
        let (_shutdown_tx, shutdown_rx) = watch::channel(false);

        let started = Instant::now();
        adapter.run(shutdown_rx).await;
        // 1s then 2s of backoff between the three attempts.
        assert_eq!(started.elapsed(), Duration::from_secs(3));

        let mut errors = 0;
        let mut gave_up = false;
        while let Ok(event) = rx.try_recv() {
            match event {
                AdapterEvent::Error(_) => errors += 1,
                AdapterEvent::MaxReconnectAttemptsReached => gave_up = true,
                other => panic!("unexpected {other:?}"),
            }
        }
        assert_eq!(errors, 3);
        assert!(gave_up);
    }

    #[tokio::test(start_paused = true)]
    async fn test_successful_connect_resets_reconnect_attempts() {
        let (tx, _rx) = adapter_event_channel();
        let mut adapter = RealTimeIngestionAdapter::new(MockConnector::default(), config(), tx);
        let (_shutdown_tx, mut shutdown_rx) = watch::channel(false);

        assert!(adapter.connect().await.is_err());
        assert!(adapter.wait_before_reconnect(&mut shutdown_rx).await);
        assert_eq!(adapter.reconnect_attempts(), 1);

        let (connector, _feed) = MockConnector::default().with_session();
        adapter.connector = connector;
        adapter.connect().await.unwrap();
        assert_eq!(adapter.reconnect_attempts(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_attempt_budget_starts_over_after_a_good_session() {
        let (connector, first) = MockConnector::default().with_session();
        let (connector, second) = connector.with_session();
        drop(first);
        drop(second);

        let mut config = config();
        config.max_reconnect_attempts = 1;
        let (tx, mut rx) = adapter_event_channel();
        let adapter = RealTimeIngestionAdapter::new(connector, config, tx);
        let (_shutdown_tx, shutdown_rx) = watch::channel(false);

        let started = Instant::now();
        adapter.run(shutdown_rx).await;
        // One 1s backoff before the second session, another after it.
        assert_eq!(started.elapsed(), Duration::from_secs(2));

        let mut seen = Vec::new();
        while let Ok(event) = rx.try_recv() {
            seen.push(match event {
                AdapterEvent::Connected => "connected",
                AdapterEvent::Disconnected => "disconnected",
                AdapterEvent::Error(_) => "error",
                AdapterEvent::MaxReconnectAttemptsReached => "gave_up",
                AdapterEvent::Message(_) => "message",
            });
        }
        assert_eq!(
            seen,
            vec!["connected", "disconnected", "connected", "disconnected", "error", "gave_up"]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_reconnects_and_resubscribes_after_drop() {
        let (connector, first) = MockConnector::default().with_session();
        let (connector, _second) = connector.with_session();
        let sent = connector.sent.clone();
        first.send(activity()).unwrap();
        drop(first);

        let (tx, mut rx) = adapter_event_channel();
        let adapter = RealTimeIngestionAdapter::new(connector, config(), tx);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = tokio::spawn(adapter.run(shutdown_rx));

        assert!(matches!(rx.recv().await, Some(AdapterEvent::Connected)));
        assert!(matches!(rx.recv().await, Some(AdapterEvent::Message(_))));
        assert!(matches!(rx.recv().await, Some(AdapterEvent::Disconnected)));
        assert!(matches!(rx.recv().await, Some(AdapterEvent::Connected)));
        assert_eq!(sent.lock().unwrap().len(), 2);

        shutdown_tx.send(true).unwrap();
        handle.await.unwrap();
        assert!(matches!(rx.recv().await, Some(AdapterEvent::Disconnected)));
    }
}
