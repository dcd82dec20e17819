//! Notification sink for pipeline triggers.
//!
//! Every trigger is logged. When a webhook URL is configured, the trigger
//! is also POSTed to it as JSON. Delivery is best-effort: a failed POST is
//! logged and the trigger is not retried.

use crate::config::runtime::NotificationConfig;
use pmon_core::events::NotificationTriggerReceiver;
use pmon_sdk::objects::{NotificationTrigger, Priority};
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, info, warn};
use url::Url;

#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("HTTP request error: {0}")]
    Request(#[from] reqwest::Error),

    #[error("webhook delivery failed with status {status}: {body}")]
    DeliveryFailed { status: u16, body: String },
}

pub struct TriggerNotifier {
    trigger_rx: NotificationTriggerReceiver,
    webhook: Option<(reqwest::Client, Url)>,
}

impl TriggerNotifier {
    pub fn new(
        trigger_rx: NotificationTriggerReceiver,
        config: NotificationConfig,
    ) -> Result<Self, reqwest::Error> {
        let webhook = match config.webhook_url {
            Some(url) => {
                let client = reqwest::Client::builder().timeout(config.timeout).build()?;
                Some((client, url))
            }
            None => None,
        };
        Ok(Self {
            trigger_rx,
            webhook,
        })
    }

    /// Deliver triggers until stopped or until every sender is gone.
    ///
    /// On stop, triggers already buffered are still delivered.
    pub async fn run(mut self, mut stop_rx: watch::Receiver<bool>) {
        info!(
            webhook = self.webhook.as_ref().map(|(_, url)| url.as_str()),
            "TriggerNotifier started"
        );

        loop {
            tokio::select! {
                biased;

                changed = stop_rx.changed() => {
                    if changed.is_err() || *stop_rx.borrow() {
                        info!("TriggerNotifier received shutdown signal");
                        break;
                    }
                }

                Some(trigger) = self.trigger_rx.recv() => {
                    self.deliver(&trigger).await;
                }

                else => {
                    info!("Trigger channel closed");
                    break;
                }
            }
        }

        while let Ok(trigger) = self.trigger_rx.try_recv() {
            self.deliver(&trigger).await;
        }
        info!("TriggerNotifier shutdown complete");
    }

    async fn deliver(&self, trigger: &NotificationTrigger) {
        let condition_id = trigger.condition_id.as_deref().unwrap_or("-");
        let user_id = trigger.user_id.as_deref().unwrap_or("-");
        match trigger.priority {
            Priority::Critical | Priority::High => info!(
                kind = %trigger.kind,
                priority = %trigger.priority,
                condition_id,
                user_id,
                data = %trigger.data,
                "Notification trigger"
            ),
            Priority::Medium | Priority::Low => debug!(
                kind = %trigger.kind,
                priority = %trigger.priority,
                condition_id,
                user_id,
                data = %trigger.data,
                "Notification trigger"
            ),
        }

        let Some((client, url)) = &self.webhook else {
            return;
        };
        if let Err(e) = send_webhook(client, url, trigger).await {
            warn!(
                kind = %trigger.kind,
                condition_id,
                error = %e,
                "Webhook delivery failed"
            );
        }
    }
}

async fn send_webhook(
    client: &reqwest::Client,
    url: &Url,
    trigger: &NotificationTrigger,
) -> Result<(), DeliveryError> {
    let response = client.post(url.clone()).json(trigger).send().await?;
    let status = response.status();
    if status.is_success() {
        Ok(())
    } else {
        let body = response.text().await.unwrap_or_default();
        Err(DeliveryError::DeliveryFailed {
            status: status.as_u16(),
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pmon_core::events::notification_trigger_channel;
    use pmon_sdk::objects::TriggerKind;
    use serde_json::json;
    use std::time::Duration;

    fn log_only() -> NotificationConfig {
        NotificationConfig {
            webhook_url: None,
            timeout: Duration::from_secs(1),
        }
    }

    #[tokio::test]
    async fn test_drains_buffered_triggers_on_stop() {
        let (tx, rx) = notification_trigger_channel();
        let notifier = TriggerNotifier::new(rx, log_only()).unwrap();
        let (stop_tx, stop_rx) = watch::channel(false);

        for _ in 0..3 {
            tx.send(NotificationTrigger::new(
                TriggerKind::PriceChange,
                Priority::High,
                json!({}),
            ))
            .await
            .unwrap();
        }
        stop_tx.send(true).unwrap();
        notifier.run(stop_rx).await;

        // Buffered triggers were consumed, so the channel has room again.
        assert_eq!(tx.capacity(), tx.max_capacity());
    }

    #[tokio::test]
    async fn test_stops_when_senders_are_gone() {
        let (tx, rx) = notification_trigger_channel();
        let notifier = TriggerNotifier::new(rx, log_only()).unwrap();
        let (_stop_tx, stop_rx) = watch::channel(false);
        drop(tx);
        notifier.run(stop_rx).await;
    }
}
