//! WebSocket client for the real-time feed.
//!
//! Gated behind the `client` cargo feature so crates that only need the
//! wire types do not pull in `tokio-tungstenite`.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::protocol::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use url::Url;

use crate::objects::{FeedMessage, SubscriptionRequest};

/// Errors produced by the feed client.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Transport-level failure (DNS, TLS, connection reset, …).
    #[error("websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// A frame could not be encoded or decoded.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// The handshake did not complete in time.
    #[error("connection timed out after {0:?}")]
    Timeout(Duration),
}

/// A live session with the feed.
///
/// Control frames are handled internally: server pings are answered,
/// `pong` keep-alive replies are swallowed, and a close frame ends the
/// stream.
pub struct FeedStream {
    inner: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl FeedStream {
    /// Open a session, failing if the handshake takes longer than `timeout`.
    pub async fn connect(url: &Url, timeout: Duration) -> Result<Self, ClientError> {
        let (inner, _response) = tokio::time::timeout(timeout, connect_async(url.as_str()))
            .await
            .map_err(|_| ClientError::Timeout(timeout))??;
        Ok(Self { inner })
    }

    /// Send a subscribe or unsubscribe request.
    pub async fn send_request(&mut self, request: &SubscriptionRequest) -> Result<(), ClientError> {
        let text = serde_json::to_string(request)?;
        self.inner.send(Message::Text(text.into())).await?;
        Ok(())
    }

    /// Send the application-level keep-alive.
    pub async fn ping(&mut self) -> Result<(), ClientError> {
        self.inner.send(Message::Text("ping".into())).await?;
        Ok(())
    }

    /// Wait for the next data message.
    ///
    /// Returns `None` once the server closes the session.
    pub async fn next_message(&mut self) -> Option<Result<FeedMessage, ClientError>> {
        while let Some(frame) = self.inner.next().await {
            let frame = match frame {
                Ok(frame) => frame,
                Err(e) => return Some(Err(e.into())),
            };
            match frame {
                Message::Text(text) => {
                    let text: &str = &text;
                    let trimmed = text.trim();
                    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("pong") {
                        continue;
                    }
                    return Some(serde_json::from_str(trimmed).map_err(ClientError::from));
                }
                Message::Ping(payload) => {
                    if let Err(e) = self.inner.send(Message::Pong(payload)).await {
                        return Some(Err(e.into()));
                    }
                }
                Message::Close(_) => return None,
                Message::Binary(_) | Message::Pong(_) | Message::Frame(_) => {}
            }
        }
        None
    }

    /// Close the session. Errors are ignored, the peer may already be gone.
    pub async fn close(&mut self) {
        let _ = self.inner.close(None).await;
    }
}
