//! Server-only runtime configuration.
//!
//! The event core's runtime types live in `pmon_core::config`; these cover
//! what only the binary needs.

use std::net::SocketAddr;
use std::time::Duration;
use url::Url;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub listen: SocketAddr,
}

#[derive(Debug, Clone)]
pub struct NotificationConfig {
    pub webhook_url: Option<Url>,
    pub timeout: Duration,
}
