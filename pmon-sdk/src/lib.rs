//! Shared wire types for the pmon wallet monitor.
//!
//! `objects` holds everything that crosses a process boundary: the
//! real-time feed envelope and its raw payloads, subscription requests and
//! the notification triggers handed to the delivery subsystem. The
//! WebSocket feed client lives behind the `client` feature.

#![forbid(unsafe_code)]

#[cfg(feature = "client")]
pub mod client;
pub mod objects;
