//! Persistence seam of the pipeline.
//!
//! Handlers only see [`EventStore`]. [`PgEventStore`] writes to Postgres,
//! [`MemoryEventStore`] keeps everything in process with the same upsert
//! semantics.

pub mod memory;
pub mod postgres;

pub use memory::MemoryEventStore;
pub use postgres::PgEventStore;

use crate::entities::{ConditionRecord, MarketDataRecord, PositionRecord, TransactionRecord};
use async_trait::async_trait;
use thiserror::Error;
use time::OffsetDateTime;

/// Message fragments that mark an otherwise opaque failure as transient.
///
/// Only consulted for errors that carry nothing but free text; typed
/// errors are classified by kind.
pub const TRANSIENT_SIGNATURES: [&str; 8] = [
    "timeout",
    "network",
    "connection",
    "socket",
    "econnreset",
    "enotfound",
    "econnrefused",
    "etimedout",
];

/// Case-insensitive match against [`TRANSIENT_SIGNATURES`].
pub fn matches_transient_signature(message: &str) -> bool {
    let lower = message.to_ascii_lowercase();
    TRANSIENT_SIGNATURES.iter().any(|sig| lower.contains(sig))
}

/// A failed read or write against the store.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StorageError {
    /// The backend may succeed if asked again (dropped connection, pool
    /// exhaustion, serialization conflict).
    #[error("transient storage failure: {0}")]
    Transient(String),

    /// Retrying will not help (constraint violation, bad data, schema).
    #[error("storage failure: {0}")]
    Permanent(String),
}

impl StorageError {
    pub fn is_transient(&self) -> bool {
        matches!(self, StorageError::Transient(_))
    }
}

/// SQLSTATE codes worth retrying: connection exceptions (class 08),
/// serialization failure, deadlock, too many connections, and server
/// shutdown/crash.
fn is_transient_sqlstate(code: &str) -> bool {
    code.starts_with("08") || matches!(code, "40001" | "40P01" | "53300" | "57P01" | "57P02" | "57P03")
}

impl From<sqlx::Error> for StorageError {
    fn from(err: sqlx::Error) -> Self {
        let transient = match &err {
            sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::WorkerCrashed => true,
            sqlx::Error::Database(db) => db.code().is_some_and(|code| is_transient_sqlstate(&code)),
            sqlx::Error::Protocol(message) => matches_transient_signature(message),
            _ => false,
        };
        if transient {
            StorageError::Transient(err.to_string())
        } else {
            StorageError::Permanent(err.to_string())
        }
    }
}

/// Upsert-only persistence for normalized records.
///
/// Implementations must be idempotent per natural key: writing the same
/// record twice leaves one row, and a later write only replaces the
/// record's volatile fields.
#[async_trait]
pub trait EventStore: Send + Sync {
    /// The most recent reading for `condition_id` observed before `before`.
    async fn previous_market_data(
        &self,
        condition_id: &str,
        before: OffsetDateTime,
    ) -> Result<Option<MarketDataRecord>, StorageError>;

    async fn upsert_market_data(&self, record: &MarketDataRecord) -> Result<(), StorageError>;

    async fn upsert_transaction(&self, record: &TransactionRecord) -> Result<(), StorageError>;

    async fn find_position(&self, id: &str) -> Result<Option<PositionRecord>, StorageError>;

    async fn upsert_position(&self, record: &PositionRecord) -> Result<(), StorageError>;

    async fn upsert_condition(&self, record: &ConditionRecord) -> Result<(), StorageError>;
}
