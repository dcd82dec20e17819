//! Position diff detection between two wallet snapshots.
//!
//! Pure functions only: the wallet tracker takes a snapshot per poll, hands
//! the previous and current set to [`detect_changes`] and renders each
//! change with [`format_notification`].

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use time::OffsetDateTime;

/// Size changes smaller than this are noise.
pub const SIZE_NOISE_THRESHOLD: Decimal = Decimal::from_parts(1, 0, 0, false, 3);

/// One open position at a point in time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionSnapshot {
    pub condition_id: String,
    pub asset: String,
    pub size: Decimal,
    pub avg_price: Decimal,
    pub title: String,
    pub event_slug: String,
    pub outcome: String,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
}

impl PositionSnapshot {
    /// `condition_id:outcome`
    pub fn key(&self) -> String {
        format!("{}:{}", self.condition_id, self.outcome)
    }
}

/// Snapshots keyed by [`PositionSnapshot::key`].
pub type SnapshotSet = BTreeMap<String, PositionSnapshot>;

/// Build a snapshot set. A later entry with the same key replaces an
/// earlier one.
pub fn snapshot_set(positions: impl IntoIterator<Item = PositionSnapshot>) -> SnapshotSet {
    positions
        .into_iter()
        .map(|position| (position.key(), position))
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChangeKind {
    New,
    Closed,
    Buy,
    Sell,
}

impl std::fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChangeKind::New => write!(f, "NEW"),
            ChangeKind::Closed => write!(f, "CLOSED"),
            ChangeKind::Buy => write!(f, "BUY"),
            ChangeKind::Sell => write!(f, "SELL"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionChange {
    pub kind: ChangeKind,
    pub key: String,
    /// The current entry, or the previous one for `Closed`.
    pub position: PositionSnapshot,
    /// The previous entry for `Buy` and `Sell`.
    pub previous: Option<PositionSnapshot>,
    /// Always positive. Equals the full size for `New` and `Closed`.
    pub delta_shares: Decimal,
}

/// Classify every difference between two snapshot sets, ordered by key.
pub fn detect_changes(previous: &SnapshotSet, current: &SnapshotSet) -> Vec<PositionChange> {
    let keys: BTreeSet<&String> = previous.keys().chain(current.keys()).collect();

    keys.into_iter()
        .filter_map(|key| match (previous.get(key), current.get(key)) {
            (None, Some(now)) => Some(PositionChange {
                kind: ChangeKind::New,
                key: key.clone(),
                position: now.clone(),
                previous: None,
                delta_shares: now.size.abs(),
            }),
            (Some(before), None) => Some(PositionChange {
                kind: ChangeKind::Closed,
                key: key.clone(),
                position: before.clone(),
                previous: None,
                delta_shares: before.size.abs(),
            }),
            (Some(before), Some(now)) => {
                let delta = now.size.saturating_sub(before.size);
                if delta.abs() < SIZE_NOISE_THRESHOLD {
                    return None;
                }
                let kind = if delta.is_sign_positive() {
                    ChangeKind::Buy
                } else {
                    ChangeKind::Sell
                };
                Some(PositionChange {
                    kind,
                    key: key.clone(),
                    position: now.clone(),
                    previous: Some(before.clone()),
                    delta_shares: delta.abs(),
                })
            }
            (None, None) => None,
        })
        .collect()
}

/// `0x1234...abcd` for anything longer than ten characters.
pub fn abbreviate_address(address: &str) -> String {
    if address.len() <= 10 {
        return address.to_string();
    }
    match (address.get(..6), address.get(address.len() - 4..)) {
        (Some(head), Some(tail)) => format!("{head}...{tail}"),
        _ => address.to_string(),
    }
}

/// Render one change as a single human-readable line.
pub fn format_notification(change: &PositionChange, wallet_address: &str) -> String {
    let verb = match change.kind {
        ChangeKind::New => "opened",
        ChangeKind::Closed => "closed",
        ChangeKind::Buy => "bought",
        ChangeKind::Sell => "sold",
    };
    format!(
        "[{}] {} {} {} shares of \"{}\" ({})",
        change.kind,
        abbreviate_address(wallet_address),
        verb,
        change.delta_shares.round_dp(2).normalize(),
        change.position.title,
        change.position.outcome,
    )
}
