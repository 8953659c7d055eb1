use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::store::{KeyValueStore, StoreResult};
use crate::kernel::effect::RecordDraft;

pub const DEFAULT_HISTORY_KEY: &str = "tripkik_history";

/// Persisted summary of one finalized session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub id: i64,
    /// Local time, `HH:MM:SS`.
    pub timestamp: String,
    /// Local date, `DD/MM/YYYY`.
    pub date: String,
    pub score: u8,
    /// Thinking time in seconds with one decimal, e.g. `"1.5"`.
    pub duration_s: String,
    pub ia_reco: u8,
}

impl HistoryRecord {
    pub fn from_draft(draft: &RecordDraft, archived_at: DateTime<Local>) -> Self {
        Self {
            id: draft.id,
            timestamp: archived_at.format("%H:%M:%S").to_string(),
            date: archived_at.format("%d/%m/%Y").to_string(),
            score: draft.score.value(),
            duration_s: format_seconds(draft.response_time_ms),
            ia_reco: draft.recommendation.value(),
        }
    }
}

/// Milliseconds as seconds with one decimal, rounded on the binary value of
/// `ms / 1000` the way `Number.prototype.toFixed(1)` does: 150 ms is `"0.1"`
/// because 0.15 is stored just below the half.
pub fn format_seconds(ms: u64) -> String {
    // Exact binary ties (0.25, 0.75, ...) go up, where `{:.1}` would go to even.
    if ms % 250 == 0 && ms % 500 != 0 {
        let tenths = ms / 100 + 1;
        return format!("{}.{}", tenths / 10, tenths % 10);
    }
    format!("{:.1}", ms as f64 / 1000.0)
}

/// Append-only session log kept as one JSON array under a single key.
///
/// Appends are read-modify-write of the whole array. Two processes sharing
/// the same store can lose each other's records.
pub struct HistoryStore<S> {
    store: S,
    key: String,
}

impl<S: KeyValueStore> HistoryStore<S> {
    pub fn new(store: S) -> Self {
        Self::with_key(store, DEFAULT_HISTORY_KEY)
    }

    pub fn with_key(store: S, key: impl Into<String>) -> Self {
        Self {
            store,
            key: key.into(),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Records in storage (chronological) order.
    pub fn entries(&self) -> StoreResult<Vec<HistoryRecord>> {
        match self.store.get(&self.key)? {
            Some(raw) if !raw.trim().is_empty() => Ok(serde_json::from_str(&raw)?),
            _ => Ok(Vec::new()),
        }
    }

    /// Records most recent first, for display.
    pub fn list(&self) -> StoreResult<Vec<HistoryRecord>> {
        let mut records = self.entries()?;
        records.reverse();
        Ok(records)
    }

    pub fn append(&self, record: HistoryRecord) -> StoreResult<()> {
        let mut records = self.entries()?;
        debug!("Appending history record {} ({} existing)", record.id, records.len());
        records.push(record);
        let raw = serde_json::to_string(&records)?;
        self.store.set(&self.key, &raw)
    }
}
