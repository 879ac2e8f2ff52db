use std::path::PathBuf;

use chrono::{SecondsFormat, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::write_json_atomic;

/// One visited page. Immutable once created — repeated visits to the same
/// URL create separate entries (a log, not a set).
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct HistoryEntry {
    pub url: String,
    pub title: String,
    /// RFC 3339 UTC, millisecond precision — lexicographic order is
    /// chronological order.
    pub timestamp: String,
    /// Human-readable form shown in the history panel.
    pub visited: String,
}

/// Append-only visit log backed by `history.json`. History loss is non-fatal
/// to the browsing session, so persistence failures are logged, not returned.
pub struct HistoryStore {
    path: PathBuf,
    entries: Mutex<Vec<HistoryEntry>>,
}

impl HistoryStore {
    pub fn open(data_dir: &std::path::Path) -> Self {
        let path = data_dir.join("history.json");
        let entries = match std::fs::read_to_string(&path) {
            Ok(data) => match serde_json::from_str(&data) {
                Ok(entries) => entries,
                Err(e) => {
                    tracing::warn!("history.json corrupt, starting empty: {}", e);
                    Vec::new()
                }
            },
            Err(_) => Vec::new(),
        };
        HistoryStore {
            path,
            entries: Mutex::new(entries),
        }
    }

    /// Record a visit. Internal and non-content URLs (anything that is not
    /// http/https) are skipped. Fire-and-forget: never fails.
    pub fn add_entry(&self, url: &str, title: &str) {
        match url::Url::parse(url) {
            Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => {}
            _ => {
                tracing::debug!("history: skipping non-content url {}", url);
                return;
            }
        }
        let now = Utc::now();
        let entry = HistoryEntry {
            url: url.to_string(),
            title: title.to_string(),
            timestamp: now.to_rfc3339_opts(SecondsFormat::Millis, true),
            visited: now.format("%Y-%m-%d %H:%M").to_string(),
        };
        let mut entries = self.entries.lock();
        entries.push(entry);
        if let Err(e) = write_json_atomic(&self.path, &*entries) {
            tracing::warn!("history: persist failed: {}", e);
        }
    }

    /// Most recent visits first, at most `limit`. Returns a snapshot copy —
    /// caller mutation never touches the store.
    pub fn get_recent(&self, limit: usize) -> Vec<HistoryEntry> {
        let entries = self.entries.lock();
        let mut recent = entries.clone();
        // stable ascending sort then reverse: ties come back newest-insert first
        recent.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
        recent.reverse();
        recent.truncate(limit);
        recent
    }

    /// Snapshot of the full log in insertion order (what sync pushes).
    pub fn all(&self) -> Vec<HistoryEntry> {
        self.entries.lock().clone()
    }

    /// Discard everything. After this returns, no entry is readable from
    /// this store, including from other threads.
    pub fn clear(&self) {
        let mut entries = self.entries.lock();
        entries.clear();
        if let Err(e) = write_json_atomic(&self.path, &*entries) {
            tracing::warn!("history: persist after clear failed: {}", e);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}
