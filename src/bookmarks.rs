use std::path::PathBuf;

use chrono::{SecondsFormat, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::error::PersistenceError;
use crate::write_json_atomic;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Bookmark {
    pub url: String,
    pub title: String,
    pub added: String,
}

/// Saved pages backed by `bookmarks.json`. The url acts as the removal key
/// but is not enforced unique on insert — duplicates are permitted.
pub struct BookmarkStore {
    path: PathBuf,
    entries: Mutex<Vec<Bookmark>>,
}

impl BookmarkStore {
    pub fn open(data_dir: &std::path::Path) -> Self {
        let path = data_dir.join("bookmarks.json");
        let entries = match std::fs::read_to_string(&path) {
            Ok(data) => match serde_json::from_str(&data) {
                Ok(entries) => entries,
                Err(e) => {
                    tracing::warn!("bookmarks.json corrupt, starting empty: {}", e);
                    Vec::new()
                }
            },
            Err(_) => Vec::new(),
        };
        BookmarkStore {
            path,
            entries: Mutex::new(entries),
        }
    }

    /// Append unconditionally — duplicate urls allowed.
    pub fn add_bookmark(&self, url: &str, title: &str) -> Result<(), PersistenceError> {
        let mut entries = self.entries.lock();
        entries.push(Bookmark {
            url: url.to_string(),
            title: title.to_string(),
            added: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        });
        write_json_atomic(&self.path, &*entries)
    }

    /// Remove every entry whose url matches exactly. String equality — no
    /// normalization of trailing slashes or scheme case. No-op when nothing
    /// matches.
    pub fn remove_bookmark(&self, url: &str) -> Result<(), PersistenceError> {
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|b| b.url != url);
        if entries.len() == before {
            return Ok(());
        }
        write_json_atomic(&self.path, &*entries)
    }

    /// All bookmarks in insertion order (snapshot copy).
    pub fn list(&self) -> Vec<Bookmark> {
        self.entries.lock().clone()
    }
}
