use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::error::PersistenceError;
use crate::write_json_atomic;

/// Flat option-name → value map owned by the application root and passed by
/// reference — no global settings state.
pub type Settings = BTreeMap<String, String>;

#[derive(Serialize, Deserialize)]
struct CurrentFile {
    settings: Settings,
    saved_at: String,
}

#[derive(Serialize, Deserialize)]
struct SnapshotFile {
    settings: Settings,
    tabs: Vec<String>,
    saved_at: String,
}

/// Settings persistence: dated immutable snapshots plus a mutable
/// `current.json` pointer for fast reload at startup.
///
/// Layout under the data dir:
/// - `current.json` — `{settings, saved_at}`, latest-wins working copy
/// - `<YYYY-MM-DD>/settings_<timestamp>.json` — `{settings, tabs, saved_at}`,
///   one per save event, append-only audit trail
///
/// Both names sort lexicographically in chronological order, which is what
/// makes the fallback scan in [`SettingsStore::load_latest`] work.
pub struct SettingsStore {
    data_dir: PathBuf,
}

impl SettingsStore {
    pub fn open(data_dir: &Path) -> Self {
        SettingsStore {
            data_dir: data_dir.to_path_buf(),
        }
    }

    /// Write a new dated snapshot capturing settings plus open tab URLs, then
    /// update `current.json` to match. Unlike history, a failed write is
    /// always reported to the caller.
    pub fn save_snapshot(
        &self,
        settings: &Settings,
        open_tabs: &[String],
    ) -> Result<(), PersistenceError> {
        let now = Utc::now();
        let saved_at = now.to_rfc3339_opts(SecondsFormat::Millis, true);

        let day_dir = self.data_dir.join(now.format("%Y-%m-%d").to_string());
        std::fs::create_dir_all(&day_dir)?;
        // two saves in the same millisecond get a counter suffix instead of
        // overwriting — snapshots are an append-only audit trail. `_<n>`
        // sorts after `.json`, so the scan still picks the newest save.
        let stamp = now.format("%Y%m%d%H%M%S%3f").to_string();
        let mut snapshot_path = day_dir.join(format!("settings_{}.json", stamp));
        let mut seq = 1u32;
        while snapshot_path.exists() {
            snapshot_path = day_dir.join(format!("settings_{}_{}.json", stamp, seq));
            seq += 1;
        }
        write_json_atomic(
            &snapshot_path,
            &SnapshotFile {
                settings: settings.clone(),
                tabs: open_tabs.to_vec(),
                saved_at: saved_at.clone(),
            },
        )?;

        write_json_atomic(
            &self.data_dir.join("current.json"),
            &CurrentFile {
                settings: settings.clone(),
                saved_at,
            },
        )
    }

    /// Load the most recently saved settings. Prefers `current.json`; when
    /// that is missing or unreadable, falls back to scanning the dated
    /// snapshot folders so a lost or stale pointer is recoverable. `None`
    /// when nothing has ever been saved.
    pub fn load_latest(&self) -> Result<Option<Settings>, PersistenceError> {
        let current = self.data_dir.join("current.json");
        if let Ok(data) = std::fs::read_to_string(&current) {
            match serde_json::from_str::<CurrentFile>(&data) {
                Ok(file) => return Ok(Some(file.settings)),
                Err(e) => tracing::warn!("current.json unreadable, scanning snapshots: {}", e),
            }
        }
        self.scan_snapshots()
    }

    // lexicographically greatest dated folder, then greatest settings_* file
    // inside it — ISO date and timestamp names sort chronologically
    fn scan_snapshots(&self) -> Result<Option<Settings>, PersistenceError> {
        let entries = match std::fs::read_dir(&self.data_dir) {
            Ok(entries) => entries,
            Err(_) => return Ok(None),
        };

        let mut latest_day: Option<String> = None;
        for entry in entries.flatten() {
            if !entry.path().is_dir() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().to_string();
            if chrono::NaiveDate::parse_from_str(&name, "%Y-%m-%d").is_err() {
                continue;
            }
            match latest_day {
                Some(ref d) if name <= *d => {}
                _ => latest_day = Some(name),
            }
        }
        let Some(day) = latest_day else {
            return Ok(None);
        };

        let mut latest_file: Option<PathBuf> = None;
        let mut latest_name = String::new();
        for entry in std::fs::read_dir(self.data_dir.join(&day))?.flatten() {
            let name = entry.file_name().to_string_lossy().to_string();
            if !name.starts_with("settings_") || !name.ends_with(".json") {
                continue;
            }
            if latest_file.is_none() || name > latest_name {
                latest_file = Some(entry.path());
                latest_name = name;
            }
        }
        let Some(path) = latest_file else {
            return Ok(None);
        };

        let data = std::fs::read_to_string(&path)?;
        let file: SnapshotFile = serde_json::from_str(&data)?;
        Ok(Some(file.settings))
    }
}
