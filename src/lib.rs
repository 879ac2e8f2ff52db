pub mod bookmarks;
pub mod crash_log;
pub mod error;
pub mod history;
pub mod settings;
pub mod sync;
pub mod vault;

use std::path::{Path, PathBuf};

pub use bookmarks::{Bookmark, BookmarkStore};
pub use error::{PersistenceError, SyncError, VaultError};
pub use history::{HistoryEntry, HistoryStore};
pub use settings::{Settings, SettingsStore};
pub use sync::remote::SyncConfig;
pub use sync::{SyncClient, SyncStatus};
pub use vault::{PasswordEntry, Vault};

/// Everything the browser persists for one user, rooted in a single data
/// directory. Owned by the application root and passed by reference — no
/// global mutable state.
///
/// All stores are safe to call from background worker threads; persistence
/// is synchronous and blocking at the call site. At most one mutation at a
/// time is assumed from the controlling application (cooperative, not
/// enforced).
pub struct Profile {
    pub history: HistoryStore,
    pub bookmarks: BookmarkStore,
    pub vault: Vault,
    pub settings: SettingsStore,
}

impl Profile {
    pub fn open(data_dir: &Path) -> Result<Self, PersistenceError> {
        std::fs::create_dir_all(data_dir)?;
        Ok(Profile {
            history: HistoryStore::open(data_dir),
            bookmarks: BookmarkStore::open(data_dir),
            vault: Vault::open(data_dir),
            settings: SettingsStore::open(data_dir),
        })
    }

    pub fn default_dir() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("com.pixlet.browser")
    }
}

// whole-file rewrite via temp + rename so a failed write never truncates the
// previous contents
pub(crate) fn write_json_atomic<T: serde::Serialize + ?Sized>(
    path: &Path,
    value: &T,
) -> Result<(), PersistenceError> {
    let json = serde_json::to_string_pretty(value)?;
    let tmp = path.with_extension("tmp");
    std::fs::write(&tmp, json)?;
    std::fs::rename(&tmp, path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::{AtomicU64, Ordering};
    static TEST_COUNTER: AtomicU64 = AtomicU64::new(0);

    fn temp_dir() -> PathBuf {
        let n = TEST_COUNTER.fetch_add(1, Ordering::Relaxed);
        let mut p = std::env::temp_dir();
        p.push(format!("pixlet_profile_{}_{}", std::process::id(), n));
        let _ = std::fs::remove_dir_all(&p);
        p
    }

    #[test]
    fn open_creates_the_data_dir_and_all_stores() {
        let dir = temp_dir();
        let profile = Profile::open(&dir).unwrap();
        assert!(dir.exists());
        assert!(profile.vault.is_available());

        profile.history.add_entry("https://a.com", "A");
        profile.bookmarks.add_bookmark("https://a.com", "A").unwrap();
        assert_eq!(profile.history.len(), 1);
        assert_eq!(profile.bookmarks.list().len(), 1);
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn stores_share_one_directory_layout() {
        let dir = temp_dir();
        let profile = Profile::open(&dir).unwrap();
        profile.history.add_entry("https://a.com", "A");
        profile.bookmarks.add_bookmark("https://b.com", "B").unwrap();
        profile.vault.add_password("c.com", "u", "p").unwrap();
        profile
            .settings
            .save_snapshot(&Settings::new(), &[])
            .unwrap();

        assert!(dir.join("history.json").exists());
        assert!(dir.join("bookmarks.json").exists());
        assert!(dir.join("passwords.json").exists());
        assert!(dir.join(".key").exists());
        assert!(dir.join("current.json").exists());
        let _ = std::fs::remove_dir_all(&dir);
    }
}
