pub mod remote;

use parking_lot::Mutex;
use serde::Serialize;

use crate::bookmarks::Bookmark;
use crate::error::SyncError;
use crate::history::HistoryEntry;
use crate::vault::PasswordEntry;
use remote::{AuthSession, RemoteStore, SyncConfig};

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub enum SyncStatus {
    Disconnected,
    Authenticating,
    Connected,
    Syncing,
}

/// Best-effort mirror of the local stores to the remote document store.
///
/// Local stores are the source of truth; every `sync_now` overwrites the
/// remote collections wholesale. No diffing, no offline queue, no conflict
/// detection — two devices syncing concurrently resolve last-writer-wins,
/// silently. A failed push is reported once and retried only when the user
/// asks. Auth failure never blocks or alters the local stores.
pub struct SyncClient {
    remote: RemoteStore,
    session: Mutex<Option<AuthSession>>,
    status: Mutex<SyncStatus>,
}

impl SyncClient {
    pub fn new(config: SyncConfig) -> Result<Self, SyncError> {
        Ok(SyncClient {
            remote: RemoteStore::new(config)?,
            session: Mutex::new(None),
            status: Mutex::new(SyncStatus::Disconnected),
        })
    }

    pub fn status(&self) -> SyncStatus {
        self.status.lock().clone()
    }

    pub fn is_connected(&self) -> bool {
        self.session.lock().is_some()
    }

    /// Create a remote account. A successful registration also signs in,
    /// binding the new user id as the sync namespace.
    pub async fn register(&self, email: &str, password: &str) -> Result<(), SyncError> {
        *self.status.lock() = SyncStatus::Authenticating;
        match self.remote.sign_up(email, password).await {
            Ok(session) => {
                self.connect(session);
                Ok(())
            }
            Err(e) => {
                self.disconnect();
                Err(e)
            }
        }
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<(), SyncError> {
        *self.status.lock() = SyncStatus::Authenticating;
        match self.remote.sign_in(email, password).await {
            Ok(session) => {
                self.connect(session);
                Ok(())
            }
            Err(e) => {
                self.disconnect();
                Err(e)
            }
        }
    }

    /// Back to an anonymous, disconnected identity. Remote data is left in
    /// place.
    pub fn logout(&self) {
        self.disconnect();
        tracing::info!("sync: logged out");
    }

    /// Push whole-document overwrites of history, bookmarks and passwords
    /// (already ciphertext) to `users/{uid}/...`. Requires a prior login.
    pub async fn sync_now(
        &self,
        history: &[HistoryEntry],
        bookmarks: &[Bookmark],
        passwords: &[PasswordEntry],
    ) -> Result<(), SyncError> {
        let session = self.require_session()?;
        *self.status.lock() = SyncStatus::Syncing;

        let result = async {
            self.remote.put_document(&session, "history", history).await?;
            self.remote
                .put_document(&session, "bookmarks", bookmarks)
                .await?;
            self.remote
                .put_document(&session, "passwords", passwords)
                .await?;
            Ok(())
        }
        .await;

        // back to Connected either way — a failed push is reported once and
        // only retried when the caller asks again
        *self.status.lock() = SyncStatus::Connected;
        match &result {
            Ok(()) => tracing::info!(
                "sync: pushed {} history, {} bookmarks, {} passwords",
                history.len(),
                bookmarks.len(),
                passwords.len()
            ),
            Err(e) => tracing::warn!("sync: push failed: {}", e),
        }
        result
    }

    pub async fn fetch_history(&self) -> Result<Vec<HistoryEntry>, SyncError> {
        let session = self.require_session()?;
        Ok(self
            .remote
            .get_document(&session, "history")
            .await?
            .unwrap_or_default())
    }

    pub async fn fetch_bookmarks(&self) -> Result<Vec<Bookmark>, SyncError> {
        let session = self.require_session()?;
        Ok(self
            .remote
            .get_document(&session, "bookmarks")
            .await?
            .unwrap_or_default())
    }

    /// Remote password entries, still ciphertext — only a local vault with
    /// the matching key file can read them.
    pub async fn fetch_passwords(&self) -> Result<Vec<PasswordEntry>, SyncError> {
        let session = self.require_session()?;
        Ok(self
            .remote
            .get_document(&session, "passwords")
            .await?
            .unwrap_or_default())
    }

    pub async fn set_sync_enabled(&self, enabled: bool) -> Result<(), SyncError> {
        let session = self.require_session()?;
        self.remote
            .put_document(&session, "sync_enabled", &enabled)
            .await
    }

    pub async fn sync_enabled(&self) -> Result<bool, SyncError> {
        let session = self.require_session()?;
        Ok(self
            .remote
            .get_document(&session, "sync_enabled")
            .await?
            .unwrap_or(false))
    }

    fn connect(&self, session: AuthSession) {
        tracing::info!("sync: connected as {}", session.user_id);
        *self.session.lock() = Some(session);
        *self.status.lock() = SyncStatus::Connected;
    }

    fn disconnect(&self) {
        *self.session.lock() = None;
        *self.status.lock() = SyncStatus::Disconnected;
    }

    // cloned out so no lock is held across an await
    fn require_session(&self) -> Result<AuthSession, SyncError> {
        self.session.lock().clone().ok_or(SyncError::NotConnected)
    }
}
