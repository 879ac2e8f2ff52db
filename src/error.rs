use thiserror::Error;

/// Local file persistence failure. Reported to the caller for settings,
/// bookmarks and vault writes; swallowed-and-logged for history.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum VaultError {
    /// No usable key material — the `.key` file could neither be read nor
    /// created. Credential features are disabled, not crashed.
    #[error("encryption unavailable: {0}")]
    Unavailable(String),
    /// AEAD rejected the ciphertext: key changed or data corrupt. Never
    /// yields wrong plaintext silently.
    #[error("decryption failed: key mismatch or corrupt ciphertext")]
    Decryption,
    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("not connected — login first")]
    NotConnected,
    /// Invalid credentials or an identity-provider rejection. Local stores
    /// are never altered by auth failure.
    #[error("auth failed: {0}")]
    Auth(String),
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("remote returned {status}: {message}")]
    Remote { status: u16, message: String },
}
