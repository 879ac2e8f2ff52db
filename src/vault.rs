use std::path::{Path, PathBuf};

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use chacha20poly1305::aead::generic_array::GenericArray;
use chacha20poly1305::{aead::Aead, ChaCha20Poly1305, KeyInit};
use chrono::{SecondsFormat, Utc};
use parking_lot::Mutex;
use rand::Rng;
use serde::{Deserialize, Serialize};
use zeroize::Zeroize;

use crate::error::VaultError;
use crate::write_json_atomic;

const KEY_FILE: &str = ".key";
const NONCE_LEN: usize = 12;

/// A stored credential. The password field is always ciphertext —
/// base64(nonce || chacha20poly1305 ciphertext) — so `passwords.json` and
/// anything synced from it never carry plaintext.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PasswordEntry {
    pub service: String,
    pub username: String,
    pub password: String,
    pub added: String,
}

/// Encrypted credential store keyed by (service, username).
///
/// The symmetric key lives in `.key` next to `passwords.json`, generated on
/// first use. Losing `.key` makes every stored entry unrecoverable — there is
/// no recovery path, and anyone with filesystem access to the data directory
/// can decrypt the vault. Both are documented, accepted behavior.
pub struct Vault {
    path: PathBuf,
    // None = unavailable, callers must check is_available()
    key: Option<[u8; 32]>,
    unavailable: Option<String>,
    entries: Mutex<Vec<PasswordEntry>>,
}

impl Vault {
    /// Open the vault, loading or generating the key file. Never panics:
    /// when no key can be read or created the vault opens in an unavailable
    /// state and every operation returns `VaultError::Unavailable`.
    pub fn open(data_dir: &Path) -> Self {
        let path = data_dir.join("passwords.json");
        let entries = match std::fs::read_to_string(&path) {
            Ok(data) => match serde_json::from_str(&data) {
                Ok(entries) => entries,
                Err(e) => {
                    tracing::warn!("passwords.json corrupt, starting empty: {}", e);
                    Vec::new()
                }
            },
            Err(_) => Vec::new(),
        };

        let (key, unavailable) = match load_or_create_key(&data_dir.join(KEY_FILE)) {
            Ok(key) => (Some(key), None),
            Err(reason) => {
                tracing::warn!("vault unavailable: {}", reason);
                (None, Some(reason))
            }
        };

        Vault {
            path,
            key,
            unavailable,
            entries: Mutex::new(entries),
        }
    }

    /// Hosts must check this before wiring up credential UI — an unavailable
    /// vault is a disabled feature, not an error dialog.
    pub fn is_available(&self) -> bool {
        self.key.is_some()
    }

    pub fn add_password(
        &self,
        service: &str,
        username: &str,
        plaintext: &str,
    ) -> Result<(), VaultError> {
        let ciphertext = self.encrypt(plaintext)?;
        let mut entries = self.entries.lock();
        entries.push(PasswordEntry {
            service: service.to_string(),
            username: username.to_string(),
            password: ciphertext,
            added: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        });
        write_json_atomic(&self.path, &*entries).map_err(VaultError::from)
    }

    /// Decrypted plaintext of the first matching entry, `None` when no entry
    /// matches.
    pub fn get_password(
        &self,
        service: &str,
        username: &str,
    ) -> Result<Option<String>, VaultError> {
        self.key()?;
        let entries = self.entries.lock();
        let entry = entries
            .iter()
            .find(|e| e.service == service && e.username == username);
        match entry {
            Some(entry) => self.decrypt(&entry.password).map(Some),
            None => Ok(None),
        }
    }

    /// Remove all matching entries. No-op (not an error) when none match.
    pub fn remove_password(&self, service: &str, username: &str) -> Result<(), VaultError> {
        self.key()?;
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|e| !(e.service == service && e.username == username));
        if entries.len() == before {
            return Ok(());
        }
        write_json_atomic(&self.path, &*entries).map_err(VaultError::from)
    }

    /// Ciphertext-at-rest snapshot — this is what sync pushes, so the remote
    /// store never sees plaintext.
    pub fn entries(&self) -> Vec<PasswordEntry> {
        self.entries.lock().clone()
    }

    fn key(&self) -> Result<&[u8; 32], VaultError> {
        self.key.as_ref().ok_or_else(|| {
            VaultError::Unavailable(
                self.unavailable
                    .clone()
                    .unwrap_or_else(|| "no key material".into()),
            )
        })
    }

    fn encrypt(&self, plaintext: &str) -> Result<String, VaultError> {
        let key = self.key()?;
        let mut nonce_bytes = [0u8; NONCE_LEN];
        rand::thread_rng().fill(&mut nonce_bytes);
        let nonce = GenericArray::from_slice(&nonce_bytes);
        let cipher = ChaCha20Poly1305::new(GenericArray::from_slice(key));
        let encrypted = cipher
            .encrypt(nonce, plaintext.as_bytes())
            .map_err(|_| VaultError::Decryption)?;
        let mut blob = Vec::with_capacity(NONCE_LEN + encrypted.len());
        blob.extend_from_slice(&nonce_bytes);
        blob.extend_from_slice(&encrypted);
        Ok(BASE64.encode(blob))
    }

    fn decrypt(&self, ciphertext: &str) -> Result<String, VaultError> {
        let key = self.key()?;
        let blob = BASE64.decode(ciphertext).map_err(|_| VaultError::Decryption)?;
        if blob.len() <= NONCE_LEN {
            return Err(VaultError::Decryption);
        }
        let (nonce_bytes, encrypted) = blob.split_at(NONCE_LEN);
        let nonce = GenericArray::from_slice(nonce_bytes);
        let cipher = ChaCha20Poly1305::new(GenericArray::from_slice(key));
        let decrypted = cipher
            .decrypt(nonce, encrypted)
            .map_err(|_| VaultError::Decryption)?;
        String::from_utf8(decrypted).map_err(|_| VaultError::Decryption)
    }
}

impl Drop for Vault {
    fn drop(&mut self) {
        // zero out key material before dropping
        if let Some(ref mut key) = self.key {
            key.zeroize();
        }
    }
}

fn load_or_create_key(path: &Path) -> Result<[u8; 32], String> {
    match std::fs::read(path) {
        Ok(bytes) => {
            // refuse to overwrite a malformed key file — existing ciphertext
            // would become permanently unreadable
            let bytes: [u8; 32] = bytes
                .try_into()
                .map_err(|_| format!("{} is not a 32-byte key", path.display()))?;
            Ok(bytes)
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            let mut key = [0u8; 32];
            rand::thread_rng().fill(&mut key);
            std::fs::write(path, key).map_err(|e| format!("cannot create key file: {}", e))?;
            Ok(key)
        }
        Err(e) => Err(format!("cannot read key file: {}", e)),
    }
}
