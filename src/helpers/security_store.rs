/*!
 * User-scoped encryption of stored credentials
 *
 * Credentials are encrypted with AES-256-GCM using a random key that lives
 * in a key file inside the user's configuration directory. Only the
 * encrypted blob (base64 of nonce followed by ciphertext) is written to
 * the settings.
 */

use std::fs;
use std::path::{Path, PathBuf};
use aes_gcm::aead::{Aead, AeadCore, KeyInit, OsRng};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use base64::{Engine as _, engine::general_purpose::STANDARD};
use log::{debug, info};
use rand::RngCore;
use thiserror::Error;

const KEY_LEN: usize = 32;
const NONCE_LEN: usize = 12;

#[derive(Debug, Error)]
pub enum SecurityStoreError {
    #[error("Key file error: {0}")]
    KeyFile(String),

    #[error("Encryption failed")]
    Encrypt,

    #[error("Decryption failed: {0}")]
    Decrypt(String),
}

/// Encrypts and decrypts credential blobs with a user-scoped key
pub struct SecurityStore {
    cipher: Aes256Gcm,
}

impl std::fmt::Debug for SecurityStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecurityStore").finish_non_exhaustive()
    }
}

impl SecurityStore {
    /// Create a store from raw key bytes
    pub fn with_key(key: [u8; KEY_LEN]) -> Self {
        let key = Key::<Aes256Gcm>::from_slice(&key);
        Self {
            cipher: Aes256Gcm::new(key),
        }
    }

    /// Open the key file at `path`, creating a fresh random key if it does not exist
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, SecurityStoreError> {
        let path = path.as_ref();

        if path.exists() {
            let encoded = fs::read_to_string(path)
                .map_err(|e| SecurityStoreError::KeyFile(format!("failed to read {:?}: {}", path, e)))?;
            let bytes = STANDARD
                .decode(encoded.trim())
                .map_err(|e| SecurityStoreError::KeyFile(format!("invalid key encoding: {}", e)))?;
            let key: [u8; KEY_LEN] = bytes
                .try_into()
                .map_err(|_| SecurityStoreError::KeyFile("key has the wrong length".to_string()))?;
            debug!("Loaded credential key from {:?}", path);
            return Ok(Self::with_key(key));
        }

        let mut key = [0u8; KEY_LEN];
        rand::thread_rng().fill_bytes(&mut key);

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .map_err(|e| SecurityStoreError::KeyFile(format!("failed to create {:?}: {}", parent, e)))?;
            }
        }
        fs::write(path, STANDARD.encode(key))
            .map_err(|e| SecurityStoreError::KeyFile(format!("failed to write {:?}: {}", path, e)))?;
        restrict_permissions(path);

        info!("Created new credential key at {:?}", path);
        Ok(Self::with_key(key))
    }

    /// Open the key file in the current user's default location
    pub fn open_default() -> Result<Self, SecurityStoreError> {
        Self::open(default_key_path())
    }

    /// Encrypt a credential into a base64 blob
    pub fn encrypt(&self, plaintext: &str) -> Result<String, SecurityStoreError> {
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let ciphertext = self
            .cipher
            .encrypt(&nonce, plaintext.as_bytes())
            .map_err(|_| SecurityStoreError::Encrypt)?;

        let mut blob = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        blob.extend_from_slice(&nonce);
        blob.extend_from_slice(&ciphertext);
        Ok(STANDARD.encode(blob))
    }

    /// Decrypt a blob produced by `encrypt`
    pub fn decrypt(&self, blob: &str) -> Result<String, SecurityStoreError> {
        let bytes = STANDARD
            .decode(blob.trim())
            .map_err(|e| SecurityStoreError::Decrypt(format!("invalid encoding: {}", e)))?;
        if bytes.len() <= NONCE_LEN {
            return Err(SecurityStoreError::Decrypt("blob too short".to_string()));
        }

        let (nonce, ciphertext) = bytes.split_at(NONCE_LEN);
        let plaintext = self
            .cipher
            .decrypt(Nonce::from_slice(nonce), ciphertext)
            .map_err(|_| SecurityStoreError::Decrypt("authentication failed".to_string()))?;

        String::from_utf8(plaintext).map_err(|e| SecurityStoreError::Decrypt(e.to_string()))
    }
}

/// `$XDG_CONFIG_HOME/playersync/credential.key` (or the platform equivalent)
pub fn default_key_path() -> PathBuf {
    config_dir().join("playersync").join("credential.key")
}

fn config_dir() -> PathBuf {
    if let Some(dir) = std::env::var_os("XDG_CONFIG_HOME") {
        return PathBuf::from(dir);
    }
    if let Some(dir) = std::env::var_os("APPDATA") {
        return PathBuf::from(dir);
    }
    if let Some(home) = std::env::var_os("HOME") {
        return PathBuf::from(home).join(".config");
    }
    PathBuf::from(".")
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) {
    use std::os::unix::fs::PermissionsExt;
    if let Err(e) = fs::set_permissions(path, fs::Permissions::from_mode(0o600)) {
        log::warn!("Failed to restrict permissions of {:?}: {}", path, e);
    }
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) {}
