//! Master password management for one username.
//!
//! Two small files live in the user-private config directory:
//!
//! - `<user>_salt.key`: 16 raw bytes, the key-derivation salt.  Created
//!   once and never replaced; losing or changing it makes every record
//!   encrypted under it unreadable.
//! - `<user>.pwd`: the base64 verification hash from `hash_password`.
//!
//! The derived session key is never written anywhere.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::config::paths::write_private;
use crate::crypto::kdf::{self, SALT_LEN};
use crate::crypto::{hash_password, verify_password, SessionKey};
use crate::errors::{LockboxError, Result};

/// Owns the per-user salt and verification hash on disk.
#[derive(Debug, Clone)]
pub struct MasterKeyManager {
    config_dir: PathBuf,
    username: String,
    salt_path: PathBuf,
    hash_path: PathBuf,
}

impl MasterKeyManager {
    /// Bind a manager to `username` inside `config_dir`.
    pub fn new(config_dir: &Path, username: &str) -> Result<Self> {
        validate_username(username)?;
        Ok(Self {
            config_dir: config_dir.to_path_buf(),
            username: username.to_string(),
            salt_path: config_dir.join(format!("{username}_salt.key")),
            hash_path: config_dir.join(format!("{username}.pwd")),
        })
    }

    /// The bound username.
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Directory holding this user's files.
    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    /// Path of the persisted key-derivation salt.
    pub fn salt_path(&self) -> &Path {
        &self.salt_path
    }

    /// Path of the persisted verification hash.
    pub fn hash_path(&self) -> &Path {
        &self.hash_path
    }

    /// Load the key-derivation salt, creating it on first use.
    ///
    /// Idempotent: an existing salt is always reused.
    pub fn init_salt(&self) -> Result<[u8; SALT_LEN]> {
        if self.salt_path.exists() {
            return self.read_salt();
        }

        let salt = kdf::generate_salt();
        write_private(&self.salt_path, &salt)?;
        info!(user = %self.username, "created key-derivation salt");
        Ok(salt)
    }

    /// Returns `true` once a verification hash has been stored.
    pub fn has_master_password(&self) -> bool {
        self.hash_path.exists()
    }

    /// Store the verification hash for `password`.
    ///
    /// The key-derivation salt is created if missing but never replaced.
    /// Calling this again swaps the verification hash only; records
    /// already encrypted under a different password are not re-encrypted.
    pub fn set_master_password(&self, password: &[u8]) -> Result<()> {
        self.init_salt()?;

        let encoded = hash_password(password)?;
        write_private(&self.hash_path, encoded.as_bytes())?;
        info!(user = %self.username, "stored master password verification hash");
        Ok(())
    }

    /// Check a typed password against the stored verification hash.
    pub fn verify_master_password(&self, password: &[u8]) -> Result<bool> {
        if !self.has_master_password() {
            return Err(LockboxError::MasterPasswordNotSet(self.username.clone()));
        }
        let encoded = fs::read_to_string(&self.hash_path)?;
        Ok(verify_password(password, &encoded))
    }

    /// Derive the session key from `password` and the persisted salt.
    pub fn derive_session_key(&self, password: &[u8]) -> Result<SessionKey> {
        if !self.salt_path.exists() {
            return Err(LockboxError::MasterPasswordNotSet(self.username.clone()));
        }
        let salt = self.read_salt()?;
        let key = kdf::derive_key(password, &salt)?;
        debug!(user = %self.username, "derived session key");
        Ok(SessionKey::new(key))
    }

    fn read_salt(&self) -> Result<[u8; SALT_LEN]> {
        let data = fs::read(&self.salt_path)?;
        data.as_slice()
            .try_into()
            .map_err(|_| LockboxError::InvalidSaltLength(data.len()))
    }
}

/// Validate that a username is usable as a file name prefix.
///
/// Allowed: ASCII letters, digits, underscores, hyphens, periods.
/// Must be non-empty, at most 64 characters, and not start with a period.
pub fn validate_username(username: &str) -> Result<()> {
    if username.is_empty() {
        return Err(LockboxError::UsernameRequired);
    }
    if username.len() > 64 {
        return Err(LockboxError::ConfigError(
            "username cannot exceed 64 characters".into(),
        ));
    }
    if username.starts_with('.')
        || !username
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-' || b == b'.')
    {
        return Err(LockboxError::ConfigError(format!(
            "username '{username}' is invalid — only ASCII letters, digits, underscores, hyphens, and periods are allowed"
        )));
    }
    Ok(())
}
