//! The session key and the sub-keys derived from it.
//!
//! The session key is the Argon2id output for the user's master password
//! and persisted salt.  It encrypts record payloads directly.  HKDF-SHA256
//! derives a separate key for the local cache HMAC, so the MAC key and
//! the encryption key are never the same bytes.

use hkdf::Hkdf;
use sha2::Sha256;
use zeroize::Zeroize;

use super::kdf::KEY_LEN;
use crate::errors::{LockboxError, Result};

/// HKDF context string for the cache integrity key.
const CACHE_HMAC_INFO: &[u8] = b"lockbox-cache-hmac";

/// Derive the cache integrity key from the session key.
pub fn derive_cache_hmac_key(session_key: &[u8]) -> Result<[u8; KEY_LEN]> {
    // `salt` is None since the session key already has full entropy.
    let hk = Hkdf::<Sha256>::new(None, session_key);

    let mut okm = [0u8; KEY_LEN];
    hk.expand(CACHE_HMAC_INFO, &mut okm)
        .map_err(|e| LockboxError::KeyDerivationFailed(format!("HKDF expand failed: {e}")))?;

    Ok(okm)
}

/// A 32-byte session key that zeroes its memory when dropped.
///
/// Lives only as long as the unlocked session.  Never persisted.
#[derive(Zeroize)]
#[zeroize(drop)]
pub struct SessionKey {
    bytes: [u8; KEY_LEN],
}

impl SessionKey {
    /// Wrap raw key bytes.
    pub fn new(bytes: [u8; KEY_LEN]) -> Self {
        Self { bytes }
    }

    /// Access the raw key bytes (e.g. to pass to `encrypt`).
    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.bytes
    }

    /// Derive the cache integrity key from this session key.
    pub fn derive_cache_hmac_key(&self) -> Result<[u8; KEY_LEN]> {
        derive_cache_hmac_key(&self.bytes)
    }
}

impl std::fmt::Debug for SessionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SessionKey(**redacted**)")
    }
}
