//! Password-based key derivation using Argon2id.
//!
//! The parameters are fixed.  Every record ever written under a user's
//! salt was encrypted with a key from these exact settings, so changing
//! them would make existing records unreadable.

use argon2::{Algorithm, Argon2, Params, Version};
use rand::RngCore;

use crate::errors::{LockboxError, Result};

/// Length of a salt in bytes (128 bits).
pub const SALT_LEN: usize = 16;

/// Length of the derived key in bytes (256 bits, for AES-256).
pub const KEY_LEN: usize = 32;

/// Argon2id memory cost in KiB (64 MiB).
pub const MEMORY_KIB: u32 = 64 * 1024;

/// Argon2id iteration count.
pub const ITERATIONS: u32 = 1;

/// Argon2id parallelism lanes.
pub const PARALLELISM: u32 = 4;

/// Derive a 32-byte key from a password and salt using Argon2id.
///
/// Deterministic: the same password and salt always yield the same key.
pub fn derive_key(password: &[u8], salt: &[u8]) -> Result<[u8; KEY_LEN]> {
    let params = Params::new(MEMORY_KIB, ITERATIONS, PARALLELISM, Some(KEY_LEN))
        .map_err(|e| LockboxError::KeyDerivationFailed(format!("invalid Argon2 params: {e}")))?;

    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

    let mut key = [0u8; KEY_LEN];
    argon2
        .hash_password_into(password, salt, &mut key)
        .map_err(|e| LockboxError::KeyDerivationFailed(format!("Argon2id hashing failed: {e}")))?;

    Ok(key)
}

/// Generate a cryptographically random 16-byte salt.
pub fn generate_salt() -> [u8; SALT_LEN] {
    let mut salt = [0u8; SALT_LEN];
    rand::rng().fill_bytes(&mut salt);
    salt
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn salts_are_random() {
        assert_ne!(generate_salt(), generate_salt());
    }

    #[test]
    fn too_short_salt_is_rejected() {
        // Argon2 requires at least 8 bytes of salt.
        let result = derive_key(b"password", b"abc");
        assert!(matches!(result, Err(LockboxError::KeyDerivationFailed(_))));
    }
}
