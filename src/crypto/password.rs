//! Master password hashing for local verification.
//!
//! The verification hash lets the client confirm a typed password
//! without touching the network.  It uses its own fresh salt, unrelated
//! to the key-derivation salt, so the stored hash reveals nothing about
//! the encryption key.
//!
//! Encoded form: `base64( salt(16) || Argon2id(password, salt)(32) )`

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use subtle::ConstantTimeEq;
use zeroize::Zeroize;

use super::kdf::{derive_key, generate_salt, KEY_LEN, SALT_LEN};
use crate::errors::Result;

/// Hash `password` under a fresh random salt.
pub fn hash_password(password: &[u8]) -> Result<String> {
    let salt = generate_salt();
    let mut hash = derive_key(password, &salt)?;

    let mut salt_and_hash = Vec::with_capacity(SALT_LEN + KEY_LEN);
    salt_and_hash.extend_from_slice(&salt);
    salt_and_hash.extend_from_slice(&hash);
    hash.zeroize();

    Ok(BASE64.encode(salt_and_hash))
}

/// Check `password` against an encoded hash from `hash_password`.
///
/// Never fails: a malformed or truncated encoding simply returns `false`.
pub fn verify_password(password: &[u8], encoded: &str) -> bool {
    let Ok(salt_and_hash) = BASE64.decode(encoded.trim()) else {
        return false;
    };

    if salt_and_hash.len() < SALT_LEN + KEY_LEN {
        return false;
    }

    let (salt, stored) = salt_and_hash.split_at(SALT_LEN);

    let Ok(mut computed) = derive_key(password, salt) else {
        return false;
    };

    let matches: bool = computed.as_slice().ct_eq(stored).into();
    computed.zeroize();
    matches
}
