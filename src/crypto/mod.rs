//! Cryptographic primitives for Lockbox.
//!
//! This module provides:
//! - AES-256-GCM envelope encryption and decryption (`encryption`)
//! - Argon2id password-based key derivation (`kdf`)
//! - Master password hashing and verification (`password`)
//! - The zeroizing session key and its HKDF sub-keys (`keys`)
//!
//! Nothing here holds state.

pub mod encryption;
pub mod kdf;
pub mod keys;
pub mod password;

// Re-export the most commonly used items so callers can write:
//   use crate::crypto::{encrypt, decrypt, derive_key, ...};
pub use encryption::{decrypt, encrypt};
pub use kdf::{derive_key, generate_salt};
pub use keys::SessionKey;
pub use password::{hash_password, verify_password};
