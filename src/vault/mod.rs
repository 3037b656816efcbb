//! Vault module: typed secrets and their encrypted forms.
//!
//! This module provides:
//! - `SecretRecord` and `RecordKind` (`record`)
//! - The `Payload` sum type (`payload`)
//! - Payload encryption and decryption (`codec`)
//! - The HMAC-protected local record cache (`cache`)

pub mod cache;
pub mod codec;
pub mod payload;
pub mod record;

// Re-export the most commonly used items.
pub use cache::LocalCache;
pub use codec::{decrypt_payload, encrypt_payload};
pub use payload::Payload;
pub use record::{RecordKind, SecretRecord};
