//! `SecretRecord` and `RecordKind`: the unit of storage and sync.
//!
//! A record carries its payload only as ciphertext.  The decrypted
//! payload may ride along in memory (`plaintext`) but is skipped by serde,
//! so it can never reach the transport or the cache file.
//!
//! Wire shape (JSON):
//!
//! ```text
//! {id, user_id, type, name, encrypted_data: base64, metadata, created_at, updated_at}
//! ```

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::payload::Payload;
use crate::errors::{LockboxError, Result};

/// Maximum record name length, in characters.
pub const MAX_NAME_LEN: usize = 100;

/// The closed set of secret kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RecordKind {
    #[serde(rename = "login_password")]
    Credential,
    #[serde(rename = "text_data")]
    Text,
    #[serde(rename = "card_data")]
    Card,
    #[serde(rename = "binary_data")]
    File,
}

impl RecordKind {
    /// All kinds, in display order.
    pub const ALL: [RecordKind; 4] = [Self::Credential, Self::Text, Self::Card, Self::File];

    /// The tag used on the wire.
    pub fn wire_name(self) -> &'static str {
        match self {
            Self::Credential => "login_password",
            Self::Text => "text_data",
            Self::Card => "card_data",
            Self::File => "binary_data",
        }
    }

    /// Short human-facing label.
    pub fn label(self) -> &'static str {
        match self {
            Self::Credential => "credential",
            Self::Text => "text",
            Self::Card => "card",
            Self::File => "file",
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for RecordKind {
    type Err = LockboxError;

    /// Accepts the wire tag or the short label (case-insensitive).
    fn from_str(s: &str) -> Result<Self> {
        let lowered = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|k| k.wire_name() == lowered || k.label() == lowered)
            .ok_or_else(|| LockboxError::DecodeFailure(format!("unknown record kind '{s}'")))
    }
}

/// A single secret as stored locally and remotely.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SecretRecord {
    /// 0 = not yet assigned by the server, > 0 = server identity,
    /// < 0 = local-only record that never reaches the server.
    pub id: i64,

    /// Server-side owner.  0 when unknown.
    #[serde(rename = "user_id", default)]
    pub owner_id: i64,

    /// Determines how the decrypted payload is structured.
    #[serde(rename = "type")]
    pub kind: RecordKind,

    /// Display name, 1–100 characters.
    pub name: String,

    /// `nonce(12) || AES-256-GCM(payload JSON)`, base64 in JSON.
    #[serde(
        rename = "encrypted_data",
        default,
        serialize_with = "base64_encode",
        deserialize_with = "base64_decode"
    )]
    pub ciphertext: Vec<u8>,

    /// Decrypted payload, in memory only.
    #[serde(skip)]
    pub plaintext: Option<Payload>,

    /// Free-form, unencrypted annotation.
    #[serde(default)]
    pub metadata: String,

    pub created_at: DateTime<Utc>,

    /// Sole conflict tie-breaker.  Never moves backwards for a record.
    pub updated_at: DateTime<Utc>,
}

impl SecretRecord {
    /// Build a new, not-yet-synced record around an encrypted payload.
    pub fn new(kind: RecordKind, name: &str, metadata: &str, ciphertext: Vec<u8>) -> Result<Self> {
        validate_name(name)?;
        let now = Utc::now();
        Ok(Self {
            id: 0,
            owner_id: 0,
            kind,
            name: name.to_string(),
            ciphertext,
            plaintext: None,
            metadata: metadata.to_string(),
            created_at: now,
            updated_at: now,
        })
    }

    /// Not yet known to the server.
    pub fn is_new(&self) -> bool {
        self.id == 0
    }

    /// Excluded from server reconciliation.
    pub fn is_local_only(&self) -> bool {
        self.id < 0
    }

    /// Mark the record as written now, never moving `updated_at` backwards.
    pub fn touch(&mut self) {
        self.updated_at = Utc::now().max(self.updated_at);
    }

    /// Drop any decrypted payload held in memory.
    pub fn forget_plaintext(&mut self) {
        self.plaintext = None;
    }
}

/// Validate a record name: 1–100 characters, not only whitespace.
pub fn validate_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(LockboxError::InvalidRecord("name cannot be empty".into()));
    }
    let len = name.chars().count();
    if len > MAX_NAME_LEN {
        return Err(LockboxError::InvalidRecord(format!(
            "name is {len} characters, the limit is {MAX_NAME_LEN}"
        )));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Serde helpers for base64-encoded Vec<u8> fields
// ---------------------------------------------------------------------------

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;

pub(crate) fn base64_encode<S>(data: &[u8], serializer: S) -> std::result::Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    let encoded = BASE64.encode(data);
    serializer.serialize_str(&encoded)
}

/// Decode a base64 string; `null` decodes to an empty buffer.
pub(crate) fn base64_decode<'de, D>(deserializer: D) -> std::result::Result<Vec<u8>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    match Option::<String>::deserialize(deserializer)? {
        Some(s) => BASE64.decode(&s).map_err(serde::de::Error::custom),
        None => Ok(Vec::new()),
    }
}
