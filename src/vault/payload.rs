//! Decrypted secret payloads.
//!
//! `Payload` is a closed sum type: exactly one variant per `RecordKind`,
//! matched exhaustively wherever payloads are encoded, decoded, or shown.
//! Payload memory is wiped when the value is dropped.

use std::fmt;

use zeroize::{Zeroize, ZeroizeOnDrop};

use super::record::RecordKind;

/// The plaintext content of a secret.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub enum Payload {
    /// A login/password pair.
    Credential { login: String, password: String },

    /// Free text.
    Text { body: String },

    /// Payment card fields.
    Card {
        number: String,
        holder: String,
        expiry: String,
        cvv: String,
    },

    /// An arbitrary binary file.
    File { filename: String, bytes: Vec<u8> },
}

impl Payload {
    /// The record kind this payload belongs to.
    pub fn kind(&self) -> RecordKind {
        match self {
            Self::Credential { .. } => RecordKind::Credential,
            Self::Text { .. } => RecordKind::Text,
            Self::Card { .. } => RecordKind::Card,
            Self::File { .. } => RecordKind::File,
        }
    }
}

// Secrets must never end up in logs through `{:?}`.
impl fmt::Debug for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File { filename, bytes } => f
                .debug_struct("File")
                .field("filename", filename)
                .field("len", &bytes.len())
                .finish(),
            other => write!(f, "{}(**redacted**)", other.kind()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_matches_variant() {
        let text = Payload::Text { body: "x".into() };
        let file = Payload::File {
            filename: "a.bin".into(),
            bytes: vec![0, 1],
        };
        assert_eq!(text.kind(), RecordKind::Text);
        assert_eq!(file.kind(), RecordKind::File);
    }

    #[test]
    fn debug_redacts_secret_fields() {
        let p = Payload::Credential {
            login: "alice".into(),
            password: "s3cr3t".into(),
        };
        let shown = format!("{p:?}");
        assert!(!shown.contains("s3cr3t"));
        assert!(!shown.contains("alice"));

        let card = Payload::Card {
            number: "4111111111111111".into(),
            holder: "A B".into(),
            expiry: "12/30".into(),
            cvv: "123".into(),
        };
        assert!(!format!("{card:?}").contains("4111"));
    }
}
