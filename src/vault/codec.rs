//! Maps typed payloads to and from their encrypted-at-rest bytes.
//!
//! A payload is serialized to canonical JSON, then sealed with
//! `crypto::encrypt`.  Body shapes per kind:
//!
//! ```text
//! credential  {"login", "password"}
//! text        {"content"}
//! card        {"card_number", "card_holder", "expiry_date", "cvv"}
//! file        {"file_name", "data": base64}
//! ```
//!
//! File bytes are base64-encoded inside the JSON so raw binary survives
//! the structured encoding.  Decoding is strict: a body that does not
//! match the expected kind exactly fails with `DecodeFailure` and no
//! payload is produced.

use std::mem::take;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use super::payload::Payload;
use super::record::RecordKind;
use crate::crypto::{decrypt, encrypt};
use crate::errors::{LockboxError, Result};

#[derive(Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
#[serde(deny_unknown_fields)]
struct CredentialBody {
    login: String,
    password: String,
}

#[derive(Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
#[serde(deny_unknown_fields)]
struct TextBody {
    content: String,
}

#[derive(Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
#[serde(deny_unknown_fields)]
struct CardBody {
    card_number: String,
    card_holder: String,
    expiry_date: String,
    cvv: String,
}

#[derive(Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
#[serde(deny_unknown_fields)]
struct FileBody {
    file_name: String,
    data: String,
}

/// Serialize and encrypt `payload` under `key`.
pub fn encrypt_payload(payload: &Payload, key: &[u8]) -> Result<Vec<u8>> {
    let json = to_json(payload)?;
    encrypt(&json, key)
}

/// Decrypt `ciphertext` under `key` and decode it as a `kind` payload.
pub fn decrypt_payload(ciphertext: &[u8], kind: RecordKind, key: &[u8]) -> Result<Payload> {
    let json = Zeroizing::new(decrypt(ciphertext, key)?);
    from_json(&json, kind)
}

fn to_json(payload: &Payload) -> Result<Zeroizing<Vec<u8>>> {
    let encoded = match payload {
        Payload::Credential { login, password } => serde_json::to_vec(&CredentialBody {
            login: login.clone(),
            password: password.clone(),
        }),
        Payload::Text { body } => serde_json::to_vec(&TextBody {
            content: body.clone(),
        }),
        Payload::Card {
            number,
            holder,
            expiry,
            cvv,
        } => serde_json::to_vec(&CardBody {
            card_number: number.clone(),
            card_holder: holder.clone(),
            expiry_date: expiry.clone(),
            cvv: cvv.clone(),
        }),
        Payload::File { filename, bytes } => serde_json::to_vec(&FileBody {
            file_name: filename.clone(),
            data: BASE64.encode(bytes),
        }),
    };

    encoded
        .map(Zeroizing::new)
        .map_err(|e| LockboxError::SerializationError(format!("{} payload: {e}", payload.kind())))
}

fn from_json(json: &[u8], kind: RecordKind) -> Result<Payload> {
    let malformed = |e: serde_json::Error| LockboxError::DecodeFailure(format!("{kind} payload: {e}"));

    match kind {
        RecordKind::Credential => {
            let mut body: CredentialBody = serde_json::from_slice(json).map_err(malformed)?;
            Ok(Payload::Credential {
                login: take(&mut body.login),
                password: take(&mut body.password),
            })
        }
        RecordKind::Text => {
            let mut body: TextBody = serde_json::from_slice(json).map_err(malformed)?;
            Ok(Payload::Text {
                body: take(&mut body.content),
            })
        }
        RecordKind::Card => {
            let mut body: CardBody = serde_json::from_slice(json).map_err(malformed)?;
            Ok(Payload::Card {
                number: take(&mut body.card_number),
                holder: take(&mut body.card_holder),
                expiry: take(&mut body.expiry_date),
                cvv: take(&mut body.cvv),
            })
        }
        RecordKind::File => {
            let mut body: FileBody = serde_json::from_slice(json).map_err(malformed)?;
            let bytes = BASE64.decode(body.data.as_bytes()).map_err(|e| {
                LockboxError::DecodeFailure(format!("file payload data is not base64: {e}"))
            })?;
            Ok(Payload::File {
                filename: take(&mut body.file_name),
                bytes,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: [u8; 32] = [0x42; 32];

    #[test]
    fn text_body_uses_content_field() {
        let json = to_json(&Payload::Text { body: "hi".into() }).unwrap();
        assert_eq!(json.as_slice(), br#"{"content":"hi"}"#);
    }

    #[test]
    fn file_body_is_base64_wrapped() {
        let json = to_json(&Payload::File {
            filename: "a.bin".into(),
            bytes: vec![0xFF, 0x00, 0x10],
        })
        .unwrap();
        assert_eq!(json.as_slice(), br#"{"file_name":"a.bin","data":"/wAQ"}"#);
    }

    #[test]
    fn decoding_under_wrong_kind_fails() {
        let blob = encrypt_payload(&Payload::Text { body: "hi".into() }, &KEY).unwrap();
        let err = decrypt_payload(&blob, RecordKind::Card, &KEY).unwrap_err();
        assert!(matches!(err, LockboxError::DecodeFailure(_)));
    }

    #[test]
    fn extra_fields_are_a_structural_mismatch() {
        let blob = encrypt(br#"{"content":"hi","extra":1}"#, &KEY).unwrap();
        let err = decrypt_payload(&blob, RecordKind::Text, &KEY).unwrap_err();
        assert!(matches!(err, LockboxError::DecodeFailure(_)));
    }

    #[test]
    fn file_with_invalid_base64_fails() {
        let blob = encrypt(br#"{"file_name":"x","data":"***"}"#, &KEY).unwrap();
        let err = decrypt_payload(&blob, RecordKind::File, &KEY).unwrap_err();
        assert!(matches!(err, LockboxError::DecodeFailure(_)));
    }

    #[test]
    fn non_json_plaintext_fails() {
        let blob = encrypt(b"\x00\x01 not json", &KEY).unwrap();
        let err = decrypt_payload(&blob, RecordKind::Credential, &KEY).unwrap_err();
        assert!(matches!(err, LockboxError::DecodeFailure(_)));
    }

    #[test]
    fn crypto_errors_pass_through() {
        let blob = encrypt_payload(&Payload::Text { body: "hi".into() }, &KEY).unwrap();
        let err = decrypt_payload(&blob, RecordKind::Text, &[0x43; 32]).unwrap_err();
        assert!(matches!(err, LockboxError::InvalidData));
    }
}
