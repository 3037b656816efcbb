//! Integration tests for payload encryption and the record model.

use lockbox::errors::LockboxError;
use lockbox::vault::{decrypt_payload, encrypt_payload, Payload, RecordKind, SecretRecord};

const KEY: [u8; 32] = [0x42; 32];

fn samples() -> Vec<Payload> {
    vec![
        Payload::Credential {
            login: "alice@example.com".into(),
            password: "p@ss w0rd \u{1F511}".into(),
        },
        Payload::Text {
            body: "line one\nline two\n".into(),
        },
        Payload::Card {
            number: "4111 1111 1111 1111".into(),
            holder: "ALICE EXAMPLE".into(),
            expiry: "12/29".into(),
            cvv: "123".into(),
        },
        Payload::File {
            filename: "id_ed25519".into(),
            bytes: (0u8..=255).collect(),
        },
        Payload::File {
            filename: "empty".into(),
            bytes: Vec::new(),
        },
    ]
}

#[test]
fn every_kind_round_trips() {
    for payload in samples() {
        let blob = encrypt_payload(&payload, &KEY).unwrap();
        let back = decrypt_payload(&blob, payload.kind(), &KEY).unwrap();
        assert_eq!(back, payload, "{:?}", payload.kind());
    }
}

#[test]
fn decoding_as_another_kind_fails_cleanly() {
    for payload in samples() {
        let blob = encrypt_payload(&payload, &KEY).unwrap();
        for kind in RecordKind::ALL {
            if kind == payload.kind() {
                continue;
            }
            let err = decrypt_payload(&blob, kind, &KEY).unwrap_err();
            assert!(
                matches!(err, LockboxError::DecodeFailure(_)),
                "{:?} as {kind:?}: {err:?}",
                payload.kind()
            );
        }
    }
}

#[test]
fn wrong_key_is_invalid_data_not_decode_failure() {
    let blob = encrypt_payload(&samples()[0], &KEY).unwrap();
    let err = decrypt_payload(&blob, RecordKind::Credential, &[0x43; 32]).unwrap_err();
    assert!(matches!(err, LockboxError::InvalidData));
}

#[test]
fn record_json_carries_only_ciphertext() {
    let payload = Payload::Credential {
        login: "bob".into(),
        password: "hunter2-unique".into(),
    };
    let blob = encrypt_payload(&payload, &KEY).unwrap();
    let mut record = SecretRecord::new(RecordKind::Credential, "Mail", "work", blob.clone()).unwrap();
    record.plaintext = Some(payload);

    let json = serde_json::to_string(&record).unwrap();
    assert!(json.contains("\"type\":\"login_password\""));
    assert!(!json.contains("hunter2-unique"));

    let back: SecretRecord = serde_json::from_str(&json).unwrap();
    assert_eq!(back.ciphertext, blob);
    assert!(back.plaintext.is_none());
    assert_eq!(
        decrypt_payload(&back.ciphertext, back.kind, &KEY).unwrap(),
        Payload::Credential {
            login: "bob".into(),
            password: "hunter2-unique".into(),
        }
    );
}

#[test]
fn record_names_are_bounded() {
    assert!(SecretRecord::new(RecordKind::Text, "", "", vec![]).is_err());
    assert!(SecretRecord::new(RecordKind::Text, &"n".repeat(101), "", vec![]).is_err());
    assert!(SecretRecord::new(RecordKind::Text, &"n".repeat(100), "", vec![]).is_ok());
}
