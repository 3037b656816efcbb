use std::path::PathBuf;
use thiserror::Error;

/// All errors that can occur in Lockbox.
#[derive(Debug, Error)]
pub enum LockboxError {
    // --- Crypto errors ---
    #[error("Invalid key length — expected 32 bytes, got {0}")]
    InvalidKeyLength(usize),

    #[error("Encrypted data is too short to contain a nonce")]
    DataTooShort,

    #[error("Decryption failed — wrong key or corrupted data")]
    InvalidData,

    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    #[error("Key derivation failed: {0}")]
    KeyDerivationFailed(String),

    #[error("Payload decode failed: {0}")]
    DecodeFailure(String),

    // --- Master key errors ---
    #[error("Invalid salt length — expected 16 bytes, got {0}")]
    InvalidSaltLength(usize),

    #[error("No username is bound to this session")]
    UsernameRequired,

    #[error("No master password set for '{0}' — run `lockbox init` first")]
    MasterPasswordNotSet(String),

    #[error("Wrong master password")]
    WrongMasterPassword,

    #[error("Session is locked — unlock with the master password first")]
    SessionLocked,

    // --- Record errors ---
    #[error("Invalid record: {0}")]
    InvalidRecord(String),

    #[error("Record {0} not found in the local cache")]
    RecordNotFound(i64),

    #[error("No queued change q{0}; run `lockbox list` to see the queue")]
    QueuedChangeNotFound(usize),

    #[error("Local cache at {0} is corrupted or was tampered with")]
    CacheCorrupted(PathBuf),

    // --- Remote store errors ---
    #[error("Unauthorized — the server rejected the bearer token")]
    Unauthorized,

    #[error("Not found on server: {0}")]
    NotFound(String),

    #[error("Access denied to record {0}")]
    AccessDenied(i64),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Server error: {0}")]
    ServerError(String),

    #[error("Sync finished with {0} failed record(s)")]
    SyncIncomplete(usize),

    // --- Config errors ---
    #[error("Config file error: {0}")]
    ConfigError(String),

    // --- IO errors ---
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // --- Serialization errors ---
    #[error("Serialization error: {0}")]
    SerializationError(String),

    // --- CLI errors ---
    #[error("Command failed: {0}")]
    CommandFailed(String),

    #[error("User cancelled operation")]
    UserCancelled,

    #[error("Password mismatch — passwords do not match")]
    PasswordMismatch,
}

impl LockboxError {
    /// Returns `true` for failures reported by the remote store transport.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Self::Unauthorized | Self::NotFound(_) | Self::NetworkError(_) | Self::ServerError(_)
        )
    }
}

/// Convenience type alias for Lockbox results.
pub type Result<T> = std::result::Result<T, LockboxError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_classification() {
        assert!(LockboxError::Unauthorized.is_transport());
        assert!(LockboxError::NotFound("7".into()).is_transport());
        assert!(LockboxError::NetworkError("timeout".into()).is_transport());
        assert!(LockboxError::ServerError("500".into()).is_transport());

        assert!(!LockboxError::InvalidData.is_transport());
        assert!(!LockboxError::AccessDenied(3).is_transport());
        assert!(!LockboxError::DecodeFailure("x".into()).is_transport());
    }

    #[test]
    fn crypto_errors_do_not_reveal_cause() {
        let msg = LockboxError::InvalidData.to_string();
        assert!(msg.contains("wrong key or corrupted data"));
    }
}
