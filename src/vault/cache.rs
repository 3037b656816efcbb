//! Local record cache file with HMAC integrity.
//!
//! A `<user>.cache` file has this layout:
//!
//! ```text
//! [LBXC: 4 bytes][version: 1 byte][header_len: 4 bytes LE][header JSON][body JSON][HMAC-SHA256: 32 bytes]
//! ```
//!
//! - **Header JSON**: serialized `CacheHeader` (owner, last sync time).
//! - **Body JSON**: serialized `CacheBody`, the last merged record list
//!   and the queue of changes not yet accepted by the server.
//! - **HMAC-SHA256**: tag over header + body bytes, keyed by a sub-key of
//!   the session key, so the cache can only be read after unlock.
//!
//! Records are stored in wire shape: ciphertext only, never plaintext.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use tracing::{debug, warn};

use super::record::SecretRecord;
use crate::config::paths::write_private_atomic;
use crate::errors::{LockboxError, Result};

/// Magic bytes at the start of every cache file.
const MAGIC: &[u8; 4] = b"LBXC";

/// Current binary format version.
pub const CURRENT_VERSION: u8 = 1;

const HMAC_LEN: usize = 32;

/// 4 (magic) + 1 (version) + 4 (header_len).
const PREFIX_LEN: usize = 9;

/// Metadata stored at the beginning of a cache file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheHeader {
    pub version: u8,
    pub username: String,
    #[serde(default)]
    pub owner_id: i64,
    #[serde(default)]
    pub last_sync_at: Option<DateTime<Utc>>,
}

/// Records known locally.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CacheBody {
    /// Result of the last sync plus local-only records.
    #[serde(default)]
    pub records: Vec<SecretRecord>,

    /// Creates and updates waiting for the next sync.
    #[serde(default)]
    pub pending: Vec<SecretRecord>,
}

/// The on-disk cache for one user, loaded into memory.
#[derive(Debug)]
pub struct LocalCache {
    path: PathBuf,
    header: CacheHeader,
    body: CacheBody,
}

impl LocalCache {
    /// Where the cache for `username` lives inside `config_dir`.
    pub fn path_for(config_dir: &Path, username: &str) -> PathBuf {
        config_dir.join(format!("{username}.cache"))
    }

    /// An empty cache that has never been written.
    pub fn empty(path: PathBuf, username: &str, owner_id: i64) -> Self {
        Self {
            path,
            header: CacheHeader {
                version: CURRENT_VERSION,
                username: username.to_string(),
                owner_id,
                last_sync_at: None,
            },
            body: CacheBody::default(),
        }
    }

    /// Load the cache at `path`, or start an empty one if none exists.
    ///
    /// Any structural problem, HMAC mismatch, or a header naming a
    /// different user is reported as `CacheCorrupted`.
    pub fn load_or_new(path: &Path, username: &str, owner_id: i64, hmac_key: &[u8]) -> Result<Self> {
        if !path.exists() {
            debug!(path = %path.display(), "no local cache yet, starting empty");
            return Ok(Self::empty(path.to_path_buf(), username, owner_id));
        }

        let data = fs::read(path)?;
        let (header, body) = decode(&data, hmac_key).map_err(|reason| {
            warn!(path = %path.display(), %reason, "rejecting local cache");
            LockboxError::CacheCorrupted(path.to_path_buf())
        })?;

        if header.username != username {
            warn!(path = %path.display(), "cache belongs to a different user");
            return Err(LockboxError::CacheCorrupted(path.to_path_buf()));
        }

        debug!(
            records = body.records.len(),
            pending = body.pending.len(),
            "loaded local cache"
        );

        let mut cache = Self {
            path: path.to_path_buf(),
            header,
            body,
        };
        if owner_id != 0 {
            cache.header.owner_id = owner_id;
        }
        Ok(cache)
    }

    /// Write the cache to disk atomically with owner-only permissions.
    pub fn save(&self, hmac_key: &[u8]) -> Result<()> {
        let header_bytes = serde_json::to_vec(&self.header)
            .map_err(|e| LockboxError::SerializationError(format!("cache header: {e}")))?;
        let body_bytes = serde_json::to_vec(&self.body)
            .map_err(|e| LockboxError::SerializationError(format!("cache body: {e}")))?;

        let tag = compute_hmac(hmac_key, &header_bytes, &body_bytes)?;

        let header_len = u32::try_from(header_bytes.len()).map_err(|_| {
            LockboxError::SerializationError(format!(
                "header length {} exceeds u32::MAX",
                header_bytes.len()
            ))
        })?;

        let mut buf =
            Vec::with_capacity(PREFIX_LEN + header_bytes.len() + body_bytes.len() + HMAC_LEN);
        buf.extend_from_slice(MAGIC);
        buf.push(CURRENT_VERSION);
        buf.extend_from_slice(&header_len.to_le_bytes());
        buf.extend_from_slice(&header_bytes);
        buf.extend_from_slice(&body_bytes);
        buf.extend_from_slice(&tag);

        write_private_atomic(&self.path, &buf)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn header(&self) -> &CacheHeader {
        &self.header
    }

    pub fn owner_id(&self) -> i64 {
        self.header.owner_id
    }

    pub fn last_sync_at(&self) -> Option<DateTime<Utc>> {
        self.header.last_sync_at
    }

    pub fn records(&self) -> &[SecretRecord] {
        &self.body.records
    }

    pub fn records_mut(&mut self) -> &mut Vec<SecretRecord> {
        &mut self.body.records
    }

    pub fn pending(&self) -> &[SecretRecord] {
        &self.body.pending
    }

    pub fn pending_mut(&mut self) -> &mut Vec<SecretRecord> {
        &mut self.body.pending
    }

    /// Replace the record list wholesale after a sync.
    pub fn replace_records(&mut self, records: Vec<SecretRecord>) {
        self.body.records = records;
        self.header.last_sync_at = Some(Utc::now());
    }

    /// Find a record by id, preferring a queued version over the cached one.
    pub fn find(&self, id: i64) -> Option<&SecretRecord> {
        self.body
            .pending
            .iter()
            .find(|r| r.id == id)
            .or_else(|| self.body.records.iter().find(|r| r.id == id))
    }

    /// Put `record` in the pending queue, replacing any queued version
    /// with the same non-zero id.
    pub fn enqueue(&mut self, record: SecretRecord) {
        if record.id != 0 {
            if let Some(slot) = self.body.pending.iter_mut().find(|r| r.id == record.id) {
                *slot = record;
                return;
            }
        }
        self.body.pending.push(record);
    }

    /// Remove every trace of `id`.  Returns whether anything was removed.
    pub fn remove(&mut self, id: i64) -> bool {
        let before = self.body.records.len() + self.body.pending.len();
        self.body.records.retain(|r| r.id != id);
        self.body.pending.retain(|r| r.id != id);
        before != self.body.records.len() + self.body.pending.len()
    }

    /// The queued change at 1-based `position`.
    pub fn queued(&self, position: usize) -> Option<&SecretRecord> {
        position
            .checked_sub(1)
            .and_then(|i| self.body.pending.get(i))
    }

    /// Overwrite the queued change at 1-based `position`.  Returns whether
    /// there was one.
    pub fn replace_queued(&mut self, position: usize, record: SecretRecord) -> bool {
        match position
            .checked_sub(1)
            .and_then(|i| self.body.pending.get_mut(i))
        {
            Some(slot) => {
                *slot = record;
                true
            }
            None => false,
        }
    }

    /// Drop the queued change at 1-based `position`.  The cached server
    /// copy of the same record, if any, is kept.
    pub fn discard_queued(&mut self, position: usize) -> Option<SecretRecord> {
        self.queued(position)?;
        Some(self.body.pending.remove(position - 1))
    }

    /// Next free negative id for a local-only record.
    pub fn next_local_id(&self) -> i64 {
        self.body
            .records
            .iter()
            .chain(self.body.pending.iter())
            .map(|r| r.id)
            .filter(|&id| id < 0)
            .min()
            .unwrap_or(0)
            - 1
    }
}

/// Parse and authenticate a cache blob.  Errors are plain reasons for the log.
fn decode(data: &[u8], hmac_key: &[u8]) -> std::result::Result<(CacheHeader, CacheBody), String> {
    if data.len() < PREFIX_LEN + HMAC_LEN {
        return Err("file too small".into());
    }
    if &data[0..4] != MAGIC {
        return Err("missing LBXC magic bytes".into());
    }
    let version = data[4];
    if version != CURRENT_VERSION {
        return Err(format!("unsupported version {version}"));
    }

    let mut len_bytes = [0u8; 4];
    len_bytes.copy_from_slice(&data[5..9]);
    let header_len = u32::from_le_bytes(len_bytes) as usize;

    let header_end = PREFIX_LEN
        .checked_add(header_len)
        .filter(|end| end + HMAC_LEN <= data.len())
        .ok_or("header length exceeds file size")?;

    let body_end = data.len() - HMAC_LEN;
    let header_bytes = &data[PREFIX_LEN..header_end];
    let body_bytes = &data[header_end..body_end];
    let stored_tag = &data[body_end..];

    // Authenticate before trusting any of the JSON.
    let mut mac = Hmac::<Sha256>::new_from_slice(hmac_key).map_err(|e| e.to_string())?;
    mac.update(header_bytes);
    mac.update(body_bytes);
    mac.verify_slice(stored_tag)
        .map_err(|_| "HMAC mismatch".to_string())?;

    let header: CacheHeader =
        serde_json::from_slice(header_bytes).map_err(|e| format!("header JSON: {e}"))?;
    let body: CacheBody =
        serde_json::from_slice(body_bytes).map_err(|e| format!("body JSON: {e}"))?;

    Ok((header, body))
}

fn compute_hmac(hmac_key: &[u8], header_bytes: &[u8], body_bytes: &[u8]) -> Result<Vec<u8>> {
    let mut mac = Hmac::<Sha256>::new_from_slice(hmac_key)
        .map_err(|e| LockboxError::EncryptionFailed(format!("invalid HMAC key: {e}")))?;
    mac.update(header_bytes);
    mac.update(body_bytes);
    Ok(mac.finalize().into_bytes().to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vault::record::RecordKind;
    use tempfile::TempDir;

    const KEY: [u8; 32] = [7u8; 32];

    fn record(id: i64, name: &str) -> SecretRecord {
        let mut r = SecretRecord::new(RecordKind::Text, name, "", vec![9; 40]).unwrap();
        r.id = id;
        r
    }

    fn saved_cache(dir: &TempDir) -> PathBuf {
        let path = LocalCache::path_for(dir.path(), "alice");
        let mut cache = LocalCache::empty(path.clone(), "alice", 1);
        cache.replace_records(vec![record(1, "one"), record(-1, "local")]);
        cache.enqueue(record(0, "new"));
        cache.save(&KEY).unwrap();
        path
    }

    #[test]
    fn save_then_load_preserves_contents() {
        let dir = TempDir::new().unwrap();
        let path = saved_cache(&dir);

        let cache = LocalCache::load_or_new(&path, "alice", 0, &KEY).unwrap();
        assert_eq!(cache.records().len(), 2);
        assert_eq!(cache.pending().len(), 1);
        assert_eq!(cache.owner_id(), 1);
        assert!(cache.last_sync_at().is_some());
    }

    #[test]
    fn missing_file_gives_empty_cache() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bob.cache");
        let cache = LocalCache::load_or_new(&path, "bob", 0, &KEY).unwrap();
        assert!(cache.records().is_empty());
        assert!(cache.pending().is_empty());
        assert!(!path.exists());
    }

    #[test]
    fn flipped_byte_is_detected() {
        let dir = TempDir::new().unwrap();
        let path = saved_cache(&dir);

        let mut data = fs::read(&path).unwrap();
        let mid = data.len() / 2;
        data[mid] ^= 0x01;
        fs::write(&path, &data).unwrap();

        let err = LocalCache::load_or_new(&path, "alice", 0, &KEY).unwrap_err();
        assert!(matches!(err, LockboxError::CacheCorrupted(_)));
    }

    #[test]
    fn wrong_key_is_rejected() {
        let dir = TempDir::new().unwrap();
        let path = saved_cache(&dir);
        let err = LocalCache::load_or_new(&path, "alice", 0, &[8u8; 32]).unwrap_err();
        assert!(matches!(err, LockboxError::CacheCorrupted(_)));
    }

    #[test]
    fn other_users_cache_is_rejected() {
        let dir = TempDir::new().unwrap();
        let path = saved_cache(&dir);
        let err = LocalCache::load_or_new(&path, "mallory", 0, &KEY).unwrap_err();
        assert!(matches!(err, LockboxError::CacheCorrupted(_)));
    }

    #[test]
    fn truncated_file_is_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("alice.cache");
        fs::write(&path, b"LBXC\x01").unwrap();
        let err = LocalCache::load_or_new(&path, "alice", 0, &KEY).unwrap_err();
        assert!(matches!(err, LockboxError::CacheCorrupted(_)));
    }

    #[test]
    fn enqueue_replaces_queued_update_for_same_id() {
        let mut cache = LocalCache::empty(PathBuf::from("x.cache"), "a", 0);
        cache.enqueue(record(5, "v1"));
        cache.enqueue(record(5, "v2"));
        cache.enqueue(record(0, "n1"));
        cache.enqueue(record(0, "n2"));
        assert_eq!(cache.pending().len(), 3);
        assert_eq!(cache.find(5).unwrap().name, "v2");
    }

    #[test]
    fn local_ids_count_down() {
        let mut cache = LocalCache::empty(PathBuf::from("x.cache"), "a", 0);
        assert_eq!(cache.next_local_id(), -1);
        cache.records_mut().push(record(-1, "a"));
        cache.pending_mut().push(record(-3, "b"));
        assert_eq!(cache.next_local_id(), -4);
    }

    #[test]
    fn remove_clears_records_and_queue() {
        let mut cache = LocalCache::empty(PathBuf::from("x.cache"), "a", 0);
        cache.records_mut().push(record(3, "a"));
        cache.enqueue(record(3, "a2"));
        assert!(cache.remove(3));
        assert!(cache.find(3).is_none());
        assert!(!cache.remove(3));
    }

    #[test]
    fn queued_changes_are_addressed_by_position() {
        let mut cache = LocalCache::empty(PathBuf::from("x.cache"), "a", 0);
        cache.records_mut().push(record(5, "synced"));
        cache.enqueue(record(0, "first"));
        cache.enqueue(record(5, "edit"));

        assert!(cache.queued(0).is_none());
        assert_eq!(cache.queued(1).unwrap().name, "first");
        assert_eq!(cache.queued(2).unwrap().name, "edit");
        assert!(cache.queued(3).is_none());

        assert_eq!(cache.discard_queued(2).unwrap().name, "edit");
        assert_eq!(cache.find(5).unwrap().name, "synced");
        assert!(cache.discard_queued(2).is_none());
        assert_eq!(cache.pending().len(), 1);
    }
}
