//! High-level vault operations used by CLI commands.
//!
//! A `Session` is the explicit owner of everything a logged-in user
//! needs: the username, the derived session key, the transport, and the
//! local record cache.  It is created locked; `unlock` derives the key
//! once and `lock` (or dropping the session) wipes it.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};
use zeroize::Zeroizing;

use crate::crypto::kdf::KEY_LEN;
use crate::crypto::SessionKey;
use crate::errors::{LockboxError, Result};
use crate::master::MasterKeyManager;
use crate::sync::{RemoteStore, SyncEngine, SyncReport};
use crate::vault::{decrypt_payload, encrypt_payload, LocalCache, Payload, SecretRecord};

/// How a command names a record.
///
/// Synced and local-only records are named by id.  Queued changes are
/// named `q<N>` by their 1-based position in the pending queue, which is
/// the only handle a not-yet-created record has.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordRef {
    Id(i64),
    Queued(usize),
}

impl From<i64> for RecordRef {
    fn from(id: i64) -> Self {
        Self::Id(id)
    }
}

impl fmt::Display for RecordRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Id(id) => write!(f, "{id}"),
            Self::Queued(n) => write!(f, "q{n}"),
        }
    }
}

impl FromStr for RecordRef {
    type Err = LockboxError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let invalid = || {
            LockboxError::InvalidRecord(format!(
                "'{s}' is not a record id or a queued change like q1"
            ))
        };

        match s.strip_prefix(|c: char| c == 'q' || c == 'Q') {
            Some(n) => match n.parse::<usize>() {
                Ok(n) if n > 0 => Ok(Self::Queued(n)),
                _ => Err(invalid()),
            },
            None => s.parse::<i64>().map(Self::Id).map_err(|_| invalid()),
        }
    }
}

/// State that only exists while the session is unlocked.
struct Unlocked {
    key: SessionKey,
    hmac_key: Zeroizing<[u8; KEY_LEN]>,
    cache: LocalCache,
}

/// The main vault handle.  Open one with `Session::open`, then `unlock`
/// it with the master password before touching any records.
pub struct Session<S: RemoteStore> {
    manager: MasterKeyManager,
    store: S,
    owner_id: i64,
    cache_path: PathBuf,
    unlocked: Option<Unlocked>,
}

impl<S: RemoteStore> Session<S> {
    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    /// A locked session for the manager's user, talking to `store`.
    ///
    /// `owner_id` is the server-side user id, or 0 when unknown.
    pub fn open(manager: MasterKeyManager, store: S, owner_id: i64) -> Self {
        let cache_path = LocalCache::path_for(manager.config_dir(), manager.username());
        Self {
            manager,
            store,
            owner_id,
            cache_path,
            unlocked: None,
        }
    }

    /// Verify `password` locally, derive the session key, and load the cache.
    pub fn unlock(&mut self, password: &[u8]) -> Result<()> {
        if !self.manager.verify_master_password(password)? {
            warn!(user = %self.manager.username(), "master password rejected");
            return Err(LockboxError::WrongMasterPassword);
        }

        let key = self.manager.derive_session_key(password)?;
        let hmac_key = Zeroizing::new(key.derive_cache_hmac_key()?);
        let cache = LocalCache::load_or_new(
            &self.cache_path,
            self.manager.username(),
            self.owner_id,
            &hmac_key[..],
        )?;

        if self.owner_id == 0 {
            self.owner_id = cache.owner_id();
        }

        info!(user = %self.manager.username(), "session unlocked");
        self.unlocked = Some(Unlocked {
            key,
            hmac_key,
            cache,
        });
        Ok(())
    }

    /// Drop the session key and everything loaded under it.
    pub fn lock(&mut self) {
        if self.unlocked.take().is_some() {
            info!(user = %self.manager.username(), "session locked");
        }
    }

    pub fn is_unlocked(&self) -> bool {
        self.unlocked.is_some()
    }

    pub fn username(&self) -> &str {
        self.manager.username()
    }

    pub fn owner_id(&self) -> i64 {
        self.owner_id
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    // ------------------------------------------------------------------
    // Records
    // ------------------------------------------------------------------

    /// Encrypt `payload` and queue it as a new record for the next sync.
    pub fn add(&mut self, name: &str, metadata: &str, payload: &Payload) -> Result<SecretRecord> {
        let owner_id = self.owner_id;
        let state = self.state_mut()?;

        let ciphertext = encrypt_payload(payload, state.key.as_bytes())?;
        let mut record = SecretRecord::new(payload.kind(), name, metadata, ciphertext)?;
        record.owner_id = owner_id;

        state.cache.enqueue(record.clone());
        debug!(kind = %record.kind, "queued new record");
        self.save()?;
        Ok(record)
    }

    /// Like `add`, but the record keeps a negative id and never reaches
    /// the server.
    pub fn add_local_only(
        &mut self,
        name: &str,
        metadata: &str,
        payload: &Payload,
    ) -> Result<SecretRecord> {
        let state = self.state_mut()?;

        let ciphertext = encrypt_payload(payload, state.key.as_bytes())?;
        let mut record = SecretRecord::new(payload.kind(), name, metadata, ciphertext)?;
        record.id = state.cache.next_local_id();

        state.cache.enqueue(record.clone());
        debug!(id = record.id, kind = %record.kind, "stored local-only record");
        self.save()?;
        Ok(record)
    }

    /// Look up a record or queued change.
    pub fn record(&self, r: impl Into<RecordRef>) -> Result<&SecretRecord> {
        resolve(&self.state()?.cache, r.into())
    }

    /// Re-encrypt a record with a new payload of the same kind.
    ///
    /// Editing a queued change rewrites it in place in the queue.
    pub fn update(&mut self, r: impl Into<RecordRef>, payload: &Payload) -> Result<SecretRecord> {
        let r = r.into();
        let state = self.state_mut()?;

        let mut record = resolve(&state.cache, r)?.clone();
        if record.kind != payload.kind() {
            return Err(LockboxError::InvalidRecord(format!(
                "record {r} holds a {} payload, not a {}",
                record.kind,
                payload.kind()
            )));
        }

        record.ciphertext = encrypt_payload(payload, state.key.as_bytes())?;
        record.touch();
        match r {
            RecordRef::Queued(n) => {
                state.cache.replace_queued(n, record.clone());
            }
            RecordRef::Id(_) => state.cache.enqueue(record.clone()),
        }
        debug!(record = %r, "queued record update");
        self.save()?;
        Ok(record)
    }

    /// Decrypt a record.
    ///
    /// A synced record whose ciphertext is not cached yet is fetched from
    /// the server first.
    pub fn reveal(&mut self, r: impl Into<RecordRef>) -> Result<Payload> {
        let r = r.into();
        let missing = {
            let record = self.record(r)?;
            (record.ciphertext.is_empty() && record.id > 0).then_some(record.id)
        };
        if let Some(id) = missing {
            debug!(id, "ciphertext not cached, fetching");
            self.fetch(id)?;
        }

        let state = self.state()?;
        let record = resolve(&state.cache, r)?;
        decrypt_payload(&record.ciphertext, record.kind, state.key.as_bytes())
    }

    /// Re-read record `id` from the server into the cache.
    ///
    /// A record owned by someone else is refused with `AccessDenied`.
    pub fn fetch(&mut self, id: i64) -> Result<SecretRecord> {
        self.state()?;
        let owner_id = self.owner_id;

        let mut record = self.store.get_by_id(id)?;
        if owner_id != 0 && record.owner_id != 0 && record.owner_id != owner_id {
            return Err(LockboxError::AccessDenied(id));
        }
        record.forget_plaintext();

        let records = self.state_mut()?.cache.records_mut();
        match records.iter_mut().find(|r| r.id == id) {
            Some(slot) => *slot = record.clone(),
            None => records.push(record.clone()),
        }
        debug!(id, "refreshed record from server");
        self.save()?;
        Ok(record)
    }

    /// Delete a record on the server, then locally.
    ///
    /// A record the server no longer has is removed locally all the same.
    /// A queued change (`q<N>`) is only dropped from the queue; the server
    /// is not contacted and its copy, if any, stays cached.
    pub fn delete(&mut self, r: impl Into<RecordRef>) -> Result<()> {
        let r = r.into();
        self.record(r)?;

        match r {
            RecordRef::Queued(n) => {
                self.state_mut()?.cache.discard_queued(n);
                info!(queued = n, "queued change discarded");
            }
            RecordRef::Id(id) => {
                if id > 0 {
                    match self.store.delete(id) {
                        Ok(()) => {}
                        Err(LockboxError::NotFound(_)) => {
                            debug!(id, "record already gone from server");
                        }
                        Err(e) => return Err(e),
                    }
                }
                self.state_mut()?.cache.remove(id);
                info!(id, "record deleted");
            }
        }
        self.save()
    }

    /// Cached records, with queued edits shown in place of the last
    /// synced version and not-yet-created records last.
    pub fn records(&self) -> Result<Vec<&SecretRecord>> {
        let cache = &self.state()?.cache;

        let mut out: Vec<&SecretRecord> = cache
            .records()
            .iter()
            .map(|r| {
                cache
                    .pending()
                    .iter()
                    .find(|p| p.id == r.id)
                    .unwrap_or(r)
            })
            .collect();
        out.extend(
            cache
                .pending()
                .iter()
                .filter(|p| p.id == 0 || !cache.records().iter().any(|r| r.id == p.id)),
        );
        Ok(out)
    }

    /// Queued changes not yet accepted by the server.
    pub fn pending(&self) -> Result<&[SecretRecord]> {
        Ok(self.state()?.cache.pending())
    }

    pub fn last_sync_at(&self) -> Result<Option<DateTime<Utc>>> {
        Ok(self.state()?.cache.last_sync_at())
    }

    // ------------------------------------------------------------------
    // Sync
    // ------------------------------------------------------------------

    /// Push queued changes and adopt the merged server view.
    ///
    /// The merged list replaces the cache; changes that failed stay queued
    /// for the next sync.  Fails as a whole only when the server snapshot
    /// cannot be fetched, in which case nothing changes locally.
    pub fn sync(&mut self) -> Result<SyncReport> {
        let engine = SyncEngine::new(self.owner_id);

        let batch = {
            let cache = &self.state()?.cache;
            let mut batch = cache.pending().to_vec();
            let local_only: Vec<SecretRecord> = cache
                .records()
                .iter()
                .filter(|r| r.is_local_only() && !batch.iter().any(|p| p.id == r.id))
                .cloned()
                .collect();
            batch.extend(local_only);
            batch
        };

        let report = engine.sync(&mut self.store, batch)?;

        let retry: Vec<SecretRecord> = report
            .failures()
            .into_iter()
            .map(|o| o.record.clone())
            .collect();

        let state = self.state_mut()?;
        let mut merged = report.merged.clone();
        // Listings may omit ciphertext; an unchanged record keeps the
        // cached blob, anything else is fetched on first reveal.
        for record in merged.iter_mut().filter(|r| r.ciphertext.is_empty()) {
            if let Some(cached) = state
                .cache
                .records()
                .iter()
                .find(|c| c.id == record.id && c.updated_at == record.updated_at)
            {
                record.ciphertext = cached.ciphertext.clone();
            }
        }
        state.cache.replace_records(merged);
        *state.cache.pending_mut() = retry;
        self.save()?;

        Ok(report)
    }

    // ------------------------------------------------------------------
    // Internal helpers
    // ------------------------------------------------------------------

    fn state(&self) -> Result<&Unlocked> {
        self.unlocked.as_ref().ok_or(LockboxError::SessionLocked)
    }

    fn state_mut(&mut self) -> Result<&mut Unlocked> {
        self.unlocked.as_mut().ok_or(LockboxError::SessionLocked)
    }

    fn save(&self) -> Result<()> {
        let state = self.state()?;
        state.cache.save(&state.hmac_key[..])
    }
}

/// Look up an addressable record.  Id 0 never names a single record;
/// queued creates are reached through their queue position.
fn resolve(cache: &LocalCache, r: RecordRef) -> Result<&SecretRecord> {
    match r {
        RecordRef::Id(0) => Err(LockboxError::RecordNotFound(0)),
        RecordRef::Id(id) => cache.find(id).ok_or(LockboxError::RecordNotFound(id)),
        RecordRef::Queued(n) => cache.queued(n).ok_or(LockboxError::QueuedChangeNotFound(n)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::InMemoryRemoteStore;
    use tempfile::TempDir;

    const PW: &[u8] = b"correct horse battery";

    fn unlocked(dir: &TempDir) -> Session<InMemoryRemoteStore> {
        let manager = MasterKeyManager::new(dir.path(), "alice").unwrap();
        manager.set_master_password(PW).unwrap();
        let mut session = Session::open(manager, InMemoryRemoteStore::new(), 1);
        session.unlock(PW).unwrap();
        session
    }

    fn text(body: &str) -> Payload {
        Payload::Text { body: body.into() }
    }

    #[test]
    fn locked_session_refuses_record_access() {
        let dir = TempDir::new().unwrap();
        let manager = MasterKeyManager::new(dir.path(), "alice").unwrap();
        manager.set_master_password(PW).unwrap();
        let mut session = Session::open(manager, InMemoryRemoteStore::new(), 0);

        assert!(matches!(session.records(), Err(LockboxError::SessionLocked)));
        assert!(matches!(
            session.add("n", "", &text("x")),
            Err(LockboxError::SessionLocked)
        ));
    }

    #[test]
    fn wrong_password_does_not_unlock() {
        let dir = TempDir::new().unwrap();
        let manager = MasterKeyManager::new(dir.path(), "alice").unwrap();
        manager.set_master_password(PW).unwrap();
        let mut session = Session::open(manager, InMemoryRemoteStore::new(), 0);

        let err = session.unlock(b"nope").unwrap_err();
        assert!(matches!(err, LockboxError::WrongMasterPassword));
        assert!(!session.is_unlocked());
    }

    #[test]
    fn lock_forgets_the_key() {
        let dir = TempDir::new().unwrap();
        let mut session = unlocked(&dir);
        let id = session.add_local_only("n", "", &text("x")).unwrap().id;

        session.lock();
        assert!(matches!(session.reveal(id), Err(LockboxError::SessionLocked)));
    }

    #[test]
    fn update_rejects_kind_change() {
        let dir = TempDir::new().unwrap();
        let mut session = unlocked(&dir);
        let id = session.add_local_only("n", "", &text("x")).unwrap().id;

        let card = Payload::Card {
            number: "1".into(),
            holder: "h".into(),
            expiry: "e".into(),
            cvv: "c".into(),
        };
        assert!(matches!(
            session.update(id, &card),
            Err(LockboxError::InvalidRecord(_))
        ));
    }

    #[test]
    fn id_zero_is_not_addressable() {
        let dir = TempDir::new().unwrap();
        let mut session = unlocked(&dir);
        session.add("n", "", &text("x")).unwrap();
        assert!(matches!(
            session.reveal(RecordRef::Id(0)),
            Err(LockboxError::RecordNotFound(0))
        ));
        assert_eq!(session.reveal(RecordRef::Queued(1)).unwrap(), text("x"));
    }

    #[test]
    fn record_refs_parse() {
        assert_eq!("12".parse::<RecordRef>().unwrap(), RecordRef::Id(12));
        assert_eq!("-3".parse::<RecordRef>().unwrap(), RecordRef::Id(-3));
        assert_eq!("q2".parse::<RecordRef>().unwrap(), RecordRef::Queued(2));
        assert_eq!("Q1".parse::<RecordRef>().unwrap(), RecordRef::Queued(1));
        assert!("q0".parse::<RecordRef>().is_err());
        assert!("q".parse::<RecordRef>().is_err());
        assert!("abc".parse::<RecordRef>().is_err());
        assert_eq!(RecordRef::Queued(4).to_string(), "q4");
    }

    #[test]
    fn queued_create_can_be_edited_in_place() {
        let dir = TempDir::new().unwrap();
        let mut session = unlocked(&dir);
        session.add("n", "", &text("v1")).unwrap();

        session.update(RecordRef::Queued(1), &text("v2")).unwrap();
        assert_eq!(session.pending().unwrap().len(), 1);
        assert_eq!(session.reveal(RecordRef::Queued(1)).unwrap(), text("v2"));
        assert!(matches!(
            session.update(RecordRef::Queued(2), &text("v3")),
            Err(LockboxError::QueuedChangeNotFound(2))
        ));
    }
}
