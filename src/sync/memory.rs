//! An in-process `RemoteStore`.
//!
//! Used by the test suite and by callers without a server.  Behaves like
//! the HTTP server: assigns increasing ids, scopes listings by owner, and
//! answers unknown ids with `NotFound`.  Failures can be injected per
//! record name or for the whole store.

use std::collections::{BTreeMap, HashSet};

use super::remote::RemoteStore;
use crate::errors::{LockboxError, Result};
use crate::vault::SecretRecord;

#[derive(Debug)]
pub struct InMemoryRemoteStore {
    records: BTreeMap<i64, SecretRecord>,
    next_id: i64,
    offline: bool,
    failing_names: HashSet<String>,
    write_calls: usize,
}

impl Default for InMemoryRemoteStore {
    fn default() -> Self {
        Self {
            records: BTreeMap::new(),
            next_id: 1,
            offline: false,
            failing_names: HashSet::new(),
            write_calls: 0,
        }
    }
}

impl InMemoryRemoteStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the store with records that keep their ids.
    pub fn with_records(records: impl IntoIterator<Item = SecretRecord>) -> Self {
        let mut store = Self::new();
        for record in records {
            store.insert(record);
        }
        store
    }

    /// Put `record` in place under its own id, bypassing the write path.
    pub fn insert(&mut self, mut record: SecretRecord) {
        record.forget_plaintext();
        self.next_id = self.next_id.max(record.id + 1);
        self.records.insert(record.id, record);
    }

    pub fn get(&self, id: i64) -> Option<&SecretRecord> {
        self.records.get(&id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Every call fails with `NetworkError` while offline.
    pub fn set_offline(&mut self, offline: bool) {
        self.offline = offline;
    }

    /// Creates and updates of records named `name` fail with `ServerError`.
    pub fn fail_writes_for(&mut self, name: &str) {
        self.failing_names.insert(name.to_string());
    }

    pub fn clear_failures(&mut self) {
        self.failing_names.clear();
        self.offline = false;
    }

    /// Number of create/update/delete calls received.
    pub fn write_calls(&self) -> usize {
        self.write_calls
    }

    fn check_online(&self) -> Result<()> {
        if self.offline {
            return Err(LockboxError::NetworkError("store is offline".into()));
        }
        Ok(())
    }

    fn check_writable(&self, record: &SecretRecord) -> Result<()> {
        self.check_online()?;
        if self.failing_names.contains(&record.name) {
            return Err(LockboxError::ServerError(format!(
                "write rejected for '{}'",
                record.name
            )));
        }
        Ok(())
    }
}

impl RemoteStore for InMemoryRemoteStore {
    fn create(&mut self, record: &SecretRecord) -> Result<i64> {
        self.write_calls += 1;
        self.check_writable(record)?;

        let id = self.next_id;
        self.next_id += 1;

        let mut stored = record.clone();
        stored.id = id;
        stored.forget_plaintext();
        self.records.insert(id, stored);
        Ok(id)
    }

    fn get_all(&mut self, owner_id: i64) -> Result<Vec<SecretRecord>> {
        self.check_online()?;
        Ok(self
            .records
            .values()
            .filter(|r| owner_id == 0 || r.owner_id == 0 || r.owner_id == owner_id)
            .cloned()
            .collect())
    }

    fn get_by_id(&mut self, id: i64) -> Result<SecretRecord> {
        self.check_online()?;
        self.records
            .get(&id)
            .cloned()
            .ok_or_else(|| LockboxError::NotFound(format!("record {id}")))
    }

    fn update(&mut self, record: &SecretRecord) -> Result<()> {
        self.write_calls += 1;
        self.check_writable(record)?;

        let existing = self
            .records
            .get_mut(&record.id)
            .ok_or_else(|| LockboxError::NotFound(format!("record {}", record.id)))?;
        if existing.owner_id != 0 && record.owner_id != 0 && existing.owner_id != record.owner_id {
            return Err(LockboxError::AccessDenied(record.id));
        }

        *existing = record.clone();
        existing.forget_plaintext();
        Ok(())
    }

    fn delete(&mut self, id: i64) -> Result<()> {
        self.write_calls += 1;
        self.check_online()?;
        self.records
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| LockboxError::NotFound(format!("record {id}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vault::RecordKind;

    fn record(id: i64, owner: i64, name: &str) -> SecretRecord {
        let mut r = SecretRecord::new(RecordKind::Text, name, "", vec![1; 30]).unwrap();
        r.id = id;
        r.owner_id = owner;
        r
    }

    #[test]
    fn create_assigns_ids_after_seeded_ones() {
        let mut store = InMemoryRemoteStore::with_records([record(7, 1, "seed")]);
        let id = store.create(&record(0, 1, "new")).unwrap();
        assert_eq!(id, 8);
        assert_eq!(store.get(8).unwrap().name, "new");
    }

    #[test]
    fn get_all_is_scoped_by_owner() {
        let mut store =
            InMemoryRemoteStore::with_records([record(1, 1, "mine"), record(2, 2, "theirs")]);
        let mine = store.get_all(1).unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].name, "mine");
    }

    #[test]
    fn unknown_ids_are_not_found() {
        let mut store = InMemoryRemoteStore::new();
        assert!(matches!(store.get_by_id(3), Err(LockboxError::NotFound(_))));
        assert!(matches!(
            store.update(&record(3, 0, "x")),
            Err(LockboxError::NotFound(_))
        ));
        assert!(matches!(store.delete(3), Err(LockboxError::NotFound(_))));
    }

    #[test]
    fn update_of_foreign_record_is_denied() {
        let mut store = InMemoryRemoteStore::with_records([record(4, 2, "theirs")]);
        let err = store.update(&record(4, 1, "theirs")).unwrap_err();
        assert!(matches!(err, LockboxError::AccessDenied(4)));
    }

    #[test]
    fn injected_failures() {
        let mut store = InMemoryRemoteStore::new();
        store.fail_writes_for("bad");
        assert!(matches!(
            store.create(&record(0, 0, "bad")),
            Err(LockboxError::ServerError(_))
        ));
        assert!(store.create(&record(0, 0, "good")).is_ok());

        store.set_offline(true);
        assert!(matches!(store.get_all(0), Err(LockboxError::NetworkError(_))));
        assert_eq!(store.write_calls(), 2);
    }
}
