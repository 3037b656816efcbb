//! Last-writer-wins reconciliation of queued client changes against the
//! server snapshot.
//!
//! For each client record, in batch order:
//!
//! | client id            | action                                              |
//! |----------------------|-----------------------------------------------------|
//! | `< 0`                | local-only, passed through untouched                 |
//! | `0`                  | created on the server, gets the server-assigned id   |
//! | `> 0`, on server     | newer `updated_at` wins; ties go to the server        |
//! | `> 0`, not on server | recreated under a fresh id                           |
//!
//! Server records the batch did not reference are appended afterwards in
//! snapshot order.  A failed write is reported in the record's outcome and
//! never aborts the batch.

use std::collections::{HashMap, HashSet};

use tracing::{debug, info, warn};

use super::remote::RemoteStore;
use crate::errors::{LockboxError, Result};
use crate::vault::SecretRecord;

/// What happened to one client record during a sync.
#[derive(Debug)]
pub enum SyncOutcome {
    /// Negative id, never sent to the server.
    LocalOnly,
    /// New record, created on the server.
    Created,
    /// The record's id was unknown to the server; it was created again.
    Recreated { stale_id: i64 },
    /// The client copy was newer and overwrote the server copy.
    ClientWins,
    /// The server copy was newer or equally new and was kept.
    ServerWins,
    /// The server call failed; the client change was not applied.
    Failed(LockboxError),
}

impl SyncOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed(_))
    }
}

/// A client record and what the sync did with it.
#[derive(Debug)]
pub struct RecordOutcome {
    /// The client record, with its final id on success.
    pub record: SecretRecord,
    pub outcome: SyncOutcome,
}

/// Result of a reconciliation pass.
#[derive(Debug, Default)]
pub struct SyncReport {
    /// The new authoritative record list.
    pub merged: Vec<SecretRecord>,
    /// One entry per client record, in batch order.
    pub outcomes: Vec<RecordOutcome>,
}

impl SyncReport {
    /// Outcomes whose server call failed.
    pub fn failures(&self) -> Vec<&RecordOutcome> {
        self.outcomes
            .iter()
            .filter(|o| o.outcome.is_failure())
            .collect()
    }

    /// `true` when every client record was applied.
    pub fn is_complete(&self) -> bool {
        !self.outcomes.iter().any(|o| o.outcome.is_failure())
    }
}

/// Reconciles client batches for one owner.
#[derive(Debug, Clone, Copy)]
pub struct SyncEngine {
    owner_id: i64,
}

impl SyncEngine {
    /// `owner_id` 0 means "unknown" and disables the ownership check.
    pub fn new(owner_id: i64) -> Self {
        Self { owner_id }
    }

    pub fn owner_id(&self) -> i64 {
        self.owner_id
    }

    /// Fetch the server snapshot and reconcile `batch` against it.
    ///
    /// Only a failure to fetch the snapshot fails the whole sync.
    pub fn sync<S>(&self, store: &mut S, batch: Vec<SecretRecord>) -> Result<SyncReport>
    where
        S: RemoteStore + ?Sized,
    {
        let snapshot = store.get_all(self.owner_id).map_err(|e| {
            warn!(error = %e, "could not fetch server snapshot");
            e
        })?;
        debug!(records = snapshot.len(), "fetched server snapshot");
        Ok(self.reconcile(store, batch, snapshot))
    }

    /// Merge `batch` into `snapshot`, writing client changes through `store`.
    pub fn reconcile<S>(
        &self,
        store: &mut S,
        batch: Vec<SecretRecord>,
        snapshot: Vec<SecretRecord>,
    ) -> SyncReport
    where
        S: RemoteStore + ?Sized,
    {
        let server_index: HashMap<i64, usize> = snapshot
            .iter()
            .enumerate()
            .map(|(pos, r)| (r.id, pos))
            .collect();
        let client_ids: HashSet<i64> = batch.iter().map(|r| r.id).filter(|&id| id > 0).collect();

        let mut report = SyncReport {
            merged: Vec::with_capacity(batch.len() + snapshot.len()),
            outcomes: Vec::with_capacity(batch.len()),
        };

        for mut record in batch {
            record.forget_plaintext();
            let server_copy = server_index.get(&record.id).map(|&pos| &snapshot[pos]);

            let outcome = if record.is_local_only() {
                report.merged.push(record.clone());
                SyncOutcome::LocalOnly
            } else if let Err(e) = self.check_owner(&record) {
                if let Some(s) = server_copy {
                    report.merged.push(s.clone());
                }
                SyncOutcome::Failed(e)
            } else if record.is_new() {
                self.create(store, &mut record, &mut report.merged, SyncOutcome::Created)
            } else if let Some(s) = server_copy {
                if record.updated_at > s.updated_at {
                    match store.update(&record) {
                        Ok(()) => {
                            report.merged.push(record.clone());
                            SyncOutcome::ClientWins
                        }
                        Err(e) => {
                            report.merged.push(s.clone());
                            SyncOutcome::Failed(e)
                        }
                    }
                } else {
                    report.merged.push(s.clone());
                    SyncOutcome::ServerWins
                }
            } else {
                let stale_id = record.id;
                record.id = 0;
                self.create(
                    store,
                    &mut record,
                    &mut report.merged,
                    SyncOutcome::Recreated { stale_id },
                )
            };

            log_outcome(&record, &outcome);
            report.outcomes.push(RecordOutcome { record, outcome });
        }

        report.merged.extend(
            snapshot
                .iter()
                .filter(|s| !client_ids.contains(&s.id))
                .cloned(),
        );

        info!(
            merged = report.merged.len(),
            applied = report.outcomes.len() - report.failures().len(),
            failed = report.failures().len(),
            "sync finished"
        );
        report
    }

    fn check_owner(&self, record: &SecretRecord) -> Result<()> {
        if self.owner_id != 0 && record.owner_id != 0 && record.owner_id != self.owner_id {
            return Err(LockboxError::AccessDenied(record.id));
        }
        Ok(())
    }

    fn create<S>(
        &self,
        store: &mut S,
        record: &mut SecretRecord,
        merged: &mut Vec<SecretRecord>,
        on_success: SyncOutcome,
    ) -> SyncOutcome
    where
        S: RemoteStore + ?Sized,
    {
        if record.owner_id == 0 {
            record.owner_id = self.owner_id;
        }
        match store.create(record) {
            Ok(id) => {
                record.id = id;
                merged.push(record.clone());
                on_success
            }
            Err(e) => SyncOutcome::Failed(e),
        }
    }
}

fn log_outcome(record: &SecretRecord, outcome: &SyncOutcome) {
    match outcome {
        SyncOutcome::Failed(e) => {
            warn!(id = record.id, kind = %record.kind, error = %e, "record not synced")
        }
        SyncOutcome::Recreated { stale_id } => {
            debug!(id = record.id, stale_id, "record recreated under a new id")
        }
        other => debug!(id = record.id, outcome = ?other, "record synced"),
    }
}
