//! Colored terminal output helpers.
//!
//! All user-facing output goes through these functions so we get
//! consistent styling across every command.

use comfy_table::{ContentArrangement, Table};
use console::style;

use crate::sync::{SyncOutcome, SyncReport};
use crate::vault::{Payload, SecretRecord};

/// Print a green success message: "check_mark {msg}"
pub fn success(msg: &str) {
    println!("{} {}", style("\u{2713}").green().bold(), msg);
}

/// Print a red error message: "x_mark {msg}"
pub fn error(msg: &str) {
    eprintln!("{} {}", style("\u{2717}").red().bold(), msg);
}

/// Print a yellow warning: "warning_sign {msg}"
pub fn warning(msg: &str) {
    eprintln!("{} {}", style("\u{26a0}").yellow().bold(), msg);
}

/// Print a blue info message: "info_sign {msg}"
pub fn info(msg: &str) {
    println!("{} {}", style("\u{2139}").blue().bold(), msg);
}

/// Print a dim tip/hint: "arrow {msg}"
pub fn tip(msg: &str) {
    println!("{} {}", style("\u{2192}").dim(), style(msg).dim());
}

/// Queue handle (`q<N>`) of a listed record, if it is a queued change.
///
/// `record` must come from `Session::records`, which hands out the queued
/// version itself for records with a pending change.
pub fn queue_handle(record: &SecretRecord, pending: &[SecretRecord]) -> Option<String> {
    pending
        .iter()
        .position(|p| std::ptr::eq(p, record))
        .map(|i| format!("q{}", i + 1))
}

/// Sync state of a listed record.
pub fn record_state(record: &SecretRecord, pending: &[SecretRecord]) -> String {
    if record.is_local_only() {
        return "local".to_string();
    }
    match queue_handle(record, pending) {
        Some(handle) => format!("pending {handle}"),
        None => "synced".to_string(),
    }
}

/// Print a table of records (ID, Kind, Name, Metadata, Updated, State).
pub fn print_records_table(records: &[&SecretRecord], pending: &[SecretRecord]) {
    if records.is_empty() {
        info("No secrets yet.");
        tip("Run `lockbox add <KIND> <NAME>` to add your first secret.");
        return;
    }

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["ID", "Kind", "Name", "Metadata", "Updated", "State"]);

    for r in records {
        // A queued create has no id yet; its queue handle stands in.
        let id = if r.is_new() {
            queue_handle(r, pending).unwrap_or_else(|| "-".to_string())
        } else {
            r.id.to_string()
        };
        table.add_row(vec![
            id,
            r.kind.to_string(),
            r.name.clone(),
            r.metadata.clone(),
            r.updated_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            record_state(r, pending),
        ]);
    }

    println!("{table}");
}

/// Print a decrypted payload.  File contents are summarized, not dumped.
pub fn print_payload(record: &SecretRecord, payload: &Payload) {
    println!("{} ({})", style(&record.name).bold(), record.kind);
    if !record.metadata.is_empty() {
        println!("  {} {}", style("note:").dim(), record.metadata);
    }

    match payload {
        Payload::Credential { login, password } => {
            println!("  login:    {login}");
            println!("  password: {password}");
        }
        Payload::Text { body } => {
            println!("{body}");
        }
        Payload::Card {
            number,
            holder,
            expiry,
            cvv,
        } => {
            println!("  number: {number}");
            println!("  holder: {holder}");
            println!("  expiry: {expiry}");
            println!("  cvv:    {cvv}");
        }
        Payload::File { filename, bytes } => {
            println!("  file: {filename} ({} bytes)", bytes.len());
            tip("Pass --out <PATH> to write the file contents.");
        }
    }
}

/// Summarize a sync: counts per outcome, then one line per failure.
pub fn print_sync_report(report: &SyncReport) {
    let mut created = 0;
    let mut pushed = 0;
    let mut kept = 0;
    for o in &report.outcomes {
        match o.outcome {
            SyncOutcome::Created | SyncOutcome::Recreated { .. } => created += 1,
            SyncOutcome::ClientWins => pushed += 1,
            SyncOutcome::ServerWins => kept += 1,
            SyncOutcome::LocalOnly | SyncOutcome::Failed(_) => {}
        }
    }

    success(&format!(
        "Synced {} record(s): {created} created, {pushed} updated, {kept} newer on server",
        report.merged.len()
    ));

    // Failed changes are re-queued in this order.
    let failures = report.failures();
    for (i, o) in failures.iter().enumerate() {
        if let SyncOutcome::Failed(e) = &o.outcome {
            warning(&format!("'{}' (q{}) not synced: {e}", o.record.name, i + 1));
        }
    }
    if !failures.is_empty() {
        tip("Queued changes are retried on every sync; `lockbox delete q<N>` drops one.");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vault::RecordKind;

    fn record(id: i64) -> SecretRecord {
        let mut r = SecretRecord::new(RecordKind::Text, "n", "", vec![]).unwrap();
        r.id = id;
        r
    }

    #[test]
    fn record_states() {
        let pending = vec![record(0), record(4)];
        assert_eq!(record_state(&record(-1), &pending), "local");
        assert_eq!(record_state(&pending[0], &pending), "pending q1");
        assert_eq!(record_state(&pending[1], &pending), "pending q2");
        assert_eq!(record_state(&record(5), &pending), "synced");
    }

    #[test]
    fn queue_handles_follow_queue_order() {
        let pending = vec![record(0), record(0)];
        assert_eq!(queue_handle(&pending[1], &pending).as_deref(), Some("q2"));
        assert_eq!(queue_handle(&record(0), &pending), None);
    }
}
