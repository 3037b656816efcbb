//! `lockbox edit`: replace a secret's payload.

use std::path::Path;

use crate::cli::output;
use crate::cli::{read_payload, unlock_session, Cli};
use crate::errors::Result;
use crate::session::RecordRef;

/// Execute the `edit` command.
pub fn execute(cli: &Cli, id: RecordRef, file: Option<&Path>, offline: bool) -> Result<()> {
    let (mut session, _) = unlock_session(cli)?;

    // The kind is fixed for the life of a record.
    let kind = session.record(id)?.kind;

    let payload = read_payload(kind, file)?;
    let record = session.update(id, &payload)?;

    if offline || record.is_local_only() {
        output::success(&format!("Updated '{}'", record.name));
        return Ok(());
    }

    match session.sync() {
        Ok(report) => output::print_sync_report(&report),
        Err(e) => {
            output::warning(&format!("Updated locally but could not sync: {e}"));
            output::tip("Run `lockbox sync` once the server is reachable.");
        }
    }

    Ok(())
}
