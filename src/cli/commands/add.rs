//! `lockbox add`: encrypt a new secret and queue it for sync.

use std::path::Path;

use crate::cli::output;
use crate::cli::{read_payload, unlock_session, Cli};
use crate::errors::Result;
use crate::vault::RecordKind;

/// Execute the `add` command.
pub fn execute(
    cli: &Cli,
    kind: RecordKind,
    name: &str,
    metadata: &str,
    file: Option<&Path>,
    local_only: bool,
    offline: bool,
) -> Result<()> {
    // Validate the name before asking for any secret fields.
    crate::vault::record::validate_name(name)?;

    let (mut session, _) = unlock_session(cli)?;
    let payload = read_payload(kind, file)?;

    if local_only {
        let record = session.add_local_only(name, metadata, &payload)?;
        output::success(&format!(
            "Stored local-only {kind} '{name}' with id {}",
            record.id
        ));
        return Ok(());
    }

    session.add(name, metadata, &payload)?;
    if offline {
        output::success(&format!("Queued {kind} '{name}' for the next sync"));
        return Ok(());
    }

    // The record is already safe in the local queue; a failed sync only
    // delays the upload.
    match session.sync() {
        Ok(report) => output::print_sync_report(&report),
        Err(e) => {
            output::warning(&format!("Saved locally but could not sync: {e}"));
            output::tip("Run `lockbox sync` once the server is reachable.");
        }
    }

    Ok(())
}
