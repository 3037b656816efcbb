//! `lockbox delete`: remove a secret from the server and this machine, or
//! discard a queued change.

use dialoguer::Confirm;

use crate::cli::output;
use crate::cli::{unlock_session, Cli};
use crate::errors::{LockboxError, Result};
use crate::session::RecordRef;

/// Execute the `delete` command.
pub fn execute(cli: &Cli, id: RecordRef, force: bool) -> Result<()> {
    let (mut session, _) = unlock_session(cli)?;

    let name = session.record(id)?.name.clone();
    let queued = matches!(id, RecordRef::Queued(_));

    // Unless --force is set, ask for confirmation before deleting.
    if !force {
        let prompt = if queued {
            format!("Discard queued change to '{name}'?")
        } else {
            format!("Delete secret '{name}'?")
        };
        let confirmed = Confirm::new()
            .with_prompt(prompt)
            .default(false)
            .interact()
            .map_err(|e| LockboxError::CommandFailed(format!("confirm prompt: {e}")))?;

        if !confirmed {
            output::info("Cancelled.");
            return Ok(());
        }
    }

    session.delete(id)?;
    if queued {
        output::success(&format!("Discarded queued change to '{name}'"));
    } else {
        output::success(&format!("Deleted secret '{name}'"));
    }

    Ok(())
}
