//! `lockbox show`: decrypt and print a single secret.

use std::path::Path;

use crate::cli::output;
use crate::cli::{unlock_session, Cli};
use crate::config::paths::write_private;
use crate::errors::{LockboxError, Result};
use crate::session::RecordRef;
use crate::vault::Payload;

/// Execute the `show` command.
pub fn execute(cli: &Cli, id: RecordRef, out: Option<&Path>, refresh: bool) -> Result<()> {
    let (mut session, _) = unlock_session(cli)?;

    if refresh {
        match id {
            RecordRef::Id(server_id) if server_id > 0 => {
                session.fetch(server_id)?;
            }
            _ => {
                return Err(LockboxError::CommandFailed(format!(
                    "{id} has no server copy to refresh"
                )));
            }
        }
    }

    let payload = session.reveal(id)?;
    let record = session.record(id)?.clone();

    match (out, &payload) {
        (Some(path), Payload::File { bytes, .. }) => {
            write_private(path, bytes)?;
            output::success(&format!(
                "Wrote {} bytes to {}",
                bytes.len(),
                path.display()
            ));
        }
        (Some(_), _) => {
            return Err(LockboxError::CommandFailed(format!(
                "--out only applies to file secrets; '{}' is a {}",
                record.name, record.kind
            )));
        }
        (None, _) => output::print_payload(&record, &payload),
    }

    Ok(())
}
