//! `lockbox sync`: reconcile queued changes with the server.

use std::thread;

use tracing::warn;

use crate::cli::output;
use crate::cli::{unlock_session, Cli};
use crate::errors::{LockboxError, Result};

/// Execute the `sync` command.
///
/// With `--watch`, syncs again every `sync_interval_secs` until
/// interrupted.  Errors in watch mode are reported and the loop goes on.
pub fn execute(cli: &Cli, watch: bool) -> Result<()> {
    let (mut session, settings) = unlock_session(cli)?;

    if !watch {
        let report = session.sync()?;
        output::print_sync_report(&report);

        let failed = report.failures().len();
        if failed > 0 {
            return Err(LockboxError::SyncIncomplete(failed));
        }
        return Ok(());
    }

    output::info(&format!(
        "Syncing every {}s against {} (Ctrl-C to stop)",
        settings.sync_interval_secs, settings.server_url
    ));
    loop {
        match session.sync() {
            Ok(report) => output::print_sync_report(&report),
            Err(e) => {
                warn!(error = %e, "background sync failed");
                output::warning(&format!("Sync failed: {e}"));
            }
        }
        thread::sleep(settings.sync_interval());
    }
}
