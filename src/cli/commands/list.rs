//! `lockbox list`: display all secrets in a table.

use crate::cli::output;
use crate::cli::{unlock_session, Cli};
use crate::errors::Result;

/// Execute the `list` command.
pub fn execute(cli: &Cli) -> Result<()> {
    let (session, _) = unlock_session(cli)?;

    let records = session.records()?;
    let pending = session.pending()?;

    let last_sync = match session.last_sync_at()? {
        Some(at) => at.format("%Y-%m-%d %H:%M:%S").to_string(),
        None => "never".to_string(),
    };
    output::info(&format!(
        "{} — {} secret(s), {} pending, last sync {last_sync}",
        session.username(),
        records.len(),
        pending.len()
    ));

    output::print_records_table(&records, pending);

    Ok(())
}
