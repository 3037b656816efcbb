//! `lockbox version`: display version information.

use console::style;

use crate::errors::Result;

/// Execute the `version` command.
pub fn execute() -> Result<()> {
    println!(
        "{} {}",
        style("lockbox").bold(),
        env!("CARGO_PKG_VERSION")
    );
    println!(
        "{}",
        style("AES-256-GCM payloads, Argon2id key derivation").dim()
    );
    Ok(())
}
