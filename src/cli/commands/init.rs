//! `lockbox init`: set the master password for a user.

use crate::cli::output;
use crate::cli::{config_dir, prompt_new_password, username, Cli};
use crate::config::paths::ensure_private_dir;
use crate::errors::{LockboxError, Result};
use crate::master::MasterKeyManager;

/// Execute the `init` command.
pub fn execute(cli: &Cli) -> Result<()> {
    let dir = config_dir(cli)?;
    let user = username(cli)?;

    // 1. Create the private config directory if it doesn't exist.
    if !dir.exists() {
        ensure_private_dir(&dir)?;
        output::info(&format!("Created config directory: {}", dir.display()));
    }

    // 2. Refuse to overwrite an existing master password: records already
    //    encrypted under it would not be re-encrypted.
    let manager = MasterKeyManager::new(&dir, user)?;
    if manager.has_master_password() {
        output::tip("Records are never re-encrypted, so the master password cannot be reset.");
        return Err(LockboxError::CommandFailed(format!(
            "'{user}' already has a master password"
        )));
    }

    // 3. Prompt for the new password (with confirmation) and persist
    //    the salt and verification hash.
    let password = prompt_new_password()?;
    manager.set_master_password(password.as_bytes())?;

    output::success(&format!("Master password set for '{user}'"));
    output::tip("Run `lockbox add <KIND> <NAME>` to add a secret.");
    output::tip("Set LOCKBOX_TOKEN to the token from your server to enable sync.");

    Ok(())
}
