//! CLI module: Clap argument parser, prompts, output helpers, and command implementations.

pub mod commands;
pub mod output;

use std::path::{Path, PathBuf};

use clap::Parser;
use dialoguer::{Input, Password};
use zeroize::Zeroizing;

use crate::config::paths::default_config_dir;
use crate::config::Settings;
use crate::errors::{LockboxError, Result};
use crate::master::MasterKeyManager;
use crate::session::{RecordRef, Session};
use crate::sync::HttpRemoteStore;
use crate::vault::{Payload, RecordKind};

/// Minimum password length to prevent trivially weak passwords.
const MIN_PASSWORD_LEN: usize = 8;

/// Lockbox CLI: zero-knowledge personal secret vault.
#[derive(Parser)]
#[command(
    name = "lockbox",
    about = "Zero-knowledge personal secret vault",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Vault user name
    #[arg(short, long, env = "LOCKBOX_USER", global = true)]
    pub user: Option<String>,

    /// Directory holding salts, hashes, caches and lockbox.toml (default: ~/.lockbox)
    #[arg(long, global = true)]
    pub config_dir: Option<PathBuf>,

    /// Server base URL (overrides lockbox.toml)
    #[arg(long, env = "LOCKBOX_SERVER_URL", global = true)]
    pub server: Option<String>,

    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// All available subcommands.
#[derive(clap::Subcommand)]
pub enum Commands {
    /// Set the master password for a user
    Init,

    /// Add a secret (synced immediately unless --offline)
    Add {
        /// Kind of secret: credential, text, card or file
        kind: RecordKind,
        /// Display name (1-100 characters)
        name: String,
        /// Unencrypted note shown in listings
        #[arg(short, long, default_value = "")]
        metadata: String,
        /// Read the payload from a file (file kind: raw bytes, text kind: UTF-8 body)
        #[arg(short, long)]
        file: Option<PathBuf>,
        /// Keep the secret on this machine only; it is never sent to the server
        #[arg(long)]
        local_only: bool,
        /// Queue the secret without contacting the server
        #[arg(long)]
        offline: bool,
    },

    /// List secrets (names and metadata only)
    List,

    /// Decrypt and show a secret
    Show {
        /// Record id, or q<N> for a queued change
        #[arg(allow_hyphen_values = true)]
        id: RecordRef,
        /// Write a file secret's bytes to this path instead of describing it
        #[arg(short, long)]
        out: Option<PathBuf>,
        /// Re-read the record from the server first
        #[arg(long)]
        refresh: bool,
    },

    /// Replace a secret's payload
    Edit {
        /// Record id, or q<N> for a queued change
        #[arg(allow_hyphen_values = true)]
        id: RecordRef,
        /// Read the new payload from a file
        #[arg(short, long)]
        file: Option<PathBuf>,
        /// Queue the change without contacting the server
        #[arg(long)]
        offline: bool,
    },

    /// Delete a secret, or discard a queued change (q<N>)
    Delete {
        /// Record id, or q<N> for a queued change
        #[arg(allow_hyphen_values = true)]
        id: RecordRef,
        /// Skip confirmation prompt
        #[arg(long)]
        force: bool,
    },

    /// Reconcile queued changes with the server
    Sync {
        /// Keep syncing every `sync_interval_secs`
        #[arg(short, long)]
        watch: bool,
    },

    /// Show version information
    Version,
}

// ---------------------------------------------------------------------------
// Shared helpers used by multiple commands
// ---------------------------------------------------------------------------

/// The config directory from `--config-dir`, or `~/.lockbox`.
pub fn config_dir(cli: &Cli) -> Result<PathBuf> {
    match &cli.config_dir {
        Some(dir) => Ok(dir.clone()),
        None => default_config_dir(),
    }
}

/// The user name from `--user` / `LOCKBOX_USER`.
pub fn username(cli: &Cli) -> Result<&str> {
    cli.user
        .as_deref()
        .filter(|u| !u.is_empty())
        .ok_or(LockboxError::UsernameRequired)
}

/// Load `lockbox.toml`, then apply command-line overrides.
pub fn load_settings(cli: &Cli) -> Result<Settings> {
    let mut settings = Settings::load(&config_dir(cli)?)?;
    if let Some(server) = &cli.server {
        settings.server_url = server.clone();
    }
    settings.validate()?;
    Ok(settings)
}

/// Build the HTTP store from settings and the `LOCKBOX_TOKEN` bearer token.
pub fn remote_store(settings: &Settings) -> HttpRemoteStore {
    let token = std::env::var("LOCKBOX_TOKEN").ok();
    HttpRemoteStore::new(&settings.server_url, token, settings.request_timeout())
}

/// Open a session for the CLI user and unlock it with the master password.
pub fn unlock_session(cli: &Cli) -> Result<(Session<HttpRemoteStore>, Settings)> {
    let settings = load_settings(cli)?;
    let manager = MasterKeyManager::new(&config_dir(cli)?, username(cli)?)?;
    if !manager.has_master_password() {
        return Err(LockboxError::MasterPasswordNotSet(
            manager.username().to_string(),
        ));
    }

    let mut session = Session::open(manager, remote_store(&settings), settings.owner_id);
    let password = prompt_password()?;
    session.unlock(password.as_bytes())?;
    Ok((session, settings))
}

/// Get the master password, trying in order:
/// 1. `LOCKBOX_PASSWORD` env var (CI/CD)
/// 2. Interactive prompt
///
/// Returns `Zeroizing<String>` so the password is wiped from memory on drop.
pub fn prompt_password() -> Result<Zeroizing<String>> {
    if let Ok(pw) = std::env::var("LOCKBOX_PASSWORD") {
        if !pw.is_empty() {
            return Ok(Zeroizing::new(pw));
        }
    }

    let pw = Password::new()
        .with_prompt("Master password")
        .interact()
        .map_err(|e| LockboxError::CommandFailed(format!("password prompt: {e}")))?;
    Ok(Zeroizing::new(pw))
}

/// Prompt for a new master password with confirmation (used by `init`).
///
/// Also respects `LOCKBOX_PASSWORD` for scripted/CI usage.
/// Enforces a minimum password length.
pub fn prompt_new_password() -> Result<Zeroizing<String>> {
    if let Ok(pw) = std::env::var("LOCKBOX_PASSWORD") {
        if !pw.is_empty() {
            if pw.chars().count() < MIN_PASSWORD_LEN {
                return Err(LockboxError::CommandFailed(format!(
                    "password must be at least {MIN_PASSWORD_LEN} characters"
                )));
            }
            return Ok(Zeroizing::new(pw));
        }
    }

    loop {
        let password = Password::new()
            .with_prompt("Choose master password")
            .with_confirmation(
                "Confirm master password",
                "Passwords do not match, try again",
            )
            .interact()
            .map_err(|e| LockboxError::CommandFailed(format!("password prompt: {e}")))?;

        if password.chars().count() < MIN_PASSWORD_LEN {
            output::warning(&format!(
                "Password must be at least {MIN_PASSWORD_LEN} characters. Try again."
            ));
            continue;
        }

        return Ok(Zeroizing::new(password));
    }
}

/// Build a payload of `kind`, from `file` when given, otherwise by
/// prompting for each field.
pub fn read_payload(kind: RecordKind, file: Option<&Path>) -> Result<Payload> {
    match (kind, file) {
        (RecordKind::File, Some(path)) => {
            let bytes = std::fs::read(path)?;
            let filename = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            Ok(Payload::File { filename, bytes })
        }
        (RecordKind::File, None) => Err(LockboxError::CommandFailed(
            "file secrets need --file <PATH>".into(),
        )),
        (RecordKind::Text, Some(path)) => {
            let body = std::fs::read_to_string(path)?;
            Ok(Payload::Text { body })
        }
        (RecordKind::Text, None) => Ok(Payload::Text {
            body: ask("Text")?,
        }),
        (RecordKind::Credential, None) => Ok(Payload::Credential {
            login: ask("Login")?,
            password: ask_hidden("Password")?,
        }),
        (RecordKind::Card, None) => Ok(Payload::Card {
            number: ask("Card number")?,
            holder: ask("Card holder")?,
            expiry: ask("Expiry (MM/YY)")?,
            cvv: ask_hidden("CVV")?,
        }),
        (RecordKind::Credential | RecordKind::Card, Some(_)) => Err(LockboxError::CommandFailed(
            format!("--file is only supported for file and text secrets, not {kind}"),
        )),
    }
}

fn ask(prompt: &str) -> Result<String> {
    Input::<String>::new()
        .with_prompt(prompt)
        .interact_text()
        .map_err(|e| LockboxError::CommandFailed(format!("{prompt} prompt: {e}")))
}

fn ask_hidden(prompt: &str) -> Result<String> {
    Password::new()
        .with_prompt(prompt)
        .interact()
        .map_err(|e| LockboxError::CommandFailed(format!("{prompt} prompt: {e}")))
}
