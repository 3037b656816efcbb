use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::errors::{LockboxError, Result};

/// Client configuration, loaded from `<config_dir>/lockbox.toml`.
///
/// Every field has a sensible default so Lockbox works out-of-the-box
/// without any config file at all.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Base URL of the remote store (e.g. "https://vault.example.com").
    #[serde(default = "default_server_url")]
    pub server_url: String,

    /// Deadline for a single remote call, in seconds (default: 10).
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Interval between background syncs in watch mode (default: 15).
    #[serde(default = "default_sync_interval_secs")]
    pub sync_interval_secs: u64,

    /// Server-side user id, when known.  Zero disables the ownership check.
    #[serde(default)]
    pub owner_id: i64,
}

// ── Serde default helpers ────────────────────────────────────────────

fn default_server_url() -> String {
    "http://localhost:8080".to_string()
}

fn default_request_timeout_secs() -> u64 {
    10
}

fn default_sync_interval_secs() -> u64 {
    15
}

// ── Implementation ───────────────────────────────────────────────────

impl Default for Settings {
    fn default() -> Self {
        Self {
            server_url: default_server_url(),
            request_timeout_secs: default_request_timeout_secs(),
            sync_interval_secs: default_sync_interval_secs(),
            owner_id: 0,
        }
    }
}

impl Settings {
    /// Name of the config file we look for in the config directory.
    pub const FILE_NAME: &'static str = "lockbox.toml";

    /// Load settings from `<config_dir>/lockbox.toml`.
    ///
    /// If the file does not exist, sensible defaults are returned.
    /// If the file exists but cannot be parsed, an error is returned.
    pub fn load(config_dir: &Path) -> Result<Self> {
        let config_path = config_dir.join(Self::FILE_NAME);

        if !config_path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(&config_path)?;

        let settings: Settings = toml::from_str(&contents).map_err(|e| {
            LockboxError::ConfigError(format!("Failed to parse {}: {e}", config_path.display()))
        })?;

        settings.validate()?;
        Ok(settings)
    }

    /// Reject values that would make the client unusable.
    pub fn validate(&self) -> Result<()> {
        if self.server_url.trim().is_empty() {
            return Err(LockboxError::ConfigError("server_url cannot be empty".into()));
        }
        if self.request_timeout_secs == 0 {
            return Err(LockboxError::ConfigError(
                "request_timeout_secs must be at least 1".into(),
            ));
        }
        if self.sync_interval_secs == 0 {
            return Err(LockboxError::ConfigError(
                "sync_interval_secs must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// Deadline applied to every remote call.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Pause between syncs in watch mode.
    pub fn sync_interval(&self) -> Duration {
        Duration::from_secs(self.sync_interval_secs)
    }
}

// ── Tests ────────────────────────────────────────────────────────────
