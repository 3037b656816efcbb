//! Locations and permissions of per-user files.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::errors::{LockboxError, Result};

/// Name of the config directory under `$HOME`.
const CONFIG_DIR_NAME: &str = ".lockbox";

/// Resolve the default config directory, `$HOME/.lockbox`.
pub fn default_config_dir() -> Result<PathBuf> {
    let home = std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .map_err(|_| {
            LockboxError::ConfigError(
                "cannot locate home directory, pass --config-dir explicitly".into(),
            )
        })?;
    Ok(PathBuf::from(home).join(CONFIG_DIR_NAME))
}

/// Create `dir` (and parents) if missing, restricted to the owner.
pub fn ensure_private_dir(dir: &Path) -> Result<()> {
    if dir.as_os_str().is_empty() || dir.exists() {
        return Ok(());
    }

    fs::create_dir_all(dir)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(dir, fs::Permissions::from_mode(0o700))?;
    }

    Ok(())
}

/// Write `data` to `path` readable by the owner only.
///
/// The parent directory is created with owner-only access if missing.
pub fn write_private(path: &Path, data: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        ensure_private_dir(parent)?;
    }

    // Created owner-only, so the contents are never readable by others.
    #[cfg(unix)]
    let mut file = {
        use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};
        let file = fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .mode(0o600)
            .open(path)?;
        // `mode` only applies on creation.
        file.set_permissions(fs::Permissions::from_mode(0o600))?;
        file
    };

    #[cfg(not(unix))]
    let mut file = fs::File::create(path)?;

    file.write_all(data)?;
    file.sync_all()?;
    Ok(())
}

/// Write `data` to `path` atomically: temp file in the same directory,
/// then rename.  Readers never observe a half-written file.
pub fn write_private_atomic(path: &Path, data: &[u8]) -> Result<()> {
    let parent = path.parent().unwrap_or(Path::new("."));
    let tmp_path = parent.join(format!(
        ".{}.tmp",
        path.file_name().unwrap_or_default().to_string_lossy()
    ));

    write_private(&tmp_path, data)?;
    fs::rename(&tmp_path, path)?;
    Ok(())
}
