//! Cross-platform path utilities for Multichat.
//!
//! Single source of truth for where the daemon keeps its configuration.
//!
//! # Platform Behavior
//!
//! | Platform | Config Directory |
//! |----------|------------------|
//! | Linux    | `~/.config/multichat` |
//! | macOS    | `~/Library/Application Support/multichat` |
//! | Windows  | `%APPDATA%/multichat` |

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use thiserror::Error;

/// Errors specific to path operations.
#[derive(Error, Debug)]
pub enum PathError {
    #[error("Could not determine config directory")]
    NoConfigDirectory,
}

/// Application identifier used in path construction.
const APP_NAME: &str = "multichat";

/// Configuration file name inside the config directory.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Create `dir` (and parents) if missing, owner-only on Unix.
pub fn ensure_dir(dir: &Path) -> Result<()> {
    if dir.exists() {
        return Ok(());
    }

    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create directory: {}", dir.display()))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = fs::Permissions::from_mode(0o700);
        fs::set_permissions(dir, perms)
            .with_context(|| format!("Failed to set permissions on {}", dir.display()))?;
    }

    Ok(())
}

/// Location of the configuration directory, without touching the filesystem.
pub fn config_dir_path() -> Result<PathBuf> {
    let base = dirs::config_dir().ok_or(PathError::NoConfigDirectory)?;
    Ok(base.join(APP_NAME))
}

/// Location of the default configuration file, without touching the filesystem.
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir_path()?.join(CONFIG_FILE_NAME))
}
