//! Platform-specific paths for configuration and patches.
//!
//! - **User config**: `~/.config/patchbay/` (Linux), `~/Library/Application Support/patchbay/` (macOS), `%APPDATA%\patchbay\` (Windows)
//! - **User patches**: `patches/` inside the user config directory

use std::path::{Path, PathBuf};

use crate::error::ConfigError;

/// Application name used for directory paths.
const APP_NAME: &str = "patchbay";

/// Subdirectory name for patches.
const PATCHES_SUBDIR: &str = "patches";

/// Name of the engine settings file in the config directory.
pub const ENGINE_CONFIG_FILE: &str = "engine.toml";

/// Returns the user-specific configuration directory.
///
/// Falls back to the current directory if the platform config directory
/// cannot be determined.
pub fn user_config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_NAME)
}

/// Returns the user-specific patches directory.
pub fn user_patches_dir() -> PathBuf {
    user_config_dir().join(PATCHES_SUBDIR)
}

/// Returns the default engine settings path.
pub fn default_engine_config_path() -> PathBuf {
    user_config_dir().join(ENGINE_CONFIG_FILE)
}

/// Creates the user config and patches directories if needed.
pub fn ensure_user_dirs() -> Result<PathBuf, ConfigError> {
    let patches = user_patches_dir();
    ensure_dir(&patches)?;
    Ok(patches)
}

fn ensure_dir(path: &Path) -> Result<(), ConfigError> {
    if !path.exists() {
        std::fs::create_dir_all(path).map_err(|e| ConfigError::create_dir(path, e))?;
        tracing::debug!(path = %path.display(), "directory created");
    }
    Ok(())
}

/// Lists `.json` patches in `dir`, sorted by file name.
///
/// A missing directory yields an empty list.
pub fn list_patches(dir: impl AsRef<Path>) -> Vec<PathBuf> {
    let Ok(entries) = std::fs::read_dir(dir.as_ref()) else {
        return Vec::new();
    };
    let mut patches: Vec<PathBuf> = entries
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| path.is_file() && path.extension().is_some_and(|ext| ext == "json"))
        .collect();
    patches.sort();
    patches
}

/// Resolves a patch argument: an existing path, or a name in the user
/// patches directory (with or without `.json`).
pub fn find_patch(name: &str) -> Option<PathBuf> {
    let path = PathBuf::from(name);
    if path.is_file() {
        return Some(path);
    }
    let filename = if name.ends_with(".json") {
        name.to_string()
    } else {
        format!("{name}.json")
    };
    let candidate = user_patches_dir().join(filename);
    candidate.is_file().then_some(candidate)
}
