//! Configuration and patch files for patchbay.
//!
//! - **Patch files**: page descriptions stored as JSON ([`PatchFile`])
//! - **Engine settings**: sample rate, block size, log level and tick count
//!   stored as TOML ([`EngineConfig`])
//! - **Paths**: platform-specific user directories ([`paths`])
//!
//! # Example
//!
//! ```rust,no_run
//! use patchbay_config::{EngineConfig, PatchFile, user_patches_dir};
//!
//! let config = EngineConfig::load("engine.toml").unwrap_or_default();
//! let patch = PatchFile::load(user_patches_dir().join("sine.json")).unwrap();
//! let page = patch.to_page();
//! page.start_dsp(config.sample_rate, config.block_size);
//! ```

mod engine_config;
mod error;
mod patch_file;

/// Platform-specific paths for configuration and patches.
pub mod paths;

pub use engine_config::EngineConfig;
pub use error::ConfigError;
pub use patch_file::PatchFile;
pub use paths::{
    default_engine_config_path, ensure_user_dirs, find_patch, list_patches, user_config_dir,
    user_patches_dir,
};
