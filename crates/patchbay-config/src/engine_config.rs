//! Engine settings stored as TOML.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Settings for running patches.
///
/// # TOML Format
///
/// ```toml
/// sample_rate = 48000
/// block_size = 128
/// log_level = "debug"
/// ticks = 32
/// ```
///
/// Missing keys take their defaults.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct EngineConfig {
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Samples per DSP tick.
    pub block_size: usize,
    /// Default log filter when `RUST_LOG` is unset.
    pub log_level: String,
    /// Number of blocks processed by `run`.
    pub ticks: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sample_rate: 44_100,
            block_size: 64,
            log_level: "info".to_string(),
            ticks: 16,
        }
    }
}

impl EngineConfig {
    /// Load settings from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigError::read_file(path, e))?;
        let config = Self::from_toml(&content)?;
        tracing::debug!(path = %path.display(), "engine config loaded");
        Ok(config)
    }

    /// Parse and validate settings from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = toml::from_str(toml_str)?;
        config.validate()?;
        Ok(config)
    }

    /// Save the settings to a TOML file, creating parent directories.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::create_dir(parent, e))?;
        }
        std::fs::write(path, self.to_toml()?).map_err(|e| ConfigError::write_file(path, e))
    }

    /// Convert the settings to a TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Rejects a zero sample rate or block size.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sample_rate == 0 {
            return Err(ConfigError::InvalidSetting {
                key: "sample_rate",
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.block_size == 0 {
            return Err(ConfigError::InvalidSetting {
                key: "block_size",
                reason: "must be greater than zero".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.sample_rate, 44_100);
        assert_eq!(config.block_size, 64);
        assert_eq!(config.log_level, "info");
        assert_eq!(config.ticks, 16);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn missing_keys_take_defaults() {
        let config = EngineConfig::from_toml("block_size = 256").unwrap();
        assert_eq!(config.block_size, 256);
        assert_eq!(config.sample_rate, 44_100);
    }

    #[test]
    fn zero_settings_are_rejected() {
        let err = EngineConfig::from_toml("sample_rate = 0").unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidSetting {
                key: "sample_rate",
                ..
            }
        ));
        let err = EngineConfig::from_toml("block_size = 0").unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidSetting {
                key: "block_size",
                ..
            }
        ));
    }

    #[test]
    fn malformed_toml_is_a_parse_error() {
        let err = EngineConfig::from_toml("sample_rate = \"fast\"").unwrap_err();
        assert!(matches!(err, ConfigError::TomlParse(_)));
    }

    #[test]
    fn toml_round_trip() {
        let config = EngineConfig {
            sample_rate: 96_000,
            block_size: 32,
            log_level: "debug".to_string(),
            ticks: 4,
        };
        let text = config.to_toml().unwrap();
        assert_eq!(EngineConfig::from_toml(&text).unwrap(), config);
    }
}
