//! Configuration management for crabctrl
//!
//! Loads and saves the device node, open mode, log level and control presets
//! from a TOML file.

use crate::controls::{ControlEntry, ControlInfoMap, ControlList, ControlValue};
use crate::errors::ConfigError;
use crate::v4l2::{AccessMode, OpenFlags, V4l2CtrlType};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Root configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CrabCtrlConfig {
    pub device: DeviceConfig,
    pub logging: LoggingConfig,
    /// Control values applied by `crabctrl-cli apply`, keyed by control name
    /// or id (`"brightness"`, `"0x00980900"`, `"9963776"`).
    pub presets: BTreeMap<String, i64>,
}

/// Device selection and open mode
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    /// Device node to open
    pub node: PathBuf,
    pub access: AccessMode,
    /// Open with `O_NONBLOCK`
    pub non_blocking: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `env_logger` filter used when `RUST_LOG` is unset
    pub level: String,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            node: PathBuf::from("/dev/video0"),
            access: AccessMode::ReadWrite,
            non_blocking: false,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl Default for CrabCtrlConfig {
    fn default() -> Self {
        Self {
            device: DeviceConfig::default(),
            logging: LoggingConfig::default(),
            presets: BTreeMap::new(),
        }
    }
}

const LOG_LEVELS: [&str; 6] = ["off", "error", "warn", "info", "debug", "trace"];

impl CrabCtrlConfig {
    /// Load configuration from TOML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        if !path.exists() {
            log::info!("Config file not found at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path).map_err(ConfigError::Read)?;
        let config: CrabCtrlConfig = toml::from_str(&contents)?;
        config.validate()?;

        log::info!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    /// Save configuration to TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let path = path.as_ref();

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(ConfigError::Write)?;
        }

        let toml_string = toml::to_string_pretty(self)?;
        fs::write(path, toml_string).map_err(ConfigError::Write)?;

        log::info!("Saved configuration to {:?}", path);
        Ok(())
    }

    /// Get default config file path
    pub fn default_path() -> PathBuf {
        PathBuf::from("crabctrl.toml")
    }

    /// Load from default location, falling back to defaults on any error
    pub fn load_or_default() -> Self {
        Self::load_from_file(Self::default_path()).unwrap_or_else(|e| {
            log::warn!("Failed to load config, using defaults: {}", e);
            Self::default()
        })
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.device.node.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("device node must not be empty".to_string()));
        }

        let level = self.logging.level.to_ascii_lowercase();
        if !LOG_LEVELS.contains(&level.as_str()) {
            return Err(ConfigError::Invalid(format!(
                "unknown log level '{}'",
                self.logging.level
            )));
        }

        if let Some(key) = self.presets.keys().find(|k| k.trim().is_empty()) {
            return Err(ConfigError::Invalid(format!("empty preset name {:?}", key)));
        }

        Ok(())
    }

    /// Build the control list for the configured presets.
    ///
    /// Every preset must name a scalar control in `controls`, and its value
    /// must fit the control type.
    pub fn preset_controls(&self, controls: &ControlInfoMap) -> Result<ControlList, ConfigError> {
        let mut list = ControlList::with_capacity(self.presets.len());

        for (name, &value) in &self.presets {
            let entry = controls
                .resolve(name)
                .ok_or_else(|| ConfigError::Invalid(format!("preset names unknown control '{}'", name)))?;
            list.set(entry.id.id(), preset_value(entry, value)?);
        }

        Ok(list)
    }

    /// Open flags for the configured device
    pub fn open_flags(&self) -> OpenFlags {
        let flags = OpenFlags {
            access: self.device.access,
            non_blocking: false,
        };
        if self.device.non_blocking {
            flags.non_blocking()
        } else {
            flags
        }
    }
}

fn preset_value(entry: &ControlEntry, value: i64) -> Result<ControlValue, ConfigError> {
    let desc = &entry.descriptor;
    let name = entry.id.name();

    if desc.has_payload() {
        return Err(ConfigError::Invalid(format!(
            "preset for '{}' needs an array or string value",
            name
        )));
    }

    let value = match desc.ctrl_type {
        V4l2CtrlType::Boolean => ControlValue::Bool(value != 0),
        V4l2CtrlType::Integer64 => ControlValue::Integer64(value),
        _ => ControlValue::Integer32(i32::try_from(value).map_err(|_| {
            ConfigError::Invalid(format!("preset {} for '{}' does not fit 32 bits", value, name))
        })?),
    };

    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = CrabCtrlConfig::default();
        assert_eq!(config.device.node, PathBuf::from("/dev/video0"));
        assert_eq!(config.logging.level, "info");
        assert!(config.presets.is_empty());
        assert_eq!(config.open_flags(), OpenFlags::READ_WRITE);
    }

    #[test]
    fn test_config_validation() {
        let config = CrabCtrlConfig::default();
        assert!(config.validate().is_ok());

        let mut bad_node = config.clone();
        bad_node.device.node = PathBuf::new();
        assert!(bad_node.validate().is_err());

        let mut bad_level = CrabCtrlConfig::default();
        bad_level.logging.level = "loud".to_string();
        assert!(matches!(bad_level.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_config_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("nested").join("crabctrl.toml");

        let mut config = CrabCtrlConfig::default();
        config.device.node = PathBuf::from("/dev/video2");
        config.device.non_blocking = true;
        config.presets.insert("brightness".to_string(), 140);
        config.save_to_file(&config_path).unwrap();

        let loaded = CrabCtrlConfig::load_from_file(&config_path).unwrap();
        assert_eq!(loaded, config);
        assert!(loaded.open_flags().non_blocking);
    }

    #[test]
    fn test_config_toml_format() {
        let mut config = CrabCtrlConfig::default();
        config.presets.insert("0x00980900".to_string(), 100);
        let toml_string = toml::to_string_pretty(&config).unwrap();

        assert!(toml_string.contains("[device]"));
        assert!(toml_string.contains("[logging]"));
        assert!(toml_string.contains("[presets]"));
        assert!(toml_string.contains("access = \"read-write\""));
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let config: CrabCtrlConfig = toml::from_str("[device]\naccess = \"read-only\"\n").unwrap();
        assert_eq!(config.device.node, PathBuf::from("/dev/video0"));
        assert_eq!(config.open_flags(), OpenFlags::READ_ONLY);
    }

    #[test]
    fn test_load_nonexistent_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = CrabCtrlConfig::load_from_file(dir.path().join("missing.toml"));
        assert_eq!(result.unwrap(), CrabCtrlConfig::default());
    }

    #[test]
    fn test_load_malformed_file() {
        let file = tempfile::NamedTempFile::new().unwrap();
        fs::write(file.path(), "[device\nnode = 3").unwrap();
        assert!(matches!(
            CrabCtrlConfig::load_from_file(file.path()),
            Err(ConfigError::Parse(_))
        ));
    }
}
