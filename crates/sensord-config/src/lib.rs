//! Configuration management for sensord
//!
//! Device nodes, input-device names, and logging for the sensor daemon.
//! TOML files; every section falls back to the stock KXTF9/MAX9635 device nodes.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    NotFound(PathBuf),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

/// Standard configuration paths
pub const CONFIG_DIR: &str = "/etc/sensord";
pub const USER_CONFIG_DIR: &str = "/data/sensord";

/// Accelerometer section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AccelerometerConfig {
    pub enabled: bool,
    /// KXTF9 misc node
    pub control_path: PathBuf,
    /// Kernel name of the input device
    pub input_name: String,
    /// Initial sampling period
    pub delay_ms: u32,
}

impl Default for AccelerometerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            control_path: PathBuf::from("/dev/kxtf9"),
            input_name: "accelerometer".to_string(),
            delay_ms: 200,
        }
    }
}

/// Ambient-light section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LightConfig {
    pub enabled: bool,
    /// MAX9635 misc node, held open but not driven
    pub control_path: Option<PathBuf>,
    pub input_name: String,
}

impl Default for LightConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            control_path: Some(PathBuf::from("/dev/max9635")),
            input_name: "max9635_als".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `tracing_subscriber::EnvFilter` directive; `RUST_LOG` wins
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
        }
    }
}

/// Main sensord configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SensordConfig {
    #[serde(default)]
    pub accelerometer: AccelerometerConfig,

    #[serde(default)]
    pub light: LightConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl SensordConfig {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }
        let contents = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from default locations
    pub fn load_default() -> Result<Self, ConfigError> {
        // Try user config first, then system config
        let user_config = Path::new(USER_CONFIG_DIR).join("sensord.toml");
        if user_config.exists() {
            return Self::load(&user_config);
        }

        let system_config = Path::new(CONFIG_DIR).join("sensord.toml");
        if system_config.exists() {
            return Self::load(&system_config);
        }

        tracing::warn!("No configuration file found, using defaults");
        Ok(Self::default())
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let contents = toml::to_string_pretty(self)?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(path, contents)?;
        tracing::info!("Configuration saved to {}", path.display());
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.accelerometer.enabled && self.accelerometer.input_name.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "accelerometer.input_name must not be empty".into(),
            ));
        }
        if self.light.enabled && self.light.input_name.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "light.input_name must not be empty".into(),
            ));
        }
        Ok(())
    }
}

impl AccelerometerConfig {
    /// Initial delay in nanoseconds
    pub fn delay_ns(&self) -> i64 {
        i64::from(self.delay_ms) * 1_000_000
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = SensordConfig::default();
        assert_eq!(config.accelerometer.control_path, PathBuf::from("/dev/kxtf9"));
        assert_eq!(config.light.input_name, "max9635_als");
        assert_eq!(config.accelerometer.delay_ns(), 200_000_000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_serialize_deserialize() {
        let config = SensordConfig::default();
        let toml_str = toml::to_string(&config).unwrap();
        let parsed: SensordConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(config, parsed);
    }

    #[test]
    fn test_load_partial_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        let config_content = r#"
[accelerometer]
input_name = "kxtf9"
delay_ms = 20

[light]
enabled = false

[logging]
filter = "sensord=debug"
"#;
        temp_file.write_all(config_content.as_bytes()).unwrap();

        let config = SensordConfig::load(temp_file.path()).unwrap();
        assert_eq!(config.accelerometer.input_name, "kxtf9");
        assert_eq!(config.accelerometer.delay_ms, 20);
        assert_eq!(config.accelerometer.control_path, PathBuf::from("/dev/kxtf9"));
        assert!(!config.light.enabled);
        assert_eq!(config.logging.filter, "sensord=debug");
    }

    #[test]
    fn test_empty_input_name_rejected() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file
            .write_all(b"[accelerometer]\ninput_name = \"\"\n")
            .unwrap();

        let err = SensordConfig::load(temp_file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_missing_file() {
        let err = SensordConfig::load(Path::new("/nonexistent/sensord.toml")).unwrap_err();
        assert!(format!("{}", err).contains("not found"));
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("sensord.toml");

        let mut config = SensordConfig::default();
        config.light.input_name = "als".to_string();
        config.accelerometer.delay_ms = 66;
        config.save(&path).unwrap();

        let loaded = SensordConfig::load(&path).unwrap();
        assert_eq!(loaded, config);
    }
}
