//! Bridge configuration - `.jsbridge.toml`
//!
//! Every key is optional; a missing section or key takes its default.

use crate::errors::ConfigError;
use crate::logging::{self, LogConfig, LogFormat};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Config file name searched by [`BridgeConfig::discover`]
pub const CONFIG_FILE_NAME: &str = ".jsbridge.toml";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BridgeConfig {
    #[serde(default)]
    pub environment: EnvironmentConfig,

    #[serde(default)]
    pub allocator: AllocatorConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentConfig {
    /// Handle slots reserved up front
    #[serde(default = "default_object_capacity")]
    pub initial_object_capacity: usize,

    #[serde(default = "default_class_capacity")]
    pub initial_class_capacity: usize,

    #[serde(default = "default_false")]
    pub battery_save_mode: bool,

    /// Force-finalize remaining handles when the environment is dropped
    #[serde(default = "default_true")]
    pub sweep_on_drop: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllocatorConfig {
    /// Slots in the first pool page
    #[serde(default = "default_page_size")]
    pub page_size: usize,

    #[serde(default = "default_max_page_size")]
    pub max_page_size: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_level")]
    pub level: String,

    /// pretty, compact or json
    #[serde(default = "default_format")]
    pub format: String,

    /// Rolling log file; stderr when unset
    #[serde(default)]
    pub file: Option<PathBuf>,
}

impl Default for EnvironmentConfig {
    fn default() -> Self {
        Self {
            initial_object_capacity: default_object_capacity(),
            initial_class_capacity: default_class_capacity(),
            battery_save_mode: false,
            sweep_on_drop: true,
        }
    }
}

impl Default for AllocatorConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            max_page_size: default_max_page_size(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            format: default_format(),
            file: None,
        }
    }
}

fn default_true() -> bool { true }
fn default_false() -> bool { false }
fn default_object_capacity() -> usize { 256 }
fn default_class_capacity() -> usize { 64 }
fn default_page_size() -> usize { crate::allocator::DEFAULT_PAGE_SIZE }
fn default_max_page_size() -> usize { crate::allocator::MAX_PAGE_SIZE }
fn default_level() -> String { "info".to_string() }
fn default_format() -> String { "compact".to_string() }

impl BridgeConfig {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parse configuration from a TOML string
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Find and load `.jsbridge.toml` from the current directory or its parents
    pub fn discover() -> Self {
        match std::env::current_dir() {
            Ok(dir) => Self::discover_from(&dir),
            Err(_) => Self::default(),
        }
    }

    /// Like [`discover`](Self::discover), starting at `start`
    pub fn discover_from(start: &Path) -> Self {
        let mut current = Some(start.to_path_buf());

        while let Some(dir) = current {
            let config_path = dir.join(CONFIG_FILE_NAME);
            if config_path.exists() {
                match Self::load(&config_path) {
                    Ok(config) => return config,
                    Err(error) => tracing::warn!(
                        path = %config_path.display(),
                        %error,
                        "ignoring unreadable config"
                    ),
                }
            }
            current = dir.parent().map(Path::to_path_buf);
        }

        Self::default()
    }

    /// Generate default configuration file content
    pub fn generate_default() -> String {
        toml::to_string_pretty(&Self::default())
            .unwrap_or_else(|_| String::from("# Failed to generate config"))
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Logging settings as an installable [`LogConfig`]
    pub fn log_config(&self) -> LogConfig {
        let mut config = LogConfig::new()
            .with_level(logging::parse_level(&self.logging.level))
            .with_format(self.logging.format.parse().unwrap_or(LogFormat::Compact));
        if let Some(file) = &self.logging.file {
            config = config.with_output(logging::file_output(file));
        }
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::LogOutput;
    use tracing::Level;

    #[test]
    fn test_default_config() {
        let config = BridgeConfig::default();
        assert_eq!(config.environment.initial_object_capacity, 256);
        assert_eq!(config.environment.initial_class_capacity, 64);
        assert!(!config.environment.battery_save_mode);
        assert!(config.environment.sweep_on_drop);
        assert_eq!(config.allocator.page_size, 64);
        assert_eq!(config.allocator.max_page_size, 4096);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_parse_partial_config() {
        let toml = r#"
[environment]
battery_save_mode = true

[allocator]
page_size = 16
"#;

        let config = BridgeConfig::parse(toml).unwrap();
        assert!(config.environment.battery_save_mode);
        assert_eq!(config.environment.initial_object_capacity, 256);
        assert_eq!(config.allocator.page_size, 16);
        assert_eq!(config.allocator.max_page_size, 4096);
        assert_eq!(config.logging, LoggingConfig::default());
    }

    #[test]
    fn test_parse_error() {
        let result = BridgeConfig::parse("[environment]\nsweep_on_drop = \"yes\"");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);

        let mut config = BridgeConfig::default();
        config.environment.initial_object_capacity = 8;
        config.logging.format = "json".to_string();
        config.save(&path).unwrap();

        assert_eq!(BridgeConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn test_discover_walks_up() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a").join("b");
        fs::create_dir_all(&nested).unwrap();
        fs::write(
            dir.path().join(CONFIG_FILE_NAME),
            "[environment]\ninitial_class_capacity = 3\n",
        )
        .unwrap();

        let config = BridgeConfig::discover_from(&nested);
        assert_eq!(config.environment.initial_class_capacity, 3);
    }

    #[test]
    fn test_generate_default_parses_back() {
        let content = BridgeConfig::generate_default();
        assert_eq!(BridgeConfig::parse(&content).unwrap(), BridgeConfig::default());
    }

    #[test]
    fn test_log_config() {
        let mut config = BridgeConfig::default();
        config.logging.level = "debug".to_string();
        config.logging.file = Some(PathBuf::from("logs/jsb.log"));

        let log = config.log_config();
        assert_eq!(log.level, Level::DEBUG);
        assert_eq!(log.format, LogFormat::Compact);
        assert!(matches!(log.output, LogOutput::File { .. }));
    }
}
