//! Runtime configuration for the automation service

use chrono::FixedOffset;
use serde::{Deserialize, Serialize};
use serde_yaml::Value;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::error::{yaml_kind, ConfigError, ConfigResult};
use crate::loader::YamlLoader;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RuntimeConfig {
    /// Program file; relative paths are resolved against the config directory
    #[serde(default)]
    pub program: Option<PathBuf>,

    /// Default log filter when RUST_LOG is unset
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Period of synthetic tick events
    #[serde(default = "default_tick_interval_secs")]
    pub tick_interval_secs: u64,

    #[serde(default = "default_event_bus_capacity")]
    pub event_bus_capacity: usize,

    /// Offset of local time from UTC, used for `now()`, `time()` and time ranges
    #[serde(default)]
    pub utc_offset_minutes: i32,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_tick_interval_secs() -> u64 {
    1
}

fn default_event_bus_capacity() -> usize {
    1024
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            program: None,
            log_level: default_log_level(),
            tick_interval_secs: default_tick_interval_secs(),
            event_bus_capacity: default_event_bus_capacity(),
            utc_offset_minutes: 0,
        }
    }
}

impl RuntimeConfig {
    /// Load a config file, reading secrets.yaml from the same directory
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let config_dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));

        let loader = YamlLoader::new(config_dir)?;
        let yaml = loader.load_file(path.file_name().map_or(path, Path::new))?;
        let mut config = Self::from_yaml(yaml)?;

        if let Some(program) = config.program.take() {
            config.program = Some(if program.is_relative() {
                config_dir.join(program)
            } else {
                program
            });
        }

        info!(path = %path.display(), "Loaded runtime configuration");
        Ok(config)
    }

    /// Parse and validate an already tag-processed YAML document
    pub fn from_yaml(yaml: Value) -> ConfigResult<Self> {
        // An empty document means all defaults
        let yaml = match yaml {
            Value::Null => Value::Mapping(serde_yaml::Mapping::new()),
            Value::Mapping(_) => yaml,
            other => {
                return Err(ConfigError::Shape {
                    reason: format!("expected a mapping, found a {}", yaml_kind(&other)),
                })
            }
        };

        let config: RuntimeConfig =
            serde_yaml::from_value(yaml).map_err(|e| ConfigError::Shape {
                reason: e.to_string(),
            })?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> ConfigResult<()> {
        if self.tick_interval_secs == 0 {
            return Err(ConfigError::OutOfRange {
                key: "tick_interval_secs",
                reason: "must be greater than zero",
            });
        }
        if self.event_bus_capacity == 0 {
            return Err(ConfigError::OutOfRange {
                key: "event_bus_capacity",
                reason: "must be greater than zero",
            });
        }
        if self.utc_offset().is_none() {
            return Err(ConfigError::OutOfRange {
                key: "utc_offset_minutes",
                reason: "must be within one day",
            });
        }
        Ok(())
    }

    pub fn utc_offset(&self) -> Option<FixedOffset> {
        self.utc_offset_minutes
            .checked_mul(60)
            .and_then(FixedOffset::east_opt)
    }

    pub fn tick_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.tick_interval_secs)
    }
}
