//! YAML loader with tag substitution
//!
//! Supported tags:
//! - `!secret key` - Substitute from secrets.yaml
//! - `!env_var VAR` - Environment variable substitution

use crate::error::{yaml_kind, ConfigError, ConfigResult};
use crate::secrets::Secrets;
use serde_yaml::Value;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, trace};

/// YAML loader that resolves `!secret` and `!env_var` tags
pub struct YamlLoader {
    /// Base directory for relative paths and secrets.yaml
    config_dir: PathBuf,
    secrets: Secrets,
}

impl YamlLoader {
    /// Create a loader reading secrets from `config_dir`
    pub fn new(config_dir: impl Into<PathBuf>) -> ConfigResult<Self> {
        let config_dir = config_dir.into();
        let secrets = Secrets::load(&config_dir)?;
        Ok(Self {
            config_dir,
            secrets,
        })
    }

    /// Create a loader with pre-loaded secrets
    pub fn with_secrets(config_dir: impl Into<PathBuf>, secrets: Secrets) -> Self {
        Self {
            config_dir: config_dir.into(),
            secrets,
        }
    }

    /// Load and process a YAML file
    pub fn load_file(&self, path: impl AsRef<Path>) -> ConfigResult<Value> {
        let path = self.resolve_path(path.as_ref());
        debug!(?path, "Loading YAML file");

        let content = fs::read_to_string(&path).map_err(|e| ConfigError::Unreadable {
            path: path.clone(),
            source: e,
        })?;
        self.load_string(&content, &path)
    }

    /// Load and process YAML from a string
    pub fn load_string(&self, content: &str, source_path: &Path) -> ConfigResult<Value> {
        let value: Value = serde_yaml::from_str(content).map_err(|e| ConfigError::Malformed {
            path: source_path.to_path_buf(),
            source: e,
        })?;
        self.process_value(value)
    }

    fn process_value(&self, value: Value) -> ConfigResult<Value> {
        match value {
            Value::Tagged(tagged) => {
                let tag = tagged.tag.to_string();
                trace!(%tag, value = ?tagged.value, "Processing tag");
                match tag.as_str() {
                    "!secret" => self.process_secret(tagged.value),
                    "!env_var" => process_env_var(tagged.value),
                    // Unknown tags are kept; their contents are still processed
                    _ => Ok(Value::Tagged(Box::new(serde_yaml::value::TaggedValue {
                        tag: tagged.tag,
                        value: self.process_value(tagged.value)?,
                    }))),
                }
            }
            Value::Mapping(map) => {
                let mut result = serde_yaml::Mapping::new();
                for (k, v) in map {
                    result.insert(self.process_value(k)?, self.process_value(v)?);
                }
                Ok(Value::Mapping(result))
            }
            Value::Sequence(seq) => seq
                .into_iter()
                .map(|v| self.process_value(v))
                .collect::<ConfigResult<Vec<_>>>()
                .map(Value::Sequence),
            _ => Ok(value),
        }
    }

    fn process_secret(&self, value: Value) -> ConfigResult<Value> {
        let key = match value {
            Value::String(key) => key,
            other => {
                return Err(ConfigError::TagArgument {
                    tag: "!secret",
                    found: yaml_kind(&other),
                })
            }
        };

        let secret = self.secrets.get(&key)?;
        debug!(%key, "Substituted secret");
        Ok(scalar(secret))
    }

    fn resolve_path(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.config_dir.join(path)
        }
    }

    pub fn secrets(&self) -> &Secrets {
        &self.secrets
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }
}

fn process_env_var(value: Value) -> ConfigResult<Value> {
    let var = match value {
        Value::String(var) => var,
        other => {
            return Err(ConfigError::TagArgument {
                tag: "!env_var",
                found: yaml_kind(&other),
            })
        }
    };

    let env_value =
        std::env::var(&var).map_err(|_| ConfigError::UnsetEnvVar { var: var.clone() })?;
    debug!(%var, "Substituted env var");
    Ok(scalar(&env_value))
}

/// Re-read substituted text as a YAML scalar so numbers and bools keep their type
fn scalar(text: &str) -> Value {
    match serde_yaml::from_str::<Value>(text) {
        Ok(value @ (Value::Bool(_) | Value::Number(_) | Value::String(_))) => value,
        _ => Value::String(text.to_string()),
    }
}

/// Load a YAML file with tag processing, reading secrets from `config_dir`
pub fn load_yaml(config_dir: impl Into<PathBuf>, file: impl AsRef<Path>) -> ConfigResult<Value> {
    YamlLoader::new(config_dir)?.load_file(file)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn get<'a>(value: &'a Value, key: &str) -> Option<&'a Value> {
        value.as_mapping()?.get(Value::String(key.to_string()))
    }

    #[test]
    fn test_load_simple_yaml() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("config.yaml"),
            "log_level: debug\ntick_interval_secs: 2\n",
        )
        .unwrap();

        let value = load_yaml(dir.path(), "config.yaml").unwrap();
        assert_eq!(get(&value, "log_level").and_then(Value::as_str), Some("debug"));
        assert_eq!(get(&value, "tick_interval_secs").and_then(Value::as_u64), Some(2));
    }

    #[test]
    fn test_secret() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("secrets.yaml"), "level: trace\ncapacity: 64\n").unwrap();
        fs::write(
            dir.path().join("config.yaml"),
            "log_level: !secret level\nevent_bus_capacity: !secret capacity\n",
        )
        .unwrap();

        let value = load_yaml(dir.path(), "config.yaml").unwrap();
        assert_eq!(get(&value, "log_level").and_then(Value::as_str), Some("trace"));
        assert_eq!(get(&value, "event_bus_capacity").and_then(Value::as_u64), Some(64));
    }

    #[test]
    fn test_env_var() {
        let dir = TempDir::new().unwrap();
        std::env::set_var("HASS_LANG_TEST_PROGRAM", "house.hl");
        fs::write(
            dir.path().join("config.yaml"),
            "program: !env_var HASS_LANG_TEST_PROGRAM\n",
        )
        .unwrap();

        let value = load_yaml(dir.path(), "config.yaml").unwrap();
        assert_eq!(get(&value, "program").and_then(Value::as_str), Some("house.hl"));

        std::env::remove_var("HASS_LANG_TEST_PROGRAM");
    }

    #[test]
    fn test_missing_env_var() {
        let loader = YamlLoader::with_secrets("/config", Secrets::default());
        let result = loader.load_string(
            "program: !env_var HASS_LANG_TEST_UNSET_VAR\n",
            Path::new("config.yaml"),
        );
        assert!(matches!(result, Err(ConfigError::UnsetEnvVar { .. })));
    }

    #[test]
    fn test_missing_secret() {
        let loader = YamlLoader::with_secrets("/config", Secrets::default());
        let result = loader.load_string("log_level: !secret nope\n", Path::new("config.yaml"));
        assert!(matches!(result, Err(ConfigError::MissingSecret { .. })));
    }

    #[test]
    fn test_tag_needs_a_name() {
        let loader = YamlLoader::with_secrets("/config", Secrets::default());
        let err = loader
            .load_string("log_level: !secret [a, b]\n", Path::new("config.yaml"))
            .unwrap_err();
        assert_eq!(err.to_string(), "!secret takes a name, found a sequence");
    }

    #[test]
    fn test_unknown_tag_is_kept() {
        let loader = YamlLoader::with_secrets("/config", Secrets::default());
        let value = loader
            .load_string("extra: !custom thing\n", Path::new("config.yaml"))
            .unwrap();
        assert!(matches!(get(&value, "extra"), Some(Value::Tagged(_))));
    }
}
