//! Errors raised while loading the runtime config and its secrets

use std::path::PathBuf;
use thiserror::Error;

pub type ConfigResult<T> = Result<T, ConfigError>;

#[derive(Debug, Error)]
pub enum ConfigError {
    /// A config or secrets file could not be read
    #[error("cannot read {}: {source}", path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{} is not valid YAML: {source}", path.display())]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// `!secret` named a key with no entry in `secrets.yaml`
    #[error("!secret {key} has no entry in secrets.yaml")]
    MissingSecret { key: String },

    #[error("secret {key} must be a scalar, found a {found}")]
    NonScalarSecret { key: String, found: &'static str },

    #[error("!env_var {var} is not set")]
    UnsetEnvVar { var: String },

    /// `!secret` or `!env_var` applied to something other than a name
    #[error("{tag} takes a name, found a {found}")]
    TagArgument {
        tag: &'static str,
        found: &'static str,
    },

    /// The document does not fit the runtime config layout
    #[error("runtime config: {reason}")]
    Shape { reason: String },

    /// A field parsed but its value cannot drive the runtime
    #[error("{key} {reason}")]
    OutOfRange {
        key: &'static str,
        reason: &'static str,
    },
}

/// Short name of a YAML node's kind, for error messages
pub(crate) fn yaml_kind(value: &serde_yaml::Value) -> &'static str {
    use serde_yaml::Value;
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Sequence(_) => "sequence",
        Value::Mapping(_) => "mapping",
        Value::Tagged(_) => "tagged value",
    }
}
