//! Runtime configuration loading
//!
//! The service reads an optional YAML file with two custom tags:
//!
//! - `!secret key` - Substitute from secrets.yaml next to the config file
//! - `!env_var VAR` - Environment variable substitution
//!
//! # Example
//!
//! ```ignore
//! use ha_config::RuntimeConfig;
//!
//! let config = RuntimeConfig::load("/etc/hass-lang/runtime.yaml")?;
//! ```

mod error;
mod loader;
mod runtime_config;
mod secrets;

pub use error::{ConfigError, ConfigResult};
pub use loader::{load_yaml, YamlLoader};
pub use runtime_config::RuntimeConfig;
pub use secrets::Secrets;
