//! Layered configuration: compiled-in defaults, the persisted JSON document,
//! api-key environment variables and per-invocation CLI overrides.

mod document;
mod key;
mod provider;
mod store;

use dirs::config_dir;
use std::path::PathBuf;

pub use document::{mask_secret, UiSettings};
pub use key::ConfigKey;
pub use provider::Provider;
pub use store::{parse_temperature, ConfigStore, ConfigValue, RuntimeOverrides};

/// Default location of the persisted document, under the OS config directory.
pub fn find_config_path() -> PathBuf {
    let base = config_dir().unwrap_or_else(|| PathBuf::from("."));
    base.join("llmshell").join("config.json")
}
