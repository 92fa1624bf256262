use std::path::PathBuf;
use thiserror::Error;

use crate::config::Provider;

/// Errors raised by the configuration store.
///
/// Defaults only ever fill in for *absent* fields; every other problem
/// surfaces here instead of being papered over.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("unknown configuration key '{0}' (run `llmshell config keys` to list valid keys)")]
    KeyNotFound(String),

    #[error("invalid value for {key}: {reason}")]
    Validation { key: String, reason: String },

    #[error("failed to write config file {path}: {source}")]
    Persistence {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to read config file {path}: {source}")]
    ReadFile {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error(
        "config file {path} is not a valid llmshell configuration: {source}. \
         Fix it with `llmshell config edit` or remove it to start from defaults"
    )]
    CorruptConfig {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error(
        "config file {path} has an invalid value for {key}: {reason}. \
         Fix it with `llmshell config set {key} <VALUE>` or `llmshell config edit`"
    )]
    InvalidValue {
        path: PathBuf,
        key: String,
        reason: String,
    },

    #[error("unsupported provider '{0}'. Supported: openai, deepseek, doubao, qwen")]
    UnknownProvider(String),

    #[error(
        "no API key configured for {provider}: run `llmshell config api-key <KEY> --provider {provider}` \
         or set {}",
        .provider.api_key_env_var()
    )]
    MissingApiKey { provider: Provider },

    #[error("config file already exists at {0}. Refusing to overwrite")]
    AlreadyExists(PathBuf),
}

impl ConfigError {
    pub fn validation<K: ToString, R: Into<String>>(key: K, reason: R) -> Self {
        Self::Validation {
            key: key.to_string(),
            reason: reason.into(),
        }
    }
}
