use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ConfigError;

/// Supported LLM backends. The set is closed: adding one means adding a
/// variant, its defaults and its api-key variable below.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    OpenAI,
    DeepSeek,
    Doubao,
    Qwen,
}

pub const DEFAULT_PROVIDER: Provider = Provider::OpenAI;
pub const DEFAULT_TEMPERATURE: f64 = 0.1;

impl Provider {
    pub const ALL: [Provider; 4] = [
        Provider::OpenAI,
        Provider::DeepSeek,
        Provider::Doubao,
        Provider::Qwen,
    ];

    /// Identifier used in dotted keys, on disk and on the command line.
    pub fn as_str(self) -> &'static str {
        match self {
            Provider::OpenAI => "openai",
            Provider::DeepSeek => "deepseek",
            Provider::Doubao => "doubao",
            Provider::Qwen => "qwen",
        }
    }

    /// Human-facing label for tables and status lines.
    pub fn title(self) -> &'static str {
        match self {
            Provider::OpenAI => "OpenAI",
            Provider::DeepSeek => "DeepSeek",
            Provider::Doubao => "Doubao",
            Provider::Qwen => "Qwen",
        }
    }

    /// Environment variable consulted when no api key is persisted.
    pub fn api_key_env_var(self) -> &'static str {
        match self {
            Provider::OpenAI => "OPENAI_API_KEY",
            Provider::DeepSeek => "DEEPSEEK_API_KEY",
            Provider::Doubao => "DOUBAO_API_KEY",
            Provider::Qwen => "QWEN_API_KEY",
        }
    }

    pub fn default_model(self) -> &'static str {
        match self {
            Provider::OpenAI => "gpt-3.5-turbo",
            Provider::DeepSeek => "deepseek-chat",
            Provider::Doubao => "doubao-pro",
            Provider::Qwen => "qwen-turbo",
        }
    }

    pub fn default_temperature(self) -> f64 {
        DEFAULT_TEMPERATURE
    }

    pub fn default_base_url(self) -> &'static str {
        match self {
            Provider::OpenAI => "https://api.openai.com/v1",
            Provider::DeepSeek => "https://api.deepseek.com/v1",
            Provider::Doubao => "https://api.doubao.com/v1",
            Provider::Qwen => "https://dashscope.aliyuncs.com/api/v1",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Exact, case-sensitive match against the identifiers in [`Provider::as_str`].
impl FromStr for Provider {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Provider::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| ConfigError::UnknownProvider(s.to_string()))
    }
}
