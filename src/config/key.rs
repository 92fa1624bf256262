use std::fmt;
use std::str::FromStr;

use super::provider::Provider;
use crate::error::ConfigError;

/// A per-provider field under `llm.<provider>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderField {
    ApiKey,
    Model,
    Temperature,
    BaseUrl,
}

impl ProviderField {
    pub const ALL: [ProviderField; 4] = [
        ProviderField::ApiKey,
        ProviderField::Model,
        ProviderField::Temperature,
        ProviderField::BaseUrl,
    ];

    fn as_str(self) -> &'static str {
        match self {
            ProviderField::ApiKey => "api_key",
            ProviderField::Model => "model",
            ProviderField::Temperature => "temperature",
            ProviderField::BaseUrl => "base_url",
        }
    }
}

/// Every addressable configuration field.
///
/// Dotted paths are parsed into this enum at the CLI boundary so a typo can
/// never create a new field in the persisted document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigKey {
    Provider,
    Llm(Provider, ProviderField),
    Theme,
    MaxOutputLines,
    ShowConfirmations,
    EnableSanitization,
    TimeoutSeconds,
}

impl ConfigKey {
    /// All keys in document order.
    pub fn all() -> Vec<ConfigKey> {
        let mut keys = vec![ConfigKey::Provider];
        for provider in Provider::ALL {
            for field in ProviderField::ALL {
                keys.push(ConfigKey::Llm(provider, field));
            }
        }
        keys.extend([
            ConfigKey::Theme,
            ConfigKey::MaxOutputLines,
            ConfigKey::ShowConfirmations,
            ConfigKey::EnableSanitization,
            ConfigKey::TimeoutSeconds,
        ]);
        keys
    }

    pub fn is_secret(self) -> bool {
        matches!(self, ConfigKey::Llm(_, ProviderField::ApiKey))
    }
}

impl fmt::Display for ConfigKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigKey::Provider => f.write_str("llm.provider"),
            ConfigKey::Llm(provider, field) => write!(f, "llm.{}.{}", provider, field.as_str()),
            ConfigKey::Theme => f.write_str("ui.theme"),
            ConfigKey::MaxOutputLines => f.write_str("ui.max_output_lines"),
            ConfigKey::ShowConfirmations => f.write_str("ui.show_confirmations"),
            ConfigKey::EnableSanitization => f.write_str("safety.enable_sanitization"),
            ConfigKey::TimeoutSeconds => f.write_str("safety.timeout_seconds"),
        }
    }
}

impl FromStr for ConfigKey {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split('.').collect();
        let key = match parts.as_slice() {
            ["llm", "provider"] => Some(ConfigKey::Provider),
            ["llm", provider, field] => {
                let provider = provider.parse::<Provider>().ok();
                let field = ProviderField::ALL.into_iter().find(|f| f.as_str() == *field);
                provider.zip(field).map(|(p, f)| ConfigKey::Llm(p, f))
            }
            ["ui", "theme"] => Some(ConfigKey::Theme),
            ["ui", "max_output_lines"] => Some(ConfigKey::MaxOutputLines),
            ["ui", "show_confirmations"] => Some(ConfigKey::ShowConfirmations),
            ["safety", "enable_sanitization"] => Some(ConfigKey::EnableSanitization),
            ["safety", "timeout_seconds"] => Some(ConfigKey::TimeoutSeconds),
            _ => None,
        };
        key.ok_or_else(|| ConfigError::KeyNotFound(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_key_parses_back_from_its_display_form() {
        for key in ConfigKey::all() {
            assert_eq!(key.to_string().parse::<ConfigKey>().unwrap(), key);
        }
        assert_eq!(ConfigKey::all().len(), 1 + 4 * 4 + 5);
    }

    #[test]
    fn parses_nested_provider_fields() {
        assert_eq!(
            "llm.deepseek.base_url".parse::<ConfigKey>().unwrap(),
            ConfigKey::Llm(Provider::DeepSeek, ProviderField::BaseUrl)
        );
    }

    #[test]
    fn rejects_unknown_and_miscased_paths() {
        for raw in [
            "llm.OpenAI.model",
            "LLM.provider",
            "llm.openai",
            "llm.openai.model.extra",
            "llm.chatgpt.model",
            "openai.model",
            "ui.colour",
            "",
        ] {
            assert!(
                matches!(raw.parse::<ConfigKey>(), Err(ConfigError::KeyNotFound(k)) if k == raw),
                "{raw} should be rejected"
            );
        }
    }

    #[test]
    fn only_api_keys_are_secret() {
        assert!(ConfigKey::Llm(Provider::Qwen, ProviderField::ApiKey).is_secret());
        assert!(!ConfigKey::Llm(Provider::Qwen, ProviderField::Model).is_secret());
        assert!(!ConfigKey::Provider.is_secret());
    }
}
