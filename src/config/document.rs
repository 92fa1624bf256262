use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::provider::{Provider, DEFAULT_PROVIDER};

pub const DEFAULT_THEME: &str = "monokai";
pub const DEFAULT_MAX_OUTPUT_LINES: u32 = 50;
pub const DEFAULT_SHOW_CONFIRMATIONS: bool = true;
pub const DEFAULT_ENABLE_SANITIZATION: bool = true;
pub const DEFAULT_TIMEOUT_SECONDS: u64 = 30;

/// The persisted configuration document.
///
/// Every leaf is optional: `None` means "absent, use the compiled-in default",
/// which is different from an explicitly stored value. Fields this build does
/// not know are kept in `extra` and written back unchanged.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigDocument {
    #[serde(default)]
    pub llm: LlmSection,
    #[serde(default)]
    pub ui: UiSection,
    #[serde(default)]
    pub safety: SafetySection,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct LlmSection {
    /// Kept as a raw string so a file naming a provider this build does not
    /// know still loads; resolution reports it as `UnknownProvider`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub openai: Option<ProviderSection>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deepseek: Option<ProviderSection>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doubao: Option<ProviderSection>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub qwen: Option<ProviderSection>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl LlmSection {
    pub fn section(&self, provider: Provider) -> Option<&ProviderSection> {
        match provider {
            Provider::OpenAI => self.openai.as_ref(),
            Provider::DeepSeek => self.deepseek.as_ref(),
            Provider::Doubao => self.doubao.as_ref(),
            Provider::Qwen => self.qwen.as_ref(),
        }
    }

    pub fn section_mut(&mut self, provider: Provider) -> &mut ProviderSection {
        let slot = match provider {
            Provider::OpenAI => &mut self.openai,
            Provider::DeepSeek => &mut self.deepseek,
            Provider::Doubao => &mut self.doubao,
            Provider::Qwen => &mut self.qwen,
        };
        slot.get_or_insert_with(ProviderSection::default)
    }
}

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderSection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct UiSection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub theme: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_output_lines: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub show_confirmations: Option<bool>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct SafetySection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enable_sanitization: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_seconds: Option<u64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ConfigDocument {
    /// Document written when no file exists yet: every non-secret field
    /// filled with its compiled-in default, api keys left absent.
    pub fn seeded() -> Self {
        let mut doc = ConfigDocument {
            llm: LlmSection {
                provider: Some(DEFAULT_PROVIDER.to_string()),
                ..LlmSection::default()
            },
            ui: UiSection {
                theme: Some(DEFAULT_THEME.to_string()),
                max_output_lines: Some(DEFAULT_MAX_OUTPUT_LINES),
                show_confirmations: Some(DEFAULT_SHOW_CONFIRMATIONS),
                ..UiSection::default()
            },
            safety: SafetySection {
                enable_sanitization: Some(DEFAULT_ENABLE_SANITIZATION),
                timeout_seconds: Some(DEFAULT_TIMEOUT_SECONDS),
                ..SafetySection::default()
            },
            extra: Map::new(),
        };
        for provider in Provider::ALL {
            *doc.llm.section_mut(provider) = ProviderSection {
                api_key: None,
                model: Some(provider.default_model().to_string()),
                temperature: Some(provider.default_temperature()),
                base_url: Some(provider.default_base_url().to_string()),
                extra: Map::new(),
            };
        }
        doc
    }
}

/// Fully resolved configuration, as returned by `ConfigStore::show`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EffectiveConfig {
    pub llm: EffectiveLlm,
    pub ui: UiSettings,
    pub safety: SafetySettings,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EffectiveLlm {
    pub provider: Provider,
    pub openai: ProviderSettings,
    pub deepseek: ProviderSettings,
    pub doubao: ProviderSettings,
    pub qwen: ProviderSettings,
}

impl EffectiveLlm {
    pub fn settings(&self, provider: Provider) -> &ProviderSettings {
        match provider {
            Provider::OpenAI => &self.openai,
            Provider::DeepSeek => &self.deepseek,
            Provider::Doubao => &self.doubao,
            Provider::Qwen => &self.qwen,
        }
    }

    fn settings_mut(&mut self, provider: Provider) -> &mut ProviderSettings {
        match provider {
            Provider::OpenAI => &mut self.openai,
            Provider::DeepSeek => &mut self.deepseek,
            Provider::Doubao => &mut self.doubao,
            Provider::Qwen => &mut self.qwen,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProviderSettings {
    pub api_key: Option<String>,
    pub model: String,
    pub temperature: f64,
    pub base_url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UiSettings {
    pub theme: String,
    pub max_output_lines: u32,
    pub show_confirmations: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SafetySettings {
    pub enable_sanitization: bool,
    pub timeout_seconds: u64,
}

impl EffectiveConfig {
    /// Copy suitable for printing: api keys replaced by a fixed-width mask.
    pub fn redacted(&self) -> EffectiveConfig {
        let mut out = self.clone();
        for provider in Provider::ALL {
            let settings = out.llm.settings_mut(provider);
            settings.api_key = Some(mask_secret(settings.api_key.as_deref()));
        }
        out
    }
}

/// Masks a secret without revealing any of its characters.
pub fn mask_secret(secret: Option<&str>) -> String {
    match secret {
        Some(s) if !s.is_empty() => format!("{}...", "*".repeat(s.chars().count().min(8))),
        _ => "(not set)".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeded_document_has_defaults_but_no_secrets() {
        let doc = ConfigDocument::seeded();
        assert_eq!(doc.llm.provider.as_deref(), Some("openai"));
        for provider in Provider::ALL {
            let section = doc.llm.section(provider).unwrap();
            assert!(section.api_key.is_none());
            assert_eq!(section.model.as_deref(), Some(provider.default_model()));
        }
        assert_eq!(doc.safety.timeout_seconds, Some(30));
    }

    #[test]
    fn absent_fields_are_not_serialized() {
        let mut doc = ConfigDocument::default();
        doc.llm.section_mut(Provider::Qwen).model = Some("qwen-max".to_string());
        let json = serde_json::to_value(&doc).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "llm": {"qwen": {"model": "qwen-max"}},
                "ui": {},
                "safety": {}
            })
        );
    }

    #[test]
    fn partial_documents_deserialize() {
        let doc: ConfigDocument =
            serde_json::from_str(r#"{"llm": {"provider": "deepseek"}}"#).unwrap();
        assert_eq!(doc.llm.provider.as_deref(), Some("deepseek"));
        assert!(doc.llm.section(Provider::DeepSeek).is_none());
        assert_eq!(doc.ui, UiSection::default());
    }

    #[test]
    fn mask_hides_secret_length_past_eight() {
        assert_eq!(mask_secret(Some("sk-abc")), "******...");
        assert_eq!(mask_secret(Some("sk-0123456789abcdef")), "********...");
        assert_eq!(mask_secret(None), "(not set)");
        assert_eq!(mask_secret(Some("")), "(not set)");
    }
}
