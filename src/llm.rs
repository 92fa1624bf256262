use crate::config::{ConfigStore, Provider};
use crate::error::ConfigError;
use anyhow::{anyhow, Context, Result};
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

const MAX_TOKENS: u32 = 500;

/// Everything needed to call one provider, resolved from the config store.
#[derive(Debug, Clone, PartialEq)]
pub struct LlmTarget {
    pub provider: Provider,
    pub api_key: String,
    pub model: String,
    pub temperature: f64,
    pub base_url: String,
}

impl LlmTarget {
    /// Resolves the active provider's settings. Fails with
    /// `MissingApiKey` when no key is available from any layer.
    pub fn resolve(store: &ConfigStore) -> Result<Self, ConfigError> {
        let provider = store.active_provider()?;
        let api_key = store.require_api_key(provider)?;
        let settings = store.provider_settings(provider)?;
        Ok(Self {
            provider,
            api_key,
            model: settings.model,
            temperature: settings.temperature,
            base_url: settings.base_url,
        })
    }
}

pub trait CommandTranslator {
    /// Returns candidate shell commands for `user_input`, best first.
    fn translate(&self, target: &LlmTarget, system_prompt: &str, user_input: &str)
        -> Result<Vec<String>>;
}

/// Talks to any OpenAI-compatible `/chat/completions` endpoint.
pub struct HttpTranslator {
    client: Client,
}

impl HttpTranslator {
    pub fn new() -> Self {
        Self {
            client: Client::new(),
        }
    }
}

impl Default for HttpTranslator {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<Message<'a>>,
    temperature: f64,
    max_tokens: u32,
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

impl CommandTranslator for HttpTranslator {
    fn translate(
        &self,
        target: &LlmTarget,
        system_prompt: &str,
        user_input: &str,
    ) -> Result<Vec<String>> {
        let req = ChatRequest {
            model: &target.model,
            messages: vec![
                Message {
                    role: "system",
                    content: system_prompt,
                },
                Message {
                    role: "user",
                    content: user_input,
                },
            ],
            temperature: target.temperature,
            max_tokens: MAX_TOKENS,
        };
        let url = format!("{}/chat/completions", target.base_url.trim_end_matches('/'));
        debug!(provider = %target.provider, model = %target.model, %url, "requesting translation");

        let resp: ChatResponse = self
            .client
            .post(&url)
            .bearer_auth(&target.api_key)
            .json(&req)
            .send()
            .with_context(|| format!("HTTP error calling {}", target.provider.title()))?
            .error_for_status()
            .with_context(|| format!("Non-success status from {}", target.provider.title()))?
            .json()
            .with_context(|| format!("Failed to parse {} response JSON", target.provider.title()))?;

        let content = resp
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("No choices in LLM response"))?
            .message
            .content
            .unwrap_or_default();
        debug!(%content, "raw translation");
        Ok(parse_commands(&content))
    }
}

/// Parses model output: a JSON array of strings if possible, otherwise one
/// command per line with comments, blank lines and backticks removed.
pub fn parse_commands(content: &str) -> Vec<String> {
    let text = strip_code_fences(content);

    if let Ok(commands) = serde_json::from_str::<Vec<String>>(&text) {
        return commands
            .into_iter()
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .collect();
    }

    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#') && !line.starts_with("//"))
        .map(|line| {
            line.strip_prefix('`')
                .and_then(|l| l.strip_suffix('`'))
                .unwrap_or(line)
                .trim()
                .to_string()
        })
        .filter(|line| !line.is_empty())
        .collect()
}

fn strip_code_fences(text: &str) -> String {
    if !text.trim_start().starts_with("```") {
        return text.trim().to_string();
    }

    let mut cleaned = String::new();
    for line in text.lines() {
        let trimmed = line.trim();
        if trimmed.starts_with("```") {
            continue;
        }
        cleaned.push_str(line);
        cleaned.push('\n');
    }
    cleaned.trim().to_string()
}
