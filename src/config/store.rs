use std::fmt;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use reqwest::Url;
use tempfile::NamedTempFile;
use tracing::{debug, info};

use super::document::{
    ConfigDocument, EffectiveConfig, EffectiveLlm, ProviderSettings, SafetySettings, UiSettings,
    DEFAULT_ENABLE_SANITIZATION, DEFAULT_MAX_OUTPUT_LINES, DEFAULT_SHOW_CONFIRMATIONS,
    DEFAULT_THEME, DEFAULT_TIMEOUT_SECONDS,
};
use super::key::{ConfigKey, ProviderField};
use super::provider::{Provider, DEFAULT_PROVIDER};
use crate::env::Env;
use crate::error::ConfigError;

/// Values supplied on the command line for a single invocation. Never persisted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RuntimeOverrides {
    pub provider: Option<Provider>,
    /// Applies to the active provider only.
    pub model: Option<String>,
    /// Applies to the active provider only.
    pub temperature: Option<f64>,
}

/// A resolved configuration value, as returned by [`ConfigStore::get`].
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigValue {
    Text(String),
    Number(f64),
    Integer(u64),
    Bool(bool),
}

impl fmt::Display for ConfigValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigValue::Text(s) => f.write_str(s),
            ConfigValue::Number(n) => write!(f, "{}", n),
            ConfigValue::Integer(n) => write!(f, "{}", n),
            ConfigValue::Bool(b) => write!(f, "{}", b),
        }
    }
}

/// One row of `config list-providers`.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderStatus {
    pub provider: Provider,
    pub configured: bool,
    pub active: bool,
    pub model: String,
}

/// Single source of truth for the effective configuration.
///
/// Layers, lowest to highest precedence: compiled-in defaults, the persisted
/// document, environment variables (api keys only), runtime overrides.
/// The document is re-read on every operation, so a file that becomes
/// corrupt mid-session is reported instead of being overwritten.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
    env: Env,
    overrides: RuntimeOverrides,
}

impl ConfigStore {
    pub fn new(path: impl Into<PathBuf>, env: Env, overrides: RuntimeOverrides) -> Self {
        Self {
            path: path.into(),
            env,
            overrides,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Persisted document, or an empty one when no file exists yet.
    pub fn load_document(&self) -> Result<ConfigDocument, ConfigError> {
        Ok(self.read_document()?.unwrap_or_default())
    }

    pub fn get(&self, key: ConfigKey) -> Result<Option<ConfigValue>, ConfigError> {
        let doc = self.load_document()?;
        self.resolver(&doc).value(key)
    }

    /// Parses a dotted path and resolves it.
    pub fn get_path(&self, path: &str) -> Result<Option<ConfigValue>, ConfigError> {
        self.get(path.parse()?)
    }

    /// Validates `raw` for `key` and writes it to the persisted document.
    ///
    /// Creates the file, seeded with defaults, if it does not exist. On any
    /// error the file on disk is left as it was.
    ///
    /// Only `raw` is validated, so an invalid stored value can be repaired
    /// one key at a time; other stored values are written back unchanged.
    pub fn set(&self, key: ConfigKey, raw: &str) -> Result<(), ConfigError> {
        let mut doc = self
            .parse_document()?
            .unwrap_or_else(ConfigDocument::seeded);
        apply(&mut doc, key, raw)?;
        self.write_document(&doc)?;
        if key.is_secret() {
            info!(key = %key, path = %self.path.display(), "updated secret");
        } else {
            info!(key = %key, value = raw, path = %self.path.display(), "updated config");
        }
        Ok(())
    }

    pub fn set_path(&self, path: &str, raw: &str) -> Result<ConfigKey, ConfigError> {
        let key: ConfigKey = path.parse()?;
        self.set(key, raw)?;
        Ok(key)
    }

    pub fn show(&self) -> Result<EffectiveConfig, ConfigError> {
        let doc = self.load_document()?;
        self.resolver(&doc).effective()
    }

    pub fn list_providers(&self) -> Result<Vec<ProviderStatus>, ConfigError> {
        let doc = self.load_document()?;
        let resolver = self.resolver(&doc);
        let active = resolver.active_provider()?;
        Provider::ALL
            .into_iter()
            .map(|provider| -> Result<ProviderStatus, ConfigError> {
                Ok(ProviderStatus {
                    provider,
                    configured: resolver.api_key(provider).is_some(),
                    active: provider == active,
                    model: resolver.model(provider)?,
                })
            })
            .collect()
    }

    /// Persists `name` as the active provider after checking it is known.
    pub fn select_provider(&self, name: &str) -> Result<Provider, ConfigError> {
        let provider: Provider = name.parse()?;
        self.set(ConfigKey::Provider, provider.as_str())?;
        Ok(provider)
    }

    /// Persisted key first, then the provider's environment variable.
    pub fn resolve_api_key(&self, provider: Provider) -> Result<Option<String>, ConfigError> {
        let doc = self.load_document()?;
        Ok(self.resolver(&doc).api_key(provider))
    }

    pub fn require_api_key(&self, provider: Provider) -> Result<String, ConfigError> {
        self.resolve_api_key(provider)?
            .ok_or(ConfigError::MissingApiKey { provider })
    }

    /// Stores an api key for `provider`, or for the active provider when `None`.
    pub fn set_api_key(
        &self,
        api_key: &str,
        provider: Option<Provider>,
    ) -> Result<Provider, ConfigError> {
        let provider = match provider {
            Some(p) => p,
            None => self.active_provider()?,
        };
        self.set(ConfigKey::Llm(provider, ProviderField::ApiKey), api_key)?;
        Ok(provider)
    }

    pub fn active_provider(&self) -> Result<Provider, ConfigError> {
        let doc = self.load_document()?;
        self.resolver(&doc).active_provider()
    }

    pub fn provider_settings(&self, provider: Provider) -> Result<ProviderSettings, ConfigError> {
        let doc = self.load_document()?;
        self.resolver(&doc).provider_settings(provider)
    }

    pub fn ui_settings(&self) -> Result<UiSettings, ConfigError> {
        let doc = self.load_document()?;
        Ok(self.resolver(&doc).ui())
    }

    pub fn safety_settings(&self) -> Result<SafetySettings, ConfigError> {
        let doc = self.load_document()?;
        Ok(self.resolver(&doc).safety())
    }

    /// Writes the seeded default document; refuses to overwrite.
    pub fn init(&self) -> Result<(), ConfigError> {
        if self.exists() {
            return Err(ConfigError::AlreadyExists(self.path.clone()));
        }
        self.write_document(&ConfigDocument::seeded())
    }

    /// Seeds the file if it is missing. Returns whether it was created.
    pub fn ensure_file(&self) -> Result<bool, ConfigError> {
        if self.exists() {
            return Ok(false);
        }
        self.write_document(&ConfigDocument::seeded())?;
        Ok(true)
    }

    fn resolver<'a>(&'a self, doc: &'a ConfigDocument) -> Resolver<'a> {
        Resolver {
            doc,
            env: &self.env,
            overrides: &self.overrides,
        }
    }

    /// Parsed and domain-checked document, or `None` when there is no file.
    fn read_document(&self) -> Result<Option<ConfigDocument>, ConfigError> {
        let doc = self.parse_document()?;
        if let Some(doc) = &doc {
            validate_document(doc).map_err(|err| self.invalid_value(err))?;
        }
        Ok(doc)
    }

    fn invalid_value(&self, err: ConfigError) -> ConfigError {
        match err {
            ConfigError::Validation { key, reason } => ConfigError::InvalidValue {
                path: self.path.clone(),
                key,
                reason,
            },
            other => other,
        }
    }

    fn parse_document(&self) -> Result<Option<ConfigDocument>, ConfigError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "no config file, using defaults");
                return Ok(None);
            }
            Err(source) => {
                return Err(ConfigError::ReadFile {
                    path: self.path.clone(),
                    source,
                })
            }
        };
        let doc = serde_json::from_str(&content).map_err(|source| ConfigError::CorruptConfig {
            path: self.path.clone(),
            source,
        })?;
        debug!(path = %self.path.display(), "loaded config file");
        Ok(Some(doc))
    }

    /// Temp file in the target directory, then rename over the old file.
    fn write_document(&self, doc: &ConfigDocument) -> Result<(), ConfigError> {
        let persistence = |source: io::Error| ConfigError::Persistence {
            path: self.path.clone(),
            source,
        };

        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(dir).map_err(persistence)?;

        let mut serialized =
            serde_json::to_string_pretty(doc).map_err(|e| persistence(io::Error::from(e)))?;
        serialized.push('\n');

        let mut tmp = NamedTempFile::new_in(dir).map_err(persistence)?;
        tmp.write_all(serialized.as_bytes()).map_err(persistence)?;
        tmp.as_file().sync_all().map_err(persistence)?;
        tmp.persist(&self.path).map_err(|e| persistence(e.error))?;
        debug!(path = %self.path.display(), "wrote config file");
        Ok(())
    }
}

/// Applies the precedence chain over one loaded document.
struct Resolver<'a> {
    doc: &'a ConfigDocument,
    env: &'a Env,
    overrides: &'a RuntimeOverrides,
}

impl Resolver<'_> {
    fn active_provider(&self) -> Result<Provider, ConfigError> {
        if let Some(provider) = self.overrides.provider {
            return Ok(provider);
        }
        match self.doc.llm.provider.as_deref() {
            Some(name) => name.parse(),
            None => Ok(DEFAULT_PROVIDER),
        }
    }

    fn api_key(&self, provider: Provider) -> Option<String> {
        self.doc
            .llm
            .section(provider)
            .and_then(|s| s.api_key.clone())
            .filter(|k| !k.is_empty())
            .or_else(|| self.env.non_empty(provider.api_key_env_var()))
    }

    /// True when `--model`/`--temperature` target `provider`. Callers only ask
    /// when an override is present, so an unknown persisted provider does not
    /// break resolution otherwise.
    fn overrides_apply_to(&self, provider: Provider) -> Result<bool, ConfigError> {
        Ok(self.active_provider()? == provider)
    }

    fn model(&self, provider: Provider) -> Result<String, ConfigError> {
        let model_override = self
            .overrides
            .model
            .as_deref()
            .map(str::trim)
            .filter(|m| !m.is_empty());
        if let Some(model) = model_override {
            if self.overrides_apply_to(provider)? {
                return Ok(model.to_string());
            }
        }
        Ok(self
            .doc
            .llm
            .section(provider)
            .and_then(|s| s.model.clone())
            .unwrap_or_else(|| provider.default_model().to_string()))
    }

    fn temperature(&self, provider: Provider) -> Result<f64, ConfigError> {
        if let Some(t) = self.overrides.temperature {
            if self.overrides_apply_to(provider)? {
                return Ok(t);
            }
        }
        Ok(self
            .doc
            .llm
            .section(provider)
            .and_then(|s| s.temperature)
            .unwrap_or_else(|| provider.default_temperature()))
    }

    fn base_url(&self, provider: Provider) -> String {
        self.doc
            .llm
            .section(provider)
            .and_then(|s| s.base_url.clone())
            .unwrap_or_else(|| provider.default_base_url().to_string())
    }

    fn provider_settings(&self, provider: Provider) -> Result<ProviderSettings, ConfigError> {
        Ok(ProviderSettings {
            api_key: self.api_key(provider),
            model: self.model(provider)?,
            temperature: self.temperature(provider)?,
            base_url: self.base_url(provider),
        })
    }

    fn ui(&self) -> UiSettings {
        let ui = &self.doc.ui;
        UiSettings {
            theme: ui.theme.clone().unwrap_or_else(|| DEFAULT_THEME.to_string()),
            max_output_lines: ui.max_output_lines.unwrap_or(DEFAULT_MAX_OUTPUT_LINES),
            show_confirmations: ui.show_confirmations.unwrap_or(DEFAULT_SHOW_CONFIRMATIONS),
        }
    }

    fn safety(&self) -> SafetySettings {
        let safety = &self.doc.safety;
        SafetySettings {
            enable_sanitization: safety
                .enable_sanitization
                .unwrap_or(DEFAULT_ENABLE_SANITIZATION),
            timeout_seconds: safety.timeout_seconds.unwrap_or(DEFAULT_TIMEOUT_SECONDS),
        }
    }

    fn effective(&self) -> Result<EffectiveConfig, ConfigError> {
        Ok(EffectiveConfig {
            llm: EffectiveLlm {
                provider: self.active_provider()?,
                openai: self.provider_settings(Provider::OpenAI)?,
                deepseek: self.provider_settings(Provider::DeepSeek)?,
                doubao: self.provider_settings(Provider::Doubao)?,
                qwen: self.provider_settings(Provider::Qwen)?,
            },
            ui: self.ui(),
            safety: self.safety(),
        })
    }

    fn value(&self, key: ConfigKey) -> Result<Option<ConfigValue>, ConfigError> {
        let value = match key {
            ConfigKey::Provider => ConfigValue::Text(self.active_provider()?.to_string()),
            ConfigKey::Llm(p, ProviderField::ApiKey) => {
                return Ok(self.api_key(p).map(ConfigValue::Text))
            }
            ConfigKey::Llm(p, ProviderField::Model) => ConfigValue::Text(self.model(p)?),
            ConfigKey::Llm(p, ProviderField::Temperature) => {
                ConfigValue::Number(self.temperature(p)?)
            }
            ConfigKey::Llm(p, ProviderField::BaseUrl) => ConfigValue::Text(self.base_url(p)),
            ConfigKey::Theme => ConfigValue::Text(self.ui().theme),
            ConfigKey::MaxOutputLines => ConfigValue::Integer(self.ui().max_output_lines.into()),
            ConfigKey::ShowConfirmations => ConfigValue::Bool(self.ui().show_confirmations),
            ConfigKey::EnableSanitization => ConfigValue::Bool(self.safety().enable_sanitization),
            ConfigKey::TimeoutSeconds => ConfigValue::Integer(self.safety().timeout_seconds),
        };
        Ok(Some(value))
    }
}

/// Validates `raw` against `key`'s domain and stores it in `doc`.
fn apply(doc: &mut ConfigDocument, key: ConfigKey, raw: &str) -> Result<(), ConfigError> {
    match key {
        ConfigKey::Provider => {
            let provider: Provider = raw.parse()?;
            doc.llm.provider = Some(provider.to_string());
        }
        ConfigKey::Llm(p, ProviderField::ApiKey) => {
            doc.llm.section_mut(p).api_key = Some(non_empty(key, raw)?);
        }
        ConfigKey::Llm(p, ProviderField::Model) => {
            doc.llm.section_mut(p).model = Some(non_empty(key, raw)?);
        }
        ConfigKey::Llm(p, ProviderField::Temperature) => {
            doc.llm.section_mut(p).temperature = Some(parse_temperature(key, raw)?);
        }
        ConfigKey::Llm(p, ProviderField::BaseUrl) => {
            doc.llm.section_mut(p).base_url = Some(parse_base_url(key, raw)?);
        }
        ConfigKey::Theme => doc.ui.theme = Some(non_empty(key, raw)?),
        ConfigKey::MaxOutputLines => {
            let lines = parse_positive(key, raw)?;
            let lines = u32::try_from(lines)
                .map_err(|_| ConfigError::validation(key, format!("{} is too large", lines)))?;
            doc.ui.max_output_lines = Some(lines);
        }
        ConfigKey::ShowConfirmations => doc.ui.show_confirmations = Some(parse_bool(key, raw)?),
        ConfigKey::EnableSanitization => {
            doc.safety.enable_sanitization = Some(parse_bool(key, raw)?)
        }
        ConfigKey::TimeoutSeconds => doc.safety.timeout_seconds = Some(parse_positive(key, raw)?),
    }
    Ok(())
}

fn non_empty(key: ConfigKey, raw: &str) -> Result<String, ConfigError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::validation(key, "value must not be empty"));
    }
    Ok(trimmed.to_string())
}

/// Parses a temperature; accepts any finite number in `[0, 1]`.
pub fn parse_temperature(key: impl fmt::Display, raw: &str) -> Result<f64, ConfigError> {
    let value: f64 = raw
        .trim()
        .parse()
        .map_err(|_| ConfigError::validation(&key, format!("expected a number, got '{}'", raw)))?;
    check_temperature(&key, value)
}

fn check_temperature(key: impl fmt::Display, value: f64) -> Result<f64, ConfigError> {
    if !value.is_finite() || !(0.0..=1.0).contains(&value) {
        return Err(ConfigError::validation(
            key,
            format!("temperature must be between 0.0 and 1.0, got {}", value),
        ));
    }
    Ok(value)
}

/// Runs every stored value through the checks `set` applies to new input.
/// Absent fields are fine; an empty api key counts as absent.
fn validate_document(doc: &ConfigDocument) -> Result<(), ConfigError> {
    for provider in Provider::ALL {
        let Some(section) = doc.llm.section(provider) else {
            continue;
        };
        if let Some(model) = &section.model {
            non_empty(ConfigKey::Llm(provider, ProviderField::Model), model)?;
        }
        if let Some(temperature) = section.temperature {
            check_temperature(ConfigKey::Llm(provider, ProviderField::Temperature), temperature)?;
        }
        if let Some(base_url) = &section.base_url {
            parse_base_url(ConfigKey::Llm(provider, ProviderField::BaseUrl), base_url)?;
        }
    }
    if let Some(theme) = &doc.ui.theme {
        non_empty(ConfigKey::Theme, theme)?;
    }
    if doc.ui.max_output_lines == Some(0) {
        return Err(ConfigError::validation(
            ConfigKey::MaxOutputLines,
            "value must be greater than zero",
        ));
    }
    if doc.safety.timeout_seconds == Some(0) {
        return Err(ConfigError::validation(
            ConfigKey::TimeoutSeconds,
            "value must be greater than zero",
        ));
    }
    Ok(())
}

fn parse_base_url(key: ConfigKey, raw: &str) -> Result<String, ConfigError> {
    let trimmed = raw.trim();
    let url = Url::parse(trimmed)
        .map_err(|e| ConfigError::validation(key, format!("invalid URL '{}': {}", trimmed, e)))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::validation(
            key,
            format!("URL must use http or https, got '{}'", url.scheme()),
        ));
    }
    Ok(trimmed.to_string())
}

fn parse_positive(key: ConfigKey, raw: &str) -> Result<u64, ConfigError> {
    match raw.trim().parse::<u64>() {
        Ok(0) => Err(ConfigError::validation(key, "value must be greater than zero")),
        Ok(n) => Ok(n),
        Err(_) => Err(ConfigError::validation(
            key,
            format!("expected a positive integer, got '{}'", raw),
        )),
    }
}

fn parse_bool(key: ConfigKey, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Ok(true),
        "false" | "no" | "off" | "0" => Ok(false),
        _ => Err(ConfigError::validation(
            key,
            format!("expected true or false, got '{}'", raw),
        )),
    }
}
