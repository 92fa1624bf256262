//! Handlers for the `config` subcommands.

use crate::cli::ConfigCommand;
use crate::config::{mask_secret, ConfigKey, ConfigStore, ConfigValue};
use crate::ui::status_mark;
use anyhow::{anyhow, Context, Result};
use crossterm::style::Stylize;
use std::io::Write;
use std::process::Command;
use tracing::debug;

pub const DEFAULT_EDITOR: &str = "nano";

pub fn run_config_command(
    store: &ConfigStore,
    command: &ConfigCommand,
    editor: &str,
    out: &mut dyn Write,
) -> Result<()> {
    match command {
        ConfigCommand::Show => show_config(store, out),
        ConfigCommand::Get { key } => get_value(store, key, out),
        ConfigCommand::Set { key, value } => set_value(store, key, value, out),
        ConfigCommand::Provider { name } => {
            let provider = store.select_provider(name)?;
            writeln!(out, "{}", format!("Set LLM provider to: {}", provider).green())?;
            Ok(())
        }
        ConfigCommand::ApiKey { api_key, provider } => {
            let provider = store.set_api_key(api_key, *provider)?;
            writeln!(out, "{}", format!("Set API key for {}", provider).green())?;
            Ok(())
        }
        ConfigCommand::ListProviders => list_providers(store, out),
        ConfigCommand::Edit => edit_config(store, editor, out),
        ConfigCommand::Path => {
            writeln!(out, "{}", store.path().display())?;
            Ok(())
        }
        ConfigCommand::Init => {
            store.init()?;
            writeln!(out, "Default configuration written to {}", store.path().display())?;
            writeln!(
                out,
                "Add an API key with 'llmshell config api-key <KEY>' or set OPENAI_API_KEY."
            )?;
            Ok(())
        }
        ConfigCommand::Keys => {
            for key in ConfigKey::all() {
                if key.is_secret() {
                    writeln!(out, "{} (secret)", key)?;
                } else {
                    writeln!(out, "{}", key)?;
                }
            }
            Ok(())
        }
    }
}

fn show_config(store: &ConfigStore, out: &mut dyn Write) -> Result<()> {
    let effective = store.show()?;
    let note = if store.exists() { "" } else { " (not created yet)" };
    writeln!(
        out,
        "{} {}{}",
        "Configuration file:".bold(),
        store.path().display(),
        note
    )?;
    let active = effective.llm.provider;
    writeln!(
        out,
        "{} {} ({})",
        "Current provider:".bold(),
        active,
        effective.llm.settings(active).model
    )?;
    writeln!(out)?;
    let json = serde_json::to_string_pretty(&effective.redacted())
        .context("Failed to render configuration")?;
    writeln!(out, "{}", json)?;
    Ok(())
}

fn get_value(store: &ConfigStore, raw_key: &str, out: &mut dyn Write) -> Result<()> {
    let value = store.get_path(raw_key)?;
    let key: ConfigKey = raw_key.parse()?;
    writeln!(out, "{} = {}", key, display_value(key, value.as_ref()))?;
    Ok(())
}

fn set_value(store: &ConfigStore, raw_key: &str, raw: &str, out: &mut dyn Write) -> Result<()> {
    let key = store.set_path(raw_key, raw)?;
    let shown = if key.is_secret() {
        mask_secret(Some(raw))
    } else {
        raw.to_string()
    };
    writeln!(out, "{}", format!("Set {} = {}", key, shown).green())?;
    Ok(())
}

fn display_value(key: ConfigKey, value: Option<&ConfigValue>) -> String {
    match value {
        Some(ConfigValue::Text(s)) if key.is_secret() => mask_secret(Some(s)),
        Some(v) => v.to_string(),
        None => "(not set)".to_string(),
    }
}

fn list_providers(store: &ConfigStore, out: &mut dyn Write) -> Result<()> {
    let statuses = store.list_providers()?;
    if let Some(active) = statuses.iter().find(|s| s.active) {
        writeln!(out, "{} {}", "Current provider:".bold(), active.provider)?;
        writeln!(out)?;
    }

    for status in &statuses {
        let label = if status.configured {
            "Configured"
        } else {
            "Not configured"
        };
        writeln!(
            out,
            "{} {} {}",
            format!("{}:", status.provider.title()).bold(),
            status_mark(status.configured),
            label
        )?;
        writeln!(out, "  Model: {}", status.model)?;
        if status.configured {
            let key = store.resolve_api_key(status.provider)?;
            writeln!(out, "  API Key: {}", mask_secret(key.as_deref()))?;
        } else {
            writeln!(out, "  Env var: {}", status.provider.api_key_env_var())?;
        }
        writeln!(out)?;
    }
    Ok(())
}

/// Opens the file in `editor` (split shell-style, so `code --wait` works),
/// creating it first when missing, then re-reads it to catch mistakes.
fn edit_config(store: &ConfigStore, editor: &str, out: &mut dyn Write) -> Result<()> {
    if store.ensure_file()? {
        writeln!(out, "Created {}", store.path().display())?;
    }

    let mut words = shell_words::split(editor)
        .with_context(|| format!("Failed to parse editor command '{}'", editor))?;
    if words.is_empty() {
        words.push(DEFAULT_EDITOR.to_string());
    }
    let program = words.remove(0);
    debug!(%program, args = ?words, path = %store.path().display(), "launching editor");

    let status = Command::new(&program)
        .args(&words)
        .arg(store.path())
        .status()
        .with_context(|| format!("Failed to launch editor '{}'", program))?;
    if !status.success() {
        return Err(anyhow!("Editor '{}' exited with status {}", program, status));
    }

    store.load_document()?;
    writeln!(out, "Configuration saved: {}", store.path().display())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RuntimeOverrides;
    use crate::env::Env;
    use crate::error::ConfigError;
    use std::fs;
    use tempfile::TempDir;

    fn store_in(dir: &TempDir, env: &[(&str, &str)]) -> ConfigStore {
        ConfigStore::new(
            dir.path().join("llmshell").join("config.json"),
            Env::mock(env.iter().copied()),
            RuntimeOverrides::default(),
        )
    }

    fn run(store: &ConfigStore, command: ConfigCommand) -> Result<String> {
        let mut out = Vec::new();
        run_config_command(store, &command, DEFAULT_EDITOR, &mut out)?;
        Ok(String::from_utf8(out).unwrap())
    }

    #[test]
    fn show_masks_api_keys() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir, &[("DEEPSEEK_API_KEY", "sk-deepseek-secret")]);
        store.set_api_key("sk-openai-secret", None).unwrap();

        let text = run(&store, ConfigCommand::Show).unwrap();
        assert!(text.contains("Current provider:"));
        assert!(text.contains("\"model\": \"gpt-3.5-turbo\""));
        assert!(text.contains("********..."));
        assert!(text.contains("(not set)"));
        assert!(!text.contains("sk-openai-secret"));
        assert!(!text.contains("sk-deepseek-secret"));
    }

    #[test]
    fn get_prints_value_or_masked_secret() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir, &[("QWEN_API_KEY", "qk")]);

        let text = run(
            &store,
            ConfigCommand::Get {
                key: "llm.openai.model".to_string(),
            },
        )
        .unwrap();
        assert_eq!(text, "llm.openai.model = gpt-3.5-turbo\n");

        let text = run(
            &store,
            ConfigCommand::Get {
                key: "llm.qwen.api_key".to_string(),
            },
        )
        .unwrap();
        assert_eq!(text, "llm.qwen.api_key = **...\n");

        let text = run(
            &store,
            ConfigCommand::Get {
                key: "llm.openai.api_key".to_string(),
            },
        )
        .unwrap();
        assert_eq!(text, "llm.openai.api_key = (not set)\n");
    }

    #[test]
    fn get_unknown_key_fails() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir, &[]);
        let err = run(
            &store,
            ConfigCommand::Get {
                key: "llm.OpenAI.model".to_string(),
            },
        )
        .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ConfigError>(),
            Some(ConfigError::KeyNotFound(_))
        ));
    }

    #[test]
    fn set_persists_and_hides_secrets() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir, &[]);

        let text = run(
            &store,
            ConfigCommand::Set {
                key: "ui.max_output_lines".to_string(),
                value: "20".to_string(),
            },
        )
        .unwrap();
        assert!(text.contains("Set ui.max_output_lines = 20"));
        assert_eq!(store.ui_settings().unwrap().max_output_lines, 20);

        let text = run(
            &store,
            ConfigCommand::Set {
                key: "llm.doubao.api_key".to_string(),
                value: "db-secret".to_string(),
            },
        )
        .unwrap();
        assert!(!text.contains("db-secret"));
    }

    #[test]
    fn provider_and_api_key_commands() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir, &[]);

        let text = run(
            &store,
            ConfigCommand::Provider {
                name: "deepseek".to_string(),
            },
        )
        .unwrap();
        assert!(text.contains("Set LLM provider to: deepseek"));

        let text = run(
            &store,
            ConfigCommand::ApiKey {
                api_key: "ds-key".to_string(),
                provider: None,
            },
        )
        .unwrap();
        assert!(text.contains("Set API key for deepseek"));
        assert_eq!(
            store
                .resolve_api_key(crate::config::Provider::DeepSeek)
                .unwrap()
                .as_deref(),
            Some("ds-key")
        );

        let err = run(
            &store,
            ConfigCommand::Provider {
                name: "anthropic".to_string(),
            },
        )
        .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ConfigError>(),
            Some(ConfigError::UnknownProvider(_))
        ));
    }

    #[test]
    fn list_providers_reports_configuration() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir, &[("DOUBAO_API_KEY", "doubao-secret")]);

        let text = run(&store, ConfigCommand::ListProviders).unwrap();
        assert!(text.contains("openai"));
        assert!(text.contains("Env var: OPENAI_API_KEY"));
        assert!(text.contains("Model: doubao-pro"));
        assert!(text.contains("API Key: ********..."));
        assert!(!text.contains("doubao-secret"));
    }

    #[test]
    fn init_refuses_to_overwrite() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir, &[]);

        let text = run(&store, ConfigCommand::Init).unwrap();
        assert!(text.contains("Default configuration written"));
        assert!(store.exists());

        let err = run(&store, ConfigCommand::Init).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ConfigError>(),
            Some(ConfigError::AlreadyExists(_))
        ));
    }

    #[test]
    fn keys_and_path_are_listed() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir, &[]);

        let text = run(&store, ConfigCommand::Keys).unwrap();
        assert_eq!(text.lines().count(), ConfigKey::all().len());
        assert!(text.contains("llm.qwen.base_url\n"));
        assert!(text.contains("llm.openai.api_key (secret)\n"));

        let text = run(&store, ConfigCommand::Path).unwrap();
        assert_eq!(text.trim(), store.path().display().to_string());
    }

    #[cfg(unix)]
    #[test]
    fn edit_seeds_file_and_validates_result() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir, &[]);

        let mut out = Vec::new();
        run_config_command(&store, &ConfigCommand::Edit, "true", &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("Created"));
        assert!(text.contains("Configuration saved"));
        assert!(store.exists());

        // An "editor" that breaks the file.
        let script = dir.path().join("break.sh");
        fs::write(&script, "#!/bin/sh\necho '{oops' > \"$1\"\n").unwrap();
        let editor = format!("sh {}", script.display());
        let err = run_config_command(&store, &ConfigCommand::Edit, &editor, &mut Vec::new())
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ConfigError>(),
            Some(ConfigError::CorruptConfig { .. })
        ));

        let script = dir.path().join("zero.sh");
        fs::write(
            &script,
            "#!/bin/sh\necho '{\"safety\": {\"timeout_seconds\": 0}}' > \"$1\"\n",
        )
        .unwrap();
        let editor = format!("sh {}", script.display());
        let mut out = Vec::new();
        let err = run_config_command(&store, &ConfigCommand::Edit, &editor, &mut out).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ConfigError>(),
            Some(ConfigError::InvalidValue { key, .. }) if key == "safety.timeout_seconds"
        ));
        assert!(!String::from_utf8(out).unwrap().contains("Configuration saved"));

        let err = run_config_command(&store, &ConfigCommand::Edit, "false", &mut Vec::new())
            .unwrap_err();
        assert!(err.to_string().contains("exited with status"));
    }
}
