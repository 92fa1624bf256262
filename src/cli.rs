use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::config::{parse_temperature, Provider};

/// Command-line interface definition for llmshell.
///
/// With a request, translates it once; with neither a request nor a
/// subcommand, starts the interactive `?` prompt.
#[derive(Parser, Debug, Clone)]
#[command(name = "llmshell")]
#[command(version)]
#[command(about = "Natural language to system command translator", long_about = None)]
#[command(disable_help_subcommand = true)]
pub struct Cli {
    /// LLM provider for this invocation (openai, deepseek, doubao, qwen); not saved
    #[arg(short, long, value_parser = parse_provider)]
    pub provider: Option<Provider>,

    /// Model for the active provider for this invocation; not saved
    #[arg(short, long, value_parser = parse_model_arg)]
    pub model: Option<String>,

    /// Sampling temperature (0.0-1.0) for this invocation; not saved
    #[arg(short, long, value_parser = parse_temperature_arg)]
    pub temperature: Option<f64>,

    /// Execute the first available command without asking for confirmation
    #[arg(short, long)]
    pub force: bool,

    /// Enable debug logging and per-command validation output
    #[arg(short, long)]
    pub verbose: bool,

    /// Use this configuration file instead of the per-user default
    #[arg(long, value_name = "PATH", env = "LLMSHELL_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,

    /// Natural language request to translate and execute
    pub request: Vec<String>,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Configuration management
    #[command(subcommand)]
    Config(ConfigCommand),
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum ConfigCommand {
    /// Show the effective configuration (api keys masked)
    Show,
    /// Print a single value, e.g. `llm.openai.model`
    Get { key: String },
    /// Validate and persist a single value
    Set { key: String, value: String },
    /// Select the active LLM provider
    Provider { name: String },
    /// Set the API key for the active provider, or the one given with --provider
    ApiKey {
        api_key: String,
        #[arg(short, long, value_parser = parse_provider)]
        provider: Option<Provider>,
    },
    /// List providers and whether an API key is configured for each
    ListProviders,
    /// Open the configuration file in $EDITOR
    Edit,
    /// Print the configuration file path
    Path,
    /// Write a configuration file with default values
    Init,
    /// List every valid configuration key
    Keys,
}

impl Cli {
    /// The request words joined back into one prompt, if any were given.
    pub fn request_text(&self) -> Option<String> {
        let text = self.request.join(" ");
        let text = text.trim();
        (!text.is_empty()).then(|| text.to_string())
    }
}

fn parse_provider(raw: &str) -> Result<Provider, String> {
    raw.parse().map_err(|e: crate::error::ConfigError| e.to_string())
}

fn parse_model_arg(raw: &str) -> Result<String, String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err("model name must not be empty".to_string());
    }
    Ok(trimmed.to_string())
}

fn parse_temperature_arg(raw: &str) -> Result<f64, String> {
    parse_temperature("--temperature", raw).map_err(|e| e.to_string())
}
