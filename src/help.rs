//! Help text for the interactive `?` prompt: `help`, `?` or `help <topic>`.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HelpTopic {
    Commands,
    Examples,
    Config,
    Providers,
    Safety,
}

impl HelpTopic {
    pub const ALL: [HelpTopic; 5] = [
        HelpTopic::Commands,
        HelpTopic::Examples,
        HelpTopic::Config,
        HelpTopic::Providers,
        HelpTopic::Safety,
    ];

    pub fn from_str(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "commands" | "command" | "repl" => Some(Self::Commands),
            "examples" | "example" => Some(Self::Examples),
            "config" | "configuration" | "settings" => Some(Self::Config),
            "providers" | "provider" | "llm" => Some(Self::Providers),
            "safety" | "sanitize" | "confirm" => Some(Self::Safety),
            _ => None,
        }
    }

    pub const fn name(&self) -> &'static str {
        match self {
            HelpTopic::Commands => "commands",
            HelpTopic::Examples => "examples",
            HelpTopic::Config => "config",
            HelpTopic::Providers => "providers",
            HelpTopic::Safety => "safety",
        }
    }

    pub const fn short_description(&self) -> &'static str {
        match self {
            HelpTopic::Commands => "Commands understood at the ? prompt",
            HelpTopic::Examples => "Sample requests",
            HelpTopic::Config => "Where settings live and how to change them",
            HelpTopic::Providers => "LLM providers, api keys and per-run overrides",
            HelpTopic::Safety => "Confirmation, sanitization and timeouts",
        }
    }

    pub const fn render(&self) -> &'static str {
        match self {
            HelpTopic::Commands => COMMANDS_HELP,
            HelpTopic::Examples => EXAMPLES_HELP,
            HelpTopic::Config => CONFIG_HELP,
            HelpTopic::Providers => PROVIDERS_HELP,
            HelpTopic::Safety => SAFETY_HELP,
        }
    }
}

/// Recognises a help request typed at the prompt. `None` means the line is
/// an ordinary request.
pub fn try_handle_help(line: &str) -> Option<Result<String, String>> {
    let mut words = line.split_whitespace();
    let first = words.next()?;
    if first != "?" && !first.eq_ignore_ascii_case("help") {
        return None;
    }
    let topic = words.next();
    if words.next().is_some() {
        // "help me find large files" is a request, not a help command.
        return None;
    }
    Some(render_help(topic))
}

pub fn render_help(topic: Option<&str>) -> Result<String, String> {
    match topic {
        None => Ok(render_top_level_help()),
        Some(raw) => HelpTopic::from_str(raw)
            .map(|t| t.render().to_string())
            .ok_or_else(|| {
                format!(
                    "Unknown help topic '{}'. Type 'help' to see all available topics.",
                    raw
                )
            }),
    }
}

pub fn render_top_level_help() -> String {
    let mut output = String::new();
    output.push_str(COMMANDS_HELP);
    output.push_str("\n\nHelp topics:\n");
    for topic in HelpTopic::ALL {
        output.push_str(&format!(
            "  {:10} {}\n",
            topic.name(),
            topic.short_description()
        ));
    }
    output.push_str("\nType 'help <topic>' for details.\n");
    output
}

pub const BANNER: &str = "LLMShell - Natural language to system commands\n\
Type 'exit' or 'quit' to exit, 'help' for help\n";

const COMMANDS_HELP: &str = r#"LLMShell commands:

  exit, quit      Exit the shell
  help, ?         Show this help
  help <topic>    Show help on one topic

Anything else is treated as a request and translated into shell commands.
The candidates are checked against your PATH and shown before anything runs."#;

const EXAMPLES_HELP: &str = r#"Examples:

  show network ip          Get network IP information
  find large files         Find large files in current directory
  check system memory      Check system memory usage
  list running processes   List running processes

Tips:
  Be specific in your requests for better command translation.
  You can always cancel execution if the command doesn't look right."#;

const CONFIG_HELP: &str = r#"Configuration:

Settings are stored as JSON in the per-user config directory
(`llmshell config path` prints the location; --config or LLMSHELL_CONFIG
point at another file).

  llmshell config show            Effective configuration, api keys masked
  llmshell config get <KEY>       One value, e.g. llm.openai.model
  llmshell config set <KEY> <V>   Validate and save one value
  llmshell config keys            Every valid key
  llmshell config edit            Open the file in $EDITOR
  llmshell config init            Write a file with default values"#;

const PROVIDERS_HELP: &str = r#"Providers:

  openai     OPENAI_API_KEY     gpt-3.5-turbo
  deepseek   DEEPSEEK_API_KEY   deepseek-chat
  doubao     DOUBAO_API_KEY     doubao-pro
  qwen       QWEN_API_KEY       qwen-turbo

  llmshell config provider <NAME>              Select the active provider
  llmshell config api-key <KEY> [--provider P] Save an api key
  llmshell config list-providers               Show which providers have keys

An api key saved in the config file wins over the environment variable.
--provider, --model and --temperature change one run without saving.
Without any api key, a small set of built-in command mappings is used."#;

const SAFETY_HELP: &str = r#"Safety:

  ui.show_confirmations      Ask before running a command (default true)
  safety.enable_sanitization Refuse destructive commands such as `rm -rf /`,
                             `mkfs`, `dd if=/dev/zero` (default true)
  safety.timeout_seconds     Kill commands running longer than this (default 30)
  ui.max_output_lines        Truncate displayed output (default 50)

--force skips the confirmation and runs the first available command."#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_help_topics_case_insensitively() {
        assert_eq!(HelpTopic::from_str("Config"), Some(HelpTopic::Config));
        assert_eq!(HelpTopic::from_str("LLM"), Some(HelpTopic::Providers));
        assert_eq!(HelpTopic::from_str("nothing"), None);
    }

    #[test]
    fn top_level_help_lists_topics() {
        let help = render_top_level_help();
        assert!(help.contains("exit, quit"));
        for topic in HelpTopic::ALL {
            assert!(help.contains(topic.name()), "missing topic {}", topic.name());
        }
    }

    #[test]
    fn recognises_help_lines_only() {
        assert!(matches!(try_handle_help("help"), Some(Ok(_))));
        assert!(matches!(try_handle_help("?"), Some(Ok(_))));
        assert_eq!(
            try_handle_help("HELP safety"),
            Some(Ok(SAFETY_HELP.to_string()))
        );
        assert!(matches!(try_handle_help("help bogus"), Some(Err(_))));
        assert_eq!(try_handle_help("help me find large files"), None);
        assert_eq!(try_handle_help("show network ip"), None);
        assert_eq!(try_handle_help("   "), None);
    }
}
