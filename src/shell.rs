use crate::config::{ConfigStore, UiSettings};
use crate::error::ConfigError;
use crate::executor::{CommandExecutor, ExecutionOutcome};
use crate::fallback::fallback_commands;
use crate::help::{self, try_handle_help};
use crate::llm::{CommandTranslator, LlmTarget};
use crate::prompt::build_system_prompt;
use crate::safety::sanitize_command;
use crate::ui;
use crate::validator::{CheckedCommand, CommandValidator};
use anyhow::{Context, Result};
use crossterm::style::Stylize;
use std::io::{self, BufRead, Write};
use std::time::Duration;
use tracing::{debug, warn};

/// How a single request ended.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestOutcome {
    /// Neither the LLM nor the built-in mappings produced anything.
    NoCommands,
    /// Commands were produced but none exists on this system.
    NothingAvailable,
    Cancelled,
    Executed {
        command: String,
        outcome: ExecutionOutcome,
    },
}

impl RequestOutcome {
    /// Process exit code for one-shot mode.
    pub fn exit_code(&self) -> i32 {
        match self {
            RequestOutcome::Executed { outcome, .. } if outcome.timed_out => 1,
            RequestOutcome::Executed { outcome, .. } => outcome.exit_code.unwrap_or(1),
            _ => 0,
        }
    }
}

/// Translate, validate, display, confirm and execute, for one request or
/// in the interactive loop.
pub struct ShellSession<'a, T, E> {
    store: &'a ConfigStore,
    translator: &'a T,
    executor: &'a E,
    validator: CommandValidator,
    verbose: bool,
}

impl<'a, T, E> ShellSession<'a, T, E>
where
    T: CommandTranslator,
    E: CommandExecutor,
{
    pub fn new(
        store: &'a ConfigStore,
        translator: &'a T,
        executor: &'a E,
        validator: CommandValidator,
        verbose: bool,
    ) -> Self {
        Self {
            store,
            translator,
            executor,
            validator,
            verbose,
        }
    }

    pub fn process_command(
        &self,
        user_input: &str,
        force: bool,
        reader: &mut dyn BufRead,
    ) -> Result<RequestOutcome> {
        println!("\n{} {}", "Processing:".cyan().bold(), user_input);

        let commands = self.translate(user_input)?;
        if commands.is_empty() {
            println!(
                "{}",
                "No commands generated. Please try a different input.".red()
            );
            return Ok(RequestOutcome::NoCommands);
        }

        let checked = self.validator.check_all(&commands);
        if self.verbose {
            for item in &checked {
                println!("  {} {}", ui::status_mark(item.available), item.command);
            }
        }
        print!("{}", ui::commands_table(user_input, &checked));

        let available = available_commands(&checked);
        if available.is_empty() {
            println!("{}", "No available commands to execute.".yellow());
            return Ok(RequestOutcome::NothingAvailable);
        }

        let ui_settings = self.store.ui_settings()?;
        let chosen = if force || !ui_settings.show_confirmations {
            available[0].to_string()
        } else {
            match confirm_execution(reader, &available)? {
                Some(command) => command,
                None => {
                    println!("Cancelled.");
                    return Ok(RequestOutcome::Cancelled);
                }
            }
        };

        let safety = self.store.safety_settings()?;
        sanitize_command(&chosen, safety.enable_sanitization)?;

        println!("\n{} {}", "Executing:".green().bold(), chosen);
        println!("{}", ui::separator());
        let outcome = self
            .executor
            .execute(&chosen, Duration::from_secs(safety.timeout_seconds))?;
        print_outcome(&outcome, &ui_settings, safety.timeout_seconds);

        Ok(RequestOutcome::Executed {
            command: chosen,
            outcome,
        })
    }

    /// Reads requests until `exit`, `quit` or end of input. Errors from a
    /// single request are reported and the loop continues.
    pub fn interactive(&self, force: bool, reader: &mut dyn BufRead) -> Result<()> {
        println!("{}", help::BANNER.blue().bold());

        loop {
            print!("? ");
            io::stdout().flush().ok();

            let mut line = String::new();
            let bytes = reader
                .read_line(&mut line)
                .context("Failed to read from stdin")?;
            if bytes == 0 {
                println!();
                break;
            }

            let input = line.trim();
            if input.is_empty() {
                continue;
            }
            if input.eq_ignore_ascii_case("exit") || input.eq_ignore_ascii_case("quit") {
                break;
            }
            if let Some(help) = try_handle_help(input) {
                match help {
                    Ok(text) => println!("{}", text),
                    Err(msg) => println!("{}", msg.red()),
                }
                continue;
            }

            if let Err(err) = self.process_command(input, force, reader) {
                eprintln!("{} {:#}", "Error:".red(), err);
            }
        }

        println!("{}", "Goodbye!".yellow());
        Ok(())
    }

    /// Asks the active provider, or falls back to the built-in mappings when
    /// no api key resolves or the call yields nothing usable.
    fn translate(&self, user_input: &str) -> Result<Vec<String>> {
        let target = match LlmTarget::resolve(self.store) {
            Ok(target) => target,
            Err(ConfigError::MissingApiKey { provider }) => {
                warn!(
                    %provider,
                    env_var = provider.api_key_env_var(),
                    "no API key configured; using built-in command mappings"
                );
                return Ok(fallback_commands(user_input));
            }
            Err(err) => return Err(err.into()),
        };

        let system_prompt = build_system_prompt();
        match self
            .translator
            .translate(&target, &system_prompt, user_input)
        {
            Ok(commands) if !commands.is_empty() => {
                debug!(count = commands.len(), "translated");
                Ok(commands)
            }
            Ok(_) => {
                warn!(provider = %target.provider, "LLM returned no commands; using built-in command mappings");
                Ok(fallback_commands(user_input))
            }
            Err(err) => {
                warn!(provider = %target.provider, "translation failed: {:#}; using built-in command mappings", err);
                Ok(fallback_commands(user_input))
            }
        }
    }
}

/// Asks which command to run. `None` means the user declined, gave an
/// invalid selection or closed input.
fn confirm_execution(reader: &mut dyn BufRead, available: &[&str]) -> Result<Option<String>> {
    let command = if let [only] = available {
        *only
    } else {
        println!("\n{}", "Available commands:".bold());
        for (i, cmd) in available.iter().enumerate() {
            println!("  {}. {}", i + 1, cmd.cyan());
        }
        let Some(answer) = ask(reader, "\nSelect command to execute (number): ")? else {
            return Ok(None);
        };
        match answer.parse::<usize>() {
            Ok(n) if (1..=available.len()).contains(&n) => available[n - 1],
            Ok(_) => {
                println!("{}", "Invalid selection.".red());
                return Ok(None);
            }
            Err(_) => {
                println!("{}", "Invalid input.".red());
                return Ok(None);
            }
        }
    };

    let prompt = format!("Execute: {}? [y/N] ", command.cyan());
    let confirmed = ask(reader, &prompt)?
        .map(|a| {
            let a = a.to_lowercase();
            a == "y" || a == "yes"
        })
        .unwrap_or(false);
    Ok(confirmed.then(|| command.to_string()))
}

fn ask(reader: &mut dyn BufRead, prompt: &str) -> Result<Option<String>> {
    print!("{}", prompt);
    io::stdout().flush().ok();
    let mut buf = String::new();
    let bytes = reader
        .read_line(&mut buf)
        .context("Failed to read confirmation")?;
    Ok((bytes > 0).then(|| buf.trim().to_string()))
}

/// Stdout is coloured per `ui.theme`; stderr stays uncoloured under its red heading.
fn print_outcome(outcome: &ExecutionOutcome, ui_settings: &UiSettings, timeout_seconds: u64) {
    let max_lines = ui_settings.max_output_lines;
    if !outcome.stdout.is_empty() {
        println!("{}", "Output:".bold());
        let output = ui::truncate_output(outcome.stdout.trim_end(), max_lines);
        println!("{}", ui::themed(&output, &ui_settings.theme));
    }
    if !outcome.stderr.is_empty() {
        println!("{}", "Errors:".red().bold());
        println!("{}", ui::truncate_output(outcome.stderr.trim_end(), max_lines));
    }

    if outcome.timed_out {
        println!(
            "{}",
            format!("Command timed out after {} seconds.", timeout_seconds).red()
        );
    } else if outcome.success() {
        println!("{}", "Command executed successfully!".green());
    } else {
        let code = outcome
            .exit_code
            .map(|c| c.to_string())
            .unwrap_or_else(|| "signal".to_string());
        println!("{}", format!("Command exited with code: {}", code).red());
    }
}

/// Commands whose program is available, in translator order.
fn available_commands(checked: &[CheckedCommand]) -> Vec<&str> {
    checked
        .iter()
        .filter(|c| c.available)
        .map(|c| c.command.as_str())
        .collect()
}
