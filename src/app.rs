use crate::cli::{Cli, Command};
use crate::config::{find_config_path, ConfigStore, RuntimeOverrides};
use crate::env::Env;
use crate::executor::{CommandExecutor, ShellCommandExecutor};
use crate::llm::{CommandTranslator, HttpTranslator};
use crate::ops::{self, DEFAULT_EDITOR};
use crate::shell::ShellSession;
use crate::validator::CommandValidator;
use anyhow::Result;
use clap::Parser;
use std::io::{self, BufRead};
use tracing::debug;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub fn run() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let translator = HttpTranslator::new();
    let executor = ShellCommandExecutor;
    let env = Env::real();

    let exit_code = {
        let stdin = io::stdin();
        let mut stdin_lock = stdin.lock();
        match run_with_reader(cli, &env, &translator, &executor, &mut stdin_lock) {
            Ok(code) => code,
            Err(err) => {
                eprintln!("Error: {:#}", err);
                1
            }
        }
    };
    std::process::exit(exit_code);
}

/// `RUST_LOG` wins; otherwise warnings only, or debug output with `--verbose`.
fn init_logging(verbose: bool) {
    let default_filter = if verbose {
        "llmshell=debug"
    } else {
        "llmshell=warn"
    };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into()))
        .with(fmt::layer().with_writer(io::stderr).with_target(false))
        .init();
}

/// Dispatches one invocation and returns the process exit code.
pub fn run_with_reader<T, E>(
    cli: Cli,
    env: &Env,
    translator: &T,
    executor: &E,
    reader: &mut dyn BufRead,
) -> Result<i32>
where
    T: CommandTranslator,
    E: CommandExecutor,
{
    let path = cli.config.clone().unwrap_or_else(find_config_path);
    debug!(path = %path.display(), "using config file");
    let overrides = RuntimeOverrides {
        provider: cli.provider,
        model: cli.model.clone(),
        temperature: cli.temperature,
    };
    let store = ConfigStore::new(path, env.clone(), overrides);

    if let Some(Command::Config(command)) = &cli.command {
        let editor = env
            .non_empty("EDITOR")
            .unwrap_or_else(|| DEFAULT_EDITOR.to_string());
        let stdout = io::stdout();
        ops::run_config_command(&store, command, &editor, &mut stdout.lock())?;
        return Ok(0);
    }

    let session = ShellSession::new(
        &store,
        translator,
        executor,
        CommandValidator::new(),
        cli.verbose,
    );
    match cli.request_text() {
        Some(request) => {
            let outcome = session.process_command(&request, cli.force, reader)?;
            Ok(outcome.exit_code())
        }
        None => {
            session.interactive(cli.force, reader)?;
            Ok(0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Provider;
    use crate::error::ConfigError;
    use crate::executor::ExecutionOutcome;
    use crate::llm::LlmTarget;
    use std::cell::RefCell;
    use std::fs;
    use std::io::Cursor;
    use std::path::Path;
    use std::time::Duration;
    use tempfile::TempDir;

    /// Records the target it was asked to use.
    #[derive(Default)]
    struct StubTranslator {
        targets: RefCell<Vec<LlmTarget>>,
    }

    impl CommandTranslator for StubTranslator {
        fn translate(&self, target: &LlmTarget, _system: &str, _input: &str) -> Result<Vec<String>> {
            self.targets.borrow_mut().push(target.clone());
            Ok(vec!["echo hello".to_string()])
        }
    }

    #[derive(Default)]
    struct RecordingExecutor {
        ran: RefCell<Vec<String>>,
    }

    impl CommandExecutor for RecordingExecutor {
        fn execute(&self, cmd_line: &str, _timeout: Duration) -> Result<ExecutionOutcome> {
            self.ran.borrow_mut().push(cmd_line.to_string());
            Ok(ExecutionOutcome {
                exit_code: Some(2),
                stdout: String::new(),
                stderr: String::new(),
                timed_out: false,
            })
        }
    }

    fn parse(config: &Path, args: &[&str]) -> Cli {
        let config = config.to_str().unwrap();
        let mut argv = vec!["llmshell", "--config", config];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).unwrap()
    }

    fn run(cli: Cli, env: &Env, translator: &StubTranslator, executor: &RecordingExecutor) -> Result<i32> {
        let mut reader = Cursor::new(Vec::<u8>::new());
        run_with_reader(cli, env, translator, executor, &mut reader)
    }

    #[test]
    fn config_commands_write_the_given_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        let env = Env::mock(Vec::<(&str, &str)>::new());
        let translator = StubTranslator::default();
        let executor = RecordingExecutor::default();

        let cli = parse(&path, &["config", "set", "ui.theme", "dracula"]);
        assert_eq!(run(cli, &env, &translator, &executor).unwrap(), 0);

        let written: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written["ui"]["theme"], "dracula");
        assert!(translator.targets.borrow().is_empty());
    }

    #[test]
    fn config_errors_propagate() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        let env = Env::mock(Vec::<(&str, &str)>::new());

        let cli = parse(&path, &["config", "set", "llm.openai.temperature", "1.5"]);
        let err = run(cli, &env, &StubTranslator::default(), &RecordingExecutor::default())
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ConfigError>(),
            Some(ConfigError::Validation { .. })
        ));
        assert!(!path.exists());
    }

    #[cfg(unix)]
    #[test]
    fn one_shot_request_applies_runtime_overrides() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        let env = Env::mock([("DEEPSEEK_API_KEY", "ds-key")]);
        let translator = StubTranslator::default();
        let executor = RecordingExecutor::default();

        let cli = parse(
            &path,
            &["-p", "deepseek", "-m", "deepseek-coder", "-t", "0.7", "-f", "say", "hello"],
        );
        assert_eq!(run(cli, &env, &translator, &executor).unwrap(), 2);

        let targets = translator.targets.borrow();
        assert_eq!(targets.len(), 1);
        assert_eq!(targets[0].provider, Provider::DeepSeek);
        assert_eq!(targets[0].model, "deepseek-coder");
        assert_eq!(targets[0].temperature, 0.7);
        assert_eq!(targets[0].api_key, "ds-key");
        assert_eq!(*executor.ran.borrow(), vec!["echo hello"]);
        assert!(!path.exists(), "runtime overrides are never persisted");
    }

    #[test]
    fn no_request_starts_interactive_mode() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        let env = Env::mock([("OPENAI_API_KEY", "k")]);
        let translator = StubTranslator::default();
        let executor = RecordingExecutor::default();

        let cli = parse(&path, &[]);
        let mut reader = Cursor::new(b"help\nexit\n".to_vec());
        let code = run_with_reader(cli, &env, &translator, &executor, &mut reader).unwrap();
        assert_eq!(code, 0);
        assert!(translator.targets.borrow().is_empty());
    }
}
