use anyhow::{Context, Result};
use std::io::Read;
use std::process::{Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

const POLL_INTERVAL: Duration = Duration::from_millis(20);
/// How long to keep reading output once the shell has exited or was killed.
/// Background processes started by the command may hold the pipes open.
const DRAIN_GRACE: Duration = Duration::from_millis(200);

/// Result of running one command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionOutcome {
    /// `None` when the process was killed or terminated by a signal.
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    pub timed_out: bool,
}

impl ExecutionOutcome {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

pub trait CommandExecutor {
    fn execute(&self, cmd_line: &str, timeout: Duration) -> Result<ExecutionOutcome>;
}

/// Runs commands through the platform shell so pipes and globs in the
/// translated command behave as the user expects.
pub struct ShellCommandExecutor;

impl CommandExecutor for ShellCommandExecutor {
    fn execute(&self, cmd_line: &str, timeout: Duration) -> Result<ExecutionOutcome> {
        #[cfg(windows)]
        let mut cmd = {
            let mut command = Command::new("cmd");
            command.arg("/C").arg(cmd_line);
            command
        };

        #[cfg(not(windows))]
        let mut cmd = {
            let mut command = Command::new("sh");
            command.arg("-c").arg(cmd_line);
            command
        };

        let mut child = cmd
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .with_context(|| format!("Failed to execute command '{}'", cmd_line))?;
        debug!(pid = child.id(), command = cmd_line, "spawned");

        let stdout = child.stdout.take().map(spawn_reader);
        let stderr = child.stderr.take().map(spawn_reader);

        let status = wait_with_deadline(&mut child, Instant::now() + timeout)
            .with_context(|| format!("Failed to wait for command '{}'", cmd_line))?;
        let timed_out = status.is_none();
        if timed_out {
            warn!(command = cmd_line, ?timeout, "command timed out and was killed");
        }

        let drain_until = Instant::now() + DRAIN_GRACE;
        Ok(ExecutionOutcome {
            exit_code: status.and_then(|s| s.code()),
            stdout: collect_output(stdout, drain_until),
            stderr: collect_output(stderr, drain_until),
            timed_out,
        })
    }
}

/// Polls until the child exits or the deadline passes; kills it in the
/// latter case and returns `None`.
fn wait_with_deadline(
    child: &mut std::process::Child,
    deadline: Instant,
) -> std::io::Result<Option<ExitStatus>> {
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Some(status));
        }
        if Instant::now() >= deadline {
            child.kill().ok();
            child.wait().ok();
            return Ok(None);
        }
        thread::sleep(POLL_INTERVAL);
    }
}

fn spawn_reader<R: Read + Send + 'static>(mut source: R) -> Receiver<Vec<u8>> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let mut buf = [0u8; 8192];
        loop {
            match source.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => {
                    if tx.send(buf[..n].to_vec()).is_err() {
                        break;
                    }
                }
                Err(err) if err.kind() == std::io::ErrorKind::Interrupted => {}
                Err(err) => {
                    debug!(%err, "output pipe closed early");
                    break;
                }
            }
        }
    });
    rx
}

/// Gathers chunks until the pipe closes or `until` passes, whichever is first.
fn collect_output(rx: Option<Receiver<Vec<u8>>>, until: Instant) -> String {
    let mut bytes = Vec::new();
    if let Some(rx) = rx {
        loop {
            match rx.recv_timeout(until.saturating_duration_since(Instant::now())) {
                Ok(chunk) => bytes.extend_from_slice(&chunk),
                Err(RecvTimeoutError::Disconnected) => break,
                Err(RecvTimeoutError::Timeout) => {
                    debug!("output pipe still held open, not waiting for it");
                    break;
                }
            }
        }
    }
    String::from_utf8_lossy(&bytes).into_owned()
}
