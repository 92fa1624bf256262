use std::cell::RefCell;
use std::collections::HashMap;
use std::env;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// A translated command and whether its program was found on this system.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckedCommand {
    pub command: String,
    pub available: bool,
}

/// Checks whether commands exist on `PATH`, caching each lookup.
pub struct CommandValidator {
    search_path: Option<OsString>,
    cache: RefCell<HashMap<String, Option<PathBuf>>>,
}

impl CommandValidator {
    /// Searches the process `PATH`.
    pub fn new() -> Self {
        Self::with_search_path(env::var_os("PATH"))
    }

    pub fn with_search_path(search_path: Option<OsString>) -> Self {
        Self {
            search_path,
            cache: RefCell::new(HashMap::new()),
        }
    }

    /// Full path of `program`, if it resolves.
    pub fn command_path(&self, program: &str) -> Option<PathBuf> {
        if let Some(hit) = self.cache.borrow().get(program) {
            return hit.clone();
        }
        let found = self.lookup(program);
        self.cache
            .borrow_mut()
            .insert(program.to_string(), found.clone());
        found
    }

    pub fn command_exists(&self, program: &str) -> bool {
        self.command_path(program).is_some()
    }

    /// Checks each command's program, dropping lines with no program at all.
    pub fn check_all(&self, commands: &[String]) -> Vec<CheckedCommand> {
        commands
            .iter()
            .filter_map(|command| {
                let program = base_command(command)?;
                Some(CheckedCommand {
                    command: command.clone(),
                    available: self.command_exists(&program),
                })
            })
            .collect()
    }

    fn lookup(&self, program: &str) -> Option<PathBuf> {
        let direct = Path::new(program);
        if direct.components().count() > 1 || direct.is_absolute() {
            return is_executable(direct).then(|| direct.to_path_buf());
        }
        let paths = self.search_path.as_ref()?;
        env::split_paths(paths).find_map(|dir| {
            executable_candidates(&dir, program)
                .into_iter()
                .find(|candidate| is_executable(candidate))
        })
    }
}

impl Default for CommandValidator {
    fn default() -> Self {
        Self::new()
    }
}

/// First word of a command line, honouring shell quoting. Falls back to
/// whitespace splitting when the line has unbalanced quotes.
pub fn base_command(command: &str) -> Option<String> {
    let first = match shell_words::split(command) {
        Ok(tokens) => tokens.into_iter().next(),
        Err(_) => command.split_whitespace().next().map(str::to_string),
    };
    first.filter(|t| !t.is_empty())
}

#[cfg(windows)]
fn executable_candidates(dir: &Path, program: &str) -> Vec<PathBuf> {
    let mut candidates = vec![dir.join(program)];
    for ext in ["exe", "cmd", "bat", "com"] {
        candidates.push(dir.join(format!("{}.{}", program, ext)));
    }
    candidates
}

#[cfg(not(windows))]
fn executable_candidates(dir: &Path, program: &str) -> Vec<PathBuf> {
    vec![dir.join(program)]
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}
