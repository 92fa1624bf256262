use anyhow::{bail, Result};

/// Programs that are refused outright, whatever their arguments.
const BLOCKED_PROGRAMS: &[&str] = &["fdisk", "parted", "format"];

/// Refuses a small set of destructive command shapes. A no-op when
/// `enabled` is false (`safety.enable_sanitization`).
pub fn sanitize_command(cmd_line: &str, enabled: bool) -> Result<()> {
    if !enabled {
        return Ok(());
    }
    if let Some(pattern) = detect_dangerous_pattern(cmd_line) {
        bail!(
            "Dangerous command pattern detected: {} (disable safety.enable_sanitization to allow it)",
            pattern
        );
    }
    Ok(())
}

/// Checks every simple command in the line (split on `|`, `&`, `;` and
/// newlines outside quotes) and names the first destructive shape found.
pub fn detect_dangerous_pattern(cmd_line: &str) -> Option<String> {
    split_segments(cmd_line)
        .iter()
        .find_map(|segment| dangerous_segment(segment))
}

fn dangerous_segment(segment: &str) -> Option<String> {
    let tokens = shell_words::split(segment).unwrap_or_else(|_| {
        segment.split_whitespace().map(str::to_string).collect()
    });
    let mut words = tokens.iter().map(String::as_str).skip_while(|t| *t == "sudo");
    let program = words.next()?;
    let args: Vec<&str> = words.collect();

    let name = program.rsplit('/').next().unwrap_or(program).to_ascii_lowercase();
    match name.as_str() {
        "rm" if removes_root(&args) => Some("rm -rf /".to_string()),
        "dd" if args.iter().any(|a| a.starts_with("if=/dev/zero")) => {
            Some("dd if=/dev/zero".to_string())
        }
        "mkfs" => Some("mkfs".to_string()),
        n if n.starts_with("mkfs.") => Some("mkfs".to_string()),
        n if BLOCKED_PROGRAMS.contains(&n) => Some(n.to_string()),
        _ => None,
    }
}

fn removes_root(args: &[&str]) -> bool {
    let mut recursive = false;
    let mut force = false;
    let mut targets_root = false;

    for arg in args {
        match *arg {
            "--recursive" => recursive = true,
            "--force" => force = true,
            "/" | "/*" => targets_root = true,
            flags if flags.starts_with('-') && !flags.starts_with("--") => {
                recursive |= flags.contains('r') || flags.contains('R');
                force |= flags.contains('f');
            }
            _ => {}
        }
    }

    recursive && force && targets_root
}

fn split_segments(cmd_line: &str) -> Vec<String> {
    let mut segments = Vec::new();
    let mut current = String::new();
    let mut in_single = false;
    let mut in_double = false;
    let mut escaped = false;

    for c in cmd_line.chars() {
        if escaped {
            escaped = false;
            current.push(c);
            continue;
        }

        match c {
            '\\' if !in_single => escaped = true,
            '\'' if !in_double => in_single = !in_single,
            '"' if !in_single => in_double = !in_double,
            '|' | '&' | ';' | '\n' if !in_single && !in_double => {
                segments.push(std::mem::take(&mut current));
                continue;
            }
            _ => {}
        }
        current.push(c);
    }
    segments.push(current);

    segments.retain(|s| !s.trim().is_empty());
    segments
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allows_everyday_commands() {
        for cmd in [
            "ls -la",
            "echo hello",
            "cat file.txt",
            "grep pattern file.txt",
            "ls --format=long",
            "rm -rf ./build",
            "du -h | sort -hr | head -10",
        ] {
            assert!(sanitize_command(cmd, true).is_ok(), "{cmd}");
        }
    }

    #[test]
    fn blocks_destructive_commands() {
        for cmd in [
            "rm -rf /",
            "rm -rf /*",
            "rm -r -f /",
            "sudo rm --recursive --force /",
            "dd if=/dev/zero of=/dev/sda",
            "mkfs.ext4 /dev/sda1",
            "sudo fdisk /dev/sda",
            "/sbin/parted /dev/sda",
        ] {
            assert!(sanitize_command(cmd, true).is_err(), "{cmd}");
        }
    }

    #[test]
    fn checks_every_segment_but_not_quoted_text() {
        assert_eq!(
            detect_dangerous_pattern("ls -la; rm -rf /").as_deref(),
            Some("rm -rf /")
        );
        assert_eq!(
            detect_dangerous_pattern("true && mkfs /dev/sdb").as_deref(),
            Some("mkfs")
        );
        assert_eq!(detect_dangerous_pattern("echo 'rm -rf /; mkfs'"), None);
    }

    #[test]
    fn disabled_sanitization_allows_anything() {
        assert!(sanitize_command("rm -rf /", false).is_ok());
    }

    #[test]
    fn error_names_the_pattern() {
        let err = sanitize_command("dd if=/dev/zero of=disk.img", true).unwrap_err();
        assert!(err.to_string().contains("dd if=/dev/zero"));
    }
}
