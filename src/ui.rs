use crate::validator::{base_command, CheckedCommand};
use crossterm::style::{Color, StyledContent, Stylize};
use crossterm::terminal;

const SEPARATOR_WIDTH: u16 = 50;

pub fn status_mark(ok: bool) -> StyledContent<&'static str> {
    if ok {
        "✓".green()
    } else {
        "✗".red()
    }
}

/// A dashed rule, narrowed to the terminal when it is smaller than usual.
pub fn separator() -> String {
    let width = terminal::size()
        .map(|(cols, _)| cols.min(SEPARATOR_WIDTH))
        .unwrap_or(SEPARATOR_WIDTH);
    "-".repeat(usize::from(width.max(1)))
}

/// Renders the candidate commands as an aligned table.
pub fn commands_table(request: &str, checked: &[CheckedCommand]) -> String {
    let width = checked
        .iter()
        .map(|c| c.command.chars().count())
        .max()
        .unwrap_or(0)
        .max("Command".len());

    let mut out = format!("{}\n", format!("Commands for: {}", request).bold());
    out.push_str(&format!(
        "  {:<width$}  {:<9}  {}\n",
        "Command",
        "Status",
        "Description",
        width = width
    ));
    for item in checked {
        let status = if item.available {
            format!("{:<9}", "Available").green()
        } else {
            format!("{:<9}", "Not Found").red()
        };
        out.push_str(&format!(
            "  {}  {}  {}\n",
            format!("{:<width$}", item.command, width = width).cyan(),
            status,
            describe_command(&item.command)
        ));
    }
    out
}

/// One-line description of well-known programs.
pub fn describe_command(command: &str) -> &'static str {
    let program = base_command(command).unwrap_or_default();
    match program.as_str() {
        "ls" => "List directory contents",
        "cat" => "Display file contents",
        "grep" => "Search for patterns in files",
        "find" => "Find files and directories",
        "ps" => "Show process status",
        "top" | "htop" => "Display system processes",
        "df" => "Show disk space usage",
        "du" => "Show directory space usage",
        "free" => "Show memory usage",
        "netstat" => "Show network statistics",
        "ifconfig" => "Configure network interfaces",
        "ip" => "Show/manipulate routing",
        "ping" => "Test network connectivity",
        "curl" => "Transfer data from/to servers",
        "wget" => "Retrieve files from web",
        "tar" => "Archive files",
        "zip" => "Compress files",
        "unzip" => "Extract compressed files",
        "chmod" => "Change file permissions",
        "chown" => "Change file ownership",
        "sudo" => "Execute command as superuser",
        _ => "System command",
    }
}

/// Foreground colour for command output under `ui.theme`, taken from each
/// theme's accent. Unknown names, `plain` and `none` print uncoloured.
pub fn theme_color(theme: &str) -> Option<Color> {
    let rgb = |r, g, b| Some(Color::Rgb { r, g, b });
    match theme.trim().to_ascii_lowercase().as_str() {
        "monokai" => rgb(0xa6, 0xe2, 0x2e),
        "dracula" => rgb(0xbd, 0x93, 0xf9),
        "nord" => rgb(0x88, 0xc0, 0xd0),
        "gruvbox" | "gruvbox-dark" => rgb(0xfa, 0xbd, 0x2f),
        "solarized" | "solarized-dark" | "solarized-light" => rgb(0x26, 0x8b, 0xd2),
        "github-dark" => rgb(0xc9, 0xd1, 0xd9),
        "one-dark" => rgb(0x61, 0xaf, 0xef),
        _ => None,
    }
}

/// Colours `text` with the theme's output colour, if it has one.
pub fn themed(text: &str, theme: &str) -> String {
    match theme_color(theme) {
        Some(color) => text.with(color).to_string(),
        None => text.to_string(),
    }
}

/// Keeps the first `max_lines` lines and notes the truncation.
pub fn truncate_output(output: &str, max_lines: u32) -> String {
    let max_lines = max_lines as usize;
    let lines: Vec<&str> = output.split('\n').collect();
    if lines.len() <= max_lines {
        return output.to_string();
    }
    let mut kept = lines[..max_lines].join("\n");
    kept.push_str(&format!(
        "\n... (truncated, showing first {} lines)",
        max_lines
    ));
    kept
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_output_is_unchanged() {
        assert_eq!(truncate_output("line1\nline2\nline3", 5), "line1\nline2\nline3");
        assert_eq!(truncate_output("", 10), "");
    }

    #[test]
    fn long_output_is_truncated_with_note() {
        let output = (0..100)
            .map(|i| format!("line{}", i))
            .collect::<Vec<_>>()
            .join("\n");
        let formatted = truncate_output(&output, 10);
        let lines: Vec<&str> = formatted.split('\n').collect();
        assert_eq!(lines.len(), 11);
        assert_eq!(lines[9], "line9");
        assert_eq!(lines[10], "... (truncated, showing first 10 lines)");
    }

    #[test]
    fn descriptions_use_the_program_name() {
        assert_eq!(describe_command("ls -la"), "List directory contents");
        assert_eq!(describe_command("sudo ls"), "Execute command as superuser");
        assert_eq!(describe_command("vm_stat"), "System command");
    }

    #[test]
    fn table_lists_every_command() {
        let table = commands_table(
            "check memory",
            &[
                CheckedCommand {
                    command: "free -h".to_string(),
                    available: true,
                },
                CheckedCommand {
                    command: "vm_stat".to_string(),
                    available: false,
                },
            ],
        );
        assert!(table.contains("check memory"));
        assert!(table.contains("free -h"));
        assert!(table.contains("Show memory usage"));
        assert!(table.contains("Not Found"));
    }

    #[test]
    fn themes_map_to_output_colours() {
        assert_eq!(
            theme_color("monokai"),
            Some(Color::Rgb { r: 0xa6, g: 0xe2, b: 0x2e })
        );
        assert_eq!(theme_color(" Dracula "), theme_color("dracula"));
        assert!(theme_color("nord").is_some());
        assert_eq!(theme_color("plain"), None);
        assert_eq!(theme_color("no-such-theme"), None);
    }

    #[test]
    fn plain_theme_leaves_output_untouched() {
        assert_eq!(themed("total 0\nfile", "plain"), "total 0\nfile");
        assert!(themed("total 0", "monokai").contains("total 0"));
    }

    #[test]
    fn separator_is_never_empty() {
        let rule = separator();
        assert!(!rule.is_empty());
        assert!(rule.len() <= SEPARATOR_WIDTH as usize);
    }
}
