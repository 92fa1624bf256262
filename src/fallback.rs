//! Built-in command mappings used when no LLM is reachable (no api key, or
//! the request failed).

const MAPPINGS: &[(&str, &[&str])] = &[
    ("show network ip", &["ip addr show", "ifconfig", "hostname -I"]),
    ("show ip", &["ip addr show", "ifconfig", "hostname -I"]),
    ("network ip", &["ip addr show", "ifconfig", "hostname -I"]),
    ("check memory", &["free -h", "top -l 1 | head -10", "vm_stat"]),
    ("system memory", &["free -h", "top -l 1 | head -10", "vm_stat"]),
    ("memory usage", &["free -h", "top -l 1 | head -10", "vm_stat"]),
    ("disk space", &["df -h", "du -h | sort -hr | head -10"]),
    ("disk usage", &["df -h", "du -h | sort -hr | head -10"]),
    ("list files", &["ls -la", "ls -lh"]),
    ("show files", &["ls -la", "ls -lh"]),
    ("running processes", &["ps aux", "top", "htop"]),
    ("process list", &["ps aux", "top", "htop"]),
    ("system processes", &["ps aux", "top", "htop"]),
    ("find large files", &["find . -type f -size +100M", "du -h | sort -hr | head -10"]),
    ("search files", &["find . -name '*pattern*'", "grep -r 'pattern' ."]),
    ("ping google", &["ping -c 4 google.com", "ping google.com"]),
    ("test connection", &["ping -c 4 google.com", "curl -I https://google.com"]),
    ("current directory", &["pwd", "ls -la"]),
    ("working directory", &["pwd", "ls -la"]),
    ("system info", &["uname -a", "cat /etc/os-release", "systeminfo"]),
    ("os info", &["uname -a", "cat /etc/os-release", "systeminfo"]),
    ("cpu info", &["lscpu", "cat /proc/cpuinfo", "sysctl -n machdep.cpu.brand_string"]),
    ("uptime", &["uptime", "w"]),
    ("who is logged in", &["who", "w", "users"]),
    ("logged users", &["who", "w", "users"]),
];

/// Looks the request up in the built-in table.
///
/// A full phrase match wins; otherwise the first mapping sharing any whole
/// word with the request is used. Returns an empty list when nothing matches.
pub fn fallback_commands(user_input: &str) -> Vec<String> {
    let input = user_input.to_lowercase();

    let phrase = MAPPINGS.iter().find(|(pattern, _)| input.contains(pattern));
    let found = phrase.or_else(|| {
        let words: Vec<&str> = input.split_whitespace().collect();
        MAPPINGS
            .iter()
            .find(|(pattern, _)| pattern.split_whitespace().any(|w| words.contains(&w)))
    });

    found
        .map(|(_, commands)| commands.iter().map(|c| c.to_string()).collect())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phrase_match_is_case_insensitive() {
        assert_eq!(
            fallback_commands("Please SHOW NETWORK IP now"),
            vec!["ip addr show", "ifconfig", "hostname -I"]
        );
    }

    #[test]
    fn phrase_match_beats_word_match() {
        assert_eq!(
            fallback_commands("find large files here")[0],
            "find . -type f -size +100M"
        );
    }

    #[test]
    fn word_match_uses_whole_words() {
        assert_eq!(fallback_commands("how much memory")[0], "free -h");
        // "zip" must not match the "ip" mappings.
        assert!(fallback_commands("zip archive").is_empty());
    }

    #[test]
    fn unknown_request_yields_nothing() {
        assert!(fallback_commands("compile the kernel").is_empty());
    }
}
