use anyhow::Result;
use url::Url;

/// Validate a URL and return normalized version
pub fn validate_and_normalize_url(url: &str) -> Result<String> {
    let parsed = Url::parse(url)
        .map_err(|_| anyhow::anyhow!("Invalid URL format: {}", url))?;

    if !matches!(parsed.scheme(), "http" | "https") {
        anyhow::bail!("URL must use HTTP or HTTPS protocol");
    }

    Ok(parsed.to_string())
}

/// Extract domain from URL for display purposes
pub fn extract_domain(url: &str) -> Option<String> {
    Url::parse(url)
        .ok()?
        .host_str()
        .map(|host| {
            // Remove 'www.' prefix if present
            if host.starts_with("www.") {
                host[4..].to_string()
            } else {
                host.to_string()
            }
        })
}

/// Collapse all whitespace runs to single spaces and trim
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Count whitespace-delimited words
pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Count non-empty lines
pub fn line_count(text: &str) -> usize {
    text.lines().filter(|line| !line.trim().is_empty()).count()
}

/// Deterministic string hash: sum of char codes weighted by powers of 31
///
/// Used to seed the Nitter mirror rotation so the same tweet path always
/// starts at the same mirror.
pub fn string_hash(input: &str) -> u64 {
    let mut hash: u64 = 0;
    let mut power: u64 = 1;
    for c in input.chars() {
        hash = hash.wrapping_add((c as u64).wrapping_mul(power));
        power = power.wrapping_mul(31);
    }
    hash
}

/// Strip a leading title from content when the content begins with it
///
/// The match is case-insensitive and tolerant of leading control and
/// whitespace characters, so `# Title\n\nbody` with title `title` still
/// strips. Callers render the title separately; duplicating it wastes
/// context budget downstream.
pub fn strip_title_prefix(content: &str, title: &str) -> String {
    let title = title.trim();
    if title.is_empty() {
        return content.to_string();
    }

    let trimmed = content.trim_start_matches(|c: char| c.is_whitespace() || c.is_control() || c == '#');
    // Slicing by the title's byte length can split a multi-byte character in
    // the content; walk char boundaries instead.
    let title_chars = title.chars().count();
    let boundary = trimmed
        .char_indices()
        .map(|(i, _)| i)
        .chain(std::iter::once(trimmed.len()))
        .nth(title_chars);
    match boundary {
        Some(end) if trimmed[..end].eq_ignore_ascii_case(title) => {
            trimmed[end..].trim_start().to_string()
        }
        _ => content.to_string(),
    }
}

/// Loose title equality for matching RSS items to episode names
///
/// Lowercases, drops punctuation, and collapses whitespace before comparing.
pub fn titles_match(a: &str, b: &str) -> bool {
    let norm = |s: &str| {
        s.to_lowercase()
            .chars()
            .map(|c| if c.is_alphanumeric() { c } else { ' ' })
            .collect::<String>()
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
    };
    let (a, b) = (norm(a), norm(b));
    !a.is_empty() && (a == b || a.contains(&b) || b.contains(&a))
}

/// Truncate to a character budget, returning whether anything was cut
pub fn truncate_chars(text: &str, max_characters: usize) -> (String, bool) {
    let total = text.chars().count();
    if max_characters == 0 || total <= max_characters {
        return (text.to_string(), false);
    }
    (text.chars().take(max_characters).collect(), true)
}

/// Walk a loose JSON value by key path, defaulting to `None` on any mismatch
///
/// External payloads (YouTube internal API, platform lookups) have no stable
/// shape contract; a changed shape must read as an ordinary miss, never a
/// panic.
pub fn json_pluck<'a>(value: &'a serde_json::Value, path: &[&str]) -> Option<&'a serde_json::Value> {
    let mut current = value;
    for key in path {
        current = match key.parse::<usize>() {
            Ok(index) => current.get(index)?,
            Err(_) => current.get(key)?,
        };
    }
    Some(current)
}

/// Format duration in human-readable format
pub fn format_duration(seconds: f64) -> String {
    let total_seconds = seconds as u64;
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let secs = total_seconds % 60;

    if hours > 0 {
        format!("{}h {}m {}s", hours, minutes, secs)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, secs)
    } else {
        format!("{}s", secs)
    }
}

/// Check if the current environment has required tools
pub async fn check_dependencies(yt_dlp_path: &str) -> Vec<String> {
    let mut missing = Vec::new();

    if !check_command_available(yt_dlp_path).await {
        missing.push(format!(
            "{} - required for audio download fallbacks (YouTube, Twitter)",
            yt_dlp_path
        ));
    }

    if !check_command_available("ffmpeg").await {
        missing.push("ffmpeg - recommended for audio processing".to_string());
    }

    missing
}

/// Check if a command is available in PATH
async fn check_command_available(command: &str) -> bool {
    use tokio::process::Command;

    Command::new(command)
        .arg("--version")
        .output()
        .await
        .map(|output| output.status.success())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_and_normalize_url() {
        assert!(validate_and_normalize_url("https://example.com").is_ok());
        assert!(validate_and_normalize_url("http://example.com").is_ok());
        assert!(validate_and_normalize_url("ftp://example.com").is_err());
        assert!(validate_and_normalize_url("not-a-url").is_err());
    }

    #[test]
    fn test_extract_domain() {
        assert_eq!(
            extract_domain("https://www.youtube.com/watch?v=123"),
            Some("youtube.com".to_string())
        );
        assert_eq!(
            extract_domain("https://x.com/user/status/123"),
            Some("x.com".to_string())
        );
        assert_eq!(extract_domain("invalid-url"), None);
    }

    #[test]
    fn test_normalize_whitespace() {
        assert_eq!(normalize_whitespace("  a\n\tb   c "), "a b c");
        assert_eq!(normalize_whitespace(""), "");
    }

    #[test]
    fn test_word_and_line_counts() {
        assert_eq!(word_count("one two  three"), 3);
        assert_eq!(line_count("a\n\nb\n  \nc"), 3);
    }

    #[test]
    fn test_string_hash_deterministic() {
        assert_eq!(string_hash("/u/status/1?x=1"), string_hash("/u/status/1?x=1"));
        assert_ne!(string_hash("/a"), string_hash("/b"));
        // "ab" = 'a'*31^0 + 'b'*31^1
        assert_eq!(string_hash("ab"), 97 + 98 * 31);
    }

    #[test]
    fn test_strip_title_prefix() {
        assert_eq!(strip_title_prefix("My Post\n\nbody", "my post"), "body");
        assert_eq!(strip_title_prefix("# My Post\nbody", "My Post"), "body");
        assert_eq!(strip_title_prefix("unrelated body", "My Post"), "unrelated body");
        assert_eq!(strip_title_prefix("body", ""), "body");
    }

    #[test]
    fn test_strip_title_prefix_multibyte_content() {
        // a short title must not slice mid-character in CJK/emoji content
        assert_eq!(strip_title_prefix("日本語のページ本文", "ab"), "日本語のページ本文");
        assert_eq!(strip_title_prefix("日本語タイトル\n本文", "日本語タイトル"), "本文");
        assert_eq!(strip_title_prefix("🦀 body", "🦀"), "body");
    }

    #[test]
    fn test_titles_match() {
        assert!(titles_match("Episode 42: The Answer", "episode 42 the answer"));
        assert!(titles_match("The Answer (rebroadcast)", "The Answer"));
        assert!(!titles_match("Episode 42", "Episode 43"));
        assert!(!titles_match("", ""));
    }

    #[test]
    fn test_truncate_chars() {
        assert_eq!(truncate_chars("hello", 0), ("hello".to_string(), false));
        assert_eq!(truncate_chars("hello", 10), ("hello".to_string(), false));
        assert_eq!(truncate_chars("hello", 3), ("hel".to_string(), true));
    }

    #[test]
    fn test_json_pluck() {
        let value = serde_json::json!({"a": {"b": [{"c": 42}]}});
        assert_eq!(json_pluck(&value, &["a", "b", "0", "c"]), Some(&serde_json::json!(42)));
        assert_eq!(json_pluck(&value, &["a", "missing"]), None);
        assert_eq!(json_pluck(&value, &["a", "b", "9"]), None);
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(30.0), "30s");
        assert_eq!(format_duration(90.0), "1m 30s");
        assert_eq!(format_duration(3661.0), "1h 1m 1s");
    }
}
