use once_cell::sync::Lazy;
use regex::Regex;

/// CSI (`ESC [ ... final`), OSC (`ESC ] ... BEL|ST`, possibly cut off) and
/// two-byte escapes, in that order of preference.
static ANSI_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\x1b\[[0-?]*[ -/]*[@-~]|\x1b\][^\x07\x1b]*(?:\x07|\x1b\\|$)|\x1b[@-Z\\-_]")
        .expect("Invalid ANSI_PATTERN regex")
});

/// Remove ANSI escape sequences from text
pub fn strip_ansi(text: &str) -> String {
    ANSI_PATTERN.replace_all(text, "").into_owned()
}

/// Last `n` characters of a string, respecting UTF-8 boundaries
pub fn tail_chars(s: &str, n: usize) -> &str {
    if n == 0 {
        return "";
    }
    match s.char_indices().rev().nth(n - 1) {
        Some((start, _)) => &s[start..],
        None => s,
    }
}

/// Last `n` non-blank lines, oldest first, joined with `\n`
///
/// Blank lines are skipped and do not count toward `n`.
pub fn recent_lines(text: &str, n: usize) -> String {
    let mut lines: Vec<&str> = text
        .lines()
        .rev()
        .filter(|line| !line.trim().is_empty())
        .take(n)
        .collect();
    lines.reverse();
    lines.join("\n")
}

/// Full line around a byte offset (used to report what a pattern matched)
pub(crate) fn line_at(text: &str, offset: usize) -> &str {
    let start = text[..offset].rfind('\n').map(|i| i + 1).unwrap_or(0);
    let end = text[offset..]
        .find('\n')
        .map(|i| offset + i)
        .unwrap_or(text.len());
    text[start..end].trim()
}

/// Truncate to 200 chars for reporting
pub(crate) fn truncate_matched(text: &str) -> String {
    if text.len() > 200 {
        format!("{}...", &text[..text.floor_char_boundary(197)])
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_ansi_csi_sequences() {
        assert_eq!(strip_ansi("\x1b[32mgreen\x1b[0m text"), "green text");
        assert_eq!(strip_ansi("\x1b[1;31;40mbold\x1b[K"), "bold");
        assert_eq!(strip_ansi("\x1b[?25lhidden cursor\x1b[?25h"), "hidden cursor");
    }

    #[test]
    fn test_strip_ansi_osc_sequences() {
        assert_eq!(strip_ansi("\x1b]0;window title\x07prompt"), "prompt");
        assert_eq!(strip_ansi("\x1b]8;;https://x.y\x1b\\link"), "link");
        assert_eq!(strip_ansi("before\x1b]0;never terminated"), "before");
    }

    #[test]
    fn test_strip_ansi_preserves_plain_text() {
        let text = "Plain text with [brackets] and ünïcödé ⠋";
        assert_eq!(strip_ansi(text), text);
    }

    #[test]
    fn test_tail_chars_short_string() {
        assert_eq!(tail_chars("hello", 10), "hello");
        assert_eq!(tail_chars("hello", 5), "hello");
    }

    #[test]
    fn test_tail_chars_truncated() {
        assert_eq!(tail_chars("hello world", 5), "world");
        assert_eq!(tail_chars("hello", 0), "");
    }

    #[test]
    fn test_tail_chars_multibyte() {
        // 3 bytes each
        assert_eq!(tail_chars("あいう", 2), "いう");
        assert_eq!(tail_chars("⠋⠙⠹", 1), "⠹");
    }

    #[test]
    fn test_recent_lines_skips_blank() {
        let text = "one\n\ntwo\n   \nthree\n\n";
        assert_eq!(recent_lines(text, 2), "two\nthree");
        assert_eq!(recent_lines(text, 10), "one\ntwo\nthree");
    }

    #[test]
    fn test_recent_lines_empty() {
        assert_eq!(recent_lines("", 10), "");
        assert_eq!(recent_lines("\n \n\t\n", 10), "");
    }

    #[test]
    fn test_line_at() {
        let text = "first\n  second line  \nthird";
        let offset = text.find("second").unwrap();
        assert_eq!(line_at(text, offset), "second line");
        assert_eq!(line_at(text, 0), "first");
        assert_eq!(line_at(text, text.len() - 1), "third");
    }

    #[test]
    fn test_truncate_matched() {
        assert_eq!(truncate_matched("short"), "short");
        let long = "x".repeat(300);
        let truncated = truncate_matched(&long);
        assert_eq!(truncated.len(), 200);
        assert!(truncated.ends_with("..."));
    }
}
