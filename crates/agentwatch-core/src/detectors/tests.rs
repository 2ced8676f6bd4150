use super::*;

use pretty_assertions::assert_eq;

fn detect(text: &str) -> WaitingState {
    StateDetector::new().detect(text.as_bytes())
}

fn rule(text: &str) -> DetectionRule {
    StateDetector::new().detect_with_reason(text.as_bytes()).rule
}

#[test]
fn test_empty_input_is_working() {
    let detector = StateDetector::new();
    assert_eq!(detector.detect(&[]), WaitingState::Working);
    assert_eq!(detector.detect(b""), WaitingState::Working);
    assert_eq!(
        detector.detect_with_reason(b"").rule,
        DetectionRule::EmptyOutput
    );
}

#[test]
fn test_plain_text_falls_back_to_working() {
    assert_eq!(detect("idle"), WaitingState::Working);
    assert_eq!(rule("idle"), DetectionRule::Fallback);
}

#[test]
fn test_whitespace_only_falls_back_to_working() {
    assert_eq!(detect("\n\n   \n\t\n"), WaitingState::Working);
}

#[test]
fn test_spinner_with_progress_verb() {
    assert_eq!(detect("Analyzing...⠋"), WaitingState::Working);
    assert_eq!(rule("Analyzing...⠋"), DetectionRule::WorkingIndicator);
}

#[test]
fn test_working_indicator_overrides_question() {
    let content = "Which approach would you prefer?\nLet me check the existing tests first.";
    assert_eq!(detect(content), WaitingState::Working);

    let content = "Should I continue?\n✻ Thinking… (esc to interrupt)";
    assert_eq!(detect(content), WaitingState::Working);
}

#[test]
fn test_working_phrases() {
    for content in [
        "Working on the parser refactor",
        "Processing 12 files",
        "Fetching dependencies",
        "Reading src/main.rs...",
        "Let me look at the config loader",
        "* Cogitating…",
        "⠹ Running tests",
    ] {
        assert_eq!(detect(content), WaitingState::Working, "{content}");
        assert_eq!(rule(content), DetectionRule::WorkingIndicator, "{content}");
    }
}

#[test]
fn test_pr_url_wins_over_question() {
    let content = "Opened https://github.com/acme/widgets/pull/42\nAnything else I can help with?";
    assert_eq!(detect(content), WaitingState::PROpened);
}

#[test]
fn test_pr_url_outside_recent_lines() {
    let mut content = String::from("PR: https://github.com/acme/widgets/pull/7\n");
    for i in 0..15 {
        content.push_str(&format!("summary line {i}\n"));
    }
    assert_eq!(detect(&content), WaitingState::PROpened);
    let result = StateDetector::new().detect_with_reason(content.as_bytes());
    assert_eq!(
        result.matched_text.as_deref(),
        Some("PR: https://github.com/acme/widgets/pull/7")
    );
}

#[test]
fn test_pr_url_scrolled_past_truncation_window() {
    let mut content = String::from("https://github.com/acme/widgets/pull/7\n");
    content.push_str(&"x".repeat(2500));
    assert_eq!(detect(&content), WaitingState::Working);
}

#[test]
fn test_non_pr_github_url_ignored() {
    assert_eq!(
        detect("See https://github.com/acme/widgets/issues/3 for details."),
        WaitingState::Working
    );
}

#[test]
fn test_critical_errors() {
    for content in [
        "API Error: 529 {\"type\":\"overloaded_error\"}",
        "API Error: 401 Unauthorized",
        "Invalid API key · Please run /login",
        "OAuth token has expired",
        "Unable to connect to Anthropic API",
        "Credit balance is too low",
        "claude: Segmentation fault (core dumped)",
        "codex process: terminated by signal SIGKILL",
    ] {
        assert_eq!(detect(content), WaitingState::Error, "{content}");
    }
}

#[test]
fn test_generic_error_output_is_not_agent_error() {
    let content = "running 3 tests\nerror: test failed, to rerun pass `--lib`\nError: expected 1, got 2";
    assert_eq!(detect(content), WaitingState::Working);
}

#[test]
fn test_command_crash_output_is_not_agent_error() {
    for content in [
        "running 12 tests\nSegmentation fault (core dumped)",
        "cargo test --release\nKilled",
        "process didn't exit successfully (signal: 9, SIGKILL: kill)",
    ] {
        assert_eq!(detect(content), WaitingState::Working, "{content}");
    }
}

#[test]
fn test_permission_prompt_beats_question() {
    assert_eq!(
        detect("Do you want to proceed? [Y/N]"),
        WaitingState::WaitingPermission
    );
}

#[test]
fn test_permission_prompts() {
    for content in [
        "Overwrite config.toml? (y/n)",
        "Shall I proceed with the migration",
        "May I continue",
        "Waiting for approval",
        "Do you want to make this edit to lib.rs?\n❯ 1. Yes\n  2. Yes, and don't ask again this session\n  3. No",
    ] {
        assert_eq!(detect(content), WaitingState::WaitingPermission, "{content}");
    }
}

#[test]
fn test_questions() {
    for content in [
        "Which database should we use?",
        "What would you like the endpoint to be called",
        "Please specify the target branch",
        "Select one of the following:\n1. Postgres\n2. SQLite",
        "The refactor is done.\nWould you like me to add tests",
    ] {
        assert_eq!(detect(content), WaitingState::WaitingQuestion, "{content}");
    }
}

#[test]
fn test_input_prompt_chrome() {
    let content = "Done. All changes are committed.\n\n❯ \n  ? for shortcuts";
    assert_eq!(detect(content), WaitingState::WaitingInput);

    let boxed = "╭──────────╮\n│ >        │\n╰──────────╯";
    assert_eq!(detect(boxed), WaitingState::WaitingInput);
}

#[test]
fn test_question_only_in_recent_lines() {
    let mut content = String::from("Which option do you want?\n");
    for i in 0..12 {
        content.push_str(&format!("step {i} done\n"));
    }
    assert_eq!(detect(&content), WaitingState::Working);
}

#[test]
fn test_blank_lines_do_not_count_toward_recent() {
    let mut content = String::from("Which option do you want?\n");
    for i in 0..9 {
        content.push_str(&format!("line {i}\n\n\n"));
    }
    assert_eq!(detect(&content), WaitingState::WaitingQuestion);
}

#[test]
fn test_ansi_sequences_are_stripped() {
    let content = "\x1b]0;claude\x07\x1b[1mDo you want to \x1b[32mproceed\x1b[0m? \x1b[2m[y/n]\x1b[0m";
    assert_eq!(detect(content), WaitingState::WaitingPermission);
}

#[test]
fn test_invalid_utf8_is_tolerated() {
    let mut bytes = b"Which file?".to_vec();
    bytes.splice(0..0, [0xff, 0xfe, b'\n']);
    assert_eq!(
        StateDetector::new().detect(&bytes),
        WaitingState::WaitingQuestion
    );
}

#[test]
fn test_only_tail_is_considered() {
    let mut content = String::from("Waiting for approval\n");
    content.push_str(&"filler ".repeat(400));
    assert_eq!(detect(&content), WaitingState::Working);
}

#[test]
fn test_is_working() {
    let detector = StateDetector::new();
    assert!(detector.is_working("Analyzing...⠋".as_bytes()));
    assert!(!detector.is_working(b"idle"));
    assert!(!detector.is_working(b""));
}

#[test]
fn test_matched_text_reports_line() {
    let result = StateDetector::new().detect_with_reason(b"context\nOverwrite file? [y/n]\n");
    assert_eq!(
        result,
        DetectionResult {
            state: WaitingState::WaitingPermission,
            rule: DetectionRule::Permission,
            matched_text: Some("Overwrite file? [y/n]".to_string()),
        }
    );
}

#[test]
fn test_empty_completion_category_falls_through() {
    let table = PatternTable::builtin();
    assert!(table.completion.is_empty());
    assert_eq!(detect("Task complete."), WaitingState::Working);
}

#[test]
fn test_custom_completion_pattern() {
    let mut table = PatternTable::builtin();
    table.completion = vec![r"(?i)all tasks complete".to_string()];
    let detector = StateDetector::from_table(&table);
    assert_eq!(
        detector.detect(b"All tasks complete. Anything else?"),
        WaitingState::Completed
    );
}

#[test]
fn test_invalid_custom_patterns_are_dropped() {
    let mut table = PatternTable::empty();
    table.question = vec!["(broken".to_string(), r"\?$".to_string()];
    let detector = StateDetector::from_table(&table);
    assert_eq!(detector.detect(b"ready?"), WaitingState::WaitingQuestion);
    assert_eq!(detector.detect(b"(broken"), WaitingState::Working);
}

#[test]
fn test_detectors_with_different_tables_are_independent() {
    let empty = StateDetector::from_table(&PatternTable::empty());
    let builtin = StateDetector::new();
    let content = b"Proceed? [y/n]";
    assert_eq!(empty.detect(content), WaitingState::Working);
    assert_eq!(builtin.detect(content), WaitingState::WaitingPermission);
}
