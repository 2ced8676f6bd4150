use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Progress verbs followed by an ellipsis, "let me ..." narration, explicit
/// activity phrases and spinner glyphs
const WORKING_PATTERNS: &[&str] = &[
    r"(?i)\b(?:thinking|analy[sz]ing|reading|writing|searching|running|building|compiling|testing|generating|creating|updating|editing|installing|checking|reviewing|exploring|implementing|planning|refactoring|investigating|applying|downloading|cloning)\b[^\n]*?(?:\.\.\.|…)",
    r"(?i)\blet me (?:check|look|analy[sz]e|examine|review|read|search|see|investigate|explore|find|run|try)\b",
    r"(?i)\b(?:working on|processing|loading|fetching)\b",
    r"[⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏]",
    r"(?i)\besc to interrupt\b",
    r"(?m)^\s*[✻✶✽✢·*]\s+\p{Lu}\p{L}*(?:…|\.\.\.)",
];

const PR_OPENED_PATTERNS: &[&str] =
    &[r"https://github\.com/[A-Za-z0-9_.-]+/[A-Za-z0-9_.-]+/pull/\d+"];

/// Failures of the agent CLI itself; generic "error:" lines are left out on
/// purpose since they show up in test and compiler output all the time
const ERROR_PATTERNS: &[&str] = &[
    r"(?i)\bAPI Error\b[^\n]*\b(?:401|403|429|500|502|503|529)\b",
    r"(?i)\b(?:authentication_error|permission_error|rate_limit_error|overloaded_error)\b",
    r"(?i)\binvalid api key\b",
    r"(?i)please run /login\b",
    r"(?i)\bOAuth token (?:has )?(?:expired|been revoked)\b",
    r"(?i)\bunable to connect to (?:the )?(?:anthropic )?API\b",
    r"(?i)\bsession (?:expired|not found|terminated unexpectedly)\b",
    r"(?i)\b(?:claude|agent) (?:process )?(?:crashed|exited unexpectedly|was killed)\b",
    r"(?i)\bcredit balance is too low\b",
    r"(?im)^\s*(?:claude|codex)(?: process)?:\s*(?:segmentation fault|killed|terminated by signal)\b",
];

/// Completion is signalled out of band (sentinel file), not by text
const COMPLETION_PATTERNS: &[&str] = &[];

const PERMISSION_PATTERNS: &[&str] = &[
    r"(?i)\[y/n\]|\(y/n\)|\[yes/no\]|\(yes/no\)",
    r"(?i)\b(?:shall|should|may|can) i (?:proceed|continue|go ahead)\b",
    r"(?i)\bdo you want to (?:proceed|continue|allow|make this edit|create|run|execute|apply)\b",
    r"(?i)\bwaiting for (?:your )?(?:approval|permission|confirmation)\b",
    r"(?i)\bdon'?t ask again\b",
    r"(?i)\ballow (?:this|once|always)\b",
];

const QUESTION_PATTERNS: &[&str] = &[
    r"(?m)\?\s*$",
    r"(?i)\b(?:what|which|how) (?:would|should|do) you\b",
    r"(?i)\bplease (?:specify|clarify|choose|select)\b",
    r"(?i)\bselect one of\b",
    r"(?i)\bwould you (?:like|prefer)\b",
];

/// Prompt chrome of the agent's input box
const INPUT_PATTERNS: &[&str] = &[
    r"(?m)^\s*[>❯›]\s*$",
    r"(?m)^\s*│\s*[>❯]\s*│?\s*$",
    r"\?\s+for shortcuts",
    r"(?i)\bpress enter to (?:send|submit|continue)\b",
    r"(?i)\btype your (?:message|prompt|request)\b",
];

fn owned(patterns: &[&str]) -> Vec<String> {
    patterns.iter().map(|p| p.to_string()).collect()
}

/// Pattern sources per detection category
///
/// Pure data: compiled once by [`super::StateDetector::from_table`].
/// Categories omitted from a config file fall back to the builtin list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternTable {
    #[serde(default = "default_working")]
    pub working: Vec<String>,
    #[serde(default = "default_pr_opened")]
    pub pr_opened: Vec<String>,
    #[serde(default = "default_error")]
    pub error: Vec<String>,
    #[serde(default = "default_completion")]
    pub completion: Vec<String>,
    #[serde(default = "default_permission")]
    pub permission: Vec<String>,
    #[serde(default = "default_question")]
    pub question: Vec<String>,
    #[serde(default = "default_input")]
    pub input: Vec<String>,
}

fn default_working() -> Vec<String> {
    owned(WORKING_PATTERNS)
}

fn default_pr_opened() -> Vec<String> {
    owned(PR_OPENED_PATTERNS)
}

fn default_error() -> Vec<String> {
    owned(ERROR_PATTERNS)
}

fn default_completion() -> Vec<String> {
    owned(COMPLETION_PATTERNS)
}

fn default_permission() -> Vec<String> {
    owned(PERMISSION_PATTERNS)
}

fn default_question() -> Vec<String> {
    owned(QUESTION_PATTERNS)
}

fn default_input() -> Vec<String> {
    owned(INPUT_PATTERNS)
}

impl PatternTable {
    /// The builtin tables
    pub fn builtin() -> Self {
        Self {
            working: default_working(),
            pr_opened: default_pr_opened(),
            error: default_error(),
            completion: default_completion(),
            permission: default_permission(),
            question: default_question(),
            input: default_input(),
        }
    }

    /// Table with every category empty
    pub fn empty() -> Self {
        Self {
            working: Vec::new(),
            pr_opened: Vec::new(),
            error: Vec::new(),
            completion: Vec::new(),
            permission: Vec::new(),
            question: Vec::new(),
            input: Vec::new(),
        }
    }
}

impl Default for PatternTable {
    fn default() -> Self {
        Self::builtin()
    }
}

/// Compiled patterns of one category, OR-ed together
#[derive(Debug, Clone, Default)]
pub struct PatternSet {
    patterns: Vec<Regex>,
}

impl PatternSet {
    /// Compile patterns, dropping the ones that fail to compile
    pub fn compile<S: AsRef<str>>(category: &str, sources: &[S]) -> Self {
        let patterns = sources
            .iter()
            .filter_map(|source| match Regex::new(source.as_ref()) {
                Ok(re) => Some(re),
                Err(e) => {
                    debug!(category, pattern = source.as_ref(), "dropping invalid pattern: {e}");
                    None
                }
            })
            .collect();
        Self { patterns }
    }

    pub fn is_match(&self, text: &str) -> bool {
        self.patterns.iter().any(|re| re.is_match(text))
    }

    /// Byte offset of the first pattern (in table order) that matches
    pub fn find(&self, text: &str) -> Option<usize> {
        self.patterns
            .iter()
            .find_map(|re| re.find(text))
            .map(|m| m.start())
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_patterns_all_compile() {
        let table = PatternTable::builtin();
        for (name, sources) in [
            ("working", &table.working),
            ("pr_opened", &table.pr_opened),
            ("error", &table.error),
            ("permission", &table.permission),
            ("question", &table.question),
            ("input", &table.input),
        ] {
            let set = PatternSet::compile(name, sources);
            assert_eq!(set.len(), sources.len(), "{name} has an invalid builtin pattern");
        }
    }

    #[test]
    fn test_builtin_completion_is_empty() {
        assert!(PatternTable::builtin().completion.is_empty());
    }

    #[test]
    fn test_invalid_patterns_are_dropped() {
        let set = PatternSet::compile("test", &["(unclosed", r"valid\d+", "[z-a]"]);
        assert_eq!(set.len(), 1);
        assert!(set.is_match("valid42"));
        assert!(!set.is_match("(unclosed"));
    }

    #[test]
    fn test_find_reports_offset() {
        let set = PatternSet::compile("test", &["world"]);
        assert_eq!(set.find("hello world"), Some(6));
        assert_eq!(set.find("hello"), None);
    }

    #[test]
    fn test_partial_table_uses_builtin_for_missing_categories() {
        let table: PatternTable = toml::from_str(r#"question = ["custom\\?"]"#).unwrap();
        assert_eq!(table.question, vec![r"custom\?".to_string()]);
        assert_eq!(table.working, PatternTable::builtin().working);
        assert!(table.completion.is_empty());
    }
}
