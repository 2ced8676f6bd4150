use tracing::trace;

use crate::agents::WaitingState;

use super::common::{line_at, recent_lines, strip_ansi, tail_chars};
use super::patterns::{PatternSet, PatternTable};
use super::{DetectionResult, DetectionRule};

/// Only the tail of the capture says anything about the present
const MAX_DETECT_CHARS: usize = 2000;

/// Non-blank lines considered "recent"
const RECENT_LINE_COUNT: usize = 10;

/// Classifies captured terminal output into a [`WaitingState`]
///
/// Stateless once built: the compiled pattern sets are owned by the detector,
/// so detectors with different tables can run side by side.
///
/// Categories are checked in a fixed priority order, first match wins:
///
/// 1. working indicators (recent lines)
/// 2. pull request URL (whole truncated text)
/// 3. critical agent errors (recent lines)
/// 4. completion (recent lines; empty by default)
/// 5. permission prompts (recent lines)
/// 6. questions (recent lines)
/// 7. input prompt chrome (recent lines)
///
/// Anything else is `Working`.
#[derive(Debug, Clone)]
pub struct StateDetector {
    working: PatternSet,
    pr_opened: PatternSet,
    error: PatternSet,
    completion: PatternSet,
    permission: PatternSet,
    question: PatternSet,
    input: PatternSet,
}

impl StateDetector {
    /// Create a detector with the builtin pattern tables
    pub fn new() -> Self {
        Self::from_table(&PatternTable::builtin())
    }

    /// Compile a detector from pattern sources
    ///
    /// Invalid patterns are dropped; construction never fails.
    pub fn from_table(table: &PatternTable) -> Self {
        Self {
            working: PatternSet::compile("working", &table.working),
            pr_opened: PatternSet::compile("pr_opened", &table.pr_opened),
            error: PatternSet::compile("error", &table.error),
            completion: PatternSet::compile("completion", &table.completion),
            permission: PatternSet::compile("permission", &table.permission),
            question: PatternSet::compile("question", &table.question),
            input: PatternSet::compile("input", &table.input),
        }
    }

    /// Classify raw output
    pub fn detect(&self, output: &[u8]) -> WaitingState {
        self.detect_with_reason(output).state
    }

    /// Whether the recent output carries a working indicator
    pub fn is_working(&self, output: &[u8]) -> bool {
        if output.is_empty() {
            return false;
        }
        let (_, recent) = prepare(output);
        self.working.is_match(&recent)
    }

    /// Classify raw output and report the deciding rule
    pub fn detect_with_reason(&self, output: &[u8]) -> DetectionResult {
        if output.is_empty() {
            return DetectionResult::new(WaitingState::Working, DetectionRule::EmptyOutput);
        }

        let (text, recent) = prepare(output);

        // A question further up may already be answered; activity wins
        if let Some(at) = self.working.find(&recent) {
            trace!("detect: working indicator");
            return DetectionResult::new(WaitingState::Working, DetectionRule::WorkingIndicator)
                .with_matched_text(line_at(&recent, at));
        }

        // The URL may have scrolled out of the recent lines
        if let Some(at) = self.pr_opened.find(&text) {
            trace!("detect: pull request opened");
            return DetectionResult::new(WaitingState::PROpened, DetectionRule::PrOpened)
                .with_matched_text(line_at(&text, at));
        }

        let ordered = [
            (&self.error, WaitingState::Error, DetectionRule::CriticalError),
            (&self.completion, WaitingState::Completed, DetectionRule::Completion),
            (&self.permission, WaitingState::WaitingPermission, DetectionRule::Permission),
            (&self.question, WaitingState::WaitingQuestion, DetectionRule::Question),
            (&self.input, WaitingState::WaitingInput, DetectionRule::InputPrompt),
        ];
        for (set, state, rule) in ordered {
            if let Some(at) = set.find(&recent) {
                trace!(rule = rule.as_str(), "detect: matched");
                return DetectionResult::new(state, rule).with_matched_text(line_at(&recent, at));
            }
        }

        DetectionResult::new(WaitingState::Working, DetectionRule::Fallback)
    }
}

impl Default for StateDetector {
    fn default() -> Self {
        Self::new()
    }
}

/// Truncated, ANSI-free text plus its recent non-blank lines
fn prepare(output: &[u8]) -> (String, String) {
    let lossy = String::from_utf8_lossy(output);
    let text = strip_ansi(tail_chars(&lossy, MAX_DETECT_CHARS));
    let recent = recent_lines(&text, RECENT_LINE_COUNT);
    (text, recent)
}
