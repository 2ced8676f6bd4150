mod common;
mod patterns;
mod state;
#[cfg(test)]
mod tests;
mod timeout;

pub use common::{recent_lines, strip_ansi, tail_chars};
pub use patterns::{PatternSet, PatternTable};
pub use state::StateDetector;
pub use timeout::{TimeoutConfig, TimeoutDetector, TimeoutInput};

use serde::Serialize;

use crate::agents::WaitingState;
use common::truncate_matched;

/// Which rule category produced a detection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectionRule {
    /// Nothing to look at
    EmptyOutput,
    WorkingIndicator,
    PrOpened,
    CriticalError,
    Completion,
    Permission,
    Question,
    InputPrompt,
    /// No category matched
    Fallback,
}

impl DetectionRule {
    pub fn as_str(&self) -> &'static str {
        match self {
            DetectionRule::EmptyOutput => "empty_output",
            DetectionRule::WorkingIndicator => "working_indicator",
            DetectionRule::PrOpened => "pr_opened",
            DetectionRule::CriticalError => "critical_error",
            DetectionRule::Completion => "completion",
            DetectionRule::Permission => "permission",
            DetectionRule::Question => "question",
            DetectionRule::InputPrompt => "input_prompt",
            DetectionRule::Fallback => "fallback",
        }
    }
}

/// Detection result combining the state and why it was chosen
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DetectionResult {
    pub state: WaitingState,
    pub rule: DetectionRule,
    /// Line that triggered the rule (truncated)
    pub matched_text: Option<String>,
}

impl DetectionResult {
    pub fn new(state: WaitingState, rule: DetectionRule) -> Self {
        Self {
            state,
            rule,
            matched_text: None,
        }
    }

    pub fn with_matched_text(mut self, text: &str) -> Self {
        self.matched_text = Some(truncate_matched(text));
        self
    }

    /// True when a working indicator decided the state
    pub fn is_working_indicator(&self) -> bool {
        self.rule == DetectionRule::WorkingIndicator
    }
}
