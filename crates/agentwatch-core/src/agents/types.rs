use std::fmt;

use serde::{Deserialize, Serialize};

/// What a monitored agent is doing right now, as inferred from its output
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WaitingState {
    /// Agent is producing output or thinking
    #[default]
    Working,
    /// Agent asks for permission to perform an action (Y/N style)
    WaitingPermission,
    /// Agent asked the user a question
    WaitingQuestion,
    /// Agent sits at its input prompt
    WaitingInput,
    /// Agent finished its task
    Completed,
    /// Agent hit one of its own fatal errors
    Error,
    /// Agent opened a pull request
    #[serde(rename = "pr_opened")]
    PROpened,
}

impl WaitingState {
    /// Whether the agent is blocked on the user
    ///
    /// Only the three `Waiting*` states count; `Completed` and `Error`
    /// also need attention but are not waits.
    pub fn is_waiting(&self) -> bool {
        matches!(
            self,
            WaitingState::WaitingPermission
                | WaitingState::WaitingQuestion
                | WaitingState::WaitingInput
        )
    }

    /// Stable identifier used in logs and JSON output
    pub fn as_str(&self) -> &'static str {
        match self {
            WaitingState::Working => "working",
            WaitingState::WaitingPermission => "waiting_permission",
            WaitingState::WaitingQuestion => "waiting_question",
            WaitingState::WaitingInput => "waiting_input",
            WaitingState::Completed => "completed",
            WaitingState::Error => "error",
            WaitingState::PROpened => "pr_opened",
        }
    }
}

impl fmt::Display for WaitingState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which timeout condition fired for an instance
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeoutType {
    /// No threshold exceeded
    #[default]
    None,
    /// No output change for longer than the activity timeout
    Activity,
    /// Total runtime exceeded the completion timeout
    Completion,
    /// Identical output observed more times than the stale threshold
    Stale,
}

impl TimeoutType {
    /// Whether this value represents a triggered timeout
    pub fn is_triggered(&self) -> bool {
        !matches!(self, TimeoutType::None)
    }

    /// Stable identifier used in logs and JSON output
    pub fn as_str(&self) -> &'static str {
        match self {
            TimeoutType::None => "none",
            TimeoutType::Activity => "activity",
            TimeoutType::Completion => "completion",
            TimeoutType::Stale => "stale",
        }
    }
}

impl fmt::Display for TimeoutType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
