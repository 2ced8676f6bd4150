use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::agents::TimeoutType;

/// Timeout thresholds; a zero value disables that check
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeoutConfig {
    /// Maximum time without an output change
    pub activity_timeout: Duration,
    /// Maximum total runtime since tracking started
    pub completion_timeout: Duration,
    /// Maximum number of consecutive unchanged observations
    pub stale_threshold: u32,
}

impl TimeoutConfig {
    pub fn with_activity_timeout(mut self, timeout: Duration) -> Self {
        self.activity_timeout = timeout;
        self
    }

    pub fn with_completion_timeout(mut self, timeout: Duration) -> Self {
        self.completion_timeout = timeout;
        self
    }

    pub fn with_stale_threshold(mut self, threshold: u32) -> Self {
        self.stale_threshold = threshold;
        self
    }
}

/// Snapshot of an instance's timing and counters
#[derive(Debug, Clone, Copy)]
pub struct TimeoutInput {
    pub now: DateTime<Utc>,
    pub start_time: Option<DateTime<Utc>>,
    pub last_activity_time: DateTime<Utc>,
    pub repeated_output_count: u32,
}

/// Pure evaluator turning a [`TimeoutInput`] into a [`TimeoutType`]
///
/// Checks run in order of severity and the first exceeded threshold wins:
/// completion, then activity, then stale.
#[derive(Debug, Clone, Copy, Default)]
pub struct TimeoutDetector {
    config: TimeoutConfig,
}

impl TimeoutDetector {
    pub fn new(config: TimeoutConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TimeoutConfig {
        &self.config
    }

    pub fn check_timeout(&self, input: &TimeoutInput) -> TimeoutType {
        if !self.config.completion_timeout.is_zero() {
            if let Some(start) = input.start_time {
                if exceeds(input.now, start, self.config.completion_timeout) {
                    return TimeoutType::Completion;
                }
            }
        }

        if !self.config.activity_timeout.is_zero()
            && exceeds(input.now, input.last_activity_time, self.config.activity_timeout)
        {
            return TimeoutType::Activity;
        }

        // Strictly greater: reaching the threshold exactly is still fine
        if self.config.stale_threshold > 0
            && input.repeated_output_count > self.config.stale_threshold
        {
            return TimeoutType::Stale;
        }

        TimeoutType::None
    }
}

/// `now - since > limit`; a `since` in the future never exceeds
fn exceeds(now: DateTime<Utc>, since: DateTime<Utc>, limit: Duration) -> bool {
    now.signed_duration_since(since)
        .to_std()
        .map(|elapsed| elapsed > limit)
        .unwrap_or(false)
}
