use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::agents::{TimeoutType, WaitingState};
use crate::detectors::TimeoutInput;

/// Per-instance tracking state, only touched under the monitor lock
#[derive(Debug, Clone)]
pub(crate) struct InstanceRecord {
    pub start_time: Option<DateTime<Utc>>,
    pub last_activity_time: DateTime<Utc>,
    /// Caller-supplied fingerprint, compared for equality only
    pub last_output_hash: Option<String>,
    pub repeated_output_count: u32,
    pub current_state: WaitingState,
    pub timed_out: bool,
    pub timeout_type: TimeoutType,
    pub last_bell_state: bool,
}

impl InstanceRecord {
    pub fn new(started_at: DateTime<Utc>) -> Self {
        Self {
            start_time: Some(started_at),
            last_activity_time: started_at,
            last_output_hash: None,
            repeated_output_count: 0,
            current_state: WaitingState::Working,
            timed_out: false,
            timeout_type: TimeoutType::None,
            last_bell_state: false,
        }
    }

    /// Record one observation of the output fingerprint
    ///
    /// A changed fingerprint counts as activity. An unchanged one counts
    /// toward staleness unless the agent visibly shows it is working.
    pub fn observe(&mut self, output_hash: &str, working: bool, now: DateTime<Utc>) {
        if self.last_output_hash.as_deref() != Some(output_hash) {
            self.last_output_hash = Some(output_hash.to_string());
            self.last_activity_time = now;
            self.repeated_output_count = 0;
        } else if !working {
            self.repeated_output_count = self.repeated_output_count.saturating_add(1);
        }
    }

    pub fn timeout_input(&self, now: DateTime<Utc>) -> TimeoutInput {
        TimeoutInput {
            now,
            start_time: self.start_time,
            last_activity_time: self.last_activity_time,
            repeated_output_count: self.repeated_output_count,
        }
    }

    pub fn clear_timeout(&mut self, now: DateTime<Utc>) {
        self.timed_out = false;
        self.timeout_type = TimeoutType::None;
        self.repeated_output_count = 0;
        self.last_activity_time = now;
    }

    pub fn snapshot(&self, id: &str) -> InstanceSnapshot {
        InstanceSnapshot {
            id: id.to_string(),
            state: self.current_state,
            start_time: self.start_time,
            last_activity_time: self.last_activity_time,
            repeated_output_count: self.repeated_output_count,
            timed_out: self.timed_out,
            timeout_type: self.timeout_type,
        }
    }
}

/// Owned copy of one tracked instance
///
/// Returned by [`super::Monitor::snapshot`]; holds no lock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstanceSnapshot {
    pub id: String,
    pub state: WaitingState,
    pub start_time: Option<DateTime<Utc>>,
    pub last_activity_time: DateTime<Utc>,
    pub repeated_output_count: u32,
    pub timed_out: bool,
    pub timeout_type: TimeoutType,
}
