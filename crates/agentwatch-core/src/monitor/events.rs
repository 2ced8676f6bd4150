//! Change notification for the monitor.
//!
//! Two delivery paths, both driven only after the monitor lock is released:
//! - **Callbacks**: one subscriber per kind, replaced by each registration.
//! - **Event bus**: a `broadcast` channel any number of consumers can
//!   [`subscribe`](super::Monitor::subscribe) to.

use std::sync::Arc;

use serde::Serialize;

use crate::agents::{TimeoutType, WaitingState};

/// Default broadcast channel capacity
pub(crate) const EVENT_CHANNEL_CAPACITY: usize = 256;

pub type StateChangeCallback = Arc<dyn Fn(&str, WaitingState, WaitingState) + Send + Sync>;
pub type TimeoutCallback = Arc<dyn Fn(&str, TimeoutType) + Send + Sync>;
pub type BellCallback = Arc<dyn Fn(&str) + Send + Sync>;

/// Events published by the monitor
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum MonitorEvent {
    /// An instance moved to a different state
    StateChanged {
        id: String,
        old: WaitingState,
        new: WaitingState,
    },

    /// An instance hit a timeout and is now frozen
    TimedOut { id: String, timeout: TimeoutType },

    /// The instance's bell flag went from clear to set
    Bell { id: String },
}

impl MonitorEvent {
    /// Instance the event is about
    pub fn id(&self) -> &str {
        match self {
            MonitorEvent::StateChanged { id, .. }
            | MonitorEvent::TimedOut { id, .. }
            | MonitorEvent::Bell { id } => id,
        }
    }
}

/// Registered single-subscriber callbacks
#[derive(Default)]
pub(crate) struct Callbacks {
    pub state_change: Option<StateChangeCallback>,
    pub timeout: Option<TimeoutCallback>,
    pub bell: Option<BellCallback>,
}
