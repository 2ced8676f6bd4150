//! Per-instance state tracking.
//!
//! The [`Monitor`] owns one record per tracked instance and is fed by an
//! external capture loop: every tick the loop hands over the captured bytes,
//! a fingerprint of them and the pane's bell flag. The monitor runs the
//! detectors and reports what changed.
//!
//! ## Locking
//!
//! All records sit behind a single `RwLock`. Mutations take the write lock,
//! copy out whatever a notification needs, release the lock and only then
//! invoke callbacks and publish events. Callbacks may therefore call back
//! into the monitor (e.g. [`Monitor::state`]) without deadlocking.
//! Output classification runs with no lock held at all.

mod events;
mod record;

pub use events::{BellCallback, MonitorEvent, StateChangeCallback, TimeoutCallback};
pub use record::InstanceSnapshot;

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use tokio::sync::broadcast;
use tracing::debug;

use crate::agents::{TimeoutType, WaitingState};
use crate::config::Settings;
use crate::detectors::{DetectionResult, StateDetector, TimeoutConfig, TimeoutDetector};
use events::{Callbacks, EVENT_CHANNEL_CAPACITY};
use record::InstanceRecord;

/// Tracks the state of many agent instances
pub struct Monitor {
    detector: StateDetector,
    timeouts: TimeoutDetector,
    instances: RwLock<HashMap<String, InstanceRecord>>,
    callbacks: RwLock<Callbacks>,
    event_tx: broadcast::Sender<MonitorEvent>,
}

impl Monitor {
    /// Create a monitor with the builtin detector and the given thresholds
    pub fn new(config: TimeoutConfig) -> Self {
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            detector: StateDetector::new(),
            timeouts: TimeoutDetector::new(config),
            instances: RwLock::new(HashMap::new()),
            callbacks: RwLock::new(Callbacks::default()),
            event_tx,
        }
    }

    /// Create a monitor from loaded settings
    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(settings.timeout_config())
            .with_detector(StateDetector::from_table(&settings.patterns))
    }

    /// Replace the state detector
    pub fn with_detector(mut self, detector: StateDetector) -> Self {
        self.detector = detector;
        self
    }

    pub fn timeout_config(&self) -> &TimeoutConfig {
        self.timeouts.config()
    }

    // =========================================================
    // Lifecycle
    // =========================================================

    /// Begin tracking an instance; no-op if already tracked
    pub fn start(&self, id: &str) {
        self.start_with_time(id, Utc::now());
    }

    /// Begin tracking with an explicit start time
    ///
    /// The start time also counts as the last activity. No-op if already
    /// tracked.
    pub fn start_with_time(&self, id: &str, started_at: DateTime<Utc>) {
        let mut instances = self.instances.write();
        if instances.contains_key(id) {
            return;
        }
        instances.insert(id.to_string(), InstanceRecord::new(started_at));
        drop(instances);
        debug!(id, "monitor: tracking started");
    }

    /// Stop tracking; returns whether the instance was tracked
    pub fn stop(&self, id: &str) -> bool {
        let removed = self.instances.write().remove(id).is_some();
        if removed {
            debug!(id, "monitor: tracking stopped");
        }
        removed
    }

    // =========================================================
    // Per-tick inputs
    // =========================================================

    /// Classify the latest output of an instance
    ///
    /// Returns `Working` for untracked instances. A timed out instance is
    /// frozen: detection is skipped and its cached state returned.
    pub fn process_output(&self, id: &str, output: &[u8], output_hash: &str) -> WaitingState {
        match self.instances.read().get(id) {
            None => return WaitingState::Working,
            Some(record) if record.timed_out => return record.current_state,
            Some(_) => {}
        }

        // No lock held while matching, other instances keep going
        let result = self.detector.detect_with_reason(output);
        self.apply_detection(id, output_hash, &result)
    }

    /// Record a detection made outside the lock
    ///
    /// The instance may have been stopped or timed out in the meantime; both
    /// are rechecked before anything is touched.
    fn apply_detection(
        &self,
        id: &str,
        output_hash: &str,
        result: &DetectionResult,
    ) -> WaitingState {
        let (old, new) = {
            let mut instances = self.instances.write();
            let Some(record) = instances.get_mut(id) else {
                return WaitingState::Working;
            };
            if record.timed_out {
                return record.current_state;
            }

            record.observe(output_hash, result.is_working_indicator(), Utc::now());

            let old = record.current_state;
            if old == result.state {
                return old;
            }
            record.current_state = result.state;
            (old, result.state)
        };

        self.notify_state_change(id, old, new);
        new
    }

    /// Evaluate timeouts now; see [`Monitor::check_timeouts_at`]
    pub fn check_timeouts(&self, id: &str) -> Option<TimeoutType> {
        self.check_timeouts_at(id, Utc::now())
    }

    /// Evaluate timeouts as of `now`
    ///
    /// Returns the timeout that fired on this call. Untracked and already
    /// timed out instances return `None`, so each timeout is reported once
    /// until [`Monitor::clear_timeout`].
    pub fn check_timeouts_at(&self, id: &str, now: DateTime<Utc>) -> Option<TimeoutType> {
        let timeout = {
            let mut instances = self.instances.write();
            let record = instances.get_mut(id)?;
            if record.timed_out {
                return None;
            }
            let timeout = self.timeouts.check_timeout(&record.timeout_input(now));
            if !timeout.is_triggered() {
                return None;
            }
            record.timed_out = true;
            record.timeout_type = timeout;
            timeout
        };

        self.notify_timeout(id, timeout);
        Some(timeout)
    }

    /// Feed the raw bell flag; returns true on a clear-to-set transition
    pub fn check_bell(&self, id: &str, bell_active: bool) -> bool {
        let rang = {
            let mut instances = self.instances.write();
            let Some(record) = instances.get_mut(id) else {
                return false;
            };
            let rang = bell_active && !record.last_bell_state;
            record.last_bell_state = bell_active;
            rang
        };

        if rang {
            self.notify_bell(id);
        }
        rang
    }

    /// Override the state from outside (e.g. a completion sentinel)
    pub fn set_state(&self, id: &str, state: WaitingState) {
        let old = {
            let mut instances = self.instances.write();
            let Some(record) = instances.get_mut(id) else {
                return;
            };
            let old = record.current_state;
            if old == state {
                return;
            }
            record.current_state = state;
            old
        };

        self.notify_state_change(id, old, state);
    }

    /// Unfreeze a timed out instance and restart its activity clock
    pub fn clear_timeout(&self, id: &str) {
        if let Some(record) = self.instances.write().get_mut(id) {
            record.clear_timeout(Utc::now());
        }
    }

    // =========================================================
    // Queries (safe to call from callbacks)
    // =========================================================

    pub fn state(&self, id: &str) -> Option<WaitingState> {
        self.instances.read().get(id).map(|r| r.current_state)
    }

    /// Whether the instance is frozen by a timeout; false if untracked
    pub fn is_timed_out(&self, id: &str) -> bool {
        self.instances
            .read()
            .get(id)
            .map(|r| r.timed_out)
            .unwrap_or(false)
    }

    pub fn timeout_type(&self, id: &str) -> Option<TimeoutType> {
        self.instances.read().get(id).map(|r| r.timeout_type)
    }

    pub fn last_activity_time(&self, id: &str) -> Option<DateTime<Utc>> {
        self.instances.read().get(id).map(|r| r.last_activity_time)
    }

    pub fn start_time(&self, id: &str) -> Option<DateTime<Utc>> {
        self.instances.read().get(id).and_then(|r| r.start_time)
    }

    pub fn repeated_output_count(&self, id: &str) -> Option<u32> {
        self.instances
            .read()
            .get(id)
            .map(|r| r.repeated_output_count)
    }

    pub fn is_monitoring(&self, id: &str) -> bool {
        self.instances.read().contains_key(id)
    }

    /// IDs of all tracked instances, sorted
    pub fn monitored_instances(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.instances.read().keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn snapshot(&self, id: &str) -> Option<InstanceSnapshot> {
        self.instances.read().get(id).map(|r| r.snapshot(id))
    }

    // =========================================================
    // Notification
    // =========================================================

    /// Register the state change callback, replacing any previous one
    pub fn on_state_change<F>(&self, callback: F)
    where
        F: Fn(&str, WaitingState, WaitingState) + Send + Sync + 'static,
    {
        self.callbacks.write().state_change = Some(Arc::new(callback));
    }

    /// Register the timeout callback, replacing any previous one
    pub fn on_timeout<F>(&self, callback: F)
    where
        F: Fn(&str, TimeoutType) + Send + Sync + 'static,
    {
        self.callbacks.write().timeout = Some(Arc::new(callback));
    }

    /// Register the bell callback, replacing any previous one
    pub fn on_bell<F>(&self, callback: F)
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.callbacks.write().bell = Some(Arc::new(callback));
    }

    /// Subscribe to monitor events.
    ///
    /// If the receiver falls behind, older events are dropped (lagged).
    pub fn subscribe(&self) -> broadcast::Receiver<MonitorEvent> {
        self.event_tx.subscribe()
    }

    fn notify_state_change(&self, id: &str, old: WaitingState, new: WaitingState) {
        debug!(id, %old, %new, "monitor: state changed");
        let callback = self.callbacks.read().state_change.clone();
        if let Some(callback) = callback {
            callback(id, old, new);
        }
        self.publish(MonitorEvent::StateChanged {
            id: id.to_string(),
            old,
            new,
        });
    }

    fn notify_timeout(&self, id: &str, timeout: TimeoutType) {
        debug!(id, %timeout, "monitor: timed out");
        let callback = self.callbacks.read().timeout.clone();
        if let Some(callback) = callback {
            callback(id, timeout);
        }
        self.publish(MonitorEvent::TimedOut {
            id: id.to_string(),
            timeout,
        });
    }

    fn notify_bell(&self, id: &str) {
        debug!(id, "monitor: bell");
        let callback = self.callbacks.read().bell.clone();
        if let Some(callback) = callback {
            callback(id);
        }
        self.publish(MonitorEvent::Bell { id: id.to_string() });
    }

    fn publish(&self, event: MonitorEvent) {
        // Err only means nobody is subscribed
        let _ = self.event_tx.send(event);
    }
}

impl Default for Monitor {
    fn default() -> Self {
        Self::new(TimeoutConfig::default())
    }
}
