//! Core library for agentwatch.
//!
//! Infers what an AI coding agent running inside a terminal pane is doing
//! from the raw captured pane text alone:
//!
//! - [`buffer::RingBuffer`] keeps the most recent bytes of a stream.
//! - [`detectors::StateDetector`] classifies text into a [`WaitingState`].
//! - [`detectors::TimeoutDetector`] decides whether an instance overstayed.
//! - [`monitor::Monitor`] tracks many instances and reports changes.

pub mod agents;
pub mod buffer;
pub mod config;
pub mod detectors;
pub mod monitor;

pub use agents::{TimeoutType, WaitingState};
pub use buffer::RingBuffer;
pub use config::Settings;
pub use detectors::{
    DetectionResult, DetectionRule, PatternTable, StateDetector, TimeoutConfig, TimeoutDetector,
    TimeoutInput,
};
pub use monitor::{InstanceSnapshot, Monitor, MonitorEvent};
