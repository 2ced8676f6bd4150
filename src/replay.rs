//! Replay a recorded capture log through the monitor.
//!
//! A capture log is a sequence of pane captures separated by form feed
//! (`\x0c`), as a capture loop would observe them one tick at a time. Each
//! frame goes through a [`RingBuffer`], gets fingerprinted and is handed to
//! the [`Monitor`] exactly like live captures would be.

use anyhow::{Context, Result};
use std::hash::{DefaultHasher, Hash, Hasher};
use std::path::Path;
use std::time::Duration;
use tokio::sync::broadcast::{self, error::TryRecvError};
use tracing::{info, warn};

use agentwatch_core::detectors::strip_ansi;
use agentwatch_core::{InstanceSnapshot, Monitor, MonitorEvent, RingBuffer, Settings};

/// Frame separator in capture logs
pub const FRAME_SEPARATOR: u8 = 0x0c;

/// Replay parameters
#[derive(Debug, Clone)]
pub struct ReplayOptions {
    /// Instance ID used for the replayed pane
    pub instance_id: String,
    /// Delay between frames
    pub interval: Duration,
    /// Extra repetitions of the last frame
    pub repeat: usize,
}

impl ReplayOptions {
    /// Options paced at the configured capture interval
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            interval: settings.capture_interval(),
            ..Self::default()
        }
    }
}

impl Default for ReplayOptions {
    fn default() -> Self {
        Self {
            instance_id: "replay".to_string(),
            interval: Duration::ZERO,
            repeat: 0,
        }
    }
}

/// Outcome of a replay
#[derive(Debug, Clone)]
pub struct ReplaySummary {
    /// Number of ticks fed to the monitor
    pub ticks: usize,
    /// Events in publication order
    pub events: Vec<MonitorEvent>,
    /// Instance state after the last tick
    pub last: Option<InstanceSnapshot>,
}

/// Split a capture log into frames, dropping empty ones
pub fn split_frames(data: &[u8]) -> Vec<&[u8]> {
    data.split(|b| *b == FRAME_SEPARATOR)
        .filter(|frame| !frame.is_empty())
        .collect()
}

/// Equality-only fingerprint of captured content
pub fn fingerprint(content: &[u8]) -> String {
    let mut hasher = DefaultHasher::new();
    content.hash(&mut hasher);
    format!("{:016x}", hasher.finish())
}

/// Whether a raw BEL is present outside of escape sequences
pub fn has_bell(content: &[u8]) -> bool {
    strip_ansi(&String::from_utf8_lossy(content)).contains('\x07')
}

/// Replay a capture log file
pub async fn replay_file(
    path: &Path,
    settings: &Settings,
    options: &ReplayOptions,
) -> Result<ReplaySummary> {
    let data = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read capture log: {:?}", path))?;
    Ok(replay(&data, settings, options).await)
}

/// Replay capture log contents
pub async fn replay(data: &[u8], settings: &Settings, options: &ReplayOptions) -> ReplaySummary {
    let frames = split_frames(data);
    let monitor = Monitor::from_settings(settings);
    let buffer = RingBuffer::new(settings.buffer_capacity);

    let mut rx = monitor.subscribe();
    let mut events = Vec::new();

    let id = options.instance_id.as_str();
    monitor.start(id);

    let ticks = frames
        .iter()
        .copied()
        .chain(frames.last().copied().into_iter().cycle().take(options.repeat));

    let mut count = 0;
    for frame in ticks {
        buffer.replace_with(frame);
        let content = buffer.bytes();

        monitor.process_output(id, &content, &fingerprint(&content));
        monitor.check_bell(id, has_bell(&content));
        monitor.check_timeouts(id);
        count += 1;

        // A tick publishes at most a few events, far below the channel capacity
        drain_events(&mut rx, &mut events);

        if !options.interval.is_zero() {
            tokio::time::sleep(options.interval).await;
        }
    }

    ReplaySummary {
        ticks: count,
        events,
        last: monitor.snapshot(id),
    }
}

/// Move everything currently queued on the receiver into `events`
fn drain_events(rx: &mut broadcast::Receiver<MonitorEvent>, events: &mut Vec<MonitorEvent>) {
    loop {
        match rx.try_recv() {
            Ok(event) => {
                info!(id = event.id(), "{:?}", event);
                events.push(event);
            }
            Err(TryRecvError::Lagged(missed)) => warn!("replay: dropped {missed} events"),
            Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => break,
        }
    }
}
