use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

use crate::detectors::{PatternTable, TimeoutConfig};

/// Engine settings (from config file)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// How often the capture side polls a pane, in milliseconds
    #[serde(default = "default_capture_interval")]
    pub capture_interval_ms: u64,

    /// Bytes of recent output kept per instance
    #[serde(default = "default_buffer_capacity")]
    pub buffer_capacity: usize,

    /// Timeout thresholds
    #[serde(default)]
    pub timeouts: TimeoutSettings,

    /// Detection patterns; categories left out keep the builtin lists
    #[serde(default)]
    pub patterns: PatternTable,
}

fn default_capture_interval() -> u64 {
    100
}

fn default_buffer_capacity() -> usize {
    64 * 1024
}

/// Timeout thresholds as written in the config file; 0 disables a check
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeoutSettings {
    /// Seconds without an output change
    #[serde(default)]
    pub activity_timeout_secs: u64,

    /// Seconds since tracking started
    #[serde(default)]
    pub completion_timeout_secs: u64,

    /// Consecutive unchanged captures tolerated
    #[serde(default = "default_stale_threshold")]
    pub stale_threshold: u32,
}

fn default_stale_threshold() -> u32 {
    3000
}

impl Default for TimeoutSettings {
    fn default() -> Self {
        Self {
            activity_timeout_secs: 0,
            completion_timeout_secs: 0,
            stale_threshold: default_stale_threshold(),
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            capture_interval_ms: default_capture_interval(),
            buffer_capacity: default_buffer_capacity(),
            timeouts: TimeoutSettings::default(),
            patterns: PatternTable::builtin(),
        }
    }
}

impl Settings {
    /// Load settings from `path`, or from the default location
    ///
    /// An explicit path must exist. Without one, the first existing default
    /// location is used, and plain defaults when there is none.
    pub fn load(path: Option<&PathBuf>) -> Result<Self> {
        if let Some(p) = path {
            return Self::load_file(p);
        }

        for path in Self::default_paths().iter().flatten() {
            if path.exists() {
                return Self::load_file(path);
            }
        }

        debug!("no config file found, using defaults");
        Ok(Self::default())
    }

    fn load_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        let settings = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path))?;
        debug!("loaded config from {:?}", path);
        Ok(settings)
    }

    fn default_paths() -> [Option<PathBuf>; 2] {
        [
            dirs::config_dir().map(|p| p.join("agentwatch/config.toml")),
            dirs::home_dir().map(|p| p.join(".agentwatch.toml")),
        ]
    }

    /// Validate and normalize settings values
    pub fn validate(&mut self) {
        if self.capture_interval_ms == 0 {
            warn!(
                "capture_interval_ms must be positive, using {}",
                default_capture_interval()
            );
            self.capture_interval_ms = default_capture_interval();
        }
        if self.buffer_capacity == 0 {
            warn!(
                "buffer_capacity must be positive, using {}",
                default_buffer_capacity()
            );
            self.buffer_capacity = default_buffer_capacity();
        }
    }

    pub fn capture_interval(&self) -> Duration {
        Duration::from_millis(self.capture_interval_ms)
    }

    /// Thresholds for the timeout detector
    pub fn timeout_config(&self) -> TimeoutConfig {
        TimeoutConfig {
            activity_timeout: Duration::from_secs(self.timeouts.activity_timeout_secs),
            completion_timeout: Duration::from_secs(self.timeouts.completion_timeout_secs),
            stale_threshold: self.timeouts.stale_threshold,
        }
    }
}
