use clap::{Parser, Subcommand};
use std::path::PathBuf;

use agentwatch_core::Settings;

/// Command line arguments
#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Classify what AI coding agents running in terminal panes are doing"
)]
pub struct Config {
    /// Enable debug mode
    #[arg(short, long, global = true)]
    pub debug: bool,

    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Subcommand
    #[command(subcommand)]
    pub command: Command,
}

/// Subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Classify captured pane output read from a file or stdin
    Detect {
        /// File with captured output (stdin when omitted or "-")
        file: Option<PathBuf>,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },
    /// Replay a capture log (frames separated by form feed) through the monitor
    Replay {
        /// Capture log to replay
        file: PathBuf,

        /// Delay between frames in milliseconds (defaults to capture_interval_ms)
        #[arg(short = 'i', long)]
        interval_ms: Option<u64>,

        /// Feed the last frame this many extra times
        #[arg(long, default_value_t = 0)]
        repeat: usize,

        /// Instance ID reported in events
        #[arg(long, default_value = "replay")]
        id: String,

        /// Override the stale threshold
        #[arg(long)]
        stale_threshold: Option<u32>,

        /// Override the activity timeout (seconds)
        #[arg(long)]
        activity_timeout: Option<u64>,

        /// Override the completion timeout (seconds)
        #[arg(long)]
        completion_timeout: Option<u64>,

        /// Print events and the final snapshot as JSON lines
        #[arg(long)]
        json: bool,
    },
}

impl Config {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Apply command line overrides on top of file settings
    pub fn merge_into(&self, settings: &mut Settings) {
        if let Command::Replay {
            stale_threshold,
            activity_timeout,
            completion_timeout,
            ..
        } = &self.command
        {
            if let Some(threshold) = stale_threshold {
                settings.timeouts.stale_threshold = *threshold;
            }
            if let Some(secs) = activity_timeout {
                settings.timeouts.activity_timeout_secs = *secs;
            }
            if let Some(secs) = completion_timeout {
                settings.timeouts.completion_timeout_secs = *secs;
            }
        }
    }
}
