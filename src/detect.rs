//! One-shot classification of captured pane output.

use anyhow::{Context, Result};
use std::io::Read;
use std::path::Path;

use agentwatch_core::{DetectionResult, Settings, StateDetector};

/// Read captured output from `path`, or stdin when `path` is `None` or `-`
pub fn read_input(path: Option<&Path>) -> Result<Vec<u8>> {
    match path {
        Some(p) if p != Path::new("-") => {
            std::fs::read(p).with_context(|| format!("Failed to read capture file: {:?}", p))
        }
        _ => {
            let mut input = Vec::new();
            std::io::stdin()
                .read_to_end(&mut input)
                .context("Failed to read stdin")?;
            Ok(input)
        }
    }
}

/// Classify output with the patterns from `settings`
pub fn run_detect(input: &[u8], settings: &Settings) -> DetectionResult {
    StateDetector::from_table(&settings.patterns).detect_with_reason(input)
}

/// Human-readable rendering of a detection
pub fn format_result(result: &DetectionResult) -> String {
    match &result.matched_text {
        Some(matched) => format!(
            "{} ({})\n  matched: {}",
            result.state,
            result.rule.as_str(),
            matched
        ),
        None => format!("{} ({})", result.state, result.rule.as_str()),
    }
}
