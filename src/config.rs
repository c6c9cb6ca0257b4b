// src/config.rs
//
// Request-independent settings. Built once by the binary and passed
// explicitly to the dispatcher.

use crate::error::{MockupError, Result};
use crate::ops::JpegOutput;
use std::time::Duration;

/// Environment variable holding the processing budget in whole seconds.
pub const TIMEOUT_ENV: &str = "PSD_PROCESS_TIMEOUT";

const DEFAULT_TIMEOUT_SECS: u64 = 25;
const DEFAULT_FALLBACK_PERCENT: u32 = 70;

#[derive(Clone, Debug)]
pub struct ComposeConfig {
    /// Wall-clock budget for one request
    pub timeout: Duration,
    pub jpeg: JpegOutput,
    /// Share of the canvas covered by the centered fallback region
    pub fallback_ratio_percent: u32,
    /// Lowercase extension that routes a mockup to the layered path
    pub layered_extension: &'static str,
    pub default_filename: &'static str,
}

impl Default for ComposeConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            jpeg: JpegOutput::default(),
            fallback_ratio_percent: DEFAULT_FALLBACK_PERCENT,
            layered_extension: ".psd",
            default_filename: "mockup.psd",
        }
    }
}

impl ComposeConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup; unset keys keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(raw) = lookup(TIMEOUT_ENV) {
            config.timeout = Duration::from_secs(parse_timeout_secs(&raw)?);
        }
        Ok(config)
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Whether `filename` names a layered document (case-insensitive).
    pub fn is_layered_filename(&self, filename: &str) -> bool {
        filename.to_lowercase().ends_with(self.layered_extension)
    }
}

fn parse_timeout_secs(raw: &str) -> Result<u64> {
    let secs = raw.trim().parse::<u64>().map_err(|e| {
        MockupError::invalid_config(TIMEOUT_ENV, raw.to_string(), format!("expected whole seconds: {e}"))
    })?;
    if secs == 0 {
        return Err(MockupError::invalid_config(
            TIMEOUT_ENV,
            raw.to_string(),
            "timeout must be at least one second",
        ));
    }
    Ok(secs)
}
