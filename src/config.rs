//! Player configuration
//!
//! All thresholds and loop cadences are plain data with defaults, so a
//! deployment can tune them from a JSON file without touching code.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Thresholds used by the audio-master sync policy (signed milliseconds)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncThresholds {
    /// Video ahead of audio by more than this sleeps before drawing
    pub small_threshold_ms: i64,
    /// Upper bound on a single sync sleep
    pub sleep_cap_ms: i64,
    /// Video behind audio by more than this drops the frame
    pub max_late_ms: i64,
}

impl Default for SyncThresholds {
    fn default() -> Self {
        Self {
            small_threshold_ms: 1,
            sleep_cap_ms: 40,
            max_late_ms: 80,
        }
    }
}

/// Render loop cadences
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoopTimings {
    pub idle_backoff_ms: u64,
    pub buffering_retry_ms: u64,
    pub preview_idle_ms: u64,
    pub progress_interval_ms: u64,
    pub release_join_timeout_ms: u64,
    pub stats_log_interval_ms: u64,
}

impl Default for LoopTimings {
    fn default() -> Self {
        Self {
            idle_backoff_ms: 10,
            buffering_retry_ms: 10,
            preview_idle_ms: 10,
            progress_interval_ms: 200,
            release_join_timeout_ms: 80,
            stats_log_interval_ms: 30_000,
        }
    }
}

impl LoopTimings {
    pub fn idle_backoff(&self) -> Duration {
        Duration::from_millis(self.idle_backoff_ms)
    }

    pub fn buffering_retry(&self) -> Duration {
        Duration::from_millis(self.buffering_retry_ms)
    }

    pub fn preview_idle(&self) -> Duration {
        Duration::from_millis(self.preview_idle_ms)
    }

    pub fn progress_interval(&self) -> Duration {
        Duration::from_millis(self.progress_interval_ms)
    }

    pub fn release_join_timeout(&self) -> Duration {
        Duration::from_millis(self.release_join_timeout_ms)
    }

    pub fn stats_log_interval(&self) -> Duration {
        Duration::from_millis(self.stats_log_interval_ms)
    }
}

/// Top-level player configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    pub sync: SyncThresholds,
    pub timings: LoopTimings,
}

impl PlayerConfig {
    /// Load a configuration from a JSON file; missing fields keep their defaults.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("invalid player config in {}", path.display()))
    }

    /// Configure the sync thresholds
    pub fn with_sync(mut self, sync: SyncThresholds) -> Self {
        self.sync = sync;
        self
    }

    /// Configure the progress notification interval
    pub fn with_progress_interval(mut self, interval: Duration) -> Self {
        self.timings.progress_interval_ms = interval.as_millis() as u64;
        self
    }

    /// Configure the bounded wait used by `release()`
    pub fn with_release_join_timeout(mut self, timeout: Duration) -> Self {
        self.timings.release_join_timeout_ms = timeout.as_millis() as u64;
        self
    }
}

/// Returns a version as specified in Cargo.toml
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

pub fn app_name() -> &'static str {
    env!("CARGO_PKG_NAME")
}
