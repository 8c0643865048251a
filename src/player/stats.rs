//! Render loop statistics

use std::sync::atomic::{AtomicU64, Ordering};

use super::sync::SyncDecision;

/// Counters updated by the render loop and readable from any thread.
///
/// All fields use relaxed atomics; they are monotonic tallies, not
/// synchronization points.
#[derive(Debug, Default)]
pub struct PlaybackStats {
    /// Frames presented during normal playback
    pub frames_rendered: AtomicU64,

    /// Frames discarded because video fell too far behind audio
    pub frames_dropped: AtomicU64,

    /// Frames presented after a sync sleep
    pub frames_delayed: AtomicU64,

    /// Total time spent in sync sleeps (milliseconds)
    pub sleep_ms_total: AtomicU64,

    /// Times the video engine reported buffering
    pub buffering_retries: AtomicU64,

    /// Frames presented while scrubbing
    pub preview_frames: AtomicU64,

    /// Decode errors reported by the video engine
    pub decode_errors: AtomicU64,
}

impl PlaybackStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the outcome of one sync decision
    pub fn record_decision(&self, decision: &SyncDecision) {
        match decision {
            SyncDecision::DrawNow => {
                self.frames_rendered.fetch_add(1, Ordering::Relaxed);
            }
            SyncDecision::SleepThenDraw { sleep_ms } => {
                self.frames_rendered.fetch_add(1, Ordering::Relaxed);
                self.frames_delayed.fetch_add(1, Ordering::Relaxed);
                self.sleep_ms_total
                    .fetch_add((*sleep_ms).max(0) as u64, Ordering::Relaxed);
            }
            SyncDecision::DropFrame => {
                self.frames_dropped.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    pub fn record_buffering(&self) {
        self.buffering_retries.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_preview_frame(&self) {
        self.preview_frames.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_decode_error(&self) {
        self.decode_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Percentage of decided frames that were dropped
    pub fn frame_drop_rate(&self) -> f64 {
        let dropped = self.frames_dropped.load(Ordering::Relaxed);
        let total = dropped + self.frames_rendered.load(Ordering::Relaxed);
        if total == 0 {
            return 0.0;
        }
        (dropped as f64 / total as f64) * 100.0
    }

    /// Get a snapshot of all counters
    pub fn summary(&self) -> StatsSummary {
        StatsSummary {
            frames_rendered: self.frames_rendered.load(Ordering::Relaxed),
            frames_dropped: self.frames_dropped.load(Ordering::Relaxed),
            frames_delayed: self.frames_delayed.load(Ordering::Relaxed),
            sleep_ms_total: self.sleep_ms_total.load(Ordering::Relaxed),
            buffering_retries: self.buffering_retries.load(Ordering::Relaxed),
            preview_frames: self.preview_frames.load(Ordering::Relaxed),
            decode_errors: self.decode_errors.load(Ordering::Relaxed),
            frame_drop_rate: self.frame_drop_rate(),
        }
    }
}

/// Snapshot of playback statistics
#[derive(Debug, Clone, PartialEq)]
pub struct StatsSummary {
    pub frames_rendered: u64,
    pub frames_dropped: u64,
    pub frames_delayed: u64,
    pub sleep_ms_total: u64,
    pub buffering_retries: u64,
    pub preview_frames: u64,
    pub decode_errors: u64,
    pub frame_drop_rate: f64,
}

impl std::fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} rendered ({} delayed, {}ms slept), {} dropped ({:.2}%), {} buffering retries, {} preview frames, {} decode errors",
            self.frames_rendered,
            self.frames_delayed,
            self.sleep_ms_total,
            self.frames_dropped,
            self.frame_drop_rate,
            self.buffering_retries,
            self.preview_frames,
            self.decode_errors
        )
    }
}
