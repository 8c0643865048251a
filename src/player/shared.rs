//! Flags shared between the caller thread and the render loop

use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU32, AtomicU64, Ordering};

use super::state::{AtomicPlaybackState, PlaybackState};
use super::stats::PlaybackStats;
use crate::utils::sos::SignalOfStop;

#[derive(Debug)]
pub(crate) struct Shared {
    pub(crate) state: AtomicPlaybackState,

    /// Running flag; cancelled once by `release()`
    pub(crate) stop: SignalOfStop,

    /// A render loop thread currently owns the playback work
    pub(crate) loop_active: AtomicBool,

    pub(crate) stats: PlaybackStats,

    /// Bumped on every prepare/seek; the render loop resets its anchors when it changes
    segment_epoch: AtomicU64,
    /// Engines are being repositioned; frames read now belong to no segment
    seeking: AtomicBool,

    pub(crate) preview_requested: AtomicBool,
    pub(crate) preview_target_ms: AtomicI64,
    pub(crate) playing_before_preview: AtomicBool,

    /// End of stream reached in the current segment
    pub(crate) reached_eof: AtomicBool,

    // Per-segment notification latches
    pub(crate) completion_sent: AtomicBool,
    pub(crate) error_sent: AtomicBool,

    position_ms: AtomicI64,
    duration_ms: AtomicI64,
    video_width: AtomicU32,
    video_height: AtomicU32,
}

impl Shared {
    pub(crate) fn new() -> Self {
        Self {
            state: AtomicPlaybackState::new(PlaybackState::Idle),
            stop: SignalOfStop::new(),
            loop_active: AtomicBool::new(false),
            stats: PlaybackStats::new(),
            segment_epoch: AtomicU64::new(0),
            seeking: AtomicBool::new(false),
            preview_requested: AtomicBool::new(false),
            preview_target_ms: AtomicI64::new(0),
            playing_before_preview: AtomicBool::new(false),
            reached_eof: AtomicBool::new(false),
            completion_sent: AtomicBool::new(false),
            error_sent: AtomicBool::new(false),
            position_ms: AtomicI64::new(0),
            duration_ms: AtomicI64::new(0),
            video_width: AtomicU32::new(0),
            video_height: AtomicU32::new(0),
        }
    }

    pub(crate) fn segment_epoch(&self) -> u64 {
        self.segment_epoch.load(Ordering::SeqCst)
    }

    pub(crate) fn seeking(&self) -> bool {
        self.seeking.load(Ordering::SeqCst)
    }

    /// Close the current segment before the engines are repositioned.
    ///
    /// Until [`Shared::start_segment`] opens the next one, the render loop
    /// discards whatever it reads.
    pub(crate) fn begin_seek(&self) {
        self.seeking.store(true, Ordering::SeqCst);
        self.segment_epoch.fetch_add(1, Ordering::SeqCst);
    }

    /// Start a new playback segment at `position_ms`.
    ///
    /// Clears the end-of-stream flag and the notification latches; the
    /// render loop picks up the new epoch before its next sync decision.
    pub(crate) fn start_segment(&self, position_ms: i64) -> u64 {
        self.reached_eof.store(false, Ordering::SeqCst);
        self.completion_sent.store(false, Ordering::SeqCst);
        self.error_sent.store(false, Ordering::SeqCst);
        self.position_ms.store(position_ms, Ordering::SeqCst);
        let epoch = self.segment_epoch.fetch_add(1, Ordering::SeqCst) + 1;
        self.seeking.store(false, Ordering::SeqCst);
        epoch
    }

    pub(crate) fn position_ms(&self) -> i64 {
        self.position_ms.load(Ordering::SeqCst)
    }

    /// Move the cached position forward to `clock`; never moves it back.
    pub(crate) fn advance_position(&self, clock: Option<i64>) -> i64 {
        match clock {
            Some(clock) => self.position_ms.fetch_max(clock, Ordering::SeqCst).max(clock),
            None => self.position_ms(),
        }
    }

    pub(crate) fn duration_ms(&self) -> i64 {
        self.duration_ms.load(Ordering::SeqCst)
    }

    pub(crate) fn set_duration_ms(&self, duration_ms: i64) {
        self.duration_ms.store(duration_ms.max(0), Ordering::SeqCst);
    }

    /// Clamp a requested position to `[0, duration]`; unknown duration only clamps below.
    pub(crate) fn clamp_position(&self, position_ms: i64) -> i64 {
        let duration = self.duration_ms();
        if duration > 0 {
            position_ms.clamp(0, duration)
        } else {
            position_ms.max(0)
        }
    }

    pub(crate) fn video_size(&self) -> (u32, u32) {
        (
            self.video_width.load(Ordering::SeqCst),
            self.video_height.load(Ordering::SeqCst),
        )
    }

    pub(crate) fn set_video_size(&self, width: u32, height: u32) {
        self.video_width.store(width, Ordering::SeqCst);
        self.video_height.store(height, Ordering::SeqCst);
    }
}
