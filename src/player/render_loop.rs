//! Render loop
//!
//! One dedicated thread per player. Each iteration re-reads the shared flags
//! instead of caching them, so caller operations take effect on the next
//! pass without any lock.
//!
//! ```text
//! Previewing → seek video only → decode one frame → draw
//! Playing    → audio clock → next frame → SyncPolicy → drop | sleep+draw | draw → progress
//! otherwise  → idle backoff
//! ```

use log::{debug, error, info, trace, warn};
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Instant;

use super::error::{ERROR_DECODE, PlayerError};
use super::events::EventDispatcher;
use super::shared::Shared;
use super::state::PlaybackState;
use super::sync::{SyncDecision, SyncPolicy};
use crate::config::LoopTimings;
use crate::engine::{AudioEngine, DecodeType, FrameStatus, Renderer, VideoEngine};
use crate::utils::sos::SignalOfStop;

/// Why one run of the loop ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LoopExit {
    /// `release()` cancelled the running flag
    Stopped,
    /// Video engine reached end of stream
    Eof,
    /// Video engine failed
    DecodeError,
    /// Prepared video size cannot be rendered
    InvalidSize,
}

/// Marks the thread as exited even if the loop unwinds.
struct ExitGuard(SignalOfStop);

impl Drop for ExitGuard {
    fn drop(&mut self) {
        self.0.cancel();
    }
}

pub(crate) struct RenderLoop {
    audio: Arc<dyn AudioEngine>,
    video: Arc<dyn VideoEngine>,
    renderer: Arc<dyn Renderer>,
    shared: Arc<Shared>,
    events: EventDispatcher,
    timings: LoopTimings,
    policy: SyncPolicy,
    decode_type: DecodeType,

    /// Frame buffer lent to the engines one call at a time
    frame: Option<Vec<u8>>,
    size: Option<(u32, u32)>,

    seen_epoch: u64,
    last_progress: Option<Instant>,
    last_stats_log: Instant,
}

impl RenderLoop {
    pub(crate) fn new(
        audio: Arc<dyn AudioEngine>,
        video: Arc<dyn VideoEngine>,
        renderer: Arc<dyn Renderer>,
        shared: Arc<Shared>,
        events: EventDispatcher,
        policy: SyncPolicy,
        timings: LoopTimings,
    ) -> Self {
        let decode_type = video.decode_type();
        let seen_epoch = shared.segment_epoch();
        Self {
            audio,
            video,
            renderer,
            shared,
            events,
            timings,
            policy,
            decode_type,
            frame: None,
            size: None,
            seen_epoch,
            last_progress: None,
            last_stats_log: Instant::now(),
        }
    }

    /// Thread body. `exited` is cancelled when the thread is done.
    pub(crate) fn run(mut self, exited: SignalOfStop) {
        let _guard = ExitGuard(exited);
        info!("RenderLoop: started ({:?} decode)", self.decode_type);

        loop {
            let exit = self.drive();
            debug!("RenderLoop: leaving ({:?})", exit);
            self.shared.loop_active.store(false, Ordering::SeqCst);

            if !matches!(exit, LoopExit::Eof | LoopExit::DecodeError) {
                break;
            }
            // A play()/begin_seek_preview() that raced our exit saw the loop as still
            // active and did not spawn a replacement; pick its work up here.
            if self.shared.stop.cancelled() || !self.shared.state.load().needs_render_loop() {
                break;
            }
            if self
                .shared
                .loop_active
                .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
                .is_err()
            {
                break;
            }
            debug!("RenderLoop: playback restarted while exiting, continuing");
        }

        info!("RenderLoop: finished ({})", self.shared.stats.summary());
    }

    fn drive(&mut self) -> LoopExit {
        while !self.shared.stop.cancelled() {
            if !self.refresh_frame_buffer() {
                return self.on_invalid_size();
            }

            match self.shared.state.load() {
                PlaybackState::Previewing => self.preview_step(),
                PlaybackState::Playing => {
                    if let Some(exit) = self.playback_step() {
                        return exit;
                    }
                }
                _ => {
                    self.shared.stop.sleep(self.timings.idle_backoff());
                }
            }

            self.maybe_log_stats();
        }
        LoopExit::Stopped
    }

    /// Keep the frame buffer matched to the prepared size; `false` if the size is unusable.
    fn refresh_frame_buffer(&mut self) -> bool {
        let size = self.shared.video_size();
        if self.size == Some(size) {
            return true;
        }
        let (w, h) = size;
        if w == 0 || h == 0 {
            error!("RenderLoop: invalid video size {}x{}", w, h);
            return false;
        }

        self.size = Some(size);
        self.frame = match self.decode_type {
            DecodeType::Software => Some(vec![0u8; self.decode_type.frame_bytes(w, h)]),
            DecodeType::Hardware => None,
        };
        debug!("RenderLoop: frame buffer sized for {}x{}", w, h);
        true
    }

    /// One normal-playback iteration; `Some` ends the loop.
    fn playback_step(&mut self) -> Option<LoopExit> {
        let epoch_before = self.shared.segment_epoch();
        if self.shared.seeking() {
            self.shared.stop.sleep(self.timings.buffering_retry());
            return None;
        }
        let clock = Some(self.audio.audio_clock_ms()).filter(|c| *c > 0);

        let mut pts = 0i64;
        let status = self
            .video
            .read_frame_into(self.frame.as_deref_mut(), &mut pts);

        if status == FrameStatus::Buffering {
            self.shared.stats.record_buffering();
            self.shared.stop.sleep(self.timings.buffering_retry());
            return None;
        }

        // Anything read across a seek belongs to the old segment
        let epoch = self.shared.segment_epoch();
        if epoch != epoch_before || self.shared.seeking() {
            debug!("RenderLoop: {:?} pts={} straddles a seek, discarding", status, pts);
            return None;
        }

        match status {
            FrameStatus::Eof => return Some(self.on_eof()),
            FrameStatus::Error => return Some(self.on_decode_error()),
            FrameStatus::Ok | FrameStatus::Buffering => {}
        }
        if epoch != self.seen_epoch {
            self.policy.reset();
            self.seen_epoch = epoch;
            self.last_progress = None;
        }

        let decision = self.policy.decide(pts, clock);
        trace!(
            "AV_SYNC video_pts={} audio={:?} decision={}",
            pts, clock, decision
        );

        match decision {
            SyncDecision::DropFrame => {}
            SyncDecision::SleepThenDraw { .. } => {
                // Cancelled mid-sleep: the frame is never shown
                if let Some(delay) = decision.sleep()
                    && !self.shared.stop.sleep(delay)
                {
                    return Some(LoopExit::Stopped);
                }
                self.draw();
            }
            SyncDecision::DrawNow => self.draw(),
        }
        self.shared.stats.record_decision(&decision);

        self.maybe_dispatch_progress(clock);
        None
    }

    /// Scrubbing: video-only seek and a single frame; the audio clock and sync policy are untouched.
    fn preview_step(&mut self) {
        if !self.shared.preview_requested.swap(false, Ordering::SeqCst) {
            self.shared.stop.sleep(self.timings.preview_idle());
            return;
        }

        let epoch = self.shared.segment_epoch();
        let target = self.shared.preview_target_ms.load(Ordering::SeqCst);
        debug!("RenderLoop: preview seek to {} ms", target);
        self.video.seek_to(target);

        let mut pts = 0i64;
        let status = self
            .video
            .read_frame_into(self.frame.as_deref_mut(), &mut pts);

        // A real seek landed while scrubbing; it must win over the preview seek
        if self.shared.segment_epoch() != epoch {
            let position = self.shared.position_ms();
            debug!("RenderLoop: preview overtaken by seek to {} ms", position);
            self.video.seek_to(position);
            return;
        }

        match status {
            FrameStatus::Ok => {
                debug!("RenderLoop: preview frame pts={}", pts);
                self.draw();
                self.shared.stats.record_preview_frame();
            }
            // Keep the last drawn preview frame on screen
            FrameStatus::Buffering => debug!("RenderLoop: preview buffering at {} ms", target),
            FrameStatus::Eof => debug!("RenderLoop: preview hit end of stream at {} ms", target),
            FrameStatus::Error => warn!("RenderLoop: preview decode error at {} ms", target),
        }
    }

    fn draw(&self) {
        let (w, h) = self.size.unwrap_or_default();
        self.renderer.render_frame(self.frame.as_deref(), w, h);
    }

    fn on_eof(&mut self) -> LoopExit {
        info!("RenderLoop: end of stream reached");
        self.shared.reached_eof.store(true, Ordering::SeqCst);
        self.shared
            .state
            .compare_exchange(PlaybackState::Playing, PlaybackState::Eof);
        if !self.shared.completion_sent.swap(true, Ordering::SeqCst) {
            self.events.completion();
        }
        LoopExit::Eof
    }

    fn on_decode_error(&mut self) -> LoopExit {
        error!("RenderLoop: video engine reported a decode error");
        self.shared.stats.record_decode_error();
        self.stop_playback();
        if !self.shared.error_sent.swap(true, Ordering::SeqCst) {
            let (code, extra) = PlayerError::Decode.code();
            self.events.error(code, extra);
        }
        LoopExit::DecodeError
    }

    fn on_invalid_size(&mut self) -> LoopExit {
        self.stop_playback();
        if !self.shared.error_sent.swap(true, Ordering::SeqCst) {
            self.events.error(ERROR_DECODE, 0);
        }
        LoopExit::InvalidSize
    }

    /// Land in `Paused`, leaving the last rendered frame on screen.
    fn stop_playback(&self) {
        if self
            .shared
            .state
            .compare_exchange(PlaybackState::Playing, PlaybackState::Paused)
        {
            self.audio.pause();
        }
    }

    fn maybe_dispatch_progress(&mut self, clock: Option<i64>) {
        let now = Instant::now();
        if let Some(last) = self.last_progress
            && now.duration_since(last) < self.timings.progress_interval()
        {
            return;
        }
        // The seek already reported its own position
        if self.shared.segment_epoch() != self.seen_epoch {
            return;
        }
        self.last_progress = Some(now);
        let position = self.shared.advance_position(clock);
        self.events.progress(position);
    }

    fn maybe_log_stats(&mut self) {
        if self.last_stats_log.elapsed() >= self.timings.stats_log_interval() {
            info!("RenderLoop: {}", self.shared.stats.summary());
            self.last_stats_log = Instant::now();
        }
    }
}
