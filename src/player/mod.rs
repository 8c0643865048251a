//! Playback orchestrator
//!
//! [`Player`] owns the three injected engines and the render loop thread,
//! and exposes the caller-facing operations. Operations are meant for one
//! caller thread at a time; the render loop only ever observes their effect
//! through the lock-free flags in `Shared`.

mod error;
mod events;
mod render_loop;
mod shared;
mod state;
mod stats;
mod sync;

pub use error::{ERROR_DECODE, ERROR_PREPARE, ERROR_RENDER_THREAD, PlayerError};
pub use events::{EventDispatcher, PlayerEvent, PlayerEvents, PlayerListener};
pub use state::{AtomicPlaybackState, PlaybackState};
pub use stats::{PlaybackStats, StatsSummary};
pub use sync::{SyncDecision, SyncPolicy};

use log::{debug, error, info, warn};
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::thread::{self, JoinHandle};

use crate::config::PlayerConfig;
use crate::engine::{AudioEngine, Renderer, SurfaceHandle, VideoEngine};
use crate::utils::sos::SignalOfStop;
use render_loop::RenderLoop;
use shared::Shared;

/// Render thread handle plus the latch it cancels on exit
struct RenderThread {
    handle: JoinHandle<()>,
    exited: SignalOfStop,
}

pub struct Player {
    audio: Arc<dyn AudioEngine>,
    video: Arc<dyn VideoEngine>,
    renderer: Arc<dyn Renderer>,
    config: PlayerConfig,
    shared: Arc<Shared>,
    events: EventDispatcher,
    receiver: Option<PlayerEvents>,
    render_thread: Option<RenderThread>,
    listener_thread: Option<JoinHandle<()>>,
}

impl Player {
    pub fn new(
        audio: Arc<dyn AudioEngine>,
        video: Arc<dyn VideoEngine>,
        renderer: Arc<dyn Renderer>,
        config: PlayerConfig,
    ) -> Self {
        let (events, receiver) = EventDispatcher::channel();
        Self {
            audio,
            video,
            renderer,
            config,
            shared: Arc::new(Shared::new()),
            events,
            receiver: Some(receiver),
            render_thread: None,
            listener_thread: None,
        }
    }

    /// Take the consumer end of the notification channel.
    ///
    /// There is exactly one consumer; returns `None` once taken or once a
    /// listener has been installed.
    pub fn take_events(&mut self) -> Option<PlayerEvents> {
        self.receiver.take()
    }

    /// Deliver notifications to `listener` on a dedicated callback thread.
    pub fn set_listener(&mut self, listener: Box<dyn PlayerListener>) -> Result<(), PlayerError> {
        let receiver = self.receiver.take().ok_or(PlayerError::EventsTaken)?;
        let handle = receiver
            .spawn_listener(listener)
            .map_err(PlayerError::ListenerThread)?;
        self.listener_thread = Some(handle);
        Ok(())
    }

    /// Prepare both engines for `source`.
    ///
    /// All-or-nothing: on failure nothing is cached, the state is unchanged
    /// and `on_error(-1, 0)` is notified.
    pub fn prepare(&mut self, source: &str) -> Result<(), PlayerError> {
        let state = self.shared.state.load();
        if state == PlaybackState::Released {
            warn!("Player: prepare() after release");
            return Err(PlayerError::Released);
        }
        if !state.can_transition_to(&PlaybackState::Prepared) {
            warn!("Player: prepare() ignored in state {}", state);
            return Err(PlayerError::InvalidState {
                op: "prepare",
                state,
            });
        }

        info!("Player: preparing {}", source);
        let audio_ok = self.audio.prepare(source);
        let video_ok = self.video.prepare(source);
        if !(audio_ok && video_ok) {
            let err = PlayerError::Prepare { audio_ok, video_ok };
            error!("Player: {}", err);
            let (code, extra) = err.code();
            self.events.error(code, extra);
            return Err(err);
        }

        let (width, height) = self.video.video_size();
        self.shared.set_video_size(width, height);
        self.renderer.set_video_size(width, height);

        let duration = self.audio.duration_ms();
        self.shared.set_duration_ms(duration);

        self.shared.preview_requested.store(false, Ordering::SeqCst);
        self.shared.start_segment(0);
        self.shared.state.store(PlaybackState::Prepared);

        info!(
            "Player: prepared {}x{}, duration {} ms",
            width, height, duration
        );
        self.events.prepared(self.shared.duration_ms());
        Ok(())
    }

    /// Prepare a live stream served over TCP
    pub fn prepare_live_tcp(&mut self, host: &str, port: u16) -> Result<(), PlayerError> {
        self.prepare(&format!("tcp://{}:{}", host, port))
    }

    pub fn play(&mut self) {
        self.start_playing();
    }

    /// `play()` body; `true` only if this call started playback with a live render loop.
    fn start_playing(&mut self) -> bool {
        let state = self.shared.state.load();
        if state == PlaybackState::Playing {
            debug!("Player: play() while already playing");
            return false;
        }
        if !state.is_prepared() {
            warn!("Player: play() before prepare (state {})", state);
            return false;
        }
        if !state.can_transition_to(&PlaybackState::Playing) {
            warn!("Player: play() ignored in state {}", state);
            return false;
        }

        self.shared.reached_eof.store(false, Ordering::SeqCst);
        self.shared.preview_requested.store(false, Ordering::SeqCst);
        self.audio.play();
        self.video.start();
        if self.transition("play", &[state], PlaybackState::Playing).is_none() {
            return false;
        }
        debug!("Player: playing from {}", state);
        self.ensure_render_loop()
    }

    pub fn pause(&mut self) {
        if self
            .shared
            .state
            .compare_exchange(PlaybackState::Playing, PlaybackState::Paused)
        {
            self.audio.pause();
            self.video.pause();
            debug!("Player: paused");
        } else {
            debug!("Player: pause() ignored in state {}", self.shared.state.load());
        }
    }

    pub fn resume(&mut self) {
        let state = self.shared.state.load();
        if !matches!(state, PlaybackState::Paused | PlaybackState::Eof) {
            debug!("Player: resume() ignored in state {}", state);
            return;
        }

        self.audio.resume();
        self.video.resume();
        if self.transition("resume", &[state], PlaybackState::Playing).is_some() {
            debug!("Player: resumed from {}", state);
            self.ensure_render_loop();
        }
    }

    /// Seek both engines; starts a new segment and reports the position immediately.
    pub fn seek_to(&mut self, position_ms: i64) {
        let state = self.shared.state.load();
        if !state.is_prepared() {
            warn!("Player: seek_to({}) ignored in state {}", position_ms, state);
            return;
        }

        let target = self.shared.clamp_position(position_ms);
        debug!("Player: seek to {} ms (requested {})", target, position_ms);
        // Frames decoded while the engines move belong to neither segment
        self.shared.begin_seek();
        self.audio.seek_to(target);
        self.video.seek_to(target);
        self.shared.start_segment(target);

        // Also catches a completion the render loop raced in before the new epoch
        self.shared
            .state
            .compare_exchange(PlaybackState::Eof, PlaybackState::Paused);

        self.events.progress(target);
    }

    /// Enter scrubbing: audio paused, video engine kept warm for single-frame decodes.
    pub fn begin_seek_preview(&mut self) {
        let state = self.shared.state.load();
        if state == PlaybackState::Previewing {
            debug!("Player: begin_seek_preview() while already previewing");
            return;
        }

        self.shared.preview_requested.store(false, Ordering::SeqCst);
        let Some(previous) = self.transition(
            "begin_seek_preview",
            &[
                PlaybackState::Prepared,
                PlaybackState::Playing,
                PlaybackState::Paused,
                PlaybackState::Eof,
            ],
            PlaybackState::Previewing,
        ) else {
            return;
        };

        let was_playing = previous == PlaybackState::Playing;
        self.shared
            .playing_before_preview
            .store(was_playing, Ordering::SeqCst);
        if was_playing {
            self.audio.pause();
        }
        debug!("Player: seek preview started from {}", previous);
        self.ensure_render_loop();
    }

    /// Record a scrub target. Never touches the audio engine or decodes on this thread.
    pub fn update_seek_preview(&mut self, position_ms: i64) {
        let state = self.shared.state.load();
        if state != PlaybackState::Previewing {
            debug!("Player: update_seek_preview() ignored in state {}", state);
            return;
        }

        let target = self.shared.clamp_position(position_ms);
        self.shared.preview_target_ms.store(target, Ordering::SeqCst);
        self.shared.preview_requested.store(true, Ordering::SeqCst);
        self.events.progress(target);
    }

    /// Leave scrubbing with a real seek to `position_ms`.
    ///
    /// With `resume`, playback restarts only if it was playing before the
    /// preview began or the segment had already completed; otherwise the
    /// player stays paused.
    pub fn end_seek_preview(&mut self, position_ms: i64, resume: bool) {
        if self
            .transition(
                "end_seek_preview",
                &[PlaybackState::Previewing],
                PlaybackState::Paused,
            )
            .is_none()
        {
            return;
        }
        self.shared.preview_requested.store(false, Ordering::SeqCst);

        let was_eof = self.shared.reached_eof.load(Ordering::SeqCst);
        let was_playing = self
            .shared
            .playing_before_preview
            .swap(false, Ordering::SeqCst);

        self.seek_to(position_ms);
        if was_eof {
            self.shared.reached_eof.store(true, Ordering::SeqCst);
        }

        if resume && was_eof {
            info!("Player: restarting after completion");
            if self.start_playing() {
                self.events.end_resume();
            }
        } else if resume && was_playing {
            self.resume();
        } else {
            self.audio.pause();
            debug!(
                "Player: seek preview ended paused (resume {}, was playing {})",
                resume, was_playing
            );
        }
    }

    /// Stop the render loop and release both engines. Safe to call any number of times.
    ///
    /// The render thread is joined for at most `release_join_timeout_ms`;
    /// a thread still stuck inside an engine call after that is detached.
    pub fn release(&mut self) {
        loop {
            let state = self.shared.state.load();
            if state == PlaybackState::Released {
                debug!("Player: already released");
                return;
            }
            if self
                .shared
                .state
                .compare_exchange(state, PlaybackState::Released)
            {
                break;
            }
        }

        self.shared.stop.cancel();
        if let Some(thread) = self.render_thread.take() {
            let timeout = self.config.timings.release_join_timeout();
            if thread.exited.wait_timeout(timeout) {
                if thread.handle.join().is_err() {
                    error!("Player: render thread panicked");
                }
            } else {
                warn!(
                    "Player: render thread did not exit within {:?}, detaching",
                    timeout
                );
            }
        }

        self.video.release();
        self.audio.release();
        info!("Player: released ({})", self.shared.stats.summary());
    }

    pub fn set_surface(&mut self, surface: Option<SurfaceHandle>) {
        if self.shared.state.load() == PlaybackState::Released {
            warn!("Player: set_surface() after release");
            return;
        }
        debug!("Player: output surface {:?}", surface);
        self.renderer.set_surface(surface);
        self.video.set_output_surface(surface);
    }

    pub fn surface_changed(
        &mut self,
        surface: Option<SurfaceHandle>,
        format: i32,
        width: u32,
        height: u32,
    ) {
        if self.shared.state.load() == PlaybackState::Released {
            warn!("Player: surface_changed() after release");
            return;
        }
        debug!(
            "Player: surface changed {:?} format={} {}x{}",
            surface, format, width, height
        );
        self.renderer.surface_changed(surface, format, width, height);
        self.video.set_output_surface(surface);
    }

    pub fn state(&self) -> PlaybackState {
        self.shared.state.load()
    }

    /// End of stream reached in the current segment
    pub fn is_completed(&self) -> bool {
        self.shared.reached_eof.load(Ordering::SeqCst)
    }

    /// Current position: the audio clock when available, the last known position otherwise
    pub fn current_position_ms(&self) -> i64 {
        match self.shared.state.load() {
            PlaybackState::Idle | PlaybackState::Released => 0,
            PlaybackState::Previewing => self.shared.preview_target_ms.load(Ordering::SeqCst),
            _ => {
                let clock = self.audio.audio_clock_ms();
                if clock > 0 {
                    clock
                } else {
                    self.shared.position_ms()
                }
            }
        }
    }

    pub fn duration_ms(&self) -> i64 {
        self.shared.duration_ms()
    }

    pub fn video_size(&self) -> (u32, u32) {
        self.shared.video_size()
    }

    pub fn stats(&self) -> StatsSummary {
        self.shared.stats.summary()
    }

    pub fn config(&self) -> &PlayerConfig {
        &self.config
    }

    /// Move to `target` from one of `allowed`, returning the state left behind.
    fn transition(
        &self,
        op: &'static str,
        allowed: &[PlaybackState],
        target: PlaybackState,
    ) -> Option<PlaybackState> {
        loop {
            let current = self.shared.state.load();
            if !allowed.contains(&current) || !current.can_transition_to(&target) {
                warn!("Player: {}() ignored in state {}", op, current);
                return None;
            }
            if self.shared.state.compare_exchange(current, target) {
                return Some(current);
            }
        }
    }

    /// Start the render loop unless one is already running; `false` if none will run.
    fn ensure_render_loop(&mut self) -> bool {
        if self.shared.stop.cancelled() {
            return false;
        }
        if self
            .shared
            .loop_active
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            debug!("Player: render loop already running");
            return true;
        }

        // The previous loop has cleared `loop_active` and is on its way out
        if let Some(previous) = self.render_thread.take()
            && previous.handle.join().is_err()
        {
            error!("Player: previous render thread panicked");
        }

        let render_loop = RenderLoop::new(
            Arc::clone(&self.audio),
            Arc::clone(&self.video),
            Arc::clone(&self.renderer),
            Arc::clone(&self.shared),
            self.events.clone(),
            SyncPolicy::new(self.config.sync),
            self.config.timings,
        );
        let exited = SignalOfStop::new();
        let exited_signal = exited.clone();

        match thread::Builder::new()
            .name("player-render".into())
            .spawn(move || render_loop.run(exited_signal))
        {
            Ok(handle) => {
                self.render_thread = Some(RenderThread { handle, exited });
                true
            }
            Err(e) => {
                self.shared.loop_active.store(false, Ordering::SeqCst);
                let err = PlayerError::RenderThread(e);
                error!("Player: {}", err);
                if self
                    .shared
                    .state
                    .compare_exchange(PlaybackState::Playing, PlaybackState::Paused)
                {
                    self.audio.pause();
                }
                let (code, extra) = err.code();
                self.events.error(code, extra);
                false
            }
        }
    }
}

impl Drop for Player {
    fn drop(&mut self) {
        self.release();
        // The callback thread ends on its own once every dispatcher is gone
        drop(self.listener_thread.take());
    }
}
