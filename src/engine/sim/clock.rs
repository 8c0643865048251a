//! Wall-clock driven playback position

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;

#[derive(Debug, Clone, Copy)]
struct ClockState {
    /// Position when the clock last started or was seeked (ms)
    origin_ms: i64,
    /// Set while running
    running_since: Option<Instant>,
}

/// Playback clock that advances with wall time while running.
///
/// Cheap to clone; clones observe the same position.
#[derive(Debug, Clone)]
pub struct PlaybackClock {
    state: Arc<Mutex<ClockState>>,
}

impl Default for PlaybackClock {
    fn default() -> Self {
        Self::new()
    }
}

impl PlaybackClock {
    /// Create a stopped clock at position 0
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(ClockState {
                origin_ms: 0,
                running_since: None,
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, ClockState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Current position in milliseconds
    pub fn now_ms(&self) -> i64 {
        let state = self.lock();
        match state.running_since {
            Some(since) => state.origin_ms + since.elapsed().as_millis() as i64,
            None => state.origin_ms,
        }
    }

    pub fn is_running(&self) -> bool {
        self.lock().running_since.is_some()
    }

    pub fn start(&self) {
        let mut state = self.lock();
        if state.running_since.is_none() {
            state.running_since = Some(Instant::now());
        }
    }

    /// Freeze the position
    pub fn pause(&self) {
        let mut state = self.lock();
        if let Some(since) = state.running_since.take() {
            state.origin_ms += since.elapsed().as_millis() as i64;
        }
    }

    /// Jump to `position_ms`, keeping the running/paused status
    pub fn seek(&self, position_ms: i64) {
        let mut state = self.lock();
        state.origin_ms = position_ms;
        if state.running_since.is_some() {
            state.running_since = Some(Instant::now());
        }
    }
}
