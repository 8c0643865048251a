//! Playback state management

use std::sync::atomic::{AtomicU8, Ordering};

/// Playback state machine
///
/// Owned by the player. Transitions are validated so that every public
/// operation either performs a legal move or is a logged no-op.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlaybackState {
    /// Nothing prepared yet
    Idle,

    /// Both engines prepared, playback not started
    Prepared,

    /// Render loop is presenting frames in sync with audio
    Playing,

    /// Position kept, audio and video halted
    Paused,

    /// Interactive scrubbing: video-only single-frame decode, audio paused
    Previewing,

    /// Current segment reached end of stream
    Eof,

    /// Resources released; no further transitions
    Released,
}

impl PlaybackState {
    /// Check if this state transition is valid
    pub fn can_transition_to(&self, target: &PlaybackState) -> bool {
        use PlaybackState::*;

        match (self, target) {
            // Released is terminal
            (Released, _) => false,

            // Release from anywhere
            (_, Released) => true,

            // (Re-)prepare
            (Idle | Prepared | Paused | Eof, Prepared) => true,

            // Start or restart playback
            (Prepared | Paused | Eof, Playing) => true,

            // Pause, or land paused after a seek / preview / decode error
            (Playing | Eof | Previewing, Paused) => true,

            // Scrubbing
            (Prepared | Playing | Paused | Eof, Previewing) => true,

            // Natural completion
            (Playing, Eof) => true,

            // Self-transitions
            (a, b) if a == b => true,

            // All other transitions invalid
            _ => false,
        }
    }

    /// Get a human-readable description of this state
    pub fn description(&self) -> &'static str {
        match self {
            PlaybackState::Idle => "Idle",
            PlaybackState::Prepared => "Prepared",
            PlaybackState::Playing => "Playing",
            PlaybackState::Paused => "Paused",
            PlaybackState::Previewing => "Previewing",
            PlaybackState::Eof => "Eof",
            PlaybackState::Released => "Released",
        }
    }

    /// Check if the engines are prepared and not yet released
    pub fn is_prepared(&self) -> bool {
        !matches!(self, PlaybackState::Idle | PlaybackState::Released)
    }

    /// Check if the render loop has work to do in this state
    pub fn needs_render_loop(&self) -> bool {
        matches!(self, PlaybackState::Playing | PlaybackState::Previewing)
    }

    fn as_u8(self) -> u8 {
        match self {
            PlaybackState::Idle => 0,
            PlaybackState::Prepared => 1,
            PlaybackState::Playing => 2,
            PlaybackState::Paused => 3,
            PlaybackState::Previewing => 4,
            PlaybackState::Eof => 5,
            PlaybackState::Released => 6,
        }
    }

    fn from_u8(value: u8) -> Self {
        match value {
            0 => PlaybackState::Idle,
            1 => PlaybackState::Prepared,
            2 => PlaybackState::Playing,
            3 => PlaybackState::Paused,
            4 => PlaybackState::Previewing,
            5 => PlaybackState::Eof,
            _ => PlaybackState::Released,
        }
    }
}

impl std::fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.description())
    }
}

/// Lock-free cell holding a [`PlaybackState`], shared with the render loop.
#[derive(Debug)]
pub struct AtomicPlaybackState(AtomicU8);

impl AtomicPlaybackState {
    pub fn new(state: PlaybackState) -> Self {
        Self(AtomicU8::new(state.as_u8()))
    }

    pub fn load(&self) -> PlaybackState {
        PlaybackState::from_u8(self.0.load(Ordering::SeqCst))
    }

    pub fn store(&self, state: PlaybackState) {
        self.0.store(state.as_u8(), Ordering::SeqCst);
    }

    /// Move from `current` to `new` only if the state is still `current`.
    pub fn compare_exchange(&self, current: PlaybackState, new: PlaybackState) -> bool {
        self.0
            .compare_exchange(current.as_u8(), new.as_u8(), Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }
}
