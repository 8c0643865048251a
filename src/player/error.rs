use thiserror::Error;

use super::state::PlaybackState;

/// Callback code reported for a failed prepare
pub const ERROR_PREPARE: i32 = -1;
/// Callback code reported when the video engine fails mid-playback
pub const ERROR_DECODE: i32 = -2;
/// Callback code reported when the render thread cannot be started
pub const ERROR_RENDER_THREAD: i32 = -3;

#[derive(Debug, Error)]
pub enum PlayerError {
    #[error("prepare failed (audio ok: {audio_ok}, video ok: {video_ok})")]
    Prepare { audio_ok: bool, video_ok: bool },
    #[error("video engine reported a decode error")]
    Decode,
    #[error("{op} is not allowed in state {state}")]
    InvalidState {
        op: &'static str,
        state: PlaybackState,
    },
    #[error("player has been released")]
    Released,
    #[error("failed to start render thread: {0}")]
    RenderThread(#[from] std::io::Error),
    #[error("notification channel already has a consumer")]
    EventsTaken,
    #[error("failed to start listener thread: {0}")]
    ListenerThread(std::io::Error),
}

impl PlayerError {
    /// `(code, extra)` pair delivered through `on_error`
    pub fn code(&self) -> (i32, i32) {
        match self {
            PlayerError::Prepare { .. } => (ERROR_PREPARE, 0),
            PlayerError::Decode => (ERROR_DECODE, 0),
            PlayerError::RenderThread(_) => (ERROR_RENDER_THREAD, 0),
            PlayerError::InvalidState { .. }
            | PlayerError::Released
            | PlayerError::EventsTaken
            | PlayerError::ListenerThread(_) => (ERROR_PREPARE, 0),
        }
    }
}
