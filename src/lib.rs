//! Audio-master A/V sync playback orchestrator
//!
//! The [`Player`] drives injected audio, video and render engines from a
//! single render loop thread, using the audio clock as the master and
//! dropping or delaying video frames to follow it.

pub mod config;
pub mod engine;
pub mod player;
pub mod utils;

pub use config::{LoopTimings, PlayerConfig, SyncThresholds};
pub use engine::{AudioEngine, DecodeType, FrameStatus, Renderer, SurfaceHandle, VideoEngine};
pub use player::{
    PlaybackState, Player, PlayerError, PlayerEvent, PlayerEvents, PlayerListener, StatsSummary,
    SyncDecision, SyncPolicy,
};
