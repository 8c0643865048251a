//! Simulated engine adapters
//!
//! Stand-ins for real decoders and output devices: a wall-clock audio
//! engine, a synthetic frame source and a counting renderer. They let the
//! orchestrator run end to end without any media libraries.
//!
//! Call [`init`] once at startup before preparing any simulated engine.

mod audio;
mod clock;
mod renderer;
mod video;

pub use audio::SimulatedAudioEngine;
pub use clock::PlaybackClock;
pub use renderer::CountingRenderer;
pub use video::{SimulatedVideoEngine, VideoProfile};

use log::info;
use once_cell::sync::OnceCell;
use std::time::Instant;

static RUNTIME: OnceCell<Instant> = OnceCell::new();

/// Process-wide adapter initialization. Idempotent; returns `true` only on the first call.
pub fn init() -> bool {
    let mut first = false;
    RUNTIME.get_or_init(|| {
        first = true;
        info!("sim: engine adapters initialized");
        Instant::now()
    });
    first
}

pub fn is_initialized() -> bool {
    RUNTIME.get().is_some()
}

/// Source names the simulated engines refuse to open
pub(crate) fn source_is_usable(source: &str) -> bool {
    !source.trim().is_empty() && !source.starts_with("fail:")
}
