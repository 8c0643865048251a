use log::{debug, info, warn};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use super::clock::PlaybackClock;
use crate::engine::AudioEngine;

/// Audio engine whose master clock is wall time.
///
/// After each `play()`/`resume()` the clock reports "not available" for a
/// short warm-up, like a real output device filling its first buffers.
#[derive(Debug)]
pub struct SimulatedAudioEngine {
    clock: PlaybackClock,
    duration_ms: i64,
    warmup: Duration,
    prepared: AtomicBool,
    output_started: Mutex<Option<Instant>>,
}

impl SimulatedAudioEngine {
    pub fn new(duration_ms: i64) -> Self {
        Self {
            clock: PlaybackClock::new(),
            duration_ms: duration_ms.max(0),
            warmup: Duration::from_millis(60),
            prepared: AtomicBool::new(false),
            output_started: Mutex::new(None),
        }
    }

    pub fn with_warmup(mut self, warmup: Duration) -> Self {
        self.warmup = warmup;
        self
    }

    pub fn clock(&self) -> &PlaybackClock {
        &self.clock
    }

    fn start_output(&self) {
        if let Ok(mut started) = self.output_started.lock() {
            *started = Some(Instant::now());
        }
        self.clock.start();
    }

    fn warming_up(&self) -> bool {
        match self.output_started.lock() {
            Ok(started) => started.is_none_or(|at| at.elapsed() < self.warmup),
            Err(_) => true,
        }
    }
}

impl AudioEngine for SimulatedAudioEngine {
    fn prepare(&self, source: &str) -> bool {
        if !super::is_initialized() {
            warn!("SimAudio: adapters not initialized");
            return false;
        }
        if !super::source_is_usable(source) {
            warn!("SimAudio: cannot open {}", source);
            return false;
        }
        self.clock.pause();
        self.clock.seek(0);
        self.prepared.store(true, Ordering::SeqCst);
        info!("SimAudio: prepared {} ({} ms)", source, self.duration_ms);
        true
    }

    fn play(&self) {
        debug!("SimAudio: play");
        self.start_output();
    }

    fn pause(&self) {
        debug!("SimAudio: pause at {} ms", self.clock.now_ms());
        self.clock.pause();
    }

    fn resume(&self) {
        debug!("SimAudio: resume");
        self.start_output();
    }

    fn seek_to(&self, position_ms: i64) {
        self.clock.seek(position_ms.clamp(0, self.duration_ms));
    }

    fn release(&self) {
        self.clock.pause();
        self.prepared.store(false, Ordering::SeqCst);
        debug!("SimAudio: released");
    }

    fn duration_ms(&self) -> i64 {
        self.duration_ms
    }

    fn audio_clock_ms(&self) -> i64 {
        if !self.prepared.load(Ordering::SeqCst) || self.warming_up() {
            return 0;
        }
        self.clock.now_ms().min(self.duration_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_clock_unavailable_until_warm() {
        crate::engine::sim::init();
        let audio = SimulatedAudioEngine::new(10_000).with_warmup(Duration::from_millis(30));
        assert!(audio.prepare("sim://clip"));
        assert_eq!(audio.audio_clock_ms(), 0);

        audio.play();
        assert_eq!(audio.audio_clock_ms(), 0);
        thread::sleep(Duration::from_millis(50));
        assert!(audio.audio_clock_ms() >= 30);
    }

    #[test]
    fn test_seek_and_duration_clamp() {
        crate::engine::sim::init();
        let audio = SimulatedAudioEngine::new(2_000).with_warmup(Duration::ZERO);
        assert!(audio.prepare("sim://clip"));
        audio.play();
        audio.pause();
        audio.seek_to(5_000);
        assert_eq!(audio.audio_clock_ms(), 2_000);
        assert_eq!(audio.duration_ms(), 2_000);
    }

    #[test]
    fn test_unusable_source_fails() {
        crate::engine::sim::init();
        let audio = SimulatedAudioEngine::new(2_000);
        assert!(!audio.prepare("fail:audio"));
        assert_eq!(audio.audio_clock_ms(), 0);
    }
}
