//! Scripted, call-recording engines for orchestrator tests

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use super::{AudioEngine, DecodeType, FrameStatus, Renderer, SurfaceHandle, VideoEngine};

fn record(calls: &Mutex<Vec<String>>, call: impl Into<String>) {
    calls.lock().unwrap().push(call.into());
}

fn count(calls: &Mutex<Vec<String>>, name: &str) -> usize {
    calls
        .lock()
        .unwrap()
        .iter()
        .filter(|c| c.as_str() == name || c.starts_with(&format!("{} ", name)))
        .count()
}

pub(crate) struct MockAudio {
    calls: Mutex<Vec<String>>,
    prepare_ok: AtomicBool,
    duration_ms: AtomicI64,
    clock_ms: AtomicI64,
}

impl MockAudio {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self {
            calls: Mutex::new(Vec::new()),
            prepare_ok: AtomicBool::new(true),
            duration_ms: AtomicI64::new(5_000),
            clock_ms: AtomicI64::new(0),
        })
    }

    pub(crate) fn set_prepare_ok(&self, ok: bool) {
        self.prepare_ok.store(ok, Ordering::SeqCst);
    }

    pub(crate) fn set_duration_ms(&self, duration_ms: i64) {
        self.duration_ms.store(duration_ms, Ordering::SeqCst);
    }

    pub(crate) fn set_clock_ms(&self, clock_ms: i64) {
        self.clock_ms.store(clock_ms, Ordering::SeqCst);
    }

    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// Number of recorded calls to `name`, with or without arguments
    pub(crate) fn count(&self, name: &str) -> usize {
        count(&self.calls, name)
    }
}

impl AudioEngine for MockAudio {
    fn prepare(&self, source: &str) -> bool {
        record(&self.calls, format!("prepare {}", source));
        self.prepare_ok.load(Ordering::SeqCst)
    }

    fn play(&self) {
        record(&self.calls, "play");
    }

    fn pause(&self) {
        record(&self.calls, "pause");
    }

    fn resume(&self) {
        record(&self.calls, "resume");
    }

    fn seek_to(&self, position_ms: i64) {
        record(&self.calls, format!("seek_to {}", position_ms));
    }

    fn release(&self) {
        record(&self.calls, "release");
    }

    fn duration_ms(&self) -> i64 {
        record(&self.calls, "duration_ms");
        self.duration_ms.load(Ordering::SeqCst)
    }

    fn audio_clock_ms(&self) -> i64 {
        record(&self.calls, "audio_clock_ms");
        self.clock_ms.load(Ordering::SeqCst)
    }
}

pub(crate) struct MockVideo {
    calls: Mutex<Vec<String>>,
    decode_type: DecodeType,
    prepare_ok: AtomicBool,
    size: Mutex<(u32, u32)>,
    script: Mutex<VecDeque<(FrameStatus, i64)>>,
    /// Returned once the script runs dry
    fallback: Mutex<(FrameStatus, i64)>,
    /// When set, `seek_to` moves the fallback pts to the target, then blocks this long
    slow_seek: Mutex<Option<Duration>>,
    reads: AtomicU64,
}

impl MockVideo {
    pub(crate) fn new() -> Arc<Self> {
        Self::with_decode_type(DecodeType::Software)
    }

    pub(crate) fn with_decode_type(decode_type: DecodeType) -> Arc<Self> {
        Arc::new(Self {
            calls: Mutex::new(Vec::new()),
            decode_type,
            prepare_ok: AtomicBool::new(true),
            size: Mutex::new((4, 2)),
            script: Mutex::new(VecDeque::new()),
            fallback: Mutex::new((FrameStatus::Buffering, 0)),
            slow_seek: Mutex::new(None),
            reads: AtomicU64::new(0),
        })
    }

    pub(crate) fn set_prepare_ok(&self, ok: bool) {
        self.prepare_ok.store(ok, Ordering::SeqCst);
    }

    pub(crate) fn set_size(&self, width: u32, height: u32) {
        *self.size.lock().unwrap() = (width, height);
    }

    /// Queue frame results handed out in order by `read_frame_into`
    pub(crate) fn push_frames(&self, frames: &[(FrameStatus, i64)]) {
        self.script.lock().unwrap().extend(frames.iter().copied());
    }

    pub(crate) fn set_fallback(&self, status: FrameStatus, pts: i64) {
        *self.fallback.lock().unwrap() = (status, pts);
    }

    /// Seeks reposition the stream at once but return only after `delay`,
    /// so reads issued meanwhile already see the new position.
    pub(crate) fn set_slow_seek(&self, delay: Duration) {
        *self.slow_seek.lock().unwrap() = Some(delay);
    }

    pub(crate) fn reads(&self) -> u64 {
        self.reads.load(Ordering::SeqCst)
    }

    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub(crate) fn count(&self, name: &str) -> usize {
        count(&self.calls, name)
    }
}

impl VideoEngine for MockVideo {
    fn decode_type(&self) -> DecodeType {
        self.decode_type
    }

    fn prepare(&self, source: &str) -> bool {
        record(&self.calls, format!("prepare {}", source));
        self.prepare_ok.load(Ordering::SeqCst)
    }

    fn start(&self) {
        record(&self.calls, "start");
    }

    fn pause(&self) {
        record(&self.calls, "pause");
    }

    fn resume(&self) {
        record(&self.calls, "resume");
    }

    fn seek_to(&self, position_ms: i64) {
        record(&self.calls, format!("seek_to {}", position_ms));
        let slow_seek = *self.slow_seek.lock().unwrap();
        if let Some(delay) = slow_seek {
            self.fallback.lock().unwrap().1 = position_ms;
            thread::sleep(delay);
        }
    }

    fn release(&self) {
        record(&self.calls, "release");
    }

    fn video_size(&self) -> (u32, u32) {
        *self.size.lock().unwrap()
    }

    fn read_frame_into(&self, buffer: Option<&mut [u8]>, pts_out: &mut i64) -> FrameStatus {
        self.reads.fetch_add(1, Ordering::SeqCst);
        let next = self.script.lock().unwrap().pop_front();
        let (status, pts) = next.unwrap_or_else(|| *self.fallback.lock().unwrap());
        if status == FrameStatus::Ok {
            *pts_out = pts;
            if let Some(buffer) = buffer {
                buffer.fill(pts as u8);
            }
        }
        status
    }

    fn set_output_surface(&self, surface: Option<SurfaceHandle>) {
        record(&self.calls, format!("set_output_surface {:?}", surface));
    }
}

/// One `render_frame` call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct RenderedFrame {
    pub(crate) buffer_len: Option<usize>,
    pub(crate) width: u32,
    pub(crate) height: u32,
}

#[derive(Default)]
pub(crate) struct MockRenderer {
    frames: Mutex<Vec<RenderedFrame>>,
    calls: Mutex<Vec<String>>,
}

impl MockRenderer {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub(crate) fn frames(&self) -> Vec<RenderedFrame> {
        self.frames.lock().unwrap().clone()
    }

    pub(crate) fn frame_count(&self) -> usize {
        self.frames.lock().unwrap().len()
    }

    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

impl Renderer for MockRenderer {
    fn set_surface(&self, surface: Option<SurfaceHandle>) {
        record(&self.calls, format!("set_surface {:?}", surface));
    }

    fn set_video_size(&self, width: u32, height: u32) {
        record(&self.calls, format!("set_video_size {}x{}", width, height));
    }

    fn render_frame(&self, buffer: Option<&[u8]>, width: u32, height: u32) {
        self.frames.lock().unwrap().push(RenderedFrame {
            buffer_len: buffer.map(|b| b.len()),
            width,
            height,
        });
    }

    fn surface_changed(&self, surface: Option<SurfaceHandle>, format: i32, width: u32, height: u32) {
        record(
            &self.calls,
            format!("surface_changed {:?} {} {}x{}", surface, format, width, height),
        );
    }
}
