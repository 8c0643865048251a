use log::{debug, info, warn};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU64, Ordering};

use crate::engine::{DecodeType, FrameStatus, SurfaceHandle, VideoEngine};

/// Shape of the synthetic stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VideoProfile {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    pub duration_ms: i64,
    pub decode_type: DecodeType,
    /// Report `Buffering` once every N frames; 0 disables it
    pub buffering_every: u64,
}

impl Default for VideoProfile {
    fn default() -> Self {
        Self {
            width: 320,
            height: 180,
            fps: 30,
            duration_ms: 10_000,
            decode_type: DecodeType::Software,
            buffering_every: 0,
        }
    }
}

impl VideoProfile {
    pub fn frame_interval_ms(&self) -> i64 {
        1_000 / i64::from(self.fps.max(1))
    }
}

/// Synthetic frame source. Decoding is instant; pacing is left to the sync policy.
#[derive(Debug)]
pub struct SimulatedVideoEngine {
    profile: VideoProfile,
    prepared: AtomicBool,
    next_pts: AtomicI64,
    decoded: AtomicU64,
    /// Buffering is reported once before the frame it delays
    buffering_pending: AtomicBool,
    surface: Mutex<Option<SurfaceHandle>>,
}

impl SimulatedVideoEngine {
    pub fn new(profile: VideoProfile) -> Self {
        Self {
            profile,
            prepared: AtomicBool::new(false),
            next_pts: AtomicI64::new(0),
            decoded: AtomicU64::new(0),
            buffering_pending: AtomicBool::new(false),
            surface: Mutex::new(None),
        }
    }

    pub fn profile(&self) -> &VideoProfile {
        &self.profile
    }

    pub fn frames_decoded(&self) -> u64 {
        self.decoded.load(Ordering::SeqCst)
    }

    pub fn output_surface(&self) -> Option<SurfaceHandle> {
        self.surface.lock().ok().and_then(|s| *s)
    }
}

/// Moving diagonal gradient so consecutive frames differ
fn paint(buffer: &mut [u8], width: u32, pts: i64) {
    let shift = (pts / 10) as usize;
    let width = width.max(1) as usize;
    for (i, pixel) in buffer.chunks_exact_mut(4).enumerate() {
        let (x, y) = (i % width, i / width);
        let v = ((x + y + shift) % 256) as u8;
        pixel.copy_from_slice(&[v, v.wrapping_mul(3), 255 - v, 255]);
    }
}

impl VideoEngine for SimulatedVideoEngine {
    fn decode_type(&self) -> DecodeType {
        self.profile.decode_type
    }

    fn prepare(&self, source: &str) -> bool {
        if !super::is_initialized() {
            warn!("SimVideo: adapters not initialized");
            return false;
        }
        if !super::source_is_usable(source) {
            warn!("SimVideo: cannot open {}", source);
            return false;
        }
        self.next_pts.store(0, Ordering::SeqCst);
        self.decoded.store(0, Ordering::SeqCst);
        self.prepared.store(true, Ordering::SeqCst);
        info!(
            "SimVideo: prepared {} ({}x{} @ {} fps, {:?})",
            source,
            self.profile.width,
            self.profile.height,
            self.profile.fps,
            self.profile.decode_type
        );
        true
    }

    fn start(&self) {
        debug!("SimVideo: start");
    }

    fn pause(&self) {
        debug!("SimVideo: pause");
    }

    fn resume(&self) {
        debug!("SimVideo: resume");
    }

    fn seek_to(&self, position_ms: i64) {
        let interval = self.profile.frame_interval_ms();
        let aligned = position_ms.clamp(0, self.profile.duration_ms) / interval * interval;
        self.next_pts.store(aligned, Ordering::SeqCst);
    }

    fn release(&self) {
        self.prepared.store(false, Ordering::SeqCst);
        debug!("SimVideo: released after {} frames", self.frames_decoded());
    }

    fn video_size(&self) -> (u32, u32) {
        (self.profile.width, self.profile.height)
    }

    fn read_frame_into(&self, buffer: Option<&mut [u8]>, pts_out: &mut i64) -> FrameStatus {
        if !self.prepared.load(Ordering::SeqCst) {
            return FrameStatus::Error;
        }

        let pts = self.next_pts.load(Ordering::SeqCst);
        if pts >= self.profile.duration_ms {
            return FrameStatus::Eof;
        }

        let every = self.profile.buffering_every;
        if every > 0 {
            let index = self.decoded.load(Ordering::SeqCst);
            if index > 0 && index % every == 0 && !self.buffering_pending.swap(true, Ordering::SeqCst)
            {
                return FrameStatus::Buffering;
            }
        }
        self.buffering_pending.store(false, Ordering::SeqCst);

        if let Some(buffer) = buffer {
            paint(buffer, self.profile.width, pts);
        }
        *pts_out = pts;
        self.next_pts
            .store(pts + self.profile.frame_interval_ms(), Ordering::SeqCst);
        self.decoded.fetch_add(1, Ordering::SeqCst);
        FrameStatus::Ok
    }

    fn set_output_surface(&self, surface: Option<SurfaceHandle>) {
        if let Ok(mut current) = self.surface.lock() {
            *current = surface;
        }
    }
}
