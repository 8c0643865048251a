use log::{debug, trace};
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::engine::{Renderer, SurfaceHandle};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct Target {
    surface: Option<SurfaceHandle>,
    video_size: (u32, u32),
    surface_size: (u32, u32),
}

/// Renderer that presents nothing and counts what it was asked to draw.
#[derive(Debug, Default)]
pub struct CountingRenderer {
    frames: AtomicU64,
    bytes: AtomicU64,
    target: Mutex<Target>,
}

impl CountingRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn frames_presented(&self) -> u64 {
        self.frames.load(Ordering::Relaxed)
    }

    pub fn bytes_presented(&self) -> u64 {
        self.bytes.load(Ordering::Relaxed)
    }

    pub fn surface(&self) -> Option<SurfaceHandle> {
        self.target.lock().ok().and_then(|t| t.surface)
    }

    fn update(&self, f: impl FnOnce(&mut Target)) {
        if let Ok(mut target) = self.target.lock() {
            f(&mut target);
        }
    }
}

impl Renderer for CountingRenderer {
    fn set_surface(&self, surface: Option<SurfaceHandle>) {
        self.update(|t| t.surface = surface);
    }

    fn set_video_size(&self, width: u32, height: u32) {
        debug!("SimRenderer: video size {}x{}", width, height);
        self.update(|t| t.video_size = (width, height));
    }

    fn render_frame(&self, buffer: Option<&[u8]>, width: u32, height: u32) {
        let frame = self.frames.fetch_add(1, Ordering::Relaxed) + 1;
        if let Some(buffer) = buffer {
            self.bytes.fetch_add(buffer.len() as u64, Ordering::Relaxed);
        }
        trace!("SimRenderer: frame #{} {}x{}", frame, width, height);
    }

    fn surface_changed(&self, surface: Option<SurfaceHandle>, format: i32, width: u32, height: u32) {
        debug!(
            "SimRenderer: surface {:?} changed (format {}, {}x{})",
            surface, format, width, height
        );
        self.update(|t| {
            t.surface = surface;
            t.surface_size = (width, height);
        });
    }
}
