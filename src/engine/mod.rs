//! Collaborator contracts consumed by the player
//!
//! The player never decodes, outputs audio or presents pixels itself. It drives
//! three capabilities injected at construction:
//! - [`AudioEngine`]: decoding plus output, and the master clock
//! - [`VideoEngine`]: frame-by-frame decode with presentation timestamps
//! - [`Renderer`]: presentation of a decoded frame onto a surface
//!
//! Engines are shared between the caller thread and the render loop, so every
//! method takes `&self` and implementations keep their own interior state.

#[cfg(test)]
pub(crate) mod mock;
pub mod sim;

/// Opaque handle to a platform output surface (window, texture, swapchain).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SurfaceHandle(pub u64);

/// Outcome of asking the video engine for the next frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameStatus {
    /// A frame was decoded and its PTS written
    Ok,
    /// End of stream
    Eof,
    /// No frame available yet; the decoder is still working
    Buffering,
    /// Decode, convert or I/O failure
    Error,
}

/// How the video engine delivers pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DecodeType {
    /// Software decode into a caller-provided RGBA buffer (`w * h * 4` bytes)
    #[default]
    Software,
    /// Hardware decode straight to the output surface; no buffer is passed
    Hardware,
}

impl DecodeType {
    /// Size of the frame buffer the render loop must own for this decode type
    pub fn frame_bytes(&self, width: u32, height: u32) -> usize {
        match self {
            DecodeType::Software => width as usize * height as usize * 4,
            DecodeType::Hardware => 0,
        }
    }
}

/// Audio decode + output pipeline; its playback position is the master clock.
pub trait AudioEngine: Send + Sync {
    fn prepare(&self, source: &str) -> bool;
    fn play(&self);
    fn pause(&self);
    fn resume(&self);
    fn seek_to(&self, position_ms: i64);
    fn release(&self);

    /// Total media duration in ms, or 0 if unknown
    fn duration_ms(&self) -> i64;

    /// Current playback clock in ms; 0 or negative means not yet available
    fn audio_clock_ms(&self) -> i64;
}

/// Video decode pipeline producing one frame per call.
pub trait VideoEngine: Send + Sync {
    fn decode_type(&self) -> DecodeType {
        DecodeType::Software
    }

    fn prepare(&self, source: &str) -> bool;
    fn start(&self);
    fn pause(&self);
    fn resume(&self);
    fn seek_to(&self, position_ms: i64);
    fn release(&self);

    /// Width and height of the video stream
    fn video_size(&self) -> (u32, u32);

    /// Decode the next frame.
    ///
    /// For [`DecodeType::Software`] `buffer` is `Some` and receives RGBA bytes;
    /// for [`DecodeType::Hardware`] it is `None`. On [`FrameStatus::Ok`] the
    /// frame PTS in ms is written to `pts_out`.
    fn read_frame_into(&self, buffer: Option<&mut [u8]>, pts_out: &mut i64) -> FrameStatus;

    fn set_output_surface(&self, surface: Option<SurfaceHandle>);
}

/// Presents decoded frames.
pub trait Renderer: Send + Sync {
    fn set_surface(&self, surface: Option<SurfaceHandle>);
    fn set_video_size(&self, width: u32, height: u32);

    /// Draw one frame. The buffer is borrowed for the duration of the call only.
    fn render_frame(&self, buffer: Option<&[u8]>, width: u32, height: u32);

    fn surface_changed(&self, surface: Option<SurfaceHandle>, format: i32, width: u32, height: u32);
}
