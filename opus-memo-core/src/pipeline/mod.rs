//! Capture and playback pipelines.
//!
//! Each pipeline owns one device stream and one codec direction for the
//! length of a run, on a dedicated worker thread:
//!
//! ```text
//! [InputStream] → block → [FrameEncoder] → [FrameStore]
//! [FrameStore] → frame → [FrameDecoder] → block → [OutputStream]
//! ```

pub mod capture;
pub mod playback;

use std::sync::Arc;

use parking_lot::Mutex;

use crate::models::audio_models::{AudioLevels, PipelineDiagnostics, StreamFormat};
use crate::models::config::CodecConfiguration;
use crate::models::error::AudioError;
use crate::models::state::{CaptureState, PlaybackState};
use crate::traits::session_delegate::SessionDelegate;

pub use capture::CapturePipeline;
pub use playback::PlaybackPipeline;

/// Mutable state shared by the controller and both workers.
#[derive(Debug, Clone)]
pub struct PipelineStatus {
    pub capture: CaptureState,
    pub playback: PlaybackState,
    pub levels: AudioLevels,
    pub diagnostics: PipelineDiagnostics,
}

impl Default for PipelineStatus {
    fn default() -> Self {
        Self {
            capture: CaptureState::Idle,
            playback: PlaybackState::Idle,
            levels: AudioLevels::default(),
            diagnostics: PipelineDiagnostics::default(),
        }
    }
}

pub type SharedStatus = Arc<Mutex<PipelineStatus>>;

pub type SharedDelegate = Option<Arc<dyn SessionDelegate>>;

/// How often level updates reach the delegate.
const LEVELS_INTERVAL_SECS: f64 = 0.1;

fn levels_every_n_frames(config: &CodecConfiguration) -> usize {
    ((config.frames_per_second() * LEVELS_INTERVAL_SECS) as usize).max(1)
}

fn stream_format(config: &CodecConfiguration) -> StreamFormat {
    StreamFormat {
        sample_rate: config.sample_rate,
        channels: 1,
        block_len: config.samples_per_frame(),
    }
}

/// Any failure to open a device surfaces as `DeviceUnavailable`.
fn unavailable(error: AudioError) -> AudioError {
    match error {
        AudioError::DeviceUnavailable(_) => error,
        other => AudioError::DeviceUnavailable(other.to_string()),
    }
}

/// Any failure of an open device surfaces as `DeviceFailed`.
fn device_failed(error: AudioError) -> AudioError {
    match error {
        AudioError::DeviceFailed(_) => error,
        other => AudioError::DeviceFailed(other.to_string()),
    }
}
