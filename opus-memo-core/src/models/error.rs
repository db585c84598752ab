use thiserror::Error;

/// Errors raised by the codec engine, the pipelines and the device seam.
///
/// Three kinds matter to callers:
/// - `InvalidFrameSize` is a programming or configuration error. It fails
///   the call, never the pipeline.
/// - `DeviceUnavailable` / `DeviceFailed` are environment errors. The
///   affected pipeline is (or returns to) idle with its device released.
/// - `CorruptFrame` is a data error. Playback recovers by concealment.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AudioError {
    #[error("invalid frame size: expected {expected} samples, got {actual}")]
    InvalidFrameSize { expected: usize, actual: usize },

    #[error("device not available: {0}")]
    DeviceUnavailable(String),

    #[error("device failed: {0}")]
    DeviceFailed(String),

    #[error("corrupt frame: {0}")]
    CorruptFrame(String),

    #[error("configuration failed: {0}")]
    ConfigurationFailed(String),

    #[error("codec failed: {0}")]
    CodecFailed(String),

    #[error("invalid state: {0}")]
    InvalidState(String),
}

impl AudioError {
    /// Whether the error came from an audio device rather than from data or
    /// configuration.
    pub fn is_device_error(&self) -> bool {
        matches!(self, Self::DeviceUnavailable(_) | Self::DeviceFailed(_))
    }
}
