use thiserror::Error;

use opus_memo_core::AudioError;

/// Errors from the cpal host while opening or running a stream.
#[derive(Debug, Error)]
pub enum CpalError {
    #[error("no {0} device found")]
    NoDevice(&'static str),

    #[error("device '{0}' not found")]
    DeviceNotFound(String),

    #[error("audio host unavailable: {0}")]
    HostUnavailable(#[from] cpal::HostUnavailable),

    #[error("failed to enumerate devices: {0}")]
    Devices(#[from] cpal::DevicesError),

    #[error("failed to query default stream config: {0}")]
    DefaultConfig(#[from] cpal::DefaultStreamConfigError),

    #[error("failed to build stream: {0}")]
    BuildStream(#[from] cpal::BuildStreamError),

    #[error("failed to start stream: {0}")]
    PlayStream(#[from] cpal::PlayStreamError),

    #[error("unsupported sample format: {0}")]
    UnsupportedFormat(String),
}

impl From<CpalError> for AudioError {
    fn from(error: CpalError) -> Self {
        AudioError::DeviceUnavailable(error.to_string())
    }
}
