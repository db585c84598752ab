use std::time::Duration;

use crate::models::audio_models::{AudioDevice, StreamFormat};
use crate::models::error::AudioError;

/// Outcome of one blocking device call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamStatus {
    /// The block was filled (input) or accepted (output).
    Ready,
    /// The timeout elapsed first; nothing was transferred.
    TimedOut,
}

/// An open input stream delivering mono `i16` blocks.
///
/// Dropping the stream releases the device.
pub trait InputStream: Send {
    /// Block until `block` is completely filled or `timeout` elapses.
    ///
    /// On `TimedOut` the contents of `block` are unspecified and must not be
    /// encoded. An `Err` means the device is gone; callers stop reading.
    fn read_block(&mut self, block: &mut [i16], timeout: Duration) -> Result<StreamStatus, AudioError>;
}

/// An open output stream accepting mono `i16` blocks.
///
/// Dropping the stream releases the device and discards anything queued.
pub trait OutputStream: Send {
    /// Block until the whole of `block` is queued or `timeout` elapses.
    ///
    /// Either the full block is accepted or none of it is, so a timed out
    /// write can be retried with the same block.
    fn write_block(&mut self, block: &[i16], timeout: Duration) -> Result<StreamStatus, AudioError>;

    /// Wait until queued samples have been played.
    ///
    /// Returns `TimedOut` if samples are still queued after `timeout`.
    fn drain(&mut self, timeout: Duration) -> Result<StreamStatus, AudioError>;
}

/// Capability handed to the session controller for opening devices.
///
/// Implemented by:
/// - `CpalDeviceProvider` (opus-memo-cpal)
/// - `MemoryDeviceProvider` (in-memory, for headless runs and tests)
pub trait AudioDeviceProvider: Send + Sync {
    /// Open the input device. Fails with `DeviceUnavailable` when it cannot
    /// be opened (missing, busy, permission not granted).
    fn open_input(&self, format: &StreamFormat) -> Result<Box<dyn InputStream>, AudioError>;

    /// Open the output device. Fails with `DeviceUnavailable` like
    /// [`AudioDeviceProvider::open_input`].
    fn open_output(&self, format: &StreamFormat) -> Result<Box<dyn OutputStream>, AudioError>;

    /// Information about the input device, if one exists.
    fn input_info(&self) -> Option<AudioDevice>;

    /// Information about the output device, if one exists.
    fn output_info(&self) -> Option<AudioDevice>;
}
