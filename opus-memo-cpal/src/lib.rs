//! # opus-memo-cpal
//!
//! Cross-platform device backend for opus-memo, built on cpal.
//!
//! Provides:
//! - `CpalDeviceProvider`: opens the default (or a named) microphone and speaker
//! - `DeviceEnumerator`: lists input and output devices
//! - `permissions`: best-effort microphone access probe
//!
//! Each open stream runs on its own device thread. Device audio is converted
//! to mono `i16` at the codec rate on the way in and back to the device's own
//! rate and channel count on the way out.
//!
//! ## Usage
//! ```ignore
//! use opus_memo_core::{CodecConfiguration, VoiceSession};
//! use opus_memo_cpal::CpalDeviceProvider;
//!
//! let provider = CpalDeviceProvider::default_devices();
//! let mut session = VoiceSession::new(provider, CodecConfiguration::default()).unwrap();
//! session.start_recording().unwrap();
//! ```

pub mod cpal_input;
pub mod cpal_output;
pub mod device_enumerator;
pub mod error;
pub mod permissions;
pub mod provider;
mod stream_thread;

pub use cpal_input::CpalInputStream;
pub use cpal_output::CpalOutputStream;
pub use device_enumerator::DeviceEnumerator;
pub use error::CpalError;
pub use provider::CpalDeviceProvider;
