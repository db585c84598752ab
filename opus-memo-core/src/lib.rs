//! # opus-memo-core
//!
//! Platform-agnostic voice memo core.
//!
//! Captures mono audio, compresses it into Opus frames held in memory, and
//! decodes them back out to a speaker. Device backends (cpal, in-memory)
//! implement the `AudioDeviceProvider` trait and plug into the generic
//! `VoiceSession`.
//!
//! ## Architecture
//!
//! ```text
//! opus-memo-core (this crate)
//! ├── codec/       ← FrameEncoder, FrameDecoder, CompressedFrame
//! ├── devices/     ← MemoryDeviceProvider
//! ├── models/      ← AudioError, CodecConfiguration, states, summaries
//! ├── pipeline/    ← CapturePipeline, PlaybackPipeline
//! ├── processing/  ← RingBuffer, sample conversion, resampling, levels
//! ├── session/     ← VoiceSession (session controller)
//! ├── storage/     ← FrameStore
//! └── traits/      ← AudioDeviceProvider, InputStream, OutputStream, SessionDelegate
//! ```

pub mod codec;
pub mod devices;
pub mod models;
pub mod pipeline;
pub mod processing;
pub mod session;
pub mod storage;
pub mod traits;

// Re-export key types at crate root for convenience.
pub use codec::{CompressedFrame, DecodedBlock, FrameDecoder, FrameEncoder};
pub use devices::MemoryDeviceProvider;
pub use models::audio_models::{AudioDevice, AudioLevels, DeviceDirection, PipelineDiagnostics, StreamFormat};
pub use models::config::{CodecApplication, CodecConfiguration, ConcealmentMode, FrameDuration};
pub use models::error::AudioError;
pub use models::recording_result::{FinishReason, PlaybackSummary, RecordingSummary};
pub use models::state::{CaptureState, PlaybackState};
pub use pipeline::{CapturePipeline, PlaybackPipeline};
pub use processing::ring_buffer::RingBuffer;
pub use session::voice_session::VoiceSession;
pub use storage::frame_store::FrameStore;
pub use traits::audio_device::{AudioDeviceProvider, InputStream, OutputStream, StreamStatus};
pub use traits::session_delegate::SessionDelegate;
