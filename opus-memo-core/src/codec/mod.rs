//! Codec engine: Opus encode/decode for one fixed sample rate and frame
//! duration, mono.

pub mod decoder;
pub mod encoder;
pub mod frame;

pub use decoder::{DecodedBlock, FrameDecoder};
pub use encoder::FrameEncoder;
pub use frame::CompressedFrame;
