use opus::{Application, Bitrate, Channels};

use crate::models::config::{CodecApplication, CodecConfiguration};
use crate::models::error::AudioError;

use super::frame::CompressedFrame;

impl From<CodecApplication> for Application {
    fn from(app: CodecApplication) -> Self {
        match app {
            CodecApplication::Voip => Application::Voip,
            CodecApplication::Audio => Application::Audio,
            CodecApplication::LowDelay => Application::LowDelay,
        }
    }
}

/// Stateful Opus encoder for one capture run.
///
/// Create one per run and drop it when the run ends; there is no reset.
/// Repeated calls with the same input are not idempotent because the
/// predictive state advances with every frame.
pub struct FrameEncoder {
    encoder: opus::Encoder,
    samples_per_frame: usize,
    packet: Vec<u8>,
    frames_encoded: u64,
}

impl FrameEncoder {
    pub fn new(config: &CodecConfiguration) -> Result<Self, AudioError> {
        config.validate().map_err(AudioError::ConfigurationFailed)?;

        let mut encoder = opus::Encoder::new(config.sample_rate, Channels::Mono, config.application.into())
            .map_err(|e| AudioError::CodecFailed(format!("failed to create encoder: {}", e)))?;
        encoder
            .set_bitrate(Bitrate::Bits(config.bitrate))
            .map_err(|e| AudioError::CodecFailed(format!("failed to set bitrate: {}", e)))?;

        Ok(Self {
            encoder,
            samples_per_frame: config.samples_per_frame(),
            packet: vec![0u8; config.max_frame_bytes],
            frames_encoded: 0,
        })
    }

    /// Encode exactly one raw block.
    pub fn encode(&mut self, block: &[i16]) -> Result<CompressedFrame, AudioError> {
        if block.len() != self.samples_per_frame {
            return Err(AudioError::InvalidFrameSize {
                expected: self.samples_per_frame,
                actual: block.len(),
            });
        }

        let len = self
            .encoder
            .encode(block, &mut self.packet)
            .map_err(|e| AudioError::CodecFailed(format!("encode failed: {}", e)))?;
        let frame = CompressedFrame::from_packet(&self.packet[..len])?;
        self.frames_encoded += 1;
        Ok(frame)
    }

    pub fn samples_per_frame(&self) -> usize {
        self.samples_per_frame
    }

    pub fn frames_encoded(&self) -> u64 {
        self.frames_encoded
    }
}
