use opus::Channels;

use crate::models::config::{CodecConfiguration, ConcealmentMode};
use crate::models::error::AudioError;

use super::frame::CompressedFrame;

/// Output of a fail-soft decode.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedBlock {
    pub samples: Vec<i16>,
    /// Set when `samples` is a substitute for an undecodable frame.
    pub concealed: Option<AudioError>,
}

impl DecodedBlock {
    pub fn is_concealed(&self) -> bool {
        self.concealed.is_some()
    }
}

/// Stateful Opus decoder for one playback run.
///
/// Frames must come from an encoder with the same sample rate and frame
/// duration, fed in capture order.
pub struct FrameDecoder {
    decoder: opus::Decoder,
    samples_per_frame: usize,
    concealment: ConcealmentMode,
    frames_decoded: u64,
    frames_concealed: u64,
}

impl FrameDecoder {
    pub fn new(config: &CodecConfiguration) -> Result<Self, AudioError> {
        config.validate().map_err(AudioError::ConfigurationFailed)?;

        let decoder = opus::Decoder::new(config.sample_rate, Channels::Mono)
            .map_err(|e| AudioError::CodecFailed(format!("failed to create decoder: {}", e)))?;

        Ok(Self {
            decoder,
            samples_per_frame: config.samples_per_frame(),
            concealment: config.concealment,
            frames_decoded: 0,
            frames_concealed: 0,
        })
    }

    /// Strict decode of one frame into one raw block.
    ///
    /// Fails with `CorruptFrame` for a bad length prefix, a packet the codec
    /// rejects, or a packet that does not hold exactly one frame's samples.
    pub fn decode(&mut self, frame: &CompressedFrame) -> Result<Vec<i16>, AudioError> {
        let packet = frame.packet()?;
        let mut samples = vec![0i16; self.samples_per_frame];
        let decoded = self
            .decoder
            .decode(packet, &mut samples, false)
            .map_err(|e| AudioError::CorruptFrame(format!("codec rejected packet: {}", e)))?;
        if decoded != self.samples_per_frame {
            return Err(AudioError::CorruptFrame(format!(
                "decoded {} samples, expected {}",
                decoded, self.samples_per_frame
            )));
        }
        self.frames_decoded += 1;
        Ok(samples)
    }

    /// Decode one frame, substituting a full-length block on failure so the
    /// output stream keeps its timing.
    pub fn decode_or_conceal(&mut self, frame: &CompressedFrame) -> DecodedBlock {
        match self.decode(frame) {
            Ok(samples) => DecodedBlock {
                samples,
                concealed: None,
            },
            Err(error) => {
                self.frames_concealed += 1;
                DecodedBlock {
                    samples: self.conceal(),
                    concealed: Some(error),
                }
            }
        }
    }

    fn conceal(&mut self) -> Vec<i16> {
        let mut samples = vec![0i16; self.samples_per_frame];
        if self.concealment == ConcealmentMode::Extrapolate {
            // An empty packet asks the codec for loss concealment.
            if let Err(e) = self.decoder.decode(&[], &mut samples, false) {
                log::warn!("Loss concealment failed, using silence: {}", e);
                samples.fill(0);
            }
        }
        samples
    }

    pub fn samples_per_frame(&self) -> usize {
        self.samples_per_frame
    }

    pub fn frames_decoded(&self) -> u64 {
        self.frames_decoded
    }

    pub fn frames_concealed(&self) -> u64 {
        self.frames_concealed
    }
}
