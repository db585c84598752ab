use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::error::AudioError;

/// Sample rates accepted by the Opus codec.
pub const SUPPORTED_SAMPLE_RATES: [u32; 5] = [8000, 12000, 16000, 24000, 48000];

/// Largest packet Opus can produce for a single frame (RFC 6716 §3.4).
pub const MAX_PACKET_BYTES: usize = 4000;

const MIN_BITRATE: i32 = 6_000;
const MAX_BITRATE: i32 = 510_000;

/// Duration of one codec frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FrameDuration {
    #[serde(rename = "2.5ms")]
    Ms2_5,
    #[serde(rename = "5ms")]
    Ms5,
    #[serde(rename = "10ms")]
    Ms10,
    #[serde(rename = "20ms")]
    Ms20,
    #[serde(rename = "40ms")]
    Ms40,
    #[serde(rename = "60ms")]
    Ms60,
}

impl FrameDuration {
    /// Length in microseconds. 2.5 ms is the only non-integral millisecond
    /// value, so everything is derived from microseconds.
    pub fn as_micros(self) -> u64 {
        match self {
            Self::Ms2_5 => 2_500,
            Self::Ms5 => 5_000,
            Self::Ms10 => 10_000,
            Self::Ms20 => 20_000,
            Self::Ms40 => 40_000,
            Self::Ms60 => 60_000,
        }
    }

    pub fn as_duration(self) -> Duration {
        Duration::from_micros(self.as_micros())
    }
}

/// Opus application mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CodecApplication {
    Voip,
    Audio,
    LowDelay,
}

/// What the decoder substitutes for a frame it cannot decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConcealmentMode {
    /// A block of zero samples.
    Silence,
    /// Opus packet-loss concealment, extrapolated from the previous frame.
    Extrapolate,
}

/// Codec and session configuration shared by both pipelines.
///
/// Capture and playback of the same frame store must use the same sample
/// rate and frame duration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CodecConfiguration {
    /// Codec sample rate in Hz (default: 48000).
    pub sample_rate: u32,

    /// Duration of one frame (default: 20 ms).
    pub frame_duration: FrameDuration,

    /// Target encoder bitrate in bits per second (default: 32000).
    pub bitrate: i32,

    /// Opus application mode (default: VoIP).
    pub application: CodecApplication,

    /// Upper bound on one encoded packet in bytes (default: 4000).
    pub max_frame_bytes: usize,

    /// Substitute used for undecodable frames (default: silence).
    pub concealment: ConcealmentMode,

    /// Capture stops by itself after this many seconds (None = unlimited).
    pub max_duration_secs: Option<f64>,
}

impl CodecConfiguration {
    pub fn validate(&self) -> Result<(), String> {
        if !SUPPORTED_SAMPLE_RATES.contains(&self.sample_rate) {
            return Err(format!("unsupported sample rate: {}", self.sample_rate));
        }
        if !(MIN_BITRATE..=MAX_BITRATE).contains(&self.bitrate) {
            return Err(format!("bitrate out of range: {}", self.bitrate));
        }
        if self.max_frame_bytes == 0 || self.max_frame_bytes > MAX_PACKET_BYTES {
            return Err(format!("max frame bytes out of range: {}", self.max_frame_bytes));
        }
        if let Some(secs) = self.max_duration_secs {
            if !secs.is_finite() || secs <= 0.0 {
                return Err(format!("max duration must be positive: {}", secs));
            }
        }
        Ok(())
    }

    /// Number of mono samples in one raw block.
    pub fn samples_per_frame(&self) -> usize {
        (self.sample_rate as u64 * self.frame_duration.as_micros() / 1_000_000) as usize
    }

    /// Wall-clock length of one frame.
    pub fn frame_period(&self) -> Duration {
        self.frame_duration.as_duration()
    }

    pub fn frames_per_second(&self) -> f64 {
        1_000_000.0 / self.frame_duration.as_micros() as f64
    }

    /// Frame cap derived from `max_duration_secs`.
    pub fn max_frames(&self) -> Option<usize> {
        self.max_duration_secs
            .map(|secs| (secs * self.frames_per_second()).ceil() as usize)
    }

    /// Duration covered by `frame_count` frames, in seconds.
    pub fn duration_of(&self, frame_count: usize) -> f64 {
        frame_count as f64 / self.frames_per_second()
    }

    /// Load a configuration from a JSON file. Missing fields take defaults.
    pub fn from_json_file(path: &Path) -> Result<Self, AudioError> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            AudioError::ConfigurationFailed(format!("failed to read {}: {}", path.display(), e))
        })?;
        let config: Self = serde_json::from_str(&text)
            .map_err(|e| AudioError::ConfigurationFailed(format!("invalid config: {}", e)))?;
        config.validate().map_err(AudioError::ConfigurationFailed)?;
        Ok(config)
    }
}

impl Default for CodecConfiguration {
    fn default() -> Self {
        Self {
            sample_rate: 48000,
            frame_duration: FrameDuration::Ms20,
            bitrate: 32000,
            application: CodecApplication::Voip,
            max_frame_bytes: MAX_PACKET_BYTES,
            concealment: ConcealmentMode::Silence,
            max_duration_secs: Some(600.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_valid() {
        let config = CodecConfiguration::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.samples_per_frame(), 960);
        assert_eq!(config.frame_period(), Duration::from_millis(20));
        assert_eq!(config.max_frames(), Some(30_000));
    }

    #[test]
    fn samples_per_frame_follows_rate_and_duration() {
        let config = CodecConfiguration {
            sample_rate: 16000,
            frame_duration: FrameDuration::Ms2_5,
            ..Default::default()
        };
        assert_eq!(config.samples_per_frame(), 40);

        let config = CodecConfiguration {
            sample_rate: 8000,
            frame_duration: FrameDuration::Ms60,
            ..Default::default()
        };
        assert_eq!(config.samples_per_frame(), 480);
    }

    #[test]
    fn rejects_unsupported_sample_rate() {
        let config = CodecConfiguration {
            sample_rate: 44100,
            ..Default::default()
        };
        assert!(config.validate().unwrap_err().contains("44100"));
    }

    #[test]
    fn rejects_bad_bitrate_and_duration() {
        let low = CodecConfiguration {
            bitrate: 100,
            ..Default::default()
        };
        assert!(low.validate().is_err());

        let negative = CodecConfiguration {
            max_duration_secs: Some(-1.0),
            ..Default::default()
        };
        assert!(negative.validate().is_err());
    }

    #[test]
    fn json_fills_missing_fields_with_defaults() {
        let config: CodecConfiguration =
            serde_json::from_str(r#"{"sample_rate":16000,"frame_duration":"10ms"}"#).unwrap();
        assert_eq!(config.sample_rate, 16000);
        assert_eq!(config.frame_duration, FrameDuration::Ms10);
        assert_eq!(config.bitrate, 32000);
        assert_eq!(config.samples_per_frame(), 160);
    }
}
