/// Direction of an audio device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceDirection {
    Input,
    Output,
}

/// An audio device available for capture or playback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioDevice {
    pub id: String,
    pub name: String,
    pub direction: DeviceDirection,
    pub is_default: bool,
}

/// Format the core asks a device stream for.
///
/// Backends convert from whatever the hardware runs at; the pipelines only
/// ever see mono `i16` blocks of exactly `block_len` samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamFormat {
    pub sample_rate: u32,
    pub channels: u16,
    pub block_len: usize,
}

/// Real-time level metering (RMS and peak, 0.0–1.0).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AudioLevels {
    pub input_level: f32,
    pub output_level: f32,
    pub peak_input_level: f32,
    pub peak_output_level: f32,
}

/// Counters for debugging capture and playback runs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PipelineDiagnostics {
    pub blocks_captured: u64,
    pub frames_encoded: u64,
    pub encoded_bytes: u64,
    pub encode_failures: u64,
    pub input_timeouts: u64,
    pub frames_decoded: u64,
    pub frames_concealed: u64,
    pub blocks_written: u64,
    pub output_timeouts: u64,
}

impl PipelineDiagnostics {
    /// Every frame handed to the decoder, concealed or not.
    pub fn decode_calls(&self) -> u64 {
        self.frames_decoded + self.frames_concealed
    }
}
