use serde::{Deserialize, Serialize};

/// Why a capture or playback run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    /// Playback reached the last frame.
    Completed,
    /// The caller asked the pipeline to stop.
    Stopped,
    /// Capture hit the configured maximum duration.
    LimitReached,
    /// The device failed mid-run.
    DeviceFailed,
}

/// Summary of one capture run, emitted when it ends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordingSummary {
    pub id: String,
    pub created_at: String,
    pub frame_count: usize,
    pub total_bytes: usize,
    pub duration_secs: f64,
    pub sample_rate: u32,
    pub checksum: String,
    pub reason: FinishReason,
}

impl RecordingSummary {
    pub fn new(
        frame_count: usize,
        total_bytes: usize,
        duration_secs: f64,
        sample_rate: u32,
        checksum: String,
        reason: FinishReason,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            created_at: chrono::Utc::now().to_rfc3339(),
            frame_count,
            total_bytes,
            duration_secs,
            sample_rate,
            checksum,
            reason,
        }
    }

    /// Average encoded bitrate over the run, in bits per second.
    pub fn average_bitrate(&self) -> f64 {
        if self.duration_secs <= 0.0 {
            return 0.0;
        }
        self.total_bytes as f64 * 8.0 / self.duration_secs
    }
}

/// Summary of one playback run, emitted when it ends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaybackSummary {
    pub frames_played: usize,
    pub frames_concealed: usize,
    pub frames_total: usize,
    pub reason: FinishReason,
}
