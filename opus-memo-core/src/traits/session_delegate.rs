use crate::models::audio_models::AudioLevels;
use crate::models::error::AudioError;
use crate::models::recording_result::{PlaybackSummary, RecordingSummary};
use crate::models::state::{CaptureState, PlaybackState};

/// Event delegate for session notifications.
///
/// All methods are called from the pipeline worker threads, not the caller's
/// thread. Implementations should marshal to a UI thread if needed and must
/// not call back into the session.
pub trait SessionDelegate: Send + Sync {
    /// Called when the capture pipeline changes state.
    fn on_capture_state_changed(&self, state: &CaptureState);

    /// Called when the playback pipeline changes state.
    fn on_playback_state_changed(&self, state: &PlaybackState);

    /// Called with updated levels, at most a few times per second.
    fn on_levels_updated(&self, levels: &AudioLevels);

    /// Called once when a device fails mid-run.
    fn on_error(&self, error: &AudioError);

    /// Called when a capture run ends, however it ended.
    fn on_capture_finished(&self, summary: &RecordingSummary);

    /// Called when a playback run ends, however it ended.
    fn on_playback_finished(&self, summary: &PlaybackSummary);
}
