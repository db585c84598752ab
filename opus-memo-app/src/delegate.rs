use parking_lot::Mutex;
use serde::Serialize;

use opus_memo_core::{
    AudioError, AudioLevels, CaptureState, PlaybackState, PlaybackSummary, RecordingSummary, SessionDelegate,
};

/// SessionDelegate that logs session events and, optionally, prints them
/// as JSON lines for a wrapping process to consume.
pub struct ConsoleDelegate {
    emit_events: bool,
    recording: Mutex<Option<RecordingSummary>>,
    playback: Mutex<Option<PlaybackSummary>>,
    errors: Mutex<Vec<String>>,
}

impl ConsoleDelegate {
    pub fn new(emit_events: bool) -> Self {
        Self {
            emit_events,
            recording: Mutex::new(None),
            playback: Mutex::new(None),
            errors: Mutex::new(Vec::new()),
        }
    }

    pub fn recording(&self) -> Option<RecordingSummary> {
        self.recording.lock().clone()
    }

    pub fn playback(&self) -> Option<PlaybackSummary> {
        self.playback.lock().clone()
    }

    pub fn errors(&self) -> Vec<String> {
        self.errors.lock().clone()
    }

    fn emit<T: Serialize>(&self, event: &'static str, payload: T) {
        if !self.emit_events {
            return;
        }
        match serde_json::to_string(&Event { event, payload }) {
            Ok(line) => println!("{}", line),
            Err(e) => log::warn!("Failed to serialize {} event: {}", event, e),
        }
    }
}

// -- Event payloads --

#[derive(Serialize)]
struct Event<T> {
    event: &'static str,
    payload: T,
}

#[derive(Debug, PartialEq, Serialize)]
struct StateChangedPayload {
    pipeline: &'static str,
    state: &'static str,
    frames: usize,
    duration_secs: f64,
}

#[derive(Serialize)]
struct LevelsPayload {
    input_level: f32,
    output_level: f32,
    peak_input_level: f32,
    peak_output_level: f32,
}

#[derive(Serialize)]
struct ErrorPayload {
    message: String,
}

fn capture_payload(state: &CaptureState) -> StateChangedPayload {
    let (name, frames, duration_secs) = match state {
        CaptureState::Idle => ("idle", 0, 0.0),
        CaptureState::Capturing { frames, duration_secs } => ("capturing", *frames, *duration_secs),
    };
    StateChangedPayload {
        pipeline: "capture",
        state: name,
        frames,
        duration_secs,
    }
}

fn playback_payload(state: &PlaybackState) -> StateChangedPayload {
    let (name, frames) = match state {
        PlaybackState::Idle => ("idle", 0),
        PlaybackState::Playing { position, .. } => ("playing", *position),
    };
    StateChangedPayload {
        pipeline: "playback",
        state: name,
        frames,
        duration_secs: 0.0,
    }
}

impl SessionDelegate for ConsoleDelegate {
    fn on_capture_state_changed(&self, state: &CaptureState) {
        log::debug!("Capture state: {:?}", state);
        self.emit("state-changed", capture_payload(state));
    }

    fn on_playback_state_changed(&self, state: &PlaybackState) {
        log::debug!("Playback state: {:?}", state);
        self.emit("state-changed", playback_payload(state));
    }

    fn on_levels_updated(&self, levels: &AudioLevels) {
        log::trace!(
            "Levels in {:.3} (peak {:.3}) out {:.3} (peak {:.3})",
            levels.input_level,
            levels.peak_input_level,
            levels.output_level,
            levels.peak_output_level
        );
        self.emit(
            "levels-updated",
            LevelsPayload {
                input_level: levels.input_level,
                output_level: levels.output_level,
                peak_input_level: levels.peak_input_level,
                peak_output_level: levels.peak_output_level,
            },
        );
    }

    fn on_error(&self, error: &AudioError) {
        if error.is_device_error() {
            log::error!("Device error: {}", error);
        } else {
            log::warn!("Session error: {}", error);
        }
        self.errors.lock().push(error.to_string());
        self.emit(
            "error",
            ErrorPayload {
                message: error.to_string(),
            },
        );
    }

    fn on_capture_finished(&self, summary: &RecordingSummary) {
        log::info!(
            "Recorded {} frames ({:.2}s, {} bytes, {:.0} bit/s), {:?}",
            summary.frame_count,
            summary.duration_secs,
            summary.total_bytes,
            summary.average_bitrate(),
            summary.reason
        );
        *self.recording.lock() = Some(summary.clone());
        self.emit("capture-finished", summary);
    }

    fn on_playback_finished(&self, summary: &PlaybackSummary) {
        log::info!(
            "Played {}/{} frames ({} concealed), {:?}",
            summary.frames_played,
            summary.frames_total,
            summary.frames_concealed,
            summary.reason
        );
        *self.playback.lock() = Some(summary.clone());
        self.emit("playback-finished", summary);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use opus_memo_core::FinishReason;

    #[test]
    fn capture_state_payload() {
        let payload = capture_payload(&CaptureState::Capturing {
            frames: 25,
            duration_secs: 0.5,
        });
        assert_eq!(payload.state, "capturing");
        assert_eq!(payload.frames, 25);
        assert_eq!(capture_payload(&CaptureState::Idle).state, "idle");
    }

    #[test]
    fn playback_state_payload() {
        let payload = playback_payload(&PlaybackState::Playing { position: 3, total: 10 });
        assert_eq!(payload.pipeline, "playback");
        assert_eq!(payload.frames, 3);
    }

    #[test]
    fn keeps_last_summaries_and_errors() {
        let delegate = ConsoleDelegate::new(false);
        delegate.on_error(&AudioError::DeviceFailed("gone".into()));
        delegate.on_playback_finished(&PlaybackSummary {
            frames_played: 4,
            frames_concealed: 1,
            frames_total: 4,
            reason: FinishReason::Completed,
        });

        assert_eq!(delegate.errors().len(), 1);
        assert_eq!(delegate.playback().map(|p| p.frames_played), Some(4));
        assert!(delegate.recording().is_none());
    }

    #[test]
    fn event_line_shape() {
        let line = serde_json::to_string(&Event {
            event: "error",
            payload: ErrorPayload { message: "x".into() },
        })
        .unwrap();
        assert_eq!(line, r#"{"event":"error","payload":{"message":"x"}}"#);
    }
}
