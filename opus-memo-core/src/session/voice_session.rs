use std::sync::Arc;

use parking_lot::Mutex;

use crate::models::audio_models::{AudioDevice, AudioLevels, PipelineDiagnostics};
use crate::models::config::CodecConfiguration;
use crate::models::error::AudioError;
use crate::models::state::{CaptureState, PlaybackState};
use crate::pipeline::capture::CapturePipeline;
use crate::pipeline::playback::PlaybackPipeline;
use crate::pipeline::{PipelineStatus, SharedStatus};
use crate::storage::frame_store::FrameStore;
use crate::traits::audio_device::AudioDeviceProvider;
use crate::traits::session_delegate::SessionDelegate;

/// Session controller: the surface the application layer drives.
///
/// Generic over the device backend via `AudioDeviceProvider`. Owns the frame
/// store for the current recording cycle and lends it to the pipelines:
/// ```text
/// start_recording → [CapturePipeline] → FrameStore
/// start_playback  → FrameStore → [PlaybackPipeline]
/// ```
///
/// Recording and playback may overlap; a playback run plays a snapshot of
/// the frames that existed when it started, even if a new recording clears
/// the store meanwhile.
pub struct VoiceSession<P: AudioDeviceProvider> {
    provider: P,
    config: CodecConfiguration,
    store: Arc<FrameStore>,
    status: SharedStatus,
    capture: CapturePipeline,
    playback: PlaybackPipeline,
    delegate: Option<Arc<dyn SessionDelegate>>,
}

impl<P: AudioDeviceProvider> VoiceSession<P> {
    pub fn new(provider: P, config: CodecConfiguration) -> Result<Self, AudioError> {
        config.validate().map_err(AudioError::ConfigurationFailed)?;

        let status: SharedStatus = Arc::new(Mutex::new(PipelineStatus::default()));
        Ok(Self {
            provider,
            config,
            store: Arc::new(FrameStore::new()),
            capture: CapturePipeline::new(Arc::clone(&status)),
            playback: PlaybackPipeline::new(Arc::clone(&status)),
            status,
            delegate: None,
        })
    }

    pub fn set_delegate(&mut self, delegate: Arc<dyn SessionDelegate>) {
        self.delegate = Some(delegate);
    }

    pub fn config(&self) -> &CodecConfiguration {
        &self.config
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Begin a new recording cycle. Transitions capture: idle → capturing.
    ///
    /// Previous frames are discarded once the input device is open. If it
    /// cannot be opened, returns `DeviceUnavailable` and keeps them.
    pub fn start_recording(&mut self) -> Result<(), AudioError> {
        log::debug!("Starting recording");
        self.capture.start(
            &self.provider,
            Arc::clone(&self.store),
            &self.config,
            self.delegate.clone(),
        )
    }

    /// End the recording cycle. No-op when not recording.
    pub fn stop_recording(&mut self) {
        log::debug!("Stopping recording");
        self.capture.stop();
    }

    /// Play the recorded frames in order. Transitions playback: idle → playing.
    pub fn start_playback(&mut self) -> Result<(), AudioError> {
        log::debug!("Starting playback of {} frames", self.store.len());
        self.playback.start(
            &self.provider,
            &self.store,
            &self.config,
            self.delegate.clone(),
        )
    }

    /// Abort playback. No-op when not playing.
    pub fn stop_playback(&mut self) {
        log::debug!("Stopping playback");
        self.playback.stop();
    }

    /// Block until the current playback run finishes.
    pub fn wait_for_playback(&mut self) {
        self.playback.wait();
    }

    /// Stop both pipelines and release both devices, whether or not they
    /// were ever started.
    pub fn shutdown(&mut self) {
        self.capture.stop();
        self.playback.stop();
    }

    pub fn is_recording(&self) -> bool {
        self.capture.is_capturing()
    }

    pub fn is_playing(&self) -> bool {
        self.playback.is_playing()
    }

    pub fn capture_state(&self) -> CaptureState {
        self.status.lock().capture
    }

    pub fn playback_state(&self) -> PlaybackState {
        self.status.lock().playback
    }

    /// Read-only view of the current recording cycle.
    pub fn frame_store(&self) -> &FrameStore {
        &self.store
    }

    pub fn current_levels(&self) -> AudioLevels {
        self.status.lock().levels
    }

    pub fn diagnostics(&self) -> PipelineDiagnostics {
        self.status.lock().diagnostics.clone()
    }

    pub fn input_device(&self) -> Option<AudioDevice> {
        self.provider.input_info()
    }

    pub fn output_device(&self) -> Option<AudioDevice> {
        self.provider.output_info()
    }
}

impl<P: AudioDeviceProvider> Drop for VoiceSession<P> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::devices::memory::MemoryDeviceProvider;

    #[test]
    fn rejects_invalid_configuration() {
        let config = CodecConfiguration {
            sample_rate: 22050,
            ..Default::default()
        };
        let result = VoiceSession::new(MemoryDeviceProvider::new(), config);
        assert!(matches!(result, Err(AudioError::ConfigurationFailed(_))));
    }

    #[test]
    fn shutdown_without_start_is_safe() {
        let mut session = VoiceSession::new(MemoryDeviceProvider::new(), CodecConfiguration::default()).unwrap();
        session.shutdown();
        session.shutdown();
        assert!(!session.is_recording());
        assert!(!session.is_playing());
        assert!(session.capture_state().is_idle());
        assert!(session.playback_state().is_idle());
    }

    #[test]
    fn exposes_device_info() {
        let session = VoiceSession::new(MemoryDeviceProvider::new(), CodecConfiguration::default()).unwrap();
        assert_eq!(session.input_device().unwrap().id, "memory-input");
        assert_eq!(session.output_device().unwrap().id, "memory-output");
    }
}
