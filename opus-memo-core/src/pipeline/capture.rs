use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use crate::codec::encoder::FrameEncoder;
use crate::models::config::CodecConfiguration;
use crate::models::error::AudioError;
use crate::models::recording_result::{FinishReason, RecordingSummary};
use crate::models::state::CaptureState;
use crate::processing::sample_format::block_levels;
use crate::storage::frame_store::FrameStore;
use crate::traits::audio_device::{AudioDeviceProvider, InputStream, StreamStatus};

use super::{device_failed, levels_every_n_frames, stream_format, unavailable, SharedDelegate, SharedStatus};

/// Microphone → encoder → frame store.
///
/// Each run opens the input device, builds a fresh encoder and appends to
/// the store from a dedicated worker until stopped, until the configured
/// maximum duration, or until the device fails.
pub struct CapturePipeline {
    status: SharedStatus,
    running: Arc<AtomicBool>,
    handle: Option<thread::JoinHandle<()>>,
}

impl CapturePipeline {
    pub fn new(status: SharedStatus) -> Self {
        Self {
            status,
            running: Arc::new(AtomicBool::new(false)),
            handle: None,
        }
    }

    pub fn is_capturing(&self) -> bool {
        self.status.lock().capture.is_capturing()
    }

    /// Start a capture run. Transitions: idle → capturing.
    ///
    /// On `DeviceUnavailable` the pipeline stays idle and `store` is left
    /// untouched. Otherwise `store` is cleared before the first append.
    pub fn start(
        &mut self,
        provider: &dyn AudioDeviceProvider,
        store: Arc<FrameStore>,
        config: &CodecConfiguration,
        delegate: SharedDelegate,
    ) -> Result<(), AudioError> {
        if self.is_capturing() {
            return Err(AudioError::InvalidState("capture already running".into()));
        }
        self.reap();

        let input = provider.open_input(&stream_format(config)).map_err(unavailable)?;
        let encoder = FrameEncoder::new(config)?;

        store.clear();
        let state = CaptureState::Capturing {
            frames: 0,
            duration_secs: 0.0,
        };
        self.status.lock().capture = state;
        if let Some(ref d) = delegate {
            d.on_capture_state_changed(&state);
        }

        self.running.store(true, Ordering::SeqCst);
        let failure_delegate = delegate.clone();
        let worker = CaptureWorker {
            input,
            encoder,
            store,
            config: config.clone(),
            status: Arc::clone(&self.status),
            running: Arc::clone(&self.running),
            delegate,
        };

        let handle = thread::Builder::new()
            .name("opus-memo-capture".into())
            .spawn(move || worker.run())
            .map_err(|e| {
                self.abandon_start(&failure_delegate);
                AudioError::DeviceFailed(format!("failed to spawn capture thread: {}", e))
            })?;

        self.handle = Some(handle);
        log::debug!("Capture started");
        Ok(())
    }

    /// Undo a start whose worker never ran.
    fn abandon_start(&self, delegate: &SharedDelegate) {
        self.running.store(false, Ordering::SeqCst);
        self.status.lock().capture = CaptureState::Idle;
        if let Some(ref d) = delegate {
            d.on_capture_state_changed(&CaptureState::Idle);
        }
    }

    /// Stop the current run and release the input device.
    ///
    /// Once this returns no further frame is appended. No-op when idle.
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        self.reap();
    }

    fn reap(&mut self) {
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                log::error!("Capture worker panicked");
            }
        }
        self.status.lock().capture = CaptureState::Idle;
    }
}

impl Drop for CapturePipeline {
    fn drop(&mut self) {
        self.stop();
    }
}

struct CaptureWorker {
    input: Box<dyn InputStream>,
    encoder: FrameEncoder,
    store: Arc<FrameStore>,
    config: CodecConfiguration,
    status: SharedStatus,
    running: Arc<AtomicBool>,
    delegate: SharedDelegate,
}

impl CaptureWorker {
    fn run(self) {
        let CaptureWorker {
            mut input,
            mut encoder,
            store,
            config,
            status,
            running,
            delegate,
        } = self;

        let timeout = config.frame_period();
        let max_frames = config.max_frames();
        let levels_every = levels_every_n_frames(&config);
        let mut block = vec![0i16; config.samples_per_frame()];
        let mut frames = 0usize;
        let mut bytes = 0usize;

        let reason = loop {
            if !running.load(Ordering::SeqCst) {
                break FinishReason::Stopped;
            }
            if max_frames.is_some_and(|max| frames >= max) {
                log::info!("Capture reached maximum duration ({} frames)", frames);
                break FinishReason::LimitReached;
            }

            match input.read_block(&mut block, timeout) {
                Ok(StreamStatus::Ready) => {}
                Ok(StreamStatus::TimedOut) => {
                    status.lock().diagnostics.input_timeouts += 1;
                    continue;
                }
                Err(e) => {
                    let error = device_failed(e);
                    log::error!("Input device failed: {}", error);
                    if let Some(ref d) = delegate {
                        d.on_error(&error);
                    }
                    break FinishReason::DeviceFailed;
                }
            }

            // A block that arrives after stop is dropped, never encoded.
            if !running.load(Ordering::SeqCst) {
                break FinishReason::Stopped;
            }

            let encoded = encoder.encode(&block);
            let appended = encoded.is_ok();
            let (rms, peak) = block_levels(&block);
            let levels = {
                let mut s = status.lock();
                s.diagnostics.blocks_captured += 1;
                match encoded {
                    Ok(frame) => {
                        s.diagnostics.frames_encoded += 1;
                        s.diagnostics.encoded_bytes += frame.len() as u64;
                        bytes += frame.len();
                        store.append(frame);
                        frames += 1;
                    }
                    Err(ref e) => {
                        s.diagnostics.encode_failures += 1;
                        log::error!("Failed to encode block: {}", e);
                    }
                }
                s.levels.input_level = rms;
                s.levels.peak_input_level = peak;
                s.capture = CaptureState::Capturing {
                    frames,
                    duration_secs: config.duration_of(frames),
                };
                s.levels
            };

            if levels_due(appended, frames, levels_every) {
                if let Some(ref d) = delegate {
                    d.on_levels_updated(&levels);
                }
            }
        };

        drop(input);
        running.store(false, Ordering::SeqCst);
        {
            let mut s = status.lock();
            s.capture = CaptureState::Idle;
            s.levels.input_level = 0.0;
            s.levels.peak_input_level = 0.0;
        }

        let summary = RecordingSummary::new(
            frames,
            bytes,
            config.duration_of(frames),
            config.sample_rate,
            store.checksum(),
            reason,
        );
        log::debug!(
            "Capture finished ({:?}): {} frames, {} bytes, {:.2}s",
            reason,
            summary.frame_count,
            summary.total_bytes,
            summary.duration_secs
        );

        if let Some(ref d) = delegate {
            d.on_capture_state_changed(&CaptureState::Idle);
            d.on_capture_finished(&summary);
        }
    }
}

/// Levels go out every `every` stored frames, never on a failed encode.
fn levels_due(appended: bool, frames: usize, every: usize) -> bool {
    appended && frames % every == 0
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, Instant};

    use parking_lot::Mutex;

    use super::*;
    use crate::devices::memory::MemoryDeviceProvider;
    use crate::pipeline::PipelineStatus;

    fn wait_until(mut done: impl FnMut() -> bool) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while !done() {
            assert!(Instant::now() < deadline, "timed out waiting");
            thread::sleep(Duration::from_millis(2));
        }
    }

    fn pipeline() -> CapturePipeline {
        CapturePipeline::new(Arc::new(Mutex::new(PipelineStatus::default())))
    }

    fn blocks(config: &CodecConfiguration, count: usize) -> Vec<Vec<i16>> {
        (0..count)
            .map(|b| vec![(b as i16 + 1) * 100; config.samples_per_frame()])
            .collect()
    }

    #[test]
    fn captures_every_queued_block() {
        let config = CodecConfiguration::default();
        let provider = MemoryDeviceProvider::with_input_blocks(blocks(&config, 10));
        let store = Arc::new(FrameStore::new());
        let mut capture = pipeline();

        capture.start(&provider, Arc::clone(&store), &config, None).unwrap();
        assert!(capture.is_capturing());
        wait_until(|| store.len() == 10);
        capture.stop();

        assert!(!capture.is_capturing());
        assert_eq!(store.len(), 10);
        assert_eq!(provider.inputs_open(), 0);
    }

    #[test]
    fn unavailable_device_leaves_store_untouched() {
        let config = CodecConfiguration::default();
        let provider = MemoryDeviceProvider::new();
        provider.set_input_available(false);
        let store = Arc::new(FrameStore::new());
        store.append(crate::codec::CompressedFrame::from_packet(&[1, 2]).unwrap());
        let mut capture = pipeline();

        let err = capture.start(&provider, Arc::clone(&store), &config, None).unwrap_err();
        assert!(matches!(err, AudioError::DeviceUnavailable(_)));
        assert!(!capture.is_capturing());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn stop_when_idle_is_a_no_op() {
        let mut capture = pipeline();
        capture.stop();
        capture.stop();
        assert!(!capture.is_capturing());
    }

    #[test]
    fn start_twice_is_rejected() {
        let config = CodecConfiguration::default();
        let provider = MemoryDeviceProvider::new();
        let store = Arc::new(FrameStore::new());
        let mut capture = pipeline();

        capture.start(&provider, Arc::clone(&store), &config, None).unwrap();
        let err = capture.start(&provider, store, &config, None).unwrap_err();
        assert!(matches!(err, AudioError::InvalidState(_)));
        capture.stop();
        assert_eq!(provider.inputs_opened(), 1);
        assert_eq!(provider.inputs_open(), 0);
    }

    #[test]
    fn stops_itself_at_maximum_duration() {
        let config = CodecConfiguration {
            max_duration_secs: Some(0.1),
            ..Default::default()
        };
        let provider = MemoryDeviceProvider::with_input_blocks(blocks(&config, 20));
        let store = Arc::new(FrameStore::new());
        let mut capture = pipeline();

        capture.start(&provider, Arc::clone(&store), &config, None).unwrap();
        wait_until(|| !capture.is_capturing());

        assert_eq!(store.len(), 5);
        assert_eq!(provider.inputs_open(), 0);
        capture.stop();
    }

    #[test]
    fn device_failure_stops_capture_and_releases_device() {
        let config = CodecConfiguration::default();
        let provider = MemoryDeviceProvider::with_input_blocks(blocks(&config, 10));
        provider.fail_input_after(3);
        let store = Arc::new(FrameStore::new());
        let mut capture = pipeline();

        capture.start(&provider, Arc::clone(&store), &config, None).unwrap();
        wait_until(|| !capture.is_capturing());

        assert_eq!(store.len(), 3);
        assert_eq!(provider.inputs_open(), 0);
    }

    #[test]
    fn levels_only_follow_stored_frames() {
        assert!(!levels_due(false, 0, 5));
        assert!(!levels_due(false, 10, 5));
        assert!(!levels_due(true, 4, 5));
        assert!(levels_due(true, 5, 5));
        assert!(levels_due(true, 1, 1));
    }

    #[derive(Default)]
    struct StateLog {
        states: Mutex<Vec<CaptureState>>,
    }

    impl crate::traits::session_delegate::SessionDelegate for StateLog {
        fn on_capture_state_changed(&self, state: &CaptureState) {
            self.states.lock().push(*state);
        }

        fn on_playback_state_changed(&self, _state: &crate::models::state::PlaybackState) {}

        fn on_levels_updated(&self, _levels: &crate::models::audio_models::AudioLevels) {}

        fn on_error(&self, _error: &AudioError) {}

        fn on_capture_finished(&self, _summary: &RecordingSummary) {}

        fn on_playback_finished(&self, _summary: &crate::models::recording_result::PlaybackSummary) {}
    }

    #[test]
    fn abandoned_start_reports_idle() {
        let capture = pipeline();
        let log = Arc::new(StateLog::default());
        capture.status.lock().capture = CaptureState::Capturing {
            frames: 0,
            duration_secs: 0.0,
        };
        capture.running.store(true, Ordering::SeqCst);

        let delegate: Arc<dyn crate::traits::session_delegate::SessionDelegate> = log.clone();
        capture.abandon_start(&Some(delegate));

        assert!(!capture.is_capturing());
        assert!(!capture.running.load(Ordering::SeqCst));
        assert_eq!(log.states.lock().as_slice(), &[CaptureState::Idle]);
    }
}
