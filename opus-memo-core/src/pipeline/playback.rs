use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use crate::codec::decoder::FrameDecoder;
use crate::codec::frame::CompressedFrame;
use crate::models::config::CodecConfiguration;
use crate::models::error::AudioError;
use crate::models::recording_result::{FinishReason, PlaybackSummary};
use crate::models::state::PlaybackState;
use crate::processing::sample_format::block_levels;
use crate::storage::frame_store::FrameStore;
use crate::traits::audio_device::{AudioDeviceProvider, OutputStream, StreamStatus};

use super::{device_failed, levels_every_n_frames, stream_format, unavailable, SharedDelegate, SharedStatus};

/// Drain attempts after the last block, one frame period each.
const DRAIN_ATTEMPTS: u32 = 50;

/// Frame store → decoder → speaker.
///
/// Each run snapshots the store's frames, opens the output device, builds a
/// fresh decoder and writes one block per frame in store order. Frames
/// appended or cleared after the run starts do not affect it. The output
/// device's backpressure paces the loop.
pub struct PlaybackPipeline {
    status: SharedStatus,
    running: Arc<AtomicBool>,
    handle: Option<thread::JoinHandle<()>>,
}

impl PlaybackPipeline {
    pub fn new(status: SharedStatus) -> Self {
        Self {
            status,
            running: Arc::new(AtomicBool::new(false)),
            handle: None,
        }
    }

    pub fn is_playing(&self) -> bool {
        self.status.lock().playback.is_playing()
    }

    /// Start a playback run. Transitions: idle → playing.
    ///
    /// An empty store completes at once without opening the device.
    pub fn start(
        &mut self,
        provider: &dyn AudioDeviceProvider,
        store: &FrameStore,
        config: &CodecConfiguration,
        delegate: SharedDelegate,
    ) -> Result<(), AudioError> {
        if self.is_playing() {
            return Err(AudioError::InvalidState("playback already running".into()));
        }
        self.reap();

        let frames = store.snapshot();
        let total = frames.len();
        if total == 0 {
            log::debug!("Nothing to play");
            if let Some(ref d) = delegate {
                d.on_playback_state_changed(&PlaybackState::Playing { position: 0, total: 0 });
                d.on_playback_state_changed(&PlaybackState::Idle);
                d.on_playback_finished(&PlaybackSummary {
                    frames_played: 0,
                    frames_concealed: 0,
                    frames_total: 0,
                    reason: FinishReason::Completed,
                });
            }
            return Ok(());
        }

        let output = provider.open_output(&stream_format(config)).map_err(unavailable)?;
        let decoder = FrameDecoder::new(config)?;

        let state = PlaybackState::Playing { position: 0, total };
        self.status.lock().playback = state;
        if let Some(ref d) = delegate {
            d.on_playback_state_changed(&state);
        }

        self.running.store(true, Ordering::SeqCst);
        let failure_delegate = delegate.clone();
        let worker = PlaybackWorker {
            output,
            decoder,
            frames,
            config: config.clone(),
            status: Arc::clone(&self.status),
            running: Arc::clone(&self.running),
            delegate,
        };

        let handle = thread::Builder::new()
            .name("opus-memo-playback".into())
            .spawn(move || worker.run())
            .map_err(|e| {
                self.abandon_start(&failure_delegate);
                AudioError::DeviceFailed(format!("failed to spawn playback thread: {}", e))
            })?;

        self.handle = Some(handle);
        log::debug!("Playback started ({} frames)", total);
        Ok(())
    }

    /// Undo a start whose worker never ran.
    fn abandon_start(&self, delegate: &SharedDelegate) {
        self.running.store(false, Ordering::SeqCst);
        self.status.lock().playback = PlaybackState::Idle;
        if let Some(ref d) = delegate {
            d.on_playback_state_changed(&PlaybackState::Idle);
        }
    }

    /// Abort the current run, discarding unplayed frames and releasing the
    /// output device. No-op when idle.
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        self.reap();
    }

    /// Block until the current run has finished on its own.
    pub fn wait(&mut self) {
        self.reap();
    }

    fn reap(&mut self) {
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                log::error!("Playback worker panicked");
            }
        }
        self.status.lock().playback = PlaybackState::Idle;
    }
}

impl Drop for PlaybackPipeline {
    fn drop(&mut self) {
        self.stop();
    }
}

struct PlaybackWorker {
    output: Box<dyn OutputStream>,
    decoder: FrameDecoder,
    frames: Vec<CompressedFrame>,
    config: CodecConfiguration,
    status: SharedStatus,
    running: Arc<AtomicBool>,
    delegate: SharedDelegate,
}

impl PlaybackWorker {
    fn run(mut self) {
        let levels_every = levels_every_n_frames(&self.config);
        let total = self.frames.len();
        let mut played = 0usize;
        let mut concealed = 0usize;

        let mut reason = FinishReason::Completed;
        for index in 0..total {
            if !self.running.load(Ordering::SeqCst) {
                reason = FinishReason::Stopped;
                break;
            }

            let block = self.decoder.decode_or_conceal(&self.frames[index]);
            if let Some(ref e) = block.concealed {
                log::warn!("Frame {} concealed: {}", index, e);
                concealed += 1;
            }
            {
                let mut s = self.status.lock();
                if block.is_concealed() {
                    s.diagnostics.frames_concealed += 1;
                } else {
                    s.diagnostics.frames_decoded += 1;
                }
            }

            match self.write_paced(&block.samples) {
                Ok(true) => {}
                Ok(false) => {
                    reason = FinishReason::Stopped;
                    break;
                }
                Err(e) => {
                    let error = device_failed(e);
                    log::error!("Output device failed: {}", error);
                    if let Some(ref d) = self.delegate {
                        d.on_error(&error);
                    }
                    reason = FinishReason::DeviceFailed;
                    break;
                }
            }
            played += 1;

            let (rms, peak) = block_levels(&block.samples);
            let levels = {
                let mut s = self.status.lock();
                s.diagnostics.blocks_written += 1;
                s.levels.output_level = rms;
                s.levels.peak_output_level = peak;
                s.playback = PlaybackState::Playing {
                    position: played,
                    total,
                };
                s.levels
            };
            if played % levels_every == 0 {
                if let Some(ref d) = self.delegate {
                    d.on_levels_updated(&levels);
                }
            }
        }

        if reason == FinishReason::Completed {
            self.drain();
        }

        let PlaybackWorker {
            output,
            status,
            running,
            delegate,
            ..
        } = self;
        drop(output);
        running.store(false, Ordering::SeqCst);
        {
            let mut s = status.lock();
            s.playback = PlaybackState::Idle;
            s.levels.output_level = 0.0;
            s.levels.peak_output_level = 0.0;
        }

        let summary = PlaybackSummary {
            frames_played: played,
            frames_concealed: concealed,
            frames_total: total,
            reason,
        };
        log::debug!(
            "Playback finished ({:?}): {}/{} frames, {} concealed",
            reason,
            played,
            total,
            concealed
        );

        if let Some(ref d) = delegate {
            d.on_playback_state_changed(&PlaybackState::Idle);
            d.on_playback_finished(&summary);
        }
    }

    /// Write one block, retrying on timeout while running.
    ///
    /// Returns `Ok(false)` if a stop request arrived first.
    fn write_paced(&mut self, samples: &[i16]) -> Result<bool, AudioError> {
        let timeout = self.config.frame_period();
        loop {
            match self.output.write_block(samples, timeout)? {
                StreamStatus::Ready => return Ok(true),
                StreamStatus::TimedOut => {
                    self.status.lock().diagnostics.output_timeouts += 1;
                    if !self.running.load(Ordering::SeqCst) {
                        return Ok(false);
                    }
                }
            }
        }
    }

    fn drain(&mut self) {
        let timeout = self.config.frame_period();
        for _ in 0..DRAIN_ATTEMPTS {
            if !self.running.load(Ordering::SeqCst) {
                return;
            }
            match self.output.drain(timeout) {
                Ok(StreamStatus::Ready) => return,
                Ok(StreamStatus::TimedOut) => {}
                Err(e) => {
                    log::warn!("Failed to drain output: {}", e);
                    return;
                }
            }
        }
        log::warn!("Output did not drain in time");
    }
}
