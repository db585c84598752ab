//! Speaker playback through cpal.
//!
//! `write_block` resamples each decoded block to the device rate and queues
//! it, waiting for room when the queue is full. The device callback pulls
//! from the queue and fans the mono signal out to every device channel,
//! writing silence when the queue runs dry.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use cpal::traits::{DeviceTrait, StreamTrait};
use cpal::{FromSample, Sample, SizedSample};
use parking_lot::{Condvar, Mutex};

use opus_memo_core::processing::sample_format::{i16_to_f32, LinearResampler};
use opus_memo_core::{AudioError, DeviceDirection, OutputStream, RingBuffer, StreamFormat, StreamStatus};

use crate::device_enumerator::find_device;
use crate::error::CpalError;
use crate::stream_thread::StreamThread;

/// Blocks the output queue holds ahead of the device.
const OUTPUT_QUEUE_BLOCKS: usize = 4;

/// Mono device-rate samples waiting for the device callback.
pub(crate) struct OutputQueue {
    buffer: Mutex<RingBuffer<f32>>,
    space: Condvar,
    failure: Mutex<Option<String>>,
    underruns: AtomicU64,
}

impl OutputQueue {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            buffer: Mutex::new(RingBuffer::new(capacity)),
            space: Condvar::new(),
            failure: Mutex::new(None),
            underruns: AtomicU64::new(0),
        }
    }

    pub(crate) fn fail(&self, message: String) {
        *self.failure.lock() = Some(message);
        self.space.notify_all();
    }

    pub(crate) fn underruns(&self) -> u64 {
        self.underruns.load(Ordering::Relaxed)
    }

    fn check_failure(&self) -> Result<(), AudioError> {
        match self.failure.lock().clone() {
            Some(message) => Err(AudioError::DeviceFailed(message)),
            None => Ok(()),
        }
    }

    /// Queue all of `samples` or nothing.
    pub(crate) fn push(&self, samples: &[f32], timeout: Duration) -> Result<StreamStatus, AudioError> {
        let deadline = Instant::now() + timeout;
        let mut buffer = self.buffer.lock();
        if samples.len() > buffer.capacity() {
            return Err(AudioError::InvalidState(format!(
                "block of {} samples exceeds output queue of {}",
                samples.len(),
                buffer.capacity()
            )));
        }
        loop {
            self.check_failure()?;
            if buffer.free() >= samples.len() {
                buffer.write_within_capacity(samples);
                return Ok(StreamStatus::Ready);
            }
            if self.space.wait_until(&mut buffer, deadline).timed_out() && buffer.free() < samples.len() {
                return Ok(StreamStatus::TimedOut);
            }
        }
    }

    /// Fill `out` from the queue, zero-filling whatever is missing.
    pub(crate) fn pull(&self, out: &mut [f32]) -> usize {
        let read = self.buffer.lock().read_into(out);
        if read < out.len() {
            out[read..].fill(0.0);
            if read > 0 {
                self.underruns.fetch_add(1, Ordering::Relaxed);
            }
        }
        self.space.notify_all();
        read
    }

    pub(crate) fn wait_empty(&self, timeout: Duration) -> Result<StreamStatus, AudioError> {
        let deadline = Instant::now() + timeout;
        let mut buffer = self.buffer.lock();
        loop {
            self.check_failure()?;
            if buffer.is_empty() {
                return Ok(StreamStatus::Ready);
            }
            if self.space.wait_until(&mut buffer, deadline).timed_out() && !buffer.is_empty() {
                return Ok(StreamStatus::TimedOut);
            }
        }
    }
}

/// Open output stream on a cpal device.
pub struct CpalOutputStream {
    queue: Arc<OutputQueue>,
    resampler: LinearResampler,
    // Resampled block awaiting a retry after a timed out write.
    pending: Option<Vec<f32>>,
    device_name: String,
    _thread: StreamThread,
}

impl CpalOutputStream {
    pub(crate) fn open(host_id: cpal::HostId, device: Option<String>, format: StreamFormat) -> Result<Self, AudioError> {
        let (thread, (queue, device_name, device_rate)) = StreamThread::spawn("opus-memo-output-device", move || {
            let host = cpal::host_from_id(host_id)?;
            let device = find_device(&host, DeviceDirection::Output, device.as_deref())?;
            let name = device.name().unwrap_or_else(|_| "Unknown Speaker".into());
            let supported = device.default_output_config()?;
            let config = supported.config();
            log::info!(
                "Opening output '{}': {} Hz, {} ch, {:?}",
                name,
                config.sample_rate.0,
                config.channels,
                supported.sample_format()
            );

            let device_rate = config.sample_rate.0;
            let queue = Arc::new(OutputQueue::new(queue_capacity(format, device_rate)));
            let stream = match supported.sample_format() {
                cpal::SampleFormat::F32 => build_output::<f32>(&device, &config, &queue)?,
                cpal::SampleFormat::I16 => build_output::<i16>(&device, &config, &queue)?,
                cpal::SampleFormat::U16 => build_output::<u16>(&device, &config, &queue)?,
                other => return Err(CpalError::UnsupportedFormat(format!("{:?}", other))),
            };
            stream.play()?;
            Ok((stream, (queue, name, device_rate)))
        })?;

        Ok(Self {
            queue,
            resampler: LinearResampler::new(format.sample_rate as f64, device_rate as f64),
            pending: None,
            device_name,
            _thread: thread,
        })
    }

    pub fn device_name(&self) -> &str {
        &self.device_name
    }
}

impl OutputStream for CpalOutputStream {
    fn write_block(&mut self, block: &[i16], timeout: Duration) -> Result<StreamStatus, AudioError> {
        // A timed out write is retried with the same block, which must not
        // advance the resampler twice.
        let samples = match self.pending.take() {
            Some(samples) => samples,
            None => self.resampler.process(&i16_to_f32(block)),
        };
        let status = self.queue.push(&samples, timeout)?;
        if status == StreamStatus::TimedOut {
            self.pending = Some(samples);
        }
        Ok(status)
    }

    fn drain(&mut self, timeout: Duration) -> Result<StreamStatus, AudioError> {
        self.queue.wait_empty(timeout)
    }
}

impl Drop for CpalOutputStream {
    fn drop(&mut self) {
        let underruns = self.queue.underruns();
        if underruns > 0 {
            log::debug!("Output '{}' underran {} times", self.device_name, underruns);
        }
    }
}

/// Queue size in device-rate samples: a few blocks after resampling.
fn queue_capacity(format: StreamFormat, device_rate: u32) -> usize {
    let resampled = (format.block_len as u64 * device_rate as u64).div_ceil(format.sample_rate.max(1) as u64);
    resampled as usize * OUTPUT_QUEUE_BLOCKS
}

fn build_output<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    queue: &Arc<OutputQueue>,
) -> Result<cpal::Stream, CpalError>
where
    T: SizedSample + FromSample<f32>,
{
    let channels = config.channels as usize;
    let data_queue = Arc::clone(queue);
    let error_queue = Arc::clone(queue);
    let mut mono: Vec<f32> = Vec::new();

    let stream = device.build_output_stream(
        config,
        move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
            mono.resize(data.len() / channels.max(1), 0.0);
            data_queue.pull(&mut mono);
            fan_out(&mono, data, channels);
        },
        move |err| match err {
            cpal::StreamError::DeviceNotAvailable => {
                log::error!("Output device disappeared");
                error_queue.fail(err.to_string());
            }
            other => log::warn!("Output stream error: {}", other),
        },
        None,
    )?;
    Ok(stream)
}

/// Copy each mono sample to every channel of the interleaved device buffer.
fn fan_out<T>(mono: &[f32], data: &mut [T], channels: usize)
where
    T: Sample + FromSample<f32>,
{
    for (frame, &sample) in data.chunks_mut(channels.max(1)).zip(mono) {
        let value = T::from_sample(sample);
        frame.fill(value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn push_waits_for_space() {
        let queue = Arc::new(OutputQueue::new(8));
        assert_eq!(queue.push(&[0.1; 6], Duration::from_millis(1)).unwrap(), StreamStatus::Ready);
        assert_eq!(queue.push(&[0.2; 4], Duration::from_millis(10)).unwrap(), StreamStatus::TimedOut);

        let consumer = Arc::clone(&queue);
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            let mut out = [0.0f32; 4];
            consumer.pull(&mut out);
        });
        let status = queue.push(&[0.2; 4], Duration::from_secs(5)).unwrap();
        handle.join().unwrap();

        assert_eq!(status, StreamStatus::Ready);
    }

    #[test]
    fn timed_out_push_queues_nothing() {
        let queue = OutputQueue::new(4);
        queue.push(&[0.5; 3], Duration::from_millis(1)).unwrap();
        queue.push(&[0.7; 3], Duration::from_millis(1)).unwrap();

        let mut out = [0.0f32; 4];
        assert_eq!(queue.pull(&mut out), 3);
        assert_eq!(out, [0.5, 0.5, 0.5, 0.0]);
    }

    #[test]
    fn underrun_fills_silence() {
        let queue = OutputQueue::new(16);
        queue.push(&[0.25; 2], Duration::from_millis(1)).unwrap();

        let mut out = [1.0f32; 5];
        assert_eq!(queue.pull(&mut out), 2);
        assert_eq!(out, [0.25, 0.25, 0.0, 0.0, 0.0]);
        assert_eq!(queue.underruns(), 1);
    }

    #[test]
    fn oversized_block_is_rejected() {
        let queue = OutputQueue::new(4);
        let err = queue.push(&[0.0; 5], Duration::from_millis(1)).unwrap_err();
        assert!(matches!(err, AudioError::InvalidState(_)));
    }

    #[test]
    fn wait_empty_after_device_consumes() {
        let queue = Arc::new(OutputQueue::new(8));
        queue.push(&[0.1; 8], Duration::from_millis(1)).unwrap();
        assert_eq!(queue.wait_empty(Duration::from_millis(5)).unwrap(), StreamStatus::TimedOut);

        let consumer = Arc::clone(&queue);
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(10));
            let mut out = [0.0f32; 8];
            consumer.pull(&mut out);
        });
        assert_eq!(queue.wait_empty(Duration::from_secs(5)).unwrap(), StreamStatus::Ready);
        handle.join().unwrap();
    }

    #[test]
    fn failure_surfaces_as_device_failed() {
        let queue = OutputQueue::new(8);
        queue.fail("unplugged".into());
        let err = queue.push(&[0.0; 2], Duration::from_millis(1)).unwrap_err();
        assert!(matches!(err, AudioError::DeviceFailed(_)));
    }

    #[test]
    fn fan_out_duplicates_mono_to_all_channels() {
        let mono = [0.5f32, -0.5];
        let mut data = [0.0f32; 4];
        fan_out(&mono, &mut data, 2);
        assert_eq!(data, [0.5, 0.5, -0.5, -0.5]);
    }

    #[test]
    fn queue_holds_several_resampled_blocks() {
        let format = StreamFormat {
            sample_rate: 48_000,
            channels: 1,
            block_len: 960,
        };
        assert_eq!(queue_capacity(format, 48_000), 960 * OUTPUT_QUEUE_BLOCKS);
        assert_eq!(queue_capacity(format, 44_100), 882 * OUTPUT_QUEUE_BLOCKS);
    }
}
