//! Microphone capture through cpal.
//!
//! The device callback converts whatever the device delivers to mono i16 at
//! the codec rate and pushes it into a bounded queue. `read_block` pulls
//! fixed-size blocks out of that queue on the capture worker's thread.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use cpal::traits::{DeviceTrait, StreamTrait};
use cpal::{FromSample, Sample, SizedSample};
use parking_lot::{Condvar, Mutex};

use opus_memo_core::processing::sample_format::{downmix_to_mono, f32_to_i16, LinearResampler};
use opus_memo_core::{AudioError, DeviceDirection, InputStream, RingBuffer, StreamFormat, StreamStatus};

use crate::device_enumerator::find_device;
use crate::error::CpalError;
use crate::stream_thread::StreamThread;

/// Seconds of audio the input queue holds before dropping the oldest samples.
const INPUT_QUEUE_SECS: usize = 1;

/// Samples queued between the device callback and the capture worker.
pub(crate) struct InputQueue {
    buffer: Mutex<RingBuffer<i16>>,
    ready: Condvar,
    failure: Mutex<Option<String>>,
    dropped: AtomicU64,
}

impl InputQueue {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            buffer: Mutex::new(RingBuffer::new(capacity)),
            ready: Condvar::new(),
            failure: Mutex::new(None),
            dropped: AtomicU64::new(0),
        }
    }

    pub(crate) fn push(&self, samples: &[i16]) {
        let dropped = self.buffer.lock().write(samples);
        if dropped > 0 {
            self.dropped.fetch_add(dropped as u64, Ordering::Relaxed);
        }
        self.ready.notify_one();
    }

    pub(crate) fn fail(&self, message: String) {
        *self.failure.lock() = Some(message);
        self.ready.notify_all();
    }

    pub(crate) fn dropped_samples(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Fill `block` completely, or report a timeout leaving the queue untouched.
    pub(crate) fn read_block(&self, block: &mut [i16], timeout: Duration) -> Result<StreamStatus, AudioError> {
        let deadline = Instant::now() + timeout;
        let mut buffer = self.buffer.lock();
        loop {
            if let Some(message) = self.failure.lock().clone() {
                return Err(AudioError::DeviceFailed(message));
            }
            if buffer.count() >= block.len() {
                buffer.read_into(block);
                return Ok(StreamStatus::Ready);
            }
            if self.ready.wait_until(&mut buffer, deadline).timed_out() && buffer.count() < block.len() {
                return Ok(StreamStatus::TimedOut);
            }
        }
    }
}

/// Open input stream on a cpal device.
pub struct CpalInputStream {
    queue: Arc<InputQueue>,
    device_name: String,
    // Dropped last: stops the device callback.
    _thread: StreamThread,
}

impl CpalInputStream {
    pub(crate) fn open(host_id: cpal::HostId, device: Option<String>, format: StreamFormat) -> Result<Self, AudioError> {
        let (thread, (queue, device_name)) = StreamThread::spawn("opus-memo-input-device", move || {
            let host = cpal::host_from_id(host_id)?;
            let device = find_device(&host, DeviceDirection::Input, device.as_deref())?;
            let name = device.name().unwrap_or_else(|_| "Unknown Microphone".into());
            let supported = device.default_input_config()?;
            let config = supported.config();
            log::info!(
                "Opening input '{}': {} Hz, {} ch, {:?}",
                name,
                config.sample_rate.0,
                config.channels,
                supported.sample_format()
            );

            let queue = Arc::new(InputQueue::new(format.sample_rate as usize * INPUT_QUEUE_SECS));
            let stream = match supported.sample_format() {
                cpal::SampleFormat::F32 => build_input::<f32>(&device, &config, &queue, format.sample_rate)?,
                cpal::SampleFormat::I16 => build_input::<i16>(&device, &config, &queue, format.sample_rate)?,
                cpal::SampleFormat::U16 => build_input::<u16>(&device, &config, &queue, format.sample_rate)?,
                other => return Err(CpalError::UnsupportedFormat(format!("{:?}", other))),
            };
            stream.play()?;
            Ok((stream, (queue, name)))
        })?;

        Ok(Self {
            queue,
            device_name,
            _thread: thread,
        })
    }

    pub fn device_name(&self) -> &str {
        &self.device_name
    }
}

impl InputStream for CpalInputStream {
    fn read_block(&mut self, block: &mut [i16], timeout: Duration) -> Result<StreamStatus, AudioError> {
        self.queue.read_block(block, timeout)
    }
}

impl Drop for CpalInputStream {
    fn drop(&mut self) {
        let dropped = self.queue.dropped_samples();
        if dropped > 0 {
            log::warn!("Input '{}' overflowed, {} samples dropped", self.device_name, dropped);
        }
    }
}

fn build_input<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    queue: &Arc<InputQueue>,
    target_rate: u32,
) -> Result<cpal::Stream, CpalError>
where
    T: SizedSample,
    f32: FromSample<T>,
{
    let channels = config.channels as usize;
    let mut resampler = LinearResampler::new(config.sample_rate.0 as f64, target_rate as f64);
    let data_queue = Arc::clone(queue);
    let error_queue = Arc::clone(queue);

    let stream = device.build_input_stream(
        config,
        move |data: &[T], _: &cpal::InputCallbackInfo| {
            data_queue.push(&convert_input(data, channels, &mut resampler));
        },
        move |err| match err {
            cpal::StreamError::DeviceNotAvailable => {
                log::error!("Input device disappeared");
                error_queue.fail(err.to_string());
            }
            other => log::warn!("Input stream error: {}", other),
        },
        None,
    )?;
    Ok(stream)
}

/// Interleaved device samples to mono i16 at the resampler's rate.
///
/// `resampler` carries its phase from one callback buffer to the next.
fn convert_input<T>(data: &[T], channels: usize, resampler: &mut LinearResampler) -> Vec<i16>
where
    T: SizedSample,
    f32: FromSample<T>,
{
    let floats: Vec<f32> = data.iter().map(|&s| f32::from_sample(s)).collect();
    let mono = downmix_to_mono(&floats, channels);
    f32_to_i16(&resampler.process(&mono))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn read_block_waits_for_full_block() {
        let queue = Arc::new(InputQueue::new(100));
        queue.push(&[1, 2, 3]);

        let mut block = [0i16; 5];
        let status = queue.read_block(&mut block, Duration::from_millis(10)).unwrap();
        assert_eq!(status, StreamStatus::TimedOut);
        assert_eq!(block, [0; 5]);

        let producer = Arc::clone(&queue);
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            producer.push(&[4, 5, 6]);
        });
        let status = queue.read_block(&mut block, Duration::from_secs(5)).unwrap();
        handle.join().unwrap();

        assert_eq!(status, StreamStatus::Ready);
        assert_eq!(block, [1, 2, 3, 4, 5]);
    }

    #[test]
    fn overflow_drops_oldest_and_counts() {
        let queue = InputQueue::new(4);
        queue.push(&[1, 2, 3, 4, 5, 6]);

        let mut block = [0i16; 4];
        queue.read_block(&mut block, Duration::from_millis(1)).unwrap();
        assert_eq!(block, [3, 4, 5, 6]);
        assert_eq!(queue.dropped_samples(), 2);
    }

    #[test]
    fn failure_surfaces_as_device_failed() {
        let queue = InputQueue::new(16);
        queue.fail("unplugged".into());

        let mut block = [0i16; 4];
        let err = queue.read_block(&mut block, Duration::from_millis(1)).unwrap_err();
        assert!(matches!(err, AudioError::DeviceFailed(_)));
    }

    #[test]
    fn converts_stereo_i16_to_mono_at_target_rate() {
        let mut resampler = LinearResampler::new(48_000.0, 24_000.0);
        // 100 stereo frames at 48 kHz, both channels at half scale.
        let data: Vec<i16> = vec![16384; 200];
        let out = convert_input(&data, 2, &mut resampler);

        assert_eq!(out.len(), 50);
        assert!(out.iter().all(|&s| (s - 16384).abs() <= 1));
    }

    #[test]
    fn consecutive_callbacks_keep_the_rate_ratio() {
        let mut resampler = LinearResampler::new(44_100.0, 48_000.0);
        let data = vec![0.25f32; 1024];
        let total: usize = (0..10).map(|_| convert_input(&data, 1, &mut resampler).len()).sum();

        // 10 buffers of 1024 frames are 11146.9 samples at 48 kHz; truncating
        // per buffer would lose about one sample per callback.
        let ideal = 10.0 * 1024.0 * 48_000.0 / 44_100.0;
        assert!((total as f64 - ideal).abs() < 2.0, "got {}", total);
    }
}
