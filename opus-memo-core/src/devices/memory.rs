//! In-memory audio devices.
//!
//! `MemoryDeviceProvider` hands out input streams that replay queued blocks
//! and output streams that record every block written. Open/close counters
//! and failure switches make device lifecycle observable without hardware.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;

use crate::models::audio_models::{AudioDevice, DeviceDirection, StreamFormat};
use crate::models::error::AudioError;
use crate::traits::audio_device::{AudioDeviceProvider, InputStream, OutputStream, StreamStatus};

#[derive(Debug)]
struct MemoryInner {
    input_blocks: Mutex<VecDeque<Vec<i16>>>,
    written: Mutex<Vec<Vec<i16>>>,
    input_available: AtomicBool,
    output_available: AtomicBool,
    fail_input_after: Mutex<Option<usize>>,
    fail_output_after: Mutex<Option<usize>>,
    output_latency: Mutex<Duration>,
    blocks_read: AtomicUsize,
    inputs_opened: AtomicUsize,
    inputs_closed: AtomicUsize,
    outputs_opened: AtomicUsize,
    outputs_closed: AtomicUsize,
}

impl Default for MemoryInner {
    fn default() -> Self {
        Self {
            input_blocks: Mutex::new(VecDeque::new()),
            written: Mutex::new(Vec::new()),
            input_available: AtomicBool::new(true),
            output_available: AtomicBool::new(true),
            fail_input_after: Mutex::new(None),
            fail_output_after: Mutex::new(None),
            output_latency: Mutex::new(Duration::ZERO),
            blocks_read: AtomicUsize::new(0),
            inputs_opened: AtomicUsize::new(0),
            inputs_closed: AtomicUsize::new(0),
            outputs_opened: AtomicUsize::new(0),
            outputs_closed: AtomicUsize::new(0),
        }
    }
}

/// Scripted device provider. Clones share the same devices.
#[derive(Debug, Clone, Default)]
pub struct MemoryDeviceProvider {
    inner: Arc<MemoryInner>,
}

impl MemoryDeviceProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Provider whose input replays `blocks` in order, then goes quiet.
    pub fn with_input_blocks(blocks: Vec<Vec<i16>>) -> Self {
        let provider = Self::new();
        provider.inner.input_blocks.lock().extend(blocks);
        provider
    }

    pub fn push_input_block(&self, block: Vec<i16>) {
        self.inner.input_blocks.lock().push_back(block);
    }

    /// When false, `open_input` fails with `DeviceUnavailable`.
    pub fn set_input_available(&self, available: bool) {
        self.inner.input_available.store(available, Ordering::SeqCst);
    }

    /// When false, `open_output` fails with `DeviceUnavailable`.
    pub fn set_output_available(&self, available: bool) {
        self.inner.output_available.store(available, Ordering::SeqCst);
    }

    /// Input reads fail once `blocks` blocks have been delivered.
    pub fn fail_input_after(&self, blocks: usize) {
        *self.inner.fail_input_after.lock() = Some(blocks);
    }

    /// Output writes fail once `blocks` blocks have been accepted.
    pub fn fail_output_after(&self, blocks: usize) {
        *self.inner.fail_output_after.lock() = Some(blocks);
    }

    /// Time each output write takes to be accepted, like a paced device.
    pub fn set_output_latency(&self, latency: Duration) {
        *self.inner.output_latency.lock() = latency;
    }

    /// Every block accepted by output streams, in order.
    pub fn written_blocks(&self) -> Vec<Vec<i16>> {
        self.inner.written.lock().clone()
    }

    pub fn write_count(&self) -> usize {
        self.inner.written.lock().len()
    }

    pub fn blocks_read(&self) -> usize {
        self.inner.blocks_read.load(Ordering::SeqCst)
    }

    pub fn pending_input_blocks(&self) -> usize {
        self.inner.input_blocks.lock().len()
    }

    pub fn inputs_opened(&self) -> usize {
        self.inner.inputs_opened.load(Ordering::SeqCst)
    }

    /// Input streams opened and not yet dropped.
    pub fn inputs_open(&self) -> usize {
        self.inputs_opened() - self.inner.inputs_closed.load(Ordering::SeqCst)
    }

    pub fn outputs_opened(&self) -> usize {
        self.inner.outputs_opened.load(Ordering::SeqCst)
    }

    /// Output streams opened and not yet dropped.
    pub fn outputs_open(&self) -> usize {
        self.outputs_opened() - self.inner.outputs_closed.load(Ordering::SeqCst)
    }
}

impl AudioDeviceProvider for MemoryDeviceProvider {
    fn open_input(&self, format: &StreamFormat) -> Result<Box<dyn InputStream>, AudioError> {
        if !self.inner.input_available.load(Ordering::SeqCst) {
            return Err(AudioError::DeviceUnavailable("memory input disabled".into()));
        }
        self.inner.inputs_opened.fetch_add(1, Ordering::SeqCst);
        log::debug!("Opened memory input ({} samples/block)", format.block_len);
        Ok(Box::new(MemoryInput {
            inner: Arc::clone(&self.inner),
        }))
    }

    fn open_output(&self, format: &StreamFormat) -> Result<Box<dyn OutputStream>, AudioError> {
        if !self.inner.output_available.load(Ordering::SeqCst) {
            return Err(AudioError::DeviceUnavailable("memory output disabled".into()));
        }
        self.inner.outputs_opened.fetch_add(1, Ordering::SeqCst);
        log::debug!("Opened memory output ({} samples/block)", format.block_len);
        Ok(Box::new(MemoryOutput {
            inner: Arc::clone(&self.inner),
        }))
    }

    fn input_info(&self) -> Option<AudioDevice> {
        Some(AudioDevice {
            id: "memory-input".into(),
            name: "Memory Input".into(),
            direction: DeviceDirection::Input,
            is_default: true,
        })
    }

    fn output_info(&self) -> Option<AudioDevice> {
        Some(AudioDevice {
            id: "memory-output".into(),
            name: "Memory Output".into(),
            direction: DeviceDirection::Output,
            is_default: true,
        })
    }
}

struct MemoryInput {
    inner: Arc<MemoryInner>,
}

impl InputStream for MemoryInput {
    fn read_block(&mut self, block: &mut [i16], timeout: Duration) -> Result<StreamStatus, AudioError> {
        let delivered = self.inner.blocks_read.load(Ordering::SeqCst);
        if let Some(limit) = *self.inner.fail_input_after.lock() {
            if delivered >= limit {
                return Err(AudioError::DeviceFailed("memory input unplugged".into()));
            }
        }

        let next = self.inner.input_blocks.lock().pop_front();
        match next {
            Some(source) => {
                let n = source.len().min(block.len());
                block[..n].copy_from_slice(&source[..n]);
                block[n..].fill(0);
                self.inner.blocks_read.fetch_add(1, Ordering::SeqCst);
                Ok(StreamStatus::Ready)
            }
            None => {
                // Nothing queued: behave like a quiet device that never
                // completes a block.
                thread::sleep(timeout);
                Ok(StreamStatus::TimedOut)
            }
        }
    }
}

impl Drop for MemoryInput {
    fn drop(&mut self) {
        self.inner.inputs_closed.fetch_add(1, Ordering::SeqCst);
    }
}

struct MemoryOutput {
    inner: Arc<MemoryInner>,
}

impl OutputStream for MemoryOutput {
    fn write_block(&mut self, block: &[i16], timeout: Duration) -> Result<StreamStatus, AudioError> {
        let accepted = self.inner.written.lock().len();
        if let Some(limit) = *self.inner.fail_output_after.lock() {
            if accepted >= limit {
                return Err(AudioError::DeviceFailed("memory output unplugged".into()));
            }
        }

        let latency = *self.inner.output_latency.lock();
        if latency > timeout {
            thread::sleep(timeout);
            return Ok(StreamStatus::TimedOut);
        }
        if !latency.is_zero() {
            thread::sleep(latency);
        }
        self.inner.written.lock().push(block.to_vec());
        Ok(StreamStatus::Ready)
    }

    fn drain(&mut self, _timeout: Duration) -> Result<StreamStatus, AudioError> {
        Ok(StreamStatus::Ready)
    }
}

impl Drop for MemoryOutput {
    fn drop(&mut self) {
        self.inner.outputs_closed.fetch_add(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn format() -> StreamFormat {
        StreamFormat {
            sample_rate: 48000,
            channels: 1,
            block_len: 4,
        }
    }

    #[test]
    fn input_replays_blocks_then_times_out() {
        let provider = MemoryDeviceProvider::with_input_blocks(vec![vec![1, 2, 3, 4], vec![5, 6]]);
        let mut input = provider.open_input(&format()).unwrap();
        let mut block = [0i16; 4];
        let timeout = Duration::from_millis(1);

        assert_eq!(input.read_block(&mut block, timeout).unwrap(), StreamStatus::Ready);
        assert_eq!(block, [1, 2, 3, 4]);
        assert_eq!(input.read_block(&mut block, timeout).unwrap(), StreamStatus::Ready);
        assert_eq!(block, [5, 6, 0, 0]);
        assert_eq!(input.read_block(&mut block, timeout).unwrap(), StreamStatus::TimedOut);
        assert_eq!(provider.blocks_read(), 2);
    }

    #[test]
    fn open_and_close_are_counted() {
        let provider = MemoryDeviceProvider::new();
        let input = provider.open_input(&format()).unwrap();
        let output = provider.open_output(&format()).unwrap();
        assert_eq!(provider.inputs_open(), 1);
        assert_eq!(provider.outputs_open(), 1);

        drop(input);
        drop(output);
        assert_eq!(provider.inputs_open(), 0);
        assert_eq!(provider.outputs_open(), 0);
        assert_eq!(provider.inputs_opened(), 1);
    }

    #[test]
    fn unavailable_devices_fail_to_open() {
        let provider = MemoryDeviceProvider::new();
        provider.set_input_available(false);
        provider.set_output_available(false);

        assert!(matches!(provider.open_input(&format()), Err(AudioError::DeviceUnavailable(_))));
        assert!(matches!(provider.open_output(&format()), Err(AudioError::DeviceUnavailable(_))));
        assert_eq!(provider.inputs_opened(), 0);
    }

    #[test]
    fn output_failure_injection() {
        let provider = MemoryDeviceProvider::new();
        provider.fail_output_after(1);
        let mut output = provider.open_output(&format()).unwrap();
        let timeout = Duration::from_millis(5);

        assert_eq!(output.write_block(&[1, 2, 3, 4], timeout).unwrap(), StreamStatus::Ready);
        assert!(matches!(output.write_block(&[1, 2, 3, 4], timeout), Err(AudioError::DeviceFailed(_))));
        assert_eq!(provider.written_blocks(), vec![vec![1, 2, 3, 4]]);
    }
}
