/// Fixed-capacity circular buffer for audio samples.
///
/// Not synchronized on its own; wrap in `parking_lot::Mutex` for
/// cross-thread access.
///
/// Two write modes:
/// - [`RingBuffer::write`] drops the oldest samples on overflow (capture
///   side: a slow reader must never stall the device callback).
/// - [`RingBuffer::write_within_capacity`] refuses what does not fit
///   (playback side: the writer waits for space, which is the backpressure).
#[derive(Debug)]
pub struct RingBuffer<T> {
    buffer: Vec<T>,
    write_index: usize,
    read_index: usize,
    available: usize,
    capacity: usize,
}

impl<T: Copy + Default> RingBuffer<T> {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            buffer: vec![T::default(); capacity],
            write_index: 0,
            read_index: 0,
            available: 0,
            capacity,
        }
    }

    /// Write samples, dropping the oldest ones on overflow.
    ///
    /// If `samples` is larger than capacity, only the last `capacity` samples
    /// are kept. Returns the number of samples dropped.
    pub fn write(&mut self, samples: &[T]) -> usize {
        if samples.is_empty() {
            return 0;
        }

        let mut dropped = 0;
        let samples = if samples.len() > self.capacity {
            dropped += samples.len() - self.capacity;
            &samples[samples.len() - self.capacity..]
        } else {
            samples
        };

        let overflow = (self.available + samples.len()).saturating_sub(self.capacity);
        if overflow > 0 {
            self.read_index = (self.read_index + overflow) % self.capacity;
            self.available -= overflow;
            dropped += overflow;
        }

        self.push(samples);
        dropped
    }

    /// Write as many samples as fit without overwriting unread data.
    ///
    /// Returns the number of samples accepted.
    pub fn write_within_capacity(&mut self, samples: &[T]) -> usize {
        let accepted = samples.len().min(self.free());
        self.push(&samples[..accepted]);
        accepted
    }

    fn push(&mut self, samples: &[T]) {
        for &sample in samples {
            self.buffer[self.write_index] = sample;
            self.write_index = (self.write_index + 1) % self.capacity;
        }
        self.available += samples.len();
    }

    /// Read and remove up to `out.len()` samples into `out`.
    ///
    /// Returns how many samples were copied; the rest of `out` is untouched.
    pub fn read_into(&mut self, out: &mut [T]) -> usize {
        let to_read = out.len().min(self.available);
        for (i, slot) in out.iter_mut().take(to_read).enumerate() {
            *slot = self.buffer[(self.read_index + i) % self.capacity];
        }
        self.read_index = (self.read_index + to_read) % self.capacity;
        self.available -= to_read;
        to_read
    }

    /// Number of samples currently available for reading.
    pub fn count(&self) -> usize {
        self.available
    }

    /// Room left before unread samples would be overwritten.
    pub fn free(&self) -> usize {
        self.capacity - self.available
    }

    pub fn is_empty(&self) -> bool {
        self.available == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
