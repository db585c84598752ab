//! Pure-math sample helpers: format conversion, downmixing, resampling and
//! level metering. No platform dependencies.

/// Convert `i16` PCM to `f32` in `[-1.0, 1.0]`.
pub fn i16_to_f32(samples: &[i16]) -> Vec<f32> {
    samples.iter().map(|&s| s as f32 / 32768.0).collect()
}

/// Convert `f32` samples to `i16` PCM, clamping out-of-range values.
pub fn f32_to_i16(samples: &[f32]) -> Vec<i16> {
    samples.iter().map(|&s| f32_sample_to_i16(s)).collect()
}

#[inline]
pub fn f32_sample_to_i16(sample: f32) -> i16 {
    (sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16
}

/// Downmix interleaved multi-channel audio to mono by averaging channels per frame.
pub fn downmix_to_mono(samples: &[f32], channels: usize) -> Vec<f32> {
    if channels <= 1 {
        return samples.to_vec();
    }
    let scale = 1.0 / channels as f32;
    samples
        .chunks_exact(channels)
        .map(|frame| frame.iter().sum::<f32>() * scale)
        .collect()
}

/// Streaming linear-interpolation resampler for mono audio.
///
/// The fractional read position and the last input sample carry over between
/// calls, so a signal fed in chunks of any size comes out as one continuous
/// stream with no per-chunk rounding loss.
#[derive(Debug, Clone)]
pub struct LinearResampler {
    /// Source samples advanced per output sample.
    step: f64,
    /// Read position; index 0 is `history` when present.
    position: f64,
    history: Option<f32>,
}

impl LinearResampler {
    pub fn new(source_sample_rate: f64, target_sample_rate: f64) -> Self {
        Self {
            step: source_sample_rate / target_sample_rate,
            position: 0.0,
            history: None,
        }
    }

    pub fn is_passthrough(&self) -> bool {
        (self.step - 1.0).abs() < 1e-9
    }

    /// Resample the next chunk of the stream.
    ///
    /// Output that would need samples past the end of `input` is produced by
    /// the following call.
    pub fn process(&mut self, input: &[f32]) -> Vec<f32> {
        if self.is_passthrough() {
            return input.to_vec();
        }
        if input.is_empty() {
            return Vec::new();
        }

        let offset = usize::from(self.history.is_some());
        let history = self.history.unwrap_or(0.0);
        let len = input.len() + offset;
        let at = |i: usize| if i < offset { history } else { input[i - offset] };

        let mut output = Vec::with_capacity((input.len() as f64 / self.step) as usize + 1);
        let mut position = self.position;
        loop {
            let index = position as usize;
            if index + 1 >= len {
                break;
            }
            let fraction = (position - index as f64) as f32;
            output.push(at(index) * (1.0 - fraction) + at(index + 1) * fraction);
            position += self.step;
        }

        // The last input sample becomes index 0 of the next call.
        self.position = position - (len - 1) as f64;
        self.history = input.last().copied();
        output
    }
}

/// RMS and peak of an `i16` block, normalized to 0.0–1.0.
pub fn block_levels(block: &[i16]) -> (f32, f32) {
    if block.is_empty() {
        return (0.0, 0.0);
    }
    let mut sum_sq = 0.0f64;
    let mut peak = 0i32;
    for &s in block {
        let v = s as f64;
        sum_sq += v * v;
        peak = peak.max((s as i32).abs());
    }
    let rms = (sum_sq / block.len() as f64).sqrt() / 32768.0;
    (rms as f32, peak as f32 / 32768.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn f32_to_i16_clamps() {
        assert_eq!(f32_to_i16(&[0.0, 1.0, -1.0, 2.0, -3.0]), vec![0, i16::MAX, -i16::MAX, i16::MAX, -i16::MAX]);
    }

    #[test]
    fn i16_round_trip_is_close() {
        let back = f32_to_i16(&i16_to_f32(&[1000, -1000, 0]));
        for (a, b) in back.iter().zip([1000i16, -1000, 0]) {
            assert!((*a as i32 - b as i32).abs() <= 1);
        }
    }

    #[test]
    fn downmix_averages_channels() {
        let mono = downmix_to_mono(&[0.2, 0.4, -1.0, 1.0], 2);
        assert_eq!(mono.len(), 2);
        assert_relative_eq!(mono[0], 0.3, epsilon = 1e-6);
        assert_relative_eq!(mono[1], 0.0, epsilon = 1e-6);
    }

    #[test]
    fn resample_same_rate_is_passthrough() {
        let mut resampler = LinearResampler::new(48000.0, 48000.0);
        let samples = vec![1.0, 2.0, 3.0];
        assert!(resampler.is_passthrough());
        assert_eq!(resampler.process(&samples), samples);
    }

    #[test]
    fn resample_upsample_2x_carries_into_next_chunk() {
        let mut resampler = LinearResampler::new(24000.0, 48000.0);

        let first = resampler.process(&[0.0, 1.0]);
        assert_eq!(first.len(), 2);
        assert_relative_eq!(first[1], 0.5, epsilon = 1e-6);

        let second = resampler.process(&[2.0]);
        assert_eq!(second.len(), 2);
        assert_relative_eq!(second[0], 1.0, epsilon = 1e-6);
        assert_relative_eq!(second[1], 1.5, epsilon = 1e-6);
    }

    #[test]
    fn resample_downsample() {
        let mut resampler = LinearResampler::new(48000.0, 24000.0);
        let samples: Vec<f32> = (0..100).map(|i| i as f32 / 100.0).collect();
        assert_eq!(resampler.process(&samples).len(), 50);
    }

    fn ramp(len: usize) -> Vec<f32> {
        (0..len).map(|i| i as f32 * 0.001).collect()
    }

    fn process_in_chunks(resampler: &mut LinearResampler, input: &[f32], sizes: &[usize]) -> Vec<f32> {
        let mut output = Vec::new();
        let mut rest = input;
        for &size in sizes.iter().cycle() {
            if rest.is_empty() {
                break;
            }
            let (chunk, tail) = rest.split_at(size.min(rest.len()));
            output.extend(resampler.process(chunk));
            rest = tail;
        }
        output
    }

    #[test]
    fn uneven_chunks_match_one_pass() {
        let input = ramp(1000);
        let whole = LinearResampler::new(44100.0, 48000.0).process(&input);
        let mut resampler = LinearResampler::new(44100.0, 48000.0);
        let chunked = process_in_chunks(&mut resampler, &input, &[1, 7, 128, 333, 64]);

        // No per-chunk truncation: the length tracks the rate ratio.
        let ideal = 1000.0 * 48000.0 / 44100.0;
        assert!((chunked.len() as f64 - ideal).abs() < 2.0, "got {}", chunked.len());
        assert!((chunked.len() as i64 - whole.len() as i64).abs() <= 1);
        for (a, b) in chunked.iter().zip(&whole) {
            assert_relative_eq!(*a, *b, epsilon = 1e-4);
        }
    }

    #[test]
    fn chunk_seams_are_continuous() {
        let input = ramp(2000);
        let mut resampler = LinearResampler::new(48000.0, 44100.0);
        let output = process_in_chunks(&mut resampler, &input, &[480, 441, 1024, 17]);

        // A resampled ramp is still a ramp; a held sample at a seam would
        // show up as a short step.
        let expected_delta = 0.001 * 48000.0 / 44100.0;
        for pair in output.windows(2) {
            assert_relative_eq!(pair[1] - pair[0], expected_delta as f32, epsilon = 1e-5);
        }
    }

    #[test]
    fn block_levels_full_scale() {
        let (rms, peak) = block_levels(&[i16::MIN, i16::MIN]);
        assert_relative_eq!(rms, 1.0, epsilon = 1e-6);
        assert_relative_eq!(peak, 1.0, epsilon = 1e-6);
        assert_eq!(block_levels(&[]), (0.0, 0.0));
    }
}
