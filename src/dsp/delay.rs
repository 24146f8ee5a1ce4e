//! Delay Line
//!
//! Ring buffer with fractional-delay reads. Capacity is the maximum delay
//! plus a guard region at least one processing block long, so a block can be
//! read and then written back without the write overrunning the read taps.
//!
//! In feedback use, always `read` a block before `write`-ing the block for
//! the same time step; the delay must then be at least the block length.
//! Feed-forward taps `write` first and read at `delay + block.len()`, which
//! works for any delay down to zero.

/// Default guard region appended to the requested maximum delay
pub const DEFAULT_GUARD_SAMPLES: usize = 4096;

/// Mono ring-buffer delay line
#[derive(Debug, Clone)]
pub struct DelayLine {
    buffer: Vec<f32>,
    max_delay: usize,
    /// Next slot to be written
    write_pos: usize,
}

impl DelayLine {
    /// Create a delay line holding up to `max_delay_samples` of history
    pub fn new(max_delay_samples: usize) -> Self {
        Self::with_guard(max_delay_samples, DEFAULT_GUARD_SAMPLES)
    }

    /// Create a delay line with an explicit guard region
    ///
    /// # Arguments
    /// * `max_delay_samples` - Largest delay `read` will accept
    /// * `guard` - Extra slots; must cover the largest block written at once
    pub fn with_guard(max_delay_samples: usize, guard: usize) -> Self {
        Self {
            buffer: vec![0.0; max_delay_samples + guard.max(1)],
            max_delay: max_delay_samples,
            write_pos: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }

    pub fn max_delay(&self) -> usize {
        self.max_delay
    }

    pub fn write_pos(&self) -> usize {
        self.write_pos
    }

    /// Zero the history and rewind the write cursor
    pub fn reset(&mut self) {
        self.buffer.iter_mut().for_each(|s| *s = 0.0);
        self.write_pos = 0;
    }

    /// Append a block, wrapping around the end of the buffer
    pub fn write(&mut self, block: &[f32]) {
        let capacity = self.buffer.len();
        for &sample in block {
            self.buffer[self.write_pos] = sample;
            self.write_pos = (self.write_pos + 1) % capacity;
        }
    }

    /// Read `count` samples lagging the write cursor by `delay_samples`
    ///
    /// Sample `i` is taken at `write_pos + i - delay_samples`, linearly
    /// interpolated between its two neighbouring taps.
    ///
    /// Every position read must already be written: when reading before the
    /// matching `write`, `delay_samples` must be at least `count`.
    ///
    /// # Panics
    /// If `delay_samples` is negative or exceeds the maximum delay. That is a
    /// sizing bug in the caller's graph, not a recoverable condition.
    pub fn read(&self, delay_samples: f32, count: usize) -> Vec<f32> {
        assert!(
            delay_samples >= 0.0 && delay_samples <= self.max_delay as f32,
            "delay of {} samples outside 0..={}",
            delay_samples,
            self.max_delay
        );

        let capacity = self.buffer.len() as i64;
        let base = self.write_pos as f64 - delay_samples as f64;
        (0..count)
            .map(|i| {
                let center = base + i as f64;
                let floor = center.floor();
                let frac = (center - floor) as f32;
                let lo = (floor as i64).rem_euclid(capacity) as usize;
                let hi = (floor as i64 + 1).rem_euclid(capacity) as usize;
                self.buffer[lo] * (1.0 - frac) + self.buffer[hi] * frac
            })
            .collect()
    }
}
