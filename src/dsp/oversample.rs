//! Oversampling
//!
//! Instruments synthesize at `target_rate * factor` so their nonlinear
//! stages alias above the audible band, then come back down through an
//! anti-alias lowpass and decimation.

use super::filter::{lowpass, DEFAULT_Q};
use crate::engine::buffer::samples_for_duration;

/// Distance of the anti-alias corner below the target Nyquist
pub const ANTI_ALIAS_MARGIN_HZ: f32 = 1000.0;

/// An instrument's oversampling plan
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Oversampling {
    pub target_rate: u32,
    pub factor: u32,
}

impl Oversampling {
    pub fn new(target_rate: u32, factor: u32) -> Self {
        Self {
            target_rate,
            factor: factor.max(1),
        }
    }

    /// Rate the synthesis graph runs at
    pub fn internal_rate(&self) -> u32 {
        self.target_rate * self.factor
    }

    /// Sample count of `duration_secs` at the internal rate
    pub fn internal_len(&self, duration_secs: f32) -> usize {
        samples_for_duration(duration_secs, self.internal_rate())
    }

    /// Anti-alias and decimate back to the target rate
    ///
    /// The result is trimmed or zero-padded to exactly `target_len` samples.
    pub fn downsample(&self, input: &[f32], target_len: usize) -> Vec<f32> {
        let mut out: Vec<f32> = if self.factor <= 1 {
            input.to_vec()
        } else {
            let cutoff = self.target_rate as f32 / 2.0 - ANTI_ALIAS_MARGIN_HZ;
            lowpass(input, self.internal_rate(), cutoff, DEFAULT_Q)
                .into_iter()
                .step_by(self.factor as usize)
                .collect()
        };
        out.resize(target_len, 0.0);
        out
    }
}
