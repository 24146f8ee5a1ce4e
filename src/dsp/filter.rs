//! Biquad Filters
//!
//! RBJ Audio EQ Cookbook lowpass/highpass/bandpass/peak sections.
//! Reference: https://www.w3.org/2011/audio/audio-eq-cookbook.html
//!
//! Two ways to run them:
//! - stateless helpers (`lowpass`, `highpass`, ...) start every call from rest;
//! - [`Biquad`] carries its state across calls and can be retuned between
//!   blocks, which is what a filter inside a block-based feedback loop needs.

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

use crate::engine::buffer::db_to_linear;

/// Butterworth Q, the default for every section
pub const DEFAULT_Q: f32 = 0.707;

/// Filter response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterType {
    LowPass,
    HighPass,
    /// Constant 0 dB peak gain
    BandPass,
    /// Bell boost/cut
    Peak,
}

/// Whether a filter reused across consecutive blocks keeps its memory
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterMode {
    /// State carried from block to block
    #[default]
    Stateful,
    /// Every block starts from rest (reproduces older renders)
    Stateless,
}

impl FilterMode {
    pub fn parse(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "stateful" => Some(FilterMode::Stateful),
            "stateless" => Some(FilterMode::Stateless),
            _ => None,
        }
    }
}

/// Biquad filter coefficients
/// Transfer function: H(z) = (b0 + b1*z^-1 + b2*z^-2) / (a0 + a1*z^-1 + a2*z^-2)
/// Normalized: all coefficients divided by a0
#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct BiquadCoeffs {
    b0: f64,
    b1: f64,
    b2: f64,
    a1: f64,
    a2: f64,
}

impl BiquadCoeffs {
    fn calculate(filter_type: FilterType, sample_rate: u32, frequency: f32, gain_db: f32, q: f32) -> Self {
        let sr = sample_rate as f64;
        // Keep the corner strictly inside (0, nyquist)
        let freq = (frequency as f64).clamp(1.0, sr / 2.0 - 1.0);
        let q = (q as f64).clamp(0.05, 50.0);

        let w0 = 2.0 * PI * freq / sr;
        let cos_w0 = w0.cos();
        let sin_w0 = w0.sin();
        let alpha = sin_w0 / (2.0 * q);

        let (b0, b1, b2, a0, a1, a2) = match filter_type {
            FilterType::LowPass => (
                (1.0 - cos_w0) / 2.0,
                1.0 - cos_w0,
                (1.0 - cos_w0) / 2.0,
                1.0 + alpha,
                -2.0 * cos_w0,
                1.0 - alpha,
            ),
            FilterType::HighPass => (
                (1.0 + cos_w0) / 2.0,
                -(1.0 + cos_w0),
                (1.0 + cos_w0) / 2.0,
                1.0 + alpha,
                -2.0 * cos_w0,
                1.0 - alpha,
            ),
            FilterType::BandPass => (alpha, 0.0, -alpha, 1.0 + alpha, -2.0 * cos_w0, 1.0 - alpha),
            FilterType::Peak => {
                let a = 10.0_f64.powf(gain_db as f64 / 40.0);
                (
                    1.0 + alpha * a,
                    -2.0 * cos_w0,
                    1.0 - alpha * a,
                    1.0 + alpha / a,
                    -2.0 * cos_w0,
                    1.0 - alpha / a,
                )
            }
        };

        BiquadCoeffs {
            b0: b0 / a0,
            b1: b1 / a0,
            b2: b2 / a0,
            a1: a1 / a0,
            a2: a2 / a0,
        }
    }
}

/// Biquad filter state (Direct Form I)
#[derive(Debug, Clone, Copy, Default)]
struct BiquadState {
    x1: f64,
    x2: f64,
    y1: f64,
    y2: f64,
}

impl BiquadState {
    #[inline]
    fn process(&mut self, input: f64, coeffs: &BiquadCoeffs) -> f64 {
        let output = coeffs.b0 * input + coeffs.b1 * self.x1 + coeffs.b2 * self.x2
            - coeffs.a1 * self.y1
            - coeffs.a2 * self.y2;

        self.x2 = self.x1;
        self.x1 = input;
        self.y2 = self.y1;
        self.y1 = output;

        output
    }
}

/// A single biquad section that remembers its state between calls
#[derive(Debug, Clone)]
pub struct Biquad {
    filter_type: FilterType,
    sample_rate: u32,
    gain_db: f32,
    coeffs: BiquadCoeffs,
    state: BiquadState,
}

impl Biquad {
    /// Create a section at rest
    pub fn new(filter_type: FilterType, sample_rate: u32, frequency: f32, q: f32) -> Self {
        Self::with_gain(filter_type, sample_rate, frequency, 0.0, q)
    }

    /// Create a section with a gain (only meaningful for [`FilterType::Peak`])
    pub fn with_gain(filter_type: FilterType, sample_rate: u32, frequency: f32, gain_db: f32, q: f32) -> Self {
        Self {
            filter_type,
            sample_rate,
            gain_db,
            coeffs: BiquadCoeffs::calculate(filter_type, sample_rate, frequency, gain_db, q),
            state: BiquadState::default(),
        }
    }

    /// Move the corner frequency without touching the state
    pub fn retune(&mut self, frequency: f32, q: f32) {
        self.coeffs = BiquadCoeffs::calculate(self.filter_type, self.sample_rate, frequency, self.gain_db, q);
    }

    /// Clear the filter memory
    pub fn reset(&mut self) {
        self.state = BiquadState::default();
    }

    #[inline]
    pub fn process_sample(&mut self, input: f32) -> f32 {
        self.state.process(input as f64, &self.coeffs) as f32
    }

    /// Filter a block in place
    pub fn process_block(&mut self, block: &mut [f32]) {
        for sample in block.iter_mut() {
            *sample = self.process_sample(*sample);
        }
    }
}

fn run(filter_type: FilterType, input: &[f32], sample_rate: u32, frequency: f32, q: f32) -> Vec<f32> {
    let mut out = input.to_vec();
    Biquad::new(filter_type, sample_rate, frequency, q).process_block(&mut out);
    out
}

/// Stateless lowpass
pub fn lowpass(input: &[f32], sample_rate: u32, cutoff: f32, q: f32) -> Vec<f32> {
    run(FilterType::LowPass, input, sample_rate, cutoff, q)
}

/// Stateless highpass
pub fn highpass(input: &[f32], sample_rate: u32, cutoff: f32, q: f32) -> Vec<f32> {
    run(FilterType::HighPass, input, sample_rate, cutoff, q)
}

/// Stateless bandpass with constant 0 dB peak gain
pub fn bandpass(input: &[f32], sample_rate: u32, center: f32, q: f32) -> Vec<f32> {
    run(FilterType::BandPass, input, sample_rate, center, q)
}

/// Bandpass-derived bell: positive `gain_db` boosts, negative cuts
///
/// Boost adds `bp * (g - 1)`, cut subtracts `bp * (1 - 1/g)` with
/// `g = 10^(|gain_db|/20)`.
pub fn peaking_notch(input: &[f32], sample_rate: u32, center: f32, gain_db: f32, q: f32) -> Vec<f32> {
    let bp = bandpass(input, sample_rate, center, q);
    let g = db_to_linear(gain_db.abs());
    let scale = if gain_db >= 0.0 { g - 1.0 } else { -(1.0 - 1.0 / g) };
    input
        .iter()
        .zip(bp.iter())
        .map(|(&x, &b)| x + b * scale)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsp::oscillator::sine;
    use crate::engine::buffer::rms;
    use approx::assert_abs_diff_eq;

    const SR: u32 = 48000;

    fn steady_rms(samples: &[f32]) -> f32 {
        // skip the transient
        rms(&samples[samples.len() / 2..])
    }

    #[test]
    fn test_lowpass_passes_low_blocks_high() {
        let low = sine(100.0, 0.0, SR as usize / 4, SR);
        let high = sine(10000.0, 0.0, SR as usize / 4, SR);
        let low_out = lowpass(&low, SR, 1000.0, DEFAULT_Q);
        let high_out = lowpass(&high, SR, 1000.0, DEFAULT_Q);
        assert!(steady_rms(&low_out) > 0.95 * steady_rms(&low));
        assert!(steady_rms(&high_out) < 0.02 * steady_rms(&high));
    }

    #[test]
    fn test_highpass_blocks_low() {
        let low = sine(50.0, 0.0, SR as usize / 2, SR);
        let out = highpass(&low, SR, 2000.0, DEFAULT_Q);
        assert!(steady_rms(&out) < 0.01);
    }

    #[test]
    fn test_bandpass_unity_at_center() {
        let x = sine(2000.0, 0.0, SR as usize / 4, SR);
        let out = bandpass(&x, SR, 2000.0, 1.5);
        assert_abs_diff_eq!(steady_rms(&out), steady_rms(&x), epsilon = 0.02);
    }

    #[test]
    fn test_peaking_notch_cut_and_boost() {
        let x = sine(400.0, 0.0, SR as usize / 4, SR);
        let cut = peaking_notch(&x, SR, 400.0, -6.0, 1.2);
        let boost = peaking_notch(&x, SR, 400.0, 6.0, 1.2);
        let ratio_cut = steady_rms(&cut) / steady_rms(&x);
        let ratio_boost = steady_rms(&boost) / steady_rms(&x);
        assert_abs_diff_eq!(ratio_cut, db_to_linear(-6.0), epsilon = 0.03);
        assert_abs_diff_eq!(ratio_boost, db_to_linear(6.0), epsilon = 0.05);
    }

    #[test]
    fn test_cutoff_clamped_below_nyquist() {
        let x = sine(1000.0, 0.0, 4800, SR);
        let out = lowpass(&x, SR, 1.0e6, DEFAULT_Q);
        assert!(out.iter().all(|s| s.is_finite()));
    }

    #[test]
    fn test_stateful_blocks_match_one_shot() {
        let x = sine(300.0, 0.0, 4096, SR);
        let whole = lowpass(&x, SR, 800.0, DEFAULT_Q);

        let mut filter = Biquad::new(FilterType::LowPass, SR, 800.0, DEFAULT_Q);
        let mut blocked = x.clone();
        for block in blocked.chunks_mut(32) {
            filter.process_block(block);
        }
        assert_eq!(whole, blocked);
    }

    #[test]
    fn test_stateless_blocks_differ_from_one_shot() {
        let x = sine(300.0, 0.0, 4096, SR);
        let whole = lowpass(&x, SR, 800.0, DEFAULT_Q);
        let blocked: Vec<f32> = x
            .chunks(32)
            .flat_map(|block| lowpass(block, SR, 800.0, DEFAULT_Q))
            .collect();
        assert_ne!(whole, blocked);
    }

    #[test]
    fn test_filter_mode_parse() {
        assert_eq!(FilterMode::parse("Stateless"), Some(FilterMode::Stateless));
        assert_eq!(FilterMode::parse("stateful"), Some(FilterMode::Stateful));
        assert_eq!(FilterMode::parse("other"), None);
        assert_eq!(FilterMode::default(), FilterMode::Stateful);
    }
}
