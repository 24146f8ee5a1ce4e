//! Post-Chain
//!
//! Runs on every rendered buffer, in this order:
//! 1. DC block (subtract the mean)
//! 2. optional transient shaper (`transient_shaper` param, default off)
//! 3. soft clip at the -0.8 dBFS ceiling
//! 4. boundary fades (0.5ms in, 2ms out), then a residual DC trim shaped by
//!    the fade window so the edges stay at zero
//! 5. safety clamp at ±0.92
//!
//! followed by a finiteness check. No parameter can skip it.

use super::saturation::{soft_clip, transient_shaper};
use crate::engine::buffer::{mean, SampleBuffer};
use crate::engine::params::ParamMap;
use crate::error::{EngineError, Result};

/// Soft-clip ceiling in dBFS (~0.912 linear)
pub const CEILING_DBFS: f32 = -0.8;

/// Hard ceiling on the absolute sample value
pub const SAFETY_CLAMP: f32 = 0.92;

/// Linear fade-in length
pub const FADE_IN_MS: f32 = 0.5;

/// Linear fade-out length
pub const FADE_OUT_MS: f32 = 2.0;

fn fade_len(ms: f32, sample_rate: u32, n: usize) -> usize {
    ((ms as f64 * 1e-3 * sample_rate as f64) as usize).max(1).min(n)
}

/// `linspace(start, end, n)`
fn ramp(start: f32, end: f32, n: usize) -> impl Iterator<Item = f32> {
    let step = if n > 1 { (end - start) / (n - 1) as f32 } else { 0.0 };
    (0..n).map(move |i| start + step * i as f32)
}

/// Per-sample gain of the boundary fades
fn fade_window(n: usize, sample_rate: u32) -> Vec<f32> {
    let mut window = vec![1.0_f32; n];
    let n_in = fade_len(FADE_IN_MS, sample_rate, n);
    let n_out = fade_len(FADE_OUT_MS, sample_rate, n);
    for (w, g) in window.iter_mut().zip(ramp(0.0, 1.0, n_in)) {
        *w *= g;
    }
    for (w, g) in window[n - n_out..].iter_mut().zip(ramp(1.0, 0.0, n_out)) {
        *w *= g;
    }
    window
}

/// Subtract the mean
pub fn dc_block(samples: &mut [f32]) {
    let offset = mean(samples);
    samples.iter_mut().for_each(|s| *s -= offset);
}

/// Apply the boundary fades, then remove what is left of the DC offset in
/// proportion to the fade window
pub fn boundary_fades(samples: &mut [f32], sample_rate: u32) {
    let n = samples.len();
    if n == 0 {
        return;
    }
    let window = fade_window(n, sample_rate);
    for (s, w) in samples.iter_mut().zip(window.iter()) {
        *s *= w;
    }

    let total: f64 = samples.iter().map(|&s| s as f64).sum();
    let weight: f64 = window.iter().map(|&w| w as f64).sum();
    if weight > 1e-9 {
        let offset = total / weight;
        for (s, w) in samples.iter_mut().zip(window.iter()) {
            *s = (*s as f64 - offset * *w as f64) as f32;
        }
    }
}

/// Clamp to `±SAFETY_CLAMP`
pub fn safety_clamp(samples: &mut [f32]) {
    for s in samples.iter_mut() {
        *s = s.clamp(-SAFETY_CLAMP, SAFETY_CLAMP);
    }
}

/// Run the full chain and wrap the result
///
/// # Errors
/// `NonFiniteOutput` if any sample is NaN or infinite after the chain.
pub fn process(
    mut samples: Vec<f32>,
    instrument: &str,
    sample_rate: u32,
    params: &ParamMap,
) -> Result<SampleBuffer> {
    dc_block(&mut samples);
    transient_shaper(&mut samples, sample_rate, params.get_f32("transient_shaper", 0.0));
    soft_clip(&mut samples, CEILING_DBFS);
    boundary_fades(&mut samples, sample_rate);
    safety_clamp(&mut samples);

    let buffer = SampleBuffer::new(samples, sample_rate);
    match buffer.first_non_finite() {
        Some(index) => Err(EngineError::NonFiniteOutput {
            instrument: instrument.to_string(),
            index,
        }),
        None => Ok(buffer),
    }
}
