//! Oscillators
//!
//! Phase is accumulated in f64 and wrapped so long renders at 192kHz keep
//! their precision.

use std::f64::consts::TAU;

/// Time in seconds of each sample index
pub fn time_axis(num_samples: usize, sample_rate: u32) -> Vec<f32> {
    let sr = sample_rate as f64;
    (0..num_samples).map(|i| (i as f64 / sr) as f32).collect()
}

/// Fixed-frequency sine starting at `phase` radians
pub fn sine(frequency: f32, phase: f32, num_samples: usize, sample_rate: u32) -> Vec<f32> {
    let step = TAU * frequency as f64 / sample_rate as f64;
    (0..num_samples)
        .map(|i| (phase as f64 + step * i as f64).sin() as f32)
        .collect()
}

/// Sine driven by an instantaneous-frequency curve
///
/// Negative frequencies are folded to their absolute value before phase
/// integration so a deep FM excursion never reverses the phase.
pub fn sine_from_frequency(frequencies: &[f32], sample_rate: u32) -> Vec<f32> {
    let sr = sample_rate as f64;
    let mut phase = 0.0_f64;
    frequencies
        .iter()
        .map(|&f| {
            let out = phase.sin() as f32;
            phase = (phase + TAU * (f.abs() as f64) / sr) % TAU;
            out
        })
        .collect()
}

/// Naive triangle in [-1, 1]
pub fn triangle(frequency: f32, num_samples: usize, sample_rate: u32) -> Vec<f32> {
    let sr = sample_rate as f64;
    let f = frequency as f64;
    (0..num_samples)
        .map(|i| {
            let x = f * i as f64 / sr;
            (2.0 * (2.0 * (x - (x + 0.5).floor())).abs() - 1.0) as f32
        })
        .collect()
}

/// Square wave as the sign of a sine (zero crossings map to 0)
pub fn square(frequency: f32, phase: f32, num_samples: usize, sample_rate: u32) -> Vec<f32> {
    sine(frequency, phase, num_samples, sample_rate)
        .into_iter()
        .map(sign)
        .collect()
}

#[inline]
fn sign(x: f32) -> f32 {
    if x > 0.0 {
        1.0
    } else if x < 0.0 {
        -1.0
    } else {
        0.0
    }
}
