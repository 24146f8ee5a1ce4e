//! Noise Generators
//!
//! All generators draw from the render's [`RenderRng`] in sample order.

use rustfft::{num_complex::Complex, FftPlanner};

use super::rng::RenderRng;

/// Gaussian white noise (unit variance)
pub fn white(num_samples: usize, rng: &mut RenderRng) -> Vec<f32> {
    (0..num_samples).map(|_| rng.gaussian()).collect()
}

/// Uniform white noise in [-1, 1)
pub fn uniform(num_samples: usize, rng: &mut RenderRng) -> Vec<f32> {
    (0..num_samples).map(|_| rng.bipolar()).collect()
}

/// Pink noise by 1/sqrt(f) spectral shaping of gaussian white noise
///
/// The DC bin is removed and the result is normalized to unit peak.
pub fn pink(num_samples: usize, rng: &mut RenderRng) -> Vec<f32> {
    if num_samples == 0 {
        return Vec::new();
    }

    let mut spectrum: Vec<Complex<f32>> = white(num_samples, rng)
        .into_iter()
        .map(|s| Complex::new(s, 0.0))
        .collect();

    let mut planner = FftPlanner::new();
    planner.plan_fft_forward(num_samples).process(&mut spectrum);

    // Mirror bins share a scale so the inverse stays real
    for (k, bin) in spectrum.iter_mut().enumerate() {
        let index = k.min(num_samples - k);
        if index == 0 {
            *bin = Complex::new(0.0, 0.0);
        } else {
            *bin *= 1.0 / (index as f32).sqrt();
        }
    }

    planner.plan_fft_inverse(num_samples).process(&mut spectrum);

    let mut out: Vec<f32> = spectrum.into_iter().map(|c| c.re).collect();
    let peak = out.iter().map(|s| s.abs()).fold(0.0_f32, f32::max);
    if peak > 1e-12 {
        out.iter_mut().for_each(|s| *s /= peak);
    }
    out
}
