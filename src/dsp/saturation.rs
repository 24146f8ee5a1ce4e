//! Nonlinear Shaping
//!
//! Clippers, saturation and transient emphasis. All stages work in place.

use crate::engine::buffer::db_to_linear;

/// Time constant of the transient shaper's boost envelope (50ms)
const TRANSIENT_TAU_SECS: f64 = 0.05;

/// `tanh(x) * 10^(threshold_db/20)`
pub fn soft_clip(samples: &mut [f32], threshold_db: f32) {
    let ceiling = db_to_linear(threshold_db);
    for s in samples.iter_mut() {
        *s = s.tanh() * ceiling;
    }
}

/// Clamp to `±10^(threshold_db/20)`
pub fn hard_clip(samples: &mut [f32], threshold_db: f32) {
    let ceiling = db_to_linear(threshold_db);
    for s in samples.iter_mut() {
        *s = s.clamp(-ceiling, ceiling);
    }
}

/// `tanh(x * drive)`
pub fn drive_tanh(samples: &mut [f32], drive: f32) {
    for s in samples.iter_mut() {
        *s = (*s * drive).tanh();
    }
}

/// Onset emphasis: `x * (1 + exp(-t/50ms) * amount * 2)`
///
/// `amount <= 0` leaves the signal untouched.
pub fn transient_shaper(samples: &mut [f32], sample_rate: u32, amount: f32) {
    if amount <= 0.0 {
        return;
    }
    let sr = sample_rate as f64;
    for (i, s) in samples.iter_mut().enumerate() {
        let boost = (-(i as f64 / sr) / TRANSIENT_TAU_SECS).exp() * amount as f64 * 2.0;
        *s *= 1.0 + boost as f32;
    }
}

/// Sample-rate reduction: hold every `factor`-th sample for `factor` samples
pub fn sample_and_hold(samples: &mut [f32], factor: usize) {
    if factor <= 1 {
        return;
    }
    for chunk in samples.chunks_mut(factor) {
        let held = chunk[0];
        chunk.iter_mut().for_each(|s| *s = held);
    }
}
