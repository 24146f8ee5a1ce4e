//! Envelope Generators
//!
//! Two families:
//! - `exponential_decay`: closed-form `exp(-t/tau)` control curves used
//!   inside synthesis stages (pitch sweeps, FM index, noise bursts).
//! - `AdsrSpec`: per-layer amplitude envelopes applied by the mixer.

use serde::{Deserialize, Serialize};

use crate::engine::params::ParamMap;

/// Floor added to time constants so a zero decay never divides by zero
pub const ENVELOPE_EPSILON: f32 = 1e-6;

/// Steepness of exponential ADSR segments
const EXP_CURVE_K: f64 = 5.0;

/// `exp(-t / (tau + eps))` over `num_samples` samples
pub fn exponential_decay(num_samples: usize, sample_rate: u32, tau: f32) -> Vec<f32> {
    let denom = (tau.max(0.0) + ENVELOPE_EPSILON) as f64;
    let sr = sample_rate as f64;
    (0..num_samples)
        .map(|i| (-(i as f64 / sr) / denom).exp() as f32)
        .collect()
}

/// Segment shape for ADSR stages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdsrCurve {
    Linear,
    #[default]
    Exponential,
}

impl AdsrCurve {
    /// Parse a curve name ("linear"/"lin", "exp"/"exponential")
    pub fn parse(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "linear" | "lin" => Some(AdsrCurve::Linear),
            "exp" | "exponential" => Some(AdsrCurve::Exponential),
            _ => None,
        }
    }

    /// Normalized progress for position `x` in (0, 1]
    #[inline]
    fn shape(self, x: f64) -> f64 {
        match self {
            AdsrCurve::Linear => x,
            AdsrCurve::Exponential => (1.0 - (-EXP_CURVE_K * x).exp()) / (1.0 - (-EXP_CURVE_K).exp()),
        }
    }
}

/// Attack/hold/decay/sustain/release amplitude envelope
///
/// Times are in seconds, `sustain` is a level in [0, 1]. The default is a
/// flat envelope at full level.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AdsrSpec {
    pub attack_s: f32,
    pub hold_s: f32,
    pub decay_s: f32,
    pub sustain: f32,
    pub release_s: f32,
    pub curve: AdsrCurve,
}

impl Default for AdsrSpec {
    fn default() -> Self {
        Self {
            attack_s: 0.0,
            hold_s: 0.0,
            decay_s: 0.0,
            sustain: 1.0,
            release_s: 0.0,
            curve: AdsrCurve::Exponential,
        }
    }
}

impl AdsrSpec {
    /// Instant attack, decay to `sustain` over `decay_s`
    pub fn decay(decay_s: f32, sustain: f32) -> Self {
        Self {
            decay_s,
            sustain,
            ..Self::default()
        }
    }

    /// Read `{prefix}.{attack_ms,hold_ms,decay_ms,sustain,release_ms,curve}`
    /// falling back to `defaults` for every missing field
    pub fn from_params(params: &ParamMap, prefix: &str, defaults: AdsrSpec) -> Self {
        let ms = |field: &str, default_s: f32| {
            (params.get_f32(&format!("{}.{}", prefix, field), default_s * 1000.0) / 1000.0).max(0.0)
        };
        let curve = AdsrCurve::parse(params.get_str(&format!("{}.curve", prefix), ""))
            .unwrap_or(defaults.curve);

        Self {
            attack_s: ms("attack_ms", defaults.attack_s),
            hold_s: ms("hold_ms", defaults.hold_s),
            decay_s: ms("decay_ms", defaults.decay_s),
            sustain: params
                .get_f32(&format!("{}.sustain", prefix), defaults.sustain)
                .clamp(0.0, 1.0),
            release_s: ms("release_ms", defaults.release_s),
            curve,
        }
    }

    /// Render the gain curve
    ///
    /// # Arguments
    /// * `num_samples` - Output length
    /// * `sample_rate` - Rate the segment times are converted at
    /// * `gate_samples` - Release starts here; `None` gates for the whole buffer
    ///
    /// # Returns
    /// A curve of exactly `num_samples` values in [0, 1]
    pub fn render(&self, num_samples: usize, sample_rate: u32, gate_samples: Option<usize>) -> Vec<f32> {
        let gate = gate_samples.unwrap_or(num_samples).min(num_samples);
        let sustain = self.sustain.clamp(0.0, 1.0);
        let mut env = Vec::with_capacity(num_samples);

        // Pre-release stages stop at the gate
        let stages = [
            (0.0, 1.0, self.attack_s, self.curve),
            (1.0, 1.0, self.hold_s, AdsrCurve::Linear),
            (1.0, sustain, self.decay_s, self.curve),
        ];
        for (from, to, secs, curve) in stages {
            let limit = gate.saturating_sub(env.len());
            push_segment(&mut env, from, to, segment_len(secs, sample_rate), limit, curve);
        }

        // Sustain plateau up to the gate
        env.resize(gate, sustain);

        let level = env.last().copied().unwrap_or(0.0);
        let limit = num_samples.saturating_sub(env.len());
        push_segment(&mut env, level, 0.0, segment_len(self.release_s, sample_rate), limit, self.curve);

        env.resize(num_samples, 0.0);
        env.truncate(num_samples);
        env
    }
}

/// Samples covered by a segment; anything non-zero lasts at least one sample
fn segment_len(secs: f32, sample_rate: u32) -> usize {
    if !(secs > 0.0) {
        return 0;
    }
    ((secs as f64 * sample_rate as f64).round() as usize).max(1)
}

/// Push the first `limit` samples of a `len`-sample segment
fn push_segment(env: &mut Vec<f32>, from: f32, to: f32, len: usize, limit: usize, curve: AdsrCurve) {
    let (from, to) = (from as f64, to as f64);
    for i in 1..=len.min(limit) {
        let x = i as f64 / len as f64;
        env.push((from + (to - from) * curve.shape(x)) as f32);
    }
}
