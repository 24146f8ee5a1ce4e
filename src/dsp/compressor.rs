//! RMS Compressor
//!
//! Feed-forward compressor for the kick bus: a centred 10ms RMS detector,
//! an attack/release smoother, and a static gain computer above threshold.

use crate::engine::buffer::db_to_linear;
use crate::engine::params::ParamMap;

/// RMS detector window length in seconds
const RMS_WINDOW_SECS: f32 = 0.01;

/// Compressor settings; a ratio of 1 or less bypasses the stage
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Compressor {
    pub ratio: f32,
    pub threshold_db: f32,
    pub attack_ms: f32,
    pub release_ms: f32,
}

impl Default for Compressor {
    fn default() -> Self {
        Self {
            ratio: 1.0,
            threshold_db: -12.0,
            attack_ms: 5.0,
            release_ms: 50.0,
        }
    }
}

impl Compressor {
    /// Read `{prefix}.{ratio,threshold_db,attack_ms,release_ms}`
    pub fn from_params(params: &ParamMap, prefix: &str) -> Self {
        let d = Self::default();
        let key = |field: &str| format!("{}.{}", prefix, field);
        Self {
            ratio: params.get_f32(&key("ratio"), d.ratio),
            threshold_db: params.get_f32(&key("threshold_db"), d.threshold_db),
            attack_ms: params.get_f32(&key("attack_ms"), d.attack_ms).max(0.0),
            release_ms: params.get_f32(&key("release_ms"), d.release_ms).max(0.0),
        }
    }

    pub fn is_bypassed(&self) -> bool {
        self.ratio <= 1.0
    }

    /// One-pole smoothing coefficient for a time constant in ms (0 = instant)
    fn coeff(ms: f32, sample_rate: u32) -> f64 {
        if ms > 0.0 {
            (-1.0 / (ms as f64 * 1e-3 * sample_rate as f64)).exp()
        } else {
            0.0
        }
    }

    /// Compress `samples` in place
    pub fn process(&self, samples: &mut [f32], sample_rate: u32) {
        if self.is_bypassed() || samples.is_empty() {
            return;
        }

        let n = samples.len();
        let threshold = db_to_linear(self.threshold_db) as f64;
        let half_window = (((sample_rate as f32 * RMS_WINDOW_SECS) as usize).max(1) / 2).max(1);

        // Prefix sums of squares for the centred RMS window
        let mut prefix = Vec::with_capacity(n + 1);
        prefix.push(0.0_f64);
        for &s in samples.iter() {
            let last = prefix[prefix.len() - 1];
            prefix.push(last + (s as f64) * (s as f64));
        }

        let attack = Self::coeff(self.attack_ms, sample_rate);
        let release = Self::coeff(self.release_ms, sample_rate);
        let ratio = self.ratio as f64;

        let mut env = 0.0_f64;
        for i in 0..n {
            let start = i.saturating_sub(half_window);
            let end = (i + half_window).min(n);
            let rms = ((prefix[end] - prefix[start]) / (end - start) as f64 + 1e-12).sqrt();

            env = if i == 0 {
                rms
            } else {
                let coeff = if rms > env { attack } else { release };
                rms + (env - rms) * coeff
            };

            if env > threshold {
                let gain = (threshold / env + ((env - threshold) / ratio) / env).clamp(0.1, 1.0);
                samples[i] = (samples[i] as f64 * gain) as f32;
            }
        }
    }
}
