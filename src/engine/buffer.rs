//! Sample Buffer
//!
//! The mono render result returned by the engine facade, plus the level
//! helpers shared by the DSP stages, QC and tests.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

// ============================================================================
// Constants
// ============================================================================

/// Output sample rate of every instrument (48kHz)
pub const OUTPUT_SAMPLE_RATE: u32 = 48000;

/// Nominal duration of every rendered one-shot in seconds
pub const RENDER_DURATION_SECS: f32 = 0.5;

/// Maximum acceptable DC offset (mean sample value) after the post-chain
pub const DC_OFFSET_THRESHOLD: f32 = 1e-4;

// ============================================================================
// Helper Functions
// ============================================================================

/// Convert decibels to linear amplitude
///
/// # Arguments
/// * `db` - Value in decibels
///
/// # Returns
/// Linear amplitude (0.0 to 1.0+ range)
#[inline]
pub fn db_to_linear(db: f32) -> f32 {
    10.0_f32.powf(db / 20.0)
}

/// Convert linear amplitude to decibels
///
/// # Returns
/// Value in decibels. Returns -f32::INFINITY for zero input.
#[inline]
pub fn linear_to_db(linear: f32) -> f32 {
    if linear <= 0.0 {
        f32::NEG_INFINITY
    } else {
        20.0 * linear.log10()
    }
}

/// Number of samples covering `duration_secs` at `sample_rate` (truncating)
#[inline]
pub fn samples_for_duration(duration_secs: f32, sample_rate: u32) -> usize {
    (duration_secs as f64 * sample_rate as f64) as usize
}

/// Peak absolute value of a slice
pub fn peak(samples: &[f32]) -> f32 {
    samples.iter().map(|s| s.abs()).fold(0.0_f32, f32::max)
}

/// Root-mean-square of a slice, accumulated in f64
pub fn rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum_squares: f64 = samples.iter().map(|&s| (s as f64) * (s as f64)).sum();
    (sum_squares / samples.len() as f64).sqrt() as f32
}

/// Mean sample value of a slice, accumulated in f64
pub fn mean(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    (samples.iter().map(|&s| s as f64).sum::<f64>() / samples.len() as f64) as f32
}

// ============================================================================
// Choke signalling
// ============================================================================

/// How a rendered voice takes part in its choke group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChokeRole {
    /// Triggering this voice must cut any in-flight open voice in the group
    Closing,
    /// This voice's tail may be cut by a closing voice in the group
    Open,
}

/// Choke-group contract attached to a rendered buffer
///
/// The engine renders one buffer at a time and holds no voice state, so the
/// playback layer is responsible for honouring this.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Choke {
    pub group: u32,
    pub role: ChokeRole,
}

// ============================================================================
// SampleBuffer
// ============================================================================

/// Mono 32-bit float buffer at a fixed sample rate
#[derive(Debug, Clone, PartialEq)]
pub struct SampleBuffer {
    samples: Vec<f32>,
    sample_rate: u32,
    choke: Option<Choke>,
}

impl SampleBuffer {
    /// Create a buffer from raw samples
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
            choke: None,
        }
    }

    /// Attach a choke-group signal
    pub fn with_choke(mut self, choke: Option<Choke>) -> Self {
        self.choke = choke;
        self
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn into_samples(self) -> Vec<f32> {
        self.samples
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn choke(&self) -> Option<Choke> {
        self.choke
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Duration in seconds
    pub fn duration_secs(&self) -> f32 {
        self.samples.len() as f32 / self.sample_rate as f32
    }

    /// Peak absolute sample value (linear)
    pub fn peak(&self) -> f32 {
        peak(&self.samples)
    }

    /// RMS level (linear)
    pub fn rms(&self) -> f32 {
        rms(&self.samples)
    }

    /// Mean sample value, i.e. DC offset
    pub fn mean(&self) -> f32 {
        mean(&self.samples)
    }

    /// Peak level in dBFS
    pub fn peak_db(&self) -> f32 {
        linear_to_db(self.peak())
    }

    /// Index of the first NaN or infinite sample, if any
    pub fn first_non_finite(&self) -> Option<usize> {
        self.samples.iter().position(|s| !s.is_finite())
    }

    /// SHA-256 of the little-endian sample bytes, as lowercase hex
    ///
    /// Two renders are bit-identical exactly when their fingerprints match.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        for sample in &self.samples {
            hasher.update(sample.to_le_bytes());
        }
        let hash = hasher.finalize();
        format!("{:x}", hash)
    }
}
