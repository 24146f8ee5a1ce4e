//! Call-scoped Random Stream
//!
//! Every render owns exactly one `RenderRng`, seeded from the caller's seed
//! and passed `&mut` through the synthesis graph. Draw order is part of the
//! output contract: reordering draws changes the audio.

use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

/// Deterministic PCG-32 stream for one render call
#[derive(Debug, Clone)]
pub struct RenderRng {
    inner: Pcg32,
}

impl RenderRng {
    /// Create a fresh stream from a seed
    pub fn seeded(seed: u64) -> Self {
        Self {
            inner: Pcg32::seed_from_u64(seed),
        }
    }

    /// Uniform draw in [0, 1)
    #[inline]
    pub fn uniform(&mut self) -> f32 {
        self.inner.random::<f32>()
    }

    /// Uniform draw in [-1, 1)
    #[inline]
    pub fn bipolar(&mut self) -> f32 {
        self.uniform() * 2.0 - 1.0
    }

    /// Standard normal draw (Box-Muller, two uniforms per call)
    pub fn gaussian(&mut self) -> f32 {
        // 1 - u keeps the log argument in (0, 1]
        let u1 = 1.0 - self.inner.random::<f64>();
        let u2 = self.inner.random::<f64>();
        ((-2.0 * u1.ln()).sqrt() * (std::f64::consts::TAU * u2).cos()) as f32
    }
}
