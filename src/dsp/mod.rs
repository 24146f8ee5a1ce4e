//! DSP Primitives
//!
//! Building blocks shared by every instrument engine: oscillators, noise,
//! envelopes, biquad filters, delay lines, nonlinearities, the layer mixer
//! and the output post-chain. Everything here is a plain function or a
//! value owned by one render call.

pub mod compressor;
pub mod delay;
pub mod envelope;
pub mod filter;
pub mod mixer;
pub mod noise;
pub mod oscillator;
pub mod oversample;
pub mod postchain;
pub mod rng;
pub mod saturation;

pub use compressor::Compressor;
pub use delay::DelayLine;
pub use envelope::{AdsrCurve, AdsrSpec};
pub use filter::{Biquad, FilterMode, FilterType};
pub use mixer::{LayerMixer, LayerSpec};
pub use oversample::Oversampling;
pub use rng::RenderRng;
