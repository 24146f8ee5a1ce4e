//! Instrument Engines
//!
//! Each engine composes the shared primitives into a layer graph at its
//! oversampled rate, hands the layers to the [`LayerMixer`], applies its own
//! bus shaping and returns through the post-chain.
//!
//! [`LayerMixer`]: crate::dsp::LayerMixer

mod hat;
mod kick;
mod snare;

pub use hat::{DirtMode, HatEngine};
pub use kick::KickEngine;
pub use snare::{RepeatMode, SnareEngine};

use crate::dsp::{Oversampling, RenderRng};
use crate::engine::{ParamMap, SampleBuffer};
use crate::error::Result;

/// A one-shot drum voice
pub trait DrumVoice: Send + Sync {
    /// Instrument name, also the param-key prefix (`"kick"`, ...)
    fn name(&self) -> &'static str;

    /// Internal rate plan for this voice
    fn oversampling(&self) -> Oversampling;

    /// Render one buffer at the output rate, drawing noise from `rng`
    fn render(&self, params: &ParamMap, rng: &mut RenderRng) -> Result<SampleBuffer>;
}

/// Read a macro knob from `{instrument}.{name}` or the root `{name}`
fn macro_knob(params: &ParamMap, instrument: &str, name: &str, default: f32) -> f32 {
    params.get_first_f32(&[&format!("{}.{}", instrument, name), name], default)
}

/// A macro knob normalized to [0, 1]
fn unit_knob(params: &ParamMap, instrument: &str, name: &str, default: f32) -> f32 {
    macro_knob(params, instrument, name, default).clamp(0.0, 1.0)
}
