//! Render Engine
//!
//! Entry point of the crate: picks the instrument engine, creates the
//! call-scoped random stream from the seed and returns the post-processed
//! buffer. Every call is pure; nothing is shared between renders.

pub mod buffer;
pub mod io;
pub mod params;

use std::fmt;
use std::str::FromStr;

use log::debug;
use serde::{Deserialize, Serialize};

pub use buffer::{Choke, ChokeRole, SampleBuffer, OUTPUT_SAMPLE_RATE};
pub use io::{export_wav, import_wav};
pub use params::ParamMap;

use crate::dsp::RenderRng;
use crate::error::{EngineError, Result};
use crate::instruments::{DrumVoice, HatEngine, KickEngine, SnareEngine};

/// The drum voices the engine can render
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Instrument {
    Kick,
    Snare,
    Hat,
}

impl Instrument {
    pub const ALL: [Instrument; 3] = [Instrument::Kick, Instrument::Snare, Instrument::Hat];

    pub fn name(&self) -> &'static str {
        match self {
            Instrument::Kick => "kick",
            Instrument::Snare => "snare",
            Instrument::Hat => "hat",
        }
    }

    /// Engine for this instrument at the output rate
    pub fn voice(&self) -> Box<dyn DrumVoice> {
        match self {
            Instrument::Kick => Box::new(KickEngine::new(OUTPUT_SAMPLE_RATE)),
            Instrument::Snare => Box::new(SnareEngine::new(OUTPUT_SAMPLE_RATE)),
            Instrument::Hat => Box::new(HatEngine::new(OUTPUT_SAMPLE_RATE)),
        }
    }
}

impl fmt::Display for Instrument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Instrument {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "kick" => Ok(Instrument::Kick),
            "snare" => Ok(Instrument::Snare),
            "hat" | "hihat" | "hi-hat" => Ok(Instrument::Hat),
            _ => Err(EngineError::UnknownInstrument { name: s.to_string() }),
        }
    }
}

/// Render one hit
///
/// # Arguments
/// * `instrument` - Which voice to render
/// * `params` - Parameter map; missing keys take their defaults
/// * `seed` - Seed of the render's random stream
///
/// # Returns
/// * `Ok(SampleBuffer)` - 0.5 s of mono audio at 48 kHz
/// * `Err(EngineError::NonFiniteOutput)` - If the graph produced NaN/Inf
pub fn render(instrument: Instrument, params: &ParamMap, seed: u64) -> Result<SampleBuffer> {
    debug!("render {} seed={}", instrument, seed);
    let mut rng = RenderRng::seeded(seed);
    instrument.voice().render(params, &mut rng)
}

/// Render by instrument name
pub fn render_named(name: &str, params: &ParamMap, seed: u64) -> Result<SampleBuffer> {
    render(name.parse()?, params, seed)
}
