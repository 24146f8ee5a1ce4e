//! Hi-hat: inharmonic square bank + pink air + chick transient
//!
//! The summed layers share one global decay set by `tightness`, are
//! highpassed by `color` and optionally dirtied before decimation.

use log::debug;
use serde::{Deserialize, Serialize};

use super::{unit_knob, DrumVoice};
use crate::dsp::envelope::{exponential_decay, AdsrSpec};
use crate::dsp::filter::{bandpass, highpass, DEFAULT_Q};
use crate::dsp::mixer::{legacy_normalize, LayerMixer, LayerSpec};
use crate::dsp::oscillator::square;
use crate::dsp::saturation::{drive_tanh, sample_and_hold};
use crate::dsp::{noise, postchain, Oversampling, RenderRng};
use crate::engine::buffer::{samples_for_duration, RENDER_DURATION_SECS};
use crate::engine::{Choke, ChokeRole, ParamMap, SampleBuffer};
use crate::error::Result;

const OVERSAMPLE_FACTOR: u32 = 4;

/// Frequency ratios of the metal bank
const METAL_RATIOS: [f32; 6] = [1.0, 1.5, 1.6, 1.8, 2.2, 3.2];

/// Parallel resonances the metal bank is averaged through: (center, Q)
const METAL_RESONANCES: [(f32, f32); 3] = [(6000.0, 3.0), (9000.0, 4.0), (12000.0, 5.0)];

const AIR_HPF_HZ: f32 = 7000.0;
const CHICK_HPF_HZ: f32 = 4000.0;
const CHICK_SECS: f32 = 0.002;

/// Emphasis corner of the saturate dirt path
const DIRT_EMPHASIS_HZ: f32 = 4000.0;

/// How `hat.dirt` degrades the signal, selected by `hat.dirt_mode`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DirtMode {
    /// Sample-and-hold rate reduction followed by tanh
    #[default]
    Crush,
    /// Pre-emphasized tanh saturation, no rate reduction
    Saturate,
}

impl DirtMode {
    pub fn parse(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "crush" | "bitcrush" => Some(DirtMode::Crush),
            "saturate" | "wavefold" => Some(DirtMode::Saturate),
            _ => None,
        }
    }

    fn from_params(params: &ParamMap) -> Self {
        if params.get_bool("hat.legacy_bitcrush", false) {
            return DirtMode::Crush;
        }
        Self::parse(params.get_str("hat.dirt_mode", "crush")).unwrap_or_default()
    }

    /// Apply the stage in place; `dirt <= 0` is a bypass
    pub fn apply(self, samples: &mut [f32], sample_rate: u32, dirt: f32) {
        if dirt <= 0.0 {
            return;
        }
        match self {
            DirtMode::Crush => {
                let hold_rate = 48000.0 - dirt * 36000.0;
                let factor = ((sample_rate as f32 / hold_rate) as usize).max(1);
                sample_and_hold(samples, factor);
                drive_tanh(samples, 1.0 + dirt);
            }
            DirtMode::Saturate => {
                let emphasis = highpass(samples, sample_rate, DIRT_EMPHASIS_HZ, 0.5);
                for (s, e) in samples.iter_mut().zip(emphasis) {
                    *s += e * dirt * 0.5;
                }
                drive_tanh(samples, 1.0 + 2.0 * dirt);
                let deemphasis = highpass(samples, sample_rate, DIRT_EMPHASIS_HZ, 0.5);
                for (s, d) in samples.iter_mut().zip(deemphasis) {
                    *s -= d * dirt * 0.3;
                }
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct HatMacros {
    tightness: f32,
    sheen: f32,
    dirt: f32,
    color: f32,
}

impl HatMacros {
    fn from_params(params: &ParamMap) -> Self {
        Self {
            tightness: unit_knob(params, "hat", "tightness", 0.5),
            sheen: unit_knob(params, "hat", "sheen", 0.5),
            dirt: unit_knob(params, "hat", "dirt", 0.5),
            color: unit_knob(params, "hat", "color", 0.5),
        }
    }

    /// Global decay time constant in seconds
    fn decay_tau(&self) -> f32 {
        0.8 - self.tightness * 0.76
    }
}

/// Hi-hat engine
#[derive(Debug, Clone)]
pub struct HatEngine {
    oversampling: Oversampling,
}

impl HatEngine {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            oversampling: Oversampling::new(sample_rate, OVERSAMPLE_FACTOR),
        }
    }

    /// Six detuned squares through the resonance bank
    ///
    /// All ratio jitters are drawn before any phase.
    fn metal(&self, macros: &HatMacros, jitter: f32, n: usize, rng: &mut RenderRng) -> Vec<f32> {
        let sr = self.oversampling.internal_rate();
        let base = 300.0 + macros.color * 200.0;

        let freqs: Vec<f32> = METAL_RATIOS
            .iter()
            .map(|ratio| base * ratio * (1.0 + rng.uniform() * jitter))
            .collect();

        let mut bank = vec![0.0_f32; n];
        for freq in freqs {
            let phase = rng.uniform() * std::f32::consts::TAU;
            for (acc, s) in bank.iter_mut().zip(square(freq, phase, n, sr)) {
                *acc += s;
            }
        }

        let mut out = vec![0.0_f32; n];
        for (center, q) in METAL_RESONANCES {
            for (acc, s) in out.iter_mut().zip(bandpass(&bank, sr, center, q)) {
                *acc += s;
            }
        }
        let count = METAL_RESONANCES.len() as f32;
        out.iter_mut().for_each(|s| *s /= count);
        out
    }

    fn choke(params: &ParamMap) -> Option<Choke> {
        if !params.get_bool("hat.choke_group", true) {
            return None;
        }
        let group = params.get_f32("hat.choke_id", 1.0).max(0.0) as u32;
        let role = if params.get_bool("hat.open", false) {
            ChokeRole::Open
        } else {
            ChokeRole::Closing
        };
        Some(Choke { group, role })
    }
}

impl DrumVoice for HatEngine {
    fn name(&self) -> &'static str {
        "hat"
    }

    fn oversampling(&self) -> Oversampling {
        self.oversampling
    }

    fn render(&self, params: &ParamMap, rng: &mut RenderRng) -> Result<SampleBuffer> {
        let macros = HatMacros::from_params(params);
        let dirt_mode = DirtMode::from_params(params);
        let sr = self.oversampling.internal_rate();
        let n = self.oversampling.internal_len(RENDER_DURATION_SECS);
        debug!("hat render: {:?} dirt={:?}", macros, dirt_mode);

        let jitter = params.get_f32("hat.metal.ratio_jitter", 0.1).max(0.0);
        let metal = self.metal(&macros, jitter, n, rng);

        let air_gain = macros.sheen * 0.5 + 0.2;
        let air: Vec<f32> = highpass(&noise::pink(n, rng), sr, AIR_HPF_HZ, DEFAULT_Q)
            .into_iter()
            .map(|s| s * air_gain)
            .collect();

        let burst_len = samples_for_duration(CHICK_SECS, sr).clamp(1, n.max(1));
        let mut burst = noise::white(burst_len, rng);
        burst.resize(n, 0.0);
        let chick: Vec<f32> = highpass(&burst, sr, CHICK_HPF_HZ, DEFAULT_Q)
            .into_iter()
            .map(|s| s * 0.5)
            .collect();

        // Layer envelopes hold at sustain 1; the global decay does the shaping
        let layer_env = AdsrSpec::decay(macros.decay_tau().min(0.99 * RENDER_DURATION_SECS), 1.0);
        let mut mixer = LayerMixer::new("hat");
        mixer.add(LayerSpec::new("metal", layer_env), metal);
        mixer.add(LayerSpec::new("air", layer_env), air);
        mixer.add(LayerSpec::new("chick", layer_env), chick);

        let mix: Vec<f32> = mixer
            .mix(params, sr)
            .into_iter()
            .zip(exponential_decay(n, sr, macros.decay_tau()))
            .map(|(s, e)| s * e)
            .collect();

        let mut master = highpass(&mix, sr, 3000.0 + macros.color * 1000.0, DEFAULT_Q);
        dirt_mode.apply(&mut master, sr, macros.dirt);

        let target_len = samples_for_duration(RENDER_DURATION_SECS, self.oversampling.target_rate);
        let mut out = self.oversampling.downsample(&master, target_len);
        legacy_normalize(&mut out, params);

        let buffer = postchain::process(out, self.name(), self.oversampling.target_rate, params)?;
        Ok(buffer.with_choke(Self::choke(params)))
    }
}
