//! Kick: dual FM layer
//!
//! Layer A (punch) is a noise-modulated FM sine sweeping from a click-driven
//! start frequency down to `tune`; it is split at 120Hz into the `sub` and
//! `click` layers. Layer B (room) is the same primitive at a fixed tone,
//! delayed by `distance_ms` and scaled by `blend`. A damped-sine `knock`
//! layer sits between them.

use log::debug;

use super::{macro_knob, unit_knob, DrumVoice};
use crate::dsp::envelope::{exponential_decay, AdsrSpec};
use crate::dsp::filter::{highpass, lowpass, DEFAULT_Q};
use crate::dsp::mixer::{legacy_normalize, LayerMixer, LayerSpec};
use crate::dsp::oscillator::{sine, sine_from_frequency};
use crate::dsp::saturation::drive_tanh;
use crate::dsp::{postchain, Compressor, DelayLine, Oversampling, RenderRng};
use crate::engine::buffer::{samples_for_duration, RENDER_DURATION_SECS};
use crate::engine::{ParamMap, SampleBuffer};
use crate::error::Result;

const OVERSAMPLE_FACTOR: u32 = 4;

/// Sub/click split frequency
const CROSSOVER_HZ: f32 = 120.0;

/// Peak frequency deviation of the noise FM term at full index
const FM_DEPTH_HZ: f32 = 5000.0;

/// Room delay line capacity
const MAX_DISTANCE_MS: f32 = 50.0;

/// Block size the room send is streamed through the delay line in
const ROOM_BLOCK: usize = 1024;

/// Macro knobs with their defaults
#[derive(Debug, Clone, Copy, PartialEq)]
struct KickMacros {
    punch_decay: f32,
    click_amount: f32,
    click_snap: f32,
    tune: f32,
    room_tone_freq: f32,
    room_air: f32,
    distance_ms: f32,
    blend: f32,
}

impl KickMacros {
    fn from_params(params: &ParamMap) -> Self {
        Self {
            punch_decay: unit_knob(params, "kick", "punch_decay", 0.3),
            click_amount: unit_knob(params, "kick", "click_amount", 0.5),
            click_snap: unit_knob(params, "kick", "click_snap", 0.01),
            tune: macro_knob(params, "kick", "tune", 45.0).max(1.0),
            room_tone_freq: macro_knob(params, "kick", "room_tone_freq", 150.0).max(1.0),
            room_air: unit_knob(params, "kick", "room_air", 0.3),
            distance_ms: macro_knob(params, "kick", "distance_ms", 10.0).clamp(0.0, MAX_DISTANCE_MS),
            blend: unit_knob(params, "kick", "blend", 0.3),
        }
    }
}

/// Sine carrier with exponential pitch sweep and noise FM
#[derive(Debug, Clone, Copy)]
struct FmLayer {
    start_freq: f32,
    end_freq: f32,
    pitch_decay: f32,
    amp_decay: f32,
    fm_index: f32,
    fm_decay: f32,
}

impl FmLayer {
    /// Draws one gaussian per sample from `rng`
    fn render(&self, num_samples: usize, sample_rate: u32, rng: &mut RenderRng) -> Vec<f32> {
        let pitch_env = exponential_decay(num_samples, sample_rate, self.pitch_decay);
        let fm_env = exponential_decay(num_samples, sample_rate, self.fm_decay);

        let inst_freq: Vec<f32> = pitch_env
            .iter()
            .zip(fm_env.iter())
            .map(|(&p, &f)| {
                let pitch = self.end_freq + (self.start_freq - self.end_freq) * p;
                pitch + rng.gaussian() * f * self.fm_index * FM_DEPTH_HZ
            })
            .collect();

        let amp_env = exponential_decay(num_samples, sample_rate, self.amp_decay);
        sine_from_frequency(&inst_freq, sample_rate)
            .into_iter()
            .zip(amp_env)
            .map(|(s, a)| s * a)
            .collect()
    }
}

/// Kick drum engine
#[derive(Debug, Clone)]
pub struct KickEngine {
    oversampling: Oversampling,
}

impl KickEngine {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            oversampling: Oversampling::new(sample_rate, OVERSAMPLE_FACTOR),
        }
    }

    /// Layer B streamed through a single-tap delay line
    fn room(&self, macros: &KickMacros, num_samples: usize, rng: &mut RenderRng) -> Vec<f32> {
        let sr = self.oversampling.internal_rate();
        let tone = FmLayer {
            start_freq: macros.room_tone_freq,
            end_freq: macros.room_tone_freq,
            pitch_decay: 1.0,
            amp_decay: 0.2,
            fm_index: macros.room_air * 0.2,
            fm_decay: 0.1,
        }
        .render(num_samples, sr, rng);

        let max_delay = samples_for_duration(MAX_DISTANCE_MS / 1000.0, sr);
        let mut line = DelayLine::new(max_delay + ROOM_BLOCK);
        let delay = (macros.distance_ms / 1000.0 * sr as f32).min(max_delay as f32);

        // Feed-forward tap: each block is written before it is read
        let mut out = Vec::with_capacity(num_samples);
        for block in tone.chunks(ROOM_BLOCK) {
            line.write(block);
            let delayed = line.read(delay + block.len() as f32, block.len());
            out.extend(delayed.into_iter().map(|s| s * macros.blend));
        }
        out
    }
}

impl DrumVoice for KickEngine {
    fn name(&self) -> &'static str {
        "kick"
    }

    fn oversampling(&self) -> Oversampling {
        self.oversampling
    }

    fn render(&self, params: &ParamMap, rng: &mut RenderRng) -> Result<SampleBuffer> {
        let macros = KickMacros::from_params(params);
        let sr = self.oversampling.internal_rate();
        let n = self.oversampling.internal_len(RENDER_DURATION_SECS);
        debug!("kick render: {:?}", macros);

        // ---------- Layer A: sub + click ----------
        let punch_layer = FmLayer {
            start_freq: 150.0 + macros.click_amount * 100.0,
            end_freq: macros.tune,
            pitch_decay: 0.08,
            amp_decay: 0.1 + macros.punch_decay * 0.4,
            fm_index: macros.click_amount,
            fm_decay: 0.005 + macros.click_snap * 0.02,
        };
        let punch = punch_layer.render(n, sr, rng);
        let sub = lowpass(&punch, sr, CROSSOVER_HZ, DEFAULT_Q);
        let click = highpass(&punch, sr, CROSSOVER_HZ, DEFAULT_Q);

        // ---------- Knock: damped sine ----------
        let freq_norm = params.get_f32("kick.knock.freq_norm", 0.5).clamp(0.0, 1.0);
        let knock_decay = params.get_f32("kick.knock.decay_ms", 50.0).max(0.0) / 1000.0;
        let knock: Vec<f32> = sine(110.0 + 130.0 * freq_norm, 0.0, n, sr)
            .into_iter()
            .zip(exponential_decay(n, sr, knock_decay))
            .map(|(s, e)| s * e)
            .collect();

        // ---------- Mix ----------
        let mut mixer = LayerMixer::new("kick");
        mixer.add(LayerSpec::new("sub", AdsrSpec::decay(punch_layer.amp_decay, 0.0)), sub);
        mixer.add(LayerSpec::new("click", AdsrSpec::decay(punch_layer.fm_decay, 0.0)), click);
        mixer.add(LayerSpec::new("knock", AdsrSpec::decay(0.05, 0.0)), knock);
        if params.get_bool("kick.room.enabled", true) {
            let room = self.room(&macros, n, rng);
            mixer.add(LayerSpec::new("room", AdsrSpec::decay(0.2, 0.0)), room);
        }
        let mut master = mixer.mix(params, sr);

        // ---------- Bus ----------
        drive_tanh(&mut master, 1.0 + macros.click_amount * 0.5);
        Compressor::from_params(params, "kick.comp").process(&mut master, sr);

        let target_len = samples_for_duration(RENDER_DURATION_SECS, self.oversampling.target_rate);
        let mut out = self.oversampling.downsample(&master, target_len);
        legacy_normalize(&mut out, params);

        postchain::process(out, self.name(), self.oversampling.target_rate, params)
    }
}
