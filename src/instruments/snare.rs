//! Snare: exciter + shared-feedback comb bank + wires
//!
//! The shell is four delay lines tuned around the fundamental. Every block,
//! the four taps are summed and halved, lowpassed with a cutoff that follows
//! the input level, soft-clipped, and `input + loop * feedback` is written
//! back identically into all four lines. There is no mixing matrix: the
//! shared write is what gives the shell its character.

use log::debug;
use serde::{Deserialize, Serialize};

use super::{unit_knob, DrumVoice};
use crate::dsp::delay::DEFAULT_GUARD_SAMPLES;
use crate::dsp::envelope::{exponential_decay, AdsrSpec};
use crate::dsp::filter::{bandpass, highpass, lowpass, peaking_notch, Biquad, FilterMode, FilterType, DEFAULT_Q};
use crate::dsp::mixer::{legacy_normalize, LayerMixer, LayerSpec};
use crate::dsp::oscillator::{sine_from_frequency, triangle};
use crate::dsp::saturation::{hard_clip, soft_clip};
use crate::dsp::{noise, postchain, DelayLine, Oversampling, RenderRng};
use crate::engine::buffer::{peak, samples_for_duration, RENDER_DURATION_SECS};
use crate::engine::{ParamMap, SampleBuffer};
use crate::error::Result;

const OVERSAMPLE_FACTOR: u32 = 2;

/// Shell processing block
const SHELL_BLOCK: usize = 32;

/// Detune of the four shell lines, in cents
const DETUNE_CENTS: [f32; 4] = [0.0, 5.0, -7.0, 12.0];

/// History each shell line can hold
const SHELL_MAX_DELAY: usize = 10_000;

/// Range the shell fundamental is held to so every line fits its buffer
const SHELL_PITCH_RANGE: (f32, f32) = (20.0, 2000.0);

/// Exciter hard-clip threshold
const EXCITER_CLIP_DB: f32 = -2.0;

/// Soft clip inside the feedback loop
const LOOP_CLIP_DB: f32 = -1.0;

/// Box-cut notch bandwidth
const BOX_CUT_Q: f32 = 1.5;

/// Final rumble filter
const MASTER_HPF_HZ: f32 = 80.0;

/// Whether the shell keeps ringing after the hit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RepeatMode {
    /// No feedback: the shell passes the exciter straight through
    #[default]
    Oneshot,
    Roll,
    Echo,
}

impl RepeatMode {
    pub fn parse(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "oneshot" | "one_shot" => Some(RepeatMode::Oneshot),
            "roll" => Some(RepeatMode::Roll),
            "echo" => Some(RepeatMode::Echo),
            _ => None,
        }
    }

    /// Read `snare.behavior.repeat_mode`, falling back to `snare.repeatMode`
    fn from_params(params: &ParamMap) -> Self {
        let name = params
            .lookup("snare.behavior.repeat_mode")
            .or_else(|| params.lookup("snare.repeatMode"))
            .and_then(|v| v.as_str())
            .unwrap_or("oneshot");
        Self::parse(name).unwrap_or_default()
    }

    pub fn uses_feedback(self) -> bool {
        self != RepeatMode::Oneshot
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct SnareMacros {
    tone: f32,
    wire: f32,
    crack: f32,
    body: f32,
}

impl SnareMacros {
    fn from_params(params: &ParamMap) -> Self {
        Self {
            tone: unit_knob(params, "snare", "tone", 0.5),
            wire: unit_knob(params, "snare", "wire", 0.5),
            crack: unit_knob(params, "snare", "crack", 0.5),
            body: unit_knob(params, "snare", "body", 0.5),
        }
    }
}

/// Resolved shell loop settings
#[derive(Debug, Clone, Copy, PartialEq)]
struct ShellLoop {
    fundamental: f32,
    feedback: f32,
    filter_mode: FilterMode,
}

impl ShellLoop {
    fn delay_lengths(&self, sample_rate: u32) -> [f32; 4] {
        DETUNE_CENTS.map(|cents| sample_rate as f32 / (self.fundamental * 2.0_f32.powf(cents / 1200.0)))
    }

    /// Run the comb bank over `input`
    fn process(&self, input: &[f32], sample_rate: u32) -> Vec<f32> {
        let delays = self.delay_lengths(sample_rate);
        let mut lines: Vec<DelayLine> = (0..DETUNE_CENTS.len())
            .map(|_| DelayLine::with_guard(SHELL_MAX_DELAY, DEFAULT_GUARD_SAMPLES))
            .collect();
        let mut lpf = Biquad::new(FilterType::LowPass, sample_rate, 2000.0, DEFAULT_Q);

        let mut out = Vec::with_capacity(input.len());
        for block in input.chunks(SHELL_BLOCK) {
            // Read all taps before anything is written for this block
            let taps: Vec<Vec<f32>> = lines
                .iter()
                .zip(delays.iter())
                .map(|(line, &delay)| line.read(delay, block.len()))
                .collect();
            let mut feedback: Vec<f32> = (0..block.len())
                .map(|i| taps.iter().map(|tap| tap[i]).sum::<f32>() * 0.5)
                .collect();

            let cutoff = 2000.0 + peak(block) * 8000.0;
            match self.filter_mode {
                FilterMode::Stateful => {
                    lpf.retune(cutoff, DEFAULT_Q);
                    lpf.process_block(&mut feedback);
                }
                FilterMode::Stateless => {
                    feedback = lowpass(&feedback, sample_rate, cutoff, DEFAULT_Q);
                }
            }
            soft_clip(&mut feedback, LOOP_CLIP_DB);

            let mixed: Vec<f32> = block
                .iter()
                .zip(feedback.iter())
                .map(|(&x, &fb)| x + fb * self.feedback)
                .collect();
            for line in lines.iter_mut() {
                line.write(&mixed);
            }
            out.extend_from_slice(&mixed);
        }
        out
    }
}

/// Snare drum engine
#[derive(Debug, Clone)]
pub struct SnareEngine {
    oversampling: Oversampling,
}

impl SnareEngine {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            oversampling: Oversampling::new(sample_rate, OVERSAMPLE_FACTOR),
        }
    }

    /// Triangle body, or a pitch-swept sine when a pitch envelope is given
    fn body_oscillator(&self, params: &ParamMap, fundamental: f32, n: usize) -> Vec<f32> {
        let sr = self.oversampling.internal_rate();
        let sweep = params
            .get_opt_f32("snare.shell.pitch_env_st")
            .zip(params.get_opt_f32("snare.shell.pitch_decay_ms"));

        let osc = match sweep {
            Some((semitones, decay_ms)) => {
                let start = fundamental * 2.0_f32.powf(semitones / 12.0);
                let freqs: Vec<f32> = exponential_decay(n, sr, decay_ms.max(0.0) / 1000.0)
                    .into_iter()
                    .map(|e| fundamental + (start - fundamental) * e)
                    .collect();
                sine_from_frequency(&freqs, sr)
            }
            None => triangle(fundamental, n, sr),
        };

        // exp(-20t)
        osc.into_iter()
            .zip(exponential_decay(n, sr, 0.05))
            .map(|(s, e)| s * e)
            .collect()
    }
}

impl DrumVoice for SnareEngine {
    fn name(&self) -> &'static str {
        "snare"
    }

    fn oversampling(&self) -> Oversampling {
        self.oversampling
    }

    fn render(&self, params: &ParamMap, rng: &mut RenderRng) -> Result<SampleBuffer> {
        let macros = SnareMacros::from_params(params);
        let sr = self.oversampling.internal_rate();
        let n = self.oversampling.internal_len(RENDER_DURATION_SECS);

        let fundamental = params
            .get_f32("snare.shell.pitch_hz", 150.0 + macros.tone * 150.0)
            .clamp(SHELL_PITCH_RANGE.0, SHELL_PITCH_RANGE.1);
        let repeat_mode = RepeatMode::from_params(params);

        // ---------- Exciter ----------
        let body = self.body_oscillator(params, fundamental, n);
        let air: Vec<f32> = noise::uniform(n, rng)
            .into_iter()
            .zip(exponential_decay(n, sr, 0.02))
            .map(|(s, e)| s * e)
            .collect();

        let exciter: Vec<f32> = body.iter().zip(air.iter()).map(|(&b, &a)| b * 0.6 + a * 0.4).collect();
        let crack_boost = 2.0 + macros.crack * 2.0;
        let mut exciter: Vec<f32> = exciter
            .iter()
            .zip(bandpass(&exciter, sr, 2000.0, 1.5))
            .map(|(&x, bp)| x + bp * crack_boost)
            .collect();
        hard_clip(&mut exciter, EXCITER_CLIP_DB);

        // ---------- Shell ----------
        let shell = if repeat_mode.uses_feedback() {
            let shell_loop = ShellLoop {
                fundamental,
                feedback: params.get_f32("snare.shell.feedback", 0.85 + macros.body * 0.11),
                filter_mode: FilterMode::parse(params.get_str("snare.shell.filter_mode", "stateful"))
                    .unwrap_or_default(),
            };
            debug!("snare shell: {:?} {:?}", repeat_mode, shell_loop);
            shell_loop.process(&exciter, sr)
        } else {
            debug!("snare shell: oneshot, feedback bypassed");
            exciter
        };

        // ---------- Wires ----------
        let mut wires = bandpass(&noise::white(n, rng), sr, 3000.0, 0.8);
        if let Some(hz) = params.get_opt_f32("snare.wires.filter_hz") {
            wires = highpass(&wires, sr, hz, DEFAULT_Q);
        }
        let wires: Vec<f32> = wires
            .into_iter()
            .zip(exponential_decay(n, sr, 0.2 + macros.wire * 0.3))
            .map(|(s, e)| s * e * macros.wire)
            .collect();

        // ---------- Mix ----------
        let mut mixer = LayerMixer::new("snare");
        mixer.add(LayerSpec::new("exciter_body", AdsrSpec::decay(0.05, 0.0)).muted(), body);
        mixer.add(LayerSpec::new("exciter_air", AdsrSpec::decay(0.02, 0.0)).muted(), air);
        if params.get_bool("snare.room.enabled", false) {
            let room_mix = params.get_f32("snare.room.mix", 0.15);
            let room: Vec<f32> = lowpass(&shell, sr, 800.0, DEFAULT_Q)
                .into_iter()
                .map(|s| s * room_mix)
                .collect();
            mixer.add(LayerSpec::new("room", AdsrSpec::decay(0.4, 0.0)), room);
        }
        mixer.add(LayerSpec::new("shell", AdsrSpec::default()), shell);
        mixer.add(LayerSpec::new("wires", AdsrSpec::default()), wires);
        let mut master = mixer.mix(params, sr);

        // ---------- Bus ----------
        let box_cut = params
            .get_opt_f32("snare.box_cut.hz")
            .zip(params.get_opt_f32("snare.box_cut.db"));
        if let Some((hz, db)) = box_cut {
            if db < 0.0 {
                master = peaking_notch(&master, sr, hz, db, BOX_CUT_Q);
            }
        }
        let master = highpass(&master, sr, MASTER_HPF_HZ, DEFAULT_Q);

        let target_len = samples_for_duration(RENDER_DURATION_SECS, self.oversampling.target_rate);
        let mut out = self.oversampling.downsample(&master, target_len);
        legacy_normalize(&mut out, params);

        postchain::process(out, self.name(), self.oversampling.target_rate, params)
    }
}
