//! Layer Mixer
//!
//! Each instrument hands the mixer its named raw layers together with their
//! defaults. For every layer the mixer reads
//! `{instrument}.{layer}.gain_db`, `{instrument}.{layer}.mute` and
//! `{instrument}.{layer}.amp.*`, applies gain and envelope, and sums the
//! unmuted layers.

use log::warn;

use super::envelope::AdsrSpec;
use crate::engine::params::ParamMap;

/// Peak level used by the deprecated legacy normalize path
pub const LEGACY_NORMALIZE_PEAK: f32 = 0.95;

/// Defaults for one named layer
#[derive(Debug, Clone, PartialEq)]
pub struct LayerSpec {
    pub name: &'static str,
    pub gain_db: f32,
    pub mute: bool,
    pub envelope: AdsrSpec,
}

impl LayerSpec {
    /// Unmuted layer at 0 dB with the given default envelope
    pub fn new(name: &'static str, envelope: AdsrSpec) -> Self {
        Self {
            name,
            gain_db: 0.0,
            mute: false,
            envelope,
        }
    }

    /// Mute the layer unless the params unmute it
    pub fn muted(mut self) -> Self {
        self.mute = true;
        self
    }
}

/// Collects raw layers for one instrument and sums them
#[derive(Debug)]
pub struct LayerMixer {
    instrument: &'static str,
    layers: Vec<(LayerSpec, Vec<f32>)>,
}

impl LayerMixer {
    pub fn new(instrument: &'static str) -> Self {
        Self {
            instrument,
            layers: Vec::new(),
        }
    }

    /// Register a layer; a layer with the same name is replaced
    pub fn add(&mut self, spec: LayerSpec, audio: Vec<f32>) {
        match self.layers.iter_mut().find(|(s, _)| s.name == spec.name) {
            Some(slot) => *slot = (spec, audio),
            None => self.layers.push((spec, audio)),
        }
    }

    pub fn layer_names(&self) -> Vec<&'static str> {
        self.layers.iter().map(|(s, _)| s.name).collect()
    }

    fn reference_len(&self) -> usize {
        self.layers.iter().map(|(_, a)| a.len()).max().unwrap_or(0)
    }

    /// One layer after gain, mute and envelope, at the mix length
    ///
    /// Returns `None` for unknown or muted layers.
    pub fn contribution(&self, name: &str, params: &ParamMap, sample_rate: u32) -> Option<Vec<f32>> {
        let (spec, audio) = self.layers.iter().find(|(s, _)| s.name == name)?;
        let prefix = format!("{}.{}", self.instrument, spec.name);

        if params.get_bool(&format!("{}.mute", prefix), spec.mute) {
            return None;
        }

        let gain = params.get_db_gain(&format!("{}.gain_db", prefix), spec.gain_db);
        let len = self.reference_len();
        let envelope = AdsrSpec::from_params(params, &format!("{}.amp", prefix), spec.envelope)
            .render(len, sample_rate, None);

        let mut out = audio.clone();
        out.resize(len, 0.0);
        for (s, e) in out.iter_mut().zip(envelope.iter()) {
            *s *= gain * e;
        }
        Some(out)
    }

    /// Sum of every unmuted layer
    pub fn mix(&self, params: &ParamMap, sample_rate: u32) -> Vec<f32> {
        let mut master = vec![0.0_f32; self.reference_len()];
        for (spec, _) in &self.layers {
            if let Some(layer) = self.contribution(spec.name, params, sample_rate) {
                for (m, s) in master.iter_mut().zip(layer.iter()) {
                    *m += s;
                }
            }
        }
        master
    }
}

/// Deprecated: peak-normalize the mix when `legacy_normalize` is set
///
/// Normalizing to a fixed peak cancels any per-layer gain change, so this is
/// off unless explicitly requested. Returns whether it ran.
pub fn legacy_normalize(samples: &mut [f32], params: &ParamMap) -> bool {
    if !params.get_bool("legacy_normalize", false) {
        return false;
    }
    warn!("legacy_normalize is deprecated: it cancels per-layer gain changes");
    let peak = samples.iter().map(|s| s.abs()).fold(0.0_f32, f32::max);
    if peak > 0.0 {
        let scale = LEGACY_NORMALIZE_PEAK / peak;
        samples.iter_mut().for_each(|s| *s *= scale);
    }
    true
}
