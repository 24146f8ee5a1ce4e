//! Quality Control
//!
//! Post-render analysis of a one-shot: level, DC and band-energy metrics,
//! checked against per-instrument thresholds. QC never alters audio; it
//! reports metrics, failures and warnings with an overall status.

use std::collections::BTreeMap;

use rustfft::{num_complex::Complex, FftPlanner};
use serde::{Deserialize, Serialize};

use crate::engine::buffer::{linear_to_db, DC_OFFSET_THRESHOLD};
use crate::engine::{Instrument, SampleBuffer};

/// Below this the buffer is considered silent
const SILENCE_PEAK: f32 = 1e-6;

/// Energy floor for ratio denominators
const ENERGY_FLOOR: f64 = 1e-12;

/// Narrow bands scanned for tail ringing
const RINGING_BANDS: [(f32, f32); 5] = [
    (400.0, 500.0),
    (500.0, 700.0),
    (700.0, 1000.0),
    (1000.0, 1500.0),
    (1500.0, 2000.0),
];

/// Overall QC verdict; ordered from best to worst
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum QcStatus {
    Pass,
    Warn,
    Fail,
}

/// Per-instrument limits
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QcThresholds {
    pub peak_dbfs_min: f32,
    pub peak_dbfs_max: f32,
    pub aliasing_proxy_max: f32,
    pub sub_ratio_min: f32,
    pub body_ratio_min: f32,
    pub boxiness_ratio_max: f32,
    pub crack_ratio_min: f32,
    pub ringing_proxy_max: f32,
    pub energy_below_3k_max_pct: f32,
}

impl Default for QcThresholds {
    fn default() -> Self {
        Self {
            peak_dbfs_min: -1.0,
            peak_dbfs_max: -0.1,
            aliasing_proxy_max: 0.5,
            sub_ratio_min: 0.2,
            body_ratio_min: 0.01,
            boxiness_ratio_max: 0.15,
            crack_ratio_min: 0.01,
            ringing_proxy_max: 0.3,
            energy_below_3k_max_pct: 10.0,
        }
    }
}

/// Result of [`analyze`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QcReport {
    pub instrument: Instrument,
    pub status: QcStatus,
    pub metrics: BTreeMap<String, f32>,
    pub failures: Vec<String>,
    pub warnings: Vec<String>,
}

impl QcReport {
    fn new(instrument: Instrument) -> Self {
        Self {
            instrument,
            status: QcStatus::Pass,
            metrics: BTreeMap::new(),
            failures: Vec::new(),
            warnings: Vec::new(),
        }
    }

    pub fn metric(&self, name: &str) -> Option<f32> {
        self.metrics.get(name).copied()
    }

    fn record(&mut self, name: &str, value: f32) {
        self.metrics.insert(name.to_string(), value);
    }

    fn finish(mut self) -> Self {
        self.status = if !self.failures.is_empty() {
            QcStatus::Fail
        } else if !self.warnings.is_empty() {
            QcStatus::Warn
        } else {
            QcStatus::Pass
        };
        self
    }
}

// ============================================================================
// Spectrum
// ============================================================================

/// One-sided power spectrum, zero-padded to a power of two
#[derive(Debug, Clone)]
pub struct PowerSpectrum {
    power: Vec<f64>,
    bin_hz: f32,
}

impl PowerSpectrum {
    pub fn new(samples: &[f32], sample_rate: u32) -> Self {
        if samples.len() < 2 {
            return Self {
                power: Vec::new(),
                bin_hz: 0.0,
            };
        }
        let n_fft = samples.len().next_power_of_two();
        let mut buffer: Vec<Complex<f32>> = samples.iter().map(|&s| Complex::new(s, 0.0)).collect();
        buffer.resize(n_fft, Complex::new(0.0, 0.0));
        FftPlanner::new().plan_fft_forward(n_fft).process(&mut buffer);

        let power = buffer[..=n_fft / 2].iter().map(|c| c.norm_sqr() as f64).collect();
        Self {
            power,
            bin_hz: sample_rate as f32 / n_fft as f32,
        }
    }

    /// Summed power of bins with `low_hz <= f <= high_hz`
    pub fn band_energy(&self, low_hz: f32, high_hz: f32) -> f64 {
        self.power
            .iter()
            .enumerate()
            .filter(|(k, _)| {
                let f = *k as f32 * self.bin_hz;
                f >= low_hz && f <= high_hz
            })
            .map(|(_, p)| p)
            .sum()
    }

    /// `band / total(20 Hz..nyquist)`, zero when the total is negligible
    pub fn band_ratio(&self, low_hz: f32, high_hz: f32, nyquist: f32) -> f32 {
        ratio(self.band_energy(low_hz, high_hz), self.band_energy(20.0, nyquist))
    }
}

fn ratio(num: f64, den: f64) -> f32 {
    if den < ENERGY_FLOOR {
        0.0
    } else {
        (num / den) as f32
    }
}

/// Energy above 12 kHz relative to 5-10 kHz
fn aliasing_proxy(spectrum: &PowerSpectrum, nyquist: f32) -> f32 {
    ratio(spectrum.band_energy(12000.0, nyquist), spectrum.band_energy(5000.0, 10000.0))
}

/// Worst tail (last half) to attack (first tenth) energy ratio across the ringing bands
fn ringing_proxy(samples: &[f32], sample_rate: u32) -> f32 {
    let n = samples.len();
    if n < 100 {
        return 0.0;
    }
    let attack = PowerSpectrum::new(&samples[..n / 10], sample_rate);
    let tail = PowerSpectrum::new(&samples[n / 2..], sample_rate);

    RINGING_BANDS
        .iter()
        .filter_map(|&(lo, hi)| {
            let attack_energy = attack.band_energy(lo, hi);
            (attack_energy >= ENERGY_FLOOR).then(|| (tail.band_energy(lo, hi) / attack_energy) as f32)
        })
        .fold(0.0, f32::max)
}

// ============================================================================
// Analysis
// ============================================================================

/// Analyze a render with the default thresholds
pub fn analyze(instrument: Instrument, buffer: &SampleBuffer) -> QcReport {
    analyze_with(instrument, buffer, &QcThresholds::default())
}

/// Analyze a render against explicit thresholds
pub fn analyze_with(instrument: Instrument, buffer: &SampleBuffer, limits: &QcThresholds) -> QcReport {
    let mut report = QcReport::new(instrument);
    let samples = buffer.samples();
    let sr = buffer.sample_rate();
    let nyquist = sr as f32 / 2.0;

    // ---------- Level ----------
    let peak = buffer.peak();
    let rms = buffer.rms();
    let peak_dbfs = linear_to_db(peak);
    report.record("peak_linear", peak);
    report.record("peak_dbfs", peak_dbfs);
    report.record("rms_linear", rms);
    report.record("rms_dbfs", linear_to_db(rms));
    report.record("crest_factor", peak / (rms + 1e-12));
    report.record("dc_offset", buffer.mean());

    if let Some(index) = buffer.first_non_finite() {
        report.failures.push(format!("Non-finite sample at index {}", index));
        return report.finish();
    }
    if peak < SILENCE_PEAK {
        report.failures.push("Render is silent".to_string());
        return report.finish();
    }
    if peak_dbfs < limits.peak_dbfs_min {
        report.failures.push(format!(
            "Peak too low: {:.2} dBFS < {:.2} dBFS",
            peak_dbfs, limits.peak_dbfs_min
        ));
    } else if peak_dbfs > limits.peak_dbfs_max {
        report.failures.push(format!(
            "Peak too high (clipping risk): {:.2} dBFS > {:.2} dBFS",
            peak_dbfs, limits.peak_dbfs_max
        ));
    }
    if buffer.mean().abs() > DC_OFFSET_THRESHOLD {
        report
            .failures
            .push(format!("DC offset {:.2e} exceeds {:.0e}", buffer.mean(), DC_OFFSET_THRESHOLD));
    }

    // ---------- Spectrum ----------
    let spectrum = PowerSpectrum::new(samples, sr);
    let aliasing = aliasing_proxy(&spectrum, nyquist);
    report.record("aliasing_proxy", aliasing);
    if aliasing > limits.aliasing_proxy_max {
        report.warnings.push(format!(
            "Aliasing proxy high: {:.4} > {:.4}",
            aliasing, limits.aliasing_proxy_max
        ));
    }

    match instrument {
        Instrument::Kick => {
            let sub = spectrum.band_ratio(20.0, 100.0, nyquist);
            report.record("sub_ratio", sub);
            report.record("click_ratio", spectrum.band_ratio(2000.0, 8000.0, nyquist));
            if sub < limits.sub_ratio_min {
                report
                    .warnings
                    .push(format!("Sub energy low: {:.4} < {:.4}", sub, limits.sub_ratio_min));
            }
        }
        Instrument::Snare => {
            let body = spectrum.band_ratio(150.0, 250.0, nyquist);
            let boxiness = spectrum.band_ratio(300.0, 600.0, nyquist);
            let crack = spectrum.band_ratio(5000.0, 8000.0, nyquist);
            let ringing = ringing_proxy(samples, sr);
            report.record("body_ratio", body);
            report.record("boxiness_ratio", boxiness);
            report.record("crack_ratio", crack);
            report.record("ringing_proxy", ringing);

            if body < limits.body_ratio_min {
                report
                    .failures
                    .push(format!("Body energy too low: {:.4} < {:.4}", body, limits.body_ratio_min));
            }
            if boxiness > limits.boxiness_ratio_max {
                report.warnings.push(format!(
                    "Boxiness high: {:.4} > {:.4}",
                    boxiness, limits.boxiness_ratio_max
                ));
            }
            if crack < limits.crack_ratio_min {
                report
                    .warnings
                    .push(format!("Crack energy low: {:.4} < {:.4}", crack, limits.crack_ratio_min));
            }
            if ringing > limits.ringing_proxy_max {
                report.warnings.push(format!(
                    "Ringing detected: {:.4} > {:.4}",
                    ringing, limits.ringing_proxy_max
                ));
            }
        }
        Instrument::Hat => {
            let low = spectrum.band_energy(20.0, 3000.0);
            let high = spectrum.band_energy(3000.0, nyquist);
            let below_3k_pct = ratio(low, low + high) * 100.0;
            report.record("energy_below_3k_pct", below_3k_pct);
            if below_3k_pct > limits.energy_below_3k_max_pct {
                report.failures.push(format!(
                    "Too much energy below 3kHz: {:.1}% > {:.1}%",
                    below_3k_pct, limits.energy_below_3k_max_pct
                ));
            }
        }
    }

    report.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsp::oscillator::sine;
    use approx::assert_relative_eq;

    fn tone(freq: f32, amp: f32) -> SampleBuffer {
        let samples = sine(freq, 0.0, 24000, 48000).into_iter().map(|s| s * amp).collect();
        SampleBuffer::new(samples, 48000)
    }

    #[test]
    fn test_band_energy_locates_tone() {
        let spectrum = PowerSpectrum::new(tone(1000.0, 0.5).samples(), 48000);
        let ratio = spectrum.band_ratio(900.0, 1100.0, 24000.0);
        assert!(ratio > 0.95, "ratio {}", ratio);
        assert!(spectrum.band_ratio(5000.0, 8000.0, 24000.0) < 0.01);
    }

    #[test]
    fn test_status_ordering() {
        assert!(QcStatus::Fail > QcStatus::Warn);
        assert!(QcStatus::Warn > QcStatus::Pass);
    }

    #[test]
    fn test_silence_fails() {
        let report = analyze(Instrument::Kick, &SampleBuffer::new(vec![0.0; 24000], 48000));
        assert_eq!(report.status, QcStatus::Fail);
        assert!(report.failures[0].contains("silent"));
    }

    #[test]
    fn test_hat_low_energy_fails() {
        let report = analyze(Instrument::Hat, &tone(500.0, 0.9));
        assert_eq!(report.status, QcStatus::Fail);
        assert!(report.metric("energy_below_3k_pct").unwrap() > 90.0);
    }

    #[test]
    fn test_kick_sub_ratio_metric() {
        let report = analyze(Instrument::Kick, &tone(50.0, 0.9));
        assert!(report.metric("sub_ratio").unwrap() > 0.9);
        assert_relative_eq!(report.metric("peak_linear").unwrap(), 0.9, max_relative = 1e-3);
    }

    #[test]
    fn test_report_serializes_uppercase_status() {
        let report = analyze(Instrument::Kick, &tone(50.0, 0.9));
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["instrument"], "kick");
        assert!(json["status"].as_str().unwrap().chars().all(|c| c.is_ascii_uppercase()));
    }
}
