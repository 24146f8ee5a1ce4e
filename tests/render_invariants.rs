//! Render Invariant Tests
//!
//! End-to-end properties every render must hold, plus per-instrument
//! behavior of the documented parameter keys.

use percussion_engine::dsp::postchain::{FADE_IN_MS, FADE_OUT_MS, SAFETY_CLAMP};
use percussion_engine::dsp::{AdsrSpec, LayerMixer, LayerSpec};
use percussion_engine::engine::buffer::{rms, DC_OFFSET_THRESHOLD};
use percussion_engine::engine::{export_wav, import_wav, Choke, ChokeRole};
use percussion_engine::qc::{self, PowerSpectrum};
use percussion_engine::{render, render_named, EngineError, Instrument, ParamMap, SampleBuffer};
use pretty_assertions::assert_eq;
use test_case::test_case;

const SR: u32 = 48000;

fn band_energy(buffer: &SampleBuffer, low_hz: f32, high_hz: f32) -> f64 {
    PowerSpectrum::new(buffer.samples(), buffer.sample_rate()).band_energy(low_hz, high_hz)
}

/// RMS of consecutive 20ms windows starting at `from_ms`
fn windowed_rms(buffer: &SampleBuffer, from_ms: usize) -> Vec<f32> {
    let window = SR as usize / 50;
    let start = SR as usize * from_ms / 1000;
    buffer.samples()[start..].chunks(window).map(rms).collect()
}

fn tail_rms(buffer: &SampleBuffer) -> f32 {
    let s = buffer.samples();
    rms(&s[s.len() - SR as usize / 10..])
}

// === Universal Invariants ===

#[test_case(Instrument::Kick ; "kick")]
#[test_case(Instrument::Snare ; "snare")]
#[test_case(Instrument::Hat ; "hat")]
fn test_output_contract(instrument: Instrument) {
    let out = render(instrument, &ParamMap::new(), 1).unwrap();
    let s = out.samples();

    assert_eq!(out.sample_rate(), SR);
    assert_eq!(out.len(), 24000);
    assert!(out.first_non_finite().is_none());
    assert!(out.peak() <= 0.92, "peak {}", out.peak());
    assert!(out.peak() > 0.0);
    assert!(out.mean().abs() <= DC_OFFSET_THRESHOLD, "mean {}", out.mean());
    assert_eq!(s[0], 0.0);
    assert_eq!(s[s.len() - 1], 0.0);
}

#[test_case(Instrument::Kick ; "kick")]
#[test_case(Instrument::Snare ; "snare")]
#[test_case(Instrument::Hat ; "hat")]
fn test_edges_stay_under_fade_ramps(instrument: Instrument) {
    let fade_in = (FADE_IN_MS as f64 * 1e-3 * SR as f64) as usize;
    let fade_out = (FADE_OUT_MS as f64 * 1e-3 * SR as f64) as usize;
    let hot = ParamMap::new().with("transient_shaper", 1.0);

    for (params, seed) in [(ParamMap::new(), 1), (ParamMap::new(), 9), (hot, 4)] {
        let out = render(instrument, &params, seed).unwrap();
        let s = out.samples();
        let n = s.len();
        for k in 0..64 {
            let head = SAFETY_CLAMP * (k as f32 / (fade_in - 1) as f32).min(1.0) + 1e-6;
            assert!(s[k].abs() <= head, "seed {} head[{}] = {} > {}", seed, k, s[k], head);

            let tail = SAFETY_CLAMP * (k as f32 / (fade_out - 1) as f32).min(1.0) + 1e-6;
            let t = s[n - 1 - k];
            assert!(t.abs() <= tail, "seed {} tail[{}] = {} > {}", seed, k, t, tail);
        }
    }
}

#[test_case(Instrument::Kick ; "kick")]
#[test_case(Instrument::Snare ; "snare")]
#[test_case(Instrument::Hat ; "hat")]
fn test_determinism(instrument: Instrument) {
    let params = ParamMap::new();
    let a = render(instrument, &params, 42).unwrap();
    let b = render(instrument, &params, 42).unwrap();
    assert_eq!(a.samples(), b.samples());
    assert_eq!(a.fingerprint(), b.fingerprint());

    let other = render(instrument, &params, 43).unwrap();
    assert_ne!(a.fingerprint(), other.fingerprint());
}

#[test_case(Instrument::Kick ; "kick")]
#[test_case(Instrument::Snare ; "snare")]
#[test_case(Instrument::Hat ; "hat")]
fn test_extreme_macros_stay_in_contract(instrument: Instrument) {
    for value in [0.0, 1.0] {
        let params = ParamMap::from_json(&format!(
            r#"{{"{i}": {{"tone": {v}, "wire": {v}, "crack": {v}, "body": {v},
                "tightness": {v}, "sheen": {v}, "dirt": {v}, "color": {v},
                "punch_decay": {v}, "click_amount": {v}, "click_snap": {v}}}}}"#,
            i = instrument,
            v = value
        ))
        .unwrap();
        let out = render(instrument, &params, 9).unwrap();
        assert!(out.peak() <= 0.92);
        assert!(out.mean().abs() <= DC_OFFSET_THRESHOLD);
    }
}

#[test]
fn test_parallel_renders_match_sequential() {
    let params = ParamMap::new().with("snare.behavior.repeat_mode", "roll");
    let jobs: Vec<(Instrument, u64)> = Instrument::ALL
        .iter()
        .flat_map(|&i| (0..3).map(move |seed| (i, seed)))
        .collect();

    let sequential: Vec<String> = jobs
        .iter()
        .map(|&(i, seed)| render(i, &params, seed).unwrap().fingerprint())
        .collect();

    let parallel: Vec<String> = std::thread::scope(|scope| {
        let handles: Vec<_> = jobs
            .iter()
            .map(|&(i, seed)| {
                let params = &params;
                scope.spawn(move || render(i, params, seed).unwrap().fingerprint())
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    assert_eq!(sequential, parallel);
}

#[test]
fn test_unknown_instrument() {
    let err = render_named("tom", &ParamMap::new(), 0).unwrap_err();
    assert!(matches!(err, EngineError::UnknownInstrument { .. }));
}

#[test]
fn test_flat_and_nested_keys_are_equivalent() {
    let nested = ParamMap::from_json(r#"{"kick": {"tune": 60, "click": {"gain_db": -6}}}"#).unwrap();
    let flat = ParamMap::from_json(r#"{"kick.tune": 60, "kick.click.gain_db": -6}"#).unwrap();
    let root_macro = ParamMap::from_json(r#"{"tune": 60, "kick.click.gain_db": -6}"#).unwrap();

    let a = render(Instrument::Kick, &nested, 5).unwrap().fingerprint();
    assert_eq!(a, render(Instrument::Kick, &flat, 5).unwrap().fingerprint());
    assert_eq!(a, render(Instrument::Kick, &root_macro, 5).unwrap().fingerprint());
}

// === Kick ===

#[test]
fn test_kick_reference_scenario() {
    let params = ParamMap::from_json(
        r#"{"tune": 55, "punch_decay": 0.5, "click_amount": 0.5, "click_snap": 0.5,
            "blend": 0.3, "room_tone_freq": 150, "room_air": 0.3, "distance_ms": 20}"#,
    )
    .unwrap();

    let first = render(Instrument::Kick, &params, 42).unwrap();
    assert_eq!(first.len(), 24000);
    assert!(first.peak() <= 0.92);
    assert!(first.mean().abs() <= 1e-4);

    let again = render(Instrument::Kick, &params, 42).unwrap();
    assert_eq!(first.fingerprint(), again.fingerprint());
}

#[test]
fn test_layer_gain_raises_layer_rms() {
    let mut mixer = LayerMixer::new("kick");
    let audio: Vec<f32> = (0..4800).map(|i| ((i as f32) * 0.05).sin()).collect();
    mixer.add(LayerSpec::new("click", AdsrSpec::default()), audio);

    let quiet = ParamMap::new().with("kick.click.gain_db", -60.0);
    let loud = ParamMap::new().with("kick.click.gain_db", 0.0);
    let quiet_rms = rms(&mixer.contribution("click", &quiet, SR).unwrap());
    let loud_rms = rms(&mixer.contribution("click", &loud, SR).unwrap());
    assert!(loud_rms > quiet_rms * 100.0);
}

#[test]
fn test_kick_click_gain_changes_render() {
    let quiet = ParamMap::new().with("kick.click.gain_db", -60.0);
    let loud = ParamMap::new().with("kick.click.gain_db", 0.0);
    assert_ne!(
        render(Instrument::Kick, &quiet, 42).unwrap().fingerprint(),
        render(Instrument::Kick, &loud, 42).unwrap().fingerprint()
    );
}

#[test]
fn test_kick_click_mute_removes_high_band() {
    // Sub kept quiet so the bus stays linear; knock and room out of the way
    let base = ParamMap::new()
        .with("click_amount", 1.0)
        .with("click_snap", 1.0)
        .with("kick.sub.gain_db", -20.0)
        .with("kick.knock.mute", true)
        .with("kick.room.enabled", false);
    let muted = base.clone().with("kick.click.mute", true);

    let open = render(Instrument::Kick, &base, 42).unwrap();
    let closed = render(Instrument::Kick, &muted, 42).unwrap();

    let high_open = band_energy(&open, 2000.0, 8000.0);
    let high_closed = band_energy(&closed, 2000.0, 8000.0);
    assert!(high_closed < high_open * 0.25, "{} vs {}", high_closed, high_open);

    let sub_ratio = band_energy(&closed, 20.0, 100.0) / band_energy(&open, 20.0, 100.0);
    assert!((0.5..2.0).contains(&sub_ratio), "sub ratio {}", sub_ratio);
}

#[test]
fn test_kick_room_toggle() {
    let dry = ParamMap::new().with("kick.room.enabled", false);
    assert_ne!(
        render(Instrument::Kick, &dry, 1).unwrap().fingerprint(),
        render(Instrument::Kick, &ParamMap::new(), 1).unwrap().fingerprint()
    );
}

#[test]
fn test_kick_compressor_engages_only_above_unity_ratio() {
    let unity = ParamMap::new().with("kick.comp.ratio", 1.0);
    let squash = ParamMap::new()
        .with("kick.comp.ratio", 8.0)
        .with("kick.comp.threshold_db", -30.0);
    let default = render(Instrument::Kick, &ParamMap::new(), 2).unwrap().fingerprint();
    assert_eq!(default, render(Instrument::Kick, &unity, 2).unwrap().fingerprint());
    assert_ne!(default, render(Instrument::Kick, &squash, 2).unwrap().fingerprint());
}

// === Snare ===

#[test]
fn test_snare_oneshot_decays() {
    let params = ParamMap::new().with("snare.wires.mute", true);
    let out = render(Instrument::Snare, &params, 42).unwrap();

    let windows = windowed_rms(&out, 100);
    for pair in windows.windows(2) {
        assert!(pair[1] <= pair[0] * 1.05 + 1e-6, "{:?}", windows);
    }
    assert!(tail_rms(&out) < 0.01, "tail {}", tail_rms(&out));
}

#[test]
fn test_snare_oneshot_ignores_feedback() {
    let plain = ParamMap::new();
    let with_feedback = ParamMap::new().with("snare.shell.feedback", 0.99);
    assert_eq!(
        render(Instrument::Snare, &plain, 3).unwrap().fingerprint(),
        render(Instrument::Snare, &with_feedback, 3).unwrap().fingerprint()
    );
}

#[test]
fn test_snare_roll_rings_longer() {
    let base = ParamMap::new().with("snare.wires.mute", true);
    let roll = base.clone().with("snare.behavior.repeat_mode", "roll");
    let legacy_echo = base.clone().with("snare.repeatMode", "echo");

    let oneshot_tail = tail_rms(&render(Instrument::Snare, &base, 42).unwrap());
    let roll_out = render(Instrument::Snare, &roll, 42).unwrap();
    assert!(tail_rms(&roll_out) > oneshot_tail);

    // roll and echo share the loop
    assert_eq!(
        roll_out.fingerprint(),
        render(Instrument::Snare, &legacy_echo, 42).unwrap().fingerprint()
    );
}

#[test]
fn test_snare_filter_modes_differ() {
    let roll = ParamMap::new().with("snare.behavior.repeat_mode", "roll");
    let stateful = render(Instrument::Snare, &roll, 8).unwrap();
    let stateless = render(
        Instrument::Snare,
        &roll.clone().with("snare.shell.filter_mode", "stateless"),
        8,
    )
    .unwrap();

    assert!(stateful.first_non_finite().is_none());
    assert!(stateless.first_non_finite().is_none());
    assert_ne!(stateful.fingerprint(), stateless.fingerprint());

    let explicit = render(
        Instrument::Snare,
        &roll.with("snare.shell.filter_mode", "stateful"),
        8,
    )
    .unwrap();
    assert_eq!(stateful.fingerprint(), explicit.fingerprint());
}

#[test]
fn test_snare_box_cut_only_cuts() {
    let plain = render(Instrument::Snare, &ParamMap::new(), 4).unwrap().fingerprint();
    let cut = ParamMap::new()
        .with("snare.box_cut.hz", 450.0)
        .with("snare.box_cut.db", -6.0);
    let boost = ParamMap::new()
        .with("snare.box_cut.hz", 450.0)
        .with("snare.box_cut.db", 6.0);
    assert_ne!(plain, render(Instrument::Snare, &cut, 4).unwrap().fingerprint());
    assert_eq!(plain, render(Instrument::Snare, &boost, 4).unwrap().fingerprint());
}

#[test]
fn test_snare_room_is_opt_in() {
    let plain = render(Instrument::Snare, &ParamMap::new(), 4).unwrap().fingerprint();
    let room = ParamMap::new().with("snare.room.enabled", true);
    assert_ne!(plain, render(Instrument::Snare, &room, 4).unwrap().fingerprint());
}

// === Hat ===

#[test]
fn test_hat_dirt_modes() {
    let crush = ParamMap::new().with("hat.dirt", 0.7);
    let saturate = crush.clone().with("hat.dirt_mode", "saturate");
    assert_eq!(saturate.get_f32("hat.dirt", 0.0), 0.7);
    assert_ne!(
        render(Instrument::Hat, &crush, 6).unwrap().fingerprint(),
        render(Instrument::Hat, &saturate, 6).unwrap().fingerprint()
    );

    // the mode must not reset the requested amount back to the default
    let default_saturate = ParamMap::new().with("hat.dirt_mode", "saturate");
    assert_ne!(
        render(Instrument::Hat, &saturate, 6).unwrap().fingerprint(),
        render(Instrument::Hat, &default_saturate, 6).unwrap().fingerprint()
    );

    let clean = ParamMap::new().with("hat.dirt", 0.0);
    let clean_saturate = clean.clone().with("hat.dirt_mode", "saturate");
    assert_eq!(
        render(Instrument::Hat, &clean, 6).unwrap().fingerprint(),
        render(Instrument::Hat, &clean_saturate, 6).unwrap().fingerprint()
    );
}

#[test]
fn test_hat_choke_metadata() {
    let closed = render(Instrument::Hat, &ParamMap::new(), 0).unwrap();
    assert_eq!(closed.choke(), Some(Choke { group: 1, role: ChokeRole::Closing }));

    let open = render(Instrument::Hat, &ParamMap::new().with("hat.open", true), 0).unwrap();
    assert_eq!(open.choke(), Some(Choke { group: 1, role: ChokeRole::Open }));
    assert_eq!(open.fingerprint(), closed.fingerprint());

    let free = render(Instrument::Hat, &ParamMap::new().with("hat.choke_group", false), 0).unwrap();
    assert_eq!(free.choke(), None);

    assert_eq!(render(Instrument::Kick, &ParamMap::new(), 0).unwrap().choke(), None);
}

#[test]
fn test_hat_tightness_shortens_tail() {
    let loose = ParamMap::new().with("hat.tightness", 0.0);
    let tight = ParamMap::new().with("hat.tightness", 1.0);
    let loose_tail = tail_rms(&render(Instrument::Hat, &loose, 2).unwrap());
    let tight_tail = tail_rms(&render(Instrument::Hat, &tight, 2).unwrap());
    assert!(tight_tail < loose_tail);
}

// === Legacy Normalize ===

#[test_case(Instrument::Kick ; "kick")]
#[test_case(Instrument::Snare ; "snare")]
#[test_case(Instrument::Hat ; "hat")]
fn test_legacy_normalize_is_opt_in(instrument: Instrument) {
    let default = render(instrument, &ParamMap::new(), 11).unwrap().fingerprint();
    let off = ParamMap::new().with("legacy_normalize", false);
    let on = ParamMap::new().with("legacy_normalize", true);
    assert_eq!(default, render(instrument, &off, 11).unwrap().fingerprint());
    assert_ne!(default, render(instrument, &on, 11).unwrap().fingerprint());
}

// === QC and Export ===

#[test_case(Instrument::Kick, "sub_ratio" ; "kick")]
#[test_case(Instrument::Snare, "ringing_proxy" ; "snare")]
#[test_case(Instrument::Hat, "energy_below_3k_pct" ; "hat")]
fn test_qc_report(instrument: Instrument, metric: &str) {
    let out = render(instrument, &ParamMap::new(), 0).unwrap();
    let report = qc::analyze(instrument, &out);
    assert_eq!(report.instrument, instrument);
    assert!(report.metric(metric).is_some());
    assert!(report.metric("peak_dbfs").unwrap() <= 0.0);
    assert!(!report.failures.iter().any(|f| f.contains("DC offset")));
}

#[test]
fn test_float_wav_round_trip_is_exact() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("snare.wav");
    let out = render(Instrument::Snare, &ParamMap::new(), 12).unwrap();

    export_wav(&out, &path, 32).unwrap();
    let back = import_wav(&path).unwrap();
    assert_eq!(back.fingerprint(), out.fingerprint());
}
