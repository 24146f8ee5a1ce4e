//! CLI Command Implementations
//!
//! Implements the actual logic for each CLI command.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use log::info;
use serde_json::Value;

use super::RenderArgs;
use crate::engine::{self, Instrument, ParamMap, SampleBuffer};
use crate::qc;

/// Build the parameter map from the file and `key=value` overrides
pub fn load_params(path: Option<&Path>, overrides: &[String]) -> Result<ParamMap> {
    let mut params = match path {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("reading params from {}", path.display()))?;
            ParamMap::from_json(&text).with_context(|| format!("parsing {}", path.display()))?
        }
        None => ParamMap::new(),
    };

    for entry in overrides {
        let Some((key, raw)) = entry.split_once('=') else {
            bail!("override '{}' is not of the form key=value", entry);
        };
        let value = serde_json::from_str::<Value>(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
        params.set(key.trim(), value);
    }
    Ok(params)
}

fn render_from(args: &RenderArgs) -> Result<(Instrument, SampleBuffer)> {
    let instrument: Instrument = args.instrument.parse()?;
    let params = load_params(args.params.as_deref(), &args.overrides)?;
    info!("Rendering {} (seed {})", instrument, args.seed);
    let buffer = engine::render(instrument, &params, args.seed)
        .with_context(|| format!("rendering {}", instrument))?;
    Ok((instrument, buffer))
}

/// Render and write a WAV file.
pub fn render(args: &RenderArgs, out: Option<&Path>, bit_depth: u16) -> Result<()> {
    let (instrument, buffer) = render_from(args)?;
    let out_path = out
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(format!("{}.wav", instrument)));

    engine::export_wav(&buffer, &out_path, bit_depth)
        .with_context(|| format!("writing {}", out_path.display()))?;

    println!("Rendered {} -> {}", instrument, out_path.display());
    println!("  Peak: {:.2} dBFS", buffer.peak_db());
    println!("  Fingerprint: {}", buffer.fingerprint());
    if let Some(choke) = buffer.choke() {
        println!("  Choke: group {} ({:?})", choke.group, choke.role);
    }
    Ok(())
}

/// Print the render's fingerprint.
pub fn fingerprint(args: &RenderArgs) -> Result<()> {
    let (_, buffer) = render_from(args)?;
    println!("{}", buffer.fingerprint());
    Ok(())
}

/// Print the QC report of a render.
pub fn qc(args: &RenderArgs) -> Result<()> {
    let (instrument, buffer) = render_from(args)?;
    let report = qc::analyze(instrument, &buffer);
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
