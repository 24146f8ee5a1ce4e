//! CLI Module
//!
//! Command-line interface for rendering and inspecting one-shots.

pub mod commands;

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Percussion Engine - deterministic kick/snare/hat synthesis
#[derive(Parser, Debug)]
#[command(name = "percussion-cli")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Inputs shared by every command
#[derive(Args, Debug, Clone)]
pub struct RenderArgs {
    /// Instrument to render (kick, snare, hat)
    pub instrument: String,

    /// JSON parameter file
    #[arg(short, long)]
    pub params: Option<PathBuf>,

    /// Parameter override as key=value (value parsed as JSON, else string)
    #[arg(short = 's', long = "set", value_name = "KEY=VALUE")]
    pub overrides: Vec<String>,

    /// Seed of the render's random stream
    #[arg(long, default_value_t = 0)]
    pub seed: u64,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Render a one-shot to a WAV file
    #[command(name = "render")]
    Render {
        #[command(flatten)]
        args: RenderArgs,

        /// Output WAV path (default: <instrument>.wav)
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Export bit depth: 16, 24 or 32 (float)
        #[arg(long, default_value_t = 24)]
        bit_depth: u16,
    },

    /// Print the SHA-256 fingerprint of a render
    #[command(name = "fingerprint")]
    Fingerprint {
        #[command(flatten)]
        args: RenderArgs,
    },

    /// Print the QC report of a render as JSON
    #[command(name = "qc")]
    Qc {
        #[command(flatten)]
        args: RenderArgs,
    },
}
