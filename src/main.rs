//! Percussion Engine CLI
//!
//! Command-line front end for rendering drum one-shots.

use clap::Parser;
use env_logger::Env;
use log::debug;

use percussion_engine::cli::{commands, Cli, Commands};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(Env::default().default_filter_or(default_level)).init();

    debug!("Percussion Engine v{}", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Commands::Render { args, out, bit_depth } => commands::render(&args, out.as_deref(), bit_depth),
        Commands::Fingerprint { args } => commands::fingerprint(&args),
        Commands::Qc { args } => commands::qc(&args),
    }
}
