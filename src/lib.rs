//! Percussion Engine - Deterministic Procedural Drum Synthesis
//!
//! Renders kick, snare and hi-hat one-shots from a flat or nested parameter
//! map. The same instrument, parameters and seed always produce the same
//! buffer, bit for bit.
//!
//! # Architecture
//!
//! - `dsp`: shared primitives (oscillators, noise, envelopes, filters,
//!   delay lines, nonlinearities, layer mixer, post-chain)
//! - `instruments`: one engine per voice, composing primitives at an
//!   oversampled rate
//! - `engine`: instrument dispatch, parameter map, output buffers, WAV I/O
//! - `qc`: post-render spectral checks

pub mod cli;
pub mod dsp;
pub mod engine;
pub mod error;
pub mod instruments;
pub mod qc;

pub use engine::{render, render_named, Instrument, ParamMap, SampleBuffer};
pub use error::{EngineError, Result};
