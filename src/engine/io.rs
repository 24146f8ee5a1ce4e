//! WAV file I/O
//!
//! Rendered buffers are mono at the output rate. Export writes 16/24-bit
//! PCM or 32-bit float; import reads any of those back as f32 (first channel
//! only) so renders can be inspected after the fact.

use std::path::Path;

use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use log::info;

use crate::engine::buffer::SampleBuffer;
use crate::error::{EngineError, Result};

/// Default export bit depth
pub const DEFAULT_BIT_DEPTH: u16 = 24;

fn wav_spec(sample_rate: u32, bit_depth: u16) -> Result<WavSpec> {
    let sample_format = match bit_depth {
        16 | 24 => SampleFormat::Int,
        32 => SampleFormat::Float,
        _ => {
            return Err(EngineError::UnsupportedFormat {
                format: format!("{}-bit audio (only 16, 24, 32 supported)", bit_depth),
            })
        }
    };
    Ok(WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: bit_depth,
        sample_format,
    })
}

/// Export a buffer to a mono WAV file
///
/// # Arguments
/// * `buffer` - The rendered buffer
/// * `path` - Destination file, overwritten if present
/// * `bit_depth` - 16, 24 (integer PCM) or 32 (float)
///
/// # Errors
/// * `UnsupportedFormat` - For any other bit depth (nothing is written)
/// * `Wav` - If hound fails to create or write the file
pub fn export_wav(buffer: &SampleBuffer, path: &Path, bit_depth: u16) -> Result<()> {
    let spec = wav_spec(buffer.sample_rate(), bit_depth)?;
    let mut writer = WavWriter::create(path, spec)?;

    match bit_depth {
        16 => {
            for &sample in buffer.samples() {
                writer.write_sample((sample * 32767.0).clamp(-32768.0, 32767.0) as i16)?;
            }
        }
        24 => {
            for &sample in buffer.samples() {
                // 24-bit stored as i32 in hound
                writer.write_sample((sample * 8388607.0).clamp(-8388608.0, 8388607.0) as i32)?;
            }
        }
        _ => {
            for &sample in buffer.samples() {
                writer.write_sample(sample)?;
            }
        }
    }

    writer.finalize()?;
    info!(
        "Exported {} samples ({}-bit) to {}",
        buffer.len(),
        bit_depth,
        path.display()
    );
    Ok(())
}

/// Read a WAV file back into a buffer
///
/// Multi-channel files keep only their first channel.
pub fn import_wav(path: &Path) -> Result<SampleBuffer> {
    let reader = WavReader::open(path)?;
    let spec = reader.spec();
    let channels = spec.channels.max(1) as usize;

    let interleaved: Vec<f32> = match spec.sample_format {
        SampleFormat::Float => reader.into_samples::<f32>().collect::<std::result::Result<_, _>>()?,
        SampleFormat::Int => {
            let scale = (1_i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .into_samples::<i32>()
                .map(|s| s.map(|v| v as f32 / scale))
                .collect::<std::result::Result<_, _>>()?
        }
    };

    let samples = interleaved.into_iter().step_by(channels).collect();
    Ok(SampleBuffer::new(samples, spec.sample_rate))
}
