use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use log::debug;
use thiserror::Error;
use tonelink_core::resample::{downmix, resample};
use tonelink_core::{AudioSink, LinkError, MemorySource};

#[derive(Debug, Error)]
pub enum WavError {
    #[error("WAV error: {0}")]
    Hound(#[from] hound::Error),

    #[error("Unsupported WAV format: {bits} bit {format:?}")]
    Unsupported { bits: u16, format: SampleFormat },

    #[error(transparent)]
    Link(#[from] LinkError),
}

/// 16-bit PCM mono WAV file as an audio sink
pub struct WavSink {
    writer: WavWriter<BufWriter<File>>,
    sample_rate: u32,
}

impl WavSink {
    pub fn create(path: &Path, sample_rate: u32) -> Result<Self, WavError> {
        let spec = WavSpec {
            channels: 1,
            sample_rate,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };
        Ok(Self {
            writer: WavWriter::create(path, spec)?,
            sample_rate,
        })
    }

    pub fn finalize(self) -> Result<(), WavError> {
        self.writer.finalize()?;
        Ok(())
    }
}

impl AudioSink for WavSink {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn write_block(&mut self, samples: &[f32]) -> tonelink_core::Result<()> {
        for &sample in samples {
            // Clamp to [-1.0, 1.0] range to avoid overflow, then scale to i16
            let clamped = sample.clamp(-1.0, 1.0);
            self.writer
                .write_sample((clamped * 32767.0) as i16)
                .map_err(|e| LinkError::Transport(e.to_string()))?;
        }
        Ok(())
    }
}

/// Load a WAV file as mono audio at `target_rate`
///
/// Multi-channel files are averaged down to one channel and every file is
/// resampled to the receiver rate.
pub fn read_wav(path: &Path, target_rate: u32) -> Result<MemorySource, WavError> {
    let mut reader = WavReader::open(path)?;
    let spec = reader.spec();
    debug!(
        "Read WAV: {} Hz, {} channels, {} bits",
        spec.sample_rate, spec.channels, spec.bits_per_sample
    );

    let samples: Vec<f32> = match (spec.sample_format, spec.bits_per_sample) {
        (SampleFormat::Int, 16) => reader
            .samples::<i16>()
            .map(|s| s.map(|s| s as f32 / 32768.0))
            .collect::<Result<_, _>>()?,
        (SampleFormat::Int, bits @ (24 | 32)) => {
            let scale = (1u32 << (bits - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|s| s as f32 / scale))
                .collect::<Result<_, _>>()?
        }
        (SampleFormat::Float, 32) => reader.samples::<f32>().collect::<Result<_, _>>()?,
        (format, bits) => return Err(WavError::Unsupported { bits, format }),
    };

    let mono = downmix(&samples, spec.channels as usize)?;
    let audio = resample(&mono, spec.sample_rate, target_rate);
    Ok(MemorySource::new(audio, target_rate))
}
