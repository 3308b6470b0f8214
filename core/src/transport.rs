//! Audio transport seams
//!
//! The modem never talks to a sound device directly. Senders write sample
//! blocks to an [`AudioSink`], receivers pull fixed-size blocks from an
//! [`AudioSource`]. In-memory implementations back the tests and the loopback
//! simulation; the CLI adds WAV-file ones.

use crate::error::{LinkError, Result};

pub trait AudioSource {
    /// Sample rate of the blocks this source produces
    fn sample_rate(&self) -> u32;

    /// Read exactly `len` samples. Blocks until they are available.
    fn read_block(&mut self, len: usize) -> Result<Vec<f32>>;
}

pub trait AudioSink {
    fn sample_rate(&self) -> u32;

    fn write_block(&mut self, samples: &[f32]) -> Result<()>;
}

/// Source over a finite sample buffer
///
/// A final partial block is zero-padded; after that every read fails with
/// [`LinkError::EndOfStream`].
#[derive(Debug, Clone)]
pub struct MemorySource {
    samples: Vec<f32>,
    position: usize,
    sample_rate: u32,
}

impl MemorySource {
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples,
            position: 0,
            sample_rate,
        }
    }

    pub fn remaining(&self) -> usize {
        self.samples.len() - self.position
    }
}

impl AudioSource for MemorySource {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn read_block(&mut self, len: usize) -> Result<Vec<f32>> {
        if self.remaining() == 0 {
            return Err(LinkError::EndOfStream);
        }
        let end = (self.position + len).min(self.samples.len());
        let mut block = self.samples[self.position..end].to_vec();
        block.resize(len, 0.0);
        self.position = end;
        Ok(block)
    }
}

/// Sink collecting every written sample
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    samples: Vec<f32>,
    sample_rate: u32,
}

impl MemorySink {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            samples: Vec::new(),
            sample_rate,
        }
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn into_samples(self) -> Vec<f32> {
        self.samples
    }

    /// Play the recorded audio back as a source at the same rate
    pub fn into_source(self) -> MemorySource {
        MemorySource::new(self.samples, self.sample_rate)
    }
}

impl AudioSink for MemorySink {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn write_block(&mut self, samples: &[f32]) -> Result<()> {
        self.samples.extend_from_slice(samples);
        Ok(())
    }
}
