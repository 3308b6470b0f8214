use std::f32::consts::PI;

use log::debug;

use crate::config::LinkConfig;
use crate::error::Result;
use crate::frame::Frame;
use crate::tones::{nibble_frequency, NIBBLE_VALUES};
use crate::transport::AudioSink;

/// Synthesise `duration` seconds of a sine wave
///
/// Produces `floor(sample_rate * duration)` samples starting at phase zero.
pub fn tone(frequency: f32, duration: f32, amplitude: f32, sample_rate: u32) -> Vec<f32> {
    let len = (sample_rate as f32 * duration).max(0.0) as usize;
    synthesize(frequency, len, amplitude, sample_rate)
}

fn synthesize(frequency: f32, len: usize, amplitude: f32, sample_rate: u32) -> Vec<f32> {
    let angular_freq = 2.0 * PI * frequency / sample_rate as f32;
    (0..len)
        .map(|i| amplitude * (angular_freq * i as f32).sin())
        .collect()
}

/// FSK modulator - one tone per nibble
///
/// The sixteen nibble tones and the preamble burst are synthesised once at
/// construction and reused for every frame.
pub struct FskModulator {
    sample_rate: u32,
    nibble_tones: Vec<Vec<f32>>,
    preamble: Vec<f32>,
    preamble_repeats: usize,
}

impl FskModulator {
    pub fn new(config: &LinkConfig) -> Self {
        let tx = &config.tx;
        let nibble_tones = (0..NIBBLE_VALUES as u8)
            .map(|value| {
                synthesize(
                    nibble_frequency(value),
                    tx.symbol_samples(),
                    tx.amplitude,
                    tx.sample_rate,
                )
            })
            .collect();
        let preamble = synthesize(
            config.tones.preamble,
            tx.preamble_samples(),
            tx.amplitude,
            tx.sample_rate,
        );

        Self {
            sample_rate: tx.sample_rate,
            nibble_tones,
            preamble,
            preamble_repeats: tx.preamble_repeats,
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn nibble_tone(&self, nibble: u8) -> &[f32] {
        &self.nibble_tones[(nibble & 0x0F) as usize]
    }

    pub fn preamble_burst(&self) -> &[f32] {
        &self.preamble
    }

    /// Frame as an ordered list of sample buffers:
    /// preamble bursts, the two length nibbles, then one tone per body nibble
    pub fn modulate(&self, frame: &Frame) -> Vec<Vec<f32>> {
        let nibbles = frame.nibbles();
        let mut buffers = Vec::with_capacity(self.preamble_repeats + nibbles.len());
        for _ in 0..self.preamble_repeats {
            buffers.push(self.preamble.clone());
        }
        for nibble in nibbles {
            buffers.push(self.nibble_tone(nibble).to_vec());
        }
        buffers
    }

    /// Modulate and hand every buffer to the sink in order
    pub fn transmit<S: AudioSink + ?Sized>(&self, frame: &Frame, sink: &mut S) -> Result<usize> {
        let buffers = self.modulate(frame);
        let mut written = 0;
        for buffer in &buffers {
            sink.write_block(buffer)?;
            written += buffer.len();
        }
        debug!(
            "Transmitted {} buffers ({} samples at {} Hz)",
            buffers.len(),
            written,
            self.sample_rate
        );
        Ok(written)
    }
}
