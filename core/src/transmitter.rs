use log::{info, warn};

use crate::bits::BitString;
use crate::config::LinkConfig;
use crate::error::Result;
use crate::frame::{self, Frame};
use crate::fsk::FskModulator;
use crate::transport::AudioSink;

/// Encodes payloads into frames and plays them through a sink
pub struct Transmitter {
    config: LinkConfig,
    modulator: FskModulator,
}

impl Transmitter {
    pub fn new(config: &LinkConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config: config.clone(),
            modulator: FskModulator::new(config),
        })
    }

    pub fn config(&self) -> &LinkConfig {
        &self.config
    }

    pub fn modulator(&self) -> &FskModulator {
        &self.modulator
    }

    /// Encode `payload`, then invert the body bits at `flips`
    pub fn prepare(&self, payload: &BitString, flips: &[usize]) -> Result<Frame> {
        let frame = frame::encode(payload, &self.config.polynomial)?;
        if flips.is_empty() {
            return Ok(frame);
        }
        let body_len = frame.body().len();
        let outside: Vec<usize> = flips.iter().copied().filter(|&i| i >= body_len).collect();
        if !outside.is_empty() {
            warn!(
                "Ignoring flip positions {:?} beyond the {}-bit body",
                outside, body_len
            );
        }
        info!("Injecting bit flips at body positions {:?}", flips);
        Ok(frame.with_flipped_bits(flips))
    }

    /// Encode and transmit one frame, returning the number of samples written
    pub fn send<S: AudioSink + ?Sized>(
        &self,
        payload: &BitString,
        flips: &[usize],
        sink: &mut S,
    ) -> Result<usize> {
        let frame = self.prepare(payload, flips)?;
        info!(
            "Sending {}-bit payload as {} nibbles",
            payload.len(),
            frame.nibbles().len()
        );
        self.modulator.transmit(&frame, sink)
    }
}

/// Map fractional positions in (0, 1] to body indices
///
/// A fraction `f` selects index `ceil(f * body_len) - 1`, so `1.0` is the last
/// bit. Fractions outside (0, 1] are skipped.
pub fn flip_positions(fractions: &[f32], body_len: usize) -> Vec<usize> {
    let mut positions: Vec<usize> = fractions
        .iter()
        .filter(|&&f| f > 0.0 && f <= 1.0)
        .map(|&f| ((f * body_len as f32).ceil() as usize).saturating_sub(1))
        .collect();
    positions.sort_unstable();
    positions.dedup();
    positions
}
