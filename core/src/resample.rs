//! Sample-rate and channel conversion between sender and receiver
//! Uses linear interpolation, enough for the narrow-band FSK tones

use crate::error::{LinkError, Result};

/// Mix interleaved multi-channel audio down to mono by averaging the channels
///
/// # Arguments
/// * `samples` - Interleaved samples [c0, c1, ..., c0, c1, ...]
/// * `channels` - Number of interleaved channels
///
/// # Errors
/// `InvalidConfig` when `channels` is zero or does not divide the sample count
pub fn downmix(samples: &[f32], channels: usize) -> Result<Vec<f32>> {
    if channels == 0 {
        return Err(LinkError::InvalidConfig("channel count must be positive".to_string()));
    }
    if channels == 1 {
        return Ok(samples.to_vec());
    }
    if samples.len() % channels != 0 {
        return Err(LinkError::InvalidConfig(format!(
            "{} samples do not split into {} channels",
            samples.len(),
            channels
        )));
    }

    Ok(samples
        .chunks(channels)
        .map(|frame| frame.iter().sum::<f32>() / channels as f32)
        .collect())
}

/// Resample audio to a target sample rate using linear interpolation
///
/// # Arguments
/// * `samples` - Input audio samples
/// * `from_rate` - Current sample rate in Hz
/// * `to_rate` - Target sample rate in Hz
///
/// # Example
/// ```ignore
/// let at_44k = modulator.modulate(&frame).concat();
/// let at_16k = resample(&at_44k, 44100, 16000);
/// ```
pub fn resample(samples: &[f32], from_rate: u32, to_rate: u32) -> Vec<f32> {
    if from_rate == to_rate || samples.is_empty() || from_rate == 0 || to_rate == 0 {
        return samples.to_vec();
    }

    let step = from_rate as f64 / to_rate as f64;
    let new_length = (samples.len() as u64 * to_rate as u64 / from_rate as u64) as usize;
    let mut resampled = Vec::with_capacity(new_length);

    for i in 0..new_length {
        let position = i as f64 * step;
        let index = position.floor() as usize;
        let fraction = (position - index as f64) as f32;

        let interpolated = match samples.get(index + 1) {
            Some(&next) => samples[index] * (1.0 - fraction) + next * fraction,
            None => samples[index],
        };
        resampled.push(interpolated);
    }

    resampled
}
