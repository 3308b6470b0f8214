//! Block-wise FSK demodulation
//!
//! Each block is peak-normalised, transformed with a real FFT and reduced to
//! its strongest bin above the low-frequency cutoff. That dominant frequency
//! is then looked up in the tone table.

use std::sync::Arc;

use realfft::{RealFftPlanner, RealToComplex};

use crate::config::LinkConfig;
use crate::error::{LinkError, Result};
use crate::tones::{Symbol, ToneTable};

/// Blocks whose peak amplitude is below this are treated as silence
const SILENCE_PEAK: f32 = 1e-6;

pub struct FskDemodulator {
    table: ToneTable,
    sample_rate: f32,
    threshold: f32,
    frequency_filter: f32,
    planner: RealFftPlanner<f32>,
    plan: Option<Arc<dyn RealToComplex<f32>>>,
}

impl FskDemodulator {
    pub fn new(config: &LinkConfig) -> Self {
        Self {
            table: config.tone_table(),
            sample_rate: config.rx.sample_rate as f32,
            threshold: config.rx.threshold,
            frequency_filter: config.rx.frequency_filter,
            planner: RealFftPlanner::new(),
            plan: None,
        }
    }

    pub fn tone_table(&self) -> &ToneTable {
        &self.table
    }

    /// Forward plan for `len` samples, reused while the block size is stable
    fn plan_for(&mut self, len: usize) -> Arc<dyn RealToComplex<f32>> {
        if let Some(plan) = &self.plan {
            if plan.len() == len {
                return Arc::clone(plan);
            }
        }
        let plan = self.planner.plan_fft_forward(len);
        self.plan = Some(Arc::clone(&plan));
        plan
    }

    /// Magnitude spectrum of a peak-normalised block, bin k at `k * rate / len` Hz
    pub fn magnitude_spectrum(&mut self, block: &[f32]) -> Result<Vec<f32>> {
        if block.len() < 2 {
            return Err(LinkError::InsufficientData);
        }
        let peak = block.iter().fold(0.0f32, |acc, s| acc.max(s.abs()));
        let gain = if peak > SILENCE_PEAK { 1.0 / peak } else { 0.0 };
        let mut input: Vec<f32> = block.iter().map(|s| s * gain).collect();

        let plan = self.plan_for(input.len());
        let mut spectrum = plan.make_output_vec();
        plan.process(&mut input, &mut spectrum)
            .map_err(|e| LinkError::FftError(format!("forward FFT of {} samples: {:?}", block.len(), e)))?;

        Ok(spectrum.iter().map(|c| c.norm()).collect())
    }

    /// Strongest frequency above the cutoff, `None` for silence
    pub fn dominant_frequency(&mut self, block: &[f32]) -> Result<Option<f32>> {
        let peak = block.iter().fold(0.0f32, |acc, s| acc.max(s.abs()));
        if peak <= SILENCE_PEAK {
            return Ok(None);
        }

        let spectrum = self.magnitude_spectrum(block)?;
        let bin_width = self.sample_rate / block.len() as f32;

        let mut best: Option<(usize, f32)> = None;
        for (bin, &magnitude) in spectrum.iter().enumerate() {
            if bin as f32 * bin_width <= self.frequency_filter {
                continue;
            }
            match best {
                Some((_, strongest)) if strongest >= magnitude => {}
                _ => best = Some((bin, magnitude)),
            }
        }
        Ok(best.map(|(bin, _)| bin as f32 * bin_width))
    }

    /// Symbol carried by one block
    pub fn detect(&mut self, block: &[f32]) -> Result<Symbol> {
        Ok(match self.dominant_frequency(block)? {
            Some(freq) => self.table.classify(freq, self.threshold),
            None => Symbol::Unknown,
        })
    }

    /// Sync-stage decision: any peak strictly within `threshold` Hz of the
    /// preamble tone counts, even when a nibble tone is nearer
    pub fn detect_preamble(&mut self, block: &[f32]) -> Result<Symbol> {
        let preamble = self.table.preamble_frequency();
        Ok(match self.dominant_frequency(block)? {
            Some(freq) if (freq - preamble).abs() < self.threshold => Symbol::Preamble,
            Some(freq) => self.table.classify(freq, self.threshold),
            None => Symbol::Unknown,
        })
    }
}
