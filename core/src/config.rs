//! Link configuration
//!
//! One immutable value built at startup (defaults, or JSON through serde) and
//! handed by reference to every stage of the sender and receiver.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::crc::CrcPolynomial;
use crate::error::{LinkError, Result};
use crate::tones::{nibble_frequency, ToneConfig, ToneTable, NIBBLE_VALUES};

/// How the preamble counter treats a block that is not a preamble burst
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncPolicy {
    /// Any other block resets the count to zero
    Consecutive,
    /// Other blocks are skipped without losing earlier matches
    Cumulative,
}

/// Sender side: synthesis of the acoustic frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransmitConfig {
    pub sample_rate: u32,
    /// Seconds of tone per nibble
    pub symbol_duration: f32,
    /// Seconds per preamble burst
    pub preamble_duration: f32,
    pub preamble_repeats: usize,
    pub amplitude: f32,
}

impl Default for TransmitConfig {
    fn default() -> Self {
        Self {
            sample_rate: 44_100,
            symbol_duration: 0.6,
            preamble_duration: 0.05,
            preamble_repeats: 8,
            amplitude: 0.8,
        }
    }
}

impl TransmitConfig {
    pub fn symbol_samples(&self) -> usize {
        seconds_to_samples(self.symbol_duration, self.sample_rate)
    }

    pub fn preamble_samples(&self) -> usize {
        seconds_to_samples(self.preamble_duration, self.sample_rate)
    }
}

/// Receiver side: block sizes, detection tolerances and stage budgets
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReceiveConfig {
    pub sample_rate: u32,
    /// Seconds per demodulated block once synchronised
    pub block_duration: f32,
    /// Seconds per block while listening for the preamble
    pub sync_block_duration: f32,
    /// Preamble blocks required before data reception starts
    pub preamble_length: usize,
    pub sync_policy: SyncPolicy,
    /// Largest distance in Hz between a peak and the tone it is mapped to
    pub threshold: f32,
    /// Spectrum bins at or below this frequency are ignored
    pub frequency_filter: f32,
    /// Expected number of blocks per transmitted symbol
    pub ratio: usize,
    pub ratio_tolerance: usize,
    /// Seconds of audio to listen for the preamble
    pub sync_timeout: f32,
    pub header_timeout: f32,
    pub payload_timeout: f32,
}

impl Default for ReceiveConfig {
    fn default() -> Self {
        Self {
            sample_rate: 16_000,
            block_duration: 0.1,
            sync_block_duration: 0.05,
            preamble_length: 6,
            sync_policy: SyncPolicy::Consecutive,
            threshold: 100.0,
            frequency_filter: 1000.0,
            ratio: 6,
            ratio_tolerance: 3,
            sync_timeout: 30.0,
            header_timeout: 10.0,
            payload_timeout: 180.0,
        }
    }
}

impl ReceiveConfig {
    pub fn block_samples(&self) -> usize {
        seconds_to_samples(self.block_duration, self.sample_rate)
    }

    pub fn sync_block_samples(&self) -> usize {
        seconds_to_samples(self.sync_block_duration, self.sample_rate)
    }

    pub fn sync_budget(&self) -> Duration {
        Duration::from_secs_f32(self.sync_timeout)
    }

    pub fn header_budget(&self) -> Duration {
        Duration::from_secs_f32(self.header_timeout)
    }

    pub fn payload_budget(&self) -> Duration {
        Duration::from_secs_f32(self.payload_timeout)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkConfig {
    pub polynomial: CrcPolynomial,
    pub tones: ToneConfig,
    pub tx: TransmitConfig,
    pub rx: ReceiveConfig,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            polynomial: CrcPolynomial::default(),
            tones: ToneConfig::default(),
            tx: TransmitConfig::default(),
            rx: ReceiveConfig::default(),
        }
    }
}

impl LinkConfig {
    pub fn tone_table(&self) -> ToneTable {
        ToneTable::new(&self.tones)
    }

    pub fn validate(&self) -> Result<()> {
        let invalid = |message: String| Err(LinkError::InvalidConfig(message));

        if self.tx.sample_rate == 0 || self.rx.sample_rate == 0 {
            return invalid("sample rates must be positive".to_string());
        }
        if self.tx.symbol_samples() == 0 || self.tx.preamble_samples() == 0 {
            return invalid("transmit durations must cover at least one sample".to_string());
        }
        if self.tx.preamble_repeats == 0 {
            return invalid("preamble_repeats must be at least 1".to_string());
        }
        if !(self.tx.amplitude > 0.0) {
            return invalid(format!("amplitude {} must be positive", self.tx.amplitude));
        }
        // realfft needs at least two samples per block
        if self.rx.block_samples() < 2 || self.rx.sync_block_samples() < 2 {
            return invalid("receive blocks must hold at least two samples".to_string());
        }
        if self.rx.preamble_length == 0 {
            return invalid("preamble_length must be at least 1".to_string());
        }
        if self.rx.ratio == 0 {
            return invalid("ratio must be at least 1".to_string());
        }
        if self.rx.ratio_tolerance >= self.rx.ratio {
            // A tolerance this wide would emit runs of length zero
            return invalid(format!(
                "ratio_tolerance {} must be below ratio {}",
                self.rx.ratio_tolerance, self.rx.ratio
            ));
        }
        if !(self.rx.threshold > 0.0) {
            return invalid(format!("threshold {} must be positive", self.rx.threshold));
        }
        for (name, value) in [
            ("sync_timeout", self.rx.sync_timeout),
            ("header_timeout", self.rx.header_timeout),
            ("payload_timeout", self.rx.payload_timeout),
        ] {
            if !(value > 0.0) || !value.is_finite() {
                return invalid(format!("{} must be a positive number of seconds", name));
            }
        }

        let table = self.tone_table();
        table.validate(self.rx.threshold)?;
        let nyquist = self.rx.sample_rate as f32 / 2.0;
        if table.preamble_frequency() >= nyquist {
            return invalid(format!(
                "preamble at {} Hz is above the receive Nyquist frequency {} Hz",
                table.preamble_frequency(),
                nyquist
            ));
        }
        if nibble_frequency(NIBBLE_VALUES as u8 - 1) >= nyquist {
            return invalid(format!(
                "nibble tones reach above the receive Nyquist frequency {} Hz",
                nyquist
            ));
        }
        if self.tones.preamble <= self.rx.frequency_filter {
            return invalid(format!(
                "preamble at {} Hz is removed by the {} Hz filter",
                self.tones.preamble, self.rx.frequency_filter
            ));
        }
        Ok(())
    }

    /// Blocks per transmitted symbol implied by the two durations
    pub fn implied_ratio(&self) -> f32 {
        self.tx.symbol_duration / self.rx.block_duration
    }
}

fn seconds_to_samples(seconds: f32, sample_rate: u32) -> usize {
    if !(seconds > 0.0) {
        return 0;
    }
    (seconds * sample_rate as f32).round() as usize
}
