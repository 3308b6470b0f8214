use serde::{Deserialize, Serialize};

use crate::error::{LinkError, Result};

/// Frequency of nibble value 0 in Hz
pub const NIBBLE_BASE_FREQ: f32 = 4300.0;

/// Spacing between adjacent nibble tones in Hz
pub const NIBBLE_FREQ_STEP: f32 = 200.0;

pub const NIBBLE_VALUES: usize = 16;

/// Frequencies outside the nibble band, all configurable
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToneConfig {
    pub preamble: f32,
    pub bit0: f32,
    pub bit1: f32,
}

impl Default for ToneConfig {
    fn default() -> Self {
        Self {
            preamble: 5000.0,
            bit0: 7900.0,
            bit1: 8200.0,
        }
    }
}

/// What one demodulated block stands for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Symbol {
    /// Four data bits
    Nibble(u8),
    /// A single data bit
    Bit(bool),
    Preamble,
    Unknown,
}

impl Symbol {
    /// Number of data bits this symbol contributes to the bit stream
    pub fn bit_width(&self) -> usize {
        match self {
            Symbol::Nibble(_) => 4,
            Symbol::Bit(_) => 1,
            Symbol::Preamble | Symbol::Unknown => 0,
        }
    }

    pub fn carries_data(&self) -> bool {
        self.bit_width() > 0
    }
}

/// Tone frequency for a 4-bit value
pub fn nibble_frequency(nibble: u8) -> f32 {
    NIBBLE_BASE_FREQ + NIBBLE_FREQ_STEP * (nibble & 0x0F) as f32
}

/// Bidirectional mapping between symbols and tone frequencies
#[derive(Debug, Clone)]
pub struct ToneTable {
    entries: Vec<(Symbol, f32)>,
    preamble: f32,
}

impl ToneTable {
    pub fn new(config: &ToneConfig) -> Self {
        let mut entries: Vec<(Symbol, f32)> = (0..NIBBLE_VALUES as u8)
            .map(|value| (Symbol::Nibble(value), nibble_frequency(value)))
            .collect();
        entries.push((Symbol::Bit(false), config.bit0));
        entries.push((Symbol::Bit(true), config.bit1));
        entries.push((Symbol::Preamble, config.preamble));
        Self {
            entries,
            preamble: config.preamble,
        }
    }

    pub fn preamble_frequency(&self) -> f32 {
        self.preamble
    }

    pub fn frequency(&self, symbol: Symbol) -> Option<f32> {
        self.entries
            .iter()
            .find(|(entry, _)| *entry == symbol)
            .map(|&(_, freq)| freq)
    }

    /// Nearest table entry within `threshold` Hz (inclusive), else `Unknown`.
    /// Equidistant entries resolve to the earlier one in table order.
    pub fn classify(&self, frequency: f32, threshold: f32) -> Symbol {
        let mut best: Option<(Symbol, f32)> = None;
        for &(symbol, tone) in &self.entries {
            let distance = (frequency - tone).abs();
            if distance > threshold {
                continue;
            }
            match best {
                Some((_, closest)) if closest <= distance => {}
                _ => best = Some((symbol, distance)),
            }
        }
        best.map(|(symbol, _)| symbol).unwrap_or(Symbol::Unknown)
    }

    /// Every pair of tones must be at least `threshold` Hz apart
    pub fn validate(&self, threshold: f32) -> Result<()> {
        for (i, &(a, fa)) in self.entries.iter().enumerate() {
            for &(b, fb) in &self.entries[i + 1..] {
                if (fa - fb).abs() < threshold {
                    return Err(LinkError::InvalidConfig(format!(
                        "{:?} at {} Hz and {:?} at {} Hz are closer than {} Hz",
                        a, fa, b, fb, threshold
                    )));
                }
            }
        }
        Ok(())
    }
}

impl Default for ToneTable {
    fn default() -> Self {
        Self::new(&ToneConfig::default())
    }
}
