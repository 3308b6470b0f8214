use std::fmt;
use std::str::FromStr;

use crate::error::{LinkError, Result};

/// Ordered sequence of bits
///
/// Frames, codewords and CRC remainders are all carried as `BitString`.
/// Text (`"0110"`) is only used at the edges: parsing user input and display.
#[derive(Clone, Default, PartialEq, Eq, Hash)]
pub struct BitString {
    bits: Vec<bool>,
}

impl BitString {
    pub fn new() -> Self {
        Self { bits: Vec::new() }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            bits: Vec::with_capacity(capacity),
        }
    }

    pub fn zeros(len: usize) -> Self {
        Self {
            bits: vec![false; len],
        }
    }

    /// The low `width` bits of `value`, MSB first
    pub fn from_u8(value: u8, width: usize) -> Self {
        let width = width.min(8);
        let bits = (0..width)
            .rev()
            .map(|shift| (value >> shift) & 1 == 1)
            .collect();
        Self { bits }
    }

    /// Interpret up to the first 8 bits as an unsigned value, MSB first
    pub fn to_u8(&self) -> u8 {
        self.bits
            .iter()
            .take(8)
            .fold(0u8, |acc, &bit| (acc << 1) | bit as u8)
    }

    pub fn len(&self) -> usize {
        self.bits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bits.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<bool> {
        self.bits.get(index).copied()
    }

    pub fn push(&mut self, bit: bool) {
        self.bits.push(bit);
    }

    pub fn extend(&mut self, other: &BitString) {
        self.bits.extend_from_slice(&other.bits);
    }

    /// Invert the bit at `index`. Out-of-range indices are ignored.
    pub fn flip(&mut self, index: usize) {
        if let Some(bit) = self.bits.get_mut(index) {
            *bit = !*bit;
        }
    }

    pub fn flipped(&self, index: usize) -> Self {
        let mut copy = self.clone();
        copy.flip(index);
        copy
    }

    pub fn concat(&self, other: &BitString) -> Self {
        let mut joined = Self::with_capacity(self.len() + other.len());
        joined.extend(self);
        joined.extend(other);
        joined
    }

    /// Bits in `start..end`, clamped to the string length
    pub fn slice(&self, start: usize, end: usize) -> Self {
        let end = end.min(self.len());
        let start = start.min(end);
        Self {
            bits: self.bits[start..end].to_vec(),
        }
    }

    pub fn count_ones(&self) -> usize {
        self.bits.iter().filter(|&&bit| bit).count()
    }

    pub fn is_all_zero(&self) -> bool {
        !self.bits.iter().any(|&bit| bit)
    }

    /// Indices of every set bit
    pub fn ones(&self) -> Vec<usize> {
        self.bits
            .iter()
            .enumerate()
            .filter_map(|(index, &bit)| bit.then_some(index))
            .collect()
    }

    /// Split into 4-bit values, MSB first. A short trailing group is
    /// zero-extended on the right.
    pub fn nibbles(&self) -> Vec<u8> {
        self.bits
            .chunks(4)
            .map(|chunk| {
                (0..4).fold(0u8, |acc, i| {
                    (acc << 1) | chunk.get(i).copied().unwrap_or(false) as u8
                })
            })
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = bool> + '_ {
        self.bits.iter().copied()
    }

    pub fn as_slice(&self) -> &[bool] {
        &self.bits
    }
}

impl FromStr for BitString {
    type Err = LinkError;

    fn from_str(text: &str) -> Result<Self> {
        text.chars()
            .map(|c| match c {
                '0' => Ok(false),
                '1' => Ok(true),
                other => Err(LinkError::InvalidBit(other)),
            })
            .collect::<Result<Vec<bool>>>()
            .map(|bits| Self { bits })
    }
}

impl From<Vec<bool>> for BitString {
    fn from(bits: Vec<bool>) -> Self {
        Self { bits }
    }
}

impl FromIterator<bool> for BitString {
    fn from_iter<I: IntoIterator<Item = bool>>(iter: I) -> Self {
        Self {
            bits: iter.into_iter().collect(),
        }
    }
}

impl fmt::Display for BitString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for &bit in &self.bits {
            f.write_str(if bit { "1" } else { "0" })?;
        }
        Ok(())
    }
}

impl fmt::Debug for BitString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BitString(\"{}\")", self)
    }
}
