//! CRC generation, verification and brute-force error correction
//!
//! Division is plain modulo-2 long division over bit vectors. Correction
//! searches every single-bit flip first and only then every pair of flips,
//! which is enough to undo up to two errors while the polynomial keeps a
//! minimum Hamming distance of 5 over the codeword.

use std::fmt;
use std::str::FromStr;

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::bits::BitString;
use crate::error::{LinkError, Result};

/// Default divisor. Guarantees a minimum distance of 5 for payloads up to
/// [`MAX_CORRECTABLE_PAYLOAD_BITS`] bits.
pub const DEFAULT_POLYNOMIAL: &str = "010111010111";

/// Longest payload for which the default polynomial corrects two errors
pub const MAX_CORRECTABLE_PAYLOAD_BITS: usize = 20;

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CrcPolynomial {
    bits: BitString,
}

impl CrcPolynomial {
    pub fn parse(text: &str) -> Result<Self> {
        let bits: BitString = text.parse()?;
        if bits.len() < 2 {
            return Err(LinkError::InvalidConfig(format!(
                "CRC polynomial {:?} needs at least 2 bits",
                text
            )));
        }
        if bits.is_all_zero() {
            return Err(LinkError::InvalidConfig(
                "CRC polynomial must contain a set bit".to_string(),
            ));
        }
        Ok(Self { bits })
    }

    pub fn bits(&self) -> &BitString {
        &self.bits
    }

    pub fn len(&self) -> usize {
        self.bits.len()
    }

    /// Number of redundant bits appended to a payload
    pub fn check_bits(&self) -> usize {
        self.bits.len() - 1
    }

    /// Zero bits appended to the dividend before division
    pub fn filler(&self) -> BitString {
        BitString::zeros(self.check_bits())
    }
}

impl Default for CrcPolynomial {
    fn default() -> Self {
        Self {
            bits: DEFAULT_POLYNOMIAL.chars().map(|c| c == '1').collect(),
        }
    }
}

impl FromStr for CrcPolynomial {
    type Err = LinkError;

    fn from_str(text: &str) -> Result<Self> {
        Self::parse(text)
    }
}

impl TryFrom<String> for CrcPolynomial {
    type Error = LinkError;

    fn try_from(text: String) -> Result<Self> {
        Self::parse(&text)
    }
}

impl From<CrcPolynomial> for String {
    fn from(polynomial: CrcPolynomial) -> Self {
        polynomial.bits.to_string()
    }
}

impl fmt::Display for CrcPolynomial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.bits.fmt(f)
    }
}

impl fmt::Debug for CrcPolynomial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CrcPolynomial(\"{}\")", self.bits)
    }
}

/// XOR the divisor into `buffer` at every position in `0..steps` whose bit is set
fn divide(buffer: &mut [bool], divisor: &[bool], steps: usize) {
    for i in 0..steps {
        if buffer[i] {
            for (offset, &d) in divisor.iter().enumerate() {
                buffer[i + offset] ^= d;
            }
        }
    }
}

/// CRC remainder of `input`: the trailing `check_bits` bits left after
/// dividing `input ‖ filler` by the polynomial.
pub fn remainder(input: &BitString, polynomial: &CrcPolynomial) -> BitString {
    let mut buffer: Vec<bool> = input.concat(&polynomial.filler()).iter().collect();
    divide(&mut buffer, polynomial.bits().as_slice(), input.len());
    BitString::from(buffer[input.len()..].to_vec())
}

/// True when `codeword` (payload ‖ CRC) divides with an all-zero remainder
pub fn check(codeword: &BitString, polynomial: &CrcPolynomial) -> bool {
    if codeword.len() < polynomial.len() {
        // Too short to carry a payload bit as well as the check bits
        return false;
    }
    let mut buffer: Vec<bool> = codeword.iter().collect();
    let steps = buffer.len() - polynomial.len() + 1;
    divide(&mut buffer, polynomial.bits().as_slice(), steps);
    !buffer[steps..].iter().any(|&bit| bit)
}

/// What [`correct`] had to do to make a codeword pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Correction {
    Clean,
    /// 0-based indices of the flipped bits, ascending
    Corrected { flipped: Vec<usize> },
}

impl Correction {
    pub fn flipped(&self) -> &[usize] {
        match self {
            Correction::Clean => &[],
            Correction::Corrected { flipped } => flipped,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Corrected {
    pub codeword: BitString,
    pub correction: Correction,
}

/// Restore a codeword by flipping at most two bits
///
/// Single flips are all evaluated before any pair. A tier that yields more
/// than one passing candidate is reported as ambiguous instead of picking
/// one of them.
pub fn correct(codeword: &BitString, polynomial: &CrcPolynomial) -> Result<Corrected> {
    if check(codeword, polynomial) {
        return Ok(Corrected {
            codeword: codeword.clone(),
            correction: Correction::Clean,
        });
    }

    debug!("CRC mismatch on {}, searching single flips", codeword);
    let singles: Vec<Vec<usize>> = (0..codeword.len())
        .filter(|&i| check(&codeword.flipped(i), polynomial))
        .map(|i| vec![i])
        .collect();
    if !singles.is_empty() {
        return resolve(codeword, singles);
    }

    debug!("No single flip passes, searching flip pairs");
    let mut pairs = Vec::new();
    for i in 0..codeword.len() {
        let once = codeword.flipped(i);
        for j in (i + 1)..codeword.len() {
            if check(&once.flipped(j), polynomial) {
                pairs.push(vec![i, j]);
            }
        }
    }
    if !pairs.is_empty() {
        return resolve(codeword, pairs);
    }

    Err(LinkError::Uncorrectable {
        received: codeword.clone(),
        suspected_flips: Vec::new(),
    })
}

fn resolve(codeword: &BitString, mut candidates: Vec<Vec<usize>>) -> Result<Corrected> {
    if candidates.len() > 1 {
        return Err(LinkError::AmbiguousCorrection {
            received: codeword.clone(),
            candidates: candidates.len(),
            suspected_flips: Vec::new(),
        });
    }
    let flipped = candidates.remove(0);
    let mut repaired = codeword.clone();
    for &index in &flipped {
        repaired.flip(index);
    }
    info!("Corrected bit flips at {:?}", flipped);
    Ok(Corrected {
        codeword: repaired,
        correction: Correction::Corrected { flipped },
    })
}

/// Smallest weight of a nonzero valid codeword for `payload_bits`-bit
/// payloads, searching weights up to `limit`. `None` means every nonzero
/// codeword is heavier than `limit`.
pub fn minimum_distance(
    polynomial: &CrcPolynomial,
    payload_bits: usize,
    limit: usize,
) -> Option<usize> {
    let length = payload_bits + polynomial.check_bits();
    (1..=limit).find(|&weight| any_codeword_of_weight(polynomial, length, weight))
}

fn any_codeword_of_weight(polynomial: &CrcPolynomial, length: usize, weight: usize) -> bool {
    fn search(
        polynomial: &CrcPolynomial,
        word: &mut BitString,
        start: usize,
        remaining: usize,
    ) -> bool {
        if remaining == 0 {
            return check(word, polynomial);
        }
        for i in start..word.len() {
            word.flip(i);
            let found = search(polynomial, word, i + 1, remaining - 1);
            word.flip(i);
            if found {
                return true;
            }
        }
        false
    }

    let mut word = BitString::zeros(length);
    search(polynomial, &mut word, 0, weight)
}
