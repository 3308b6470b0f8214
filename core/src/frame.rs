use log::warn;

use crate::bits::BitString;
use crate::crc::{self, CrcPolynomial, MAX_CORRECTABLE_PAYLOAD_BITS};
use crate::error::{LinkError, Result};

/// Bits carried by the length header
pub const HEADER_BITS: usize = 8;

/// Largest codeword (payload + CRC) the length header can describe
pub const MAX_CODEWORD_BITS: usize = u8::MAX as usize;

/// A transmit frame: length header, payload, CRC remainder and zero padding
///
/// `length` counts payload and CRC bits. The padding holds 1 to 4 zero bits
/// so the body (`payload ‖ crc ‖ padding`) fills whole nibbles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub length: u8,
    pub payload: BitString,
    pub crc: BitString,
    pub padding: BitString,
}

impl Frame {
    pub fn codeword(&self) -> BitString {
        self.payload.concat(&self.crc)
    }

    /// Transmitted body: payload, CRC and padding
    pub fn body(&self) -> BitString {
        self.codeword().concat(&self.padding)
    }

    pub fn header(&self) -> BitString {
        BitString::from_u8(self.length, HEADER_BITS)
    }

    /// Every nibble in transmit order: two header nibbles, then the body
    pub fn nibbles(&self) -> Vec<u8> {
        let mut nibbles = self.header().nibbles();
        nibbles.extend(self.body().nibbles());
        nibbles
    }

    /// Copy of this frame with body bits inverted at `indices`
    ///
    /// Used to inject channel errors on the sender side. Indices past the
    /// body are ignored.
    pub fn with_flipped_bits(&self, indices: &[usize]) -> Frame {
        let mut body = self.body();
        for &index in indices {
            body.flip(index);
        }
        let payload_end = self.payload.len();
        let crc_end = payload_end + self.crc.len();
        Frame {
            length: self.length,
            payload: body.slice(0, payload_end),
            crc: body.slice(payload_end, crc_end),
            padding: body.slice(crc_end, body.len()),
        }
    }
}

/// Build the transmit frame for `payload`
pub fn encode(payload: &BitString, polynomial: &CrcPolynomial) -> Result<Frame> {
    if payload.is_empty() {
        return Err(LinkError::EmptyPayload);
    }
    let codeword_bits = payload.len() + polynomial.check_bits();
    if codeword_bits > MAX_CODEWORD_BITS {
        return Err(LinkError::PayloadTooLong {
            bits: codeword_bits,
        });
    }
    if payload.len() > MAX_CORRECTABLE_PAYLOAD_BITS {
        warn!(
            "Payload of {} bits exceeds the {}-bit two-error correction guarantee",
            payload.len(),
            MAX_CORRECTABLE_PAYLOAD_BITS
        );
    }

    let crc = crc::remainder(payload, polynomial);
    // Always at least one pad bit: an aligned codeword gets a whole zero nibble
    let padding = BitString::zeros(4 - codeword_bits % 4);

    Ok(Frame {
        length: codeword_bits as u8,
        payload: payload.clone(),
        crc,
        padding,
    })
}

/// A frame as recovered by the receiver, before CRC correction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceivedFrame {
    pub length: u8,
    pub codeword: BitString,
    pub padding: BitString,
    /// Body indices of `1` bits found in the padding region
    pub suspected_flips: Vec<usize>,
}

impl ReceivedFrame {
    /// Split the codeword into payload and CRC bits
    pub fn split(&self, polynomial: &CrcPolynomial) -> (BitString, BitString) {
        let payload_len = self.codeword.len().saturating_sub(polynomial.check_bits());
        (
            self.codeword.slice(0, payload_len),
            self.codeword.slice(payload_len, self.codeword.len()),
        )
    }
}

/// Separate a received body into codeword and padding
///
/// `body` is the bit stream after the length header. The first `length` bits
/// are the codeword; bits from there up to the next nibble boundary are
/// padding. Set padding bits are reported, not corrected.
pub fn decode(length: u8, body: &BitString) -> Result<ReceivedFrame> {
    let length = length as usize;
    if body.len() < length {
        return Err(LinkError::InsufficientData);
    }
    let boundary = (length / 4 + 1) * 4;
    let padding = body.slice(length, boundary);
    let suspected_flips: Vec<usize> = padding.ones().into_iter().map(|i| i + length).collect();
    if !suspected_flips.is_empty() {
        warn!("Padding bits set at body positions {:?}", suspected_flips);
    }

    Ok(ReceivedFrame {
        length: length as u8,
        codeword: body.slice(0, length),
        padding,
        suspected_flips,
    })
}
