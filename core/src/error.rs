use std::fmt;

use thiserror::Error;

use crate::bits::BitString;

/// Receiver stage a timeout was raised in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    AwaitingPreamble,
    ReceivingHeader,
    ReceivingPayload,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::AwaitingPreamble => "awaiting preamble",
            Stage::ReceivingHeader => "receiving length header",
            Stage::ReceivingPayload => "receiving payload",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
pub enum LinkError {
    #[error("Timed out while {stage}")]
    Timeout { stage: Stage },

    #[error("Reception cancelled")]
    Cancelled,

    #[error("Audio stream ended")]
    EndOfStream,

    #[error("Audio stream ended before the frame was complete")]
    Truncated,

    /// `suspected_flips` are body positions of set padding bits, when known
    #[error("No single or double bit flip clears the CRC of {received} (padding bits set at {suspected_flips:?})")]
    Uncorrectable {
        received: BitString,
        suspected_flips: Vec<usize>,
    },

    #[error("{candidates} equally valid corrections for {received} (padding bits set at {suspected_flips:?})")]
    AmbiguousCorrection {
        received: BitString,
        candidates: usize,
        suspected_flips: Vec<usize>,
    },

    #[error("Invalid bit character {0:?}")]
    InvalidBit(char),

    #[error("Payload must contain at least one bit")]
    EmptyPayload,

    #[error("Payload and CRC span {bits} bits, the length header holds at most 255")]
    PayloadTooLong { bits: usize },

    #[error("Insufficient data")]
    InsufficientData,

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("FFT error: {0}")]
    FftError(String),

    #[error("Audio transport error: {0}")]
    Transport(String),
}

impl LinkError {
    /// Attach padding anomalies to a failed correction
    pub fn with_suspected_flips(self, flips: &[usize]) -> Self {
        match self {
            LinkError::Uncorrectable { received, .. } => LinkError::Uncorrectable {
                received,
                suspected_flips: flips.to_vec(),
            },
            LinkError::AmbiguousCorrection {
                received,
                candidates,
                ..
            } => LinkError::AmbiguousCorrection {
                received,
                candidates,
                suspected_flips: flips.to_vec(),
            },
            other => other,
        }
    }
}

pub type Result<T> = std::result::Result<T, LinkError>;
