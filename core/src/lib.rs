//! Acoustic FSK data link with CRC-based error correction
//!
//! Short bit strings are framed with a length header and a CRC remainder,
//! sent as one audible tone per nibble after a preamble, and recovered by
//! FFT peak detection. The CRC corrects up to two flipped bits.

pub mod bits;
pub mod cancel;
pub mod clock;
pub mod config;
pub mod crc;
pub mod demod;
pub mod error;
pub mod frame;
pub mod fsk;
pub mod receiver;
pub mod resample;
pub mod sync;
pub mod tones;
pub mod transmitter;
pub mod transport;

pub use bits::BitString;
pub use cancel::CancelToken;
pub use config::{LinkConfig, ReceiveConfig, SyncPolicy, TransmitConfig};
pub use crc::{CrcPolynomial, Correction};
pub use error::{LinkError, Result, Stage};
pub use frame::{Frame, ReceivedFrame};
pub use receiver::{Receiver, Reception, ReceiveState};
pub use tones::{Symbol, ToneConfig, ToneTable};
pub use transmitter::{flip_positions, Transmitter};
pub use transport::{AudioSink, AudioSource, MemorySink, MemorySource};
