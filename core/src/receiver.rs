//! Receiver state machine
//!
//! ```text
//! AwaitingPreamble -> Synced -> ReceivingHeader -> ReceivingPayload -> Done
//!         \________________________\___________________\__________-> Failed
//! ```
//!
//! Every waiting stage has its own budget of audio time and checks the cancel
//! token between blocks.

use log::{debug, info, warn};

use crate::bits::BitString;
use crate::cancel::CancelToken;
use crate::clock::{BitAssembler, BitClock};
use crate::config::LinkConfig;
use crate::crc::{self, Correction};
use crate::demod::FskDemodulator;
use crate::error::{LinkError, Result, Stage};
use crate::frame::{self, ReceivedFrame};
use crate::sync::{budget_in_samples, PreambleSynchronizer};
use crate::transport::AudioSource;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiveState {
    AwaitingPreamble,
    Synced,
    ReceivingHeader,
    ReceivingPayload,
    Done,
    Failed,
}

/// A successfully received frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reception {
    pub frame: ReceivedFrame,
    /// Codeword after CRC correction
    pub codeword: BitString,
    /// Corrected codeword without its check bits
    pub message: BitString,
    pub correction: Correction,
}

pub struct Receiver {
    config: LinkConfig,
    demodulator: FskDemodulator,
    state: ReceiveState,
}

impl Receiver {
    pub fn new(config: &LinkConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config: config.clone(),
            demodulator: FskDemodulator::new(config),
            state: ReceiveState::AwaitingPreamble,
        })
    }

    pub fn state(&self) -> ReceiveState {
        self.state
    }

    pub fn config(&self) -> &LinkConfig {
        &self.config
    }

    /// Listen on `source` until one frame has been received and corrected
    pub fn receive<S: AudioSource + ?Sized>(
        &mut self,
        source: &mut S,
        cancel: &CancelToken,
    ) -> Result<Reception> {
        self.transition(ReceiveState::AwaitingPreamble);
        match self.run(source, cancel) {
            Ok(reception) => {
                self.transition(ReceiveState::Done);
                Ok(reception)
            }
            Err(e) => {
                debug!("Reception failed: {}", e);
                self.transition(ReceiveState::Failed);
                Err(e)
            }
        }
    }

    fn run<S: AudioSource + ?Sized>(
        &mut self,
        source: &mut S,
        cancel: &CancelToken,
    ) -> Result<Reception> {
        if source.sample_rate() != self.config.rx.sample_rate {
            return Err(LinkError::InvalidConfig(format!(
                "source delivers {} Hz, receiver expects {} Hz",
                source.sample_rate(),
                self.config.rx.sample_rate
            )));
        }

        let mut synchronizer = PreambleSynchronizer::new(&self.config.rx);
        synchronizer.acquire(
            source,
            &mut self.demodulator,
            cancel,
            self.config.rx.sync_budget(),
        )?;
        self.transition(ReceiveState::Synced);

        let (length, body) = self.collect_frame(source, cancel)?;
        let received = frame::decode(length, &body)?;
        let corrected = crc::correct(&received.codeword, &self.config.polynomial).map_err(|e| {
            if !received.suspected_flips.is_empty() {
                warn!(
                    "Correction failed with padding bits set at {:?}",
                    received.suspected_flips
                );
            }
            e.with_suspected_flips(&received.suspected_flips)
        })?;

        let message_len = corrected
            .codeword
            .len()
            .saturating_sub(self.config.polynomial.check_bits());
        let message = corrected.codeword.slice(0, message_len);
        info!(
            "Received {}-bit message {} ({:?})",
            message.len(),
            message,
            corrected.correction
        );

        Ok(Reception {
            frame: received,
            codeword: corrected.codeword,
            message,
            correction: corrected.correction,
        })
    }

    /// Demodulate data blocks until the header and the whole body are in
    fn collect_frame<S: AudioSource + ?Sized>(
        &mut self,
        source: &mut S,
        cancel: &CancelToken,
    ) -> Result<(u8, BitString)> {
        let rx = &self.config.rx;
        let block_samples = rx.block_samples();
        let header_budget = budget_in_samples(rx.header_budget(), rx.sample_rate);
        let payload_budget = budget_in_samples(rx.payload_budget(), rx.sample_rate);

        let mut clock = BitClock::new(rx.ratio, rx.ratio_tolerance);
        let mut assembler = BitAssembler::new();
        let mut stage_samples = 0usize;
        self.transition(ReceiveState::ReceivingHeader);

        while !assembler.is_complete() {
            if cancel.is_cancelled() {
                return Err(LinkError::Cancelled);
            }
            let (stage, budget) = match assembler.length() {
                None => (Stage::ReceivingHeader, header_budget),
                Some(_) => (Stage::ReceivingPayload, payload_budget),
            };
            if stage_samples >= budget {
                return Err(LinkError::Timeout { stage });
            }

            let block = match source.read_block(block_samples) {
                Ok(block) => block,
                Err(LinkError::EndOfStream) => {
                    if let Some(symbol) = clock.flush() {
                        assembler.push(symbol);
                    }
                    if assembler.is_complete() {
                        break;
                    }
                    debug!(
                        "Stream ended with {} of the frame bits",
                        assembler.bit_count()
                    );
                    return Err(LinkError::Truncated);
                }
                Err(e) => return Err(e),
            };
            stage_samples += block.len();

            let symbol = self.demodulator.detect(&block)?;
            if let Some(emitted) = clock.push(symbol) {
                let had_length = assembler.length().is_some();
                assembler.push(emitted);
                if !had_length && assembler.length().is_some() {
                    self.transition(ReceiveState::ReceivingPayload);
                    stage_samples = 0;
                }
            }
        }

        match assembler.length() {
            Some(length) => Ok((length, assembler.body())),
            None => Err(LinkError::Truncated),
        }
    }

    fn transition(&mut self, next: ReceiveState) {
        if self.state != next {
            debug!("Receiver state {:?} -> {:?}", self.state, next);
            self.state = next;
        }
    }
}
