//! Preamble detection
//!
//! The receiver listens in short blocks and counts blocks whose dominant tone
//! is the preamble frequency. Once `preamble_length` of them have been seen
//! the link is synchronised and data reception can start.

use std::time::Duration;

use log::{debug, info};

use crate::cancel::CancelToken;
use crate::config::{ReceiveConfig, SyncPolicy};
use crate::demod::FskDemodulator;
use crate::error::{LinkError, Result, Stage};
use crate::tones::Symbol;
use crate::transport::AudioSource;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncState {
    pub bursts_matched: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncProgress {
    Waiting { bursts_matched: usize },
    Synced,
}

pub struct PreambleSynchronizer {
    state: SyncState,
    required: usize,
    policy: SyncPolicy,
    block_samples: usize,
}

impl PreambleSynchronizer {
    pub fn new(config: &ReceiveConfig) -> Self {
        Self {
            state: SyncState::default(),
            required: config.preamble_length,
            policy: config.sync_policy,
            block_samples: config.sync_block_samples(),
        }
    }

    pub fn state(&self) -> SyncState {
        self.state
    }

    pub fn reset(&mut self) {
        self.state = SyncState::default();
    }

    /// Feed one demodulated block
    pub fn observe(&mut self, symbol: Symbol) -> SyncProgress {
        if symbol == Symbol::Preamble {
            self.state.bursts_matched += 1;
        } else if self.policy == SyncPolicy::Consecutive && self.state.bursts_matched > 0 {
            debug!(
                "Preamble run broken by {:?} after {} blocks",
                symbol, self.state.bursts_matched
            );
            self.state.bursts_matched = 0;
        }

        if self.state.bursts_matched >= self.required {
            SyncProgress::Synced
        } else {
            SyncProgress::Waiting {
                bursts_matched: self.state.bursts_matched,
            }
        }
    }

    /// Read blocks from `source` until the preamble has been recognised
    ///
    /// `budget` is measured in audio time. Returns the number of samples
    /// consumed.
    pub fn acquire<S: AudioSource + ?Sized>(
        &mut self,
        source: &mut S,
        demodulator: &mut FskDemodulator,
        cancel: &CancelToken,
        budget: Duration,
    ) -> Result<usize> {
        self.reset();
        let budget_samples = budget_in_samples(budget, source.sample_rate());
        let mut consumed = 0usize;

        loop {
            if cancel.is_cancelled() {
                return Err(LinkError::Cancelled);
            }
            if consumed >= budget_samples {
                return Err(LinkError::Timeout {
                    stage: Stage::AwaitingPreamble,
                });
            }

            let block = source.read_block(self.block_samples)?;
            consumed += block.len();
            let symbol = demodulator.detect_preamble(&block)?;

            if self.observe(symbol) == SyncProgress::Synced {
                info!(
                    "Preamble detected after {:.2} s of audio",
                    consumed as f32 / source.sample_rate() as f32
                );
                return Ok(consumed);
            }
        }
    }
}

/// Number of samples covering `budget` at `sample_rate`
pub(crate) fn budget_in_samples(budget: Duration, sample_rate: u32) -> usize {
    (budget.as_secs_f64() * sample_rate as f64).ceil() as usize
}
