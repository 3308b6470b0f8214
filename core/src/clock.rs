//! Bit-clock recovery
//!
//! The receiver demodulates several blocks per transmitted symbol. The clock
//! collapses each run of identical block decisions back into symbols using the
//! expected run length (`ratio`) and a tolerance for runs cut short or
//! stretched by block misalignment.

use log::debug;

use crate::bits::BitString;
use crate::frame::HEADER_BITS;
use crate::tones::Symbol;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BitClockState {
    pub previous_symbol: Option<Symbol>,
    pub run: usize,
}

#[derive(Debug, Clone)]
pub struct BitClock {
    state: BitClockState,
    ratio: usize,
    tolerance: usize,
}

impl BitClock {
    pub fn new(ratio: usize, tolerance: usize) -> Self {
        Self {
            state: BitClockState::default(),
            ratio,
            tolerance,
        }
    }

    pub fn state(&self) -> BitClockState {
        self.state
    }

    /// Feed one block decision, returning a symbol when one is complete
    pub fn push(&mut self, symbol: Symbol) -> Option<Symbol> {
        match self.state.previous_symbol {
            Some(previous) if previous == symbol => {
                self.state.run += 1;
                if self.state.run == self.ratio {
                    self.state.run = 0;
                    return data_symbol(symbol);
                }
                None
            }
            _ => {
                let pending = self.pending();
                self.state = BitClockState {
                    previous_symbol: Some(symbol),
                    run: 1,
                };
                if self.state.run == self.ratio {
                    self.state.run = 0;
                    return pending.or_else(|| data_symbol(symbol));
                }
                pending
            }
        }
    }

    /// Emit the run in progress if it is long enough, then clear the state
    pub fn flush(&mut self) -> Option<Symbol> {
        let pending = self.pending();
        self.state = BitClockState::default();
        pending
    }

    fn pending(&self) -> Option<Symbol> {
        let previous = self.state.previous_symbol?;
        if self.state.run.abs_diff(self.ratio) <= self.tolerance {
            data_symbol(previous)
        } else {
            if self.state.run > 0 && previous.carries_data() {
                debug!(
                    "Dropped run of {} blocks of {:?} (expected {})",
                    self.state.run, previous, self.ratio
                );
            }
            None
        }
    }
}

fn data_symbol(symbol: Symbol) -> Option<Symbol> {
    symbol.carries_data().then_some(symbol)
}

/// Collects emitted symbols into the length header and frame body
#[derive(Debug, Clone, Default)]
pub struct BitAssembler {
    bits: BitString,
    length: Option<u8>,
}

impl BitAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, symbol: Symbol) {
        match symbol {
            Symbol::Nibble(value) => self.bits.extend(&BitString::from_u8(value, 4)),
            Symbol::Bit(bit) => self.bits.push(bit),
            Symbol::Preamble | Symbol::Unknown => return,
        }
        if self.length.is_none() && self.bits.len() > HEADER_BITS {
            let length = self.bits.slice(0, HEADER_BITS).to_u8();
            debug!("Decoded length header: {} bits", length);
            self.length = Some(length);
        }
    }

    /// Codeword length from the header, once more than the header has arrived
    pub fn length(&self) -> Option<u8> {
        self.length
    }

    /// Bits received after the header
    pub fn body(&self) -> BitString {
        self.bits.slice(HEADER_BITS, self.bits.len())
    }

    pub fn bit_count(&self) -> usize {
        self.bits.len()
    }

    /// The body holds the whole codeword and at least one padding bit
    pub fn is_complete(&self) -> bool {
        match self.length {
            Some(length) => self.bits.len() - HEADER_BITS > length as usize,
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(clock: &mut BitClock, symbol: Symbol, blocks: usize) -> Vec<Symbol> {
        (0..blocks).filter_map(|_| clock.push(symbol)).collect()
    }

    #[test]
    fn test_exact_runs_emit_once() {
        let mut clock = BitClock::new(6, 3);
        assert_eq!(run(&mut clock, Symbol::Nibble(4), 6), vec![Symbol::Nibble(4)]);
        assert_eq!(run(&mut clock, Symbol::Nibble(9), 6), vec![Symbol::Nibble(9)]);
        assert_eq!(clock.flush(), None);
    }

    #[test]
    fn test_short_and_long_runs_emit_once() {
        let mut clock = BitClock::new(6, 3);
        let mut emitted = run(&mut clock, Symbol::Nibble(1), 5);
        emitted.extend(run(&mut clock, Symbol::Nibble(2), 7));
        emitted.extend(run(&mut clock, Symbol::Nibble(3), 6));
        emitted.extend(clock.flush());
        assert_eq!(
            emitted,
            vec![Symbol::Nibble(1), Symbol::Nibble(2), Symbol::Nibble(3)]
        );
    }

    #[test]
    fn test_repeated_symbol_emits_per_ratio() {
        let mut clock = BitClock::new(6, 3);
        let emitted = run(&mut clock, Symbol::Nibble(0), 18);
        assert_eq!(emitted, vec![Symbol::Nibble(0); 3]);
        assert_eq!(clock.state().run, 0);
    }

    #[test]
    fn test_repeated_symbol_with_short_tail() {
        let mut clock = BitClock::new(6, 3);
        let mut emitted = run(&mut clock, Symbol::Nibble(0), 11);
        emitted.extend(clock.flush());
        assert_eq!(emitted, vec![Symbol::Nibble(0); 2]);
    }

    #[test]
    fn test_glitch_runs_are_dropped() {
        let mut clock = BitClock::new(6, 3);
        let mut emitted = run(&mut clock, Symbol::Nibble(5), 6);
        emitted.extend(run(&mut clock, Symbol::Nibble(12), 1));
        emitted.extend(run(&mut clock, Symbol::Nibble(6), 6));
        assert_eq!(emitted, vec![Symbol::Nibble(5), Symbol::Nibble(6)]);
    }

    #[test]
    fn test_preamble_and_unknown_never_emitted() {
        let mut clock = BitClock::new(6, 3);
        let mut emitted = run(&mut clock, Symbol::Preamble, 12);
        emitted.extend(run(&mut clock, Symbol::Unknown, 5));
        emitted.extend(run(&mut clock, Symbol::Nibble(7), 6));
        emitted.extend(run(&mut clock, Symbol::Unknown, 4));
        emitted.extend(clock.flush());
        assert_eq!(emitted, vec![Symbol::Nibble(7)]);
    }

    #[test]
    fn test_single_bit_symbols() {
        let mut clock = BitClock::new(6, 3);
        let mut emitted = run(&mut clock, Symbol::Bit(true), 4);
        emitted.extend(run(&mut clock, Symbol::Bit(false), 6));
        assert_eq!(emitted, vec![Symbol::Bit(true), Symbol::Bit(false)]);
    }

    #[test]
    fn test_ratio_of_one() {
        let mut clock = BitClock::new(1, 0);
        let symbols = [Symbol::Nibble(1), Symbol::Nibble(1), Symbol::Nibble(2)];
        let emitted: Vec<Symbol> = symbols.iter().filter_map(|&s| clock.push(s)).collect();
        assert_eq!(emitted, symbols.to_vec());
    }

    #[test]
    fn test_flush_clears_state() {
        let mut clock = BitClock::new(6, 3);
        run(&mut clock, Symbol::Nibble(3), 4);
        assert_eq!(clock.flush(), Some(Symbol::Nibble(3)));
        assert_eq!(clock.state(), BitClockState::default());
        assert_eq!(clock.flush(), None);
    }

    #[test]
    fn test_assembler_header_after_more_than_eight_bits() {
        let mut assembler = BitAssembler::new();
        assembler.push(Symbol::Nibble(0));
        assembler.push(Symbol::Nibble(15));
        assert_eq!(assembler.length(), None);
        assembler.push(Symbol::Nibble(0b1010));
        assert_eq!(assembler.length(), Some(15));
        assert!(!assembler.is_complete());
    }

    #[test]
    fn test_assembler_completes_after_padding_bit() {
        let mut assembler = BitAssembler::new();
        for nibble in [0, 15, 0b1010, 0b1000, 0b0110] {
            assembler.push(Symbol::Nibble(nibble));
        }
        assert!(!assembler.is_complete());
        assembler.push(Symbol::Nibble(0b0110));
        assert!(assembler.is_complete());
        assert_eq!(assembler.body().to_string(), "1010100001100110");
    }

    #[test]
    fn test_assembler_with_single_bits() {
        let mut assembler = BitAssembler::new();
        assembler.push(Symbol::Nibble(0));
        assembler.push(Symbol::Nibble(2));
        assembler.push(Symbol::Preamble);
        assembler.push(Symbol::Bit(true));
        assert_eq!(assembler.length(), Some(2));
        assembler.push(Symbol::Bit(false));
        assert!(!assembler.is_complete());
        assembler.push(Symbol::Bit(false));
        assert!(assembler.is_complete());
        assert_eq!(assembler.body().to_string(), "100");
        assert_eq!(assembler.bit_count(), 11);
    }
}
