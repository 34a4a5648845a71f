//! The frequency table: symbol -> occurrence count for one fixed symbol width.
//!
//! The table is the only thing a decoder needs to rebuild the exact code tree used by the encoder, so it
//! is also what gets serialized in front of a compressed payload.

use rustc_hash::FxHashMap;

use crate::error::{HuffError, Result};

/// Reserved symbol value of the end-of-data sentinel leaf (max signed 64 bit value).
pub const EOF_SYMBOL: u64 = i64::MAX as u64;

/// Widest symbol we can code.
pub const MAX_SYMBOL_WIDTH: u32 = 64;

/// Symbol frequencies for one symbol width, plus the optional size of the source they came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrequencyTable {
    symbol_width: u32,
    declared_size: Option<u64>,
    freqs: FxHashMap<u64, u64>,
}

impl FrequencyTable {
    /// Create an empty table. Symbol width must be 1..=64 bits.
    pub fn new(symbol_width: u32) -> Result<Self> {
        if symbol_width == 0 || symbol_width > MAX_SYMBOL_WIDTH {
            return Err(HuffError::unsupported(format!(
                "symbol width {} is outside 1..={}",
                symbol_width, MAX_SYMBOL_WIDTH
            )));
        }
        Ok(Self {
            symbol_width,
            declared_size: None,
            freqs: FxHashMap::default(),
        })
    }

    pub fn symbol_width(&self) -> u32 {
        self.symbol_width
    }

    /// Size in bytes of the source the table describes, if anyone told us.
    pub fn declared_size(&self) -> Option<u64> {
        self.declared_size
    }

    pub fn set_declared_size(&mut self, size: u64) {
        self.declared_size = Some(size);
    }

    pub fn clear_declared_size(&mut self) {
        self.declared_size = None;
    }

    /// Largest symbol value this width can hold.
    pub fn max_symbol(&self) -> u64 {
        if self.symbol_width == 64 {
            u64::MAX
        } else {
            (1_u64 << self.symbol_width) - 1
        }
    }

    fn check_symbol(&self, symbol: u64) -> Result<()> {
        if symbol > self.max_symbol() {
            return Err(HuffError::unsupported(format!(
                "symbol 0x{:x} does not fit in {} bits",
                symbol, self.symbol_width
            )));
        }
        Ok(())
    }

    /// Count one more occurrence of symbol.
    pub fn increment(&mut self, symbol: u64) -> Result<()> {
        self.check_symbol(symbol)?;
        let count = self.freqs.entry(symbol).or_insert(0);
        *count = count.saturating_add(1);
        Ok(())
    }

    /// Set the count for symbol directly. A count of zero removes the symbol.
    pub fn set_frequency(&mut self, symbol: u64, count: u64) -> Result<()> {
        self.check_symbol(symbol)?;
        if count == 0 {
            self.freqs.remove(&symbol);
        } else {
            self.freqs.insert(symbol, count);
        }
        Ok(())
    }

    /// Count for symbol (0 when absent).
    pub fn frequency(&self, symbol: u64) -> u64 {
        self.freqs.get(&symbol).copied().unwrap_or(0)
    }

    pub fn max_frequency(&self) -> u64 {
        self.freqs.values().copied().max().unwrap_or(0)
    }

    /// How many symbols have a count above zero.
    pub fn valid_entries(&self) -> usize {
        self.freqs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.freqs.is_empty()
    }

    /// Bits needed by the widest symbol actually present.
    pub fn max_symbol_bits(&self) -> u32 {
        self.freqs
            .keys()
            .map(|s| 64 - s.leading_zeros())
            .max()
            .unwrap_or(0)
    }

    /// Sum of all counts, or None if it overflows a u64.
    pub fn total(&self) -> Option<u64> {
        self.freqs
            .values()
            .try_fold(0_u64, |sum, &f| sum.checked_add(f))
    }

    /// (symbol, count) pairs in ascending symbol order.
    pub fn entries_sorted_by_symbol(&self) -> Vec<(u64, u64)> {
        let mut entries: Vec<(u64, u64)> = self.freqs.iter().map(|(&s, &f)| (s, f)).collect();
        entries.sort_unstable();
        entries
    }

    /// (symbol, count) pairs by ascending count, ties by ascending symbol.
    pub fn entries_sorted_by_frequency(&self) -> Vec<(u64, u64)> {
        let mut entries = self.entries_sorted_by_symbol();
        entries.sort_by(|a, b| a.1.cmp(&b.1).then(a.0.cmp(&b.0)));
        entries
    }
}
