//! Read side of the bit cursor.
//!
//! Two readers share the `BitSource` contract:
//! - `BitCursor` walks an in-memory (or memory-mapped) byte slice with an explicit byte + bit offset.
//! - `BitReader` pulls from any forward-only `std::io::Read` source, loading bytes only as they are needed.
//!
//! Bits are consumed MSB-first within each byte. Both readers must return identical values for identical
//! input, since the coder is used interchangeably in whole-buffer and streaming modes.

use crate::error::{HuffError, Result};

/// Mask for the low n bits of a u64 (n in 1..=64).
#[inline(always)]
pub(crate) fn low_mask(n: u32) -> u64 {
    if n >= 64 {
        u64::MAX
    } else {
        (1_u64 << n) - 1
    }
}

/// Reject bit counts outside 1..=64.
#[inline(always)]
pub(crate) fn check_count(n: u32) -> Result<()> {
    if n == 0 || n > 64 {
        return Err(HuffError::unsupported(format!(
            "bit count {} is outside 1..=64",
            n
        )));
    }
    Ok(())
}

/// Anything we can pull bits from, MSB-first.
pub trait BitSource {
    /// Read n (1..=64) bits and return them right-aligned.
    fn read_bits(&mut self, n: u32) -> Result<u64>;

    /// Report how many bits (up to max) can still be read.
    fn available_bits(&mut self, max: u32) -> Result<u32>;

    /// Un-consume the last n bits.
    fn rewind(&mut self, n: u32) -> Result<()>;

    /// Total bits consumed so far.
    fn bits_read(&self) -> u64;

    /// True if at least n more bits can be read.
    fn has_more_bits(&mut self, n: u32) -> Result<bool> {
        Ok(self.available_bits(n)? >= n)
    }

    /// Returns the next bit, or None when the source is exhausted.
    fn read_bit(&mut self) -> Result<Option<bool>> {
        if !self.has_more_bits(1)? {
            return Ok(None);
        }
        Ok(Some(self.read_bits(1)? == 1))
    }

    /// Read an n bit symbol. A final short chunk is zero-extended on the right.
    /// Returns None only when nothing at all is left.
    fn read_padded(&mut self, n: u32) -> Result<Option<u64>> {
        check_count(n)?;
        let have = self.available_bits(n)?;
        if have == 0 {
            return Ok(None);
        }
        let value = self.read_bits(have)?;
        if have == n {
            Ok(Some(value))
        } else {
            Ok(Some(value << (n - have)))
        }
    }
}

/// Random access reader over a byte slice.
#[derive(Debug, Clone)]
pub struct BitCursor<'a> {
    data: &'a [u8],
    start: usize,
    byte_pos: usize,
    bit_offset: u32,
}

impl<'a> BitCursor<'a> {
    /// Creates a cursor at the beginning of the slice.
    pub fn new(data: &'a [u8]) -> Self {
        Self::at(data, 0)
    }

    /// Creates a cursor starting at a byte offset. Offsets past the end give an empty cursor.
    pub fn at(data: &'a [u8], byte_offset: usize) -> Self {
        let start = byte_offset.min(data.len());
        Self {
            data,
            start,
            byte_pos: start,
            bit_offset: 0,
        }
    }

    /// Current position as (byte, bit within byte).
    pub fn position(&self) -> (usize, u32) {
        (self.byte_pos, self.bit_offset)
    }

    /// Move to an absolute byte + bit position inside the slice, no earlier than where the cursor started.
    pub fn seek(&mut self, byte_pos: usize, bit_offset: u32) -> Result<()> {
        if bit_offset > 7
            || byte_pos < self.start
            || byte_pos > self.data.len()
            || (byte_pos == self.data.len() && bit_offset > 0)
        {
            return Err(HuffError::unsupported(format!(
                "cannot seek to [{}.{}] in {} bytes",
                byte_pos,
                bit_offset,
                self.data.len()
            )));
        }
        self.byte_pos = byte_pos;
        self.bit_offset = bit_offset;
        Ok(())
    }

    fn remaining(&self) -> u64 {
        ((self.data.len() - self.byte_pos) as u64 * 8).saturating_sub(self.bit_offset as u64)
    }

    /// Debugging function. Report current position in the buffer.
    pub fn loc(&self) -> String {
        format!("[{}.{}]", self.byte_pos, self.bit_offset)
    }
}

impl BitSource for BitCursor<'_> {
    fn read_bits(&mut self, n: u32) -> Result<u64> {
        check_count(n)?;
        if n as u64 > self.remaining() {
            return Err(HuffError::TruncatedInput {
                bits_read: self.bits_read(),
            });
        }
        let mut result = 0_u64;
        let mut needed = n;
        // First whatever is left of a partial byte, then whole bytes, then the head of the last byte.
        while needed > 0 {
            let left = 8 - self.bit_offset;
            let take = needed.min(left);
            let byte = self.data[self.byte_pos] as u64;
            let bits = (byte >> (left - take)) & low_mask(take);
            result = (result << take) | bits;
            self.bit_offset += take;
            if self.bit_offset == 8 {
                self.bit_offset = 0;
                self.byte_pos += 1;
            }
            needed -= take;
        }
        Ok(result)
    }

    fn available_bits(&mut self, max: u32) -> Result<u32> {
        Ok(self.remaining().min(max as u64) as u32)
    }

    fn rewind(&mut self, n: u32) -> Result<()> {
        if n as u64 > self.bits_read() {
            return Err(HuffError::unsupported(format!(
                "cannot rewind {} bits, only {} read",
                n,
                self.bits_read()
            )));
        }
        let pos = self.byte_pos as u64 * 8 + self.bit_offset as u64 - n as u64;
        self.byte_pos = (pos / 8) as usize;
        self.bit_offset = (pos % 8) as u32;
        Ok(())
    }

    fn bits_read(&self) -> u64 {
        (self.byte_pos - self.start) as u64 * 8 + self.bit_offset as u64
    }
}

/// Sequential reader over a forward-only byte stream.
///
/// Bytes are appended to a 128 bit window only when a read (or a look-ahead query) needs them.
/// Consumed bits stay in the window until they are shifted out, which is what makes `rewind` possible.
#[derive(Debug)]
pub struct BitReader<R> {
    source: R,
    window: u128,
    /// Count of unread bits at the bottom of the window.
    q_bits: u32,
    /// Total bits ever loaded from the source.
    loaded: u64,
    exhausted: bool,
}

impl<R: std::io::Read> BitReader<R> {
    pub fn new(source: R) -> Self {
        Self {
            source,
            window: 0,
            q_bits: 0,
            loaded: 0,
            exhausted: false,
        }
    }

    /// Load bytes until at least n unread bits are in the window, or the source runs dry.
    fn fill(&mut self, n: u32) -> Result<()> {
        let mut byte = [0_u8; 1];
        while self.q_bits < n && !self.exhausted {
            match self.source.read(&mut byte) {
                Ok(0) => self.exhausted = true,
                Ok(_) => {
                    self.window = (self.window << 8) | byte[0] as u128;
                    self.q_bits += 8;
                    self.loaded += 8;
                }
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }

    /// Debugging function. Report current position as [bytes.bits] consumed.
    pub fn loc(&self) -> String {
        let read = self.bits_read();
        format!("[{}.{}]", read / 8, read % 8)
    }

    /// Give back the underlying source. Bits already pulled into the window are lost.
    pub fn into_inner(self) -> R {
        self.source
    }
}

impl<R: std::io::Read> BitSource for BitReader<R> {
    fn read_bits(&mut self, n: u32) -> Result<u64> {
        check_count(n)?;
        self.fill(n)?;
        if self.q_bits < n {
            return Err(HuffError::TruncatedInput {
                bits_read: self.bits_read(),
            });
        }
        let value = (self.window >> (self.q_bits - n)) as u64 & low_mask(n);
        self.q_bits -= n;
        Ok(value)
    }

    fn available_bits(&mut self, max: u32) -> Result<u32> {
        self.fill(max)?;
        Ok(self.q_bits.min(max))
    }

    fn rewind(&mut self, n: u32) -> Result<()> {
        if n as u64 > self.bits_read() || self.q_bits + n > 128 {
            return Err(HuffError::unsupported(format!(
                "cannot rewind {} bits on a stream at {}",
                n,
                self.loc()
            )));
        }
        self.q_bits += n;
        Ok(())
    }

    fn bits_read(&self) -> u64 {
        self.loaded - self.q_bits as u64
    }
}
