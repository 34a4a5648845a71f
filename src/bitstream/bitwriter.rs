//! Write side of the bit cursor.
//!
//! `BitPacker` packs bits into an in-memory buffer. `BitWriter` wraps a `BitPacker` and drains it to any
//! `std::io::Write` sink whenever the buffer fills, so arbitrarily large outputs use bounded memory.
//! Both emit bits MSB-first and zero-pad the final partial byte on `flush_padding`.

use super::bitreader::{check_count, low_mask};
use crate::error::Result;

/// Bytes held by a BitWriter before they are pushed to the sink.
const BUFFER_SIZE: usize = 64 * 1024;

/// Anything we can push bits into, MSB-first.
pub trait BitSink {
    /// Write the low n (1..=64) bits of value.
    fn write_bits(&mut self, value: u64, n: u32) -> Result<()>;

    /// Zero-pad the final partial byte (if any) and emit it.
    fn flush_padding(&mut self) -> Result<()>;

    /// Total bits written so far, padding included.
    fn bits_written(&self) -> u64;

    /// Write a whole run of bytes. Mostly used for headers while still byte aligned.
    fn write_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        for &byte in bytes {
            self.write_bits(byte as u64, 8)?;
        }
        Ok(())
    }

    /// Write a code of up to 128 bits, most significant bit first.
    fn write_code(&mut self, bits: u128, len: u32) -> Result<()> {
        if len > 64 {
            self.write_bits((bits >> 64) as u64, len - 64)?;
            self.write_bits(bits as u64, 64)
        } else if len > 0 {
            self.write_bits(bits as u64, len)
        } else {
            Ok(())
        }
    }
}

/// Creates a bitstream in memory.
#[derive(Debug, Default)]
pub struct BitPacker {
    pub output: Vec<u8>,
    queue: u128,
    /// Count of valid bits at the bottom of the queue. Always below 8 between calls.
    q_bits: u32,
}

impl BitPacker {
    /// Create a new BitPacker with an output buffer of the size specified.
    pub fn new(size: usize) -> Self {
        Self {
            output: Vec::with_capacity(size),
            queue: 0,
            q_bits: 0,
        }
    }

    /// Push all complete bytes from the queue to the output.
    fn write_stream(&mut self) {
        while self.q_bits > 7 {
            let byte = (self.queue >> (self.q_bits - 8)) as u8;
            self.output.push(byte);
            self.q_bits -= 8;
        }
    }

    /// Flush padding and hand back the packed bytes.
    pub fn finish(mut self) -> Vec<u8> {
        self.pad();
        self.output
    }

    fn pad(&mut self) {
        if self.q_bits > 0 {
            let byte = (self.queue << (8 - self.q_bits)) as u8;
            self.output.push(byte);
            self.q_bits = 0;
        }
    }

    /// Debugging function to return the number of bytes.bits output so far
    pub fn loc(&self) -> String {
        format!("[{}.{}]", self.output.len(), self.q_bits)
    }
}

impl BitSink for BitPacker {
    fn write_bits(&mut self, value: u64, n: u32) -> Result<()> {
        check_count(n)?;
        self.queue = (self.queue << n) | (value & low_mask(n)) as u128;
        self.q_bits += n;
        self.write_stream();
        Ok(())
    }

    fn flush_padding(&mut self) -> Result<()> {
        self.pad();
        Ok(())
    }

    fn bits_written(&self) -> u64 {
        self.output.len() as u64 * 8 + self.q_bits as u64
    }
}

/// Writes a bitstream to a sequential sink.
#[derive(Debug)]
pub struct BitWriter<W: std::io::Write> {
    packer: BitPacker,
    writer: W,
    /// Bytes already handed to the writer.
    drained: u64,
}

impl<W: std::io::Write> BitWriter<W> {
    pub fn new(writer: W) -> Self {
        Self {
            packer: BitPacker::new(BUFFER_SIZE),
            writer,
            drained: 0,
        }
    }

    /// Push whatever full bytes we hold out to the writer.
    fn drain(&mut self) -> Result<()> {
        if !self.packer.output.is_empty() {
            self.writer.write_all(&self.packer.output)?;
            self.drained += self.packer.output.len() as u64;
            self.packer.output.clear();
        }
        Ok(())
    }

    /// Pad, write out everything that is left and return the sink.
    pub fn finish(mut self) -> Result<W> {
        self.packer.pad();
        self.drain()?;
        self.writer.flush()?;
        Ok(self.writer)
    }

    /// Debugging function to return the number of bytes.bits output so far
    pub fn loc(&self) -> String {
        let bits = self.bits_written();
        format!("[{}.{}]", bits / 8, bits % 8)
    }
}

impl<W: std::io::Write> BitSink for BitWriter<W> {
    fn write_bits(&mut self, value: u64, n: u32) -> Result<()> {
        self.packer.write_bits(value, n)?;
        if self.packer.output.len() >= BUFFER_SIZE {
            self.drain()?;
        }
        Ok(())
    }

    fn flush_padding(&mut self) -> Result<()> {
        self.packer.pad();
        self.drain()
    }

    fn bits_written(&self) -> u64 {
        self.drained * 8 + self.packer.bits_written()
    }
}

#[cfg(test)]
mod test {
    use super::{BitPacker, BitSink, BitWriter};

    #[test]
    fn write_bytes_test() {
        let mut bw = BitPacker::new(100);
        bw.write_bytes("! ".as_bytes()).unwrap();
        assert_eq!(bw.finish(), "! ".as_bytes());
    }

    #[test]
    fn odd_bits_and_loc_test() {
        let mut bw = BitPacker::new(100);
        bw.write_bits(0b0010_0001, 8).unwrap();
        assert_eq!("[1.0]", &bw.loc());
        bw.write_bits(0b11, 2).unwrap();
        assert_eq!("[1.2]", &bw.loc());
        bw.write_bits(0b1, 1).unwrap();
        bw.flush_padding().unwrap();
        assert_eq!(bw.output, vec![33, 0b1110_0000]);
        assert_eq!(bw.bits_written(), 16);
    }

    #[test]
    fn wide_write_test() {
        let mut bw = BitPacker::new(100);
        bw.write_bits(0b101, 3).unwrap();
        bw.write_bits(u64::MAX, 64).unwrap();
        bw.write_bits(0, 5).unwrap();
        let out = bw.finish();
        assert_eq!(out.len(), 9);
        assert_eq!(out[0], 0b1011_1111);
        assert_eq!(out[8], 0b1110_0000);
        assert!(out[1..8].iter().all(|&b| b == 0xff));
    }

    #[test]
    fn masks_high_bits_test() {
        let mut bw = BitPacker::new(10);
        // Only the low 4 bits may land on the stream
        bw.write_bits(0xFFF5, 4).unwrap();
        bw.write_bits(0xA, 4).unwrap();
        assert_eq!(bw.finish(), vec![0x5A]);
    }

    #[test]
    fn long_code_test() {
        let mut bw = BitPacker::new(20);
        let code: u128 = (1 << 69) | 1;
        bw.write_code(code, 70).unwrap();
        let out = bw.finish();
        assert_eq!(out.len(), 9);
        assert_eq!(out[0], 0b1000_0000);
        assert_eq!(out[8], 0b0000_0100);
    }

    #[test]
    fn writer_matches_packer_test() {
        let mut packer = BitPacker::new(10);
        let mut writer = BitWriter::new(Vec::new());
        for i in 0..100_000_u64 {
            let n = (i % 13) as u32 + 1;
            packer.write_bits(i, n).unwrap();
            writer.write_bits(i, n).unwrap();
        }
        assert_eq!(packer.bits_written(), writer.bits_written());
        let streamed = writer.finish().unwrap();
        assert_eq!(packer.finish(), streamed);
    }
}
