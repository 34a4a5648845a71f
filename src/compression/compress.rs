use std::fs::{self, File};
use std::io::{BufReader, Read, Write};
use std::path::Path;

use log::{debug, info, warn};

use super::coder::Coder;
use crate::bitstream::{BitCursor, BitPacker, BitReader, BitSink, BitSource, BitWriter};
use crate::error::{HuffError, Result};
use crate::huffman_coding::table_codec::serialize_table;
use crate::tools::freq_count::{build_frequency_table, build_frequency_table_from_reader};

impl Coder {
    /// Compress a whole buffer. Output is the optional header, the optional table, then the payload.
    pub fn encode(
        &self,
        source: &[u8],
        include_table: bool,
        header: Option<&[u8]>,
    ) -> Result<Vec<u8>> {
        let mut bp = BitPacker::new(source.len() / 2 + 64);
        self.write_preamble(&mut bp, source.len() as u64, include_table, header)?;
        let symbols = self.encode_symbols(&mut BitCursor::new(source), &mut bp)?;
        let out = bp.finish();
        info!(
            "Encoded {} bytes ({} symbols) into {} bytes",
            source.len(),
            symbols,
            out.len()
        );
        Ok(out)
    }

    /// Compress from any reader to any writer. source_len is only used as the declared size of an
    /// included table. Returns the writer once everything is flushed.
    pub fn encode_stream<R: Read, W: Write>(
        &self,
        source: R,
        sink: W,
        source_len: u64,
        include_table: bool,
        header: Option<&[u8]>,
    ) -> Result<W> {
        let mut bw = BitWriter::new(sink);
        self.write_preamble(&mut bw, source_len, include_table, header)?;
        let symbols = self.encode_symbols(&mut BitReader::new(source), &mut bw)?;
        debug!("Streamed {} symbols, output at {}", symbols, bw.loc());
        bw.finish()
    }

    /// Compress the file at input into a new file at output without holding either in memory.
    /// Returns the compressed size. A partial output file is removed if encoding fails.
    pub fn encode_streaming<P: AsRef<Path>, Q: AsRef<Path>>(
        &self,
        input: P,
        output: Q,
        include_table: bool,
        header: Option<&[u8]>,
    ) -> Result<u64> {
        let fin = File::open(input.as_ref())?;
        let source_len = fin.metadata()?.len();
        let fout = File::create(output.as_ref())?;
        let result = self
            .encode_stream(BufReader::new(fin), fout, source_len, include_table, header)
            .and_then(|f| Ok(f.metadata()?.len()));
        match result {
            Ok(written) => {
                info!(
                    "Encoded {} ({} bytes) into {} ({} bytes)",
                    input.as_ref().display(),
                    source_len,
                    output.as_ref().display(),
                    written
                );
                Ok(written)
            }
            Err(e) => {
                warn!(
                    "Removing partial output {}: {}",
                    output.as_ref().display(),
                    e
                );
                let _ = fs::remove_file(output.as_ref());
                Err(e)
            }
        }
    }

    /// Header bytes and the serialized table, both byte aligned at the front of the output.
    fn write_preamble<K: BitSink>(
        &self,
        sink: &mut K,
        source_len: u64,
        include_table: bool,
        header: Option<&[u8]>,
    ) -> Result<()> {
        if let Some(header) = header {
            sink.write_bytes(header)?;
        }
        if include_table {
            let mut table = self.table.clone();
            table.set_declared_size(source_len);
            sink.write_bytes(&serialize_table(&table, true)?)?;
        }
        Ok(())
    }

    /// Write the code of every symbol in source, then the EOF code, then pad to a byte.
    /// Stops at the first symbol the tree has no code for.
    pub fn encode_symbols<S: BitSource, K: BitSink>(
        &self,
        source: &mut S,
        sink: &mut K,
    ) -> Result<u64> {
        let width = self.symbol_width();
        let mut symbols = 0_u64;
        while let Some(symbol) = source.read_padded(width)? {
            let code = self
                .tree
                .code(symbol)
                .ok_or(HuffError::IncompatibleTable { symbol })?;
            sink.write_code(code.bits, code.len)?;
            symbols += 1;
        }
        let eof = self.tree.eof_code();
        sink.write_code(eof.bits, eof.len)?;
        sink.flush_padding()?;
        Ok(symbols)
    }
}

/// Count, build and encode in one go: the self-describing whole-buffer path.
pub fn compress(
    data: &[u8],
    symbol_width: u32,
    include_table: bool,
    header: Option<&[u8]>,
) -> Result<Vec<u8>> {
    let coder = Coder::new(build_frequency_table(data, symbol_width)?)?;
    coder.encode(data, include_table, header)
}

/// Two passes over the file at input: one to count, one to encode into output.
pub fn compress_streaming<P: AsRef<Path>, Q: AsRef<Path>>(
    input: P,
    output: Q,
    symbol_width: u32,
    include_table: bool,
    header: Option<&[u8]>,
) -> Result<u64> {
    let fin = BufReader::new(File::open(input.as_ref())?);
    let coder = Coder::new(build_frequency_table_from_reader(fin, symbol_width)?)?;
    coder.encode_streaming(input, output, include_table, header)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::huffman_coding::freq_table::FrequencyTable;
    use crate::huffman_coding::table_codec::read_table;

    #[test]
    fn worked_example_test() {
        let data = [0x41, 0x41, 0x41, 0x42];
        let coder = Coder::new(build_frequency_table(&data, 8).unwrap()).unwrap();
        // 0 0 0 10 11, padded with one zero
        assert_eq!(coder.encode(&data, false, None).unwrap(), vec![0b0001_0110]);
    }

    #[test]
    fn preamble_test() {
        let data = [0x41, 0x41, 0x41, 0x42];
        let coder = Coder::new(build_frequency_table(&data, 8).unwrap()).unwrap();
        let out = coder.encode(&data, true, Some(b"HDR:")).unwrap();
        assert_eq!(&out[..4], b"HDR:");
        let table = read_table(&out, 0).unwrap();
        assert_eq!(&table, coder.table());
        assert_eq!(out.last(), Some(&0b0001_0110));
    }

    #[test]
    fn declared_size_follows_source_test() {
        let mut t = FrequencyTable::new(8).unwrap();
        t.set_frequency(7, 1).unwrap();
        let coder = Coder::new(t).unwrap();
        let out = coder.encode(&[7, 7, 7], true, None).unwrap();
        assert_eq!(read_table(&out, 0).unwrap().declared_size(), Some(3));
    }

    #[test]
    fn incompatible_table_test() {
        let coder = Coder::new(build_frequency_table(b"aaab", 8).unwrap()).unwrap();
        let result = coder.encode(b"aaabc", true, None);
        assert!(matches!(
            result,
            Err(HuffError::IncompatibleTable { symbol: 0x63 })
        ));
    }

    #[test]
    fn stream_matches_buffer_test() {
        let data: Vec<u8> = (0..10_000_u32).map(|i| (i * 7 % 13) as u8).collect();
        for width in [1, 4, 8, 12, 16, 32] {
            let coder = Coder::new(build_frequency_table(&data, width).unwrap()).unwrap();
            let buffered = coder.encode(&data, true, Some(b"x")).unwrap();
            let streamed = coder
                .encode_stream(data.as_slice(), Vec::new(), data.len() as u64, true, Some(b"x"))
                .unwrap();
            assert_eq!(buffered, streamed, "width {}", width);
        }
    }

    #[test]
    fn deterministic_test() {
        let data = b"the quick brown fox jumps over the lazy dog".repeat(20);
        let a = compress(&data, 8, true, None).unwrap();
        let b = compress(&data, 8, true, None).unwrap();
        assert_eq!(a, b);
        assert!(a.len() < data.len());
    }

    #[test]
    fn empty_source_test() {
        let mut t = FrequencyTable::new(8).unwrap();
        t.set_frequency(1, 1).unwrap();
        let coder = Coder::new(t).unwrap();
        // Nothing but the EOF code "1", padded
        assert_eq!(coder.encode(&[], false, None).unwrap(), vec![0b1000_0000]);
    }
}
