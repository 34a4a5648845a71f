use std::fs::{self, File};
use std::io::{self, BufReader, Cursor, Read, Write};
use std::path::Path;

use log::{debug, info, trace, warn};

use super::coder::Coder;
use crate::bitstream::bitreader::low_mask;
use crate::bitstream::{BitCursor, BitPacker, BitReader, BitSink, BitSource, BitWriter};
use crate::error::{HuffError, Result};
use crate::huffman_coding::table_codec::{
    locate_table, parse_table_body, read_table_from, TABLE_MAGIC,
};

/// Reader that keeps a copy of every byte it hands out, so a failed table probe can be replayed.
struct Recorder<'a, R> {
    inner: &'a mut R,
    seen: Vec<u8>,
}

impl<R: Read> Read for Recorder<'_, R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.seen.extend_from_slice(&buf[..n]);
        Ok(n)
    }
}

impl Coder {
    /// Decompress a buffer starting at start_offset. A table sitting exactly at start_offset is skipped
    /// if it describes our code; anything else there is taken as payload.
    ///
    /// Output is only cut back to a source size carried by such a table. Without one, a zero-extended
    /// last symbol comes out at full width; use `decode_sized` to pass the size along.
    pub fn decode(&self, source: &[u8], start_offset: usize) -> Result<Vec<u8>> {
        self.decode_sized(source, start_offset, None)
    }

    /// Same as `decode`, trimming to source_size bytes when no embedded table says otherwise.
    pub fn decode_sized(
        &self,
        source: &[u8],
        start_offset: usize,
        source_size: Option<u64>,
    ) -> Result<Vec<u8>> {
        if start_offset > source.len() {
            return Err(HuffError::unsupported(format!(
                "start offset {} is past the end of a {} byte input",
                start_offset,
                source.len()
            )));
        }
        let (payload, declared) = self.skip_table(source, start_offset);
        self.decode_payload(source, payload, declared.or(source_size))
    }

    /// Decode the payload that begins at byte payload_start.
    pub(crate) fn decode_payload(
        &self,
        source: &[u8],
        payload_start: usize,
        declared: Option<u64>,
    ) -> Result<Vec<u8>> {
        let mut cursor = BitCursor::at(source, payload_start);
        let mut bp = BitPacker::new(source.len().saturating_sub(payload_start) * 2 + 16);
        let symbols = self.decode_symbols(&mut cursor, &mut bp, declared)?;
        let out = bp.finish();
        info!(
            "Decoded {} symbols from {} into {} bytes",
            symbols,
            cursor.loc(),
            out.len()
        );
        Ok(out)
    }

    /// Where the payload starts, and the size to trim the output to.
    fn skip_table(&self, source: &[u8], start: usize) -> (usize, Option<u64>) {
        if source[start..].starts_with(&TABLE_MAGIC) {
            match locate_table(source, start) {
                Ok(loc) if loc.start == start && self.same_code(&loc.table) => {
                    debug!("Skipping embedded table at {}..{}", loc.start, loc.end);
                    return (loc.end, loc.table.declared_size());
                }
                _ => trace!("Bytes at {} are not our table, decoding them as payload", start),
            }
        }
        (start, None)
    }

    /// Decompress from any reader to any writer, skipping a matching table at the front.
    pub fn decode_stream<R: Read, W: Write>(&self, mut source: R, sink: W) -> Result<W> {
        let (replay, declared) = self.probe_table(&mut source)?;
        self.decode_payload_stream(Cursor::new(replay).chain(source), sink, declared)
    }

    pub(crate) fn decode_payload_stream<R: Read, W: Write>(
        &self,
        source: R,
        sink: W,
        declared: Option<u64>,
    ) -> Result<W> {
        let mut br = BitReader::new(source);
        let mut bw = BitWriter::new(sink);
        let symbols = self.decode_symbols(&mut br, &mut bw, declared)?;
        debug!(
            "Streamed {} symbols from {} into {}",
            symbols,
            br.loc(),
            bw.loc()
        );
        bw.finish()
    }

    /// Try to read our table off the front of reader. Returns the bytes that must be decoded again
    /// (empty if a matching table was consumed) and the size to trim to.
    fn probe_table<R: Read>(&self, reader: &mut R) -> Result<(Vec<u8>, Option<u64>)> {
        let mut tee = Recorder {
            inner: reader,
            seen: Vec::new(),
        };
        let mut magic = Vec::with_capacity(TABLE_MAGIC.len());
        (&mut tee).take(TABLE_MAGIC.len() as u64).read_to_end(&mut magic)?;
        if magic == TABLE_MAGIC {
            match parse_table_body(&mut tee) {
                Ok(found) if self.same_code(&found) => {
                    debug!("Skipping embedded table of {} bytes", tee.seen.len());
                    return Ok((Vec::new(), found.declared_size()));
                }
                Ok(_) | Err(HuffError::MalformedTable(_)) => {
                    trace!("Stream does not open with our table, decoding it as payload")
                }
                Err(e) => return Err(e),
            }
        }
        Ok((tee.seen, None))
    }

    /// Decompress the file at input, from start_offset on, into a new file at output.
    /// Returns the decompressed size. A partial output file is removed if decoding fails.
    pub fn decode_streaming<P: AsRef<Path>, Q: AsRef<Path>>(
        &self,
        input: P,
        output: Q,
        start_offset: u64,
    ) -> Result<u64> {
        let mut reader = BufReader::new(File::open(input.as_ref())?);
        skip_bytes(&mut reader, start_offset)?;
        let fout = File::create(output.as_ref())?;
        finish_output(
            self.decode_stream(reader, fout),
            input.as_ref(),
            output.as_ref(),
        )
    }

    /// Walk the tree one bit at a time, writing each symbol as its leaf is reached.
    ///
    /// Decoding stops at the EOF code or when the source runs out. Running out part way down the tree
    /// is only accepted when fewer than 8 bits, all zero, are pending: that is byte padding. The last
    /// symbol is held back so that, when the source length was not a multiple of the symbol width, its
    /// zero extension can be cut off to match the declared size.
    pub fn decode_symbols<S: BitSource, K: BitSink>(
        &self,
        source: &mut S,
        sink: &mut K,
        declared: Option<u64>,
    ) -> Result<u64> {
        let width = self.symbol_width();
        let root = self.tree.root();
        let mut node = root;
        let mut path_len = 0_u32;
        let mut path_ones = false;
        let mut pending: Option<u64> = None;
        let mut emitted_bits = 0_u64;
        let mut symbols = 0_u64;
        let mut reached_eof = false;

        while let Some(bit) = source.read_bit()? {
            node = self.tree.step(node, bit)?;
            path_len += 1;
            path_ones |= bit;
            if let Some((symbol, eof)) = self.tree.leaf(node) {
                if eof {
                    reached_eof = true;
                    break;
                }
                if let Some(prev) = pending.replace(symbol) {
                    sink.write_bits(prev, width)?;
                    emitted_bits += width as u64;
                }
                symbols += 1;
                node = root;
                path_len = 0;
                path_ones = false;
            }
        }

        if !reached_eof {
            if node != root {
                if path_len < 8 && !path_ones {
                    warn!("Discarding {} trailing zero bits with no EOF code", path_len);
                } else {
                    return Err(HuffError::TruncatedInput {
                        bits_read: source.bits_read(),
                    });
                }
            }
            debug!("Input ended without an EOF code after {} symbols", symbols);
        }

        if let Some(last) = pending {
            let keep = match declared.and_then(|d| d.checked_mul(8)) {
                Some(limit) if limit > emitted_bits && limit - emitted_bits < width as u64 => {
                    let keep = (limit - emitted_bits) as u32;
                    if last & low_mask(width - keep) == 0 {
                        keep
                    } else {
                        width
                    }
                }
                _ => width,
            };
            if keep < width {
                trace!("Cutting {} bits of zero extension off the last symbol", width - keep);
            }
            sink.write_bits(last >> (width - keep), keep)?;
        }
        sink.flush_padding()?;
        Ok(symbols)
    }
}

/// Read past count bytes of reader. Fails if the stream is shorter than that.
fn skip_bytes<R: Read>(reader: &mut R, count: u64) -> Result<()> {
    let skipped = io::copy(&mut reader.take(count), &mut io::sink())?;
    if skipped < count {
        return Err(HuffError::unsupported(format!(
            "start offset {} is past the end of a {} byte input",
            count, skipped
        )));
    }
    Ok(())
}

fn finish_output(result: Result<File>, input: &Path, output: &Path) -> Result<u64> {
    match result.and_then(|f| Ok(f.metadata()?.len())) {
        Ok(written) => {
            info!(
                "Decoded {} into {} ({} bytes)",
                input.display(),
                output.display(),
                written
            );
            Ok(written)
        }
        Err(e) => {
            warn!("Removing partial output {}: {}", output.display(), e);
            let _ = fs::remove_file(output);
            Err(e)
        }
    }
}

/// Self-describing decode: find the first table at or after search_from and decode what follows it.
pub fn decompress(data: &[u8], search_from: usize) -> Result<Vec<u8>> {
    let loc = locate_table(data, search_from)?;
    debug!("Found table at {}..{}", loc.start, loc.end);
    let declared = loc.table.declared_size();
    let coder = Coder::new(loc.table)?;
    coder.decode_payload(data, loc.end, declared)
}

/// Streaming counterpart of `decompress`. Returns the decompressed size.
pub fn decompress_streaming<P: AsRef<Path>, Q: AsRef<Path>>(
    input: P,
    output: Q,
    search_from: u64,
) -> Result<u64> {
    let mut reader = BufReader::new(File::open(input.as_ref())?);
    skip_bytes(&mut reader, search_from)?;
    let found = read_table_from(&mut reader)?;
    debug!("Found table {} bytes past {}", found.skipped, search_from);
    let declared = found.table.declared_size();
    let coder = Coder::new(found.table)?;
    let fout = File::create(output.as_ref())?;
    finish_output(
        coder.decode_payload_stream(Cursor::new(found.leftover).chain(reader), fout, declared),
        input.as_ref(),
        output.as_ref(),
    )
}
