//! Binary layout of a serialized frequency table.
//!
//! Only the table is stored, never the tree: the decoder rebuilds the identical tree from it.
//!
//! ```text
//! offset 0   4 bytes  magic "HUFT"
//! offset 4   1 byte   has_size: 0 (no declared size), 4 or 8 (width of the size field)
//! offset 5   1 byte   symbol width in bits (1..=64)
//! offset 6   1 byte   frequency field width in bits (8, 16, 32 or 64)
//! offset 7   1 byte   reserved (0)
//! offset 8   4 bytes  entry count
//! offset 12  4/8      declared source size, present iff has_size != 0
//! then       entry count records of (symbol: ceil(width/8) bytes, frequency: freq_bits/8 bytes)
//! ```
//!
//! All multi-byte fields are little-endian. Records are written in ascending symbol order, only for symbols
//! with a count above zero.

use std::collections::VecDeque;
use std::io::{self, Read};

use log::{debug, trace};
use rustc_hash::FxHashSet;

use super::freq_table::{FrequencyTable, MAX_SYMBOL_WIDTH};
use crate::error::{HuffError, Result};

/// Signature in front of every serialized table.
pub const TABLE_MAGIC: [u8; 4] = *b"HUFT";
/// Bytes before the optional size field.
pub const FIXED_HEADER_LEN: usize = 12;

/// Where a table was found inside a larger buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableLocation {
    pub table: FrequencyTable,
    /// Offset of the magic.
    pub start: usize,
    /// Offset of the first byte after the last record.
    pub end: usize,
}

/// Bytes needed to hold one symbol of the given width.
pub fn symbol_bytes(symbol_width: u32) -> usize {
    ((symbol_width + 7) / 8) as usize
}

/// Smallest of 8/16/32/64 bits that can hold every count up to max.
pub fn freq_record_bits(max_frequency: u64) -> u8 {
    match max_frequency {
        0..=0xff => 8,
        0x100..=0xffff => 16,
        0x1_0000..=0xffff_ffff => 32,
        _ => 64,
    }
}

/// Serialize a table. The declared size is written only when asked for and known.
pub fn serialize_table(table: &FrequencyTable, include_size: bool) -> Result<Vec<u8>> {
    let entries = table.entries_sorted_by_symbol();
    let count = u32::try_from(entries.len()).map_err(|_| {
        HuffError::unsupported(format!("{} table entries do not fit the format", entries.len()))
    })?;
    let sym_bytes = symbol_bytes(table.symbol_width());
    let freq_bits = freq_record_bits(table.max_frequency());
    let freq_bytes = freq_bits as usize / 8;

    let size = if include_size { table.declared_size() } else { None };
    let has_size: u8 = match size {
        None => 0,
        Some(s) if s <= u32::MAX as u64 => 4,
        Some(_) => 8,
    };

    let mut out = Vec::with_capacity(
        FIXED_HEADER_LEN + has_size as usize + entries.len() * (sym_bytes + freq_bytes),
    );
    out.extend_from_slice(&TABLE_MAGIC);
    out.push(has_size);
    out.push(table.symbol_width() as u8);
    out.push(freq_bits);
    out.push(0);
    out.extend_from_slice(&count.to_le_bytes());
    if let Some(s) = size {
        out.extend_from_slice(&s.to_le_bytes()[..has_size as usize]);
    }
    for (symbol, freq) in entries {
        out.extend_from_slice(&symbol.to_le_bytes()[..sym_bytes]);
        out.extend_from_slice(&freq.to_le_bytes()[..freq_bytes]);
    }
    debug!(
        "Serialized table: width {}, {} entries, {} bit counts, size field {} bytes, {} bytes total",
        table.symbol_width(),
        count,
        freq_bits,
        has_size,
        out.len()
    );
    Ok(out)
}

/// Find the first table at or after search_from and parse it.
pub fn read_table(buffer: &[u8], search_from: usize) -> Result<FrequencyTable> {
    locate_table(buffer, search_from).map(|loc| loc.table)
}

/// Find the first table at or after search_from, parse it and report where it sits.
///
/// A signature that does not open a valid table (say, inside caller header bytes) is passed over and the
/// scan carries on one byte later.
pub fn locate_table(buffer: &[u8], search_from: usize) -> Result<TableLocation> {
    let mut from = search_from;
    let mut last_err = None;
    while let Some(start) = find_magic(buffer, from) {
        trace!("Found table signature at offset {}", start);
        let mut rest = &buffer[start + TABLE_MAGIC.len()..];
        match parse_table_body(&mut rest) {
            Ok(table) => {
                let end = buffer.len() - rest.len();
                return Ok(TableLocation { table, start, end });
            }
            Err(HuffError::MalformedTable(why)) => {
                debug!("No table at offset {}: {}", start, why);
                last_err = Some(HuffError::MalformedTable(why));
                from = start + 1;
            }
            Err(e) => return Err(e),
        }
    }
    Err(last_err.unwrap_or_else(|| {
        HuffError::malformed(format!("no table signature at or after offset {}", search_from))
    }))
}

/// Forward scan for the magic.
fn find_magic(buffer: &[u8], search_from: usize) -> Option<usize> {
    if search_from >= buffer.len() {
        return None;
    }
    buffer[search_from..]
        .windows(TABLE_MAGIC.len())
        .position(|w| w == TABLE_MAGIC)
        .map(|p| p + search_from)
}

/// A table pulled off a stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamTable {
    pub table: FrequencyTable,
    /// Bytes passed over before the magic.
    pub skipped: u64,
    /// Bytes after the table that were already taken from the stream. They come before whatever the
    /// stream still holds.
    pub leftover: Vec<u8>,
}

/// Byte source for the stream scan: bytes given back by a failed parse first, then the stream itself.
/// Everything handed out is recorded so a failed parse can give it back.
struct Rescan<'a, R> {
    inner: &'a mut R,
    replay: VecDeque<u8>,
    record: Vec<u8>,
}

impl<R: Read> Read for Rescan<'_, R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = if self.replay.is_empty() {
            self.inner.read(buf)?
        } else {
            let n = buf.len().min(self.replay.len());
            for (slot, byte) in buf.iter_mut().zip(self.replay.drain(..n)) {
                *slot = byte;
            }
            n
        };
        self.record.extend_from_slice(&buf[..n]);
        Ok(n)
    }
}

/// Scan a stream for the first valid table. Signatures that do not open a valid table are passed over
/// just as `locate_table` does. The stream is read no further than the end of the table, apart from bytes
/// returned in `leftover`.
pub fn read_table_from<R: Read>(reader: &mut R) -> Result<StreamTable> {
    let mut scan = Rescan {
        inner: reader,
        replay: VecDeque::new(),
        record: Vec::new(),
    };
    let mut window = [0_u8; 4];
    let mut filled = 0_usize;
    // Offset in the stream of the next byte scanned
    let mut pos = 0_u64;
    let mut byte = [0_u8; 1];
    let mut last_err = None;
    loop {
        if filled >= 4 && window == TABLE_MAGIC {
            let start = pos - 4;
            scan.record.clear();
            match parse_table_body(&mut scan) {
                Ok(table) => {
                    return Ok(StreamTable {
                        table,
                        skipped: start,
                        leftover: scan.replay.into_iter().collect(),
                    })
                }
                Err(HuffError::MalformedTable(why)) => {
                    debug!("No table at stream offset {}: {}", start, why);
                    last_err = Some(HuffError::MalformedTable(why));
                    // Rescan from the byte after the false signature
                    let mut back: VecDeque<u8> = TABLE_MAGIC[1..].iter().copied().collect();
                    back.extend(scan.record.drain(..));
                    back.extend(scan.replay.drain(..));
                    scan.replay = back;
                    pos = start + 1;
                    filled = 0;
                }
                Err(e) => return Err(e),
            }
        }
        match scan.read(&mut byte) {
            Ok(0) => {
                return Err(last_err.unwrap_or_else(|| {
                    HuffError::malformed(format!("no table signature in {} bytes", pos))
                }))
            }
            Ok(_) => {
                window.rotate_left(1);
                window[3] = byte[0];
                filled += 1;
                pos += 1;
                scan.record.clear();
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }
}

/// Parse everything after the magic.
pub fn parse_table_body<R: Read>(reader: &mut R) -> Result<FrequencyTable> {
    let mut head = [0_u8; FIXED_HEADER_LEN - 4];
    read_field(reader, &mut head)?;
    let (has_size, width, freq_bits) = (head[0], head[1] as u32, head[2]);
    let count = u32::from_le_bytes([head[4], head[5], head[6], head[7]]);

    if width == 0 || width > MAX_SYMBOL_WIDTH {
        return Err(HuffError::malformed(format!(
            "symbol width {} is outside 1..={}",
            width, MAX_SYMBOL_WIDTH
        )));
    }
    if !matches!(freq_bits, 8 | 16 | 32 | 64) {
        return Err(HuffError::malformed(format!(
            "frequency field width {} is not 8, 16, 32 or 64",
            freq_bits
        )));
    }
    let mut table = FrequencyTable::new(width)?;
    match has_size {
        0 => {}
        4 | 8 => {
            let size = read_le(reader, has_size as usize)?;
            table.set_declared_size(size);
        }
        other => {
            return Err(HuffError::malformed(format!(
                "size field width {} is neither 4 nor 8",
                other
            )))
        }
    }

    let sym_bytes = symbol_bytes(width);
    let freq_bytes = freq_bits as usize / 8;
    let mut seen = FxHashSet::default();
    for i in 0..count {
        let symbol = read_le(reader, sym_bytes)?;
        let freq = read_le(reader, freq_bytes)?;
        if freq == 0 {
            return Err(HuffError::malformed(format!("record {} has a zero count", i)));
        }
        if !seen.insert(symbol) {
            return Err(HuffError::malformed(format!(
                "symbol 0x{:x} appears twice",
                symbol
            )));
        }
        table.set_frequency(symbol, freq).map_err(|_| {
            HuffError::malformed(format!("symbol 0x{:x} is wider than {} bits", symbol, width))
        })?;
    }
    debug!(
        "Parsed table: width {}, {} entries, declared size {:?}",
        width,
        count,
        table.declared_size()
    );
    Ok(table)
}

fn read_field<R: Read>(reader: &mut R, buf: &mut [u8]) -> Result<()> {
    reader.read_exact(buf).map_err(|e| match e.kind() {
        io::ErrorKind::UnexpectedEof => HuffError::malformed("table is truncated"),
        _ => HuffError::Io(e),
    })
}

/// Read an n byte (n <= 8) little-endian unsigned value.
fn read_le<R: Read>(reader: &mut R, n: usize) -> Result<u64> {
    let mut buf = [0_u8; 8];
    read_field(reader, &mut buf[..n])?;
    Ok(u64::from_le_bytes(buf))
}
