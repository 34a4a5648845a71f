//! Build a frequency table by scanning a source once.

use std::io::Read;

use log::{debug, info};
use rayon::prelude::*;

use crate::bitstream::{BitCursor, BitReader, BitSource};
use crate::error::Result;
use crate::huffman_coding::freq_table::FrequencyTable;

/// Returns a byte frequency count of the input data. Uses parallelism when data set is over 64k.
pub fn freqs(data: &[u8]) -> Vec<u64> {
    if data.len() > 64_000 {
        // 16k is pretty much the sweet spot for chunk size.
        data.par_chunks(16_000)
            .fold(
                || vec![0_u64; 256],
                |mut freqs, chunk| {
                    chunk.iter().for_each(|&el| freqs[el as usize] += 1);
                    freqs
                },
            )
            .reduce(
                || vec![0_u64; 256],
                |s, f| s.iter().zip(&f).map(|(a, b)| a + b).collect::<Vec<u64>>(),
            )
    } else {
        let mut freqs = vec![0_u64; 256];
        data.iter().for_each(|&el| freqs[el as usize] += 1);
        freqs
    }
}

/// Count every symbol_width bit chunk of data. Widths 8 and 16 take a byte-aligned shortcut; everything
/// else walks a bit cursor. The declared size is set to the length of data.
pub fn build_frequency_table(data: &[u8], symbol_width: u32) -> Result<FrequencyTable> {
    let mut table = FrequencyTable::new(symbol_width)?;
    match symbol_width {
        8 => {
            for (symbol, &count) in freqs(data).iter().enumerate() {
                table.set_frequency(symbol as u64, count)?;
            }
        }
        16 => {
            let mut shorts = vec![0_u64; 1 << 16];
            // A lone trailing byte is a short symbol, zero-extended on the right
            data.chunks(2).for_each(|pair| {
                let symbol = match pair {
                    [hi, lo] => u16::from_be_bytes([*hi, *lo]),
                    [hi] => (*hi as u16) << 8,
                    _ => unreachable!("chunks(2) yields one or two bytes"),
                };
                shorts[symbol as usize] += 1;
            });
            for (symbol, &count) in shorts.iter().enumerate() {
                table.set_frequency(symbol as u64, count)?;
            }
        }
        _ => {
            count_symbols(&mut BitCursor::new(data), &mut table)?;
        }
    }
    table.set_declared_size(data.len() as u64);
    info!(
        "Counted {} bytes at {} bits: {} distinct symbols",
        data.len(),
        symbol_width,
        table.valid_entries()
    );
    Ok(table)
}

/// Same as build_frequency_table, reading a forward-only stream through the general bit path.
pub fn build_frequency_table_from_reader<R: Read>(
    source: R,
    symbol_width: u32,
) -> Result<FrequencyTable> {
    let mut table = FrequencyTable::new(symbol_width)?;
    let mut reader = BitReader::new(source);
    count_symbols(&mut reader, &mut table)?;
    let size = (reader.bits_read() + 7) / 8;
    table.set_declared_size(size);
    info!(
        "Counted {} streamed bytes at {} bits: {} distinct symbols",
        size,
        symbol_width,
        table.valid_entries()
    );
    Ok(table)
}

/// Add every symbol left in source to table. Returns how many symbols were counted.
pub fn count_symbols<S: BitSource>(source: &mut S, table: &mut FrequencyTable) -> Result<u64> {
    let width = table.symbol_width();
    let mut counted = 0_u64;
    while let Some(symbol) = source.read_padded(width)? {
        table.increment(symbol)?;
        counted += 1;
    }
    debug!("Counted {} symbols of {} bits", counted, width);
    Ok(counted)
}

#[cfg(test)]
mod test {
    use super::*;

    fn general_path(data: &[u8], width: u32) -> FrequencyTable {
        let mut table = FrequencyTable::new(width).unwrap();
        count_symbols(&mut BitCursor::new(data), &mut table).unwrap();
        table.set_declared_size(data.len() as u64);
        table
    }

    #[test]
    fn worked_example_test() {
        let t = build_frequency_table(&[0x41, 0x41, 0x41, 0x42], 8).unwrap();
        assert_eq!(t.entries_sorted_by_symbol(), vec![(0x41, 3), (0x42, 1)]);
        assert_eq!(t.declared_size(), Some(4));
    }

    #[test]
    fn byte_fast_path_matches_general_test() {
        let data: Vec<u8> = (0..100_000_u32).map(|i| (i * 31 % 251) as u8).collect();
        assert_eq!(build_frequency_table(&data, 8).unwrap(), general_path(&data, 8));
        let small = b"Making a silly test.";
        assert_eq!(build_frequency_table(small, 8).unwrap(), general_path(small, 8));
    }

    #[test]
    fn short_fast_path_matches_general_test() {
        let data: Vec<u8> = (0..5001_u32).map(|i| (i * 17 % 256) as u8).collect();
        // Odd length exercises the trailing half symbol
        assert_eq!(data.len() % 2, 1);
        assert_eq!(build_frequency_table(&data, 16).unwrap(), general_path(&data, 16));
    }

    #[test]
    fn odd_width_test() {
        // 0b101_010_10 0b1_100_000_0 at 3 bits: 101 010 101 100 000 0(00)
        let t = build_frequency_table(&[0b1010_1010, 0b1100_0000], 3).unwrap();
        assert_eq!(
            t.entries_sorted_by_symbol(),
            vec![(0b000, 2), (0b010, 1), (0b100, 1), (0b101, 2)]
        );
    }

    #[test]
    fn one_bit_test() {
        let t = build_frequency_table(&[0b1110_0000], 1).unwrap();
        assert_eq!(t.frequency(1), 3);
        assert_eq!(t.frequency(0), 5);
    }

    #[test]
    fn stream_matches_buffer_test() {
        let data: Vec<u8> = (0..3000_u32).map(|i| (i * i % 256) as u8).collect();
        for width in [1, 3, 8, 12, 16, 20, 64] {
            let a = build_frequency_table(&data, width).unwrap();
            let b = build_frequency_table_from_reader(data.as_slice(), width).unwrap();
            assert_eq!(a, b, "width {}", width);
        }
    }

    #[test]
    fn empty_source_test() {
        let t = build_frequency_table(&[], 8).unwrap();
        assert!(t.is_empty());
        assert_eq!(t.declared_size(), Some(0));
    }
}
