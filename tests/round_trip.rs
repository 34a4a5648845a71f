use symhuff::huffman_coding::freq_table::EOF_SYMBOL;
use symhuff::{
    build_frequency_table, compress, decompress, read_frequency_table, serialize_table, Coder,
    FrequencyTable, HuffError,
};

/// Deterministic pseudo-random bytes with a skewed distribution.
fn sample(len: usize) -> Vec<u8> {
    let mut state = 0x2545_f491_u32;
    (0..len)
        .map(|_| {
            state ^= state << 13;
            state ^= state >> 17;
            state ^= state << 5;
            (state % 23) as u8 * (state % 3) as u8
        })
        .collect()
}

#[test]
fn power_of_two_widths() {
    let data = sample(4096);
    for width in [1, 2, 4, 8, 16, 32, 64] {
        let packed = compress(&data, width, true, None).unwrap();
        assert_eq!(decompress(&packed, 0).unwrap(), data, "width {}", width);
    }
}

#[test]
fn odd_widths() {
    // Lengths chosen so most widths leave a partial last symbol
    for len in [1, 3, 7, 100, 1001] {
        let data = sample(len);
        for width in [3, 5, 7, 9, 12, 13, 24, 31, 33, 63] {
            let packed = compress(&data, width, true, None).unwrap();
            assert_eq!(
                decompress(&packed, 0).unwrap(),
                data,
                "len {} width {}",
                len,
                width
            );
        }
    }
}

#[test]
fn compresses_skewed_data() {
    let data = b"aaaaaaaaaaaaaaaabbbbbbbbccccdd".repeat(100);
    let packed = compress(&data, 8, true, None).unwrap();
    assert!(packed.len() < data.len() / 3);
}

#[test]
fn same_input_same_output() {
    let data = sample(2000);
    let a = compress(&data, 12, true, Some(b"hdr")).unwrap();
    let b = compress(&data, 12, true, Some(b"hdr")).unwrap();
    assert_eq!(a, b);
}

#[test]
fn single_symbol_source() {
    let data = vec![0x5a; 1000];
    let packed = compress(&data, 8, true, None).unwrap();
    assert_eq!(decompress(&packed, 0).unwrap(), data);
    let table = read_frequency_table(&packed, 0).unwrap();
    assert_eq!(table.valid_entries(), 1);
    assert_eq!(table.frequency(0x5a), 1000);
}

#[test]
fn table_from_one_source_codes_another() {
    let table = build_frequency_table(b"hello world", 8).unwrap();
    let coder = Coder::new(table).unwrap();
    let packed = coder.encode(b"low order", false, None).unwrap();
    assert_eq!(coder.decode(&packed, 0).unwrap(), b"low order");
    assert!(matches!(
        coder.encode(b"xyz", false, None),
        Err(HuffError::IncompatibleTable { symbol: 0x78 })
    ));
}

#[test]
fn header_passes_through() {
    let data = sample(500);
    let header = b"MYFORMAT v1\n";
    let packed = compress(&data, 8, true, Some(header)).unwrap();
    assert_eq!(&packed[..header.len()], header);
    assert_eq!(decompress(&packed, 0).unwrap(), data);
    assert_eq!(decompress(&packed, header.len()).unwrap(), data);
}

#[test]
fn coder_skips_table_at_offset() {
    let data = sample(300);
    let coder = Coder::new(build_frequency_table(&data, 8).unwrap()).unwrap();
    let packed = coder.encode(&data, true, Some(b"12345")).unwrap();
    assert_eq!(coder.decode(&packed, 5).unwrap(), data);
}

#[test]
fn table_survives_serialization() {
    let mut table = FrequencyTable::new(64).unwrap();
    table.set_frequency(0, 1).unwrap();
    table.set_frequency(EOF_SYMBOL, 3).unwrap();
    table.set_frequency(u64::MAX, 1 << 40).unwrap();
    table.set_declared_size(1 << 33);
    let bytes = serialize_table(&table, true).unwrap();
    assert_eq!(read_frequency_table(&bytes, 0).unwrap(), table);
}

#[test]
fn real_symbol_at_sentinel_value() {
    // A 64 bit symbol equal to the sentinel value keeps its own leaf
    let data: Vec<u8> = [EOF_SYMBOL, 1, EOF_SYMBOL]
        .iter()
        .flat_map(|s| s.to_be_bytes())
        .collect();
    let packed = compress(&data, 64, true, None).unwrap();
    assert_eq!(decompress(&packed, 0).unwrap(), data);
}

#[test]
fn empty_table_is_rejected() {
    assert!(matches!(
        compress(&[], 8, true, None),
        Err(HuffError::UnsupportedConfiguration(_))
    ));
    assert!(matches!(
        compress(b"data", 0, true, None),
        Err(HuffError::UnsupportedConfiguration(_))
    ));
}

#[test]
fn header_with_signature() {
    let packed = compress(b"abracadabra", 8, true, Some(b"HUFT header")).unwrap();
    assert_eq!(decompress(&packed, 0).unwrap(), b"abracadabra");
}
