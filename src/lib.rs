//! Huffman coding of fixed-width symbols.
//!
//! Version 0.1.0
//!
//! A source of bytes is read as a stream of symbols of 1 to 64 bits. The symbols are counted into a
//! frequency table, a code tree is built from the table (deterministically, so a decoder can rebuild it),
//! and each symbol is replaced with its code. An EOF code marks the end of the data.
//!
//! The table can be serialized in front of the payload, which makes the output self-describing:
//!
//! ```
//! let data = b"abracadabra";
//! let packed = symhuff::compress(data, 8, true, None).unwrap();
//! assert_eq!(symhuff::decompress(&packed, 0).unwrap(), data);
//! ```
//!
//! Every operation also has a streaming form that works over `std::io::Read`/`Write` with bounded memory.
//!
pub mod bitstream;
pub mod compression;
pub mod error;
pub mod huffman_coding;
pub mod tools;

pub use compression::coder::Coder;
pub use compression::compress::{compress, compress_streaming};
pub use compression::decompress::{decompress, decompress_streaming};
pub use error::{HuffError, Result};
pub use huffman_coding::freq_table::FrequencyTable;
pub use huffman_coding::table_codec::{read_table as read_frequency_table, serialize_table};
pub use tools::freq_count::{build_frequency_table, build_frequency_table_from_reader};
