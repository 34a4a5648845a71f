//! The bitstream module is the I/O subsystem of the coder: the "bit cursor" every other stage reads
//! and writes through.
//!
//! Symbols are any width from 1 to 64 bits, so they regularly straddle byte boundaries. The readers and
//! writers here address individual bits, MSB-first within each byte.
//!
//! Each side has one trait and two implementations:
//! - `BitSource`: `BitCursor` (random access over a byte slice) and `BitReader` (sequential over any `Read`).
//! - `BitSink`: `BitPacker` (in-memory) and `BitWriter` (sequential over any `Write`).
//!
//! The coder is written against the traits, so whole-buffer and streaming runs produce identical bits.
//!
pub mod bitreader;
pub mod bitwriter;

pub use bitreader::{BitCursor, BitReader, BitSource};
pub use bitwriter::{BitPacker, BitSink, BitWriter};
