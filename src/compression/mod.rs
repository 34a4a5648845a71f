//! The compression module holds the coder and both directions of the coding pipeline.
//!
//! A `Coder` owns a frequency table and the code tree built from it. Encoding happens in these steps:
//! - Optional header bytes are copied to the output untouched.
//! - Optional serialized table follows, so the output can describe itself.
//! - Every symbol of the source is replaced by its code, the EOF code is appended and the last byte is
//!   zero padded.
//!
//! Decoding walks the tree bit by bit until the EOF code (or the end of the input) is reached.
//!
//! Every operation comes in a whole-buffer form and a streaming form. Both produce byte-identical output.
//!
pub mod coder;
pub mod compress;
pub mod decompress;
