//! The huffman module holds the model side of the coder.
//!
//! - freq_table: symbol -> count for one fixed symbol width.
//! - code_tree: the weighted binary tree built from a table, with the EOF sentinel leaf and the code of
//!   every symbol.
//! - table_codec: the binary layout used to ship a table in front of the data it describes.
//!
//! The tree is never stored. Building it is a pure function of the table, so a decoder holding the same
//! table always gets the same codes as the encoder.
//!

pub mod code_tree;
pub mod freq_table;
pub mod table_codec;
