//! Helper functions for the symhuff library and binary.
//!
//! The tools are:
//! - cli: Command line interface for symhuff.
//! - freq_count: Build a frequency table from a buffer or a stream.
//!
pub mod cli;
pub mod freq_count;
