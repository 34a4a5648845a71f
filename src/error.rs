//! Error types shared by every stage of the coder.

use thiserror::Error;

/// Result type alias used throughout the crate.
pub type Result<T> = core::result::Result<T, HuffError>;

/// Everything that can go wrong while building, serializing or running a coder.
#[derive(Debug, Error)]
pub enum HuffError {
    /// Symbol width out of range, or a table with nothing to code.
    #[error("unsupported configuration: {0}")]
    UnsupportedConfiguration(String),

    /// An input symbol has no code in the tree built from the supplied table.
    #[error("incompatible table: symbol 0x{symbol:x} has no code")]
    IncompatibleTable { symbol: u64 },

    /// A serialized frequency table could not be found or parsed.
    #[error("malformed table: {0}")]
    MalformedTable(String),

    /// Input ran out in the middle of a code.
    #[error("truncated input after {bits_read} bits")]
    TruncatedInput { bits_read: u64 },

    /// I/O error from the underlying source or sink.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl HuffError {
    pub fn unsupported(message: impl Into<String>) -> Self {
        HuffError::UnsupportedConfiguration(message.into())
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        HuffError::MalformedTable(message.into())
    }
}

#[cfg(test)]
mod test {
    use super::HuffError;

    #[test]
    fn display_test() {
        let e = HuffError::IncompatibleTable { symbol: 0x42 };
        assert_eq!(e.to_string(), "incompatible table: symbol 0x42 has no code");
        let e = HuffError::malformed("no magic");
        assert_eq!(e.to_string(), "malformed table: no magic");
    }

    #[test]
    fn io_conversion_test() {
        let io = std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "gone");
        let e: HuffError = io.into();
        assert!(matches!(e, HuffError::Io(_)));
    }
}
