use clap::Parser;
use log::{info, warn};
use std::path::PathBuf;
use std::{fmt::Display, fmt::Formatter};

/// Suffix added to compressed files when no output name is given.
pub const SUFFIX: &str = "huf";

/// Verbosity of user information
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    Quiet,
    Errors,
    Warnings,
    Info,
    Debug,
    Trace,
}

impl Verbosity {
    fn from_level(v: u8) -> Self {
        match v {
            0 => Verbosity::Quiet,
            1 => Verbosity::Errors,
            2 => Verbosity::Warnings,
            3 => Verbosity::Info,
            4 => Verbosity::Debug,
            _ => Verbosity::Trace,
        }
    }

    pub fn level_filter(&self) -> log::LevelFilter {
        match self {
            Verbosity::Quiet => log::LevelFilter::Off,
            Verbosity::Errors => log::LevelFilter::Error,
            Verbosity::Warnings => log::LevelFilter::Warn,
            Verbosity::Info => log::LevelFilter::Info,
            Verbosity::Debug => log::LevelFilter::Debug,
            Verbosity::Trace => log::LevelFilter::Trace,
        }
    }
}

/// Compress or Decompress
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Compress,
    Decompress,
}
impl Display for Mode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Everything the binary needs to know to do its job.
#[derive(Debug)]
pub struct HuffOpts {
    /// File to read
    pub input: PathBuf,
    /// File to write
    pub output: PathBuf,
    /// Compress/Decompress
    pub op_mode: Mode,
    /// Bits per symbol when compressing
    pub symbol_width: u32,
    /// Write the frequency table in front of the payload
    pub include_table: bool,
    /// Bytes copied in front of everything else when compressing
    pub header: Option<Vec<u8>>,
    /// Where to start looking for the table when decompressing
    pub offset: u64,
    /// Use the bounded-memory streaming path
    pub streaming: bool,
    /// Verbosity of user information
    pub verbose: Verbosity,
}

/// Command Line Interpretation - uses external CLAP crate.
#[derive(Parser, Debug)]
#[clap(
    version,
    about = "Huffman coding of fixed-width symbols",
    long_about = "
    Reads the input as a sequence of symbols of 1 to 64 bits, builds a Huffman code for them and writes
    the coded data. By default the frequency table is written in front of the data, so the output can be
    decompressed without any other information."
)]
pub struct Args {
    /// Filename of file to process
    #[clap()]
    input: String,

    /// Filename to write. Defaults to the input name with .huf added (or removed)
    #[clap(short = 'o', long = "output")]
    output: Option<String>,

    /// Perform decompression on the input file
    #[clap(short = 'd', long = "decompress")]
    decompress: bool,

    /// Symbol width in bits, 1..64
    #[clap(short = 'w', long = "width", default_value_t = 8)]
    width: u32,

    /// Leave the frequency table out of the compressed file
    #[clap(long = "no-table")]
    no_table: bool,

    /// ASCII header written in front of the compressed data
    #[clap(long = "header")]
    header: Option<String>,

    /// Byte offset to start searching for the table when decompressing
    #[clap(long = "offset", default_value_t = 0)]
    offset: u64,

    /// Stream through the files instead of loading them into memory
    #[clap(short = 's', long = "stream")]
    stream: bool,

    /// Sets verbosity. -v0 is silent, -v5 is chatty
    #[clap(short = 'v', default_value_t = 2)]
    v: u8,
}

/// Parse the command line, set the log level and report the settings.
pub fn huffopts_init() -> HuffOpts {
    let opts = from_args(Args::parse());
    log::set_max_level(opts.verbose.level_filter());

    // Below we report initialization status to the user
    info!("---- symhuff Initialization Start ----");
    info!("Verbosity set to {}", log::max_level());
    info!("Operational mode set to {}", opts.op_mode);
    info!(
        "Reading {}, writing {}",
        opts.input.display(),
        opts.output.display()
    );
    if opts.op_mode == Mode::Compress {
        info!("Symbol width set to {} bits", opts.symbol_width);
        if !opts.include_table {
            warn!("No table will be written; the output cannot be decompressed on its own")
        }
    } else if opts.offset > 0 {
        info!("Searching for the table from byte {}", opts.offset)
    }
    if opts.streaming {
        info!("Streaming mode")
    };
    info!("---- symhuff Initialization End ----\n");
    opts
}

/// Put command line information from CLAP into our internal structure.
pub fn from_args(args: Args) -> HuffOpts {
    let op_mode = if args.decompress {
        Mode::Decompress
    } else {
        Mode::Compress
    };
    let input = PathBuf::from(&args.input);
    let output = match args.output {
        Some(name) => PathBuf::from(name),
        None => default_output(&input, op_mode),
    };
    HuffOpts {
        input,
        output,
        op_mode,
        symbol_width: args.width,
        include_table: !args.no_table,
        header: args.header.map(String::into_bytes),
        offset: args.offset,
        streaming: args.stream,
        verbose: Verbosity::from_level(args.v),
    }
}

/// name -> name.huf when compressing. name.huf -> name (else name.out) when decompressing.
fn default_output(input: &std::path::Path, mode: Mode) -> PathBuf {
    match mode {
        Mode::Compress => {
            let mut name = input.as_os_str().to_owned();
            name.push(".");
            name.push(SUFFIX);
            PathBuf::from(name)
        }
        Mode::Decompress => {
            if input.extension().map_or(false, |ext| ext == SUFFIX) {
                input.with_extension("")
            } else {
                let mut name = input.as_os_str().to_owned();
                name.push(".out");
                PathBuf::from(name)
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn opts(argv: &[&str]) -> HuffOpts {
        from_args(Args::try_parse_from(argv).unwrap())
    }

    #[test]
    fn defaults_test() {
        let o = opts(&["symhuff", "notes.txt"]);
        assert_eq!(o.op_mode, Mode::Compress);
        assert_eq!(o.output, PathBuf::from("notes.txt.huf"));
        assert_eq!(o.symbol_width, 8);
        assert!(o.include_table);
        assert!(o.header.is_none());
        assert!(!o.streaming);
        assert_eq!(o.verbose, Verbosity::Warnings);
    }

    #[test]
    fn decompress_names_test() {
        let o = opts(&["symhuff", "-d", "notes.txt.huf"]);
        assert_eq!(o.op_mode, Mode::Decompress);
        assert_eq!(o.output, PathBuf::from("notes.txt"));
        let o = opts(&["symhuff", "-d", "blob.bin"]);
        assert_eq!(o.output, PathBuf::from("blob.bin.out"));
    }

    #[test]
    fn all_flags_test() {
        let o = opts(&[
            "symhuff", "-w", "12", "--no-table", "--header", "HDR", "--offset", "7", "-s", "-v4", "-o",
            "out.bin", "in.bin",
        ]);
        assert_eq!(o.symbol_width, 12);
        assert!(!o.include_table);
        assert_eq!(o.header.as_deref(), Some(&b"HDR"[..]));
        assert_eq!(o.offset, 7);
        assert!(o.streaming);
        assert_eq!(o.verbose, Verbosity::Debug);
        assert_eq!(o.output, PathBuf::from("out.bin"));
    }

    #[test]
    fn missing_input_test() {
        assert!(Args::try_parse_from(["symhuff"]).is_err());
    }
}
