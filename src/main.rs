//Enable more cargo lint tests
#![warn(rust_2018_idioms)]
#![warn(clippy::disallowed_types)]

use std::fs;

use log::{error, info, LevelFilter};
use simplelog::{Config, TermLogger, TerminalMode};
use tikv_jemallocator::Jemalloc;

use symhuff::tools::cli::{huffopts_init, HuffOpts, Mode};
use symhuff::{compress, compress_streaming, decompress, decompress_streaming, Result};

#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

fn main() -> Result<()> {
    // Available log levels are Error, Warn, Info, Debug, Trace
    if let Err(e) = TermLogger::init(
        LevelFilter::Trace,
        Config::default(),
        TerminalMode::Stderr,
        simplelog::ColorChoice::Auto,
    ) {
        eprintln!("Logging unavailable: {}", e);
    }

    let options = huffopts_init();

    //----- Figure how what we need to do and go do it
    let result = match options.op_mode {
        Mode::Compress => zip(&options),
        Mode::Decompress => unzip(&options),
    };

    match &result {
        Ok(written) => info!("Done. Wrote {} bytes to {}\n", written, options.output.display()),
        Err(e) => error!("{} failed: {}", options.op_mode, e),
    }
    result.map(|_| ())
}

fn zip(opts: &HuffOpts) -> Result<u64> {
    if opts.streaming {
        return compress_streaming(
            &opts.input,
            &opts.output,
            opts.symbol_width,
            opts.include_table,
            opts.header.as_deref(),
        );
    }
    let data = fs::read(&opts.input)?;
    let packed = compress(
        &data,
        opts.symbol_width,
        opts.include_table,
        opts.header.as_deref(),
    )?;
    fs::write(&opts.output, &packed)?;
    Ok(packed.len() as u64)
}

fn unzip(opts: &HuffOpts) -> Result<u64> {
    if opts.streaming {
        return decompress_streaming(&opts.input, &opts.output, opts.offset);
    }
    let data = fs::read(&opts.input)?;
    let offset = usize::try_from(opts.offset).unwrap_or(usize::MAX);
    let unpacked = decompress(&data, offset)?;
    fs::write(&opts.output, &unpacked)?;
    Ok(unpacked.len() as u64)
}
