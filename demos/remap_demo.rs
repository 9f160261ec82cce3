//! Remaps tiler blocks given on the command line and releases them again.
//!
//! Usage: `remap_demo <dsptr>:<length> [<dsptr>:<length> ...]`, values in hex or decimal.

use log::{LevelFilter, Log, Metadata, Record, SetLoggerError};
use tiler_remap::{Remapper, TilerDevice};

struct StderrLogger {
    max_level: LevelFilter,
}

impl StderrLogger {
    fn init(max_level: LevelFilter) -> Result<(), SetLoggerError> {
        log::set_boxed_logger(Box::new(Self { max_level }))?;
        log::set_max_level(max_level);
        Ok(())
    }
}

impl Log for StderrLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.max_level
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            eprintln!("[{}] {}: {}", record.level(), record.target(), record.args());
        }
    }

    fn flush(&self) {}
}

fn parse_u32(s: &str) -> Result<u32, std::num::ParseIntError> {
    match s.strip_prefix("0x") {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => s.parse(),
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    StderrLogger::init(LevelFilter::Debug)?;

    let mut dsptrs = Vec::new();
    let mut lengths = Vec::new();
    for arg in std::env::args().skip(1) {
        let (dsptr, length) = arg
            .split_once(':')
            .ok_or_else(|| format!("expected <dsptr>:<length>, got {arg}"))?;
        dsptrs.push(parse_u32(dsptr)?);
        lengths.push(parse_u32(length)?);
    }

    println!("[+] Opening tiler driver...");
    let remapper = Remapper::new(TilerDevice::default(), tiler_remap::IdentityTranslator);

    println!("[+] Remapping {} block(s)...", dsptrs.len());
    let buffer = remapper.remap(&dsptrs, &lengths)?;
    println!(
        "    Buffer 0x{:x} mapped at {:p} ({} bytes)",
        buffer.buffer_id(),
        buffer.as_ptr(),
        buffer.size()
    );
    for (ix, block) in buffer.blocks().iter().enumerate() {
        println!("    Block {ix}: {block}");
    }

    println!("[+] Releasing buffer...");
    remapper.demap(buffer.as_ptr())?;
    println!("[+] Done.");

    Ok(())
}
