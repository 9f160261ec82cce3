use crate::remap::geometry::GeometryError;
use std::io;
use thiserror::Error;

/// Status returned by the pointer-level API for any failure without a known OS error.
pub const REMAP_ERR_GENERIC: i32 = -1;

#[derive(Error, Debug)]
pub enum RemapError {
    #[error("Invalid block count: {0} (expected 1..={max})", max = crate::tiler::ioctl::TILER_MAX_NUM_BLOCKS)]
    InvalidBlockCount(usize),

    #[error("Got {pointers} device pointers but {lengths} lengths")]
    LengthCountMismatch { pointers: usize, lengths: usize },

    #[error("Device pointer 0x{dsptr:x} (block {index}) has no driver address")]
    Translation { index: usize, dsptr: u32 },

    #[error("Tiler query for block {index} failed: {source}")]
    DriverQuery {
        index: usize,
        #[source]
        source: io::Error,
    },

    #[error("Tiler did not allocate block {index} (dsptr=0x{dsptr:x}, ssptr=0x{ssptr:x})")]
    UnallocatedBlock { index: usize, dsptr: u32, ssptr: u32 },

    #[error("Inconsistent geometry for block {index}: {source}")]
    Geometry {
        index: usize,
        #[source]
        source: GeometryError,
    },

    #[error("Tiler buffer registration failed: {0}")]
    Registration(#[source] io::Error),

    #[error("Tiler returned an invalid buffer id")]
    InvalidBufferId,

    #[error("Failed to map {size} bytes at offset 0x{offset:x}: {source}")]
    Mapping {
        size: usize,
        offset: u32,
        #[source]
        source: io::Error,
    },

    #[error("No remapped buffer at 0x{0:x}")]
    CacheMiss(usize),

    #[error("Tiler buffer query failed: {0}")]
    BufferQuery(#[source] io::Error),

    #[error("Tiler buffer unregistration failed: {0}")]
    Unregistration(#[source] io::Error),

    #[error("Failed to unmap {size} bytes at 0x{addr:x}: {source}")]
    Unmap {
        addr: usize,
        size: usize,
        #[source]
        source: io::Error,
    },

    #[error("I/O Error: {0}")]
    Io(#[from] io::Error),

    #[error("Multiple failures: {}", .0.iter().map(ToString::to_string).collect::<Vec<_>>().join("; "))]
    Compound(Vec<RemapError>),
}

impl RemapError {
    /// Negative status for the pointer-level API: `-errno` when the OS reported one.
    #[must_use]
    pub fn status_code(&self) -> i32 {
        let os = match self {
            Self::DriverQuery { source, .. }
            | Self::Registration(source)
            | Self::Mapping { source, .. }
            | Self::BufferQuery(source)
            | Self::Unregistration(source)
            | Self::Unmap { source, .. }
            | Self::Io(source) => source.raw_os_error(),
            Self::Compound(errors) => {
                return errors.first().map_or(REMAP_ERR_GENERIC, Self::status_code);
            }
            _ => None,
        };

        match os {
            Some(errno) if errno > 0 => -errno,
            _ => REMAP_ERR_GENERIC,
        }
    }
}

// A convenient alias
pub type RemapResult<T> = Result<T, RemapError>;
