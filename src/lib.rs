//! Remapping of device-side tiler blocks into one contiguous mapping of the calling process.
//!
//! A [`Remapper`] takes the device pointers of up to [`TILER_MAX_NUM_BLOCKS`] blocks together
//! with the byte length of each, registers them with the tiler driver as a single buffer and
//! maps that buffer into the process. [`Remapper::demap`] undoes all of it given only the
//! returned pointer.
//!
//! ```no_run
//! use tiler_remap::Remapper;
//!
//! let remapper = Remapper::default();
//! let buffer = remapper.remap(&[0x6000_0000, 0x6010_0000], &[4096, 8192])?;
//! // ... use buffer.as_ptr() ...
//! remapper.demap(buffer.as_ptr())?;
//! # Ok::<(), tiler_remap::RemapError>(())
//! ```

pub mod error;
pub mod remap;
pub mod tiler;
pub mod translate;
pub mod utils;

pub use error::{REMAP_ERR_GENERIC, RemapError, RemapResult};
pub use remap::{
    BlockDescriptor, BlockDims, BufferDescriptor, BufferId, DsPtr, HandleCache, MappedRegion,
    PixelFormat, RemappedBuffer, Remapper, SsPtr,
};
pub use tiler::device::{TILER_DEVICE_PATH, TilerDevice};
pub use tiler::ioctl::TILER_MAX_NUM_BLOCKS;
pub use tiler::{DriverSession, TilerDriver};
pub use translate::{AddressTranslator, IdentityTranslator};
pub use utils::PAGE_SIZE;
