pub mod device;
pub mod ioctl;

use crate::remap::types::{BlockDescriptor, BufferDescriptor, BufferId, MappedRegion};
use std::io;

/// Entry point to the tiler driver: hands out per-call sessions.
pub trait TilerDriver {
    type Session: DriverSession;

    /// Opens a session with the driver.
    ///
    /// # Errors
    /// Fails if the driver is unavailable.
    fn open_session(&self) -> io::Result<Self::Session>;
}

/// One open handle to the tiler driver. Dropping the session closes it.
///
/// Mappings created through a session outlive it; they are released with [`DriverSession::unmap`]
/// on whichever session is open at that point.
pub trait DriverSession {
    /// Fills in format and extent of the block at `block.ssptr`.
    ///
    /// A block the driver does not know comes back with `ssptr == 0`.
    fn query_block(&mut self, block: &mut BlockDescriptor) -> io::Result<()>;

    /// Registers `buffer.blocks` as one buffer and stores the new id in `buffer.buffer_id`.
    fn register_buffer(&mut self, buffer: &mut BufferDescriptor) -> io::Result<()>;

    /// Replaces `buffer.blocks` with the blocks registered under `buffer.buffer_id`.
    fn query_buffer(&mut self, buffer: &mut BufferDescriptor) -> io::Result<()>;

    /// Releases the driver-side registration of `buffer.buffer_id`.
    fn unregister_buffer(&mut self, buffer: &BufferDescriptor) -> io::Result<()>;

    /// Maps `size` bytes of a registered buffer read/write and shared.
    fn map(&mut self, size: usize, buffer_id: BufferId) -> io::Result<MappedRegion>;

    fn unmap(&mut self, region: MappedRegion) -> io::Result<()>;
}
