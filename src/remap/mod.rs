pub mod cache;
pub mod demap;
pub mod geometry;
pub mod remapper;
pub mod types;

pub use cache::HandleCache;
pub use remapper::Remapper;
pub use types::{
    BlockDescriptor, BlockDims, BufferDescriptor, BufferId, DsPtr, MappedRegion, PixelFormat,
    RemappedBuffer, SsPtr,
};
