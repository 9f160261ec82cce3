use crate::tiler::ioctl::{TILFMT_8BIT, TILFMT_16BIT, TILFMT_32BIT, TILFMT_NONE, TILFMT_PAGE};
use std::fmt;

/// Device-side pointer handed in by the caller.
pub type DsPtr = u32;
/// Tiler driver's own address for a block.
pub type SsPtr = u32;
/// Driver-assigned buffer handle; doubles as the buffer's mmap offset. Zero is never valid.
pub type BufferId = u32;

/// Container format of a tiler block as reported by the driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PixelFormat {
    /// 1D page-mode block, described only by its byte length.
    Page,
    Bit8,
    Bit16,
    Bit32,
    /// Any other driver code, including `TILFMT_NONE`.
    Other(i32),
}

impl PixelFormat {
    #[must_use]
    pub const fn from_raw(code: i32) -> Self {
        match code {
            TILFMT_PAGE => Self::Page,
            TILFMT_8BIT => Self::Bit8,
            TILFMT_16BIT => Self::Bit16,
            TILFMT_32BIT => Self::Bit32,
            other => Self::Other(other),
        }
    }

    #[must_use]
    pub const fn raw(self) -> i32 {
        match self {
            Self::Page => TILFMT_PAGE,
            Self::Bit8 => TILFMT_8BIT,
            Self::Bit16 => TILFMT_16BIT,
            Self::Bit32 => TILFMT_32BIT,
            Self::Other(code) => code,
        }
    }

    #[must_use]
    pub const fn is_page(self) -> bool {
        matches!(self, Self::Page)
    }
}

impl Default for PixelFormat {
    fn default() -> Self {
        Self::Other(TILFMT_NONE)
    }
}

/// Extent of a block: byte length for page blocks, pixels for 2D blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockDims {
    Length(u32),
    Area { width: u32, height: u32 },
}

impl Default for BlockDims {
    fn default() -> Self {
        Self::Area {
            width: 0,
            height: 0,
        }
    }
}

/// One block of a tiler buffer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlockDescriptor {
    pub ssptr: SsPtr,
    /// Process address of the block, set once the buffer is mapped.
    pub ptr: Option<usize>,
    pub format: PixelFormat,
    pub dims: BlockDims,
    pub stride: u32,
}

impl BlockDescriptor {
    /// A block known only by its driver pointer, ready to be queried.
    #[must_use]
    pub fn new(ssptr: SsPtr) -> Self {
        Self {
            ssptr,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn page(ssptr: SsPtr, length: u32) -> Self {
        Self {
            ssptr,
            format: PixelFormat::Page,
            dims: BlockDims::Length(length),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn area(ssptr: SsPtr, format: PixelFormat, width: u32, height: u32) -> Self {
        Self {
            ssptr,
            format,
            dims: BlockDims::Area { width, height },
            ..Self::default()
        }
    }
}

struct PtrDisplay(Option<usize>);

impl fmt::Display for PtrDisplay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(addr) => write!(f, "0x{addr:x}"),
            None => f.write_str("(nil)"),
        }
    }
}

impl fmt::Display for BlockDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ptr = PtrDisplay(self.ptr);
        match (self.format, self.dims) {
            (PixelFormat::Page, BlockDims::Length(len)) => write!(
                f,
                "[p={ptr}(0x{:x}),l=0x{len:x},s={}]",
                self.ssptr, self.stride
            ),
            (
                PixelFormat::Bit8 | PixelFormat::Bit16 | PixelFormat::Bit32,
                BlockDims::Area { width, height },
            ) => write!(
                f,
                "[p={ptr}(0x{:x}),{width}*{height}*{},s={}]",
                self.ssptr,
                crate::remap::geometry::default_bytes_per_pixel(self.format) * 8,
                self.stride
            ),
            (format, BlockDims::Length(len) | BlockDims::Area { width: len, .. }) => write!(
                f,
                "*[p={ptr}(0x{:x}),l=0x{len:x},s={},fmt=0x{:x}]",
                self.ssptr,
                self.stride,
                format.raw()
            ),
        }
    }
}

/// An ordered set of blocks registered with the driver as one mappable unit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BufferDescriptor {
    pub blocks: Vec<BlockDescriptor>,
    /// Nonzero while the buffer is registered with the driver.
    pub buffer_id: BufferId,
}

impl BufferDescriptor {
    #[must_use]
    pub fn with_capacity(blocks: usize) -> Self {
        Self {
            blocks: Vec::with_capacity(blocks),
            buffer_id: 0,
        }
    }

    /// Descriptor for an already registered buffer whose blocks are still to be queried.
    #[must_use]
    pub const fn registered(buffer_id: BufferId) -> Self {
        Self {
            blocks: Vec::new(),
            buffer_id,
        }
    }

    #[must_use]
    pub fn is_registered(&self) -> bool {
        self.buffer_id != 0
    }

    /// Sum of the mapped sizes of all blocks; saturates at `usize::MAX`.
    #[must_use]
    pub fn total_size(&self) -> usize {
        self.checked_total_size().unwrap_or(usize::MAX)
    }

    /// Sum of the mapped sizes of all blocks, or `None` if it does not fit in `usize`.
    #[must_use]
    pub fn checked_total_size(&self) -> Option<usize> {
        self.blocks.iter().try_fold(0usize, |total, block| {
            total.checked_add(crate::remap::geometry::checked_block_size(block)?)
        })
    }
}

impl fmt::Display for BufferDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "buf={{n={},id=0x{:x},", self.blocks.len(), self.buffer_id)?;
        for block in &self.blocks {
            write!(f, " {block}")?;
        }
        f.write_str("}")
    }
}

/// A process-space mapping created by a driver session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MappedRegion {
    /// Page-aligned start address.
    pub base: usize,
    pub len: usize,
}

impl MappedRegion {
    #[must_use]
    pub const fn new(base: usize, len: usize) -> Self {
        Self { base, len }
    }
}

/// Result of a successful remap.
///
/// The mapping is not released on drop: it stays valid until the buffer is handed back
/// through `Remapper::demap`.
#[derive(Debug, Clone)]
pub struct RemappedBuffer {
    region: MappedRegion,
    offset: usize,
    buffer: BufferDescriptor,
}

impl RemappedBuffer {
    pub(crate) const fn new(region: MappedRegion, offset: usize, buffer: BufferDescriptor) -> Self {
        Self {
            region,
            offset,
            buffer,
        }
    }

    /// Address of the first block: the mapping base plus the block's offset into its page.
    #[must_use]
    pub const fn addr(&self) -> usize {
        self.region.base + self.offset
    }

    #[must_use]
    pub fn as_ptr(&self) -> *mut u8 {
        self.addr() as *mut u8
    }

    #[must_use]
    pub const fn region(&self) -> MappedRegion {
        self.region
    }

    /// Sub-page offset of the first block within the mapping.
    #[must_use]
    pub const fn offset(&self) -> usize {
        self.offset
    }

    #[must_use]
    pub const fn buffer_id(&self) -> BufferId {
        self.buffer.buffer_id
    }

    #[must_use]
    pub fn size(&self) -> usize {
        self.buffer.total_size()
    }

    #[must_use]
    pub fn blocks(&self) -> &[BlockDescriptor] {
        &self.buffer.blocks
    }

    /// Process address of block `index`.
    #[must_use]
    pub fn block_addr(&self, index: usize) -> Option<usize> {
        self.buffer.blocks.get(index).and_then(|b| b.ptr)
    }
}
