use crate::utils::iowr;

// ===============================================================================================
// Constants
// ===============================================================================================

pub const TILER_IOCTL_BASE: u32 = 0x7A; // 'z'

/// Fixed number of block slots in a tiler buffer.
pub const TILER_MAX_NUM_BLOCKS: usize = 16;

pub const TILFMT_NONE: i32 = 0;
pub const TILFMT_8BIT: i32 = 1;
pub const TILFMT_16BIT: i32 = 2;
pub const TILFMT_32BIT: i32 = 3;
pub const TILFMT_PAGE: i32 = 4;

// ===============================================================================================
// Block / Buffer Descriptors
// ===============================================================================================

#[repr(C)]
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct TilerArea {
    pub width: u16,
    pub height: u16,
}

/// 2D blocks use `area`; page blocks use `len`, which overlays the whole area.
#[repr(C)]
#[derive(Copy, Clone)]
pub union TilerBlockDim {
    pub area: TilerArea,
    pub len: u32,
}

impl Default for TilerBlockDim {
    fn default() -> Self {
        Self {
            area: TilerArea::default(),
        }
    }
}

impl std::fmt::Debug for TilerBlockDim {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // SAFETY: both views are plain integers over the same initialized bytes.
        let (area, len) = unsafe { (self.area, self.len) };
        f.debug_struct("TilerBlockDim")
            .field("area", &area)
            .field("len", &len)
            .finish()
    }
}

#[repr(C)]
#[derive(Debug, Default, Copy, Clone)]
pub struct TilerBlockInfo {
    pub fmt: i32,
    pub dim: TilerBlockDim,
    pub stride: u32,
    pub ptr: usize,
    pub ssptr: u32,
}

#[repr(C)]
#[derive(Debug, Copy, Clone)]
pub struct TilerBufInfo {
    pub num_blocks: i32,
    pub blocks: [TilerBlockInfo; TILER_MAX_NUM_BLOCKS],
    pub offset: u32,
}

impl Default for TilerBufInfo {
    fn default() -> Self {
        Self {
            num_blocks: 0,
            blocks: [TilerBlockInfo::default(); TILER_MAX_NUM_BLOCKS],
            offset: 0,
        }
    }
}

// ===============================================================================================
// IOCTL Definitions
// ===============================================================================================

pub const TILIOC_QBUF: u32 = iowr::<TilerBufInfo>(TILER_IOCTL_BASE, 105);
pub const TILIOC_RBUF: u32 = iowr::<TilerBufInfo>(TILER_IOCTL_BASE, 106);
pub const TILIOC_URBUF: u32 = iowr::<TilerBufInfo>(TILER_IOCTL_BASE, 107);
pub const TILIOC_QUERY_BLK: u32 = iowr::<TilerBlockInfo>(TILER_IOCTL_BASE, 108);
