#![allow(clippy::cast_possible_wrap, clippy::cast_sign_loss)]

use crate::remap::types::{
    BlockDescriptor, BlockDims, BufferDescriptor, BufferId, MappedRegion, PixelFormat,
};
use crate::tiler::ioctl::{
    TILER_MAX_NUM_BLOCKS, TILIOC_QBUF, TILIOC_QUERY_BLK, TILIOC_RBUF, TILIOC_URBUF, TilerArea,
    TilerBlockDim, TilerBlockInfo, TilerBufInfo,
};
use crate::tiler::{DriverSession, TilerDriver};
use std::fs::{File, OpenOptions};
use std::io;
use std::os::unix::fs::OpenOptionsExt;
use std::os::unix::io::AsRawFd;
use std::path::{Path, PathBuf};
use std::ptr;

/// Default tiler character device.
pub const TILER_DEVICE_PATH: &str = "/dev/tiler";

/// The tiler driver character device.
///
/// Holds only the device path; every call opens its own [`TilerSession`].
#[derive(Clone, Debug)]
pub struct TilerDevice {
    path: PathBuf,
}

impl TilerDevice {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Default for TilerDevice {
    fn default() -> Self {
        Self::new(TILER_DEVICE_PATH)
    }
}

impl TilerDriver for TilerDevice {
    type Session = TilerSession;

    /// Opens the device read/write with `O_SYNC`.
    fn open_session(&self) -> io::Result<TilerSession> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .custom_flags(libc::O_SYNC)
            .open(&self.path)?;

        Ok(TilerSession { file })
    }
}

/// An open file descriptor on the tiler device. Closed on drop.
#[derive(Debug)]
pub struct TilerSession {
    file: File,
}

impl TilerSession {
    /// Generic unsafe helper to execute an IOCTL.
    ///
    /// # Safety
    /// The caller must ensure that `arg` is the argument type the driver expects for `cmd`.
    unsafe fn ioctl<T>(&self, cmd: u32, arg: &mut T) -> io::Result<()> {
        let ret = unsafe { libc::ioctl(self.file.as_raw_fd(), cmd as _, arg as *mut T) };
        if ret < 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }
}

impl DriverSession for TilerSession {
    fn query_block(&mut self, block: &mut BlockDescriptor) -> io::Result<()> {
        let mut info = TilerBlockInfo::try_from(&*block)?;
        unsafe {
            self.ioctl(TILIOC_QUERY_BLK, &mut info)?;
        }
        *block = BlockDescriptor::from(&info);
        Ok(())
    }

    fn register_buffer(&mut self, buffer: &mut BufferDescriptor) -> io::Result<()> {
        let mut info = TilerBufInfo::try_from(&*buffer)?;
        unsafe {
            self.ioctl(TILIOC_RBUF, &mut info)?;
        }
        buffer.buffer_id = info.offset;
        Ok(())
    }

    fn query_buffer(&mut self, buffer: &mut BufferDescriptor) -> io::Result<()> {
        let mut info = TilerBufInfo {
            offset: buffer.buffer_id,
            ..TilerBufInfo::default()
        };
        unsafe {
            self.ioctl(TILIOC_QBUF, &mut info)?;
        }
        let buffer_id = buffer.buffer_id;
        *buffer = BufferDescriptor::try_from(&info)?;
        buffer.buffer_id = buffer_id;
        Ok(())
    }

    fn unregister_buffer(&mut self, buffer: &BufferDescriptor) -> io::Result<()> {
        let mut info = TilerBufInfo::try_from(buffer)?;
        unsafe { self.ioctl(TILIOC_URBUF, &mut info) }
    }

    fn map(&mut self, size: usize, buffer_id: BufferId) -> io::Result<MappedRegion> {
        let ret = unsafe {
            libc::mmap(
                ptr::null_mut(),
                size,
                libc::PROT_READ | libc::PROT_WRITE,
                libc::MAP_SHARED,
                self.file.as_raw_fd(),
                buffer_id as libc::off_t,
            )
        };

        if ret == libc::MAP_FAILED {
            return Err(io::Error::last_os_error());
        }
        Ok(MappedRegion::new(ret as usize, size))
    }

    fn unmap(&mut self, region: MappedRegion) -> io::Result<()> {
        let ret = unsafe { libc::munmap(region.base as *mut libc::c_void, region.len) };
        if ret < 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }
}

// ===============================================================================================
// Conversions between the driver ABI and the descriptors used by the remapper
// ===============================================================================================

impl TryFrom<&BlockDescriptor> for TilerBlockInfo {
    type Error = io::Error;

    fn try_from(block: &BlockDescriptor) -> io::Result<Self> {
        let dim = match block.dims {
            BlockDims::Length(len) => {
                let mut dim = TilerBlockDim::default();
                dim.len = len;
                dim
            }
            BlockDims::Area { width, height } => {
                let (Ok(width), Ok(height)) = (u16::try_from(width), u16::try_from(height)) else {
                    return Err(io::Error::new(
                        io::ErrorKind::InvalidInput,
                        format!("{width}x{height} block does not fit a tiler area"),
                    ));
                };
                TilerBlockDim {
                    area: TilerArea { width, height },
                }
            }
        };

        Ok(Self {
            fmt: block.format.raw(),
            dim,
            stride: block.stride,
            ptr: block.ptr.unwrap_or(0),
            ssptr: block.ssptr,
        })
    }
}

impl From<&TilerBlockInfo> for BlockDescriptor {
    fn from(info: &TilerBlockInfo) -> Self {
        let format = PixelFormat::from_raw(info.fmt);
        // SAFETY: both views of the union are plain integers.
        let dims = if format.is_page() {
            BlockDims::Length(unsafe { info.dim.len })
        } else {
            let area = unsafe { info.dim.area };
            BlockDims::Area {
                width: u32::from(area.width),
                height: u32::from(area.height),
            }
        };

        Self {
            ssptr: info.ssptr,
            ptr: (info.ptr != 0).then_some(info.ptr),
            format,
            dims,
            stride: info.stride,
        }
    }
}

impl TryFrom<&BufferDescriptor> for TilerBufInfo {
    type Error = io::Error;

    fn try_from(buffer: &BufferDescriptor) -> io::Result<Self> {
        if buffer.blocks.len() > TILER_MAX_NUM_BLOCKS {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("{} blocks exceed the tiler limit", buffer.blocks.len()),
            ));
        }

        let mut info = Self {
            num_blocks: buffer.blocks.len() as i32,
            offset: buffer.buffer_id,
            ..Self::default()
        };
        for (slot, block) in info.blocks.iter_mut().zip(&buffer.blocks) {
            *slot = TilerBlockInfo::try_from(block)?;
        }
        Ok(info)
    }
}

impl TryFrom<&TilerBufInfo> for BufferDescriptor {
    type Error = io::Error;

    fn try_from(info: &TilerBufInfo) -> io::Result<Self> {
        let count = usize::try_from(info.num_blocks)
            .ok()
            .filter(|&n| n <= TILER_MAX_NUM_BLOCKS)
            .ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("driver reported {} blocks", info.num_blocks),
                )
            })?;

        let buffer = Self {
            blocks: info.blocks[..count].iter().map(BlockDescriptor::from).collect(),
            buffer_id: info.offset,
        };
        if buffer.checked_total_size().is_none() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("driver reported an oversized buffer: {buffer}"),
            ));
        }
        Ok(buffer)
    }
}
