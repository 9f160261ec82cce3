#![allow(clippy::cast_possible_truncation)]

// Linux generic ioctl request layout (asm-generic/ioctl.h).
const IOC_NRBITS: u32 = 8;
const IOC_TYPEBITS: u32 = 8;
const IOC_SIZEBITS: u32 = 14;

const IOC_NRSHIFT: u32 = 0;
const IOC_TYPESHIFT: u32 = IOC_NRSHIFT + IOC_NRBITS;
const IOC_SIZESHIFT: u32 = IOC_TYPESHIFT + IOC_TYPEBITS;
const IOC_DIRSHIFT: u32 = IOC_SIZESHIFT + IOC_SIZEBITS;

const IOC_WRITE: u32 = 1;
const IOC_READ: u32 = 2;

/// Process page size assumed by the tiler driver.
pub const PAGE_SIZE: usize = 4096;

#[must_use]
pub const fn ioc(dir: u32, type_: u32, nr: u32, size: usize) -> u32 {
    (dir << IOC_DIRSHIFT)
        | (type_ << IOC_TYPESHIFT)
        | (nr << IOC_NRSHIFT)
        | ((size as u32) << IOC_SIZESHIFT)
}

/// `_IOWR(type, nr, T)`
#[must_use]
pub const fn iowr<T>(type_: u32, nr: u32) -> u32 {
    ioc(IOC_READ | IOC_WRITE, type_, nr, std::mem::size_of::<T>())
}

/// Rounds `val` up to the next multiple of [`PAGE_SIZE`].
#[must_use]
pub const fn page_align_up(val: usize) -> usize {
    (val + PAGE_SIZE - 1) & !(PAGE_SIZE - 1)
}

/// Rounds `addr` down to the start of its page.
#[must_use]
pub const fn page_align_down(addr: usize) -> usize {
    addr & !(PAGE_SIZE - 1)
}

/// Offset of `addr` within its page.
#[must_use]
pub const fn page_offset(addr: usize) -> usize {
    addr & (PAGE_SIZE - 1)
}
