//! Block geometry: sizes of tiler blocks and recovery of 2D layout from a known byte length.
//!
//! The tiler driver does not keep the real width or stride of a 2D block. A query reports the
//! container capacity as `width` (in bytes, a multiple of the page size) and an overshooting row
//! count as `height`. Together with the byte length the caller allocated, that bounds the number
//! of pages per row, which is all that is needed to rebuild the block.

#![allow(clippy::cast_possible_truncation)]

use crate::remap::types::{BlockDescriptor, BlockDims, PixelFormat};
use crate::utils::{PAGE_SIZE, page_align_up};
use log::{info, warn};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GeometryError {
    #[error("block length is zero")]
    ZeroLength,

    #[error("driver reported zero height")]
    ZeroHeight,

    #[error("driver reported a page-mode extent for a 2D format")]
    NotAnAreaBlock,

    #[error("page width range {min}..={max} is empty")]
    EmptyPageWidthRange { min: u64, max: u64 },

    #[error("resolved size {actual} does not match length {expected}")]
    SizeMismatch { expected: usize, actual: usize },
}

#[must_use]
pub const fn default_bytes_per_pixel(format: PixelFormat) -> u32 {
    match format {
        PixelFormat::Bit32 => 4,
        PixelFormat::Bit16 => 2,
        _ => 1,
    }
}

/// Row stride for a row of `width_bytes`: the next page multiple.
#[must_use]
pub const fn default_stride(width_bytes: usize) -> usize {
    page_align_up(width_bytes)
}

/// Mapped size of a block in bytes, or `None` if it does not fit in `usize`.
#[must_use]
pub fn checked_block_size(block: &BlockDescriptor) -> Option<usize> {
    let row_stride = |width: u32| {
        (width as usize)
            .checked_mul(default_bytes_per_pixel(block.format) as usize)?
            .checked_add(PAGE_SIZE - 1)
            .map(|bytes| bytes & !(PAGE_SIZE - 1))
    };

    match (block.format, block.dims) {
        (PixelFormat::Page, BlockDims::Length(len) | BlockDims::Area { width: len, .. }) => {
            Some(len as usize)
        }
        (_, BlockDims::Area { width, height }) => (height as usize).checked_mul(row_stride(width)?),
        (_, BlockDims::Length(len)) => row_stride(len),
    }
}

/// Mapped size of a block in bytes; saturates at `usize::MAX`.
///
/// Geometry coming straight from the driver should go through [`checked_block_size`].
#[must_use]
pub fn block_size(block: &BlockDescriptor) -> usize {
    checked_block_size(block).unwrap_or(usize::MAX)
}

/// Pages the driver may have over-reserved in height for a format.
const fn slack_pages(format: PixelFormat) -> u64 {
    match format {
        PixelFormat::Bit8 => 63,
        _ => 31,
    }
}

/// Fills in the geometry of a freshly queried block from the caller's byte length.
///
/// Page blocks take the length as-is; all other formats go through [`resolve_stride`].
/// On success `block_size(block) == known_length`.
///
/// # Errors
/// Returns a [`GeometryError`] if the driver-reported geometry cannot produce `known_length`.
pub fn resolve_geometry(block: &mut BlockDescriptor, known_length: u32) -> Result<(), GeometryError> {
    if block.format.is_page() {
        block.dims = BlockDims::Length(known_length);
    } else {
        resolve_stride(block, known_length)?;
    }

    let actual = block_size(block);
    if actual != known_length as usize {
        return Err(GeometryError::SizeMismatch {
            expected: known_length as usize,
            actual,
        });
    }
    Ok(())
}

/// Rebuilds width, height and stride of a 2D block.
///
/// When more than one page width fits, the narrowest one is chosen.
///
/// # Errors
/// Fails if the reported geometry is degenerate or no page width fits.
pub fn resolve_stride(block: &mut BlockDescriptor, known_length: u32) -> Result<(), GeometryError> {
    let BlockDims::Area {
        width: reported_width,
        height: reported_height,
    } = block.dims
    else {
        return Err(GeometryError::NotAnAreaBlock);
    };

    if known_length == 0 {
        return Err(GeometryError::ZeroLength);
    }
    if reported_height == 0 {
        return Err(GeometryError::ZeroHeight);
    }

    let page = PAGE_SIZE as u64;
    let length = u64::from(known_length);

    let max_alloc_size = u64::from(reported_height) * page;
    let min_page_width = length.div_ceil(max_alloc_size);

    // A height below the slack leaves no lower bound on the allocation; only the container
    // capacity limits the width then.
    let min_alloc_size = max_alloc_size
        .checked_sub(slack_pages(block.format) * page)
        .filter(|&size| size > 0);

    let capacity = u64::from(reported_width) / page;
    let max_page_width = match min_alloc_size {
        Some(min_alloc_size) => {
            let bound = length.div_ceil(min_alloc_size);
            if bound > capacity {
                info!("lowering max_page_width from {bound} to {capacity}");
            }
            bound.min(capacity)
        }
        None => capacity,
    };

    if min_page_width > max_page_width {
        return Err(GeometryError::EmptyPageWidthRange {
            min: min_page_width,
            max: max_page_width,
        });
    }

    if min_page_width != max_page_width {
        warn!(
            "cannot resolve stride ({min_page_width}-{max_page_width}). Choosing the smaller."
        );
    }

    let height = length / page / min_page_width;
    let width = page * min_page_width / u64::from(default_bytes_per_pixel(block.format));

    block.dims = BlockDims::Area {
        width: width as u32,
        height: height as u32,
    };
    block.stride = width as u32;
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;

    const PAGE: u32 = PAGE_SIZE as u32;

    fn queried(format: PixelFormat, width: u32, height: u32) -> BlockDescriptor {
        BlockDescriptor::area(0x6000_0000, format, width, height)
    }

    #[test]
    fn bytes_per_pixel() {
        assert_eq!(default_bytes_per_pixel(PixelFormat::Bit32), 4);
        assert_eq!(default_bytes_per_pixel(PixelFormat::Bit16), 2);
        assert_eq!(default_bytes_per_pixel(PixelFormat::Bit8), 1);
        assert_eq!(default_bytes_per_pixel(PixelFormat::Page), 1);
        assert_eq!(default_bytes_per_pixel(PixelFormat::Other(11)), 1);
    }

    #[test]
    fn stride_rounds_up_to_page() {
        assert_eq!(default_stride(1), PAGE_SIZE);
        assert_eq!(default_stride(PAGE_SIZE), PAGE_SIZE);
        assert_eq!(default_stride(1920 * 4), 2 * PAGE_SIZE);
    }

    #[test]
    fn block_size_of_page_block_is_its_length() {
        for len in [1, 4096, 8192, 12345] {
            assert_eq!(block_size(&BlockDescriptor::page(0x1000, len)), len as usize);
        }
    }

    #[test]
    fn block_size_of_area_block_uses_page_stride() {
        let block = queried(PixelFormat::Bit32, 1920, 1080);
        assert_eq!(block_size(&block), 1080 * 2 * PAGE_SIZE);
    }

    #[test]
    fn oversized_geometry_does_not_overflow() {
        let block = queried(PixelFormat::Bit32, u32::MAX, u32::MAX);
        if usize::BITS == 64 {
            assert_eq!(checked_block_size(&block), None);
            assert_eq!(block_size(&block), usize::MAX);
        }
        let small = queried(PixelFormat::Bit32, 1920, 1080);
        assert_eq!(checked_block_size(&small), Some(block_size(&small)));
    }

    #[test]
    fn page_block_takes_known_length() {
        let mut block = BlockDescriptor::page(0x1000, 0);
        resolve_geometry(&mut block, 8192).unwrap();
        assert_eq!(block.dims, BlockDims::Length(8192));
        assert_eq!(block_size(&block), 8192);
    }

    #[test]
    fn ambiguous_width_picks_narrowest() {
        // 2 pages per row, 100 rows; height 128 admits 2 or 3 pages per row.
        let length = 2 * PAGE * 100;
        let mut block = queried(PixelFormat::Bit32, 4 * PAGE, 128);
        resolve_geometry(&mut block, length).unwrap();

        assert_eq!(
            block.dims,
            BlockDims::Area {
                width: 2048,
                height: 100
            }
        );
        assert_eq!(block.stride, 2048);
        assert_eq!(block_size(&block), length as usize);
    }

    #[test]
    fn resolution_is_deterministic() {
        let length = 2 * PAGE * 100;
        let mut first = queried(PixelFormat::Bit32, 4 * PAGE, 128);
        let mut second = first.clone();
        resolve_geometry(&mut first, length).unwrap();
        resolve_geometry(&mut second, length).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn capacity_clamps_max_width() {
        // Without the clamp 8-bit slack would allow up to 64 pages per row.
        let length = PAGE * 64;
        let mut block = queried(PixelFormat::Bit8, PAGE, 64);
        resolve_geometry(&mut block, length).unwrap();
        assert_eq!(
            block.dims,
            BlockDims::Area {
                width: PAGE,
                height: 64
            }
        );
        assert_eq!(block.stride, PAGE);
    }

    #[test]
    fn short_height_degenerates_to_single_page_width() {
        let length = PAGE * 20;
        let mut block = queried(PixelFormat::Bit16, 2 * PAGE, 20);
        resolve_geometry(&mut block, length).unwrap();
        assert_eq!(
            block.dims,
            BlockDims::Area {
                width: PAGE / 2,
                height: 20
            }
        );
    }

    #[test]
    fn short_wide_block_resolves_within_capacity() {
        // 20 rows of 2 pages: below the 31-page slack, so only the capacity bounds the width.
        let length = 2 * PAGE * 20;
        let mut block = queried(PixelFormat::Bit32, 4 * PAGE, 20);
        resolve_geometry(&mut block, length).unwrap();
        assert_eq!(
            block.dims,
            BlockDims::Area {
                width: 2048,
                height: 20
            }
        );
        assert_eq!(block.stride, 2048);
        assert_eq!(block_size(&block), length as usize);
    }

    #[test]
    fn short_block_wider_than_capacity_is_inconsistent() {
        let mut block = queried(PixelFormat::Bit8, PAGE, 20);
        let err = resolve_geometry(&mut block, 2 * PAGE * 20).unwrap_err();
        assert_eq!(err, GeometryError::EmptyPageWidthRange { min: 2, max: 1 });
    }

    #[test]
    fn other_formats_resolve_as_bytes() {
        let length = PAGE * 40;
        let mut block = queried(PixelFormat::Other(0), PAGE, 40);
        resolve_geometry(&mut block, length).unwrap();
        assert_eq!(block_size(&block), length as usize);
    }

    #[test]
    fn width_beyond_capacity_is_inconsistent() {
        let mut block = queried(PixelFormat::Bit32, 2 * PAGE, 40);
        let err = resolve_geometry(&mut block, 3 * PAGE * 40).unwrap_err();
        assert_eq!(err, GeometryError::EmptyPageWidthRange { min: 3, max: 2 });
    }

    #[test]
    fn unaligned_length_fails_postcondition() {
        let mut block = queried(PixelFormat::Bit8, PAGE, 2);
        let err = resolve_geometry(&mut block, 5000).unwrap_err();
        assert_eq!(
            err,
            GeometryError::SizeMismatch {
                expected: 5000,
                actual: PAGE_SIZE
            }
        );
    }

    #[test]
    fn degenerate_inputs_are_rejected() {
        let mut block = queried(PixelFormat::Bit8, PAGE, 0);
        assert_eq!(resolve_stride(&mut block, PAGE), Err(GeometryError::ZeroHeight));

        let mut block = queried(PixelFormat::Bit8, PAGE, 4);
        assert_eq!(resolve_stride(&mut block, 0), Err(GeometryError::ZeroLength));

        let mut block = BlockDescriptor {
            format: PixelFormat::Bit8,
            dims: BlockDims::Length(PAGE),
            ..BlockDescriptor::default()
        };
        assert_eq!(resolve_stride(&mut block, PAGE), Err(GeometryError::NotAnAreaBlock));
    }
}
