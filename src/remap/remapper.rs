use crate::error::{RemapError, RemapResult};
use crate::remap::cache::HandleCache;
use crate::remap::geometry::{block_size, resolve_geometry};
use crate::remap::types::{BlockDescriptor, BufferDescriptor, DsPtr, RemappedBuffer};
use crate::tiler::device::TilerDevice;
use crate::tiler::ioctl::TILER_MAX_NUM_BLOCKS;
use crate::tiler::{DriverSession, TilerDriver};
use crate::translate::{AddressTranslator, IdentityTranslator};
use crate::utils::page_offset;
use log::{debug, error};
use std::ptr;
use std::sync::Arc;

/// Maps sets of device blocks into one contiguous range of this process and back.
///
/// Each call opens its own driver session. The only state shared between calls is the
/// [`HandleCache`], so a `Remapper` can be used from several threads at once.
#[derive(Debug)]
pub struct Remapper<D, T = IdentityTranslator> {
    pub(crate) driver: D,
    translator: T,
    pub(crate) cache: Arc<HandleCache>,
}

impl Default for Remapper<TilerDevice> {
    fn default() -> Self {
        Self::new(TilerDevice::default(), IdentityTranslator)
    }
}

impl<D: TilerDriver, T: AddressTranslator> Remapper<D, T> {
    pub fn new(driver: D, translator: T) -> Self {
        Self::with_cache(driver, translator, Arc::new(HandleCache::new()))
    }

    /// Builds a remapper that records its buffers in `cache`.
    pub fn with_cache(driver: D, translator: T, cache: Arc<HandleCache>) -> Self {
        Self {
            driver,
            translator,
            cache,
        }
    }

    #[must_use]
    pub fn driver(&self) -> &D {
        &self.driver
    }

    #[must_use]
    pub fn cache(&self) -> &Arc<HandleCache> {
        &self.cache
    }

    /// Remaps the blocks behind `dsptrs` into one process mapping.
    ///
    /// `lengths[i]` is the byte length the caller allocated for block `i`; the driver does not
    /// keep it. The blocks appear back to back in the mapping in the order given.
    ///
    /// # Errors
    /// Fails without contacting the driver if the block count is outside
    /// `1..=TILER_MAX_NUM_BLOCKS` or the slices differ in length. Any later fault is returned
    /// after undoing the driver-side registration, if one was made.
    pub fn remap(&self, dsptrs: &[DsPtr], lengths: &[u32]) -> RemapResult<RemappedBuffer> {
        let count = dsptrs.len();
        if count == 0 || count > TILER_MAX_NUM_BLOCKS {
            return Err(RemapError::InvalidBlockCount(count));
        }
        if lengths.len() != count {
            return Err(RemapError::LengthCountMismatch {
                pointers: count,
                lengths: lengths.len(),
            });
        }

        let mut session = self.driver.open_session().inspect_err(|e| {
            error!("remap: cannot open tiler session: {e}");
        })?;

        let result = self.remap_blocks(&mut session, dsptrs, lengths);
        drop(session);

        match &result {
            Ok(buffer) => debug!("remap: ptr=0x{:x}", buffer.addr()),
            Err(e) => error!("remap failed: {e}"),
        }
        result
    }

    /// Pointer-level [`remap`](Self::remap): null on any failure.
    pub fn remap_ptr(&self, dsptrs: &[DsPtr], lengths: &[u32]) -> *mut u8 {
        self.remap(dsptrs, lengths)
            .map_or(ptr::null_mut(), |buffer| buffer.as_ptr())
    }

    fn remap_blocks(
        &self,
        session: &mut D::Session,
        dsptrs: &[DsPtr],
        lengths: &[u32],
    ) -> RemapResult<RemappedBuffer> {
        let mut buffer = BufferDescriptor::with_capacity(dsptrs.len());
        let mut size = 0;

        for (index, (&dsptr, &length)) in dsptrs.iter().zip(lengths).enumerate() {
            let ssptr = self.translator.to_ssptr(dsptr);
            if ssptr == 0 {
                return Err(RemapError::Translation { index, dsptr });
            }

            let mut block = BlockDescriptor::new(ssptr);
            debug!("=(qb)=> {block}");
            session
                .query_block(&mut block)
                .map_err(|source| RemapError::DriverQuery { index, source })?;
            debug!("<=(qb)= {block}");

            if block.ssptr == 0 {
                return Err(RemapError::UnallocatedBlock {
                    index,
                    dsptr,
                    ssptr,
                });
            }

            resolve_geometry(&mut block, length)
                .map_err(|source| RemapError::Geometry { index, source })?;

            size += block_size(&block);
            buffer.blocks.push(block);
        }

        debug!("==(RBUF)=> {buffer}");
        session
            .register_buffer(&mut buffer)
            .map_err(RemapError::Registration)?;
        debug!("<=(RBUF)== {buffer}");
        if !buffer.is_registered() {
            return Err(RemapError::InvalidBufferId);
        }

        let region = match session.map(size, buffer.buffer_id) {
            Ok(region) => region,
            Err(source) => {
                let mapping = RemapError::Mapping {
                    size,
                    offset: buffer.buffer_id,
                    source,
                };
                return Err(match session.unregister_buffer(&buffer) {
                    Ok(()) => mapping,
                    Err(e) => RemapError::Compound(vec![mapping, RemapError::Unregistration(e)]),
                });
            }
        };

        // The mapping starts on a page boundary; the first block may not.
        let offset = page_offset(buffer.blocks[0].ssptr as usize);
        let addr = region.base + offset;
        self.cache.add(addr, buffer.buffer_id);

        let mut running = addr;
        for block in &mut buffer.blocks {
            block.ptr = Some(running);
            running += block_size(block);
        }

        Ok(RemappedBuffer::new(region, offset, buffer))
    }
}
