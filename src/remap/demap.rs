use crate::error::{RemapError, RemapResult};
use crate::remap::remapper::Remapper;
use crate::remap::types::{BufferDescriptor, MappedRegion};
use crate::tiler::{DriverSession, TilerDriver};
use crate::translate::AddressTranslator;
use crate::utils::page_align_down;
use log::{debug, error};

impl<D: TilerDriver, T: AddressTranslator> Remapper<D, T> {
    /// Releases a buffer returned by [`remap`](Self::remap).
    ///
    /// Once the pointer is found the buffer is forgotten, even if a later step fails, so a
    /// second demap of the same pointer always misses. Unregistration and unmapping are both
    /// attempted; their failures are reported together.
    ///
    /// # Errors
    /// [`RemapError::CacheMiss`] if `ptr` is not a live remapped buffer, otherwise the driver
    /// or unmap faults encountered.
    pub fn demap(&self, ptr: *const u8) -> RemapResult<()> {
        self.demap_addr(ptr as usize)
    }

    /// [`demap`](Self::demap) by address.
    ///
    /// # Errors
    /// See [`demap`](Self::demap).
    pub fn demap_addr(&self, addr: usize) -> RemapResult<()> {
        let result = self.demap_inner(addr);
        if let Err(e) = &result {
            error!("demap 0x{addr:x} failed: {e}");
        }
        result
    }

    /// Pointer-level [`demap`](Self::demap): `0` on success, a negative status otherwise.
    pub fn demap_ptr(&self, ptr: *const u8) -> i32 {
        match self.demap(ptr) {
            Ok(()) => 0,
            Err(e) => e.status_code(),
        }
    }

    fn demap_inner(&self, addr: usize) -> RemapResult<()> {
        let mut session = self.driver.open_session()?;

        let buffer_id = self
            .cache
            .remove_by_pointer(addr)
            .ok_or(RemapError::CacheMiss(addr))?;

        let mut buffer = BufferDescriptor::registered(buffer_id);
        debug!("==(QBUF)=> {buffer}");
        session
            .query_buffer(&mut buffer)
            .map_err(RemapError::BufferQuery)?;
        debug!("<=(QBUF)== {buffer}");

        let mut faults = Vec::new();

        debug!("==(URBUF)=> {buffer}");
        if let Err(e) = session.unregister_buffer(&buffer) {
            faults.push(RemapError::Unregistration(e));
        }
        debug!("<=(URBUF)== {buffer}");

        let region = MappedRegion::new(page_align_down(addr), buffer.total_size());
        if let Err(source) = session.unmap(region) {
            faults.push(RemapError::Unmap {
                addr: region.base,
                size: region.len,
                source,
            });
        }

        match faults.len() {
            0 => Ok(()),
            1 => Err(faults.remove(0)),
            _ => Err(RemapError::Compound(faults)),
        }
    }
}
