use crate::remap::types::{DsPtr, SsPtr};

/// Resolves device-side pointers to tiler driver pointers.
///
/// A return value of `0` means the device pointer is not backed by a tiler block.
pub trait AddressTranslator {
    fn to_ssptr(&self, dsptr: DsPtr) -> SsPtr;
}

/// Used when device and driver share one address space.
#[derive(Debug, Default, Clone, Copy)]
pub struct IdentityTranslator;

impl AddressTranslator for IdentityTranslator {
    fn to_ssptr(&self, dsptr: DsPtr) -> SsPtr {
        dsptr
    }
}

impl<F> AddressTranslator for F
where
    F: Fn(DsPtr) -> SsPtr,
{
    fn to_ssptr(&self, dsptr: DsPtr) -> SsPtr {
        self(dsptr)
    }
}
