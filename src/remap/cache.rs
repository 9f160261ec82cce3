use crate::remap::types::BufferId;
use log::warn;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Maps the address returned by a remap to the tiler buffer id backing it.
///
/// Only demap needs this: it gets nothing but the pointer and has to hand the buffer id back
/// to the driver. Removal is the only lookup, so each id is served at most once.
#[derive(Debug, Default)]
pub struct HandleCache {
    entries: Mutex<HashMap<usize, BufferId>>,
}

impl HandleCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // Every operation is a single insert or remove, so a poisoned map is still consistent.
    fn lock(&self) -> MutexGuard<'_, HashMap<usize, BufferId>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Records that `addr` is backed by `buffer_id`.
    pub fn add(&self, addr: usize, buffer_id: BufferId) {
        debug_assert_ne!(buffer_id, 0, "buffer id 0 is never registered");
        if let Some(previous) = self.lock().insert(addr, buffer_id) {
            warn!("remap cache: 0x{addr:x} was still tracking buffer 0x{previous:x}");
        }
    }

    /// Takes the buffer id recorded for `addr`, if any.
    pub fn remove_by_pointer(&self, addr: usize) -> Option<BufferId> {
        self.lock().remove(&addr)
    }

    #[must_use]
    pub fn contains(&self, addr: usize) -> bool {
        self.lock().contains_key(&addr)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}
