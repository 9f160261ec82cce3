#![allow(dead_code)]

use std::collections::HashMap;
use std::io;
use std::sync::{Arc, Mutex, MutexGuard};
use tiler_remap::{
    BlockDescriptor, BufferDescriptor, BufferId, DriverSession, MappedRegion, PixelFormat,
    SsPtr, TilerDriver,
};

pub const MAP_BASE: usize = 0x4000_0000;
const MAP_STEP: usize = 0x0100_0000;
const ID_STEP: BufferId = 0x0010_0000;

/// What the fake driver knows and what it was asked to do.
#[derive(Debug)]
pub struct MockState {
    pub blocks: HashMap<SsPtr, BlockDescriptor>,
    pub registered: HashMap<BufferId, Vec<BlockDescriptor>>,
    pub mappings: HashMap<usize, usize>,
    pub unmapped: Vec<MappedRegion>,

    pub sessions_opened: usize,
    pub sessions_closed: usize,
    pub register_calls: usize,
    pub unregister_calls: usize,

    pub fail_open: bool,
    pub fail_query_block: bool,
    pub fail_map: bool,
    pub fail_unregister: bool,
    pub fail_unmap: bool,
    pub zero_buffer_id: bool,

    next_id: BufferId,
    next_base: usize,
}

impl Default for MockState {
    fn default() -> Self {
        Self {
            blocks: HashMap::new(),
            registered: HashMap::new(),
            mappings: HashMap::new(),
            unmapped: Vec::new(),
            sessions_opened: 0,
            sessions_closed: 0,
            register_calls: 0,
            unregister_calls: 0,
            fail_open: false,
            fail_query_block: false,
            fail_map: false,
            fail_unregister: false,
            fail_unmap: false,
            zero_buffer_id: false,
            next_id: ID_STEP,
            next_base: MAP_BASE,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct MockDriver {
    state: Arc<Mutex<MockState>>,
}

impl MockDriver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap()
    }

    /// Records a page-mode block; the driver does not keep its length.
    pub fn add_page_block(&self, ssptr: SsPtr) {
        self.state()
            .blocks
            .insert(ssptr, BlockDescriptor::page(ssptr, 0));
    }

    /// Records a 2D block with the capacity width (bytes) and overshoot height the driver reports.
    pub fn add_area_block(&self, ssptr: SsPtr, format: PixelFormat, width: u32, height: u32) {
        self.state()
            .blocks
            .insert(ssptr, BlockDescriptor::area(ssptr, format, width, height));
    }
}

impl TilerDriver for MockDriver {
    type Session = MockSession;

    fn open_session(&self) -> io::Result<MockSession> {
        let mut state = self.state();
        if state.fail_open {
            return Err(io::Error::from_raw_os_error(libc::ENODEV));
        }
        state.sessions_opened += 1;
        Ok(MockSession {
            state: Arc::clone(&self.state),
        })
    }
}

pub struct MockSession {
    state: Arc<Mutex<MockState>>,
}

impl MockSession {
    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap()
    }
}

impl Drop for MockSession {
    fn drop(&mut self) {
        self.state().sessions_closed += 1;
    }
}

impl DriverSession for MockSession {
    fn query_block(&mut self, block: &mut BlockDescriptor) -> io::Result<()> {
        let state = self.state();
        if state.fail_query_block {
            return Err(io::Error::from_raw_os_error(libc::EFAULT));
        }
        match state.blocks.get(&block.ssptr) {
            Some(known) => *block = known.clone(),
            None => block.ssptr = 0,
        }
        Ok(())
    }

    fn register_buffer(&mut self, buffer: &mut BufferDescriptor) -> io::Result<()> {
        let mut state = self.state();
        state.register_calls += 1;
        if state.zero_buffer_id {
            buffer.buffer_id = 0;
            return Ok(());
        }
        let id = state.next_id;
        state.next_id += ID_STEP;
        state.registered.insert(id, buffer.blocks.clone());
        buffer.buffer_id = id;
        Ok(())
    }

    fn query_buffer(&mut self, buffer: &mut BufferDescriptor) -> io::Result<()> {
        let blocks = self
            .state()
            .registered
            .get(&buffer.buffer_id)
            .cloned()
            .ok_or_else(|| io::Error::from_raw_os_error(libc::EINVAL))?;
        buffer.blocks = blocks;
        Ok(())
    }

    fn unregister_buffer(&mut self, buffer: &BufferDescriptor) -> io::Result<()> {
        let mut state = self.state();
        state.unregister_calls += 1;
        if state.fail_unregister {
            return Err(io::Error::from_raw_os_error(libc::EBUSY));
        }
        state
            .registered
            .remove(&buffer.buffer_id)
            .map(drop)
            .ok_or_else(|| io::Error::from_raw_os_error(libc::EINVAL))
    }

    fn map(&mut self, size: usize, buffer_id: BufferId) -> io::Result<MappedRegion> {
        let mut state = self.state();
        if state.fail_map || !state.registered.contains_key(&buffer_id) {
            return Err(io::Error::from_raw_os_error(libc::ENOMEM));
        }
        let base = state.next_base;
        state.next_base += MAP_STEP;
        state.mappings.insert(base, size);
        Ok(MappedRegion::new(base, size))
    }

    fn unmap(&mut self, region: MappedRegion) -> io::Result<()> {
        let mut state = self.state();
        state.unmapped.push(region);
        if state.fail_unmap {
            return Err(io::Error::from_raw_os_error(libc::EINVAL));
        }
        match state.mappings.get(&region.base) {
            Some(&size) if size == region.len => {
                state.mappings.remove(&region.base);
                Ok(())
            }
            _ => Err(io::Error::from_raw_os_error(libc::EINVAL)),
        }
    }
}
