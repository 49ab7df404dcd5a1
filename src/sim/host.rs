//! Simulated native object model

use crate::core::NativePtr;
use crate::runtime::NativeHost;
use rustc_hash::FxHashMap;
use std::cell::RefCell;
use std::rc::Rc;
use tracing::warn;

/// First fake address handed out
const BASE_ADDRESS: NativePtr = match NativePtr::new(0x1000) {
    Some(pointer) => pointer,
    None => panic!("base address is null"),
};
const ADDRESS_STEP: usize = 0x10;

#[derive(Debug, Clone, Copy)]
struct NativeObject {
    ref_counted: bool,
    count: u32,
    destroyed: bool,
}

#[derive(Debug)]
struct HostState {
    objects: FxHashMap<NativePtr, NativeObject>,
    next_address: NativePtr,
    bridge_references: u64,
    bridge_unreferences: u64,
    destroyed: u64,
    /// Destroy or unreference of an object that was already destroyed
    double_frees: u64,
}

impl HostState {
    fn object_mut(&mut self, pointer: NativePtr) -> Option<&mut NativeObject> {
        match self.objects.get_mut(&pointer) {
            Some(object) if !object.destroyed => Some(object),
            _ => {
                self.double_frees += 1;
                warn!(event = "sim_use_after_free", pointer = %pointer, "native object already destroyed");
                None
            }
        }
    }

    fn destroy(&mut self, pointer: NativePtr) {
        if let Some(object) = self.object_mut(pointer) {
            object.destroyed = true;
            object.count = 0;
            self.destroyed += 1;
        }
    }
}

/// Native host with fake addresses and intrusive reference counts
#[derive(Debug, Clone)]
pub struct SimHost {
    state: Rc<RefCell<HostState>>,
}

/// Read-only view of a [`SimHost`] that outlives the environment owning it
#[derive(Debug, Clone)]
pub struct HostProbe {
    state: Rc<RefCell<HostState>>,
}

impl SimHost {
    pub fn new() -> Self {
        Self {
            state: Rc::new(RefCell::new(HostState {
                objects: FxHashMap::default(),
                next_address: BASE_ADDRESS,
                bridge_references: 0,
                bridge_unreferences: 0,
                destroyed: 0,
                double_frees: 0,
            })),
        }
    }

    pub fn probe(&self) -> HostProbe {
        HostProbe {
            state: Rc::clone(&self.state),
        }
    }

    /// Create a native object at the next free address with no references
    pub fn spawn(&mut self, ref_counted: bool) -> NativePtr {
        let mut state = self.state.borrow_mut();
        let pointer = state.next_address;
        state.next_address = NativePtr::new(pointer.addr().wrapping_add(ADDRESS_STEP)).unwrap_or(BASE_ADDRESS);
        Self::insert(&mut state, pointer, ref_counted);
        pointer
    }

    /// Create a native object at a fixed address
    ///
    /// Reusing the address of a destroyed object models the allocator
    /// handing the same memory out again.
    pub fn spawn_at(&mut self, address: usize, ref_counted: bool) -> Option<NativePtr> {
        let pointer = NativePtr::new(address)?;
        let mut state = self.state.borrow_mut();
        if state.objects.get(&pointer).map_or(false, |object| !object.destroyed) {
            return None;
        }
        Self::insert(&mut state, pointer, ref_counted);
        Some(pointer)
    }

    fn insert(state: &mut HostState, pointer: NativePtr, ref_counted: bool) {
        state.objects.insert(
            pointer,
            NativeObject {
                ref_counted,
                count: 0,
                destroyed: false,
            },
        );
    }

    /// Native code takes a reference
    pub fn retain(&mut self, pointer: NativePtr) {
        if let Some(object) = self.state.borrow_mut().object_mut(pointer) {
            object.count += 1;
        }
    }

    /// Native code drops a reference, true when the count reached zero
    pub fn release(&mut self, pointer: NativePtr) -> bool {
        match self.state.borrow_mut().object_mut(pointer) {
            Some(object) => {
                object.count = object.count.saturating_sub(1);
                object.count == 0
            }
            None => false,
        }
    }

    /// Native code destroys the object itself
    pub fn destroy_native(&mut self, pointer: NativePtr) {
        self.state.borrow_mut().destroy(pointer);
    }
}

impl Default for SimHost {
    fn default() -> Self {
        Self::new()
    }
}

impl NativeHost for SimHost {
    fn is_ref_counted(&self, pointer: NativePtr) -> bool {
        self.state
            .borrow()
            .objects
            .get(&pointer)
            .map_or(false, |object| object.ref_counted)
    }

    fn reference(&mut self, pointer: NativePtr) {
        let mut state = self.state.borrow_mut();
        state.bridge_references += 1;
        if let Some(object) = state.object_mut(pointer) {
            object.count += 1;
        }
    }

    fn unreference(&mut self, pointer: NativePtr) -> bool {
        let mut state = self.state.borrow_mut();
        state.bridge_unreferences += 1;
        match state.object_mut(pointer) {
            Some(object) => {
                object.count = object.count.saturating_sub(1);
                object.count == 0
            }
            None => false,
        }
    }

    fn reference_count(&self, pointer: NativePtr) -> u32 {
        self.state.borrow().objects.get(&pointer).map_or(0, |object| object.count)
    }

    fn destroy(&mut self, pointer: NativePtr) {
        self.state.borrow_mut().destroy(pointer);
    }
}

impl HostProbe {
    pub fn reference_count(&self, pointer: NativePtr) -> u32 {
        self.state.borrow().objects.get(&pointer).map_or(0, |object| object.count)
    }

    pub fn is_destroyed(&self, pointer: NativePtr) -> bool {
        self.state
            .borrow()
            .objects
            .get(&pointer)
            .map_or(false, |object| object.destroyed)
    }

    /// Objects spawned and not destroyed
    pub fn live(&self) -> usize {
        self.state.borrow().objects.values().filter(|object| !object.destroyed).count()
    }

    pub fn destroyed(&self) -> u64 {
        self.state.borrow().destroyed
    }

    /// References taken through the bridge
    pub fn bridge_references(&self) -> u64 {
        self.state.borrow().bridge_references
    }

    /// References released through the bridge
    pub fn bridge_unreferences(&self) -> u64 {
        self.state.borrow().bridge_unreferences
    }

    pub fn double_frees(&self) -> u64 {
        self.state.borrow().double_frees
    }
}
