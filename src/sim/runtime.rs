//! Simulated scripting runtime with a tracing-collector model

use crate::allocator::VariantHandle;
use crate::core::{NativePtr, ObjectId};
use crate::runtime::ScriptRuntime;
use tracing::trace;

/// Wrapper object reference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SimObject(u32);

/// Runtime symbol
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SimSymbol(u32);

#[derive(Debug, Default)]
struct ObjectState {
    alive: bool,
    /// Script code still references the wrapper
    reachable: bool,
    /// Finalizer parameter while the wrapper is weak
    weak: Option<NativePtr>,
    native: Option<NativePtr>,
    object_id: Option<ObjectId>,
    invalidated: bool,
    value: Option<VariantHandle>,
    tags: Vec<(SimSymbol, u32)>,
}

#[derive(Debug)]
pub struct SimRuntime {
    objects: Vec<ObjectState>,
    symbols: Vec<&'static str>,
    finalized: Vec<NativePtr>,
    disposed: Vec<VariantHandle>,
    deliver_finalizers: bool,
    collections: u64,
    checkpoints: u64,
    battery_save_mode: bool,
}

impl SimRuntime {
    pub fn new() -> Self {
        Self {
            objects: Vec::new(),
            symbols: Vec::new(),
            finalized: Vec::new(),
            disposed: Vec::new(),
            deliver_finalizers: true,
            collections: 0,
            checkpoints: 0,
            battery_save_mode: false,
        }
    }

    /// Create a wrapper that script code currently references
    pub fn new_object(&mut self) -> SimObject {
        let object = SimObject(self.objects.len() as u32);
        self.objects.push(ObjectState {
            alive: true,
            reachable: true,
            ..ObjectState::default()
        });
        object
    }

    /// Script code drops its last reference to `object`
    pub fn release(&mut self, object: SimObject) {
        if let Some(state) = self.state_mut(object) {
            state.reachable = false;
        }
    }

    /// Script code references `object` again
    pub fn retain(&mut self, object: SimObject) {
        if let Some(state) = self.state_mut(object) {
            if state.alive {
                state.reachable = true;
            }
        }
    }

    /// When false, collected wrappers are reclaimed without any notification
    pub fn set_deliver_finalizers(&mut self, deliver: bool) {
        self.deliver_finalizers = deliver;
    }

    pub fn is_weak(&self, object: SimObject) -> bool {
        self.state(object).map_or(false, |state| state.weak.is_some())
    }

    pub fn native_of(&self, object: SimObject) -> Option<NativePtr> {
        self.state(object).and_then(|state| state.native)
    }

    pub fn object_id_of(&self, object: SimObject) -> Option<ObjectId> {
        self.state(object).and_then(|state| state.object_id)
    }

    pub fn is_invalidated(&self, object: SimObject) -> bool {
        self.state(object).map_or(false, |state| state.invalidated)
    }

    pub fn value_of(&self, object: SimObject) -> Option<VariantHandle> {
        self.state(object).and_then(|state| state.value)
    }

    pub fn tag_of(&self, object: SimObject, symbol: &SimSymbol) -> Option<u32> {
        self.state(object)?
            .tags
            .iter()
            .find(|(tag, _)| tag == symbol)
            .map(|&(_, value)| value)
    }

    pub fn symbol_description(&self, symbol: &SimSymbol) -> Option<&'static str> {
        self.symbols.get(symbol.0 as usize).copied()
    }

    pub fn live_objects(&self) -> usize {
        self.objects.iter().filter(|state| state.alive).count()
    }

    pub fn collections(&self) -> u64 {
        self.collections
    }

    pub fn checkpoints(&self) -> u64 {
        self.checkpoints
    }

    pub fn battery_save_mode(&self) -> bool {
        self.battery_save_mode
    }

    fn state(&self, object: SimObject) -> Option<&ObjectState> {
        self.objects.get(object.0 as usize)
    }

    fn state_mut(&mut self, object: SimObject) -> Option<&mut ObjectState> {
        self.objects.get_mut(object.0 as usize)
    }
}

impl Default for SimRuntime {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptRuntime for SimRuntime {
    type Object = SimObject;
    type Symbol = SimSymbol;

    fn new_symbol(&mut self, description: &'static str) -> SimSymbol {
        let symbol = SimSymbol(self.symbols.len() as u32);
        self.symbols.push(description);
        symbol
    }

    fn embed(&mut self, object: &SimObject, pointer: NativePtr, object_id: ObjectId) {
        if let Some(state) = self.state_mut(*object) {
            state.native = Some(pointer);
            state.object_id = Some(object_id);
            state.invalidated = false;
        }
    }

    fn tag(&mut self, object: &SimObject, symbol: &SimSymbol, value: u32) {
        if let Some(state) = self.state_mut(*object) {
            state.tags.retain(|(tag, _)| tag != symbol);
            state.tags.push((*symbol, value));
        }
    }

    fn set_weak(&mut self, object: &SimObject, pointer: NativePtr) {
        if let Some(state) = self.state_mut(*object) {
            state.weak = Some(pointer);
        }
    }

    fn clear_weak(&mut self, object: &SimObject) {
        if let Some(state) = self.state_mut(*object) {
            state.weak = None;
        }
    }

    fn is_alive(&self, object: &SimObject) -> bool {
        self.state(*object).map_or(false, |state| state.alive)
    }

    fn invalidate(&mut self, object: &SimObject) {
        if let Some(state) = self.state_mut(*object) {
            state.native = None;
            state.object_id = None;
            state.weak = None;
            state.invalidated = true;
        }
    }

    fn attach_value(&mut self, object: &SimObject, value: VariantHandle) {
        if let Some(state) = self.state_mut(*object) {
            state.value = Some(value);
        }
    }

    /// Reclaim unreachable wrappers the bridge does not root
    ///
    /// A wrapper is rooted by the bridge while it is bound and not weak.
    fn collect_garbage(&mut self) {
        self.collections += 1;
        let deliver = self.deliver_finalizers;
        let mut collected = 0usize;

        for state in self.objects.iter_mut().filter(|state| state.alive && !state.reachable) {
            let rooted = state.native.is_some() && state.weak.is_none();
            if rooted {
                continue;
            }

            state.alive = false;
            collected += 1;
            if let Some(pointer) = state.weak.take() {
                if deliver {
                    self.finalized.push(pointer);
                }
            }
            if let Some(value) = state.value.take() {
                if deliver {
                    self.disposed.push(value);
                }
            }
        }
        trace!(event = "sim_collect", collected, "simulated collection");
    }

    fn take_finalized(&mut self) -> Vec<NativePtr> {
        std::mem::take(&mut self.finalized)
    }

    fn take_disposed_values(&mut self) -> Vec<VariantHandle> {
        std::mem::take(&mut self.disposed)
    }

    fn perform_microtask_checkpoint(&mut self) {
        self.checkpoints += 1;
    }

    fn set_battery_save_mode(&mut self, enabled: bool) {
        self.battery_save_mode = enabled;
    }
}
