//! Collaborator seams - the scripting runtime and the native object model
//!
//! The bridge never touches either side directly. An embedder implements
//! [`ScriptRuntime`] over its script engine and [`NativeHost`] over its
//! native object system; `sim` provides in-process versions of both.

use crate::allocator::VariantHandle;
use crate::core::{NativePtr, ObjectId};
use std::fmt;

/// Embeddable garbage-collected scripting runtime
///
/// Finalization is best effort: the runtime reports collected weak
/// wrappers through [`take_finalized`](Self::take_finalized) when it gets
/// around to it, or never. Notifications are always drained on the thread
/// that owns the environment.
pub trait ScriptRuntime {
    /// Reference to a script-side wrapper object
    type Object: Clone + fmt::Debug;
    /// Runtime symbol used as a metadata key
    type Symbol: Clone + fmt::Debug;

    fn new_symbol(&mut self, description: &'static str) -> Self::Symbol;

    /// Store the native pointer and handle id in the wrapper's internal fields
    fn embed(&mut self, object: &Self::Object, pointer: NativePtr, object_id: ObjectId);

    /// Attach symbol-keyed metadata to a wrapper
    fn tag(&mut self, object: &Self::Object, symbol: &Self::Symbol, value: u32);

    /// Make the wrapper collectable and register a finalizer for `pointer`
    fn set_weak(&mut self, object: &Self::Object, pointer: NativePtr);

    /// Root the wrapper again, cancelling any pending finalizer
    fn clear_weak(&mut self, object: &Self::Object);

    fn is_alive(&self, object: &Self::Object) -> bool;

    /// Detach a wrapper from its native object after the native side is gone
    fn invalidate(&mut self, object: &Self::Object);

    /// Give the wrapper ownership of a pooled value payload
    ///
    /// Disposal is reported through [`take_disposed_values`](Self::take_disposed_values).
    fn attach_value(&mut self, object: &Self::Object, value: VariantHandle);

    /// Request a full collection
    fn collect_garbage(&mut self);

    /// Pointers whose weak wrappers were finalized since the last call
    fn take_finalized(&mut self) -> Vec<NativePtr>;

    /// Value payloads whose wrappers were disposed since the last call
    fn take_disposed_values(&mut self) -> Vec<VariantHandle>;

    fn perform_microtask_checkpoint(&mut self);

    fn set_battery_save_mode(&mut self, _enabled: bool) {}
}

/// Native object model with intrusive reference counts
///
/// Absolute reference counts live here only; the bridge asks instead of
/// mirroring them.
pub trait NativeHost {
    fn is_ref_counted(&self, pointer: NativePtr) -> bool;

    /// Take one native reference
    fn reference(&mut self, pointer: NativePtr);

    /// Drop one native reference, true when the count reached zero
    fn unreference(&mut self, pointer: NativePtr) -> bool;

    /// Current native reference count, including any the bridge holds
    fn reference_count(&self, pointer: NativePtr) -> u32;

    /// Destroy the native object
    fn destroy(&mut self, pointer: NativePtr);
}
