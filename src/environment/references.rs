//! Reference-counting bridge - native refcount changes vs wrapper survival
//!
//! The bridge never counts references itself. It asks the host for the
//! current count and keeps one bit per handle: is the wrapper weak (script
//! decides) or rooted (native decides). While native code holds references
//! beyond the bridge's own, the wrapper is rooted; once the bridge's
//! reference is the last one, the wrapper turns weak and the collector
//! decides when the pair dies.

use super::Environment;
use crate::core::{NativePtr, ObjectId};
use crate::handles::{Ownership, ReferencePolicy, Teardown};
use crate::logging::{log_ownership_flip, log_persistent};
use crate::runtime::{NativeHost, ScriptRuntime};
use tracing::warn;

impl<R: ScriptRuntime, H: NativeHost> Environment<R, H> {
    /// React to a native reference count change of `pointer`
    ///
    /// Called by the host after the count changed. Returns whether the
    /// native object may die now. Unbound pointers can always die; a live
    /// wrapper defers native death to collector finalization. When the
    /// wrapper is already dead the binding is dropped along with the
    /// bridge's reference, which may destroy the object on the spot.
    pub fn on_reference_request(&mut self, pointer: NativePtr, increment: bool) -> bool {
        self.check_internal_state();

        let Some(id) = self.objects.lookup(pointer) else {
            return true;
        };

        if increment {
            self.on_reference_increment(pointer, id);
            false
        } else {
            self.on_reference_decrement(pointer, id)
        }
    }

    fn on_reference_increment(&mut self, pointer: NativePtr, id: ObjectId) {
        let count = self.host.reference_count(pointer);
        let Some(handle) = self.objects.resolve_mut(id) else {
            return;
        };

        if handle.ownership != Ownership::Script || count <= handle.holds_reference as u32 {
            return;
        }
        // a collected wrapper cannot be rooted again
        let Some(wrapper) = handle
            .wrapper
            .as_ref()
            .filter(|wrapper| handle.wrapper_alive && self.runtime.is_alive(wrapper))
        else {
            return;
        };

        self.runtime.clear_weak(wrapper);
        let to = if handle.holds_reference { Ownership::Shared } else { Ownership::Native };
        handle.ownership = to;
        handle.release_deferred = false;

        self.counters.ownership_flips += 1;
        log_ownership_flip(pointer, Ownership::Script, to);
    }

    fn on_reference_decrement(&mut self, pointer: NativePtr, id: ObjectId) -> bool {
        if self.objects.is_persistent(pointer) {
            return false;
        }

        let count = self.host.reference_count(pointer);
        let Some(handle) = self.objects.resolve_mut(id) else {
            return true;
        };

        // pinned for the lifetime of the handle
        if handle.policy == ReferencePolicy::ReferenceAlways && handle.holds_reference {
            return false;
        }
        if count > handle.holds_reference as u32 {
            return false;
        }

        let alive = handle.wrapper_alive
            && handle.wrapper.as_ref().map_or(false, |wrapper| self.runtime.is_alive(wrapper));

        if alive && handle.holds_reference {
            // the bridge holds the last reference: hand the pair to the collector
            if handle.ownership != Ownership::Script {
                if let Some(wrapper) = handle.wrapper.as_ref() {
                    self.runtime.set_weak(wrapper, pointer);
                }
                let from = handle.ownership;
                handle.ownership = Ownership::Script;
                self.counters.ownership_flips += 1;
                log_ownership_flip(pointer, from, Ownership::Script);
            }
            handle.release_deferred = true;
            return false;
        }

        // nothing keeps the pair alive; the bridge's own reference goes with
        // the binding, otherwise the native count never reaches zero
        if handle.holds_reference {
            self.free_object(pointer, Teardown::Explicit, true);
        } else {
            self.unbind_pointer(pointer);
        }
        true
    }

    /// Root the wrapper of `pointer` regardless of script reachability
    ///
    /// Persistence lasts until the pointer is unbound. Returns false when
    /// the pointer is not bound.
    pub fn mark_persistent(&mut self, pointer: NativePtr) -> bool {
        self.check_internal_state();

        if self.objects.lookup(pointer).is_none() {
            return false;
        }
        if !self.objects.mark_persistent(pointer) {
            warn!(event = "persistent_twice", pointer = %pointer, "object already persistent");
            return true;
        }

        if let Some(handle) = self.objects.handle_mut(pointer) {
            handle.release_deferred = false;
            if handle.ownership == Ownership::Script {
                if let Some(wrapper) = handle.wrapper.as_ref() {
                    self.runtime.clear_weak(wrapper);
                }
                let to = if handle.holds_reference { Ownership::Shared } else { Ownership::Native };
                handle.ownership = to;
                self.counters.ownership_flips += 1;
                log_ownership_flip(pointer, Ownership::Script, to);
            }
        }

        log_persistent(pointer);
        true
    }
}
