//! Binding protocol - wrapping native pointers and tearing the link down
//!
//! A binding ends in one of three ways: the collector finalizes the
//! wrapper, the native side unbinds explicitly, or the shutdown sweep
//! reaches it. All three funnel through the handle table's idempotent
//! `unbind`, so whichever comes second finds nothing left to do.

use super::{Environment, Symbol};
use crate::allocator::{Variant, VariantHandle};
use crate::core::{ClassId, NativePtr, ObjectId};
use crate::errors::{BridgeError, Result};
use crate::handles::{ObjectHandle, Ownership, ReferencePolicy, Teardown};
use crate::logging::{log_bind, log_finalized, log_unbind};
use crate::registry::ClassKind;
use crate::runtime::{NativeHost, ScriptRuntime};
use tracing::{trace, warn};

impl<R: ScriptRuntime, H: NativeHost> Environment<R, H> {
    /// Bind `pointer` to `wrapper` as an instance of `class_id`
    ///
    /// Takes a native reference when the policy asks for one and the class
    /// is a reference-counted host object. A wrapper owned by script alone
    /// is made weak so the collector can finalize it.
    pub fn bind_pointer(
        &mut self,
        class_id: ClassId,
        pointer: NativePtr,
        wrapper: R::Object,
        policy: ReferencePolicy,
    ) -> Result<ObjectId> {
        self.check_internal_state();

        let class = self.classes.get(class_id)?;
        let kind = class.kind();
        if kind == ClassKind::HostPrimitiveValue {
            return Err(BridgeError::ValueTypeNotTrackable {
                class_id,
                name: class.name().clone(),
            });
        }

        let id = self.objects.bind(pointer, class_id, wrapper.clone(), policy)?;
        let holds_reference =
            policy.takes_reference() && kind == ClassKind::HostObject && self.host.is_ref_counted(pointer);
        if holds_reference {
            self.host.reference(pointer);
        }

        // native code already holding references keeps the wrapper rooted
        let shared_at_bind = holds_reference && self.host.reference_count(pointer) > 1;
        let ownership = match policy {
            ReferencePolicy::NoReference => Ownership::Native,
            ReferencePolicy::Reference if shared_at_bind => Ownership::Shared,
            ReferencePolicy::Reference => Ownership::Script,
            ReferencePolicy::ReferenceAlways if holds_reference => Ownership::Shared,
            ReferencePolicy::ReferenceAlways => Ownership::Native,
        };
        if let Some(handle) = self.objects.resolve_mut(id) {
            handle.holds_reference = holds_reference;
            handle.ownership = ownership;
        }

        self.runtime.embed(&wrapper, pointer, id);
        self.runtime.tag(&wrapper, self.symbols.get(Symbol::ClassId), class_id.index());
        if ownership.is_weak() {
            self.runtime.set_weak(&wrapper, pointer);
        }

        self.counters.bound += 1;
        log_bind(pointer, id, class_id, policy, holds_reference);
        Ok(id)
    }

    /// Bind a host object with the default `Reference` policy
    pub fn bind_host_object(&mut self, class_id: ClassId, pointer: NativePtr, wrapper: R::Object) -> Result<ObjectId> {
        let class = self.classes.get(class_id)?;
        if class.kind() != ClassKind::HostObject {
            return Err(BridgeError::NotHostObject {
                class_id,
                name: class.name().clone(),
            });
        }
        self.bind_pointer(class_id, pointer, wrapper, ReferencePolicy::Reference)
    }

    /// Give `wrapper` a private pooled copy of `value`
    ///
    /// Value types are never identity-tracked; the payload lives until the
    /// runtime reports the wrapper disposed, or until the pool goes away.
    pub fn bind_value_type(&mut self, class_id: ClassId, wrapper: R::Object, value: Variant) -> Result<VariantHandle> {
        self.check_internal_state();

        let class = self.classes.get(class_id)?;
        if class.kind() != ClassKind::HostPrimitiveValue {
            return Err(BridgeError::NotValueType {
                class_id,
                name: class.name().clone(),
            });
        }

        let handle = self.variants.alloc(value);
        self.runtime.attach_value(&wrapper, handle);
        self.runtime.tag(&wrapper, self.symbols.get(Symbol::ClassId), class_id.index());
        trace!(event = "bind_value", handle = %handle, class_id = class_id.index(), "value bound");
        Ok(handle)
    }

    /// Return a value payload to the pool, false if it was already freed
    pub fn dispose_value(&mut self, handle: VariantHandle) -> bool {
        self.check_internal_state();
        let disposed = self.variants.free(handle).is_some();
        if disposed {
            self.counters.values_disposed += 1;
        }
        disposed
    }

    /// Forget `pointer` because the native side is destroying it
    ///
    /// The wrapper is invalidated and no native reference is released.
    /// Unbinding an unbound pointer is a no-op that returns false.
    pub fn unbind_pointer(&mut self, pointer: NativePtr) -> bool {
        self.check_internal_state();
        self.detach(pointer, Teardown::Explicit).is_some()
    }

    /// Unbind `pointer` and release the native side as `teardown` requires
    ///
    /// `free` is false for objects whose native lifetime is managed
    /// elsewhere (persistent objects at shutdown); they lose the bridge's
    /// reference but are not destroyed outright.
    pub(crate) fn free_object(&mut self, pointer: NativePtr, teardown: Teardown, free: bool) -> bool {
        match self.detach(pointer, teardown) {
            Some(handle) => {
                self.release_native(pointer, &handle, free);
                true
            }
            None => false,
        }
    }

    fn detach(&mut self, pointer: NativePtr, teardown: Teardown) -> Option<ObjectHandle<R::Object>> {
        let (id, handle) = self.objects.unbind(pointer)?;

        // a collected wrapper is already gone
        if teardown != Teardown::Collector {
            if let Some(wrapper) = handle.wrapper() {
                self.runtime.invalidate(wrapper);
            }
        }

        self.counters.unbound += 1;
        log_unbind(pointer, id, teardown);
        Some(handle)
    }

    /// Returns whether the native object was destroyed
    fn release_native(&mut self, pointer: NativePtr, handle: &ObjectHandle<R::Object>, free: bool) -> bool {
        let Some(class) = self.classes.find(handle.class_id()) else {
            warn!(event = "release_unknown_class", pointer = %pointer, class_id = handle.class_id().index());
            return false;
        };

        match class.kind() {
            ClassKind::HostObject => {
                let destroy = if handle.holds_reference() {
                    self.host.unreference(pointer)
                } else {
                    free && handle.policy() != ReferencePolicy::NoReference
                };
                if destroy {
                    self.host.destroy(pointer);
                    self.counters.destroyed += 1;
                }
                destroy
            }
            _ => {
                if let Some(finalizer) = class.finalizer().cloned() {
                    finalizer(pointer, free);
                }
                false
            }
        }
    }

    /// Drain collector notifications, releasing each finalized binding
    ///
    /// Returns how many bindings were released.
    pub(crate) fn process_finalized(&mut self) -> usize {
        let mut released = 0;

        for pointer in self.runtime.take_finalized() {
            if self.objects.is_persistent(pointer) {
                warn!(event = "persistent_finalized", pointer = %pointer, "collector finalized a persistent wrapper, ignored");
                continue;
            }

            let Some(handle) = self.objects.handle_mut(pointer) else {
                trace!(event = "finalized_unbound", pointer = %pointer, "already unbound");
                continue;
            };

            // the pointer may have been unbound and bound again since the
            // notification was queued; only a dead wrapper is ours to release
            if let Some(wrapper) = handle.wrapper.as_ref() {
                if self.runtime.is_alive(wrapper) {
                    trace!(event = "finalized_stale", pointer = %pointer, "wrapper still alive");
                    continue;
                }
            }
            handle.wrapper_alive = false;

            if let Some(detached) = self.detach(pointer, Teardown::Collector) {
                let destroyed = self.release_native(pointer, &detached, true);
                self.counters.finalized += 1;
                log_finalized(pointer, destroyed);
                released += 1;
            }
        }
        released
    }

    /// Drain value disposal notifications into the pool
    pub(crate) fn process_disposed(&mut self) -> usize {
        let mut disposed = 0;
        for handle in self.runtime.take_disposed_values() {
            if self.dispose_value(handle) {
                disposed += 1;
            }
        }
        disposed
    }
}
