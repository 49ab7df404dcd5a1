//! Object handle table - identity map between native pointers and wrappers
//!
//! Design: handles live in a generational slot array keyed by `ObjectId`;
//! a side index maps raw addresses back to ids for O(1) reverse lookup.
//!
//! The pointer index is unsafe by nature: it trusts the native side to unbind
//! an address before that memory is freed and reused. A stale entry would
//! silently attach a new native object to an old wrapper.

mod handle;


pub use handle::{ObjectHandle, Ownership, ReferencePolicy, Teardown};

use crate::core::{ClassId, NativePtr, ObjectId, SlotArray};
use crate::errors::{BridgeError, Result};
use rustc_hash::{FxHashMap, FxHashSet};

pub struct HandleTable<W> {
    objects: SlotArray<ObjectHandle<W>, ObjectId>,
    index: FxHashMap<NativePtr, ObjectId>,
    persistent: FxHashSet<NativePtr>,
}

impl<W> HandleTable<W> {
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let mut index = FxHashMap::default();
        index.reserve(capacity);
        Self {
            objects: SlotArray::with_capacity(capacity),
            index,
            persistent: FxHashSet::default(),
        }
    }

    /// Reserve a slot without a pointer or wrapper
    pub fn allocate(&mut self, class_id: ClassId) -> ObjectId {
        self.objects.insert(ObjectHandle::reserved(class_id))
    }

    /// Associate a reserved slot with `pointer` and `wrapper`
    pub fn attach(&mut self, id: ObjectId, pointer: NativePtr, wrapper: W, policy: ReferencePolicy) -> Result<()> {
        if let Some(&existing) = self.index.get(&pointer) {
            return Err(BridgeError::AlreadyBound { pointer, existing });
        }

        let handle = self.objects.get_mut(id).ok_or(BridgeError::UnknownObject(id))?;
        debug_assert!(handle.pointer.is_none(), "attaching an already attached handle");

        handle.pointer = Some(pointer);
        handle.wrapper = Some(wrapper);
        handle.policy = policy;
        handle.ownership = match policy {
            ReferencePolicy::NoReference => Ownership::Native,
            ReferencePolicy::Reference => Ownership::Script,
            ReferencePolicy::ReferenceAlways => Ownership::Shared,
        };
        handle.wrapper_alive = true;

        self.index.insert(pointer, id);
        Ok(())
    }

    /// Allocate a handle for `pointer` and index it
    ///
    /// Binding an address that is already bound is a caller bug; it must be
    /// unbound first.
    pub fn bind(&mut self, pointer: NativePtr, class_id: ClassId, wrapper: W, policy: ReferencePolicy) -> Result<ObjectId> {
        if let Some(&existing) = self.index.get(&pointer) {
            return Err(BridgeError::AlreadyBound { pointer, existing });
        }

        let id = self.allocate(class_id);
        self.attach(id, pointer, wrapper, policy)?;
        Ok(id)
    }

    /// Drop the index entry and the handle of `pointer`
    ///
    /// Idempotent: unbinding an unbound pointer returns `None` and changes
    /// nothing, since native teardown and finalization may both get here.
    pub fn unbind(&mut self, pointer: NativePtr) -> Option<(ObjectId, ObjectHandle<W>)> {
        let id = self.index.remove(&pointer)?;
        self.persistent.remove(&pointer);

        let handle = self.objects.remove(id);
        debug_assert!(handle.is_some(), "pointer index referenced a dead handle");
        handle.map(|handle| (id, handle))
    }

    /// Free a slot by id, bound or merely reserved
    pub fn release(&mut self, id: ObjectId) -> Option<ObjectHandle<W>> {
        let handle = self.objects.remove(id)?;
        if let Some(pointer) = handle.pointer {
            self.index.remove(&pointer);
            self.persistent.remove(&pointer);
        }
        Some(handle)
    }

    #[inline]
    pub fn lookup(&self, pointer: NativePtr) -> Option<ObjectId> {
        self.index.get(&pointer).copied()
    }

    #[inline]
    pub fn resolve(&self, id: ObjectId) -> Option<&ObjectHandle<W>> {
        self.objects.get(id)
    }

    #[inline]
    pub fn resolve_mut(&mut self, id: ObjectId) -> Option<&mut ObjectHandle<W>> {
        self.objects.get_mut(id)
    }

    /// Handle bound to `pointer`
    #[inline]
    pub fn handle(&self, pointer: NativePtr) -> Option<&ObjectHandle<W>> {
        self.resolve(self.lookup(pointer)?)
    }

    #[inline]
    pub fn handle_mut(&mut self, pointer: NativePtr) -> Option<&mut ObjectHandle<W>> {
        let id = self.lookup(pointer)?;
        self.resolve_mut(id)
    }

    /// Wrapper of `pointer` unless it is known to be collected
    ///
    /// The runtime may still have collected it since the last notification;
    /// callers re-check liveness with the runtime before use.
    pub fn get_wrapper(&self, pointer: NativePtr) -> Option<&W> {
        let handle = self.handle(pointer)?;
        if handle.wrapper_alive {
            handle.wrapper.as_ref()
        } else {
            None
        }
    }

    /// Add a bound pointer to the persistent set
    ///
    /// Returns false when the pointer is already persistent.
    pub fn mark_persistent(&mut self, pointer: NativePtr) -> bool {
        debug_assert!(self.index.contains_key(&pointer), "persisting an unbound pointer");
        self.persistent.insert(pointer)
    }

    #[inline]
    pub fn is_persistent(&self, pointer: NativePtr) -> bool {
        self.persistent.contains(&pointer)
    }

    #[inline]
    pub fn persistent_count(&self) -> usize {
        self.persistent.len()
    }

    /// Snapshot of every bound pointer in slot order, used by the shutdown sweep
    pub fn pointers(&self) -> Vec<NativePtr> {
        self.objects.iter().filter_map(|(_, handle)| handle.pointer).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ObjectId, &ObjectHandle<W>)> + '_ {
        self.objects.iter()
    }

    /// Live handles, bound or reserved
    #[inline]
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    #[inline]
    pub fn bound_count(&self) -> usize {
        self.index.len()
    }

    /// Every indexed address resolves to a handle pointing back at it
    pub fn is_consistent(&self) -> bool {
        let forward = self.index.iter().all(|(&pointer, &id)| {
            self.objects.get(id).and_then(|handle| handle.pointer) == Some(pointer)
        });
        let backward = self.objects.iter().all(|(id, handle)| match handle.pointer {
            Some(pointer) => self.index.get(&pointer) == Some(&id),
            None => true,
        });
        let persistent = self.persistent.iter().all(|pointer| self.index.contains_key(pointer));
        forward && backward && persistent
    }
}

impl<W> Default for HandleTable<W> {
    fn default() -> Self {
        Self::new()
    }
}
