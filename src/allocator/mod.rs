//! Variant allocator - pooled storage for value-type payloads
//!
//! Design: value-type wrappers own a private copy of a host value. Those
//! copies come from a slot pool instead of the general allocator, so a
//! disposal callback (possibly on a collector thread) only pushes a slot back
//! on a free list.
//!
//! The pool grows a page at a time, doubling the page size up to a cap, the
//! same way arena pools grow. Whatever is still live when the pool is
//! dropped is reclaimed with it.

mod variant;

#[cfg(test)]
mod tests;

pub use variant::{Variant, VariantHandle};

use crate::core::SlotArray;
use crate::logging::log_value_disposed;
use parking_lot::Mutex;
use serde::Serialize;
use tracing::{debug, trace, warn};

/// Slots in the first page
pub const DEFAULT_PAGE_SIZE: usize = 64;
/// Upper bound of a single page
pub const MAX_PAGE_SIZE: usize = 4096;

pub struct VariantAllocator {
    pool: Mutex<Pool>,
}

struct Pool {
    slots: SlotArray<Variant, VariantHandle>,
    page_size: usize,
    max_page_size: usize,
    pages: usize,
    total_allocs: u64,
    total_frees: u64,
    peak: usize,
}

impl Pool {
    /// Reserve another page when the current ones are full
    fn grow_if_full(&mut self) {
        let has_free_slot = self.slots.len() < self.slots.slot_count();
        if has_free_slot || self.slots.slot_count() < self.slots.capacity() {
            return;
        }

        self.slots.reserve_exact(self.page_size);
        self.pages += 1;
        trace!(event = "variant_pool_grow", page_size = self.page_size, pages = self.pages);

        // grow page size for next time (capped)
        self.page_size = (self.page_size * 2).min(self.max_page_size);
    }
}

impl VariantAllocator {
    pub fn new() -> Self {
        Self::with_page_size(DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE)
    }

    pub fn with_page_size(page_size: usize, max_page_size: usize) -> Self {
        let page_size = page_size.max(1);
        Self {
            pool: Mutex::new(Pool {
                slots: SlotArray::new(),
                page_size,
                max_page_size: max_page_size.max(page_size),
                pages: 0,
                total_allocs: 0,
                total_frees: 0,
                peak: 0,
            }),
        }
    }

    /// Copy `value` into a pooled slot
    pub fn alloc(&self, value: Variant) -> VariantHandle {
        let mut pool = self.pool.lock();
        pool.grow_if_full();

        let handle = pool.slots.insert(value);
        pool.total_allocs += 1;
        pool.peak = pool.peak.max(pool.slots.len());
        handle
    }

    /// Return a slot to the pool
    ///
    /// A second free of the same handle is ignored and yields `None`.
    pub fn free(&self, handle: VariantHandle) -> Option<Variant> {
        let mut pool = self.pool.lock();
        match pool.slots.remove(handle) {
            Some(value) => {
                pool.total_frees += 1;
                log_value_disposed(&handle, value.type_name());
                Some(value)
            }
            None => {
                warn!(event = "variant_double_free", handle = %handle, "variant freed twice or never allocated");
                None
            }
        }
    }

    pub fn get(&self, handle: VariantHandle) -> Option<Variant> {
        self.pool.lock().slots.get(handle).cloned()
    }

    /// Run `f` on the pooled value in place
    pub fn with_mut<R>(&self, handle: VariantHandle, f: impl FnOnce(&mut Variant) -> R) -> Option<R> {
        let mut pool = self.pool.lock();
        pool.slots.get_mut(handle).map(f)
    }

    #[inline]
    pub fn is_live(&self, handle: VariantHandle) -> bool {
        self.pool.lock().slots.contains(handle)
    }

    pub fn live(&self) -> usize {
        self.pool.lock().slots.len()
    }

    pub fn stats(&self) -> AllocatorStats {
        let pool = self.pool.lock();
        AllocatorStats {
            live: pool.slots.len(),
            capacity: pool.slots.capacity(),
            pages: pool.pages,
            peak: pool.peak,
            total_allocs: pool.total_allocs,
            total_frees: pool.total_frees,
        }
    }
}

impl Default for VariantAllocator {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for VariantAllocator {
    fn drop(&mut self) {
        let live = self.pool.get_mut().slots.len();
        if live > 0 {
            debug!(event = "variant_pool_reclaim", live, "reclaiming undisposed variants with the pool");
        }
    }
}

/// Allocator statistics for monitoring and debugging
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AllocatorStats {
    pub live: usize,
    pub capacity: usize,
    pub pages: usize,
    pub peak: usize,
    pub total_allocs: u64,
    pub total_frees: u64,
}
