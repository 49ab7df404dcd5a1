//! Variant allocator tests
//!
//! Covers pooling and slot reuse, double-free rejection, page growth and
//! cross-thread disposal.

#[cfg(test)]
mod tests {
    use super::super::*;
    use std::sync::Arc;
    use std::thread;

    // ===== Pooling =====

    #[test]
    fn alloc_stores_a_copy() {
        let allocator = VariantAllocator::new();
        let handle = allocator.alloc(Variant::Vector2([1.0, 2.0]));

        assert_eq!(allocator.get(handle), Some(Variant::Vector2([1.0, 2.0])));
        assert_eq!(allocator.live(), 1);
    }

    #[test]
    fn freed_slots_are_reused() {
        let allocator = VariantAllocator::new();
        let first = allocator.alloc(Variant::Int(1));
        assert_eq!(allocator.free(first), Some(Variant::Int(1)));

        let second = allocator.alloc(Variant::Int(2));
        assert_ne!(first, second);
        assert_eq!(allocator.get(first), None);
        assert_eq!(allocator.get(second), Some(Variant::Int(2)));

        let stats = allocator.stats();
        assert_eq!(stats.live, 1);
        assert_eq!(stats.total_allocs, 2);
        assert_eq!(stats.total_frees, 1);
        assert_eq!(stats.peak, 1);
    }

    #[test]
    fn double_free_is_ignored() {
        let allocator = VariantAllocator::new();
        let handle = allocator.alloc(Variant::Bool(true));

        assert!(allocator.free(handle).is_some());
        assert!(allocator.free(handle).is_none());
        assert_eq!(allocator.stats().total_frees, 1);
        assert!(!allocator.is_live(handle));
    }

    #[test]
    fn with_mut_updates_in_place() {
        let allocator = VariantAllocator::new();
        let handle = allocator.alloc(Variant::Int(1));

        let result = allocator.with_mut(handle, |value| {
            *value = Variant::Int(5);
            "done"
        });
        assert_eq!(result, Some("done"));
        assert_eq!(allocator.get(handle), Some(Variant::Int(5)));
    }

    // ===== Growth =====

    #[test]
    fn pages_double_up_to_cap() {
        let allocator = VariantAllocator::with_page_size(2, 4);
        let handles: Vec<_> = (0..10).map(|n| allocator.alloc(Variant::Int(n))).collect();

        let stats = allocator.stats();
        assert_eq!(stats.live, 10);
        assert!(stats.capacity >= 10);
        // pages of 2, 4 and 4 cover ten slots
        assert_eq!(stats.pages, 3);
        assert_eq!(stats.capacity, 10);

        for handle in handles {
            allocator.free(handle);
        }
        assert_eq!(allocator.live(), 0);
        assert_eq!(allocator.stats().peak, 10);
    }

    // ===== Threads =====

    #[test]
    fn disposal_from_other_threads() {
        let allocator = Arc::new(VariantAllocator::new());
        let handles: Vec<_> = (0..64).map(|n| allocator.alloc(Variant::Int(n))).collect();

        let workers: Vec<_> = handles
            .chunks(16)
            .map(|chunk| {
                let allocator = Arc::clone(&allocator);
                let chunk = chunk.to_vec();
                thread::spawn(move || {
                    for handle in chunk {
                        assert!(allocator.free(handle).is_some());
                    }
                })
            })
            .collect();

        for worker in workers {
            worker.join().unwrap();
        }
        assert_eq!(allocator.live(), 0);
    }

    #[test]
    fn variant_type_names() {
        assert_eq!(Variant::default().type_name(), "nil");
        assert_eq!(Variant::String("a".into()).type_name(), "string");
        assert_eq!(Variant::Object(None).type_name(), "object");
    }
}
