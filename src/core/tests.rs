//! Core tests - ids, slot array, name interning

#[cfg(test)]
mod tests {
    use super::super::*;
    use proptest::prelude::*;

    // ===== Ids =====

    #[test]
    fn native_ptr_rejects_null() {
        assert!(NativePtr::new(0).is_none());
        assert_eq!(NativePtr::new(0xA000).map(NativePtr::addr), Some(0xA000));
    }

    #[test]
    fn native_ptr_from_reference() {
        let value = 7u64;
        let ptr = NativePtr::from_ptr(&value as *const u64).unwrap();
        assert_eq!(ptr.addr(), &value as *const u64 as usize);
        assert_eq!(format!("{}", NativePtr::new(0xA000).unwrap()), "0xa000");
    }

    #[test]
    fn object_id_bits_round_trip() {
        let id = ObjectId::new(42, 7);
        assert_eq!(ObjectId::from_bits(id.to_bits()), id);
        assert_eq!(id.index(), 42);
        assert_eq!(id.generation(), 7);
    }

    // ===== Slot array =====

    #[test]
    fn first_insert_is_index_zero_generation_zero() {
        let mut slots: SlotArray<&str, ObjectId> = SlotArray::new();
        assert_eq!(slots.insert("a"), ObjectId::new(0, 0));
        assert_eq!(slots.insert("b"), ObjectId::new(1, 0));
        assert_eq!(slots.len(), 2);
    }

    #[test]
    fn removed_slot_is_reused_with_new_generation() {
        let mut slots: SlotArray<&str, ObjectId> = SlotArray::new();
        let a = slots.insert("a");
        assert_eq!(slots.remove(a), Some("a"));

        let b = slots.insert("b");
        assert_eq!(b, ObjectId::new(0, 1));
        assert_eq!(slots.get(a), None);
        assert_eq!(slots.get(b), Some(&"b"));
        assert_eq!(slots.slot_count(), 1);
    }

    #[test]
    fn double_remove_is_rejected() {
        let mut slots: SlotArray<u32, ObjectId> = SlotArray::new();
        let id = slots.insert(1);
        assert_eq!(slots.remove(id), Some(1));
        assert_eq!(slots.remove(id), None);
        assert!(slots.is_empty());
    }

    #[test]
    fn iteration_skips_free_slots() {
        let mut slots: SlotArray<u32, ObjectId> = SlotArray::new();
        let ids: Vec<_> = (0..5).map(|n| slots.insert(n)).collect();
        slots.remove(ids[1]);
        slots.remove(ids[3]);

        let values: Vec<_> = slots.iter().map(|(_, v)| *v).collect();
        assert_eq!(values, vec![0, 2, 4]);
        assert_eq!(slots.first_key(), Some(ids[0]));
    }

    proptest! {
        #[test]
        fn stale_ids_never_resolve(ops in proptest::collection::vec(any::<bool>(), 1..200)) {
            let mut slots: SlotArray<usize, ObjectId> = SlotArray::new();
            let mut live: Vec<(ObjectId, usize)> = Vec::new();
            let mut dead: Vec<ObjectId> = Vec::new();

            for (step, insert) in ops.into_iter().enumerate() {
                if insert || live.is_empty() {
                    let id = slots.insert(step);
                    live.push((id, step));
                } else {
                    let (id, value) = live.swap_remove(step % live.len());
                    prop_assert_eq!(slots.remove(id), Some(value));
                    dead.push(id);
                }

                for id in &dead {
                    prop_assert!(slots.get(*id).is_none());
                }
                for (id, value) in &live {
                    prop_assert_eq!(slots.get(*id), Some(value));
                }
            }
            prop_assert_eq!(slots.len(), live.len());
        }
    }

    // ===== Interning =====

    #[test]
    fn interned_names_share_storage() {
        let a = StringName::new("Sprite");
        let b = StringName::from("Sprite".to_string());
        assert_eq!(a, b);
        assert!(a.ptr_eq(&b));
        assert_eq!(a.as_str(), "Sprite");
        assert!(intern::interned_count() >= 1);
    }
}
