//! Generational slot array - dense storage with recycled slots
//!
//! Design: values live in a `Vec` of slots; a removed slot bumps its
//! generation and goes on a free list. Keys carry the generation they were
//! issued with, so a stale key fails every lookup after its slot is reused.

use super::ids::SlotKey;
use std::marker::PhantomData;

struct Slot<T> {
    generation: u32,
    value: Option<T>,
}

pub struct SlotArray<T, K: SlotKey> {
    slots: Vec<Slot<T>>,
    free: Vec<u32>,
    len: usize,
    _key: PhantomData<K>,
}

impl<T, K: SlotKey> SlotArray<T, K> {
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
            free: Vec::new(),
            len: 0,
            _key: PhantomData,
        }
    }

    /// Store `value`, reusing the most recently freed slot if any
    pub fn insert(&mut self, value: T) -> K {
        self.len += 1;

        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            debug_assert!(slot.value.is_none(), "free list points at an occupied slot");
            slot.value = Some(value);
            return K::from_parts(index, slot.generation);
        }

        let index = u32::try_from(self.slots.len()).unwrap_or(u32::MAX);
        assert!(index < u32::MAX, "slot array exhausted");
        self.slots.push(Slot { generation: 0, value: Some(value) });
        K::from_parts(index, 0)
    }

    /// Remove the value for `key`, invalidating every copy of the key
    pub fn remove(&mut self, key: K) -> Option<T> {
        let slot = self.slots.get_mut(key.index() as usize)?;
        if slot.generation != key.generation() {
            return None;
        }

        let value = slot.value.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(key.index());
        self.len -= 1;
        Some(value)
    }

    #[inline]
    pub fn get(&self, key: K) -> Option<&T> {
        let slot = self.slots.get(key.index() as usize)?;
        if slot.generation != key.generation() {
            return None;
        }
        slot.value.as_ref()
    }

    #[inline]
    pub fn get_mut(&mut self, key: K) -> Option<&mut T> {
        let slot = self.slots.get_mut(key.index() as usize)?;
        if slot.generation != key.generation() {
            return None;
        }
        slot.value.as_mut()
    }

    #[inline]
    pub fn contains(&self, key: K) -> bool {
        self.get(key).is_some()
    }

    /// Key of the lowest occupied slot
    pub fn first_key(&self) -> Option<K> {
        self.iter().next().map(|(key, _)| key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (K, &T)> + '_ {
        self.slots.iter().enumerate().filter_map(|(index, slot)| {
            slot.value
                .as_ref()
                .map(|value| (K::from_parts(index as u32, slot.generation), value))
        })
    }

    pub fn keys(&self) -> Vec<K> {
        self.iter().map(|(key, _)| key).collect()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of slots ever created, occupied or free
    #[inline]
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.slots.capacity()
    }

    pub fn reserve(&mut self, additional: usize) {
        self.slots.reserve(additional);
    }

    pub fn reserve_exact(&mut self, additional: usize) {
        self.slots.reserve_exact(additional);
    }
}

impl<T, K: SlotKey> Default for SlotArray<T, K> {
    fn default() -> Self {
        Self::new()
    }
}
