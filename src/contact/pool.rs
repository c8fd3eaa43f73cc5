//! Slot pools with stable, generation-checked handles.
//!
//! Freed slots go on a LIFO free list and are handed out again before the
//! pool grows, so a steady number of live objects keeps the pool at a
//! steady size.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;
use std::ops::{Index, IndexMut};

use tracing::debug;

use crate::config::PoolConfig;

/// Stable reference to a value stored in a [`BlockPool`].
pub struct Handle<T> {
    index: u32,
    generation: u32,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Handle<T> {
    fn new(index: u32, generation: u32) -> Self {
        Self {
            index,
            generation,
            _marker: PhantomData,
        }
    }

    #[inline]
    pub fn index(self) -> usize {
        self.index as usize
    }
}

impl<T> Clone for Handle<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Handle<T> {}

impl<T> PartialEq for Handle<T> {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index && self.generation == other.generation
    }
}

impl<T> Eq for Handle<T> {}

impl<T> Hash for Handle<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.index.hash(state);
        self.generation.hash(state);
    }
}

impl<T> fmt::Debug for Handle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Handle({}v{})", self.index, self.generation)
    }
}

struct Slot<T> {
    value: Option<T>,
    generation: u32,
}

pub struct BlockPool<T> {
    slots: Vec<Slot<T>>,
    free: Vec<u32>,
    block_count: usize,
    growable: bool,
    len: usize,
}

impl<T> BlockPool<T> {
    pub fn new(config: &PoolConfig) -> Self {
        Self {
            slots: Vec::with_capacity(config.block_count),
            free: Vec::new(),
            block_count: config.block_count,
            growable: config.growable,
            len: 0,
        }
    }

    /// Number of live values.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Largest number of slots ever in use at once.
    pub fn high_water_mark(&self) -> usize {
        self.slots.len()
    }

    /// Store `value` and return its handle.
    ///
    /// # Panics
    ///
    /// Panics when a non-growable pool has no free block left.
    pub fn allocate(&mut self, value: T) -> Handle<T> {
        self.len += 1;
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            debug_assert!(slot.value.is_none());
            slot.value = Some(value);
            return Handle::new(index, slot.generation);
        }

        if self.slots.len() == self.block_count {
            assert!(
                self.growable,
                "block pool exhausted ({} blocks)",
                self.block_count
            );
            debug!(
                blocks = self.slots.len(),
                "block pool growing past its initial block count"
            );
        }

        let index = self.slots.len() as u32;
        self.slots.push(Slot {
            value: Some(value),
            generation: 0,
        });
        Handle::new(index, 0)
    }

    /// Remove the value behind `handle`, making its block available again.
    ///
    /// # Panics
    ///
    /// Panics on a stale handle.
    pub fn free(&mut self, handle: Handle<T>) -> T {
        let slot = &mut self.slots[handle.index()];
        assert_eq!(slot.generation, handle.generation, "stale pool handle");
        let value = slot.value.take();
        let Some(value) = value else {
            panic!("pool slot {} freed twice", handle.index);
        };
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(handle.index);
        self.len -= 1;
        value
    }

    pub fn contains(&self, handle: Handle<T>) -> bool {
        self.slots
            .get(handle.index())
            .is_some_and(|s| s.generation == handle.generation && s.value.is_some())
    }

    pub fn get(&self, handle: Handle<T>) -> Option<&T> {
        self.slots
            .get(handle.index())
            .filter(|s| s.generation == handle.generation)
            .and_then(|s| s.value.as_ref())
    }

    pub fn get_mut(&mut self, handle: Handle<T>) -> Option<&mut T> {
        self.slots
            .get_mut(handle.index())
            .filter(|s| s.generation == handle.generation)
            .and_then(|s| s.value.as_mut())
    }

    /// Handles and values of all live slots in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (Handle<T>, &T)> {
        self.slots.iter().enumerate().filter_map(|(i, s)| {
            s.value
                .as_ref()
                .map(|v| (Handle::new(i as u32, s.generation), v))
        })
    }
}

impl<T> Index<Handle<T>> for BlockPool<T> {
    type Output = T;

    fn index(&self, handle: Handle<T>) -> &T {
        match self.get(handle) {
            Some(value) => value,
            None => panic!("stale pool handle {handle:?}"),
        }
    }
}

impl<T> IndexMut<Handle<T>> for BlockPool<T> {
    fn index_mut(&mut self, handle: Handle<T>) -> &mut T {
        match self.get_mut(handle) {
            Some(value) => value,
            None => panic!("stale pool handle {handle:?}"),
        }
    }
}

impl<T> fmt::Debug for BlockPool<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BlockPool")
            .field("len", &self.len)
            .field("high_water_mark", &self.high_water_mark())
            .field("block_count", &self.block_count)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pool(block_count: usize, growable: bool) -> BlockPool<u32> {
        BlockPool::new(&PoolConfig {
            block_count,
            growable,
        })
    }

    #[test]
    fn test_allocate_and_free() {
        let mut p = pool(4, true);
        let a = p.allocate(1);
        let b = p.allocate(2);
        assert_eq!(p[a], 1);
        assert_eq!(p[b], 2);
        assert_eq!(p.free(a), 1);
        assert!(!p.contains(a));
        assert_eq!(p.len(), 1);
    }

    #[test]
    fn test_steady_state_high_water_mark() {
        let mut p = pool(8, true);
        let k = 5;
        let mut live: Vec<_> = (0..k).map(|i| p.allocate(i)).collect();
        let mark = p.high_water_mark();
        assert_eq!(mark, k as usize);

        for cycle in 0..1000u32 {
            let h = live.remove((cycle as usize * 7) % live.len());
            p.free(h);
            live.push(p.allocate(cycle));
            assert_eq!(p.high_water_mark(), mark);
        }
        assert_eq!(p.len(), k as usize);
    }

    #[test]
    fn test_stale_handle_after_reuse() {
        let mut p = pool(2, true);
        let a = p.allocate(1);
        p.free(a);
        let b = p.allocate(2);
        assert_eq!(a.index(), b.index());
        assert!(p.get(a).is_none());
        assert_eq!(p[b], 2);
    }

    #[test]
    fn test_growable_pool_grows() {
        let mut p = pool(1, true);
        p.allocate(1);
        p.allocate(2);
        assert_eq!(p.high_water_mark(), 2);
    }

    #[test]
    #[should_panic(expected = "exhausted")]
    fn test_fixed_pool_exhaustion() {
        let mut p = pool(1, false);
        p.allocate(1);
        p.allocate(2);
    }

    #[test]
    #[should_panic]
    fn test_double_free() {
        let mut p = pool(1, true);
        let a = p.allocate(1);
        p.free(a);
        p.free(a);
    }
}
