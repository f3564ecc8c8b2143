//! Fixed-capacity entity pools
//!
//! Each pool is a flat slot array with an active flag per slot. Spawning
//! takes a slot from a free list; despawning only clears the flag, and the
//! next spawn into that slot overwrites the stale fields. A full pool
//! silently drops spawns (counted for diagnostics).
//!
//! Handles carry a generation so a handle held across a despawn/respawn
//! of the same slot no longer resolves.

use serde::{Deserialize, Serialize};

/// Stable reference to a pooled entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Handle {
    index: u32,
    generation: u32,
}

impl Handle {
    pub fn index(&self) -> usize {
        self.index as usize
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Slot<T> {
    active: bool,
    generation: u32,
    item: T,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pool<T> {
    slots: Vec<Slot<T>>,
    /// Free slot indices (LIFO); starts with slot 0 on top
    free: Vec<u32>,
    active: usize,
    dropped: u64,
}

impl<T: Default> Pool<T> {
    pub fn with_capacity(capacity: usize) -> Self {
        let slots = (0..capacity)
            .map(|_| Slot {
                active: false,
                generation: 0,
                item: T::default(),
            })
            .collect();
        Self {
            slots,
            free: (0..capacity as u32).rev().collect(),
            active: 0,
            dropped: 0,
        }
    }
}

impl<T> Pool<T> {
    /// Activate a free slot with `item`; `None` when the pool is exhausted
    pub fn spawn(&mut self, item: T) -> Option<Handle> {
        let Some(index) = self.free.pop() else {
            self.dropped += 1;
            return None;
        };
        let slot = &mut self.slots[index as usize];
        slot.item = item;
        slot.active = true;
        self.active += 1;
        Some(Handle {
            index,
            generation: slot.generation,
        })
    }

    /// Despawn through a handle; stale handles are ignored
    pub fn despawn(&mut self, handle: Handle) -> bool {
        match self.slots.get(handle.index()) {
            Some(slot) if slot.active && slot.generation == handle.generation => {
                self.release(handle.index());
                true
            }
            _ => false,
        }
    }

    /// Despawn by slot index (same-frame use only)
    pub fn release(&mut self, index: usize) {
        if let Some(slot) = self.slots.get_mut(index) {
            if slot.active {
                slot.active = false;
                slot.generation = slot.generation.wrapping_add(1);
                self.active -= 1;
                self.free.push(index as u32);
            }
        }
    }

    pub fn get(&self, handle: Handle) -> Option<&T> {
        self.slots
            .get(handle.index())
            .filter(|s| s.active && s.generation == handle.generation)
            .map(|s| &s.item)
    }

    pub fn get_mut(&mut self, handle: Handle) -> Option<&mut T> {
        self.slots
            .get_mut(handle.index())
            .filter(|s| s.active && s.generation == handle.generation)
            .map(|s| &mut s.item)
    }

    /// Active entity at `index`
    pub fn index_mut(&mut self, index: usize) -> Option<&mut T> {
        self.slots
            .get_mut(index)
            .filter(|s| s.active)
            .map(|s| &mut s.item)
    }

    pub fn is_active(&self, index: usize) -> bool {
        self.slots.get(index).is_some_and(|s| s.active)
    }

    /// Index of the first active entity (in slot order) matching `pred`
    pub fn position(&self, mut pred: impl FnMut(&T) -> bool) -> Option<usize> {
        self.slots.iter().position(|s| s.active && pred(&s.item))
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.slots.iter().filter(|s| s.active).map(|s| &s.item)
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut T> {
        self.slots
            .iter_mut()
            .filter(|s| s.active)
            .map(|s| &mut s.item)
    }

    pub fn iter_indexed(&self) -> impl Iterator<Item = (usize, &T)> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, s)| s.active)
            .map(|(i, s)| (i, &s.item))
    }

    /// Run `update` over every active entity in slot order; entities for
    /// which it returns `false` are despawned in the same pass.
    pub fn retain_mut(&mut self, mut update: impl FnMut(&mut T) -> bool) {
        for index in 0..self.slots.len() {
            let slot = &mut self.slots[index];
            if slot.active && !update(&mut slot.item) {
                self.release(index);
            }
        }
    }

    /// Despawn everything
    pub fn clear(&mut self) {
        for index in 0..self.slots.len() {
            self.release(index);
        }
    }

    pub fn active_count(&self) -> usize {
        self.active
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn is_full(&self) -> bool {
        self.free.is_empty()
    }

    pub fn free_slots(&self) -> usize {
        self.free.len()
    }

    /// Spawns dropped because the pool was exhausted
    pub fn dropped_spawns(&self) -> u64 {
        self.dropped
    }
}
