//! Dense id-indexed storage with deferred removal.

use fixedbitset::FixedBitSet;
use std::collections::HashMap;

/// Anything kept in an [`EntityStore`].
pub trait Entity {
    fn id(&self) -> u32;
}

/// Dense vector of entities plus an id -> slot map.
///
/// During a tick entities are only marked; [`EntityStore::sweep`] drops all
/// marked slots in one pass. Marked entities are invisible to the `live`
/// accessors so stale index candidates resolve to nothing.
#[derive(Debug)]
pub struct EntityStore<T> {
    items: Vec<T>,
    slots: HashMap<u32, usize>,
    marked: FixedBitSet,
}

impl<T: Entity> Default for EntityStore<T> {
    fn default() -> Self {
        Self::with_capacity(0)
    }
}

impl<T: Entity> EntityStore<T> {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            items: Vec::with_capacity(capacity),
            slots: HashMap::with_capacity(capacity),
            marked: FixedBitSet::with_capacity(capacity),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    #[inline]
    pub fn contains(&self, id: u32) -> bool {
        self.slots.contains_key(&id)
    }

    /// Insert an entity. An entity with the same id is replaced in place.
    pub fn insert(&mut self, item: T) {
        let id = item.id();
        if let Some(&slot) = self.slots.get(&id) {
            self.items[slot] = item;
            self.marked.set(slot, false);
            return;
        }
        let slot = self.items.len();
        self.items.push(item);
        self.slots.insert(id, slot);
        if self.marked.len() < self.items.len() {
            self.marked.grow(self.items.len().max(self.marked.len() * 2));
        }
    }

    #[inline]
    pub fn get(&self, id: u32) -> Option<&T> {
        self.slots.get(&id).map(|&slot| &self.items[slot])
    }

    #[inline]
    pub fn get_mut(&mut self, id: u32) -> Option<&mut T> {
        self.slots.get(&id).map(|&slot| &mut self.items[slot])
    }

    /// Like [`EntityStore::get`] but ignores entities marked for removal.
    #[inline]
    pub fn get_live(&self, id: u32) -> Option<&T> {
        let slot = *self.slots.get(&id)?;
        (!self.marked.contains(slot)).then(|| &self.items[slot])
    }

    #[inline]
    pub fn get_live_mut(&mut self, id: u32) -> Option<&mut T> {
        let slot = *self.slots.get(&id)?;
        if self.marked.contains(slot) {
            return None;
        }
        Some(&mut self.items[slot])
    }

    #[inline]
    pub fn is_marked(&self, id: u32) -> bool {
        self.slots.get(&id).is_some_and(|&slot| self.marked.contains(slot))
    }

    /// Mark an entity for removal at the next sweep.
    /// Returns false if it was missing or already marked.
    pub fn mark(&mut self, id: u32) -> bool {
        match self.slots.get(&id) {
            Some(&slot) if !self.marked.contains(slot) => {
                self.marked.insert(slot);
                true
            }
            _ => false,
        }
    }

    /// Remove an entity immediately (O(1)).
    pub fn remove(&mut self, id: u32) -> Option<T> {
        let slot = self.slots.remove(&id)?;
        let last = self.items.len() - 1;
        let last_marked = self.marked.contains(last);
        self.marked.set(last, false);
        self.marked.set(slot, last_marked && slot != last);
        let item = self.items.swap_remove(slot);
        if slot != last {
            let moved = self.items[slot].id();
            self.slots.insert(moved, slot);
        }
        Some(item)
    }

    /// Drop every marked entity, returning them.
    pub fn sweep(&mut self) -> Vec<T> {
        let mut doomed: Vec<usize> = self.marked.ones().filter(|&slot| slot < self.items.len()).collect();
        self.marked.clear();
        if doomed.is_empty() {
            return Vec::new();
        }

        // Descending, so the tail slot swapped into a hole is never marked.
        doomed.sort_unstable_by(|a, b| b.cmp(a));
        let mut removed = Vec::with_capacity(doomed.len());
        for slot in doomed {
            let item = self.items.swap_remove(slot);
            self.slots.remove(&item.id());
            if slot < self.items.len() {
                let moved = self.items[slot].id();
                self.slots.insert(moved, slot);
            }
            removed.push(item);
        }
        removed
    }

    /// Every stored entity, marked or not.
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.items.iter()
    }

    #[inline]
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut T> {
        self.items.iter_mut()
    }

    /// Entities not marked for removal.
    pub fn iter_live(&self) -> impl Iterator<Item = &T> {
        self.items
            .iter()
            .enumerate()
            .filter(|(slot, _)| !self.marked.contains(*slot))
            .map(|(_, item)| item)
    }

    pub fn ids(&self) -> Vec<u32> {
        self.items.iter().map(Entity::id).collect()
    }
}
