// crates/input_arena/src/arena.rs
use crate::Handle;

/// Slot storage with generation checks. Removing a value bumps the slot's
/// generation so every outstanding handle to it stops resolving.
pub struct Arena<T> {
    slots: Vec<Option<T>>,
    generations: Vec<u32>,
    free_indices: Vec<u32>,
    len: usize,
}

impl<T> Default for Arena<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Arena<T> {
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            generations: Vec::new(),
            free_indices: Vec::new(),
            len: 0,
        }
    }

    pub fn insert(&mut self, value: T) -> Handle {
        let index = if let Some(idx) = self.free_indices.pop() {
            idx
        } else {
            self.generations.push(0);
            self.slots.push(None);
            (self.generations.len() - 1) as u32
        };

        self.slots[index as usize] = Some(value);
        self.len += 1;
        Handle::new(index, self.generations[index as usize])
    }

    pub fn remove(&mut self, handle: Handle) -> Option<T> {
        if !self.contains(handle) {
            return None;
        }
        let index = handle.index();
        let value = self.slots[index].take();
        // The next value stored in this slot gets a fresh generation.
        self.generations[index] = self.generations[index].wrapping_add(1);
        self.free_indices.push(index as u32);
        self.len -= 1;
        value
    }

    pub fn contains(&self, handle: Handle) -> bool {
        let index = handle.index();
        index < self.slots.len()
            && self.generations[index] == handle.generation()
            && self.slots[index].is_some()
    }

    pub fn get(&self, handle: Handle) -> Option<&T> {
        if !self.contains(handle) {
            return None;
        }
        self.slots[handle.index()].as_ref()
    }

    pub fn get_mut(&mut self, handle: Handle) -> Option<&mut T> {
        if !self.contains(handle) {
            return None;
        }
        self.slots[handle.index()].as_mut()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    // Iterate over live (Handle, value) pairs in slot order
    pub fn iter(&self) -> impl Iterator<Item = (Handle, &T)> {
        self.slots.iter().enumerate().filter_map(|(index, slot)| {
            slot.as_ref()
                .map(|value| (Handle::new(index as u32, self.generations[index]), value))
        })
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (Handle, &mut T)> {
        let generations = &self.generations;
        self.slots.iter_mut().enumerate().filter_map(move |(index, slot)| {
            slot.as_mut()
                .map(|value| (Handle::new(index as u32, generations[index]), value))
        })
    }

    pub fn clear(&mut self) {
        for index in 0..self.slots.len() {
            if self.slots[index].take().is_some() {
                self.generations[index] = self.generations[index].wrapping_add(1);
                self.free_indices.push(index as u32);
            }
        }
        self.len = 0;
    }
}
