//! Hand-managed growable sequence used for intermediate collections and
//! index buckets.
//!
//! Growth is geometric and explicit: capacity starts at 1 on the first push
//! and doubles on overflow, matching the engine's sizing guarantees instead
//! of the allocator default.

use crate::error::{EngineError, Result};

#[derive(Debug, Clone, PartialEq)]
pub struct Array<T> {
    items: Vec<T>,
}

impl<T> Array<T> {
    pub fn new() -> Self {
        Self { items: Vec::new() }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            items: Vec::with_capacity(capacity),
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.items.capacity()
    }

    /// Doubles the backing storage when full, starting from capacity 1.
    fn ensure_room(&mut self) {
        if self.items.len() == self.items.capacity() {
            let new_capacity = if self.items.capacity() == 0 {
                1
            } else {
                self.items.capacity() * 2
            };
            self.items.reserve_exact(new_capacity - self.items.len());
        }
    }

    pub fn push(&mut self, item: T) {
        self.ensure_room();
        self.items.push(item);
    }

    /// Inserts at `index`, shifting the tail right. `index == len` appends.
    pub fn insert(&mut self, index: usize, item: T) -> Result<()> {
        if index > self.items.len() {
            return Err(EngineError::IndexOutOfBounds {
                index,
                len: self.items.len(),
            });
        }
        self.ensure_room();
        self.items.insert(index, item);
        Ok(())
    }

    pub fn get(&self, index: usize) -> Result<&T> {
        self.items.get(index).ok_or(EngineError::IndexOutOfBounds {
            index,
            len: self.items.len(),
        })
    }

    pub fn set(&mut self, index: usize, item: T) -> Result<()> {
        let len = self.items.len();
        match self.items.get_mut(index) {
            Some(slot) => {
                *slot = item;
                Ok(())
            }
            None => Err(EngineError::IndexOutOfBounds { index, len }),
        }
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }

    pub fn as_slice(&self) -> &[T] {
        &self.items
    }

    /// Keeps only the items for which `keep` returns true, preserving order.
    pub fn retain<F: FnMut(&T) -> bool>(&mut self, keep: F) {
        self.items.retain(keep);
    }
}

impl<T: PartialEq> Array<T> {
    /// Index of the first occurrence, or `None`.
    pub fn index_of(&self, item: &T) -> Option<usize> {
        self.items.iter().position(|existing| existing == item)
    }

    pub fn contains(&self, item: &T) -> bool {
        self.index_of(item).is_some()
    }

    /// Removes the first occurrence, shifting the tail left.
    pub fn remove_first_match(&mut self, item: &T) -> bool {
        match self.index_of(item) {
            Some(index) => {
                self.items.remove(index);
                true
            }
            None => false,
        }
    }
}

impl<T: Clone> Array<T> {
    /// Copies all items into `dest` starting at `offset`.
    pub fn copy_into(&self, dest: &mut [T], offset: usize) -> Result<()> {
        let end = offset.saturating_add(self.items.len());
        if offset > dest.len() || end > dest.len() {
            return Err(EngineError::IndexOutOfBounds {
                index: offset,
                len: dest.len(),
            });
        }
        dest[offset..end].clone_from_slice(&self.items);
        Ok(())
    }
}

impl<T> Default for Array<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> From<Vec<T>> for Array<T> {
    fn from(items: Vec<T>) -> Self {
        Self { items }
    }
}

impl<'a, T> IntoIterator for &'a Array<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

impl<T> IntoIterator for Array<T> {
    type Item = T;
    type IntoIter = std::vec::IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}
