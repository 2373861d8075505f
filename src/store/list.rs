//! Canonical record storage: a circular singly-linked list laid out in a
//! slot arena.
//!
//! Secondary indexes never copy records; they hold [`NodeHandle`]s into this
//! store. A handle is an arena index paired with a generation counter, so a
//! handle to a removed (and possibly recycled) slot resolves to `None`
//! instead of dangling.
//!
//! Only a tail pointer is kept; `tail.next` is the head. Appends and
//! prepends are O(1), removal by handle or by value is O(n) because the
//! predecessor must be found by walking the ring.

use crate::error::{EngineError, Result};

/// Stable reference to one record's storage slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeHandle {
    slot: u32,
    generation: u32,
}

impl NodeHandle {
    /// Builds a handle that is not backed by any store. Useful when an index
    /// is exercised on its own and only handle identity matters.
    pub fn synthetic(slot: u32, generation: u32) -> Self {
        Self { slot, generation }
    }
}

#[derive(Debug)]
enum SlotState<T> {
    Free { next_free: Option<u32> },
    Occupied { value: T, next: u32 },
}

#[derive(Debug)]
struct Slot<T> {
    generation: u32,
    state: SlotState<T>,
}

#[derive(Debug)]
pub struct RecordStore<T> {
    slots: Vec<Slot<T>>,
    free_head: Option<u32>,
    tail: Option<u32>,
    len: usize,
}

impl<T> RecordStore<T> {
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            free_head: None,
            tail: None,
            len: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Handle of the first record in insertion order.
    pub fn head(&self) -> Option<NodeHandle> {
        let tail = self.tail?;
        let head = self.next_of(tail);
        Some(self.handle_for(head))
    }

    /// Prepends a record; the tail pointer is unchanged.
    pub fn push_front(&mut self, value: T) -> NodeHandle {
        let idx = self.alloc(value);
        match self.tail {
            None => {
                // sole node: self-loop
                self.set_next(idx, idx);
                self.tail = Some(idx);
            }
            Some(tail) => {
                let head = self.next_of(tail);
                self.set_next(idx, head);
                self.set_next(tail, idx);
            }
        }
        self.len += 1;
        self.handle_for(idx)
    }

    /// Appends a record and returns its handle.
    pub fn push_back(&mut self, value: T) -> NodeHandle {
        let handle = self.push_front(value);
        self.tail = Some(handle.slot);
        handle
    }

    pub fn remove_first(&mut self) -> bool {
        match self.tail {
            None => false,
            Some(tail) => {
                let head = self.next_of(tail);
                self.unlink(tail, head);
                true
            }
        }
    }

    /// O(n): walks the ring to find the new tail.
    pub fn remove_last(&mut self) -> bool {
        match self.tail {
            None => false,
            Some(tail) => {
                let mut prev = tail;
                while self.next_of(prev) != tail {
                    prev = self.next_of(prev);
                }
                self.unlink(prev, tail);
                true
            }
        }
    }

    /// Removes the node a handle points at. Returns false for stale handles.
    pub fn remove_handle(&mut self, handle: NodeHandle) -> bool {
        if self.resolve(handle).is_none() {
            return false;
        }
        let tail = match self.tail {
            Some(tail) => tail,
            None => return false,
        };
        let mut prev = tail;
        for _ in 0..self.len {
            let current = self.next_of(prev);
            if current == handle.slot {
                self.unlink(prev, current);
                return true;
            }
            prev = current;
        }
        false
    }

    /// Fetches the record at `index` in insertion order. O(n).
    pub fn get(&self, index: usize) -> Result<&T> {
        if index >= self.len {
            return Err(EngineError::IndexOutOfBounds {
                index,
                len: self.len,
            });
        }
        let tail = match self.tail {
            Some(tail) => tail,
            None => {
                return Err(EngineError::IndexOutOfBounds {
                    index,
                    len: self.len,
                })
            }
        };
        let mut current = self.next_of(tail);
        for _ in 0..index {
            current = self.next_of(current);
        }
        Ok(self.value_of(current))
    }

    /// Resolves a handle, rejecting stale generations.
    pub fn resolve(&self, handle: NodeHandle) -> Option<&T> {
        let slot = self.slots.get(handle.slot as usize)?;
        if slot.generation != handle.generation {
            return None;
        }
        match &slot.state {
            SlotState::Occupied { value, .. } => Some(value),
            SlotState::Free { .. } => None,
        }
    }

    pub fn resolve_mut(&mut self, handle: NodeHandle) -> Option<&mut T> {
        let slot = self.slots.get_mut(handle.slot as usize)?;
        if slot.generation != handle.generation {
            return None;
        }
        match &mut slot.state {
            SlotState::Occupied { value, .. } => Some(value),
            SlotState::Free { .. } => None,
        }
    }

    /// Lazy head-to-tail value iteration; restartable by calling again.
    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            store: self,
            current: self.tail.map(|tail| self.next_of(tail)),
            remaining: self.len,
        }
    }

    /// Like [`Self::iter`], but yields `(handle, value)` pairs.
    pub fn handles(&self) -> Handles<'_, T> {
        Handles { inner: self.iter() }
    }

    pub fn clear(&mut self) {
        // Free slot by slot so generations advance and old handles stay dead.
        let live: Vec<u32> = (0..self.slots.len() as u32)
            .filter(|&idx| matches!(self.slots[idx as usize].state, SlotState::Occupied { .. }))
            .collect();
        for idx in live {
            self.release(idx);
        }
        self.tail = None;
        self.len = 0;
    }

    fn alloc(&mut self, value: T) -> u32 {
        match self.free_head {
            Some(idx) => {
                let slot = &mut self.slots[idx as usize];
                let next_free = match slot.state {
                    SlotState::Free { next_free } => next_free,
                    SlotState::Occupied { .. } => unreachable!("occupied slot on free list"),
                };
                self.free_head = next_free;
                slot.state = SlotState::Occupied { value, next: idx };
                idx
            }
            None => {
                let idx = self.slots.len() as u32;
                self.slots.push(Slot {
                    generation: 0,
                    state: SlotState::Occupied { value, next: idx },
                });
                idx
            }
        }
    }

    /// Unlinks `current` given its ring predecessor and frees the slot.
    fn unlink(&mut self, prev: u32, current: u32) {
        if self.len == 1 {
            self.tail = None;
        } else {
            let after = self.next_of(current);
            self.set_next(prev, after);
            if Some(current) == self.tail {
                self.tail = Some(prev);
            }
        }
        self.release(current);
        self.len -= 1;
    }

    fn release(&mut self, idx: u32) {
        let slot = &mut self.slots[idx as usize];
        slot.generation = slot.generation.wrapping_add(1);
        slot.state = SlotState::Free {
            next_free: self.free_head,
        };
        self.free_head = Some(idx);
    }

    fn handle_for(&self, idx: u32) -> NodeHandle {
        NodeHandle {
            slot: idx,
            generation: self.slots[idx as usize].generation,
        }
    }

    fn next_of(&self, idx: u32) -> u32 {
        match &self.slots[idx as usize].state {
            SlotState::Occupied { next, .. } => *next,
            SlotState::Free { .. } => unreachable!("free slot in live ring"),
        }
    }

    fn value_of(&self, idx: u32) -> &T {
        match &self.slots[idx as usize].state {
            SlotState::Occupied { value, .. } => value,
            SlotState::Free { .. } => unreachable!("free slot in live ring"),
        }
    }

    fn set_next(&mut self, idx: u32, to: u32) {
        match &mut self.slots[idx as usize].state {
            SlotState::Occupied { next, .. } => *next = to,
            SlotState::Free { .. } => unreachable!("free slot in live ring"),
        }
    }
}

impl<T: PartialEq> RecordStore<T> {
    /// Removes the first value-equal match scanning from the head.
    pub fn remove_value(&mut self, value: &T) -> bool {
        let tail = match self.tail {
            Some(tail) => tail,
            None => return false,
        };
        let mut prev = tail;
        for _ in 0..self.len {
            let current = self.next_of(prev);
            if self.value_of(current) == value {
                self.unlink(prev, current);
                return true;
            }
            prev = current;
        }
        false
    }

    pub fn contains(&self, value: &T) -> bool {
        self.iter().any(|existing| existing == value)
    }
}

impl<T> Default for RecordStore<T> {
    fn default() -> Self {
        Self::new()
    }
}

pub struct Iter<'a, T> {
    store: &'a RecordStore<T>,
    current: Option<u32>,
    remaining: usize,
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let idx = self.current?;
        self.remaining -= 1;
        self.current = Some(self.store.next_of(idx));
        Some(self.store.value_of(idx))
    }
}

pub struct Handles<'a, T> {
    inner: Iter<'a, T>,
}

impl<'a, T> Iterator for Handles<'a, T> {
    type Item = (NodeHandle, &'a T);

    fn next(&mut self) -> Option<Self::Item> {
        let idx = self.inner.current?;
        let value = self.inner.next()?;
        Some((self.inner.store.handle_for(idx), value))
    }
}
