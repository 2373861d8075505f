//! Open-addressing hash index mapping a key to a record-store handle.
//!
//! The hash function is the legacy mid-square scheme carried over for
//! behavioral compatibility: sum the character codes of the key's canonical
//! string form, square the sum, and read up to four decimal digits from the
//! middle of the square. Collisions resolve by double hashing; deletions
//! leave tombstones that only a rehash reclaims.

use std::fmt::Display;

use tracing::debug;

use crate::error::{EngineError, Result};
use crate::store::{Array, NodeHandle};

const PROBE_A: u64 = 1337;
const PROBE_B: u64 = 31;
const GROW_PERCENT: usize = 70;
const SHRINK_PERCENT: usize = 30;

/// Default table size when none is requested.
pub const DEFAULT_CAPACITY: usize = 16;

#[derive(Debug, Clone)]
enum Slot<K> {
    Empty,
    Occupied { key: K, handle: NodeHandle },
    Tombstone,
}

#[derive(Debug)]
pub struct HashIndex<K> {
    slots: Vec<Slot<K>>,
    occupied: usize,
}

impl<K: Display + Eq + Clone> HashIndex<K> {
    /// Builds a table with the given capacity; zero capacity is refused.
    pub fn new(capacity: usize) -> Result<Self> {
        if capacity < 1 {
            return Err(EngineError::InvalidCapacity(capacity));
        }
        Ok(Self {
            slots: vec![Slot::Empty; capacity],
            occupied: 0,
        })
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Number of occupied slots; tombstones are not counted.
    pub fn len(&self) -> usize {
        self.occupied
    }

    pub fn is_empty(&self) -> bool {
        self.occupied == 0
    }

    /// Integer load percentage, occupied slots only.
    pub fn load_percent(&self) -> usize {
        self.occupied * 100 / self.slots.len()
    }

    /// Inserts a key. Returns false when the key is already present; the
    /// caller decides whether that is benign.
    pub fn insert(&mut self, key: K, handle: NodeHandle) -> bool {
        let primary = self.primary_slot(&key);
        let mut first_tombstone = None;
        let mut idx = primary;

        for j in 0..self.capacity() {
            match &self.slots[idx] {
                Slot::Empty => {
                    let target = first_tombstone.unwrap_or(idx);
                    self.occupy(target, key, handle);
                    return true;
                }
                Slot::Tombstone => {
                    if first_tombstone.is_none() {
                        first_tombstone = Some(idx);
                    }
                }
                Slot::Occupied { key: existing, .. } => {
                    if *existing == key {
                        return false;
                    }
                }
            }
            idx = self.probe(primary, j + 1);
        }

        if let Some(target) = first_tombstone {
            self.occupy(target, key, handle);
            return true;
        }

        // Probe chain saturated with live entries: grow and retry once.
        self.rehash(self.capacity() * 2);
        self.insert(key, handle)
    }

    /// Looks a key up, stopping at the first empty slot (definitive miss).
    pub fn find(&self, key: &K) -> Option<NodeHandle> {
        let primary = self.primary_slot(key);
        let mut idx = primary;
        for j in 0..self.capacity() {
            match &self.slots[idx] {
                Slot::Empty => return None,
                Slot::Occupied {
                    key: existing,
                    handle,
                } if existing == key => return Some(*handle),
                _ => {}
            }
            idx = self.probe(primary, j + 1);
        }
        None
    }

    /// Removes a key by tombstoning its slot.
    pub fn remove(&mut self, key: &K) -> bool {
        let primary = self.primary_slot(key);
        let mut idx = primary;
        for j in 0..self.capacity() {
            match &self.slots[idx] {
                Slot::Empty => return false,
                Slot::Occupied { key: existing, .. } if existing == key => {
                    self.slots[idx] = Slot::Tombstone;
                    self.occupied -= 1;
                    if self.capacity() > 1 && self.load_percent() < SHRINK_PERCENT {
                        let halved = (self.capacity() / 2).max(1);
                        self.rehash(halved);
                    }
                    return true;
                }
                _ => {}
            }
            idx = self.probe(primary, j + 1);
        }
        false
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.find(key).is_some()
    }

    /// Dumps all live entries in slot order, for savers and reports.
    pub fn entries(&self) -> Array<(K, NodeHandle)> {
        let mut out = Array::with_capacity(self.occupied);
        for slot in &self.slots {
            if let Slot::Occupied { key, handle } = slot {
                out.push((key.clone(), *handle));
            }
        }
        out
    }

    fn occupy(&mut self, idx: usize, key: K, handle: NodeHandle) {
        self.slots[idx] = Slot::Occupied { key, handle };
        self.occupied += 1;
        if self.load_percent() > GROW_PERCENT {
            self.rehash(self.capacity() * 2);
        }
    }

    /// Moves every live entry into a fresh table. Handles are carried over
    /// unchanged; only their slot positions move. If the requested capacity
    /// cannot host every entry within its probe chains, it doubles again.
    fn rehash(&mut self, new_capacity: usize) {
        let mut capacity = new_capacity.max(1);
        'attempt: loop {
            let mut fresh: Vec<Slot<K>> = vec![Slot::Empty; capacity];
            for slot in &self.slots {
                if let Slot::Occupied { key, handle } = slot {
                    if !place(&mut fresh, key.clone(), *handle) {
                        capacity *= 2;
                        continue 'attempt;
                    }
                }
            }
            debug!(
                old_capacity = self.slots.len(),
                new_capacity = capacity,
                live = self.occupied,
                "rehashing hash index"
            );
            self.slots = fresh;
            return;
        }
    }

    fn primary_slot(&self, key: &K) -> usize {
        (hash_function(key) % self.capacity() as u64) as usize
    }

    fn probe(&self, primary: usize, j: usize) -> usize {
        probe_step(primary, j, self.capacity())
    }
}

impl<K: Display + Eq + Clone> Default for HashIndex<K> {
    fn default() -> Self {
        Self {
            slots: vec![Slot::Empty; DEFAULT_CAPACITY],
            occupied: 0,
        }
    }
}

/// One double-hash probe step from `primary`.
fn probe_step(primary: usize, j: usize, capacity: usize) -> usize {
    let j = j as u64;
    let raw = (primary as u64)
        .wrapping_add(j.wrapping_mul(PROBE_A))
        .wrapping_add(j.wrapping_mul(j).wrapping_mul(PROBE_B));
    (raw % capacity as u64) as usize
}

fn place<K: Display + Eq>(slots: &mut [Slot<K>], key: K, handle: NodeHandle) -> bool {
    let capacity = slots.len();
    let primary = (hash_function(&key) % capacity as u64) as usize;
    let mut idx = primary;
    for j in 0..capacity {
        if !matches!(slots[idx], Slot::Occupied { .. }) {
            slots[idx] = Slot::Occupied { key, handle };
            return true;
        }
        idx = probe_step(primary, j + 1, capacity);
    }
    false
}

/// Legacy mid-square string hash: sum of char codes, squared, middle four
/// (or fewer) decimal digits of the square.
pub fn hash_function<K: Display>(key: &K) -> u64 {
    let canonical = key.to_string();
    let sum: u64 = canonical.chars().map(|c| c as u64).sum();
    let square = sum.wrapping_mul(sum);
    let digits = square.to_string();
    let mid = digits.len() / 2;
    let start = mid.saturating_sub(2);
    let take = (digits.len() - start).min(4);
    digits[start..start + take].parse().unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::RecordStore;

    fn handles(n: usize) -> (RecordStore<u32>, Vec<NodeHandle>) {
        let mut store = RecordStore::new();
        let handles = (0..n as u32).map(|i| store.push_back(i)).collect();
        (store, handles)
    }

    #[test]
    fn mid_square_known_values() {
        // 239^2 = 57121 -> "5712"
        assert_eq!(hash_function(&"EL-1"), 5712);
        // 289^2 = 83521 -> "8352"
        assert_eq!(hash_function(&"EL-12"), 8352);
        assert_eq!(hash_function(&"EL-21"), 8352);
        // 330^2 = 108900 -> "0890"
        assert_eq!(hash_function(&"OTH-2"), 890);
    }

    #[test]
    fn zero_capacity_refused() {
        assert!(HashIndex::<String>::new(0).is_err());
        assert!(HashIndex::<String>::new(1).is_ok());
    }

    #[test]
    fn insert_find_remove() {
        let (_store, hs) = handles(2);
        let mut index = HashIndex::new(8).unwrap();
        assert!(index.insert("EL-1".to_string(), hs[0]));
        assert!(index.insert("CL-2".to_string(), hs[1]));
        assert_eq!(index.find(&"EL-1".to_string()), Some(hs[0]));
        assert_eq!(index.find(&"CL-2".to_string()), Some(hs[1]));
        assert_eq!(index.find(&"FUR-3".to_string()), None);
        assert!(index.remove(&"EL-1".to_string()));
        assert_eq!(index.find(&"EL-1".to_string()), None);
        assert!(!index.remove(&"EL-1".to_string()));
    }

    #[test]
    fn duplicate_key_rejected() {
        let (_store, hs) = handles(2);
        let mut index = HashIndex::new(8).unwrap();
        assert!(index.insert("EL-1".to_string(), hs[0]));
        assert!(!index.insert("EL-1".to_string(), hs[1]));
        assert_eq!(index.find(&"EL-1".to_string()), Some(hs[0]));
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn colliding_keys_all_retrievable() {
        // EL-1, EL-12 and EL-21 share primary slot 2 at capacity 10.
        let (_store, hs) = handles(3);
        let mut index = HashIndex::new(10).unwrap();
        assert!(index.insert("EL-1".to_string(), hs[0]));
        assert!(index.insert("EL-12".to_string(), hs[1]));
        assert!(index.insert("EL-21".to_string(), hs[2]));
        assert_eq!(index.capacity(), 10);
        assert_eq!(index.find(&"EL-1".to_string()), Some(hs[0]));
        assert_eq!(index.find(&"EL-12".to_string()), Some(hs[1]));
        assert_eq!(index.find(&"EL-21".to_string()), Some(hs[2]));
    }

    #[test]
    fn tombstone_is_reused_on_insert() {
        let (_store, hs) = handles(4);
        let mut index = HashIndex::new(10).unwrap();
        index.insert("EL-1".to_string(), hs[0]);
        index.insert("EL-12".to_string(), hs[1]);
        index.insert("EL-21".to_string(), hs[2]);
        // Tombstone the middle of the probe chain, then reinsert a collider.
        assert!(index.remove(&"EL-12".to_string()));
        assert!(index.insert("EL-12".to_string(), hs[3]));
        assert_eq!(index.find(&"EL-12".to_string()), Some(hs[3]));
        assert_eq!(index.find(&"EL-21".to_string()), Some(hs[2]));
    }

    #[test]
    fn grows_past_seventy_percent() {
        let (_store, hs) = handles(8);
        let mut index = HashIndex::new(10).unwrap();
        // Eight keys with pairwise distinct primary slots at capacity 10.
        let keys = [
            "EL-1", "EL-6", "EL-8", "CL-1", "CL-2", "CL-5", "OTH-2", "FUR-4",
        ];
        for (i, key) in keys.iter().enumerate() {
            assert!(index.insert(key.to_string(), hs[i]));
        }
        assert_eq!(index.capacity(), 20, "one growth rehash expected");
        for (i, key) in keys.iter().enumerate() {
            assert_eq!(index.find(&key.to_string()), Some(hs[i]), "key {key}");
        }
    }

    #[test]
    fn shrinks_below_thirty_percent() {
        let (_store, hs) = handles(8);
        let mut index = HashIndex::new(10).unwrap();
        let keys = [
            "EL-1", "EL-6", "EL-8", "CL-1", "CL-2", "CL-5", "OTH-2", "FUR-4",
        ];
        for (i, key) in keys.iter().enumerate() {
            index.insert(key.to_string(), hs[i]);
        }
        assert_eq!(index.capacity(), 20);
        for key in &keys[3..] {
            assert!(index.remove(&key.to_string()));
        }
        // 3 live entries out of 20 dropped under 30% along the way.
        assert!(index.capacity() < 20);
        for (i, key) in keys[..3].iter().enumerate() {
            assert_eq!(index.find(&key.to_string()), Some(hs[i]));
        }
    }

    #[test]
    fn shrink_clamps_at_one() {
        let (_store, hs) = handles(1);
        let mut index = HashIndex::new(2).unwrap();
        index.insert("EL-1".to_string(), hs[0]);
        index.remove(&"EL-1".to_string());
        assert!(index.capacity() >= 1);
        assert!(index.is_empty());
    }

    #[test]
    fn entries_dump_live_slots_only() {
        let (_store, hs) = handles(2);
        let mut index = HashIndex::new(8).unwrap();
        index.insert("EL-1".to_string(), hs[0]);
        index.insert("CL-2".to_string(), hs[1]);
        index.remove(&"EL-1".to_string());
        let entries = index.entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries.get(0).unwrap().0, "CL-2");
    }
}
