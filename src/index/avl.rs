//! Height-balanced ordered index: an AVL tree where each key owns a bucket
//! of record-store handles, so one key can reference many records.
//!
//! Nodes live in an arena and link to each other by index, which keeps
//! rotations and the predecessor splice of deletion as plain index rewiring.
//! Every structural change rebalances the affected path before returning;
//! the tree is never left half-rotated.

use std::cmp::Ordering;
use std::fmt::Display;

use crate::error::{EngineError, Result};
use crate::store::{Array, NodeHandle};

#[derive(Debug)]
struct AvlNode<K> {
    key: K,
    bucket: Array<NodeHandle>,
    left: Option<u32>,
    right: Option<u32>,
    height: u32,
    /// Total bucket entries in this subtree, buckets included.
    count: usize,
}

#[derive(Debug)]
enum Entry<K> {
    Occupied(AvlNode<K>),
    Vacant,
}

#[derive(Debug)]
pub struct OrderedIndex<K> {
    entries: Vec<Entry<K>>,
    free: Vec<u32>,
    root: Option<u32>,
}

impl<K: Ord + Clone> OrderedIndex<K> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            free: Vec::new(),
            root: None,
        }
    }

    /// Total handles stored across all buckets.
    pub fn len(&self) -> usize {
        self.count(self.root)
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    /// Number of distinct keys (tree nodes).
    pub fn key_count(&self) -> usize {
        fn walk<K>(index: &OrderedIndex<K>, node: Option<u32>) -> usize
        where
            K: Ord + Clone,
        {
            match node {
                None => 0,
                Some(idx) => {
                    let n = index.node(idx);
                    1 + walk(index, n.left) + walk(index, n.right)
                }
            }
        }
        walk(self, self.root)
    }

    /// Associates a handle with a key; an existing key grows its bucket.
    pub fn insert(&mut self, key: K, handle: NodeHandle) {
        self.root = Some(self.insert_at(self.root, key, Some(handle)));
    }

    /// Registers a key with an empty bucket; no-op when the key exists.
    pub fn insert_bare_key(&mut self, key: K) {
        self.root = Some(self.insert_at(self.root, key, None));
    }

    pub fn contains(&self, key: &K) -> bool {
        self.find_node(key).is_some()
    }

    /// The key's bucket, or an empty slice when the key is absent.
    pub fn get(&self, key: &K) -> &[NodeHandle] {
        match self.find_node(key) {
            Some(idx) => self.node(idx).bucket.as_slice(),
            None => &[],
        }
    }

    /// In-order rank: how many bucket entries sit under strictly smaller
    /// keys. `None` when the key is absent.
    pub fn index_of(&self, key: &K) -> Option<usize> {
        let mut current = self.root;
        let mut rank = 0;
        while let Some(idx) = current {
            let node = self.node(idx);
            match key.cmp(&node.key) {
                Ordering::Less => current = node.left,
                Ordering::Equal => return Some(rank + self.count(node.left)),
                Ordering::Greater => {
                    rank += self.count(node.left) + node.bucket.len();
                    current = node.right;
                }
            }
        }
        None
    }

    /// Removes a key together with its whole bucket.
    pub fn remove(&mut self, key: &K) -> bool {
        let (root, removed) = self.remove_at(self.root, key);
        self.root = root;
        removed
    }

    /// Drops one handle from the key's bucket; prunes the node when the
    /// bucket empties.
    pub fn remove_handle_at_key(&mut self, key: &K, handle: NodeHandle) -> bool {
        let removed = self.remove_handle_rec(self.root, key, handle);
        if removed {
            if let Some(idx) = self.find_node(key) {
                if self.node(idx).bucket.is_empty() {
                    self.remove(key);
                }
            }
        }
        removed
    }

    /// Global sweep: drops every handle the predicate matches, across all
    /// buckets. Emptied nodes are left for [`Self::compact`].
    pub fn remove_handles_by_predicate<F>(&mut self, mut predicate: F) -> usize
    where
        F: FnMut(NodeHandle) -> bool,
    {
        self.sweep(self.root, &mut predicate)
    }

    /// Excises every empty-bucket node, returning how many were removed.
    /// Implemented as ordinary keyed removals so AVL balance holds at every
    /// intermediate step.
    pub fn compact(&mut self) -> usize {
        let mut empty_keys = Vec::new();
        self.collect_empty_keys(self.root, &mut empty_keys);
        let removed = empty_keys.len();
        for key in empty_keys {
            self.remove(&key);
        }
        removed
    }

    /// In-order traversal of `(key, bucket)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&K, &[NodeHandle])> {
        let mut order = Vec::with_capacity(self.key_count());
        self.collect_in_order(self.root, &mut order);
        order.into_iter().map(move |idx| {
            let node = self.node(idx);
            (&node.key, node.bucket.as_slice())
        })
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.free.clear();
        self.root = None;
    }

    /// Verifies BST ordering, AVL balance and the cached height/count
    /// metrics of every node.
    pub fn validate(&self) -> Result<()> {
        self.validate_rec(self.root, None, None)?;
        Ok(())
    }

    fn validate_rec(
        &self,
        node: Option<u32>,
        lower: Option<&K>,
        upper: Option<&K>,
    ) -> Result<(u32, usize)> {
        let idx = match node {
            None => return Ok((0, 0)),
            Some(idx) => idx,
        };
        let n = self.node(idx);
        if let Some(lo) = lower {
            if n.key <= *lo {
                return Err(EngineError::Corruption("BST order violated".into()));
            }
        }
        if let Some(hi) = upper {
            if n.key >= *hi {
                return Err(EngineError::Corruption("BST order violated".into()));
            }
        }
        let (lh, lc) = self.validate_rec(n.left, lower, Some(&n.key))?;
        let (rh, rc) = self.validate_rec(n.right, Some(&n.key), upper)?;
        if lh.abs_diff(rh) > 1 {
            return Err(EngineError::Corruption(format!(
                "AVL balance violated: child heights {lh} and {rh}"
            )));
        }
        let height = lh.max(rh) + 1;
        let count = lc + rc + n.bucket.len();
        if n.height != height || n.count != count {
            return Err(EngineError::Corruption(
                "cached height/count out of date".into(),
            ));
        }
        Ok((height, count))
    }

    fn insert_at(&mut self, node: Option<u32>, key: K, handle: Option<NodeHandle>) -> u32 {
        let idx = match node {
            None => return self.alloc(key, handle),
            Some(idx) => idx,
        };
        match key.cmp(&self.node(idx).key) {
            Ordering::Equal => {
                if let Some(handle) = handle {
                    self.node_mut(idx).bucket.push(handle);
                }
                self.update(idx);
                idx
            }
            Ordering::Less => {
                let left = self.node(idx).left;
                let new_left = self.insert_at(left, key, handle);
                self.node_mut(idx).left = Some(new_left);
                self.rebalance(idx)
            }
            Ordering::Greater => {
                let right = self.node(idx).right;
                let new_right = self.insert_at(right, key, handle);
                self.node_mut(idx).right = Some(new_right);
                self.rebalance(idx)
            }
        }
    }

    fn remove_at(&mut self, node: Option<u32>, key: &K) -> (Option<u32>, bool) {
        let idx = match node {
            None => return (None, false),
            Some(idx) => idx,
        };
        match key.cmp(&self.node(idx).key) {
            Ordering::Less => {
                let left = self.node(idx).left;
                let (new_left, removed) = self.remove_at(left, key);
                self.node_mut(idx).left = new_left;
                (Some(self.rebalance(idx)), removed)
            }
            Ordering::Greater => {
                let right = self.node(idx).right;
                let (new_right, removed) = self.remove_at(right, key);
                self.node_mut(idx).right = new_right;
                (Some(self.rebalance(idx)), removed)
            }
            Ordering::Equal => {
                let (left, right) = {
                    let n = self.node(idx);
                    (n.left, n.right)
                };
                match (left, right) {
                    (None, None) => {
                        self.release(idx);
                        (None, true)
                    }
                    (Some(child), None) | (None, Some(child)) => {
                        self.release(idx);
                        (Some(child), true)
                    }
                    (Some(left_idx), Some(_)) => {
                        // Splice in the in-order predecessor's key and
                        // bucket, then delete the predecessor's node.
                        let pred = self.max_of(left_idx);
                        let (pred_key, pred_bucket) = {
                            let n = self.node_mut(pred);
                            (n.key.clone(), std::mem::take(&mut n.bucket))
                        };
                        {
                            let n = self.node_mut(idx);
                            n.key = pred_key.clone();
                            n.bucket = pred_bucket;
                        }
                        let (new_left, _) = self.remove_at(Some(left_idx), &pred_key);
                        self.node_mut(idx).left = new_left;
                        (Some(self.rebalance(idx)), true)
                    }
                }
            }
        }
    }

    fn remove_handle_rec(&mut self, node: Option<u32>, key: &K, handle: NodeHandle) -> bool {
        let idx = match node {
            None => return false,
            Some(idx) => idx,
        };
        match key.cmp(&self.node(idx).key) {
            Ordering::Equal => {
                let removed = self.node_mut(idx).bucket.remove_first_match(&handle);
                if removed {
                    self.update(idx);
                }
                removed
            }
            Ordering::Less => {
                let left = self.node(idx).left;
                let removed = self.remove_handle_rec(left, key, handle);
                if removed {
                    self.update(idx);
                }
                removed
            }
            Ordering::Greater => {
                let right = self.node(idx).right;
                let removed = self.remove_handle_rec(right, key, handle);
                if removed {
                    self.update(idx);
                }
                removed
            }
        }
    }

    fn sweep<F>(&mut self, node: Option<u32>, predicate: &mut F) -> usize
    where
        F: FnMut(NodeHandle) -> bool,
    {
        let idx = match node {
            None => return 0,
            Some(idx) => idx,
        };
        let (left, right) = {
            let n = self.node(idx);
            (n.left, n.right)
        };
        let removed_left = self.sweep(left, predicate);
        let removed_right = self.sweep(right, predicate);
        let removed_here = {
            let n = self.node_mut(idx);
            let before = n.bucket.len();
            n.bucket.retain(|handle| !predicate(*handle));
            before - n.bucket.len()
        };
        self.update(idx);
        removed_left + removed_here + removed_right
    }

    fn collect_empty_keys(&self, node: Option<u32>, out: &mut Vec<K>) {
        if let Some(idx) = node {
            let n = self.node(idx);
            self.collect_empty_keys(n.left, out);
            if n.bucket.is_empty() {
                out.push(n.key.clone());
            }
            self.collect_empty_keys(n.right, out);
        }
    }

    fn collect_in_order(&self, node: Option<u32>, out: &mut Vec<u32>) {
        if let Some(idx) = node {
            let n = self.node(idx);
            self.collect_in_order(n.left, out);
            out.push(idx);
            self.collect_in_order(n.right, out);
        }
    }

    fn find_node(&self, key: &K) -> Option<u32> {
        let mut current = self.root;
        while let Some(idx) = current {
            let node = self.node(idx);
            match key.cmp(&node.key) {
                Ordering::Less => current = node.left,
                Ordering::Equal => return Some(idx),
                Ordering::Greater => current = node.right,
            }
        }
        None
    }

    fn max_of(&self, mut idx: u32) -> u32 {
        while let Some(right) = self.node(idx).right {
            idx = right;
        }
        idx
    }

    fn alloc(&mut self, key: K, handle: Option<NodeHandle>) -> u32 {
        let mut bucket = Array::new();
        if let Some(handle) = handle {
            bucket.push(handle);
        }
        let count = bucket.len();
        let node = AvlNode {
            key,
            bucket,
            left: None,
            right: None,
            height: 1,
            count,
        };
        match self.free.pop() {
            Some(idx) => {
                self.entries[idx as usize] = Entry::Occupied(node);
                idx
            }
            None => {
                let idx = self.entries.len() as u32;
                self.entries.push(Entry::Occupied(node));
                idx
            }
        }
    }

    fn release(&mut self, idx: u32) {
        self.entries[idx as usize] = Entry::Vacant;
        self.free.push(idx);
    }

    fn node(&self, idx: u32) -> &AvlNode<K> {
        match &self.entries[idx as usize] {
            Entry::Occupied(node) => node,
            Entry::Vacant => unreachable!("vacant arena entry in live tree"),
        }
    }

    fn node_mut(&mut self, idx: u32) -> &mut AvlNode<K> {
        match &mut self.entries[idx as usize] {
            Entry::Occupied(node) => node,
            Entry::Vacant => unreachable!("vacant arena entry in live tree"),
        }
    }

    fn height(&self, node: Option<u32>) -> u32 {
        node.map_or(0, |idx| self.node(idx).height)
    }

    fn count(&self, node: Option<u32>) -> usize {
        node.map_or(0, |idx| self.node(idx).count)
    }

    fn update(&mut self, idx: u32) {
        let (left, right, bucket_len) = {
            let n = self.node(idx);
            (n.left, n.right, n.bucket.len())
        };
        let height = self.height(left).max(self.height(right)) + 1;
        let count = self.count(left) + self.count(right) + bucket_len;
        let n = self.node_mut(idx);
        n.height = height;
        n.count = count;
    }

    /// Refreshes metrics and applies the single or double rotation the AVL
    /// balance rule calls for. Returns the subtree's new root.
    fn rebalance(&mut self, idx: u32) -> u32 {
        self.update(idx);
        let (left, right) = {
            let n = self.node(idx);
            (n.left, n.right)
        };
        let balance = self.height(left) as i64 - self.height(right) as i64;

        if balance > 1 {
            let left_idx = match left {
                Some(left_idx) => left_idx,
                None => return idx,
            };
            let ll = self.height(self.node(left_idx).left);
            let lr = self.height(self.node(left_idx).right);
            if ll < lr {
                let new_left = self.rotate_left(left_idx);
                self.node_mut(idx).left = Some(new_left);
            }
            self.rotate_right(idx)
        } else if balance < -1 {
            let right_idx = match right {
                Some(right_idx) => right_idx,
                None => return idx,
            };
            let rr = self.height(self.node(right_idx).right);
            let rl = self.height(self.node(right_idx).left);
            if rr < rl {
                let new_right = self.rotate_right(right_idx);
                self.node_mut(idx).right = Some(new_right);
            }
            self.rotate_left(idx)
        } else {
            idx
        }
    }

    fn rotate_left(&mut self, idx: u32) -> u32 {
        let pivot = match self.node(idx).right {
            Some(pivot) => pivot,
            None => return idx,
        };
        let pivot_left = self.node(pivot).left;
        self.node_mut(idx).right = pivot_left;
        self.node_mut(pivot).left = Some(idx);
        self.update(idx);
        self.update(pivot);
        pivot
    }

    fn rotate_right(&mut self, idx: u32) -> u32 {
        let pivot = match self.node(idx).left {
            Some(pivot) => pivot,
            None => return idx,
        };
        let pivot_right = self.node(pivot).right;
        self.node_mut(idx).left = pivot_right;
        self.node_mut(pivot).right = Some(idx);
        self.update(idx);
        self.update(pivot);
        pivot
    }
}

impl<K: Ord + Clone + Display> OrderedIndex<K> {
    /// Renders an indented tree diagram for diagnostics. The right subtree
    /// prints above its parent; each key line shows its bucket size, and
    /// `resolve` supplies one display line per reachable record.
    pub fn render_with<F>(&self, resolve: F) -> String
    where
        F: Fn(NodeHandle) -> Option<String>,
    {
        let mut out = String::new();
        self.render_rec(self.root, "", true, &resolve, &mut out);
        out
    }

    fn render_rec<F>(
        &self,
        node: Option<u32>,
        indent: &str,
        is_last: bool,
        resolve: &F,
        out: &mut String,
    ) where
        F: Fn(NodeHandle) -> Option<String>,
    {
        let idx = match node {
            None => return,
            Some(idx) => idx,
        };
        let n = self.node(idx);
        let deeper = format!("{indent}{}", if is_last { "    " } else { "│   " });

        self.render_rec(n.right, &deeper, false, resolve, out);

        out.push_str(indent);
        out.push_str(if is_last { "└── " } else { "├── " });
        out.push_str(&format!("{} (refs={})\n", n.key, n.bucket.len()));
        for handle in n.bucket.iter() {
            if let Some(line) = resolve(*handle) {
                out.push_str(&deeper);
                out.push_str("│   ");
                out.push_str(&line);
                out.push('\n');
            }
        }

        self.render_rec(n.left, &deeper, true, resolve, out);
    }
}

impl<K: Ord + Clone> Default for OrderedIndex<K> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::RecordStore;

    fn handles(n: usize) -> Vec<NodeHandle> {
        let mut store = RecordStore::new();
        (0..n as u32).map(|i| store.push_back(i)).collect()
    }

    #[test]
    fn duplicate_keys_share_a_node() {
        let hs = handles(3);
        let mut index = OrderedIndex::new();
        index.insert(1, hs[0]);
        index.insert(2, hs[1]);
        index.insert(1, hs[2]);
        assert_eq!(index.key_count(), 2);
        assert_eq!(index.len(), 3);
        assert_eq!(index.get(&1), &[hs[0], hs[2]]);
        assert_eq!(index.index_of(&1), Some(0));
        assert_eq!(index.index_of(&2), Some(2));
        index.validate().unwrap();
    }

    #[test]
    fn absent_key_is_empty_not_error() {
        let index: OrderedIndex<i32> = OrderedIndex::new();
        assert!(index.get(&5).is_empty());
        assert_eq!(index.index_of(&5), None);
        assert!(!index.contains(&5));
    }

    #[test]
    fn stays_balanced_under_sorted_inserts() {
        let hs = handles(64);
        let mut index = OrderedIndex::new();
        for (i, handle) in hs.iter().enumerate() {
            index.insert(i as i32, *handle);
            index.validate().unwrap();
        }
        let keys: Vec<_> = index.iter().map(|(k, _)| *k).collect();
        assert_eq!(keys, (0..64).collect::<Vec<_>>());
    }

    #[test]
    fn remove_two_children_splices_predecessor() {
        let hs = handles(7);
        let mut index = OrderedIndex::new();
        for (i, key) in [4, 2, 6, 1, 3, 5, 7].iter().enumerate() {
            index.insert(*key, hs[i]);
        }
        assert!(index.remove(&4));
        assert!(!index.contains(&4));
        assert_eq!(index.key_count(), 6);
        index.validate().unwrap();
        let keys: Vec<_> = index.iter().map(|(k, _)| *k).collect();
        assert_eq!(keys, [1, 2, 3, 5, 6, 7]);
    }

    #[test]
    fn remove_reports_absence() {
        let mut index: OrderedIndex<i32> = OrderedIndex::new();
        assert!(!index.remove(&1));
        let hs = handles(1);
        index.insert(1, hs[0]);
        assert!(index.remove(&1));
        assert!(index.is_empty());
    }

    #[test]
    fn bare_key_then_handles() {
        let hs = handles(1);
        let mut index = OrderedIndex::new();
        index.insert_bare_key(10);
        assert!(index.contains(&10));
        assert!(index.get(&10).is_empty());
        index.insert_bare_key(10); // no-op
        assert_eq!(index.key_count(), 1);
        index.insert(10, hs[0]);
        assert_eq!(index.get(&10), &[hs[0]]);
        index.validate().unwrap();
    }

    #[test]
    fn remove_handle_prunes_emptied_node() {
        let hs = handles(2);
        let mut index = OrderedIndex::new();
        index.insert(1, hs[0]);
        index.insert(1, hs[1]);
        assert!(index.remove_handle_at_key(&1, hs[0]));
        assert_eq!(index.get(&1), &[hs[1]]);
        assert!(index.contains(&1));
        assert!(index.remove_handle_at_key(&1, hs[1]));
        assert!(!index.contains(&1), "emptied node must be pruned");
        assert!(!index.remove_handle_at_key(&1, hs[1]));
        index.validate().unwrap();
    }

    #[test]
    fn predicate_sweep_and_compact() {
        let hs = handles(6);
        let mut index = OrderedIndex::new();
        for (i, key) in [1, 1, 2, 2, 3, 3].iter().enumerate() {
            index.insert(*key, hs[i]);
        }
        let doomed = [hs[0], hs[1], hs[4]];
        let removed = index.remove_handles_by_predicate(|h| doomed.contains(&h));
        assert_eq!(removed, 3);
        assert!(index.get(&1).is_empty());
        assert_eq!(index.get(&2).len(), 2);
        assert_eq!(index.get(&3), &[hs[5]]);
        assert_eq!(index.key_count(), 3, "sweep leaves empty nodes in place");
        index.validate().unwrap();

        assert_eq!(index.compact(), 1);
        assert_eq!(index.key_count(), 2);
        assert!(!index.contains(&1));
        index.validate().unwrap();
    }

    #[test]
    fn rank_counts_bucket_entries() {
        let hs = handles(5);
        let mut index = OrderedIndex::new();
        index.insert(10, hs[0]);
        index.insert(10, hs[1]);
        index.insert(20, hs[2]);
        index.insert(30, hs[3]);
        index.insert(30, hs[4]);
        assert_eq!(index.index_of(&10), Some(0));
        assert_eq!(index.index_of(&20), Some(2));
        assert_eq!(index.index_of(&30), Some(3));
        assert_eq!(index.len(), 5);
    }

    #[test]
    fn render_layout() {
        let hs = handles(2);
        let mut index = OrderedIndex::new();
        index.insert(2, hs[0]);
        index.insert(1, hs[1]);
        let rendered = index.render_with(|_| Some("rec".to_string()));
        assert!(rendered.contains("└── 2 (refs=1)"));
        assert!(rendered.contains("1 (refs=1)"));
        assert!(rendered.contains("rec"));
    }
}
