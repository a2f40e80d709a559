use std::collections::{HashSet, VecDeque};
use std::hash::Hash;

/// Bounded recently-seen-id window. Jobs and chunks arrive over both the
/// relay and the direct channel; the first copy wins, the second is
/// suppressed. Oldest entries are evicted once the bound is hit.
pub struct DedupWindow<K> {
    seen: HashSet<K>,
    order: VecDeque<K>,
    capacity: usize,
}

impl<K: Hash + Eq + Clone> DedupWindow<K> {
    pub fn new(capacity: usize) -> Self {
        Self {
            seen: HashSet::with_capacity(capacity),
            order: VecDeque::with_capacity(capacity),
            capacity: capacity.max(1),
        }
    }

    /// Record a key. Returns true if it was not seen before.
    pub fn insert(&mut self, key: K) -> bool {
        if self.seen.contains(&key) {
            return false;
        }

        if self.order.len() == self.capacity {
            if let Some(evicted) = self.order.pop_front() {
                self.seen.remove(&evicted);
            }
        }

        self.order.push_back(key.clone());
        self.seen.insert(key);
        true
    }

    pub fn contains(&self, key: &K) -> bool {
        self.seen.contains(key)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}
