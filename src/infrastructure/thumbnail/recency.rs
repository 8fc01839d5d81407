//! Bounded recency-ordered cache primitive.

use std::borrow::Borrow;
use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;

/// One occupied slot in the recency list.
struct Slot<K, V> {
    key: K,
    value: V,
    prev: Option<usize>,
    next: Option<usize>,
}

/// Fixed-capacity cache with least-recently-used eviction.
///
/// Entries live in a recency order: insertions and hits move an entry to
/// the most-recently-used position, and inserting a new key into a full
/// cache evicts the least-recently-used entry first. All operations run
/// in O(1) amortized time.
///
/// Slots are stored in an index-linked arena, so no entry ever moves in
/// memory while linked.
pub struct RecencyCache<K, V> {
    map: HashMap<K, usize>,
    slots: Vec<Option<Slot<K, V>>>,
    free: Vec<usize>,
    head: Option<usize>,
    tail: Option<usize>,
    capacity: usize,
}

impl<K, V> RecencyCache<K, V>
where
    K: Eq + Hash + Clone,
{
    /// Creates a cache holding at most `capacity` entries.
    ///
    /// # Panics
    /// Panics if `capacity` is zero.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "cache capacity must be positive");
        Self {
            map: HashMap::with_capacity(capacity),
            slots: Vec::with_capacity(capacity),
            free: Vec::new(),
            head: None,
            tail: None,
            capacity,
        }
    }

    /// Returns the current number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Returns true if the cache holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Returns the maximum number of entries.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns true if `key` is present, without promoting it.
    #[must_use]
    pub fn contains<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.map.contains_key(key)
    }

    /// Inserts or overwrites an entry, making it the most recently used.
    ///
    /// When the key is new and the cache is full, the least-recently-used
    /// entry is evicted before the insert, so the entry count never
    /// exceeds the capacity.
    pub fn put(&mut self, key: K, value: V) {
        if let Some(&idx) = self.map.get(&key) {
            if let Some(slot) = self.slots.get_mut(idx).and_then(Option::as_mut) {
                slot.value = value;
            }
            self.detach(idx);
            self.attach_front(idx);
            return;
        }

        if self.map.len() >= self.capacity {
            self.evict_lru();
        }

        let idx = self.allocate(Slot {
            key: key.clone(),
            value,
            prev: None,
            next: None,
        });
        self.map.insert(key, idx);
        self.attach_front(idx);
    }

    /// Returns the value for `key`, promoting it to most recently used.
    pub fn get<Q>(&mut self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let idx = *self.map.get(key)?;
        self.detach(idx);
        self.attach_front(idx);
        self.slots
            .get(idx)
            .and_then(Option::as_ref)
            .map(|slot| &slot.value)
    }

    /// Returns the value for `key` without touching the recency order.
    #[must_use]
    pub fn peek<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let idx = *self.map.get(key)?;
        self.slots
            .get(idx)
            .and_then(Option::as_ref)
            .map(|slot| &slot.value)
    }

    /// Removes `key` and returns its value.
    pub fn remove<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let idx = self.map.remove(key)?;
        self.detach(idx);
        let slot = self.slots.get_mut(idx).and_then(Option::take)?;
        self.free.push(idx);
        Some(slot.value)
    }

    /// Drops every entry, keeping the configured capacity.
    pub fn clear(&mut self) {
        self.map.clear();
        self.slots.clear();
        self.free.clear();
        self.head = None;
        self.tail = None;
    }

    fn allocate(&mut self, slot: Slot<K, V>) -> usize {
        if let Some(idx) = self.free.pop() {
            if let Some(entry) = self.slots.get_mut(idx) {
                *entry = Some(slot);
            }
            idx
        } else {
            self.slots.push(Some(slot));
            self.slots.len() - 1
        }
    }

    fn evict_lru(&mut self) {
        let Some(tail) = self.tail else { return };
        self.detach(tail);
        if let Some(slot) = self.slots.get_mut(tail).and_then(Option::take) {
            self.map.remove(&slot.key);
            self.free.push(tail);
        }
    }

    /// Unlinks `idx` from the recency list, fixing up its neighbors.
    fn detach(&mut self, idx: usize) {
        let (prev, next) = match self.slots.get(idx).and_then(Option::as_ref) {
            Some(slot) => (slot.prev, slot.next),
            None => return,
        };

        match prev {
            Some(prev_idx) => {
                if let Some(slot) = self.slots.get_mut(prev_idx).and_then(Option::as_mut) {
                    slot.next = next;
                }
            }
            None => self.head = next,
        }

        match next {
            Some(next_idx) => {
                if let Some(slot) = self.slots.get_mut(next_idx).and_then(Option::as_mut) {
                    slot.prev = prev;
                }
            }
            None => self.tail = prev,
        }

        if let Some(slot) = self.slots.get_mut(idx).and_then(Option::as_mut) {
            slot.prev = None;
            slot.next = None;
        }
    }

    /// Links `idx` in as the most recently used entry.
    fn attach_front(&mut self, idx: usize) {
        let old_head = self.head;
        if let Some(slot) = self.slots.get_mut(idx).and_then(Option::as_mut) {
            slot.prev = None;
            slot.next = old_head;
        }

        match old_head {
            Some(head_idx) => {
                if let Some(slot) = self.slots.get_mut(head_idx).and_then(Option::as_mut) {
                    slot.prev = Some(idx);
                }
            }
            None => self.tail = Some(idx),
        }
        self.head = Some(idx);
    }
}

impl<K, V> fmt::Debug for RecencyCache<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecencyCache")
            .field("len", &self.map.len())
            .field("capacity", &self.capacity)
            .finish_non_exhaustive()
    }
}
