//! A sharded, fixed-capacity, TTL-and-LRU cache.
//!
//! Backs both the attribute cache and the name cache (spec.md §4.4): the
//! source keeps two purpose-built caches with a hand-rolled intrusive
//! doubly-linked list over a slab for LRU order (§9 Design Notes style).
//! This is the same layout, generic over `K`/`V`: a per-shard slab
//! (`Vec<Slot<K, V>>`) with `prev`/`next` indices threading an LRU list, plus
//! a `HashMap<K, usize>` for O(1) key lookup. No external LRU crate.

use std::collections::HashMap;
use std::hash::Hash;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

const NIL: usize = usize::MAX;

struct Slot<K, V> {
    key: K,
    value: V,
    inserted_at: Instant,
    prev: usize,
    next: usize,
}

struct Shard<K, V> {
    slots: Vec<Option<Slot<K, V>>>,
    index: HashMap<K, usize>,
    free: Vec<usize>,
    head: usize,
    tail: usize,
    capacity: usize,
}

impl<K: Clone + Eq + Hash, V: Clone> Shard<K, V> {
    fn new(capacity: usize) -> Self {
        Shard {
            slots: Vec::with_capacity(capacity),
            index: HashMap::with_capacity(capacity),
            free: Vec::new(),
            head: NIL,
            tail: NIL,
            capacity,
        }
    }

    fn detach(&mut self, idx: usize) {
        let (prev, next) = {
            let slot = self.slots[idx].as_ref().unwrap();
            (slot.prev, slot.next)
        };
        if prev != NIL {
            self.slots[prev].as_mut().unwrap().next = next;
        } else {
            self.head = next;
        }
        if next != NIL {
            self.slots[next].as_mut().unwrap().prev = prev;
        } else {
            self.tail = prev;
        }
    }

    fn push_front(&mut self, idx: usize) {
        let old_head = self.head;
        {
            let slot = self.slots[idx].as_mut().unwrap();
            slot.prev = NIL;
            slot.next = old_head;
        }
        if old_head != NIL {
            self.slots[old_head].as_mut().unwrap().prev = idx;
        }
        self.head = idx;
        if self.tail == NIL {
            self.tail = idx;
        }
    }

    fn touch(&mut self, idx: usize) {
        if self.head == idx {
            return;
        }
        self.detach(idx);
        self.push_front(idx);
    }

    fn evict_tail(&mut self) {
        let idx = self.tail;
        if idx == NIL {
            return;
        }
        self.detach(idx);
        if let Some(slot) = self.slots[idx].take() {
            self.index.remove(&slot.key);
        }
        self.free.push(idx);
    }

    fn get(&mut self, key: &K, ttl: Duration) -> Option<V> {
        let idx = *self.index.get(key)?;
        let expired = {
            let slot = self.slots[idx].as_ref().unwrap();
            slot.inserted_at.elapsed() > ttl
        };
        if expired {
            self.detach(idx);
            if let Some(slot) = self.slots[idx].take() {
                self.index.remove(&slot.key);
            }
            self.free.push(idx);
            return None;
        }
        self.touch(idx);
        Some(self.slots[idx].as_ref().unwrap().value.clone())
    }

    fn insert(&mut self, key: K, value: V) {
        if let Some(&idx) = self.index.get(&key) {
            self.slots[idx] = Some(Slot {
                key: key.clone(),
                value,
                inserted_at: Instant::now(),
                prev: NIL,
                next: NIL,
            });
            self.touch(idx);
            return;
        }

        while self.index.len() >= self.capacity {
            self.evict_tail();
        }

        let idx = if let Some(idx) = self.free.pop() {
            idx
        } else {
            self.slots.push(None);
            self.slots.len() - 1
        };
        self.slots[idx] = Some(Slot {
            key: key.clone(),
            value,
            inserted_at: Instant::now(),
            prev: NIL,
            next: NIL,
        });
        self.index.insert(key, idx);
        self.push_front(idx);
    }

    fn remove(&mut self, key: &K) {
        if let Some(idx) = self.index.remove(key) {
            self.detach(idx);
            self.slots[idx] = None;
            self.free.push(idx);
        }
    }
}

/// A sharded cache mapping `K -> V` with a shared TTL and per-shard LRU
/// eviction once a shard hits capacity.
pub struct TtlCache<K, V> {
    shards: Vec<Mutex<Shard<K, V>>>,
    mask: usize,
    ttl: Duration,
}

impl<K: Clone + Eq + Hash, V: Clone> TtlCache<K, V> {
    /// Creates a cache with `num_shards` shards (rounded up to a power of
    /// two), each holding up to `capacity_per_shard` live entries.
    pub fn new(num_shards: usize, capacity_per_shard: usize, ttl: Duration) -> Self {
        let n = num_shards.next_power_of_two().max(1);
        let shards = (0..n).map(|_| Mutex::new(Shard::new(capacity_per_shard))).collect();
        TtlCache {
            shards,
            mask: n - 1,
            ttl,
        }
    }

    fn shard_for(&self, key: &K) -> &Mutex<Shard<K, V>>
    where
        K: std::hash::Hash,
    {
        use std::hash::Hasher;
        let mut hasher = std::collections::hash_map::DefaultHasher::new();
        key.hash(&mut hasher);
        &self.shards[(hasher.finish() as usize) & self.mask]
    }

    /// Returns a cloned value if `key` is present and not expired.
    pub fn get(&self, key: &K) -> Option<V> {
        self.shard_for(key).lock().get(key, self.ttl)
    }

    /// Inserts or refreshes `key -> value`, evicting the shard's
    /// least-recently-used entry first if the shard is full.
    pub fn insert(&self, key: K, value: V) {
        self.shard_for(&key).lock().insert(key, value);
    }

    /// Invalidates `key`, if present. Used on writes/renames/removes that
    /// change what an attribute or name lookup should return.
    pub fn invalidate(&self, key: &K) {
        self.shard_for(key).lock().remove(key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_then_get_roundtrips() {
        let cache: TtlCache<u64, &'static str> = TtlCache::new(4, 4, Duration::from_secs(60));
        cache.insert(1, "a");
        assert_eq!(cache.get(&1), Some("a"));
    }

    #[test]
    fn expired_entry_returns_none() {
        let cache: TtlCache<u64, &'static str> = TtlCache::new(1, 4, Duration::from_millis(1));
        cache.insert(1, "a");
        std::thread::sleep(Duration::from_millis(10));
        assert_eq!(cache.get(&1), None);
    }

    #[test]
    fn eviction_drops_least_recently_used() {
        let cache: TtlCache<u64, u64> = TtlCache::new(1, 2, Duration::from_secs(60));
        cache.insert(1, 1);
        cache.insert(2, 2);
        // touch 1 so 2 becomes LRU
        assert_eq!(cache.get(&1), Some(1));
        cache.insert(3, 3);
        assert_eq!(cache.get(&2), None);
        assert_eq!(cache.get(&1), Some(1));
        assert_eq!(cache.get(&3), Some(3));
    }

    #[test]
    fn invalidate_removes_entry() {
        let cache: TtlCache<u64, u64> = TtlCache::new(2, 4, Duration::from_secs(60));
        cache.insert(5, 50);
        cache.invalidate(&5);
        assert_eq!(cache.get(&5), None);
    }
}
