//! The open-handle cache: two instances back PATH and FILE open tokens
//! (spec.md §4.3). Concurrent opens of the same `(module_id, fh)` key
//! collapse onto a single in-flight back-end call (§8 property 3); idle
//! handles (refcount zero) linger until the close sweeper reaps them after
//! [`crate::config::VfsConfig::deferred_close_age`] (§8 property 5).

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use parking_lot::{Condvar, Mutex};

use crate::error::VfsStatus;
use crate::module::ModuleId;

/// Which of the two open-handle caches a key belongs to (spec.md §4.3:
/// PATH tokens are opened by pathname-resolving back ends, FILE tokens by
/// back ends that hand out a stable file descriptor/object directly).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpenKind {
    Path,
    File,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct Key {
    module_id: ModuleId,
    fh: Vec<u8>,
}

enum Slot<T> {
    /// A back-end open call is in flight; waiters block on the shared
    /// condvar until it resolves.
    Pending,
    /// The handle is open and live, with `refcount` outstanding borrowers.
    Ready { handle: Arc<T>, refcount: u64, idle_since: Option<Instant> },
}

struct Shard<T> {
    slots: HashMap<Key, Slot<T>>,
}

/// A single handle checked out of the cache. Dropping it decrements the
/// refcount; it does not close the underlying handle synchronously, that is
/// left to [`OpenHandleCache::release`] plus the close sweeper so a racing
/// second opener can still find a live entry (spec.md §4.3, §8 property 5).
pub struct Lease<T> {
    pub handle: Arc<T>,
}

/// A sharded cache of open back-end handles, keyed by `(module_id, fh)`.
pub struct OpenHandleCache<T> {
    kind: OpenKind,
    shards: Vec<Mutex<Shard<T>>>,
    condvar: Condvar,
    mask: usize,
}

impl<T> OpenHandleCache<T> {
    pub fn new(kind: OpenKind, num_shards: usize) -> Self {
        let n = num_shards.next_power_of_two().max(1);
        let shards = (0..n)
            .map(|_| {
                Mutex::new(Shard {
                    slots: HashMap::new(),
                })
            })
            .collect();
        OpenHandleCache {
            kind,
            shards,
            condvar: Condvar::new(),
            mask: n - 1,
        }
    }

    pub fn kind(&self) -> OpenKind {
        self.kind
    }

    fn shard_index(module_id: ModuleId, fh: &[u8], mask: usize) -> usize {
        crate::fh::hash_bytes(fh).wrapping_add(module_id as u64) as usize & mask
    }

    /// Acquires a handle for `(module_id, fh)`, calling `open_fn` to perform
    /// the actual back-end open if no entry exists yet. Concurrent callers
    /// for the same key block on the shared condvar until the first
    /// opener's call resolves, then share its result (collapsing duplicate
    /// back-end opens, §8 property 3).
    pub fn acquire(
        &self,
        module_id: ModuleId,
        fh: &[u8],
        open_fn: impl FnOnce() -> Result<T, VfsStatus>,
    ) -> Result<Lease<T>, VfsStatus> {
        let key = Key {
            module_id,
            fh: fh.to_vec(),
        };
        let idx = Self::shard_index(module_id, fh, self.mask);
        let mut shard = self.shards[idx].lock();

        loop {
            match shard.slots.get_mut(&key) {
                Some(Slot::Ready { handle, refcount, idle_since }) => {
                    *refcount += 1;
                    *idle_since = None;
                    let handle = handle.clone();
                    return Ok(Lease { handle });
                }
                Some(Slot::Pending) => {
                    self.condvar.wait(&mut shard);
                    continue;
                }
                None => {
                    shard.slots.insert(key.clone(), Slot::Pending);
                    break;
                }
            }
        }

        drop(shard);
        let result = open_fn();
        let mut shard = self.shards[idx].lock();

        match result {
            Ok(handle) => {
                let handle = Arc::new(handle);
                shard.slots.insert(
                    key,
                    Slot::Ready {
                        handle: handle.clone(),
                        refcount: 1,
                        idle_since: None,
                    },
                );
                drop(shard);
                self.condvar.notify_all();
                Ok(Lease { handle })
            }
            Err(status) => {
                shard.slots.remove(&key);
                drop(shard);
                self.condvar.notify_all();
                Err(status)
            }
        }
    }

    /// Releases one outstanding reference to `(module_id, fh)`. When the
    /// refcount reaches zero the entry is marked idle rather than removed
    /// immediately, so the close sweeper can apply
    /// [`crate::config::VfsConfig::deferred_close_age`] before the back-end
    /// handle is actually closed.
    pub fn release(&self, module_id: ModuleId, fh: &[u8]) {
        let key = Key {
            module_id,
            fh: fh.to_vec(),
        };
        let idx = Self::shard_index(module_id, fh, self.mask);
        let mut shard = self.shards[idx].lock();
        if let Some(Slot::Ready { refcount, idle_since, .. }) = shard.slots.get_mut(&key) {
            *refcount = refcount.saturating_sub(1);
            if *refcount == 0 {
                *idle_since = Some(Instant::now());
            }
        }
    }

    /// Called periodically by the close sweeper: removes idle entries that
    /// have sat at refcount zero longer than `max_idle`, invoking
    /// `close_fn(module_id, fh_bytes, handle)` on each one before dropping
    /// it, so the caller can ask the owning module to release it
    /// (spec.md §8 property 5).
    pub fn sweep(&self, max_idle: std::time::Duration, mut close_fn: impl FnMut(ModuleId, &[u8], &T)) {
        for shard_lock in &self.shards {
            let mut shard = shard_lock.lock();
            let expired: Vec<Key> = shard
                .slots
                .iter()
                .filter_map(|(k, slot)| match slot {
                    Slot::Ready {
                        refcount: 0,
                        idle_since: Some(t),
                        ..
                    } if t.elapsed() >= max_idle => Some(k.clone()),
                    _ => None,
                })
                .collect();
            for key in expired {
                if let Some(Slot::Ready { handle, .. }) = shard.slots.remove(&key) {
                    close_fn(key.module_id, &key.fh, &handle);
                }
            }
        }
    }

    /// Number of entries currently tracked (ready or pending), for tests
    /// and diagnostics.
    pub fn len(&self) -> usize {
        self.shards.iter().map(|s| s.lock().slots.len()).sum()
    }
}
