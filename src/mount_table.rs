//! Lock-free-read mount table.
//!
//! Grounded on `vfs/vfs_mount_table.h`: a fixed array of hash buckets, each a
//! singly linked chain of entries, with URCU guarding reader/writer
//! concurrency there. This crate has no `urcu` binding, so the same shape is
//! rebuilt on `arc_swap::ArcSwap`: each bucket is a published, immutable
//! `Arc<MountNode>` chain. Readers call `ArcSwap::load`, which is lock-free,
//! and walk the chain through cloned `Arc`s — no epoch to enter or exit,
//! because the `Arc` itself keeps a node alive for as long as a reader holds
//! it. This is a stricter safety property than the source's "caller must
//! hold the RCU read lock around use of the returned pointer" contract
//! (documented as a deliberate improvement, see DESIGN.md). Writers
//! (`insert`/`remove`) serialize through a `parking_lot::Mutex` and publish a
//! new chain head, exactly mirroring the source's insert/remove under
//! `pthread_mutex_lock`.

use std::sync::Arc;

use arc_swap::ArcSwap;
use parking_lot::Mutex;

use crate::fh::hash_bytes;
use crate::mount::{Mount, MountAttrs};

struct MountNode {
    mount: Arc<Mount>,
    next: Option<Arc<MountNode>>,
}

/// A sharded, lock-free-read table mapping `mount_id` to [`Mount`].
pub struct MountTable {
    buckets: Vec<ArcSwap<Option<Arc<MountNode>>>>,
    mask: usize,
    write_lock: Mutex<()>,
}

impl MountTable {
    /// Creates a table with `2^num_buckets_bits` buckets, mirroring the
    /// source's `chimera_vfs_mount_table_create(num_buckets_bits)`.
    pub fn new(num_buckets_bits: u32) -> Self {
        let n = 1usize << num_buckets_bits;
        let mut buckets = Vec::with_capacity(n);
        for _ in 0..n {
            buckets.push(ArcSwap::from_pointee(None));
        }
        MountTable {
            buckets,
            mask: n - 1,
            write_lock: Mutex::new(()),
        }
    }

    fn bucket_index(mount_id: &[u8]) -> usize {
        hash_bytes(mount_id) as usize
    }

    /// Publishes `mount` into the table, keyed by its `mount_id`.
    pub fn insert(&self, mount: Mount) {
        let idx = Self::bucket_index(&mount.mount_id) & self.mask;
        let _guard = self.write_lock.lock();
        let bucket = &self.buckets[idx];
        let current = bucket.load_full();
        let node = Arc::new(MountNode {
            mount: Arc::new(mount),
            next: (*current).clone(),
        });
        bucket.store(Arc::new(Some(node)));
    }

    /// Removes the mount whose `mount_id` matches, returning it if present.
    pub fn remove(&self, mount_id: &[u8]) -> Option<Arc<Mount>> {
        let idx = Self::bucket_index(mount_id) & self.mask;
        let _guard = self.write_lock.lock();
        let bucket = &self.buckets[idx];
        let current = bucket.load_full();

        let mut removed = None;
        let mut kept: Vec<Arc<Mount>> = Vec::new();
        let mut cursor = (*current).clone();
        while let Some(node) = cursor {
            if node.mount.mount_id == mount_id {
                removed = Some(node.mount.clone());
            } else {
                kept.push(node.mount.clone());
            }
            cursor = node.next.clone();
        }

        if removed.is_some() {
            let mut new_head: Option<Arc<MountNode>> = None;
            for mount in kept.into_iter().rev() {
                new_head = Some(Arc::new(MountNode {
                    mount,
                    next: new_head,
                }));
            }
            bucket.store(Arc::new(new_head));
        }
        removed
    }

    /// Looks up a mount by `mount_id`, returning an owned, cloned `Arc` that
    /// remains valid regardless of subsequent table mutation (see module
    /// doc comment for why this is safe without an explicit read-lock
    /// pairing, unlike the source).
    pub fn lookup(&self, mount_id: &[u8]) -> Option<Arc<Mount>> {
        let idx = Self::bucket_index(mount_id) & self.mask;
        let mut cursor = (*self.buckets[idx].load_full()).clone();
        while let Some(node) = cursor {
            if node.mount.mount_id == mount_id {
                return Some(node.mount.clone());
            }
            cursor = node.next.clone();
        }
        None
    }

    /// Convenience that copies just [`MountAttrs`] out, avoiding handing the
    /// caller the whole [`Mount`] when only metadata is needed.
    pub fn lookup_attrs(&self, mount_id: &[u8]) -> Option<MountAttrs> {
        self.lookup(mount_id).map(|m| m.attrs())
    }

    /// Finds the mount whose path is a prefix of `path`, matching on a full
    /// path-component boundary (mirrors `chimera_vfs_mount_table_find_by_path`).
    pub fn find_by_path(&self, path: &str) -> Option<Arc<Mount>> {
        self.for_each(|m| {
            if path == m.path {
                return true;
            }
            if let Some(rest) = path.strip_prefix(m.path.as_str()) {
                if m.path == "/" || rest.starts_with('/') {
                    return true;
                }
            }
            false
        })
    }

    /// Total number of mounts currently in the table (full scan, as in the
    /// source's `_count`).
    pub fn count(&self) -> usize {
        let mut total = 0;
        for bucket in &self.buckets {
            let mut cursor = (*bucket.load_full()).clone();
            while let Some(node) = cursor {
                total += 1;
                cursor = node.next.clone();
            }
        }
        total
    }

    /// Invokes `f` once per mount currently in the table, in unspecified
    /// (bucket) order. Used by the root pseudo-module's `readdir`, where the
    /// namespace is small and slow-changing enough that a full scan per
    /// call is fine.
    pub fn for_each_mount(&self, mut f: impl FnMut(Arc<Mount>)) {
        for bucket in &self.buckets {
            let mut cursor = (*bucket.load_full()).clone();
            while let Some(node) = cursor {
                f(node.mount.clone());
                cursor = node.next.clone();
            }
        }
    }

    fn for_each(&self, mut pred: impl FnMut(&Mount) -> bool) -> Option<Arc<Mount>> {
        for bucket in &self.buckets {
            let mut cursor = (*bucket.load_full()).clone();
            while let Some(node) = cursor {
                if pred(&node.mount) {
                    return Some(node.mount.clone());
                }
                cursor = node.next.clone();
            }
        }
        None
    }
}
