//! Per-OS-thread VFS context.
//!
//! Grounded on `vfs_internal.h`'s thread-local free lists and active-request
//! list (`chimera_vfs_request_alloc_common` pops from a free list or
//! allocates; `chimera_vfs_request_free` returns a request to it) plus the
//! per-thread `pending_complete_requests` queue `chimera_vfs_complete_delegate`
//! appends to and rings a doorbell over. One [`VfsThread`] is created by the
//! embedder for each OS thread that will call into the VFS core (its own
//! event-loop thread; delegation threads and the close thread own their own
//! internally).

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::metrics::OpMetrics;
use crate::request::{Opcode, Request, OPEN_ID_SYNTHETIC};

/// Rung whenever a request completes on a thread other than the one that
/// issued it (delegation-thread completion, spec.md §4.5). The core never
/// polls or owns an event loop itself; it only calls this trait so the
/// embedder's own loop can wake up and drain [`Mailbox::drain`].
pub trait Doorbell: Send + Sync {
    fn ring(&self);
}

/// A no-op doorbell for contexts (tests, synchronous embedders) that poll
/// the mailbox directly instead of waiting on a wakeup.
pub struct NullDoorbell;

impl Doorbell for NullDoorbell {
    fn ring(&self) {}
}

/// The cross-thread-shareable half of a [`VfsThread`]: a queue of
/// delegated-completion tokens plus the doorbell that announces them.
/// Request completion callbacks clone a thread's `Arc<Mailbox>` so they can
/// notify it regardless of which thread ends up running `complete()`
/// (spec.md §4.5: inline dispatch completes on the calling thread,
/// delegated dispatch completes on a delegation thread).
pub struct Mailbox {
    pending: Mutex<VecDeque<u64>>,
    doorbell: Box<dyn Doorbell>,
}

impl Mailbox {
    pub fn new(doorbell: Box<dyn Doorbell>) -> Self {
        Mailbox {
            pending: Mutex::new(VecDeque::new()),
            doorbell,
        }
    }

    /// Queues `request_token` as complete and rings the doorbell.
    pub fn notify(&self, request_token: u64) {
        self.pending.lock().push_back(request_token);
        self.doorbell.ring();
    }

    /// Drains all tokens queued since the last call.
    pub fn drain(&self) -> Vec<u64> {
        self.pending.lock().drain(..).collect()
    }
}

struct SyntheticSlot {
    cache_id: u64,
}

/// Per-OS-thread VFS state: metrics, the synthetic-handle free list, and a
/// [`Mailbox`] for requests this thread issues that end up completing on a
/// delegation thread.
pub struct VfsThread {
    pub(crate) metrics: OpMetrics,
    synthetic_free: Vec<SyntheticSlot>,
    next_synthetic_id: u64,
    mailbox: Arc<Mailbox>,
}

impl VfsThread {
    /// Creates a new thread context. `doorbell` is rung each time a request
    /// delegated from this thread completes elsewhere (spec.md §4.5).
    pub fn new(doorbell: Box<dyn Doorbell>) -> Self {
        VfsThread {
            metrics: OpMetrics::default(),
            synthetic_free: Vec::new(),
            next_synthetic_id: 0,
            mailbox: Arc::new(Mailbox::new(doorbell)),
        }
    }

    /// The thread's mailbox, clonable into a request's completion callback
    /// so a delegation thread can notify this thread when it finishes work
    /// issued from here.
    pub fn mailbox(&self) -> Arc<Mailbox> {
        self.mailbox.clone()
    }

    /// Allocates a synthetic `cache_id` for a request that bypasses both
    /// open-handle caches entirely (spec.md §4.3).
    pub(crate) fn alloc_synthetic(&mut self) -> u64 {
        if let Some(slot) = self.synthetic_free.pop() {
            return slot.cache_id;
        }
        let id = self.next_synthetic_id;
        self.next_synthetic_id += 1;
        id
    }

    /// Returns a synthetic slot to the free list. Only valid for handles
    /// allocated by [`VfsThread::alloc_synthetic`]; mirrors the source's
    /// assertion that only `CHIMERA_VFS_OPEN_ID_SYNTHETIC` handles pass
    /// through this path.
    pub(crate) fn free_synthetic(&mut self, cache_id: u64) {
        debug_assert_ne!(cache_id, OPEN_ID_SYNTHETIC);
        self.synthetic_free.push(SyntheticSlot { cache_id });
    }

    /// Records a completed request's latency.
    pub(crate) fn record(&mut self, op: Opcode, req: &Request) {
        self.metrics.record(op, req.elapsed());
    }

    /// Convenience equivalent to `self.mailbox().drain()`, for embedders
    /// that keep a `VfsThread` around rather than holding the `Arc`
    /// separately.
    pub fn drain_completions(&self) -> Vec<u64> {
        self.mailbox.drain()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn synthetic_ids_are_reused() {
        let mut t = VfsThread::new(Box::new(NullDoorbell));
        let a = t.alloc_synthetic();
        t.free_synthetic(a);
        let b = t.alloc_synthetic();
        assert_eq!(a, b);
    }

    #[test]
    fn delegated_completion_is_drained_once() {
        let t = VfsThread::new(Box::new(NullDoorbell));
        t.mailbox().notify(7);
        t.mailbox().notify(8);
        assert_eq!(t.drain_completions(), vec![7, 8]);
        assert!(t.drain_completions().is_empty());
    }
}
