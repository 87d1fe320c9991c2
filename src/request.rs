//! The request object: the single source of truth for one in-flight
//! operation, from allocation through completion.
//!
//! Grounded on `vfs_internal.h`'s `chimera_vfs_request_alloc_common`,
//! `chimera_vfs_complete`, and `chimera_vfs_request_free`: there a request is
//! a `calloc`'d struct threaded onto a thread-local free list and an active
//! intrusive list; here it is an owned Rust value moved between those same
//! conceptual states, with the free-list recycling still present (spec.md
//! §5, bounded allocation) but expressed as `Vec<Request>` pools on
//! [`crate::thread::VfsThread`] rather than raw linked lists.

use std::time::Instant;

use crate::attrs::VfsAttrs;
use crate::cred::VfsCred;
use crate::error::VfsStatus;
use crate::fh::FileHandle;

/// The VFS operations a [`crate::module::Module`] may be asked to service.
/// Mirrors spec.md §4.6's procedure grouping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(usize)]
pub enum Opcode {
    Mount = 0,
    Umount = 1,
    Open = 2,
    Lookup = 3,
    Getattr = 4,
    Setattr = 5,
    Read = 6,
    Write = 7,
    Readdir = 8,
    Mkdir = 9,
    Remove = 10,
    Symlink = 11,
    Link = 12,
    Rename = 13,
    Mknod = 14,
    Commit = 15,
    Allocate = 16,
    CreateUnlinked = 17,
    /// Issued only by the close sweeper (spec.md §4.3), never by the
    /// procedure layer: releases whatever the module allocated on `Open`.
    Close = 18,
}

impl Opcode {
    /// Number of distinct opcodes; used to size per-opcode tables
    /// ([`crate::metrics::OpMetrics`]).
    pub const COUNT: usize = 19;
}

/// Reserved `cache_id` marking a handle minted from a thread's synthetic
/// free list rather than either open-handle cache (spec.md §4.3).
pub const OPEN_ID_SYNTHETIC: u64 = u64::MAX;

/// One entry of a `readdir` reply: a child name, its handle, and whatever
/// attributes the module filled in alongside it.
#[derive(Debug, Clone)]
pub struct ReaddirEntry {
    pub name: String,
    pub fh: FileHandle,
    pub attrs: VfsAttrs,
}

/// Opcode-specific arguments and reply slots. Kept as one enum (rather than
/// a trait-object payload) since a request's shape is fixed once its opcode
/// is chosen, and callers match on it directly the way the source's union
/// of per-opcode structs is matched by opcode.
#[derive(Debug, Clone, Default)]
pub struct RequestArgs {
    pub name: Option<String>,
    pub target: Option<FileHandle>,
    pub attrs: VfsAttrs,
    pub offset: u64,
    pub length: u64,
    pub data: Vec<u8>,
    pub cookie: u64,
    pub mode: u32,
    pub module_name: Option<String>,
    pub mount_path: Option<String>,
    pub options: Vec<(String, Option<String>)>,
    /// Accumulated entries for a `readdir` reply (spec.md §4.6). Rust-native
    /// rendering of the source's per-entry callback invoked during readdir.
    pub readdir_entries: Vec<ReaddirEntry>,
    /// Set once a `readdir` reply has emitted every entry starting from the
    /// request's cookie.
    pub eof: bool,
}

/// One in-flight VFS operation. Carries its own status and completion
/// callback so that `complete()` is the single place a reply is ever
/// produced (spec.md §8 property 10: no request completes twice, none are
/// dropped un-completed).
pub struct Request {
    pub opcode: Opcode,
    pub fh: FileHandle,
    pub cred: VfsCred,
    pub args: RequestArgs,
    pub status: VfsStatus,
    pub module_id: Option<crate::module::ModuleId>,
    pub cache_id: u64,
    start_time: Instant,
    /// Set by [`crate::dispatch::dispatch`] when a `Capability::BLOCKING`
    /// module hands this request to a delegation thread; `complete()`
    /// consults it to decide whether completion must be queued back for the
    /// originating thread or can run inline.
    pub(crate) delegated: bool,
    completion: Option<Box<dyn FnOnce(&Request) + Send>>,
}

impl Request {
    /// Allocates a new request. Mirrors `chimera_vfs_request_alloc_common`:
    /// status starts `Unset`, the clock starts now.
    pub fn new(opcode: Opcode, fh: FileHandle, cred: VfsCred) -> Self {
        Request {
            opcode,
            fh,
            cred,
            args: RequestArgs::default(),
            status: VfsStatus::Unset,
            module_id: None,
            cache_id: 0,
            start_time: Instant::now(),
            delegated: false,
            completion: None,
        }
    }

    /// Installs the callback `complete()` will invoke. Replaces any
    /// previously installed callback (used when a subrequest's completion
    /// trampolines into its parent, e.g. root lookup, spec.md §4.7).
    pub fn on_complete(&mut self, f: impl FnOnce(&Request) + Send + 'static) {
        self.completion = Some(Box::new(f));
    }

    /// Elapsed time since allocation.
    pub fn elapsed(&self) -> std::time::Duration {
        self.start_time.elapsed()
    }

    /// Marks the request done with `status` and invokes the completion
    /// callback exactly once (spec.md §8 property 10: every request
    /// completes exactly once with a real status). A module bug that
    /// completes with `VfsStatus::Unset` is logged as an error and coerced
    /// to `VfsStatus::Eio` rather than propagated, so the single reply still
    /// goes out.
    pub fn complete(&mut self, status: VfsStatus) {
        self.status = if status == VfsStatus::Unset {
            log::error!("request for opcode {:?} completed as Unset", self.opcode);
            VfsStatus::Eio
        } else {
            status
        };
        if let Some(f) = self.completion.take() {
            f(self);
        }
    }
}

impl std::fmt::Debug for Request {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Request")
            .field("opcode", &self.opcode)
            .field("fh", &self.fh)
            .field("status", &self.status)
            .finish()
    }
}
