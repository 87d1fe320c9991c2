//! The back-end plugin interface.
//!
//! Rust rendering of spec.md §6.1 ("Module interface"). A [`Module`] is what
//! the source calls a `chimera_vfs_module`: a set of lifecycle hooks plus a
//! dispatch entry point, registered once with a [`crate::vfs::Vfs`] and
//! thereafter reached only through the mount table and the procedure layer.

use bitflags::bitflags;

use crate::cred::VfsCred;
use crate::error::VfsStatus;
use crate::fh::FileHandle;
use crate::request::Request;

bitflags! {
    /// What a module supports, checked by the procedure layer before
    /// dispatch (`ENOTSUP` if the required bit is absent) and by request
    /// allocation for the delegation-vs-inline decision (`BLOCKING`).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Capability: u32 {
        /// Implements the POSIX-shaped filesystem procedures (§4.6).
        const FS = 1 << 0;
        /// Implements the key/value procedure set (plumbing only, §9).
        const KV = 1 << 1;
        /// `dispatch` may block; requests are handed to a delegation
        /// thread instead of being called inline (spec.md §4.5, §5).
        const BLOCKING = 1 << 2;
    }
}

/// A unique, small per-process identifier for a registered module,
/// assigned by [`crate::vfs::Vfs::register`] in registration order.
pub type ModuleId = u16;

/// The back-end plugin interface: a filesystem, object store, or other data
/// source that can be mounted into the namespace.
///
/// `dispatch` is synchronous from the module's point of view — it either
/// completes the request before returning (non-blocking modules) or is
/// invoked already running on a delegation thread (`Capability::BLOCKING`,
/// spec.md §4.5), so it is always safe for an implementation to block.
pub trait Module: Send + Sync {
    /// Stable name used by `mount()` to select this module (spec.md §6.1).
    fn name(&self) -> &str;

    /// Capabilities this module provides; checked before any procedure is
    /// dispatched to it.
    fn capabilities(&self) -> Capability;

    /// Called once when this module is registered with a [`crate::vfs::Vfs`].
    fn init(&self) -> Result<(), VfsStatus> {
        Ok(())
    }

    /// Called once, on process shutdown, after all mounts using this module
    /// have been unmounted.
    fn destroy(&self) {}

    /// Called once per [`crate::thread::VfsThread`] created, so modules that
    /// need per-thread state (connection pools, scratch buffers) can
    /// allocate it.
    fn thread_init(&self) {}

    /// Mirror of [`Module::thread_init`] for teardown.
    fn thread_destroy(&self) {}

    /// Services one request. Implementations read the opcode and payload
    /// from `request` and must call [`Request::complete`] (directly, or
    /// indirectly by returning and letting the dispatcher call it) exactly
    /// once with a non-[`VfsStatus::Unset`] status (spec.md §8 property 10).
    fn dispatch(&self, request: &mut Request);

    /// Mints the root handle for a new mount of this module. Called once,
    /// synchronously, from [`crate::proc::mount::mount`].
    fn mount_root_fh(&self, cred: &VfsCred, module_path: &str) -> Result<FileHandle, VfsStatus>;
}
