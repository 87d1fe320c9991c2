//! Open and close, backed by the two open-handle caches (spec.md §4.3).
//! Concurrent opens of the same `(module, fh)` collapse onto a single
//! module call via [`crate::cache::open_handle::OpenHandleCache::acquire`]
//! (§8 property 3); `close` only decrements a refcount; the close sweeper
//! thread (spec.md §4.3, deferred close) is what eventually asks the
//! module to actually release anything, after
//! [`crate::config::VfsConfig::deferred_close_age`] of inactivity.

use std::sync::Arc;

pub use crate::cache::open_handle::OpenKind;
use crate::cred::VfsCred;
use crate::error::{VfsError, VfsResult, VfsStatus};
use crate::fh::FileHandle;
use crate::module::Capability;
use crate::request::{Opcode, Request};
use crate::vfs::Vfs;

/// Opens `fh` through the cache selected by `kind`, calling the module at
/// most once per concurrent burst of openers.
pub fn open(
    vfs: &Arc<Vfs>,
    cred: &VfsCred,
    fh: FileHandle,
    kind: OpenKind,
    on_complete: impl FnOnce(VfsResult<()>) + Send + 'static,
) {
    let (module_id, _module) = match vfs.module_for_fh(&fh) {
        Ok(pair) => pair,
        Err(e) => {
            on_complete(Err(e));
            return;
        }
    };

    let vfs_for_call = vfs.clone();
    let cred_for_call = cred.clone();
    let result = match kind {
        OpenKind::Path => vfs.path_cache.acquire(module_id, fh.as_bytes(), move || {
            call_module_open(&vfs_for_call, &cred_for_call, fh)
        }),
        OpenKind::File => vfs.file_cache.acquire(module_id, fh.as_bytes(), move || {
            call_module_open(&vfs_for_call, &cred_for_call, fh)
        }),
    };

    on_complete(result.map(|_lease| ()).map_err(VfsError));
}

fn call_module_open(vfs: &Arc<Vfs>, cred: &VfsCred, fh: FileHandle) -> Result<(), VfsStatus> {
    let request = Request::new(Opcode::Open, fh, cred.clone());
    let status = vfs.dispatch_blocking(Capability::FS, request, |req| req.status);
    if status.is_ok() {
        Ok(())
    } else {
        Err(status)
    }
}

/// Releases one reference previously acquired via [`open`]. Does not
/// synchronously ask the module to close anything; see the close sweeper.
pub fn close(vfs: &Arc<Vfs>, fh: &FileHandle, kind: OpenKind) -> VfsResult<()> {
    let (module_id, _module) = vfs.module_for_fh(fh)?;
    match kind {
        OpenKind::Path => vfs.path_cache.release(module_id, fh.as_bytes()),
        OpenKind::File => vfs.file_cache.release(module_id, fh.as_bytes()),
    }
    Ok(())
}
