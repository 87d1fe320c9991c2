//! Attribute read and write. `getattr` is backed by the attribute cache
//! (spec.md §4.4); `setattr` always reaches the module and invalidates the
//! cached entry on success, since a stale post-write attribute would be
//! worse than an extra module call.

use std::sync::Arc;

use crate::attrs::{AttrMask, VfsAttrs};
use crate::cred::VfsCred;
use crate::error::{VfsError, VfsResult, VfsStatus};
use crate::fh::FileHandle;
use crate::module::Capability;
use crate::request::{Opcode, Request};
use crate::vfs::Vfs;

/// Fetches attributes for `fh`, consulting the attribute cache first.
pub fn getattr(
    vfs: &Arc<Vfs>,
    cred: &VfsCred,
    fh: FileHandle,
    mask: AttrMask,
    on_complete: impl FnOnce(VfsResult<VfsAttrs>) + Send + 'static,
) {
    let key = fh.as_bytes().to_vec();
    if let Some(cached) = vfs.attr_cache.get(&key) {
        if cached.present_mask.contains(mask) {
            on_complete(Ok(cached));
            return;
        }
    }

    let mut request = Request::new(Opcode::Getattr, fh, cred.clone());
    request.args.attrs = VfsAttrs::requesting(mask | AttrMask::CACHEABLE);

    let vfs_for_insert = vfs.clone();
    request.on_complete(move |req| {
        let result = if req.status == VfsStatus::Ok {
            let attrs = req.args.attrs;
            if attrs.has(AttrMask::CACHEABLE) {
                vfs_for_insert.attr_cache.insert(key, attrs);
            }
            Ok(attrs)
        } else {
            Err(VfsError(req.status))
        };
        on_complete(result);
    });

    vfs.dispatch(Capability::FS, request);
}

/// Applies `attrs` to `fh`, invalidating any cached attribute entry on
/// success (spec.md §4.4: writes must not leave a stale attribute cached).
pub fn setattr(
    vfs: &Arc<Vfs>,
    cred: &VfsCred,
    fh: FileHandle,
    attrs: VfsAttrs,
    on_complete: impl FnOnce(VfsResult<VfsAttrs>) + Send + 'static,
) {
    let key = fh.as_bytes().to_vec();
    let mut request = Request::new(Opcode::Setattr, fh, cred.clone());
    request.args.attrs = attrs;

    let vfs_for_invalidate = vfs.clone();
    request.on_complete(move |req| {
        vfs_for_invalidate.attr_cache.invalidate(&key);
        let result = if req.status == VfsStatus::Ok {
            Ok(req.args.attrs)
        } else {
            Err(VfsError(req.status))
        };
        on_complete(result);
    });

    vfs.dispatch(Capability::FS, request);
}
