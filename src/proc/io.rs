//! Data-path operations: read, write, commit (fsync-equivalent), and
//! allocate (fallocate-equivalent). None of these touch the attribute or
//! name caches directly; a write that changes size/mtime should be
//! followed by the caller invalidating via [`crate::proc::attr::setattr`]
//! or simply letting the attribute cache's TTL expire (spec.md §4.4).

use std::sync::Arc;

use crate::cred::VfsCred;
use crate::error::{VfsError, VfsResult, VfsStatus};
use crate::fh::FileHandle;
use crate::module::Capability;
use crate::request::{Opcode, Request};
use crate::vfs::Vfs;

/// Reads up to `length` bytes starting at `offset` from `fh`.
pub fn read(
    vfs: &Arc<Vfs>,
    cred: &VfsCred,
    fh: FileHandle,
    offset: u64,
    length: u64,
    on_complete: impl FnOnce(VfsResult<Vec<u8>>) + Send + 'static,
) {
    let mut request = Request::new(Opcode::Read, fh, cred.clone());
    request.args.offset = offset;
    request.args.length = length;

    request.on_complete(move |req| {
        let result = if req.status == VfsStatus::Ok {
            Ok(req.args.data.clone())
        } else {
            Err(VfsError(req.status))
        };
        on_complete(result);
    });

    vfs.dispatch(Capability::FS, request);
}

/// Writes `data` starting at `offset` to `fh`, returning the number of
/// bytes the module actually accepted.
pub fn write(
    vfs: &Arc<Vfs>,
    cred: &VfsCred,
    fh: FileHandle,
    offset: u64,
    data: Vec<u8>,
    on_complete: impl FnOnce(VfsResult<u64>) + Send + 'static,
) {
    let mut request = Request::new(Opcode::Write, fh, cred.clone());
    request.args.offset = offset;
    request.args.length = data.len() as u64;
    request.args.data = data;

    request.on_complete(move |req| {
        let result = if req.status == VfsStatus::Ok {
            Ok(req.args.length)
        } else {
            Err(VfsError(req.status))
        };
        on_complete(result);
    });

    vfs.dispatch(Capability::FS, request);
}

/// Flushes any buffered writes for `fh` to stable storage.
pub fn commit(
    vfs: &Arc<Vfs>,
    cred: &VfsCred,
    fh: FileHandle,
    on_complete: impl FnOnce(VfsResult<()>) + Send + 'static,
) {
    let mut request = Request::new(Opcode::Commit, fh, cred.clone());
    request.on_complete(move |req| {
        on_complete(if req.status == VfsStatus::Ok {
            Ok(())
        } else {
            Err(VfsError(req.status))
        });
    });
    vfs.dispatch(Capability::FS, request);
}

/// Preallocates, punches, or zeroes a byte range of `fh`, depending on
/// `mode` (module-defined, mirroring `fallocate`'s mode flags).
pub fn allocate(
    vfs: &Arc<Vfs>,
    cred: &VfsCred,
    fh: FileHandle,
    offset: u64,
    length: u64,
    mode: u32,
    on_complete: impl FnOnce(VfsResult<()>) + Send + 'static,
) {
    let mut request = Request::new(Opcode::Allocate, fh, cred.clone());
    request.args.offset = offset;
    request.args.length = length;
    request.args.mode = mode;

    request.on_complete(move |req| {
        on_complete(if req.status == VfsStatus::Ok {
            Ok(())
        } else {
            Err(VfsError(req.status))
        });
    });

    vfs.dispatch(Capability::FS, request);
}
