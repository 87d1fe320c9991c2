//! Directory and namespace operations: readdir, mkdir, remove, symlink,
//! link, rename, mknod, and create-unlinked (anonymous file creation).
//! Every operation that changes what a name resolves to invalidates the
//! name cache entry it affects (spec.md §4.4); none of them populate it
//! speculatively, so a `mkdir` followed immediately by `lookup` still costs
//! one module round trip for the lookup — consistent with the source,
//! which never assumes a just-created entry will be looked up next.

use std::sync::Arc;

use crate::attrs::VfsAttrs;
use crate::cred::VfsCred;
use crate::error::{VfsError, VfsResult, VfsStatus};
use crate::fh::FileHandle;
use crate::module::Capability;
use crate::request::{Opcode, ReaddirEntry, Request};
use crate::vfs::Vfs;

/// A page of directory entries plus whether the listing is complete.
#[derive(Debug, Clone)]
pub struct ReaddirPage {
    pub entries: Vec<ReaddirEntry>,
    pub eof: bool,
    pub next_cookie: u64,
}

/// Lists entries of `fh` starting after `cookie`.
pub fn readdir(
    vfs: &Arc<Vfs>,
    cred: &VfsCred,
    fh: FileHandle,
    cookie: u64,
    on_complete: impl FnOnce(VfsResult<ReaddirPage>) + Send + 'static,
) {
    let mut request = Request::new(Opcode::Readdir, fh, cred.clone());
    request.args.cookie = cookie;

    request.on_complete(move |req| {
        let result = if req.status == VfsStatus::Ok {
            Ok(ReaddirPage {
                entries: req.args.readdir_entries.clone(),
                eof: req.args.eof,
                next_cookie: req.args.cookie,
            })
        } else {
            Err(VfsError(req.status))
        };
        on_complete(result);
    });

    vfs.dispatch(Capability::FS, request);
}

fn invalidate_name(vfs: &Arc<Vfs>, parent: &FileHandle, name: &str) {
    vfs.name_cache
        .invalidate(&(parent.as_bytes().to_vec(), name.to_string()));
}

/// Creates a directory `name` under `parent`.
pub fn mkdir(
    vfs: &Arc<Vfs>,
    cred: &VfsCred,
    parent: FileHandle,
    name: &str,
    mode: u32,
    on_complete: impl FnOnce(VfsResult<FileHandle>) + Send + 'static,
) {
    let mut request = Request::new(Opcode::Mkdir, parent, cred.clone());
    request.args.name = Some(name.to_string());
    request.args.mode = mode;

    let vfs_for_invalidate = vfs.clone();
    let name_owned = name.to_string();
    request.on_complete(move |req| {
        invalidate_name(&vfs_for_invalidate, &req.fh, &name_owned);
        let result = match (req.status, req.args.target) {
            (VfsStatus::Ok, Some(fh)) => Ok(fh),
            (VfsStatus::Ok, None) => Err(VfsError(VfsStatus::Eio)),
            (status, _) => Err(VfsError(status)),
        };
        on_complete(result);
    });

    vfs.dispatch(Capability::FS, request);
}

/// Removes `name` from `parent`, whether it is a file, symlink, or empty
/// directory (module decides `Enotempty` for a non-empty directory).
pub fn remove(
    vfs: &Arc<Vfs>,
    cred: &VfsCred,
    parent: FileHandle,
    name: &str,
    on_complete: impl FnOnce(VfsResult<()>) + Send + 'static,
) {
    let mut request = Request::new(Opcode::Remove, parent, cred.clone());
    request.args.name = Some(name.to_string());

    let vfs_for_invalidate = vfs.clone();
    let name_owned = name.to_string();
    request.on_complete(move |req| {
        invalidate_name(&vfs_for_invalidate, &req.fh, &name_owned);
        on_complete(if req.status == VfsStatus::Ok {
            Ok(())
        } else {
            Err(VfsError(req.status))
        });
    });

    vfs.dispatch(Capability::FS, request);
}

/// Creates a symlink `name` under `parent` pointing at `target`.
pub fn symlink(
    vfs: &Arc<Vfs>,
    cred: &VfsCred,
    parent: FileHandle,
    name: &str,
    target: &str,
    on_complete: impl FnOnce(VfsResult<FileHandle>) + Send + 'static,
) {
    let mut request = Request::new(Opcode::Symlink, parent, cred.clone());
    request.args.name = Some(name.to_string());
    request.args.data = target.as_bytes().to_vec();

    let vfs_for_invalidate = vfs.clone();
    let name_owned = name.to_string();
    request.on_complete(move |req| {
        invalidate_name(&vfs_for_invalidate, &req.fh, &name_owned);
        let result = match (req.status, req.args.target) {
            (VfsStatus::Ok, Some(fh)) => Ok(fh),
            (VfsStatus::Ok, None) => Err(VfsError(VfsStatus::Eio)),
            (status, _) => Err(VfsError(status)),
        };
        on_complete(result);
    });

    vfs.dispatch(Capability::FS, request);
}

/// Creates a device or special file `name` under `parent`.
pub fn mknod(
    vfs: &Arc<Vfs>,
    cred: &VfsCred,
    parent: FileHandle,
    name: &str,
    mode: u32,
    rdev: u64,
    on_complete: impl FnOnce(VfsResult<FileHandle>) + Send + 'static,
) {
    let mut request = Request::new(Opcode::Mknod, parent, cred.clone());
    request.args.name = Some(name.to_string());
    request.args.mode = mode;
    request.args.attrs = VfsAttrs {
        rdev: Some(rdev),
        ..VfsAttrs::default()
    };

    let vfs_for_invalidate = vfs.clone();
    let name_owned = name.to_string();
    request.on_complete(move |req| {
        invalidate_name(&vfs_for_invalidate, &req.fh, &name_owned);
        let result = match (req.status, req.args.target) {
            (VfsStatus::Ok, Some(fh)) => Ok(fh),
            (VfsStatus::Ok, None) => Err(VfsError(VfsStatus::Eio)),
            (status, _) => Err(VfsError(status)),
        };
        on_complete(result);
    });

    vfs.dispatch(Capability::FS, request);
}

/// Adds a hard link `new_name` under `new_parent` pointing at `fh`.
pub fn link(
    vfs: &Arc<Vfs>,
    cred: &VfsCred,
    fh: FileHandle,
    new_parent: FileHandle,
    new_name: &str,
    on_complete: impl FnOnce(VfsResult<()>) + Send + 'static,
) {
    let mut request = Request::new(Opcode::Link, fh, cred.clone());
    request.args.target = Some(new_parent);
    request.args.name = Some(new_name.to_string());

    let vfs_for_invalidate = vfs.clone();
    let name_owned = new_name.to_string();
    request.on_complete(move |req| {
        invalidate_name(&vfs_for_invalidate, &new_parent, &name_owned);
        on_complete(if req.status == VfsStatus::Ok {
            Ok(())
        } else {
            Err(VfsError(req.status))
        });
    });

    vfs.dispatch(Capability::FS, request);
}

/// Renames `old_name` under `old_parent` to `new_name` under `new_parent`.
/// Invalidates both the source and destination name-cache entries; an
/// embedder's POSIX façade is responsible for silly-rename semantics
/// (keeping an open-but-unlinked file reachable), which is outside this
/// core's scope (spec.md §1).
pub fn rename(
    vfs: &Arc<Vfs>,
    cred: &VfsCred,
    old_parent: FileHandle,
    old_name: &str,
    new_parent: FileHandle,
    new_name: &str,
    on_complete: impl FnOnce(VfsResult<()>) + Send + 'static,
) {
    let mut request = Request::new(Opcode::Rename, old_parent, cred.clone());
    request.args.name = Some(old_name.to_string());
    request.args.target = Some(new_parent);
    request.args.data = new_name.as_bytes().to_vec();

    let vfs_for_invalidate = vfs.clone();
    let old_name_owned = old_name.to_string();
    let new_name_owned = new_name.to_string();
    request.on_complete(move |req| {
        invalidate_name(&vfs_for_invalidate, &req.fh, &old_name_owned);
        invalidate_name(&vfs_for_invalidate, &new_parent, &new_name_owned);
        on_complete(if req.status == VfsStatus::Ok {
            Ok(())
        } else {
            Err(VfsError(req.status))
        });
    });

    vfs.dispatch(Capability::FS, request);
}

/// Creates an anonymous, unlinked file under `parent` (the source file
/// systems that support `O_TMPFILE`-style creation use this to avoid a
/// separate create-then-unlink round trip).
pub fn create_unlinked(
    vfs: &Arc<Vfs>,
    cred: &VfsCred,
    parent: FileHandle,
    mode: u32,
    on_complete: impl FnOnce(VfsResult<FileHandle>) + Send + 'static,
) {
    let mut request = Request::new(Opcode::CreateUnlinked, parent, cred.clone());
    request.args.mode = mode;

    request.on_complete(move |req| {
        let result = match (req.status, req.args.target) {
            (VfsStatus::Ok, Some(fh)) => Ok(fh),
            (VfsStatus::Ok, None) => Err(VfsError(VfsStatus::Eio)),
            (status, _) => Err(VfsError(status)),
        };
        on_complete(result);
    });

    vfs.dispatch(Capability::FS, request);
}
