//! Name resolution: `parent fh + name -> child fh`, backed by the name
//! cache (spec.md §4.4) so repeated lookups of a hot directory entry never
//! reach the module.

use std::sync::Arc;

use crate::cred::VfsCred;
use crate::error::{VfsError, VfsResult, VfsStatus};
use crate::fh::FileHandle;
use crate::module::Capability;
use crate::request::{Opcode, Request};
use crate::vfs::Vfs;

/// Resolves `name` within `parent`, consulting the name cache first.
pub fn lookup(
    vfs: &Arc<Vfs>,
    cred: &VfsCred,
    parent: FileHandle,
    name: &str,
    on_complete: impl FnOnce(VfsResult<FileHandle>) + Send + 'static,
) {
    let cache_key = (parent.as_bytes().to_vec(), name.to_string());
    if let Some(cached) = vfs.name_cache.get(&cache_key) {
        on_complete(Ok(cached));
        return;
    }

    let mut request = Request::new(Opcode::Lookup, parent, cred.clone());
    request.args.name = Some(name.to_string());

    let vfs_for_insert = vfs.clone();
    request.on_complete(move |req| {
        let result = if req.status == VfsStatus::Ok {
            match req.args.target {
                Some(fh) => {
                    vfs_for_insert.name_cache.insert(cache_key.clone(), fh);
                    Ok(fh)
                }
                None => Err(VfsError(VfsStatus::Eio)),
            }
        } else {
            Err(VfsError(req.status))
        };
        on_complete(result);
    });

    vfs.dispatch(Capability::FS, request);
}
