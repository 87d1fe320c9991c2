//! The root pseudo-module: synthesizes a `/` directory whose entries are
//! the mount table's paths. Grounded on `vfs_root.c`: `lookup` matches a
//! path component against each mount's name, `readdir` walks the mount list
//! from a cookie and emits one synthetic entry per mount, `getattr` returns
//! a fixed synthetic directory. There root calls always run inline on the
//! calling thread rather than through the blocking-dispatch path (lookups
//! and readdirs here never block); this module reports no
//! `Capability::BLOCKING`, so the generic dispatcher in `dispatch.rs`
//! already does the same thing for free.

use std::sync::Arc;

use crate::attrs::{AttrMask, VfsAttrs};
use crate::cred::VfsCred;
use crate::error::VfsStatus;
use crate::fh::{self, FileHandle, FSID_SIZE};
use crate::module::{Capability, Module};
use crate::mount_table::MountTable;
use crate::request::{Opcode, ReaddirEntry, Request};

/// `fsid` used to mint the root handle: all zero, distinguishing it from
/// any real backend's fsid (spec.md §4.7).
pub const ROOT_FSID: [u8; FSID_SIZE] = [0u8; FSID_SIZE];

/// Computes the fixed root handle. Stable across process restarts since it
/// depends only on the all-zero fsid and an empty fragment.
pub fn root_fh() -> FileHandle {
    fh::encode_mount(&ROOT_FSID, &[])
}

fn synthetic_dir_attrs(requested: AttrMask) -> VfsAttrs {
    let mut attrs = VfsAttrs::requesting(requested);
    attrs.present_mask = requested
        & (AttrMask::MODE
            | AttrMask::NLINK
            | AttrMask::UID
            | AttrMask::GID
            | AttrMask::SIZE
            | AttrMask::INO
            | AttrMask::DEV
            | AttrMask::RDEV);
    attrs.mode = Some(0o755 | 0o040000);
    attrs.nlink = Some(2);
    attrs.uid = Some(0);
    attrs.gid = Some(0);
    attrs.size = Some(4096);
    attrs.ino = Some(2);
    attrs.dev = Some(0);
    attrs.rdev = Some(0);
    attrs
}

/// The `root` module, holding a shared handle to the same mount table the
/// rest of the VFS core publishes into.
pub struct RootModule {
    mounts: Arc<MountTable>,
}

impl RootModule {
    pub fn new(mounts: Arc<MountTable>) -> Self {
        RootModule { mounts }
    }

    fn lookup(&self, request: &mut Request) {
        let name = request.args.name.clone().unwrap_or_default();
        let target_path = format!("/{name}");
        match self.mounts.find_by_path(&target_path) {
            Some(mount) if mount.path == target_path => {
                request.args.target = Some(mount.root_fh);
                request.complete(VfsStatus::Ok);
            }
            _ => request.complete(VfsStatus::Enoent),
        }
    }

    fn getattr(&self, request: &mut Request) {
        request.args.attrs = synthetic_dir_attrs(request.args.attrs.requested_mask);
        request.complete(VfsStatus::Ok);
    }

    fn readdir(&self, request: &mut Request) {
        let mut mounts = Vec::new();
        // MountTable has no ordered iterator; a `Vec` snapshot is enough
        // for the tiny, slow-changing root namespace.
        self.mounts.for_each_mount(|m| mounts.push(m));

        let start = request.args.cookie as usize;
        for (i, mount) in mounts.iter().enumerate().skip(start) {
            let name = mount.path.trim_start_matches('/').to_string();
            request.args.readdir_entries.push(ReaddirEntry {
                name,
                fh: mount.root_fh,
                attrs: synthetic_dir_attrs(AttrMask::empty()),
            });
            request.args.cookie = (i + 1) as u64;
        }
        request.args.eof = true;
        request.complete(VfsStatus::Ok);
    }
}

impl Module for RootModule {
    fn name(&self) -> &str {
        "root"
    }

    fn capabilities(&self) -> Capability {
        Capability::FS
    }

    fn dispatch(&self, request: &mut Request) {
        match request.opcode {
            Opcode::Lookup => self.lookup(request),
            Opcode::Getattr => self.getattr(request),
            Opcode::Readdir => self.readdir(request),
            _ => request.complete(VfsStatus::Enotsup),
        }
    }

    fn mount_root_fh(&self, _cred: &VfsCred, _module_path: &str) -> Result<FileHandle, VfsStatus> {
        Ok(root_fh())
    }
}
