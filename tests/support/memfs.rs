//! An in-memory `Module` backend used only by the integration tests, in the
//! spirit of the teacher's own toy filesystems under its examples directory:
//! just enough of a real backend to drive the core's dispatch, caching, and
//! mount-table machinery end to end.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};

use chimera_vfs::attrs::{AttrMask, VfsAttrs};
use chimera_vfs::cred::VfsCred;
use chimera_vfs::error::VfsStatus;
use chimera_vfs::fh::{self, FileHandle, FSID_SIZE};
use chimera_vfs::module::{Capability, Module};
use chimera_vfs::request::{Opcode, ReaddirEntry, Request};
use parking_lot::Mutex;

const S_IFDIR: u32 = 0o040000;
const S_IFREG: u32 = 0o100000;
const S_IFLNK: u32 = 0o120000;

enum NodeKind {
    Dir(HashMap<String, FileHandle>),
    File(Vec<u8>),
    Symlink(String),
}

struct Node {
    kind: NodeKind,
    mode: u32,
}

/// A flat in-memory filesystem: one root directory, arbitrarily nested
/// children, keyed directly by the `FileHandle` minted for each node.
pub struct MemFs {
    fsid: [u8; FSID_SIZE],
    nodes: Mutex<HashMap<FileHandle, Node>>,
    next_inum: AtomicU64,
    /// Counts real backend `open` calls, so tests can assert the cache
    /// collapsed concurrent opens onto a single call.
    pub open_calls: AtomicU32,
    /// Counts real backend `close` calls issued by the close sweeper.
    pub close_calls: AtomicU32,
}

impl MemFs {
    pub fn new(fsid_byte: u8) -> Self {
        let fsid = [fsid_byte; FSID_SIZE];
        let root_fh = fh::encode_mount_inum(&fsid, 1, 0);
        let mut nodes = HashMap::new();
        nodes.insert(
            root_fh,
            Node {
                kind: NodeKind::Dir(HashMap::new()),
                mode: S_IFDIR | 0o755,
            },
        );
        MemFs {
            fsid,
            nodes: Mutex::new(nodes),
            next_inum: AtomicU64::new(2),
            open_calls: AtomicU32::new(0),
            close_calls: AtomicU32::new(0),
        }
    }

    pub fn root_fh(&self) -> FileHandle {
        fh::encode_mount_inum(&self.fsid, 1, 0)
    }

    fn alloc_fh(&self) -> FileHandle {
        let inum = self.next_inum.fetch_add(1, Ordering::SeqCst);
        fh::encode_mount_inum(&self.fsid, inum, 0)
    }

    fn lookup(&self, request: &mut Request) {
        let name = request.args.name.clone().unwrap_or_default();
        let nodes = self.nodes.lock();
        let Some(Node {
            kind: NodeKind::Dir(children),
            ..
        }) = nodes.get(&request.fh)
        else {
            request.complete(VfsStatus::Enotsup);
            return;
        };
        match children.get(&name) {
            Some(fh) => {
                request.args.target = Some(*fh);
                request.complete(VfsStatus::Ok);
            }
            None => request.complete(VfsStatus::Enoent),
        }
    }

    fn getattr(&self, request: &mut Request) {
        let nodes = self.nodes.lock();
        let Some(node) = nodes.get(&request.fh) else {
            request.complete(VfsStatus::Estale);
            return;
        };
        let requested = request.args.attrs.requested_mask;
        let mut attrs = VfsAttrs::requesting(requested);
        attrs.present_mask = requested
            & (AttrMask::MODE | AttrMask::SIZE | AttrMask::NLINK | AttrMask::CACHEABLE);
        attrs.mode = Some(node.mode);
        attrs.nlink = Some(1);
        attrs.size = Some(match &node.kind {
            NodeKind::File(data) => data.len() as u64,
            NodeKind::Symlink(target) => target.len() as u64,
            NodeKind::Dir(_) => 0,
        });
        request.args.attrs = attrs;
        request.complete(VfsStatus::Ok);
    }

    fn setattr(&self, request: &mut Request) {
        let mut nodes = self.nodes.lock();
        let Some(node) = nodes.get_mut(&request.fh) else {
            request.complete(VfsStatus::Estale);
            return;
        };
        if let Some(mode) = request.args.attrs.mode {
            node.mode = mode;
        }
        request.args.attrs.present_mask = request.args.attrs.requested_mask;
        request.complete(VfsStatus::Ok);
    }

    fn open(&self, request: &mut Request) {
        self.open_calls.fetch_add(1, Ordering::SeqCst);
        let nodes = self.nodes.lock();
        if nodes.contains_key(&request.fh) {
            request.complete(VfsStatus::Ok);
        } else {
            request.complete(VfsStatus::Estale);
        }
    }

    fn close(&self, request: &mut Request) {
        self.close_calls.fetch_add(1, Ordering::SeqCst);
        request.complete(VfsStatus::Ok);
    }

    fn read(&self, request: &mut Request) {
        let nodes = self.nodes.lock();
        let Some(Node { kind: NodeKind::File(data), .. }) = nodes.get(&request.fh) else {
            request.complete(VfsStatus::Einval);
            return;
        };
        let offset = request.args.offset as usize;
        let length = request.args.length as usize;
        let out = if offset >= data.len() {
            Vec::new()
        } else {
            let end = (offset + length).min(data.len());
            data[offset..end].to_vec()
        };
        request.args.data = out;
        request.complete(VfsStatus::Ok);
    }

    fn write(&self, request: &mut Request) {
        let mut nodes = self.nodes.lock();
        let Some(Node { kind: NodeKind::File(data), .. }) = nodes.get_mut(&request.fh) else {
            request.complete(VfsStatus::Einval);
            return;
        };
        let offset = request.args.offset as usize;
        if data.len() < offset + request.args.data.len() {
            data.resize(offset + request.args.data.len(), 0);
        }
        let written = request.args.data.len();
        data[offset..offset + written].copy_from_slice(&request.args.data);
        request.args.length = written as u64;
        request.complete(VfsStatus::Ok);
    }

    fn readdir(&self, request: &mut Request) {
        let nodes = self.nodes.lock();
        let Some(Node { kind: NodeKind::Dir(children), .. }) = nodes.get(&request.fh) else {
            request.complete(VfsStatus::Enotsup);
            return;
        };
        let mut names: Vec<&String> = children.keys().collect();
        names.sort();
        let start = request.args.cookie as usize;
        for (i, name) in names.iter().enumerate().skip(start) {
            let child_fh = children[*name];
            let mode = match &nodes.get(&child_fh).unwrap().kind {
                NodeKind::Dir(_) => S_IFDIR,
                NodeKind::File(_) => S_IFREG,
                NodeKind::Symlink(_) => S_IFLNK,
            };
            let mut attrs = VfsAttrs::new();
            attrs.mode = Some(mode);
            attrs.present_mask = AttrMask::MODE;
            request.args.readdir_entries.push(ReaddirEntry {
                name: (*name).clone(),
                fh: child_fh,
                attrs,
            });
            request.args.cookie = (i + 1) as u64;
        }
        request.args.eof = true;
        request.complete(VfsStatus::Ok);
    }

    fn mkdir(&self, request: &mut Request) {
        self.make_child(request, NodeKind::Dir(HashMap::new()), S_IFDIR | 0o755);
    }

    fn mknod(&self, request: &mut Request) {
        self.make_child(request, NodeKind::File(Vec::new()), S_IFREG | 0o644);
    }

    fn symlink(&self, request: &mut Request) {
        let target = String::from_utf8_lossy(&request.args.data).into_owned();
        self.make_child(request, NodeKind::Symlink(target), S_IFLNK | 0o777);
    }

    fn create_unlinked(&self, request: &mut Request) {
        let fh = self.alloc_fh();
        self.nodes.lock().insert(
            fh,
            Node {
                kind: NodeKind::File(Vec::new()),
                mode: S_IFREG | 0o600,
            },
        );
        request.args.target = Some(fh);
        request.complete(VfsStatus::Ok);
    }

    fn make_child(&self, request: &mut Request, kind: NodeKind, mode: u32) {
        let name = request.args.name.clone().unwrap_or_default();
        let mut nodes = self.nodes.lock();
        let exists = matches!(
            nodes.get(&request.fh),
            Some(Node { kind: NodeKind::Dir(c), .. }) if c.contains_key(&name)
        );
        if exists {
            request.complete(VfsStatus::Eexist);
            return;
        }
        let child_fh = self.alloc_fh();
        drop(nodes);
        self.nodes.lock().insert(child_fh, Node { kind, mode });
        let mut nodes = self.nodes.lock();
        if let Some(Node { kind: NodeKind::Dir(children), .. }) = nodes.get_mut(&request.fh) {
            children.insert(name, child_fh);
        }
        drop(nodes);
        request.args.target = Some(child_fh);
        request.complete(VfsStatus::Ok);
    }

    fn remove(&self, request: &mut Request) {
        let name = request.args.name.clone().unwrap_or_default();
        let mut nodes = self.nodes.lock();
        let child_fh = match nodes.get(&request.fh) {
            Some(Node { kind: NodeKind::Dir(children), .. }) => children.get(&name).copied(),
            _ => None,
        };
        let Some(child_fh) = child_fh else {
            request.complete(VfsStatus::Enoent);
            return;
        };
        if let Some(Node { kind: NodeKind::Dir(grandchildren), .. }) = nodes.get(&child_fh) {
            if !grandchildren.is_empty() {
                request.complete(VfsStatus::Enotempty);
                return;
            }
        }
        if let Some(Node { kind: NodeKind::Dir(children), .. }) = nodes.get_mut(&request.fh) {
            children.remove(&name);
        }
        nodes.remove(&child_fh);
        request.complete(VfsStatus::Ok);
    }

    fn link(&self, request: &mut Request) {
        let Some(new_parent) = request.args.target else {
            request.complete(VfsStatus::Einval);
            return;
        };
        let name = request.args.name.clone().unwrap_or_default();
        let target_fh = request.fh;
        let mut nodes = self.nodes.lock();
        if let Some(Node { kind: NodeKind::Dir(children), .. }) = nodes.get_mut(&new_parent) {
            children.insert(name, target_fh);
            request.complete(VfsStatus::Ok);
        } else {
            request.complete(VfsStatus::Enotsup);
        }
    }

    fn rename(&self, request: &mut Request) {
        let old_name = request.args.name.clone().unwrap_or_default();
        let Some(new_parent) = request.args.target else {
            request.complete(VfsStatus::Einval);
            return;
        };
        let new_name = String::from_utf8_lossy(&request.args.data).into_owned();

        let mut nodes = self.nodes.lock();
        let moved_fh = match nodes.get_mut(&request.fh) {
            Some(Node { kind: NodeKind::Dir(children), .. }) => children.remove(&old_name),
            _ => None,
        };
        let Some(moved_fh) = moved_fh else {
            request.complete(VfsStatus::Enoent);
            return;
        };
        if let Some(Node { kind: NodeKind::Dir(children), .. }) = nodes.get_mut(&new_parent) {
            children.insert(new_name, moved_fh);
            request.complete(VfsStatus::Ok);
        } else {
            request.complete(VfsStatus::Enotsup);
        }
    }
}

impl Module for MemFs {
    fn name(&self) -> &str {
        "memfs"
    }

    fn capabilities(&self) -> Capability {
        Capability::FS
    }

    fn dispatch(&self, request: &mut Request) {
        match request.opcode {
            Opcode::Lookup => self.lookup(request),
            Opcode::Getattr => self.getattr(request),
            Opcode::Setattr => self.setattr(request),
            Opcode::Open => self.open(request),
            Opcode::Close => self.close(request),
            Opcode::Read => self.read(request),
            Opcode::Write => self.write(request),
            Opcode::Readdir => self.readdir(request),
            Opcode::Mkdir => self.mkdir(request),
            Opcode::Mknod => self.mknod(request),
            Opcode::Symlink => self.symlink(request),
            Opcode::Remove => self.remove(request),
            Opcode::Link => self.link(request),
            Opcode::Rename => self.rename(request),
            Opcode::CreateUnlinked => self.create_unlinked(request),
            Opcode::Commit | Opcode::Allocate => request.complete(VfsStatus::Ok),
            _ => request.complete(VfsStatus::Enotsup),
        }
    }

    fn mount_root_fh(&self, _cred: &VfsCred, _module_path: &str) -> Result<FileHandle, VfsStatus> {
        Ok(self.root_fh())
    }
}
