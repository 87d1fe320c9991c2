//! Routes a request to its module: looks the handle's `mount_id` up in the
//! mount table, then either calls the module inline or hands the request to
//! a delegation thread, exactly mirroring `chimera_vfs_dispatch`'s branch on
//! `CHIMERA_VFS_CAP_BLOCKING`.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use parking_lot::{Condvar, Mutex};

use crate::error::VfsStatus;
use crate::module::{Capability, Module};
use crate::mount_table::MountTable;
use crate::request::Request;

struct DelegationQueue {
    items: Mutex<VecDeque<(Arc<dyn Module>, Request)>>,
    condvar: Condvar,
    shutdown: AtomicBool,
}

/// A background worker that services requests from modules whose
/// `dispatch` may block (spec.md §4.5). Every `Capability::BLOCKING`
/// request whose `fh` hashes to this worker's shard index lands here.
pub struct DelegationThread {
    queue: Arc<DelegationQueue>,
    handle: Option<JoinHandle<()>>,
}

impl DelegationThread {
    /// Spawns a real OS thread running the delegation loop.
    pub fn spawn(index: usize) -> Self {
        let queue = Arc::new(DelegationQueue {
            items: Mutex::new(VecDeque::new()),
            condvar: Condvar::new(),
            shutdown: AtomicBool::new(false),
        });
        let worker_queue = queue.clone();
        let handle = std::thread::Builder::new()
            .name(format!("chimera-vfs-delegate-{index}"))
            .spawn(move || Self::run(worker_queue))
            .expect("failed to spawn delegation thread");
        DelegationThread {
            queue,
            handle: Some(handle),
        }
    }

    fn run(queue: Arc<DelegationQueue>) {
        loop {
            let mut guard = queue.items.lock();
            while guard.is_empty() && !queue.shutdown.load(Ordering::Acquire) {
                queue.condvar.wait(&mut guard);
            }
            let popped = guard.pop_front();
            drop(guard);
            match popped {
                Some((module, mut request)) => module.dispatch(&mut request),
                None => return,
            }
        }
    }

    /// Queues `request` for `module.dispatch` to run on this worker.
    pub fn enqueue(&self, module: Arc<dyn Module>, request: Request) {
        self.queue.items.lock().push_back((module, request));
        self.queue.condvar.notify_one();
    }

    /// Signals the worker to drain its queue and exit, then joins it.
    pub fn shutdown(&mut self) {
        self.queue.shutdown.store(true, Ordering::Release);
        self.queue.condvar.notify_all();
        if let Some(h) = self.handle.take() {
            let _ = h.join();
        }
    }
}

impl Drop for DelegationThread {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Looks `request.fh` up in `mount_table`, checks `required` against the
/// owning module's capabilities, then either calls `module.dispatch`
/// directly or hands the request to the delegation thread selected by
/// `fh.hash() % delegation_threads.len()` (spec.md §4.5, §8 property 6:
/// same `fh` always shards to the same delegation thread).
pub fn dispatch(
    mount_table: &MountTable,
    modules: &[Arc<dyn Module>],
    delegation_threads: &[DelegationThread],
    required: Capability,
    mut request: Request,
) {
    let mount_id = request.fh.mount_id().to_vec();
    let mount = match mount_table.lookup(&mount_id) {
        Some(m) => m,
        None => {
            request.complete(VfsStatus::Estale);
            return;
        }
    };

    let module = match modules.get(mount.module_id as usize) {
        Some(m) => m.clone(),
        None => {
            request.complete(VfsStatus::Estale);
            return;
        }
    };
    request.module_id = Some(mount.module_id);

    if !module.capabilities().contains(required) {
        request.complete(VfsStatus::Enotsup);
        return;
    }

    if delegation_threads.is_empty() || !module.capabilities().contains(Capability::BLOCKING) {
        module.dispatch(&mut request);
        return;
    }

    request.delegated = true;
    let shard = (request.fh.hash() as usize) % delegation_threads.len();
    delegation_threads[shard].enqueue(module, request);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cred::VfsCred;
    use crate::fh::FileHandle;
    use crate::request::Opcode;
    use std::sync::atomic::AtomicU32;

    struct CountingModule {
        caps: Capability,
        calls: AtomicU32,
    }

    impl Module for CountingModule {
        fn name(&self) -> &str {
            "counting"
        }
        fn capabilities(&self) -> Capability {
            self.caps
        }
        fn dispatch(&self, request: &mut Request) {
            self.calls.fetch_add(1, Ordering::SeqCst);
            request.complete(VfsStatus::Ok);
        }
        fn mount_root_fh(&self, _cred: &VfsCred, _path: &str) -> Result<FileHandle, VfsStatus> {
            Ok(FileHandle::default())
        }
    }

    fn mounted_table(module_id: u16, fh: &FileHandle) -> MountTable {
        let table = MountTable::new(4);
        table.insert(crate::mount::Mount {
            mount_id: fh.mount_id().try_into().unwrap(),
            path: "/m".into(),
            module_id,
            root_fh: *fh,
        });
        table
    }

    #[test]
    fn unknown_mount_id_yields_estale() {
        let table = MountTable::new(4);
        let modules: Vec<Arc<dyn Module>> = vec![];
        let fh = FileHandle::default();
        let mut req = Request::new(Opcode::Getattr, fh, VfsCred::root());
        req.on_complete(|r| {
            assert_eq!(r.status, VfsStatus::Estale);
        });
        dispatch(&table, &modules, &[], Capability::FS, req);
    }

    #[test]
    fn inline_dispatch_calls_module_synchronously() {
        let module: Arc<dyn Module> = Arc::new(CountingModule {
            caps: Capability::FS,
            calls: AtomicU32::new(0),
        });
        let fh = crate::fh::encode_mount(&[1u8; 16], b"root");
        let table = mounted_table(0, &fh);
        let modules = vec![module.clone()];
        let req = Request::new(Opcode::Getattr, fh, VfsCred::root());
        dispatch(&table, &modules, &[], Capability::FS, req);
    }

    #[test]
    fn missing_capability_yields_enotsup() {
        let module: Arc<dyn Module> = Arc::new(CountingModule {
            caps: Capability::KV,
            calls: AtomicU32::new(0),
        });
        let fh = crate::fh::encode_mount(&[2u8; 16], b"root");
        let table = mounted_table(0, &fh);
        let modules = vec![module];
        let mut req = Request::new(Opcode::Getattr, fh, VfsCred::root());
        req.on_complete(|r| assert_eq!(r.status, VfsStatus::Enotsup));
        dispatch(&table, &modules, &[], Capability::FS, req);
    }
}
