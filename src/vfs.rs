//! The top-level VFS core: module registry, mount table, caches, and the
//! background threads that service them. Analogous to the source's
//! `struct chimera_vfs` plus the thread pool `chimera_vfs_thread_init` sets
//! up around it.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Mutex, RwLock};

use crate::attrs::VfsAttrs;
use crate::cache::open_handle::{OpenHandleCache, OpenKind};
use crate::cache::ttl_cache::TtlCache;
use crate::close_thread::CloseThread;
use crate::config::VfsConfig;
use crate::dispatch::{self, DelegationThread};
use crate::error::{VfsError, VfsStatus};
use crate::fh::FileHandle;
use crate::module::{Capability, Module, ModuleId};
use crate::mount_table::MountTable;
use crate::request::{Opcode, Request};
use crate::root::RootModule;
use crate::watchdog::Watchdog;

/// Key into the name cache: a parent handle's bytes plus a child name.
pub type NameKey = (Vec<u8>, String);

/// The VFS dispatch core. Create one with [`Vfs::new`], register back-end
/// modules with [`Vfs::register`], then issue operations through the
/// functions in [`crate::proc`].
pub struct Vfs {
    pub(crate) config: VfsConfig,
    pub(crate) mount_table: Arc<MountTable>,
    modules: RwLock<Vec<Arc<dyn Module>>>,
    delegation_threads: Vec<DelegationThread>,
    pub(crate) path_cache: OpenHandleCache<()>,
    pub(crate) file_cache: OpenHandleCache<()>,
    pub(crate) attr_cache: TtlCache<Vec<u8>, VfsAttrs>,
    pub(crate) name_cache: TtlCache<NameKey, FileHandle>,
    kv_module: RwLock<Option<ModuleId>>,
    close_thread: Mutex<Option<CloseThread>>,
    watchdog: Mutex<Option<Watchdog>>,
}

impl Vfs {
    /// Builds a new core with the root pseudo-module already registered as
    /// module index zero (spec.md §4.7), and starts its delegation threads,
    /// close sweeper, and watchdog.
    pub fn new(config: VfsConfig) -> Arc<Self> {
        let mount_table = Arc::new(MountTable::new(8));
        let root: Arc<dyn Module> = Arc::new(RootModule::new(mount_table.clone()));
        let root_fh = crate::root::root_fh();
        mount_table.insert(crate::mount::Mount {
            mount_id: root_fh
                .mount_id()
                .try_into()
                .expect("root mount_id is always 16 bytes"),
            path: "/".to_string(),
            module_id: 0,
            root_fh,
        });

        let delegation_threads = (0..config.num_delegation_threads.max(1))
            .map(DelegationThread::spawn)
            .collect();

        let vfs = Arc::new(Vfs {
            path_cache: OpenHandleCache::new(OpenKind::Path, config.open_handle_shards),
            file_cache: OpenHandleCache::new(OpenKind::File, config.open_handle_shards),
            attr_cache: TtlCache::new(
                config.attr_cache_shards,
                config.attr_cache_capacity_per_shard,
                config.attr_cache_ttl,
            ),
            name_cache: TtlCache::new(
                config.attr_cache_shards,
                config.attr_cache_capacity_per_shard,
                config.attr_cache_ttl,
            ),
            modules: RwLock::new(vec![root]),
            delegation_threads,
            kv_module: RwLock::new(None),
            mount_table,
            config,
            close_thread: Mutex::new(None),
            watchdog: Mutex::new(None),
        });

        let sweep_target = vfs.clone();
        let close_thread = CloseThread::spawn(vfs.config.close_sweep_period, move || {
            let age = sweep_target.config.deferred_close_age;
            sweep_target.path_cache.sweep(age, |module_id, fh_bytes, _| {
                sweep_target.close_one(module_id, fh_bytes);
            });
            sweep_target.file_cache.sweep(age, |module_id, fh_bytes, _| {
                sweep_target.close_one(module_id, fh_bytes);
            });
        });
        *vfs.close_thread.lock() = Some(close_thread);

        let watchdog_target = vfs.clone();
        let watchdog = Watchdog::spawn(vfs.config.watchdog_poll_period, move || {
            log::trace!(
                "watchdog tick, {} mounts active",
                watchdog_target.mount_table.count()
            );
        });
        *vfs.watchdog.lock() = Some(watchdog);

        vfs
    }

    /// Registers a back-end module, returning the [`ModuleId`] later
    /// mounts will reference by name.
    pub fn register(&self, module: Arc<dyn Module>) -> ModuleId {
        module.init().ok();
        let mut modules = self.modules.write();
        let id = modules.len() as ModuleId;
        if module.capabilities().contains(Capability::KV) {
            *self.kv_module.write() = Some(id);
        }
        modules.push(module);
        id
    }

    /// Finds a registered module by its `name()`, used by `mount()` to
    /// resolve `module_name` (spec.md §6.1, `vfs_proc_mount.c`).
    pub fn module_by_name(&self, name: &str) -> Option<(ModuleId, Arc<dyn Module>)> {
        self.modules
            .read()
            .iter()
            .enumerate()
            .find(|(_, m)| m.name() == name)
            .map(|(id, m)| (id as ModuleId, m.clone()))
    }

    pub(crate) fn module(&self, id: ModuleId) -> Option<Arc<dyn Module>> {
        self.modules.read().get(id as usize).cloned()
    }

    pub(crate) fn kv_module(&self) -> Option<(ModuleId, Arc<dyn Module>)> {
        let id = (*self.kv_module.read())?;
        self.module(id).map(|m| (id, m))
    }

    pub fn mount_table(&self) -> &MountTable {
        &self.mount_table
    }

    pub fn config(&self) -> &VfsConfig {
        &self.config
    }

    /// Sends `request` through the mount table and, depending on the
    /// owning module's capabilities, either dispatches it inline or to a
    /// delegation thread (spec.md §4.5).
    pub(crate) fn dispatch(&self, required: Capability, request: Request) {
        let modules = self.modules.read();
        dispatch::dispatch(
            &self.mount_table,
            &modules,
            &self.delegation_threads,
            required,
            request,
        );
    }

    /// Dispatches `request` and blocks the calling thread until it
    /// completes, returning whatever `extract` pulls out of the final
    /// `Request`. Used by procedures (`open`, chained lookups) that need a
    /// synchronous result even though completion may happen on a
    /// delegation thread. Implemented with a rendezvous channel rather than
    /// a condvar the caller must remember to pair correctly.
    pub(crate) fn dispatch_blocking<R: Send + 'static>(
        self: &Arc<Self>,
        required: Capability,
        mut request: Request,
        extract: impl FnOnce(&Request) -> R + Send + 'static,
    ) -> R {
        let (tx, rx) = std::sync::mpsc::sync_channel(1);
        request.on_complete(move |req| {
            let _ = tx.send(extract(req));
        });
        self.dispatch(required, request);
        rx.recv().expect("request dropped without completing")
    }

    /// Issues a `Close` call to whichever module owns `module_id`, run
    /// inline on the close-sweeper thread (closing is never delegated: a
    /// module that can block on `open` can equally block here, but there is
    /// no caller waiting on the result). Invoked once per reclaimed idle
    /// entry (spec.md §8 property 5).
    fn close_one(self: &Arc<Self>, module_id: ModuleId, fh_bytes: &[u8]) {
        let Some(module) = self.module(module_id) else {
            return;
        };
        let fh = FileHandle::from_bytes(fh_bytes);
        let mut request = Request::new(Opcode::Close, fh, crate::cred::VfsCred::root());
        module.dispatch(&mut request);
    }

    /// Resolves a `mount_id` to the module that owns it, or `VfsError(Estale)`.
    pub(crate) fn module_for_fh(&self, fh: &FileHandle) -> Result<(ModuleId, Arc<dyn Module>), VfsError> {
        let mount = self
            .mount_table
            .lookup(fh.mount_id())
            .ok_or(VfsError(VfsStatus::Estale))?;
        let module = self.module(mount.module_id).ok_or(VfsError(VfsStatus::Estale))?;
        Ok((mount.module_id, module))
    }

    /// Shuts down background threads. Called from `Drop`; exposed so tests
    /// can force a clean shutdown without waiting on `Drop` order.
    pub fn shutdown(&self) {
        if let Some(mut t) = self.close_thread.lock().take() {
            t.shutdown();
        }
        if let Some(mut w) = self.watchdog.lock().take() {
            w.shutdown();
        }
    }
}

impl Drop for Vfs {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Default watchdog poll cadence exposed for tests that want a faster tick
/// than [`VfsConfig::default`] without constructing a whole custom config.
pub fn fast_test_config() -> VfsConfig {
    VfsConfig {
        num_delegation_threads: 1,
        close_sweep_period: Duration::from_millis(10),
        watchdog_poll_period: Duration::from_millis(10),
        ..VfsConfig::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_registers_root_as_mount_zero() {
        let vfs = Vfs::new(fast_test_config());
        assert_eq!(vfs.mount_table.count(), 1);
        let (module_id, _module) = vfs.module_for_fh(&crate::root::root_fh()).unwrap();
        assert_eq!(module_id, 0);
    }

    #[test]
    fn unknown_module_name_is_not_found() {
        let vfs = Vfs::new(fast_test_config());
        assert!(vfs.module_by_name("does-not-exist").is_none());
        assert!(vfs.module_by_name("root").is_some());
    }
}
