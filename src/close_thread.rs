//! Background close sweeper.
//!
//! Periodically scans both open-handle caches for refcount-zero entries
//! that have sat idle past [`crate::config::VfsConfig::deferred_close_age`]
//! and closes them (spec.md §4.3, §8 property 5). A real `std::thread`, not
//! a task on some executor — this crate has no executor (§1).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

/// Owns the background thread that periodically sweeps deferred closes.
pub struct CloseThread {
    shutdown: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl CloseThread {
    /// Spawns the sweeper. `sweep` is called once per `period` until
    /// [`CloseThread::shutdown`] is invoked or the `CloseThread` is dropped.
    pub fn spawn(period: Duration, mut sweep: impl FnMut() + Send + 'static) -> Self {
        let shutdown = Arc::new(AtomicBool::new(false));
        let thread_shutdown = shutdown.clone();
        let handle = std::thread::Builder::new()
            .name("chimera-vfs-close".into())
            .spawn(move || {
                while !thread_shutdown.load(Ordering::Acquire) {
                    std::thread::sleep(period);
                    if thread_shutdown.load(Ordering::Acquire) {
                        break;
                    }
                    sweep();
                }
            })
            .expect("failed to spawn close thread");
        CloseThread {
            shutdown,
            handle: Some(handle),
        }
    }

    /// Signals the sweeper to stop and joins it.
    pub fn shutdown(&mut self) {
        self.shutdown.store(true, Ordering::Release);
        if let Some(h) = self.handle.take() {
            let _ = h.join();
        }
    }
}

impl Drop for CloseThread {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU32;

    #[test]
    fn sweep_runs_at_least_once() {
        let counter = Arc::new(AtomicU32::new(0));
        let c = counter.clone();
        let mut thread = CloseThread::spawn(Duration::from_millis(5), move || {
            c.fetch_add(1, Ordering::SeqCst);
        });
        std::thread::sleep(Duration::from_millis(30));
        thread.shutdown();
        assert!(counter.load(Ordering::SeqCst) >= 1);
    }
}
