//! Stall watchdog.
//!
//! Periodically checks requests against
//! [`crate::config::VfsConfig::watchdog_threshold`] and logs a warning for
//! any still active past it (spec.md §4.8: bounded-latency properties are
//! advisory, not enforced by cancellation — the core has none, §1). Built
//! the same way as [`crate::close_thread::CloseThread`]: a plain
//! `std::thread`, woken on a timer, no executor involved.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

/// Owns the background thread that periodically checks for stalled
/// requests.
pub struct Watchdog {
    shutdown: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl Watchdog {
    /// Spawns the watchdog. `check` is called once per `poll_period` and is
    /// expected to log anything it finds stalled past the configured
    /// threshold; it receives no arguments since it closes over whatever
    /// active-request registry the embedder maintains.
    pub fn spawn(poll_period: Duration, mut check: impl FnMut() + Send + 'static) -> Self {
        let shutdown = Arc::new(AtomicBool::new(false));
        let thread_shutdown = shutdown.clone();
        let handle = std::thread::Builder::new()
            .name("chimera-vfs-watchdog".into())
            .spawn(move || {
                while !thread_shutdown.load(Ordering::Acquire) {
                    std::thread::sleep(poll_period);
                    if thread_shutdown.load(Ordering::Acquire) {
                        break;
                    }
                    check();
                }
            })
            .expect("failed to spawn watchdog thread");
        Watchdog {
            shutdown,
            handle: Some(handle),
        }
    }

    /// Signals the watchdog to stop and joins it.
    pub fn shutdown(&mut self) {
        self.shutdown.store(true, Ordering::Release);
        if let Some(h) = self.handle.take() {
            let _ = h.join();
        }
    }
}

impl Drop for Watchdog {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Checks `elapsed` against `threshold` and logs a warning for a stalled
/// request. Pulled out of [`Watchdog`] itself so the procedure layer and
/// tests can call the same logic without spinning up a thread.
pub fn check_stalled(opcode: crate::request::Opcode, elapsed: Duration, threshold: Duration) {
    if elapsed > threshold {
        log::warn!("request {opcode:?} has been active for {elapsed:?}, exceeding watchdog threshold {threshold:?}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU32;

    #[test]
    fn check_runs_periodically() {
        let counter = Arc::new(AtomicU32::new(0));
        let c = counter.clone();
        let mut wd = Watchdog::spawn(Duration::from_millis(5), move || {
            c.fetch_add(1, Ordering::SeqCst);
        });
        std::thread::sleep(Duration::from_millis(30));
        wd.shutdown();
        assert!(counter.load(Ordering::SeqCst) >= 1);
    }

    #[test]
    fn check_stalled_does_not_panic_under_threshold() {
        check_stalled(
            crate::request::Opcode::Getattr,
            Duration::from_millis(1),
            Duration::from_secs(10),
        );
    }
}
