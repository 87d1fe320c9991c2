//! Tunable knobs, plumbed through as a plain struct rather than parsed from
//! a config-file format (file/env parsing is the external, out-of-scope
//! "config parsing" collaborator named in spec.md §1).

use std::time::Duration;

/// Runtime tunables for a [`crate::vfs::Vfs`] instance. `Default` matches the
/// source's hardcoded constants, carried over as the Open Question
/// resolution recorded in DESIGN.md.
#[derive(Debug, Clone)]
pub struct VfsConfig {
    /// Number of background delegation threads that service
    /// `Capability::BLOCKING` modules (spec.md §4.5).
    pub num_delegation_threads: usize,
    /// Number of shards in each open-handle cache (spec.md §4.3).
    pub open_handle_shards: usize,
    /// Per-shard capacity of each open-handle cache before LRU eviction of
    /// idle (refcount-zero) entries kicks in.
    pub open_handle_capacity_per_shard: usize,
    /// Number of shards in the attribute and name caches (spec.md §4.4).
    pub attr_cache_shards: usize,
    /// Per-shard capacity of the attribute and name caches.
    pub attr_cache_capacity_per_shard: usize,
    /// How long a cached attribute or name entry stays valid.
    pub attr_cache_ttl: Duration,
    /// How long a refcount-zero open handle lingers before the close
    /// sweeper closes it (spec.md §4.3, deferred close).
    pub deferred_close_age: Duration,
    /// How often the close sweeper thread wakes to scan for expired
    /// deferred-close entries.
    pub close_sweep_period: Duration,
    /// How long a request may sit without completing before the watchdog
    /// logs a stall warning (spec.md §4.8).
    pub watchdog_threshold: Duration,
    /// How often the watchdog thread scans active-request lists.
    pub watchdog_poll_period: Duration,
}

impl Default for VfsConfig {
    fn default() -> Self {
        VfsConfig {
            num_delegation_threads: 4,
            open_handle_shards: 16,
            open_handle_capacity_per_shard: 1024,
            attr_cache_shards: 16,
            attr_cache_capacity_per_shard: 4096,
            attr_cache_ttl: Duration::from_millis(100),
            deferred_close_age: Duration::from_secs(10),
            close_sweep_period: Duration::from_millis(100),
            watchdog_threshold: Duration::from_secs(10),
            watchdog_poll_period: Duration::from_micros(100),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_source_constants() {
        let cfg = VfsConfig::default();
        assert_eq!(cfg.watchdog_threshold, Duration::from_secs(10));
        assert_eq!(cfg.close_sweep_period, Duration::from_millis(100));
        assert_eq!(cfg.watchdog_poll_period, Duration::from_micros(100));
    }
}
