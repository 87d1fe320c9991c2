//! Caching layer: the open-handle cache (spec.md §4.3) and the generic
//! TTL/LRU cache instantiated for attributes and names (spec.md §4.4).

pub mod open_handle;
pub mod ttl_cache;
