//! Attribute representation and request/response masks.
//!
//! Rust-native rendering of the source's `va_req_mask`/`va_set_mask` plus raw
//! `struct stat`-shaped fields: each attribute is an `Option<T>`, present iff
//! the bit for it is set in [`VfsAttrs::present_mask`] (for a reply) or
//! [`VfsAttrs::requested_mask`] (for a request/setattr argument).

use bitflags::bitflags;

bitflags! {
    /// Bits identifying individual attributes, shared between "what a caller
    /// asked for" (`requested_mask`) and "what a back-end filled in or is
    /// setting" (`present_mask`).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct AttrMask: u64 {
        const MODE      = 1 << 0;
        const NLINK     = 1 << 1;
        const UID       = 1 << 2;
        const GID       = 1 << 3;
        const RDEV      = 1 << 4;
        const SIZE      = 1 << 5;
        const ATIME     = 1 << 6;
        const MTIME     = 1 << 7;
        const CTIME     = 1 << 8;
        const INO       = 1 << 9;
        const DEV       = 1 << 10;
        const FH        = 1 << 11;
        const CACHEABLE = 1 << 12;
    }
}

/// A POSIX timestamp, seconds plus nanoseconds, independent of any specific
/// clock type so modules can synthesize values (the root pseudo-module, for
/// instance) without depending on `std::time::SystemTime` internals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct VfsTime {
    pub seconds: i64,
    pub nanos: u32,
}

/// File attributes, `Option`-per-field in place of the source's combined
/// bitmask-plus-raw-struct encoding. A `None` field was neither requested nor
/// filled in; callers must consult [`VfsAttrs::present_mask`] before reading.
#[derive(Debug, Clone, Copy, Default)]
pub struct VfsAttrs {
    /// Bits the caller asked a module to fill in or set.
    pub requested_mask: AttrMask,
    /// Bits the module actually filled in (getattr reply) or accepted
    /// (setattr acknowledgement).
    pub present_mask: AttrMask,

    pub mode: Option<u32>,
    pub nlink: Option<u32>,
    pub uid: Option<u32>,
    pub gid: Option<u32>,
    pub rdev: Option<u64>,
    pub size: Option<u64>,
    pub atime: Option<VfsTime>,
    pub mtime: Option<VfsTime>,
    pub ctime: Option<VfsTime>,
    pub ino: Option<u64>,
    pub dev: Option<u64>,
    pub fh: Option<crate::fh::FileHandle>,
}

impl VfsAttrs {
    /// An empty attribute set requesting nothing.
    pub fn new() -> Self {
        Self::default()
    }

    /// An attribute set requesting the given fields, with none yet filled.
    pub fn requesting(mask: AttrMask) -> Self {
        VfsAttrs {
            requested_mask: mask,
            ..Default::default()
        }
    }

    /// `true` if every bit in `mask` is set in `present_mask`.
    pub fn has(&self, mask: AttrMask) -> bool {
        self.present_mask.contains(mask)
    }
}
