//! Error taxonomy for the VFS core.
//!
//! The source this crate is grounded on carries status codes as bare
//! integers that overlap with POSIX `errno` values and a `CHIMERA_VFS_UNSET`
//! sentinel that isn't a real error. `VfsStatus` replaces that scheme with a
//! single explicit enum (see DESIGN.md, Open Question resolution).

use thiserror::Error;

/// Status code carried on a [`crate::request::Request`] and reported to
/// procedure callbacks. Mirrors the POSIX errno families named in spec §7.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VfsStatus {
    /// Operation completed successfully.
    Ok,
    /// The request has not yet been completed by a module. Present only
    /// between allocation and completion; asserted away before a reply is
    /// ever sent to a caller.
    Unset,
    /// `mount_id` on a file handle does not resolve to a live mount.
    Estale,
    /// Module lacks the capability the operation requires.
    Enotsup,
    /// Target does not exist.
    Enoent,
    /// Target already exists.
    Eexist,
    /// Operation not permitted.
    Eperm,
    /// Access denied.
    Eacces,
    /// Malformed argument.
    Einval,
    /// A path component or target name is too long.
    Enametoolong,
    /// Directory is not empty.
    Enotempty,
    /// File handle/descriptor is invalid or stale in the protocol sense.
    Ebadf,
    /// Too many open files.
    Emfile,
    /// Resource pool exhausted.
    Enomem,
    /// Back-end reported an I/O failure.
    Eio,
}

impl VfsStatus {
    /// `true` if this status represents success.
    pub fn is_ok(self) -> bool {
        matches!(self, VfsStatus::Ok)
    }

    /// Maps to the closest `libc` errno constant, for embedders that need
    /// to hand a raw `errno` to a POSIX-compatibility layer. The core never
    /// does this translation itself (outside its scope, §1) but exposes it
    /// for the convenience of the (external) façade.
    pub fn to_errno(self) -> i32 {
        match self {
            VfsStatus::Ok => 0,
            VfsStatus::Unset => libc::EIO,
            VfsStatus::Estale => libc::ESTALE,
            VfsStatus::Enotsup => libc::ENOTSUP,
            VfsStatus::Enoent => libc::ENOENT,
            VfsStatus::Eexist => libc::EEXIST,
            VfsStatus::Eperm => libc::EPERM,
            VfsStatus::Eacces => libc::EACCES,
            VfsStatus::Einval => libc::EINVAL,
            VfsStatus::Enametoolong => libc::ENAMETOOLONG,
            VfsStatus::Enotempty => libc::ENOTEMPTY,
            VfsStatus::Ebadf => libc::EBADF,
            VfsStatus::Emfile => libc::EMFILE,
            VfsStatus::Enomem => libc::ENOMEM,
            VfsStatus::Eio => libc::EIO,
        }
    }
}

/// Error type returned at public procedure-call boundaries. Wraps
/// [`VfsStatus`] with `Display`/`std::error::Error` via `thiserror`, the
/// way `kata-types`/`kata-sys-util` in this corpus derive their error enums.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq, Hash)]
#[error("vfs operation failed: {0:?}")]
pub struct VfsError(pub VfsStatus);

impl From<VfsStatus> for VfsError {
    fn from(status: VfsStatus) -> Self {
        VfsError(status)
    }
}

impl From<VfsError> for VfsStatus {
    fn from(err: VfsError) -> Self {
        err.0
    }
}

/// Result alias used throughout the procedure layer.
pub type VfsResult<T> = Result<T, VfsError>;
