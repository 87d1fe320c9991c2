//! `chimera-vfs`: a pluggable, user-space virtual filesystem dispatch core.
//!
//! The crate routes file-handle-addressed operations to whichever back-end
//! [`module::Module`] owns the mount a handle belongs to, caches open
//! handles, attributes, and name lookups, and bounds the number of threads
//! and requests in flight — all without owning an event loop, a config-file
//! parser, or an access-control policy; those remain the embedder's
//! concern. See `README.md` for the shape of a minimal embedder and
//! `DESIGN.md` for how each piece here is grounded.

#![warn(missing_docs, missing_debug_implementations, rust_2018_idioms, unreachable_pub)]
#![allow(clippy::type_complexity)]

pub mod attrs;
pub mod cache;
pub mod close_thread;
pub mod config;
pub mod cred;
pub mod dispatch;
pub mod error;
pub mod fh;
pub mod metrics;
pub mod module;
pub mod mount;
pub mod mount_table;
pub mod proc;
pub mod request;
pub mod root;
pub mod thread;
pub mod varint;
pub mod vfs;
pub mod watchdog;

pub use attrs::{AttrMask, VfsAttrs, VfsTime};
pub use config::VfsConfig;
pub use cred::VfsCred;
pub use error::{VfsError, VfsResult, VfsStatus};
pub use fh::FileHandle;
pub use module::{Capability, Module, ModuleId};
pub use request::{Opcode, Request};
pub use thread::{Doorbell, VfsThread};
pub use vfs::Vfs;
