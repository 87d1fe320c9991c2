//! The VFS procedure layer: one file per operation family, mirroring
//! spec.md §4.6's grouping. Every procedure builds a [`crate::request::Request`],
//! attaches a completion closure that turns the request's final status and
//! reply fields into a typed `Result`, and dispatches it through the owning
//! [`crate::vfs::Vfs`]. None of these functions block the calling thread —
//! the callback runs wherever `Request::complete` ends up running, inline or
//! on a delegation thread (spec.md §4.5).

pub mod attr;
pub mod dir;
pub mod io;
pub mod lookup;
pub mod mount;
pub mod open;
