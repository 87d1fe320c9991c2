//! A single mounted filesystem: the module instance backing it, its root
//! handle, and the path it is mounted at within the synthetic root
//! namespace (spec.md §4.7).

use crate::fh::FileHandle;
use crate::module::ModuleId;

/// Attributes of a mount copied out by [`crate::mount_table::MountTable::lookup_attrs`]
/// without requiring the caller to hold onto the mount itself.
#[derive(Debug, Clone)]
pub struct MountAttrs {
    pub path: String,
    pub module_id: ModuleId,
}

/// A mounted filesystem instance, keyed in the mount table by its root
/// handle's `mount_id`.
#[derive(Debug, Clone)]
pub struct Mount {
    pub mount_id: [u8; crate::fh::MOUNT_ID_SIZE],
    pub path: String,
    pub module_id: ModuleId,
    pub root_fh: FileHandle,
}

impl Mount {
    pub fn attrs(&self) -> MountAttrs {
        MountAttrs {
            path: self.path.clone(),
            module_id: self.module_id,
        }
    }
}
