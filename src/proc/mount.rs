//! Mount and unmount. Grounded on `vfs_proc_mount.c`: `chimera_vfs_mount`
//! resolves a module by name, mints a root handle, and publishes a new
//! [`crate::mount::Mount`] into the mount table; `chimera_vfs_parse_mount_options`
//! is a small comma-separated `k=v` parser reused here verbatim in shape.
//! Mount/unmount are administrative, low-frequency operations, so unlike
//! the read/write/lookup procedures they call straight into the module
//! rather than threading through [`crate::dispatch::dispatch`] — there is no
//! meaningful concurrent-mount-of-the-same-path race to collapse the way
//! open() collapses concurrent opens.

use crate::cred::VfsCred;
use crate::error::{VfsError, VfsResult, VfsStatus};
use crate::fh::FileHandle;
use crate::mount::Mount;
use crate::vfs::Vfs;

/// Normalizes a caller-supplied mount path to the form the root
/// pseudo-module expects: a single leading `/`, no trailing `/`.
pub fn normalize_mount_path(path: &str) -> String {
    let trimmed = path.trim_matches('/');
    format!("/{trimmed}")
}

/// Parses a comma-separated `k=v` (or bare `k`) option string, mirroring
/// `chimera_vfs_parse_mount_options`'s tolerance for whitespace around
/// options and optional values.
pub fn parse_mount_options(options: &str) -> VfsResult<Vec<(String, Option<String>)>> {
    let mut parsed = Vec::new();
    for raw in options.split(',') {
        let opt = raw.trim();
        if opt.is_empty() {
            continue;
        }
        match opt.split_once('=') {
            Some((k, v)) if !k.trim().is_empty() => {
                parsed.push((k.trim().to_string(), Some(v.trim().to_string())));
            }
            Some(_) => return Err(VfsError(VfsStatus::Einval)),
            None => parsed.push((opt.to_string(), None)),
        }
    }
    Ok(parsed)
}

/// Mounts `module_name` at `mount_path`, publishing a new entry into the
/// mount table on success.
pub fn mount(
    vfs: &Vfs,
    cred: &VfsCred,
    module_name: &str,
    mount_path: &str,
    options: Vec<(String, Option<String>)>,
    on_complete: impl FnOnce(VfsResult<FileHandle>) + Send + 'static,
) {
    let path = normalize_mount_path(mount_path);

    if let Some(existing) = vfs.mount_table().find_by_path(&path) {
        if existing.path == path {
            on_complete(Err(VfsError(VfsStatus::Eexist)));
            return;
        }
    }

    let Some((module_id, module)) = vfs.module_by_name(module_name) else {
        on_complete(Err(VfsError(VfsStatus::Enoent)));
        return;
    };
    // Options are handed to the module as-is; parsing a config-file format
    // into this shape is the embedder's job (spec.md §9 Open Question).
    let _ = &options;

    match module.mount_root_fh(cred, &path) {
        Ok(root_fh) => {
            vfs.mount_table().insert(Mount {
                mount_id: root_fh
                    .mount_id()
                    .try_into()
                    .expect("mount_root_fh produced a 16-byte mount id"),
                path,
                module_id,
                root_fh,
            });
            on_complete(Ok(root_fh));
        }
        Err(status) => on_complete(Err(VfsError(status))),
    }
}

/// Unmounts whatever is mounted exactly at `mount_path`.
pub fn umount(vfs: &Vfs, mount_path: &str, on_complete: impl FnOnce(VfsResult<()>) + Send + 'static) {
    let path = normalize_mount_path(mount_path);
    match vfs.mount_table().find_by_path(&path) {
        Some(mount) if mount.path == path => {
            vfs.mount_table().remove(&mount.mount_id);
            on_complete(Ok(()));
        }
        _ => on_complete(Err(VfsError(VfsStatus::Enoent))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_strips_and_restores_single_slash() {
        assert_eq!(normalize_mount_path("export"), "/export");
        assert_eq!(normalize_mount_path("/export/"), "/export");
        assert_eq!(normalize_mount_path("//export//"), "/export");
    }

    #[test]
    fn parse_options_handles_bare_and_valued_keys() {
        let parsed = parse_mount_options(" ro, uid=1000 , noatime").unwrap();
        assert_eq!(
            parsed,
            vec![
                ("ro".to_string(), None),
                ("uid".to_string(), Some("1000".to_string())),
                ("noatime".to_string(), None),
            ]
        );
    }

    #[test]
    fn parse_options_rejects_empty_key() {
        assert!(parse_mount_options("=value").is_err());
    }
}
