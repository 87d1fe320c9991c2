//! File-handle encoding and decoding.
//!
//! Layout: `mount_id (16 B) ‖ fh_fragment (0..=64 B)`. `mount_id` is the
//! 128-bit `XXH3` hash of `fsid ‖ fh_fragment_of_root`, computed once when a
//! mount's root handle is minted; every other handle within that mount
//! copies the same 16 bytes so routing is a constant-size prefix compare
//! (see [`crate::mount_table`]).
//!
//! Grounded on `vfs/vfs_fh.h` in the original source: `encode_fh_mount` and
//! `encode_fh_parent` there become [`encode_mount`] and [`encode_parent`]
//! here; the inum/gen convenience wrappers become [`encode_mount_inum`] and
//! [`encode_parent_inum`] plus [`decode_inum`].

use crate::varint;
use smallvec::SmallVec;
use xxhash_rust::xxh3::xxh3_128;

/// Size in bytes of the `mount_id` prefix of every file handle.
pub const MOUNT_ID_SIZE: usize = 16;

/// Size in bytes of a filesystem identifier used as hash input.
pub const FSID_SIZE: usize = 16;

/// Upper bound on the backend-private fragment following `mount_id`.
pub const MAX_FRAGMENT: usize = 64;

/// Upper bound on a whole encoded file handle (`mount_id` + fragment).
pub const MAX_FH: usize = MOUNT_ID_SIZE + MAX_FRAGMENT;

/// An opaque file handle: fixed-capacity inline bytes, never heap
/// allocated, safe to hash, compare, and transmit over a wire protocol.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct FileHandle {
    len: u8,
    bytes: [u8; MAX_FH],
}

impl FileHandle {
    fn from_slice(bytes: &[u8]) -> Self {
        debug_assert!(bytes.len() >= MOUNT_ID_SIZE && bytes.len() <= MAX_FH);
        let mut buf = [0u8; MAX_FH];
        buf[..bytes.len()].copy_from_slice(bytes);
        FileHandle {
            len: bytes.len() as u8,
            bytes: buf,
        }
    }

    /// Reconstructs a handle from its encoded bytes, e.g. a key recovered
    /// from a cache or the mount table rather than freshly minted by
    /// [`encode_mount`]/[`encode_parent`].
    pub fn from_bytes(bytes: &[u8]) -> Self {
        FileHandle::from_slice(bytes)
    }

    /// The handle's bytes, `mount_id` followed by `fh_fragment`.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.len as usize]
    }

    /// Total encoded length.
    pub fn len(&self) -> usize {
        self.len as usize
    }

    /// `true` if this handle carries no bytes (never valid for routing;
    /// provided for `Default`-derived placeholder values).
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The 16-byte mount identifier prefix.
    pub fn mount_id(&self) -> &[u8] {
        &self.bytes[..MOUNT_ID_SIZE]
    }

    /// The backend-private portion following `mount_id`.
    pub fn fragment(&self) -> &[u8] {
        &self.bytes[MOUNT_ID_SIZE..self.len as usize]
    }

    /// Length of [`Self::fragment`].
    pub fn fragment_len(&self) -> usize {
        self.len as usize - MOUNT_ID_SIZE
    }

    /// Hash used for delegation-thread sharding and cache keying. Masks off
    /// the MSB so the value is safe to hand to protocols (e.g. NFS readdir
    /// cookies) that reject negative 64-bit offsets.
    pub fn hash(&self) -> u64 {
        hash_bytes(self.as_bytes())
    }

    /// Decodes an inum/generation pair packed as the fragment by
    /// [`encode_mount_inum`]/[`encode_parent_inum`].
    pub fn decode_inum(&self) -> (u64, u32) {
        let frag = self.fragment();
        let (inum, consumed) = varint::decode_u64(frag);
        let (gen, _) = varint::decode_u32(&frag[consumed..]);
        (inum, gen)
    }
}

impl std::fmt::Debug for FileHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "FileHandle(")?;
        for b in self.as_bytes() {
            write!(f, "{b:02x}")?;
        }
        write!(f, ")")
    }
}

impl Default for FileHandle {
    fn default() -> Self {
        FileHandle {
            len: 0,
            bytes: [0u8; MAX_FH],
        }
    }
}

/// Hash used uniformly for delegation sharding, cache keys, and (in the
/// original source) NFS readdir cookies: `XXH3_64` with the sign bit
/// cleared.
pub fn hash_bytes(data: &[u8]) -> u64 {
    xxhash_rust::xxh3::xxh3_64(data) & i64::MAX as u64
}

/// Encodes the root handle of a newly mounted filesystem: `mount_id =
/// XXH3_128(fsid ‖ fragment)`, followed by `fragment` itself.
///
/// Use this for the root of a mount, where there is no parent handle to
/// inherit a `mount_id` from.
pub fn encode_mount(fsid: &[u8; FSID_SIZE], fragment: &[u8]) -> FileHandle {
    assert!(fragment.len() <= MAX_FRAGMENT);

    let mut concat: SmallVec<[u8; FSID_SIZE + MAX_FRAGMENT]> = SmallVec::new();
    concat.extend_from_slice(fsid);
    concat.extend_from_slice(fragment);

    let hash = xxh3_128(&concat);

    let mut out = [0u8; MAX_FH];
    out[..MOUNT_ID_SIZE].copy_from_slice(&hash.to_be_bytes());
    out[MOUNT_ID_SIZE..MOUNT_ID_SIZE + fragment.len()].copy_from_slice(fragment);

    FileHandle::from_slice(&out[..MOUNT_ID_SIZE + fragment.len()])
}

/// Encodes a handle that inherits `mount_id` from `parent`, appending a new
/// `fragment`. Use this for every handle within a mount except its root.
pub fn encode_parent(parent: &FileHandle, fragment: &[u8]) -> FileHandle {
    assert!(fragment.len() <= MAX_FRAGMENT);

    let mut out = [0u8; MAX_FH];
    out[..MOUNT_ID_SIZE].copy_from_slice(parent.mount_id());
    out[MOUNT_ID_SIZE..MOUNT_ID_SIZE + fragment.len()].copy_from_slice(fragment);

    FileHandle::from_slice(&out[..MOUNT_ID_SIZE + fragment.len()])
}

/// Convenience: encodes a mount-root handle whose fragment is a
/// varint-packed `(inum, generation)` pair, for backends (memfs, demofs,
/// cairn-style KV filesystems) that use inum+gen as their fragment.
pub fn encode_mount_inum(fsid: &[u8; FSID_SIZE], inum: u64, gen: u32) -> FileHandle {
    let mut fragment = [0u8; 15];
    let n1 = varint::encode_u64(inum, &mut fragment);
    let n2 = varint::encode_u32(gen, &mut fragment[n1..]);
    encode_mount(fsid, &fragment[..n1 + n2])
}

/// Convenience: encodes a child handle whose fragment is a varint-packed
/// `(inum, generation)` pair, inheriting `mount_id` from `parent`.
pub fn encode_parent_inum(parent: &FileHandle, inum: u64, gen: u32) -> FileHandle {
    let mut fragment = [0u8; 15];
    let n1 = varint::encode_u64(inum, &mut fragment);
    let n2 = varint::encode_u32(gen, &mut fragment[n1..]);
    encode_parent(parent, &fragment[..n1 + n2])
}
