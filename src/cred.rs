//! Caller credentials threaded through to back-end modules.
//!
//! Opaque and read-only by design: the core never inspects uid/gid for
//! access-control decisions (an explicit non-goal), it only carries the
//! value from the procedure layer down to whichever module ends up handling
//! the request.

use smallvec::SmallVec;

/// Up to this many supplementary group IDs are stored inline before
/// [`VfsCred`] would need to allocate.
pub const INLINE_GIDS: usize = 16;

/// uid/gid/supplementary-groups tuple passed through unexamined.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VfsCred {
    uid: u32,
    gid: u32,
    gids: SmallVec<[u32; INLINE_GIDS]>,
}

impl VfsCred {
    /// Builds a credential set from a primary uid/gid and supplementary
    /// group list.
    pub fn new(uid: u32, gid: u32, gids: impl IntoIterator<Item = u32>) -> Self {
        VfsCred {
            uid,
            gid,
            gids: gids.into_iter().collect(),
        }
    }

    /// The credential used internally for root-pseudo-module and
    /// mount/unmount requests that have no caller-supplied identity.
    pub fn root() -> Self {
        VfsCred::new(0, 0, [])
    }

    pub fn uid(&self) -> u32 {
        self.uid
    }

    pub fn gid(&self) -> u32 {
        self.gid
    }

    pub fn gids(&self) -> &[u32] {
        &self.gids
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_is_uid_gid_zero() {
        let c = VfsCred::root();
        assert_eq!(c.uid(), 0);
        assert_eq!(c.gid(), 0);
        assert!(c.gids().is_empty());
    }

    #[test]
    fn carries_supplementary_groups() {
        let c = VfsCred::new(1000, 1000, [27, 100]);
        assert_eq!(c.gids(), &[27, 100]);
    }
}
