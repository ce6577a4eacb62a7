//! Memoized alias records.

use super::region::HostAddr;

/// A pointer discovered inside a registered region's span.
///
/// Aliases are created lazily on the first containment hit and are
/// permanent: they are never re-validated (regions do not move or resize)
/// and are removed only when the owning region is erased. An alias has no
/// residency of its own; transitions consult and flip the owner's flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AliasEntry {
    base: HostAddr,
    offset: usize,
}

impl AliasEntry {
    pub(crate) fn new(base: HostAddr, offset: usize) -> Self {
        Self { base, offset }
    }

    /// Base address of the owning region.
    pub fn base(&self) -> HostAddr {
        self.base
    }

    /// Byte offset of the aliased pointer into the owning region.
    pub fn offset(&self) -> usize {
        self.offset
    }
}
