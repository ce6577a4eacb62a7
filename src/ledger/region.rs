//! Region records and the host-address key type.

use std::fmt;

use crate::device::DevicePtr;

/// Host-side address used as a ledger key.
///
/// Carries the numeric value of a pointer so it can be ordered, hashed, and
/// printed without holding a live reference. Constructing one does not
/// assert anything about the memory behind it.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct HostAddr(usize);

impl HostAddr {
    pub fn new(addr: usize) -> Self {
        Self(addr)
    }

    pub fn from_ptr(ptr: *const u8) -> Self {
        Self(ptr as usize)
    }

    pub fn as_usize(self) -> usize {
        self.0
    }

    pub fn as_ptr(self) -> *const u8 {
        self.0 as *const u8
    }

    pub fn as_mut_ptr(self) -> *mut u8 {
        self.0 as *mut u8
    }

    pub fn is_null(self) -> bool {
        self.0 == 0
    }

    /// Byte distance from `base` to `self`. Caller guarantees `base <= self`.
    pub fn offset_from(self, base: HostAddr) -> usize {
        debug_assert!(base.0 <= self.0);
        self.0 - base.0
    }
}

impl fmt::Debug for HostAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:x}", self.0)
    }
}

impl fmt::Display for HostAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:x}", self.0)
    }
}

/// Which side currently holds the authoritative copy of a region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Residency {
    Host,
    Device,
}

/// A registered, contiguous, fixed-length memory span.
///
/// The host base address is the identity key and is never owned by the
/// ledger. The device buffer is absent until the first transition that
/// needs it, and once allocated is reused unchanged for the region's
/// lifetime. The residency flag names the authoritative side; the other
/// side, if present, is a possibly-stale mirror.
#[derive(Debug)]
pub struct Region {
    base: HostAddr,
    len: usize,
    device: Option<DevicePtr>,
    residency: Residency,
    aliases: Vec<HostAddr>,
}

impl Region {
    pub(crate) fn new(base: HostAddr, len: usize) -> Self {
        Self {
            base,
            len,
            device: None,
            residency: Residency::Host,
            aliases: Vec::new(),
        }
    }

    pub fn base(&self) -> HostAddr {
        self.base
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn device_ptr(&self) -> Option<DevicePtr> {
        self.device
    }

    pub fn residency(&self) -> Residency {
        self.residency
    }

    pub fn is_host_resident(&self) -> bool {
        self.residency == Residency::Host
    }

    /// Half-open containment test: `base <= addr < base + len`.
    ///
    /// Phrased as an offset comparison so a span ending at the top of the
    /// address space cannot overflow.
    pub fn contains(&self, addr: HostAddr) -> bool {
        let a = addr.as_usize();
        let b = self.base.as_usize();
        b <= a && a - b < self.len
    }

    /// Memoized alias addresses pointing into this region.
    pub fn alias_addrs(&self) -> &[HostAddr] {
        &self.aliases
    }

    pub(crate) fn set_device_ptr(&mut self, ptr: DevicePtr) {
        debug_assert!(self.device.is_none());
        self.device = Some(ptr);
    }

    pub(crate) fn set_residency(&mut self, residency: Residency) {
        self.residency = residency;
    }

    pub(crate) fn push_alias(&mut self, addr: HostAddr) {
        self.aliases.push(addr);
    }

    pub(crate) fn take_aliases(&mut self) -> Vec<HostAddr> {
        std::mem::take(&mut self.aliases)
    }

    pub(crate) fn remove_alias(&mut self, addr: HostAddr) {
        self.aliases.retain(|a| *a != addr);
    }
}
