//! Region registry and alias bookkeeping.
//!
//! The [`Ledger`] is pure bookkeeping over addresses: it never reads or
//! writes the memory behind the pointers it tracks and never talks to a
//! device backend. Residency transitions and transfers live in the
//! manager layer on top of it.
//!
//! A ledger instance assumes single-threaded access; callers that share
//! one across threads must serialize externally.

mod alias;
mod region;

use std::collections::{BTreeMap, HashMap};

pub use alias::AliasEntry;
pub use region::{HostAddr, Region, Residency};

use crate::error::ResidencyError;
use crate::telemetry::metrics::{record_alias_count, record_region_count};

/// Instance-scoped registry of regions and memoized aliases.
///
/// Invariants:
/// - the region and alias key sets are disjoint; registering an address
///   evicts any stale memoized alias under the same key,
/// - every alias offset lies strictly inside `(0, owner.len)` at creation,
///   and regions never resize, so it stays inside for the owner's lifetime.
#[derive(Debug, Default)]
pub struct Ledger {
    regions: BTreeMap<HostAddr, Region>,
    aliases: HashMap<HostAddr, AliasEntry>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a region of `len` bytes at `base`.
    ///
    /// Zero-length registration is legal; the length only becomes an error
    /// at a transition that needs a device allocation.
    pub fn insert(&mut self, base: HostAddr, len: usize) -> Result<(), ResidencyError> {
        if self.regions.contains_key(&base) {
            return Err(ResidencyError::AlreadyRegistered(base));
        }
        // An address can come back as a region base after its previous
        // owner was erased and the allocation reused. The stale alias
        // record must not shadow the new region.
        if let Some(stale) = self.aliases.remove(&base) {
            if let Some(owner) = self.regions.get_mut(&stale.base()) {
                owner.remove_alias(base);
            }
            record_alias_count(self.aliases.len());
        }
        self.regions.insert(base, Region::new(base, len));
        tracing::debug!(base = %base, len, "region registered");
        record_region_count(self.regions.len());
        Ok(())
    }

    /// Remove the region at `base` and every alias pointing into it.
    pub fn erase(&mut self, base: HostAddr) -> Result<(), ResidencyError> {
        let region = self
            .regions
            .get_mut(&base)
            .ok_or(ResidencyError::UnknownRegion(base))?;
        for addr in region.take_aliases() {
            self.aliases.remove(&addr);
        }
        self.regions.remove(&base);
        tracing::debug!(base = %base, "region erased");
        record_region_count(self.regions.len());
        record_alias_count(self.aliases.len());
        Ok(())
    }

    /// Membership test against the region map only; aliases are not
    /// consulted.
    pub fn is_known(&self, addr: HostAddr) -> bool {
        self.regions.contains_key(&addr)
    }

    /// Resolve `addr` as an alias, memoizing on a fresh containment hit.
    ///
    /// Returns `Ok(None)` when `addr` lies outside every region. Calling
    /// this on a registered base is a usage error, not a soft miss.
    ///
    /// When overlapping regions both contain `addr`, the one with the
    /// greatest base wins; the walk visits bases in descending order from
    /// the query address, so the tie-break is deterministic.
    pub fn resolve_alias(
        &mut self,
        addr: HostAddr,
    ) -> Result<Option<AliasEntry>, ResidencyError> {
        if self.regions.contains_key(&addr) {
            return Err(ResidencyError::AliasLookupOnBase(addr));
        }
        if let Some(entry) = self.aliases.get(&addr) {
            return Ok(Some(*entry));
        }
        let owner = self
            .regions
            .range(..=addr)
            .rev()
            .find(|(_, region)| region.contains(addr))
            .map(|(base, _)| *base);
        let Some(base) = owner else {
            return Ok(None);
        };
        let entry = AliasEntry::new(base, addr.offset_from(base));
        if let Some(region) = self.regions.get_mut(&base) {
            region.push_alias(addr);
        }
        self.aliases.insert(addr, entry);
        tracing::trace!(addr = %addr, base = %base, offset = entry.offset(), "alias memoized");
        record_alias_count(self.aliases.len());
        Ok(Some(entry))
    }

    /// Peek at a memoized alias without triggering a containment search.
    pub fn alias(&self, addr: HostAddr) -> Option<AliasEntry> {
        self.aliases.get(&addr).copied()
    }

    pub fn region(&self, base: HostAddr) -> Option<&Region> {
        self.regions.get(&base)
    }

    pub(crate) fn region_mut(&mut self, base: HostAddr) -> Option<&mut Region> {
        self.regions.get_mut(&base)
    }

    pub fn region_count(&self) -> usize {
        self.regions.len()
    }

    pub fn alias_count(&self) -> usize {
        self.aliases.len()
    }
}
