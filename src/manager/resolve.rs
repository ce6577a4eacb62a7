// Copyright 2025-2026 mirrormem Contributors
// Licensed under the Apache License, Version 2.0

//! Lazy residency translation.

use crate::device::DevicePtr;
use crate::error::ResidencyError;
use crate::ledger::{HostAddr, Residency};
use crate::telemetry::metrics::{record_device_allocation, record_transfer};

use super::MemoryManager;

/// Address appropriate to the current execution target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolved {
    Host(*mut u8),
    Device(DevicePtr),
}

impl Resolved {
    pub fn host_ptr(self) -> Option<*mut u8> {
        match self {
            Self::Host(p) => Some(p),
            Self::Device(_) => None,
        }
    }

    pub fn device_ptr(self) -> Option<DevicePtr> {
        match self {
            Self::Host(_) => None,
            Self::Device(d) => Some(d),
        }
    }

    pub fn is_device(self) -> bool {
        matches!(self, Self::Device(_))
    }

    /// The address as device memory; a pass-through host address is taken
    /// at face value as a caller-owned device allocation.
    pub(crate) fn device_view(self) -> DevicePtr {
        match self {
            Self::Host(p) => DevicePtr::from_raw(p as u64),
            Self::Device(d) => d,
        }
    }
}

impl MemoryManager {
    /// Translate `ptr` for the current execution target, migrating the
    /// backing region if its residency does not match.
    ///
    /// Order of decision:
    /// 1. the short-circuit filter (management off, device path off, or
    ///    device never enabled) passes `ptr` through untouched; an active
    ///    alternate backend is an unsupported combination,
    /// 2. a registered base goes through the region transition,
    /// 3. a pointer inside a registered span goes through the alias
    ///    transition against the owning region,
    /// 4. anything else is an error under a device target and passes
    ///    through under a host target.
    ///
    /// Repeated calls under an unchanged mode are idempotent: the second
    /// call takes the no-transfer row of the transition table.
    pub fn resolve(&mut self, ptr: *mut u8) -> Result<Resolved, ResidencyError> {
        self.trace.observe(&self.state);
        if self.passes_filter()? {
            return Ok(Resolved::Host(ptr));
        }
        let addr = HostAddr::from_ptr(ptr);
        if self.ledger.is_known(addr) {
            return self.transition(addr, addr, 0);
        }
        if let Some(entry) = self.ledger.resolve_alias(addr)? {
            // Offset 0 would be the owner's own base, which the registry
            // branch above already claimed.
            debug_assert!(entry.offset() > 0);
            return self.transition(entry.base(), addr, entry.offset());
        }
        if self.state.targeting_device() {
            return Err(ResidencyError::UnknownPointer { addr, op: "resolve" });
        }
        Ok(Resolved::Host(ptr))
    }

    /// Pre-ledger short circuit. `Ok(true)` means the caller must pass the
    /// pointer through untouched.
    pub(super) fn passes_filter(&self) -> Result<bool, ResidencyError> {
        if !self.state.using_managed() {
            return Ok(true);
        }
        if !self.state.device_ever_enabled() {
            return Ok(true);
        }
        if self.state.device_disabled() {
            return Ok(true);
        }
        if self.state.alternate_backend_active() {
            return Err(ResidencyError::UnsupportedBackend);
        }
        Ok(false)
    }

    /// Lazily allocate the device buffer for the region at `base`, sized
    /// to the region's full length.
    pub(super) fn ensure_device_buffer(
        &mut self,
        base: HostAddr,
    ) -> Result<DevicePtr, ResidencyError> {
        let region = self
            .ledger
            .region_mut(base)
            .ok_or(ResidencyError::UnknownRegion(base))?;
        if let Some(device) = region.device_ptr() {
            return Ok(device);
        }
        let len = region.len();
        if len == 0 {
            return Err(ResidencyError::ZeroLengthRegion(base));
        }
        let device = self.backend.allocate(len)?;
        region.set_device_ptr(device);
        record_device_allocation(len);
        tracing::debug!(base = %base, len, device = %device, "device buffer allocated");
        Ok(device)
    }

    /// One step of the residency table for the region at `base`.
    ///
    /// `host_result` is the address handed back on the host side (the base
    /// for a region, the original pointer for an alias); `device_offset`
    /// shifts the device-side result into the owner's buffer. Transfers
    /// always move the owner's full span through its base; the residency
    /// flag consulted and flipped is always the owner's.
    fn transition(
        &mut self,
        base: HostAddr,
        host_result: HostAddr,
        device_offset: usize,
    ) -> Result<Resolved, ResidencyError> {
        let on_host = self
            .ledger
            .region(base)
            .ok_or(ResidencyError::UnknownRegion(base))?
            .is_host_resident();
        let wants_device = self.state.targeting_device();
        if on_host && !wants_device {
            return Ok(Resolved::Host(host_result.as_mut_ptr()));
        }

        let device = self.ensure_device_buffer(base)?;
        if !on_host && wants_device {
            return Ok(Resolved::Device(device.offset(device_offset)));
        }

        let region = self
            .ledger
            .region_mut(base)
            .ok_or(ResidencyError::UnknownRegion(base))?;
        let len = region.len();
        if !on_host {
            // Device -> host: the owner's whole span migrates back.
            if base.is_null() {
                return Err(ResidencyError::MissingHostPointer(base));
            }
            unsafe { self.backend.copy_to_host(base.as_mut_ptr(), device, len)? };
            region.set_residency(Residency::Host);
            record_transfer("dtoh", len);
            tracing::trace!(base = %base, len, "residency flipped to host");
            return Ok(Resolved::Host(host_result.as_mut_ptr()));
        }

        // Host -> device.
        unsafe { self.backend.copy_to_device(device, base.as_ptr(), len, None)? };
        region.set_residency(Residency::Device);
        record_transfer("htod", len);
        tracing::trace!(base = %base, len, "residency flipped to device");
        Ok(Resolved::Device(device.offset(device_offset)))
    }
}
