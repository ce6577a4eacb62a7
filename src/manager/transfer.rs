// Copyright 2025-2026 mirrormem Contributors
// Licensed under the Apache License, Version 2.0

//! Forced transfers that bypass the lazy translator.

use crate::error::ResidencyError;
use crate::ledger::{AliasEntry, HostAddr};
use crate::telemetry::metrics::record_transfer;

use super::MemoryManager;

impl MemoryManager {
    /// Force a host→device copy of `bytes` bytes starting at `ptr`.
    ///
    /// Zero bytes is an error checked before anything else, including the
    /// pass-through filter. A registered base lazily gets its device
    /// buffer (sized to the region's full length); an alias assumes the
    /// owner's buffer already exists. An unknown pointer errs under a
    /// device target and is ignored otherwise. Residency is not flipped:
    /// the push refreshes the device mirror, it does not change which side
    /// is authoritative.
    pub fn push(&mut self, ptr: *const u8, bytes: usize) -> Result<(), ResidencyError> {
        let addr = HostAddr::from_ptr(ptr);
        if bytes == 0 {
            return Err(ResidencyError::EmptyPush(addr));
        }
        if self.passes_filter()? {
            return Ok(());
        }
        if self.ledger.is_known(addr) {
            return self.push_known(addr, bytes);
        }
        if let Some(entry) = self.ledger.resolve_alias(addr)? {
            return self.push_alias(addr, entry, bytes);
        }
        if self.state.targeting_device() {
            return Err(ResidencyError::UnknownPointer { addr, op: "push" });
        }
        Ok(())
    }

    fn push_known(&mut self, addr: HostAddr, bytes: usize) -> Result<(), ResidencyError> {
        let device = self.ensure_device_buffer(addr)?;
        unsafe { self.backend.copy_to_device(device, addr.as_ptr(), bytes, None)? };
        record_transfer("htod", bytes);
        tracing::trace!(base = %addr, bytes, "pushed region bytes");
        Ok(())
    }

    fn push_alias(
        &mut self,
        addr: HostAddr,
        entry: AliasEntry,
        bytes: usize,
    ) -> Result<(), ResidencyError> {
        let base = entry.base();
        let region = self
            .ledger
            .region(base)
            .ok_or(ResidencyError::UnknownRegion(base))?;
        // No lazy-allocation branch here: pushing through an alias assumes
        // the owner's buffer already exists.
        let device = region
            .device_ptr()
            .ok_or(ResidencyError::MissingDevicePointer(base))?;
        unsafe {
            self.backend
                .copy_to_device(device.offset(entry.offset()), addr.as_ptr(), bytes, None)?
        };
        record_transfer("htod", bytes);
        tracing::trace!(addr = %addr, base = %base, bytes, "pushed alias bytes");
        Ok(())
    }

    /// Force a device→host copy of `bytes` bytes at `ptr`.
    ///
    /// A no-op when the region (or an alias's owner) is already
    /// host-resident: there is nothing newer on the device to fetch. On a
    /// registered base, zero bytes means the region's full length; an
    /// alias copies exactly `bytes` from its offset. Unknown pointers err
    /// under a device target and are ignored otherwise. Residency is not
    /// flipped.
    pub fn pull(&mut self, ptr: *mut u8, bytes: usize) -> Result<(), ResidencyError> {
        if self.passes_filter()? {
            return Ok(());
        }
        let addr = HostAddr::from_ptr(ptr);
        if self.ledger.is_known(addr) {
            return self.pull_known(addr, bytes);
        }
        if let Some(entry) = self.ledger.resolve_alias(addr)? {
            return self.pull_alias(addr, entry, bytes);
        }
        if self.state.targeting_device() {
            return Err(ResidencyError::UnknownPointer { addr, op: "pull" });
        }
        Ok(())
    }

    fn pull_known(&mut self, addr: HostAddr, bytes: usize) -> Result<(), ResidencyError> {
        let region = self
            .ledger
            .region(addr)
            .ok_or(ResidencyError::UnknownRegion(addr))?;
        if region.is_host_resident() {
            return Ok(());
        }
        if addr.is_null() {
            return Err(ResidencyError::MissingHostPointer(addr));
        }
        let device = region
            .device_ptr()
            .ok_or(ResidencyError::MissingDevicePointer(addr))?;
        let len = if bytes == 0 { region.len() } else { bytes };
        unsafe { self.backend.copy_to_host(addr.as_mut_ptr(), device, len)? };
        record_transfer("dtoh", len);
        tracing::trace!(base = %addr, len, "pulled region bytes");
        Ok(())
    }

    fn pull_alias(
        &mut self,
        addr: HostAddr,
        entry: AliasEntry,
        bytes: usize,
    ) -> Result<(), ResidencyError> {
        let base = entry.base();
        let region = self
            .ledger
            .region(base)
            .ok_or(ResidencyError::UnknownRegion(base))?;
        if region.is_host_resident() {
            return Ok(());
        }
        if addr.is_null() {
            return Err(ResidencyError::MissingHostPointer(base));
        }
        let device = region
            .device_ptr()
            .ok_or(ResidencyError::MissingDevicePointer(base))?;
        // Exact byte count on the alias path; no full-length default.
        unsafe {
            self.backend
                .copy_to_host(addr.as_mut_ptr(), device.offset(entry.offset()), bytes)?
        };
        record_transfer("dtoh", bytes);
        tracing::trace!(addr = %addr, base = %base, bytes, "pulled alias bytes");
        Ok(())
    }

    /// Copy `bytes` bytes from `src` to `dst`, resolving both ends first.
    ///
    /// Both pointers go through [`MemoryManager::resolve`], so residency
    /// migrations can fire even when `bytes` is zero; the zero-length copy
    /// itself is a documented no-op returning `dst` unchanged. The
    /// transfer primitive follows the execution target: under a device
    /// target the copy runs on the device with the resolved addresses,
    /// where a pass-through address counts as caller-owned device memory;
    /// under a host target it is a plain host copy on the original
    /// pointers.
    ///
    /// # Safety
    ///
    /// `dst` must be valid for writes and `src` for reads of `bytes`
    /// bytes on the side the copy runs on, the two spans must not
    /// overlap, and resolution may write back through either pointer's
    /// registered span (registration granted that access).
    pub unsafe fn copy(
        &mut self,
        dst: *mut u8,
        src: *const u8,
        bytes: usize,
    ) -> Result<*mut u8, ResidencyError> {
        self.copy_impl(dst, src, bytes, false)
    }

    /// Asynchronous variant of [`MemoryManager::copy`]: a device-side copy
    /// rides the backend's current stream. Ordering and completion belong
    /// to the stream owner. Host-side copies are synchronous regardless.
    ///
    /// # Safety
    ///
    /// As for [`MemoryManager::copy`]; additionally both spans must stay
    /// valid until the stream has drained.
    pub unsafe fn copy_async(
        &mut self,
        dst: *mut u8,
        src: *const u8,
        bytes: usize,
    ) -> Result<*mut u8, ResidencyError> {
        self.copy_impl(dst, src, bytes, true)
    }

    unsafe fn copy_impl(
        &mut self,
        dst: *mut u8,
        src: *const u8,
        bytes: usize,
        streamed: bool,
    ) -> Result<*mut u8, ResidencyError> {
        let dst_res = self.resolve(dst)?;
        // Resolving the source may migrate its region back to the host,
        // writing through the span; registration granted that access.
        let src_res = self.resolve(src as *mut u8)?;
        if bytes == 0 {
            return Ok(dst);
        }
        if self.state.targeting_device() {
            let stream = streamed.then(|| self.backend.current_stream());
            self.backend.copy_on_device(
                dst_res.device_view(),
                src_res.device_view(),
                bytes,
                stream.as_ref(),
            )?;
            record_transfer("dtod", bytes);
        } else {
            std::ptr::copy_nonoverlapping(src, dst, bytes);
        }
        Ok(dst)
    }
}
