// Copyright 2025-2026 mirrormem Contributors
// Licensed under the Apache License, Version 2.0

//! Manager facade over the ledger and a device backend.
//!
//! A [`MemoryManager`] owns one [`Ledger`], shares one device backend, and
//! carries the execution-mode state every residency decision consults.
//! Managers are independent: tests build several side by side, each with
//! its own ledger, over the same or different backends.

mod resolve;
mod state;
mod transfer;

pub use resolve::Resolved;
pub use state::{ExecutionState, Target};

use std::sync::Arc;

use serde::Serialize;

use crate::device::DeviceBackend;
use crate::error::ResidencyError;
use crate::ledger::{HostAddr, Ledger};
use crate::telemetry::mode::ModeTrace;

/// Startup settings for one manager instance.
#[derive(Debug, Clone)]
pub struct ManagerConfig {
    /// Management on at all. Off means every operation passes through.
    pub managed: bool,
    /// Enable (and latch) the device path at construction.
    pub enable_device: bool,
    /// Initial execution target.
    pub target: Target,
    /// Alternate interop backend active (unsupported combination with the
    /// device path).
    pub alternate_backend: bool,
    /// Print the colorized mode line on snapshot changes.
    pub trace_modes: bool,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            managed: true,
            enable_device: false,
            target: Target::Host,
            alternate_backend: false,
            trace_modes: false,
        }
    }
}

/// Point-in-time usage counters, serializable for export.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct ManagerStats {
    pub regions: usize,
    pub aliases: usize,
    pub device_allocated_bytes: usize,
}

/// Dual-residency memory manager.
pub struct MemoryManager {
    ledger: Ledger,
    backend: Arc<dyn DeviceBackend>,
    state: ExecutionState,
    trace: ModeTrace,
}

impl MemoryManager {
    pub fn new(backend: Arc<dyn DeviceBackend>, config: ManagerConfig) -> Self {
        Self::with_ledger(Ledger::new(), backend, config)
    }

    /// Build over an explicitly constructed (possibly pre-populated)
    /// ledger.
    pub fn with_ledger(
        ledger: Ledger,
        backend: Arc<dyn DeviceBackend>,
        config: ManagerConfig,
    ) -> Self {
        let mut state = ExecutionState::host_only();
        state.set_managed(config.managed);
        if config.enable_device {
            state.enable_device();
        }
        state.set_target(config.target);
        state.set_alternate_backend(config.alternate_backend);
        Self {
            ledger,
            backend,
            state,
            trace: ModeTrace::new(config.trace_modes),
        }
    }

    pub fn state(&self) -> &ExecutionState {
        &self.state
    }

    /// Mutable mode state, for switching targets or toggling the device
    /// path between phases.
    pub fn state_mut(&mut self) -> &mut ExecutionState {
        &mut self.state
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    /// Register the span `[ptr, ptr + len)` and return `ptr` unchanged.
    ///
    /// Pass-through (nothing recorded) while management is disabled.
    /// Registering an already-known base is an error. Zero-length spans
    /// are accepted; the length only errs at a transition that needs a
    /// device allocation.
    ///
    /// # Safety
    ///
    /// The span must stay valid, and writable through `ptr`, for as long
    /// as it remains registered: residency transitions read and overwrite
    /// it through the recorded address.
    pub unsafe fn insert(&mut self, ptr: *mut u8, len: usize) -> Result<*mut u8, ResidencyError> {
        self.trace.observe(&self.state);
        if !self.state.using_managed() {
            return Ok(ptr);
        }
        self.ledger.insert(HostAddr::from_ptr(ptr), len)?;
        Ok(ptr)
    }

    /// Drop the region at `ptr` and every alias into it, returning `ptr`
    /// unchanged. The device buffer, if any, is left to the backend's own
    /// teardown.
    ///
    /// Pass-through while management is disabled; erasing an unknown base
    /// is an error.
    pub fn erase(&mut self, ptr: *mut u8) -> Result<*mut u8, ResidencyError> {
        if !self.state.using_managed() {
            return Ok(ptr);
        }
        self.ledger.erase(HostAddr::from_ptr(ptr))?;
        Ok(ptr)
    }

    /// Is `ptr` a registered region base? Aliases are not consulted.
    pub fn is_known(&self, ptr: *const u8) -> bool {
        self.ledger.is_known(HostAddr::from_ptr(ptr))
    }

    /// Is `ptr` inside a registered span (memoizing on a fresh hit)?
    /// Asking about a registered base is a usage error.
    pub fn is_alias(&mut self, ptr: *const u8) -> Result<bool, ResidencyError> {
        Ok(self.ledger.resolve_alias(HostAddr::from_ptr(ptr))?.is_some())
    }

    pub fn stats(&self) -> ManagerStats {
        ManagerStats {
            regions: self.ledger.region_count(),
            aliases: self.ledger.alias_count(),
            device_allocated_bytes: self.backend.allocated_bytes(),
        }
    }
}
