// Copyright 2025-2026 mirrormem Contributors
// Licensed under the Apache License, Version 2.0

//! Execution-mode state consulted by every residency decision.

use serde::Serialize;

/// Which address space current code is addressing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Target {
    Host,
    Device,
}

impl Default for Target {
    fn default() -> Self {
        Self::Host
    }
}

/// Mode flags for one manager instance.
///
/// The ever-enabled flag latches: once the device path has been enabled in
/// a run it stays "has been enabled" even across a later disable. The
/// translator's short-circuit filter relies on that distinction to keep
/// pre-device startup phases pass-through.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionState {
    managed: bool,
    device_enabled: bool,
    device_ever_enabled: bool,
    target: Target,
    alternate_backend: bool,
}

impl Default for ExecutionState {
    fn default() -> Self {
        Self::host_only()
    }
}

impl ExecutionState {
    /// Managed, device path never enabled. Every translation passes
    /// through until the device is enabled.
    pub fn host_only() -> Self {
        Self {
            managed: true,
            device_enabled: false,
            device_ever_enabled: false,
            target: Target::Host,
            alternate_backend: false,
        }
    }

    /// Managed with the device path enabled and targeted.
    pub fn device() -> Self {
        Self {
            managed: true,
            device_enabled: true,
            device_ever_enabled: true,
            target: Target::Device,
            alternate_backend: false,
        }
    }

    /// Management globally off; every operation is pass-through.
    pub fn disabled() -> Self {
        Self { managed: false, ..Self::host_only() }
    }

    // -- Query surface --------------------------------------------------------

    pub fn using_managed(&self) -> bool {
        self.managed
    }

    pub fn device_ever_enabled(&self) -> bool {
        self.device_ever_enabled
    }

    pub fn device_enabled(&self) -> bool {
        self.device_enabled
    }

    pub fn device_disabled(&self) -> bool {
        !self.device_enabled
    }

    /// True only while the device path is enabled and the target is the
    /// device.
    pub fn targeting_device(&self) -> bool {
        self.device_enabled && self.target == Target::Device
    }

    pub fn targeting_host(&self) -> bool {
        !self.targeting_device()
    }

    pub fn alternate_backend_active(&self) -> bool {
        self.alternate_backend
    }

    pub fn target(&self) -> Target {
        self.target
    }

    // -- Mutators -------------------------------------------------------------

    pub fn set_managed(&mut self, managed: bool) {
        self.managed = managed;
    }

    /// Enable the device path, latching the ever-enabled flag.
    pub fn enable_device(&mut self) {
        self.device_enabled = true;
        self.device_ever_enabled = true;
    }

    /// Disable the device path. The ever-enabled latch stays set.
    pub fn disable_device(&mut self) {
        self.device_enabled = false;
    }

    pub fn set_target(&mut self, target: Target) {
        self.target = target;
    }

    pub fn set_alternate_backend(&mut self, active: bool) {
        self.alternate_backend = active;
    }
}
