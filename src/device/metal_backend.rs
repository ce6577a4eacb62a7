// Copyright 2025-2026 mirrormem Contributors
// Licensed under the Apache License, Version 2.0

//! Metal device backend stub (macOS only).

use super::{CopyStream, DeviceBackend, DeviceError, DevicePtr, MockBackendConfig, MockDeviceBackend};

/// Metal-backed transfers via `metal-rs`.
///
/// Runs through the in-process mock until the `MTLBuffer` wiring lands.
pub struct MetalDeviceBackend {
    device_index: usize,
    inner: MockDeviceBackend,
}

impl MetalDeviceBackend {
    pub fn new(device_index: usize, capacity: usize) -> Self {
        Self {
            device_index,
            inner: MockDeviceBackend::new(MockBackendConfig { capacity }),
        }
    }

    pub fn device_index(&self) -> usize {
        self.device_index
    }
}

impl DeviceBackend for MetalDeviceBackend {
    fn allocate(&self, len: usize) -> Result<DevicePtr, DeviceError> {
        // TODO: replace with metal::Device::new_buffer
        self.inner.allocate(len)
    }

    unsafe fn copy_to_device(
        &self,
        dst: DevicePtr,
        src: *const u8,
        len: usize,
        stream: Option<&CopyStream>,
    ) -> Result<(), DeviceError> {
        // TODO: replace with MTLBuffer contents copy + didModifyRange
        self.inner.copy_to_device(dst, src, len, stream)
    }

    unsafe fn copy_to_host(
        &self,
        dst: *mut u8,
        src: DevicePtr,
        len: usize,
    ) -> Result<(), DeviceError> {
        // TODO: replace with MTLBuffer contents read-back
        self.inner.copy_to_host(dst, src, len)
    }

    fn copy_on_device(
        &self,
        dst: DevicePtr,
        src: DevicePtr,
        len: usize,
        stream: Option<&CopyStream>,
    ) -> Result<(), DeviceError> {
        // TODO: replace with a blit command encoder pass
        self.inner.copy_on_device(dst, src, len, stream)
    }

    fn current_stream(&self) -> CopyStream {
        // TODO: surface the MTLCommandQueue handle
        self.inner.current_stream()
    }

    fn allocated_bytes(&self) -> usize {
        self.inner.allocated_bytes()
    }
}
