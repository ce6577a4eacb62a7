// Copyright 2025-2026 mirrormem Contributors
// Licensed under the Apache License, Version 2.0

//! CUDA device backend stub.

use super::{CopyStream, DeviceBackend, DeviceError, DevicePtr, MockBackendConfig, MockDeviceBackend};

/// CUDA-backed transfers via `cudarc`.
///
/// Allocation and copies currently run through the in-process mock while
/// the driver wiring lands; the bookkeeping and error surface already
/// match the real backend.
pub struct CudaDeviceBackend {
    device_index: usize,
    inner: MockDeviceBackend,
}

impl CudaDeviceBackend {
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

impl DeviceBackend for CudaDeviceBackend {
    fn allocate(&self, len: usize) -> Result<DevicePtr, DeviceError> {
        // TODO: replace with cudarc::driver::CudaDevice::alloc::<u8>
        self.inner.allocate(len)
    }

    unsafe fn copy_to_device(
        &self,
        dst: DevicePtr,
        src: *const u8,
        len: usize,
        stream: Option<&CopyStream>,
    ) -> Result<(), DeviceError> {
        // TODO: replace with cudarc htod_copy / htod_copy_async on the stream
        self.inner.copy_to_device(dst, src, len, stream)
    }

    unsafe fn copy_to_host(
        &self,
        dst: *mut u8,
        src: DevicePtr,
        len: usize,
    ) -> Result<(), DeviceError> {
        // TODO: replace with cudarc dtoh_sync_copy
        self.inner.copy_to_host(dst, src, len)
    }

    fn copy_on_device(
        &self,
        dst: DevicePtr,
        src: DevicePtr,
        len: usize,
        stream: Option<&CopyStream>,
    ) -> Result<(), DeviceError> {
        // TODO: replace with cudarc dtod_copy / async variant on the stream
        self.inner.copy_on_device(dst, src, len, stream)
    }

    fn current_stream(&self) -> CopyStream {
        // TODO: surface the CudaStream handle once driver wiring lands
        self.inner.current_stream()
    }

    fn allocated_bytes(&self) -> usize {
        self.inner.allocated_bytes()
    }
}
