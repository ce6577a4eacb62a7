// Copyright 2025-2026 mirrormem Contributors
// Licensed under the Apache License, Version 2.0

//! Device backend abstraction.
//!
//! The ledger treats the accelerator as an external collaborator reached
//! through five primitives: allocate, host-to-device copy, device-to-host
//! copy, device-to-device copy, and a current-stream query for async
//! ordering. Everything else about the device (initialization, teardown,
//! real driver handles) stays outside this crate. Device buffers are never
//! freed here; releasing them belongs to the backend's own lifecycle.

use std::fmt;

use thiserror::Error;

mod mock;

pub use mock::{MockBackendConfig, MockDeviceBackend};

#[cfg(feature = "cuda")]
mod cuda;
#[cfg(feature = "cuda")]
pub use cuda::CudaDeviceBackend;

#[cfg(feature = "metal")]
mod metal_backend;
#[cfg(feature = "metal")]
pub use metal_backend::MetalDeviceBackend;

/// Opaque device address.
///
/// Supports byte-offset arithmetic so alias resolution can address into
/// the interior of an owning region's buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DevicePtr(u64);

impl DevicePtr {
    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub fn as_raw(self) -> u64 {
        self.0
    }

    /// Address `offset` bytes past `self`.
    pub fn offset(self, offset: usize) -> Self {
        Self(self.0 + offset as u64)
    }
}

impl fmt::Display for DevicePtr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:x}", self.0)
    }
}

/// Opaque ordering token for asynchronous transfers.
///
/// The ledger passes it through unchanged; ordering and completion are the
/// stream owner's responsibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CopyStream(u64);

impl CopyStream {
    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub fn as_raw(self) -> u64 {
        self.0
    }
}

/// Failures surfaced by a device backend.
#[derive(Debug, Error)]
pub enum DeviceError {
    #[error("out of device memory: required {required} bytes, available {available} bytes")]
    OutOfMemory { required: u64, available: u64 },

    #[error("unknown device pointer {0}")]
    UnknownPointer(DevicePtr),

    #[error("device copy out of bounds: offset {offset} + {len} bytes exceeds buffer of {buffer} bytes")]
    CopyOutOfBounds { offset: usize, len: usize, buffer: usize },

    #[error("device operation failed: {0}")]
    OperationFailed(String),
}

/// Transfer and allocation primitives of an accelerator backend.
///
/// Implementations are shared (`Send + Sync`) so one backend can serve
/// several independent managers; that sharing does not extend any
/// thread-safety to the ledgers themselves.
pub trait DeviceBackend: Send + Sync {
    /// Allocate `len` bytes of device storage.
    fn allocate(&self, len: usize) -> Result<DevicePtr, DeviceError>;

    /// Copy `len` bytes from host memory at `src` to device memory at
    /// `dst`. A stream, when given, orders the transfer; the copy may
    /// complete after this call returns.
    ///
    /// # Safety
    ///
    /// `src` must be valid for reads of `len` bytes for the duration of
    /// the transfer.
    unsafe fn copy_to_device(
        &self,
        dst: DevicePtr,
        src: *const u8,
        len: usize,
        stream: Option<&CopyStream>,
    ) -> Result<(), DeviceError>;

    /// Copy `len` bytes from device memory at `src` to host memory at
    /// `dst`. Always synchronous.
    ///
    /// # Safety
    ///
    /// `dst` must be valid for writes of `len` bytes.
    unsafe fn copy_to_host(
        &self,
        dst: *mut u8,
        src: DevicePtr,
        len: usize,
    ) -> Result<(), DeviceError>;

    /// Copy `len` bytes between two device addresses. A stream, when
    /// given, makes the copy asynchronous with respect to the caller.
    fn copy_on_device(
        &self,
        dst: DevicePtr,
        src: DevicePtr,
        len: usize,
        stream: Option<&CopyStream>,
    ) -> Result<(), DeviceError>;

    /// Ordering token async transfers should ride on.
    fn current_stream(&self) -> CopyStream {
        CopyStream::default()
    }

    /// Total live device bytes handed out by this backend.
    fn allocated_bytes(&self) -> usize;
}
