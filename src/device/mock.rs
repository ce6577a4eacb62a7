// Copyright 2025-2026 mirrormem Contributors
// Licensed under the Apache License, Version 2.0

//! Deterministic in-process device backend for tests and CPU-only runs.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;

use super::{CopyStream, DeviceBackend, DeviceError, DevicePtr};

/// First synthesized device address. Far away from plausible host heap
/// addresses so a mixed-up pointer fails loudly instead of aliasing.
const DEVICE_BASE: u64 = 0x1000_0000;

/// Allocation granularity for synthesized addresses.
const DEVICE_ALIGN: u64 = 256;

/// Stream token reported by [`MockDeviceBackend::current_stream`].
const MOCK_STREAM: u64 = 1;

/// Configuration for the mock backend.
#[derive(Debug, Clone)]
pub struct MockBackendConfig {
    /// Total bytes the backend will hand out before reporting OOM.
    pub capacity: usize,
}

impl Default for MockBackendConfig {
    fn default() -> Self {
        Self { capacity: 256 * 1024 * 1024 }
    }
}

struct MockState {
    buffers: BTreeMap<u64, Box<[u8]>>,
    next_base: u64,
    total: usize,
    last_stream: Option<CopyStream>,
}

/// Byte-addressable fake device.
///
/// Buffers live in a map keyed by synthesized, aligned base addresses;
/// interior addresses resolve to (buffer, offset) the same way a real
/// device would treat pointer arithmetic into an allocation. All copies
/// execute synchronously; a passed stream is recorded so tests can assert
/// the token rode through unchanged.
pub struct MockDeviceBackend {
    capacity: usize,
    state: Mutex<MockState>,
    alloc_calls: AtomicU64,
    htod_calls: AtomicU64,
    dtoh_calls: AtomicU64,
    dtod_calls: AtomicU64,
    streamed_calls: AtomicU64,
}

impl MockDeviceBackend {
    pub fn new(config: MockBackendConfig) -> Self {
        Self {
            capacity: config.capacity,
            state: Mutex::new(MockState {
                buffers: BTreeMap::new(),
                next_base: DEVICE_BASE,
                total: 0,
                last_stream: None,
            }),
            alloc_calls: AtomicU64::new(0),
            htod_calls: AtomicU64::new(0),
            dtoh_calls: AtomicU64::new(0),
            dtod_calls: AtomicU64::new(0),
            streamed_calls: AtomicU64::new(0),
        }
    }

    /// Resolve a possibly-interior device address to its buffer base and
    /// byte offset.
    fn locate(state: &MockState, ptr: DevicePtr) -> Result<(u64, usize), DeviceError> {
        let raw = ptr.as_raw();
        let (base, buf) = state
            .buffers
            .range(..=raw)
            .next_back()
            .ok_or(DeviceError::UnknownPointer(ptr))?;
        if raw >= base + buf.len() as u64 {
            return Err(DeviceError::UnknownPointer(ptr));
        }
        Ok((*base, (raw - base) as usize))
    }

    fn check_span(buf: &[u8], offset: usize, len: usize) -> Result<(), DeviceError> {
        if len > buf.len().saturating_sub(offset) {
            return Err(DeviceError::CopyOutOfBounds { offset, len, buffer: buf.len() });
        }
        Ok(())
    }

    fn note_stream(&self, state: &mut MockState, stream: Option<&CopyStream>) {
        if let Some(s) = stream {
            state.last_stream = Some(*s);
            self.streamed_calls.fetch_add(1, Ordering::Relaxed);
        }
    }

    // -- Test instrumentation -------------------------------------------------

    pub fn alloc_count(&self) -> u64 {
        self.alloc_calls.load(Ordering::Relaxed)
    }

    pub fn htod_count(&self) -> u64 {
        self.htod_calls.load(Ordering::Relaxed)
    }

    pub fn dtoh_count(&self) -> u64 {
        self.dtoh_calls.load(Ordering::Relaxed)
    }

    pub fn dtod_count(&self) -> u64 {
        self.dtod_calls.load(Ordering::Relaxed)
    }

    /// Copies that carried a stream token.
    pub fn streamed_count(&self) -> u64 {
        self.streamed_calls.load(Ordering::Relaxed)
    }

    /// Most recent stream token seen on a streamed copy.
    pub fn last_stream(&self) -> Option<CopyStream> {
        self.state.lock().last_stream
    }

    /// Number of live buffers. Buffers are never freed here, so this is
    /// also the total number of successful allocations.
    pub fn buffer_count(&self) -> usize {
        self.state.lock().buffers.len()
    }

    /// Snapshot `len` bytes of device content starting at `ptr`.
    pub fn read_bytes(&self, ptr: DevicePtr, len: usize) -> Result<Vec<u8>, DeviceError> {
        let state = self.state.lock();
        let (base, offset) = Self::locate(&state, ptr)?;
        let buf = state
            .buffers
            .get(&base)
            .ok_or(DeviceError::UnknownPointer(ptr))?;
        Self::check_span(buf, offset, len)?;
        Ok(buf[offset..offset + len].to_vec())
    }
}

impl Default for MockDeviceBackend {
    fn default() -> Self {
        Self::new(MockBackendConfig::default())
    }
}

impl DeviceBackend for MockDeviceBackend {
    fn allocate(&self, len: usize) -> Result<DevicePtr, DeviceError> {
        let mut state = self.state.lock();
        if state.total + len > self.capacity {
            return Err(DeviceError::OutOfMemory {
                required: len as u64,
                available: (self.capacity - state.total) as u64,
            });
        }
        let base = state.next_base;
        let span = (len as u64).max(1).div_ceil(DEVICE_ALIGN) * DEVICE_ALIGN;
        state.next_base += span;
        state.total += len;
        state.buffers.insert(base, vec![0u8; len].into_boxed_slice());
        self.alloc_calls.fetch_add(1, Ordering::Relaxed);
        Ok(DevicePtr::from_raw(base))
    }

    unsafe fn copy_to_device(
        &self,
        dst: DevicePtr,
        src: *const u8,
        len: usize,
        stream: Option<&CopyStream>,
    ) -> Result<(), DeviceError> {
        let mut state = self.state.lock();
        let (base, offset) = Self::locate(&state, dst)?;
        self.note_stream(&mut state, stream);
        let buf = state
            .buffers
            .get_mut(&base)
            .ok_or(DeviceError::UnknownPointer(dst))?;
        Self::check_span(buf, offset, len)?;
        let src_bytes = std::slice::from_raw_parts(src, len);
        buf[offset..offset + len].copy_from_slice(src_bytes);
        self.htod_calls.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    unsafe fn copy_to_host(
        &self,
        dst: *mut u8,
        src: DevicePtr,
        len: usize,
    ) -> Result<(), DeviceError> {
        let state = self.state.lock();
        let (base, offset) = Self::locate(&state, src)?;
        let buf = state
            .buffers
            .get(&base)
            .ok_or(DeviceError::UnknownPointer(src))?;
        Self::check_span(buf, offset, len)?;
        let dst_bytes = std::slice::from_raw_parts_mut(dst, len);
        dst_bytes.copy_from_slice(&buf[offset..offset + len]);
        self.dtoh_calls.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn copy_on_device(
        &self,
        dst: DevicePtr,
        src: DevicePtr,
        len: usize,
        stream: Option<&CopyStream>,
    ) -> Result<(), DeviceError> {
        let mut state = self.state.lock();
        let (dst_base, dst_off) = Self::locate(&state, dst)?;
        let (src_base, src_off) = Self::locate(&state, src)?;
        self.note_stream(&mut state, stream);
        if dst_base == src_base {
            let buf = state
                .buffers
                .get_mut(&dst_base)
                .ok_or(DeviceError::UnknownPointer(dst))?;
            Self::check_span(buf, dst_off, len)?;
            Self::check_span(buf, src_off, len)?;
            buf.copy_within(src_off..src_off + len, dst_off);
        } else {
            let tmp = {
                let src_buf = state
                    .buffers
                    .get(&src_base)
                    .ok_or(DeviceError::UnknownPointer(src))?;
                Self::check_span(src_buf, src_off, len)?;
                src_buf[src_off..src_off + len].to_vec()
            };
            let dst_buf = state
                .buffers
                .get_mut(&dst_base)
                .ok_or(DeviceError::UnknownPointer(dst))?;
            Self::check_span(dst_buf, dst_off, len)?;
            dst_buf[dst_off..dst_off + len].copy_from_slice(&tmp);
        }
        self.dtod_calls.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn current_stream(&self) -> CopyStream {
        CopyStream::from_raw(MOCK_STREAM)
    }

    fn allocated_bytes(&self) -> usize {
        self.state.lock().total
    }
}

#[cfg(test)]
#[path = "mock_tests.rs"]
mod tests;
